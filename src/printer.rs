use mosp_lamellar::metrics::RunMetrics;
use mosp_lamellar::report::RankSummary;
use mosp_lamellar::Termination;

pub(crate) fn print_summary(metrics: &RunMetrics) {
    let state = match metrics.termination {
        Termination::Converged => "converged",
        Termination::MaxIterReached => "max iterations reached",
    };
    println!("[Result] {state} after {} iterations", metrics.iterations);
    println!("[Performance] Execution Time: {:.6} seconds", metrics.max_elapsed_secs);
    println!("[Performance] Front Insertions: {}", metrics.global_insertions);
    println!("[Performance] Total FLOPs: {}", metrics.global_front_entries);
    println!("[Performance] MFLOPS: {:.6} MFLOPS", metrics.mflops);
    if metrics.global_capacity_rejections > 0 {
        println!(
            "[Capacity] {} candidates rejected by full fronts",
            metrics.global_capacity_rejections
        );
    }
    if metrics.discarded > 0 {
        println!("[Cut edges] {} candidates discarded", metrics.discarded);
    }
    if metrics.exchanged > 0 {
        println!("[Cut edges] {} candidates exchanged", metrics.exchanged);
    }
    if metrics.saturated > 0 {
        println!("[Overflow] {} dominated candidates dropped", metrics.saturated);
    }
}

pub(crate) fn print_ranks(ranks: &[RankSummary]) {
    for r in ranks {
        println!(
            "rank {:<4} vertices: {:<8} insertions: {:<10} capacity rejections: {:<8} entries: {}",
            r.rank, r.vertices_owned, r.insertions, r.capacity_rejections, r.front_entries
        );
    }
}
