//! Text graph formats.
//!
//! All three formats open with a `num_vertices num_edges` header, which may
//! be preceded by blank lines and `#` comments. Lines starting with `%` are
//! comments everywhere; the weighted format also accepts `#` comments and
//! blank lines after the header (a blank line is an isolated vertex in the
//! METIS format, so it is significant there).

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use tracing::warn;

use super::{Edge, Graph, GraphBuilder, VertexId};
use crate::error::{MospError, Result};
use crate::objective::ObjectiveVector;

type NumberedLines = std::iter::Enumerate<Lines<BufReader<File>>>;

fn open(path: &Path) -> Result<NumberedLines> {
    let file = File::open(path).map_err(|e| MospError::io(path, e))?;
    Ok(BufReader::new(file).lines().enumerate())
}

fn next_line(path: &Path, lines: &mut NumberedLines) -> Result<Option<(usize, String)>> {
    for (i, line) in lines {
        let line = line.map_err(|e| MospError::io(path, e))?;
        if line.starts_with('%') {
            continue;
        }
        return Ok(Some((i + 1, line)));
    }
    Ok(None)
}

fn number<T: std::str::FromStr>(path: &Path, line: usize, token: &str, what: &str) -> Result<T> {
    token
        .parse::<T>()
        .map_err(|_| MospError::parse(path, line, format!("expected {what}, found {token:?}")))
}

const MISSING_HEADER: &str = "missing `num_vertices num_edges` header";

/// The vertex count is checked against the id range before anything is
/// sized from it.
fn header(path: &Path, lines: &mut NumberedLines) -> Result<(usize, usize)> {
    let (line_no, line) = loop {
        match next_line(path, lines)? {
            Some((_, l)) if l.trim().is_empty() || l.trim_start().starts_with('#') => continue,
            Some(found) => break found,
            None => return Err(MospError::parse(path, 0, MISSING_HEADER)),
        }
    };
    let mut tokens = line.split_whitespace();
    let (Some(n), Some(m)) = (tokens.next(), tokens.next()) else {
        return Err(MospError::parse(path, line_no, MISSING_HEADER));
    };
    let n: usize = number(path, line_no, n, "vertex count")?;
    if n > VertexId::MAX as usize {
        return Err(MospError::parse(
            path,
            line_no,
            format!("{n} vertices exceed the vertex id range (at most {})", VertexId::MAX),
        ));
    }
    Ok((n, number(path, line_no, m, "edge count")?))
}

fn warn_edge_count(path: &Path, declared: usize, found: usize) {
    if declared != found {
        warn!(?path, declared, found, "edge count differs from header");
    }
}

/// CSR: `n m`, then `n+1` cumulative offsets, then `offsets[n]` 0-based
/// neighbour ids (`2m` for an undirected graph stored symmetrically). The
/// arrays are read as one token stream so line breaks inside them are
/// tolerated.
pub fn csr(path: &Path, default_dimension: usize) -> Result<Graph> {
    let mut lines = open(path)?;
    let (n, m) = header(path, &mut lines)?;
    let num_offsets = n
        .checked_add(1)
        .ok_or(MospError::GraphTooLarge { num_vertices: n })?;

    let mut offsets: Vec<usize> = Vec::new();
    let mut neighbors: Vec<VertexId> = Vec::new();
    let mut last_line = 1;
    while let Some((line_no, line)) = next_line(path, &mut lines)? {
        last_line = line_no;
        for token in line.split_whitespace() {
            if offsets.len() < num_offsets {
                let offset: usize = number(path, line_no, token, "offset")?;
                if offsets.last().map_or(false, |prev| offset < *prev) {
                    return Err(MospError::parse(path, line_no, "offsets must be non-decreasing"));
                }
                offsets.push(offset);
            } else {
                neighbors.push(number(path, line_no, token, "neighbour id")?);
            }
        }
    }
    if offsets.len() != num_offsets {
        return Err(MospError::parse(
            path,
            last_line,
            format!("expected {num_offsets} offsets, found {}", offsets.len()),
        ));
    }
    if offsets[0] != 0 || offsets[n] != neighbors.len() {
        return Err(MospError::parse(
            path,
            last_line,
            format!(
                "offsets describe {} neighbours but {} were listed",
                offsets[n] - offsets[0],
                neighbors.len()
            ),
        ));
    }
    warn_edge_count(path, m.saturating_mul(2), neighbors.len());

    let mut builder = GraphBuilder::new(n, default_dimension)?;
    for (bounds, u) in offsets.windows(2).zip(0..) {
        for target in &neighbors[bounds[0]..bounds[1]] {
            let edge = Edge {
                target: *target,
                weights: builder.unit_weights(),
            };
            builder
                .push(u, edge)
                .map_err(|e| out_of_range(path, last_line, e))?;
        }
    }
    builder.finish()
}

/// METIS adjacency: `n m`, then line `i + 1` lists the 1-based neighbours of
/// vertex `i`. Neighbours outside `1..=n` are skipped.
pub fn metis(path: &Path, default_dimension: usize) -> Result<Graph> {
    let mut lines = open(path)?;
    let (n, m) = header(path, &mut lines)?;
    let mut builder = GraphBuilder::new(n, default_dimension)?;
    let mut found = 0;
    let mut u: VertexId = 0;
    while let Some((line_no, line)) = next_line(path, &mut lines)? {
        if u as usize >= n {
            if line.trim().is_empty() {
                continue;
            }
            return Err(MospError::parse(path, line_no, format!("more than {n} vertex lines")));
        }
        for token in line.split_whitespace() {
            let neighbor: usize = number(path, line_no, token, "neighbour id")?;
            let target = match neighbor.checked_sub(1).map(VertexId::try_from) {
                Some(Ok(target)) if (target as usize) < n => target,
                _ => continue,
            };
            let edge = Edge {
                target,
                weights: builder.unit_weights(),
            };
            builder.push(u, edge)?;
            found += 1;
        }
        u += 1;
    }
    warn_edge_count(path, m.saturating_mul(2), found);
    builder.finish()
}

/// Weighted edge list: `n m`, then `vertex token*` where a token is
/// `neighbor:w1,...,wk` or a bare `neighbor` (unit weights).
pub fn weighted(path: &Path, default_dimension: usize) -> Result<Graph> {
    let mut lines = open(path)?;
    let (n, m) = header(path, &mut lines)?;
    let mut builder = GraphBuilder::new(n, default_dimension)?;
    let mut found = 0;
    while let Some((line_no, line)) = next_line(path, &mut lines)? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let source: VertexId = match tokens.next() {
            Some(t) => number(path, line_no, t, "vertex id")?,
            None => continue,
        };
        for token in tokens {
            let edge = weighted_token(path, line_no, token, &builder)?;
            builder
                .push(source, edge)
                .map_err(|e| out_of_range(path, line_no, e))?;
            found += 1;
        }
    }
    warn_edge_count(path, m, found);
    builder.finish()
}

/// Report a bad vertex id against the line that named it.
fn out_of_range(path: &Path, line: usize, error: MospError) -> MospError {
    match error {
        MospError::VertexOutOfRange {
            vertex,
            num_vertices,
        } => MospError::parse(
            path,
            line,
            format!("vertex {vertex} out of range for {num_vertices} vertices"),
        ),
        other => other,
    }
}

fn weighted_token(path: &Path, line: usize, token: &str, builder: &GraphBuilder) -> Result<Edge> {
    match token.split_once(':') {
        None => Ok(Edge {
            target: number(path, line, token, "neighbour id")?,
            weights: builder.unit_weights(),
        }),
        Some((target, weights)) => {
            let weights = weights
                .split(',')
                .map(|w| number::<u64>(path, line, w, "non-negative weight"))
                .collect::<Result<Vec<_>>>()?;
            Ok(Edge {
                target: number(path, line, target, "neighbour id")?,
                weights: ObjectiveVector::new(weights),
            })
        }
    }
}
