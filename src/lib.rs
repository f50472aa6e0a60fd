//! Multi-objective shortest paths over a partitioned graph.
//!
//! Each PE owns a subset of the vertices (see [`partition::OwnerMap`]) and
//! keeps a bounded Pareto front of objective vectors for every one of them.
//! [`relax::Coordinator`] runs synchronous relaxation rounds until no PE
//! changes a front; [`session::run`] wires loading, relaxation and metric
//! reduction together for one rank.

pub mod comm;
pub mod error;
pub mod front;
pub mod graph;
pub mod metrics;
pub mod objective;
pub mod partition;
pub mod relax;
pub mod report;
pub mod session;
pub mod synthetic;

pub use comm::{Collective, Role};
pub use error::{MospError, Result};
pub use front::{Insertion, ParetoFront, MAX_FRONT};
pub use graph::{Graph, GraphFormat, VertexId};
pub use objective::ObjectiveVector;
pub use relax::{CutEdgePolicy, RelaxConfig, Termination, MAX_ITER};
pub use session::{RunConfig, RunReport};
