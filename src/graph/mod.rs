mod bus;
#[allow(clippy::module_inception)]
mod graph;
mod scheduler;
mod types;


pub use graph::{AudioGraph, GraphConfig};
pub use types::{Connection, UnitId};
