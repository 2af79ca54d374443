pub mod graph;
pub mod node;

pub use graph::Graph;
pub use node::{Node, NodeId};
