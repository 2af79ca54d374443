pub mod driver;
pub mod engine;
pub mod taint_map;
pub mod worklist;

pub use driver::Traversal;
pub use taint_map::{TaintEntry, TaintMap};
pub use worklist::WorklistItem;
