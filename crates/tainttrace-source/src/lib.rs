pub mod extract;
pub mod locate;
pub mod process;
pub mod slice;
pub mod xml;

pub use locate::FunctionLocator;
pub use xml::CodeElement;
