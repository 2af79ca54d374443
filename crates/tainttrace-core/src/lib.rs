pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{AnalysisError, Result};
pub use types::{Direction, FunctionLocation, PollutionInfo, Slot};

#[cfg(test)]
mod tests {
    #[test]
    fn test_core_module_loads() {
        let _ = super::constants::RESERVED_KEYWORDS;
    }
}
