use tainttrace_core::types::Direction;

/// A function queued for a forced (`forceTrack`) re-analysis after the main
/// per-chain walk, discovered mid-propagation (a decl whose initializer
/// calls another function, or a call whose argument was just tainted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorklistItem {
    pub function: String,
    pub direction: Direction,
}

impl WorklistItem {
    pub fn new(function: impl Into<String>, direction: Direction) -> Self {
        Self {
            function: function.into(),
            direction,
        }
    }

    pub fn forward(function: impl Into<String>) -> Self {
        Self::new(function, Direction::Forward)
    }
}
