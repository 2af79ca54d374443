use std::collections::HashSet;
use std::fmt;

/// A tainted-slot reference: a positional parameter (`#N`), a positional
/// return value (`$N`), or "every return value" (`$*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Parameter(usize),
    Return(usize),
    ReturnWildcard,
}

impl Slot {
    pub fn parse(text: &str) -> Option<Self> {
        if text == "$*" {
            return Some(Self::ReturnWildcard);
        }
        if let Some(rest) = text.strip_prefix('#') {
            return rest.parse::<usize>().ok().map(Self::Parameter);
        }
        if let Some(rest) = text.strip_prefix('$') {
            return rest.parse::<usize>().ok().map(Self::Return);
        }
        None
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parameter(i) => write!(f, "#{i}"),
            Self::Return(i) => write!(f, "${i}"),
            Self::ReturnWildcard => write!(f, "$*"),
        }
    }
}

/// Direction a call chain is walked in by the taint engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Backward,
    Forward,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backward => "backward",
            Self::Forward => "forward",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved source position of a function definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionLocation {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
}

impl FunctionLocation {
    pub fn new(file: impl Into<String>, start_line: u32, end_line: u32) -> Self {
        Self {
            file: file.into(),
            start_line,
            end_line,
        }
    }

    /// The sentinel returned when a function's source position could not be
    /// resolved; callers treat this as "skip this function".
    pub fn unresolved() -> Self {
        Self {
            file: String::new(),
            start_line: 0,
            end_line: 0,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !self.file.is_empty() && self.start_line != 0
    }
}

/// Seed taint information for a single function, loaded from the pollution
/// JSON: which local variable names and which slots start out tainted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollutionInfo {
    pub var: HashSet<String>,
    pub index: HashSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_parse_parameter() {
        assert_eq!(Slot::parse("#2"), Some(Slot::Parameter(2)));
    }

    #[test]
    fn test_slot_parse_return() {
        assert_eq!(Slot::parse("$1"), Some(Slot::Return(1)));
        assert_eq!(Slot::parse("$*"), Some(Slot::ReturnWildcard));
    }

    #[test]
    fn test_slot_parse_invalid() {
        assert_eq!(Slot::parse("buf"), None);
        assert_eq!(Slot::parse("#"), None);
    }

    #[test]
    fn test_slot_display_round_trip() {
        for s in [Slot::Parameter(3), Slot::Return(0), Slot::ReturnWildcard] {
            let text = s.to_string();
            assert_eq!(Slot::parse(&text), Some(s));
        }
    }

    #[test]
    fn test_location_unresolved_sentinel() {
        let loc = FunctionLocation::unresolved();
        assert!(!loc.is_resolved());
    }
}
