/// Tokens that are never treated as variable names even when they appear as
/// the text content of a `decl`/`expr`/`parameter` element.
pub const RESERVED_KEYWORDS: &[&str] = &[
    "int", "char", "void", "NULL", "errno", "sizeof", "defined",
];

/// A variable name containing any of these substrings is dropped rather than
/// tracked, mirroring the original analyzer's ad hoc denylist.
pub const RESERVED_SUBSTRINGS: &[&str] = &["TINYDIR_STRING", "_FUNC"];

/// `__interceptor_` is prepended to a libc symbol name by sanitizer
/// instrumentation; stripping it unifies the instrumented and real symbol.
pub const INTERCEPTOR_PREFIX: &str = "__interceptor_";
pub const INTERCEPTOR_PREFIX_LEN: usize = 14;

/// Name of the synthetic root every call chain must terminate at (besides
/// nodes with no predecessors).
pub const ENTRY_FUNCTION: &str = "main";

/// A node may appear in an enumerated call chain at most this many times
/// before that branch of the search is pruned.
pub const MAX_NODE_OCCURRENCES: usize = 2;

pub fn is_reserved_keyword(name: &str) -> bool {
    RESERVED_KEYWORDS.contains(&name)
}

pub fn has_reserved_substring(name: &str) -> bool {
    RESERVED_SUBSTRINGS.iter().any(|s| name.contains(s))
}

pub fn is_numeric_literal(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_digit())
}

/// Whether `name` should be accepted as a tainted variable candidate.
pub fn is_trackable_identifier(name: &str) -> bool {
    !name.is_empty()
        && !is_numeric_literal(name)
        && !is_reserved_keyword(name)
        && !has_reserved_substring(name)
}
