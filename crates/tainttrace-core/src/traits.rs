use std::path::{Path, PathBuf};

use crate::error::Result;

/// A function's entry in the binary's symbol table: its address and size as
/// reported by `nm -S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolEntry {
    pub address: u64,
    pub size: u64,
}

/// Resolves a function name to its symbol-table entry. Implemented in
/// production by shelling out to `nm`; fakeable in tests.
pub trait SymbolTableReader {
    fn lookup(&self, binary: &Path, function: &str) -> Result<Option<SymbolEntry>>;
}

/// Resolves an address within a binary to a source file and line number.
/// Implemented in production by shelling out to `addr2line`; fakeable in
/// tests. Returns `Ok(None)` when the address carries no line information
/// (e.g. stripped debug info), never an error.
pub trait LineResolver {
    fn resolve(&self, binary: &Path, address: u64) -> Result<Option<(PathBuf, u32)>>;
}

/// Renders preprocessed C/C++ source text into a srcML-style XML document.
pub trait SourceXmlEngine {
    fn render(&self, preprocessed: &str) -> Result<String>;
}

/// Extracts a contiguous line range from a source file, analogous to
/// `awk 'NR>=start && NR<=end'`.
pub trait LineRangeExtractor {
    fn extract(&self, file: &Path, start_line: u32, end_line: u32) -> Result<String>;
}
