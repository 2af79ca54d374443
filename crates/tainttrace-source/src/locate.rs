use std::path::Path;

use tainttrace_core::traits::{LineResolver, SymbolTableReader};
use tainttrace_core::types::FunctionLocation;
use tainttrace_core::Result;
use tracing::debug;

/// Resolves a function name to the source file and line range it was
/// compiled from, by combining a symbol-table lookup (address + size) with
/// a line-info resolver walked outward from the function's bounds until a
/// defined line is found on each side.
///
/// Returns [`FunctionLocation::unresolved`] rather than an error when the
/// function cannot be placed in source — e.g. it comes from a linked
/// library with no debug info — since callers are expected to skip such
/// functions rather than abort the run.
pub struct FunctionLocator<'a> {
    symbols: &'a dyn SymbolTableReader,
    lines: &'a dyn LineResolver,
}

impl<'a> FunctionLocator<'a> {
    pub fn new(symbols: &'a dyn SymbolTableReader, lines: &'a dyn LineResolver) -> Self {
        Self { symbols, lines }
    }

    pub fn locate(&self, binary: &Path, function: &str) -> Result<FunctionLocation> {
        let Some(entry) = self.symbols.lookup(binary, function)? else {
            debug!(function, "no symbol table entry, skipping");
            return Ok(FunctionLocation::unresolved());
        };

        let base = entry.address.saturating_sub(1);
        let limit = base.saturating_add(entry.size);

        let mut forward = base;
        let mut forward_hit = self.lines.resolve(binary, forward)?;
        while forward_hit.is_none() && forward < limit {
            forward += 1;
            forward_hit = self.lines.resolve(binary, forward)?;
        }

        let mut backward = limit;
        let mut backward_hit = self.lines.resolve(binary, backward)?;
        while backward_hit.is_none() && backward > base {
            backward -= 1;
            backward_hit = self.lines.resolve(binary, backward)?;
        }

        match (forward_hit, backward_hit) {
            (Some((file, start_line)), Some((_, end_line))) => Ok(FunctionLocation::new(
                file.to_string_lossy().to_string(),
                start_line,
                end_line,
            )),
            _ => {
                debug!(function, "could not resolve line info, skipping");
                Ok(FunctionLocation::unresolved())
            }
        }
    }
}
