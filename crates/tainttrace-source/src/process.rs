use std::path::{Path, PathBuf};
use std::process::Command;

use tainttrace_core::traits::{LineResolver, LineRangeExtractor, SourceXmlEngine, SymbolEntry, SymbolTableReader};
use tainttrace_core::{AnalysisError, Result};

/// Runs `nm -S <binary>`, filters to text-section symbols (`T`/`t`) and
/// returns the matching function's address and size.
pub struct NmSymbolTable;

impl SymbolTableReader for NmSymbolTable {
    fn lookup(&self, binary: &Path, function: &str) -> Result<Option<SymbolEntry>> {
        let output = Command::new("nm")
            .arg("-S")
            .arg(binary)
            .output()
            .map_err(|e| AnalysisError::tool_error("nm", e.to_string()))?;
        if !output.status.success() {
            return Ok(None);
        }
        let text = String::from_utf8_lossy(&output.stdout);
        for line in text.lines() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() >= 4
                && (tokens[2] == "T" || tokens[2] == "t")
                && tokens[3] == function
            {
                let address = u64::from_str_radix(tokens[0], 16)
                    .map_err(|e| AnalysisError::tool_error("nm", e.to_string()))?;
                let size = u64::from_str_radix(tokens[1], 16)
                    .map_err(|e| AnalysisError::tool_error("nm", e.to_string()))?;
                return Ok(Some(SymbolEntry { address, size }));
            }
        }
        Ok(None)
    }
}

/// Runs `addr2line -e <binary> -f -C 0x<address>` and parses the two-line
/// `function\nfile:line` response. Returns `Ok(None)` when the line is
/// unknown (`addr2line` prints `?`), which callers use to keep stepping.
pub struct Addr2LineResolver;

impl LineResolver for Addr2LineResolver {
    fn resolve(&self, binary: &Path, address: u64) -> Result<Option<(PathBuf, u32)>> {
        let output = Command::new("addr2line")
            .arg("-e")
            .arg(binary)
            .arg("-f")
            .arg("-C")
            .arg(format!("0x{address:x}"))
            .output()
            .map_err(|e| AnalysisError::tool_error("addr2line", e.to_string()))?;
        if !output.status.success() {
            return Ok(None);
        }
        let text = String::from_utf8_lossy(&output.stdout);
        let Some((_, location_line)) = text.split_once('\n') else {
            return Ok(None);
        };
        let location_line = location_line.trim();
        if location_line.contains('?') {
            return Ok(None);
        }
        let Some((file, line)) = location_line.rsplit_once(':') else {
            return Ok(None);
        };
        let Ok(line_number) = line.trim().parse::<u32>() else {
            return Ok(None);
        };
        Ok(Some((PathBuf::from(file), line_number)))
    }
}

/// Extracts a line range from a source file via `awk 'NR>=start && NR<=end'`.
pub struct AwkLineRangeExtractor;

impl LineRangeExtractor for AwkLineRangeExtractor {
    fn extract(&self, file: &Path, start_line: u32, end_line: u32) -> Result<String> {
        let output = Command::new("awk")
            .arg(format!("NR>={start_line} && NR<={end_line}"))
            .arg(file)
            .output()
            .map_err(|e| AnalysisError::tool_error("awk", e.to_string()))?;
        if !output.status.success() {
            return Err(AnalysisError::tool_error(
                "awk",
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Pipes preprocessed source text through `srcml --language=C++ --position`.
pub struct SrcmlEngine;

impl SourceXmlEngine for SrcmlEngine {
    fn render(&self, preprocessed: &str) -> Result<String> {
        use std::io::Write;
        use std::process::Stdio;

        let mut child = Command::new("srcml")
            .arg("--language=C++")
            .arg("--position")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AnalysisError::tool_error("srcml", e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(preprocessed.as_bytes())
                .map_err(|e| AnalysisError::tool_error("srcml", e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| AnalysisError::tool_error("srcml", e.to_string()))?;
        if !output.status.success() {
            return Err(AnalysisError::tool_error(
                "srcml",
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
