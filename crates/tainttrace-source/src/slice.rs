use std::sync::OnceLock;

use regex::Regex;

fn cast_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(reinterpret_cast|static_cast|dynamic_cast|const_cast)\s*<\s*([^>]+)\s*>\s*\(\s*([^()]+)\s*\)",
        )
        .unwrap()
    })
}

fn c_cast_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\(\s*[a-zA-Z_:][a-zA-Z0-9_:<>\*&\s]*\s*\)\s*([a-zA-Z_][a-zA-Z0-9_]*)\b").unwrap()
    })
}

fn sizeof_with_parens_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"sizeof\s*\(\s*([^()]+?)\s*\)").unwrap())
}

fn sizeof_without_parens_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"sizeof\s+([a-zA-Z_:][a-zA-Z0-9_:<>]*)").unwrap())
}

/// Strips casts, `sizeof`, comments and string literals from source text and
/// collapses it onto one line, the way the engine wants code handed to
/// srcML: one statement-per-token-stream, no noise that would otherwise
/// surface as spurious variable names.
pub fn preprocess_code(code: &str) -> String {
    let mut output = String::new();
    for raw_line in code.lines() {
        let mut line = cast_regex().replace_all(raw_line, "$3").into_owned();
        line = c_cast_regex().replace_all(&line, "$1").into_owned();
        line = sizeof_with_parens_regex()
            .replace_all(&line, "$1")
            .into_owned();
        line = sizeof_without_parens_regex()
            .replace_all(&line, "$1")
            .into_owned();

        if let Some(pos) = line.find("//") {
            line.truncate(pos);
        }

        if let (Some(start), Some(end)) = (line.find("/*"), line.find("*/")) {
            if end > start {
                line = format!("{}{}", &line[..start], &line[end + 2..]);
            }
        }

        let trimmed = line.trim_matches(|c| c == ' ' || c == '\t');
        if trimmed.is_empty() {
            continue;
        }
        line = trimmed.to_string();

        loop {
            let Some(start) = line.find('"') else { break };
            let Some(end) = line[start + 1..].find('"').map(|p| p + start + 1) else {
                break;
            };
            line = format!("{}{}", &line[..start], &line[end + 1..]);
        }

        output.push_str(&line);
        output.push(' ');
    }
    output
}

/// Strips leading stray `}` characters left over when the awk-extracted
/// range starts mid-block (the extraction range is end-of-previous-function
/// inclusive in the original's line bounds).
pub fn strip_leading_closing_braces(text: &str) -> &str {
    text.trim_start_matches('}')
}
