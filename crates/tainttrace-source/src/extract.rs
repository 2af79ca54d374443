use tainttrace_core::constants::{has_reserved_substring, is_reserved_keyword};
use tainttrace_core::traits::SourceXmlEngine;
use tainttrace_core::Result;

use crate::xml::{self, XmlNode};

/// Extracts the variable names and callee names referenced by one code
/// element, dispatching on its srcML element kind the way the engine's
/// per-kind handlers do.
///
/// - `decl`/`expr` are rendered to srcML and walked for `<name>` and
///   `<call>` elements.
/// - `call` additionally uses a flat positional character scan over the
///   raw text, since argument order (not just identity) matters there.
/// - `parameter` is a bare whitespace split: the original analyzer never
///   runs parameters through srcML, so a leading type token is extracted
///   as its own "variable" alongside the real name.
pub fn extract_variables(
    content: &str,
    kind: &str,
    xml_engine: &dyn SourceXmlEngine,
) -> Result<(Vec<String>, Vec<(String, bool)>)> {
    match kind {
        "decl" | "expr" => {
            let rendered = xml_engine.render(content)?;
            let variables = extract_variables_from_xml(&rendered)?;
            let calls = extract_function_from_xml(&rendered)?;
            Ok((variables, calls))
        }
        "call" => {
            let variables = extract_from_call(content);
            let rendered = xml_engine.render(content)?;
            let calls = extract_function_from_xml(&rendered)?;
            Ok((variables, calls))
        }
        "parameter" => {
            let variables = content.split_whitespace().map(String::from).collect();
            Ok((variables, Vec::new()))
        }
        _ => Ok((Vec::new(), Vec::new())),
    }
}

/// Selects every `<name>` element that is not nested under a `<type>`, is
/// not the direct child of a `<call>`/`<macro>` element, is not preceded by
/// a `->` operator sibling, and has no `<index>` child — i.e. names that
/// denote a plain local variable reference rather than a type, a callee, a
/// struct member access, or an array/pointer index target.
pub fn extract_variables_from_xml(xml: &str) -> Result<Vec<String>> {
    let document = xml::parse_tree(xml)?;
    let mut names = Vec::new();
    collect_names(&document, false, &mut names);
    names.retain(|n| !is_reserved_keyword(n) && !has_reserved_substring(n));
    names.sort();
    names.dedup();
    Ok(names)
}

fn collect_names(parent: &XmlNode, in_type_ancestor: bool, out: &mut Vec<String>) {
    let this_in_type = in_type_ancestor || parent.name == "type";
    let elements: Vec<&XmlNode> = parent.elements().collect();
    for (i, e) in elements.iter().enumerate() {
        if e.name == "name" {
            let excluded = this_in_type
                || parent.name == "call"
                || parent.name == "macro"
                || e.find_child("index").is_some()
                || elements[..i]
                    .iter()
                    .any(|sib| sib.name == "operator" && sib.text_content() == "->");
            if !excluded {
                out.push(e.text_content());
            }
        }
        collect_names(e, this_in_type, out);
    }
}

/// Finds every `<call><name>...</name></call>` pair in the document,
/// reporting the callee name (with all whitespace stripped) and whether its
/// `<argument_list>` carries at least one `<argument>`.
pub fn extract_function_from_xml(xml: &str) -> Result<Vec<(String, bool)>> {
    let document = xml::parse_tree(xml)?;
    let mut calls = Vec::new();
    collect_calls(&document, &mut calls);
    Ok(calls)
}

fn collect_calls(node: &XmlNode, out: &mut Vec<(String, bool)>) {
    for e in node.elements() {
        if e.name == "call" {
            if let Some(name_node) = e.find_child("name") {
                let func_name: String = name_node
                    .text_content()
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
                let has_arguments = e
                    .find_child("argument_list")
                    .map(|al| al.elements().any(|c| c.name == "argument"))
                    .unwrap_or(false);
                if !func_name.is_empty() {
                    out.push((func_name, has_arguments));
                }
            }
        }
        collect_calls(e, out);
    }
}

/// Pulls comma-separated argument names out of a call's raw text via a flat
/// character scan rather than an XML walk: `strcpy(dst, src)` yields
/// `["dst", "src"]`. Tracks only a single `in_brackets` flag, not paren
/// depth: a nested call's opening `(` leaves the buffer untouched (so its
/// name keeps accumulating into whatever follows), and its closing `)`
/// flushes the buffer like any other close. `f(a, g(b, c))` therefore
/// yields `["a", "gb", "c"]`, not `["a", "g"]` — this is the original
/// tool's observable behavior, not a redesign.
pub fn extract_from_call(expression: &str) -> Vec<String> {
    let mut vars = Vec::new();
    let mut buffer = String::new();
    let mut in_brackets = false;
    for c in expression.chars() {
        if c == '(' {
            in_brackets = true;
        } else if c == ')' {
            if !buffer.is_empty() {
                vars.push(std::mem::take(&mut buffer));
            }
            in_brackets = false;
        } else if in_brackets {
            if c.is_alphanumeric() || c == '_' {
                buffer.push(c);
            } else if c == ',' {
                vars.push(std::mem::take(&mut buffer));
            } else if c.is_whitespace() && !buffer.is_empty() {
                vars.push(std::mem::take(&mut buffer));
            }
        }
    }
    vars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_call_splits_positional_args() {
        let vars = extract_from_call("strcpy(dst, src)");
        assert_eq!(vars, vec!["dst", "src"]);
    }

    #[test]
    fn test_extract_from_call_keeps_blank_slot_for_optimized_literal() {
        let vars = extract_from_call("log(tag, , code)");
        assert_eq!(vars, vec!["tag", "", "code"]);
    }

    #[test]
    fn test_extract_from_call_glues_nested_call_name_to_its_first_arg() {
        let vars = extract_from_call("f(a, g(b, c))");
        assert_eq!(vars, vec!["a", "gb", "c"]);
    }

    #[test]
    fn test_extract_variables_from_xml_excludes_type_and_call_children() {
        let xml = r#"<unit><decl><type><name>int</name></type> <name>count</name></decl>
            <expr><call><name>strcpy</name></call></expr></unit>"#;
        let names = extract_variables_from_xml(xml).unwrap();
        assert!(names.contains(&"count".to_string()));
        assert!(!names.contains(&"strcpy".to_string()));
    }

    #[test]
    fn test_extract_variables_excludes_arrow_member_and_index() {
        let xml = r#"<unit><expr>
            <name>p</name><operator>-&gt;</operator><name>field</name>
            <name>arr<index>[<expr><name>i</name></expr>]</index></name>
        </expr></unit>"#;
        let names = extract_variables_from_xml(xml).unwrap();
        assert!(names.contains(&"p".to_string()));
        assert!(names.contains(&"i".to_string()));
        assert!(!names.contains(&"field".to_string()));
        assert!(!names.contains(&"arr".to_string()));
    }

    #[test]
    fn test_extract_function_from_xml_detects_arguments() {
        let xml = r#"<unit><expr><call><name>strcpy</name><argument_list>(<argument><name>dst</name></argument>)</argument_list></call></expr>
            <expr><call><name>wipe</name><argument_list>()</argument_list></call></expr></unit>"#;
        let calls = extract_function_from_xml(xml).unwrap();
        assert!(calls.contains(&("strcpy".to_string(), true)));
        assert!(calls.contains(&("wipe".to_string(), false)));
    }
}
