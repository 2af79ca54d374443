use std::collections::{HashMap, HashSet};

use tainttrace_core::constants::is_numeric_literal;
use tainttrace_core::traits::SourceXmlEngine;
use tainttrace_core::types::{Direction, Slot};
use tainttrace_core::Result;
use tainttrace_graph::Graph;
use tainttrace_source::extract::{extract_from_call, extract_variables};
use tainttrace_source::CodeElement;
use tracing::debug;

use crate::taint_map::TaintMap;
use crate::worklist::WorklistItem;

fn call_target_name(content: &str) -> &str {
    content.split('(').next().unwrap_or(content).trim()
}

/// Dispatches one function's element stream to backward or forward
/// propagation, seeding `tainted_variables` from the function's existing
/// entry (if any) and `tainted_variables_prev` from `previous_function`'s
/// tainted slots.
#[allow(clippy::too_many_arguments)]
pub fn taint_analysis(
    stmts: &[CodeElement],
    taint_map: &mut TaintMap,
    worklist: &mut Vec<WorklistItem>,
    definitions: &HashMap<String, Vec<String>>,
    graph: &Graph,
    xml_engine: &dyn SourceXmlEngine,
    current_function: &str,
    previous_function: &str,
    is_forward: bool,
    force_track: bool,
) -> Result<()> {
    let start_to_track = is_forward;
    taint_map.entry(current_function);
    let mut tainted_variables = taint_map.locals_of(current_function);
    let tainted_variables_prev = taint_map.slots_of(previous_function);

    debug!(current_function, previous_function, is_forward, "running taint analysis");

    if is_forward {
        forward_taint_analysis(
            stmts,
            taint_map,
            worklist,
            graph,
            xml_engine,
            current_function,
            previous_function,
            &mut tainted_variables,
            start_to_track,
        )?;
    } else {
        backward_taint_analysis(
            stmts,
            taint_map,
            definitions,
            xml_engine,
            current_function,
            previous_function,
            &mut tainted_variables,
            &tainted_variables_prev,
            force_track,
            start_to_track,
        )?;
    }
    Ok(())
}

/// Walks `stmts` in reverse, gating on reaching the call to
/// `previous_function` (directly or via a name in `definitions`) before it
/// starts tracking, unless `force_track` skips the gate entirely.
#[allow(clippy::too_many_arguments)]
pub fn backward_taint_analysis(
    stmts: &[CodeElement],
    taint_map: &mut TaintMap,
    definitions: &HashMap<String, Vec<String>>,
    xml_engine: &dyn SourceXmlEngine,
    current_function: &str,
    previous_function: &str,
    tainted_variables: &mut HashSet<String>,
    tainted_variables_prev: &HashSet<String>,
    force_track: bool,
    mut start_to_track: bool,
) -> Result<()> {
    let mut parameter_index = 0usize;

    for stmt in stmts.iter().rev() {
        if !force_track {
            if stmt.kind == "call" && !start_to_track {
                let func_name = call_target_name(&stmt.content);
                if func_name == previous_function {
                    start_to_track = true;
                } else if definitions
                    .get(func_name)
                    .is_some_and(|aliases| aliases.iter().any(|a| a == previous_function))
                {
                    start_to_track = true;
                }
            }
            if !start_to_track {
                continue;
            }
        }

        let (variables, _calls) = extract_variables(&stmt.content, &stmt.kind, xml_engine)?;

        match stmt.kind.as_str() {
            "decl" | "expr" => {
                if variables.iter().any(|v| tainted_variables.contains(v)) {
                    for var in &variables {
                        if is_numeric_literal(var) {
                            continue;
                        }
                        tainted_variables.insert(var.clone());
                    }
                }
            }
            "call" => {
                let func_name = call_target_name(&stmt.content);
                if func_name == previous_function {
                    for slot in tainted_variables_prev {
                        if let Some(rest) = slot.strip_prefix('#') {
                            if let Ok(index) = rest.parse::<usize>() {
                                if let Some(arg) = variables.get(index) {
                                    if !is_numeric_literal(arg) {
                                        tainted_variables.insert(arg.clone());
                                    }
                                }
                            }
                        } else if slot.starts_with('$') {
                            for var in &variables {
                                if !is_numeric_literal(var) {
                                    tainted_variables.insert(var.clone());
                                }
                            }
                        }
                    }
                } else {
                    for var in &variables {
                        if !is_numeric_literal(var) {
                            tainted_variables.insert(var.clone());
                        }
                    }
                }
            }
            "return" => {
                if taint_map.slots_of(current_function).contains("$*") {
                    for var in &variables {
                        if !is_numeric_literal(var) {
                            tainted_variables.insert(var.clone());
                        }
                    }
                }
                for (index, var) in variables.iter().enumerate() {
                    if tainted_variables.contains(var) {
                        taint_map.insert_slot(current_function, Slot::Return(index));
                    }
                }
            }
            "parameter" => {
                for var in &variables {
                    if tainted_variables.contains(var) {
                        taint_map.insert_slot(current_function, Slot::Parameter(parameter_index));
                    }
                    parameter_index += 1;
                }
            }
            _ => {}
        }
    }

    for var in tainted_variables.iter() {
        taint_map.insert_local(current_function, var);
    }
    Ok(())
}

/// Walks `stmts` forward, tracking until it passes the call to
/// `previous_function`, pushing newly-discovered callees onto `worklist`.
#[allow(clippy::too_many_arguments)]
pub fn forward_taint_analysis(
    stmts: &[CodeElement],
    taint_map: &mut TaintMap,
    worklist: &mut Vec<WorklistItem>,
    graph: &Graph,
    xml_engine: &dyn SourceXmlEngine,
    current_function: &str,
    previous_function: &str,
    tainted_variables: &mut HashSet<String>,
    mut start_to_track: bool,
) -> Result<()> {
    let mut parameters: Vec<String> = Vec::new();

    for stmt in stmts {
        if stmt.kind == "call" && start_to_track {
            let func_name = call_target_name(&stmt.content);
            if func_name == previous_function {
                start_to_track = false;
            }
        }
        if !start_to_track {
            continue;
        }

        let (variables, calls) = extract_variables(&stmt.content, &stmt.kind, xml_engine)?;

        match stmt.kind.as_str() {
            "decl" => {
                if variables.iter().any(|v| tainted_variables.contains(v)) {
                    for var in &variables {
                        if is_numeric_literal(var) {
                            continue;
                        }
                        tainted_variables.insert(var.clone());
                        for (callee, has_arguments) in &calls {
                            worklist.push(WorklistItem::new(
                                callee.clone(),
                                if *has_arguments {
                                    Direction::Forward
                                } else {
                                    Direction::Backward
                                },
                            ));
                            if !has_arguments {
                                taint_map.insert_slot(callee, Slot::ReturnWildcard);
                            }
                        }
                    }
                }
            }
            "expr" => {
                if variables.iter().any(|v| tainted_variables.contains(v)) {
                    for var in &variables {
                        if is_numeric_literal(var) {
                            continue;
                        }
                        tainted_variables.insert(var.clone());
                    }
                }
            }
            "call" => {
                let callee_name = call_target_name(&stmt.content).to_string();
                if graph.find_node(&callee_name).is_none() {
                    continue;
                }
                let arguments = extract_from_call(&stmt.content);
                for (index, arg) in arguments.iter().enumerate() {
                    if tainted_variables.contains(arg) {
                        taint_map.insert_slot(&callee_name, Slot::Parameter(index));
                        worklist.push(WorklistItem::forward(callee_name.clone()));
                        break;
                    }
                }
            }
            "return" => {}
            "parameter" => {
                let tainted_indices: HashSet<usize> = taint_map
                    .slots_of(current_function)
                    .iter()
                    .filter_map(|s| s.strip_prefix('#').and_then(|r| r.parse().ok()))
                    .collect();
                for var in &variables {
                    parameters.push(var.clone());
                    let index = parameters.len() - 1;
                    if tainted_indices.contains(&index) {
                        if is_numeric_literal(var) {
                            continue;
                        }
                        tainted_variables.insert(var.clone());
                    }
                }
            }
            _ => {}
        }
    }

    for var in tainted_variables.iter() {
        taint_map.insert_local(current_function, var);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedXml(&'static str);
    impl SourceXmlEngine for CannedXml {
        fn render(&self, _preprocessed: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn decl(content: &str, func: &str) -> CodeElement {
        CodeElement {
            kind: "decl".into(),
            content: content.into(),
            function_name: func.into(),
        }
    }

    fn call(content: &str, func: &str) -> CodeElement {
        CodeElement {
            kind: "call".into(),
            content: content.into(),
            function_name: func.into(),
        }
    }

    fn parameter(content: &str, func: &str) -> CodeElement {
        CodeElement {
            kind: "parameter".into(),
            content: content.into(),
            function_name: func.into(),
        }
    }

    #[test]
    fn test_backward_propagates_from_tainted_call_argument() {
        let xml_engine = CannedXml("<unit><decl><name>buf</name></decl></unit>");
        let stmts = vec![
            decl("char buf", "vulnerable_copy"),
            call("memcpy(buf, input, len)", "vulnerable_copy"),
        ];
        let mut taint_map = TaintMap::new();
        taint_map.insert_slot("memcpy", Slot::Parameter(1));
        let definitions = HashMap::new();
        let mut tainted = HashSet::new();
        let prev = taint_map.slots_of("memcpy");

        backward_taint_analysis(
            &stmts,
            &mut taint_map,
            &definitions,
            &xml_engine,
            "vulnerable_copy",
            "memcpy",
            &mut tainted,
            &prev,
            false,
            false,
        )
        .unwrap();

        assert!(taint_map.locals_of("vulnerable_copy").contains("input"));
    }

    #[test]
    fn test_backward_return_wildcard_taints_all_return_vars() {
        let xml_engine = CannedXml("<unit><name>x</name></unit>");
        let stmts = vec![CodeElement {
            kind: "return".into(),
            content: "x".into(),
            function_name: "f".into(),
        }];
        let mut taint_map = TaintMap::new();
        taint_map.insert_slot("f", Slot::ReturnWildcard);
        let definitions = HashMap::new();
        let mut tainted = HashSet::new();
        let prev = HashSet::new();

        backward_taint_analysis(
            &stmts,
            &mut taint_map,
            &definitions,
            &xml_engine,
            "f",
            "",
            &mut tainted,
            &prev,
            true,
            false,
        )
        .unwrap();

        assert!(taint_map.locals_of("f").contains("x"));
        assert!(taint_map.slots_of("f").contains("$0"));
    }

    #[test]
    fn test_forward_stops_after_first_tainted_argument() {
        let mut graph = Graph::new();
        graph.add_node("sink");
        let xml_engine = CannedXml("<unit></unit>");
        let stmts = vec![call("sink(a, b, c)", "caller")];
        let mut taint_map = TaintMap::new();
        let mut worklist = Vec::new();
        let mut tainted: HashSet<String> = ["a".to_string(), "b".to_string()].into_iter().collect();

        forward_taint_analysis(
            &stmts,
            &mut taint_map,
            &mut worklist,
            &graph,
            &xml_engine,
            "caller",
            "",
            &mut tainted,
            true,
        )
        .unwrap();

        let slots = taint_map.slots_of("sink");
        assert!(slots.contains("#0"));
        assert!(!slots.contains("#1"));
        assert_eq!(worklist.len(), 1);
    }

    #[test]
    fn test_forward_parameter_gating_uses_positional_slot() {
        let xml_engine = CannedXml("<unit></unit>");
        let stmts = vec![parameter("int count", "f")];
        let mut taint_map = TaintMap::new();
        taint_map.insert_slot("f", Slot::Parameter(1));
        let mut worklist = Vec::new();
        let graph = Graph::new();
        let mut tainted = HashSet::new();

        forward_taint_analysis(
            &stmts,
            &mut taint_map,
            &mut worklist,
            &graph,
            &xml_engine,
            "f",
            "",
            &mut tainted,
            true,
        )
        .unwrap();

        assert!(tainted.contains("count"));
    }
}
