use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tainttrace_core::constants::{INTERCEPTOR_PREFIX, INTERCEPTOR_PREFIX_LEN, MAX_NODE_OCCURRENCES};
use tainttrace_core::{PollutionInfo, Result};
use tracing::debug;

use crate::node::{Node, NodeId};

#[derive(Debug, Deserialize)]
struct PollutionInfoWire {
    #[serde(default)]
    var: Vec<String>,
    #[serde(default)]
    index: Vec<String>,
}

/// The full call graph plus the auxiliary inputs (backtrace frames, macro
/// definitions, pollution seeds) loaded alongside it.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<String, NodeId>,
    backtrace: Vec<String>,
    definitions: HashMap<String, Vec<String>>,
    pollution_infos: HashMap<String, PollutionInfo>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct functions currently in the graph.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn definitions(&self) -> &HashMap<String, Vec<String>> {
        &self.definitions
    }

    pub fn pollution_infos(&self) -> &HashMap<String, PollutionInfo> {
        &self.pollution_infos
    }

    pub fn add_node(&mut self, name: &str) -> NodeId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(Node::new(name));
        self.index.insert(name.to_string(), id);
        id
    }

    /// Records one observed call edge `caller -> callee`, creating either
    /// node if it does not already exist. Calling this again for the same
    /// pair increases that edge's multiplicity rather than duplicating it.
    pub fn add_call(&mut self, caller: &str, callee: &str) {
        let caller_id = self.add_node(caller);
        let callee_id = self.add_node(callee);
        self.nodes[caller_id].add_successor(callee_id);
        self.nodes[callee_id].record_call();
    }

    /// Parses a sanitizer backtrace (one frame per line, newest/innermost
    /// first) into the frame list used by [`Graph::add_backtrace`].
    ///
    /// Each frame is expected to look like `#3 0x... in foo(...) file.c:12`;
    /// parenthesized argument lists are stripped before splitting on
    /// whitespace, and the fourth whitespace-separated token is taken as the
    /// function name. Lines yielding fewer than four tokens are skipped.
    pub fn parse_asan_output(&mut self, path: &Path) -> Result<()> {
        let contents = fs::read_to_string(path)?;
        for line in contents.lines() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() {
                continue;
            }
            let stripped = strip_first_parens(trimmed);
            let tokens: Vec<&str> = stripped.split_whitespace().collect();
            if tokens.len() < 4 {
                debug!(line = trimmed, "skipping backtrace line with fewer than 4 tokens");
                continue;
            }
            self.backtrace.push(tokens[3].to_string());
        }
        Ok(())
    }

    /// Adds call edges along the parsed backtrace. The backtrace is stored
    /// innermost-frame-first (as ASan prints it); reversing it yields
    /// outermost-first order, and each consecutive pair in that reversed
    /// order becomes a `caller -> callee` edge. For a backtrace `[a, b, c]`
    /// (a innermost) this adds edges `c -> b` and `b -> a`.
    pub fn add_backtrace(&mut self) {
        let reversed: Vec<String> = self.backtrace.iter().rev().cloned().collect();
        for pair in reversed.windows(2) {
            self.add_call(&pair[0], &pair[1]);
        }
    }

    /// Strips the `__interceptor_` prefix sanitizer instrumentation adds to
    /// intercepted libc symbols, unifying e.g. `__interceptor_strcpy` and
    /// `strcpy` under one node name. Idempotent: once no node carries the
    /// prefix, a second call is a no-op.
    pub fn remove_interceptors(&mut self) {
        let renames: Vec<(NodeId, String)> = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(id, node)| {
                node.name()
                    .starts_with(INTERCEPTOR_PREFIX)
                    .then(|| (id, node.name()[INTERCEPTOR_PREFIX_LEN..].to_string()))
            })
            .collect();
        for (id, new_name) in renames {
            self.index.remove(self.nodes[id].name());
            self.nodes[id].change_name(&new_name);
            self.index.insert(new_name, id);
        }
    }

    /// Loads macro/alias definitions (function name -> names it should be
    /// treated as equivalent to during taint propagation) from a JSON file.
    /// Read exactly once; the original implementation read this file twice
    /// into the same variable, which was a no-op bug, not intended behavior.
    pub fn load_definitions(&mut self, path: &Path) -> Result<()> {
        let file = fs::File::open(path)?;
        let definitions: HashMap<String, Vec<String>> = serde_json::from_reader(file)?;
        self.definitions = definitions;
        Ok(())
    }

    /// Loads pollution seeds (function name -> tainted locals/slots) from a
    /// JSON file.
    pub fn load_pollution_info(&mut self, path: &Path) -> Result<()> {
        let file = fs::File::open(path)?;
        let wire: HashMap<String, PollutionInfoWire> = serde_json::from_reader(file)?;
        self.pollution_infos = wire
            .into_iter()
            .map(|(name, info)| {
                (
                    name,
                    PollutionInfo {
                        var: info.var.into_iter().collect(),
                        index: info.index.into_iter().collect(),
                    },
                )
            })
            .collect();
        Ok(())
    }

    /// Builds the reverse adjacency list (predecessors for every node,
    /// including nodes with none).
    fn predecessors(&self) -> HashMap<NodeId, Vec<NodeId>> {
        let mut preds: HashMap<NodeId, Vec<NodeId>> =
            (0..self.nodes.len()).map(|id| (id, Vec::new())).collect();
        for (caller, node) in self.nodes.iter().enumerate() {
            for &(callee, _) in node.successors() {
                preds.entry(callee).or_default().push(caller);
            }
        }
        preds
    }

    /// Enumerates every call chain from a root (`main`, or any node with no
    /// predecessors) down to `sink`, walking the reverse graph. A node may
    /// occur at most twice in any single chain; branches that would exceed
    /// that are pruned rather than explored further. Each returned path is
    /// in forward (root-first, sink-last) order.
    pub fn find_all_call_chains(&self, sink: NodeId) -> Vec<Vec<NodeId>> {
        let preds = self.predecessors();
        let mut chains = Vec::new();
        let mut path = vec![sink];
        self.dfs(sink, &preds, &mut path, &mut chains);
        chains
    }

    fn dfs(
        &self,
        current: NodeId,
        preds: &HashMap<NodeId, Vec<NodeId>>,
        path: &mut Vec<NodeId>,
        chains: &mut Vec<Vec<NodeId>>,
    ) {
        let current_preds = preds.get(&current).map(Vec::as_slice).unwrap_or(&[]);
        let at_root = current_preds.is_empty() || self.nodes[current].name() == "main";
        if at_root {
            chains.push(path.iter().rev().copied().collect());
            return;
        }
        for &pred in current_preds {
            let occurrences = path.iter().filter(|&&n| n == pred).count();
            if occurrences >= MAX_NODE_OCCURRENCES {
                continue;
            }
            path.push(pred);
            self.dfs(pred, preds, path, chains);
            path.pop();
        }
    }
}

/// Removes the substring between the first `(` and the next `)` in `line`,
/// matching the original's `line.substr(0, left) + line.substr(right + 1)`.
/// Only the first parenthesised span is stripped, not every one, and a line
/// with no matching pair is returned unchanged.
fn strip_first_parens(line: &str) -> String {
    let Some(left) = line.find('(') else {
        return line.to_string();
    };
    let Some(right) = line.find(')') else {
        return line.to_string();
    };
    let mut out = String::with_capacity(line.len());
    out.push_str(&line[..left]);
    out.push_str(&line[right + ')'.len_utf8()..]);
    out
}
