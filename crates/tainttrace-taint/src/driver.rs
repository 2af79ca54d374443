use std::path::Path;

use tainttrace_core::traits::{LineRangeExtractor, SourceXmlEngine};
use tainttrace_core::types::Direction;
use tainttrace_core::Result;
use tainttrace_graph::{Graph, NodeId};
use tainttrace_source::slice::{preprocess_code, strip_leading_closing_braces};
use tainttrace_source::xml::parse_elements;
use tainttrace_source::{CodeElement, FunctionLocator};
use tracing::{debug, warn};

use crate::engine::taint_analysis;
use crate::taint_map::TaintMap;
use crate::worklist::WorklistItem;

/// Drives the full backtrace-seeded analysis: enumerates every call chain
/// into the sink, runs backward propagation over all of them, then forward
/// propagation over all of them, draining each chain's own follow-up
/// worklist (new callees discovered mid-propagation) before moving to the
/// next chain.
pub struct Traversal<'a> {
    graph: &'a Graph,
    locator: &'a FunctionLocator<'a>,
    line_range: &'a dyn LineRangeExtractor,
    xml_engine: &'a dyn SourceXmlEngine,
    binary: &'a Path,
}

impl<'a> Traversal<'a> {
    pub fn new(
        graph: &'a Graph,
        locator: &'a FunctionLocator<'a>,
        line_range: &'a dyn LineRangeExtractor,
        xml_engine: &'a dyn SourceXmlEngine,
        binary: &'a Path,
    ) -> Self {
        Self {
            graph,
            locator,
            line_range,
            xml_engine,
            binary,
        }
    }

    pub fn run(&self, sink_name: &str) -> Result<TaintMap> {
        let Some(sink) = self.graph.find_node(sink_name) else {
            warn!(sink_name, "sink function not found in call graph");
            return Ok(TaintMap::new());
        };

        let chains = self.graph.find_all_call_chains(sink);
        debug!(chain_count = chains.len(), "enumerated call chains to sink");

        let mut taint_map = TaintMap::new();
        for (name, info) in self.graph.pollution_infos() {
            taint_map.seed(name, info.var.clone(), info.index.clone());
        }

        for chain in &chains {
            self.visit_path(chain, &mut taint_map, Direction::Backward)?;
        }
        for chain in &chains {
            self.visit_path(chain, &mut taint_map, Direction::Forward)?;
        }

        Ok(taint_map)
    }

    fn extract_elements(&self, file: &str, start_line: u32, end_line: u32) -> Result<Vec<CodeElement>> {
        let raw = self
            .line_range
            .extract(Path::new(file), start_line, end_line)?;
        let stripped = strip_leading_closing_braces(&raw);
        let preprocessed = preprocess_code(stripped);
        let xml = self.xml_engine.render(&preprocessed)?;
        parse_elements(&xml, "")
    }

    fn visit_path(&self, path: &[NodeId], taint_map: &mut TaintMap, direction: Direction) -> Result<()> {
        let is_forward = direction == Direction::Forward;
        let mut worklist: Vec<WorklistItem> = Vec::new();

        let mut ordered: Vec<NodeId> = path.to_vec();
        if !is_forward {
            ordered.reverse();
        }
        let path_len = ordered.len();
        let mut previous_function = String::new();

        for i in 0..path_len {
            let current_function = self.graph.node(ordered[i]).name().to_string();
            if is_forward && i + 1 < path_len {
                previous_function = self.graph.node(ordered[i + 1]).name().to_string();
            }

            let location = self.locator.locate(self.binary, &current_function)?;
            if !location.is_resolved() {
                previous_function = current_function;
                continue;
            }

            let elements =
                self.extract_elements(&location.file, location.start_line, location.end_line)?;
            taint_analysis(
                &elements,
                taint_map,
                &mut worklist,
                self.graph.definitions(),
                self.graph,
                self.xml_engine,
                &current_function,
                &previous_function,
                is_forward,
                false,
            )?;

            if !is_forward {
                previous_function = current_function;
            }
        }

        while let Some(item) = worklist.pop() {
            let current_function = item.function;
            let item_is_forward = item.direction == Direction::Forward;

            let location = self.locator.locate(self.binary, &current_function)?;
            if !location.is_resolved() {
                previous_function = current_function;
                continue;
            }

            let elements =
                self.extract_elements(&location.file, location.start_line, location.end_line)?;
            taint_analysis(
                &elements,
                taint_map,
                &mut worklist,
                self.graph.definitions(),
                self.graph,
                self.xml_engine,
                &current_function,
                &previous_function,
                item_is_forward,
                true,
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tainttrace_core::traits::{LineResolver, SymbolEntry, SymbolTableReader};
    use tainttrace_core::types::FunctionLocation;

    struct NoSymbols;
    impl SymbolTableReader for NoSymbols {
        fn lookup(&self, _binary: &Path, _function: &str) -> Result<Option<SymbolEntry>> {
            Ok(None)
        }
    }
    impl LineResolver for NoSymbols {
        fn resolve(&self, _binary: &Path, _address: u64) -> Result<Option<(PathBuf, u32)>> {
            Ok(None)
        }
    }
    struct EmptyLines;
    impl LineRangeExtractor for EmptyLines {
        fn extract(&self, _file: &Path, _start_line: u32, _end_line: u32) -> Result<String> {
            Ok(String::new())
        }
    }
    struct EmptyXml;
    impl SourceXmlEngine for EmptyXml {
        fn render(&self, _preprocessed: &str) -> Result<String> {
            Ok("<unit></unit>".to_string())
        }
    }

    #[test]
    fn test_run_returns_empty_map_when_sink_missing() {
        let graph = Graph::new();
        let fakes = NoSymbols;
        let locator = FunctionLocator::new(&fakes, &fakes);
        let lines = EmptyLines;
        let xml = EmptyXml;
        let binary = PathBuf::from("/bin/app");
        let traversal = Traversal::new(&graph, &locator, &lines, &xml, &binary);
        let taint_map = traversal.run("strcpy").unwrap();
        assert!(taint_map.get("strcpy").is_none());
    }

    #[test]
    fn test_run_skips_unresolvable_functions_without_error() {
        let mut graph = Graph::new();
        graph.add_call("main", "strcpy");
        let fakes = NoSymbols;
        let locator = FunctionLocator::new(&fakes, &fakes);
        let lines = EmptyLines;
        let xml = EmptyXml;
        let binary = PathBuf::from("/bin/app");
        let traversal = Traversal::new(&graph, &locator, &lines, &xml, &binary);
        let result = traversal.run("strcpy");
        assert!(result.is_ok());
    }

    #[test]
    fn test_function_location_sentinel_is_skip_not_error() {
        let loc = FunctionLocation::unresolved();
        assert!(!loc.is_resolved());
    }
}
