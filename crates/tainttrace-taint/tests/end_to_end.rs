//! End-to-end exercise of `Traversal::run` against the minimal backward seed
//! propagation scenario: a chain `main -> processData -> combineData` where
//! `combineData`'s first parameter is seeded tainted, and `processData`
//! forwards its own first parameter into that call.
//!
//! The symbol table, line resolver and srcML engine are faked; only the
//! graph construction, pollution-info JSON loading, preprocessing and
//! element-extraction/taint-propagation machinery is real.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use tainttrace_core::traits::{LineRangeExtractor, LineResolver, SourceXmlEngine, SymbolEntry, SymbolTableReader};
use tainttrace_core::Result;
use tainttrace_graph::Graph;
use tainttrace_source::FunctionLocator;
use tainttrace_taint::Traversal;

struct FixtureSymbols(HashMap<&'static str, SymbolEntry>);

impl SymbolTableReader for FixtureSymbols {
    fn lookup(&self, _binary: &Path, function: &str) -> Result<Option<SymbolEntry>> {
        Ok(self.0.get(function).copied())
    }
}

struct FixtureLines(HashMap<u64, (PathBuf, u32)>);

impl LineResolver for FixtureLines {
    fn resolve(&self, _binary: &Path, address: u64) -> Result<Option<(PathBuf, u32)>> {
        Ok(self.0.get(&address).cloned())
    }
}

struct FixtureSources(HashMap<&'static str, &'static str>);

impl LineRangeExtractor for FixtureSources {
    fn extract(&self, file: &Path, _start_line: u32, _end_line: u32) -> Result<String> {
        let name = file.to_string_lossy().to_string();
        Ok(self.0.get(name.as_str()).copied().unwrap_or("").to_string())
    }
}

/// Resolves by marker substring rather than invoking a real `srcml`: the
/// preprocessed single-line source for each fixture function still contains
/// its own name, so matching on that is enough to hand back the matching
/// canned document.
struct FixtureXml(Vec<(&'static str, &'static str)>);

impl SourceXmlEngine for FixtureXml {
    fn render(&self, preprocessed: &str) -> Result<String> {
        for (marker, xml) in &self.0 {
            if preprocessed.contains(marker) {
                return Ok(xml.to_string());
            }
        }
        Ok("<unit></unit>".to_string())
    }
}

const PROCESS_DATA_SOURCE: &str = "void processData ( int initialSize ) { \
    int additionalValue = 5 ; \
    combineData ( initialSize , additionalValue ) ; \
}";

const PROCESS_DATA_XML: &str = r#"<unit><function>
  <type><name>void</name></type> <name>processData</name>
  <parameter_list>(<parameter><type><name>int</name></type> <name>initialSize</name></parameter>)</parameter_list>
  <block>{
    <decl_stmt><decl><type><name>int</name></type> <name>additionalValue</name></decl>;</decl_stmt>
    <expr_stmt><expr><call><name>combineData</name><argument_list>(<argument><name>initialSize</name></argument>, <argument><name>additionalValue</name></argument>)</argument_list></call></expr>;</expr_stmt>
  }</block>
</function></unit>"#;

const COMBINE_DATA_SOURCE: &str = "void combineData ( int first , int second ) { }";

const COMBINE_DATA_XML: &str = r#"<unit><function>
  <type><name>void</name></type> <name>combineData</name>
  <parameter_list>(<parameter><type><name>int</name></type> <name>first</name></parameter>, <parameter><type><name>int</name></type> <name>second</name></parameter>)</parameter_list>
  <block>{ }</block>
</function></unit>"#;

#[test]
fn test_backward_seed_propagation_end_to_end() {
    let mut graph = Graph::new();
    graph.add_call("main", "processData");
    graph.add_call("processData", "combineData");

    let mut pollution_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        pollution_file,
        r#"{{"combineData": {{"var": [], "index": ["#0"]}}}}"#
    )
    .unwrap();
    graph.load_pollution_info(pollution_file.path()).unwrap();

    let symbols = FixtureSymbols(HashMap::from([
        ("processData", SymbolEntry { address: 0x100, size: 1 }),
        ("combineData", SymbolEntry { address: 0x200, size: 1 }),
    ]));
    let lines = FixtureLines(HashMap::from([
        (0x100, (PathBuf::from("processData.c"), 1u32)),
        (0x200, (PathBuf::from("combineData.c"), 1u32)),
    ]));
    let locator = FunctionLocator::new(&symbols, &lines);

    let sources = FixtureSources(HashMap::from([
        ("processData.c", PROCESS_DATA_SOURCE),
        ("combineData.c", COMBINE_DATA_SOURCE),
    ]));

    let xml_engine = FixtureXml(vec![
        ("processData", PROCESS_DATA_XML),
        ("combineData", COMBINE_DATA_XML),
    ]);

    let binary = PathBuf::from("/bin/vulnerable-app");
    let traversal = Traversal::new(&graph, &locator, &sources, &xml_engine, &binary);

    let taint_map = traversal.run("combineData").unwrap();

    let process_data = taint_map.get("processData").expect("processData entry");
    assert!(
        process_data.locals.contains("initialSize"),
        "expected initialSize to be tainted via combineData's seeded #0, got {:?}",
        process_data.locals
    );
    assert!(
        process_data.slots.contains("#0"),
        "expected processData's own first parameter to end up tainted, got {:?}",
        process_data.slots
    );
    assert!(
        !process_data.locals.contains("additionalValue"),
        "additionalValue was never tainted by the seed and should stay clean"
    );
}

#[test]
fn test_sink_absent_from_graph_returns_empty_map() {
    let graph = Graph::new();
    let symbols = FixtureSymbols(HashMap::new());
    let lines = FixtureLines(HashMap::new());
    let locator = FunctionLocator::new(&symbols, &lines);
    let sources = FixtureSources(HashMap::new());
    let xml_engine = FixtureXml(vec![]);
    let binary = PathBuf::from("/bin/app");

    let traversal = Traversal::new(&graph, &locator, &sources, &xml_engine, &binary);
    let taint_map = traversal.run("strcpy").unwrap();
    assert!(taint_map.get("strcpy").is_none());
}
