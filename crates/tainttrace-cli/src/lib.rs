use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tainttrace_core::Result;
use tainttrace_graph::Graph;
use tainttrace_source::process::{Addr2LineResolver, AwkLineRangeExtractor, NmSymbolTable, SrcmlEngine};
use tainttrace_source::FunctionLocator;
use tainttrace_taint::Traversal;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tainttrace", version, about = "Backtrace-seeded inter-procedural static taint analysis")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all logging except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full backward+forward taint analysis and print the resulting taint map
    Analyze {
        /// Path to the crashing binary
        #[arg(long)]
        binary: PathBuf,

        /// Path to the sanitizer backtrace file
        #[arg(long)]
        backtrace: PathBuf,

        /// Optional runtime call-trace file, merged into the same graph as the backtrace
        #[arg(long)]
        call_trace: Option<PathBuf>,

        /// Function name macro/alias definitions JSON
        #[arg(long)]
        definitions: Option<PathBuf>,

        /// Pollution seed JSON (initial tainted locals/slots per function)
        #[arg(long)]
        pollution: Option<PathBuf>,

        /// Name of the sink function the backtrace crashed in
        #[arg(long)]
        sink: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

pub fn setup_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub fn run(cli: Cli) -> Result<()> {
    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Analyze {
            binary,
            backtrace,
            call_trace,
            definitions,
            pollution,
            sink,
            format,
        } => {
            let mut graph = Graph::new();
            graph.parse_asan_output(&backtrace)?;
            graph.add_backtrace();

            if let Some(call_trace_path) = call_trace {
                graph.parse_asan_output(&call_trace_path)?;
                graph.add_backtrace();
            }

            graph.remove_interceptors();

            if let Some(path) = definitions {
                graph.load_definitions(&path)?;
            }
            if let Some(path) = pollution {
                graph.load_pollution_info(&path)?;
            }

            let symbols = NmSymbolTable;
            let lines = Addr2LineResolver;
            let locator = FunctionLocator::new(&symbols, &lines);
            let line_range = AwkLineRangeExtractor;
            let xml_engine = SrcmlEngine;

            let traversal = Traversal::new(&graph, &locator, &line_range, &xml_engine, &binary);
            let taint_map = traversal.run(&sink)?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&taint_map)?);
                }
                OutputFormat::Text => print_taint_map(&taint_map),
            }

            Ok(())
        }
    }
}

fn print_taint_map(taint_map: &tainttrace_taint::TaintMap) {
    println!("Taint Map:");
    let mut entries: Vec<_> = taint_map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    for (function, entry) in entries {
        println!("Function: {function}");
        print!("Tainted variables: ");
        for var in &entry.locals {
            print!("{var} ");
        }
        println!();
        print!("Tainted slots: ");
        for slot in &entry.slots {
            print!("{slot}, ");
        }
        println!("\n=====");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_analyze_with_required_flags() {
        let cli = Cli::parse_from([
            "tainttrace",
            "analyze",
            "--binary",
            "/bin/app",
            "--backtrace",
            "asan.txt",
            "--sink",
            "strcpy",
        ]);
        match cli.command {
            Commands::Analyze { sink, format, .. } => {
                assert_eq!(sink, "strcpy");
                assert_eq!(format, OutputFormat::Json);
            }
        }
    }

    #[test]
    fn test_cli_rejects_missing_sink() {
        let result = Cli::try_parse_from([
            "tainttrace",
            "analyze",
            "--binary",
            "/bin/app",
            "--backtrace",
            "asan.txt",
        ]);
        assert!(result.is_err());
    }
}
