use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Cross-file symbol dependency graph for TypeScript/JavaScript, Python, and Go.
///
/// depgraph indexes a project into a queryable dependency graph, enabling
/// fast navigation and impact analysis without reading source files.
#[derive(Parser, Debug)]
#[command(name = "depgraph", version, about, long_about = None, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for query results.
#[derive(Clone, Debug, ValueEnum, Default)]
pub enum OutputFormat {
    /// Compact one-line-per-result format (default).
    #[default]
    Compact,
    /// Human-readable columnar table.
    Table,
    /// Structured JSON array.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a project directory, discovering and parsing all supported source files.
    Build {
        /// Path to the project root to index.
        path: PathBuf,

        /// Print each discovered file path during indexing.
        #[arg(short, long)]
        verbose: bool,

        /// Output summary as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },

    /// Find a symbol's definition(s) by exact name.
    Find {
        /// Exact symbol name.
        symbol: String,

        /// Path to the project root to index and query.
        path: PathBuf,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Case-insensitive substring search over symbol names.
    Search {
        /// Substring to search for.
        query: String,

        /// Path to the project root to index and query.
        path: PathBuf,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// List everything a symbol directly depends on.
    Deps {
        /// Exact symbol name.
        symbol: String,

        /// Path to the project root to index and query.
        path: PathBuf,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// List everything that directly depends on a symbol.
    Refs {
        /// Exact symbol name.
        symbol: String,

        /// Path to the project root to index and query.
        path: PathBuf,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Show the transitive blast radius of changing a symbol.
    Impact {
        /// Exact symbol name.
        symbol: String,

        /// Path to the project root to index and query.
        path: PathBuf,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Project statistics: file/symbol/edge counts and most-depended-upon files.
    Summary {
        /// Path to the project root to index and query.
        path: PathBuf,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Export the graph to a JSON document on stdout.
    Export {
        /// Path to the project root to index and export.
        path: PathBuf,
    },

    /// Import a previously exported JSON document and print a summary.
    Import {
        /// Path to the exported JSON document.
        file: PathBuf,
    },

    /// Watch a project for changes, incrementally re-indexing as files change.
    Watch {
        /// Path to the project root to index and watch.
        path: PathBuf,
    },
}
