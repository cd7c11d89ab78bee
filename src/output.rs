use depgraph_core::model::Symbol;
use depgraph_core::query::{ArchitectureSummary, FileSummary, ImpactResult, SymbolMatch};

use crate::cli::OutputFormat;

/// Print a list of symbols in the requested format.
pub fn print_symbols(symbols: &[&Symbol], format: &OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(symbols) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("error serializing results: {e}"),
        },
        OutputFormat::Table => {
            println!("{:<30} {:<10} {:<40} {:>6}", "NAME", "KIND", "FILE", "LINE");
            for sym in symbols {
                println!("{:<30} {:<10?} {:<40} {:>6}", sym.name, sym.kind, sym.file_path, sym.start_line);
            }
        }
        OutputFormat::Compact => {
            for sym in symbols {
                println!("{}:{} {:?} {}", sym.file_path, sym.start_line, sym.kind, sym.name);
            }
        }
    }
}

/// Print `findSymbols` matches, including each match's dependent count.
pub fn print_symbol_matches(matches: &[SymbolMatch<'_>], format: &OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(matches) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("error serializing results: {e}"),
        },
        OutputFormat::Table => {
            println!("{:<30} {:<10} {:<40} {:>6} {:>10}", "NAME", "KIND", "FILE", "LINE", "DEPENDENTS");
            for m in matches {
                println!("{:<30} {:<10?} {:<40} {:>6} {:>10}", m.symbol.name, m.symbol.kind, m.symbol.file_path, m.symbol.start_line, m.dependent_count);
            }
        }
        OutputFormat::Compact => {
            for m in matches {
                println!("{}:{} {:?} {} ({} dependents)", m.symbol.file_path, m.symbol.start_line, m.symbol.kind, m.symbol.name, m.dependent_count);
            }
        }
    }
}

/// Print an impact report: direct dependents, transitive dependents, affected files.
pub fn print_impact(impact: &ImpactResult<'_>, format: &OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(impact) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("error serializing impact: {e}"),
        },
        _ => {
            println!("{} direct dependent(s):", impact.direct_dependents.len());
            print_symbols(&impact.direct_dependents, format);
            println!("{} transitive dependent(s) across {} file(s):", impact.transitive_dependents.len(), impact.affected_files.len());
            print_symbols(&impact.transitive_dependents, format);
            for file in &impact.affected_files {
                println!("  {file}");
            }
        }
    }
}

/// Print a single file's summary.
pub fn print_file_summary(summary: &FileSummary, format: &OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(summary) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("error serializing summary: {e}"),
        },
        _ => {
            println!("{}", summary.file_path);
            println!("  {} symbols", summary.symbol_count);
            println!("  {} incoming refs, {} outgoing refs", summary.incoming_refs, summary.outgoing_refs);
        }
    }
}

/// Print a project-wide architecture summary.
pub fn print_architecture_summary(summary: &ArchitectureSummary, format: &OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(summary) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("error serializing summary: {e}"),
        },
        _ => {
            println!("{} files, {} symbols, {} edges", summary.file_count, summary.symbol_count, summary.edge_count);
            if !summary.most_connected_files.is_empty() {
                println!("Most connected files:");
                for (file, count) in &summary.most_connected_files {
                    println!("  {count:>4}  {file}");
                }
            }
            if !summary.orphan_files.is_empty() {
                println!("Orphan files (no cross-file refs):");
                for file in &summary.orphan_files {
                    println!("  {file}");
                }
            }
        }
    }
}
