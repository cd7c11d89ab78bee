mod cli;
mod output;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;

use depgraph_core::adapter::AdapterRegistry;
use depgraph_core::config::Config;
use depgraph_core::incremental::Workspace;
use depgraph_core::model::ParsedFile;
use depgraph_core::{query, serialize, walker, watch};

use cli::{Cli, Commands};

/// Walk, parse (in parallel via rayon), and assemble the initial workspace for
/// a project root. This is the shared pipeline every query subcommand runs
/// before answering its query.
fn build_workspace(path: &Path, verbose: bool) -> Result<Workspace> {
    let config = Config::load(path);
    let registry = AdapterRegistry::with_default_adapters();
    let files = walker::walk_project(path, &config, &registry, verbose)?;

    let parsed_files: Vec<ParsedFile> = files
        .par_iter()
        .filter_map(|absolute_path| {
            let relative_path = absolute_path.strip_prefix(path).ok()?.to_string_lossy().replace('\\', "/");
            match registry.parse_file(path, absolute_path, &relative_path) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    eprintln!("warning: skipping {relative_path}: {err}");
                    None
                }
            }
        })
        .collect();

    if verbose {
        eprintln!("parsed {} of {} discovered files", parsed_files.len(), files.len());
    }

    Ok(Workspace::build(parsed_files))
}

fn resolve_symbol_id(workspace: &Workspace, symbol: &str) -> Result<String> {
    let hits = query::find_symbols(workspace.graph(), symbol);
    let first = hits.first().ok_or_else(|| anyhow::anyhow!("no symbol named '{symbol}' found"))?;
    if hits.len() > 1 {
        eprintln!(
            "warning: {} symbols named '{symbol}' found, using the most depended-upon at {}:{}",
            hits.len(),
            first.symbol.file_path,
            first.symbol.start_line
        );
    }
    Ok(first.symbol.id.clone())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { path, verbose, json } => {
            let start = std::time::Instant::now();
            let workspace = build_workspace(&path, verbose)?;
            let elapsed = start.elapsed();
            let summary = query::get_architecture_summary(workspace.graph());

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Indexed {} files in {:.2}s", workspace.file_count(), elapsed.as_secs_f64());
                output::print_architecture_summary(&summary, &cli::OutputFormat::Compact);
            }
        }

        Commands::Find { symbol, path, format } => {
            let workspace = build_workspace(&path, false)?;
            let hits = query::find_symbols(workspace.graph(), &symbol);
            if hits.is_empty() {
                eprintln!("no symbol named '{symbol}' found");
                std::process::exit(1);
            }
            output::print_symbol_matches(&hits, &format);
        }

        Commands::Search { query: needle, path, format } => {
            let workspace = build_workspace(&path, false)?;
            let hits = query::search_symbols(workspace.graph(), &needle);
            if hits.is_empty() {
                eprintln!("no symbols matching '{needle}' found");
                std::process::exit(1);
            }
            output::print_symbols(&hits, &format);
        }

        Commands::Deps { symbol, path, format } => {
            let workspace = build_workspace(&path, false)?;
            let id = resolve_symbol_id(&workspace, &symbol)?;
            let deps = query::get_dependencies(workspace.graph(), &id);
            output::print_symbols(&deps, &format);
        }

        Commands::Refs { symbol, path, format } => {
            let workspace = build_workspace(&path, false)?;
            let id = resolve_symbol_id(&workspace, &symbol)?;
            let dependents = query::get_dependents(workspace.graph(), &id);
            output::print_symbols(&dependents, &format);
        }

        Commands::Impact { symbol, path, format } => {
            let workspace = build_workspace(&path, false)?;
            let id = resolve_symbol_id(&workspace, &symbol)?;
            let impact = query::get_impact(workspace.graph(), &id);
            output::print_impact(&impact, &format);
        }

        Commands::Summary { path, format } => {
            let workspace = build_workspace(&path, false)?;
            let summary = query::get_architecture_summary(workspace.graph());
            output::print_architecture_summary(&summary, &format);

            if matches!(format, cli::OutputFormat::Table | cli::OutputFormat::Compact) {
                for file_summary in query::get_file_summary(workspace.graph()) {
                    output::print_file_summary(&file_summary, &format);
                }
            }
        }

        Commands::Export { path } => {
            let workspace = build_workspace(&path, false)?;
            let doc = serialize::export(workspace.graph(), &path.to_string_lossy(), chrono::Utc::now());
            print!("{}", serialize::to_json_string(&doc)?);
        }

        Commands::Import { file } => {
            let json = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let parsed_files = serialize::import(&json)?;
            let workspace = Workspace::build(parsed_files);
            let summary = query::get_architecture_summary(workspace.graph());
            output::print_architecture_summary(&summary, &cli::OutputFormat::Compact);
        }

        Commands::Watch { path } => {
            eprintln!("Indexing {}...", path.display());
            let mut workspace = build_workspace(&path, false)?;
            eprintln!("Indexed {} files. Watching for changes...", workspace.file_count());

            let registry = AdapterRegistry::with_default_adapters();
            let (_handle, rx) = watch::start_watcher(&path, &registry).context("failed to start watcher")?;

            while let Ok(event) = rx.recv() {
                match event {
                    watch::WatchEvent::Modified(absolute) => {
                        let relative = relative_str(&absolute, &path);
                        match registry.parse_file(&path, &absolute, &relative) {
                            Ok(parsed) => {
                                workspace.update_file(&relative, Some(parsed));
                                eprintln!("[watch] re-indexed {relative}");
                            }
                            Err(err) => eprintln!("[watch] skipping {relative}: {err}"),
                        }
                    }
                    watch::WatchEvent::Deleted(absolute) => {
                        let relative = relative_str(&absolute, &path);
                        workspace.update_file(&relative, None);
                        eprintln!("[watch] removed {relative}");
                    }
                    watch::WatchEvent::ConfigChanged => {
                        eprintln!("[watch] config changed, full rebuild...");
                        workspace = build_workspace(&path, false)?;
                        eprintln!("[watch] re-indexed {} files", workspace.file_count());
                    }
                }
            }
        }
    }

    Ok(())
}

fn relative_str(absolute: &Path, root: &Path) -> String {
    absolute.strip_prefix(root).unwrap_or(absolute).to_string_lossy().replace('\\', "/")
}
