use std::path::{Path, PathBuf};

use regex::Regex;

use crate::adapter::AdapterRegistry;
use crate::config::Config;

/// Walk a project directory and collect the source files this crate's
/// adapters can parse.
///
/// Respects `.gitignore` rules, always excludes `node_modules`, `vendor`,
/// `dist`, and `build`, requires a match against `config.include` when set,
/// applies any additional exclusion patterns from `config.exclude` (regexes
/// matched against either the full relative path or a single path component),
/// and skips the extensions of any adapter `config.adapters` disables.
///
/// When `verbose` is true, each discovered file path is printed to stderr.
pub fn walk_project(root: &Path, config: &Config, registry: &AdapterRegistry, verbose: bool) -> anyhow::Result<Vec<PathBuf>> {
    let include_patterns = compile_patterns(config.include.as_deref());
    let exclude_patterns = compile_patterns(config.exclude.as_deref());
    let disabled_extensions = config.adapters.disabled_extensions();
    let mut files = Vec::new();

    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(true)
        // Read .gitignore files even outside a git repository — keeps exclusions
        // working for standalone directories and test fixtures.
        .require_git(false)
        .build();

    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                eprintln!("warning: {err}");
                continue;
            }
        };

        let path = entry.path();

        if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
            continue;
        }

        if path_contains_hard_exclusion(path) {
            continue;
        }

        if !include_patterns.is_empty() && !matches_any_pattern(path, root, &include_patterns) {
            continue;
        }

        if matches_any_pattern(path, root, &exclude_patterns) {
            continue;
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !registry.supports(ext) || disabled_extensions.contains(&ext) {
            continue;
        }

        if verbose {
            eprintln!("{}", path.display());
        }

        files.push(path.to_path_buf());
    }

    Ok(files)
}

/// Directory names always excluded regardless of `.gitignore` or config:
/// dependency/vendor directories and build outputs no adapter should ever walk into.
const HARD_EXCLUDED_DIRS: &[&str] = &["node_modules", "vendor", ".git", "dist", "build"];

fn path_contains_hard_exclusion(path: &Path) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|s| HARD_EXCLUDED_DIRS.contains(&s))
            .unwrap_or(false)
    })
}

fn compile_patterns(patterns: Option<&[String]>) -> Vec<Regex> {
    let Some(patterns) = patterns else {
        return Vec::new();
    };
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(r) => Some(r),
            Err(err) => {
                eprintln!("warning: invalid pattern '{p}': {err}");
                None
            }
        })
        .collect()
}

fn matches_any_pattern(path: &Path, root: &Path, patterns: &[Regex]) -> bool {
    if patterns.is_empty() {
        return false;
    }
    let relative = path.strip_prefix(root).unwrap_or(path);
    let relative_str = relative.to_string_lossy();

    patterns.iter().any(|re| {
        re.is_match(&relative_str)
            || relative.components().any(|c| c.as_os_str().to_str().map(|s| re.is_match(s)).unwrap_or(false))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_excludes_vendor_and_build_output_dirs() {
        assert!(path_contains_hard_exclusion(Path::new("/proj/node_modules/pkg/index.js")));
        assert!(path_contains_hard_exclusion(Path::new("/proj/vendor/lib.go")));
        assert!(path_contains_hard_exclusion(Path::new("/proj/dist/bundle.js")));
        assert!(path_contains_hard_exclusion(Path::new("/proj/build/out.go")));
        assert!(!path_contains_hard_exclusion(Path::new("/proj/src/lib.ts")));
    }

    #[test]
    fn walk_project_discovers_supported_extensions_only() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.ts"), "export const x = 1;").unwrap();
        std::fs::write(tmp.path().join("README.md"), "docs").unwrap();

        let config = Config::default();
        let registry = AdapterRegistry::with_default_adapters();
        let files = walk_project(tmp.path(), &config, &registry, false).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.ts"));
    }

    #[test]
    fn config_exclude_pattern_filters_matching_paths() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("generated")).unwrap();
        std::fs::write(tmp.path().join("generated/a.ts"), "export const x = 1;").unwrap();
        std::fs::write(tmp.path().join("b.ts"), "export const y = 1;").unwrap();

        let config = Config { exclude: Some(vec!["^generated/".to_string()]), ..Config::default() };
        let registry = AdapterRegistry::with_default_adapters();
        let files = walk_project(tmp.path(), &config, &registry, false).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("b.ts"));
    }

    #[test]
    fn config_include_pattern_restricts_to_matching_paths() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("src")).unwrap();
        std::fs::write(tmp.path().join("src/a.ts"), "export const x = 1;").unwrap();
        std::fs::write(tmp.path().join("b.ts"), "export const y = 1;").unwrap();

        let config = Config { include: Some(vec!["^src/".to_string()]), ..Config::default() };
        let registry = AdapterRegistry::with_default_adapters();
        let files = walk_project(tmp.path(), &config, &registry, false).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("src/a.ts"));
    }

    #[test]
    fn disabled_adapter_is_skipped_during_the_walk() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.ts"), "export const x = 1;").unwrap();
        std::fs::write(tmp.path().join("b.py"), "x = 1\n").unwrap();

        let config = Config {
            adapters: crate::config::AdapterToggles { typescript: Some(false), ..Default::default() },
            ..Config::default()
        };
        let registry = AdapterRegistry::with_default_adapters();
        let files = walk_project(tmp.path(), &config, &registry, false).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("b.py"));
    }
}
