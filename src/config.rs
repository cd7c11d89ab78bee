use std::path::Path;

use serde::Deserialize;

/// Configuration loaded from `depgraph.toml` at the project root.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Path patterns (regex, matched against the full relative path or any
    /// single path component) a file must match to be indexed. When absent,
    /// every file the registered adapters support is a candidate.
    pub include: Option<Vec<String>>,
    /// Additional path patterns (regex, matched against the full relative path
    /// or any single path component) to exclude from indexing, beyond
    /// `.gitignore` and the hardcoded `node_modules`/vendor exclusions.
    pub exclude: Option<Vec<String>>,
    /// Per-adapter on/off switches. An adapter defaults to enabled; set it to
    /// `false` to skip its extensions during the walk even though it stays
    /// registered.
    #[serde(default)]
    pub adapters: AdapterToggles,
}

/// Enable/disable individual language adapters without removing them from
/// the registry — a disabled adapter's extensions are simply never walked.
#[derive(Debug, Deserialize, Default)]
pub struct AdapterToggles {
    pub typescript: Option<bool>,
    pub python: Option<bool>,
    pub go: Option<bool>,
}

impl AdapterToggles {
    /// File extensions to skip during the walk because their adapter was
    /// explicitly disabled.
    pub fn disabled_extensions(&self) -> Vec<&'static str> {
        let mut disabled = Vec::new();
        if self.typescript == Some(false) {
            disabled.extend(["ts", "tsx", "js", "jsx"]);
        }
        if self.python == Some(false) {
            disabled.push("py");
        }
        if self.go == Some(false) {
            disabled.push("go");
        }
        disabled
    }
}

impl Config {
    /// Load configuration from `depgraph.toml` in the given root directory.
    ///
    /// Returns a default (empty) configuration if the file does not exist or
    /// cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join("depgraph.toml");

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("warning: failed to parse depgraph.toml: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                eprintln!("warning: failed to read depgraph.toml: {err}. Using defaults.");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_file_returns_default() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(tmp.path());
        assert!(config.exclude.is_none());
    }

    #[test]
    fn load_parses_exclude_list() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("depgraph.toml"), "exclude = [\"vendor\", \"*.generated.ts\"]\n").unwrap();
        let config = Config::load(tmp.path());
        assert_eq!(config.exclude.unwrap().len(), 2);
    }

    #[test]
    fn load_malformed_file_warns_and_returns_default() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("depgraph.toml"), "not valid toml {{{").unwrap();
        let config = Config::load(tmp.path());
        assert!(config.exclude.is_none());
    }

    #[test]
    fn load_parses_include_list() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("depgraph.toml"), "include = [\"^src/\"]\n").unwrap();
        let config = Config::load(tmp.path());
        assert_eq!(config.include.unwrap(), vec!["^src/".to_string()]);
    }

    #[test]
    fn load_parses_adapter_toggles() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("depgraph.toml"), "[adapters]\npython = false\n").unwrap();
        let config = Config::load(tmp.path());
        assert_eq!(config.adapters.python, Some(false));
        assert_eq!(config.adapters.typescript, None);
    }

    #[test]
    fn disabled_adapter_widens_to_its_full_extension_set() {
        let toggles = AdapterToggles { typescript: Some(false), python: None, go: None };
        let disabled = toggles.disabled_extensions();
        assert!(disabled.contains(&"ts"));
        assert!(disabled.contains(&"tsx"));
        assert!(disabled.contains(&"js"));
        assert!(disabled.contains(&"jsx"));
        assert!(!disabled.contains(&"py"));
    }
}
