use std::path::{Path, PathBuf};
use std::time::Duration;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};

use crate::adapter::AdapterRegistry;

/// Internal watch event types after classification.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// A source file was created or modified.
    Modified(PathBuf),
    /// A source file was deleted.
    Deleted(PathBuf),
    /// `depgraph.toml` changed — triggers a full rebuild.
    ConfigChanged,
}

/// Handle to a running watcher. Dropping it stops the OS watcher.
pub struct WatcherHandle {
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
}

/// Build a Gitignore matcher from the project root's `.gitignore`, the same
/// source of truth `walker::walk_project` uses via `ignore::WalkBuilder`.
fn build_gitignore_matcher(project_root: &Path) -> Gitignore {
    let mut builder = GitignoreBuilder::new(project_root);
    let gitignore_path = project_root.join(".gitignore");
    if gitignore_path.exists() {
        let _ = builder.add(&gitignore_path);
    }
    builder.build().unwrap_or_else(|_| Gitignore::empty())
}

/// Start a debounced file watcher on `watch_root`, returning a handle (keep it
/// alive) and a receiver yielding classified events.
///
/// Debounces at 75ms, filters out `node_modules`/`vendor`/`.git`/`dist`/`build`
/// and `.gitignore`'d paths the same way the initial walk does, and classifies
/// each surviving event as `Modified`, `Deleted`, or `ConfigChanged`.
pub fn start_watcher(
    watch_root: &Path,
    registry: &AdapterRegistry,
) -> anyhow::Result<(WatcherHandle, std::sync::mpsc::Receiver<WatchEvent>)> {
    let (raw_tx, raw_rx) = std::sync::mpsc::channel::<DebounceEventResult>();

    let mut debouncer = new_debouncer(Duration::from_millis(75), move |res| {
        let _ = raw_tx.send(res);
    })?;
    debouncer.watcher().watch(watch_root, RecursiveMode::Recursive)?;

    let gitignore = build_gitignore_matcher(watch_root);
    let (tx, rx) = std::sync::mpsc::channel::<WatchEvent>();

    let extensions: Vec<String> = ["ts", "tsx", "js", "jsx", "py", "go"]
        .into_iter()
        .filter(|ext| registry.supports(ext))
        .map(String::from)
        .collect();

    std::thread::spawn(move || {
        while let Ok(result) = raw_rx.recv() {
            match result {
                Ok(events) => {
                    for debounced_event in events {
                        let path = debounced_event.path;
                        if let Some(event) = classify_event(&path, &gitignore, &extensions) && tx.send(event).is_err() {
                            return;
                        }
                    }
                }
                Err(err) => eprintln!("[watch] error: {err:?}"),
            }
        }
    });

    Ok((WatcherHandle { _debouncer: debouncer }, rx))
}

fn classify_event(path: &Path, gitignore: &Gitignore, extensions: &[String]) -> Option<WatchEvent> {
    if path
        .components()
        .any(|c| matches!(c.as_os_str().to_str(), Some("node_modules" | "vendor" | ".git" | "dist" | "build")))
    {
        return None;
    }

    let is_dir = path.is_dir();
    if gitignore.matched(path, is_dir).is_ignore() {
        return None;
    }

    if path.file_name().and_then(|n| n.to_str()) == Some("depgraph.toml") {
        return Some(WatchEvent::ConfigChanged);
    }

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if !extensions.iter().any(|e| e == ext) {
        return None;
    }

    if path.exists() {
        Some(WatchEvent::Modified(path.to_path_buf()))
    } else {
        Some(WatchEvent::Deleted(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_skips_hard_excluded_directories() {
        let gitignore = Gitignore::empty();
        let extensions = vec!["ts".to_string()];
        let path = PathBuf::from("/proj/node_modules/pkg/index.ts");
        assert!(classify_event(&path, &gitignore, &extensions).is_none());
    }

    #[test]
    fn classify_recognizes_config_file() {
        let gitignore = Gitignore::empty();
        let extensions = vec!["ts".to_string()];
        let path = PathBuf::from("/proj/depgraph.toml");
        assert!(matches!(classify_event(&path, &gitignore, &extensions), Some(WatchEvent::ConfigChanged)));
    }

    #[test]
    fn classify_ignores_unsupported_extensions() {
        let gitignore = Gitignore::empty();
        let extensions = vec!["ts".to_string()];
        let path = PathBuf::from("/proj/README.md");
        assert!(classify_event(&path, &gitignore, &extensions).is_none());
    }
}
