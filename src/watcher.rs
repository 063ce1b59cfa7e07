//! File watcher: event-driven notification of file changes with a
//! post-burst 200ms debounce window (§4.7).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{RecursiveMode, Watcher as NotifyWatcherTrait};

const DEBOUNCE: Duration = Duration::from_millis(200);

/// Platform-specific event kinds collapse into these three semantic
/// kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Created,
    Modified,
    Deleted,
}

#[derive(Debug, Clone)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: EventKind,
}

pub struct FileWatcher {
    _inner: notify::RecommendedWatcher,
    rx: Receiver<notify::Result<notify::Event>>,
    extensions: Vec<String>,
    shutdown: Arc<AtomicBool>,
}

impl FileWatcher {
    pub fn new(shutdown: Arc<AtomicBool>) -> Result<Self> {
        let (tx, rx) = channel();
        let watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })
        .context("failed to create file watcher")?;

        Ok(Self {
            _inner: watcher,
            rx,
            extensions: Vec::new(),
            shutdown,
        })
    }

    /// Recursively subscribe to create/modify/delete events under
    /// `path` for files matching `extensions`.
    pub fn add_directory(&mut self, path: &Path, extensions: &[String]) -> Result<()> {
        self._inner
            .watch(path, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {}", path.display()))?;
        self.extensions.extend(extensions.iter().cloned());
        Ok(())
    }

    /// Block for the first event, then drain a 200ms debounce window
    /// (restarted by every further event) and return up to `max`
    /// deduplicated events (§4.7). Returns an empty vec if shutdown was
    /// requested while waiting.
    pub fn wait(&mut self, max: usize) -> Result<Vec<FileEvent>> {
        let mut collapsed: HashMap<PathBuf, EventKind> = HashMap::new();

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return Ok(collapse_to_vec(collapsed, max));
            }

            match self.rx.recv_timeout(Duration::from_millis(250)) {
                Ok(Ok(event)) => {
                    record_event(&mut collapsed, &event, &self.extensions);
                    self.drain_debounce_window(&mut collapsed);
                    return Ok(collapse_to_vec(collapsed, max));
                }
                Ok(Err(_)) => continue,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Ok(collapse_to_vec(collapsed, max));
                }
            }
        }
    }

    fn drain_debounce_window(&mut self, collapsed: &mut HashMap<PathBuf, EventKind>) {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return;
            }
            match self.rx.recv_timeout(DEBOUNCE) {
                Ok(Ok(event)) => {
                    record_event(collapsed, &event, &self.extensions);
                    // any further event restarts the window.
                }
                Ok(Err(_)) => continue,
                Err(RecvTimeoutError::Timeout) => return,
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }
}

fn record_event(collapsed: &mut HashMap<PathBuf, EventKind>, event: &notify::Event, extensions: &[String]) {
    use notify::EventKind as NotifyKind;

    let kind = match event.kind {
        NotifyKind::Create(_) => EventKind::Created,
        NotifyKind::Modify(_) => EventKind::Modified,
        NotifyKind::Remove(_) => EventKind::Deleted,
        _ => return,
    };

    for path in &event.paths {
        if !has_allowed_extension(path, extensions) {
            continue;
        }
        // A batch containing both `modified` and `deleted` for the same
        // path collapses to one reprocess attempt (§8 boundary
        // behavior); the later event in arrival order wins.
        collapsed.insert(path.clone(), kind);
    }
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

fn collapse_to_vec(collapsed: HashMap<PathBuf, EventKind>, max: usize) -> Vec<FileEvent> {
    collapsed
        .into_iter()
        .take(max)
        .map(|(path, kind)| FileEvent { path, kind })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modify_then_delete_for_same_path_collapses_to_one_event() {
        let mut collapsed = HashMap::new();
        let path = PathBuf::from("/tmp/a.rs");
        collapsed.insert(path.clone(), EventKind::Modified);
        collapsed.insert(path.clone(), EventKind::Deleted);
        assert_eq!(collapsed.len(), 1);
        assert_eq!(collapsed[&path], EventKind::Deleted);
    }

    #[test]
    fn extension_filter_rejects_non_matching_paths() {
        let extensions = vec!["rs".to_string()];
        assert!(has_allowed_extension(Path::new("a.rs"), &extensions));
        assert!(!has_allowed_extension(Path::new("a.txt"), &extensions));
    }
}
