use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{self, Receiver};

use super::ConfigError;

pub enum ConfigChange {
    /// The config file was written or created
    Modified(PathBuf),
    Removed(PathBuf),
    Error(String),
}

/// Watches the directory holding the config file and reports changes to that file only
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    file: PathBuf,
}

impl ConfigWatcher {
    pub fn new(file: &Path) -> Result<Self, ConfigError> {
        let dir = file.parent().ok_or_else(|| ConfigError::NoParent {
            path: file.to_path_buf(),
        })?;
        let (tx, rx) = mpsc::channel(32);

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.blocking_send(res);
            },
            Config::default(),
        )
        .map_err(ConfigError::InitWatcher)?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| ConfigError::WatchPath {
                path: dir.to_path_buf(),
                source,
            })?;

        Ok(Self {
            _watcher: watcher,
            rx,
            file: file.to_path_buf(),
        })
    }

    pub async fn next_change(&mut self) -> Option<ConfigChange> {
        while let Some(event_result) = self.rx.recv().await {
            match event_result {
                Ok(event) => {
                    if let Some(change) = self.process_event(event) {
                        return Some(change);
                    }
                }
                Err(e) => {
                    return Some(ConfigChange::Error(format!("Config watcher error: {}", e)));
                }
            }
        }
        None
    }

    fn process_event(&self, event: Event) -> Option<ConfigChange> {
        if !event.paths.iter().any(|p| p == &self.file) {
            return None;
        }
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => {
                tracing::debug!(path = %self.file.display(), "Config file changed");
                Some(ConfigChange::Modified(self.file.clone()))
            }
            EventKind::Remove(_) => Some(ConfigChange::Removed(self.file.clone())),
            _ => None,
        }
    }
}
