use crate::core::error::{Error, Result};
use crate::indexing::scanner::ScanOptions;
use crate::render::engine::TemplateRenderer;
use crate::render::index::{scan_and_render, IndexRenderer};
use crate::tree::node::INDEX_FILE;
use notify_debouncer_full::{
    new_debouncer,
    notify::{RecommendedWatcher, RecursiveMode, Watcher},
    DebounceEventResult, Debouncer, FileIdMap,
};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info};

enum Message {
    Changed(PathBuf),
    Stop,
}

/// Whether a change at `path` should trigger a rebuild
///
/// Generated indexes and anything hidden (including the temporary files
/// used to replace indexes) are ignored.
pub fn is_relevant(root: &Path, path: &Path) -> bool {
    if path.file_name().is_some_and(|name| name == INDEX_FILE) {
        return false;
    }
    let relative = path.strip_prefix(root).unwrap_or(path);
    !relative
        .components()
        .any(|component| component.as_os_str().to_string_lossy().starts_with('.'))
}

/// Rebuilds every index whenever something under the root changes
pub struct ChangeWatcher<R: TemplateRenderer + 'static> {
    root: PathBuf,
    options: ScanOptions,
    renderer: IndexRenderer<R>,
    debounce: Duration,
}

/// Control handle of a running [`ChangeWatcher`]
pub struct WatcherHandle {
    tx: mpsc::Sender<Message>,
    debouncer: Option<Debouncer<RecommendedWatcher, FileIdMap>>,
    thread: Option<JoinHandle<()>>,
}

impl<R: TemplateRenderer + 'static> ChangeWatcher<R> {
    pub fn new(
        root: &Path,
        options: ScanOptions,
        renderer: IndexRenderer<R>,
        debounce: Duration,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            options,
            renderer,
            debounce,
        }
    }

    /// Subscribe to changes and process them on a dedicated thread
    pub fn start(self) -> Result<WatcherHandle> {
        let root = self.root.canonicalize()?;
        let (tx, rx) = mpsc::channel();

        let event_tx = tx.clone();
        let event_root = root.clone();
        let mut debouncer = new_debouncer(
            self.debounce,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    let changed = events
                        .iter()
                        .flat_map(|event| event.paths.iter())
                        .find(|path| is_relevant(&event_root, path));
                    if let Some(path) = changed {
                        let _ = event_tx.send(Message::Changed(path.clone()));
                    }
                }
                Err(errors) => {
                    for e in errors {
                        error!("Watch error: {}", e);
                    }
                }
            },
        )
        .map_err(|e| Error::Watch(format!("Failed to create file watcher: {}", e)))?;

        debouncer
            .watcher()
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| Error::Watch(format!("Failed to watch directory: {}", e)))?;
        info!("Watching directory: {}", root.display());

        let thread = thread::Builder::new()
            .name("para-watcher".to_string())
            .spawn(move || self.process(rx))?;

        Ok(WatcherHandle {
            tx,
            debouncer: Some(debouncer),
            thread: Some(thread),
        })
    }

    fn process(self, rx: mpsc::Receiver<Message>) {
        while let Ok(message) = rx.recv() {
            match message {
                Message::Changed(path) => {
                    info!("Rebuilding index; reason: {}", path.display());
                    if let Err(e) = scan_and_render(&self.root, &self.options, &self.renderer) {
                        error!("Rebuild failed: {}", e);
                    }
                }
                Message::Stop => break,
            }
        }
    }
}

impl WatcherHandle {
    pub fn is_alive(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    /// Stop delivering events and signal the processing thread
    pub fn stop(&mut self) {
        self.debouncer.take();
        let _ = self.tx.send(Message::Stop);
    }

    /// Wait for the processing thread to finish
    pub fn join(mut self) -> Result<()> {
        self.stop();
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|_| Error::Watch("Watcher thread panicked".to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relevant_paths() {
        let root = Path::new("/kb");
        assert!(is_relevant(root, Path::new("/kb/work/note.md")));
        assert!(is_relevant(root, Path::new("/kb/work")));
        assert!(is_relevant(root, Path::new("/kb/work/about.yml")));
        assert!(!is_relevant(root, Path::new("/kb/work/index.md")));
        assert!(!is_relevant(root, Path::new("/kb/work/.tmpA1b2C3")));
        assert!(!is_relevant(root, Path::new("/kb/.git/objects/ab")));
    }
}
