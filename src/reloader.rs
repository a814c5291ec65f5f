//! Background filesystem watching and reload triggering.
//!
//! The reloader runs one synchronous loader pass, then watches the
//! directories containing every manifest's real target (manifests are
//! typically symlinks into a build output tree, so each is resolved through
//! symlinks first; watch granularity is directory-level). Event batches are
//! coalesced with a short settle window and intersected with the tracked
//! targets: a relevant batch schedules exactly one loader run on a fresh
//! thread so the watch loop stays responsive.
//!
//! Startup barrier: [`Reloader::spawn`] does not return until the first
//! pass has completed and the initial watch set is registered, signalled by
//! dropping the sender of a rendezvous channel (a one-shot "closed channel"
//! that late arrivals observe without busy-waiting).
//!
//! Shutdown: dropping the [`ReloaderHandle`] closes the watch handle; the
//! blocked wait then sees the channel disconnect, which is treated as
//! normal shutdown rather than an error. Any other watch failure is logged
//! and ends the loop — the server keeps serving the last snapshot.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher, event::ModifyKind};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::loader::Loader;
use crate::snapshot::Container;
use crate::{debug, log};

/// Settle window for coalescing one burst of events into one batch.
const SETTLE_MS: u64 = 50;

#[derive(Debug, Error)]
pub enum WatchError {
    /// The watch handle was closed. Expected during shutdown.
    #[error("watch handle closed")]
    Closed,

    #[error(transparent)]
    Notify(#[from] notify::Error),

    #[error("failed to resolve manifest {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

type SharedWatcher = Arc<Mutex<Option<RecommendedWatcher>>>;

/// Owner of the watch loop. Dropping it stops the loop and joins the thread.
pub struct ReloaderHandle {
    watcher: SharedWatcher,
    thread: Option<JoinHandle<()>>,
}

impl ReloaderHandle {
    pub fn stop(self) {}

    fn shutdown(&mut self) {
        // Dropping the watcher disconnects the event channel, which the
        // loop observes as WatchError::Closed.
        drop(self.watcher.lock().take());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ReloaderHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Watches manifest files and re-triggers the loader when they change.
pub struct Reloader {
    container: Arc<Container>,
    loader: Arc<Loader>,
}

impl Reloader {
    /// Start the reload loop on a background thread.
    ///
    /// Blocks until the initial load has completed and the watch set is
    /// registered, so callers may bind their listener as soon as this
    /// returns.
    pub fn spawn(container: Arc<Container>, loader: Arc<Loader>) -> Result<ReloaderHandle, WatchError> {
        let (event_tx, event_rx) = unbounded();
        let watcher = notify::recommended_watcher(move |result| {
            let _ = event_tx.send(result);
        })?;
        let watcher: SharedWatcher = Arc::new(Mutex::new(Some(watcher)));

        // Rendezvous channel used purely for its disconnect signal: the
        // loop drops ready_tx once the first pass is done.
        let (ready_tx, ready_rx) = unbounded::<()>();

        let thread = thread::spawn({
            let watcher = Arc::clone(&watcher);
            let reloader = Reloader { container, loader };
            move || match reloader.run(&event_rx, &watcher, ready_tx) {
                Ok(()) | Err(WatchError::Closed) => {
                    debug!("watch"; "watch loop stopped");
                }
                Err(e) => {
                    // Degraded but alive: keep serving the last snapshot.
                    log!("error"; "filesystem watch failed: {e}");
                }
            }
        });

        // Nothing is ever sent; the first pass signals by dropping the sender.
        let _ = ready_rx.recv();
        Ok(ReloaderHandle {
            watcher,
            thread: Some(thread),
        })
    }

    fn run(
        &self,
        events: &Receiver<notify::Result<Event>>,
        watcher: &SharedWatcher,
        ready_tx: Sender<()>,
    ) -> Result<(), WatchError> {
        // Initial synchronous pass; the server's startup barrier waits on it.
        self.loader.run();

        let mut ready_tx = Some(ready_tx);
        let mut directories: FxHashSet<PathBuf> = FxHashSet::default();
        let mut real_targets: FxHashMap<PathBuf, PathBuf> = FxHashMap::default();

        loop {
            self.register_manifests(watcher, &mut directories, &mut real_targets)?;

            // Open the startup barrier once the initial watch set is live.
            drop(ready_tx.take());

            let modified = await_changes(events)?;
            if !is_relevant(&real_targets, &modified) {
                debug!("watch"; "ignoring {} unrelated change(s)", modified.len());
                continue;
            }

            // Schedule rather than run: the watch loop must keep draining
            // events while the load is in flight.
            debug!("watch"; "manifest changed, scheduling reload");
            let loader = Arc::clone(&self.loader);
            thread::spawn(move || loader.run());
        }
    }

    /// Track any manifest paths the current snapshot added, registering the
    /// directory containing each one's real target. Directories already
    /// registered are skipped.
    fn register_manifests(
        &self,
        watcher: &SharedWatcher,
        directories: &mut FxHashSet<PathBuf>,
        real_targets: &mut FxHashMap<PathBuf, PathBuf>,
    ) -> Result<(), WatchError> {
        for manifest in &self.container.capture().manifest_paths {
            if real_targets.contains_key(manifest) {
                continue;
            }
            let target = fs::canonicalize(manifest).map_err(|source| WatchError::Resolve {
                path: manifest.clone(),
                source,
            })?;
            let directory = target
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("/"));
            if directories.insert(directory.clone()) {
                let mut guard = watcher.lock();
                let Some(watcher) = guard.as_mut() else {
                    return Err(WatchError::Closed);
                };
                watcher.watch(&directory, RecursiveMode::NonRecursive)?;
                debug!("watch"; "watching {}", directory.display());
            }
            real_targets.insert(manifest.clone(), target);
        }
        Ok(())
    }
}

/// Block for the next batch of changed paths.
///
/// Waits for the first event, then drains with a settle window so one
/// editor save produces one coalesced batch. A disconnected channel means
/// the watch handle was closed.
fn await_changes(events: &Receiver<notify::Result<Event>>) -> Result<FxHashSet<PathBuf>, WatchError> {
    let mut modified = FxHashSet::default();
    let first = events.recv().map_err(|_| WatchError::Closed)?;
    collect(first, &mut modified);
    loop {
        match events.recv_timeout(Duration::from_millis(SETTLE_MS)) {
            Ok(event) => collect(event, &mut modified),
            Err(RecvTimeoutError::Timeout) => break,
            Err(RecvTimeoutError::Disconnected) => return Err(WatchError::Closed),
        }
    }
    Ok(modified)
}

fn collect(result: notify::Result<Event>, modified: &mut FxHashSet<PathBuf>) {
    match result {
        Ok(event) => {
            // Metadata-only changes (mtime/chmod noise) never alter content.
            if matches!(event.kind, EventKind::Modify(ModifyKind::Metadata(_))) {
                return;
            }
            modified.extend(event.paths);
        }
        Err(e) => log!("watch"; "notify error: {e}"),
    }
}

/// A batch is relevant iff it touches the real target of a tracked manifest.
fn is_relevant(real_targets: &FxHashMap<PathBuf, PathBuf>, modified: &FxHashSet<PathBuf>) -> bool {
    real_targets.values().any(|target| modified.contains(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runfiles::Runfiles;
    use crate::webpath::WebPath;
    use std::time::Instant;
    use tempfile::TempDir;

    #[test]
    fn test_is_relevant_filters_untracked_paths() {
        let mut targets = FxHashMap::default();
        targets.insert(PathBuf::from("/m/app.manifest"), PathBuf::from("/real/app.manifest"));

        let mut unrelated = FxHashSet::default();
        unrelated.insert(PathBuf::from("/real/other.txt"));
        assert!(!is_relevant(&targets, &unrelated));

        let mut tracked = FxHashSet::default();
        tracked.insert(PathBuf::from("/real/app.manifest"));
        assert!(is_relevant(&targets, &tracked));
    }

    #[test]
    fn test_await_changes_coalesces_one_batch() {
        let (tx, rx) = unbounded();
        tx.send(Ok(Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/a"))))
            .unwrap();
        tx.send(Ok(Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/b"))))
            .unwrap();

        let batch = await_changes(&rx).unwrap();
        assert!(batch.contains(&PathBuf::from("/a")));
        assert!(batch.contains(&PathBuf::from("/b")));
    }

    #[test]
    fn test_await_changes_ignores_metadata_noise() {
        let (tx, rx) = unbounded();
        tx.send(Ok(Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/a"))))
            .unwrap();
        tx.send(Ok(Event::new(EventKind::Modify(ModifyKind::Metadata(
            notify::event::MetadataKind::Any,
        )))
        .add_path(PathBuf::from("/noise"))))
            .unwrap();

        let batch = await_changes(&rx).unwrap();
        assert!(batch.contains(&PathBuf::from("/a")));
        assert!(!batch.contains(&PathBuf::from("/noise")));
    }

    #[test]
    fn test_await_changes_reports_closed_channel() {
        let (tx, rx) = unbounded::<notify::Result<Event>>();
        drop(tx);
        assert!(matches!(await_changes(&rx), Err(WatchError::Closed)));
    }

    fn fixture(root: &TempDir) -> (Arc<Container>, Arc<Loader>) {
        fs::write(root.path().join("main.js"), "1").unwrap();
        fs::write(
            root.path().join("app.manifest"),
            "[[src]]\nwebpath = \"/app/main.js\"\npath = \"main.js\"\n",
        )
        .unwrap();
        fs::write(
            root.path().join("server.toml"),
            "manifest = [\"app.manifest\"]\n",
        )
        .unwrap();

        let container = Arc::new(Container::new());
        let loader = Arc::new(Loader::new(
            Runfiles::new(root.path().to_path_buf()),
            Arc::clone(&container),
            root.path().join("server.toml"),
        ));
        (container, loader)
    }

    #[test]
    fn test_spawn_opens_barrier_after_first_load() {
        let root = TempDir::new().unwrap();
        let (container, loader) = fixture(&root);

        let handle = Reloader::spawn(Arc::clone(&container), loader).unwrap();
        // The barrier only opens after the first pass has published.
        assert!(container
            .capture()
            .assets
            .contains_key(&WebPath::parse("/app/main.js").unwrap()));
        handle.stop();
    }

    #[test]
    fn test_manifest_change_triggers_reload() {
        let root = TempDir::new().unwrap();
        let (container, loader) = fixture(&root);
        let handle = Reloader::spawn(Arc::clone(&container), loader).unwrap();

        fs::write(
            root.path().join("app.manifest"),
            "[[src]]\nwebpath = \"/app/other.js\"\npath = \"main.js\"\n",
        )
        .unwrap();

        let wanted = WebPath::parse("/app/other.js").unwrap();
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if container.capture().assets.contains_key(&wanted) {
                break;
            }
            thread::sleep(Duration::from_millis(50));
        }
        assert!(container.capture().assets.contains_key(&wanted));
        handle.stop();
    }

    #[test]
    fn test_stop_joins_cleanly() {
        let root = TempDir::new().unwrap();
        let (container, loader) = fixture(&root);
        let handle = Reloader::spawn(container, loader).unwrap();
        handle.stop();
    }
}
