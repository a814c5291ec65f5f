//! One-shot build-graph loads with cooperative cancellation.
//!
//! A loader run reads the primary configuration, every manifest it
//! references, assembles a fresh [`Snapshot`] and publishes it. At most one
//! load is logically active: starting a new run preempts a running one by
//! cancelling its token instead of racing two publishes. Cancellation is
//! cooperative — the token is checked before every blocking read and again
//! before publish, so a preempted load can never make its result visible.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::manifest::{Manifest, ServerInfo};
use crate::runfiles::Runfiles;
use crate::snapshot::{Container, Snapshot};
use crate::webpath::{PathError, WebPath};
use crate::{debug, log};

/// Why a load attempt produced no snapshot.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The load was preempted by a newer one. Expected; discarded silently.
    #[error("load cancelled")]
    Cancelled,

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid webpath in {path}: {source}")]
    Webpath {
        path: PathBuf,
        #[source]
        source: PathError,
    },
}

/// Cooperative cancellation flag threaded through one load attempt.
#[derive(Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), LoadError> {
        if self.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        Ok(())
    }

    fn is_same(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Rebuilds snapshots from manifests and publishes them into a [`Container`].
pub struct Loader {
    runfiles: Runfiles,
    container: Arc<Container>,
    config_path: PathBuf,
    /// Token of the in-flight load, if any. Publish happens under this lock
    /// so a preempted run and its preemptor cannot race their publishes.
    active: Mutex<Option<CancelToken>>,
}

impl Loader {
    pub fn new(runfiles: Runfiles, container: Arc<Container>, config_path: PathBuf) -> Self {
        Self {
            runfiles,
            container,
            config_path,
            active: Mutex::new(None),
        }
    }

    /// Run one load attempt, preempting any load already in flight.
    ///
    /// Errors never escape: a cancelled load is discarded silently, any
    /// other failure is logged and leaves the previous snapshot in place.
    pub fn run(&self) {
        let token = self.preempt();
        let start = Instant::now();
        match self.build_snapshot(&token) {
            Ok(snapshot) => {
                if self.try_publish(snapshot, &token) {
                    log!("load"; "loaded build graph in {}ms", start.elapsed().as_millis());
                }
            }
            Err(LoadError::Cancelled) => {
                debug!("load"; "load preempted by a newer one");
            }
            Err(e) => {
                log!("error"; "failed to load build graph: {e}");
            }
        }
    }

    /// Install a fresh token as the active load, cancelling its predecessor.
    fn preempt(&self) -> CancelToken {
        let token = CancelToken::new();
        let mut active = self.active.lock();
        if let Some(previous) = active.replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Publish unless this run was preempted after it finished building.
    fn try_publish(&self, snapshot: Snapshot, token: &CancelToken) -> bool {
        let mut active = self.active.lock();
        if token.is_cancelled() {
            return false;
        }
        self.container.publish(snapshot);
        if active.as_ref().is_some_and(|current| current.is_same(token)) {
            *active = None;
        }
        true
    }

    /// Parse the primary configuration and every manifest it references
    /// into a complete snapshot. External assets are added first so that
    /// manifest-declared sources win on webpath collisions.
    fn build_snapshot(&self, token: &CancelToken) -> Result<Snapshot, LoadError> {
        let mut manifest_paths = FxHashSet::default();
        manifest_paths.insert(self.config_path.clone());

        let text = self.read(&self.config_path, token)?;
        let info = ServerInfo::from_toml(&text).map_err(|source| LoadError::Parse {
            path: self.config_path.clone(),
            source,
        })?;

        let mut assets: BTreeMap<WebPath, PathBuf> = BTreeMap::new();
        let mut webpaths: BTreeSet<WebPath> = BTreeSet::new();

        for asset in &info.external_asset {
            let webpath = self.parse_webpath(&asset.webpath, &self.config_path)?;
            assets.insert(webpath, self.runfiles.get_path(&asset.path));
        }

        for long_path in &info.manifest {
            let manifest_path = self.runfiles.get_path(long_path);
            let text = self.read(&manifest_path, token)?;
            let manifest = Manifest::from_toml(&text).map_err(|source| LoadError::Parse {
                path: manifest_path.clone(),
                source,
            })?;
            for src in &manifest.src {
                let webpath = self.parse_webpath(&src.webpath, &manifest_path)?;
                assets.insert(webpath.clone(), self.runfiles.get_path(&src.path));
                webpaths.insert(webpath);
            }
            manifest_paths.insert(manifest_path);
        }

        token.check()?;
        Ok(Snapshot {
            assets,
            webpaths,
            manifest_paths,
        })
    }

    fn parse_webpath(&self, raw: &str, file: &Path) -> Result<WebPath, LoadError> {
        WebPath::parse(raw)
            .map(|p| p.normalize())
            .map_err(|source| LoadError::Webpath {
                path: file.to_path_buf(),
                source,
            })
    }

    /// Blocking read, bracketed by cancellation checks.
    fn read(&self, path: &Path, token: &CancelToken) -> Result<String, LoadError> {
        token.check()?;
        let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        token.check()?;
        Ok(text)
    }
}
