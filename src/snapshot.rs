//! Immutable build-graph snapshots and their publish slot.
//!
//! A [`Snapshot`] is built in full by one loader run and never mutated
//! afterwards; the [`Container`] holds the currently published snapshot and
//! swaps it atomically. Request handlers capture the snapshot once and keep
//! that reference for the whole request, so a reload happening mid-request
//! never changes what the request sees. Superseded snapshots stay alive for
//! as long as some in-flight request still holds them.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use rustc_hash::FxHashSet;

use crate::webpath::WebPath;

/// Point-in-time mapping from web paths to backing files.
#[derive(Debug, Default)]
pub struct Snapshot {
    /// Served assets, sorted by web path.
    pub assets: BTreeMap<WebPath, PathBuf>,
    /// Web paths declared by manifests (the listing set).
    pub webpaths: BTreeSet<WebPath>,
    /// Manifest files this snapshot was built from, watched for changes.
    pub manifest_paths: FxHashSet<PathBuf>,
}

impl Snapshot {
    /// The snapshot served before the first load completes.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Single slot holding the currently published [`Snapshot`].
///
/// Reads are lock-free and never observe a partially-built snapshot.
/// Scoped to one server instance so independent instances can coexist.
pub struct Container {
    current: ArcSwap<Snapshot>,
}

impl Container {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::empty()),
        }
    }

    /// Capture the current snapshot. Call once per request.
    pub fn capture(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Publish a fully-built snapshot, superseding the previous one.
    pub fn publish(&self, snapshot: Snapshot) {
        self.current.store(Arc::new(snapshot));
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with(path: &str, file: &str) -> Snapshot {
        let webpath = WebPath::parse(path).unwrap();
        let mut snapshot = Snapshot::empty();
        snapshot.assets.insert(webpath.clone(), PathBuf::from(file));
        snapshot.webpaths.insert(webpath);
        snapshot
    }

    #[test]
    fn test_initial_snapshot_is_empty() {
        let container = Container::new();
        let snapshot = container.capture();
        assert!(snapshot.assets.is_empty());
        assert!(snapshot.webpaths.is_empty());
        assert!(snapshot.manifest_paths.is_empty());
    }

    #[test]
    fn test_publish_replaces_wholesale() {
        let container = Container::new();
        container.publish(snapshot_with("/a.js", "a.js"));
        container.publish(snapshot_with("/b.js", "b.js"));

        let current = container.capture();
        assert!(!current.assets.contains_key(&WebPath::parse("/a.js").unwrap()));
        assert!(current.assets.contains_key(&WebPath::parse("/b.js").unwrap()));
    }

    #[test]
    fn test_captured_snapshot_is_isolated_from_publish() {
        let container = Container::new();
        container.publish(snapshot_with("/a.js", "a.js"));

        // A request captures S1, then a concurrent reload publishes S2.
        let captured = container.capture();
        container.publish(snapshot_with("/b.js", "b.js"));

        // The request keeps seeing S1 for its entire duration.
        assert!(captured.assets.contains_key(&WebPath::parse("/a.js").unwrap()));
        assert!(!captured.assets.contains_key(&WebPath::parse("/b.js").unwrap()));

        // A later capture sees S2.
        let fresh = container.capture();
        assert!(fresh.assets.contains_key(&WebPath::parse("/b.js").unwrap()));
    }
}
