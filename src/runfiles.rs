//! Execution-root resolution for runtime data dependencies.
//!
//! Manifests address files by execution-root relative "long paths"; the
//! server's own runtime dependencies live under the same root and are
//! reachable through the reserved `/_/runfiles` prefix.

use std::env;
use std::path::{Path, PathBuf};

/// Root directory of the program's declared runtime data dependencies.
#[derive(Debug, Clone)]
pub struct Runfiles {
    root: PathBuf,
}

impl Runfiles {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Locate the execution root: an explicit override, the `RUNFILES_DIR`
    /// environment variable, or the parent directory as the conventional
    /// default when launched from inside a runfiles tree.
    pub fn discover(root_override: Option<PathBuf>) -> Self {
        let root = root_override
            .or_else(|| env::var_os("RUNFILES_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(".."));
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an execution-root relative long path to a filesystem path.
    pub fn get_path(&self, long_path: &str) -> PathBuf {
        self.root.join(long_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_path_joins_under_root() {
        let runfiles = Runfiles::new(PathBuf::from("/exec/root"));
        assert_eq!(
            runfiles.get_path("repo/app/main.js"),
            PathBuf::from("/exec/root/repo/app/main.js")
        );
    }

    #[test]
    fn test_discover_prefers_override() {
        let runfiles = Runfiles::discover(Some(PathBuf::from("/custom")));
        assert_eq!(runfiles.root(), Path::new("/custom"));
    }
}
