//! Decoded manifest records.
//!
//! The manifest text format is a thin collaborator of the core: these types
//! are plain `serde` decodes of the primary server configuration and of the
//! per-rule manifests it references. The loader only ever consumes the
//! decoded path lists.
//!
//! # Example
//!
//! ```toml
//! # server.toml — primary configuration
//! label = "//app:assets"
//! manifest = ["app/assets.manifest"]
//!
//! [[external_asset]]
//! webpath = "/vendor/lib.js"
//! path = "third_party/lib/lib.js"
//! ```
//!
//! ```toml
//! # assets.manifest — one entry per built file
//! [[src]]
//! webpath = "/app/main.js"
//! path = "out/app/main.js"
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

/// Primary server configuration: the manifests to serve plus any
/// externally-declared assets outside the manifest set.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerInfo {
    /// Display label shown on listing pages.
    #[serde(default = "default_label")]
    pub label: String,
    /// Execution-root relative paths of the manifest files to load.
    #[serde(default)]
    pub manifest: Vec<String>,
    /// Extra assets declared directly rather than through a manifest.
    #[serde(default)]
    pub external_asset: Vec<AssetInfo>,
}

fn default_label() -> String {
    "//".to_string()
}

/// One externally-declared asset.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetInfo {
    pub webpath: String,
    pub path: String,
}

/// A build-produced manifest: the (webpath, source file) pairs of one rule.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub src: Vec<ManifestSource>,
}

/// One (webpath, execution-root relative file) pair.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestSource {
    pub webpath: String,
    pub path: String,
}

impl ServerInfo {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

impl Manifest {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Best-effort read of the display label from the primary configuration.
///
/// Used at startup when no `--label` flag was given. Any read or decode
/// failure falls back to the default label; the loader will report the
/// real error on its first pass.
pub fn peek_label(config_path: &Path) -> String {
    fs::read_to_string(config_path)
        .ok()
        .and_then(|text| ServerInfo::from_toml(&text).ok())
        .map(|info| info.label)
        .unwrap_or_else(default_label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_info_decode() {
        let info = ServerInfo::from_toml(
            r#"
            label = "//app:assets"
            manifest = ["a.manifest", "b.manifest"]

            [[external_asset]]
            webpath = "/vendor/lib.js"
            path = "third_party/lib/lib.js"
            "#,
        )
        .unwrap();

        assert_eq!(info.label, "//app:assets");
        assert_eq!(info.manifest, ["a.manifest", "b.manifest"]);
        assert_eq!(info.external_asset.len(), 1);
        assert_eq!(info.external_asset[0].webpath, "/vendor/lib.js");
    }

    #[test]
    fn test_server_info_defaults() {
        let info = ServerInfo::from_toml("").unwrap();
        assert_eq!(info.label, "//");
        assert!(info.manifest.is_empty());
        assert!(info.external_asset.is_empty());
    }

    #[test]
    fn test_manifest_decode() {
        let manifest = Manifest::from_toml(
            r#"
            [[src]]
            webpath = "/app/main.js"
            path = "out/app/main.js"

            [[src]]
            webpath = "/app/main.css"
            path = "out/app/main.css"
            "#,
        )
        .unwrap();

        assert_eq!(manifest.src.len(), 2);
        assert_eq!(manifest.src[1].webpath, "/app/main.css");
    }

    #[test]
    fn test_manifest_rejects_unknown_fields() {
        assert!(Manifest::from_toml("[[src]]\nwebpath = \"/a\"\npath = \"a\"\nbogus = 1").is_err());
        assert!(Manifest::from_toml("bogus = 1").is_err());
    }

    #[test]
    fn test_server_info_rejects_unknown_fields() {
        assert!(ServerInfo::from_toml("labell = \"//typo\"").is_err());
        assert!(ServerInfo::from_toml(
            "[[external_asset]]\nwebpath = \"/a\"\npath = \"a\"\nbogus = 1"
        )
        .is_err());
    }
}
