//! Plugin descriptors produced by a registry scan

use crate::build_id::{BuildIdentifier, CompatibilityRange};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Fields read out of a single `plugin.xml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginManifest {
    pub id: String,
    pub version: Option<String>,
    pub compatibility: CompatibilityRange,
}

/// One scan's snapshot of an installed plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginRecord {
    pub id: String,
    pub installed_version: Option<String>,
    pub install_path: PathBuf,
    /// Directory name under the plugins root
    pub folder: String,
    pub compatibility: CompatibilityRange,
}

impl PluginRecord {
    pub fn from_manifest(manifest: PluginManifest, install_path: PathBuf) -> Self {
        let folder = install_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            id: manifest.id,
            installed_version: manifest.version,
            install_path,
            folder,
            compatibility: manifest.compatibility,
        }
    }

    pub fn is_compatible_with(&self, build: &BuildIdentifier) -> bool {
        self.compatibility.contains(build)
    }

    pub fn version_or_unknown(&self) -> &str {
        self.installed_version.as_deref().unwrap_or("unknown")
    }
}

/// Installed plugins keyed by plugin id
pub type Registry = BTreeMap<String, PluginRecord>;
