//! jbup manifest handling
//!
//! Build identifier parsing and compatibility ranges, plus the scanner that
//! turns a JetBrains plugins directory into a registry of installed plugins.

pub mod build_id;
pub mod errors;
pub mod scanner;
pub mod types;

pub use build_id::{in_range, BuildComponent, BuildIdentifier, CompatibilityRange};
pub use errors::{BuildParseError, ManifestError, ScanError};
pub use scanner::{scan, scan_plugin_dir};
pub use types::{PluginManifest, PluginRecord, Registry};
