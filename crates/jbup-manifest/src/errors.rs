use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from reading a single plugin manifest.
///
/// The scanner treats all of these as "plugin absent" rather than failures.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed plugin.xml: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Failed to read archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("plugin.xml has no <id> or <name>")]
    MissingId,

    #[error("No plugin.xml found in {0}")]
    NotFound(PathBuf),
}

/// Errors that abort a whole registry scan
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Plugins directory not found: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to read plugins directory {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildParseError {
    #[error("Unparseable build identifier: '{0}'")]
    Unparseable(String),
}
