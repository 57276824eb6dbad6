//! Error types for the jbup update pipeline
//!
//! `ConfigurationError` aborts a run. Everything else is scoped to one plugin
//! and collected into [`UpdateError`] by the orchestrator.

use reqwest::StatusCode;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Fatal setup problems; the CLI exits with status 2
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Plugins directory not set; pass --plugins-dir or run `jbup config set plugins-dir DIR`")]
    MissingPluginsDir,

    #[error("Plugins dir not found: {0}")]
    PluginsDirNotFound(PathBuf),

    #[error("Could not detect IDE build; pass --build, e.g. --build RM-252.23892.415")]
    UnresolvedBuild,

    #[error("Invalid build '{0}'; expected something like RM-252.23892.415")]
    InvalidBuild(String),

    #[error("Invalid {flag} value '{value}'; expected ID=VALUE")]
    InvalidPair { flag: &'static str, value: String },

    #[error("Invalid marketplace URL '{url}': {source}")]
    InvalidMarketplace {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Config(#[from] jbup_config::ConfigError),

    #[error(transparent)]
    Scan(#[from] jbup_manifest::ScanError),

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

/// The marketplace could not turn a plugin id into an artifact URL
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Marketplace answered HTTP {status} for {plugin_id} ({context})")]
    Status {
        plugin_id: String,
        context: String,
        status: StatusCode,
    },

    #[error("Marketplace redirect for {plugin_id} has no Location header")]
    MissingLocation { plugin_id: String },

    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {} {message} for {url}", .status.as_u16())]
    Status {
        status: StatusCode,
        message: String,
        url: String,
    },

    #[error("Too many redirects (limit {limit}) fetching {url}")]
    TooManyRedirects { limit: u32, url: String },

    #[error("Redirect from {url} has no Location header")]
    MissingLocation { url: String },

    #[error("Invalid redirect location '{location}': {source}")]
    InvalidLocation {
        location: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Gave up after {0:?}")]
    DeadlineExceeded(Duration),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("{tool} not available; install it or set extractor = \"builtin\"")]
    Unavailable { tool: &'static str },

    #[error("{tool} failed for {archive} (exit {status:?}): {stderr}")]
    Failed {
        tool: &'static str,
        archive: PathBuf,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Invalid archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Install destination has no parent directory: {0}")]
    InvalidDestination(PathBuf),

    #[error("Failed to prepare {path}: {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to back up {from} to {to}: {source}")]
    Backup {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "Failed to move {from} into {to}: {source}{}",
        rollback_note(.backup, .restored)
    )]
    MoveIn {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
        backup: Option<PathBuf>,
        restored: bool,
    },
}

fn rollback_note(backup: &Option<PathBuf>, restored: &bool) -> String {
    match (backup, *restored) {
        (Some(_), true) => " (previous version restored)".to_string(),
        (Some(path), false) => format!(" (previous version left at {})", path.display()),
        (None, _) => String::new(),
    }
}

/// Anything that can stop a single plugin's update
#[derive(Error, Debug)]
pub enum UpdateError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error("Failed to create temporary file: {0}")]
    TempFile(#[source] io::Error),
}
