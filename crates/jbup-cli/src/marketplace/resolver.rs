//! Plugin id -> artifact URL resolution

use super::transport::HttpTransport;
use crate::deadline::Deadline;
use crate::errors::ResolutionError;
use jbup_manifest::BuildIdentifier;
use std::collections::BTreeMap;
use url::Url;

/// Path prefix of artifact URLs that may be served by a distribution host
const FILES_PREFIX: &str = "/files/";

/// Endpoints of a plugin marketplace
#[derive(Debug, Clone)]
pub struct Marketplace {
    base: Url,
}

impl Marketplace {
    pub fn new(base: &str) -> Result<Self, url::ParseError> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    /// Host whose `/files/` URLs are eligible for rewriting
    pub fn host(&self) -> Option<&str> {
        self.base.host_str()
    }

    /// Scheme, host and port of the marketplace; relative redirects resolve here
    pub fn authority(&self) -> Url {
        let mut authority = self.base.clone();
        authority.set_path("/");
        authority.set_query(None);
        authority.set_fragment(None);
        authority
    }

    pub fn plugin_manager_url(&self, plugin_id: &str, build: &str) -> Result<Url, ResolutionError> {
        self.endpoint(
            "pluginManager",
            &[("action", "download"), ("id", plugin_id), ("build", build)],
        )
    }

    pub fn version_download_url(&self, plugin_id: &str, version: &str) -> Result<Url, ResolutionError> {
        self.endpoint(
            "plugin/download",
            &[("pluginId", plugin_id), ("version", version)],
        )
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ResolutionError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|source| ResolutionError::InvalidUrl {
                url: format!("{}{}", self.base, path),
                source,
            })?;
        url.query_pairs_mut().extend_pairs(params.iter().copied());
        Ok(url)
    }
}

/// How the artifact for one plugin is chosen, highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy<'a> {
    /// Caller-supplied URL, used verbatim
    Direct(&'a str),
    /// A specific marketplace version
    Pinned(&'a str),
    /// Whatever the marketplace considers compatible with the build
    Build(&'a BuildIdentifier),
}

impl<'a> Strategy<'a> {
    pub fn select(
        plugin_id: &str,
        direct: &'a BTreeMap<String, String>,
        pins: &'a BTreeMap<String, String>,
        build: &'a BuildIdentifier,
    ) -> Self {
        if let Some(url) = direct.get(plugin_id) {
            Strategy::Direct(url)
        } else if let Some(version) = pins.get(plugin_id) {
            Strategy::Pinned(version)
        } else {
            Strategy::Build(build)
        }
    }

    fn pinned_version(&self) -> Option<&'a str> {
        match *self {
            Strategy::Pinned(version) => Some(version),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    pub artifact_url: Url,
    pub best_effort_version: Option<String>,
}

pub fn resolve(
    transport: &dyn HttpTransport,
    marketplace: &Marketplace,
    plugin_id: &str,
    strategy: Strategy<'_>,
    deadline: &Deadline,
) -> Result<ResolutionResult, ResolutionError> {
    let (request, context) = match strategy {
        Strategy::Direct(raw) => {
            let artifact_url = Url::parse(raw).map_err(|source| ResolutionError::InvalidUrl {
                url: raw.to_string(),
                source,
            })?;
            tracing::debug!("{}: using direct URL {}", plugin_id, artifact_url);
            let best_effort_version = best_effort_version(&artifact_url, None);
            return Ok(ResolutionResult {
                artifact_url,
                best_effort_version,
            });
        }
        Strategy::Pinned(version) => (
            marketplace.version_download_url(plugin_id, version)?,
            format!("version {}", version),
        ),
        Strategy::Build(build) => {
            let build = build.to_string();
            (
                marketplace.plugin_manager_url(plugin_id, &build)?,
                format!("build {}", build),
            )
        }
    };

    deadline.check()?;
    let response = transport.get(&request)?;
    let artifact_url = if response.status.is_redirection() {
        let Some(location) = response.location else {
            return Err(ResolutionError::MissingLocation {
                plugin_id: plugin_id.to_string(),
            });
        };
        marketplace
            .authority()
            .join(&location)
            .map_err(|source| ResolutionError::InvalidUrl {
                url: location.clone(),
                source,
            })?
    } else if response.status.is_success() {
        request
    } else {
        return Err(ResolutionError::Status {
            plugin_id: plugin_id.to_string(),
            context,
            status: response.status,
        });
    };

    tracing::debug!("{}: resolved to {}", plugin_id, artifact_url);
    let best_effort_version = best_effort_version(&artifact_url, strategy.pinned_version());
    Ok(ResolutionResult {
        artifact_url,
        best_effort_version,
    })
}

/// Swap a canonical-host artifact URL onto the distribution host.
///
/// Only URLs on `canonical_host` whose path starts with `/files/` are
/// rewritten. The result is always `https` and keeps path and query.
pub fn rewrite_host(
    url: &Url,
    canonical_host: &str,
    downloads_host: &str,
) -> Result<Url, ResolutionError> {
    let eligible = url
        .host_str()
        .is_some_and(|host| host.eq_ignore_ascii_case(canonical_host))
        && url.path().starts_with(FILES_PREFIX);
    if !eligible || downloads_host.trim().is_empty() {
        return Ok(url.clone());
    }

    let raw = format!("https://{}{}", downloads_host.trim(), url.path());
    let mut rewritten = Url::parse(&raw).map_err(|source| ResolutionError::InvalidUrl {
        url: raw.clone(),
        source,
    })?;
    rewritten.set_query(url.query());
    Ok(rewritten)
}

/// Version shown to the user before downloading: the pin when there is
/// one, otherwise guessed from a `<name>-<version>.zip` file name.
pub fn best_effort_version(url: &Url, pinned: Option<&str>) -> Option<String> {
    if let Some(version) = pinned {
        return Some(version.to_string());
    }

    let file_name = url.path_segments()?.next_back()?;
    let stem = file_name.strip_suffix(".zip").unwrap_or(file_name);
    stem.rsplit('-')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}
