//! Per-plugin update loop
//!
//! Plugins are processed one at a time: resolve, rewrite host, download,
//! install, re-scan. A failure is recorded against its plugin and the loop
//! moves on.

use crate::deadline::Deadline;
use crate::errors::UpdateError;
use crate::install::{self, ArchiveExtractor};
use crate::marketplace::{resolve, rewrite_host, HttpTransport, Marketplace, ResolutionResult, Strategy};
use jbup_manifest::{scan_plugin_dir, BuildIdentifier, PluginRecord, Registry};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Plugin ids to consider; empty means all
    pub only: Vec<String>,
    pub only_incompatible: bool,
    pub downloads_host: Option<String>,
    pub pins: BTreeMap<String, String>,
    pub direct: BTreeMap<String, String>,
    pub dry_run: bool,
    pub max_redirects: u32,
    pub plugin_timeout: Option<Duration>,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            only: Vec::new(),
            only_incompatible: false,
            downloads_host: None,
            pins: BTreeMap::new(),
            direct: BTreeMap::new(),
            dry_run: false,
            max_redirects: jbup_config::DEFAULT_MAX_REDIRECTS,
            plugin_timeout: Some(Duration::from_secs(jbup_config::DEFAULT_PLUGIN_TIMEOUT_SECS)),
        }
    }
}

/// Result of re-scanning a freshly installed plugin directory
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub post_install: Option<PluginRecord>,
    pub is_compatible: bool,
    pub backup: Option<PathBuf>,
}

#[derive(Debug)]
pub enum PluginOutcome {
    Updated {
        id: String,
        from_version: Option<String>,
        resolution: ResolutionResult,
        outcome: InstallOutcome,
    },
    DryRun {
        id: String,
        from_version: Option<String>,
        resolution: ResolutionResult,
        target: PathBuf,
    },
    Failed {
        id: String,
        error: UpdateError,
    },
}

impl PluginOutcome {
    pub fn id(&self) -> &str {
        match self {
            PluginOutcome::Updated { id, .. }
            | PluginOutcome::DryRun { id, .. }
            | PluginOutcome::Failed { id, .. } => id,
        }
    }
}

/// Progress notifications emitted while the loop runs
#[derive(Debug)]
pub enum UpdateEvent<'e> {
    Started(&'e PluginRecord),
    Resolved {
        record: &'e PluginRecord,
        resolution: &'e ResolutionResult,
    },
    Finished(&'e PluginOutcome),
}

#[derive(Debug, Default)]
pub struct UpdateReport {
    pub outcomes: Vec<PluginOutcome>,
}

impl UpdateReport {
    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, PluginOutcome::Updated { .. }))
    }

    pub fn dry_run(&self) -> usize {
        self.count(|o| matches!(o, PluginOutcome::DryRun { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, PluginOutcome::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    fn count(&self, pred: impl Fn(&PluginOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}

/// Apply the allow-list, then the only-incompatible filter
pub fn select_candidates<'r>(
    registry: &'r Registry,
    build: &BuildIdentifier,
    options: &UpdateOptions,
) -> Vec<&'r PluginRecord> {
    registry
        .values()
        .filter(|record| options.only.is_empty() || options.only.contains(&record.id))
        .filter(|record| !options.only_incompatible || !record.is_compatible_with(build))
        .collect()
}

/// One row of `--list` output
#[derive(Debug, Clone, Serialize)]
pub struct ListEntry<'r> {
    #[serde(flatten)]
    pub record: &'r PluginRecord,
    pub compatible: bool,
}

pub fn list_registry<'r>(registry: &'r Registry, build: &BuildIdentifier) -> Vec<ListEntry<'r>> {
    registry
        .values()
        .map(|record| ListEntry {
            record,
            compatible: record.is_compatible_with(build),
        })
        .collect()
}

pub struct Orchestrator<'a> {
    transport: &'a dyn HttpTransport,
    extractor: &'a dyn ArchiveExtractor,
    marketplace: &'a Marketplace,
    options: &'a UpdateOptions,
    build: &'a BuildIdentifier,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        transport: &'a dyn HttpTransport,
        extractor: &'a dyn ArchiveExtractor,
        marketplace: &'a Marketplace,
        options: &'a UpdateOptions,
        build: &'a BuildIdentifier,
    ) -> Self {
        Self {
            transport,
            extractor,
            marketplace,
            options,
            build,
        }
    }

    pub fn run(&self, registry: &Registry, mut on_event: impl FnMut(UpdateEvent<'_>)) -> UpdateReport {
        let mut report = UpdateReport::default();

        for record in select_candidates(registry, self.build, self.options) {
            on_event(UpdateEvent::Started(record));
            jbup_logger::set_current_plugin(Some(record.id.clone()));

            let outcome = self
                .update_one(record, &mut on_event)
                .unwrap_or_else(|error| {
                    tracing::debug!("{} failed: {:?}", record.id, error);
                    PluginOutcome::Failed {
                        id: record.id.clone(),
                        error,
                    }
                });

            jbup_logger::set_current_plugin(None);
            on_event(UpdateEvent::Finished(&outcome));
            report.outcomes.push(outcome);
        }

        report
    }

    fn update_one(
        &self,
        record: &PluginRecord,
        on_event: &mut impl FnMut(UpdateEvent<'_>),
    ) -> Result<PluginOutcome, UpdateError> {
        let deadline = self
            .options
            .plugin_timeout
            .map_or_else(Deadline::none, Deadline::after);

        let strategy = Strategy::select(&record.id, &self.options.direct, &self.options.pins, self.build);
        let mut resolution = resolve(self.transport, self.marketplace, &record.id, strategy, &deadline)?;
        if let (Some(downloads_host), Some(canonical)) =
            (self.options.downloads_host.as_deref(), self.marketplace.host())
        {
            resolution.artifact_url = rewrite_host(&resolution.artifact_url, canonical, downloads_host)?;
        }
        on_event(UpdateEvent::Resolved {
            record,
            resolution: &resolution,
        });

        if self.options.dry_run {
            return Ok(PluginOutcome::DryRun {
                id: record.id.clone(),
                from_version: record.installed_version.clone(),
                resolution,
                target: record.install_path.clone(),
            });
        }

        let archive = tempfile::Builder::new()
            .prefix(&format!("jbup-{}-", sanitize_id(&record.id)))
            .suffix(".zip")
            .tempfile()
            .map_err(UpdateError::TempFile)?;

        jbup_logger::spinner_message(&format!("Downloading {}", resolution.artifact_url));
        install::download(
            self.transport,
            &resolution.artifact_url,
            archive.path(),
            self.options.max_redirects,
            &deadline,
        )?;

        let installed = install::extract_and_install(
            self.extractor,
            archive.path(),
            &record.install_path,
            chrono::Utc::now().timestamp(),
        )?;

        let post_install = scan_plugin_dir(&installed.installed_to);
        let is_compatible = post_install
            .as_ref()
            .is_some_and(|post| post.is_compatible_with(self.build));

        Ok(PluginOutcome::Updated {
            id: record.id.clone(),
            from_version: record.installed_version.clone(),
            resolution,
            outcome: InstallOutcome {
                post_install,
                is_compatible,
                backup: installed.backup,
            },
        })
    }
}

/// Plugin id reduced to characters safe in a file name
fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
