//! The default command: update (or list) installed plugins

use super::list;
use crate::common::GlobalOpts;
use crate::errors::ConfigurationError;
use crate::install::extractor_for;
use crate::marketplace::{Marketplace, ReqwestTransport};
use crate::orchestrator::{
    select_candidates, Orchestrator, PluginOutcome, UpdateEvent, UpdateOptions, UpdateReport,
};
use crate::probe::{default_probes, detect_build};
use clap::Args;
use colored::Colorize;
use jbup_config::{Config, ExtractorKind};
use jbup_manifest::{BuildIdentifier, PluginRecord};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args, Debug, Clone, Default)]
pub struct UpdateArgs {
    /// Plugins directory, e.g. ~/Library/Application Support/JetBrains/RubyMine2025.2/plugins
    #[arg(long, value_name = "DIR")]
    pub plugins_dir: Option<PathBuf>,

    /// IDE build, e.g. RM-252.23892.415 (auto-detected if omitted)
    #[arg(long, value_name = "BUILD")]
    pub build: Option<String>,

    /// Comma-separated plugin ids to update (default: all installed)
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub only: Vec<String>,

    /// Only update plugins whose declared range excludes the current build
    #[arg(long)]
    pub only_incompatible: bool,

    /// Rewrite marketplace /files/ URLs to this host
    #[arg(long, value_name = "HOST")]
    pub downloads_host: Option<String>,

    /// Pin a plugin to a version: ID=VERSION (repeatable)
    #[arg(long, value_name = "ID=VERSION")]
    pub pin: Vec<String>,

    /// Download a plugin from this URL: ID=URL (repeatable)
    #[arg(long, value_name = "ID=URL")]
    pub direct: Vec<String>,

    /// Show what would be installed without downloading
    #[arg(long)]
    pub dry_run: bool,

    /// List installed plugins with their compatibility and exit
    #[arg(long)]
    pub list: bool,

    /// Print the --list output as JSON
    #[arg(long, requires = "list")]
    pub json: bool,

    /// Exit with status 1 when any plugin fails to update
    #[arg(long)]
    pub fail_on_error: bool,
}

/// Everything a run needs once flags and config are merged
#[derive(Debug)]
pub struct Settings {
    pub plugins_dir: PathBuf,
    pub explicit_build: Option<String>,
    pub marketplace: Marketplace,
    pub extractor: ExtractorKind,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub options: UpdateOptions,
}

impl Settings {
    /// Merge flags over config. Flags win; pin and direct maps are merged
    /// with flag entries replacing config entries for the same id.
    pub fn resolve(args: &UpdateArgs, config: &Config) -> Result<Self, ConfigurationError> {
        let plugins_dir = args
            .plugins_dir
            .clone()
            .or_else(|| config.plugins_dir_path())
            .ok_or(ConfigurationError::MissingPluginsDir)?;
        if !plugins_dir.is_dir() {
            return Err(ConfigurationError::PluginsDirNotFound(plugins_dir));
        }

        let mut pins = config.pins.clone();
        pins.extend(parse_pairs("--pin", &args.pin)?);
        let mut direct = config.direct.clone();
        direct.extend(parse_pairs("--direct", &args.direct)?);

        let marketplace_url = config.marketplace_url();
        let marketplace =
            Marketplace::new(marketplace_url).map_err(|source| ConfigurationError::InvalidMarketplace {
                url: marketplace_url.to_string(),
                source,
            })?;

        let options = UpdateOptions {
            only: args
                .only
                .iter()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect(),
            only_incompatible: args.only_incompatible,
            downloads_host: args
                .downloads_host
                .clone()
                .or_else(|| config.downloads_host.clone())
                .filter(|host| !host.trim().is_empty()),
            pins,
            direct,
            dry_run: args.dry_run,
            max_redirects: config.max_redirects(),
            plugin_timeout: Some(config.plugin_timeout()).filter(|t| !t.is_zero()),
        };

        Ok(Self {
            plugins_dir,
            explicit_build: args.build.clone().or_else(|| config.build.clone()),
            marketplace,
            extractor: config.extractor_kind()?,
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
            options,
        })
    }
}

/// Split `ID=VALUE` flag values; both halves must be non-empty
pub fn parse_pairs(
    flag: &'static str,
    values: &[String],
) -> Result<BTreeMap<String, String>, ConfigurationError> {
    values
        .iter()
        .map(|raw| {
            raw.split_once('=')
                .map(|(id, value)| (id.trim(), value.trim()))
                .filter(|(id, value)| !id.is_empty() && !value.is_empty())
                .map(|(id, value)| (id.to_string(), value.to_string()))
                .ok_or_else(|| ConfigurationError::InvalidPair {
                    flag,
                    value: raw.clone(),
                })
        })
        .collect()
}

/// Explicit build (flag or config) if given, otherwise the probes
pub fn resolve_build(settings: &Settings, config: &Config) -> Result<BuildIdentifier, ConfigurationError> {
    if let Some(raw) = settings.explicit_build.as_deref() {
        return BuildIdentifier::parse(raw)
            .ok_or_else(|| ConfigurationError::InvalidBuild(raw.to_string()));
    }

    let products = config.product_table();
    let probes = default_probes(&products);
    let build = detect_build(&probes).ok_or(ConfigurationError::UnresolvedBuild)?;
    jbup_logger::debug(&format!("Detected IDE build {}", build));
    Ok(build)
}

/// How a completed run should exit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    PluginFailures,
}

impl RunStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Success => 0,
            RunStatus::PluginFailures => 1,
        }
    }
}

pub fn handle_update(args: &UpdateArgs, opts: &GlobalOpts) -> Result<RunStatus, ConfigurationError> {
    let config_path = opts.config_path();
    jbup_logger::debug(&format!("Reading config from: {}", config_path.display()));
    let config = Config::load_from_path(&config_path)?;

    let settings = Settings::resolve(args, &config)?;
    let build = resolve_build(&settings, &config)?;
    let registry = jbup_manifest::scan(&settings.plugins_dir)?;
    jbup_logger::debug(&format!(
        "Found {} plugin(s) in {}",
        registry.len(),
        settings.plugins_dir.display()
    ));

    if args.list {
        list::print_list(&registry, &build, &settings.plugins_dir, args.json)?;
        return Ok(RunStatus::Success);
    }

    let candidates = select_candidates(&registry, &build, &settings.options);
    if candidates.is_empty() {
        println!(
            "No matching plugins to update in {}",
            settings.plugins_dir.display()
        );
        return Ok(RunStatus::Success);
    }

    println!("Build: {}", build);
    println!("Checking {} plugin(s)", candidates.len());

    let transport = ReqwestTransport::new(settings.connect_timeout, settings.read_timeout)?;
    let extractor = extractor_for(settings.extractor);
    let orchestrator = Orchestrator::new(
        &transport,
        extractor.as_ref(),
        &settings.marketplace,
        &settings.options,
        &build,
    );
    let report = orchestrator.run(&registry, |event| print_event(&event, settings.options.dry_run));

    print_summary(&report, settings.options.dry_run);

    if report.has_failures() && args.fail_on_error {
        Ok(RunStatus::PluginFailures)
    } else {
        Ok(RunStatus::Success)
    }
}

fn print_event(event: &UpdateEvent<'_>, dry_run: bool) {
    match event {
        UpdateEvent::Started(record) => {
            jbup_logger::spinner_start(&format!("Resolving {}", record.id));
        }
        UpdateEvent::Resolved { record, resolution } => {
            jbup_logger::spinner_stop();
            println!(
                "[{}] {} -> {}",
                record.id.bold(),
                record.version_or_unknown(),
                resolution.best_effort_version.as_deref().unwrap_or("?")
            );
            println!("  URL: {}", resolution.artifact_url);
            if !dry_run {
                jbup_logger::spinner_start(&format!("Installing {}", record.id));
            }
        }
        UpdateEvent::Finished(outcome) => print_outcome(outcome),
    }
}

fn print_outcome(outcome: &PluginOutcome) {
    match outcome {
        PluginOutcome::DryRun { target, .. } => {
            jbup_logger::spinner_stop();
            println!("  (dry-run) would download and install into {}", target.display());
        }
        PluginOutcome::Updated { id, outcome, .. } => {
            if let Some(backup) = &outcome.backup {
                jbup_logger::debug(&format!("Previous version kept at {}", backup.display()));
            }
            match &outcome.post_install {
                Some(post) => {
                    let note = if outcome.is_compatible {
                        String::new()
                    } else {
                        format!(" {}", "(still incompatible!)".yellow())
                    };
                    jbup_logger::spinner_success(&format!(
                        "installed: {} {} {}{}",
                        post.id,
                        post.version_or_unknown(),
                        range_label(post),
                        note
                    ));
                }
                None => {
                    jbup_logger::spinner_stop();
                    jbup_logger::warn(&format!(
                        "[{}] installed, but no plugin manifest was found afterwards",
                        id
                    ));
                }
            }
        }
        PluginOutcome::Failed { id, error } => {
            jbup_logger::spinner_error(&format!("[{}] failed: {}", id, error));
        }
    }
}

/// A declared bound, or `-` when absent or empty
pub fn bound_label(bound: Option<&str>) -> &str {
    bound.filter(|b| !b.trim().is_empty()).unwrap_or("-")
}

pub fn range_label(record: &PluginRecord) -> String {
    format!(
        "[since={} until={}]",
        bound_label(record.compatibility.since.as_deref()),
        bound_label(record.compatibility.until.as_deref())
    )
}

fn print_summary(report: &UpdateReport, dry_run: bool) {
    if dry_run {
        println!(
            "Dry run: {} plugin(s) would be updated, {} failed to resolve.",
            report.dry_run(),
            report.failed()
        );
        return;
    }

    println!(
        "Done. {} updated, {} failed.",
        report.updated(),
        report.failed()
    );
    if report.updated() > 0 {
        println!("Restart the IDE to load updated plugins.");
    }
    if report.has_failures() {
        jbup_logger::show_log_path();
    }
}
