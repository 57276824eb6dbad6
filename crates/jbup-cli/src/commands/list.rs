//! `--list`: installed plugins and their compatibility with the build

use super::update::bound_label;
use crate::orchestrator::{list_registry, ListEntry};
use colored::Colorize;
use jbup_manifest::{BuildIdentifier, Registry};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ListDocument<'r> {
    build: &'r BuildIdentifier,
    plugins_dir: &'r Path,
    plugins: Vec<ListEntry<'r>>,
}

pub fn print_list(
    registry: &Registry,
    build: &BuildIdentifier,
    plugins_dir: &Path,
    json: bool,
) -> Result<(), serde_json::Error> {
    let entries = list_registry(registry, build);

    if json {
        let document = ListDocument {
            build,
            plugins_dir,
            plugins: entries,
        };
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No plugins found in {}", plugins_dir.display());
        return Ok(());
    }

    println!("Installed plugins for build {}:", build);
    for line in format_rows(&entries) {
        println!("{}", line);
    }
    Ok(())
}

fn format_rows(entries: &[ListEntry<'_>]) -> Vec<String> {
    let id_width = entries.iter().map(|e| e.record.id.chars().count()).max().unwrap_or(0);
    let version_width = entries
        .iter()
        .map(|e| e.record.version_or_unknown().chars().count())
        .max()
        .unwrap_or(0);

    entries
        .iter()
        .map(|entry| {
            let status = if entry.compatible {
                "OK".green()
            } else {
                "incompatible".red()
            };
            format!(
                "- {:<id_width$}  {:<version_width$}  [since={:<8} until={:<8}]  {}",
                entry.record.id,
                entry.record.version_or_unknown(),
                bound_label(entry.record.compatibility.since.as_deref()),
                bound_label(entry.record.compatibility.until.as_deref()),
                status,
            )
        })
        .collect()
}
