//! IDE build detection
//!
//! Detection is an ordered list of independent probes; the first one that
//! yields a build wins. Each probe swallows its own failures.

use jbup_config::ProductTable;
use jbup_manifest::BuildIdentifier;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment variable naming an IDE launcher to ask for `--version`
pub const IDE_BIN_ENV: &str = "JBUP_IDE_BIN";

const BUILD_TXT: &str = "build.txt";
const BUILD_MARKER: &str = "Build";

pub type Probe<'a> = Box<dyn Fn() -> Option<BuildIdentifier> + 'a>;

pub fn detect_build(probes: &[Probe<'_>]) -> Option<BuildIdentifier> {
    probes.iter().find_map(|probe| probe())
}

/// Probes in priority order: `JBUP_IDE_BIN`, app bundles, launchers on
/// `PATH`. An explicit `--build` never reaches detection.
pub fn default_probes(products: &ProductTable) -> Vec<Probe<'_>> {
    vec![
        Box::new(from_env_binary) as Probe<'_>,
        Box::new(move || from_app_bundles(products, &application_dirs())),
        Box::new(move || from_path_binaries(products)),
    ]
}

fn from_env_binary() -> Option<BuildIdentifier> {
    let bin = std::env::var_os(IDE_BIN_ENV)?;
    let bin = PathBuf::from(bin);
    tracing::debug!("probing {} from {}", bin.display(), IDE_BIN_ENV);
    run_version(&bin)
}

/// Directories searched for `<App>.app` bundles
pub fn application_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from("/Applications")];
    if let Some(home) = dirs::home_dir() {
        dirs.push(home.join("Applications"));
    }
    dirs
}

pub fn from_app_bundles(products: &ProductTable, app_dirs: &[PathBuf]) -> Option<BuildIdentifier> {
    products.products().iter().find_map(|product| {
        product.app_names.iter().find_map(|app| {
            app_dirs.iter().find_map(|dir| {
                let contents = dir.join(format!("{}.app", app)).join("Contents");
                if !contents.is_dir() {
                    return None;
                }
                tracing::debug!("probing app bundle {}", contents.display());
                read_build_txt(&contents.join("Resources").join(BUILD_TXT)).or_else(|| {
                    product
                        .binaries
                        .iter()
                        .map(|bin| contents.join("MacOS").join(bin))
                        .filter(|bin| bin.is_file())
                        .find_map(|bin| run_version(&bin))
                })
            })
        })
    })
}

pub fn from_path_binaries(products: &ProductTable) -> Option<BuildIdentifier> {
    products.products().iter().find_map(|product| {
        product.binaries.iter().find_map(|name| {
            let bin = which::which(name).ok()?;
            tracing::debug!("probing {} on PATH", bin.display());
            let resolved = fs::canonicalize(&bin).unwrap_or_else(|_| bin.clone());
            ide_home(&resolved)
                .and_then(|home| read_build_txt(&home.join(BUILD_TXT)))
                .or_else(|| run_version(&bin))
        })
    })
}

/// `<home>/bin/<launcher>` -> `<home>`
fn ide_home(launcher: &Path) -> Option<PathBuf> {
    launcher.parent()?.parent().map(Path::to_path_buf)
}

fn read_build_txt(path: &Path) -> Option<BuildIdentifier> {
    let text = fs::read_to_string(path).ok()?;
    BuildIdentifier::parse(text.trim())
}

fn run_version(bin: &Path) -> Option<BuildIdentifier> {
    let output = Command::new(bin).arg("--version").output().ok()?;
    let mut text = String::from_utf8_lossy(&output.stdout).to_string();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    parse_version_output(&text)
}

/// Extract the build from IDE `--version` output such as
/// `RubyMine 2025.2.1\nBuild #RM-252.23892.415, built on ...`.
pub fn parse_version_output(text: &str) -> Option<BuildIdentifier> {
    text.match_indices(BUILD_MARKER).find_map(|(idx, _)| {
        let rest = text[idx + BUILD_MARKER.len()..].trim_start();
        let token = rest.strip_prefix('#')?;
        let token: String = token
            .chars()
            .take_while(|c| !c.is_whitespace() && *c != ',')
            .collect();
        BuildIdentifier::parse(&token).filter(|build| build.product_code().is_some())
    })
}
