//! Console and per-run log file output for jbup.
//!
//! Every message goes to `~/.config/jbup/jbup.log`, tagged with the plugin
//! being processed when there is one. What reaches the terminal depends on
//! the verbosity chosen at startup.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const LOG_FILE_NAME: &str = "jbup.log";
const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

struct State {
    log_file: Option<PathBuf>,
    verbosity: u8,
    plugin: Option<String>,
    spinner: Option<ProgressBar>,
}

static STATE: Mutex<State> = Mutex::new(State {
    log_file: None,
    verbosity: 0,
    plugin: None,
    spinner: None,
});

fn state() -> Option<MutexGuard<'static, State>> {
    STATE.lock().ok()
}

/// Current verbosity: 0 = warnings, 1 = debug (-v), 2 = trace (-vv)
pub fn get_verbosity() -> u8 {
    state().map_or(0, |s| s.verbosity)
}

/// Tag subsequent log file lines with `plugin_id`, or clear the tag
pub fn set_current_plugin(plugin_id: Option<String>) {
    if let Some(mut s) = state() {
        s.plugin = plugin_id;
    }
}

fn current_plugin() -> Option<String> {
    state().and_then(|s| s.plugin.clone())
}

/// Set the verbosity and start a fresh log file for this run
pub fn init_with_verbosity(verbosity: u8) -> Result<(), String> {
    let dir = log_dir()?;
    fs::create_dir_all(&dir).map_err(|e| format!("Failed to create config directory: {}", e))?;

    let log_file = dir.join(LOG_FILE_NAME);
    // One log per run
    if log_file.exists() {
        let _ = fs::remove_file(&log_file);
    }

    let mut s = state().ok_or_else(|| "Logger state poisoned".to_string())?;
    s.verbosity = verbosity;
    s.log_file = Some(log_file);
    Ok(())
}

fn log_dir() -> Result<PathBuf, String> {
    #[cfg(not(target_os = "windows"))]
    let base = dirs::home_dir()
        .map(|home| home.join(".config"))
        .ok_or("Could not determine home directory")?;

    #[cfg(target_os = "windows")]
    let base = dirs::config_dir().ok_or("Could not determine config directory")?;

    Ok(base.join("jbup"))
}

fn log_path() -> Option<PathBuf> {
    state().and_then(|s| s.log_file.clone())
}

fn append(level: &str, message: &str) {
    let Some(path) = log_path() else {
        return;
    };
    let tag = current_plugin().unwrap_or_else(|| "jbup".to_string());
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(
            file,
            "[{}] [{}] {} {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            tag,
            level,
            message
        );
    }
}

pub fn info(message: &str) {
    append("INFO", message);
    if get_verbosity() >= 1 {
        eprintln!("{}", message);
    }
}

pub fn debug(message: &str) {
    append("DEBUG", message);
    if get_verbosity() >= 1 {
        eprintln!("{} {}", "DEBUG:".blue().bold(), message);
    }
}

/// Shown at -vv only
pub fn step(message: &str) {
    append("STEP", message);
    if get_verbosity() >= 2 {
        eprintln!("TRACE: {}", message);
    }
}

pub fn warn(message: &str) {
    append("WARN", message);
    eprintln!("{} {}", "warning:".yellow().bold(), message);
}

pub fn error(message: &str) {
    append("ERROR", message);
    eprintln!("{} {}", "Error:".red().bold(), message);
}

pub fn success(message: &str) {
    append("SUCCESS", message);
    eprintln!("{} {}", "\u{2714}".green().bold(), message);
}

/// Tell the user where this run's log went
pub fn show_log_path() {
    match log_path().map_or_else(|| log_dir().map(|d| d.join(LOG_FILE_NAME)), Ok) {
        Ok(path) => eprintln!("Log file: {}", path.display()),
        Err(_) => eprintln!("Log file location not available"),
    }
}

/// Show a spinner for a long-running step. Verbose runs get plain log
/// lines instead.
pub fn spinner_start(message: &str) {
    append("START", message);
    if get_verbosity() > 0 {
        return;
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(SPINNER_FRAMES)
        .template("{spinner:.cyan} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(message.to_string());

    if let Some(mut s) = state() {
        if let Some(previous) = s.spinner.replace(spinner) {
            previous.finish_and_clear();
        }
    }
}

/// Retitle the running spinner; at -vv the step is traced instead
pub fn spinner_message(message: &str) {
    step(message);
    if let Some(s) = state() {
        if let Some(spinner) = &s.spinner {
            spinner.set_message(message.to_string());
        }
    }
}

pub fn spinner_success(message: &str) {
    spinner_stop();
    success(message);
}

pub fn spinner_error(message: &str) {
    spinner_stop();
    append("ERROR", message);
    eprintln!("  {} {}", "✗".red().bold(), message);
}

pub fn spinner_stop() {
    let spinner = state().and_then(|mut s| s.spinner.take());
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
}
