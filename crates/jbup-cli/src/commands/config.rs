use crate::common::GlobalOpts;
use crate::errors::ConfigurationError;
use clap::Subcommand;
use colored::Colorize;
use jbup_config::Config;
use std::path::Path;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print every configured value
    Show,
    /// Print the config file location
    Path,
    /// Print one value
    Get { key: String },
    /// Store a value, e.g. `jbup config set plugins-dir ~/plugins`
    Set { key: String, value: String },
}

pub fn handle_config(action: Option<ConfigAction>, opts: &GlobalOpts) -> Result<(), ConfigurationError> {
    let path = opts.config_path();
    jbup_logger::debug(&format!("Reading config from: {}", path.display()));

    match action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => show(&Config::load_from_path(&path)?, &path, opts),
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Get { key } => {
            let config = Config::load_from_path(&path)?;
            if !jbup_config::KNOWN_KEYS.contains(&key.as_str()) {
                return Err(jbup_config::ConfigError::UnknownKey(key).into());
            }
            if let Some(value) = config.get(&key) {
                println!("{}", value);
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load_from_path(&path)?;
            config.set(&key, value.clone())?;
            config.save_to_path(&path)?;
            jbup_logger::success(&format!("Set {} = {}", key, value));
        }
    }
    Ok(())
}

fn show(config: &Config, path: &Path, opts: &GlobalOpts) {
    println!("{} {}", "Configuration:".bold().green(), path.display());
    if config.is_empty() {
        if opts.verbosity_level() > 0 {
            println!("  {}", "(empty)".yellow());
        }
        return;
    }

    for (key, value) in config.values_iter() {
        println!("  {}: {}", key.cyan(), value);
    }
    for (id, version) in &config.pins {
        println!("  {} {} = {}", "pin".cyan(), id, version);
    }
    for (id, url) in &config.direct {
        println!("  {} {} = {}", "direct".cyan(), id, url);
    }
    if let Some(products) = &config.products {
        let codes: Vec<&str> = products.iter().map(|p| p.code.as_str()).collect();
        println!("  {}: {}", "products".cyan(), codes.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn opts_for(dir: &TempDir) -> GlobalOpts {
        GlobalOpts {
            config: Some(dir.path().join("jbup.toml")),
            ..GlobalOpts::default()
        }
    }

    #[test]
    fn test_config_set_then_load() {
        let Ok(dir) = TempDir::new() else {
            panic!("tempdir");
        };
        let opts = opts_for(&dir);
        let result = handle_config(
            Some(ConfigAction::Set {
                key: "downloads-host".to_string(),
                value: "downloads.marketplace.jetbrains.com".to_string(),
            }),
            &opts,
        );
        assert!(result.is_ok());

        let config = Config::load_from_path(&opts.config_path());
        assert!(config.is_ok_and(|c| c.downloads_host.as_deref() == Some("downloads.marketplace.jetbrains.com")));
    }

    #[test]
    fn test_config_set_unknown_key_fails() {
        let Ok(dir) = TempDir::new() else {
            panic!("tempdir");
        };
        let result = handle_config(
            Some(ConfigAction::Set {
                key: "colour".to_string(),
                value: "blue".to_string(),
            }),
            &opts_for(&dir),
        );
        assert!(matches!(result, Err(ConfigurationError::Config(_))));
        assert!(!dir.path().join("jbup.toml").exists());
    }

    #[test]
    fn test_config_show_and_path_on_missing_file() {
        let Ok(dir) = TempDir::new() else {
            panic!("tempdir");
        };
        let opts = opts_for(&dir);
        assert!(handle_config(None, &opts).is_ok());
        assert!(handle_config(Some(ConfigAction::Path), &opts).is_ok());
        assert!(handle_config(
            Some(ConfigAction::Get {
                key: "build".to_string()
            }),
            &opts
        )
        .is_ok());
    }
}
