use crate::config::InstallConfig;
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// dockerup - install Docker Engine from the official apt repository
#[derive(Parser)]
#[command(name = "dockerup")]
#[command(about = "Installs Docker Engine on Ubuntu-family hosts and verifies it with a test container")]
#[command(version)]
pub struct Cli {
    /// JSON file overriding the built-in installation settings
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        config: PathBuf,
    },
    /// Print the effective configuration as JSON
    ShowConfig,
    /// Write the built-in configuration to a new file
    InitConfig {
        /// Destination; must not exist yet
        path: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}

/// Built-in defaults, or `path` layered over them.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<InstallConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            InstallConfig::load_from_file(path)
        }
        None => Ok(InstallConfig::default()),
    }
}

/// Run a configuration subcommand, writing its report to `out`.
pub fn run_command(
    command: &Commands,
    config_path: Option<&Path>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    match command {
        Commands::Validate { config } => {
            let loaded = InstallConfig::load_from_file(config)?;
            loaded
                .validate()
                .with_context(|| format!("{} is not a valid configuration", config.display()))?;
            writeln!(out, "Configuration file is valid: {}", config.display())?;
        }
        Commands::ShowConfig => {
            let effective = load_config(config_path)?;
            let json = serde_json::to_string_pretty(&effective)
                .context("Failed to serialize configuration")?;
            writeln!(out, "{json}")?;
        }
        Commands::InitConfig { path } => {
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            InstallConfig::default().save_to_file(path)?;
            writeln!(out, "Wrote default configuration to {}", path.display())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_no_args() {
        // Running with no args runs the installer
        let cli = Cli::try_parse_from(["dockerup"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_install_with_config() {
        let cli = Cli::try_parse_from(["dockerup", "--config", "/path/to/config.json"]).unwrap();
        assert_eq!(cli.config.unwrap().to_str().unwrap(), "/path/to/config.json");
    }

    #[test]
    fn test_cli_validate_command() {
        let cli = Cli::try_parse_from(["dockerup", "validate", "/path/to/config.json"]).unwrap();
        match cli.command {
            Some(Commands::Validate { config }) => {
                assert_eq!(config.to_str().unwrap(), "/path/to/config.json");
            }
            _ => panic!("Expected Validate command"),
        }
    }

    #[test]
    fn test_cli_show_config_with_global_config() {
        let cli = Cli::try_parse_from(["dockerup", "show-config", "-c", "/etc/dockerup.json"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::ShowConfig)));
        assert!(cli.config.is_some());
    }

    #[test]
    fn test_cli_init_config_command() {
        let cli = Cli::try_parse_from(["dockerup", "init-config", "/tmp/dockerup.json"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::InitConfig { .. })));
    }

    #[test]
    fn test_cli_rejects_unknown_flag() {
        assert!(Cli::try_parse_from(["dockerup", "--dry-run"]).is_err());
    }

    fn run_to_string(command: Commands, config: Option<&Path>) -> anyhow::Result<String> {
        let mut out = Vec::new();
        run_command(&command, config, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_validate_accepts_good_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dockerup.json");
        fs::write(&path, r#"{"channel": "test"}"#).unwrap();

        let report = run_to_string(Commands::Validate { config: path.clone() }, None).unwrap();
        assert!(report.contains("is valid"));
    }

    #[test]
    fn test_validate_rejects_overlapping_sets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dockerup.json");
        fs::write(&path, r#"{"legacy_packages": ["runc", "docker-ce"]}"#).unwrap();

        let err = run_to_string(Commands::Validate { config: path }, None).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("not a valid configuration"));
        assert!(message.contains("docker-ce"));
    }

    #[test]
    fn test_validate_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");
        assert!(run_to_string(Commands::Validate { config: path }, None).is_err());
    }

    #[test]
    fn test_show_config_merges_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dockerup.json");
        fs::write(&path, r#"{"test_image": "busybox"}"#).unwrap();

        let json = run_to_string(Commands::ShowConfig, Some(&path)).unwrap();
        let shown: InstallConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(shown.test_image, "busybox");
        assert_eq!(shown.channel, "stable");
        assert_eq!(shown.target_packages, InstallConfig::default().target_packages);
    }

    #[test]
    fn test_show_config_defaults() {
        let json = run_to_string(Commands::ShowConfig, None).unwrap();
        let shown: InstallConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(shown, InstallConfig::default());
    }

    #[test]
    fn test_init_config_writes_loadable_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dockerup.json");

        run_to_string(Commands::InitConfig { path: path.clone() }, None).unwrap();
        assert_eq!(InstallConfig::load_from_file(&path).unwrap(), InstallConfig::default());

        // Never overwrites
        let err = run_to_string(Commands::InitConfig { path }, None).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
