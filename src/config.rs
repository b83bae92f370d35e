//! Installation configuration
//!
//! Every fixed value the pipeline uses lives in [`InstallConfig`]. The
//! defaults describe the Docker Engine apt repository for Ubuntu; a JSON file
//! may override any subset of fields.

use crate::error::ProvisionError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Packages that conflict with or are superseded by the Docker CE packages.
pub const LEGACY_PACKAGES: &[&str] = &[
    "docker.io",
    "docker-doc",
    "docker-compose",
    "docker-compose-v2",
    "podman-docker",
    "containerd",
    "runc",
];

/// Packages installed from the vendor repository.
pub const TARGET_PACKAGES: &[&str] = &[
    "docker-ce",
    "docker-ce-cli",
    "containerd.io",
    "docker-buildx-plugin",
    "docker-compose-plugin",
];

/// Executables that must resolve on PATH before anything is touched.
pub const REQUIRED_TOOLS: &[&str] = &["apt-get", "dpkg", "dpkg-query", "curl"];

/// Effective configuration for one provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// URL of the vendor's OpenPGP signing key
    pub key_url: String,
    /// Directory holding apt keyrings
    pub keyring_dir: PathBuf,
    /// Filename of the installed key inside `keyring_dir`
    pub keyring_file: String,
    /// Repository descriptor written for apt
    pub sources_list: PathBuf,
    /// Base URL of the vendor repository
    pub repo_url: String,
    /// Release channel
    pub channel: String,
    /// OS identification file used for codename detection
    pub os_release: PathBuf,
    pub legacy_packages: Vec<String>,
    pub target_packages: Vec<String>,
    pub required_tools: Vec<String>,
    /// Executable that must exist once the target packages are installed
    pub runtime_binary: String,
    /// Image run once to prove the engine works
    pub test_image: String,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            key_url: "https://download.docker.com/linux/ubuntu/gpg".to_string(),
            keyring_dir: PathBuf::from("/etc/apt/keyrings"),
            keyring_file: "docker.asc".to_string(),
            sources_list: PathBuf::from("/etc/apt/sources.list.d/docker.list"),
            repo_url: "https://download.docker.com/linux/ubuntu".to_string(),
            channel: "stable".to_string(),
            os_release: PathBuf::from("/etc/os-release"),
            legacy_packages: to_owned_list(LEGACY_PACKAGES),
            target_packages: to_owned_list(TARGET_PACKAGES),
            required_tools: to_owned_list(REQUIRED_TOOLS),
            runtime_binary: "docker".to_string(),
            test_image: "hello-world".to_string(),
        }
    }
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl InstallConfig {
    /// Full path of the installed signing key.
    pub fn keyring_path(&self) -> PathBuf {
        self.keyring_dir.join(&self.keyring_file)
    }

    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Check the invariants the pipeline relies on.
    pub fn validate(&self) -> std::result::Result<(), ProvisionError> {
        if self.target_packages.is_empty() {
            return Err(ProvisionError::config("target package list is empty"));
        }

        let targets: HashSet<&str> = self.target_packages.iter().map(String::as_str).collect();
        let overlap: Vec<&str> = self
            .legacy_packages
            .iter()
            .map(String::as_str)
            .filter(|name| targets.contains(name))
            .collect();
        if !overlap.is_empty() {
            return Err(ProvisionError::config(format!(
                "packages listed for both removal and install: {}",
                overlap.join(", ")
            )));
        }

        let mut names = self.legacy_packages.iter().chain(&self.target_packages);
        if let Some(bad) = names.find(|name| !is_package_name(name)) {
            return Err(ProvisionError::config(format!("invalid package name: {bad:?}")));
        }

        if !self.key_url.starts_with("https://") {
            return Err(ProvisionError::config(format!(
                "key URL must use https: {}",
                self.key_url
            )));
        }
        if !self.repo_url.starts_with("https://") && !self.repo_url.starts_with("http://") {
            return Err(ProvisionError::config(format!(
                "repository URL must be http(s): {}",
                self.repo_url
            )));
        }

        for (label, path) in [
            ("keyring_dir", &self.keyring_dir),
            ("sources_list", &self.sources_list),
            ("os_release", &self.os_release),
        ] {
            if !path.is_absolute() {
                return Err(ProvisionError::config(format!(
                    "{label} must be an absolute path: {}",
                    path.display()
                )));
            }
        }

        if self.keyring_file.is_empty() || self.keyring_file.contains('/') {
            return Err(ProvisionError::config(format!(
                "keyring_file must be a plain filename: {:?}",
                self.keyring_file
            )));
        }

        for (label, value) in [
            ("channel", &self.channel),
            ("runtime_binary", &self.runtime_binary),
            ("test_image", &self.test_image),
        ] {
            if value.trim().is_empty() || value.contains(char::is_whitespace) {
                return Err(ProvisionError::config(format!("{label} must be a single word")));
            }
        }

        Ok(())
    }
}

/// Debian package names: lowercase alphanumerics plus `+-.`, at least two chars.
fn is_package_name(name: &str) -> bool {
    name.len() >= 2
        && name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '-' | '.'))
}
