//! Host platform detection
//!
//! Detects the dpkg architecture and the OS release codename that select the
//! matching branch of the vendor repository.
//!
//! # Design
//!
//! - **Fail Fast**: a missing os-release file or codename aborts the run
//! - **Codename precedence**: `UBUNTU_CODENAME` wins over `VERSION_CODENAME`,
//!   so Ubuntu derivatives (Mint, Pop!_OS) map to their Ubuntu base

use crate::command::{CommandRunner, CommandSpec};
use crate::error::{ProvisionError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Parsed `/etc/os-release` key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    fields: HashMap<String, String>,
}

impl OsRelease {
    /// Parse os-release syntax: `KEY=value`, optionally quoted, `#` comments.
    pub fn parse(contents: &str) -> Self {
        let fields = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), unquote(value.trim()).to_string()))
            .collect();
        Self { fields }
    }

    /// Read and parse an os-release file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ProvisionError::validation(format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(Self::parse(&contents))
    }

    /// Non-empty value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Release codename, preferring `UBUNTU_CODENAME` over `VERSION_CODENAME`.
    pub fn codename(&self) -> Result<&str> {
        self.get("UBUNTU_CODENAME")
            .or_else(|| self.get("VERSION_CODENAME"))
            .ok_or_else(|| {
                ProvisionError::validation(
                    "os-release has neither UBUNTU_CODENAME nor VERSION_CODENAME",
                )
            })
    }

    /// True if `ID` or `ID_LIKE` names ubuntu.
    pub fn is_ubuntu_family(&self) -> bool {
        let mentions = |key: &str| {
            self.get(key)
                .is_some_and(|v| v.split_whitespace().any(|id| id == "ubuntu"))
        };
        mentions("ID") || mentions("ID_LIKE")
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Host facts needed to compose the repository descriptor.
pub trait Platform {
    /// dpkg architecture name (e.g. `amd64`, `arm64`).
    fn architecture(&self) -> Result<String>;

    /// Parsed os-release file.
    fn os_release(&self, path: &Path) -> Result<OsRelease>;
}

/// Queries the real host via `dpkg --print-architecture`.
pub struct SystemPlatform<'a, R: CommandRunner> {
    runner: &'a R,
}

impl<'a, R: CommandRunner> SystemPlatform<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> Platform for SystemPlatform<'_, R> {
    fn architecture(&self) -> Result<String> {
        let output = self
            .runner
            .run_checked(&CommandSpec::new("dpkg").arg("--print-architecture"))?;
        parse_architecture(&output.stdout)
    }

    fn os_release(&self, path: &Path) -> Result<OsRelease> {
        OsRelease::from_file(path)
    }
}

/// Validate dpkg's architecture output.
pub fn parse_architecture(raw: &str) -> Result<String> {
    let arch = raw.trim();
    if arch.is_empty() {
        return Err(ProvisionError::validation("dpkg reported an empty architecture"));
    }
    if !arch
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ProvisionError::validation(format!(
            "unexpected architecture name: {arch:?}"
        )));
    }
    debug!("Detected architecture: {}", arch);
    Ok(arch.to_string())
}

/// Codename for `os_release`, warning when the host is not Ubuntu-family.
pub fn detect_codename(os_release: &OsRelease) -> Result<String> {
    if !os_release.is_ubuntu_family() {
        warn!(
            "Host ID {:?} is not Ubuntu-based; the repository may not carry this release",
            os_release.get("ID").unwrap_or("unknown")
        );
    }
    let codename = os_release.codename()?;
    debug!("Detected codename: {}", codename);
    Ok(codename.to_string())
}
