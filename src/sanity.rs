//! Pre-flight sanity checks for the runtime environment
//!
//! This module verifies the host before any mutation happens:
//! - Running with root privileges (EUID 0)
//! - Required runtime binaries are present
//!
//! Checks run in that order and the first failure ends the run.

use crate::command::{CommandRunner, CommandSpec};
use crate::error::{ProvisionError, Result};
use tracing::{debug, info, warn};

/// Host facts the precondition checker and installer need.
pub trait Host {
    /// True if the effective user is root.
    fn is_root(&self) -> bool;

    /// True if `name` resolves to an executable on PATH.
    fn binary_exists(&self, name: &str) -> bool;
}

/// Queries the real host. Binary lookup shells out to `which`.
pub struct SystemHost<'a, R: CommandRunner> {
    runner: &'a R,
}

impl<'a, R: CommandRunner> SystemHost<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> Host for SystemHost<'_, R> {
    fn is_root(&self) -> bool {
        nix::unistd::geteuid().is_root()
    }

    fn binary_exists(&self, name: &str) -> bool {
        self.runner
            .run(&CommandSpec::new("which").arg(name))
            .map(|output| output.success)
            .unwrap_or(false)
    }
}

/// Skip root check (for development/testing)
/// Set DOCKERUP_SKIP_ROOT_CHECK=1 to skip
pub fn should_skip_root_check() -> bool {
    std::env::var("DOCKERUP_SKIP_ROOT_CHECK")
        .map(|v| parse_skip_flag(&v))
        .unwrap_or(false)
}

/// `1` or `true` (any case) enables the bypass; anything else leaves it off.
pub fn parse_skip_flag(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Verify privilege, then each tool in list order. Fails on the first problem.
pub fn check_preconditions<H: Host + ?Sized>(
    host: &H,
    required_tools: &[String],
    skip_root: bool,
) -> Result<()> {
    debug!("Running pre-flight checks (skip_root={})", skip_root);

    if skip_root {
        warn!("Root check skipped (DOCKERUP_SKIP_ROOT_CHECK=1)");
    } else if !host.is_root() {
        return Err(ProvisionError::precondition(
            "root privileges required; re-run with sudo or as root",
        ));
    }

    for tool in required_tools {
        if !host.binary_exists(tool) {
            return Err(ProvisionError::precondition(format!(
                "required command not found on PATH: {tool}"
            )));
        }
        debug!("Found required command: {}", tool);
    }

    info!("Pre-flight checks passed");
    Ok(())
}
