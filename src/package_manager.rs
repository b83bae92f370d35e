//! apt/dpkg package management
//!
//! [`PackageManager`] is the narrow capability the pipeline needs from the
//! OS package manager. [`Apt`] implements it by shelling out to `dpkg-query`
//! and `apt-get` with a non-interactive frontend.

use crate::command::{CommandRunner, CommandSpec};
use crate::error::Result;
use tracing::{debug, info};

/// Package database queries and bulk mutations.
pub trait PackageManager {
    /// True if `name` is currently installed.
    fn is_installed(&self, name: &str) -> Result<bool>;

    /// Remove the given packages in one call.
    fn remove(&self, names: &[String]) -> Result<()>;

    /// Remove the given packages and their now-unused dependencies in one call.
    fn autoremove(&self, names: &[String]) -> Result<()>;

    /// Refresh the package index from all configured repositories.
    fn update(&self) -> Result<()>;

    /// Install the given packages in one call.
    fn install(&self, names: &[String]) -> Result<()>;
}

/// apt-get/dpkg backed package manager.
pub struct Apt<'a, R: CommandRunner> {
    runner: &'a R,
}

impl<'a, R: CommandRunner> Apt<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }

    fn apt_get(&self, action: &str, names: &[String]) -> Result<()> {
        let mut spec = CommandSpec::new("apt-get")
            .arg(action)
            .env("DEBIAN_FRONTEND", "noninteractive");
        if action != "update" {
            spec = spec.arg("-y");
        }
        spec = spec.args(names.iter().cloned());
        self.runner.run_checked(&spec)?;
        Ok(())
    }
}

impl<R: CommandRunner> PackageManager for Apt<'_, R> {
    fn is_installed(&self, name: &str) -> Result<bool> {
        // dpkg-query exits non-zero for packages it has never heard of.
        // Multi-arch packages print one status line per architecture.
        let spec = CommandSpec::new("dpkg-query")
            .args(["-W", STATUS_FORMAT, name]);
        let output = self.runner.run(&spec)?;
        let installed = output.success && output.stdout.lines().any(is_installed_status);
        debug!("Package {} installed: {}", name, installed);
        Ok(installed)
    }

    fn remove(&self, names: &[String]) -> Result<()> {
        info!("Removing packages: {}", names.join(" "));
        self.apt_get("remove", names)
    }

    fn autoremove(&self, names: &[String]) -> Result<()> {
        info!("Auto-removing packages and unused dependencies: {}", names.join(" "));
        self.apt_get("autoremove", names)
    }

    fn update(&self) -> Result<()> {
        info!("Refreshing package index");
        self.apt_get("update", &[])
    }

    fn install(&self, names: &[String]) -> Result<()> {
        info!("Installing packages: {}", names.join(" "));
        self.apt_get("install", names)
    }
}

/// dpkg-query expands the `\n` escape itself.
const STATUS_FORMAT: &str = r"-f=${Status}\n";

/// dpkg status is `<want> <error> <state>`; only `installed` state counts.
fn is_installed_status(status: &str) -> bool {
    let fields: Vec<&str> = status.split_whitespace().collect();
    matches!(fields.as_slice(), [_, "ok", "installed"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutput;
    use std::cell::RefCell;

    struct Scripted {
        calls: RefCell<Vec<CommandSpec>>,
        response: CommandOutput,
    }

    impl CommandRunner for Scripted {
        fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
            self.calls.borrow_mut().push(spec.clone());
            Ok(self.response.clone())
        }
    }

    fn scripted(response: CommandOutput) -> Scripted {
        Scripted {
            calls: RefCell::default(),
            response,
        }
    }

    #[test]
    fn test_status_parsing() {
        assert!(is_installed_status("install ok installed"));
        assert!(is_installed_status("hold ok installed"));
        assert!(!is_installed_status("deinstall ok config-files"));
        assert!(!is_installed_status("unknown ok not-installed"));
        assert!(!is_installed_status(""));
    }

    #[test]
    fn test_is_installed_queries_dpkg() {
        let runner = scripted(CommandOutput::ok("install ok installed"));
        let apt = Apt::new(&runner);
        assert!(apt.is_installed("runc").unwrap());
        let calls = runner.calls.borrow();
        assert_eq!(calls[0].program, "dpkg-query");
        assert_eq!(calls[0].args, vec!["-W", r"-f=${Status}\n", "runc"]);
    }

    #[test]
    fn test_multiarch_package_is_installed() {
        let runner = scripted(CommandOutput::ok("install ok installed\ninstall ok installed\n"));
        assert!(Apt::new(&runner).is_installed("containerd").unwrap());

        let runner = scripted(CommandOutput::ok("deinstall ok config-files\ninstall ok installed\n"));
        assert!(Apt::new(&runner).is_installed("containerd").unwrap());

        let runner = scripted(CommandOutput::ok("deinstall ok config-files\n"));
        assert!(!Apt::new(&runner).is_installed("containerd").unwrap());
    }

    #[test]
    fn test_unknown_package_is_not_installed() {
        let runner = scripted(CommandOutput::failed(1, "dpkg-query: no packages found matching runc"));
        let apt = Apt::new(&runner);
        assert!(!apt.is_installed("runc").unwrap());
    }

    #[test]
    fn test_install_is_noninteractive_bulk_call() {
        let runner = scripted(CommandOutput::ok(""));
        let apt = Apt::new(&runner);
        apt.install(&["docker-ce".to_string(), "containerd.io".to_string()]).unwrap();
        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "apt-get");
        assert_eq!(calls[0].args, vec!["install", "-y", "docker-ce", "containerd.io"]);
        assert!(calls[0].env.contains(&("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string())));
    }

    #[test]
    fn test_update_has_no_yes_flag() {
        let runner = scripted(CommandOutput::ok(""));
        Apt::new(&runner).update().unwrap();
        assert_eq!(runner.calls.borrow()[0].args, vec!["update"]);
    }

    #[test]
    fn test_remove_failure_propagates() {
        let runner = scripted(CommandOutput::failed(100, "E: Could not get lock"));
        let err = Apt::new(&runner).remove(&["runc".to_string()]).unwrap_err();
        assert!(err.to_string().contains("Could not get lock"));
    }
}
