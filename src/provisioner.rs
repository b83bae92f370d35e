//! Pipeline orchestration
//!
//! [`Provisioner`] walks the stage chain in order, entering each stage
//! through the [`InstallerContext`] before running it. The first error marks
//! the context failed and is returned unchanged; nothing is rolled back.

use crate::config::InstallConfig;
use crate::container::ContainerRuntime;
use crate::error::Result;
use crate::install_state::{InstallStage, InstallerContext};
use crate::keyring::KeyStore;
use crate::package_manager::PackageManager;
use crate::platform::Platform;
use crate::repository::RepoDescriptor;
use crate::sanity::{check_preconditions, Host};
use crate::steps::{self, CleanupReport};
use std::io::Write;
use tracing::{error, info};

/// The host capabilities a run depends on.
#[derive(Clone, Copy)]
pub struct Capabilities<'a> {
    pub host: &'a dyn Host,
    pub packages: &'a dyn PackageManager,
    pub keys: &'a dyn KeyStore,
    pub platform: &'a dyn Platform,
    pub runtime: &'a dyn ContainerRuntime,
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub removed: Vec<String>,
    pub descriptor: RepoDescriptor,
    pub cleanup: CleanupReport,
}

pub struct Provisioner<'a> {
    config: &'a InstallConfig,
    caps: Capabilities<'a>,
    stdout: &'a mut dyn Write,
    stderr: &'a mut dyn Write,
    skip_root_check: bool,
    ctx: InstallerContext,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        config: &'a InstallConfig,
        caps: Capabilities<'a>,
        stdout: &'a mut dyn Write,
        stderr: &'a mut dyn Write,
    ) -> Self {
        Self {
            config,
            caps,
            stdout,
            stderr,
            skip_root_check: false,
            ctx: InstallerContext::new(),
        }
    }

    /// Treat the effective user as privileged (development only).
    pub fn skip_root_check(mut self, skip: bool) -> Self {
        self.skip_root_check = skip;
        self
    }

    pub fn context(&self) -> &InstallerContext {
        &self.ctx
    }

    /// Run every stage. Stops at the first fatal error.
    pub fn run(&mut self) -> Result<RunSummary> {
        match self.run_stages() {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!("Stage '{}' failed", self.ctx.current_stage());
                if let Err(transition) = self.ctx.fail() {
                    error!("{}", transition);
                }
                Err(e)
            }
        }
    }

    fn run_stages(&mut self) -> Result<RunSummary> {
        let config = self.config;
        let caps = self.caps;

        config.validate()?;

        self.enter(InstallStage::Preflight)?;
        check_preconditions(caps.host, &config.required_tools, self.skip_root_check)?;

        self.enter(InstallStage::RemoveLegacy)?;
        let removed = steps::remove_legacy_packages(caps.packages, &config.legacy_packages)?;

        self.enter(InstallStage::RepositorySetup)?;
        let descriptor = steps::setup_repository(config, caps.keys, caps.platform)?;

        self.enter(InstallStage::InstallPackages)?;
        steps::install_packages(
            caps.packages,
            caps.host,
            caps.runtime,
            &config.target_packages,
            &config.runtime_binary,
        )?;

        self.enter(InstallStage::Verify)?;
        steps::verify_install(caps.runtime, &config.test_image, &mut *self.stderr)?;

        self.enter(InstallStage::Cleanup)?;
        let cleanup = steps::cleanup_test_artifacts(caps.runtime, &config.test_image);

        self.enter(InstallStage::Report)?;
        steps::print_post_install_guidance(&mut *self.stdout);

        self.enter(InstallStage::Done)?;
        info!("Docker installation complete");

        Ok(RunSummary {
            removed,
            descriptor,
            cleanup,
        })
    }

    fn enter(&mut self, stage: InstallStage) -> Result<()> {
        self.ctx.transition_to(stage)?;
        info!("==> {}", stage);
        Ok(())
    }
}
