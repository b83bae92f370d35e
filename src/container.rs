//! Container runtime client
//!
//! [`ContainerRuntime`] covers the handful of docker CLI operations the
//! verifier and cleanup steps need. [`DockerCli`] shells out to `docker`.

use crate::command::{CommandRunner, CommandSpec};
use crate::error::Result;
use tracing::debug;

pub trait ContainerRuntime {
    /// Run `image` once with `--rm`; true if the workload exited zero.
    fn run_ephemeral(&self, image: &str) -> Result<bool>;

    /// IDs of all containers (running or stopped) created from `image`.
    fn containers_from_image(&self, image: &str) -> Result<Vec<String>>;

    /// Force-remove the given containers in one call.
    fn remove_containers(&self, ids: &[String]) -> Result<()>;

    /// True if `image` is present locally.
    fn image_present(&self, image: &str) -> Result<bool>;

    fn remove_image(&self, image: &str) -> Result<()>;

    /// Engine version string, e.g. `Docker version 27.3.1, build ce12230`.
    fn version(&self) -> Result<String>;
}

/// docker CLI backed runtime.
pub struct DockerCli<'a, R: CommandRunner> {
    runner: &'a R,
    binary: String,
}

impl<'a, R: CommandRunner> DockerCli<'a, R> {
    pub fn new(runner: &'a R, binary: impl Into<String>) -> Self {
        Self {
            runner,
            binary: binary.into(),
        }
    }

    fn docker(&self) -> CommandSpec {
        CommandSpec::new(self.binary.as_str())
    }
}

impl<R: CommandRunner> ContainerRuntime for DockerCli<'_, R> {
    fn run_ephemeral(&self, image: &str) -> Result<bool> {
        let output = self.runner.run(&self.docker().args(["run", "--rm", image]))?;
        if !output.success {
            debug!("{} run exited with {:?}: {}", self.binary, output.exit_code, output.stderr.trim());
        }
        Ok(output.success)
    }

    fn containers_from_image(&self, image: &str) -> Result<Vec<String>> {
        let filter = format!("ancestor={image}");
        let output = self
            .runner
            .run_checked(&self.docker().args(["ps", "-a", "-q", "--filter", filter.as_str()]))?;
        Ok(output
            .stdout
            .split_whitespace()
            .map(str::to_string)
            .collect())
    }

    fn remove_containers(&self, ids: &[String]) -> Result<()> {
        self.runner
            .run_checked(&self.docker().args(["rm", "-f"]).args(ids.iter().cloned()))?;
        Ok(())
    }

    fn image_present(&self, image: &str) -> Result<bool> {
        // `image inspect` exits non-zero when the image is absent
        let output = self.runner.run(&self.docker().args(["image", "inspect", image]))?;
        Ok(output.success)
    }

    fn remove_image(&self, image: &str) -> Result<()> {
        self.runner.run_checked(&self.docker().args(["rmi", image]))?;
        Ok(())
    }

    fn version(&self) -> Result<String> {
        let output = self.runner.run_checked(&self.docker().arg("--version"))?;
        Ok(output.stdout.trim().to_string())
    }
}
