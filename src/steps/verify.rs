//! Post-install verification

use crate::container::ContainerRuntime;
use crate::error::{ProvisionError, Result};
use std::io::Write;
use tracing::{debug, info};

/// Printed to stderr when the test workload fails.
pub const VERIFY_FAILURE_GUIDANCE: &str = "\
The Docker test container did not run successfully.

  Check that the daemon is running:
      systemctl status docker
  Inspect recent daemon logs:
      journalctl -u docker --no-pager -n 50
  If you are running docker as a non-root user, add it to the docker group:
      sudo usermod -aG docker $USER
      newgrp docker
";

/// Run `image` once. On failure print [`VERIFY_FAILURE_GUIDANCE`] to `err`
/// and return a verification error.
pub fn verify_install<C: ContainerRuntime + ?Sized>(
    runtime: &C,
    image: &str,
    err: &mut dyn Write,
) -> Result<()> {
    info!("Running test container {}", image);
    let passed = match runtime.run_ephemeral(image) {
        Ok(passed) => passed,
        Err(e) => {
            debug!("Test container could not be started: {}", e);
            false
        }
    };

    if passed {
        info!("Test container ran successfully");
        return Ok(());
    }

    if let Err(e) = err.write_all(VERIFY_FAILURE_GUIDANCE.as_bytes()) {
        debug!("Could not print guidance: {}", e);
    }
    Err(ProvisionError::verification(format!("`{image}` did not exit successfully")))
}
