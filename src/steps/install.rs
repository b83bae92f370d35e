//! Target package installation

use crate::container::ContainerRuntime;
use crate::error::{ProvisionError, Result};
use crate::package_manager::PackageManager;
use crate::sanity::Host;
use tracing::{info, warn};

/// Refresh the index, install `targets` in one call, then confirm the
/// runtime executable resolves on PATH.
pub fn install_packages<P, H, C>(
    packages: &P,
    host: &H,
    runtime: &C,
    targets: &[String],
    runtime_binary: &str,
) -> Result<()>
where
    P: PackageManager + ?Sized,
    H: Host + ?Sized,
    C: ContainerRuntime + ?Sized,
{
    packages.update()?;
    packages.install(targets)?;

    if !host.binary_exists(runtime_binary) {
        return Err(ProvisionError::validation(format!(
            "`{runtime_binary}` is not on PATH after installing {}",
            targets.join(" ")
        )));
    }

    match runtime.version() {
        Ok(version) => info!("Installed: {}", version),
        Err(e) => warn!("Could not read {} version: {}", runtime_binary, e),
    }
    Ok(())
}
