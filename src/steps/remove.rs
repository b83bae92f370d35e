//! Legacy package removal

use crate::error::Result;
use crate::package_manager::PackageManager;
use tracing::info;

/// Remove whichever `legacy` packages are installed.
///
/// Returns the removed subset in list order. When nothing is installed no
/// mutating call is made.
pub fn remove_legacy_packages<P: PackageManager + ?Sized>(
    packages: &P,
    legacy: &[String],
) -> Result<Vec<String>> {
    let mut installed = Vec::new();
    for name in legacy {
        if packages.is_installed(name)? {
            installed.push(name.clone());
        }
    }

    if installed.is_empty() {
        info!("No conflicting packages installed");
        return Ok(installed);
    }

    info!("Found conflicting packages: {}", installed.join(" "));
    packages.remove(&installed)?;
    packages.autoremove(&installed)?;
    Ok(installed)
}
