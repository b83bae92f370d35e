//! Removal of verification artifacts
//!
//! Best effort: every failure is logged and swallowed.

use crate::container::ContainerRuntime;
use tracing::{debug, info, warn};

/// What cleanup managed to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub containers_removed: usize,
    pub image_removed: bool,
    /// Failures that were logged instead of aborting
    pub warnings: Vec<String>,
}

/// Remove containers created from `image`, then the image itself.
pub fn cleanup_test_artifacts<C: ContainerRuntime + ?Sized>(runtime: &C, image: &str) -> CleanupReport {
    let mut report = CleanupReport::default();

    match runtime.containers_from_image(image) {
        Ok(ids) if ids.is_empty() => debug!("No leftover {} containers", image),
        Ok(ids) => match runtime.remove_containers(&ids) {
            Ok(()) => {
                info!("Removed {} test container(s)", ids.len());
                report.containers_removed = ids.len();
            }
            Err(e) => report.warn(format!("failed to remove test containers: {e}")),
        },
        Err(e) => report.warn(format!("failed to list test containers: {e}")),
    }

    match runtime.image_present(image) {
        Ok(false) => debug!("Test image {} not present", image),
        Ok(true) => match runtime.remove_image(image) {
            Ok(()) => {
                info!("Removed test image {}", image);
                report.image_removed = true;
            }
            Err(e) => report.warn(format!("failed to remove test image {image}: {e}")),
        },
        Err(e) => report.warn(format!("failed to inspect test image {image}: {e}")),
    }

    report
}

impl CleanupReport {
    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}
