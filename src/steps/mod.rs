//! Pipeline steps
//!
//! One module per stage after the pre-flight checks. Each step is a plain
//! function over the capability traits so the orchestrator stays a linear
//! list of calls.

pub mod cleanup;
pub mod install;
pub mod remove;
pub mod report;
pub mod repository;
pub mod verify;

pub use cleanup::{cleanup_test_artifacts, CleanupReport};
pub use install::install_packages;
pub use remove::remove_legacy_packages;
pub use report::{print_post_install_guidance, POST_INSTALL_GUIDANCE};
pub use repository::setup_repository;
pub use verify::{verify_install, VERIFY_FAILURE_GUIDANCE};
