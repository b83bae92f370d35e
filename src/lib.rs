//! dockerup library
//!
//! Installs Docker Engine from the vendor apt repository: removes legacy
//! packages, installs the signing key and repository descriptor, installs
//! the engine packages, and verifies them with a test container.

pub mod armor;
pub mod cli;
pub mod command;
pub mod config;
pub mod container;
pub mod error;
pub mod install_state;
pub mod keyring;
pub mod package_manager;
pub mod platform;
pub mod provisioner;
pub mod repository;
pub mod sanity;
pub mod steps;

// Re-export main types for convenience
pub use command::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use config::InstallConfig;
pub use error::{ProvisionError, Result};
pub use install_state::{InstallStage, InstallTransitionError, InstallerContext};
pub use provisioner::{Capabilities, Provisioner, RunSummary};
pub use repository::RepoDescriptor;
