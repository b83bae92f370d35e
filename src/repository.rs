//! apt repository descriptor
//!
//! The descriptor is one `deb` line derived purely from its fields, so a
//! rerun with the same host facts writes byte-identical content.

use crate::error::Result;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// One-line apt source entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoDescriptor {
    pub arch: String,
    pub keyring: PathBuf,
    pub url: String,
    pub codename: String,
    pub channel: String,
}

impl fmt::Display for RepoDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "deb [arch={} signed-by={}] {} {} {}",
            self.arch,
            self.keyring.display(),
            self.url,
            self.codename,
            self.channel
        )
    }
}

impl RepoDescriptor {
    /// Replace the contents of `path` with this descriptor and a newline.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, format!("{self}\n"))?;
        info!("Wrote repository descriptor to {}", path.display());
        Ok(())
    }
}
