//! Signing key staging and installation
//!
//! The vendor key is downloaded into a temporary file inside the keyring
//! directory, checked with [`crate::armor`], and only then renamed over the
//! final path. Dropping a [`StagedKey`] deletes the temporary file, so a
//! failed validation never leaves anything behind.

use crate::armor::{self, PublicKeyInfo};
use crate::command::{CommandRunner, CommandSpec};
use crate::error::{ProvisionError, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Mode for the keyring directory.
pub const KEYRING_DIR_MODE: u32 = 0o755;
/// Mode for an installed key: world-readable so apt's sandbox user can read it.
pub const KEY_FILE_MODE: u32 = 0o644;

/// A downloaded key that has not been installed yet.
#[derive(Debug)]
pub struct StagedKey {
    file: NamedTempFile,
    bytes: Vec<u8>,
}

impl StagedKey {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

fn staging_file(dir: &Path) -> Result<NamedTempFile> {
    Ok(tempfile::Builder::new()
        .prefix(".dockerup-key-")
        .tempfile_in(dir)?)
}

/// Fetch, validate and install capability for the repository signing key.
pub trait KeyStore {
    /// Ensure the keyring directory exists with [`KEYRING_DIR_MODE`].
    fn prepare_dir(&self, dir: &Path) -> Result<()>;

    /// Download `url` into a temporary file inside `dir`.
    fn fetch(&self, url: &str, dir: &Path) -> Result<StagedKey>;

    /// Structurally validate the staged bytes.
    fn validate(&self, staged: &StagedKey) -> Result<PublicKeyInfo>;

    /// Atomically move the staged key to `dest` with [`KEY_FILE_MODE`].
    fn install(&self, staged: StagedKey, dest: &Path) -> Result<()>;
}

/// Filesystem key store that downloads with `curl`.
pub struct FileKeyStore<'a, R: CommandRunner> {
    runner: &'a R,
}

impl<'a, R: CommandRunner> FileKeyStore<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> KeyStore for FileKeyStore<'_, R> {
    fn prepare_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        fs::set_permissions(dir, fs::Permissions::from_mode(KEYRING_DIR_MODE))?;
        debug!("Keyring directory ready: {}", dir.display());
        Ok(())
    }

    fn fetch(&self, url: &str, dir: &Path) -> Result<StagedKey> {
        let file = staging_file(dir)?;
        let path = file.path().display().to_string();
        info!("Downloading signing key from {}", url);
        self.runner
            .run_checked(&CommandSpec::new("curl").args(["-fsSL", url, "-o", path.as_str()]))?;
        let bytes = fs::read(file.path())?;
        debug!("Downloaded {} bytes to {}", bytes.len(), path);
        Ok(StagedKey { file, bytes })
    }

    fn validate(&self, staged: &StagedKey) -> Result<PublicKeyInfo> {
        armor::validate_public_key(staged.bytes())
            .map_err(|e| ProvisionError::validation(format!("downloaded signing key is invalid: {e}")))
    }

    fn install(&self, staged: StagedKey, dest: &Path) -> Result<()> {
        // Permissions go on before the rename so the final path is never unreadable
        fs::set_permissions(staged.path(), fs::Permissions::from_mode(KEY_FILE_MODE))?;
        staged.file.persist(dest).map_err(|e| e.error)?;
        info!("Installed signing key at {}", dest.display());
        Ok(())
    }
}

/// Run the whole key sequence. `dest` is untouched unless validation passes.
pub fn provision_key<K: KeyStore + ?Sized>(store: &K, url: &str, dest: &Path) -> Result<PublicKeyInfo> {
    let dir = dest
        .parent()
        .ok_or_else(|| ProvisionError::config(format!("keyring path has no parent: {}", dest.display())))?;

    store.prepare_dir(dir)?;
    let staged = store.fetch(url, dir)?;

    // On error `staged` drops here and its temp file is removed
    let info = store.validate(&staged)?;
    debug!(
        "Key is a v{} public key ({} bytes, armored={})",
        info.version, info.packet_bytes, info.armored
    );

    store.install(staged, dest)?;
    Ok(info)
}
