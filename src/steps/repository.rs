//! Signing key and repository descriptor setup

use crate::config::InstallConfig;
use crate::error::Result;
use crate::keyring::{provision_key, KeyStore};
use crate::platform::{detect_codename, Platform};
use crate::repository::RepoDescriptor;
use tracing::info;

/// Install the signing key, detect host facts and write the descriptor.
///
/// Each sub-step is fatal. The descriptor file is only written after the key
/// is in place and both architecture and codename are known.
pub fn setup_repository<K, P>(config: &InstallConfig, keys: &K, platform: &P) -> Result<RepoDescriptor>
where
    K: KeyStore + ?Sized,
    P: Platform + ?Sized,
{
    let keyring = config.keyring_path();
    provision_key(keys, &config.key_url, &keyring)?;

    let arch = platform.architecture()?;
    let os_release = platform.os_release(&config.os_release)?;
    let codename = detect_codename(&os_release)?;

    let descriptor = RepoDescriptor {
        arch,
        keyring,
        url: config.repo_url.clone(),
        codename,
        channel: config.channel.clone(),
    };
    descriptor.write_to(&config.sources_list)?;
    info!("Repository configured: {}", descriptor);
    Ok(descriptor)
}
