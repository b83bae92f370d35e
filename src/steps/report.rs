//! Post-install guidance

use std::io::Write;
use tracing::debug;

pub const POST_INSTALL_GUIDANCE: &str = "\
Docker Engine is installed and working.

To run docker without sudo, add your user to the docker group:
    sudo usermod -aG docker $USER
Then log out and back in (or run `newgrp docker`) for the change to take effect.

Post-install steps: https://docs.docker.com/engine/install/linux-postinstall/
";

/// Print [`POST_INSTALL_GUIDANCE`]. Write errors are ignored.
pub fn print_post_install_guidance(out: &mut dyn Write) {
    if let Err(e) = out.write_all(POST_INSTALL_GUIDANCE.as_bytes()) {
        debug!("Could not print guidance: {}", e);
    }
}
