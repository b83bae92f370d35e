//! dockerup - main entry point
//!
//! Installs Docker Engine on the running host. Exits 0 on full success and
//! 1 on any fatal step.

use std::io;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use dockerup::cli::{load_config, run_command, Cli};
use dockerup::command::SystemRunner;
use dockerup::config::InstallConfig;
use dockerup::container::DockerCli;
use dockerup::error::ProvisionError;
use dockerup::keyring::FileKeyStore;
use dockerup::package_manager::Apt;
use dockerup::platform::SystemPlatform;
use dockerup::provisioner::{Capabilities, Provisioner};
use dockerup::sanity::{should_skip_root_check, SystemHost};

/// Timestamped logs: WARN and ERROR on stderr, everything else on stdout.
/// RUST_LOG overrides the default `info` level.
fn init_logger() {
    let writer = io::stderr.with_max_level(Level::WARN).or_else(io::stdout);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(writer)
        .init();
}

fn main() -> ExitCode {
    init_logger();
    let cli = Cli::parse_args();

    let result = match &cli.command {
        Some(command) => run_command(command, cli.config.as_deref(), &mut io::stdout()),
        None => load_config(cli.config.as_deref()).and_then(|config| install(&config)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            let code = e
                .downcast_ref::<ProvisionError>()
                .map_or(1, ProvisionError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn install(config: &InstallConfig) -> anyhow::Result<()> {
    info!("dockerup {} starting", env!("CARGO_PKG_VERSION"));

    let runner = SystemRunner;
    let host = SystemHost::new(&runner);
    let packages = Apt::new(&runner);
    let keys = FileKeyStore::new(&runner);
    let platform = SystemPlatform::new(&runner);
    let runtime = DockerCli::new(&runner, config.runtime_binary.as_str());

    let caps = Capabilities {
        host: &host,
        packages: &packages,
        keys: &keys,
        platform: &platform,
        runtime: &runtime,
    };

    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let mut provisioner = Provisioner::new(config, caps, &mut stdout, &mut stderr)
        .skip_root_check(should_skip_root_check());

    provisioner.run()?;
    Ok(())
}
