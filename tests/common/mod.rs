//! Shared fake host for integration tests
//!
//! `FakeSystem` answers the commands the real adapters issue (dpkg-query,
//! apt-get, curl, dpkg, docker) from in-memory state and records every
//! invocation, so the full pipeline runs without touching the machine.

#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use dockerup::armor::crc24;
use dockerup::container::DockerCli;
use dockerup::keyring::FileKeyStore;
use dockerup::package_manager::Apt;
use dockerup::platform::SystemPlatform;
use dockerup::sanity::Host;
use dockerup::{
    Capabilities, CommandOutput, CommandRunner, CommandSpec, InstallConfig, InstallerContext,
    Provisioner, Result, RunSummary,
};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use tempfile::TempDir;

pub const JAMMY_OS_RELEASE: &str = "\
NAME=\"Ubuntu\"
VERSION_ID=\"22.04\"
ID=ubuntu
ID_LIKE=debian
VERSION_CODENAME=jammy
UBUNTU_CODENAME=jammy
";

/// ASCII-armor `packets` the way `gpg --armor --export` does.
pub fn armor(packets: &[u8]) -> Vec<u8> {
    armor_with_crc(packets, crc24(packets))
}

/// Like [`armor`] but with an arbitrary checksum line.
pub fn armor_with_crc(packets: &[u8], crc: u32) -> Vec<u8> {
    let mut out = String::from("-----BEGIN PGP PUBLIC KEY BLOCK-----\n\n");
    let encoded = BASE64.encode(packets);
    for chunk in encoded.as_bytes().chunks(64) {
        out.push_str(std::str::from_utf8(chunk).unwrap());
        out.push('\n');
    }
    let crc = crc.to_be_bytes();
    out.push('=');
    out.push_str(&BASE64.encode(&crc[1..]));
    out.push_str("\n-----END PGP PUBLIC KEY BLOCK-----\n");
    out.into_bytes()
}

/// A minimal armored v4 public key.
pub fn valid_key() -> Vec<u8> {
    let body = [4u8, 0x5a, 0x1b, 0x2c, 0x3d, 1, 0x08, 0x00];
    let mut packet = vec![0xC6, body.len() as u8];
    packet.extend_from_slice(&body);
    armor(&packet)
}

#[derive(Debug, Default)]
pub struct HostState {
    pub installed: BTreeSet<String>,
    pub binaries: BTreeSet<String>,
    pub containers: Vec<String>,
    pub image_present: bool,
}

pub struct FakeSystem {
    pub root: bool,
    pub key_body: Vec<u8>,
    pub arch: String,
    /// Whether installing docker-ce puts `docker` on PATH
    pub install_provides_docker: bool,
    pub test_run_succeeds: bool,
    /// Containers the test run leaves behind (e.g. a daemon that ignores --rm)
    pub leaked_containers: Vec<String>,
    pub fail_container_rm: bool,
    pub fail_container_list: bool,
    pub fail_image_rm: bool,
    pub fail_version: bool,
    pub state: RefCell<HostState>,
    pub calls: RefCell<Vec<String>>,
}

impl Default for FakeSystem {
    fn default() -> Self {
        let binaries = ["apt-get", "dpkg", "dpkg-query", "curl"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Self {
            root: true,
            key_body: valid_key(),
            arch: "amd64".to_string(),
            install_provides_docker: true,
            test_run_succeeds: true,
            leaked_containers: Vec::new(),
            fail_container_rm: false,
            fail_container_list: false,
            fail_image_rm: false,
            fail_version: false,
            state: RefCell::new(HostState {
                binaries,
                ..HostState::default()
            }),
            calls: RefCell::default(),
        }
    }
}

impl FakeSystem {
    pub fn with_installed(self, names: &[&str]) -> Self {
        self.state
            .borrow_mut()
            .installed
            .extend(names.iter().map(|s| s.to_string()));
        self
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn not_found(what: &str) -> CommandOutput {
        CommandOutput::failed(1, format!("{what} not found"))
    }
}

impl Host for FakeSystem {
    fn is_root(&self) -> bool {
        self.root
    }

    fn binary_exists(&self, name: &str) -> bool {
        self.state.borrow().binaries.contains(name)
    }
}

impl CommandRunner for FakeSystem {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(spec.to_string());
        let args: Vec<&str> = spec.args.iter().map(String::as_str).collect();
        let mut state = self.state.borrow_mut();

        let output = match (spec.program.as_str(), args.as_slice()) {
            ("dpkg-query", ["-W", _, name]) => {
                if state.installed.contains(*name) {
                    CommandOutput::ok("install ok installed")
                } else {
                    Self::not_found(name)
                }
            }
            ("apt-get", ["remove" | "autoremove", "-y", names @ ..]) => {
                for name in names {
                    state.installed.remove(*name);
                }
                CommandOutput::ok("")
            }
            ("apt-get", ["update"]) => CommandOutput::ok("Reading package lists... Done"),
            ("apt-get", ["install", "-y", names @ ..]) => {
                state.installed.extend(names.iter().map(|s| s.to_string()));
                if self.install_provides_docker {
                    state.binaries.insert("docker".to_string());
                }
                CommandOutput::ok("")
            }
            ("curl", [.., "-o", path]) => {
                fs::write(path, &self.key_body).unwrap();
                CommandOutput::ok("")
            }
            ("dpkg", ["--print-architecture"]) => CommandOutput::ok(format!("{}\n", self.arch)),
            ("docker", ["--version"]) if self.fail_version => {
                CommandOutput::failed(1, "Cannot connect to the Docker daemon")
            }
            ("docker", ["--version"]) => CommandOutput::ok("Docker version 27.3.1, build ce12230\n"),
            ("docker", ["run", "--rm", _image]) => {
                state.image_present = true;
                state.containers.extend(self.leaked_containers.iter().cloned());
                if self.test_run_succeeds {
                    CommandOutput::ok("Hello from Docker!")
                } else {
                    CommandOutput::failed(125, "permission denied while trying to connect to the Docker daemon socket")
                }
            }
            ("docker", ["ps", "-a", "-q", "--filter", _]) if self.fail_container_list => {
                CommandOutput::failed(1, "Cannot connect to the Docker daemon")
            }
            ("docker", ["ps", "-a", "-q", "--filter", _]) => {
                CommandOutput::ok(state.containers.join("\n"))
            }
            ("docker", ["rm", "-f", ids @ ..]) => {
                if self.fail_container_rm {
                    CommandOutput::failed(1, "Error response from daemon: removal in progress")
                } else {
                    state.containers.retain(|c| !ids.contains(&c.as_str()));
                    CommandOutput::ok("")
                }
            }
            ("docker", ["image", "inspect", image]) => {
                if state.image_present {
                    CommandOutput::ok("[]")
                } else {
                    Self::not_found(image)
                }
            }
            ("docker", ["rmi", image]) if self.fail_image_rm => {
                CommandOutput::failed(1, format!("conflict: unable to remove repository reference \"{image}\""))
            }
            ("docker", ["rmi", _]) => {
                state.image_present = false;
                CommandOutput::ok("")
            }
            _ => panic!("unexpected command: {spec}"),
        };
        Ok(output)
    }
}

/// Result of one pipeline run against a [`FakeSystem`].
pub struct Outcome {
    pub result: Result<RunSummary>,
    pub stdout: String,
    pub stderr: String,
    pub ctx: InstallerContext,
}

/// Temp filesystem root plus config pointing into it.
pub struct Harness {
    pub dir: TempDir,
    pub config: InstallConfig,
}

impl Harness {
    pub fn new(os_release: Option<&str>) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let config = InstallConfig {
            keyring_dir: root.join("etc/apt/keyrings"),
            sources_list: root.join("etc/apt/sources.list.d/docker.list"),
            os_release: root.join("etc/os-release"),
            ..InstallConfig::default()
        };
        if let Some(contents) = os_release {
            fs::create_dir_all(root.join("etc")).unwrap();
            fs::write(&config.os_release, contents).unwrap();
        }
        Self { dir, config }
    }

    pub fn jammy() -> Self {
        Self::new(Some(JAMMY_OS_RELEASE))
    }

    pub fn run(&self, system: &FakeSystem) -> Outcome {
        let packages = Apt::new(system);
        let keys = FileKeyStore::new(system);
        let platform = SystemPlatform::new(system);
        let runtime = DockerCli::new(system, "docker");
        let caps = Capabilities {
            host: system,
            packages: &packages,
            keys: &keys,
            platform: &platform,
            runtime: &runtime,
        };

        let mut out = Vec::new();
        let mut err = Vec::new();
        let (result, ctx) = {
            let mut provisioner = Provisioner::new(&self.config, caps, &mut out, &mut err);
            let result = provisioner.run();
            (result, provisioner.context().clone())
        };

        Outcome {
            result,
            stdout: String::from_utf8(out).unwrap(),
            stderr: String::from_utf8(err).unwrap(),
            ctx,
        }
    }
}
