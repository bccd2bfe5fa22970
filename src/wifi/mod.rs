//! WiFi provisioning: join the host onto the network described by a parsed
//! `WIFI:` credential using the platform's own network tooling.
//!
//! The platform is resolved once into a [`Platform`] variant; each supported
//! variant has a [`NetworkBackend`] that knows its command sequence and how to
//! read its status output. Commands run through a [`CommandRunner`] so tests
//! can record them instead of touching the network stack.

pub mod linux;
pub mod macos;
pub mod profile;
pub mod windows;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::classify::wifi::WiFiCredential;
use crate::error::{ProvisionError, ProvisionResult};
use crate::process::{CommandRunner, SystemRunner};

pub use self::linux::LinuxBackend;
pub use self::macos::MacOsBackend;
pub use self::windows::WindowsBackend;

/// Default wireless interface handed to `networksetup`.
pub const DEFAULT_MAC_INTERFACE: &str = "en0";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    Unsupported(String),
}

impl Platform {
    /// The platform this binary was built for.
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Map an OS name (`std::env::consts::OS` values, or a descriptive name
    /// such as "Windows 11" / "Mac OS X") to a variant.
    pub fn from_os_name(name: &str) -> Self {
        let lower = name.trim().to_ascii_lowercase();
        if lower.starts_with("win") {
            Platform::Windows
        } else if lower == "macos" || lower.starts_with("mac") || lower == "darwin" {
            Platform::MacOs
        } else if lower == "linux" || lower.contains("nux") || lower.contains("nix") {
            Platform::Linux
        } else {
            Platform::Unsupported(name.to_string())
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Platform::Unsupported(_))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Windows => f.write_str("windows"),
            Platform::MacOs => f.write_str("macos"),
            Platform::Linux => f.write_str("linux"),
            Platform::Unsupported(name) => write!(f, "unsupported ({})", name),
        }
    }
}

/// One platform's provisioning capability.
pub trait NetworkBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Wait between the connect command and verification.
    fn settle_period(&self) -> Duration;

    /// Run the commands that add and join the network. Any failing required
    /// command aborts with that command's error.
    fn join(&self, runner: &dyn CommandRunner, credential: &WiFiCredential) -> ProvisionResult<()>;

    /// Confirm the adapter is on `ssid`. Mismatch is `VerificationFailed`.
    fn verify(&self, runner: &dyn CommandRunner, ssid: &str) -> ProvisionResult<()>;
}

/// Provisioning knobs shared by every backend.
#[derive(Clone, Debug)]
pub struct ProvisionOptions {
    pub mac_interface: String,
    /// Replaces the backend's own settle period when set.
    pub settle_override: Option<Duration>,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            mac_interface: DEFAULT_MAC_INTERFACE.to_string(),
            settle_override: None,
        }
    }
}

/// Final provisioning result handed back to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConnectionOutcome {
    pub success: bool,
    pub message: String,
}

impl ConnectionOutcome {
    fn connected(ssid: &str) -> Self {
        Self {
            success: true,
            message: format!("Connected to '{}'", ssid),
        }
    }

    fn failed(err: &ProvisionError) -> Self {
        Self {
            success: false,
            message: err.to_string(),
        }
    }
}

pub struct WifiProvisioner {
    platform: Platform,
    backend: Option<Box<dyn NetworkBackend>>,
    runner: Arc<dyn CommandRunner>,
    options: ProvisionOptions,
}

impl WifiProvisioner {
    /// Provisioner for the running host with the real process runner.
    pub fn for_host(options: ProvisionOptions, command_timeout: Duration) -> Self {
        Self::new(
            Platform::current(),
            Arc::new(SystemRunner::with_timeout(command_timeout)),
            options,
        )
    }

    pub fn new(platform: Platform, runner: Arc<dyn CommandRunner>, options: ProvisionOptions) -> Self {
        let backend: Option<Box<dyn NetworkBackend>> = match &platform {
            Platform::Windows => Some(Box::new(WindowsBackend::new())),
            Platform::MacOs => Some(Box::new(MacOsBackend::new(options.mac_interface.clone()))),
            Platform::Linux => Some(Box::new(LinuxBackend::new())),
            Platform::Unsupported(_) => None,
        };
        Self {
            platform,
            backend,
            runner,
            options,
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Join the network and report a single human-readable outcome.
    pub fn connect(&self, credential: &WiFiCredential) -> ConnectionOutcome {
        match self.try_connect(credential) {
            Ok(()) => ConnectionOutcome::connected(&credential.ssid),
            Err(err) => {
                log::warn!("provisioning '{}' failed: {}", credential.ssid, err);
                ConnectionOutcome::failed(&err)
            }
        }
    }

    /// Join the network, surfacing the typed failure.
    pub fn try_connect(&self, credential: &WiFiCredential) -> ProvisionResult<()> {
        let Some(backend) = self.backend.as_deref() else {
            let name = match &self.platform {
                Platform::Unsupported(name) => name.clone(),
                other => other.to_string(),
            };
            return Err(ProvisionError::UnsupportedPlatform(name));
        };
        if credential.ssid.is_empty() {
            return Err(ProvisionError::InvalidCredential("empty SSID".into()));
        }

        log::info!(
            "provisioning '{}' via {} (security {})",
            credential.ssid,
            backend.name(),
            credential.security
        );
        backend.join(self.runner.as_ref(), credential)?;

        let settle = self.options.settle_override.unwrap_or_else(|| backend.settle_period());
        if !settle.is_zero() {
            log::debug!("waiting {:?} for the network stack to settle", settle);
            std::thread::sleep(settle);
        }

        backend.verify(self.runner.as_ref(), &credential.ssid)?;
        log::info!("connected to '{}'", credential.ssid);
        Ok(())
    }
}

impl fmt::Debug for WifiProvisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiProvisioner")
            .field("platform", &self.platform)
            .field("options", &self.options)
            .finish()
    }
}

/// Map a status-check command failure to a verification failure.
pub(crate) fn verification_error(ssid: &str, err: ProvisionError) -> ProvisionError {
    ProvisionError::VerificationFailed {
        ssid: ssid.to_string(),
        detail: format!("status check failed: {}", err),
    }
}
