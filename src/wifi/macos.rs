//! `networksetup` provisioning.

use std::time::Duration;

use super::{verification_error, NetworkBackend};
use crate::classify::wifi::WiFiCredential;
use crate::error::{ProvisionError, ProvisionResult};
use crate::process::{CommandLine, CommandRunner};

pub const SETTLE_PERIOD: Duration = Duration::from_millis(5000);

#[derive(Debug)]
pub struct MacOsBackend {
    interface: String,
}

impl MacOsBackend {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn join_command(&self, credential: &WiFiCredential) -> CommandLine {
        let cmd = CommandLine::new("networksetup").args([
            "-setairportnetwork",
            self.interface.as_str(),
            credential.ssid.as_str(),
        ]);
        if credential.has_password() {
            cmd.arg(credential.password.as_str())
                .secret(credential.password.as_str())
        } else {
            cmd
        }
    }

    pub fn status_command(&self) -> CommandLine {
        CommandLine::new("networksetup").args(["-getairportnetwork", self.interface.as_str()])
    }
}

impl NetworkBackend for MacOsBackend {
    fn name(&self) -> &'static str {
        "networksetup"
    }

    fn settle_period(&self) -> Duration {
        SETTLE_PERIOD
    }

    fn join(&self, runner: &dyn CommandRunner, credential: &WiFiCredential) -> ProvisionResult<()> {
        let result = runner.run(&self.join_command(credential))?;
        // networksetup exits 0 on join failures and reports them in its output.
        if !result.output.is_empty() {
            log::debug!("networksetup: {}", result.output);
        }
        Ok(())
    }

    fn verify(&self, runner: &dyn CommandRunner, ssid: &str) -> ProvisionResult<()> {
        let output = runner
            .run(&self.status_command())
            .map_err(|err| verification_error(ssid, err))?;
        match current_network(&output.output) {
            Some(current) if current == ssid => Ok(()),
            Some(current) => Err(ProvisionError::VerificationFailed {
                ssid: ssid.to_string(),
                detail: format!("interface is on '{}'", current),
            }),
            None => Err(ProvisionError::VerificationFailed {
                ssid: ssid.to_string(),
                detail: output.output.clone(),
            }),
        }
    }
}

/// Network name from `Current Wi-Fi Network: <ssid>` output.
pub fn current_network(output: &str) -> Option<&str> {
    output.lines().find_map(|line| {
        let (label, value) = line.split_once(": ")?;
        label
            .trim()
            .starts_with("Current Wi-Fi Network")
            .then(|| value.trim_end())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::wifi::Security;

    #[test]
    fn password_argument_only_when_present() {
        let backend = MacOsBackend::new("en0");
        let mut cred = WiFiCredential {
            ssid: "Home".into(),
            password: "pw".into(),
            security: Security::Wpa2,
            hidden: false,
        };
        assert_eq!(
            backend.join_command(&cred).arguments(),
            ["-setairportnetwork", "en0", "Home", "pw"]
        );
        cred.password.clear();
        assert_eq!(
            backend.join_command(&cred).arguments(),
            ["-setairportnetwork", "en0", "Home"]
        );
    }

    #[test]
    fn parses_current_network_line() {
        assert_eq!(
            current_network("Current Wi-Fi Network: Cafe: Upstairs\n"),
            Some("Cafe: Upstairs")
        );
        assert_eq!(
            current_network("You are not associated with an AirPort network."),
            None
        );
    }
}
