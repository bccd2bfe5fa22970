//! NetworkManager (`nmcli`) provisioning.

use std::sync::OnceLock;
use std::time::Duration;

use super::{verification_error, NetworkBackend};
use crate::classify::wifi::{unescape_wifi_value, WiFiCredential};
use crate::error::{ProvisionError, ProvisionResult};
use crate::process::{CommandLine, CommandRunner};

pub const SETTLE_PERIOD: Duration = Duration::from_millis(3000);
pub const TOOL: &str = "nmcli";

#[derive(Debug, Default)]
pub struct LinuxBackend {
    tool_present: OnceLock<bool>,
}

impl LinuxBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join_command(credential: &WiFiCredential) -> CommandLine {
        let mut cmd = CommandLine::new(TOOL).args(["dev", "wifi", "connect", credential.ssid.as_str()]);
        if credential.has_password() {
            cmd = cmd
                .args(["password", credential.password.as_str()])
                .secret(credential.password.as_str());
        }
        if credential.hidden {
            cmd = cmd.args(["hidden", "yes"]);
        }
        cmd
    }

    pub fn status_command() -> CommandLine {
        CommandLine::new(TOOL).args(["-t", "-f", "active,ssid", "dev", "wifi"])
    }

    fn ensure_tool(&self, runner: &dyn CommandRunner) -> ProvisionResult<()> {
        let present = *self.tool_present.get_or_init(|| runner.tool_available(TOOL));
        if present {
            Ok(())
        } else {
            Err(ProvisionError::ToolMissing {
                tool: format!("NetworkManager ({})", TOOL),
            })
        }
    }
}

impl NetworkBackend for LinuxBackend {
    fn name(&self) -> &'static str {
        TOOL
    }

    fn settle_period(&self) -> Duration {
        SETTLE_PERIOD
    }

    fn join(&self, runner: &dyn CommandRunner, credential: &WiFiCredential) -> ProvisionResult<()> {
        self.ensure_tool(runner)?;
        runner.run(&Self::join_command(credential))?;
        Ok(())
    }

    fn verify(&self, runner: &dyn CommandRunner, ssid: &str) -> ProvisionResult<()> {
        let output = runner
            .run(&Self::status_command())
            .map_err(|err| verification_error(ssid, err))?;
        if active_ssids(&output.output).any(|active| active == ssid) {
            Ok(())
        } else {
            Err(ProvisionError::VerificationFailed {
                ssid: ssid.to_string(),
                detail: "no active connection with this SSID".into(),
            })
        }
    }
}

/// SSIDs on `yes:<ssid>` lines of terse nmcli output, with nmcli's `\:` and
/// `\\` escapes resolved.
pub fn active_ssids(output: &str) -> impl Iterator<Item = String> + '_ {
    output
        .lines()
        .filter_map(|line| line.strip_prefix("yes:"))
        .map(unescape_wifi_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::wifi::Security;

    #[test]
    fn connect_arguments_follow_credential() {
        let cred = WiFiCredential {
            ssid: "Lab Net".into(),
            password: "pw".into(),
            security: Security::Wpa2,
            hidden: true,
        };
        let cmd = LinuxBackend::join_command(&cred);
        assert_eq!(cmd.program(), "nmcli");
        assert_eq!(
            cmd.arguments(),
            ["dev", "wifi", "connect", "Lab Net", "password", "pw", "hidden", "yes"]
        );
        assert!(!cmd.display().contains("pw "));
    }

    #[test]
    fn only_active_rows_count() {
        let output = "no:Neighbour\nyes:Lab\\:5G\nno:Lab\n";
        let active: Vec<_> = active_ssids(output).collect();
        assert_eq!(active, vec!["Lab:5G".to_string()]);
    }
}
