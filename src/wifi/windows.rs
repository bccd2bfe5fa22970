//! `netsh wlan` provisioning.
//!
//! netsh lines go through `cmd.exe /c` so quoted names containing spaces reach
//! netsh intact. Because of that, SSIDs carrying characters cmd interprets
//! inside double quotes are refused up front.

use std::io::Write;
use std::time::Duration;

use super::profile::render_profile;
use super::{verification_error, NetworkBackend};
use crate::classify::wifi::WiFiCredential;
use crate::error::{ProvisionError, ProvisionResult};
use crate::process::{CommandLine, CommandRunner};

pub const SETTLE_PERIOD: Duration = Duration::from_millis(3000);

#[derive(Debug, Default)]
pub struct WindowsBackend;

impl WindowsBackend {
    pub fn new() -> Self {
        Self
    }

    pub fn delete_profile_command(ssid: &str) -> CommandLine {
        CommandLine::shell(format!("netsh wlan delete profile name=\"{}\"", ssid))
    }

    pub fn add_profile_command(path: &str) -> CommandLine {
        CommandLine::shell(format!("netsh wlan add profile filename=\"{}\"", path))
    }

    pub fn connect_command(ssid: &str) -> CommandLine {
        CommandLine::shell(format!("netsh wlan connect name=\"{}\"", ssid))
    }

    pub fn status_command() -> CommandLine {
        CommandLine::new("netsh").args(["wlan", "show", "interfaces"])
    }
}

fn check_shell_safe(ssid: &str) -> ProvisionResult<()> {
    if ssid.chars().any(|c| c == '"' || c == '%' || c.is_control()) {
        return Err(ProvisionError::InvalidCredential(format!(
            "SSID '{}' contains characters netsh cannot receive safely",
            ssid.escape_debug()
        )));
    }
    Ok(())
}

impl NetworkBackend for WindowsBackend {
    fn name(&self) -> &'static str {
        "netsh"
    }

    fn settle_period(&self) -> Duration {
        SETTLE_PERIOD
    }

    fn join(&self, runner: &dyn CommandRunner, credential: &WiFiCredential) -> ProvisionResult<()> {
        let ssid = credential.ssid.as_str();
        check_shell_safe(ssid)?;

        // Best effort: a stale profile blocks "add", and a missing one is fine.
        if let Err(err) = runner.run(&Self::delete_profile_command(ssid)) {
            log::info!("could not delete profile for '{}' (probably absent): {}", ssid, err);
        }

        // Removed from disk when `file` drops, on every path out of this scope.
        let mut file = tempfile::Builder::new()
            .prefix("wifi_profile_")
            .suffix(".xml")
            .tempfile()?;
        file.write_all(render_profile(credential).as_bytes())?;
        file.flush()?;

        let path = file.path().display().to_string();
        runner.run(&Self::add_profile_command(&path))?;
        runner.run(&Self::connect_command(ssid))?;
        Ok(())
    }

    fn verify(&self, runner: &dyn CommandRunner, ssid: &str) -> ProvisionResult<()> {
        let output = runner
            .run(&Self::status_command())
            .map_err(|err| verification_error(ssid, err))?;
        if connected_ssids(&output.output).any(|current| current == ssid) {
            Ok(())
        } else {
            Err(ProvisionError::VerificationFailed {
                ssid: ssid.to_string(),
                detail: "no interface reports this SSID".into(),
            })
        }
    }
}

/// Values of `SSID : …` lines in `netsh wlan show interfaces` output.
/// `BSSID` lines are skipped.
pub fn connected_ssids(output: &str) -> impl Iterator<Item = &str> {
    output.lines().filter_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key.trim() == "SSID").then(|| value.trim())
    })
}
