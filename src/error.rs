//! Error taxonomy for WiFi provisioning.
//!
//! Capture, decode and classification problems never reach this type: those
//! are transient or fall back to text handling inside the scan pipeline.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The host OS has no provisioning backend.
    #[error("Unsupported operating system: {0}")]
    UnsupportedPlatform(String),

    /// A required network tool is not installed.
    #[error("{tool} tool not found. Cannot manage WiFi.")]
    ToolMissing { tool: String },

    /// A command exceeded its time budget and was killed.
    #[error("Command timed out after {}s: {command}", timeout.as_secs_f32())]
    CommandTimeout { command: String, timeout: Duration },

    /// A command could not be started or exited non-zero.
    #[error("Command failed: {command}: {output}")]
    CommandFailed { command: String, output: String },

    /// Commands succeeded but the post-connect check did not see the network.
    #[error("Not connected to '{ssid}' after provisioning: {detail}")]
    VerificationFailed { ssid: String, detail: String },

    /// The credential cannot be passed to the platform tooling safely.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// Local file handling for a profile descriptor failed.
    #[error("profile file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Discriminant of [`ProvisionError`], convenient for matching in callers and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProvisionErrorKind {
    UnsupportedPlatform,
    ToolMissing,
    CommandTimeout,
    CommandFailed,
    VerificationFailed,
    InvalidCredential,
    Io,
}

impl ProvisionError {
    pub fn kind(&self) -> ProvisionErrorKind {
        match self {
            ProvisionError::UnsupportedPlatform(_) => ProvisionErrorKind::UnsupportedPlatform,
            ProvisionError::ToolMissing { .. } => ProvisionErrorKind::ToolMissing,
            ProvisionError::CommandTimeout { .. } => ProvisionErrorKind::CommandTimeout,
            ProvisionError::CommandFailed { .. } => ProvisionErrorKind::CommandFailed,
            ProvisionError::VerificationFailed { .. } => ProvisionErrorKind::VerificationFailed,
            ProvisionError::InvalidCredential(_) => ProvisionErrorKind::InvalidCredential,
            ProvisionError::Io(_) => ProvisionErrorKind::Io,
        }
    }
}

pub type ProvisionResult<T> = std::result::Result<T, ProvisionError>;
