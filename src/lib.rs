//! QR scanner core.
//!
//! Turns a stream of frames into debounced detections, classifies each decoded
//! payload, and joins WiFi networks described by `WIFI:` codes using the host
//! platform's network tooling.
//!
//! # Module Structure
//!
//! - `frame`: RGB frames and per-frame decode results
//! - `ingest`: Frame sources (synthetic, still images, V4L2 devices)
//! - `decode`: Decoder backends and registry
//! - `scan`: Background capture/decode loop with single-flight decoding and cooldown
//! - `classify`: Payload classification and per-kind field parsers
//! - `handlers`: Per-kind content actions
//! - `wifi`: Platform provisioning backends
//! - `process`: External command runner with timeout
//! - `config`: File + environment configuration
//!
//! # Data flow
//!
//! ```text
//! FrameSource -> Decoder -> ScanLoop -> classify -> HandlerRegistry
//!                                                      |
//!                                   WIFI: WifiProvisioner -> CommandRunner
//! ```

pub mod classify;
pub mod cli;
pub mod config;
pub mod decode;
pub mod error;
pub mod frame;
pub mod handlers;
pub mod ingest;
pub mod process;
pub mod scan;
pub mod wifi;

mod ui;

pub use classify::{classify, Classification, PayloadKind, Security, VCard, WiFiCredential};
pub use config::ScannerConfig;
pub use decode::{Decoder, DecoderRegistry};
pub use error::{ProvisionError, ProvisionErrorKind};
pub use frame::{DecodeResult, Frame};
pub use handlers::{ContentAction, ContentHandler, HandlerRegistry};
pub use ingest::{open_source, FrameSource};
pub use process::{CommandLine, CommandResult, CommandRunner, SystemRunner};
pub use scan::{ScanConfig, ScanEvent, ScanHandle, ScanLoop, ScanState};
pub use wifi::{ConnectionOutcome, Platform, ProvisionOptions, WifiProvisioner};
