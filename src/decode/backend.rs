use anyhow::Result;

use crate::frame::{DecodeResult, Frame};

/// Optical code decoder trait.
///
/// A decoder is a pure function of the frame: it keeps no per-call state, so a
/// single instance can be shared across threads behind an `Arc`.
///
/// Returning `Ok(DecodeResult::none())` and returning `Err` are both treated
/// by the scan loop as transient ("nothing this frame"); the distinction only
/// matters for logging.
pub trait Decoder: Send + Sync {
    /// Backend identifier, used for selection in config.
    fn name(&self) -> &'static str;

    /// Attempt to extract one code payload from the frame.
    fn decode(&self, frame: &Frame) -> Result<DecodeResult>;
}
