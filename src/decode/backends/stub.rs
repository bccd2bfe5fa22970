use anyhow::Result;

use crate::decode::backend::Decoder;
use crate::frame::{DecodeResult, Frame};
use crate::ingest::synthetic::read_marker;

/// Stub backend for testing. Reads payloads embedded by `SyntheticSource`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StubDecoder;

impl StubDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for StubDecoder {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn decode(&self, frame: &Frame) -> Result<DecodeResult> {
        Ok(match read_marker(frame) {
            Some(text) => DecodeResult::found(text),
            None => DecodeResult::none(),
        })
    }
}
