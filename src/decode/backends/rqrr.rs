use anyhow::Result;

use crate::decode::backend::Decoder;
use crate::frame::{DecodeResult, Frame};

/// QR decoder backed by `rqrr`.
///
/// Frames are converted to luma on the fly; every detected grid is tried in
/// order and the first one that decodes to non-empty text wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct RqrrDecoder;

impl RqrrDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for RqrrDecoder {
    fn name(&self) -> &'static str {
        "rqrr"
    }

    fn decode(&self, frame: &Frame) -> Result<DecodeResult> {
        let mut prepared = ::rqrr::PreparedImage::prepare_from_greyscale(
            frame.width as usize,
            frame.height as usize,
            |x, y| frame.luma_at(x as u32, y as u32),
        );
        let grids = prepared.detect_grids();
        if grids.is_empty() {
            return Ok(DecodeResult::none());
        }

        for grid in &grids {
            match grid.decode() {
                Ok((_meta, text)) if !text.is_empty() => return Ok(DecodeResult::found(text)),
                Ok(_) => continue,
                Err(err) => log::debug!("rqrr: grid decode failed: {:?}", err),
            }
        }
        Ok(DecodeResult::none())
    }
}
