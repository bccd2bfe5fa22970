//! Captured raster frames and per-frame decode outcomes.
//!
//! - `Frame`: one RGB24 image produced by a `FrameSource`, consumed once by a decoder.
//! - `DecodeResult`: the optional text extracted from one frame.
//!
//! Frames are ephemeral. The scan loop drops each frame as soon as the decode
//! attempt for it returns.

use anyhow::{anyhow, Result};

/// Bytes per pixel for the packed RGB24 layout every source normalises to.
pub const RGB_CHANNELS: usize = 3;

/// One captured RGB24 frame.
///
/// Not `Clone`: a frame is handed from the source to exactly one decode attempt.
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Build a frame from packed RGB24 pixels.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(RGB_CHANNELS))
            .ok_or_else(|| anyhow!("frame dimensions overflow ({}x{})", width, height))?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Packed RGB24 pixels, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Pixel at (x, y) as an RGB triple. Out-of-range coordinates yield `None`.
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * RGB_CHANNELS;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// ITU-R BT.601 luma at (x, y), 0 when out of range.
    pub fn luma_at(&self, x: u32, y: u32) -> u8 {
        match self.rgb_at(x, y) {
            Some([r, g, b]) => {
                ((299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000) as u8
            }
            None => 0,
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Outcome of one decode attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeResult {
    pub text: Option<String>,
}

impl DecodeResult {
    pub fn found(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Decoded text, treating an empty payload as "nothing found".
    pub fn payload(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    pub fn into_payload(self) -> Option<String> {
        self.text.filter(|t| !t.is_empty())
    }
}
