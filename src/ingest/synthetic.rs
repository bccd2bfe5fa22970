//! Synthetic frame source.
//!
//! `SyntheticSource` generates patterned RGB frames without any device. When a
//! payload is configured, every Nth frame embeds it in a marker run of pixels
//! that the `stub` decoder backend reads back. This lets the full pipeline
//! (scan loop → decoder → classifier → handlers) run in tests and demos.
//!
//! Marker layout, red channel of consecutive pixels in row-major order:
//! `Q R S T U B`, payload length (u16, big endian, two pixels), payload bytes.

use anyhow::{anyhow, Result};

use super::FrameSource;
use crate::frame::{Frame, RGB_CHANNELS};

pub(crate) const MARKER: &[u8; 6] = b"QRSTUB";
const HEADER_PIXELS: usize = MARKER.len() + 2;

/// Configuration for a synthetic source.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Text embedded into marker frames.
    pub payload: Option<String>,
    /// Embed the payload in every Nth frame (1 = every frame).
    pub payload_every: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            name: "synthetic".to_string(),
            width: 320,
            height: 240,
            payload: None,
            payload_every: 1,
        }
    }
}

impl SyntheticConfig {
    /// Parse `stub://name[?payload=TEXT&every=N]`.
    ///
    /// Query values are taken verbatim; a payload cannot itself contain `&`.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("stub://")
            .ok_or_else(|| anyhow!("synthetic source URI must start with stub://"))?;
        let (name, query) = match rest.split_once('?') {
            Some((name, query)) => (name, Some(query)),
            None => (rest, None),
        };
        let mut cfg = Self {
            name: if name.is_empty() { "synthetic" } else { name }.to_string(),
            ..Self::default()
        };
        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key {
                "payload" => cfg.payload = Some(value.to_string()),
                "every" => {
                    cfg.payload_every = value
                        .parse()
                        .map_err(|_| anyhow!("stub every= must be a positive integer"))?
                }
                "width" => {
                    cfg.width = value
                        .parse()
                        .map_err(|_| anyhow!("stub width= must be an integer"))?
                }
                "height" => {
                    cfg.height = value
                        .parse()
                        .map_err(|_| anyhow!("stub height= must be an integer"))?
                }
                other => log::warn!("SyntheticSource: ignoring unknown option '{}'", other),
            }
        }
        Ok(cfg)
    }
}

/// Device-free frame source.
pub struct SyntheticSource {
    config: SyntheticConfig,
    frame_count: u64,
    open: bool,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(anyhow!("synthetic frame dimensions must be non-zero"));
        }
        if config.payload_every == 0 {
            return Err(anyhow!("payload_every must be at least 1"));
        }
        if let Some(payload) = &config.payload {
            let capacity = (config.width as usize * config.height as usize)
                .saturating_sub(HEADER_PIXELS)
                .min(u16::MAX as usize);
            if payload.len() > capacity {
                return Err(anyhow!(
                    "payload of {} bytes does not fit a {}x{} synthetic frame",
                    payload.len(),
                    config.width,
                    config.height
                ));
            }
        }
        Ok(Self {
            config,
            frame_count: 0,
            open: false,
        })
    }

    /// Synthetic sources are always reachable.
    pub fn connect(&mut self) -> Result<()> {
        self.open = true;
        log::info!("SyntheticSource: connected to stub://{}", self.config.name);
        Ok(())
    }

    pub fn frames_captured(&self) -> u64 {
        self.frame_count
    }

    fn generate_pixels(&self) -> Vec<u8> {
        let pixel_count = self.config.width as usize * self.config.height as usize;
        let mut pixels = vec![0u8; pixel_count * RGB_CHANNELS];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 / 7 + self.frame_count) % 200) as u8;
        }
        let carries_payload = self.frame_count % self.config.payload_every == 0;
        if let (Some(payload), true) = (&self.config.payload, carries_payload) {
            let len = payload.len() as u16;
            let header = MARKER.iter().copied().chain(len.to_be_bytes());
            for (i, byte) in header.chain(payload.bytes()).enumerate() {
                pixels[i * RGB_CHANNELS] = byte;
            }
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn get_frame(&mut self) -> Result<Option<Frame>> {
        if !self.open {
            return Err(anyhow!("synthetic source not connected"));
        }
        self.frame_count += 1;
        let pixels = self.generate_pixels();
        Frame::from_rgb(pixels, self.config.width, self.config.height).map(Some)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn describe(&self) -> String {
        format!("stub://{}", self.config.name)
    }

    fn close(&mut self) {
        if self.open {
            log::info!(
                "SyntheticSource: closed stub://{} after {} frames",
                self.config.name,
                self.frame_count
            );
        }
        self.open = false;
    }
}

/// Read back a payload embedded by [`SyntheticSource`], if the frame carries one.
pub(crate) fn read_marker(frame: &Frame) -> Option<String> {
    let red = |i: usize| frame.pixels().get(i * RGB_CHANNELS).copied();
    for (i, expected) in MARKER.iter().enumerate() {
        if red(i)? != *expected {
            return None;
        }
    }
    let len = u16::from_be_bytes([red(MARKER.len())?, red(MARKER.len() + 1)?]) as usize;
    let bytes = (0..len)
        .map(|i| red(HEADER_PIXELS + i))
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stub_uri_options() -> Result<()> {
        let cfg = SyntheticConfig::from_uri("stub://desk?payload=WIFI:S:Lab;;&every=3")?;
        assert_eq!(cfg.name, "desk");
        assert_eq!(cfg.payload.as_deref(), Some("WIFI:S:Lab;;"));
        assert_eq!(cfg.payload_every, 3);
        Ok(())
    }

    #[test]
    fn embeds_payload_on_every_nth_frame() -> Result<()> {
        let mut source = SyntheticSource::new(SyntheticConfig {
            payload: Some("hello".into()),
            payload_every: 2,
            ..SyntheticConfig::default()
        })?;
        source.connect()?;

        let first = source.get_frame()?.expect("frame");
        let second = source.get_frame()?.expect("frame");
        assert_eq!(read_marker(&first), None);
        assert_eq!(read_marker(&second).as_deref(), Some("hello"));
        Ok(())
    }

    #[test]
    fn rejects_payload_larger_than_frame() {
        let result = SyntheticSource::new(SyntheticConfig {
            width: 2,
            height: 2,
            payload: Some("too long for four pixels".into()),
            ..SyntheticConfig::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn unconnected_source_errors() -> Result<()> {
        let mut source = SyntheticSource::new(SyntheticConfig::default())?;
        assert!(!source.is_open());
        assert!(source.get_frame().is_err());
        Ok(())
    }
}
