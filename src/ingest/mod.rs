//! Frame ingestion sources.
//!
//! This module provides different sources for raster frames:
//! - Synthetic stream (`stub://`, tests and demos)
//! - Still image files (png/jpeg/bmp/gif)
//! - USB/V4L2 capture devices (feature: ingest-v4l2)
//!
//! All sources produce RGB24 `Frame` instances consumed by the scan loop.
//! A source is exclusively owned by one scan loop at a time; switching devices
//! means stopping the loop, taking the source back, and opening the next one.

pub mod file;
#[cfg(feature = "ingest-v4l2")]
mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::Result;

use crate::frame::Frame;

pub use file::{FileConfig, FileSource};
pub use synthetic::{SyntheticConfig, SyntheticSource};
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::{V4l2Config, V4l2Source};

/// A supplier of frames on demand.
///
/// `get_frame` may legitimately return `Ok(None)` (no frame ready); the scan
/// loop treats that, and any `Err`, as a transient capture failure.
pub trait FrameSource: Send {
    /// Capture the next frame, if one is available.
    fn get_frame(&mut self) -> Result<Option<Frame>>;

    /// Returns true while the source can still produce frames.
    fn is_open(&self) -> bool;

    /// Human-readable source identifier for logs.
    fn describe(&self) -> String;

    /// Release the underlying device. Idempotent.
    fn close(&mut self) {}
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn get_frame(&mut self) -> Result<Option<Frame>> {
        (**self).get_frame()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Open a frame source from a URI.
///
/// - `stub://name[?payload=TEXT&every=N]` → [`SyntheticSource`]
/// - `/dev/videoN` → [`V4l2Source`] (requires the ingest-v4l2 feature)
/// - anything else is treated as a comma-separated list of image file paths
pub fn open_source(uri: &str) -> Result<Box<dyn FrameSource>> {
    let uri = uri.trim();
    if uri.is_empty() {
        anyhow::bail!("frame source URI must not be empty");
    }
    if uri.starts_with("stub://") {
        let mut source = SyntheticSource::new(SyntheticConfig::from_uri(uri)?)?;
        source.connect()?;
        return Ok(Box::new(source));
    }
    if uri.starts_with("/dev/video") {
        #[cfg(feature = "ingest-v4l2")]
        {
            let mut source = V4l2Source::new(V4l2Config {
                device: uri.to_string(),
                ..V4l2Config::default()
            })?;
            source.connect()?;
            return Ok(Box::new(source));
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            anyhow::bail!("capture devices require the ingest-v4l2 feature")
        }
    }
    if uri.contains("://") {
        anyhow::bail!("unsupported frame source scheme: {}", uri);
    }
    let paths = uri
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(Into::into)
        .collect();
    Ok(Box::new(FileSource::new(FileConfig {
        paths,
        repeat: false,
    })?))
}
