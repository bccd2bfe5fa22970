//! Still image frame source.
//!
//! `FileSource` turns a list of local image files into a frame sequence. Each
//! file is decoded in-memory with the `image` crate and normalised to RGB24.
//! PDF rasterisation is not handled here.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use super::FrameSource;
use crate::frame::Frame;

/// Configuration for a still image source.
#[derive(Clone, Debug, Default)]
pub struct FileConfig {
    /// Local image paths, yielded in order.
    pub paths: Vec<PathBuf>,
    /// Start over from the first path once the list is exhausted.
    pub repeat: bool,
}

/// Frame source backed by image files on disk.
pub struct FileSource {
    config: FileConfig,
    cursor: usize,
    frames_captured: u64,
    open: bool,
}

impl FileSource {
    pub fn new(config: FileConfig) -> Result<Self> {
        if config.paths.is_empty() {
            return Err(anyhow!("file source needs at least one image path"));
        }
        for path in &config.paths {
            if !is_local_file_path(path) {
                return Err(anyhow!(
                    "file ingestion only supports local paths (got {})",
                    path.display()
                ));
            }
        }
        Ok(Self {
            config,
            cursor: 0,
            frames_captured: 0,
            open: true,
        })
    }

    pub fn frames_captured(&self) -> u64 {
        self.frames_captured
    }

    fn next_path(&mut self) -> Option<PathBuf> {
        if self.cursor >= self.config.paths.len() {
            if !self.config.repeat {
                return None;
            }
            self.cursor = 0;
        }
        let path = self.config.paths.get(self.cursor).cloned();
        self.cursor += 1;
        path
    }
}

impl FrameSource for FileSource {
    fn get_frame(&mut self) -> Result<Option<Frame>> {
        if !self.open {
            return Ok(None);
        }
        let Some(path) = self.next_path() else {
            log::info!("FileSource: all {} files consumed", self.config.paths.len());
            self.open = false;
            return Ok(None);
        };
        let frame = load_frame(&path)?;
        self.frames_captured += 1;
        Ok(Some(frame))
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn describe(&self) -> String {
        match self.config.paths.as_slice() {
            [single] => single.display().to_string(),
            paths => format!("{} image files", paths.len()),
        }
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// Decode one image file into an RGB24 frame.
pub fn load_frame(path: &Path) -> Result<Frame> {
    let image = image::open(path)
        .with_context(|| format!("could not read image file {}", path.display()))?;
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    Frame::from_rgb(rgb.into_raw(), width, height)
}

fn is_local_file_path(path: &Path) -> bool {
    let display = path.to_string_lossy();
    !display.trim().is_empty() && !display.contains("://")
}
