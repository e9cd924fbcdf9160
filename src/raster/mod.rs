//! Rendering backends. The export engine only sees the [`Rasterizer`] trait;
//! the real implementation shells out to an external renderer, the null one
//! backs dry runs, and tests inject a recording double.

pub mod command;

pub use command::CommandRasterizer;

use crate::svg::SliceRect;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Renders one slice of an SVG document into a PNG file.
pub trait Rasterizer {
    fn rasterize(
        &self,
        document: &Path,
        slice: &SliceRect,
        output: &Path,
        width: u32,
        height: u32,
    ) -> Result<()>;
}

/// External renderer selected via config or `--backend`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RasterBackend {
    /// Inkscape's own CLI; renders the area of the slice rect by id.
    #[default]
    Inkscape,
    /// ImageMagick; renders the whole page, then crops to the rect.
    Magick,
}

impl RasterBackend {
    pub const fn binary(self) -> &'static str {
        match self {
            Self::Inkscape => "inkscape",
            Self::Magick => "magick",
        }
    }
}

/// Backend for dry runs: reports success without touching anything.
pub struct NullRasterizer;

impl Rasterizer for NullRasterizer {
    fn rasterize(
        &self,
        _document: &Path,
        _slice: &SliceRect,
        _output: &Path,
        _width: u32,
        _height: u32,
    ) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub element_id: String,
    pub output: std::path::PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Test double: records invocations, writes placeholder files and fails on
/// request.
#[cfg(test)]
pub struct RecordingRasterizer {
    calls: std::cell::RefCell<Vec<RecordedCall>>,
    fail_ids: &'static [&'static str],
}

#[cfg(test)]
impl RecordingRasterizer {
    pub fn new() -> Self {
        Self {
            calls: std::cell::RefCell::new(Vec::new()),
            fail_ids: &[],
        }
    }

    pub fn failing(fail_ids: &'static [&'static str]) -> Self {
        Self {
            fail_ids,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

#[cfg(test)]
impl Rasterizer for RecordingRasterizer {
    fn rasterize(
        &self,
        _document: &Path,
        slice: &SliceRect,
        output: &Path,
        width: u32,
        height: u32,
    ) -> Result<()> {
        if self.fail_ids.contains(&slice.id.as_str()) {
            anyhow::bail!("renderer exploded for `{}`", slice.id);
        }
        self.calls.borrow_mut().push(RecordedCall {
            element_id: slice.id.clone(),
            output: output.to_path_buf(),
            width,
            height,
        });
        std::fs::write(output, b"png")?;
        Ok(())
    }
}
