//! The export engine: walks the slice rects, decides per output file whether
//! to render, skip or overwrite, and hands the actual rendering to an
//! injected [`Rasterizer`]. Progress reporting goes through an
//! [`ExportObserver`] so the engine itself stays quiet.

pub mod outcome;

pub use outcome::ExportOutcome;

use crate::raster::Rasterizer;
use crate::svg::SliceRect;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    /// The document has no layer with the requested label.
    #[error("slice layer '{layer}' not found in `{}`", .document.display())]
    LayerNotFound { layer: String, document: PathBuf },
    /// The layer exists but holds no usable slice rectangles.
    #[error("no slice rectangles in layer '{layer}' of `{}`", .document.display())]
    NoSlices { layer: String, document: PathBuf },
}

/// How many files each slice produces and at which dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeMode {
    /// One file per rect, at the rect's own size: `{id}.png`.
    Native,
    /// One square file per configured size: `{id}_{size}_{size}.png`.
    Icon(Vec<u32>),
}

impl SizeMode {
    pub fn files_per_rect(&self) -> usize {
        match self {
            Self::Native => 1,
            Self::Icon(sizes) => sizes.len(),
        }
    }

    /// File name and pixel dimensions of every output of `slice`.
    pub fn render_plan(&self, slice: &SliceRect) -> Vec<(String, u32, u32)> {
        match self {
            Self::Native => vec![(
                format!("{}.png", slice.id),
                slice.pixel_width(),
                slice.pixel_height(),
            )],
            Self::Icon(sizes) => sizes
                .iter()
                .map(|size| (format!("{}_{}_{}.png", slice.id, size, size), *size, *size))
                .collect(),
        }
    }
}

/// Callbacks for everything worth telling the user about during a run.
/// All methods default to doing nothing.
pub trait ExportObserver {
    /// About to invoke the rasterizer for one output file.
    fn exporting(&mut self, _id: &str, _dest: &Path, _width: u32, _height: u32) {}

    /// The rasterizer returned an error for one output file.
    fn failed(&mut self, _id: &str, _dest: &Path, _error: &anyhow::Error) {}

    /// The outcome of one output file is decided, skips included.
    fn recorded(&mut self, _id: &str, _dest: &Path, _outcome: ExportOutcome) {}
}

/// Observer that swallows everything.
pub struct SilentObserver;

impl ExportObserver for SilentObserver {}

/// Renders slice rects to PNG files in a target directory.
pub struct SliceExporter<'a> {
    rasterizer: &'a dyn Rasterizer,
    directory: &'a Path,
    overwrite: bool,
}

impl<'a> SliceExporter<'a> {
    pub fn new(rasterizer: &'a dyn Rasterizer, directory: &'a Path, overwrite: bool) -> Self {
        Self {
            rasterizer,
            directory,
            overwrite,
        }
    }

    /// Export every slice and collect the outcome per rect id.
    ///
    /// A failing rasterizer invocation marks that rect [`ExportOutcome::Failed`]
    /// and the run carries on. In icon mode a rect produces several files;
    /// the recorded outcome is the one of the last size rendered.
    pub fn export_all(
        &self,
        document: &Path,
        slices: &[SliceRect],
        sizes: &SizeMode,
        observer: &mut dyn ExportObserver,
    ) -> HashMap<String, ExportOutcome> {
        let mut outcomes = HashMap::new();
        for slice in slices {
            let mut last = None;
            for (file_name, width, height) in sizes.render_plan(slice) {
                last =
                    Some(self.export_slice(document, slice, &file_name, width, height, observer));
            }
            if let Some(outcome) = last {
                outcomes.insert(slice.id.clone(), outcome);
            }
        }
        outcomes
    }

    /// Decide and carry out the export of one output file.
    fn export_slice(
        &self,
        document: &Path,
        slice: &SliceRect,
        file_name: &str,
        width: u32,
        height: u32,
        observer: &mut dyn ExportObserver,
    ) -> ExportOutcome {
        let dest = self.directory.join(file_name);
        let existed = dest.exists();
        if existed && !self.overwrite {
            observer.recorded(&slice.id, &dest, ExportOutcome::Skipped);
            return ExportOutcome::Skipped;
        }

        observer.exporting(&slice.id, &dest, width, height);
        let outcome = match self
            .rasterizer
            .rasterize(document, slice, &dest, width, height)
        {
            Ok(()) if existed => ExportOutcome::Overwritten,
            Ok(()) => ExportOutcome::Created,
            Err(e) => {
                observer.failed(&slice.id, &dest, &e);
                ExportOutcome::Failed
            }
        };
        observer.recorded(&slice.id, &dest, outcome);
        outcome
    }
}
