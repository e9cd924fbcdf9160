//! Shelling out to the configured renderer, one invocation per output file.

use crate::debug;
use crate::raster::{RasterBackend, Rasterizer};
use crate::svg::SliceRect;
use crate::utils::exec::{Cmd, EMPTY_FILTER, FilterRule};
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::Path;

/// Known-noisy stderr lines Inkscape emits on various platforms.
const INKSCAPE_FILTER: FilterRule = FilterRule::new(&[
    "Gtk-Message",
    "Gtk-WARNING",
    "GLib-GObject",
    "Background RRGGBBAA",
    "Area ",
    "Bitmap saved as",
    "dbus",
]);

/// Renders slices by invoking the backend binary.
pub struct CommandRasterizer {
    backend: RasterBackend,
}

impl CommandRasterizer {
    pub const fn new(backend: RasterBackend) -> Self {
        Self { backend }
    }

    fn filter(&self) -> &'static FilterRule {
        match self.backend {
            RasterBackend::Inkscape => &INKSCAPE_FILTER,
            RasterBackend::Magick => &EMPTY_FILTER,
        }
    }
}

impl Rasterizer for CommandRasterizer {
    fn rasterize(
        &self,
        document: &Path,
        slice: &SliceRect,
        output: &Path,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let args = build_args(self.backend, document, slice, output, width, height);
        debug!("raster"; "{} {}", self.backend.binary(), display_args(&args));

        Cmd::new(self.backend.binary())
            .args(&args)
            .filter(self.filter())
            .run()
            .with_context(|| format!("Failed to render `{}`", slice.id))?;
        Ok(())
    }
}

/// Build the renderer invocation for one output file.
///
/// Inkscape exports the page area covered by the rect directly via
/// `--export-id`. ImageMagick has no notion of element areas, so the page is
/// rendered whole, cropped to the rect and resized to the target dimensions.
fn build_args(
    backend: RasterBackend,
    document: &Path,
    slice: &SliceRect,
    output: &Path,
    width: u32,
    height: u32,
) -> Vec<OsString> {
    match backend {
        RasterBackend::Inkscape => vec![
            OsString::from("--export-type=png"),
            OsString::from(format!("--export-id={}", slice.id)),
            OsString::from(format!("--export-width={width}")),
            OsString::from(format!("--export-height={height}")),
            concat_os("--export-filename=", output),
            document.as_os_str().to_owned(),
        ],
        RasterBackend::Magick => {
            let crop = format!(
                "{}x{}{:+}{:+}",
                slice.pixel_width(),
                slice.pixel_height(),
                slice.x.round() as i64,
                slice.y.round() as i64
            );
            vec![
                OsString::from("-background"),
                OsString::from("none"),
                document.as_os_str().to_owned(),
                OsString::from("-crop"),
                OsString::from(crop),
                OsString::from("+repage"),
                OsString::from("-resize"),
                OsString::from(format!("{width}x{height}!")),
                output.as_os_str().to_owned(),
            ]
        }
    }
}

/// Join a flag with a path value without round-tripping through UTF-8.
fn concat_os(flag: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(flag);
    arg.push(path.as_os_str());
    arg
}

fn display_args(args: &[OsString]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
