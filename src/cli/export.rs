//! The export command: conceal the slice rects, render every output file
//! from a working copy, then paint the outcome colors back into the document.

use crate::config::ExportConfig;
use crate::export::{ExportObserver, ExportOutcome, SliceExporter};
use crate::logger::ProgressLine;
use crate::raster::{CommandRasterizer, NullRasterizer, Rasterizer};
use crate::svg::{SliceDoc, SliceRect};
use crate::utils::path::normalize_path;
use crate::{debug, log};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::NamedTempFile;

/// Run the export command end to end.
pub fn run_export(config: &ExportConfig) -> Result<()> {
    let mut doc = SliceDoc::open(&config.input)?;
    let slices = super::require_slices(&doc, &config.layer)?;

    debug!("export"; "exporting {} slices from `{}`", slices.len(), config.input.display());

    let rasterizer: Box<dyn Rasterizer> = if config.dry_run {
        Box::new(NullRasterizer)
    } else {
        Box::new(CommandRasterizer::new(config.backend))
    };

    let outcomes = export_document(&mut doc, &slices, config, rasterizer.as_ref())?;

    if !config.dry_run {
        if config.in_place {
            doc.write_to(&config.input)?;
            debug!("export"; "status colors written to `{}`", config.input.display());
        } else if let Some(annotate) = &config.annotate {
            doc.write_to(annotate)?;
            log!("export"; "annotated copy written to `{}`", annotate.display());
        }
    }

    print_summary(&slices, &outcomes, config);

    let failed = outcomes
        .values()
        .filter(|o| **o == ExportOutcome::Failed)
        .count();
    if failed > 0 {
        anyhow::bail!("{failed} slice(s) failed to export");
    }
    Ok(())
}

/// Conceal the slices, render from a working copy, then tint the rects with
/// their outcome colors. The document passed in ends up carrying the tints.
fn export_document(
    doc: &mut SliceDoc,
    slices: &[SliceRect],
    config: &ExportConfig,
    rasterizer: &dyn Rasterizer,
) -> Result<HashMap<String, ExportOutcome>> {
    if !config.dry_run {
        fs::create_dir_all(&config.directory).with_context(|| {
            format!("Failed to create directory `{}`", config.directory.display())
        })?;
    }

    doc.conceal_slices(&config.layer)?;
    // Nothing reads the document in a dry run, so no working copy either.
    let work = (!config.dry_run)
        .then(|| working_copy(doc))
        .transpose()?;

    let sizes = config.size_mode();
    let exporter = SliceExporter::new(rasterizer, &config.directory, config.overwrite);
    let mut reporter = TermReporter::new(slices.len() * sizes.files_per_rect(), config.dry_run);
    let document = work.as_ref().map_or(doc.path(), |w| w.path());
    let outcomes = exporter.export_all(document, slices, &sizes, &mut reporter);
    reporter.finish();

    let colors: HashMap<String, String> = outcomes
        .iter()
        .map(|(id, outcome)| (id.clone(), outcome.status_color().to_string()))
        .collect();
    doc.tint_slices(&config.layer, &colors)?;

    Ok(outcomes)
}

/// Write the concealed document to a temporary file next to the input so
/// relative references (linked images, stylesheets) still resolve during
/// rendering. Falls back to the system temp directory.
fn working_copy(doc: &SliceDoc) -> Result<NamedTempFile> {
    let dir = if doc.path().as_os_str().is_empty() {
        std::env::temp_dir()
    } else {
        normalize_path(doc.path())
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir)
    };

    let file = tempfile::Builder::new()
        .prefix(".inkslice-")
        .suffix(".svg")
        .tempfile_in(&dir)
        .or_else(|_| {
            tempfile::Builder::new()
                .prefix(".inkslice-")
                .suffix(".svg")
                .tempfile()
        })
        .context("Failed to create working copy")?;

    doc.write_to(file.path())?;
    Ok(file)
}

/// Progress and logging observer for terminal runs.
struct TermReporter {
    progress: Option<ProgressLine>,
    dry_run: bool,
}

impl TermReporter {
    fn new(total: usize, dry_run: bool) -> Self {
        Self {
            progress: (!dry_run).then(|| ProgressLine::new(&[("files", total)])),
            dry_run,
        }
    }

    fn finish(&mut self) {
        if let Some(progress) = self.progress.take() {
            progress.finish();
        }
    }
}

impl ExportObserver for TermReporter {
    fn exporting(&mut self, id: &str, dest: &Path, width: u32, height: u32) {
        debug!("export"; "rendering `{}` at {}x{} -> {}", id, width, height, dest.display());
    }

    fn failed(&mut self, id: &str, _dest: &Path, error: &anyhow::Error) {
        log!("error"; "`{}`: {:#}", id, error);
    }

    fn recorded(&mut self, _id: &str, dest: &Path, outcome: ExportOutcome) {
        if self.dry_run {
            let verb = match outcome {
                ExportOutcome::Created => "create",
                ExportOutcome::Overwritten => "overwrite",
                ExportOutcome::Skipped => "skip (exists)",
                ExportOutcome::Failed => "fail",
            };
            log!("export"; "would {} {}", verb, dest.display());
        } else if outcome == ExportOutcome::Skipped {
            debug!("export"; "`{}` exists, not overwriting", dest.display());
        }

        if let Some(progress) = &self.progress {
            progress.inc("files");
        }
    }
}

/// Per-slice status lines and a final count line.
fn print_summary(
    slices: &[SliceRect],
    outcomes: &HashMap<String, ExportOutcome>,
    config: &ExportConfig,
) {
    let mut created = 0usize;
    let mut overwritten = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for slice in slices {
        let Some(outcome) = outcomes.get(&slice.id) else {
            continue;
        };
        match outcome {
            ExportOutcome::Created => created += 1,
            ExportOutcome::Overwritten => overwritten += 1,
            ExportOutcome::Skipped => skipped += 1,
            ExportOutcome::Failed => failed += 1,
        }
        println!("  {} {}", outcome.colored_label(), slice.id);
    }

    let prefix = if config.dry_run { "dry run: " } else { "" };
    log!(
        "export";
        "{}{} created, {} overwritten, {} skipped, {} failed",
        prefix, created, overwritten, skipped, failed
    );
}
