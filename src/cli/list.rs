//! The list command: show the slices a document defines, and the output
//! files an export would produce, without rendering anything.

use crate::config::ExportConfig;
use crate::export::SizeMode;
use crate::log;
use crate::svg::{SliceDoc, SliceRect};
use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::Path;

/// One output file a slice would produce.
#[derive(Debug, Serialize)]
pub struct FileListing {
    pub file: String,
    pub width: u32,
    pub height: u32,
    pub exists: bool,
}

/// One slice rectangle and its planned output files.
#[derive(Debug, Serialize)]
pub struct SliceListing {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub files: Vec<FileListing>,
}

/// Listing for the whole document.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ListResult {
    pub slices: Vec<SliceListing>,
}

/// Execute the list command.
pub fn run_list(config: &ExportConfig, json: bool) -> Result<()> {
    let doc = SliceDoc::open(&config.input)?;
    let slices = super::require_slices(&doc, &config.layer)?;
    let result = list_slices(&slices, &config.size_mode(), &config.directory);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    log!(
        "list";
        "{} slices in layer '{}' of `{}`",
        result.slices.len(), config.layer, config.input.display()
    );
    for slice in &result.slices {
        println!(
            "  {} {}x{} at ({}, {})",
            slice.id.bold(),
            slice.width,
            slice.height,
            slice.x,
            slice.y
        );
        for file in &slice.files {
            let marker = if file.exists {
                "exists".yellow().to_string()
            } else {
                "new".green().to_string()
            };
            println!("    {} {}", marker, file.file);
        }
    }
    Ok(())
}

fn list_slices(slices: &[SliceRect], sizes: &SizeMode, directory: &Path) -> ListResult {
    let slices = slices
        .iter()
        .map(|slice| {
            let files = sizes
                .render_plan(slice)
                .into_iter()
                .map(|(name, width, height)| {
                    let dest = directory.join(&name);
                    FileListing {
                        file: dest.display().to_string(),
                        width,
                        height,
                        exists: dest.exists(),
                    }
                })
                .collect();
            SliceListing {
                id: slice.id.clone(),
                x: slice.x,
                y: slice.y,
                width: slice.width,
                height: slice.height,
                files,
            }
        })
        .collect();
    ListResult { slices }
}
