//! Inkslice - batch PNG export of SVG slice rectangles.

#![allow(dead_code)]

mod cli;
mod config;
mod export;
mod logger;
mod raster;
mod svg;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::ExportConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = ExportConfig::load(&cli)?;

    match &cli.command {
        Commands::Export { .. } => cli::export::run_export(&config),
        Commands::List { args } => cli::list::run_list(&config, args.json),
    }
}
