//! Command-line interface definitions.

use crate::raster::RasterBackend;
use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Inkslice slice exporter CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: inkslice.toml)
    #[arg(short = 'C', long, global = true, default_value = "inkslice.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Export slice rects to PNG files
    #[command(visible_alias = "e")]
    Export {
        #[command(flatten)]
        args: ExportArgs,
    },

    /// List slice rects and the files they would produce
    #[command(visible_alias = "l")]
    List {
        #[command(flatten)]
        args: ListArgs,
    },
}

/// Export command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct ExportArgs {
    /// SVG document holding the slice layer
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Directory receiving the PNG files
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub directory: Option<PathBuf>,

    /// Label of the layer holding the slice rects
    #[arg(short, long)]
    pub layer: Option<String>,

    /// Export every slice at several square sizes instead of its own size
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    pub iconmode: Option<bool>,

    /// Comma-separated icon sizes in pixels (e.g. "128, 64, 32")
    #[arg(short, long)]
    pub sizes: Option<String>,

    /// Re-render files that already exist
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    pub overwrite: Option<bool>,

    /// External renderer invoked per output file
    #[arg(short, long, value_enum)]
    pub backend: Option<RasterBackend>,

    /// Report what would happen without rendering or writing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Write the recolored document to this path, leaving the input untouched
    #[arg(short, long, value_hint = clap::ValueHint::FilePath, conflicts_with = "in_place")]
    pub annotate: Option<PathBuf>,

    /// Write status colors back into the input document
    #[arg(long)]
    pub in_place: bool,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

/// List command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct ListArgs {
    /// SVG document holding the slice layer
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Label of the layer holding the slice rects
    #[arg(short, long)]
    pub layer: Option<String>,

    /// Directory the output files would land in
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub directory: Option<PathBuf>,

    /// Print machine-readable JSON instead of a table
    #[arg(short, long)]
    pub json: bool,
}

#[allow(unused)]
impl Cli {
    pub const fn is_export(&self) -> bool {
        matches!(self.command, Commands::Export { .. })
    }
    pub const fn is_list(&self) -> bool {
        matches!(self.command, Commands::List { .. })
    }
}
