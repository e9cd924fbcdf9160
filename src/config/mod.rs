//! Configuration management for `inkslice.toml`.
//!
//! # Fields
//!
//! | Field       | Purpose                                     |
//! |-------------|---------------------------------------------|
//! | `directory` | Directory receiving the PNG files           |
//! | `layer`     | Label of the layer holding the slice rects  |
//! | `iconmode`  | Export several square sizes per rect        |
//! | `sizes`     | Comma-separated sizes for icon mode         |
//! | `overwrite` | Re-render files that already exist          |
//! | `backend`   | External renderer (`inkscape` or `magick`)  |
//!
//! Every field has a default and the config file itself is optional.
//! CLI flags override whatever the file sets.

pub mod error;

pub use error::{ConfigDiagnostics, ConfigError};

use crate::{
    cli::{Cli, Commands, ExportArgs, ListArgs},
    export::SizeMode,
    log,
    raster::RasterBackend,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Layer scanned for slice rects when none is configured.
pub const DEFAULT_LAYER: &str = "slices";

/// Sizes used in icon mode when none are configured.
pub const DEFAULT_SIZES: &str = "128, 64, 48, 32, 24, 16";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing inkslice.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// SVG document to export from (CLI only)
    #[serde(skip)]
    pub input: PathBuf,

    /// Write the recolored document to this path (CLI only)
    #[serde(skip)]
    pub annotate: Option<PathBuf>,

    /// Write status colors back into the input document (CLI only)
    #[serde(skip)]
    pub in_place: bool,

    /// Report what would happen without rendering anything (CLI only)
    #[serde(skip)]
    pub dry_run: bool,

    /// Directory receiving the PNG files.
    pub directory: PathBuf,

    /// Label of the layer whose rects mark the export areas.
    pub layer: String,

    /// Export every slice at several square sizes instead of its own size.
    pub iconmode: bool,

    /// Comma-separated icon sizes in pixels.
    pub sizes: String,

    /// Re-render files that already exist.
    pub overwrite: bool,

    /// External renderer invoked per output file.
    pub backend: RasterBackend,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            annotate: None,
            in_place: false,
            dry_run: false,
            directory: PathBuf::from("."),
            layer: DEFAULT_LAYER.to_string(),
            iconmode: false,
            sizes: DEFAULT_SIZES.to_string(),
            overwrite: false,
            backend: RasterBackend::default(),
        }
    }
}

impl ExportConfig {
    /// Load configuration from CLI arguments.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = if cli.config.exists() {
            Self::from_path(&cli.config)?
        } else {
            Self::default()
        };

        config.apply_command_options(cli);
        config.finalize();

        // Dry runs and listings never invoke the renderer, so a missing
        // backend binary is not an error there.
        let rasterizing = cli.is_export() && !config.dry_run;
        config.validate(rasterizing)?;

        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {field}");
        }
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Export { args } => self.apply_export_args(args),
            Commands::List { args } => self.apply_list_args(args),
        }
    }

    /// Apply export arguments from CLI.
    fn apply_export_args(&mut self, args: &ExportArgs) {
        // Set verbose mode globally
        crate::logger::set_verbose(args.verbose);

        self.input = args.input.clone();
        Self::update_option(&mut self.directory, args.directory.as_ref());
        Self::update_option(&mut self.layer, args.layer.as_ref());
        Self::update_option(&mut self.iconmode, args.iconmode.as_ref());
        Self::update_option(&mut self.sizes, args.sizes.as_ref());
        Self::update_option(&mut self.overwrite, args.overwrite.as_ref());
        Self::update_option(&mut self.backend, args.backend.as_ref());

        self.annotate = args.annotate.clone();
        self.in_place = args.in_place;
        self.dry_run = args.dry_run;
    }

    /// Apply list arguments from CLI.
    fn apply_list_args(&mut self, args: &ListArgs) {
        self.input = args.input.clone();
        Self::update_option(&mut self.directory, args.directory.as_ref());
        Self::update_option(&mut self.layer, args.layer.as_ref());
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Expand tildes in user-supplied paths.
    fn finalize(&mut self) {
        self.directory = Self::expand_tilde(&self.directory);
        if let Some(annotate) = self.annotate.take() {
            self.annotate = Some(Self::expand_tilde(&annotate));
        }
    }

    fn expand_tilde(path: &Path) -> PathBuf {
        match path.to_str() {
            Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
            None => path.to_path_buf(),
        }
    }

    // ========================================================================
    // derived settings
    // ========================================================================

    /// Parse the configured sizes, keeping only positive integers.
    pub fn sizes_list(&self) -> Vec<u32> {
        self.sizes
            .split(',')
            .filter_map(|part| part.trim().parse::<u32>().ok())
            .filter(|size| *size > 0)
            .collect()
    }

    /// Size mode for the current run.
    pub fn size_mode(&self) -> SizeMode {
        if self.iconmode {
            SizeMode::Icon(self.sizes_list())
        } else {
            SizeMode::Native
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration for the current command.
    ///
    /// Collects all validation errors and returns them at once.
    /// `rasterizing` is false for dry runs and listings, which never need
    /// the backend binary.
    pub fn validate(&self, rasterizing: bool) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        if !self.input.exists() {
            diag.error(
                "input",
                format!("`{}` does not exist", self.input.display()),
            );
        }

        if self.directory.exists() && !self.directory.is_dir() {
            diag.error_with_hint(
                "directory",
                format!("`{}` is not a directory", self.directory.display()),
                "pick a directory for the exported PNG files",
            );
        }

        if self.iconmode && self.sizes_list().is_empty() {
            diag.error_with_hint(
                "sizes",
                format!("no usable sizes in \"{}\"", self.sizes),
                "icon mode needs at least one positive integer, e.g. sizes = \"128, 64, 32\"",
            );
        }

        if rasterizing && which::which(self.backend.binary()).is_err() {
            let hint = match self.backend {
                RasterBackend::Inkscape => "install Inkscape or set backend = \"magick\"",
                RasterBackend::Magick => "install ImageMagick or set backend = \"inkscape\"",
            };
            diag.error_with_hint(
                "backend",
                format!("`{}` command not found", self.backend.binary()),
                hint,
            );
        }

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

/// Parse config content, panicking on unknown fields (to catch typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> ExportConfig {
    let (parsed, ignored) = ExportConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExportConfig::default();

        assert_eq!(config.directory, PathBuf::from("."));
        assert_eq!(config.layer, "slices");
        assert!(!config.iconmode);
        assert_eq!(config.sizes, DEFAULT_SIZES);
        assert!(!config.overwrite);
        assert_eq!(config.backend, RasterBackend::Inkscape);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_full_config() {
        let config = test_parse_config(
            "directory = \"icons\"\nlayer = \"exports\"\niconmode = true\n\
             sizes = \"64, 32\"\noverwrite = true\nbackend = \"magick\"",
        );

        assert_eq!(config.directory, PathBuf::from("icons"));
        assert_eq!(config.layer, "exports");
        assert!(config.iconmode);
        assert_eq!(config.sizes_list(), [64, 32]);
        assert!(config.overwrite);
        assert_eq!(config.backend, RasterBackend::Magick);
    }

    #[test]
    fn test_partial_override() {
        let config = test_parse_config("layer = \"icons\"");

        assert_eq!(config.layer, "icons");
        assert_eq!(config.directory, PathBuf::from("."));
        assert_eq!(config.sizes, DEFAULT_SIZES);
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "layer = \"slices\"\nsize = \"128\"";
        let (config, ignored) = ExportConfig::parse_with_ignored(content).unwrap();

        assert_eq!(config.layer, "slices");
        assert!(!ignored.is_empty());
        assert!(ignored.iter().any(|f| f.contains("size")));
    }

    #[test]
    fn test_no_unknown_fields() {
        let (_, ignored) = ExportConfig::parse_with_ignored("overwrite = true").unwrap();
        assert!(ignored.is_empty());
    }

    #[test]
    fn test_invalid_toml() {
        // Invalid TOML syntax - missing value
        let result: std::result::Result<ExportConfig, _> = toml::from_str("layer = ");
        assert!(result.is_err());
    }

    #[test]
    fn test_sizes_list_skips_junk() {
        let mut config = ExportConfig::default();
        config.sizes = "12, banana, 0, -3, 48".to_string();
        assert_eq!(config.sizes_list(), [12, 48]);
    }

    #[test]
    fn test_default_sizes_parse() {
        let config = ExportConfig::default();
        assert_eq!(config.sizes_list(), [128, 64, 48, 32, 24, 16]);
    }

    #[test]
    fn test_size_mode() {
        let mut config = ExportConfig::default();
        assert_eq!(config.size_mode(), SizeMode::Native);

        config.iconmode = true;
        config.sizes = "64".to_string();
        assert_eq!(config.size_mode(), SizeMode::Icon(vec![64]));
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = ExportArgs {
            input: PathBuf::from("doc.svg"),
            directory: Some(PathBuf::from("out")),
            layer: None,
            iconmode: Some(true),
            sizes: None,
            overwrite: Some(true),
            backend: Some(RasterBackend::Magick),
            dry_run: false,
            annotate: None,
            in_place: false,
            verbose: false,
        };

        let mut config = test_parse_config("layer = \"icons\"\ndirectory = \"from-config\"");
        config.apply_export_args(&args);

        assert_eq!(config.input, PathBuf::from("doc.svg"));
        // CLI flag wins over the file.
        assert_eq!(config.directory, PathBuf::from("out"));
        // Absent flag keeps the file's value.
        assert_eq!(config.layer, "icons");
        assert!(config.iconmode);
        assert!(config.overwrite);
        assert_eq!(config.backend, RasterBackend::Magick);
    }

    #[test]
    fn test_validate_missing_input() {
        let mut config = ExportConfig::default();
        config.input = PathBuf::from("no-such-file.svg");
        assert!(config.validate(false).is_err());
    }

    #[test]
    fn test_validate_iconmode_needs_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("doc.svg");
        fs::write(&input, "<svg/>").unwrap();

        let mut config = ExportConfig::default();
        config.input = input;
        config.iconmode = true;
        config.sizes = "zero, none".to_string();

        let err = config.validate(false).unwrap_err();
        assert!(err.to_string().contains("config validation failed"));
    }

    #[test]
    fn test_expand_tilde_passthrough() {
        assert_eq!(
            ExportConfig::expand_tilde(Path::new("plain/dir")),
            PathBuf::from("plain/dir")
        );
    }
}
