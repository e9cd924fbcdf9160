use owo_colors::OwoColorize;

/// What happened to a single output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The file did not exist before and was rendered.
    Created,
    /// The file existed and was rendered again.
    Overwritten,
    /// The file existed and overwriting is off; nothing was rendered.
    Skipped,
    /// The rasterizer failed; the file may be missing or stale.
    Failed,
}

impl ExportOutcome {
    /// Fill color painted back onto the slice rect for this outcome.
    pub const fn status_color(self) -> &'static str {
        match self {
            Self::Created => "#00ff00",
            Self::Overwritten => "#ff0000",
            Self::Skipped => "#555555",
            Self::Failed => "#ff6600",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Overwritten => "overwritten",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }

    /// Label colored for terminal summaries.
    pub fn colored_label(self) -> String {
        match self {
            Self::Created => self.label().green().to_string(),
            Self::Overwritten => self.label().red().to_string(),
            Self::Skipped => self.label().dimmed().to_string(),
            Self::Failed => self.label().bright_red().bold().to_string(),
        }
    }
}

impl std::fmt::Display for ExportOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_colors() {
        assert_eq!(ExportOutcome::Created.status_color(), "#00ff00");
        assert_eq!(ExportOutcome::Overwritten.status_color(), "#ff0000");
        assert_eq!(ExportOutcome::Skipped.status_color(), "#555555");
        assert_eq!(ExportOutcome::Failed.status_color(), "#ff6600");
    }

    #[test]
    fn test_status_colors_are_distinct() {
        let colors = [
            ExportOutcome::Created.status_color(),
            ExportOutcome::Overwritten.status_color(),
            ExportOutcome::Skipped.status_color(),
            ExportOutcome::Failed.status_color(),
        ];
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(ExportOutcome::Created.to_string(), "created");
        assert_eq!(ExportOutcome::Overwritten.to_string(), "overwritten");
        assert_eq!(ExportOutcome::Skipped.to_string(), "skipped");
        assert_eq!(ExportOutcome::Failed.to_string(), "failed");
    }
}
