//! Command-line interface module.

mod args;
pub mod export;
pub mod list;

pub use args::{Cli, Commands, ExportArgs, ListArgs};

use crate::config::DEFAULT_LAYER;
use crate::export::ExportError;
use crate::log;
use crate::svg::{SliceDoc, SliceRect};
use anyhow::Result;

/// Scan the document's slice layer, turning the two empty cases into
/// typed errors shared by the export and list commands.
pub(crate) fn require_slices(doc: &SliceDoc, layer: &str) -> Result<Vec<SliceRect>> {
    match doc.scan(layer)? {
        Some(rects) if !rects.is_empty() => Ok(rects),
        Some(_) => Err(ExportError::NoSlices {
            layer: layer.to_string(),
            document: doc.path().to_path_buf(),
        }
        .into()),
        None => {
            log!("hint"; "slices are rectangles in a layer picked with --layer (default \"{}\")", DEFAULT_LAYER);
            Err(ExportError::LayerNotFound {
                layer: layer.to_string(),
                document: doc.path().to_path_buf(),
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_slices_missing_layer() {
        let doc = SliceDoc::from_bytes(b"<svg xmlns:inkscape=\"i\"></svg>".to_vec());
        let err = require_slices(&doc, "slices").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExportError>(),
            Some(ExportError::LayerNotFound { .. })
        ));
    }

    #[test]
    fn test_require_slices_empty_layer() {
        let doc = SliceDoc::from_bytes(
            b"<svg xmlns:inkscape=\"i\"><g inkscape:label=\"slices\"></g></svg>".to_vec(),
        );
        let err = require_slices(&doc, "slices").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExportError>(),
            Some(ExportError::NoSlices { .. })
        ));
    }

    #[test]
    fn test_require_slices_found() {
        let doc = SliceDoc::from_bytes(
            br#"<svg xmlns:inkscape="i"><g inkscape:label="slices"><rect id="a" width="1" height="1"/></g></svg>"#
                .to_vec(),
        );
        let rects = require_slices(&doc, "slices").unwrap();
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0].id, "a");
    }
}
