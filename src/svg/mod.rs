//! SVG document scanning and patching.
//!
//! A slice document is an SVG whose export targets live as `<rect>` children
//! of a dedicated layer: a `<g inkscape:label="...">` directly under the root
//! element. The document is kept as raw bytes and rewritten through a
//! streaming reader/writer pair, so markup that is not touched survives byte
//! for byte.

pub mod style;

use crate::svg::style::Style;
use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Properties applied to every slice rect before rasterization so the
/// rectangles themselves do not show up in the exported images.
const CONCEAL_PROPS: &[(&str, &str)] = &[("stroke", "none"), ("opacity", "0")];

/// Opacity used when painting outcome colors back onto the rects.
const TINT_OPACITY: &str = "0.25";

/// One export target: a `<rect>` that is a direct child of the slice layer.
#[derive(Debug, Clone)]
pub struct SliceRect {
    /// Value of the rect's `id` attribute; doubles as the output file stem.
    pub id: String,
    /// Position in user units (`x`/`y` attributes, 0 when absent).
    pub x: f64,
    pub y: f64,
    /// Dimensions in user units.
    pub width: f64,
    pub height: f64,
    /// Parsed `style` attribute.
    pub style: Style,
}

impl SliceRect {
    /// Width rounded to output pixels.
    pub fn pixel_width(&self) -> u32 {
        self.width.round() as u32
    }

    /// Height rounded to output pixels.
    pub fn pixel_height(&self) -> u32 {
        self.height.round() as u32
    }
}

/// An SVG document held in memory as raw XML bytes.
#[derive(Debug, Clone)]
pub struct SliceDoc {
    path: PathBuf,
    xml: Vec<u8>,
}

impl SliceDoc {
    /// Read a document from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let xml = fs::read(path).with_context(|| format!("Failed to read `{}`", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            xml,
        })
    }

    /// Wrap an in-memory document.
    pub fn from_bytes(xml: Vec<u8>) -> Self {
        Self {
            path: PathBuf::new(),
            xml,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.xml
    }

    /// Write the current document state to `path`.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, &self.xml).with_context(|| format!("Failed to write `{}`", path.display()))
    }

    /// Collect the slice rects of the layer labelled `layer`.
    ///
    /// Returns `None` when no such layer exists; a present but empty layer
    /// yields `Some` with an empty list. Only direct `<rect>` children count
    /// as slices, and rects without an `id` cannot be exported so they are
    /// not collected. When several layers share the label the first one wins.
    pub fn scan(&self, layer: &str) -> Result<Option<Vec<SliceRect>>> {
        let mut reader = Reader::from_reader(self.xml.as_slice());
        let mut rects = Vec::new();
        let mut found = false;
        let mut depth = 0usize;
        let mut layer_depth = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(elem)) => {
                    depth += 1;
                    if let Some(opened) = layer_depth {
                        if depth == opened + 1
                            && is_rect(&elem)
                            && let Some(rect) = read_rect(&elem)?
                        {
                            rects.push(rect);
                        }
                    } else if depth == 2 && matches_layer(&elem, layer)? {
                        found = true;
                        layer_depth = Some(depth);
                    }
                }
                Ok(Event::Empty(elem)) => {
                    if layer_depth == Some(depth) && is_rect(&elem) {
                        if let Some(rect) = read_rect(&elem)? {
                            rects.push(rect);
                        }
                    } else if layer_depth.is_none() && depth == 1 && matches_layer(&elem, layer)? {
                        // An empty layer serializes self-closed; nothing inside.
                        found = true;
                        break;
                    }
                }
                Ok(Event::End(_)) => {
                    if layer_depth == Some(depth) {
                        // Leaving the layer; later layers with the same label
                        // are ignored.
                        break;
                    }
                    depth = depth.saturating_sub(1);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => anyhow::bail!(
                    "XML parse error at position {} in `{}`: {:?}",
                    reader.error_position(),
                    self.path.display(),
                    e
                ),
            }
        }

        Ok(found.then_some(rects))
    }

    /// Make every slice rect of `layer` invisible (no stroke, zero opacity).
    /// Returns the number of rects rewritten.
    pub fn conceal_slices(&mut self, layer: &str) -> Result<usize> {
        self.patch_slices(layer, |_| {
            Some(
                CONCEAL_PROPS
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            )
        })
    }

    /// Paint a translucent fill color onto the rects named in `colors`.
    /// Rects without an entry keep their current style.
    pub fn tint_slices(&mut self, layer: &str, colors: &HashMap<String, String>) -> Result<usize> {
        self.patch_slices(layer, |id| {
            colors.get(id).map(|color| {
                vec![
                    ("fill".to_string(), color.clone()),
                    ("opacity".to_string(), TINT_OPACITY.to_string()),
                ]
            })
        })
    }

    /// Rewrite the style of each slice rect for which `patch` returns
    /// properties; everything else passes through untouched. Returns the
    /// number of rects rewritten.
    fn patch_slices<F>(&mut self, layer: &str, patch: F) -> Result<usize>
    where
        F: FnMut(&str) -> Option<Vec<(String, String)>>,
    {
        let (xml, patched) = patch_document(&self.xml, layer, patch)
            .with_context(|| format!("Failed to patch `{}`", self.path.display()))?;
        self.xml = xml;
        Ok(patched)
    }
}

/// Streaming rewrite of the document: rects of the matching layer get their
/// style patched, all other events are written back as they were read.
fn patch_document<F>(xml: &[u8], layer: &str, mut patch: F) -> Result<(Vec<u8>, usize)>
where
    F: FnMut(&str) -> Option<Vec<(String, String)>>,
{
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Cursor::new(Vec::with_capacity(xml.len())));
    let mut patched = 0usize;
    let mut depth = 0usize;
    let mut layer_depth = None;
    let mut done = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(elem)) => {
                depth += 1;
                let rewritten = if !done && layer_depth.is_some_and(|d| depth == d + 1) {
                    rewrite_rect(&elem, &mut patch)?
                } else {
                    if !done && layer_depth.is_none() && depth == 2 && matches_layer(&elem, layer)?
                    {
                        layer_depth = Some(depth);
                    }
                    None
                };
                match rewritten {
                    Some(start) => {
                        patched += 1;
                        writer.write_event(Event::Start(start))?;
                    }
                    None => writer.write_event(Event::Start(elem))?,
                }
            }
            Ok(Event::Empty(elem)) => {
                let rewritten = if !done && layer_depth == Some(depth) {
                    rewrite_rect(&elem, &mut patch)?
                } else {
                    None
                };
                match rewritten {
                    Some(start) => {
                        patched += 1;
                        writer.write_event(Event::Empty(start))?;
                    }
                    None => writer.write_event(Event::Empty(elem))?,
                }
            }
            Ok(Event::End(elem)) => {
                if layer_depth == Some(depth) {
                    layer_depth = None;
                    done = true;
                }
                depth = depth.saturating_sub(1);
                writer.write_event(Event::End(elem))?;
            }
            Ok(Event::Eof) => break,
            Ok(event) => writer.write_event(event)?,
            Err(e) => anyhow::bail!(
                "XML parse error at position {}: {:?}",
                reader.error_position(),
                e
            ),
        }
    }

    Ok((writer.into_inner().into_inner(), patched))
}

/// Rebuild a rect's start tag with a patched style attribute.
///
/// Returns `None` when the element is not a rect, has no usable id, or the
/// patch declines it; the caller then writes the original event.
fn rewrite_rect<F>(elem: &BytesStart, patch: &mut F) -> Result<Option<BytesStart<'static>>>
where
    F: FnMut(&str) -> Option<Vec<(String, String)>>,
{
    if !is_rect(elem) {
        return Ok(None);
    }
    let Some(id) = attr_string(elem, b"id")? else {
        return Ok(None);
    };
    if id.is_empty() {
        // Mirrors the scan: an empty id names no output file.
        return Ok(None);
    }
    let Some(props) = patch(&id) else {
        return Ok(None);
    };

    let mut style = match attr_string(elem, b"style")? {
        Some(raw) => Style::parse(&raw),
        None => Style::default(),
    };
    for (key, value) in &props {
        style.set(key, value);
    }
    let style = style.to_string();

    let name = String::from_utf8_lossy(elem.name().as_ref()).into_owned();
    let mut rewritten = BytesStart::new(name);
    let mut wrote_style = false;
    for attr in elem.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"style" {
            // Str pair: the rebuilt value is escaped on the way out.
            rewritten.push_attribute(("style", style.as_str()));
            wrote_style = true;
        } else {
            // Raw bytes on both sides: values keep their original escaping.
            rewritten.push_attribute((attr.key.as_ref(), attr.value.as_ref()));
        }
    }
    if !wrote_style {
        rewritten.push_attribute(("style", style.as_str()));
    }

    Ok(Some(rewritten))
}

/// Check for a `<g>` element carrying `inkscape:label="{layer}"`.
fn matches_layer(elem: &BytesStart, layer: &str) -> Result<bool> {
    if elem.name().local_name().as_ref() != b"g" {
        return Ok(false);
    }
    for attr in elem.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"inkscape:label" {
            return Ok(attr.unescape_value()? == layer);
        }
    }
    Ok(false)
}

fn is_rect(elem: &BytesStart) -> bool {
    elem.name().local_name().as_ref() == b"rect"
}

fn attr_string(elem: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in elem.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn read_rect(elem: &BytesStart) -> Result<Option<SliceRect>> {
    let mut id = None;
    let mut x = 0.0;
    let mut y = 0.0;
    let mut width = 0.0;
    let mut height = 0.0;
    let mut style = Style::default();

    for attr in elem.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?;
        match attr.key.as_ref() {
            b"id" => {
                if !value.is_empty() {
                    id = Some(value.into_owned());
                }
            }
            b"x" => x = parse_length(&value),
            b"y" => y = parse_length(&value),
            b"width" => width = parse_length(&value),
            b"height" => height = parse_length(&value),
            b"style" => style = Style::parse(&value),
            _ => {}
        }
    }

    Ok(id.map(|id| SliceRect {
        id,
        x,
        y,
        width,
        height,
        style,
    }))
}

/// Parse an SVG length attribute, tolerating a trailing unit suffix
/// ("50", "50.5px", "12 mm"). Unparseable values become 0.
fn parse_length(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let digits = trimmed.trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '%');
    digits.trim().parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape" width="200" height="100">
  <g inkscape:groupmode="layer" inkscape:label="artwork">
    <rect id="backdrop" width="200" height="100" style="fill:#ffffff"/>
  </g>
  <g inkscape:groupmode="layer" inkscape:label="slices">
    <rect id="icon_home" x="10" y="20" width="48" height="48" style="fill:#555555;stroke:none"/>
    <rect id="icon_save" x="70" y="20.5" width="24.4" height="24.6"/>
    <g inkscape:label="nested">
      <rect id="not_a_slice" width="10" height="10"/>
    </g>
    <rect width="5" height="5"/>
  </g>
</svg>
"#;

    fn doc() -> SliceDoc {
        SliceDoc::from_bytes(DOC.as_bytes().to_vec())
    }

    #[test]
    fn test_scan_collects_direct_rects() {
        let rects = doc().scan("slices").unwrap().unwrap();
        let ids: Vec<&str> = rects.iter().map(|r| r.id.as_str()).collect();
        // Nested and anonymous rects are not slices.
        assert_eq!(ids, ["icon_home", "icon_save"]);

        assert_eq!(rects[0].x, 10.0);
        assert_eq!(rects[0].y, 20.0);
        assert_eq!(rects[0].pixel_width(), 48);
        assert_eq!(rects[0].style.get("fill"), Some("#555555"));

        assert_eq!(rects[1].width, 24.4);
        assert_eq!(rects[1].pixel_width(), 24);
        assert_eq!(rects[1].pixel_height(), 25);
        assert!(rects[1].style.is_empty());
    }

    #[test]
    fn test_scan_missing_layer() {
        assert!(doc().scan("icons").unwrap().is_none());
    }

    #[test]
    fn test_scan_empty_layer() {
        let expanded = SliceDoc::from_bytes(
            br#"<svg xmlns:inkscape="i"><g inkscape:label="slices"></g></svg>"#.to_vec(),
        );
        let rects = expanded.scan("slices").unwrap();
        assert!(rects.is_some_and(|r| r.is_empty()));

        let self_closed = SliceDoc::from_bytes(
            br#"<svg xmlns:inkscape="i"><g inkscape:label="slices"/></svg>"#.to_vec(),
        );
        let rects = self_closed.scan("slices").unwrap();
        assert!(rects.is_some_and(|r| r.is_empty()));
    }

    #[test]
    fn test_scan_first_layer_wins() {
        let doc = SliceDoc::from_bytes(
            br#"<svg xmlns:inkscape="i">
  <g inkscape:label="slices"><rect id="first" width="1" height="1"/></g>
  <g inkscape:label="slices"><rect id="second" width="2" height="2"/></g>
</svg>"#
                .to_vec(),
        );
        let rects = doc.scan("slices").unwrap().unwrap();
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0].id, "first");
    }

    #[test]
    fn test_scan_ignores_rects_outside_layer() {
        let doc = SliceDoc::from_bytes(
            br#"<svg xmlns:inkscape="i"><rect id="loose" width="9" height="9"/><g inkscape:label="slices"><rect id="a" width="1" height="1"/></g></svg>"#
                .to_vec(),
        );
        let rects = doc.scan("slices").unwrap().unwrap();
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0].id, "a");
    }

    #[test]
    fn test_conceal_rewrites_every_slice() {
        let mut doc = doc();
        let patched = doc.conceal_slices("slices").unwrap();
        assert_eq!(patched, 2);

        let rects = doc.scan("slices").unwrap().unwrap();
        for rect in &rects {
            assert_eq!(rect.style.get("stroke"), Some("none"), "{}", rect.id);
            assert_eq!(rect.style.get("opacity"), Some("0"), "{}", rect.id);
        }
        // Existing properties survive the patch.
        assert_eq!(rects[0].style.get("fill"), Some("#555555"));
    }

    #[test]
    fn test_conceal_leaves_other_layers_untouched() {
        let mut doc = doc();
        doc.conceal_slices("slices").unwrap();
        let xml = String::from_utf8(doc.as_bytes().to_vec()).unwrap();
        assert!(xml.contains(r#"<rect id="backdrop" width="200" height="100" style="fill:#ffffff"/>"#));
        assert!(xml.contains(r#"<rect id="not_a_slice" width="10" height="10"/>"#));
    }

    #[test]
    fn test_conceal_missing_layer_changes_nothing() {
        let mut doc = doc();
        let patched = doc.conceal_slices("icons").unwrap();
        assert_eq!(patched, 0);
        assert_eq!(doc.as_bytes(), DOC.as_bytes());
    }

    #[test]
    fn test_conceal_is_idempotent() {
        let mut doc = doc();
        doc.conceal_slices("slices").unwrap();
        let once = doc.as_bytes().to_vec();
        doc.conceal_slices("slices").unwrap();
        assert_eq!(doc.as_bytes(), once.as_slice());
    }

    #[test]
    fn test_tint_only_named_rects() {
        let mut doc = doc();
        let colors = HashMap::from([("icon_home".to_string(), "#00ff00".to_string())]);
        let patched = doc.tint_slices("slices", &colors).unwrap();
        assert_eq!(patched, 1);

        let rects = doc.scan("slices").unwrap().unwrap();
        assert_eq!(rects[0].style.get("fill"), Some("#00ff00"));
        assert_eq!(rects[0].style.get("opacity"), Some("0.25"));
        // icon_save had no entry and keeps its (empty) style.
        assert!(rects[1].style.is_empty());
    }

    #[test]
    fn test_patch_adds_missing_style_attribute() {
        let mut doc = doc();
        doc.conceal_slices("slices").unwrap();
        let rects = doc.scan("slices").unwrap().unwrap();
        // icon_save started without a style attribute.
        assert_eq!(rects[1].style.get("opacity"), Some("0"));
        assert_eq!(rects[1].style.get("stroke"), Some("none"));
    }

    #[test]
    fn test_patch_preserves_attribute_order() {
        let mut doc = doc();
        doc.conceal_slices("slices").unwrap();
        let xml = String::from_utf8(doc.as_bytes().to_vec()).unwrap();
        assert!(xml.contains(r#"<rect id="icon_home" x="10" y="20" width="48" height="48" style="#));
    }

    #[test]
    fn test_patch_second_layer_untouched() {
        let mut doc = SliceDoc::from_bytes(
            br#"<svg xmlns:inkscape="i">
  <g inkscape:label="slices"><rect id="first" width="1" height="1"/></g>
  <g inkscape:label="slices"><rect id="second" width="2" height="2"/></g>
</svg>"#
                .to_vec(),
        );
        doc.conceal_slices("slices").unwrap();
        let xml = String::from_utf8(doc.as_bytes().to_vec()).unwrap();
        assert!(xml.contains(r#"<rect id="second" width="2" height="2"/>"#));
        assert!(xml.contains(r#"style="stroke:none;opacity:0""#));
    }

    #[test]
    fn test_empty_id_rect_is_never_patched() {
        let mut doc = SliceDoc::from_bytes(
            br#"<svg xmlns:inkscape="i"><g inkscape:label="slices"><rect id="" width="3" height="3" style="fill:#123456"/><rect id="a" width="1" height="1"/></g></svg>"#
                .to_vec(),
        );
        let scanned = doc.scan("slices").unwrap().unwrap().len();
        assert_eq!(scanned, 1);

        // The clear pass touches exactly the rects the scan collects.
        let concealed = doc.conceal_slices("slices").unwrap();
        assert_eq!(concealed, scanned);

        let colors = HashMap::from([("a".to_string(), "#00ff00".to_string())]);
        assert_eq!(doc.tint_slices("slices", &colors).unwrap(), 1);

        let xml = String::from_utf8(doc.as_bytes().to_vec()).unwrap();
        assert!(xml.contains(r#"<rect id="" width="3" height="3" style="fill:#123456"/>"#));
    }

    #[test]
    fn test_escaped_label_and_id() {
        let mut doc = SliceDoc::from_bytes(
            br#"<svg xmlns:inkscape="i"><g inkscape:label="Icons &amp; Buttons"><rect id="save &amp; load" width="4" height="4"/></g></svg>"#
                .to_vec(),
        );
        let rects = doc.scan("Icons & Buttons").unwrap().unwrap();
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0].id, "save & load");

        let colors = HashMap::from([("save & load".to_string(), "#ff0000".to_string())]);
        assert_eq!(doc.tint_slices("Icons & Buttons", &colors).unwrap(), 1);

        // The id attribute itself passes through with its escaping intact.
        let xml = String::from_utf8(doc.as_bytes().to_vec()).unwrap();
        assert!(xml.contains(r#"id="save &amp; load""#));
        let rects = doc.scan("Icons & Buttons").unwrap().unwrap();
        assert_eq!(rects[0].style.get("fill"), Some("#ff0000"));
    }

    #[test]
    fn test_style_with_entity_survives_rewrite() {
        let mut doc = SliceDoc::from_bytes(
            br#"<svg xmlns:inkscape="i"><g inkscape:label="slices"><rect id="a" width="4" height="4" style="fill:url(#p&amp;q)"/></g></svg>"#
                .to_vec(),
        );
        doc.conceal_slices("slices").unwrap();

        // The rebuilt style keeps the document well-formed.
        let xml = String::from_utf8(doc.as_bytes().to_vec()).unwrap();
        assert!(xml.contains(r#"style="fill:url(#p&amp;q);stroke:none;opacity:0""#));

        let rects = doc.scan("slices").unwrap().unwrap();
        assert_eq!(rects[0].style.get("fill"), Some("url(#p&q)"));
        assert_eq!(rects[0].style.get("opacity"), Some("0"));
    }

    #[test]
    fn test_malformed_document_errors() {
        let doc = SliceDoc::from_bytes(b"<svg><g></svg>".to_vec());
        assert!(doc.scan("slices").is_err());
    }

    #[test]
    fn test_parse_length() {
        assert_eq!(parse_length("50"), 50.0);
        assert_eq!(parse_length("50.5px"), 50.5);
        assert_eq!(parse_length(" 12.5 mm "), 12.5);
        assert_eq!(parse_length("50%"), 50.0);
        assert_eq!(parse_length("-3"), -3.0);
        assert_eq!(parse_length("banana"), 0.0);
        assert_eq!(parse_length(""), 0.0);
    }

    #[test]
    fn test_write_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.svg");
        doc().write_to(&path).unwrap();
        let reopened = SliceDoc::open(&path).unwrap();
        assert_eq!(reopened.as_bytes(), DOC.as_bytes());
        assert_eq!(reopened.path(), path.as_path());
    }
}
