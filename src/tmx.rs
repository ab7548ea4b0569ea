//! Element and attribute names of the TMX 1.4 vocabulary.

/// Root element.
pub const TMX: &str = "tmx";
/// Document metadata element.
pub const HEADER: &str = "header";
/// Container of translation units.
pub const BODY: &str = "body";
/// Translation unit.
pub const TU: &str = "tu";
/// Translation unit variant (one language).
pub const TUV: &str = "tuv";
/// Free-text note.
pub const NOTE: &str = "note";
/// Typed property.
pub const PROP: &str = "prop";

/// Language attribute of `tuv`.
pub const XML_LANG: &str = "xml:lang";
/// Type attribute of `prop`.
pub const TYPE: &str = "type";

/// Declaration written at the top of every generated file.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
