//! Header snapshot and translation unit counts.

use crate::context::{DocumentContext, Element, Transition};
use crate::engine::{self, TransformPolicy};
use crate::error::{Error, Result, Stage};
use crate::xml::OpenTag;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Statistics for one TMX file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStats {
    /// Attributes of the `header` element, in declaration order
    pub header: IndexMap<String, String>,
    /// Counts gathered inside `body`
    pub body: BodyStats,
    /// File size in bytes
    pub size: u64,
}

/// Counts gathered inside `body`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyStats {
    /// Translation unit counts
    pub tu: TuStats,
}

/// Translation unit counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuStats {
    /// Number of `tu` elements
    pub count: u64,
    /// `tuv` occurrences per `xml:lang`, in first-seen order. A `tuv` without
    /// `xml:lang` is counted under the empty string.
    pub tuv: IndexMap<String, TuvStats>,
}

/// Occurrences of one language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuvStats {
    /// Number of `tuv` elements with this language
    pub count: u64,
}

impl FileStats {
    /// Number of translation units.
    #[must_use]
    pub const fn tu_count(&self) -> u64 {
        self.body.tu.count
    }

    /// Number of `tuv` elements for a language.
    #[must_use]
    pub fn tuv_count(&self, language: &str) -> u64 {
        self.body.tu.tuv.get(language).map_or(0, |t| t.count)
    }
}

/// Collects [`FileStats`] without producing output.
#[derive(Debug, Default)]
pub struct StatsPolicy {
    stats: FileStats,
}

impl StatsPolicy {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransformPolicy for StatsPolicy {
    type Output = FileStats;

    fn open_tag(&mut self, ctx: &DocumentContext, transition: Transition, tag: &OpenTag) -> Result<()> {
        match transition {
            Transition::Entered(Element::Header) => {
                for (name, value) in &tag.attributes {
                    self.stats.header.insert(name.clone(), value.clone());
                }
            }
            Transition::Entered(Element::Tu) => {
                self.stats.body.tu.count += 1;
            }
            Transition::Entered(Element::Tuv) => {
                self.stats
                    .body
                    .tu
                    .tuv
                    .entry(ctx.tuv_language().to_string())
                    .or_default()
                    .count += 1;
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self, _ctx: &DocumentContext) -> Result<FileStats> {
        Ok(self.stats)
    }
}

/// Streams `path` and returns its statistics, including the on-disk size.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not well-formed XML.
pub fn collect(path: &Path) -> Result<FileStats> {
    let mut stats = engine::run_file(path, StatsPolicy::new())?;
    stats.size = fs::metadata(path)
        .map_err(|e| Error::io(Stage::Read, path, e))?
        .len();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::Tokenizer;
    use assert_fs::prelude::*;

    fn stats_of(xml: &str) -> FileStats {
        engine::run(Tokenizer::new(xml.as_bytes(), "inline.tmx"), StatsPolicy::new()).unwrap()
    }

    #[test]
    fn test_counts_units_and_languages() {
        let stats = stats_of(
            r#"<tmx version="1.4">
              <header srclang="en-US" datatype="plaintext"/>
              <body>
                <tu><tuv xml:lang="en-US"><seg>a</seg></tuv><tuv xml:lang="fr-FR"><seg>b</seg></tuv></tu>
                <tu><tuv xml:lang="en-US"><seg>c</seg></tuv><tuv xml:lang="de-DE"><seg>d</seg></tuv></tu>
              </body>
            </tmx>"#,
        );

        assert_eq!(stats.tu_count(), 2);
        assert_eq!(stats.tuv_count("en-US"), 2);
        assert_eq!(stats.tuv_count("fr-FR"), 1);
        assert_eq!(stats.tuv_count("de-DE"), 1);
        let langs: Vec<_> = stats.body.tu.tuv.keys().map(String::as_str).collect();
        assert_eq!(langs, ["en-US", "fr-FR", "de-DE"]);
    }

    #[test]
    fn test_header_attributes_are_copied_in_order() {
        let stats = stats_of(
            r#"<tmx><header creationtool="Test Tool" o-tmf="tmx" srclang="en-US"><note>n</note></header><body/></tmx>"#,
        );

        let header: Vec<_> = stats
            .header
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            header,
            [("creationtool", "Test Tool"), ("o-tmf", "tmx"), ("srclang", "en-US")]
        );
    }

    #[test]
    fn test_empty_body() {
        let stats = stats_of(r#"<tmx><header srclang="en"/><body></body></tmx>"#);
        assert_eq!(stats.tu_count(), 0);
        assert!(stats.body.tu.tuv.is_empty());
    }

    #[test]
    fn test_tuv_without_language_counts_under_empty_key() {
        let stats = stats_of("<tmx><body><tu><tuv><seg>x</seg></tuv></tu></body></tmx>");
        assert_eq!(stats.tuv_count(""), 1);
    }

    #[test]
    fn test_units_outside_body_are_ignored() {
        let stats = stats_of("<tmx><header><tu/></header><body><tu/></body></tmx>");
        assert_eq!(stats.tu_count(), 1);
    }

    #[test]
    fn test_collect_reports_file_size() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("empty-body.tmx");
        let xml = r#"<?xml version="1.0"?><tmx><header srclang="en"/><body/></tmx>"#;
        file.write_str(xml).unwrap();

        let stats = collect(file.path()).unwrap();
        assert_eq!(stats.size, xml.len() as u64);
        assert_eq!(stats.tu_count(), 0);
    }

    #[test]
    fn test_serializes_to_nested_json() {
        let stats = stats_of(r#"<tmx><header a="1"/><body><tu><tuv xml:lang="en"/></tu></body></tmx>"#);
        let json = serde_json::to_value(&stats).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "header": {"a": "1"},
                "body": {"tu": {"count": 1, "tuv": {"en": {"count": 1}}}},
                "size": 0
            })
        );
    }
}
