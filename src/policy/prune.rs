//! Removal of `note` and `prop` elements.

use super::{TransformCounts, Transformed};
use crate::context::{DocumentContext, Element, Transition};
use crate::engine::TransformPolicy;
use crate::error::Result;
use crate::sink::OutputSink;
use crate::tmx;
use crate::xml::serializer::{write_close_tag, write_open_tag, write_text};
use crate::xml::{CloseTag, OpenTag};
use std::collections::HashSet;

/// What to keep when removing info elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneOptions {
    /// Keep `note` elements
    pub keep_notes: bool,
    /// `prop` elements whose `type` is listed here are kept
    pub keep_prop_types: Vec<String>,
}

impl PruneOptions {
    /// Removes every `note` and `prop`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether `note` elements are kept.
    #[must_use]
    pub const fn keep_notes(mut self, keep: bool) -> Self {
        self.keep_notes = keep;
        self
    }

    /// Sets the `prop` types to keep.
    #[must_use]
    pub fn keep_prop_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keep_prop_types = types.into_iter().map(Into::into).collect();
        self
    }
}

/// Copies a document, dropping `note`/`prop` subtrees.
///
/// A dropped element opens an exclusion span that lasts until the close tag
/// with the same name; everything in between is suppressed, including the
/// closing tag. Only one span is active at a time since TMX never nests these
/// elements inside themselves.
pub struct PrunePolicy<S> {
    keep_notes: bool,
    keep_prop_types: HashSet<String>,
    sink: S,
    excluded: Option<String>,
    buf: String,
    counts: TransformCounts,
}

impl<S: OutputSink> PrunePolicy<S> {
    /// Creates a policy writing to `sink`.
    pub fn new(options: &PruneOptions, sink: S) -> Self {
        Self {
            keep_notes: options.keep_notes,
            keep_prop_types: options.keep_prop_types.iter().cloned().collect(),
            sink,
            excluded: None,
            buf: String::with_capacity(256),
            counts: TransformCounts::default(),
        }
    }

    fn excludes(&self, tag: &OpenTag) -> bool {
        match tag.name.as_str() {
            tmx::NOTE => !self.keep_notes,
            tmx::PROP => !tag
                .attribute(tmx::TYPE)
                .is_some_and(|kind| self.keep_prop_types.contains(kind)),
            _ => false,
        }
    }
}

impl<S: OutputSink> TransformPolicy for PrunePolicy<S> {
    type Output = Transformed<S>;

    fn start(&mut self) -> Result<()> {
        self.sink.write_str(tmx::XML_DECLARATION)
    }

    fn open_tag(&mut self, _ctx: &DocumentContext, transition: Transition, tag: &OpenTag) -> Result<()> {
        if transition == Transition::Entered(Element::Tu) {
            self.counts.units += 1;
        }
        if self.excluded.is_some() {
            return Ok(());
        }
        if self.excludes(tag) {
            self.excluded = Some(tag.name.clone());
            return Ok(());
        }

        self.buf.clear();
        write_open_tag(&mut self.buf, tag);
        self.sink.write_str(&self.buf)
    }

    fn text(&mut self, _ctx: &DocumentContext, text: &str) -> Result<()> {
        if self.excluded.is_some() {
            return Ok(());
        }
        self.buf.clear();
        write_text(&mut self.buf, text);
        self.sink.write_str(&self.buf)
    }

    fn close_tag(&mut self, _ctx: &DocumentContext, _transition: Transition, tag: &CloseTag) -> Result<()> {
        if let Some(name) = &self.excluded {
            if *name == tag.name {
                self.excluded = None;
                self.counts.elements_removed += 1;
            }
            return Ok(());
        }

        self.buf.clear();
        write_close_tag(&mut self.buf, tag);
        self.sink.write_str(&self.buf)
    }

    fn finish(self, _ctx: &DocumentContext) -> Result<Transformed<S>> {
        Ok(Transformed {
            sink: self.sink,
            counts: self.counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine;
    use crate::xml::Tokenizer;

    const SAMPLE: &str = r#"<tmx version="1.4"><header srclang="en-US"><note>header note</note><prop type="x-header">hp</prop></header><body><tu><note>tu note</note><prop type="x-tu-prop-a">tu propa</prop><tuv xml:lang="en-US"><prop type="x-tuv-prop-b">tuv prop1</prop><note>tuv note</note><seg>Hello &amp; welcome</seg></tuv></tu></body></tmx>"#;

    fn prune(options: &PruneOptions, xml: &str) -> (String, TransformCounts) {
        let out = engine::run(
            Tokenizer::new(xml.as_bytes(), "inline.tmx"),
            PrunePolicy::new(options, String::new()),
        )
        .unwrap();
        (out.sink, out.counts)
    }

    #[test]
    fn test_removes_notes_and_props_by_default() {
        let (out, counts) = prune(&PruneOptions::new(), SAMPLE);

        assert!(!out.contains("<note>"));
        assert!(!out.contains("<prop"));
        assert!(!out.contains("tu note"));
        assert!(out.contains("<seg>Hello &amp; welcome</seg>"));
        assert_eq!(counts.elements_removed, 6);
        assert_eq!(counts.units, 1);
    }

    #[test]
    fn test_keeps_listed_prop_types() {
        let options = PruneOptions::new().keep_prop_types(["x-tuv-prop-b"]);
        let (out, _) = prune(&options, SAMPLE);

        assert!(out.contains(r#"<prop type="x-tuv-prop-b">tuv prop1</prop>"#));
        assert!(!out.contains(r#"<prop type="x-tu-prop-a">tu propa</prop>"#));
        assert!(!out.contains("<note>tuv note</note>"));
    }

    #[test]
    fn test_keeps_notes_when_requested() {
        let options = PruneOptions::new().keep_notes(true);
        let (out, _) = prune(&options, SAMPLE);

        assert!(out.contains("<note>header note</note>"));
        assert!(out.contains("<note>tu note</note>"));
        assert!(out.contains("<note>tuv note</note>"));
        assert!(!out.contains("<prop"));
    }

    #[test]
    fn test_output_starts_with_declaration() {
        let (out, _) = prune(&PruneOptions::new(), "<tmx/>");
        assert_eq!(out, format!("{}<tmx/>", tmx::XML_DECLARATION));
    }

    #[test]
    fn test_nested_children_of_removed_element_are_suppressed() {
        let xml = r#"<tu><note>a<b>bold</b>c</note><seg>x</seg></tu>"#;
        let (out, _) = prune(&PruneOptions::new(), xml);
        assert!(out.ends_with("<tu><seg>x</seg></tu>"));
    }

    #[test]
    fn test_self_closing_prop_is_removed() {
        let (out, counts) = prune(&PruneOptions::new(), r#"<tu><prop type="a"/><seg/></tu>"#);
        assert!(out.ends_with("<tu><seg/></tu>"));
        assert_eq!(counts.elements_removed, 1);
    }
}
