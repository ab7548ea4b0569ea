//! Four-event view over the `quick-xml` pull reader.
//!
//! The reader reports start, empty, end, text and CDATA events along with
//! declarations, comments and processing instructions. Transform policies only
//! care about the element structure, so this adapter folds everything into
//! [`XmlEvent`]: open tag, text, close tag and end of document.

use crate::error::{Error, Result, Stage};
use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Attributes of an element in declaration order. Keys are unique.
pub type Attributes = IndexMap<String, String>;

/// An element start as seen by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTag {
    /// Qualified element name, e.g. `tuv`
    pub name: String,
    /// Attribute values, already entity-decoded
    pub attributes: Attributes,
    /// True for `<name/>`; a matching [`CloseTag`] still follows
    pub self_closing: bool,
}

impl OpenTag {
    /// Creates an open tag without attributes.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::new(),
            self_closing: false,
        }
    }

    /// Adds an attribute, replacing an earlier value with the same name.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Marks the tag as self-closing.
    #[must_use]
    pub const fn self_closed(mut self) -> Self {
        self.self_closing = true;
        self
    }

    /// Returns the value of an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// An element end as seen by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseTag {
    /// Qualified element name
    pub name: String,
    /// True when closing a `<name/>` element
    pub self_closing: bool,
}

impl CloseTag {
    /// Creates the end of a regular `<name>...</name>` element.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            self_closing: false,
        }
    }
}

/// Structural event in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    /// Element start
    Open(OpenTag),
    /// Character data (entity-decoded; CDATA is reported here too)
    Text(String),
    /// Element end
    Close(CloseTag),
    /// End of document; repeated calls keep returning it
    End,
}

/// Forward-only tokenizer producing [`XmlEvent`]s from a byte source.
pub struct Tokenizer<R> {
    reader: Reader<R>,
    path: PathBuf,
    buf: Vec<u8>,
    pending_close: Option<CloseTag>,
    open_elements: Vec<String>,
    finished: bool,
}

impl Tokenizer<BufReader<File>> {
    /// Opens a file for tokenizing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] with [`Stage::Read`] if the file cannot be opened.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(Stage::Read, path, e))?;
        Ok(Self::new(BufReader::with_capacity(READ_BUFFER_SIZE, file), path))
    }
}

impl<R: BufRead> Tokenizer<R> {
    /// Wraps a buffered byte source. `path` is only used in error reports.
    pub fn new(source: R, path: impl Into<PathBuf>) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(false);

        Self {
            reader,
            path: path.into(),
            buf: Vec::with_capacity(1024),
            pending_close: None,
            open_elements: Vec::new(),
            finished: false,
        }
    }

    /// Returns the path reported in errors.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the next structural event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Xml`] when the reader rejects the markup (mismatched
    /// end tags, broken attributes, unknown entities) or the input ends with
    /// elements still open, and [`Error::Io`] when the underlying source fails.
    pub fn next_event(&mut self) -> Result<XmlEvent> {
        if let Some(close) = self.pending_close.take() {
            return Ok(XmlEvent::Close(close));
        }
        if self.finished {
            return Ok(XmlEvent::End);
        }

        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(quick_xml::Error::Io(e)) => {
                    return Err(Error::Io {
                        stage: Stage::Read,
                        path: self.path.clone(),
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    return Err(Error::xml(&self.path, self.reader.error_position() as u64, e));
                }
            };

            match event {
                Event::Start(start) => {
                    let tag = open_tag(&start, false)
                        .map_err(|e| Error::xml(&self.path, self.reader.buffer_position() as u64, e))?;
                    self.open_elements.push(tag.name.clone());
                    return Ok(XmlEvent::Open(tag));
                }
                Event::Empty(start) => {
                    let tag = open_tag(&start, true)
                        .map_err(|e| Error::xml(&self.path, self.reader.buffer_position() as u64, e))?;
                    self.pending_close = Some(CloseTag {
                        name: tag.name.clone(),
                        self_closing: true,
                    });
                    return Ok(XmlEvent::Open(tag));
                }
                Event::End(end) => {
                    self.open_elements.pop();
                    return Ok(XmlEvent::Close(CloseTag::new(
                        String::from_utf8_lossy(end.name().as_ref()).into_owned(),
                    )));
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| Error::xml(&self.path, self.reader.buffer_position() as u64, e))?;
                    return Ok(XmlEvent::Text(text.into_owned()));
                }
                Event::CData(data) => {
                    return Ok(XmlEvent::Text(String::from_utf8_lossy(&data).into_owned()));
                }
                Event::Eof => {
                    if let Some(name) = self.open_elements.last() {
                        return Err(Error::xml(
                            &self.path,
                            self.reader.buffer_position() as u64,
                            format!("unexpected end of document: unclosed <{name}>"),
                        ));
                    }
                    self.finished = true;
                    return Ok(XmlEvent::End);
                }
                // Declarations, comments, PIs and DOCTYPE are outside the event model
                _ => {}
            }
        }
    }
}

fn open_tag(start: &BytesStart<'_>, self_closing: bool) -> std::result::Result<OpenTag, quick_xml::Error> {
    let mut attributes = Attributes::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.insert(key, value);
    }

    Ok(OpenTag {
        name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        attributes,
        self_closing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(xml: &str) -> Vec<XmlEvent> {
        let mut tokenizer = Tokenizer::new(xml.as_bytes(), "inline.tmx");
        let mut out = Vec::new();
        loop {
            let event = tokenizer.next_event().unwrap();
            let done = event == XmlEvent::End;
            out.push(event);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn test_reports_elements_and_text_in_order() {
        let got = events(r#"<tu tuid="1"><seg>Hi &amp; bye</seg></tu>"#);

        assert_eq!(
            got,
            vec![
                XmlEvent::Open(OpenTag::new("tu").with_attribute("tuid", "1")),
                XmlEvent::Open(OpenTag::new("seg")),
                XmlEvent::Text("Hi & bye".to_string()),
                XmlEvent::Close(CloseTag::new("seg")),
                XmlEvent::Close(CloseTag::new("tu")),
                XmlEvent::End,
            ]
        );
    }

    #[test]
    fn test_self_closing_element_yields_open_and_close() {
        let got = events(r#"<body><prop type="x"/></body>"#);

        assert_eq!(
            got[1],
            XmlEvent::Open(OpenTag::new("prop").with_attribute("type", "x").self_closed())
        );
        assert_eq!(
            got[2],
            XmlEvent::Close(CloseTag {
                name: "prop".to_string(),
                self_closing: true,
            })
        );
    }

    #[test]
    fn test_skips_declaration_and_comments() {
        let got = events("<?xml version=\"1.0\"?><!-- c --><tmx/>");

        assert_eq!(got.len(), 3);
        assert!(matches!(&got[0], XmlEvent::Open(tag) if tag.name == "tmx"));
    }

    #[test]
    fn test_attributes_keep_declaration_order() {
        let got = events(r#"<header srclang="en" adminlang="fr" datatype="xml"/>"#);

        let XmlEvent::Open(tag) = &got[0] else {
            panic!("expected open tag");
        };
        let keys: Vec<_> = tag.attributes.keys().map(String::as_str).collect();
        assert_eq!(keys, ["srclang", "adminlang", "datatype"]);
    }

    #[test]
    fn test_cdata_is_reported_as_text() {
        let got = events("<seg><![CDATA[a < b]]></seg>");
        assert_eq!(got[1], XmlEvent::Text("a < b".to_string()));
    }

    #[test]
    fn test_mismatched_end_tag_is_xml_error() {
        let mut tokenizer = Tokenizer::new("<tu><tuv></tu>".as_bytes(), "broken.tmx");
        let result = (0..5).try_for_each(|_| tokenizer.next_event().map(|_| ()));

        let err = result.unwrap_err();
        assert!(matches!(err, Error::Xml { .. }));
        assert_eq!(err.path(), Some(Path::new("broken.tmx")));
    }

    #[test]
    fn test_truncated_document_is_xml_error() {
        let xml = r#"<tmx><header srclang="en"/><body><tu><tuv xml:lang="en"><seg>x"#;
        let mut tokenizer = Tokenizer::new(xml.as_bytes(), "truncated.tmx");

        let err = loop {
            match tokenizer.next_event() {
                Ok(XmlEvent::End) => panic!("truncated input reached the end"),
                Ok(_) => {}
                Err(e) => break e,
            }
        };
        assert!(matches!(err, Error::Xml { .. }));
        assert!(err.to_string().contains("unclosed <seg>"));
    }

    #[test]
    fn test_self_closing_root_ends_cleanly() {
        let got = events("<tmx/>");
        assert_eq!(got.last(), Some(&XmlEvent::End));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Tokenizer::from_path(Path::new("/nonexistent/file.tmx"))
            .err()
            .unwrap();
        assert_eq!(err.stage(), Some(Stage::Read));
    }
}
