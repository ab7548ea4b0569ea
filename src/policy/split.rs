//! Splitting a document into files of at most N translation units.

use crate::context::{DocumentContext, Element, Transition};
use crate::engine::TransformPolicy;
use crate::error::{Error, Result};
use crate::sink::{OutputSink, RotatingSink};
use crate::tmx;
use crate::xml::serializer::{write_close_tag, write_open_tag, write_text};
use crate::xml::{CloseTag, OpenTag};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

/// Units per file when nothing else is configured.
pub const DEFAULT_MAX_TU_COUNT: u64 = 100_000;

/// Split threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitOptions {
    /// Maximum number of `tu` elements per output file
    pub max_tu_count: u64,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            max_tu_count: DEFAULT_MAX_TU_COUNT,
        }
    }
}

impl SplitOptions {
    /// Creates options with the given threshold.
    #[must_use]
    pub const fn new(max_tu_count: u64) -> Self {
        Self { max_tu_count }
    }

    /// Checks that the threshold is positive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `max_tu_count` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_tu_count == 0 {
            return Err(Error::config("max_tu_count must be at least 1"));
        }
        Ok(())
    }
}

/// Files written for one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitOutcome {
    /// Output files in order
    pub files: Vec<PathBuf>,
    /// Total translation units written
    pub units: u64,
}

/// Streams a document into numbered files.
///
/// The root open tag, the whole `header` subtree and the `body` open tag are
/// captured as they go by and written again at the top of every new file. A
/// new file is started right before the `tu` that would push the current one
/// past the threshold.
pub struct SplitPolicy {
    max: u64,
    sink: RotatingSink,
    tu_in_file: u64,
    units: u64,
    root_open: String,
    header_xml: String,
    body_open: String,
    buf: String,
}

impl SplitPolicy {
    /// Creates a policy writing its parts through `sink`.
    #[must_use]
    pub fn new(options: &SplitOptions, sink: RotatingSink) -> Self {
        Self {
            max: options.max_tu_count,
            sink,
            tu_in_file: 0,
            units: 0,
            root_open: String::new(),
            header_xml: String::new(),
            body_open: String::new(),
            buf: String::with_capacity(256),
        }
    }

    fn rotate(&mut self) -> Result<()> {
        debug!("Closing split file {} after {} units", self.sink.index(), self.tu_in_file);
        self.sink.write_str("</body></tmx>")?;
        self.sink.open_next()?;
        self.sink.write_str(tmx::XML_DECLARATION)?;
        self.sink.write_str(&self.root_open)?;
        self.sink.write_str(&self.header_xml)?;
        self.sink.write_str(&self.body_open)
    }
}

impl TransformPolicy for SplitPolicy {
    type Output = SplitOutcome;

    fn start(&mut self) -> Result<()> {
        self.sink.open_next()?;
        self.sink.write_str(tmx::XML_DECLARATION)
    }

    fn open_tag(&mut self, ctx: &DocumentContext, transition: Transition, tag: &OpenTag) -> Result<()> {
        if transition == Transition::Entered(Element::Tu) {
            self.units += 1;
            self.tu_in_file += 1;
            if self.tu_in_file > self.max {
                self.rotate()?;
                self.tu_in_file = 1;
            }
        }

        self.buf.clear();
        write_open_tag(&mut self.buf, tag);
        match transition {
            Transition::Entered(Element::Tmx) => self.root_open.clone_from(&self.buf),
            Transition::Entered(Element::Body) => self.body_open.clone_from(&self.buf),
            _ if ctx.inside_header() => self.header_xml.push_str(&self.buf),
            _ => {}
        }
        self.sink.write_str(&self.buf)
    }

    fn text(&mut self, ctx: &DocumentContext, text: &str) -> Result<()> {
        self.buf.clear();
        write_text(&mut self.buf, text);
        if ctx.inside_header() {
            self.header_xml.push_str(&self.buf);
        }
        self.sink.write_str(&self.buf)
    }

    fn close_tag(&mut self, ctx: &DocumentContext, transition: Transition, tag: &CloseTag) -> Result<()> {
        self.buf.clear();
        write_close_tag(&mut self.buf, tag);
        if ctx.inside_header() || transition == Transition::Left(Element::Header) {
            self.header_xml.push_str(&self.buf);
        }
        self.sink.write_str(&self.buf)
    }

    fn finish(mut self, _ctx: &DocumentContext) -> Result<SplitOutcome> {
        if self.sink.index() > 1 && self.tu_in_file == 0 {
            self.sink.discard_current()?;
        }
        let files = self.sink.finish()?;
        Ok(SplitOutcome {
            files,
            units: self.units,
        })
    }
}
