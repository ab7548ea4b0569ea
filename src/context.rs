//! Structural context tracking over the fixed TMX nesting.
//!
//! TMX nests `tmx > header|body`, `body > tu > tuv`, so five flags describe
//! where the parser is. Every flag has a precondition on its parent and is
//! cleared only by the close tag of the same name while it is set; stray close
//! tags never flip anything.

use crate::tmx;
use crate::xml::{CloseTag, OpenTag, XmlEvent};

/// TMX elements the tracker knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    /// `tmx`
    Tmx,
    /// `header`
    Header,
    /// `body`
    Body,
    /// `tu`
    Tu,
    /// `tuv`
    Tuv,
}

impl Element {
    /// Maps an element name to a tracked element.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            tmx::TMX => Some(Self::Tmx),
            tmx::HEADER => Some(Self::Header),
            tmx::BODY => Some(Self::Body),
            tmx::TU => Some(Self::Tu),
            tmx::TUV => Some(Self::Tuv),
            _ => None,
        }
    }

    /// Returns the element name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tmx => tmx::TMX,
            Self::Header => tmx::HEADER,
            Self::Body => tmx::BODY,
            Self::Tu => tmx::TU,
            Self::Tuv => tmx::TUV,
        }
    }
}

/// What an event did to the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A flag turned on
    Entered(Element),
    /// A flag turned off
    Left(Element),
    /// Nothing changed
    Unchanged,
}

/// Per-document structural state. One instance per processed file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DocumentContext {
    inside_tmx: bool,
    inside_header: bool,
    inside_body: bool,
    inside_tu: bool,
    inside_tuv: bool,
    tuv_language: String,
}

impl DocumentContext {
    /// Creates a context positioned before the root element.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the flags for an event. Text and end events never change them.
    pub fn observe(&mut self, event: &XmlEvent) -> Transition {
        match event {
            XmlEvent::Open(tag) => self.open(tag),
            XmlEvent::Close(tag) => self.close(tag),
            XmlEvent::Text(_) | XmlEvent::End => Transition::Unchanged,
        }
    }

    /// Applies an open tag.
    pub fn open(&mut self, tag: &OpenTag) -> Transition {
        let Some(element) = Element::from_name(&tag.name) else {
            return Transition::Unchanged;
        };

        let (allowed, flag) = match element {
            Element::Tmx => (true, &mut self.inside_tmx),
            Element::Header => (self.inside_tmx, &mut self.inside_header),
            Element::Body => (self.inside_tmx, &mut self.inside_body),
            Element::Tu => (self.inside_body, &mut self.inside_tu),
            Element::Tuv => (self.inside_tu, &mut self.inside_tuv),
        };
        if !allowed || *flag {
            return Transition::Unchanged;
        }
        *flag = true;

        if element == Element::Tuv {
            self.tuv_language = tag.attribute(tmx::XML_LANG).unwrap_or_default().to_string();
        }
        Transition::Entered(element)
    }

    /// Applies a close tag.
    pub fn close(&mut self, tag: &CloseTag) -> Transition {
        let Some(element) = Element::from_name(&tag.name) else {
            return Transition::Unchanged;
        };

        let flag = match element {
            Element::Tmx => &mut self.inside_tmx,
            Element::Header => &mut self.inside_header,
            Element::Body => &mut self.inside_body,
            Element::Tu => &mut self.inside_tu,
            Element::Tuv => &mut self.inside_tuv,
        };
        if !*flag {
            return Transition::Unchanged;
        }
        *flag = false;

        if element == Element::Tuv {
            self.tuv_language.clear();
        }
        Transition::Left(element)
    }

    /// Inside the root `tmx` element.
    #[must_use]
    pub const fn inside_tmx(&self) -> bool {
        self.inside_tmx
    }

    /// Inside `header`.
    #[must_use]
    pub const fn inside_header(&self) -> bool {
        self.inside_header
    }

    /// Inside `body`.
    #[must_use]
    pub const fn inside_body(&self) -> bool {
        self.inside_body
    }

    /// Inside a translation unit.
    #[must_use]
    pub const fn inside_tu(&self) -> bool {
        self.inside_tu
    }

    /// Inside a translation unit variant.
    #[must_use]
    pub const fn inside_tuv(&self) -> bool {
        self.inside_tuv
    }

    /// `xml:lang` of the current `tuv`; empty outside of one or when absent.
    #[must_use]
    pub fn tuv_language(&self) -> &str {
        &self.tuv_language
    }
}
