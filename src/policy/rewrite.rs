//! Regular-expression substitution on attribute values.

use super::{TransformCounts, Transformed};
use crate::context::{DocumentContext, Element, Transition};
use crate::engine::TransformPolicy;
use crate::error::{Error, Result};
use crate::sink::OutputSink;
use crate::tmx;
use crate::xml::serializer::{write_close_tag, write_open_tag_with, write_text};
use crate::xml::{CloseTag, OpenTag};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::borrow::Cow;
use std::collections::HashSet;
use tracing::debug;

/// `$$`, `$&`, `$<name>` and `$n`/`$nn` references in a replacement string.
static REPLACEMENT_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(?:(\$)|(&)|<([^>]*)>|([0-9]{1,2}))").expect("valid reference pattern"));

/// Which attributes to rewrite and how.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Element names to touch; empty matches every element
    pub tag_names: Vec<String>,
    /// Attribute names to touch; empty matches every attribute
    pub attribute_names: Vec<String>,
    /// Regular expression searched in attribute values
    pub search_pattern: String,
    /// Flag letters: `g`, `i`, `m`, `s`, `u`
    pub search_flags: String,
    /// Replacement, with `$1`, `$&`, `$<name>` and `$$` references
    pub replacement_value: String,
}

impl RewriteOptions {
    /// Replaces the first match of `pattern` with `replacement`.
    #[must_use]
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            search_pattern: pattern.into(),
            replacement_value: replacement.into(),
            ..Self::default()
        }
    }

    /// Restricts rewriting to these element names.
    #[must_use]
    pub fn tag_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Restricts rewriting to these attribute names.
    #[must_use]
    pub fn attribute_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the flag letters.
    #[must_use]
    pub fn flags(mut self, flags: impl Into<String>) -> Self {
        self.search_flags = flags.into();
        self
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct SearchFlags {
    global: bool,
    case_insensitive: bool,
    multi_line: bool,
    dot_matches_new_line: bool,
}

impl SearchFlags {
    fn parse(flags: &str) -> Result<Self> {
        let mut parsed = Self::default();
        let mut seen = HashSet::new();
        for flag in flags.chars() {
            if !seen.insert(flag) {
                return Err(Error::config(format!("Search flag '{flag}' given more than once")));
            }
            match flag {
                'g' => parsed.global = true,
                'i' => parsed.case_insensitive = true,
                'm' => parsed.multi_line = true,
                's' => parsed.dot_matches_new_line = true,
                'u' => {}
                other => {
                    return Err(Error::config(format!(
                        "Unsupported search flag '{other}' (expected g, i, m, s or u)"
                    )));
                }
            }
        }
        Ok(parsed)
    }
}

/// A compiled substitution plus its name filters.
#[derive(Debug, Clone)]
pub struct AttributeRewriter {
    tag_names: HashSet<String>,
    attribute_names: HashSet<String>,
    regex: Regex,
    replacement: String,
    global: bool,
}

impl AttributeRewriter {
    /// Validates `options` and compiles the expression.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for bad flags and [`Error::InvalidPattern`]
    /// if the expression does not compile.
    pub fn new(options: &RewriteOptions) -> Result<Self> {
        let flags = SearchFlags::parse(&options.search_flags)?;
        let regex = RegexBuilder::new(&options.search_pattern)
            .case_insensitive(flags.case_insensitive)
            .multi_line(flags.multi_line)
            .dot_matches_new_line(flags.dot_matches_new_line)
            .build()
            .map_err(|e| Error::invalid_pattern(&options.search_pattern, e.to_string()))?;

        let replacement = translate_replacement(&options.replacement_value, &regex);
        debug!(
            "Compiled /{}/{} with replacement {:?}",
            options.search_pattern, options.search_flags, replacement
        );

        Ok(Self {
            tag_names: lowercase_set(&options.tag_names),
            attribute_names: lowercase_set(&options.attribute_names),
            regex,
            replacement,
            global: flags.global,
        })
    }

    /// Whether attributes of element `name` are considered.
    #[must_use]
    pub fn matches_tag(&self, name: &str) -> bool {
        self.tag_names.is_empty() || self.tag_names.contains(&name.to_lowercase())
    }

    /// Whether attribute `name` is considered.
    #[must_use]
    pub fn matches_attribute(&self, name: &str) -> bool {
        self.attribute_names.is_empty() || self.attribute_names.contains(&name.to_lowercase())
    }

    /// Applies the substitution to a value; borrowed when nothing matched.
    #[must_use]
    pub fn replace<'v>(&self, value: &'v str) -> Cow<'v, str> {
        if self.global {
            self.regex.replace_all(value, self.replacement.as_str())
        } else {
            self.regex.replace(value, self.replacement.as_str())
        }
    }
}

fn lowercase_set(names: &[String]) -> HashSet<String> {
    names.iter().map(|n| n.to_lowercase()).collect()
}

/// Converts `$`-references into the `${...}` form the `regex` crate expands.
///
/// References to groups that do not exist stay literal, as does any `$` that
/// does not start a reference. `$nn` falls back to `$n` followed by a digit
/// when group `nn` does not exist.
fn translate_replacement(replacement: &str, regex: &Regex) -> String {
    let groups = regex.captures_len();
    let has_group = |n: usize| n >= 1 && n < groups;

    let mut out = String::with_capacity(replacement.len() + 8);
    let mut last = 0;
    for caps in REPLACEMENT_REFERENCE.captures_iter(replacement) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&replacement[last..whole.start()].replace('$', "$$"));
        last = whole.end();

        if caps.get(1).is_some() {
            out.push_str("$$");
        } else if caps.get(2).is_some() {
            out.push_str("${0}");
        } else if let Some(name) = caps.get(3) {
            let name = name.as_str();
            if regex.capture_names().flatten().any(|n| n == name) {
                out.push_str(&format!("${{{name}}}"));
            } else {
                out.push_str(&whole.as_str().replace('$', "$$"));
            }
        } else if let Some(digits) = caps.get(4) {
            let digits = digits.as_str();
            let number: usize = digits.parse().unwrap_or(0);
            if has_group(number) {
                out.push_str(&format!("${{{number}}}"));
            } else if digits.len() == 2 && has_group(number / 10) {
                out.push_str(&format!("${{{}}}{}", number / 10, &digits[1..]));
            } else {
                out.push_str("$$");
                out.push_str(digits);
            }
        }
    }
    out.push_str(&replacement[last..].replace('$', "$$"));
    out
}

/// Copies a document, substituting matching attribute values.
pub struct RewritePolicy<'r, S> {
    rewriter: &'r AttributeRewriter,
    sink: S,
    buf: String,
    counts: TransformCounts,
}

impl<'r, S: OutputSink> RewritePolicy<'r, S> {
    /// Creates a policy writing to `sink`.
    pub fn new(rewriter: &'r AttributeRewriter, sink: S) -> Self {
        Self {
            rewriter,
            sink,
            buf: String::with_capacity(256),
            counts: TransformCounts::default(),
        }
    }
}

impl<S: OutputSink> TransformPolicy for RewritePolicy<'_, S> {
    type Output = Transformed<S>;

    fn start(&mut self) -> Result<()> {
        self.sink.write_str(tmx::XML_DECLARATION)
    }

    fn open_tag(&mut self, _ctx: &DocumentContext, transition: Transition, tag: &OpenTag) -> Result<()> {
        if transition == Transition::Entered(Element::Tu) {
            self.counts.units += 1;
        }

        let rewriter = self.rewriter;
        let tag_matches = rewriter.matches_tag(&tag.name);
        let rewritten = &mut self.counts.attributes_rewritten;

        self.buf.clear();
        write_open_tag_with(&mut self.buf, tag, |name, value| {
            if !tag_matches || !rewriter.matches_attribute(name) {
                return Cow::Borrowed(value);
            }
            let replaced = rewriter.replace(value);
            if replaced != value {
                *rewritten += 1;
            }
            replaced
        });
        self.sink.write_str(&self.buf)
    }

    fn text(&mut self, _ctx: &DocumentContext, text: &str) -> Result<()> {
        self.buf.clear();
        write_text(&mut self.buf, text);
        self.sink.write_str(&self.buf)
    }

    fn close_tag(&mut self, _ctx: &DocumentContext, _transition: Transition, tag: &CloseTag) -> Result<()> {
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
