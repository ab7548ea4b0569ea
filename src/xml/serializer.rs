//! Re-serialization of tokenizer events back into XML text.

use super::tokenizer::{CloseTag, OpenTag};
use memchr::{memchr2, memchr3};
use std::borrow::Cow;

/// Escapes character data: `&`, `<` and `>`.
#[must_use]
pub fn escape_text(raw: &str) -> Cow<'_, str> {
    if memchr3(b'&', b'<', b'>', raw.as_bytes()).is_none() {
        return Cow::Borrowed(raw);
    }
    Cow::Owned(escape(raw, false))
}

/// Escapes an attribute value for the five XML-reserved characters.
#[must_use]
pub fn escape_attribute(raw: &str) -> Cow<'_, str> {
    let bytes = raw.as_bytes();
    if memchr3(b'&', b'<', b'>', bytes).is_none() && memchr2(b'"', b'\'', bytes).is_none() {
        return Cow::Borrowed(raw);
    }
    Cow::Owned(escape(raw, true))
}

fn escape(raw: &str, quotes: bool) -> String {
    let mut out = String::with_capacity(raw.len() + 16);
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if quotes => out.push_str("&quot;"),
            '\'' if quotes => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Appends `<name a="v" ...` and, unless self-closing, `>`.
///
/// A self-closing tag is left open; the matching [`write_close_tag`] call
/// emits the `/>`.
pub fn write_open_tag(out: &mut String, tag: &OpenTag) {
    write_open_tag_with(out, tag, |_, value| Cow::Borrowed(value));
}

/// Like [`write_open_tag`], but passes every attribute through `value_of`
/// before escaping. `value_of` receives the attribute name and raw value.
pub fn write_open_tag_with<'t, F>(out: &mut String, tag: &'t OpenTag, mut value_of: F)
where
    F: FnMut(&'t str, &'t str) -> Cow<'t, str>,
{
    out.push('<');
    out.push_str(&tag.name);
    for (key, value) in &tag.attributes {
        let value = value_of(key.as_str(), value.as_str());
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_attribute(&value));
        out.push('"');
    }
    if !tag.self_closing {
        out.push('>');
    }
}

/// Appends `/>` for a self-closing element, `</name>` otherwise.
pub fn write_close_tag(out: &mut String, tag: &CloseTag) {
    if tag.self_closing {
        out.push_str("/>");
    } else {
        out.push_str("</");
        out.push_str(&tag.name);
        out.push('>');
    }
}

/// Appends escaped character data.
pub fn write_text(out: &mut String, text: &str) {
    out.push_str(&escape_text(text));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text_borrows_when_clean() {
        assert!(matches!(escape_text("plain text"), Cow::Borrowed(_)));
        assert_eq!(escape_text("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(escape_text(r#"say "hi""#), r#"say "hi""#);
    }

    #[test]
    fn test_escape_attribute_covers_quotes() {
        assert_eq!(
            escape_attribute(r#"<"it's" & more>"#),
            "&lt;&quot;it&apos;s&quot; &amp; more&gt;"
        );
        assert!(matches!(escape_attribute("en-US"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_open_tag_rendering() {
        let tag = OpenTag::new("tuv").with_attribute("xml:lang", "en-US");
        let mut out = String::new();
        write_open_tag(&mut out, &tag);
        assert_eq!(out, r#"<tuv xml:lang="en-US">"#);
    }

    #[test]
    fn test_self_closing_round_trip() {
        let tag = OpenTag::new("prop")
            .with_attribute("type", "a&b")
            .self_closed();
        let mut out = String::new();
        write_open_tag(&mut out, &tag);
        write_close_tag(
            &mut out,
            &CloseTag {
                name: "prop".to_string(),
                self_closing: true,
            },
        );
        assert_eq!(out, r#"<prop type="a&amp;b"/>"#);
    }

    #[test]
    fn test_value_mapping_applies_before_escaping() {
        let tag = OpenTag::new("tu")
            .with_attribute("a", "1")
            .with_attribute("b", "2");
        let mut out = String::new();
        write_open_tag_with(&mut out, &tag, |key, value| {
            if key == "b" {
                Cow::Owned(format!("<{value}>"))
            } else {
                Cow::Borrowed(value)
            }
        });
        assert_eq!(out, r#"<tu a="1" b="&lt;2&gt;">"#);
    }

    #[test]
    fn test_close_tag_rendering() {
        let mut out = String::new();
        write_close_tag(&mut out, &CloseTag::new("body"));
        assert_eq!(out, "</body>");
    }
}
