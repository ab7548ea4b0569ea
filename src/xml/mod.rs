//! XML tokenizing and re-serialization.

pub mod serializer;
pub mod tokenizer;

pub use tokenizer::{Attributes, CloseTag, OpenTag, Tokenizer, XmlEvent};
