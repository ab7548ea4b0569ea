//! The streaming transform engine.
//!
//! One loop drives every operation: pull an event from the tokenizer, update
//! the [`DocumentContext`], hand both to a [`TransformPolicy`]. Policies differ
//! only in what they record or emit, so statistics, pruning, rewriting and
//! splitting share the same single-pass, constant-memory walk.

use crate::context::{DocumentContext, Transition};
use crate::error::Result;
use crate::xml::{CloseTag, OpenTag, Tokenizer, XmlEvent};
use std::io::BufRead;
use std::path::Path;
use tracing::{instrument, trace};

/// Per-event decisions for one document.
///
/// The engine calls `start` once, then one hook per event in document order,
/// then `finish`. The context passed to a hook already reflects the event, and
/// `transition` tells which flag (if any) the event flipped. A policy is
/// dropped without `finish` when the tokenizer fails, so resources it owns
/// must clean up on drop.
pub trait TransformPolicy {
    /// Value produced once the document has been fully processed.
    type Output;

    /// Called before the first event.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy cannot prepare its output.
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called for every element start.
    ///
    /// # Errors
    ///
    /// Returns an error if output cannot be written.
    fn open_tag(
        &mut self,
        ctx: &DocumentContext,
        transition: Transition,
        tag: &OpenTag,
    ) -> Result<()>;

    /// Called for character data.
    ///
    /// # Errors
    ///
    /// Returns an error if output cannot be written.
    fn text(&mut self, _ctx: &DocumentContext, _text: &str) -> Result<()> {
        Ok(())
    }

    /// Called for every element end.
    ///
    /// # Errors
    ///
    /// Returns an error if output cannot be written.
    fn close_tag(
        &mut self,
        _ctx: &DocumentContext,
        _transition: Transition,
        _tag: &CloseTag,
    ) -> Result<()> {
        Ok(())
    }

    /// Called at end of document.
    ///
    /// # Errors
    ///
    /// Returns an error if output cannot be finalized.
    fn finish(self, ctx: &DocumentContext) -> Result<Self::Output>;
}

/// Runs `policy` over every event of `tokenizer`.
///
/// # Errors
///
/// Propagates tokenizer errors and policy errors; processing stops at the
/// first one.
pub fn run<R, P>(mut tokenizer: Tokenizer<R>, mut policy: P) -> Result<P::Output>
where
    R: BufRead,
    P: TransformPolicy,
{
    let mut context = DocumentContext::new();
    let mut events: u64 = 0;

    policy.start()?;
    loop {
        let event = tokenizer.next_event()?;
        let transition = context.observe(&event);
        events += 1;

        match &event {
            XmlEvent::Open(tag) => policy.open_tag(&context, transition, tag)?,
            XmlEvent::Text(text) => policy.text(&context, text)?,
            XmlEvent::Close(tag) => policy.close_tag(&context, transition, tag)?,
            XmlEvent::End => break,
        }
    }

    trace!("Processed {} events from {}", events, tokenizer.path().display());
    policy.finish(&context)
}

/// Opens `path` and runs `policy` over it.
///
/// # Errors
///
/// Returns [`crate::Error::Io`] if the file cannot be opened, otherwise the
/// same errors as [`run`].
#[instrument(level = "debug", skip(policy), fields(path = %path.display()))]
pub fn run_file<P: TransformPolicy>(path: &Path, policy: P) -> Result<P::Output> {
    run(Tokenizer::from_path(path)?, policy)
}
