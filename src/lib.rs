//! # tmx-stream
//!
//! Streaming transforms for TMX (Translation Memory eXchange) files.
//!
//! ## Features
//!
//! - Constant-memory, single-pass processing of arbitrarily large files
//! - Statistics: header attributes, translation units, per-language variants
//! - Removal of `note`/`prop` elements with keep lists
//! - Regular-expression substitution on selected attributes
//! - Splitting into numbered files of at most N translation units
//!
//! ## Quick Start
//!
//! ```no_run
//! use tmx_stream::{Config, Pipeline, PruneOptions};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .cwd("./memories")
//!     .file_match("**/*.tmx")
//!     .output_dir("./cleaned")
//!     .build()?;
//!
//! let report = Pipeline::new(config)?
//!     .remove_info_elements(&PruneOptions::new().keep_prop_types(["x-context"]))?;
//! println!("{} files written", report.results.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Every operation is the same pipeline with a different policy:
//! 1. **Tokenizer**: pulls open tag, text and close tag events from `quick-xml`
//! 2. **Context**: tracks whether the stream is inside `header`, `body`, `tu`, `tuv`
//! 3. **Policy**: records, drops or rewrites each event
//! 4. **Sink**: receives the re-serialized XML, rotating files when splitting

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod error;
mod file;
mod matcher;
mod pipeline;
mod scanner;

pub mod context;
pub mod engine;
pub mod policy;
pub mod sink;
pub mod tmx;
pub mod xml;

pub use config::{Config, ConfigBuilder, ErrorPolicy};
pub use error::{Error, Result, Stage};
pub use file::TmxFile;
pub use matcher::FileMatcher;
pub use pipeline::{BatchReport, Pipeline, TransformSummary};
pub use policy::prune::PruneOptions;
pub use policy::rewrite::RewriteOptions;
pub use policy::split::{DEFAULT_MAX_TU_COUNT, SplitOptions};
pub use policy::stats::FileStats;

/// Collects statistics for every file selected by `config`.
///
/// This is the shortest path to the JSON report the CLI prints.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - The working directory cannot be listed
/// - A file is malformed (unless [`ErrorPolicy::Continue`] is configured)
///
/// Files that cannot be read are recorded in [`BatchReport::failures`].
///
/// # Examples
///
/// ```no_run
/// use tmx_stream::{Config, file_stats};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder()
///     .cwd(".")
///     .file_match("**/*.tmx")
///     .build()?;
///
/// let report = file_stats(config)?;
/// println!("{}", report.to_json()?);
/// # Ok(())
/// # }
/// ```
pub fn file_stats(config: Config) -> Result<BatchReport<FileStats>> {
    Pipeline::new(config)?.file_stats()
}
