use crate::{
    config::Config,
    engine,
    error::{Error, Result},
    file::TmxFile,
    policy::{
        TransformCounts,
        prune::{PruneOptions, PrunePolicy},
        rewrite::{AttributeRewriter, RewriteOptions, RewritePolicy},
        split::{SplitOptions, SplitPolicy},
        stats::{self, FileStats},
    },
    scanner::Scanner,
    sink::{FileSink, ProtectedPaths, RotatingSink},
    xml::Tokenizer,
};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// What a transform wrote for one input file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformSummary {
    /// Output files, in order
    pub outputs: Vec<PathBuf>,

    /// Translation units written
    pub units: u64,

    /// `note`/`prop` elements removed
    pub elements_removed: u64,

    /// Attribute values changed
    pub attributes_rewritten: u64,
}

impl TransformSummary {
    fn new(outputs: Vec<PathBuf>, counts: TransformCounts) -> Self {
        Self {
            outputs,
            units: counts.units,
            elements_removed: counts.elements_removed,
            attributes_rewritten: counts.attributes_rewritten,
        }
    }
}

/// Outcome of one operation over every discovered file.
#[derive(Debug)]
pub struct BatchReport<T> {
    /// Per-file results keyed by forward-slash relative path, in discovery order
    pub results: IndexMap<String, T>,

    /// Files that failed, with their error
    pub failures: Vec<(String, Error)>,

    /// Total execution time
    pub duration: Duration,
}

impl<T> BatchReport<T> {
    /// True when no file failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of files processed, failed ones included.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    /// Returns the results, or the collected failures as one error.
    ///
    /// # Errors
    ///
    /// Returns the single failure, or [`Error::Multiple`] when several files
    /// failed.
    pub fn into_result(self) -> Result<IndexMap<String, T>> {
        let mut errors: Vec<Error> = self.failures.into_iter().map(|(_, e)| e).collect();
        match errors.len() {
            0 => Ok(self.results),
            1 => Err(errors.remove(0)),
            _ => Err(Error::multiple(errors)),
        }
    }
}

impl<T: Serialize> BatchReport<T> {
    /// Renders the per-file results as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if a result cannot be serialized.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.results)?)
    }
}

/// Runs the four operations over the files selected by a [`Config`].
pub struct Pipeline {
    config: Config,
    scanner: Scanner,
    output_root: PathBuf,
}

impl Pipeline {
    /// Creates a new pipeline with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let scanner = Scanner::new(&config)?;
        let output_root = config.output_root();

        Ok(Self {
            config,
            scanner,
            output_root,
        })
    }

    /// Lists the files the operations would process.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory cannot be listed.
    pub fn discover(&self) -> Result<Vec<TmxFile>> {
        let files = self.scanner.scan()?;
        if files.is_empty() {
            warn!(
                "No files matched {:?} under {}",
                self.config.file_match,
                self.config.cwd.display()
            );
        }
        Ok(files)
    }

    /// Collects header attributes, unit and language counts and size of
    /// every file.
    ///
    /// # Errors
    ///
    /// Returns a discovery error, or the first parse or write error under
    /// [`ErrorPolicy::FailFast`](crate::ErrorPolicy::FailFast). Unreadable
    /// files are recorded in [`BatchReport::failures`] under either policy.
    #[instrument(skip(self), fields(cwd = %self.config.cwd.display()))]
    pub fn file_stats(&self) -> Result<BatchReport<FileStats>> {
        self.run_batch("file-stats", |file, _| stats::collect(&file.absolute_path))
    }

    /// Writes a copy of every file without `note`/`prop` elements, except
    /// those `options` keeps.
    ///
    /// # Errors
    ///
    /// As [`Pipeline::file_stats`].
    #[instrument(skip(self, options), fields(cwd = %self.config.cwd.display()))]
    pub fn remove_info_elements(&self, options: &PruneOptions) -> Result<BatchReport<TransformSummary>> {
        self.run_batch("remove-info-elements", |file, protected| {
            self.transform_file(file, protected, |sink| PrunePolicy::new(options, sink))
        })
    }

    /// Writes a copy of every file with matching attribute values substituted.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before touching any file if the pattern
    /// or flags are invalid; otherwise as [`Pipeline::file_stats`].
    #[instrument(skip(self, options), fields(cwd = %self.config.cwd.display()))]
    pub fn search_replace_attributes(&self, options: &RewriteOptions) -> Result<BatchReport<TransformSummary>> {
        let rewriter = AttributeRewriter::new(options)?;
        self.run_batch("search-replace-attributes", |file, protected| {
            self.transform_file(file, protected, |sink| RewritePolicy::new(&rewriter, sink))
        })
    }

    /// Splits every file into numbered files of at most `max_tu_count` units.
    ///
    /// A numbered file that would replace any discovered input fails that
    /// input with a write error.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before touching any file if the
    /// threshold is zero; otherwise as [`Pipeline::file_stats`].
    #[instrument(skip(self, options), fields(cwd = %self.config.cwd.display()))]
    pub fn split_files_by_tu_count(&self, options: &SplitOptions) -> Result<BatchReport<TransformSummary>> {
        options.validate()?;
        self.run_batch("split-files-by-tu-count", |file, protected| {
            let sink = RotatingSink::new(file.output_path(&self.output_root))
                .protect(protected.clone());
            let tokenizer = Tokenizer::from_path(&file.absolute_path)?;
            let outcome = engine::run(tokenizer, SplitPolicy::new(options, sink))?;
            Ok(TransformSummary {
                outputs: outcome.files,
                units: outcome.units,
                ..TransformSummary::default()
            })
        })
    }

    /// Streams one file into its mirrored output path.
    ///
    /// The input is opened before the output is created, so a missing input
    /// leaves nothing behind. On a parse failure the partial output stays.
    fn transform_file<P, F>(
        &self,
        file: &TmxFile,
        protected: &ProtectedPaths,
        make_policy: F,
    ) -> Result<TransformSummary>
    where
        F: FnOnce(FileSink) -> P,
        P: engine::TransformPolicy<Output = crate::policy::Transformed<FileSink>>,
    {
        let output = file.output_path(&self.output_root);
        protected.check(&output)?;

        let tokenizer = Tokenizer::from_path(&file.absolute_path)?;
        let sink = FileSink::create(&output)?;
        let transformed = engine::run(tokenizer, make_policy(sink))?;
        let written = transformed.sink.finish()?;

        Ok(TransformSummary::new(vec![written], transformed.counts))
    }

    /// Runs `process` on every discovered file. Every input is protected from
    /// being replaced by an output of the batch.
    fn run_batch<T, F>(&self, operation: &str, mut process: F) -> Result<BatchReport<T>>
    where
        F: FnMut(&TmxFile, &ProtectedPaths) -> Result<T>,
    {
        let start_time = Instant::now();
        let files = self.discover()?;
        let protected = ProtectedPaths::new(files.iter().map(|f| &f.absolute_path));
        info!("Running {} on {} files", operation, files.len());

        let mut results = IndexMap::with_capacity(files.len());
        let mut failures = Vec::new();

        for file in &files {
            debug!("Processing {}", file.relative_path);
            match process(file, &protected) {
                Ok(value) => {
                    results.insert(file.relative_path.clone(), value);
                }
                Err(e) if self.config.error_policy.aborts_on(&e) => return Err(e),
                Err(e) => {
                    warn!("Failed to process {}: {}", file.relative_path, e);
                    failures.push((file.relative_path.clone(), e));
                }
            }
        }

        let duration = start_time.elapsed();
        info!(
            "✓ {} finished: {} ok, {} failed in {:.2}s",
            operation,
            results.len(),
            failures.len(),
            duration.as_secs_f64()
        );

        Ok(BatchReport {
            results,
            failures,
            duration,
        })
    }
}
