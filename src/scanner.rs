use crate::{
    config::Config,
    error::{Error, Result, Stage},
    file::TmxFile,
    matcher::FileMatcher,
};
use ignore::WalkBuilder;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, trace, warn};

/// Finds input files under the working directory.
pub(crate) struct Scanner {
    root_dir: PathBuf,
    matcher: FileMatcher,
}

impl Scanner {
    /// Creates a new scanner from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured globs do not compile.
    pub(crate) fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            root_dir: config.cwd.clone(),
            matcher: config.matcher()?,
        })
    }

    /// Walks the working directory and returns matching files sorted by
    /// relative path. An empty result is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] with [`Stage::Discover`] if the working directory
    /// cannot be listed. Failures below it are logged and skipped.
    pub(crate) fn scan(&self) -> Result<Vec<TmxFile>> {
        debug!("Scanning {}", self.root_dir.display());
        fs::read_dir(&self.root_dir).map_err(|e| Error::io(Stage::Discover, &self.root_dir, e))?;

        let walker = WalkBuilder::new(&self.root_dir)
            .standard_filters(false)
            .follow_links(false)
            .build();

        let mut files = Vec::new();
        let mut errors = 0usize;
        for result in walker {
            match result {
                Ok(entry) if entry.file_type().is_some_and(|ft| ft.is_file()) => {
                    let file = TmxFile::new(entry.into_path(), &self.root_dir);
                    if self.matcher.is_match(&file.relative_path) {
                        trace!("Matched {}", file.relative_path);
                        files.push(file);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Walk error: {}", e);
                    errors += 1;
                }
            }
        }

        if errors > 0 {
            warn!("Encountered {} errors during scanning (non-fatal)", errors);
        }

        // Sort for deterministic ordering
        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        debug!("Found {} matching files", files.len());
        Ok(files)
    }
}
