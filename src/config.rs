use crate::error::{Error, Result, Stage};
use crate::matcher::FileMatcher;
use std::path::{Path, PathBuf};

const DEFAULT_OUTPUT_DIR: &str = "out";

/// What a batch does when one file fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop at the first file that is malformed or cannot be written.
    /// A file that cannot be read is recorded and skipped.
    #[default]
    FailFast,
    /// Log every failure, record it and go on with the next file
    Continue,
}

impl ErrorPolicy {
    /// True if `error` should end the batch instead of being recorded.
    /// Read failures are always recorded.
    #[must_use]
    pub fn aborts_on(self, error: &Error) -> bool {
        match self {
            Self::FailFast => error.stage() != Some(Stage::Read),
            Self::Continue => false,
        }
    }
}

/// Batch configuration shared by every operation.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Working directory that patterns and relative paths are resolved against
    pub cwd: PathBuf,

    /// Include globs; a file must match at least one
    pub file_match: Vec<String>,

    /// Exclude globs; a file matching any of them is skipped
    pub file_ignore: Vec<String>,

    /// Output root, relative to `cwd` unless absolute
    pub output_dir: PathBuf,

    /// Per-file failure handling
    pub error_policy: ErrorPolicy,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tmx_stream::Config;
    ///
    /// let config = Config::builder()
    ///     .cwd("./memories")
    ///     .file_match("**/*.tmx")
    ///     .output_dir("./cleaned")
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The working directory doesn't exist or is not a directory
    /// - No include pattern is given
    /// - A glob pattern does not compile
    pub fn validate(&self) -> Result<()> {
        if !self.cwd.exists() {
            return Err(Error::config(format!(
                "Working directory does not exist: {}",
                self.cwd.display()
            )));
        }

        if !self.cwd.is_dir() {
            return Err(Error::config(format!(
                "Working directory is not a directory: {}",
                self.cwd.display()
            )));
        }

        if self.file_match.is_empty() {
            return Err(Error::config("At least one file_match pattern is required"));
        }

        self.matcher().map(|_| ())
    }

    /// Compiles the include/exclude patterns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if a glob does not compile.
    pub fn matcher(&self) -> Result<FileMatcher> {
        FileMatcher::new(&self.file_match, &self.file_ignore)
    }

    /// Output root resolved against the working directory.
    #[must_use]
    pub fn output_root(&self) -> PathBuf {
        resolve(&self.cwd, &self.output_dir)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: PathBuf::from("."),
            file_match: Vec::new(),
            file_ignore: Vec::new(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            error_policy: ErrorPolicy::default(),
        }
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    cwd: Option<PathBuf>,
    file_match: Vec<String>,
    file_ignore: Vec<String>,
    output_dir: Option<PathBuf>,
    error_policy: Option<ErrorPolicy>,
}

impl ConfigBuilder {
    /// Sets the working directory.
    #[must_use]
    pub fn cwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.cwd = Some(path.into());
        self
    }

    /// Adds an include glob.
    #[must_use]
    pub fn file_match(mut self, pattern: impl Into<String>) -> Self {
        self.file_match.push(pattern.into());
        self
    }

    /// Adds several include globs.
    #[must_use]
    pub fn file_matches<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_match.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Adds an exclude glob.
    #[must_use]
    pub fn file_ignore(mut self, pattern: impl Into<String>) -> Self {
        self.file_ignore.push(pattern.into());
        self
    }

    /// Adds several exclude globs.
    #[must_use]
    pub fn file_ignores<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_ignore.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Sets the per-file error policy.
    #[must_use]
    pub const fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = Some(policy);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Config> {
        let config = Config {
            cwd: self.cwd.unwrap_or_else(|| PathBuf::from(".")),
            file_match: self.file_match,
            file_ignore: self.file_ignore,
            output_dir: self
                .output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            error_policy: self.error_policy.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::builder()
            .cwd(temp.path())
            .file_match("**/*.tmx")
            .build()
            .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.error_policy, ErrorPolicy::FailFast);
        assert_eq!(config.output_root(), temp.path().join("out"));
    }

    #[test]
    fn test_invalid_cwd() {
        let result = Config::builder()
            .cwd("/nonexistent/path/that/should/not/exist")
            .file_match("*.tmx")
            .build();

        assert!(result.unwrap_err().is_config());
    }

    #[test]
    fn test_requires_file_match() {
        let temp = assert_fs::TempDir::new().unwrap();
        let result = Config::builder().cwd(temp.path()).build();

        assert!(result.unwrap_err().is_config());
    }

    #[test]
    fn test_invalid_glob() {
        let temp = assert_fs::TempDir::new().unwrap();
        let result = Config::builder()
            .cwd(temp.path())
            .file_match("*.tmx")
            .file_ignore("[bad")
            .build();

        assert!(matches!(result, Err(Error::InvalidPattern { .. })));
    }

    #[test]
    fn test_absolute_output_dir_is_kept() {
        let temp = assert_fs::TempDir::new().unwrap();
        let out = temp.path().join("elsewhere");
        let config = Config::builder()
            .cwd(temp.path())
            .file_matches(["*.tmx", "*.xml"])
            .output_dir(&out)
            .build()
            .unwrap();

        assert_eq!(config.output_root(), out);
        assert_eq!(config.file_match.len(), 2);
    }

    #[test]
    fn test_fail_fast_records_read_failures() {
        let unreadable = Error::io(
            Stage::Read,
            "gone.tmx",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        let malformed = Error::xml("bad.tmx", 3, "unclosed <tu>");
        let unwritable = Error::io(
            Stage::Write,
            "out/a.tmx",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );

        assert!(!ErrorPolicy::FailFast.aborts_on(&unreadable));
        assert!(ErrorPolicy::FailFast.aborts_on(&malformed));
        assert!(ErrorPolicy::FailFast.aborts_on(&unwritable));
        assert!(!ErrorPolicy::Continue.aborts_on(&malformed));
    }
}
