//! Append-only output destinations.
//!
//! Files are written through a `BufWriter` and closed when the sink is
//! dropped, so a tokenizer failure halfway through a document still releases
//! the handle. Callers use `finish` on the success path to surface flush
//! errors. Rotation happens only when a policy asks for it, which the split
//! policy does between translation units.

use crate::error::{Error, Result, Stage};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Destination for re-serialized XML.
pub trait OutputSink {
    /// Appends text to the current destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination cannot be written.
    fn write_str(&mut self, text: &str) -> Result<()>;
}

impl OutputSink for String {
    fn write_str(&mut self, text: &str) -> Result<()> {
        self.push_str(text);
        Ok(())
    }
}

/// A single output file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
    bytes_written: u64,
}

impl FileSink {
    /// Creates (or truncates) `path`, creating missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] with [`Stage::Write`] if the directory or file
    /// cannot be created.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(Stage::Write, parent, e))?;
        }

        let file = File::create(&path).map_err(|e| Error::io(Stage::Write, &path, e))?;
        debug!("Opened output {}", path.display());

        Ok(Self {
            path,
            writer: BufWriter::with_capacity(WRITE_BUFFER_SIZE, file),
            bytes_written: 0,
        })
    }

    /// Path of the file being written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes appended so far.
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flushes and closes the file, returning its path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if buffered data cannot be flushed.
    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer
            .flush()
            .map_err(|e| Error::io(Stage::Write, &self.path, e))?;
        debug!(
            "Closed output {} ({} bytes)",
            self.path.display(),
            self.bytes_written
        );
        Ok(self.path)
    }
}

impl OutputSink for FileSink {
    fn write_str(&mut self, text: &str) -> Result<()> {
        self.writer
            .write_all(text.as_bytes())
            .map_err(|e| Error::io(Stage::Write, &self.path, e))?;
        self.bytes_written += text.len() as u64;
        Ok(())
    }
}

/// Existing files that outputs must never replace, compared by canonical path.
///
/// Cloning shares the set.
#[derive(Debug, Clone, Default)]
pub struct ProtectedPaths {
    paths: Arc<HashSet<PathBuf>>,
}

impl ProtectedPaths {
    /// Protects every path in `paths` that currently exists.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths = paths
            .into_iter()
            .filter_map(|p| fs::canonicalize(p).ok())
            .collect();
        Self {
            paths: Arc::new(paths),
        }
    }

    /// Fails if writing `output` would replace a protected file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] with [`Stage::Write`] and
    /// [`io::ErrorKind::AlreadyExists`] on a collision.
    pub fn check(&self, output: &Path) -> Result<()> {
        let collides = fs::canonicalize(output).is_ok_and(|c| self.paths.contains(&c));
        if collides {
            return Err(Error::io(
                Stage::Write,
                output,
                io::Error::new(io::ErrorKind::AlreadyExists, "output would overwrite an input file"),
            ));
        }
        Ok(())
    }
}

/// Returns `dir/stem-<index>.ext` for `dir/stem.ext`.
#[must_use]
pub fn numbered_path(base: &Path, index: usize) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name = match base.extension() {
        Some(ext) => format!("{stem}-{index}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{index}"),
    };
    base.with_file_name(name)
}

/// A sequence of numbered files derived from one base path.
///
/// Files are named with [`numbered_path`] starting at 1. Only one file is open
/// at a time; opening the next one finishes the current one first. Every name
/// is checked against the protected paths before it is created.
#[derive(Debug)]
pub struct RotatingSink {
    base: PathBuf,
    index: usize,
    current: Option<FileSink>,
    finished: Vec<PathBuf>,
    protected: ProtectedPaths,
}

impl RotatingSink {
    /// Creates a sink; no file is opened until [`RotatingSink::open_next`].
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            index: 0,
            current: None,
            finished: Vec::new(),
            protected: ProtectedPaths::default(),
        }
    }

    /// Refuses to create any numbered file that is one of `protected`.
    #[must_use]
    pub fn protect(mut self, protected: ProtectedPaths) -> Self {
        self.protected = protected;
        self
    }

    /// 1-based number of the current file, 0 before the first one.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Finishes the current file (if any) and opens the next numbered one.
    ///
    /// # Errors
    ///
    /// Returns an error if the current file cannot be flushed, or the next one
    /// is protected or cannot be created.
    pub fn open_next(&mut self) -> Result<()> {
        self.close_current()?;
        self.index += 1;
        let path = numbered_path(&self.base, self.index);
        self.protected.check(&path)?;
        self.current = Some(FileSink::create(path)?);
        Ok(())
    }

    /// Closes and deletes the current file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be removed.
    pub fn discard_current(&mut self) -> Result<()> {
        if let Some(sink) = self.current.take() {
            let path = sink.path().to_path_buf();
            drop(sink);
            fs::remove_file(&path).map_err(|e| Error::io(Stage::Write, &path, e))?;
            debug!("Removed empty output {}", path.display());
        }
        Ok(())
    }

    /// Finishes the current file and returns every file kept, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the current file cannot be flushed.
    pub fn finish(mut self) -> Result<Vec<PathBuf>> {
        self.close_current()?;
        Ok(self.finished)
    }

    fn close_current(&mut self) -> Result<()> {
        if let Some(sink) = self.current.take() {
            self.finished.push(sink.finish()?);
        }
        Ok(())
    }
}

impl OutputSink for RotatingSink {
    fn write_str(&mut self, text: &str) -> Result<()> {
        match self.current.as_mut() {
            Some(sink) => sink.write_str(text),
            None => Err(Error::io(
                Stage::Write,
                &self.base,
                std::io::Error::other("no output file is open"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_numbered_path_inserts_index_before_extension() {
        assert_eq!(
            numbered_path(Path::new("out/dir/memory.tmx"), 3),
            PathBuf::from("out/dir/memory-3.tmx")
        );
        assert_eq!(numbered_path(Path::new("memory"), 1), PathBuf::from("memory-1"));
        assert_eq!(
            numbered_path(Path::new("a.b.tmx"), 2),
            PathBuf::from("a.b-2.tmx")
        );
    }

    #[test]
    fn test_file_sink_creates_missing_directories() {
        let temp = assert_fs::TempDir::new().unwrap();
        let target = temp.child("nested/deeper/out.tmx");

        let mut sink = FileSink::create(target.path()).unwrap();
        sink.write_str("<tmx/>").unwrap();
        assert_eq!(sink.bytes_written(), 6);
        sink.finish().unwrap();

        target.assert("<tmx/>");
    }

    #[test]
    fn test_rotating_sink_writes_sequential_files() {
        let temp = assert_fs::TempDir::new().unwrap();
        let mut sink = RotatingSink::new(temp.path().join("split.tmx"));

        sink.open_next().unwrap();
        sink.write_str("one").unwrap();
        sink.open_next().unwrap();
        sink.write_str("two").unwrap();
        assert_eq!(sink.index(), 2);

        let files = sink.finish().unwrap();
        assert_eq!(files.len(), 2);
        temp.child("split-1.tmx").assert("one");
        temp.child("split-2.tmx").assert("two");
    }

    #[test]
    fn test_discard_current_removes_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let mut sink = RotatingSink::new(temp.path().join("split.tmx"));

        sink.open_next().unwrap();
        sink.write_str("kept").unwrap();
        sink.open_next().unwrap();
        sink.discard_current().unwrap();

        let files = sink.finish().unwrap();
        assert_eq!(files, vec![temp.path().join("split-1.tmx")]);
        assert!(!temp.child("split-2.tmx").path().exists());
    }

    #[test]
    fn test_rotation_refuses_protected_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let existing = temp.child("split-2.tmx");
        existing.write_str("input").unwrap();

        let protected = ProtectedPaths::new([existing.path()]);
        let mut sink = RotatingSink::new(temp.path().join("split.tmx")).protect(protected);

        sink.open_next().unwrap();
        let err = sink.open_next().unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Write));
        assert_eq!(fs::read_to_string(existing.path()).unwrap(), "input");
    }

    #[test]
    fn test_protected_paths_ignore_missing_outputs() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.child("in.tmx");
        input.write_str("x").unwrap();

        let protected = ProtectedPaths::new([input.path()]);
        assert!(protected.check(&temp.path().join("out.tmx")).is_ok());
        assert!(protected.check(&temp.path().join("./in.tmx")).is_err());
    }

    #[test]
    fn test_write_without_open_file_fails() {
        let mut sink = RotatingSink::new("unused.tmx");
        let err = sink.write_str("x").unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Write));
    }
}
