use std::path::{Component, Path, PathBuf};

/// A discovered input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmxFile {
    /// Absolute (or root-joined) path used for reading
    pub absolute_path: PathBuf,

    /// Path relative to the working directory, always with `/` separators
    pub relative_path: String,
}

impl TmxFile {
    /// Describes `path` relative to `root`.
    ///
    /// Paths outside `root` keep their full form as the relative path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, root: &Path) -> Self {
        let absolute_path = path.into();
        let relative = pathdiff::diff_paths(&absolute_path, root)
            .unwrap_or_else(|| absolute_path.clone());

        Self {
            relative_path: to_forward_slashes(&relative),
            absolute_path,
        }
    }

    /// Where the transformed copy of this file goes under `output_root`.
    #[must_use]
    pub fn output_path(&self, output_root: &Path) -> PathBuf {
        self.relative_path
            .split('/')
            .filter(|part| matches!(Path::new(part).components().next(), Some(Component::Normal(_))))
            .fold(output_root.to_path_buf(), |path, part| path.join(part))
    }
}

/// Joins the components of `path` with `/`, keeping a root or prefix.
fn to_forward_slashes(path: &Path) -> String {
    let mut joined = String::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => joined.push_str(&prefix.as_os_str().to_string_lossy()),
            Component::RootDir => joined.push('/'),
            Component::CurDir => {}
            Component::ParentDir | Component::Normal(_) => {
                if !joined.is_empty() && !joined.ends_with('/') {
                    joined.push('/');
                }
                joined.push_str(&component.as_os_str().to_string_lossy());
            }
        }
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_uses_forward_slashes() {
        let root = Path::new("/data");
        let file = TmxFile::new(root.join("nested").join("deep").join("a.tmx"), root);
        assert_eq!(file.relative_path, "nested/deep/a.tmx");
    }

    #[test]
    fn test_output_path_mirrors_relative_path() {
        let root = Path::new("/data");
        let file = TmxFile::new("/data/nested/a.tmx", root);
        assert_eq!(
            file.output_path(Path::new("/out")),
            Path::new("/out").join("nested").join("a.tmx")
        );
    }

    #[test]
    fn test_absolute_key_when_no_relative_path_exists() {
        let file = TmxFile::new("/abs/a.tmx", Path::new("rel"));
        assert_eq!(file.relative_path, "/abs/a.tmx");
        assert_eq!(
            file.output_path(Path::new("/out")),
            Path::new("/out").join("abs").join("a.tmx")
        );
    }

    #[test]
    fn test_output_path_stays_under_root() {
        let file = TmxFile::new("/elsewhere/a.tmx", Path::new("/data"));
        assert_eq!(file.relative_path, "../elsewhere/a.tmx");
        assert_eq!(
            file.output_path(Path::new("/out")),
            Path::new("/out").join("elsewhere").join("a.tmx")
        );
    }
}
