//! Source file groups: one `'(' file ')'` clause with its per-file options.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::paths;
use super::track_options::TrackOptions;

/// One input file of the command line and the batch it stands for.
#[derive(Debug, Clone)]
pub struct SourceGroup {
    index: usize,
    options: TrackOptions,
    file: PathBuf,
    siblings: Vec<PathBuf>,
}

impl SourceGroup {
    /// Creates the group and, when the reference file exists, reads its
    /// sibling files.
    pub fn new(index: usize, options: TrackOptions, file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        let siblings = if file.is_file() {
            paths::sibling_files(&file)
        } else {
            Vec::new()
        };
        debug!(
            group = index,
            file = %file.display(),
            siblings = siblings.len(),
            "Source group"
        );

        Self {
            index,
            options,
            file,
            siblings,
        }
    }

    /// False when the reference file does not exist or has no siblings.
    pub fn is_valid(&self) -> bool {
        self.file.is_file() && !self.siblings.is_empty()
    }

    /// Position of the group on the command line (mkvmerge file index).
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn options(&self) -> &TrackOptions {
        &self.options
    }

    /// The file named on the command line.
    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn directory(&self) -> &Path {
        self.file.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Files sharing the reference file's suffix, in batch order.
    pub fn siblings(&self) -> &[PathBuf] {
        &self.siblings
    }

    pub fn len(&self) -> usize {
        self.siblings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::mkv::track_options::Translation;

    #[test]
    fn reads_siblings_of_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["ep01.mkv", "ep02.mkv", "ep03.mkv"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let options = TrackOptions::parse("--language 0:eng").unwrap();
        let group = SourceGroup::new(0, options, dir.path().join("ep02.mkv"));

        assert!(group.is_valid());
        assert_eq!(group.len(), 3);
        assert_eq!(group.siblings()[0], dir.path().join("ep01.mkv"));
        assert_eq!(group.directory(), dir.path());
        assert_eq!(group.options().str_options(&Translation::new()), "--language 0:eng");
    }

    #[test]
    fn missing_file_is_invalid() {
        let group = SourceGroup::new(1, TrackOptions::default(), "/does/not/exist.mkv");
        assert!(!group.is_valid());
        assert!(group.is_empty());
    }
}
