//! File system helpers: batch sibling discovery, output name collisions and
//! locating the mkvmerge executable.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Returns every file in `reference`'s directory that shares its suffix,
/// in natural order.
///
/// The order defines the batch index sequence.
pub fn sibling_files(reference: &Path) -> Vec<PathBuf> {
    let dir = match reference.parent() {
        Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let suffix = reference
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let files: Vec<PathBuf> = list(&dir, &suffix).into_iter().filter(|p| p.is_file()).collect();
    debug!(reference = %reference.display(), count = files.len(), "Read sibling files");
    files
}

/// Entries directly inside `dir`, files and directories, in natural order.
pub fn directory_entries(dir: &Path) -> Vec<PathBuf> {
    list(dir, "")
}

fn list(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    let pattern = format!(
        "{}/*{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        glob::Pattern::escape(suffix)
    );

    let mut entries: Vec<PathBuf> = match glob::glob(&pattern) {
        Ok(paths) => paths
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    None
                }
            })
            .collect(),
        Err(e) => {
            warn!(pattern = %pattern, error = %e, "Bad directory pattern");
            Vec::new()
        }
    };

    entries.sort_by(|a, b| natural_cmp(a, b));
    entries
}

/// Natural, case-insensitive ordering of paths (`ep2` before `ep10`).
pub fn natural_cmp(a: &Path, b: &Path) -> Ordering {
    let a = a.to_string_lossy();
    let b = b.to_string_lossy();
    natord::compare_ignore_case(&a, &b).then_with(|| natord::compare(&a, &b))
}

/// Returns a name that does not collide with an existing file.
///
/// `X.mkv` becomes `new-X.mkv`, then `new-X (1).mkv`, `new-X (2).mkv`, and
/// so on until the name is free.
pub fn resolve_overwrite(file_name: &Path, prefix: &str) -> PathBuf {
    if !file_name.is_file() {
        return file_name.to_path_buf();
    }

    let parent = file_name.parent().unwrap_or_else(|| Path::new(""));
    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = file_name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut candidate = parent.join(format!("{}{}{}", prefix, stem, extension));
    let mut n = 1;
    while candidate.is_file() {
        candidate = parent.join(format!("{}{} ({}){}", prefix, stem, n, extension));
        n += 1;
    }

    candidate
}

/// Locates the mkvmerge executable in the standard install locations.
pub fn locate_mkvmerge() -> Option<PathBuf> {
    if cfg!(target_os = "macos") {
        if let Ok(bundles) = glob::glob("/Applications/MKVToolNix*") {
            for bundle in bundles.flatten() {
                let candidate = bundle.join("Contents/MacOS/mkvmerge");
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
    } else if cfg!(windows) {
        for var in ["ProgramFiles", "ProgramFiles(x86)"] {
            let Ok(dir) = std::env::var(var) else {
                continue;
            };
            let pattern = format!("{}/*/mkvmerge.exe", glob::Pattern::escape(&dir));
            if let Ok(found) = glob::glob(&pattern) {
                let mut found: Vec<PathBuf> = found.flatten().filter(|p| p.is_file()).collect();
                found.sort();
                if let Some(first) = found.into_iter().next() {
                    return Some(first);
                }
            }
        }
    }

    which::which("mkvmerge").ok().filter(|p| p.is_file())
}
