//! Verifies that batch sibling files share the structure of the base files
//! the command line was written against.

use std::path::{Path, PathBuf};

use tracing::{debug, error};

use super::inspect::TrackInspector;
use super::track::{MediaStructure, TrackDescriptor};

/// Outcome of comparing base files against one batch index's source files.
#[derive(Debug, Clone, Default)]
pub struct StructureReport {
    is_ok: bool,
    analysis: Vec<String>,
    matched: Vec<String>,
    unmatched: Vec<String>,
}

impl StructureReport {
    /// True when every pair of files is structurally equal and readable.
    pub fn is_ok(&self) -> bool {
        self.is_ok
    }

    /// Human-readable description of every mismatch found.
    pub fn analysis(&self) -> &[String] {
        &self.analysis
    }

    /// Matched tracks as `"fileIndex:trackIndex"`.
    pub fn matched(&self) -> &[String] {
        &self.matched
    }

    /// Unmatched tracks as `"fileIndex:trackIndex"`.
    pub fn unmatched(&self) -> &[String] {
        &self.unmatched
    }
}

/// Compares every `base_files[i]` with `source_files[i]`.
///
/// Read failures are recorded in the analysis and fail the report; they are
/// never propagated.
pub fn verify_structure(
    base_files: &[PathBuf],
    source_files: &[PathBuf],
    destination: Option<&Path>,
    inspector: &dyn TrackInspector,
) -> StructureReport {
    let mut report = StructureReport {
        is_ok: true,
        ..StructureReport::default()
    };

    for (file_index, (base_file, source_file)) in base_files.iter().zip(source_files).enumerate() {
        let pair = inspector
            .inspect(base_file)
            .and_then(|base| inspector.inspect(source_file).map(|source| (base, source)));

        let (base, source) = match pair {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, "Could not read media file");
                report.analysis.push(format!("Error: \n{}\n", e));
                report.is_ok = false;
                continue;
            }
        };

        if base.structurally_equal(&source) {
            debug!(
                source = %source.file_name(),
                base = %base.file_name(),
                "Structure seems ok"
            );
            report
                .matched
                .extend((0..base.len()).map(|track| format!("{}:{}", file_index, track)));
            continue;
        }

        let header = match destination {
            Some(dest) => format!("Error: In structure\nDestination File: {}\n\n", dest.display()),
            None => "Error: In structure\n\n".to_string(),
        };
        report
            .analysis
            .push(format!("{}Source:\n{}\n\nBase Source:\n{}\n", header, source, base));
        report.is_ok = false;
        let details = detail_analysis(&base, &source, file_index, &mut report);

        error!(
            source = %source.file_name(),
            base = %base.file_name(),
            "Structure not ok"
        );
        for line in &details {
            error!("{}", line.trim());
        }
        report.analysis.extend(details);
    }

    report
}

/// Mismatch lines for one pair of files. Track ids go straight into the
/// report's matched and unmatched lists.
fn detail_analysis(
    base: &MediaStructure,
    source: &MediaStructure,
    file_index: usize,
    report: &mut StructureReport,
) -> Vec<String> {
    let base_name = base.file_name();
    let source_name = source.file_name();

    if base.codec != source.codec {
        return vec![format!(
            "Codec mismatched {}: {} - {}: {}\n",
            base_name, base.codec, source_name, source.codec
        )];
    }

    if base.len() != source.len() {
        return vec![format!(
            "Number of tracks mismatched {}: {} - {}: {}\n",
            base_name,
            base.len(),
            source_name,
            source.len()
        )];
    }

    let mut lines = Vec::new();
    let avi = base.is_avi();
    for (track_index, (b, s)) in base.tracks.iter().zip(&source.tracks).enumerate() {
        let reference = format!("{}:{}", file_index, track_index);
        match b.mismatch(s, avi) {
            None => report.matched.push(reference),
            Some(kind) => {
                lines.push(format!(
                    "Track {}: {} mismatched \nSource: {}\n  Base: {}\n",
                    track_index,
                    kind.label(),
                    describe(s),
                    describe(b)
                ));
                report.unmatched.push(reference);
            }
        }
    }
    lines
}

fn describe(track: &TrackDescriptor) -> String {
    format!(
        "{}:{}:{}:{}",
        track.order, track.language, track.codec, track.format
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::InspectError;
    use crate::media::track::tests::track;
    use crate::media::track::TrackType;

    struct Fixtures(HashMap<PathBuf, MediaStructure>);

    impl TrackInspector for Fixtures {
        fn inspect(&self, path: &Path) -> Result<MediaStructure, InspectError> {
            self.0.get(path).cloned().ok_or_else(|| InspectError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            })
        }
    }

    fn file(path: &str, audio_language: &str) -> MediaStructure {
        MediaStructure::new(path, "Matroska", "Matroska")
            .with_track(track(0, TrackType::Video, "und", "V_MPEG4/ISO/AVC"))
            .with_track(track(1, TrackType::Audio, audio_language, "A_AAC"))
    }

    fn fixtures() -> Fixtures {
        let mut map = HashMap::new();
        for (path, language) in [("/s/ep01.mkv", "eng"), ("/s/ep02.mkv", "eng"), ("/s/ep03.mkv", "spa")] {
            map.insert(PathBuf::from(path), file(path, language));
        }
        Fixtures(map)
    }

    #[test]
    fn equal_files_match_every_track() {
        let report = verify_structure(
            &[PathBuf::from("/s/ep01.mkv")],
            &[PathBuf::from("/s/ep02.mkv")],
            None,
            &fixtures(),
        );

        assert!(report.is_ok());
        assert!(report.analysis().is_empty());
        assert_eq!(report.matched(), ["0:0", "0:1"]);
        assert!(report.unmatched().is_empty());
    }

    #[test]
    fn language_mismatch_is_detailed() {
        let report = verify_structure(
            &[PathBuf::from("/s/ep01.mkv")],
            &[PathBuf::from("/s/ep03.mkv")],
            Some(Path::new("/out/ep03.mkv")),
            &fixtures(),
        );

        assert!(!report.is_ok());
        assert!(report.analysis()[0].contains("Destination File: /out/ep03.mkv"));
        assert!(report.analysis()[1].contains("Stream language mismatched"));
        assert_eq!(report.matched(), ["0:0"]);
        assert_eq!(report.unmatched(), ["0:1"]);
    }

    #[test]
    fn each_pair_reports_only_its_own_details() {
        let fixtures = fixtures();
        let base = fixtures.inspect(Path::new("/s/ep01.mkv")).unwrap();
        let source = fixtures.inspect(Path::new("/s/ep03.mkv")).unwrap();

        let mut report = StructureReport::default();
        report.analysis.push("earlier pair".to_string());
        let details = detail_analysis(&base, &source, 1, &mut report);

        assert_eq!(details.len(), 1);
        assert!(details[0].starts_with("Track 1: Stream language mismatched"));
        assert_eq!(report.unmatched(), ["1:1"]);

        let report = verify_structure(
            &[PathBuf::from("/s/ep01.mkv"), PathBuf::from("/s/ep01.mkv")],
            &[PathBuf::from("/s/ep03.mkv"), PathBuf::from("/s/ep03.mkv")],
            None,
            &fixtures,
        );
        assert_eq!(report.analysis().len(), 4);
        assert!(report.analysis()[2].starts_with("Error: In structure"));
        assert!(report.analysis()[3].starts_with("Track 1:"));
    }

    #[test]
    fn unreadable_file_fails_without_panicking() {
        let report = verify_structure(
            &[PathBuf::from("/s/ep01.mkv"), PathBuf::from("/s/missing.mkv")],
            &[PathBuf::from("/s/ep02.mkv"), PathBuf::from("/s/ep02.mkv")],
            None,
            &fixtures(),
        );

        assert!(!report.is_ok());
        assert_eq!(report.analysis().len(), 1);
        assert!(report.analysis()[0].starts_with("Error:"));
        assert_eq!(report.matched().len(), 2);
    }
}
