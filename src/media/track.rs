//! Track descriptors, media file structures, and the structural comparisons
//! used to decide whether two files can share one command template.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Kind of elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackType {
    Video,
    Audio,
    Subtitle,
    #[default]
    Other,
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackType::Video => "Video",
            TrackType::Audio => "Audio",
            TrackType::Subtitle => "Text",
            TrackType::Other => "Other",
        };
        f.write_str(name)
    }
}

/// First property found to differ between two tracks at the same position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackMismatch {
    Order,
    Type,
    Language,
    Codec,
    Format,
}

impl TrackMismatch {
    /// Short label used in analysis messages.
    pub fn label(&self) -> &'static str {
        match self {
            TrackMismatch::Order => "Stream order",
            TrackMismatch::Type => "Stream type",
            TrackMismatch::Language => "Stream language",
            TrackMismatch::Codec => "Codec",
            TrackMismatch::Format => "Stream format",
        }
    }
}

/// One elementary stream inside a media file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    /// Position within the container (mkvmerge track id).
    pub order: i64,
    /// Stream kind.
    pub track_type: TrackType,
    /// ISO 639-2 language code, `und` when unknown.
    pub language: String,
    /// Codec identifier (e.g. `V_MPEG4/ISO/AVC`).
    pub codec: String,
    /// Human readable format (e.g. `AVC/H.264/MPEG-4p10`).
    pub format: String,
    /// Default track flag.
    pub default_flag: bool,
    /// Forced display flag.
    pub forced_flag: bool,
    /// Track name, if any.
    pub title: Option<String>,
}

impl TrackDescriptor {
    /// Sentinel used when a sibling has fewer tracks than the base file.
    ///
    /// It never compares equal to a real track.
    pub fn empty() -> Self {
        Self {
            order: -1,
            track_type: TrackType::Other,
            language: String::new(),
            codec: String::new(),
            format: String::new(),
            default_flag: false,
            forced_flag: false,
            title: None,
        }
    }

    /// Returns the first property that differs from `other`, comparing in
    /// priority order: order, type, language, codec, format.
    ///
    /// Language and codec differences are ignored for AVI containers,
    /// language differences for video tracks and codec differences for
    /// audio tracks.
    pub fn mismatch(&self, other: &TrackDescriptor, avi: bool) -> Option<TrackMismatch> {
        if self.order != other.order {
            Some(TrackMismatch::Order)
        } else if self.track_type != other.track_type {
            Some(TrackMismatch::Type)
        } else if self.language != other.language && !avi && self.track_type != TrackType::Video {
            Some(TrackMismatch::Language)
        } else if self.codec != other.codec && self.track_type != TrackType::Audio && !avi {
            Some(TrackMismatch::Codec)
        } else if self.format != other.format {
            Some(TrackMismatch::Format)
        } else {
            None
        }
    }

    /// Position-aware equality under the structural rules.
    pub fn matches(&self, other: &TrackDescriptor, avi: bool) -> bool {
        self.mismatch(other, avi).is_none()
    }

    /// Relaxed equality that ignores the position in the container.
    pub fn is_similar(&self, other: &TrackDescriptor, avi: bool) -> bool {
        self.track_type == other.track_type
            && (avi || self.track_type == TrackType::Video || self.language == other.language)
            && (avi || self.track_type == TrackType::Audio || self.codec == other.codec)
            && self.format == other.format
    }
}

impl fmt::Display for TrackDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order: {:>2} - {:>5} - Codec: {} - Language: {:>4} - Format: {}",
            self.order, self.track_type, self.codec, self.language, self.format
        )?;
        if let Some(title) = &self.title {
            write!(f, " - Title: {}", title)?;
        }
        Ok(())
    }
}

/// Ordered track layout of one media file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaStructure {
    /// File the structure was read from.
    pub path: PathBuf,
    /// Container codec.
    pub codec: String,
    /// Container format (e.g. `Matroska`, `AVI`).
    pub format: String,
    /// Container title, if any.
    pub title: Option<String>,
    /// Tracks in container order.
    pub tracks: Vec<TrackDescriptor>,
}

impl MediaStructure {
    /// Creates a structure with no tracks.
    pub fn new(path: impl Into<PathBuf>, codec: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            codec: codec.into(),
            format: format.into(),
            title: None,
            tracks: Vec::new(),
        }
    }

    /// Appends a track.
    pub fn with_track(mut self, track: TrackDescriptor) -> Self {
        self.tracks.push(track);
        self
    }

    /// File name component used in messages.
    pub fn file_name(&self) -> String {
        file_name(&self.path)
    }

    /// AVI containers are exempt from language and codec comparison.
    pub fn is_avi(&self) -> bool {
        self.format.eq_ignore_ascii_case("AVI")
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn track(&self, index: usize) -> Option<&TrackDescriptor> {
        self.tracks.get(index)
    }

    /// Structural equality: same container codec, same number of tracks, and
    /// every track matching at its position.
    ///
    /// `self` is the base file; its container format decides the AVI exemption.
    pub fn structurally_equal(&self, other: &MediaStructure) -> bool {
        if self.codec != other.codec || self.len() != other.len() {
            return false;
        }

        let avi = self.is_avi();
        self.tracks
            .iter()
            .zip(&other.tracks)
            .all(|(a, b)| a.matches(b, avi))
    }

    /// Finds the first track similar to `target`, ignoring position.
    pub fn find_similar(&self, target: &TrackDescriptor, avi: bool) -> Option<(usize, &TrackDescriptor)> {
        self.find_similar_excluding(target, avi, &[])
    }

    /// Like [`MediaStructure::find_similar`], skipping the positions in
    /// `taken`.
    pub fn find_similar_excluding(
        &self,
        target: &TrackDescriptor,
        avi: bool,
        taken: &[usize],
    ) -> Option<(usize, &TrackDescriptor)> {
        self.tracks
            .iter()
            .enumerate()
            .filter(|(index, _)| !taken.contains(index))
            .find(|(_, track)| target.is_similar(track, avi))
    }
}

impl fmt::Display for MediaStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File Name: {}", self.path.display())?;
        writeln!(f, "File Format: -{}-", self.format)?;
        for (index, track) in self.tracks.iter().enumerate() {
            writeln!(f, "Track: {:>2} {}", index, track)?;
        }
        Ok(())
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn track(order: i64, track_type: TrackType, language: &str, codec: &str) -> TrackDescriptor {
        TrackDescriptor {
            order,
            track_type,
            language: language.to_string(),
            codec: codec.to_string(),
            format: codec.to_string(),
            default_flag: false,
            forced_flag: false,
            title: None,
        }
    }

    fn episode(format: &str, audio_language: &str, video_codec: &str) -> MediaStructure {
        MediaStructure::new("/src/ep.mkv", format, format)
            .with_track(track(0, TrackType::Video, "und", video_codec))
            .with_track(track(1, TrackType::Audio, audio_language, "A_AAC"))
    }

    #[test]
    fn equality_is_reflexive() {
        let a = episode("Matroska", "eng", "V_MPEG4/ISO/AVC");
        assert!(a.structurally_equal(&a));
    }

    #[test]
    fn avi_ignores_language_and_codec() {
        let mut base = episode("AVI", "eng", "V_MS/VFW/FOURCC");
        let mut other = episode("AVI", "spa", "V_MPEG4/ISO/AVC");
        // Format still has to agree.
        other.tracks[0].format = base.tracks[0].format.clone();
        assert!(base.structurally_equal(&other));

        base.format = "Matroska".to_string();
        base.codec = "Matroska".to_string();
        other.format = "Matroska".to_string();
        other.codec = "Matroska".to_string();
        assert!(!base.structurally_equal(&other));
    }

    #[test]
    fn audio_codec_difference_is_tolerated() {
        let a = TrackDescriptor {
            format: "AAC".to_string(),
            ..track(1, TrackType::Audio, "eng", "A_AAC")
        };
        let b = TrackDescriptor {
            codec: "A_AAC/MPEG4/LC".to_string(),
            ..a.clone()
        };
        assert!(a.matches(&b, false));
        assert_eq!(a.mismatch(&b, false), None);
    }

    #[test]
    fn mismatch_reports_first_difference() {
        let a = track(0, TrackType::Audio, "eng", "A_AAC");
        let b = track(1, TrackType::Subtitle, "spa", "S_TEXT/UTF8");
        assert_eq!(a.mismatch(&b, false), Some(TrackMismatch::Order));

        let c = track(0, TrackType::Audio, "spa", "A_AAC");
        assert_eq!(a.mismatch(&c, false), Some(TrackMismatch::Language));
    }

    #[test]
    fn container_codec_and_count_checked_first() {
        let a = episode("Matroska", "eng", "V_MPEG4/ISO/AVC");
        let mut b = a.clone();
        b.codec = "MPEG-4".to_string();
        assert!(!a.structurally_equal(&b));

        let c = a.clone().with_track(track(2, TrackType::Subtitle, "eng", "S_TEXT/UTF8"));
        assert!(!a.structurally_equal(&c));
    }

    #[test]
    fn find_similar_ignores_position() {
        let sibling = MediaStructure::new("/src/ep02.mkv", "Matroska", "Matroska")
            .with_track(track(0, TrackType::Audio, "spa", "A_AAC"))
            .with_track(track(1, TrackType::Audio, "eng", "A_AAC"));
        let wanted = track(0, TrackType::Audio, "eng", "A_AAC");

        let (index, found) = sibling.find_similar(&wanted, false).unwrap();
        assert_eq!(index, 1);
        assert_eq!(found.language, "eng");

        let missing = track(0, TrackType::Audio, "jpn", "A_AAC");
        assert!(sibling.find_similar(&missing, false).is_none());
    }

    #[test]
    fn video_language_is_not_compared() {
        let base = episode("Matroska", "eng", "V_MPEG4/ISO/AVC");
        let mut other = base.clone();
        other.tracks[0].language = "jpn".to_string();

        assert!(base.structurally_equal(&other));
        assert!(base.tracks[0].is_similar(&other.tracks[0], false));

        other.tracks[1].language = "jpn".to_string();
        assert!(!base.structurally_equal(&other));
    }

    #[test]
    fn empty_sentinel_never_matches() {
        let real = track(0, TrackType::Audio, "eng", "A_AAC");
        assert!(!real.matches(&TrackDescriptor::empty(), false));
    }
}
