//! Track inspection using `mkvmerge -J`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use tracing::debug;

use crate::error::InspectError;

use super::track::{MediaStructure, TrackDescriptor, TrackType};

/// Reads the track layout of a media file.
#[cfg_attr(test, mockall::automock)]
pub trait TrackInspector {
    /// Returns the ordered track layout of `path`.
    fn inspect(&self, path: &Path) -> Result<MediaStructure, InspectError>;
}

/// Inspector backed by mkvmerge's JSON identification output.
#[derive(Debug, Clone)]
pub struct MkvmergeInspector {
    mkvmerge: PathBuf,
}

impl MkvmergeInspector {
    /// Creates an inspector that runs the given mkvmerge executable.
    pub fn new(mkvmerge: impl Into<PathBuf>) -> Self {
        Self {
            mkvmerge: mkvmerge.into(),
        }
    }
}

impl TrackInspector for MkvmergeInspector {
    fn inspect(&self, path: &Path) -> Result<MediaStructure, InspectError> {
        if !path.is_file() {
            return Err(InspectError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            });
        }

        let output = Command::new(&self.mkvmerge)
            .arg("-J")
            .arg(path)
            .output()
            .map_err(|e| InspectError::CommandFailed {
                command: format!("{} -J", self.mkvmerge.display()),
                message: e.to_string(),
            })?;

        // mkvmerge returns 0 for success, 1 for warnings, 2 for errors
        if output.status.code().unwrap_or(2) >= 2 && output.stdout.is_empty() {
            return Err(InspectError::CommandFailed {
                command: format!("{} -J", self.mkvmerge.display()),
                message: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        debug!(path = %path.display(), "Read mkvmerge identification");
        parse_identification(&output.stdout, path)
    }
}

#[derive(Debug, Deserialize)]
struct Identification {
    #[serde(default)]
    container: Option<IdentContainer>,
    #[serde(default)]
    tracks: Vec<IdentTrack>,
}

#[derive(Debug, Deserialize)]
struct IdentContainer {
    #[serde(default)]
    recognized: bool,
    #[serde(rename = "type", default)]
    type_: Option<String>,
    #[serde(default)]
    properties: IdentContainerProperties,
}

#[derive(Debug, Deserialize, Default)]
struct IdentContainerProperties {
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentTrack {
    id: i64,
    #[serde(rename = "type")]
    type_: String,
    #[serde(default)]
    codec: String,
    #[serde(default)]
    properties: IdentTrackProperties,
}

#[derive(Debug, Deserialize, Default)]
struct IdentTrackProperties {
    #[serde(default)]
    codec_id: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    default_track: bool,
    #[serde(default)]
    forced_track: bool,
    #[serde(default)]
    track_name: Option<String>,
}

/// Parses `mkvmerge -J` output into a [`MediaStructure`].
pub fn parse_identification(json: &[u8], path: &Path) -> Result<MediaStructure, InspectError> {
    let ident: Identification =
        serde_json::from_slice(json).map_err(|e| InspectError::ParseFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let container = match ident.container {
        Some(c) if c.recognized => c,
        _ => {
            return Err(InspectError::Unrecognized {
                path: path.to_path_buf(),
            })
        }
    };

    let container_type = container.type_.unwrap_or_else(|| "unknown".to_string());
    let mut structure = MediaStructure::new(path, container_type.clone(), container_type);
    structure.title = container
        .properties
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    structure.tracks = ident
        .tracks
        .into_iter()
        .map(|track| TrackDescriptor {
            order: track.id,
            track_type: match track.type_.as_str() {
                "video" => TrackType::Video,
                "audio" => TrackType::Audio,
                "subtitles" => TrackType::Subtitle,
                _ => TrackType::Other,
            },
            language: track
                .properties
                .language
                .unwrap_or_else(|| "und".to_string()),
            codec: track
                .properties
                .codec_id
                .unwrap_or_else(|| track.codec.clone()),
            format: track.codec,
            default_flag: track.properties.default_track,
            forced_flag: track.properties.forced_track,
            title: track.properties.track_name,
        })
        .collect();

    Ok(structure)
}

/// Memoizes inspections for the lifetime of one command's processing.
pub struct InspectCache<'a> {
    inner: &'a dyn TrackInspector,
    cache: RefCell<HashMap<PathBuf, MediaStructure>>,
}

impl<'a> InspectCache<'a> {
    pub fn new(inner: &'a dyn TrackInspector) -> Self {
        Self {
            inner,
            cache: RefCell::new(HashMap::new()),
        }
    }
}

impl TrackInspector for InspectCache<'_> {
    fn inspect(&self, path: &Path) -> Result<MediaStructure, InspectError> {
        if let Some(hit) = self.cache.borrow().get(path) {
            return Ok(hit.clone());
        }

        let structure = self.inner.inspect(path)?;
        self.cache
            .borrow_mut()
            .insert(path.to_path_buf(), structure.clone());
        Ok(structure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "container": {
            "properties": { "title": " Episode One " },
            "recognized": true,
            "supported": true,
            "type": "Matroska"
        },
        "tracks": [
            {
                "codec": "AVC/H.264/MPEG-4p10",
                "id": 0,
                "properties": { "codec_id": "V_MPEG4/ISO/AVC", "default_track": true, "language": "und" },
                "type": "video"
            },
            {
                "codec": "AAC",
                "id": 1,
                "properties": { "codec_id": "A_AAC", "language": "eng", "track_name": "Stereo" },
                "type": "audio"
            },
            {
                "codec": "SubRip/SRT",
                "id": 2,
                "properties": { "codec_id": "S_TEXT/UTF8", "forced_track": true },
                "type": "subtitles"
            }
        ]
    }"#;

    #[test]
    fn parses_tracks_and_container() {
        let structure = parse_identification(SAMPLE.as_bytes(), Path::new("/src/ep01.mkv")).unwrap();

        assert_eq!(structure.format, "Matroska");
        assert_eq!(structure.title.as_deref(), Some("Episode One"));
        assert_eq!(structure.len(), 3);

        let audio = structure.track(1).unwrap();
        assert_eq!(audio.track_type, TrackType::Audio);
        assert_eq!(audio.language, "eng");
        assert_eq!(audio.codec, "A_AAC");
        assert_eq!(audio.format, "AAC");
        assert_eq!(audio.title.as_deref(), Some("Stereo"));

        let subs = structure.track(2).unwrap();
        assert_eq!(subs.track_type, TrackType::Subtitle);
        assert_eq!(subs.language, "und");
        assert!(subs.forced_flag);
    }

    #[test]
    fn unrecognized_container_is_an_error() {
        let json = r#"{ "container": { "recognized": false }, "tracks": [] }"#;
        let err = parse_identification(json.as_bytes(), Path::new("/src/notes.txt")).unwrap_err();
        assert!(matches!(err, InspectError::Unrecognized { .. }));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = parse_identification(b"not json", Path::new("/src/x.mkv")).unwrap_err();
        assert!(matches!(err, InspectError::ParseFailed { .. }));
    }

    #[test]
    fn cache_inspects_each_path_once() {
        let mut mock = MockTrackInspector::new();
        mock.expect_inspect()
            .times(1)
            .returning(|p| Ok(MediaStructure::new(p, "Matroska", "Matroska")));

        let cache = InspectCache::new(&mock);
        let first = cache.inspect(Path::new("/src/ep01.mkv")).unwrap();
        let second = cache.inspect(Path::new("/src/ep01.mkv")).unwrap();
        assert_eq!(first, second);
    }
}
