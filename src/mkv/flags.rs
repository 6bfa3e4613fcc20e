//! The mkvmerge option table.
//!
//! Every option the parser understands is listed here once, together with its
//! scope and arity. Parsing, track id translation and re-serialization all
//! read this table. It follows the mkvmerge manual and should be cross-checked
//! when targeting a new mkvmerge release.

/// Scope and arity of an mkvmerge option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    /// Per-file option without a parameter (`--no-audio`).
    Switch,
    /// Per-file option with one plain parameter (`--chapter-charset UTF-8`).
    Parameter,
    /// Per-file option whose parameter is a track id list (`--audio-tracks 0,2`).
    TrackList,
    /// Per-file option whose parameter is `TID[:value]` (`--language 0:eng`).
    TrackScoped,
    /// Global option without a parameter.
    GlobalSwitch,
    /// Global option with one parameter.
    GlobalParameter,
}

impl FlagKind {
    /// True when the option consumes the following argument.
    pub fn takes_parameter(&self) -> bool {
        !matches!(self, FlagKind::Switch | FlagKind::GlobalSwitch)
    }

    /// True when the option applies to the next source file only.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            FlagKind::Switch | FlagKind::Parameter | FlagKind::TrackList | FlagKind::TrackScoped
        )
    }
}

/// One entry of the option table.
#[derive(Debug, Clone, Copy)]
pub struct FlagSpec {
    pub name: &'static str,
    pub kind: FlagKind,
}

const fn flag(name: &'static str, kind: FlagKind) -> FlagSpec {
    FlagSpec { name, kind }
}

use FlagKind::*;

/// Known mkvmerge options.
pub const FLAGS: &[FlagSpec] = &[
    // Global options
    flag("--output", GlobalParameter),
    flag("-o", GlobalParameter),
    flag("--ui-language", GlobalParameter),
    flag("--priority", GlobalParameter),
    flag("--title", GlobalParameter),
    flag("--default-language", GlobalParameter),
    flag("--command-line-charset", GlobalParameter),
    flag("--output-charset", GlobalParameter),
    flag("--chapters", GlobalParameter),
    flag("--chapter-sync", GlobalParameter),
    flag("--generate-chapters", GlobalParameter),
    flag("--generate-chapters-name-template", GlobalParameter),
    flag("--cue-chapter-name-format", GlobalParameter),
    flag("--global-tags", GlobalParameter),
    flag("--segmentinfo", GlobalParameter),
    flag("--segment-uid", GlobalParameter),
    flag("--track-order", GlobalParameter),
    flag("--attachment-name", GlobalParameter),
    flag("--attachment-mime-type", GlobalParameter),
    flag("--attachment-description", GlobalParameter),
    flag("--attach-file", GlobalParameter),
    flag("--attach-file-once", GlobalParameter),
    flag("--split", GlobalParameter),
    flag("--split-max-files", GlobalParameter),
    flag("--link-to-previous", GlobalParameter),
    flag("--link-to-next", GlobalParameter),
    flag("--append-to", GlobalParameter),
    flag("--append-mode", GlobalParameter),
    flag("--timestamp-scale", GlobalParameter),
    flag("--cluster-length", GlobalParameter),
    flag("--normalize-language-ietf", GlobalParameter),
    flag("--deterministic", GlobalParameter),
    flag("--engage", GlobalParameter),
    flag("--probe-range-percentage", GlobalParameter),
    flag("--link", GlobalSwitch),
    flag("--no-cues", GlobalSwitch),
    flag("--clusters-in-meta-seek", GlobalSwitch),
    flag("--disable-lacing", GlobalSwitch),
    flag("--enable-durations", GlobalSwitch),
    flag("--disable-track-statistics-tags", GlobalSwitch),
    flag("--disable-language-ietf", GlobalSwitch),
    flag("--stop-after-video-ends", GlobalSwitch),
    flag("--no-date", GlobalSwitch),
    flag("--webm", GlobalSwitch),
    flag("-w", GlobalSwitch),
    flag("--flush-on-close", GlobalSwitch),
    flag("--abort-on-warnings", GlobalSwitch),
    flag("--gui-mode", GlobalSwitch),
    flag("--quiet", GlobalSwitch),
    flag("-q", GlobalSwitch),
    flag("--verbose", GlobalSwitch),
    flag("-v", GlobalSwitch),
    // Per-file switches
    flag("--no-audio", Switch),
    flag("-A", Switch),
    flag("--no-video", Switch),
    flag("-D", Switch),
    flag("--no-subtitles", Switch),
    flag("-S", Switch),
    flag("--no-buttons", Switch),
    flag("-B", Switch),
    flag("--no-track-tags", Switch),
    flag("-T", Switch),
    flag("--no-chapters", Switch),
    flag("--no-attachments", Switch),
    flag("-M", Switch),
    flag("--no-global-tags", Switch),
    // Per-file options with a plain parameter
    flag("--chapter-charset", Parameter),
    flag("--chapter-language", Parameter),
    flag("--attachments", Parameter),
    flag("-m", Parameter),
    // Per-file options with a track id list
    flag("--audio-tracks", TrackList),
    flag("-a", TrackList),
    flag("--video-tracks", TrackList),
    flag("-d", TrackList),
    flag("--subtitle-tracks", TrackList),
    flag("-s", TrackList),
    flag("--button-tracks", TrackList),
    flag("-b", TrackList),
    flag("--track-tags", TrackList),
    // Track scoped options
    flag("--language", TrackScoped),
    flag("--track-name", TrackScoped),
    flag("--default-track-flag", TrackScoped),
    flag("--default-track", TrackScoped),
    flag("--forced-display-flag", TrackScoped),
    flag("--forced-track", TrackScoped),
    flag("--track-enabled-flag", TrackScoped),
    flag("--hearing-impaired-flag", TrackScoped),
    flag("--visual-impaired-flag", TrackScoped),
    flag("--text-descriptions-flag", TrackScoped),
    flag("--original-flag", TrackScoped),
    flag("--commentary-flag", TrackScoped),
    flag("--sync", TrackScoped),
    flag("-y", TrackScoped),
    flag("--cues", TrackScoped),
    flag("--blockadd", TrackScoped),
    flag("--tags", TrackScoped),
    flag("-t", TrackScoped),
    flag("--aac-is-sbr", TrackScoped),
    flag("--reduce-to-core", TrackScoped),
    flag("--remove-dialog-normalization-gain", TrackScoped),
    flag("--timestamps", TrackScoped),
    flag("--default-duration", TrackScoped),
    flag("--fix-bitstream-timing-information", TrackScoped),
    flag("--nalu-size-length", TrackScoped),
    flag("--compression", TrackScoped),
    flag("--sub-charset", TrackScoped),
    flag("--fourcc", TrackScoped),
    flag("-f", TrackScoped),
    flag("--display-dimensions", TrackScoped),
    flag("--aspect-ratio", TrackScoped),
    flag("--aspect-ratio-factor", TrackScoped),
    flag("--cropping", TrackScoped),
    flag("--colour-matrix-coefficients", TrackScoped),
    flag("--colour-bits-per-channel", TrackScoped),
    flag("--chroma-subsample", TrackScoped),
    flag("--cb-subsample", TrackScoped),
    flag("--chroma-siting", TrackScoped),
    flag("--colour-range", TrackScoped),
    flag("--colour-transfer-characteristics", TrackScoped),
    flag("--colour-primaries", TrackScoped),
    flag("--max-content-light", TrackScoped),
    flag("--max-frame-light", TrackScoped),
    flag("--chromaticity-coordinates", TrackScoped),
    flag("--white-colour-coordinates", TrackScoped),
    flag("--max-luminance", TrackScoped),
    flag("--min-luminance", TrackScoped),
    flag("--projection-type", TrackScoped),
    flag("--projection-private", TrackScoped),
    flag("--projection-pose-yaw", TrackScoped),
    flag("--projection-pose-pitch", TrackScoped),
    flag("--projection-pose-roll", TrackScoped),
    flag("--field-order", TrackScoped),
    flag("--stereo-mode", TrackScoped),
];

/// Looks up an option by name.
pub fn lookup(name: &str) -> Option<&'static FlagSpec> {
    FLAGS.iter().find(|f| f.name == name)
}

/// Returns the scope of `name`, if known.
pub fn kind(name: &str) -> Option<FlagKind> {
    lookup(name).map(|f| f.kind)
}

/// True for arguments that look like an option rather than a value.
pub fn is_option(arg: &str) -> bool {
    arg.len() > 1 && arg.starts_with('-') && !arg[1..].starts_with(|c: char| c.is_ascii_digit())
}

/// Scope for an option missing from the table, judged by its argument.
///
/// A `TID:value` argument makes it track scoped; any other plain argument is
/// taken as its parameter.
pub fn guess_kind(next: Option<&str>) -> FlagKind {
    match next {
        Some(value) if split_track_value(value).is_some_and(|(_, v)| v.is_some()) => FlagKind::TrackScoped,
        Some(value) if !is_option(value) && value != "(" && value != ")" => FlagKind::Parameter,
        _ => FlagKind::Switch,
    }
}

/// Splits `TID[:value]` into the track id and the optional value.
pub fn split_track_value(value: &str) -> Option<(&str, Option<&str>)> {
    let (id, rest) = match value.split_once(':') {
        Some((id, rest)) => (id, Some(rest)),
        None => (value, None),
    };
    let digits = id.strip_prefix('-').unwrap_or(id);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((id, rest))
}

/// Closest known long option to an unknown one.
pub fn suggest(name: &str) -> Option<&'static str> {
    FLAGS
        .iter()
        .filter(|f| f.name.starts_with("--"))
        .map(|f| (f.name, strsim::levenshtein(name, f.name)))
        .filter(|(_, distance)| *distance <= 3)
        .min_by_key(|(_, distance)| *distance)
        .map(|(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_options() {
        assert_eq!(kind("--language"), Some(FlagKind::TrackScoped));
        assert_eq!(kind("--audio-tracks"), Some(FlagKind::TrackList));
        assert_eq!(kind("--no-subtitles"), Some(FlagKind::Switch));
        assert_eq!(kind("--output"), Some(FlagKind::GlobalParameter));
        assert_eq!(kind("--made-up"), None);
    }

    #[test]
    fn arity_and_scope() {
        assert!(FlagKind::TrackScoped.takes_parameter());
        assert!(!FlagKind::Switch.takes_parameter());
        assert!(FlagKind::TrackList.is_per_file());
        assert!(!FlagKind::GlobalParameter.is_per_file());
    }

    #[test]
    fn negative_numbers_are_values() {
        assert!(is_option("--sync"));
        assert!(is_option("-A"));
        assert!(!is_option("-1:200"));
        assert!(!is_option("-"));
    }

    #[test]
    fn track_values() {
        assert_eq!(split_track_value("0:eng"), Some(("0", Some("eng"))));
        assert_eq!(split_track_value("2"), Some(("2", None)));
        assert_eq!(split_track_value("-1:200"), Some(("-1", Some("200"))));
        assert_eq!(split_track_value("1:Director's cut: part 2"), Some(("1", Some("Director's cut: part 2"))));
        assert_eq!(split_track_value("UTF-8"), None);
    }

    #[test]
    fn unknown_options_are_guessed() {
        assert_eq!(guess_kind(Some("1:yes")), FlagKind::TrackScoped);
        assert_eq!(guess_kind(Some("fast")), FlagKind::Parameter);
        assert_eq!(guess_kind(Some("--language")), FlagKind::Switch);
        assert_eq!(guess_kind(Some("(")), FlagKind::Switch);
        assert_eq!(guess_kind(None), FlagKind::Switch);
    }

    #[test]
    fn suggests_close_names() {
        assert_eq!(suggest("--langauge"), Some("--language"));
        assert_eq!(suggest("--completely-unrelated-option"), None);
    }

    #[test]
    fn names_are_unique() {
        for (i, a) in FLAGS.iter().enumerate() {
            assert!(FLAGS[i + 1..].iter().all(|b| b.name != a.name), "duplicate {}", a.name);
        }
    }
}
