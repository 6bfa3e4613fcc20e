//! Per-file options of one source group, decomposed by track.
//!
//! Options that precede the file in a `'(' file ')'` clause either apply to
//! the whole file (`--no-subtitles`, `--audio-tracks 0,2`) or to one track
//! (`--language 1:eng`). Track ids can be rewritten through a [`Translation`]
//! when a sibling file stores the same stream under another id.

use std::collections::BTreeMap;

use super::flags::{self, FlagKind};
use super::quoting;
use super::track_order::OrderTranslation;

/// Maps an original track id to the id to emit instead.
pub type Translation = BTreeMap<String, String>;

/// One option as written on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionEntry {
    /// Option without a parameter.
    Switch(String),
    /// Option with a plain parameter, kept verbatim.
    Parameter { flag: String, value: String },
    /// Option with a track id list, `!` inverts the selection.
    TrackList {
        flag: String,
        negated: bool,
        ids: Vec<String>,
    },
    /// Option applying to one track: `TID[:value]`.
    Track {
        flag: String,
        track: String,
        value: Option<String>,
    },
}

impl OptionEntry {
    /// Builds the entry for `flag` from its parameter.
    ///
    /// A track scoped option whose parameter carries no track id is kept as a
    /// plain parameter.
    pub fn new(flag: &str, kind: FlagKind, value: Option<&str>) -> Self {
        let flag = flag.to_string();
        match (kind, value) {
            (FlagKind::TrackScoped, Some(value)) => match flags::split_track_value(value) {
                Some((track, rest)) => OptionEntry::Track {
                    flag,
                    track: track.to_string(),
                    value: rest.map(str::to_string),
                },
                None => OptionEntry::Parameter {
                    flag,
                    value: value.to_string(),
                },
            },
            (FlagKind::TrackList, Some(value)) => {
                let (negated, list) = match value.strip_prefix('!') {
                    Some(list) => (true, list),
                    None => (false, value),
                };
                OptionEntry::TrackList {
                    flag,
                    negated,
                    ids: list.split(',').map(str::to_string).collect(),
                }
            }
            (_, Some(value)) => OptionEntry::Parameter {
                flag,
                value: value.to_string(),
            },
            (_, None) => OptionEntry::Switch(flag),
        }
    }

    pub fn flag(&self) -> &str {
        match self {
            OptionEntry::Switch(flag) => flag,
            OptionEntry::Parameter { flag, .. }
            | OptionEntry::TrackList { flag, .. }
            | OptionEntry::Track { flag, .. } => flag,
        }
    }

    /// Track id for track scoped entries.
    pub fn track(&self) -> Option<&str> {
        match self {
            OptionEntry::Track { track, .. } => Some(track),
            _ => None,
        }
    }

    /// Arguments for this entry with track ids passed through `translation`.
    pub fn args(&self, translation: &Translation) -> Vec<String> {
        let translate = |id: &String| translation.get(id).cloned().unwrap_or_else(|| id.clone());
        match self {
            OptionEntry::Switch(flag) => vec![flag.clone()],
            OptionEntry::Parameter { flag, value } => vec![flag.clone(), value.clone()],
            OptionEntry::TrackList { flag, negated, ids } => {
                let list = ids.iter().map(translate).collect::<Vec<_>>().join(",");
                let list = if *negated { format!("!{}", list) } else { list };
                vec![flag.clone(), list]
            }
            OptionEntry::Track { flag, track, value } => {
                let track = translate(track);
                let parameter = match value {
                    Some(value) => format!("{}:{}", track, value),
                    None => track,
                };
                vec![flag.clone(), parameter]
            }
        }
    }
}

/// Options of one source group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackOptions {
    entries: Vec<OptionEntry>,
}

impl TrackOptions {
    pub fn new(entries: Vec<OptionEntry>) -> Self {
        Self { entries }
    }

    /// Parses an option string such as `--language 0:eng --track-name '0:Main'`.
    ///
    /// Returns `None` when the string cannot be split or an option is missing
    /// its parameter.
    pub fn parse(options: &str) -> Option<Self> {
        let args = quoting::split_command(options)?;
        let mut entries = Vec::new();
        let mut i = 0;
        while i < args.len() {
            let flag = &args[i];
            let next = args.get(i + 1).map(String::as_str);
            let kind = match flags::kind(flag) {
                Some(kind) if kind.is_per_file() => kind,
                Some(FlagKind::GlobalParameter) => FlagKind::Parameter,
                Some(_) => FlagKind::Switch,
                None => flags::guess_kind(next),
            };
            let value = if kind.takes_parameter() {
                i += 1;
                Some(next?)
            } else {
                None
            };
            entries.push(OptionEntry::new(flag, kind, value));
            i += 1;
        }
        Some(Self { entries })
    }

    pub fn entries(&self) -> &[OptionEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Track ids in order of first appearance.
    pub fn tracks(&self) -> Vec<&str> {
        let mut tracks: Vec<&str> = Vec::new();
        for track in self.entries.iter().filter_map(OptionEntry::track) {
            if !tracks.contains(&track) {
                tracks.push(track);
            }
        }
        tracks
    }

    /// Options that apply to the whole file.
    pub fn general(&self) -> impl Iterator<Item = &OptionEntry> {
        self.entries.iter().filter(|e| e.track().is_none())
    }

    /// Options attached to `track`, in command line order.
    pub fn options_for<'a>(&'a self, track: &'a str) -> impl Iterator<Item = &'a OptionEntry> {
        self.entries.iter().filter(move |e| e.track() == Some(track))
    }

    /// Track name set on the command line for `track`.
    pub fn track_name(&self, track: &str) -> Option<&str> {
        self.entries.iter().find_map(|e| match e {
            OptionEntry::Track {
                flag,
                track: id,
                value,
            } if flag == "--track-name" && id == track => value.as_deref(),
            _ => None,
        })
    }

    /// Number of `--language` options.
    pub fn language_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.flag() == "--language" && e.track().is_some())
            .count()
    }

    /// Re-serializes to arguments: general options first, then one block per
    /// track in order of first appearance, ids passed through `translation`.
    pub fn args(&self, translation: &Translation) -> Vec<String> {
        let mut args: Vec<String> = self.general().flat_map(|e| e.args(translation)).collect();
        for track in self.tracks() {
            for entry in self.options_for(track) {
                args.extend(entry.args(translation));
            }
        }
        args
    }

    /// Same as [`TrackOptions::args`], shell quoted into one string.
    pub fn str_options(&self, translation: &Translation) -> String {
        quoting::join_args(&self.args(translation))
    }

    /// Track order translation for the file at `file_index`.
    pub fn order_translation(file_index: usize, translation: &Translation) -> OrderTranslation {
        translation
            .iter()
            .map(|(old, new)| ((file_index, old.clone()), new.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translation(pairs: &[(&str, &str)]) -> Translation {
        pairs.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
    }

    #[test]
    fn groups_options_by_track() {
        let options = TrackOptions::parse(
            "--no-subtitles --language 0:eng --track-name '0:Main audio' --language 1:spa --default-track-flag 0",
        )
        .unwrap();

        assert_eq!(options.tracks(), ["0", "1"]);
        assert_eq!(options.general().count(), 1);
        assert_eq!(options.options_for("0").count(), 3);
        assert_eq!(options.track_name("0"), Some("Main audio"));
        assert_eq!(options.language_count(), 2);
    }

    #[test]
    fn renders_general_then_track_blocks() {
        let options = TrackOptions::parse("--language 1:spa --no-chapters --language 0:eng --default-track-flag 1").unwrap();
        assert_eq!(
            options.str_options(&Translation::new()),
            "--no-chapters --language 1:spa --default-track-flag 1 --language 0:eng"
        );
    }

    #[test]
    fn translation_rewrites_track_ids_and_lists() {
        let options = TrackOptions::parse(
            "--audio-tracks 0,2 --language 0:eng --track-name \"0:Director's cut\" --language 2:spa",
        )
        .unwrap();
        let rendered = options.args(&translation(&[("0", "1")]));

        assert_eq!(
            rendered,
            [
                "--audio-tracks",
                "1,2",
                "--language",
                "1:eng",
                "--track-name",
                "1:Director's cut",
                "--language",
                "2:spa"
            ]
        );
        assert_eq!(
            options.str_options(&translation(&[("0", "1")])),
            r"--audio-tracks 1,2 --language 1:eng --track-name '1:Director'\''s cut' --language 2:spa"
        );
    }

    #[test]
    fn negated_lists_keep_their_marker() {
        let options = TrackOptions::parse("--subtitle-tracks '!3,4'").unwrap();
        assert_eq!(options.args(&translation(&[("3", "5")]))[1], "!5,4");
    }

    #[test]
    fn track_id_without_value() {
        let options = TrackOptions::parse("--forced-display-flag 2").unwrap();
        assert_eq!(options.tracks(), ["2"]);
        assert_eq!(options.args(&translation(&[("2", "3")])), ["--forced-display-flag", "3"]);
    }

    #[test]
    fn missing_parameter_fails() {
        assert!(TrackOptions::parse("--language").is_none());
    }

    #[test]
    fn order_translation_is_scoped_to_file() {
        let order = TrackOptions::order_translation(1, &translation(&[("0", "2")]));
        assert_eq!(order.get(&(1, "0".to_string())), Some(&"2".to_string()));
        assert_eq!(order.len(), 1);
    }
}
