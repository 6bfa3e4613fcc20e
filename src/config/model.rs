//! Configuration data structures.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration. Every field has a default, so an empty file or no
/// file at all is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,

    /// mkvmerge used for inspection and `locate`. Searched for when unset.
    #[serde(default)]
    pub mkvmerge: Option<PathBuf>,

    /// Prefix for output files that already exist.
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,

    /// Compare every sibling with the base files before running.
    #[serde(default = "default_true")]
    pub verify_structure: bool,

    /// Try to repoint track options when a sibling's layout differs.
    #[serde(default = "default_true")]
    pub adjust_tracks: bool,

    /// Use the container title of each source file as the output title.
    #[serde(default)]
    pub titles_from_source: bool,

    /// Require the executable named in the command line to exist.
    #[serde(default = "default_true")]
    pub check_executable: bool,

    /// Stop the batch at the first failed command.
    #[serde(default)]
    pub stop_on_error: bool,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            mkvmerge: None,
            output_prefix: default_output_prefix(),
            verify_structure: true,
            adjust_tracks: true,
            titles_from_source: false,
            check_executable: true,
            stop_on_error: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_output_prefix() -> String {
    "new-".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.output_prefix, "new-");
        assert!(config.verify_structure);
        assert!(config.adjust_tracks);
        assert!(!config.titles_from_source);
        assert!(config.check_executable);
        assert!(!config.stop_on_error);
        assert!(config.mkvmerge.is_none());
    }

    #[test]
    fn parses_every_field() {
        let yaml = r#"
log_level: debug
log_format: json
mkvmerge: /opt/mkvtoolnix/mkvmerge
output_prefix: "remux-"
verify_structure: false
adjust_tracks: false
titles_from_source: true
check_executable: false
stop_on_error: true
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.mkvmerge, Some(PathBuf::from("/opt/mkvtoolnix/mkvmerge")));
        assert_eq!(config.output_prefix, "remux-");
        assert!(config.titles_from_source);
        assert!(config.stop_on_error);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_yaml::from_str::<AppConfig>("verify_structures: true").is_err());
    }
}
