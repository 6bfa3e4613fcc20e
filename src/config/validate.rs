//! Configuration checks that serde cannot express.

use std::fmt;

use strsim::levenshtein;

use super::model::AppConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// One problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    /// The configuration cannot be used.
    Invalid { field: &'static str, message: String },
    /// Logged; the value is used as given.
    Suspicious {
        field: &'static str,
        message: String,
        suggestion: Option<String>,
    },
}

impl ConfigIssue {
    pub fn field(&self) -> &'static str {
        match self {
            ConfigIssue::Invalid { field, .. } | ConfigIssue::Suspicious { field, .. } => field,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ConfigIssue::Invalid { .. })
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::Invalid { field, message } => write!(f, "ERROR {}: {}", field, message),
            ConfigIssue::Suspicious {
                field,
                message,
                suggestion,
            } => {
                write!(f, "WARNING {}: {}", field, message)?;
                if let Some(suggestion) = suggestion {
                    write!(f, " ({})", suggestion)?;
                }
                Ok(())
            }
        }
    }
}

/// Checks the output prefix, the mkvmerge path and the log level.
pub fn validate_config(config: &AppConfig) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();

    if config.output_prefix.is_empty() {
        issues.push(ConfigIssue::Invalid {
            field: "output_prefix",
            message: "prefix cannot be empty".to_string(),
        });
    } else if config.output_prefix.contains(['/', '\\']) {
        issues.push(ConfigIssue::Invalid {
            field: "output_prefix",
            message: format!("'{}' contains a path separator", config.output_prefix),
        });
    }

    if let Some(mkvmerge) = config.mkvmerge.as_deref().filter(|p| !p.is_file()) {
        issues.push(ConfigIssue::Invalid {
            field: "mkvmerge",
            message: format!("no file at {}", mkvmerge.display()),
        });
    }

    let level = config.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        issues.push(ConfigIssue::Suspicious {
            field: "log_level",
            message: format!("'{}' is not a level, using it as a filter directive", config.log_level),
            suggestion: LOG_LEVELS
                .iter()
                .find(|known| levenshtein(known, &level) <= 2)
                .map(|known| format!("did you mean '{}'?", known)),
        });
    }

    issues
}

/// Multi-line report of every issue, fatal ones first.
pub fn format_report(issues: &[ConfigIssue]) -> String {
    let mut sorted: Vec<&ConfigIssue> = issues.iter().collect();
    sorted.sort_by_key(|issue| !issue.is_fatal());

    let fatal = issues.iter().filter(|i| i.is_fatal()).count();
    let mut report = String::from("Configuration rejected:\n");
    for issue in sorted {
        report.push_str(&format!("  {}\n", issue));
    }
    report.push_str(&format!(
        "{} error(s), {} warning(s)\n",
        fatal,
        issues.len() - fatal
    ));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn defaults_have_no_issues() {
        assert!(validate_config(&AppConfig::default()).is_empty());
    }

    #[test]
    fn bad_prefixes_are_fatal() {
        let empty = AppConfig {
            output_prefix: String::new(),
            ..AppConfig::default()
        };
        let issues = validate_config(&empty);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_fatal());

        let nested = AppConfig {
            output_prefix: "out/new-".to_string(),
            ..AppConfig::default()
        };
        let issues = validate_config(&nested);
        assert_eq!(issues[0].field(), "output_prefix");
        assert!(issues[0].to_string().contains("path separator"));
    }

    #[test]
    fn missing_mkvmerge_is_fatal() {
        let config = AppConfig {
            mkvmerge: Some(PathBuf::from("/nonexistent/mkvmerge")),
            ..AppConfig::default()
        };
        let issues = validate_config(&config);
        assert!(issues.iter().any(|i| i.is_fatal() && i.field() == "mkvmerge"));
    }

    #[test]
    fn misspelled_log_level_is_only_suspicious() {
        let config = AppConfig {
            log_level: "debgu".to_string(),
            output_prefix: String::new(),
            ..AppConfig::default()
        };
        let issues = validate_config(&config);
        assert_eq!(
            issues[1],
            ConfigIssue::Suspicious {
                field: "log_level",
                message: "'debgu' is not a level, using it as a filter directive".to_string(),
                suggestion: Some("did you mean 'debug'?".to_string()),
            }
        );

        let report = format_report(&issues);
        assert!(report.contains("  ERROR output_prefix: prefix cannot be empty\n"));
        assert!(report.ends_with("1 error(s), 1 warning(s)\n"));
    }
}
