//! The analysis log kept while parsing a command line.
//!
//! Every field the parser checks leaves one line: `chk:` when it looked fine,
//! `err:` when it was fatal. The command is usable only when no `err:` line
//! was recorded.

use std::fmt;

use tracing::{debug, error};

/// Severity of one analysis line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational, the field matched.
    Check,
    /// Fatal, no command will be generated.
    Error,
}

impl Severity {
    fn prefix(&self) -> &'static str {
        match self {
            Severity::Check => "chk:",
            Severity::Error => "err:",
        }
    }
}

/// One line of the analysis log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisLine {
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for AnalysisLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.severity.prefix(), self.message)
    }
}

/// Ordered log of every check performed on a command line.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    lines: Vec<AnalysisLine>,
}

impl Analysis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a passed check.
    pub fn check(&mut self, message: impl Into<String>) {
        let line = AnalysisLine {
            severity: Severity::Check,
            message: message.into(),
        };
        debug!("{}", line);
        self.lines.push(line);
    }

    /// Records a fatal problem.
    pub fn error(&mut self, message: impl Into<String>) {
        let line = AnalysisLine {
            severity: Severity::Error,
            message: message.into(),
        };
        error!("{}", line);
        self.lines.push(line);
    }

    /// All lines in the order they were recorded.
    pub fn lines(&self) -> &[AnalysisLine] {
        &self.lines
    }

    /// Iterates over the fatal lines only.
    pub fn errors(&self) -> impl Iterator<Item = &AnalysisLine> {
        self.lines.iter().filter(|l| l.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// True when no fatal line was recorded.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
