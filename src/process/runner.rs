//! Runs a command, streaming its output line by line.

use std::path::Path;
use std::process::Stdio;

use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::RunnerError;
use crate::mkv::quoting;

/// Diagnostic appended when a line was not valid UTF-8.
pub const INVALID_UTF8: &str = "Output was not valid UTF-8; invalid bytes were replaced.";

/// Diagnostic appended when the run was interrupted with Ctrl-C.
pub const INTERRUPTED: &str = "Interrupted, the process was stopped.";

/// Result of one run.
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    /// Exit code, `-1` when the process was killed by a signal.
    pub exit_code: i32,
    /// Standard output lines followed by standard error lines.
    pub lines: Vec<String>,
    /// First capture of each pattern, in pattern order.
    pub first_matches: Vec<Option<String>>,
    /// True when the run was stopped with Ctrl-C.
    pub interrupted: bool,
}

impl RunOutput {
    /// mkvmerge exits with 1 when it only emitted warnings.
    pub fn mkvmerge_ok(&self) -> bool {
        matches!(self.exit_code, 0 | 1) && !self.interrupted
    }

    /// Converts a failed mkvmerge run into an error.
    pub fn ensure_mkvmerge_ok(&self) -> Result<(), RunnerError> {
        if self.mkvmerge_ok() {
            Ok(())
        } else {
            Err(RunnerError::MkvmergeFailed { code: self.exit_code })
        }
    }
}

/// Runs commands and captures the first match of a set of patterns.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    patterns: Vec<Regex>,
}

impl CommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner capturing the first match of every pattern.
    ///
    /// The first capture group is kept when the pattern has one, the whole
    /// match otherwise.
    pub fn with_patterns<I, S>(patterns: I) -> Result<Self, RunnerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Splits a shell command line and runs it.
    pub async fn run_line(&self, command: &str, on_line: &mut dyn FnMut(&str)) -> Result<RunOutput, RunnerError> {
        let args = quoting::split_command(command).ok_or_else(|| RunnerError::BadCommandLine(command.to_string()))?;
        self.run(&args, on_line).await
    }

    /// Runs `args[0]` with the remaining arguments.
    ///
    /// `on_line` is called for every standard output line as it arrives, and
    /// for the standard error lines once the process has exited.
    /// Ctrl-C kills the child and marks the output as interrupted.
    pub async fn run(&self, args: &[String], on_line: &mut dyn FnMut(&str)) -> Result<RunOutput, RunnerError> {
        let (program, rest) = args.split_first().ok_or(RunnerError::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(rest);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        debug!(program = %program, args = rest.len(), "Starting process");
        let mut child = cmd.spawn().map_err(|e| RunnerError::SpawnFailed(e.to_string()))?;

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                if let Err(e) = stderr.read_to_end(&mut buf).await {
                    warn!(error = %e, "Failed reading process error output");
                }
                buf
            })
        });

        let mut output = RunOutput {
            first_matches: vec![None; self.patterns.len()],
            ..RunOutput::default()
        };
        let mut invalid_utf8 = false;

        if let Some(stdout) = child.stdout.take() {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            loop {
                buf.clear();
                tokio::select! {
                    read = reader.read_until(b'\n', &mut buf) => match read {
                        Ok(0) => break,
                        Ok(_) => {
                            let line = decode_line(&buf, &mut invalid_utf8);
                            on_line(&line);
                            self.capture(&line, &mut output.first_matches);
                            output.lines.push(line);
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed reading process output");
                            break;
                        }
                    },
                    _ = &mut ctrl_c => {
                        warn!(program = %program, "Interrupted, stopping process");
                        if let Err(e) = child.kill().await {
                            warn!(error = %e, "Failed to stop process");
                        }
                        output.interrupted = true;
                        break;
                    }
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| RunnerError::SpawnFailed(e.to_string()))?;
        output.exit_code = status.code().unwrap_or(-1);

        if let Some(task) = stderr_task {
            if let Ok(bytes) = task.await {
                for line in bytes.split(|b| *b == b'\n').filter(|l| !l.is_empty()) {
                    let line = decode_line(line, &mut invalid_utf8);
                    on_line(&line);
                    self.capture(&line, &mut output.first_matches);
                    output.lines.push(line);
                }
            }
        }

        if invalid_utf8 {
            output.lines.push(INVALID_UTF8.to_string());
        }
        if output.interrupted {
            output.lines.push(INTERRUPTED.to_string());
        }

        info!(
            program = %program,
            exit_code = output.exit_code,
            lines = output.lines.len(),
            interrupted = output.interrupted,
            "Process finished"
        );
        Ok(output)
    }

    fn capture(&self, line: &str, first_matches: &mut [Option<String>]) {
        for (pattern, slot) in self.patterns.iter().zip(first_matches.iter_mut()) {
            if slot.is_some() {
                continue;
            }
            if let Some(caps) = pattern.captures(line) {
                let found = caps.get(1).or_else(|| caps.get(0));
                *slot = found.map(|m| m.as_str().to_string());
            }
        }
    }
}

fn decode_line(bytes: &[u8], invalid_utf8: &mut bool) -> String {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(line) => line.to_string(),
        Err(_) => {
            *invalid_utf8 = true;
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Pattern that captures the version from `mkvmerge --version`.
pub const VERSION_PATTERN: &str = r" v(.*?) ";

/// Reads the version reported by `mkvmerge --version`.
pub async fn mkvmerge_version(mkvmerge: &Path) -> Result<Option<String>, RunnerError> {
    let runner = CommandRunner::with_patterns([VERSION_PATTERN])?;
    let args = vec![mkvmerge.to_string_lossy().to_string(), "--version".to_string()];
    let output = runner.run(&args, &mut |_| {}).await?;
    Ok(output.first_matches.into_iter().next().flatten())
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;

    use super::*;

    fn script(dir: &tempfile::TempDir, body: &str) -> Vec<String> {
        let path = dir.path().join("fake.sh");
        fs::write(&path, body).unwrap();
        vec!["sh".to_string(), path.to_string_lossy().to_string()]
    }

    #[tokio::test]
    async fn streams_lines_and_captures_first_match() {
        let dir = tempfile::tempdir().unwrap();
        let args = script(
            &dir,
            "echo 'mkvmerge v81.0 (\"Dreaming\") 64-bit'\necho 'Progress: 50%'\necho 'Progress: 100%'\n",
        );
        let runner = CommandRunner::with_patterns([VERSION_PATTERN, r"Progress: (\d+)%"]).unwrap();

        let mut seen = Vec::new();
        let output = runner.run(&args, &mut |line| seen.push(line.to_string())).await.unwrap();

        assert_eq!(output.exit_code, 0);
        assert!(!output.interrupted);
        assert_eq!(seen.len(), 3);
        assert_eq!(output.lines, seen);
        assert_eq!(output.first_matches, [Some("81.0".to_string()), Some("50".to_string())]);
    }

    #[tokio::test]
    async fn mkvmerge_warnings_count_as_success() {
        let dir = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new();

        let warned = runner.run(&script(&dir, "echo 'Warning: x'\nexit 1\n"), &mut |_| {}).await.unwrap();
        assert_eq!(warned.exit_code, 1);
        assert!(warned.mkvmerge_ok());

        let failed = runner.run(&script(&dir, "exit 2\n"), &mut |_| {}).await.unwrap();
        assert!(!failed.mkvmerge_ok());
        assert!(matches!(
            failed.ensure_mkvmerge_ok(),
            Err(RunnerError::MkvmergeFailed { code: 2 })
        ));
    }

    #[tokio::test]
    async fn invalid_utf8_is_kept_with_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let args = script(&dir, "printf 'caf\\351\\n'\n");

        let output = CommandRunner::new().run(&args, &mut |_| {}).await.unwrap();

        assert_eq!(output.lines[0], "caf\u{FFFD}");
        assert_eq!(output.lines.last().unwrap(), INVALID_UTF8);
    }

    #[tokio::test]
    async fn stderr_is_captured_after_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let args = script(&dir, "echo out\necho err 1>&2\n");

        let mut seen = Vec::new();
        let output = CommandRunner::new()
            .run(&args, &mut |line| seen.push(line.to_string()))
            .await
            .unwrap();
        assert_eq!(output.lines, ["out", "err"]);
        assert_eq!(seen, ["out", "err"]);
    }

    #[tokio::test]
    async fn run_line_splits_quoted_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.sh");
        fs::write(&path, "echo \"$1\"\n").unwrap();
        let line = format!("sh {} 'two words'", quoting::quote_string(&path.to_string_lossy()));

        let output = CommandRunner::new().run_line(&line, &mut |_| {}).await.unwrap();
        assert_eq!(output.lines, ["two words"]);
    }

    #[tokio::test]
    async fn errors_for_bad_input() {
        let runner = CommandRunner::new();
        assert!(matches!(runner.run(&[], &mut |_| {}).await, Err(RunnerError::EmptyCommand)));
        assert!(matches!(
            runner.run_line("sh 'unterminated", &mut |_| {}).await,
            Err(RunnerError::BadCommandLine(_))
        ));
        assert!(matches!(
            runner
                .run(&["/nonexistent/mkvmerge".to_string()], &mut |_| {})
                .await,
            Err(RunnerError::SpawnFailed(_))
        ));
        assert!(CommandRunner::with_patterns(["("]).is_err());
    }
}
