//! The command template engine.
//!
//! [`MkvCommand`] takes one mkvmerge command line as shown by mkvtoolnix-gui,
//! turns it into a [`CommandTemplate`], and derives one concrete command per
//! file found next to the first source file. Every field it checks is written
//! to the [`Analysis`] log; no command is generated once a check failed.

use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span, warn};

use super::analysis::Analysis;
use super::attachments::{self, Attachments};
use super::flags::{self, FlagKind};
use super::paths;
use super::quoting;
use super::source::SourceGroup;
use super::template::{CommandTemplate, Placeholder, Segment, Substitution};
use super::track_options::{OptionEntry, TrackOptions, Translation};
use super::track_order::{OrderTranslation, TrackOrder};
use crate::error::BatchError;
use crate::media::TrackInspector;

/// Settings that influence parsing.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Require the executable named in the command to exist.
    pub check_executable: bool,
    /// Prefix used when an output file already exists.
    pub output_prefix: String,
    /// Always single quote the executable when rendering.
    pub windows: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            check_executable: true,
            output_prefix: "new-".to_string(),
            windows: cfg!(windows),
        }
    }
}

/// Everything known about one batch index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub index: usize,
    /// Shell command line.
    pub command: String,
    /// The same command split into arguments.
    pub args: Vec<String>,
    /// Files named on the original command line.
    pub base_files: Vec<PathBuf>,
    /// Files used in place of the base files for this index.
    pub source_files: Vec<PathBuf>,
    pub output_file: PathBuf,
    /// Attachment arguments, when the command has attachments.
    pub attachments: Option<Vec<String>>,
    pub title: Option<String>,
    pub chapters: Option<PathBuf>,
}

/// A parsed mkvmerge command line and the batch derived from it.
#[derive(Debug, Clone, Default)]
pub struct MkvCommand {
    raw: String,
    bash: String,
    options: ParseOptions,
    analysis: Analysis,

    executable: Option<PathBuf>,
    language: Option<String>,
    output: Option<PathBuf>,
    title: Option<String>,
    chapters_language: Option<String>,
    chapters: Option<PathBuf>,
    track_order_raw: Option<String>,
    track_order: Option<TrackOrder>,
    groups: Vec<SourceGroup>,
    attachments: Attachments,
    template: CommandTemplate,

    batch_size: usize,
    outputs: Vec<PathBuf>,
    chapters_files: Vec<PathBuf>,
    titles: Vec<String>,
    translations: Vec<Vec<Translation>>,

    commands: Vec<String>,
    shell_commands: Vec<Vec<String>>,
}

impl MkvCommand {
    /// Parses `raw` with default options.
    pub fn new(raw: &str) -> Self {
        Self::parse(raw, ParseOptions::default())
    }

    /// Parses `raw` and, when every check passes, generates the batch.
    pub fn parse(raw: &str, options: ParseOptions) -> Self {
        let mut command = Self {
            raw: raw.to_string(),
            options,
            ..Self::default()
        };

        let span = info_span!("command");
        let _enter = span.enter();

        command.parse_command();
        if command.is_ok() {
            command.read_files();
        }
        if command.is_ok() {
            command.translations = vec![vec![Translation::new(); command.groups.len()]; command.batch_size];
            command.generate_commands();
            info!(commands = command.batch_size, "Command parsed");
        }

        command
    }

    /// Replaces the command line, discarding everything derived from the
    /// previous one.
    pub fn set_command(&mut self, raw: &str) {
        *self = Self::parse(raw, self.options.clone());
    }

    /// True when every check passed.
    pub fn is_ok(&self) -> bool {
        self.analysis.is_ok()
    }

    /// Converts a failed parse into an error.
    pub fn ensure_ok(&self) -> Result<(), BatchError> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(BatchError::InvalidCommand {
                error_count: self.analysis.error_count(),
            })
        }
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    /// The command line as given.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The command line after Windows quoting was converted.
    pub fn bash_command(&self) -> &str {
        &self.bash
    }

    pub fn parse_options(&self) -> &ParseOptions {
        &self.options
    }

    /// Number of commands in the batch, zero when the parse failed.
    pub fn len(&self) -> usize {
        if self.is_ok() {
            self.batch_size
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn executable(&self) -> Option<&Path> {
        self.executable.as_deref()
    }

    /// `--ui-language` value.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// `--output` value.
    pub fn output_file(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// `--title` value.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn chapters_file(&self) -> Option<&Path> {
        self.chapters.as_deref()
    }

    pub fn chapters_language(&self) -> Option<&str> {
        self.chapters_language.as_deref()
    }

    pub fn track_order(&self) -> Option<&TrackOrder> {
        self.track_order.as_ref()
    }

    pub fn groups(&self) -> &[SourceGroup] {
        &self.groups
    }

    pub fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    pub fn template(&self) -> &CommandTemplate {
        &self.template
    }

    /// The template with placeholder tokens in place of the batch values.
    pub fn template_string(&self) -> String {
        let mut values = Substitution::new();
        for group in &self.groups {
            values.set_options(group.index(), group.options().args(&Translation::new()));
        }
        self.template.render(&values, self.options.windows).0
    }

    /// Files named on the command line, one per source group.
    pub fn base_files(&self) -> Vec<PathBuf> {
        self.groups.iter().map(|g| g.file().to_path_buf()).collect()
    }

    /// Files used for batch index `index`, one per source group.
    pub fn source_files(&self, index: usize) -> Vec<PathBuf> {
        self.groups
            .iter()
            .filter_map(|g| g.siblings().get(index).cloned())
            .collect()
    }

    /// Output file of every batch index.
    pub fn destination_files(&self) -> &[PathBuf] {
        &self.outputs
    }

    /// Generated shell command lines.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Generated commands split into arguments.
    pub fn shell_commands(&self) -> &[Vec<String>] {
        &self.shell_commands
    }

    pub fn contains(&self, command: &str) -> bool {
        self.commands.iter().any(|c| c == command)
    }

    /// Track id translation in effect for `group` at batch index `index`.
    pub fn translation(&self, index: usize, group: usize) -> Option<&Translation> {
        self.translations.get(index)?.get(group)
    }

    /// Replaces the translation of `group` at `index` and regenerates that
    /// command.
    pub(crate) fn set_translation(&mut self, index: usize, group: usize, translation: Translation) {
        if let Some(slot) = self.translations.get_mut(index).and_then(|t| t.get_mut(group)) {
            *slot = translation;
            self.generate_command(index);
        }
    }

    /// Track order translation of batch index `index`, merged over groups.
    pub fn order_translation(&self, index: usize) -> OrderTranslation {
        let mut merged = OrderTranslation::new();
        if let Some(translations) = self.translations.get(index) {
            for (group, translation) in translations.iter().enumerate() {
                merged.extend(TrackOptions::order_translation(group, translation));
            }
        }
        merged
    }

    /// Title used for batch index `index`.
    pub fn title_for(&self, index: usize) -> Option<String> {
        if !self.template.contains(Placeholder::Title) {
            return None;
        }
        Some(
            self.titles
                .get(index)
                .cloned()
                .or_else(|| self.title.clone())
                .unwrap_or_default(),
        )
    }

    /// Regenerates every command of the batch. Does nothing when the parse
    /// failed.
    pub fn generate_commands(&mut self) {
        self.commands.clear();
        self.shell_commands.clear();
        if !self.is_ok() {
            return;
        }

        for index in 0..self.batch_size {
            let (command, args) = self.render(index);
            self.commands.push(command);
            self.shell_commands.push(args);
        }
    }

    fn generate_command(&mut self, index: usize) {
        if index >= self.commands.len() {
            return;
        }
        let (command, args) = self.render(index);
        self.commands[index] = command;
        self.shell_commands[index] = args;
    }

    /// Renders batch index `index` without storing it.
    pub fn render(&self, index: usize) -> (String, Vec<String>) {
        self.template.render(&self.substitution(index), self.options.windows)
    }

    /// Renders the template with the values of the original command line.
    pub fn original_command(&self) -> (String, Vec<String>) {
        let mut values = Substitution::new();
        if let Some(output) = &self.output {
            values.set(Placeholder::OutputFile, path_arg(output));
        }
        for group in &self.groups {
            values.set(Placeholder::Source(group.index()), path_arg(group.file()));
            values.set_options(group.index(), group.options().args(&Translation::new()));
        }
        if let Some(chapters) = &self.chapters {
            values.set(Placeholder::Chapters, path_arg(chapters));
        }
        if !self.attachments.is_empty() {
            let args = self.attachments.items().iter().flat_map(|a| a.args()).collect();
            values.set_args(Placeholder::Attachments, args);
        }
        if let Some(title) = &self.title {
            values.set(Placeholder::Title, title.clone());
        }
        if let Some(order) = &self.track_order_raw {
            values.set(Placeholder::TrackOrder, order.clone());
        }
        self.template.render(&values, self.options.windows)
    }

    fn substitution(&self, index: usize) -> Substitution {
        let mut values = Substitution::new();

        if let Some(output) = self.outputs.get(index) {
            values.set(Placeholder::OutputFile, path_arg(output));
        }
        let empty = Translation::new();
        for group in &self.groups {
            if let Some(file) = group.siblings().get(index) {
                values.set(Placeholder::Source(group.index()), path_arg(file));
            }
            let translation = self.translation(index, group.index()).unwrap_or(&empty);
            values.set_options(group.index(), group.options().args(translation));
        }
        if let Some(chapters) = self.chapters_files.get(index) {
            values.set(Placeholder::Chapters, path_arg(chapters));
        }
        if !self.attachments.is_empty() {
            values.set_args(Placeholder::Attachments, self.attachments.args_for(index));
        }
        if let Some(title) = self.title_for(index) {
            values.set(Placeholder::Title, title);
        }
        if let Some(order) = &self.track_order {
            let order = order.translate(&self.order_translation(index));
            values.set(Placeholder::TrackOrder, order.to_string());
        }

        values
    }

    /// Everything known about batch index `index`.
    pub fn entry(&self, index: usize) -> Result<BatchEntry, BatchError> {
        self.ensure_ok()?;
        let (Some(command), Some(args), Some(output_file)) = (
            self.commands.get(index),
            self.shell_commands.get(index),
            self.outputs.get(index),
        ) else {
            return Err(BatchError::IndexOutOfRange {
                index,
                size: self.len(),
            });
        };

        Ok(BatchEntry {
            index,
            command: command.clone(),
            args: args.clone(),
            base_files: self.base_files(),
            source_files: self.source_files(index),
            output_file: output_file.clone(),
            attachments: (!self.attachments.is_empty()).then(|| self.attachments.args_for(index)),
            title: self.title_for(index),
            chapters: self.chapters_files.get(index).cloned(),
        })
    }

    /// Every batch entry in order.
    pub fn entries(&self) -> Vec<BatchEntry> {
        (0..self.len()).filter_map(|i| self.entry(i).ok()).collect()
    }

    /// Replaces the output file names and regenerates the commands.
    pub fn rename_output_files(&mut self, names: Vec<PathBuf>) -> Result<(), BatchError> {
        self.ensure_ok()?;
        if names.len() != self.batch_size {
            return Err(BatchError::RenameMismatch {
                expected: self.batch_size,
                actual: names.len(),
            });
        }
        self.outputs = names;
        self.generate_commands();
        Ok(())
    }

    /// Takes each index's title from the container title of the matching
    /// file of the first source group.
    ///
    /// Files without a title, or that cannot be read, fall back to the
    /// command line title. A `--title` option is added when the command had
    /// none.
    pub fn apply_source_titles(&mut self, inspector: &dyn TrackInspector) {
        if !self.is_ok() {
            return;
        }
        let Some(first) = self.groups.first() else {
            return;
        };

        let fallback = self.title.clone().unwrap_or_default();
        self.titles = first
            .siblings()
            .iter()
            .map(|file| match inspector.inspect(file) {
                Ok(structure) => structure.title.unwrap_or_else(|| fallback.clone()),
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "Could not read title");
                    fallback.clone()
                }
            })
            .collect();

        if !self.template.contains(Placeholder::Title) {
            self.template.insert_before(
                "--track-order",
                vec![
                    Segment::Literal("--title".to_string()),
                    Segment::Value(Placeholder::Title),
                ],
            );
        }
        self.generate_commands();
    }

    fn parse_command(&mut self) {
        self.bash = quoting::convert_to_bash_style(&self.raw);
        if quoting::is_windows_style(&self.raw) {
            debug!("Converted Windows command line");
        }

        let Some(args) = quoting::split_command(&self.bash) else {
            self.analysis.error("Command bad format.");
            return;
        };
        let Some(executable) = args.first() else {
            self.analysis.error("mkvmerge not found in command.");
            return;
        };
        self.check_executable(executable);
        self.template = CommandTemplate::new(executable.clone());

        let mut pending: Vec<OptionEntry> = Vec::new();
        let mut i = 1;
        while i < args.len() {
            let arg = args[i].as_str();
            let next = args.get(i + 1).map(String::as_str);

            if arg == "(" {
                i = self.read_group(&args, i, std::mem::take(&mut pending));
                continue;
            }
            if arg == ")" {
                self.analysis.error("Unbalanced parenthesis in command.");
                i += 1;
                continue;
            }
            if !flags::is_option(arg) {
                self.template.push_literal(arg);
                i += 1;
                continue;
            }

            let kind = match flags::kind(arg) {
                Some(kind) => kind,
                None => self.unknown_option(arg, next),
            };
            let value = if kind.takes_parameter() {
                match next {
                    Some(value) => Some(value),
                    None => {
                        self.analysis.error(format!("Option {} is missing its value.", arg));
                        break;
                    }
                }
            } else {
                None
            };
            i += if value.is_some() { 2 } else { 1 };

            if kind.is_per_file() {
                pending.push(OptionEntry::new(arg, kind, value));
            } else {
                self.read_global(arg, value, &mut pending);
            }
        }

        if !pending.is_empty() {
            warn!(options = pending.len(), "Options after the last source file");
            for entry in &pending {
                for arg in entry.args(&Translation::new()) {
                    self.template.push_literal(arg);
                }
            }
        }

        self.check_fields();
    }

    fn unknown_option(&mut self, flag: &str, next: Option<&str>) -> FlagKind {
        let hint = flags::suggest(flag)
            .map(|s| format!(" Did you mean {}?", s))
            .unwrap_or_default();
        warn!(option = flag, "Unknown mkvmerge option");
        self.analysis.check(format!("Unknown option {} kept as is.{}", flag, hint));

        match flags::guess_kind(next) {
            FlagKind::TrackScoped => FlagKind::TrackScoped,
            FlagKind::Parameter => FlagKind::GlobalParameter,
            _ => FlagKind::GlobalSwitch,
        }
    }

    fn read_global(&mut self, flag: &str, value: Option<&str>, pending: &mut Vec<OptionEntry>) {
        let Some(value) = value else {
            self.template.push_literal(flag);
            return;
        };

        match flag {
            "--output" | "-o" => {
                self.template.push_literal(flag);
                self.template.push(Segment::Value(Placeholder::OutputFile));
                self.output = Some(PathBuf::from(value));
            }
            "--ui-language" => {
                self.template.push_literal(flag);
                self.template.push_literal(value);
                self.language = Some(value.to_string());
            }
            "--title" => {
                self.template.push_literal(flag);
                self.template.push(Segment::Value(Placeholder::Title));
                self.title = Some(value.to_string());
            }
            "--track-order" => {
                self.template.push_literal(flag);
                self.template.push(Segment::Value(Placeholder::TrackOrder));
                self.track_order_raw = Some(value.to_string());
            }
            "--chapters" => {
                // Chapter options right before --chapters belong to the
                // chapters file, not to the next source file.
                let mut chapter_options = Vec::new();
                while let Some(OptionEntry::Parameter { flag: name, .. }) = pending.last() {
                    if name != "--chapter-language" && name != "--chapter-charset" {
                        break;
                    }
                    chapter_options.extend(pending.pop());
                }
                for entry in chapter_options.into_iter().rev() {
                    if let OptionEntry::Parameter { flag: name, value: setting } = entry {
                        if name == "--chapter-language" {
                            self.chapters_language = Some(setting.clone());
                        }
                        self.template.push_literal(name);
                        self.template.push_literal(setting);
                    }
                }
                self.template.push_literal(flag);
                self.template.push(Segment::Value(Placeholder::Chapters));
                self.chapters = Some(PathBuf::from(value));
            }
            _ if attachments::is_attachment_option(flag) => {
                if !self.template.contains(Placeholder::Attachments) {
                    self.template.push(Segment::Value(Placeholder::Attachments));
                }
                self.attachments.add(flag, value);
            }
            _ => {
                self.template.push_literal(flag);
                self.template.push_literal(value);
            }
        }
    }

    fn read_group(&mut self, args: &[String], open: usize, options: Vec<OptionEntry>) -> usize {
        let mut close = open + 1;
        while close < args.len() && args[close] != ")" {
            close += 1;
        }
        if close >= args.len() {
            self.analysis.error("Unbalanced parenthesis in command.");
            return close;
        }

        let index = self.groups.len();
        match &args[open + 1..close] {
            [file] => {
                let group = SourceGroup::new(index, TrackOptions::new(options), file);
                if group.is_valid() {
                    self.analysis
                        .check(format!("Source directory ok - {}.", group.directory().display()));
                } else {
                    self.analysis.error(format!("Error reading source files - {}.", file));
                }
                self.groups.push(group);
                self.template.push(Segment::Options(index));
                self.template.push_literal("(");
                self.template.push(Segment::Value(Placeholder::Source(index)));
                self.template.push_literal(")");
            }
            [] => self.analysis.error("Empty source file group in command."),
            files => self.analysis.error(format!(
                "Only one file per source group is supported - {}.",
                files.join(", ")
            )),
        }

        close + 1
    }

    fn check_executable(&mut self, executable: &str) {
        let path = PathBuf::from(quoting::unquote(executable));
        if !self.options.check_executable || path.is_file() {
            self.analysis.check(format!("mkvmerge ok - {}.", path.display()));
            self.executable = Some(path);
        } else {
            self.analysis
                .error(format!("mkvmerge not found - {}.", path.display()));
        }
    }

    fn check_fields(&mut self) {
        match &self.output {
            Some(output) => {
                let dir = output.parent().unwrap_or_else(|| Path::new("."));
                let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
                if dir.is_dir() {
                    self.analysis
                        .check(format!("Destination directory ok = {}.", dir.display()));
                } else {
                    self.analysis
                        .error(format!("Destination directory not found - {}.", dir.display()));
                }
            }
            None => self.analysis.error("No output file found in command."),
        }

        if self.groups.is_empty() {
            self.analysis.error("No source file found in command.");
        } else if self.output.is_some() {
            self.analysis.check("Command seems ok.");
        }

        match &self.track_order_raw {
            Some(raw) => match TrackOrder::parse(raw) {
                Some(order) => {
                    let languages: usize = self.groups.iter().map(|g| g.options().language_count()).sum();
                    if languages == order.len() {
                        self.analysis.check(format!("Track order ok - {}.", raw));
                        self.track_order = Some(order);
                    } else {
                        self.analysis.error(format!(
                            "Number of tracks {} and track order of {} don't match.",
                            languages,
                            order.len()
                        ));
                    }
                }
                None => self.analysis.error("Command track order bad format."),
            },
            None => self.analysis.check("No track order in command."),
        }

        if let Some(language) = &self.language {
            self.analysis.check(format!("UI language - {}.", language));
        }
        if let Some(title) = &self.title {
            self.analysis.check(format!("Title found - {}.", title));
        }

        if let Some(chapters) = &self.chapters {
            if chapters.is_file() {
                let dir = chapters.parent().unwrap_or_else(|| Path::new("."));
                self.analysis.check(format!("Chapters file ok - {}.", dir.display()));
            } else {
                self.analysis
                    .error(format!("Chapters file not found - {}.", chapters.display()));
            }
        }

        let missing: Vec<String> = self
            .attachments
            .missing()
            .iter()
            .map(|f| f.display().to_string())
            .collect();
        for file in missing {
            self.analysis.error(format!("Attachment file not found - {}.", file));
        }
    }

    fn read_files(&mut self) {
        let Some(first) = self.groups.first() else {
            return;
        };
        self.batch_size = first.len();

        let mismatched: Vec<(PathBuf, usize)> = self
            .groups
            .iter()
            .filter(|g| g.len() != self.batch_size)
            .map(|g| (g.directory().to_path_buf(), g.len()))
            .collect();
        for (dir, count) in mismatched {
            self.analysis.error(format!(
                "Source files TOTAL mismatched, file counts don't match - {} has {} file(s), {} expected.",
                dir.display(),
                count,
                self.batch_size
            ));
        }

        if let Some(output) = &self.output {
            let dir = output.parent().unwrap_or_else(|| Path::new(""));
            let extension = output
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            let prefix = self.options.output_prefix.clone();
            self.outputs = first
                .siblings()
                .iter()
                .map(|sibling| {
                    let stem = sibling
                        .file_stem()
                        .map(|s| s.to_string_lossy().to_string())
                        .unwrap_or_default();
                    paths::resolve_overwrite(&dir.join(format!("{}{}", stem, extension)), &prefix)
                })
                .collect();
        }

        if let Some(chapters) = &self.chapters {
            let files = paths::sibling_files(chapters);
            if files.len() == self.batch_size {
                self.chapters_files = files;
            } else {
                self.analysis.error(format!(
                    "Chapters files TOTAL mismatched - {} found, {} expected.",
                    files.len(),
                    self.batch_size
                ));
            }
        }

        if !self.attachments.is_empty() {
            let dirs = if self.attachments.resolve_episodes(self.batch_size) {
                self.attachments.episode_dirs().to_vec()
            } else {
                self.attachments.directories()
            };
            for dir in dirs {
                self.analysis
                    .check(format!("Attachments directory ok - {}.", dir.display()));
            }
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
