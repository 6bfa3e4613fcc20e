//! Command templates: literal arguments interleaved with typed placeholders.
//!
//! A template is rendered once per batch index from a [`Substitution`] that
//! holds the concrete values for that index. Each placeholder is replaced in a
//! single pass, so values can never be mistaken for placeholders.

use std::collections::HashMap;
use std::fmt;

use super::quoting;

/// Variable part of a command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    OutputFile,
    Source(usize),
    Chapters,
    Attachments,
    Title,
    TrackOrder,
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placeholder::OutputFile => f.write_str("<OUTPUTFILE>"),
            Placeholder::Source(index) => write!(f, "<SOURCE{}>", index),
            Placeholder::Chapters => f.write_str("<CHAPTERS>"),
            Placeholder::Attachments => f.write_str("<ATTACHMENTS>"),
            Placeholder::Title => f.write_str("<TITLE>"),
            Placeholder::TrackOrder => f.write_str("<ORDER>"),
        }
    }
}

/// One element of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// An argument copied to every command.
    Literal(String),
    /// The per-file options of source group `n`.
    Options(usize),
    /// A value that changes with the batch index.
    Value(Placeholder),
}

/// Concrete values for one batch index.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    values: HashMap<Placeholder, Vec<String>>,
    options: HashMap<usize, Vec<String>>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a placeholder that expands to a single argument.
    pub fn set(&mut self, placeholder: Placeholder, value: impl Into<String>) {
        self.values.insert(placeholder, vec![value.into()]);
    }

    /// Sets a placeholder that expands to several arguments.
    pub fn set_args(&mut self, placeholder: Placeholder, args: Vec<String>) {
        self.values.insert(placeholder, args);
    }

    /// Sets the per-file options of source group `group`.
    pub fn set_options(&mut self, group: usize, args: Vec<String>) {
        self.options.insert(group, args);
    }

    pub fn get(&self, placeholder: &Placeholder) -> Option<&[String]> {
        self.values.get(placeholder).map(Vec::as_slice)
    }
}

/// Executable plus the ordered segments following it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTemplate {
    executable: String,
    segments: Vec<Segment>,
}

impl CommandTemplate {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            segments: Vec::new(),
        }
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn push_literal(&mut self, literal: impl Into<String>) {
        self.segments.push(Segment::Literal(literal.into()));
    }

    pub fn contains(&self, placeholder: Placeholder) -> bool {
        self.segments.contains(&Segment::Value(placeholder))
    }

    /// Inserts `segments` before the first literal equal to `literal`, or at
    /// the end when there is none.
    pub fn insert_before(&mut self, literal: &str, segments: Vec<Segment>) {
        let position = self
            .segments
            .iter()
            .position(|s| matches!(s, Segment::Literal(l) if l == literal))
            .unwrap_or(self.segments.len());
        self.segments.splice(position..position, segments);
    }

    /// Renders the template into a shell command line and its argument list.
    ///
    /// Placeholders without a value are left as their token, unquoted, so an
    /// incomplete substitution is visible in the output.
    pub fn render(&self, values: &Substitution, windows: bool) -> (String, Vec<String>) {
        let mut words = vec![quoting::quote_executable(&self.executable, windows)];
        let mut args = vec![self.executable.clone()];

        for segment in &self.segments {
            let expanded = match segment {
                Segment::Literal(literal) => std::slice::from_ref(literal),
                Segment::Options(group) => values.options.get(group).map(Vec::as_slice).unwrap_or_default(),
                Segment::Value(placeholder) => match values.get(placeholder) {
                    Some(expanded) => expanded,
                    None => {
                        let token = placeholder.to_string();
                        words.push(token.clone());
                        args.push(token);
                        continue;
                    }
                },
            };
            for arg in expanded {
                words.push(quoting::shell_quote(arg).into_owned());
                args.push(arg.clone());
            }
        }

        (words.join(" "), args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> CommandTemplate {
        let mut template = CommandTemplate::new("/usr/bin/mkvmerge");
        template.push_literal("--output");
        template.push(Segment::Value(Placeholder::OutputFile));
        template.push(Segment::Options(0));
        template.push_literal("(");
        template.push(Segment::Value(Placeholder::Source(0)));
        template.push_literal(")");
        template.push_literal("--track-order");
        template.push(Segment::Value(Placeholder::TrackOrder));
        template
    }

    #[test]
    fn placeholder_tokens() {
        assert_eq!(Placeholder::Source(12).to_string(), "<SOURCE12>");
        assert_eq!(Placeholder::TrackOrder.to_string(), "<ORDER>");
        assert_eq!(Placeholder::OutputFile.to_string(), "<OUTPUTFILE>");
    }

    #[test]
    fn renders_every_placeholder() {
        let mut values = Substitution::new();
        values.set(Placeholder::OutputFile, "/out/new ep.mkv");
        values.set(Placeholder::Source(0), "/src/ep01.mkv");
        values.set(Placeholder::TrackOrder, "0:1");
        values.set_options(0, vec!["--language".into(), "1:eng".into()]);

        let (command, args) = template().render(&values, false);

        assert_eq!(
            command,
            "/usr/bin/mkvmerge --output '/out/new ep.mkv' --language 1:eng '(' /src/ep01.mkv ')' --track-order 0:1"
        );
        assert_eq!(args[2], "/out/new ep.mkv");
        assert_eq!(args.len(), 10);
        assert_eq!(quoting::split_command(&command).unwrap(), args);
    }

    #[test]
    fn missing_values_show_tokens() {
        let (command, _) = template().render(&Substitution::new(), false);
        assert_eq!(
            command,
            "/usr/bin/mkvmerge --output <OUTPUTFILE> '(' <SOURCE0> ')' --track-order <ORDER>"
        );
    }

    #[test]
    fn a_value_that_looks_like_a_token_is_not_expanded_again() {
        let mut values = Substitution::new();
        values.set(Placeholder::OutputFile, "<SOURCE0>");
        values.set(Placeholder::Source(0), "/src/ep01.mkv");
        values.set(Placeholder::TrackOrder, "0:0");

        let (_, args) = template().render(&values, false);
        assert_eq!(args[2], "<SOURCE0>");
        assert_eq!(args[4], "/src/ep01.mkv");
    }

    #[test]
    fn insert_before_track_order() {
        let mut template = template();
        template.insert_before(
            "--track-order",
            vec![Segment::Literal("--title".into()), Segment::Value(Placeholder::Title)],
        );
        assert!(template.contains(Placeholder::Title));
        let position = template
            .segments()
            .iter()
            .position(|s| s == &Segment::Value(Placeholder::Title))
            .unwrap();
        assert_eq!(template.segments()[position + 1], Segment::Literal("--track-order".into()));
    }
}
