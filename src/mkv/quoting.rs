//! Shell quoting conventions used by mkvtoolnix-gui command lines.

use std::borrow::Cow;

/// Marker present only in command lines generated for Windows `cmd`.
const WINDOWS_MARKER: &str = r#"^"^(^""#;

/// Removes one pair of enclosing single quotes, if present.
pub fn strip_encase_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Removes enclosing quotes and restores escaped single quotes (`'\''`).
pub fn unquote(value: &str) -> String {
    strip_encase_quotes(value).replace(r"'\''", "'")
}

/// Wraps `value` in single quotes, escaping embedded single quotes.
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Quotes one argument for a POSIX shell, leaving safe words untouched.
///
/// Unsafe arguments are single quoted the way mkvtoolnix-gui writes them.
pub fn shell_quote(value: &str) -> Cow<'_, str> {
    if !value.is_empty() && value.chars().all(is_safe_char) {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(quote_string(value))
    }
}

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '@' | '%' | '+' | '=' | ':' | ',' | '.' | '/' | '-')
}

/// Quotes the executable path.
///
/// On Windows the path is always single quoted: backslash separators would
/// otherwise read as shell escapes when the command is split again.
pub fn quote_executable(path: &str, windows: bool) -> String {
    let quoted = shell_quote(path);
    if windows && !quoted.starts_with('\'') {
        quote_string(path)
    } else {
        quoted.into_owned()
    }
}

/// True when the command line was generated for Windows `cmd`.
pub fn is_windows_style(command: &str) -> bool {
    command.contains(WINDOWS_MARKER)
}

/// Converts a Windows `cmd` style command line to bash style quoting.
///
/// Commands already in bash style are returned unchanged.
pub fn convert_to_bash_style(command: &str) -> String {
    if !is_windows_style(command) {
        return command.to_string();
    }

    command
        .replace('\'', r"'\''")
        .replace('^', "")
        .replace('/', "\\")
        .replace('"', "'")
}

/// Splits a bash style command line into arguments.
pub fn split_command(command: &str) -> Option<Vec<String>> {
    shlex::split(command)
}

/// Renders an argument list back into one shell command line.
pub fn join_args<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|a| shell_quote(a.as_ref()).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_only_matching_outer_quotes() {
        assert_eq!(strip_encase_quotes("'/usr/bin/mkvmerge'"), "/usr/bin/mkvmerge");
        assert_eq!(strip_encase_quotes("/usr/bin/mkvmerge"), "/usr/bin/mkvmerge");
        assert_eq!(strip_encase_quotes("'"), "'");
    }

    #[test]
    fn unquote_restores_embedded_quotes() {
        assert_eq!(unquote(r"'Bob'\''s Show.mkv'"), "Bob's Show.mkv");
    }

    #[test]
    fn quote_string_escapes() {
        assert_eq!(quote_string("it's"), r"'it'\''s'");
        assert_eq!(split_command(&quote_string("it's")).unwrap(), vec!["it's"]);
    }

    #[test]
    fn safe_words_are_not_quoted() {
        assert_eq!(shell_quote("--language"), "--language");
        assert_eq!(shell_quote("0:eng"), "0:eng");
        assert_eq!(shell_quote("0:1,1:0"), "0:1,1:0");
        assert_eq!(shell_quote("("), "'('");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("/src/a b.mkv"), "'/src/a b.mkv'");
    }

    #[test]
    fn windows_executable_is_always_quoted() {
        assert_eq!(quote_executable("mkvmerge", true), "'mkvmerge'");
        assert_eq!(quote_executable("mkvmerge", false), "mkvmerge");
    }

    #[test]
    fn converts_windows_cmd_style() {
        let cmd = r#""C:\bin\mkvmerge.exe" --output ^"D:\out\ep.mkv^" ^"^(^" ^"D:\src\ep01.mkv^" ^"^)^""#;
        let bash = convert_to_bash_style(cmd);
        assert_eq!(
            bash,
            r#"'C:\bin\mkvmerge.exe' --output 'D:\out\ep.mkv' '(' 'D:\src\ep01.mkv' ')'"#
        );

        let args = split_command(&bash).unwrap();
        assert_eq!(args[0], r"C:\bin\mkvmerge.exe");
        assert_eq!(args[3], "(");
        assert_eq!(args[4], r"D:\src\ep01.mkv");
    }

    #[test]
    fn bash_style_is_unchanged() {
        let cmd = "'/usr/bin/mkvmerge' --output '/out/ep.mkv'";
        assert_eq!(convert_to_bash_style(cmd), cmd);
    }

    #[test]
    fn join_round_trips_through_split() {
        let args = vec!["mkvmerge", "--track-name", "0:Director's cut", "(", "/src/a b.mkv", ")"];
        let line = join_args(&args);
        assert_eq!(split_command(&line).unwrap(), args);
    }
}
