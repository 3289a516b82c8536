/// Escape a value for use inside single quotes.
/// Replaces `'` with `'\''` (end quote, escaped quote, start quote).
pub fn escape_single_quote_content(value: &str) -> String {
    value.replace('\'', "'\\''")
}

/// Quote a single argument for shell execution.
/// - Empty strings become `''`
/// - Strings with shell metacharacters are wrapped in single quotes
/// - Embedded single quotes are escaped
pub fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }

    // Characters that require quoting
    const SHELL_META: &[char] = &[
        ' ', '\t', '\n', '\'', '"', '\\', '$', '`', '!', '*', '?', '[', ']', '(', ')', '{', '}',
        '<', '>', '|', '&', ';', '#', '~',
    ];

    if !arg.contains(SHELL_META) {
        return arg.to_string();
    }

    format!("'{}'", escape_single_quote_content(arg))
}

/// Escape an entire command string for sh -c execution.
/// Wraps the command in single quotes and escapes embedded quotes.
pub fn escape_command_for_shell(command: &str) -> String {
    format!("'{}'", escape_single_quote_content(command))
}

/// Quote a path for shell execution (always quotes).
pub fn quote_path(path: &str) -> String {
    format!("'{}'", escape_single_quote_content(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_arg_simple() {
        assert_eq!(quote_arg("wwwdata"), "wwwdata");
        assert_eq!(quote_arg("1.0.tar.gz"), "1.0.tar.gz");
    }

    #[test]
    fn quote_arg_with_spaces() {
        assert_eq!(quote_arg("two words"), "'two words'");
    }

    #[test]
    fn quote_arg_with_single_quote() {
        assert_eq!(quote_arg("o'brien"), "'o'\\''brien'");
    }

    #[test]
    fn quote_arg_empty() {
        assert_eq!(quote_arg(""), "''");
    }

    #[test]
    fn quote_path_simple() {
        assert_eq!(quote_path("/var/www/app"), "'/var/www/app'");
    }

    #[test]
    fn escape_command_wraps_whole_string() {
        assert_eq!(
            escape_command_for_shell("echo 'hi'"),
            "'echo '\\''hi'\\'''"
        );
    }
}
