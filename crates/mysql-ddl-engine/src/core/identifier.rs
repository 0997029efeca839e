//! Identifier validation and quoting for generated DDL.
//!
//! Schema and table names cannot be passed as parameters in prepared
//! statements, so every name embedded into emitted SQL must pass the
//! grammar below first. Invalid names are refused, never sanitized.

/// Check whether a name is acceptable as a table or schema identifier.
///
/// A name may arrive wrapped in backticks (`` `some name` ``); the
/// wrapper is stripped and the inner name is then treated as backquoted.
/// The rules:
///
/// - empty names are invalid
/// - trailing whitespace is invalid, quoted or not
/// - `/`, `.` and `\` are invalid anywhere, quoted or not
/// - unquoted names additionally stick to `[A-Za-z0-9_$]`
pub fn is_valid_name(raw: &str, is_backquoted: bool) -> bool {
    let (name, backquoted) = match strip_backquotes(raw) {
        Some(inner) => (inner, true),
        None => (raw, is_backquoted),
    };

    if name.is_empty() || name != name.trim_end() {
        return false;
    }

    if name.contains(['/', '.', '\\']) {
        return false;
    }

    if backquoted {
        return true;
    }

    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Strip one layer of enclosing backticks, if present.
///
/// Returns `None` when the name is not backtick-wrapped.
pub fn strip_backquotes(name: &str) -> Option<&str> {
    if name.len() >= 2 {
        return name.strip_prefix('`')?.strip_suffix('`');
    }
    None
}

/// Quote an identifier with backticks, doubling embedded backticks.
pub fn backquote(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote a `schema.table` pair.
pub fn backquote_qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", backquote(schema), backquote(table))
}

/// Quote a string literal for embedding into generated SQL.
///
/// Single quotes and backslashes are escaped the way the server expects.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", escape_literal(value))
}

/// Escape a string for use inside a quoted SQL literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_plain_names() {
        assert!(is_valid_name("test", false));
        assert!(is_valid_name("bookmarks_2", false));
        assert!(is_valid_name("$tmp", false));
    }

    #[test]
    fn test_invalid_characters() {
        assert!(!is_valid_name("te/st", false));
        assert!(!is_valid_name("te.st", false));
        assert!(!is_valid_name("te\\st", false));
        // dots stay invalid even when backquoted
        assert!(!is_valid_name("te.st", true));
    }

    #[test]
    fn test_whitespace_rules() {
        assert!(!is_valid_name("te st", false));
        assert!(!is_valid_name("  te st", false));
        assert!(is_valid_name("  te st", true));
        // trailing whitespace is invalid in every form
        assert!(!is_valid_name("test ", false));
        assert!(!is_valid_name("test ", true));
        assert!(!is_valid_name("te.st ", true));
    }

    #[test]
    fn test_empty_name() {
        assert!(!is_valid_name("", false));
        assert!(!is_valid_name("", true));
    }

    #[test]
    fn test_backquote_wrapped_input() {
        assert!(is_valid_name("`my table`", false));
        assert!(!is_valid_name("`my.table`", false));
        assert!(!is_valid_name("`my table `", false));
    }

    #[test]
    fn test_backquote() {
        assert_eq!(backquote("name"), "`name`");
        assert_eq!(backquote("ta`ble"), "`ta``ble`");
        assert_eq!(backquote_qualified("PMA", "PMA_BookMark"), "`PMA`.`PMA_BookMark`");
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("plain"), "'plain'");
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
        assert_eq!(quote_literal("a\\b"), "'a\\\\b'");
    }
}
