/// Join an alias target path with the remainder of a URL path.
///
/// - An empty side yields the other side unchanged
/// - Otherwise exactly one `/` separates the two parts
///
/// No other normalization happens: `.` and `..` segments are kept verbatim
/// and reach the source as written.
pub fn join(base: &str, rest: &str) -> String {
    if rest.is_empty() {
        return base.to_owned();
    }
    if base.is_empty() {
        return rest.to_owned();
    }
    let head = base.trim_end_matches('/');
    let tail = rest.trim_start_matches('/');
    format!("{head}/{tail}")
}

/// Split `scheme:rest` or `scheme://rest` into its parts.
///
/// A scheme is at least two characters long, starts with an ASCII letter
/// and continues with letters, digits, `+`, `-`, `.` or `_`. Single-letter
/// prefixes are treated as Windows drive letters, not schemes.
///
/// Returns `None` if the text has no scheme prefix.
pub(crate) fn split_scheme(text: &str) -> Option<(&str, &str)> {
    let colon = text.find(':')?;
    let scheme = &text[..colon];
    if !is_valid_scheme(scheme) {
        return None;
    }
    let rest = &text[colon + 1..];
    Some((scheme, rest.strip_prefix("//").unwrap_or(rest)))
}

pub(crate) fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    scheme.len() >= 2
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.' | '_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_simple() {
        assert_eq!(join("base", "sub/file.txt"), "base/sub/file.txt");
    }

    #[test]
    fn join_trailing_and_leading_slashes() {
        assert_eq!(join("base/", "/file.txt"), "base/file.txt");
        assert_eq!(join("base///", "file.txt"), "base/file.txt");
    }

    #[test]
    fn join_empty_sides() {
        assert_eq!(join("", "file.txt"), "file.txt");
        assert_eq!(join("base", ""), "base");
        assert_eq!(join("", ""), "");
    }

    #[test]
    fn join_root_base() {
        assert_eq!(join("/", "tmp/a"), "/tmp/a");
    }

    #[test]
    fn join_keeps_dot_segments() {
        assert_eq!(join("a/./b", "../c"), "a/./b/../c");
    }

    #[test]
    fn split_short_form() {
        assert_eq!(split_scheme("res:a/b.txt"), Some(("res", "a/b.txt")));
    }

    #[test]
    fn split_long_form() {
        assert_eq!(split_scheme("file:///tmp/x"), Some(("file", "/tmp/x")));
        assert_eq!(split_scheme("res://a"), Some(("res", "a")));
    }

    #[test]
    fn split_rejects_drive_letters() {
        assert_eq!(split_scheme("C:\\Windows\\file"), None);
    }

    #[test]
    fn split_without_scheme() {
        assert_eq!(split_scheme("textures/brick.png"), None);
        assert_eq!(split_scheme(":oops"), None);
        assert_eq!(split_scheme("1abc:x"), None);
    }

    #[test]
    fn scheme_charset() {
        assert!(is_valid_scheme("save-data"));
        assert!(is_valid_scheme("git+ssh"));
        assert!(!is_valid_scheme("bad scheme"));
        assert!(!is_valid_scheme(""));
    }
}
