use std::fmt;
use std::ops::Div;

use crate::path;

/// Scheme assigned to text that carries no scheme prefix.
pub const DEFAULT_SCHEME: &str = "file";

/// A logical VFS location: a scheme selecting the source and a path inside it.
///
/// Urls are plain values compared structurally. The textual form is
/// `scheme://path`; parsing also accepts the short `scheme:path` form.
///
/// # Example
///
/// ```
/// use scheme_vfs::Url;
///
/// let base = Url::parse("real:base");
/// let joined = &base / "sub/file.txt";
/// assert_eq!(joined, Url::new("real", "base/sub/file.txt"));
/// assert_eq!(joined.to_string(), "real://base/sub/file.txt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Url {
    scheme: String,
    path: String,
}

impl Url {
    pub fn new(scheme: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            path: path.into(),
        }
    }

    /// Parse `scheme://path` or `scheme:path`.
    ///
    /// Text without a recognizable scheme is taken as a path under
    /// [`DEFAULT_SCHEME`].
    pub fn parse(text: &str) -> Self {
        match path::split_scheme(text) {
            Some((scheme, rest)) => Self::new(scheme, rest),
            None => Self::new(DEFAULT_SCHEME, text),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Append `rest` to this URL's path, keeping the scheme.
    pub fn join(&self, rest: &str) -> Self {
        Self {
            scheme: self.scheme.clone(),
            path: path::join(&self.path, rest),
        }
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.path)
    }
}

impl From<&str> for Url {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl From<String> for Url {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

impl Div<&str> for &Url {
    type Output = Url;

    fn div(self, rest: &str) -> Url {
        self.join(rest)
    }
}

impl Div<&str> for Url {
    type Output = Url;

    fn div(mut self, rest: &str) -> Url {
        self.path = path::join(&self.path, rest);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_long_form() {
        let url = Url::parse("assets://textures/brick.png");
        assert_eq!(url.scheme(), "assets");
        assert_eq!(url.path(), "textures/brick.png");
    }

    #[test]
    fn parse_short_form() {
        let url = Url::parse("res:a.txt");
        assert_eq!(url, Url::new("res", "a.txt"));
    }

    #[test]
    fn parse_without_scheme_uses_default() {
        let url = Url::parse("/tmp/file.bin");
        assert_eq!(url.scheme(), DEFAULT_SCHEME);
        assert_eq!(url.path(), "/tmp/file.bin");
    }

    #[test]
    fn parse_absolute_file_url() {
        assert_eq!(Url::parse("file:///tmp/x"), Url::new("file", "/tmp/x"));
    }

    #[test]
    fn display_round_trips() {
        let url = Url::new("save", "slot1/state.bin");
        assert_eq!(Url::parse(&url.to_string()), url);
    }

    #[test]
    fn div_joins_paths() {
        let base = Url::new("real", "base");
        assert_eq!(&base / "sub/file.txt", Url::new("real", "base/sub/file.txt"));
        assert_eq!(base / "", Url::new("real", "base"));
    }

    #[test]
    fn from_str_conversions() {
        let a: Url = "res:x".into();
        let b: Url = String::from("res://x").into();
        assert_eq!(a, b);
    }
}
