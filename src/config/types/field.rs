//! Config field path used to point diagnostics at a key.

use owo_colors::OwoColorize;
use std::fmt;

/// A dotted path to a config field, e.g. `reload.pong_timeout`.
///
/// # Example
///
/// ```ignore
/// const PONG_TIMEOUT: FieldPath = FieldPath::new("reload.pong_timeout");
/// diag.error(PONG_TIMEOUT, "must be positive");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPath(pub &'static str);

impl FieldPath {
    #[inline]
    pub const fn new(path: &'static str) -> Self {
        Self(path)
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_args!("`{}`", self.0).bright_blue())
    }
}

impl AsRef<str> for FieldPath {
    fn as_ref(&self) -> &str {
        self.0
    }
}
