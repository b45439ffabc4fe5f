use regex::Regex;
use std::sync::LazyLock;

use crate::PolicyError;

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<source>[a-z0-9][a-z0-9.+-]+)\s+\((?P<version>[^()\s]+)\)").unwrap()
});

/// The topmost stanza header of a `debian/changelog`.
///
/// Only the header is parsed; entries, trailers and urgency are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogHeader {
    pub source: String,
    pub version: String,
}

impl ChangelogHeader {
    /// Parse the first non-blank line of `content`.
    pub fn parse(content: &str) -> Result<Self, PolicyError> {
        let first = content
            .lines()
            .map(str::trim_end)
            .find(|line| !line.trim().is_empty())
            .ok_or(PolicyError::EmptyChangelog)?;
        let caps = HEADER_RE
            .captures(first)
            .ok_or_else(|| PolicyError::MalformedChangelogHeader(first.to_string()))?;
        Ok(Self {
            source: caps["source"].to_string(),
            version: caps["version"].to_string(),
        })
    }

    /// Epoch of the version (`2` for `2:1.0-1`), if any.
    pub fn epoch(&self) -> Option<&str> {
        self.version.split_once(':').map(|(epoch, _)| epoch)
    }
}
