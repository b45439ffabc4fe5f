use regex::Regex;
use std::sync::LazyLock;

use crate::archive::{parse_archive_filename, ArchiveFormat};

/// Shown when a package name fails [`is_valid_package_name`].
pub const PACKAGE_NAME_MSG: &str = "Package names must be at least two characters long, start with an \
alphanumeric and can only contain lower case letters (a-z), digits (0-9), plus signs (+), \
minus signs (-), and periods (.)";

/// Shown when a version fails [`is_valid_upstream_version`].
pub const UPSTREAM_VERSION_MSG: &str = "Upstream version numbers must start with a digit and can only \
contain alphanumerics and characters from the set . + - : ~";

static PACKAGE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9.+-]+$").unwrap());
static UPSTREAM_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9][A-Za-z0-9.+:~-]*$").unwrap());

// Tried in order; the first match wins.
static GUESS_RES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        // foo_1.0.orig.tar.gz, foo_1.0.orig-doc.tar.gz
        Regex::new(
            r"^(?P<package>[a-z0-9.+-]+)_(?P<version>[A-Za-z0-9.~:+-]+)\.orig(?:-(?P<component>[a-z0-9-]+))?$",
        )
        .unwrap(),
        // native: foo_1.0.tar.gz
        Regex::new(r"^(?P<package>[a-z0-9.+-]+)_(?P<version>[A-Za-z0-9.~:+-]+)$").unwrap(),
        // plain upstream: foo-1.0.tar.gz or a foo-1.0/ directory
        Regex::new(r"^(?P<package>[A-Za-z0-9.+-]+?)-(?P<version>[0-9][A-Za-z0-9.~:+-]*)$").unwrap(),
    ]
});

pub fn is_valid_package_name(name: &str) -> bool {
    PACKAGE_NAME_RE.is_match(name)
}

pub fn is_valid_upstream_version(version: &str) -> bool {
    UPSTREAM_VERSION_RE.is_match(version)
}

/// Package identity guessed from an artifact's file or directory name.
///
/// An empty `component` means the main (non-split) tarball.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamGuess {
    pub package: String,
    pub version: String,
    pub component: String,
}

/// Guess package, version and component from an upstream artifact's basename.
///
/// Archive extensions are stripped first; directory names are matched as-is.
/// Returns `None` when no naming convention applies.
pub fn guess_upstream_source(basename: &str, is_dir: bool) -> Option<UpstreamGuess> {
    let base = if is_dir {
        basename.to_string()
    } else {
        let parsed = parse_archive_filename(basename);
        match parsed.format {
            Some(ArchiveFormat::Tar) | Some(ArchiveFormat::Zip) => parsed.base,
            None => basename.to_string(),
        }
    };

    GUESS_RES.iter().find_map(|re| {
        let caps = re.captures(&base)?;
        Some(UpstreamGuess {
            package: caps.name("package")?.as_str().to_string(),
            version: caps.name("version")?.as_str().to_string(),
            component: caps
                .name("component")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        })
    })
}

/// Canonical orig tarball name: `<name>_<version>.orig[-<component>].tar<ext>`.
///
/// `ext` is the already normalised suffix including its dot (`.gz`), or empty.
pub fn orig_tarball_name(name: &str, version: &str, component: &str, ext: &str) -> String {
    if component.is_empty() {
        format!("{name}_{version}.orig.tar{ext}")
    } else {
        format!("{name}_{version}.orig-{component}.tar{ext}")
    }
}

/// Branch holding the upstream sources of `component`.
pub fn component_branch(root: &str, component: &str) -> String {
    if component.is_empty() {
        root.to_string()
    } else {
        format!("{root}-{component}")
    }
}
