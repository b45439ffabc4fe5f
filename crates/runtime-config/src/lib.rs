//! Shared import configuration types.
//!
//! The CLI reads `debsrc.toml` files from the user config directory and from
//! the repository (`debian/debsrc.toml`, `.git/debsrc.toml`), layering them in
//! that order. Inside each file the `[default]` table applies first and the
//! `[import-orig]` table overrides it. Command-line flags are applied on top by
//! the CLI crate.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Canonical config file name.
pub const CONFIG_FILE_NAME: &str = "debsrc.toml";

/// Table applied to every command.
pub const DEFAULT_SECTION: &str = "default";
/// Table applied to `import-orig` only.
pub const IMPORT_ORIG_SECTION: &str = "import-orig";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config value: {0}")]
    Invalid(#[from] toml::de::Error),
}

/// Settings for importing upstream sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ImportOrigConfig {
    #[serde(default = "default_upstream_branch")]
    pub upstream_branch: String,
    #[serde(default = "default_debian_branch")]
    pub debian_branch: String,
    /// Primary branch that also gets populated when importing into an empty
    /// repository. `None` defers to git's `init.defaultBranch`.
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default = "default_upstream_tag")]
    pub upstream_tag: String,
    #[serde(default = "default_import_msg")]
    pub import_msg: String,
    #[serde(default, rename = "filter")]
    pub filters: Vec<String>,
    #[serde(default = "default_false")]
    pub pristine_tar: bool,
    #[serde(default = "default_false")]
    pub filter_pristine_tar: bool,
    #[serde(default = "default_true")]
    pub symlink_orig: bool,
    #[serde(default = "default_true")]
    pub merge: bool,
    #[serde(default = "default_false")]
    pub sign_tags: bool,
    #[serde(default)]
    pub keyid: Option<String>,
    #[serde(default)]
    pub postimport: Option<String>,
    #[serde(default = "default_true")]
    pub interactive: bool,
}

impl Default for ImportOrigConfig {
    fn default() -> Self {
        Self {
            upstream_branch: default_upstream_branch(),
            debian_branch: default_debian_branch(),
            default_branch: None,
            upstream_tag: default_upstream_tag(),
            import_msg: default_import_msg(),
            filters: Vec::new(),
            pristine_tar: false,
            filter_pristine_tar: false,
            symlink_orig: true,
            merge: true,
            sign_tags: false,
            keyid: None,
            postimport: None,
            interactive: true,
        }
    }
}

impl ImportOrigConfig {
    /// Whether the preserved archive must be rebuilt from the filtered tree.
    pub fn filters_preserved_archive(&self) -> bool {
        !self.filters.is_empty() && self.pristine_tar && self.filter_pristine_tar
    }

    /// Load and layer every existing file in `paths`, first to last.
    ///
    /// Missing files are skipped.
    pub fn load_layered<P: AsRef<Path>>(paths: &[P]) -> Result<Self, ConfigError> {
        let mut merged = toml::map::Map::new();
        for path in paths {
            let path = path.as_ref();
            if !path.is_file() {
                continue;
            }
            let doc = read_config_doc(path)?;
            debug!(path = %path.display(), "Loaded config layer");
            for section in [DEFAULT_SECTION, IMPORT_ORIG_SECTION] {
                if let Some(table) = doc.get(section).and_then(toml::Value::as_table) {
                    for (key, value) in table {
                        merged.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        Ok(toml::Value::Table(merged).try_into::<Self>()?)
    }
}

fn read_config_doc(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<toml::Value>(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Repository-local config files, lowest precedence first.
pub fn repo_config_paths(repo_root: &Path) -> Vec<PathBuf> {
    vec![
        repo_root.join("debian").join(CONFIG_FILE_NAME),
        repo_root.join(".git").join(CONFIG_FILE_NAME),
    ]
}

fn default_upstream_branch() -> String {
    "upstream".to_string()
}

fn default_debian_branch() -> String {
    "master".to_string()
}

fn default_upstream_tag() -> String {
    "upstream/%(version)s".to_string()
}

fn default_import_msg() -> String {
    "Imported Upstream version %(version)s".to_string()
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}
