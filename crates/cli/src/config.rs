use anyhow::{Context, Result};
use debsrc_runtime_config::{repo_config_paths, ImportOrigConfig, CONFIG_FILE_NAME};
use std::path::{Path, PathBuf};

use crate::ImportOrigArgs;

/// Get the config directory path (~/.config/debsrc/)
pub fn config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home).join(".config").join("debsrc"))
}

/// Config files for `repo_path`, lowest precedence first.
///
/// A bare repository has no worktree, so only its git directory is consulted.
pub fn config_paths(repo_path: &Path, bare: bool) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(dir) = config_dir() {
        paths.push(dir.join(CONFIG_FILE_NAME));
    }
    if bare {
        paths.push(repo_path.join(CONFIG_FILE_NAME));
    } else {
        paths.extend(repo_config_paths(repo_path));
    }
    paths
}

pub fn load_config(repo_path: &Path, bare: bool) -> Result<ImportOrigConfig> {
    let paths = config_paths(repo_path, bare);
    ImportOrigConfig::load_layered(&paths).context("Failed to load configuration")
}

fn flag(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// Command-line flags override whatever the config files said.
pub fn apply_overrides(config: &mut ImportOrigConfig, args: &ImportOrigArgs) {
    if let Some(branch) = &args.upstream_branch {
        config.upstream_branch = branch.clone();
    }
    if let Some(branch) = &args.debian_branch {
        config.debian_branch = branch.clone();
    }
    if let Some(branch) = &args.default_branch {
        config.default_branch = Some(branch.clone());
    }
    if let Some(tag) = &args.upstream_tag {
        config.upstream_tag = tag.clone();
    }
    if let Some(msg) = &args.import_msg {
        config.import_msg = msg.clone();
    }
    if !args.filters.is_empty() {
        config.filters = args.filters.clone();
    }
    if let Some(keyid) = &args.keyid {
        config.keyid = Some(keyid.clone());
    }
    if let Some(cmd) = &args.postimport {
        config.postimport = Some(cmd.clone());
    }

    let toggles = [
        (flag(args.interactive, args.no_interactive), &mut config.interactive),
        (flag(args.pristine_tar, args.no_pristine_tar), &mut config.pristine_tar),
        (
            flag(args.filter_pristine_tar, args.no_filter_pristine_tar),
            &mut config.filter_pristine_tar,
        ),
        (flag(args.symlink_orig, args.no_symlink_orig), &mut config.symlink_orig),
        (flag(args.merge, args.no_merge), &mut config.merge),
        (flag(args.sign_tags, args.no_sign_tags), &mut config.sign_tags),
    ];
    for (value, field) in toggles {
        if let Some(value) = value {
            *field = value;
        }
    }
}
