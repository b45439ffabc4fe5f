mod config;
mod import_orig;
mod prompt;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "debsrc", about = "debsrc - maintain Debian source packages in git")]
struct Cli {
    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import new upstream tarballs or directories
    ImportOrig(ImportOrigArgs),
}

#[derive(Args, Debug, Default)]
pub struct ImportOrigArgs {
    /// Upstream archives or directories; several import a multi-component release
    #[arg(conflicts_with = "uscan")]
    paths: Vec<PathBuf>,

    /// Look for a new upstream release with uscan and import it
    #[arg(long)]
    uscan: bool,

    /// Repository to import into
    #[arg(short = 'C', long = "repo", value_name = "DIR", default_value = ".")]
    repo: PathBuf,

    /// Upstream version to import
    #[arg(short = 'u', long = "upstream-version", value_name = "VERSION")]
    upstream_version: Option<String>,

    /// Prompt for missing name or version
    #[arg(long, overrides_with = "no_interactive")]
    interactive: bool,
    #[arg(long, overrides_with = "interactive")]
    no_interactive: bool,

    /// Branch receiving the upstream sources
    #[arg(long, value_name = "BRANCH")]
    upstream_branch: Option<String>,

    /// Packaging branch the upstream tag is merged into
    #[arg(long, value_name = "BRANCH")]
    debian_branch: Option<String>,

    /// Primary branch populated when importing into an empty repository
    #[arg(long, value_name = "BRANCH")]
    default_branch: Option<String>,

    /// Tag name template, `%(version)s` is replaced
    #[arg(long, value_name = "TEMPLATE")]
    upstream_tag: Option<String>,

    /// Commit message template, `%(version)s` is replaced
    #[arg(long, value_name = "TEMPLATE")]
    import_msg: Option<String>,

    /// Glob of paths to leave out of the import (repeatable)
    #[arg(long = "filter", value_name = "GLOB")]
    filters: Vec<String>,

    /// Preserve the original archive with pristine-tar
    #[arg(long, overrides_with = "no_pristine_tar")]
    pristine_tar: bool,
    #[arg(long, overrides_with = "pristine_tar")]
    no_pristine_tar: bool,

    /// Apply filters to the archive preserved with pristine-tar
    #[arg(long, overrides_with = "no_filter_pristine_tar")]
    filter_pristine_tar: bool,
    #[arg(long, overrides_with = "filter_pristine_tar")]
    no_filter_pristine_tar: bool,

    /// Keep the `.orig` symlink next to the repository
    #[arg(long, overrides_with = "no_symlink_orig")]
    symlink_orig: bool,
    #[arg(long, overrides_with = "symlink_orig")]
    no_symlink_orig: bool,

    /// Merge the upstream tag into the packaging branch
    #[arg(long, overrides_with = "no_merge")]
    merge: bool,
    #[arg(long, overrides_with = "merge")]
    no_merge: bool,

    /// GPG-sign the upstream tag
    #[arg(long, overrides_with = "no_sign_tags")]
    sign_tags: bool,
    #[arg(long, overrides_with = "sign_tags")]
    no_sign_tags: bool,

    /// Key used for signing
    #[arg(long, value_name = "KEYID")]
    keyid: Option<String>,

    /// Shell command run on the packaging branch after a successful merge
    #[arg(long, value_name = "CMD")]
    postimport: Option<String>,

    /// Upstream VCS tag to record as an additional parent
    #[arg(long, value_name = "TAG")]
    upstream_vcs_tag: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let result = match cli.command {
        Commands::ImportOrig(args) => import_orig::run_import_orig(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
