use anyhow::Result;
use debsrc_git_native::{GitRepository, RepoError, Repository};
use debsrc_import::{
    find_artifacts, ArtifactSource, ImportOrigError, ImportRequest, Importer, NoPrompt, Prompter,
    UpdateChecker, Uscan,
};
use tracing::{debug, info};

use crate::config::{apply_overrides, load_config};
use crate::prompt::TerminalPrompter;
use crate::ImportOrigArgs;

pub fn run_import_orig(args: ImportOrigArgs) -> Result<()> {
    let repo = GitRepository::open(&args.repo).map_err(|e| match e {
        RepoError::NotARepo(path) => ImportOrigError::NotARepository(path),
        other => ImportOrigError::Repository(other),
    })?;

    let mut config = load_config(repo.path(), repo.is_bare())?;
    apply_overrides(&mut config, &args);

    let prompter: &dyn Prompter = if config.interactive && TerminalPrompter::available() {
        &TerminalPrompter
    } else {
        if config.interactive {
            debug!("No terminal attached, not prompting");
        }
        config.interactive = false;
        &NoPrompt
    };

    let checker: Option<&dyn UpdateChecker> = if args.uscan { Some(&Uscan) } else { None };
    let artifacts = match find_artifacts(args.paths, checker, repo.path())? {
        ArtifactSource::Paths(paths) => paths,
        ArtifactSource::UpToDate => return Ok(()),
    };

    let default_branch = config
        .default_branch
        .clone()
        .unwrap_or_else(|| repo.default_branch_name());
    let request = ImportRequest {
        artifacts,
        version: args.upstream_version,
        upstream_vcs_tag: args.upstream_vcs_tag,
    };

    let outcome = Importer::new(&repo, config, prompter)
        .with_default_branch(default_branch)
        .run(&request)?;

    info!(
        "Successfully imported version {} of {}",
        outcome.version, outcome.name
    );
    Ok(())
}
