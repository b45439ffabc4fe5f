use std::path::Path;
use std::process::{Command, Output};

/// Run git in `dir` and return its output, panicking on spawn failure.
pub fn run_git(dir: &Path, args: &[&str]) -> Output {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to spawn git")
}

/// Initialize an empty repository (no commits) on `main`.
pub fn init_empty_repo(dir: &Path) {
    run_git(dir, &["init", "--initial-branch=main"]);
    run_git(dir, &["config", "user.email", "test@test.com"]);
    run_git(dir, &["config", "user.name", "Test"]);
    run_git(dir, &["config", "commit.gpgsign", "false"]);
    run_git(dir, &["config", "tag.gpgsign", "false"]);
}

/// Initialize a minimal git repository for testing.
///
/// Creates a repo with an initial commit so that HEAD exists.
pub fn init_test_repo(dir: &Path) {
    init_empty_repo(dir);
    std::fs::write(dir.join("README"), "test repo").unwrap();
    run_git(dir, &["add", "."]);
    run_git(dir, &["commit", "-m", "init"]);
}
