use std::path::Path;

use gix::object::tree::EntryKind;
use gix::refs::transaction::{Change, LogChange, PreviousValue, RefEdit, RefLog};
use gix::{ObjectId, Repository};
use tracing::debug;

use crate::error::{RepoError, Result};

/// Wrap any gix-compatible error into [`RepoError::Gix`].
pub fn gix_err(e: impl std::error::Error + Send + Sync + 'static) -> RepoError {
    RepoError::Gix(Box::new(e))
}

/// Open a git repository at `repo_path`.
///
/// Returns [`RepoError::NotARepo`] when neither a `.git` directory nor a bare
/// repository layout is present.
pub fn open_repo(repo_path: &Path) -> Result<Repository> {
    let repo = gix::open(repo_path).map_err(|e| {
        if repo_path.join(".git").exists() || repo_path.join("HEAD").is_file() {
            gix_err(e)
        } else {
            RepoError::NotARepo(repo_path.to_path_buf())
        }
    })?;
    Ok(repo)
}

/// Find the tip commit of a ref, returning `None` if the ref doesn't exist.
pub fn find_ref_tip<'r>(repo: &'r Repository, ref_name: &str) -> Result<Option<gix::Id<'r>>> {
    match repo.try_find_reference(ref_name).map_err(gix_err)? {
        Some(reference) => {
            let id = reference.into_fully_peeled_id().map_err(gix_err)?;
            Ok(Some(id))
        }
        None => Ok(None),
    }
}

/// Build a committer/author signature stamped with the current time.
pub fn make_signature(name: &str, email: &str) -> gix::actor::Signature {
    gix::actor::Signature {
        name: name.into(),
        email: email.into(),
        time: gix::date::Time::now_local_or_utc(),
    }
}

fn ref_name(name: &str) -> Result<gix::refs::FullName> {
    name.try_into()
        .map_err(|e: gix::validate::reference::name::Error| gix_err(e))
}

/// Write the contents of `dir` as a tree object and return its id.
///
/// Regular files become blobs (executable when any execute bit is set),
/// symlinks become link entries pointing at their literal target. Empty
/// directories vanish, as they do in any git tree.
pub fn write_dir_tree(repo: &Repository, dir: &Path) -> Result<ObjectId> {
    if !dir.is_dir() {
        return Err(RepoError::InvalidTree {
            path: dir.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    let mut editor = repo
        .edit_tree(ObjectId::empty_tree(repo.object_hash()))
        .map_err(gix_err)?;
    let mut pending = vec![dir.to_path_buf()];
    let mut files = 0usize;

    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            let meta = std::fs::symlink_metadata(&path)?;
            let file_type = meta.file_type();
            if file_type.is_dir() {
                pending.push(path);
                continue;
            }

            let (kind, blob) = if file_type.is_symlink() {
                let target = std::fs::read_link(&path)?;
                let blob = repo.write_blob(path_bytes(&target)).map_err(gix_err)?;
                (EntryKind::Link, blob.detach())
            } else if file_type.is_file() {
                let body = std::fs::read(&path)?;
                let blob = repo.write_blob(&body).map_err(gix_err)?;
                let kind = if is_executable(&meta) {
                    EntryKind::BlobExecutable
                } else {
                    EntryKind::Blob
                };
                (kind, blob.detach())
            } else {
                debug!(path = %path.display(), "Skipping special file");
                continue;
            };

            let rel = tree_path(dir, &path)?;
            editor.upsert(rel.as_str(), kind, blob).map_err(gix_err)?;
            files += 1;
        }
    }

    let tree_id = editor.write().map_err(gix_err)?.detach();
    debug!(tree = %tree_id, files, dir = %dir.display(), "Wrote directory tree");
    Ok(tree_id)
}

fn tree_path(root: &Path, path: &Path) -> Result<String> {
    let rel = path.strip_prefix(root).map_err(|_| RepoError::InvalidTree {
        path: path.to_path_buf(),
        reason: "entry outside of tree root".to_string(),
    })?;
    let mut parts = Vec::new();
    for component in rel.components() {
        let part = component.as_os_str().to_str().ok_or_else(|| RepoError::InvalidTree {
            path: path.to_path_buf(),
            reason: "file name is not valid UTF-8".to_string(),
        })?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

#[cfg(unix)]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &std::fs::Metadata) -> bool {
    false
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().replace('\\', "/").into_bytes()
}

/// Create a commit on `ref_name` with the given parents.
///
/// The ref is updated atomically: it must not exist when `expected_tip` is
/// `None`, and must still point at `expected_tip` otherwise.
pub fn create_commit(
    repo: &Repository,
    ref_name_str: &str,
    tree_id: ObjectId,
    parents: &[ObjectId],
    expected_tip: Option<ObjectId>,
    signature: gix::actor::Signature,
    message: &str,
) -> Result<ObjectId> {
    let commit = gix::objs::Commit {
        message: message.into(),
        tree: tree_id,
        author: signature.clone(),
        committer: signature,
        encoding: None,
        parents: parents.to_vec().into(),
        extra_headers: Default::default(),
    };

    let commit_id = repo.write_object(&commit).map_err(gix_err)?.detach();

    let expected = match expected_tip {
        Some(tip) => PreviousValue::ExistingMustMatch(gix::refs::Target::Object(tip)),
        None => PreviousValue::MustNotExist,
    };

    let reflog = message.lines().next().unwrap_or_default();
    repo.edit_references([RefEdit {
        change: Change::Update {
            log: LogChange {
                mode: RefLog::AndReference,
                force_create_reflog: false,
                message: format!("commit: {reflog}").into(),
            },
            expected,
            new: gix::refs::Target::Object(commit_id),
        },
        name: ref_name(ref_name_str)?,
        deref: false,
    }])
    .map_err(gix_err)?;

    Ok(commit_id)
}

/// Create `ref_name` pointing at `target`. Fails if the ref already exists.
pub fn create_ref(repo: &Repository, ref_name_str: &str, target: ObjectId, message: &str) -> Result<()> {
    repo.edit_references([RefEdit {
        change: Change::Update {
            log: LogChange {
                mode: RefLog::AndReference,
                force_create_reflog: false,
                message: message.into(),
            },
            expected: PreviousValue::MustNotExist,
            new: gix::refs::Target::Object(target),
        },
        name: ref_name(ref_name_str)?,
        deref: false,
    }])
    .map_err(gix_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{init_test_repo, run_git};

    #[test]
    fn test_open_repo_success() {
        let tmp = tempfile::tempdir().unwrap();
        init_test_repo(tmp.path());

        let repo = open_repo(tmp.path());
        assert!(repo.is_ok(), "expected Ok, got: {}", repo.unwrap_err());
    }

    #[test]
    fn test_open_repo_not_a_repo() {
        let tmp = tempfile::tempdir().unwrap();
        let err = open_repo(tmp.path()).unwrap_err();
        assert!(
            matches!(err, RepoError::NotARepo(_)),
            "expected NotARepo, got: {err}"
        );
    }

    #[test]
    fn test_find_ref_tip_missing() {
        let tmp = tempfile::tempdir().unwrap();
        init_test_repo(tmp.path());

        let repo = gix::open(tmp.path()).unwrap();
        let tip = find_ref_tip(&repo, "refs/heads/nonexistent").unwrap();
        assert!(tip.is_none());
    }

    #[test]
    fn test_write_dir_tree_modes_and_nesting() {
        let tmp = tempfile::tempdir().unwrap();
        init_test_repo(tmp.path());
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("src/nested")).unwrap();
        std::fs::write(src.path().join("README"), "hello").unwrap();
        std::fs::write(src.path().join("src/nested/lib.c"), "int x;").unwrap();
        std::fs::create_dir_all(src.path().join("empty")).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let script = src.path().join("configure");
            std::fs::write(&script, "#!/bin/sh\n").unwrap();
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
            std::os::unix::fs::symlink("README", src.path().join("README.link")).unwrap();
        }

        let repo = gix::open(tmp.path()).unwrap();
        let tree = write_dir_tree(&repo, src.path()).unwrap();

        let output = run_git(tmp.path(), &["ls-tree", "-r", &tree.to_string()]);
        let listing = String::from_utf8_lossy(&output.stdout);
        assert!(listing.contains("src/nested/lib.c"), "{listing}");
        assert!(listing.contains("\tREADME\n"), "{listing}");
        assert!(!listing.contains("empty"), "{listing}");
        #[cfg(unix)]
        {
            assert!(listing.contains("100755 blob"), "{listing}");
            assert!(listing.contains("120000 blob"), "{listing}");
        }
    }

    #[test]
    fn test_write_dir_tree_rejects_file() {
        let tmp = tempfile::tempdir().unwrap();
        init_test_repo(tmp.path());
        let repo = gix::open(tmp.path()).unwrap();
        let err = write_dir_tree(&repo, &tmp.path().join("README")).unwrap_err();
        assert!(matches!(err, RepoError::InvalidTree { .. }), "got: {err}");
    }

    #[test]
    fn test_create_commit_chain_and_ref() {
        let tmp = tempfile::tempdir().unwrap();
        init_test_repo(tmp.path());

        let repo = gix::open(tmp.path()).unwrap();
        let empty_tree = ObjectId::empty_tree(repo.object_hash());
        let sig = make_signature("Test", "test@test.com");

        let first = create_commit(
            &repo,
            "refs/heads/upstream",
            empty_tree,
            &[],
            None,
            sig.clone(),
            "first",
        )
        .unwrap();
        let second = create_commit(
            &repo,
            "refs/heads/upstream",
            empty_tree,
            &[first],
            Some(first),
            sig.clone(),
            "second",
        )
        .unwrap();

        let tip = find_ref_tip(&repo, "refs/heads/upstream")
            .unwrap()
            .expect("upstream should exist");
        assert_eq!(tip.detach(), second);

        // A stale expectation must not move the ref.
        let stale = create_commit(
            &repo,
            "refs/heads/upstream",
            empty_tree,
            &[first],
            Some(first),
            sig,
            "stale",
        );
        assert!(stale.is_err());

        create_ref(&repo, "refs/heads/debian", first, "branch: created").unwrap();
        assert!(create_ref(&repo, "refs/heads/debian", second, "again").is_err());
    }
}
