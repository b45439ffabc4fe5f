//! Turn an artifact into an unpacked tree ready to commit.

use std::path::{Path, PathBuf};

use debsrc_core::{orig_tarball_name, ArchiveFormat};
use tracing::{debug, info};

use crate::error::{ImportOrigError, Result};
use crate::session::ImportSession;
use crate::unpack::{self, FilterSet, UnpackError};

const TEMP_PREFIX: &str = ".debsrc-import-";

pub struct Normalizer<'a> {
    /// Where temporary trees are created.
    work_dir: &'a Path,
    filters: &'a FilterSet,
    /// Rebuild the preserved archive from the filtered tree.
    filter_preserved: bool,
    preserve: bool,
}

impl<'a> Normalizer<'a> {
    pub fn new(work_dir: &'a Path, filters: &'a FilterSet) -> Self {
        Self {
            work_dir,
            filters,
            filter_preserved: false,
            preserve: false,
        }
    }

    pub fn preserving(mut self, preserve: bool, filter_preserved: bool) -> Self {
        self.preserve = preserve;
        self.filter_preserved = filter_preserved;
        self
    }

    /// Unpack (and possibly repack) the session's artifact, then reject trees
    /// carrying git metadata.
    pub fn normalize(&self, session: &mut ImportSession) -> Result<()> {
        let unpacked = if session.artifact.is_dir {
            session.artifact.path.clone()
        } else {
            let archive = session.artifact.path.clone();
            let unpacked = self
                .unpack(session, &archive)
                .map_err(|e| extraction(&archive, e))?;
            if self.needs_repack(session) {
                self.repack(session, &unpacked)
                    .map_err(|e| extraction(&archive, e))?
            } else {
                unpacked
            }
        };

        if let Some(marker) =
            unpack::find_git_metadata(&unpacked).map_err(|e| extraction(&unpacked, e))?
        {
            return Err(ImportOrigError::ForeignVcsMetadata {
                path: session.artifact.original_path.clone(),
                marker,
            });
        }
        session.artifact.unpacked = Some(unpacked);
        Ok(())
    }

    fn needs_repack(&self, session: &ImportSession) -> bool {
        if !self.preserve {
            return false;
        }
        self.filter_preserved || session.artifact.archive_format() == Some(ArchiveFormat::Zip)
    }

    fn unpack(
        &self,
        session: &mut ImportSession,
        archive: &Path,
    ) -> std::result::Result<PathBuf, UnpackError> {
        let tmp = self.temp_dir()?;
        unpack::extract_archive(archive, tmp.path(), self.filters)?;
        let root = unpack::unpacked_root(tmp.path())?;
        debug!("Unpacked '{}' to '{}'", archive.display(), root.display());
        session.track_temp_dir(tmp);
        Ok(root)
    }

    /// Pack the filtered tree as the canonical orig tarball and use it from
    /// now on.
    fn repack(
        &self,
        session: &mut ImportSession,
        tree: &Path,
    ) -> std::result::Result<PathBuf, UnpackError> {
        let tmp = self.temp_dir()?;
        let name = orig_tarball_name(&session.name, &session.version, &session.component, ".gz");
        let archive = tmp.path().join(&name);
        let prefix = format!("{}-{}", session.name, session.version);
        unpack::pack_tree(tree, &prefix, &archive)?;
        info!("Repacked '{}' as '{}'", session.artifact.path.display(), name);

        let unpack_dir = tmp.path().join("tree");
        std::fs::create_dir(&unpack_dir)?;
        unpack::extract_archive(&archive, &unpack_dir, &FilterSet::default())?;
        let root = unpack::unpacked_root(&unpack_dir)?;
        session.track_temp_dir(tmp);
        session.artifact.path = archive;
        Ok(root)
    }

    fn temp_dir(&self) -> std::io::Result<tempfile::TempDir> {
        tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir_in(self.work_dir)
    }
}

fn extraction(path: &Path, err: UnpackError) -> ImportOrigError {
    ImportOrigError::Extraction {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Artifact;
    use crate::identity::Identity;
    use crate::testing::write_tarball;
    use std::fs;

    fn session_for(path: &Path) -> ImportSession {
        ImportSession::new(
            Artifact::new(path),
            Identity {
                name: "foo".into(),
                version: "1.0".into(),
                component: String::new(),
            },
            "upstream".into(),
        )
    }

    #[test]
    fn test_directory_used_as_is() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("foo-1.0");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("a"), "a").unwrap();

        let mut session = session_for(&dir);
        let filters = FilterSet::default();
        Normalizer::new(tmp.path(), &filters)
            .preserving(true, true)
            .normalize(&mut session)
            .unwrap();
        assert_eq!(session.artifact.unpacked.as_deref(), Some(dir.as_path()));
        assert!(session.temp_dir_paths().is_empty());
    }

    #[test]
    fn test_tarball_unpacked_into_work_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("foo-1.0.tar.gz");
        write_tarball(&archive, &[("foo-1.0/README", "hi")]);
        let work = tmp.path().join("work");
        fs::create_dir(&work).unwrap();

        let mut session = session_for(&archive);
        let filters = FilterSet::default();
        Normalizer::new(&work, &filters).normalize(&mut session).unwrap();

        let unpacked = session.artifact.unpacked.clone().unwrap();
        assert!(unpacked.starts_with(&work));
        assert!(unpacked.ends_with("foo-1.0"));
        assert_eq!(session.artifact.path, archive);
        assert_eq!(session.temp_dir_paths().len(), 1);
    }

    #[test]
    fn test_repack_with_filters_replaces_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("foo-1.0.tar.gz");
        write_tarball(
            &archive,
            &[("foo-1.0/README", "hi"), ("foo-1.0/junk.o", "bin")],
        );

        let mut session = session_for(&archive);
        let filters = FilterSet::new(&["*.o".to_string()]).unwrap();
        Normalizer::new(tmp.path(), &filters)
            .preserving(true, true)
            .normalize(&mut session)
            .unwrap();

        assert_eq!(
            session.artifact.path.file_name().unwrap(),
            "foo_1.0.orig.tar.gz"
        );
        assert_eq!(session.temp_dir_paths().len(), 2);
        let unpacked = session.artifact.unpacked.clone().unwrap();
        assert!(unpacked.join("README").exists());
        assert!(!unpacked.join("junk.o").exists());
    }

    #[test]
    fn test_git_metadata_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("foo-1.0.tar.gz");
        write_tarball(
            &archive,
            &[("foo-1.0/README", "hi"), ("foo-1.0/.git/HEAD", "ref: x")],
        );

        let mut session = session_for(&archive);
        let filters = FilterSet::default();
        let err = Normalizer::new(tmp.path(), &filters)
            .normalize(&mut session)
            .unwrap_err();
        assert!(matches!(err, ImportOrigError::ForeignVcsMetadata { .. }));
        assert_eq!(session.artifact.unpacked, None);
    }

    #[test]
    fn test_submodule_gitdir_file_accepted() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("foo-1.0.tar.gz");
        write_tarball(
            &archive,
            &[
                ("foo-1.0/README", "hi"),
                ("foo-1.0/vendor/lib/.git", "gitdir: ../../.git/modules/lib\n"),
            ],
        );

        let mut session = session_for(&archive);
        let filters = FilterSet::default();
        Normalizer::new(tmp.path(), &filters)
            .normalize(&mut session)
            .unwrap();
        let unpacked = session.artifact.unpacked.clone().unwrap();
        assert!(unpacked.join("vendor/lib/.git").is_file());
    }

    #[test]
    fn test_corrupt_archive_is_extraction_error() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("foo-1.0.tar.gz");
        fs::write(&archive, "definitely not gzip").unwrap();

        let mut session = session_for(&archive);
        let filters = FilterSet::default();
        let err = Normalizer::new(tmp.path(), &filters)
            .normalize(&mut session)
            .unwrap_err();
        assert!(matches!(err, ImportOrigError::Extraction { .. }));
    }
}
