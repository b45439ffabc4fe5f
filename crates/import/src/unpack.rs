//! Archive extraction, repacking and path filters.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::process::Command;

use debsrc_core::{parse_archive_filename, ArchiveFormat, Compression};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum UnpackError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("invalid filter pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("'{0}' is not a recognized archive")]
    Unsupported(String),
    #[error("archive entry escapes the destination: {}", .0.display())]
    UnsafePath(PathBuf),
    #[error("tar failed: {0}")]
    Tool(String),
}

/// Glob patterns excluding paths from the imported tree.
///
/// A pattern matches any run of trailing path components, so `*.o` drops
/// object files at every depth and `debian` drops a `debian/` directory
/// wherever it appears, together with everything under it.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    raw: Vec<String>,
    patterns: Vec<glob::Pattern>,
}

impl FilterSet {
    pub fn new(patterns: &[String]) -> Result<Self, UnpackError> {
        let compiled = patterns
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            raw: patterns.to_vec(),
            patterns: compiled,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[String] {
        &self.raw
    }

    /// Whether `rel` or one of its parent directories is excluded.
    pub fn excludes(&self, rel: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let parts: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        (1..=parts.len()).any(|end| {
            (0..end).any(|start| {
                let candidate = parts[start..end].join("/");
                self.patterns.iter().any(|p| p.matches(&candidate))
            })
        })
    }
}

/// Extract `archive` into `dest`, skipping filtered paths.
///
/// Plain and gzip tarballs and zip files are read in-process; other tar
/// compressions go through the system `tar`.
pub fn extract_archive(archive: &Path, dest: &Path, filters: &FilterSet) -> Result<(), UnpackError> {
    let filename = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parsed = parse_archive_filename(&filename);
    match (parsed.format, parsed.compression) {
        (Some(ArchiveFormat::Tar), Compression::None) => {
            extract_tar(tar::Archive::new(File::open(archive)?), dest, filters)
        }
        (Some(ArchiveFormat::Tar), Compression::Gzip) => extract_tar(
            tar::Archive::new(GzDecoder::new(File::open(archive)?)),
            dest,
            filters,
        ),
        (Some(ArchiveFormat::Tar), _) => extract_with_tar_tool(archive, dest, filters),
        (Some(ArchiveFormat::Zip), _) => extract_zip(archive, dest, filters),
        (None, _) => Err(UnpackError::Unsupported(filename)),
    }
}

fn extract_tar<R: io::Read>(
    mut archive: tar::Archive<R>,
    dest: &Path,
    filters: &FilterSet,
) -> Result<(), UnpackError> {
    archive.set_preserve_permissions(true);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let rel = entry.path()?.into_owned();
        check_entry_path(&rel)?;
        if filters.excludes(&rel) {
            debug!(path = %rel.display(), "Filtered");
            continue;
        }
        entry.unpack_in(dest)?;
    }
    Ok(())
}

fn extract_zip(archive: &Path, dest: &Path, filters: &FilterSet) -> Result<(), UnpackError> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
    for i in 0..zip.len() {
        let mut file = zip.by_index(i)?;
        let rel = file
            .enclosed_name()
            .ok_or_else(|| UnpackError::UnsafePath(PathBuf::from(file.name())))?;
        if filters.excludes(&rel) {
            debug!(path = %rel.display(), "Filtered");
            continue;
        }
        let target = dest.join(&rel);
        if file.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut file, &mut out)?;
        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o7777))?;
        }
    }
    Ok(())
}

fn extract_with_tar_tool(
    archive: &Path,
    dest: &Path,
    filters: &FilterSet,
) -> Result<(), UnpackError> {
    let mut cmd = Command::new("tar");
    cmd.arg("-x").arg("-f").arg(archive).arg("-C").arg(dest);
    for pattern in filters.patterns() {
        cmd.arg(format!("--exclude={pattern}"));
    }
    let output = cmd.output()?;
    if !output.status.success() {
        return Err(UnpackError::Tool(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(())
}

fn check_entry_path(rel: &Path) -> Result<(), UnpackError> {
    let unsafe_component = rel
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if unsafe_component {
        return Err(UnpackError::UnsafePath(rel.to_path_buf()));
    }
    Ok(())
}

/// Pack `src` into a gzip tarball at `dest`, with every entry below `prefix/`.
pub fn pack_tree(src: &Path, prefix: &str, dest: &Path) -> Result<(), UnpackError> {
    let encoder = GzEncoder::new(File::create(dest)?, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);
    builder.append_dir_all(prefix, src)?;
    builder.into_inner()?.finish()?;
    Ok(())
}

/// The single top-level directory of an unpacked archive, or `dir` itself.
pub fn unpacked_root(dir: &Path) -> Result<PathBuf, UnpackError> {
    let entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    if let [only] = entries.as_slice() {
        if only.file_type()?.is_dir() {
            return Ok(only.path());
        }
    }
    Ok(dir.to_path_buf())
}

/// First `.git` directory below `root`, symlinks not followed.
///
/// A `.git` file (a submodule's `gitdir:` pointer) is plain content.
pub fn find_git_metadata(root: &Path) -> Result<Option<PathBuf>, UnpackError> {
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if entry.file_name() == ".git" {
                return Ok(Some(entry.path()));
            }
            stack.push(entry.path());
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::write_tarball;

    fn filters(patterns: &[&str]) -> FilterSet {
        FilterSet::new(&patterns.iter().map(|p| p.to_string()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn test_filter_matches_at_any_depth() {
        let f = filters(&["*.o", "debian"]);
        assert!(f.excludes(Path::new("foo-1.0/src/main.o")));
        assert!(f.excludes(Path::new("foo-1.0/debian")));
        assert!(f.excludes(Path::new("foo-1.0/debian/rules")));
        assert!(!f.excludes(Path::new("foo-1.0/src/main.c")));
        assert!(!f.excludes(Path::new("foo-1.0/debianize.sh")));
    }

    #[test]
    fn test_filter_multi_component_pattern() {
        let f = filters(&["doc/*.pdf"]);
        assert!(f.excludes(Path::new("foo-1.0/doc/manual.pdf")));
        assert!(!f.excludes(Path::new("foo-1.0/manual.pdf")));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            FilterSet::new(&["[".to_string()]),
            Err(UnpackError::Pattern(_))
        ));
    }

    #[test]
    fn test_extract_tar_gz_with_filters() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("foo-1.0.tar.gz");
        write_tarball(
            &archive,
            &[
                ("foo-1.0/README", "hello\n"),
                ("foo-1.0/build/out.o", "bin"),
                ("foo-1.0/src/lib.c", "int x;\n"),
            ],
        );
        let dest = tmp.path().join("out");
        fs::create_dir(&dest).unwrap();

        extract_archive(&archive, &dest, &filters(&["*.o"])).unwrap();

        let root = unpacked_root(&dest).unwrap();
        assert_eq!(root, dest.join("foo-1.0"));
        assert_eq!(fs::read_to_string(root.join("README")).unwrap(), "hello\n");
        assert!(root.join("src/lib.c").exists());
        assert!(!root.join("build/out.o").exists());
    }

    #[test]
    fn test_extract_zip() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("foo-1.0.zip");
        {
            let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("foo-1.0/a.txt", options).unwrap();
            io::Write::write_all(&mut zip, b"a").unwrap();
            zip.start_file("foo-1.0/b.txt", options).unwrap();
            io::Write::write_all(&mut zip, b"b").unwrap();
            zip.finish().unwrap();
        }
        let dest = tmp.path().join("out");
        fs::create_dir(&dest).unwrap();

        extract_archive(&archive, &dest, &FilterSet::default()).unwrap();
        assert_eq!(fs::read_to_string(dest.join("foo-1.0/a.txt")).unwrap(), "a");
        assert_eq!(fs::read_to_string(dest.join("foo-1.0/b.txt")).unwrap(), "b");
    }

    #[test]
    fn test_extract_unknown_format() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("notes.txt");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            extract_archive(&file, tmp.path(), &FilterSet::default()),
            Err(UnpackError::Unsupported(_))
        ));
    }

    #[test]
    fn test_unpacked_root_with_several_entries() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a"), "").unwrap();
        fs::create_dir(tmp.path().join("b")).unwrap();
        assert_eq!(unpacked_root(tmp.path()).unwrap(), tmp.path());
    }

    #[test]
    fn test_pack_tree_roundtrip_keeps_prefix() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("sub/file"), "data").unwrap();

        let packed = tmp.path().join("foo_1.0.orig.tar.gz");
        pack_tree(&src, "foo-1.0", &packed).unwrap();

        let dest = tmp.path().join("dest");
        fs::create_dir(&dest).unwrap();
        extract_archive(&packed, &dest, &FilterSet::default()).unwrap();
        assert_eq!(
            fs::read_to_string(dest.join("foo-1.0/sub/file")).unwrap(),
            "data"
        );
    }

    #[test]
    fn test_find_git_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        assert_eq!(find_git_metadata(tmp.path()).unwrap(), None);

        fs::write(tmp.path().join("a/.git"), "gitdir: ../.git/modules/a\n").unwrap();
        assert_eq!(find_git_metadata(tmp.path()).unwrap(), None);

        fs::create_dir_all(tmp.path().join("a/b/.git")).unwrap();
        assert_eq!(
            find_git_metadata(tmp.path()).unwrap(),
            Some(tmp.path().join("a/b/.git"))
        );
    }
}
