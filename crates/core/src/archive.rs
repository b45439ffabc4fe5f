//! Archive filename classification.
//!
//! Upstream artifacts come as `foo-1.0.tar.gz`, `foo_1.0.orig.tar.xz`,
//! `foo-1.0.tgz`, `foo-1.0.zip` and friends. These helpers split such a name
//! into its base, archive format and compression without touching the disk.

/// Container format of an upstream archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
    Zip,
}

/// Compression wrapped around a tar container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Lzma,
}

impl Compression {
    /// The extension used for `.orig.tar.<ext>` names.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Gzip => Some("gz"),
            Self::Bzip2 => Some("bz2"),
            Self::Xz => Some("xz"),
            Self::Lzma => Some("lzma"),
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "gz" => Some(Self::Gzip),
            "bz2" => Some(Self::Bzip2),
            "xz" => Some(Self::Xz),
            "lzma" => Some(Self::Lzma),
            _ => None,
        }
    }
}

/// Result of [`parse_archive_filename`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    /// Filename with every archive/compression extension stripped.
    pub base: String,
    /// `None` when the name does not look like an archive at all.
    pub format: Option<ArchiveFormat>,
    pub compression: Compression,
}

/// Split `filename` into base name, archive format and compression.
///
/// Shorthand extensions (`tgz`, `tbz2`, `tbz`, `txz`, `tlz`) imply a tar
/// container. Names that are not archives come back unchanged with
/// `format == None`.
pub fn parse_archive_filename(filename: &str) -> ArchiveName {
    let shorthand = [
        (".tgz", Compression::Gzip),
        (".tbz2", Compression::Bzip2),
        (".tbz", Compression::Bzip2),
        (".txz", Compression::Xz),
        (".tlz", Compression::Lzma),
    ];
    for (suffix, compression) in shorthand {
        if let Some(base) = filename.strip_suffix(suffix) {
            return ArchiveName {
                base: base.to_string(),
                format: Some(ArchiveFormat::Tar),
                compression,
            };
        }
    }

    if let Some(base) = filename.strip_suffix(".zip") {
        return ArchiveName {
            base: base.to_string(),
            format: Some(ArchiveFormat::Zip),
            compression: Compression::None,
        };
    }

    let (stem, compression) = match filename.rsplit_once('.') {
        Some((stem, ext)) => match Compression::from_extension(ext) {
            Some(compression) => (stem, compression),
            None => (filename, Compression::None),
        },
        None => (filename, Compression::None),
    };

    match stem.strip_suffix(".tar") {
        Some(base) => ArchiveName {
            base: base.to_string(),
            format: Some(ArchiveFormat::Tar),
            compression,
        },
        None => ArchiveName {
            base: filename.to_string(),
            format: None,
            compression: Compression::None,
        },
    }
}

/// Extension suffix used for the canonical `.orig.tar<suffix>` link name.
///
/// Takes the last extension of `filename` and expands the single-token tar
/// shorthands: `.tgz` → `.gz`, `.tbz2` → `.bz2`, `.tlz` → `.lz`, `.txz` → `.xz`.
/// An uncompressed `.tar` yields an empty suffix.
pub fn orig_link_extension(filename: &str) -> String {
    let ext = match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[idx..],
        _ => "",
    };
    match ext {
        ".tgz" | ".tbz2" | ".tlz" | ".txz" => format!(".{}", &ext[2..]),
        ".tar" => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_tarballs() {
        let name = parse_archive_filename("foo-1.0.tar.gz");
        assert_eq!(name.base, "foo-1.0");
        assert_eq!(name.format, Some(ArchiveFormat::Tar));
        assert_eq!(name.compression, Compression::Gzip);

        let name = parse_archive_filename("foo_1.0.orig.tar.xz");
        assert_eq!(name.base, "foo_1.0.orig");
        assert_eq!(name.compression, Compression::Xz);

        let name = parse_archive_filename("foo-1.0.tar");
        assert_eq!(name.base, "foo-1.0");
        assert_eq!(name.compression, Compression::None);
    }

    #[test]
    fn test_parse_shorthand_and_zip() {
        let name = parse_archive_filename("foo-1.0.tgz");
        assert_eq!(name.base, "foo-1.0");
        assert_eq!(name.format, Some(ArchiveFormat::Tar));
        assert_eq!(name.compression, Compression::Gzip);

        let name = parse_archive_filename("foo-1.0.tbz2");
        assert_eq!(name.compression, Compression::Bzip2);

        let name = parse_archive_filename("foo-1.0.zip");
        assert_eq!(name.base, "foo-1.0");
        assert_eq!(name.format, Some(ArchiveFormat::Zip));
    }

    #[test]
    fn test_parse_non_archive() {
        let name = parse_archive_filename("foo-1.0");
        assert_eq!(name.base, "foo-1.0");
        assert_eq!(name.format, None);

        // A bare compressed file is not a tarball.
        let name = parse_archive_filename("notes.gz");
        assert_eq!(name.format, None);
        assert_eq!(name.base, "notes.gz");
    }

    #[test]
    fn test_orig_link_extension() {
        assert_eq!(orig_link_extension("foo-1.0.tar.gz"), ".gz");
        assert_eq!(orig_link_extension("foo-1.0.tgz"), ".gz");
        assert_eq!(orig_link_extension("foo-1.0.tbz2"), ".bz2");
        assert_eq!(orig_link_extension("foo-1.0.txz"), ".xz");
        assert_eq!(orig_link_extension("foo-1.0.tlz"), ".lz");
        assert_eq!(orig_link_extension("foo-1.0.tar.bz2"), ".bz2");
        assert_eq!(orig_link_extension("foo-1.0.tar"), "");
        assert_eq!(orig_link_extension("foo"), "");
    }
}
