//! Archive extraction module
//!
//! Handles tar.gz, tar, zip and bare binaries. Every entry is placed under
//! the destination directory; entries that would land outside it are
//! rejected, as are links whose target leaves it.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

use formulary_schema::ArtifactFormat;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Invalid path in archive: {0}")]
    UnsafePath(String),
}

/// Information about an extracted file
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    /// Path relative to extraction root
    pub relative_path: PathBuf,
    /// Absolute path on disk
    pub absolute_path: PathBuf,
    /// Whether this is an executable
    pub is_executable: bool,
}

/// Extract `archive_path` into `dest_dir` according to `format`.
///
/// A bare binary is copied to `dest_dir/<file_name>`.
pub fn extract(
    archive_path: &Path,
    format: ArtifactFormat,
    dest_dir: &Path,
    file_name: &str,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    debug!(archive = %archive_path.display(), %format, "extracting");
    match format {
        ArtifactFormat::TarGz => extract_tar_gz(archive_path, dest_dir),
        ArtifactFormat::Tar => {
            let file = File::open(archive_path)?;
            extract_tar(BufReader::new(file), dest_dir)
        }
        ArtifactFormat::Zip => extract_zip(archive_path, dest_dir),
        ArtifactFormat::Binary => place_binary(archive_path, dest_dir, file_name),
    }
}

/// Extract a tar.gz archive to a destination directory
pub fn extract_tar_gz(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    let reader = BufReader::new(file);
    let gz_decoder = flate2::read::GzDecoder::new(reader);

    extract_tar(gz_decoder, dest_dir)
}

/// Extract a tar archive from a reader
fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<Vec<ExtractedFile>, ExtractError> {
    fs::create_dir_all(dest_dir)?;

    let mut archive = tar::Archive::new(reader);
    let mut extracted_files = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let relative_path = sanitize(&entry.path()?)?;
        let kind = entry.header().entry_type();

        if kind.is_dir() {
            fs::create_dir_all(dest_dir.join(&relative_path))?;
            continue;
        }
        if relative_path.as_os_str().is_empty() {
            return Err(ExtractError::UnsafePath(".".to_string()));
        }
        if kind.is_symlink() || kind.is_hard_link() {
            let target = entry
                .link_name()?
                .map(|t| t.into_owned())
                .unwrap_or_default();
            // hard link targets are archive paths, symlinks are relative to the link
            let escapes = if kind.is_hard_link() {
                sanitize(&target).is_err()
            } else {
                link_escapes(&relative_path, &target)
            };
            if escapes || target.as_os_str().is_empty() {
                return Err(ExtractError::UnsafePath(format!(
                    "{} -> {}",
                    relative_path.display(),
                    target.display()
                )));
            }
        }

        // unpack_in refuses to write through a symlink leading out of dest_dir
        if !entry.unpack_in(dest_dir)? {
            return Err(ExtractError::UnsafePath(relative_path.display().to_string()));
        }
        let absolute_path = dest_dir.join(&relative_path);

        // Check if executable (Unix mode has execute bit)
        let is_executable = entry
            .header()
            .mode()
            .map(|m| m & 0o111 != 0)
            .unwrap_or(false);

        extracted_files.push(ExtractedFile {
            relative_path,
            absolute_path,
            is_executable,
        });
    }

    Ok(extracted_files)
}

/// Extract a zip archive
pub fn extract_zip(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| ExtractError::Archive(e.to_string()))?;

    fs::create_dir_all(dest_dir)?;
    let mut extracted_files = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| ExtractError::Archive(e.to_string()))?;
        let Some(relative_path) = file.enclosed_name() else {
            return Err(ExtractError::UnsafePath(file.name().to_string()));
        };

        if file.is_dir() {
            fs::create_dir_all(dest_dir.join(&relative_path))?;
            continue;
        }

        let absolute_path = dest_dir.join(&relative_path);
        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&absolute_path)?;
        io::copy(&mut file, &mut out)?;

        let is_executable = file.unix_mode().is_some_and(|m| m & 0o111 != 0);
        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&absolute_path, fs::Permissions::from_mode(mode & 0o777))?;
        }

        extracted_files.push(ExtractedFile {
            relative_path,
            absolute_path,
            is_executable,
        });
    }

    Ok(extracted_files)
}

fn place_binary(
    source: &Path,
    dest_dir: &Path,
    file_name: &str,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let relative_path = sanitize(Path::new(file_name))?;
    if relative_path.as_os_str().is_empty() {
        return Err(ExtractError::UnsafePath(file_name.to_string()));
    }
    fs::create_dir_all(dest_dir)?;
    let absolute_path = dest_dir.join(&relative_path);
    fs::copy(source, &absolute_path)?;
    Ok(vec![ExtractedFile {
        relative_path,
        absolute_path,
        is_executable: true,
    }])
}

/// Reduce an archive entry path to a safe relative path.
///
/// `./` components are dropped, so `.` itself becomes the empty path;
/// absolute paths and `..` are rejected.
fn sanitize(path: &Path) -> Result<PathBuf, ExtractError> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractError::UnsafePath(path.display().to_string()));
            }
        }
    }
    Ok(clean)
}

/// Whether a symlink at `link` (relative to the extraction root) pointing at
/// `target` resolves outside the root.
fn link_escapes(link: &Path, target: &Path) -> bool {
    let mut depth = link.components().count().saturating_sub(1);
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return true,
            },
            Component::RootDir | Component::Prefix(_) => return true,
        }
    }
    false
}

/// The directory install sources are resolved against.
///
/// Archives that wrap everything in a single top-level directory
/// (`tool-1.0.0/bin/tool`) are entered, so manifests can name paths
/// relative to that directory.
pub fn source_root(staging: &Path) -> io::Result<PathBuf> {
    let mut entries = fs::read_dir(staging)?.collect::<Result<Vec<_>, _>>()?;
    if entries.len() == 1 && entries[0].file_type()?.is_dir() {
        if let Some(only) = entries.pop() {
            return Ok(only.path());
        }
    }
    Ok(staging.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    fn write_tar_gz(path: &Path, files: &[(&str, &[u8], u32)]) {
        let file = File::create(path).unwrap();
        let enc = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(enc);
        for (name, data, mode) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_extract_tar_gz() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("a.tar.gz");
        write_tar_gz(
            &archive,
            &[
                ("ecsfgrun", &b"#!/bin/sh\necho 0.4.0\n"[..], 0o755),
                ("README.md", &b"docs"[..], 0o644),
            ],
        );

        let dest = tmp.path().join("out");
        let files = extract(&archive, ArtifactFormat::TarGz, &dest, "a.tar.gz").unwrap();

        assert_eq!(files.len(), 2);
        let bin = files
            .iter()
            .find(|f| f.relative_path == Path::new("ecsfgrun"))
            .unwrap();
        assert!(bin.is_executable);
        assert!(dest.join("README.md").exists());
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(
            sanitize(Path::new("./dir/file")).unwrap(),
            PathBuf::from("dir/file")
        );
        assert!(sanitize(Path::new("../evil")).is_err());
        assert!(sanitize(Path::new("/etc/passwd")).is_err());
        assert!(sanitize(Path::new(".")).unwrap().as_os_str().is_empty());
    }

    #[test]
    fn test_link_escapes() {
        assert!(!link_escapes(Path::new("tool"), Path::new("bin/tool")));
        assert!(!link_escapes(Path::new("bin/tool"), Path::new("../libexec/tool")));
        assert!(link_escapes(Path::new("tool"), Path::new("../tool")));
        assert!(link_escapes(Path::new("bin/tool"), Path::new("../../tool")));
        assert!(link_escapes(Path::new("tool"), Path::new("/usr/bin/tool")));
    }

    fn tar_with_link(path: &Path, link: &str, target: &Path, then: &str) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(file);

        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_size(0);
        header.set_mode(0o777);
        header.set_link_name(target).unwrap();
        builder.append_data(&mut header, link, io::empty()).unwrap();

        let data = b"payload";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, then, &data[..]).unwrap();
        builder.into_inner().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_out_of_root_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let outside = tmp.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        let dest = tmp.path().join("out");

        for (i, target) in [outside.clone(), PathBuf::from("../outside")].iter().enumerate() {
            let archive = tmp.path().join(format!("{i}.tar"));
            tar_with_link(&archive, "link", target, "link/escaped");

            let err = extract(&archive, ArtifactFormat::Tar, &dest, "a.tar").unwrap_err();
            assert!(matches!(err, ExtractError::UnsafePath(_)), "{err}");
            assert!(!outside.join("escaped").exists());
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_inside_root_is_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("a.tar");
        tar_with_link(&archive, "ecsfgrun", Path::new("bin/ecsfgrun"), "bin/ecsfgrun");

        let dest = tmp.path().join("out");
        extract(&archive, ArtifactFormat::Tar, &dest, "a.tar").unwrap();
        assert!(fs::symlink_metadata(dest.join("ecsfgrun")).unwrap().file_type().is_symlink());
        assert_eq!(fs::read(dest.join("ecsfgrun")).unwrap(), b"payload");
    }

    #[test]
    fn test_extract_zip() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("a.zip");
        {
            let file = File::create(&archive).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let opts = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
            zip.start_file("tool/bin/tool", opts).unwrap();
            std::io::Write::write_all(&mut zip, b"binary").unwrap();
            zip.finish().unwrap();
        }

        let dest = tmp.path().join("out");
        let files = extract(&archive, ArtifactFormat::Zip, &dest, "a.zip").unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].is_executable);
        assert_eq!(source_root(&dest).unwrap(), dest.join("tool"));
    }

    #[test]
    fn test_place_binary() {
        let tmp = tempfile::tempdir().unwrap();
        let download = tmp.path().join("download");
        std::fs::write(&download, b"ELF").unwrap();

        let dest = tmp.path().join("out");
        let files = extract(&download, ArtifactFormat::Binary, &dest, "tool_Linux_x86_64").unwrap();
        assert_eq!(files[0].relative_path, PathBuf::from("tool_Linux_x86_64"));
        assert_eq!(std::fs::read(dest.join("tool_Linux_x86_64")).unwrap(), b"ELF");
    }

    #[test]
    fn test_source_root_keeps_flat_layout() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("ecsfgrun"), b"x").unwrap();
        std::fs::write(tmp.path().join("LICENSE"), b"x").unwrap();
        assert_eq!(source_root(tmp.path()).unwrap(), tmp.path());
    }
}
