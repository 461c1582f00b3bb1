//! Archive extraction for tar+gzip and zip containers
//!
//! Entries are unpacked into a hidden staging directory created inside the
//! destination, then moved into place once the whole archive has been read.
//! A failure part way through drops the staging directory, leaving the
//! destination as it was and the archive on disk for a retry.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use log::{debug, info, warn};
use tar::Archive;
use zip::ZipArchive;

use crate::install::catalog::ArchiveKind;
use crate::install::error::{InstallError, Result};

/// Unpack `archive_path` into `destination` and delete the archive
///
/// The archive's relative layout is reproduced under `destination`; existing
/// directories are merged and existing files replaced. Returns the number of
/// files written.
pub fn extract(archive_path: &Path, kind: ArchiveKind, destination: &Path) -> Result<usize> {
    fs::create_dir_all(destination).map_err(|e| {
        InstallError::io(format!("Failed to create {}", destination.display()), e)
    })?;

    let staging = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(destination)
        .map_err(|e| {
            InstallError::io(
                format!("Failed to create staging directory in {}", destination.display()),
                e,
            )
        })?;

    let files = match kind {
        ArchiveKind::TarGz => unpack_tar_gz(archive_path, staging.path())?,
        ArchiveKind::Zip => unpack_zip(archive_path, staging.path())?,
    };

    promote(staging.path(), destination)?;
    staging
        .close()
        .map_err(|e| InstallError::io("Failed to remove staging directory", e))?;

    // Only reached on success; a failed extraction keeps the archive for a retry
    match fs::remove_file(archive_path) {
        Ok(()) => debug!("Removed {}", archive_path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {e}", archive_path.display()),
    }

    info!(
        "Extracted {} files from {} into {}",
        files,
        archive_path.display(),
        destination.display()
    );
    Ok(files)
}

/// Relative path of an entry, or `None` if it is absolute or climbs out of the root
fn safe_relative(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| InstallError::io(format!("Failed to create directory {}", path.display()), e))
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) => create_dir(parent),
        None => Ok(()),
    }
}

/// Copy entry bytes, classifying decoder failures as archive corruption
fn copy_entry<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    archive_path: &Path,
    target: &Path,
) -> Result<u64> {
    io::copy(reader, writer).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => {
            InstallError::corrupt(archive_path, format!("{}: {e}", target.display()))
        }
        _ => InstallError::io(format!("Failed to write {}", target.display()), e),
    })
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777)).map_err(|e| {
        InstallError::io(format!("Failed to set permissions on {}", path.display()), e)
    })
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

fn unpack_tar_gz(archive_path: &Path, root: &Path) -> Result<usize> {
    let file = File::open(archive_path)
        .map_err(|e| InstallError::io(format!("Failed to open {}", archive_path.display()), e))?;
    let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));
    let mut files = 0;

    let entries = archive
        .entries()
        .map_err(|e| InstallError::corrupt(archive_path, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| InstallError::corrupt(archive_path, e))?;
        let raw_path = entry
            .path()
            .map_err(|e| InstallError::corrupt(archive_path, e))?
            .into_owned();

        let Some(relative) = safe_relative(&raw_path) else {
            if !raw_path.components().all(|c| c == Component::CurDir) {
                warn!("Skipping unsafe archive entry {}", raw_path.display());
            }
            continue;
        };
        let target = root.join(&relative);
        let entry_type = entry.header().entry_type();

        if entry_type.is_dir() {
            create_dir(&target)?;
        } else if entry_type.is_file() {
            create_parent(&target)?;
            let mut out = File::create(&target).map_err(|e| {
                InstallError::io(format!("Failed to create {}", target.display()), e)
            })?;
            copy_entry(&mut entry, &mut out, archive_path, &target)?;
            drop(out);

            if let Ok(mode) = entry.header().mode() {
                apply_mode(&target, mode)?;
            }
            files += 1;
        } else if entry_type.is_symlink() {
            let link = entry
                .link_name()
                .map_err(|e| InstallError::corrupt(archive_path, e))?
                .map(|l| l.into_owned());
            unpack_symlink(&target, link.as_deref())?;
        } else {
            debug!("Skipping {:?} entry {}", entry_type, relative.display());
        }
    }

    // tar stops at the end-of-archive marker; read the rest so the gzip
    // trailer is checked and a truncated download is caught
    io::copy(&mut archive.into_inner(), &mut io::sink())
        .map_err(|e| InstallError::corrupt(archive_path, e))?;

    Ok(files)
}

#[cfg(unix)]
fn unpack_symlink(target: &Path, link: Option<&Path>) -> Result<()> {
    let Some(link) = link else {
        warn!("Skipping symlink {} without a target", target.display());
        return Ok(());
    };
    if link.is_absolute() || link.components().any(|c| c == Component::ParentDir) {
        warn!("Skipping symlink {} -> {}", target.display(), link.display());
        return Ok(());
    }

    create_parent(target)?;
    if fs::symlink_metadata(target).is_ok() {
        fs::remove_file(target)
            .map_err(|e| InstallError::io(format!("Failed to replace {}", target.display()), e))?;
    }
    std::os::unix::fs::symlink(link, target)
        .map_err(|e| InstallError::io(format!("Failed to link {}", target.display()), e))
}

#[cfg(not(unix))]
fn unpack_symlink(target: &Path, _link: Option<&Path>) -> Result<()> {
    debug!("Skipping symlink {}", target.display());
    Ok(())
}

fn unpack_zip(archive_path: &Path, root: &Path) -> Result<usize> {
    let file = File::open(archive_path)
        .map_err(|e| InstallError::io(format!("Failed to open {}", archive_path.display()), e))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|e| InstallError::corrupt(archive_path, e))?;
    let mut files = 0;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| InstallError::corrupt(archive_path, e))?;

        let Some(relative) = entry.enclosed_name().as_deref().and_then(safe_relative) else {
            warn!("Skipping unsafe archive entry {}", entry.name());
            continue;
        };
        let target = root.join(&relative);

        if entry.is_dir() {
            create_dir(&target)?;
            continue;
        }

        create_parent(&target)?;
        let mut out = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&target)
            .map_err(|e| InstallError::io(format!("Failed to create {}", target.display()), e))?;
        copy_entry(&mut entry, &mut out, archive_path, &target)?;
        drop(out);

        if let Some(mode) = entry.unix_mode() {
            apply_mode(&target, mode)?;
        }
        files += 1;
    }

    Ok(files)
}

/// Move everything under `staging` into `destination`, merging directories
fn promote(staging: &Path, destination: &Path) -> Result<()> {
    let read_dir = fs::read_dir(staging)
        .map_err(|e| InstallError::io(format!("Failed to read {}", staging.display()), e))?;

    for entry in read_dir {
        let entry = entry.map_err(|e| {
            InstallError::io(format!("Failed to read {}", staging.display()), e)
        })?;
        let source = entry.path();
        let target = destination.join(entry.file_name());
        let is_dir = entry
            .file_type()
            .map_err(|e| InstallError::io(format!("Failed to stat {}", source.display()), e))?
            .is_dir();

        match fs::symlink_metadata(&target) {
            Ok(existing) if is_dir && existing.is_dir() => {
                promote(&source, &target)?;
                continue;
            }
            Ok(existing) => {
                let removed = if existing.is_dir() {
                    fs::remove_dir_all(&target)
                } else {
                    fs::remove_file(&target)
                };
                removed.map_err(|e| {
                    InstallError::io(format!("Failed to replace {}", target.display()), e)
                })?;
            }
            Err(_) => {}
        }

        fs::rename(&source, &target).map_err(|e| {
            InstallError::io(
                format!("Failed to move {} to {}", source.display(), target.display()),
                e,
            )
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::error::ErrorKind;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::collections::BTreeSet;
    use tar::{EntryType, Header};
    use zip::write::SimpleFileOptions;

    fn write_tar_gz(path: &Path, files: &[(&str, &[u8], u32)]) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, data, mode) in files {
            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::Regular);
            header.set_size(data.len() as u64);
            header.set_mode(*mode);
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn names(dir: &Path) -> BTreeSet<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    /// Incompressible filler so truncation lands inside entry data
    fn noise(len: usize) -> Vec<u8> {
        let mut state: u32 = 0x9E37_79B9;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state as u8
            })
            .collect()
    }

    #[test]
    fn tar_gz_round_trip_reproduces_layout() {
        let work = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let archive = work.path().join("bundle.tar.gz");
        write_tar_gz(
            &archive,
            &[("a.txt", b"hello", 0o644), ("dir/b.txt", b"world", 0o644)],
        );

        let files = extract(&archive, ArchiveKind::TarGz, dest.path()).unwrap();

        assert_eq!(files, 2);
        assert_eq!(names(dest.path()), BTreeSet::from(["a.txt".into(), "dir".into()]));
        assert_eq!(names(&dest.path().join("dir")), BTreeSet::from(["b.txt".into()]));
        assert_eq!(fs::read(dest.path().join("a.txt")).unwrap(), b"hello");
        assert_eq!(fs::read(dest.path().join("dir/b.txt")).unwrap(), b"world");
        assert!(!archive.exists(), "archive should be removed after success");
    }

    #[test]
    fn truncated_tar_gz_keeps_archive_and_destination_clean() {
        let work = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let archive = work.path().join("voice.tar.gz");
        let payload = noise(256 * 1024);
        write_tar_gz(
            &archive,
            &[("model.onnx", payload.as_slice(), 0o644), ("model.onnx.json", b"{}", 0o644)],
        );
        let len = fs::metadata(&archive).unwrap().len();
        OpenOptions::new()
            .write(true)
            .open(&archive)
            .unwrap()
            .set_len(len / 2)
            .unwrap();

        let err = extract(&archive, ArchiveKind::TarGz, dest.path()).unwrap_err();

        assert!(
            matches!(err.kind(), ErrorKind::CorruptArchive | ErrorKind::Io),
            "unexpected error: {err}"
        );
        assert!(archive.exists(), "archive must survive a failed extraction");
        assert!(names(dest.path()).is_empty(), "no partial files should be visible");
    }

    #[test]
    fn garbage_is_reported_as_corrupt() {
        let work = tempfile::tempdir().unwrap();
        let archive = work.path().join("junk.tar.gz");
        fs::write(&archive, b"definitely not gzip").unwrap();

        let err = extract(&archive, ArchiveKind::TarGz, work.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptArchive);
        assert!(archive.exists());

        let zip_path = work.path().join("junk.zip");
        fs::write(&zip_path, b"definitely not zip").unwrap();
        let err = extract(&zip_path, ArchiveKind::Zip, work.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptArchive);
        assert!(zip_path.exists());
    }

    #[test]
    fn tar_gz_merges_into_existing_directories() {
        let work = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        fs::create_dir_all(dest.path().join("piper/models")).unwrap();
        fs::write(dest.path().join("piper/models/en-us-amy-low.onnx"), b"voice").unwrap();
        fs::write(dest.path().join("piper/piper"), b"old engine").unwrap();

        let archive = work.path().join("piper_linux_x86_64.tar.gz");
        write_tar_gz(
            &archive,
            &[("piper/piper", b"new engine", 0o755), ("piper/libpiper.so", b"lib", 0o644)],
        );

        extract(&archive, ArchiveKind::TarGz, dest.path()).unwrap();

        assert_eq!(fs::read(dest.path().join("piper/piper")).unwrap(), b"new engine");
        assert_eq!(
            fs::read(dest.path().join("piper/models/en-us-amy-low.onnx")).unwrap(),
            b"voice"
        );
        assert!(dest.path().join("piper/libpiper.so").exists());
    }

    #[cfg(unix)]
    #[test]
    fn tar_gz_preserves_modes_and_relative_symlinks() {
        use std::os::unix::fs::PermissionsExt;

        let work = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let archive = work.path().join("engine.tar.gz");

        let file = File::create(&archive).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(3);
        header.set_mode(0o755);
        builder.append_data(&mut header, "piper/piper", &b"bin"[..]).unwrap();

        let mut link = Header::new_gnu();
        link.set_entry_type(EntryType::Symlink);
        link.set_size(0);
        link.set_mode(0o777);
        link.set_link_name("piper").unwrap();
        builder.append_data(&mut link, "piper/piper-link", io::empty()).unwrap();

        let mut escaping = Header::new_gnu();
        escaping.set_entry_type(EntryType::Symlink);
        escaping.set_size(0);
        escaping.set_link_name("/etc/passwd").unwrap();
        builder.append_data(&mut escaping, "piper/passwd", io::empty()).unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        extract(&archive, ArchiveKind::TarGz, dest.path()).unwrap();

        let mode = fs::metadata(dest.path().join("piper/piper")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert_eq!(
            fs::read_link(dest.path().join("piper/piper-link")).unwrap(),
            PathBuf::from("piper")
        );
        assert!(fs::symlink_metadata(dest.path().join("piper/passwd")).is_err());
    }

    fn write_zip(path: &Path, entries: &[(&str, Option<&[u8]>, u32)]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, data, mode) in entries {
            let options = SimpleFileOptions::default().unix_permissions(*mode);
            match data {
                Some(bytes) => {
                    writer.start_file(*name, options).unwrap();
                    writer.write_all(bytes).unwrap();
                }
                None => {
                    writer.add_directory(*name, options).unwrap();
                }
            }
        }
        writer.finish().unwrap();
    }

    #[test]
    fn zip_round_trip_reproduces_layout() {
        let work = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let archive = work.path().join("piper_windows_amd64.zip");
        write_zip(
            &archive,
            &[
                ("piper/", None, 0o755),
                ("piper/espeak-ng-data/", None, 0o755),
                ("piper/piper.exe", Some(b"MZ"), 0o644),
                ("piper/espeak-ng-data/phontab", Some(b"tab"), 0o644),
            ],
        );

        let files = extract(&archive, ArchiveKind::Zip, dest.path()).unwrap();

        assert_eq!(files, 2);
        assert_eq!(names(dest.path()), BTreeSet::from(["piper".into()]));
        assert_eq!(fs::read(dest.path().join("piper/piper.exe")).unwrap(), b"MZ");
        assert_eq!(
            fs::read(dest.path().join("piper/espeak-ng-data/phontab")).unwrap(),
            b"tab"
        );
        assert!(!archive.exists());
    }

    #[cfg(unix)]
    #[test]
    fn zip_preserves_executable_bits() {
        use std::os::unix::fs::PermissionsExt;

        let work = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let archive = work.path().join("engine.zip");
        write_zip(
            &archive,
            &[
                ("piper/piper", Some(b"\x7fELF"), 0o755),
                ("piper/README", Some(b"docs"), 0o644),
            ],
        );

        extract(&archive, ArchiveKind::Zip, dest.path()).unwrap();

        let exe = fs::metadata(dest.path().join("piper/piper")).unwrap().permissions().mode();
        let doc = fs::metadata(dest.path().join("piper/README")).unwrap().permissions().mode();
        assert_ne!(exe & 0o111, 0, "binary should be executable");
        assert_eq!(doc & 0o111, 0);
    }

    #[test]
    fn zip_entries_escaping_the_root_are_skipped() {
        let work = tempfile::tempdir().unwrap();
        let dest_parent = tempfile::tempdir().unwrap();
        let dest = dest_parent.path().join("out");
        let archive = work.path().join("evil.zip");
        write_zip(
            &archive,
            &[("../evil.txt", Some(b"nope"), 0o644), ("ok.txt", Some(b"yes"), 0o644)],
        );

        let files = extract(&archive, ArchiveKind::Zip, &dest).unwrap();

        assert_eq!(files, 1);
        assert!(dest.join("ok.txt").exists());
        assert!(!dest_parent.path().join("evil.txt").exists());
    }

    #[test]
    fn safe_relative_rejects_escapes() {
        assert_eq!(safe_relative(Path::new("./a/b")), Some(PathBuf::from("a/b")));
        assert_eq!(safe_relative(Path::new("a/../../b")), None);
        assert_eq!(safe_relative(Path::new("/etc/passwd")), None);
        assert_eq!(safe_relative(Path::new("./")), None);
    }
}
