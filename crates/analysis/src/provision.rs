//! Fetching and unpacking the mesh archive.
//!
//! This is the only part of the crate that touches the network. It is kept
//! apart from [`crate::dataset`] so that loading stays a pure filesystem read.

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::{info, warn};
use sha2::{Digest, Sha256};

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provisioned {
    /// The target directory already existed; nothing was downloaded.
    AlreadyPresent,
    Extracted { files: usize },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ProvisionError + '_ {
    move |source| ProvisionError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Downloads the zip archive at `url` and extracts it into `target`.
///
/// Does nothing when `target` exists. When `sha256` is given the archive must
/// match the hex digest.
pub fn provision<P: AsRef<Path>>(
    url: &str,
    target: P,
    sha256: Option<&str>,
) -> Result<Provisioned, ProvisionError> {
    let target = target.as_ref();
    if target.exists() {
        info!("{} exists, skipping download", target.display());
        return Ok(Provisioned::AlreadyPresent);
    }

    info!("downloading {}", url);
    let mut archive = download_file()?;
    let mut response = reqwest::blocking::get(url)?.error_for_status()?;
    let bytes = response.copy_to(archive.as_file_mut())?;
    info!("downloaded {} bytes", bytes);

    install_archive(archive.path(), target, sha256)
}

/// An empty file in the system temporary directory to download into.
fn download_file() -> Result<tempfile::NamedTempFile, ProvisionError> {
    let dir = std::env::temp_dir();
    tempfile::NamedTempFile::new_in(&dir).map_err(io_error(&dir))
}

/// Verifies and extracts an archive that is already on disk.
///
/// An archive holding a single top-level directory is unpacked as `target`
/// itself; otherwise its entries are placed directly inside `target`.
pub fn install_archive<P: AsRef<Path>, Q: AsRef<Path>>(
    archive_path: P,
    target: Q,
    sha256: Option<&str>,
) -> Result<Provisioned, ProvisionError> {
    let (archive_path, target) = (archive_path.as_ref(), target.as_ref());
    if target.exists() {
        return Ok(Provisioned::AlreadyPresent);
    }
    let mut file = File::open(archive_path).map_err(io_error(archive_path))?;

    if let Some(expected) = sha256 {
        let mut hasher = Sha256::new();
        std::io::copy(&mut file, &mut hasher).map_err(io_error(archive_path))?;
        let actual = format!("{:x}", hasher.finalize());
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            return Err(ProvisionError::ChecksumMismatch {
                expected: expected.trim().to_string(),
                actual,
            });
        }
        file.seek(SeekFrom::Start(0))
            .map_err(io_error(archive_path))?;
    } else {
        warn!("no checksum given, archive is not verified");
    }

    let mut archive = zip::ZipArchive::new(file)?;
    let files = archive.file_names().filter(|n| !n.ends_with('/')).count();

    // Staged next to the target, then renamed into place.
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(io_error(&parent))?;
    let staging = tempfile::tempdir_in(&parent).map_err(io_error(&parent))?;
    archive.extract(staging.path())?;

    let source = single_directory(staging.path())?.unwrap_or_else(|| staging.path().to_path_buf());
    std::fs::rename(&source, target).map_err(io_error(target))?;
    info!("extracted {} files to {}", files, target.display());
    Ok(Provisioned::Extracted { files })
}

fn single_directory(dir: &Path) -> Result<Option<PathBuf>, ProvisionError> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error(dir))? {
        entries.push(entry.map_err(io_error(dir))?.path());
    }
    match entries.as_slice() {
        [only] if only.is_dir() => Ok(Some(only.clone())),
        _ => Ok(None),
    }
}
