// src/archive.rs

use std::{
    fs::{self, File},
    io::{self, Read},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;

use crate::error::{ArchiveError, ParseError};

/// `true` when `path` carries a `.zip` extension (any case).
pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
}

fn has_master_extension(name: &str, extensions: &[&str]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>, ArchiveError> {
    let file = File::open(path).map_err(|source| ArchiveError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    ZipArchive::new(file).map_err(|source| ArchiveError::Zip {
        path: path.to_path_buf(),
        source,
    })
}

/// Return the concrete master file behind `path`.
///
/// Plain files come back unchanged. Archives are extracted in full next to
/// themselves (existing files are overwritten) and the first entry, in archive
/// order, whose extension is one of `extensions` is returned.
#[instrument(level = "debug", skip(path, extensions), fields(file = %path.as_ref().display()))]
pub fn resolve(path: impl AsRef<Path>, extensions: &[&str]) -> Result<PathBuf, ArchiveError> {
    let path = path.as_ref();
    if !is_archive(path) {
        return Ok(path.to_path_buf());
    }

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut archive = open_archive(path)?;
    let mut master: Option<PathBuf> = None;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|source| ArchiveError::Zip {
            path: path.to_path_buf(),
            source,
        })?;
        let name = entry.name().to_string();

        // entries like "../x" would land outside the archive's directory
        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = %name, "skipping archive entry with unsafe path");
            continue;
        };
        let target = base_dir.join(relative);

        let extract_err = |source: io::Error| ArchiveError::Extract {
            path: path.to_path_buf(),
            entry: name.clone(),
            source,
        };

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(extract_err)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(extract_err)?;
        }
        let mut out = File::create(&target).map_err(extract_err)?;
        io::copy(&mut entry, &mut out).map_err(extract_err)?;
        debug!(entry = %name, target = %target.display(), "extracted");

        if master.is_none() && has_master_extension(&name, extensions) {
            master = Some(target);
        }
    }

    match master {
        Some(found) => {
            info!(master = %found.display(), "archive extracted");
            Ok(found)
        }
        None => Err(ArchiveError::NoMasterFile {
            path: path.to_path_buf(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
        }),
    }
}

/// Read the master bytes without touching the disk beyond the source itself.
/// For archives the first matching entry is read in memory.
///
/// Returns the name of the file actually read alongside its bytes.
pub fn read_master_bytes(
    path: impl AsRef<Path>,
    extensions: &[&str],
) -> Result<(String, Vec<u8>), ParseError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ParseError::Missing(path.to_path_buf()));
    }

    if !is_archive(path) {
        let bytes = fs::read(path).map_err(|source| ParseError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        return Ok((name, bytes));
    }

    let mut archive = open_archive(path)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|source| ArchiveError::Zip {
            path: path.to_path_buf(),
            source,
        })?;
        let name = entry.name().to_string();
        if !entry.is_file() || !has_master_extension(&name, extensions) {
            continue;
        }
        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut buf)
            .map_err(|source| ParseError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        return Ok((name, buf));
    }

    Err(ArchiveError::NoMasterFile {
        path: path.to_path_buf(),
        extensions: extensions.iter().map(|e| e.to_string()).collect(),
    }
    .into())
}
