// .miz container I/O: extraction into a scoped temp dir and repackaging.
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::error::ContainerError;

/// Contents of a container unpacked into a private directory. The
/// directory is removed when this value is dropped, on every exit path.
#[derive(Debug)]
pub struct Extracted {
    dir: TempDir,
    paths: Vec<PathBuf>,
}

impl Extracted {
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn member(&self, base: &str) -> Result<&Path, ContainerError> {
        let found: Vec<&PathBuf> = self
            .paths
            .iter()
            .filter(|p| p.is_file() && p.file_name().and_then(|s| s.to_str()) == Some(base))
            .collect();
        match found.as_slice() {
            [] => Err(ContainerError::MissionNotFound),
            [one] => Ok(one.as_path()),
            many => Err(ContainerError::DuplicateMission(
                many.iter().map(|p| p.to_path_buf()).collect(),
            )),
        }
    }
}

pub fn extract(container: &Path) -> Result<Extracted, ContainerError> {
    let file = fs::File::open(container).map_err(|e| ContainerError::io(container, e))?;
    let mut zip = zip::ZipArchive::new(file)?;
    let dir = tempfile::Builder::new()
        .prefix("mw-extract-")
        .tempdir()
        .map_err(|e| ContainerError::io(std::env::temp_dir(), e))?;
    let mut paths = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        // Reject, never sanitize, entries that would land outside `dir`.
        let rel = entry
            .enclosed_name()
            .map(Path::to_path_buf)
            .ok_or_else(|| ContainerError::PathTraversal(entry.name().to_string()))?;
        let out = dir.path().join(&rel);
        if !out.starts_with(dir.path()) {
            return Err(ContainerError::PathTraversal(entry.name().to_string()));
        }
        if entry.is_dir() {
            fs::create_dir_all(&out).map_err(|e| ContainerError::io(&out, e))?;
        } else {
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent).map_err(|e| ContainerError::io(parent, e))?;
            }
            let mut f = fs::File::create(&out).map_err(|e| ContainerError::io(&out, e))?;
            io::copy(&mut entry, &mut f).map_err(|e| ContainerError::io(&out, e))?;
        }
        paths.push(out);
    }
    debug!(entries = paths.len(), dir = %dir.path().display(), "container extracted");
    Ok(Extracted { dir, paths })
}

/// `<container>.tmp.zip`, the staging file written before the final rename.
pub fn staging_path(container: &Path) -> PathBuf {
    let mut s: OsString = container.as_os_str().to_owned();
    s.push(".tmp.zip");
    PathBuf::from(s)
}

/// Zips `dir` into the staging file and renames it over `container`.
/// The staging file never survives: it is renamed or removed.
pub fn repackage(dir: &Path, container: &Path) -> Result<(), ContainerError> {
    let staging = staging_path(container);
    // leftover from an interrupted run
    let _ = fs::remove_file(&staging);
    if let Err(e) = write_zip(dir, &staging) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }
    if let Err(e) = fs::rename(&staging, container) {
        let _ = fs::remove_file(&staging);
        return Err(ContainerError::io(container, e));
    }
    debug!(container = %container.display(), "container repackaged");
    Ok(())
}

fn write_zip(dir: &Path, dest: &Path) -> Result<(), ContainerError> {
    let file = fs::File::create(dest).map_err(|e| ContainerError::io(dest, e))?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        let rel = path
            .strip_prefix(dir)
            .map_err(|_| ContainerError::PathTraversal(path.display().to_string()))?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let name = rel.to_string_lossy().replace('\\', "/");
        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else {
            zip.start_file(name, options)?;
            let data = fs::read(path).map_err(|e| ContainerError::io(path, e))?;
            zip.write_all(&data).map_err(|e| ContainerError::io(dest, e))?;
        }
    }
    zip.finish()?;
    Ok(())
}
