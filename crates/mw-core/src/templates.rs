// Weather template files for the legacy single-purpose mode.
use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::error::TemplateError;

pub const TEMPLATE_DIR: &str = "weather-templates";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Named(String),
    Random,
}

pub fn default_template_dir() -> Result<PathBuf, TemplateError> {
    let exe = std::env::current_exe().map_err(|e| TemplateError::Io {
        path: PathBuf::from(TEMPLATE_DIR),
        source: e,
    })?;
    let base = exe.parent().unwrap_or(Path::new("."));
    Ok(base.join(TEMPLATE_DIR))
}

pub fn list_templates(dir: &Path) -> Result<Vec<PathBuf>, TemplateError> {
    let rd = fs::read_dir(dir).map_err(|e| TemplateError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let mut out: Vec<PathBuf> = rd.flatten().map(|e| e.path()).filter(|p| p.is_file()).collect();
    out.sort();
    Ok(out)
}

pub fn resolve_template<R: Rng + ?Sized>(
    dir: &Path,
    source: &TemplateSource,
    rng: &mut R,
) -> Result<PathBuf, TemplateError> {
    let path = match source {
        TemplateSource::Named(name) => dir.join(name),
        TemplateSource::Random => list_templates(dir)?
            .choose(rng)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound(dir.to_path_buf()))?,
    };
    if !path.is_file() {
        return Err(TemplateError::NotFound(path));
    }
    Ok(path)
}

pub fn load_template<R: Rng + ?Sized>(
    dir: &Path,
    source: &TemplateSource,
    rng: &mut R,
) -> Result<String, TemplateError> {
    let path = resolve_template(dir, source, rng)?;
    read_template(&path)
}

pub fn read_template(path: &Path) -> Result<String, TemplateError> {
    fs::read_to_string(path).map_err(|e| TemplateError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
