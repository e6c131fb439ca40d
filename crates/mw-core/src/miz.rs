// SetWeather: container -> mission text -> tree -> edits -> text -> container.
//
// Stages run strictly in sequence. Nothing is written back unless every
// stage succeeded, and the extraction directory goes away with `Extracted`.
use std::fs;
use std::path::Path;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::archive;
use crate::edit::{self, WeatherBlockStrategy, WeatherEdit};
use crate::error::{ContainerError, Result};
use crate::legacy;
use crate::literal::Assignment;
use crate::parser;
use crate::templates::{self, TemplateSource};
use crate::writer;

pub const MISSION_MEMBER: &str = "mission";

/// Applies `edit` to mission source text and returns the re-emitted text.
pub fn rewrite_mission(text: &str, edit: &WeatherEdit, strategy: WeatherBlockStrategy) -> Result<String> {
    let spliced;
    let source = match (strategy, &edit.weather_template) {
        (WeatherBlockStrategy::Textual, Some(template)) => {
            warn!("replacing weather block as text");
            spliced = legacy::replace_weather_block(text, template)?;
            spliced.as_str()
        }
        _ => text,
    };
    let mut doc = parser::parse_assignment(source)?;
    debug!(name = %doc.name, entries = doc.root.len(), "mission parsed");
    edit::apply_edit(&mut doc.root, edit, strategy)?;
    Ok(writer::serialize(&doc.root, &doc.name))
}

pub fn set_weather(container: &Path, edit: &WeatherEdit, strategy: WeatherBlockStrategy) -> Result<()> {
    rewrite_member(container, |text| rewrite_mission(text, edit, strategy))?;
    info!(
        container = %container.display(),
        month = edit.month,
        day = edit.day,
        start_time = ?edit.start_time,
        "weather set"
    );
    Ok(())
}

/// Legacy form: only the weather block is replaced, as text.
pub fn set_weather_template(container: &Path, template: &str) -> Result<()> {
    rewrite_member(container, |text| Ok(legacy::replace_weather_block(text, template)?))?;
    info!(container = %container.display(), "weather template applied");
    Ok(())
}

/// Legacy form with the template taken from a template directory.
pub fn set_weather_from_dir<R: Rng + ?Sized>(
    container: &Path,
    dir: &Path,
    source: &TemplateSource,
    rng: &mut R,
) -> Result<()> {
    let path = templates::resolve_template(dir, source, rng)?;
    info!(template = %path.display(), "using weather template");
    let template = templates::read_template(&path)?;
    set_weather_template(container, &template)
}

pub fn read_mission(container: &Path) -> Result<String> {
    let extracted = archive::extract(container)?;
    let member = extracted.member(MISSION_MEMBER)?;
    fs::read_to_string(member).map_err(|e| ContainerError::io(member, e).into())
}

// Accepts a container or an already extracted mission file.
pub fn load_mission(path: &Path) -> Result<Assignment> {
    let text = if is_zip(path)? {
        read_mission(path)?
    } else {
        fs::read_to_string(path).map_err(|e| ContainerError::io(path, e))?
    };
    Ok(parser::parse_assignment(&text)?)
}

fn rewrite_member<F>(container: &Path, rewrite: F) -> Result<()>
where
    F: FnOnce(&str) -> Result<String>,
{
    let extracted = archive::extract(container)?;
    let member = extracted.member(MISSION_MEMBER)?;
    let text = fs::read_to_string(member).map_err(|e| ContainerError::io(member, e))?;
    let out = rewrite(&text)?;
    fs::write(member, out).map_err(|e| ContainerError::io(member, e))?;
    archive::repackage(extracted.dir(), container)?;
    Ok(())
}

fn is_zip(path: &Path) -> Result<bool> {
    use std::io::Read as _;
    let mut magic = [0u8; 4];
    let mut f = fs::File::open(path).map_err(|e| ContainerError::io(path, e))?;
    let n = f.read(&mut magic).map_err(|e| ContainerError::io(path, e))?;
    Ok(n == 4 && magic == *b"PK\x03\x04")
}
