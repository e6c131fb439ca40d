// Field mutators over a parsed mission tree.
//
// Each mutator checks every field it is going to touch before writing
// anything, so a failure leaves the tree exactly as it was.
use std::str::FromStr;

use tracing::debug;

use crate::error::{NavigationError, Result, TemplateError};
use crate::literal::{Key, Kind, LiteralNode, Table};
use crate::parser;
use crate::path::{self, KeyPath};

/// One resolved change set for a mission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherEdit {
    pub day: u32,
    pub month: u32,
    /// Seconds after midnight; `None` leaves `start_time` alone.
    pub start_time: Option<u32>,
    /// Weather template fragment; `None` leaves the weather block alone.
    pub weather_template: Option<String>,
    /// `None` leaves the clouds the template brought in.
    pub clouds: Option<CloudTemplate>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloudTemplate {
    pub preset: Option<String>,
    pub thickness: i32,
    pub density: i32,
    pub precipitation: i32,
    pub base: i32,
}

/// How the weather block is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeatherBlockStrategy {
    /// Parse the template and splice its table over `mission.weather`.
    #[default]
    Structural,
    /// Splice the template text over the `["weather"]` source span.
    Textual,
}

impl FromStr for WeatherBlockStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "structural" => Ok(Self::Structural),
            "textual" | "legacy" => Ok(Self::Textual),
            other => Err(format!("unknown weather strategy '{}' (structural|textual)", other)),
        }
    }
}

pub fn set_date(root: &mut Table, month: u32, day: u32) -> Result<(), NavigationError> {
    let date = path::table_mut(root, &[Key::from("date")]).map_err(|_| NavigationError::DateTableMissing)?;
    let month_key = Key::from("Month");
    let day_key = Key::from("Day");
    require_number(date, &month_key, "date", NavigationError::MonthKeyMissing)?;
    require_number(date, &day_key, "date", NavigationError::DayKeyMissing)?;
    date.insert(month_key, month);
    date.insert(day_key, day);
    Ok(())
}

pub fn set_start_time(root: &mut Table, seconds: u32) -> Result<(), NavigationError> {
    let key = Key::from("start_time");
    match root.get(&key) {
        Some(LiteralNode::Number(_)) => {}
        Some(other) => {
            return Err(NavigationError::UnexpectedType {
                path: KeyPath::from(vec![key]),
                expected: Kind::Number,
                found: other.kind(),
            });
        }
        None => return Err(NavigationError::StartTimeKeyMissing),
    }
    root.insert(key, seconds);
    Ok(())
}

/// Replaces `mission.weather` wholesale; the old table must exist.
pub fn set_weather_table(root: &mut Table, weather: Table) -> Result<(), NavigationError> {
    let slot = path::get_mut(root, &[Key::from("weather")]).map_err(|_| NavigationError::WeatherTableMissing)?;
    if slot.as_table().is_none() {
        return Err(NavigationError::WeatherTableMissing);
    }
    *slot = LiteralNode::Table(weather);
    Ok(())
}

/// Parses `template` as a fragment and splices its weather table in.
pub fn set_weather_template(root: &mut Table, template: &str) -> Result<()> {
    let weather = weather_from_fragment(template)?;
    set_weather_table(root, weather)?;
    Ok(())
}

/// Weather table described by a template fragment. Accepts the legacy
/// `["weather"] = { ... }, -- end of ["weather"]` shape, a bare `{ ... }`,
/// or the weather fields themselves.
pub fn weather_from_fragment(template: &str) -> Result<Table> {
    let mut fragment = parser::parse_fragment(template)?;
    let weather_key = Key::from("weather");
    match fragment.remove(&weather_key) {
        Some(LiteralNode::Table(t)) => Ok(t),
        Some(_) => Err(TemplateError::NotATable.into()),
        None if fragment.is_empty() => Err(TemplateError::NotATable.into()),
        None => Ok(fragment),
    }
}

pub fn set_clouds(root: &mut Table, clouds: &CloudTemplate) -> Result<(), NavigationError> {
    let weather = path::table_mut(root, &[Key::from("weather")]).map_err(|_| NavigationError::WeatherTableMissing)?;
    let Some(LiteralNode::Table(target)) = weather.get_mut(&Key::from("clouds")) else {
        return Err(NavigationError::CloudsTableMissing);
    };
    let preset = match &clouds.preset {
        Some(name) => LiteralNode::Str(name.clone()),
        None => LiteralNode::Nil,
    };
    target.insert("preset", preset);
    target.insert("thickness", clouds.thickness);
    target.insert("density", clouds.density);
    target.insert("iprecptns", clouds.precipitation);
    target.insert("base", clouds.base);
    Ok(())
}

/// Applies every field of `edit`. All-or-nothing: the edits run on a copy
/// that replaces `root` only when every mutator succeeded. Under
/// `Textual` the weather block is expected to be spliced in already.
pub fn apply_edit(root: &mut Table, edit: &WeatherEdit, strategy: WeatherBlockStrategy) -> Result<()> {
    let mut staged = root.clone();
    if let (WeatherBlockStrategy::Structural, Some(template)) = (strategy, &edit.weather_template) {
        set_weather_template(&mut staged, template)?;
        debug!("weather block replaced");
    }
    set_date(&mut staged, edit.month, edit.day)?;
    debug!(month = edit.month, day = edit.day, "date set");
    if let Some(seconds) = edit.start_time {
        set_start_time(&mut staged, seconds)?;
        debug!(seconds, "start time set");
    }
    if let Some(clouds) = &edit.clouds {
        set_clouds(&mut staged, clouds)?;
        debug!(preset = ?clouds.preset, "clouds set");
    }
    *root = staged;
    Ok(())
}

fn require_number(
    table: &Table,
    key: &Key,
    parent: &str,
    missing: NavigationError,
) -> Result<(), NavigationError> {
    match table.get(key) {
        Some(LiteralNode::Number(_)) => Ok(()),
        Some(other) => Err(NavigationError::UnexpectedType {
            path: KeyPath::from(vec![Key::from(parent), key.clone()]),
            expected: Kind::Number,
            found: other.kind(),
        }),
        None => Err(missing),
    }
}
