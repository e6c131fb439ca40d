// settings.json: time windows from which a random weather edit is drawn.
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Days, NaiveDate};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Deserialize;

use crate::edit::{CloudTemplate, WeatherEdit};
use crate::error::{Result, SettingsError};
use crate::templates::read_template;

pub const SETTINGS_FILE: &str = "settings.json";

// Dates are drawn from a leap year so 29 February is reachable.
const BASE_YEAR: i32 = 2000;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub times: Vec<TimeWindow>,
    /// Directory relative template paths resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub date: DateRange,
    pub time_of_day: TimeOfDay,
    pub weather_templates: Vec<PathBuf>,
    #[serde(default)]
    pub clouds: Option<CloudRanges>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DateRange {
    pub start: DayOfYear,
    pub end: DayOfYear,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DayOfYear {
    pub day: u32,
    pub month: u32,
}

/// Seconds after midnight; `latest` is exclusive.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TimeOfDay {
    pub earliest: u32,
    pub latest: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudRanges {
    #[serde(default)]
    pub presets: Vec<String>,
    pub thickness: IntRange,
    pub density: IntRange,
    #[serde(default)]
    pub precipitation: Vec<i32>,
    pub base: IntRange,
}

/// Inclusive on both ends.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IntRange {
    pub min: i32,
    pub max: i32,
}

/// A drawn edit before its template file is read.
#[derive(Debug, Clone, PartialEq)]
pub struct Pick {
    pub day: u32,
    pub month: u32,
    pub start_time: u32,
    pub template: PathBuf,
    pub clouds: Option<CloudTemplate>,
}

impl Pick {
    pub fn into_edit(self) -> Result<WeatherEdit> {
        let weather_template = read_template(&self.template)?;
        Ok(WeatherEdit {
            day: self.day,
            month: self.month,
            start_time: Some(self.start_time),
            weather_template: Some(weather_template),
            clouds: self.clouds,
        })
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|e| SettingsError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        Self::from_json(&text, base_dir)
    }

    pub fn from_json(text: &str, base_dir: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let mut settings: Settings = serde_json::from_str(text)?;
        settings.base_dir = base_dir.into();
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.times.is_empty() {
            return Err(SettingsError::NoTimeWindows);
        }
        for (index, w) in self.times.iter().enumerate() {
            if w.weather_templates.is_empty() {
                return Err(SettingsError::NoTemplates { index });
            }
            date_span(index, &w.date)?;
            check_range(index, "timeOfDay", w.time_of_day.earliest.into(), w.time_of_day.latest.into())?;
            if let Some(c) = &w.clouds {
                check_range(index, "thickness", c.thickness.min.into(), c.thickness.max.into())?;
                check_range(index, "density", c.density.min.into(), c.density.max.into())?;
                check_range(index, "base", c.base.min.into(), c.base.max.into())?;
            }
        }
        Ok(())
    }

    /// Draws one edit: a window, a day in `[start, end)`, a time in
    /// `[earliest, latest)`, a template and, when configured, clouds.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Pick, SettingsError> {
        let index = rng.random_range(0..self.times.len().max(1));
        let window = self.times.get(index).ok_or(SettingsError::NoTimeWindows)?;

        let (start, span) = date_span(index, &window.date)?;
        let offset = if span > 0 { rng.random_range(0..span) } else { 0 };
        let date = start
            .checked_add_days(Days::new(offset))
            .ok_or(SettingsError::InvalidDate {
                index,
                month: window.date.end.month,
                day: window.date.end.day,
            })?;

        let tod = window.time_of_day;
        let start_time = if tod.latest > tod.earliest {
            rng.random_range(tod.earliest..tod.latest)
        } else {
            tod.earliest
        };

        let template = window
            .weather_templates
            .choose(rng)
            .map(|p| self.base_dir.join(p))
            .ok_or(SettingsError::NoTemplates { index })?;

        let clouds = window.clouds.as_ref().map(|c| CloudTemplate {
            preset: c.presets.choose(rng).cloned(),
            thickness: rng.random_range(c.thickness.min..=c.thickness.max),
            density: rng.random_range(c.density.min..=c.density.max),
            precipitation: c.precipitation.choose(rng).copied().unwrap_or(0),
            base: rng.random_range(c.base.min..=c.base.max),
        });

        Ok(Pick {
            day: date.day(),
            month: date.month(),
            start_time,
            template,
            clouds,
        })
    }

    pub fn random_edit<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<WeatherEdit> {
        self.pick(rng)?.into_edit()
    }
}

// First day and the number of days in the window. A window that ends
// before it starts runs into the following year.
fn date_span(index: usize, range: &DateRange) -> Result<(NaiveDate, u64), SettingsError> {
    let day = |year: i32, d: DayOfYear| {
        NaiveDate::from_ymd_opt(year, d.month, d.day).ok_or(SettingsError::InvalidDate {
            index,
            month: d.month,
            day: d.day,
        })
    };
    let start = day(BASE_YEAR, range.start)?;
    let mut end = day(BASE_YEAR, range.end)?;
    if end < start {
        // 29 February does not exist in the following year; the day after
        // 28 February is the same exclusive bound.
        end = match (range.end.month, range.end.day) {
            (2, 29) => day(BASE_YEAR + 1, DayOfYear { day: 1, month: 3 })?,
            _ => day(BASE_YEAR + 1, range.end)?,
        };
    }
    let span = (end - start).num_days();
    Ok((start, u64::try_from(span).unwrap_or(0)))
}

fn check_range(index: usize, what: &'static str, min: i64, max: i64) -> Result<(), SettingsError> {
    if min > max {
        return Err(SettingsError::InvalidRange { index, what, min, max });
    }
    Ok(())
}
