use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::literal::Kind;
use crate::path::KeyPath;

/// Location in literal source text. Lines and columns are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Errors raised while reading literal source text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected end of input at {0}")]
    UnexpectedEof(Position),

    #[error("expected {expected} at {pos}, found '{found}'")]
    Expected {
        expected: &'static str,
        found: String,
        pos: Position,
    },

    #[error("unterminated string starting at {0}")]
    UnterminatedString(Position),

    #[error("invalid escape sequence '\\{seq}' at {pos}")]
    InvalidEscape { seq: String, pos: Position },

    #[error("invalid number '{text}' at {pos}")]
    InvalidNumber { text: String, pos: Position },

    #[error("unsupported type: {what} at {pos}")]
    UnsupportedValue { what: String, pos: Position },

    #[error("unsupported key: {what} at {pos}")]
    UnsupportedKey { what: String, pos: Position },

    #[error("string starting at {0} is not valid UTF-8")]
    InvalidUtf8(Position),

    #[error("tables nested deeper than {max} levels at {pos}")]
    TooDeep { max: usize, pos: Position },

    #[error("unexpected trailing input at {0}")]
    TrailingInput(Position),
}

impl ParseError {
    pub fn position(&self) -> Position {
        match self {
            ParseError::UnexpectedEof(pos)
            | ParseError::UnterminatedString(pos)
            | ParseError::InvalidUtf8(pos)
            | ParseError::TrailingInput(pos) => *pos,
            ParseError::Expected { pos, .. }
            | ParseError::InvalidEscape { pos, .. }
            | ParseError::InvalidNumber { pos, .. }
            | ParseError::UnsupportedValue { pos, .. }
            | ParseError::UnsupportedKey { pos, .. }
            | ParseError::TooDeep { pos, .. } => *pos,
        }
    }
}

/// Generic path lookup failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("'{path}' not found")]
    NotFound { path: KeyPath },

    #[error("'{path}' is a {found}, expected a table")]
    NotATable { path: KeyPath, found: Kind },
}

impl LookupError {
    pub fn path(&self) -> &KeyPath {
        match self {
            LookupError::NotFound { path } | LookupError::NotATable { path, .. } => path,
        }
    }
}

/// A field mutator found the mission shaped differently than expected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavigationError {
    #[error("Date table not found")]
    DateTableMissing,

    #[error("Month key not found in date table")]
    MonthKeyMissing,

    #[error("Day key not found in date table")]
    DayKeyMissing,

    #[error("start_time key not found")]
    StartTimeKeyMissing,

    #[error("Weather table not found")]
    WeatherTableMissing,

    #[error("Clouds table not found")]
    CloudsTableMissing,

    #[error("'{path}' holds a {found}, expected a {expected}")]
    UnexpectedType {
        path: KeyPath,
        expected: Kind,
        found: Kind,
    },
}

/// The legacy text splice of the weather block failed.
#[derive(Error, Debug)]
pub enum SubstitutionError {
    #[error("Not found: no [\"weather\"] block closed by 'end of [\"weather\"]'")]
    BlockNotFound,

    #[error("Not found: expected one 'end of [\"weather\"]' after substitution, found {count}")]
    ClosingMarker { count: usize },

    #[error("weather block pattern: {0}")]
    Pattern(#[from] fancy_regex::Error),
}

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Mission file in .miz not found")]
    MissionNotFound,

    #[error("container holds {} mission members", .0.len())]
    DuplicateMission(Vec<PathBuf>),

    #[error("{0}: illegal file path")]
    PathTraversal(String),

    #[error("zip: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("walking extraction directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ContainerError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ContainerError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template weather file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("weather template does not describe a table")]
    NotATable,

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings define no time windows")]
    NoTimeWindows,

    #[error("time window {index} lists no weather templates")]
    NoTemplates { index: usize },

    #[error("time window {index}: invalid date {month}/{day}")]
    InvalidDate { index: usize, month: u32, day: u32 },

    #[error("time window {index}: {what} range {min}..{max} is empty")]
    InvalidRange {
        index: usize,
        what: &'static str,
        min: i64,
        max: i64,
    },
}

/// Terminal error of a weather edit; one variant per failing stage.
#[derive(Error, Debug)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    Substitution(#[from] SubstitutionError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
