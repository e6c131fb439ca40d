//! mw-core: mission literal parsing, weather edits and .miz repackaging
//!
//! The pipeline behind `set_weather`:
//! - `archive` unpacks the container into a scoped temp dir and zips it back
//! - `parser` reads the `mission = { ... }` literal into a `literal::Table`
//! - `path` navigates the tree; `edit` holds the field mutators
//! - `writer` re-emits the tree in the consumer's layout
//! - `legacy` splices the weather block as text, without parsing
//!
//! `settings` and `templates` produce the `WeatherEdit` the pipeline consumes.
pub mod archive;
pub mod edit;
pub mod error;
pub mod legacy;
pub mod literal;
pub mod miz;
pub mod parser;
pub mod path;
pub mod settings;
pub mod templates;
pub mod writer;

pub use edit::{
    CloudTemplate, WeatherBlockStrategy, WeatherEdit, apply_edit, set_clouds, set_date, set_start_time,
    set_weather_table,
};
pub use error::{
    ContainerError, Error, LookupError, NavigationError, ParseError, Position, Result, SettingsError,
    SubstitutionError, TemplateError,
};
pub use literal::{Assignment, Key, Kind, LiteralNode, Table};
pub use miz::{MISSION_MEMBER, load_mission, read_mission, rewrite_mission, set_weather, set_weather_from_dir};
pub use parser::{parse_assignment, parse_fragment};
pub use path::KeyPath;
pub use settings::Settings;
pub use templates::TemplateSource;
pub use writer::{RootTerminator, serialize, serialize_with};
