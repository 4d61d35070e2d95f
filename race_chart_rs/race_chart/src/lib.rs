//! Race-timing chart model implemented in Rust.
//!
//! Loads a table of finishing times, partitions it by race group and turns the
//! selected group into a drawable [`Scene`]. Front ends (the CLI and the
//! browser page) only translate scenes into SVG.

pub mod config;
pub mod dataset;
pub mod format;
pub mod nearest;
pub mod scale;
pub mod scene;
pub mod state;
pub mod transition;

use thiserror::Error;

pub use config::{ChartConfig, Margin};
pub use dataset::{load_csv_path, load_csv_reader, parse_csv_str, Dataset, RaceGroups, Record};
pub use format::{format_time, format_year};
pub use nearest::nearest_index;
pub use scale::{extent, LinearScale};
pub use scene::{Axis, AxisOrientation, AxisTick, Marker, Scene, Subtitle};
pub use state::{ChartState, Tooltip};
pub use transition::{ease_cubic_in_out, join, Join, Transition};

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required column '{0}'")]
    MissingColumn(String),
    #[error("row {row}: column '{column}' is not numeric ({value:?})")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("dataset contains no records")]
    EmptyDataset,
    #[error("unknown race group: {0}")]
    UnknownRace(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
