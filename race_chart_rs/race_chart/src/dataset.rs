//! CSV ingestion and race-group partitioning.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ChartError;

const COL_RACE_GROUP: &str = "event_race";
const COL_EVENT: &str = "event";
const COL_RACE: &str = "race";
const COL_YEAR: &str = "year";
const COL_TIME: &str = "time_in_seconds";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub race_group_id: String,
    pub event_name: String,
    pub race_name: String,
    pub year: i32,
    pub time_seconds: f64,
}

/// Every record of the input table, in file order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Result<Self, ChartError> {
        if records.is_empty() {
            return Err(ChartError::EmptyDataset);
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn race_groups(&self) -> RaceGroups {
        RaceGroups::from_records(&self.records)
    }

    /// Records belonging to `group_id`, in file order.
    pub fn subset(&self, group_id: &str) -> Vec<Record> {
        self.records
            .iter()
            .filter(|r| r.race_group_id == group_id)
            .cloned()
            .collect()
    }
}

/// Distinct race-group ids in first-occurrence order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RaceGroups {
    ids: Vec<String>,
}

impl RaceGroups {
    pub fn from_records(records: &[Record]) -> Self {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for record in records {
            if seen.insert(record.race_group_id.as_str()) {
                ids.push(record.race_group_id.clone());
            }
        }
        Self { ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.ids.get(index).map(String::as_str)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|g| g == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

pub fn load_csv_path(path: &Path) -> Result<Dataset, ChartError> {
    let file = File::open(path)?;
    let dataset = load_csv_reader(file)?;
    debug!(
        "Loaded {} records from {}",
        dataset.len(),
        path.display()
    );
    Ok(dataset)
}

pub fn parse_csv_str(text: &str) -> Result<Dataset, ChartError> {
    load_csv_reader(text.as_bytes())
}

pub fn load_csv_reader<R: Read>(reader: R) -> Result<Dataset, ChartError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let column = |name: &str| -> Result<usize, ChartError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ChartError::MissingColumn(name.to_string()))
    };
    let group_idx = column(COL_RACE_GROUP)?;
    let event_idx = column(COL_EVENT)?;
    let race_idx = column(COL_RACE)?;
    let year_idx = column(COL_YEAR)?;
    let time_idx = column(COL_TIME)?;

    let mut records = Vec::new();
    for (idx, row) in csv_reader.records().enumerate() {
        let row = row?;
        let row_no = idx + 1;
        let field = |i: usize| row.get(i).unwrap_or("");
        records.push(Record {
            race_group_id: field(group_idx).to_string(),
            event_name: field(event_idx).to_string(),
            race_name: field(race_idx).to_string(),
            year: parse_year(field(year_idx), row_no)?,
            time_seconds: parse_time(field(time_idx), row_no)?,
        });
    }

    Dataset::new(records)
}

fn parse_year(raw: &str, row: usize) -> Result<i32, ChartError> {
    if let Ok(year) = raw.parse::<i32>() {
        return Ok(year);
    }
    let invalid = || ChartError::InvalidNumber {
        row,
        column: COL_YEAR,
        value: raw.to_string(),
    };
    let value: f64 = raw.parse().map_err(|_| invalid())?;
    if value.is_finite()
        && value.fract() == 0.0
        && value >= i32::MIN as f64
        && value <= i32::MAX as f64
    {
        Ok(value as i32)
    } else {
        Err(invalid())
    }
}

fn parse_time(raw: &str, row: usize) -> Result<f64, ChartError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ChartError::InvalidNumber {
            row,
            column: COL_TIME,
            value: raw.to_string(),
        }),
    }
}
