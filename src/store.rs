use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
    str::FromStr,
};

use csv::{ReaderBuilder, StringRecord, Trim};
use miette::Diagnostic;
use thiserror::Error;
use tracing::{debug, warn};

/// Name of the ordering column every dataset must carry.
pub const YEAR_COLUMN: &str = "Year";

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub year: i32,
    /// One cell per numeric column, in [`DataStore::numeric_columns`] order.
    /// Empty, `NaN` and infinite cells are `None`.
    pub values: Vec<Option<f64>>,
}

impl Record {
    pub fn value(&self, column: usize) -> Option<f64> {
        self.values.get(column).copied().flatten()
    }
}

/// A loaded CSV table of yearly measurements.
///
/// Columns other than `Year` are split in two: numeric ones (every non-empty
/// cell parses as a float) which can be averaged, and text ones which are only
/// listed.
#[derive(Debug, Clone)]
pub struct DataStore {
    numeric: Vec<String>,
    text: Vec<String>,
    records: Vec<Record>,
    bounds: (i32, i32),
}

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("Could not read `{}`", path.display())]
    #[diagnostic(code(climate::load::io), help("check the path of the CSV file"))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed CSV: {0}")]
    #[diagnostic(code(climate::load::csv))]
    Csv(#[from] csv::Error),
    #[error("The dataset must contain a `{0}` column")]
    #[diagnostic(code(climate::missing_column))]
    MissingColumn(String),
    #[error("Bad year on line {line}: `{value}`")]
    #[diagnostic(code(climate::load::year), help("years must be integers"))]
    InvalidYear { line: u64, value: String },
    #[error("The dataset has no rows")]
    #[diagnostic(code(climate::load::empty))]
    NoRecords,
}

impl DataStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading dataset");
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader(reader: impl io::Read) -> Result<Self, LoadError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let year_index = headers
            .iter()
            .position(|header| header == YEAR_COLUMN)
            .ok_or_else(|| LoadError::MissingColumn(YEAR_COLUMN.to_string()))?;

        let mut years: Vec<i32> = Vec::new();
        let mut rows: Vec<StringRecord> = Vec::new();
        for row in reader.records() {
            let row = row?;
            let line = row.position().map_or(0, |position| position.line());
            let cell = row.get(year_index).unwrap_or_default();
            let year = parse_year(cell).ok_or_else(|| LoadError::InvalidYear {
                line,
                value: cell.to_string(),
            })?;

            if let Some(&previous) = years.last() {
                if previous > year {
                    warn!(line, previous, year, "years are not ordered");
                }
            }
            years.push(year);
            rows.push(row);
        }

        let (Some(&min), Some(&max)) = (years.iter().min(), years.iter().max()) else {
            return Err(LoadError::NoRecords);
        };

        let mut numeric = Vec::new();
        let mut text = Vec::new();
        let mut numeric_indices = Vec::new();
        for (index, name) in headers.iter().enumerate() {
            if index == year_index {
                continue;
            }
            if rows
                .iter()
                .all(|row| parse_cell(row.get(index).unwrap_or_default()).is_ok())
            {
                numeric.push(name.to_string());
                numeric_indices.push(index);
            } else {
                text.push(name.to_string());
            }
        }

        let records: Vec<Record> = years
            .into_iter()
            .zip(&rows)
            .map(|(year, row)| Record {
                year,
                values: numeric_indices
                    .iter()
                    .map(|&index| {
                        parse_cell(row.get(index).unwrap_or_default())
                            .ok()
                            .flatten()
                    })
                    .collect(),
            })
            .collect();

        debug!(
            rows = records.len(),
            numeric = ?numeric,
            text = ?text,
            min,
            max,
            "dataset loaded"
        );

        Ok(Self {
            numeric,
            text,
            records,
            bounds: (min, max),
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric
    }

    pub fn text_columns(&self) -> &[String] {
        &self.text
    }

    /// `Year` included.
    pub fn has_column(&self, name: &str) -> bool {
        name == YEAR_COLUMN || self.numeric.iter().chain(&self.text).any(|c| c == name)
    }

    /// Position of a numeric column inside [`Record::values`].
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.numeric.iter().position(|c| c == name)
    }

    /// Smallest and largest year of the table, both inclusive.
    pub fn year_bounds(&self) -> (i32, i32) {
        self.bounds
    }
}

impl FromStr for DataStore {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_reader(s.as_bytes())
    }
}

fn parse_year(cell: &str) -> Option<i32> {
    cell.parse().ok().or_else(|| {
        // `2001.0` shows up when a spreadsheet exported the column as floats.
        let year: f64 = cell.parse().ok()?;
        (year.fract() == 0.0 && year >= i32::MIN as f64 && year <= i32::MAX as f64)
            .then_some(year as i32)
    })
}

fn parse_cell(cell: &str) -> Result<Option<f64>, std::num::ParseFloatError> {
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse::<f64>()
        .map(|value| Some(value).filter(|v| v.is_finite()))
}
