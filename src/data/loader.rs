//! Data Loader Module
//! Turns CSV files, spreadsheet workbooks and manually entered rows into a Dataset.

use crate::data::dataset::Dataset;
use crate::data::schema::{SchemaError, COUNTRY, CAPACITY, GENERATION, REGION, TECHNOLOGY, YEAR};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Rows inspected before the CSV schema is fixed.
const INFER_SCHEMA_ROWS: usize = 10_000;

/// Where the currently loaded Dataset came from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    File(PathBuf),
    Upload(String),
    Sample,
    Manual,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Upload(name) => f.write_str(name),
            DataSource::Sample => f.write_str("sample data"),
            DataSource::Manual => f.write_str("manual entry"),
        }
    }
}

/// One row of the manual entry table. Cells are kept as typed text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualRow {
    pub region: String,
    pub country: String,
    pub technology: String,
    pub year: String,
    pub capacity_mw: String,
    pub generation_gwh: String,
}

impl ManualRow {
    pub fn is_blank(&self) -> bool {
        [
            &self.region,
            &self.country,
            &self.technology,
            &self.year,
            &self.capacity_mw,
            &self.generation_gwh,
        ]
        .iter()
        .all(|cell| cell.trim().is_empty())
    }
}

/// Holds the most recently loaded Dataset.
///
/// A failed load leaves the previous Dataset in place.
pub struct DataLoader {
    dataset: Option<Dataset>,
    source: Option<DataSource>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            dataset: None,
            source: None,
        }
    }

    /// Load a CSV file or spreadsheet from disk, chosen by file extension.
    pub fn load_path(&mut self, path: &Path) -> Result<&Dataset, SchemaError> {
        match FileFormat::from_name(&path.to_string_lossy()) {
            FileFormat::Csv => self.load_csv_path(path),
            FileFormat::Spreadsheet => self.load_xlsx_path(path),
        }
    }

    /// Load a CSV file from disk.
    pub fn load_csv_path(&mut self, path: &Path) -> Result<&Dataset, SchemaError> {
        let dataset = parse_csv_bytes(&read_file(path)?)?;
        log::info!(
            "Loaded {} rows, {} columns from {}",
            dataset.height(),
            dataset.width(),
            path.display()
        );
        Ok(self.replace(dataset, DataSource::File(path.to_path_buf())))
    }

    /// Load the first worksheet of an `.xlsx`/`.xls` workbook from disk.
    pub fn load_xlsx_path(&mut self, path: &Path) -> Result<&Dataset, SchemaError> {
        let dataset = parse_xlsx_bytes(&read_file(path)?)?;
        log::info!(
            "Loaded {} rows, {} columns from workbook {}",
            dataset.height(),
            dataset.width(),
            path.display()
        );
        Ok(self.replace(dataset, DataSource::File(path.to_path_buf())))
    }

    /// Load CSV content received as bytes (e.g. an upload).
    pub fn load_csv_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<&Dataset, SchemaError> {
        let dataset = parse_csv_bytes(bytes)?;
        log::info!("Loaded {} rows from upload '{}'", dataset.height(), name);
        Ok(self.replace(dataset, DataSource::Upload(name.to_string())))
    }

    /// Load workbook content received as bytes.
    pub fn load_xlsx_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<&Dataset, SchemaError> {
        let dataset = parse_xlsx_bytes(bytes)?;
        log::info!("Loaded {} rows from workbook '{}'", dataset.height(), name);
        Ok(self.replace(dataset, DataSource::Upload(name.to_string())))
    }

    /// Load the rows of the manual entry table. Blank rows are ignored.
    pub fn load_manual(&mut self, rows: &[ManualRow]) -> Result<&Dataset, SchemaError> {
        let dataset = Dataset::normalize(&rows_to_frame(rows)?)?;
        log::info!("Loaded {} manually entered rows", dataset.height());
        Ok(self.replace(dataset, DataSource::Manual))
    }

    /// Install an already-built Dataset (sample data).
    pub fn set_dataset(&mut self, dataset: Dataset, source: DataSource) -> &Dataset {
        self.replace(dataset, source)
    }

    fn replace(&mut self, dataset: Dataset, source: DataSource) -> &Dataset {
        self.source = Some(source);
        self.dataset.insert(dataset)
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn source(&self) -> Option<&DataSource> {
        self.source.as_ref()
    }

    pub fn get_row_count(&self) -> usize {
        self.dataset.as_ref().map(|ds| ds.height()).unwrap_or(0)
    }
}

/// Input format inferred from a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Spreadsheet,
}

impl FileFormat {
    pub const SPREADSHEET_EXTENSIONS: [&'static str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

    /// Anything that is not a known workbook extension is read as CSV.
    pub fn from_name(name: &str) -> Self {
        let extension = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if Self::SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
            FileFormat::Spreadsheet
        } else {
            FileFormat::Csv
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, SchemaError> {
    std::fs::read(path).map_err(|source| SchemaError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Parse CSV bytes (header row required) into a normalized Dataset.
pub fn parse_csv_bytes(bytes: &[u8]) -> Result<Dataset, SchemaError> {
    let raw = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .with_ignore_errors(true)
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()?;
    Dataset::normalize(&raw)
}

/// Parse the first worksheet of a workbook (header row required) into a
/// normalized Dataset.
pub fn parse_xlsx_bytes(bytes: &[u8]) -> Result<Dataset, SchemaError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(SchemaError::NoColumns)?;
    let range = workbook.worksheet_range(&sheet)?;
    log::debug!("Reading worksheet '{}' ({:?})", sheet, range.get_size());
    Dataset::normalize(&range_to_frame(&range)?)
}

/// One column per header cell. A column whose cells are all numbers (or
/// empty, or error values) becomes `Float64`; anything else is kept as text
/// and left to the non-strict casts of normalization.
fn range_to_frame(range: &Range<Data>) -> Result<DataFrame, SchemaError> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Err(SchemaError::NoColumns);
    };
    let body: Vec<&[Data]> = rows.collect();

    let columns: Vec<Column> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = cell_text(Some(cell)).unwrap_or_else(|| format!("column_{}", i + 1));
            let cells: Vec<Option<&Data>> = body.iter().map(|row| row.get(i)).collect();
            sheet_column(&name, &cells)
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

fn sheet_column(name: &str, cells: &[Option<&Data>]) -> Column {
    let numeric = cells.iter().flatten().all(|cell| {
        matches!(
            cell,
            Data::Int(_) | Data::Float(_) | Data::Empty | Data::Error(_)
        )
    });

    if numeric {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|cell| match cell {
                Some(Data::Int(v)) => Some(*v as f64),
                Some(Data::Float(v)) => Some(*v).filter(|v| v.is_finite()),
                _ => None,
            })
            .collect();
        Column::new(name.into(), values)
    } else {
        let values: Vec<Option<String>> = cells.iter().map(|cell| cell_text(*cell)).collect();
        Column::new(name.into(), values)
    }
}

fn cell_text(cell: Option<&Data>) -> Option<String> {
    match cell? {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        other => Some(other.to_string()),
    }
}

/// Build a raw frame with the six recognized columns from manual rows.
pub fn rows_to_frame(rows: &[ManualRow]) -> Result<DataFrame, SchemaError> {
    let rows: Vec<&ManualRow> = rows.iter().filter(|r| !r.is_blank()).collect();

    let text = |cell: &str| -> Option<String> {
        let cell = cell.trim();
        (!cell.is_empty()).then(|| cell.to_string())
    };
    // "nan" and "inf" parse as floats but are not usable values.
    let number = |cell: &str| -> Option<f64> {
        cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    };

    let regions: Vec<Option<String>> = rows.iter().map(|r| text(&r.region)).collect();
    let countries: Vec<Option<String>> = rows.iter().map(|r| text(&r.country)).collect();
    let technologies: Vec<Option<String>> = rows.iter().map(|r| text(&r.technology)).collect();
    let years: Vec<Option<i64>> = rows
        .iter()
        .map(|r| number(&r.year).map(|y| y.round() as i64))
        .collect();
    let capacities: Vec<Option<f64>> = rows.iter().map(|r| number(&r.capacity_mw)).collect();
    let generations: Vec<Option<f64>> = rows.iter().map(|r| number(&r.generation_gwh)).collect();

    let df = DataFrame::new(vec![
        Column::new(REGION.into(), regions),
        Column::new(COUNTRY.into(), countries),
        Column::new(TECHNOLOGY.into(), technologies),
        Column::new(YEAR.into(), years),
        Column::new(CAPACITY.into(), capacities),
        Column::new(GENERATION.into(), generations),
    ])?;
    Ok(df)
}
