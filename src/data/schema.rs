//! Column Vocabulary Module
//! Canonical column names, header normalization and capability detection.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

pub const REGION: &str = "Region Indicator";
pub const COUNTRY: &str = "Country";
pub const TECHNOLOGY: &str = "Technology";
pub const YEAR: &str = "Year";
pub const CAPACITY: &str = "Electricity Installed Capacity (MW)";
pub const GENERATION: &str = "Electricity Generation (GWh)";

/// Columns appended by the growth view.
pub const PREV_YEAR_CAPACITY: &str = "Prev_Year_Capacity";
pub const GROWTH_RATE: &str = "Growth_Rate (%)";

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to parse tabular data: {0}")]
    Parse(#[from] PolarsError),
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("Input has no columns")]
    NoColumns,
    #[error("Columns '{first}' and '{second}' both map to '{canonical}'")]
    DuplicateColumn {
        first: String,
        second: String,
        canonical: &'static str,
    },
    #[error("Column '{column}' has type {found}, expected {expected}")]
    WrongType {
        column: String,
        expected: DataType,
        found: DataType,
    },
}

/// A recognized column of the renewable-energy schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    Region,
    Country,
    Technology,
    Year,
    Capacity,
    Generation,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Region,
        Field::Country,
        Field::Technology,
        Field::Year,
        Field::Capacity,
        Field::Generation,
    ];

    /// Canonical column name inside a normalized Dataset.
    pub fn column_name(self) -> &'static str {
        match self {
            Field::Region => REGION,
            Field::Country => COUNTRY,
            Field::Technology => TECHNOLOGY,
            Field::Year => YEAR,
            Field::Capacity => CAPACITY,
            Field::Generation => GENERATION,
        }
    }

    /// Storage type after normalization.
    pub fn dtype(self) -> DataType {
        match self {
            Field::Region | Field::Country | Field::Technology => DataType::String,
            Field::Year => DataType::Int64,
            Field::Capacity | Field::Generation => DataType::Float64,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Field::Year | Field::Capacity | Field::Generation)
    }

    /// Lower-case header spellings accepted for this field.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Region => &["region indicator", "region"],
            Field::Country => &["country"],
            Field::Technology => &["technology"],
            Field::Year => &["year"],
            Field::Capacity => &["electricity installed capacity (mw)", "capacity_mw"],
            Field::Generation => &["electricity generation (gwh)", "generation_gwh"],
        }
    }

    /// Match a raw header against the vocabulary.
    pub fn from_header(header: &str) -> Option<Field> {
        let normalized = normalize_header(header);
        Self::ALL
            .into_iter()
            .find(|field| field.aliases().contains(&normalized.as_str()))
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Whether a column of this type takes part in numeric operations.
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

fn normalize_header(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// Which recognized columns a Dataset carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    present: HashSet<Field>,
}

impl Capabilities {
    pub fn of(df: &DataFrame) -> Self {
        let present = Field::ALL
            .into_iter()
            .filter(|field| df.column(field.column_name()).is_ok())
            .collect();
        Self { present }
    }

    pub fn has(&self, field: Field) -> bool {
        self.present.contains(&field)
    }

    pub fn has_all(&self, fields: &[Field]) -> bool {
        fields.iter().all(|f| self.has(*f))
    }

    /// Required fields that are absent, in declaration order.
    pub fn missing(&self, fields: &[Field]) -> Vec<Field> {
        fields.iter().copied().filter(|f| !self.has(*f)).collect()
    }

    pub fn fields(&self) -> Vec<Field> {
        let mut fields: Vec<Field> = self.present.iter().copied().collect();
        fields.sort();
        fields
    }
}

/// Rename recognized columns to their canonical names and coerce their types.
///
/// Unrecognized columns are kept as they are. A cell of a recognized numeric
/// column that cannot be read as a number becomes missing.
pub fn normalize_schema(raw: &DataFrame) -> Result<DataFrame, SchemaError> {
    if raw.width() == 0 {
        return Err(SchemaError::NoColumns);
    }

    let mut seen: Vec<(Field, String)> = Vec::new();
    let mut columns: Vec<Column> = Vec::with_capacity(raw.width());

    for column in raw.get_columns() {
        let header = column.name().to_string();
        let Some(field) = Field::from_header(&header) else {
            columns.push(column.clone());
            continue;
        };

        if let Some((_, first)) = seen.iter().find(|(f, _)| *f == field) {
            return Err(SchemaError::DuplicateColumn {
                first: first.clone(),
                second: header,
                canonical: field.column_name(),
            });
        }
        seen.push((field, header.clone()));

        let series = coerce(column.as_materialized_series(), field)?;
        let coerced = series.null_count().saturating_sub(column.null_count());
        if coerced > 0 {
            log::warn!(
                "{} value(s) in '{}' could not be read as {} and are treated as missing",
                coerced,
                header,
                field.dtype()
            );
        }
        columns.push(Column::from(series.with_name(field.column_name().into())));
    }

    let df = DataFrame::new(columns)?;
    log::debug!(
        "Normalized {} rows: recognized {:?}",
        df.height(),
        seen.iter().map(|(f, _)| f.column_name()).collect::<Vec<_>>()
    );
    Ok(df)
}

fn coerce(series: &Series, field: Field) -> Result<Series, SchemaError> {
    let target = field.dtype();
    let source = series.dtype().clone();
    if source == target {
        return Ok(series.clone());
    }

    let castable = is_numeric_dtype(&source)
        || matches!(source, DataType::String | DataType::Null | DataType::Boolean);
    if !castable {
        return Err(SchemaError::WrongType {
            column: series.name().to_string(),
            expected: target,
            found: source,
        });
    }

    let cast = match (field, &source) {
        // "2020.0" and 2020.0 should both land on 2020.
        (Field::Year, DataType::String) | (Field::Year, DataType::Float32 | DataType::Float64) => {
            series.cast(&DataType::Float64)?.cast(&DataType::Int64)?
        }
        _ => series.cast(&target)?,
    };
    Ok(cast)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_aliases() {
        assert_eq!(Field::from_header("Region Indicator"), Some(Field::Region));
        assert_eq!(Field::from_header("  region "), Some(Field::Region));
        assert_eq!(Field::from_header("\u{feff}Year"), Some(Field::Year));
        assert_eq!(Field::from_header("Capacity_MW"), Some(Field::Capacity));
        assert_eq!(
            Field::from_header("ELECTRICITY GENERATION (GWH)"),
            Some(Field::Generation)
        );
        assert_eq!(Field::from_header("Notes"), None);
    }

    #[test]
    fn test_normalize_renames_and_casts() {
        let raw = df!(
            "region" => ["Africa", "Asia"],
            "YEAR" => ["2020", "2021.0"],
            "Capacity_MW" => ["100", "n/a"],
            "Notes" => ["a", "b"]
        )
        .unwrap();

        let df = normalize_schema(&raw).unwrap();
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec![REGION, YEAR, CAPACITY, "Notes"]);

        assert_eq!(df.column(YEAR).unwrap().dtype(), &DataType::Int64);
        let years: Vec<Option<i64>> = df.column(YEAR).unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(years, vec![Some(2020), Some(2021)]);

        let caps: Vec<Option<f64>> = df
            .column(CAPACITY)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(caps, vec![Some(100.0), None]);
    }

    #[test]
    fn test_duplicate_canonical_column_is_rejected() {
        let raw = df!(
            "Region" => ["Africa"],
            "Region Indicator" => ["Asia"]
        )
        .unwrap();
        assert!(matches!(
            normalize_schema(&raw),
            Err(SchemaError::DuplicateColumn { .. })
        ));
    }

    #[test]
    fn test_no_columns_is_rejected() {
        assert!(matches!(
            normalize_schema(&DataFrame::empty()),
            Err(SchemaError::NoColumns)
        ));
    }

    #[test]
    fn test_capabilities() {
        let raw = df!("Year" => [2020i64], "Technology" => ["Solar"]).unwrap();
        let caps = Capabilities::of(&normalize_schema(&raw).unwrap());
        assert!(caps.has(Field::Year));
        assert!(caps.has_all(&[Field::Year, Field::Technology]));
        assert_eq!(
            caps.missing(&[Field::Year, Field::Capacity, Field::Region]),
            vec![Field::Capacity, Field::Region]
        );
    }
}
