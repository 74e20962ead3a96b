//! Dataset Module
//! Immutable wrapper around a normalized DataFrame.
//!
//! Every transform in the pipeline takes a `&Dataset` and returns a new one;
//! the wrapped frame is never handed out mutably.

use crate::data::schema::{self, Capabilities, Field, SchemaError};
use polars::prelude::*;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
    capabilities: Capabilities,
}

impl Default for Dataset {
    fn default() -> Self {
        Self::from_normalized(DataFrame::empty())
    }
}

impl Dataset {
    /// Normalize a raw frame (header aliases, column types) into a Dataset.
    pub fn normalize(raw: &DataFrame) -> Result<Self, SchemaError> {
        let frame = schema::normalize_schema(raw)?;
        Ok(Self::from_normalized(frame))
    }

    /// Wrap a frame that already uses canonical names and types.
    pub(crate) fn from_normalized(frame: DataFrame) -> Self {
        let capabilities = Capabilities::of(&frame);
        Self {
            frame,
            capabilities,
        }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn has(&self, field: Field) -> bool {
        self.capabilities.has(field)
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Names of columns with a numeric dtype, recognized or not.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.frame
            .get_columns()
            .iter()
            .filter(|col| schema::is_numeric_dtype(col.dtype()))
            .map(|col| col.name().to_string())
            .collect()
    }

    /// Column name and dtype pairs, in column order.
    pub fn dtypes(&self) -> Vec<(String, String)> {
        self.frame
            .get_columns()
            .iter()
            .map(|col| (col.name().to_string(), col.dtype().to_string()))
            .collect()
    }

    /// Missing cells per column, in column order.
    pub fn missing_counts(&self) -> Vec<(String, usize)> {
        self.frame
            .get_columns()
            .iter()
            .map(|col| (col.name().to_string(), col.null_count()))
            .collect()
    }

    pub fn missing_total(&self) -> usize {
        self.frame.get_columns().iter().map(|c| c.null_count()).sum()
    }

    /// Column values as floats. NaN counts as missing.
    pub fn f64_values(&self, name: &str) -> Vec<Option<f64>> {
        self.frame
            .column(name)
            .ok()
            .and_then(|col| col.cast(&DataType::Float64).ok())
            .and_then(|col| {
                col.f64()
                    .ok()
                    .map(|ca| ca.into_iter().map(|v| v.filter(|x| !x.is_nan())).collect())
            })
            .unwrap_or_default()
    }

    pub fn i64_values(&self, name: &str) -> Vec<Option<i64>> {
        self.frame
            .column(name)
            .ok()
            .and_then(|col| col.cast(&DataType::Int64).ok())
            .and_then(|col| col.i64().ok().map(|ca| ca.into_iter().collect()))
            .unwrap_or_default()
    }

    pub fn str_values(&self, name: &str) -> Vec<Option<String>> {
        self.frame
            .column(name)
            .ok()
            .and_then(|col| col.cast(&DataType::String).ok())
            .and_then(|col| {
                col.str()
                    .ok()
                    .map(|ca| ca.into_iter().map(|v| v.map(str::to_string)).collect())
            })
            .unwrap_or_default()
    }

    /// Sorted distinct non-missing values of a text column.
    pub fn unique_values(&self, name: &str) -> Vec<String> {
        let mut values: Vec<String> = self
            .str_values(name)
            .into_iter()
            .flatten()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        values.sort();
        values
    }

    /// Smallest and largest non-missing year.
    pub fn year_bounds(&self) -> Option<(i64, i64)> {
        if !self.has(Field::Year) {
            return None;
        }
        let years: Vec<i64> = self
            .i64_values(schema::YEAR)
            .into_iter()
            .flatten()
            .collect();
        let min = years.iter().min()?;
        let max = years.iter().max()?;
        Some((*min, *max))
    }

    /// Sum of a numeric column's non-missing values; `None` if the column is absent.
    pub fn column_sum(&self, name: &str) -> Option<f64> {
        self.frame.column(name).ok()?;
        Some(self.f64_values(name).into_iter().flatten().sum())
    }

    /// First `n` rows rendered as display strings (missing cells are empty).
    pub fn preview(&self, n: usize) -> Vec<Vec<String>> {
        let rows = n.min(self.height());
        (0..rows)
            .map(|i| {
                self.frame
                    .get_columns()
                    .iter()
                    .map(|col| match col.get(i) {
                        Ok(AnyValue::Null) | Err(_) => String::new(),
                        Ok(val) => val.to_string().trim_matches('"').to_string(),
                    })
                    .collect()
            })
            .collect()
    }
}
