//! Data Processor Module
//! Cleaning (dedup, missing-value fill, year filter) and sidebar filtering.
//!
//! All operations are value-returning: the input Dataset is never modified.

use crate::data::dataset::Dataset;
use crate::data::pipeline::Operation;
use crate::data::schema::{REGION, TECHNOLOGY, YEAR};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Imputation method for missing numeric cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillStrategy {
    #[default]
    Mean,
    Median,
    Zero,
    Forward,
    Backward,
}

impl FillStrategy {
    pub const ALL: [FillStrategy; 5] = [
        FillStrategy::Mean,
        FillStrategy::Median,
        FillStrategy::Zero,
        FillStrategy::Forward,
        FillStrategy::Backward,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FillStrategy::Mean => "Mean",
            FillStrategy::Median => "Median",
            FillStrategy::Zero => "Zero",
            FillStrategy::Forward => "Forward fill",
            FillStrategy::Backward => "Backward fill",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FillMissing {
    pub strategy: FillStrategy,
    /// Restrict filling to these columns; `None` means every numeric column.
    pub columns: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanOptions {
    pub remove_duplicates: bool,
    pub fill_missing: Option<FillMissing>,
    /// Inclusive `(min, max)` year range.
    pub year_filter: Option<(i64, i64)>,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            remove_duplicates: true,
            fill_missing: None,
            year_filter: None,
        }
    }
}

/// What a `clean` call did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanReport {
    pub rows_before: usize,
    pub rows_after: usize,
    pub duplicates_removed: usize,
    pub cells_filled: usize,
    pub rows_filtered: usize,
    pub skipped: Vec<Operation>,
}

/// Sidebar filters. `None` means "All".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub year_range: Option<(i64, i64)>,
    pub region: Option<String>,
    pub technology: Option<String>,
}

/// Handles data cleaning and filtering operations.
pub struct DataProcessor;

impl DataProcessor {
    /// Apply dedup, fill and year filter (in that order) as configured.
    pub fn clean(
        dataset: &Dataset,
        options: &CleanOptions,
    ) -> Result<(Dataset, CleanReport), ProcessorError> {
        let mut report = CleanReport {
            rows_before: dataset.height(),
            ..Default::default()
        };
        let mut current = dataset.clone();

        if options.remove_duplicates {
            let (next, removed) = Self::remove_duplicates(&current)?;
            current = next;
            report.duplicates_removed = removed;
            log::info!("Removed {} duplicate rows", removed);
        }

        if let Some(fill) = &options.fill_missing {
            let (next, filled) = Self::fill_missing(&current, fill)?;
            current = next;
            report.cells_filled = filled;
        }

        if let Some((min, max)) = options.year_filter {
            let op = Operation::YearFilter;
            if op.is_supported(current.capabilities()) {
                let before = current.height();
                current = Self::filter_year_range(&current, min, max)?;
                report.rows_filtered = before - current.height();
            } else {
                log::info!("Skipping {}: missing {:?}", op, op.missing(current.capabilities()));
                report.skipped.push(op);
            }
        }

        report.rows_after = current.height();
        Ok((current, report))
    }

    /// Drop rows identical to an earlier row across every column.
    ///
    /// Returns the deduplicated Dataset and the number of rows removed.
    pub fn remove_duplicates(dataset: &Dataset) -> Result<(Dataset, usize), ProcessorError> {
        if dataset.width() == 0 {
            return Ok((dataset.clone(), 0));
        }

        let frame = dataset
            .frame()
            .clone()
            .lazy()
            .unique_stable(None, UniqueKeepStrategy::First)
            .collect()?;
        let removed = dataset.height() - frame.height();
        Ok((Dataset::from_normalized(frame), removed))
    }

    /// Impute missing cells of numeric columns.
    ///
    /// Returns the new Dataset and how many cells received a value.
    pub fn fill_missing(
        dataset: &Dataset,
        fill: &FillMissing,
    ) -> Result<(Dataset, usize), ProcessorError> {
        let numeric = dataset.numeric_columns();
        let targets: Vec<String> = match &fill.columns {
            None => numeric,
            Some(requested) => requested
                .iter()
                .filter(|name| {
                    let is_numeric = numeric.contains(name);
                    if !is_numeric {
                        log::warn!("Not filling '{}': not a numeric column", name);
                    }
                    is_numeric
                })
                .cloned()
                .collect(),
        };

        let mut frame = dataset.frame().clone();
        let mut total_filled = 0;

        for name in &targets {
            let (values, filled) = fill_values(&dataset.f64_values(name), fill.strategy);
            if filled == 0 {
                continue;
            }

            let dtype = frame.column(name)?.dtype().clone();
            let series = if dtype.is_float() {
                Series::new(name.as_str().into(), values).cast(&dtype)?
            } else {
                let rounded: Vec<Option<f64>> =
                    values.into_iter().map(|v| v.map(f64::round)).collect();
                Series::new(name.as_str().into(), rounded).cast(&dtype)?
            };
            frame.with_column(series)?;
            total_filled += filled;
        }

        log::info!(
            "Filled {} missing values using {}",
            total_filled,
            fill.strategy.label()
        );
        Ok((Dataset::from_normalized(frame), total_filled))
    }

    /// Keep rows whose year lies in `min..=max`. No-op without a `Year` column.
    pub fn filter_year_range(
        dataset: &Dataset,
        min: i64,
        max: i64,
    ) -> Result<Dataset, ProcessorError> {
        if !Operation::YearFilter.is_supported(dataset.capabilities()) {
            return Ok(dataset.clone());
        }

        let frame = dataset
            .frame()
            .clone()
            .lazy()
            .filter(col(YEAR).gt_eq(lit(min)).and(col(YEAR).lt_eq(lit(max))))
            .collect()?;
        Ok(Dataset::from_normalized(frame))
    }

    /// Apply sidebar filters: year range, then region, then technology.
    ///
    /// Each filter is skipped when its column is absent.
    pub fn filter_selection(
        dataset: &Dataset,
        selection: &Selection,
    ) -> Result<Dataset, ProcessorError> {
        let mut current = match selection.year_range {
            Some((min, max)) => Self::filter_year_range(dataset, min, max)?,
            None => dataset.clone(),
        };

        if let Some(region) = &selection.region {
            current = Self::filter_equals(&current, Operation::RegionFilter, REGION, region)?;
        }
        if let Some(technology) = &selection.technology {
            current =
                Self::filter_equals(&current, Operation::TechnologyFilter, TECHNOLOGY, technology)?;
        }
        Ok(current)
    }

    fn filter_equals(
        dataset: &Dataset,
        op: Operation,
        column: &str,
        value: &str,
    ) -> Result<Dataset, ProcessorError> {
        if !op.is_supported(dataset.capabilities()) {
            log::info!("Skipping {}: column '{}' not present", op, column);
            return Ok(dataset.clone());
        }

        let frame = dataset
            .frame()
            .clone()
            .lazy()
            .filter(col(column).eq(lit(value)))
            .collect()?;
        Ok(Dataset::from_normalized(frame))
    }
}

/// Fill one column's values. Returns the new values and how many were filled.
fn fill_values(values: &[Option<f64>], strategy: FillStrategy) -> (Vec<Option<f64>>, usize) {
    let present: Vec<f64> = values.iter().flatten().copied().collect();

    let filled: Vec<Option<f64>> = match strategy {
        FillStrategy::Mean | FillStrategy::Median | FillStrategy::Zero => {
            let constant = match strategy {
                FillStrategy::Zero => Some(0.0),
                _ if present.is_empty() => None,
                FillStrategy::Mean => Some(present.iter().mean()),
                _ => Some(Data::new(present.clone()).median()),
            };
            values.iter().map(|v| v.or(constant)).collect()
        }
        FillStrategy::Forward => {
            let mut last = None;
            values
                .iter()
                .map(|v| {
                    if v.is_some() {
                        last = *v;
                    }
                    v.or(last)
                })
                .collect()
        }
        FillStrategy::Backward => {
            let mut next = None;
            let mut reversed: Vec<Option<f64>> = values
                .iter()
                .rev()
                .map(|v| {
                    if v.is_some() {
                        next = *v;
                    }
                    v.or(next)
                })
                .collect();
            reversed.reverse();
            reversed
        }
    };

    let count = values
        .iter()
        .zip(&filled)
        .filter(|(before, after)| before.is_none() && after.is_some())
        .count();
    (filled, count)
}
