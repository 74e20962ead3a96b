//! Aggregation Module
//! Group-by-then-reduce queries that feed every chart.

use crate::data::dataset::Dataset;
use crate::data::pipeline::{Operation, PipelineError};
use crate::data::schema::{Field, REGION, TECHNOLOGY, YEAR};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const VALUE: &str = "value";

/// Column a query can group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupKey {
    Year,
    Region,
    Technology,
}

impl GroupKey {
    pub fn field(self) -> Field {
        match self {
            GroupKey::Year => Field::Year,
            GroupKey::Region => Field::Region,
            GroupKey::Technology => Field::Technology,
        }
    }

    pub fn column_name(self) -> &'static str {
        match self {
            GroupKey::Year => YEAR,
            GroupKey::Region => REGION,
            GroupKey::Technology => TECHNOLOGY,
        }
    }
}

/// Numeric column a query reduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    CapacityMw,
    GenerationGwh,
}

impl Metric {
    pub fn field(self) -> Field {
        match self {
            Metric::CapacityMw => Field::Capacity,
            Metric::GenerationGwh => Field::Generation,
        }
    }

    /// Short label used in charts and exports.
    pub fn label(self) -> &'static str {
        match self {
            Metric::CapacityMw => "Capacity_MW",
            Metric::GenerationGwh => "Generation_GWh",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::CapacityMw => "MW",
            Metric::GenerationGwh => "GWh",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Reduction {
    #[default]
    Sum,
    Mean,
    Median,
    Min,
    Max,
    Count,
}

impl Reduction {
    fn expr(self, column: &str) -> Expr {
        let c = col(column);
        match self {
            Reduction::Sum => c.sum(),
            Reduction::Mean => c.mean(),
            Reduction::Median => c.median(),
            Reduction::Min => c.min(),
            Reduction::Max => c.max(),
            Reduction::Count => c.count(),
        }
    }
}

/// One group's key value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum KeyValue {
    Year(i64),
    Label(String),
}

impl KeyValue {
    pub fn as_year(&self) -> Option<i64> {
        match self {
            KeyValue::Year(y) => Some(*y),
            KeyValue::Label(_) => None,
        }
    }
}

impl std::fmt::Display for KeyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyValue::Year(y) => write!(f, "{}", y),
            KeyValue::Label(s) => f.write_str(s),
        }
    }
}

/// One output row: the group's key values (in query order) and reduced value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub keys: Vec<KeyValue>,
    pub value: f64,
}

/// Group `dataset` by one or two keys and reduce `metric`.
///
/// Rows with a missing key are ignored; groups without rows are not emitted.
/// Output is sorted ascending by the first key, then the second. An absent
/// column or an empty Dataset yields an empty result.
pub fn aggregate(
    dataset: &Dataset,
    keys: &[GroupKey],
    metric: Metric,
    reduction: Reduction,
) -> Result<Vec<AggregateRow>, PipelineError> {
    if keys.is_empty() || keys.len() > 2 {
        return Err(PipelineError::InvalidGrouping(keys.len()));
    }

    let op = Operation::Aggregate {
        keys: keys.to_vec(),
        metric,
    };
    if !op.is_supported(dataset.capabilities()) {
        log::debug!("Skipping {}: missing {:?}", op, op.missing(dataset.capabilities()));
        return Ok(Vec::new());
    }
    if dataset.is_empty() {
        return Ok(Vec::new());
    }

    let names: Vec<&str> = keys.iter().map(|k| k.column_name()).collect();
    let group_exprs: Vec<Expr> = names.iter().map(|n| col(*n)).collect();
    let predicate = names
        .iter()
        .map(|n| col(*n).is_not_null())
        .reduce(|acc, e| acc.and(e))
        .unwrap_or_else(|| lit(true));

    let metric_column = metric.field().column_name();
    let out = dataset
        .frame()
        .clone()
        .lazy()
        .filter(predicate)
        .group_by(group_exprs)
        .agg([reduction
            .expr(metric_column)
            .cast(DataType::Float64)
            .alias(VALUE)])
        .sort(names.clone(), SortMultipleOptions::default())
        .collect()?;

    let key_columns: Vec<Vec<Option<KeyValue>>> = keys
        .iter()
        .map(|k| key_values(&out, *k))
        .collect::<Result<_, _>>()?;
    let values = out.column(VALUE)?.f64()?;

    let rows = (0..out.height())
        .filter_map(|i| {
            let value = values.get(i)?;
            let keys = key_columns
                .iter()
                .map(|column| column[i].clone())
                .collect::<Option<Vec<_>>>()?;
            Some(AggregateRow { keys, value })
        })
        .collect();
    Ok(rows)
}

fn key_values(out: &DataFrame, key: GroupKey) -> Result<Vec<Option<KeyValue>>, PipelineError> {
    let column = out.column(key.column_name())?;
    let values = match key {
        GroupKey::Year => column
            .i64()?
            .into_iter()
            .map(|v| v.map(KeyValue::Year))
            .collect(),
        GroupKey::Region | GroupKey::Technology => column
            .str()?
            .into_iter()
            .map(|v| v.map(|s| KeyValue::Label(s.to_string())))
            .collect(),
    };
    Ok(values)
}

/// Split two-key rows into one series per second key: `(label, [(year, value)])`.
///
/// Rows whose first key is not a year are skipped.
pub fn pivot_by_second_key(rows: &[AggregateRow]) -> Vec<(String, Vec<(i64, f64)>)> {
    let mut series: BTreeMap<String, Vec<(i64, f64)>> = BTreeMap::new();
    for row in rows {
        let (Some(year), Some(label)) = (
            row.keys.first().and_then(KeyValue::as_year),
            row.keys.get(1),
        ) else {
            continue;
        };
        series
            .entry(label.to_string())
            .or_default()
            .push((year, row.value));
    }
    series.into_iter().collect()
}

/// Single-key rows as `(label, value)` pairs.
pub fn labelled(rows: &[AggregateRow]) -> Vec<(String, f64)> {
    rows.iter()
        .filter_map(|row| Some((row.keys.first()?.to_string(), row.value)))
        .collect()
}

/// Single-key year rows as `(year, value)` points.
pub fn yearly(rows: &[AggregateRow]) -> Vec<(i64, f64)> {
    rows.iter()
        .filter_map(|row| Some((row.keys.first()?.as_year()?, row.value)))
        .collect()
}
