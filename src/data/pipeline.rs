//! Pipeline Module
//! Capability-gated operations and the recompute driver that turns a loaded
//! Dataset into every derived view the dashboard shows.

use crate::data::dataset::Dataset;
use crate::data::processor::{CleanOptions, CleanReport, DataProcessor, ProcessorError, Selection};
use crate::data::schema::{Capabilities, Field, SchemaError};
use crate::stats::aggregate::{aggregate, AggregateRow, GroupKey, Metric, Reduction};
use crate::stats::calculator::{GrowthStats, KeyMetrics, StatsCalculator, Summary};
use crate::stats::growth::{compute_growth, GrowthRecord};
use polars::prelude::PolarsError;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Processor(#[from] ProcessorError),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Aggregation needs one or two group keys, got {0}")]
    InvalidGrouping(usize),

    #[error("No data for {0}")]
    EmptyResult(String),
}

/// A pipeline step together with the columns it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Operation {
    RemoveDuplicates,
    FillMissing,
    YearFilter,
    RegionFilter,
    TechnologyFilter,
    GrowthRate,
    Aggregate { keys: Vec<GroupKey>, metric: Metric },
}

impl Operation {
    pub fn required_columns(&self) -> Vec<Field> {
        match self {
            Operation::RemoveDuplicates | Operation::FillMissing => Vec::new(),
            Operation::YearFilter => vec![Field::Year],
            Operation::RegionFilter => vec![Field::Region],
            Operation::TechnologyFilter => vec![Field::Technology],
            Operation::GrowthRate => vec![Field::Year, Field::Capacity],
            Operation::Aggregate { keys, metric } => keys
                .iter()
                .map(|k| k.field())
                .chain(std::iter::once(metric.field()))
                .collect(),
        }
    }

    pub fn is_supported(&self, capabilities: &Capabilities) -> bool {
        capabilities.has_all(&self.required_columns())
    }

    /// Required columns the Dataset lacks.
    pub fn missing(&self, capabilities: &Capabilities) -> Vec<Field> {
        capabilities.missing(&self.required_columns())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::RemoveDuplicates => f.write_str("remove duplicates"),
            Operation::FillMissing => f.write_str("fill missing values"),
            Operation::YearFilter => f.write_str("year filter"),
            Operation::RegionFilter => f.write_str("region filter"),
            Operation::TechnologyFilter => f.write_str("technology filter"),
            Operation::GrowthRate => f.write_str("growth rate"),
            Operation::Aggregate { keys, metric } => {
                let keys: Vec<&str> = keys.iter().map(|k| k.column_name()).collect();
                write!(f, "{} by {}", metric.label(), keys.join(", "))
            }
        }
    }
}

/// Aggregation series drawn on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    CapacityByYear,
    CapacityByRegion,
    CapacityByTechnology,
    CapacityByYearRegion,
    CapacityByYearTechnology,
    GenerationByYear,
}

impl ViewKind {
    pub const ALL: [ViewKind; 6] = [
        ViewKind::CapacityByYear,
        ViewKind::CapacityByRegion,
        ViewKind::CapacityByTechnology,
        ViewKind::CapacityByYearRegion,
        ViewKind::CapacityByYearTechnology,
        ViewKind::GenerationByYear,
    ];

    pub fn keys(self) -> &'static [GroupKey] {
        match self {
            ViewKind::CapacityByYear | ViewKind::GenerationByYear => &[GroupKey::Year],
            ViewKind::CapacityByRegion => &[GroupKey::Region],
            ViewKind::CapacityByTechnology => &[GroupKey::Technology],
            ViewKind::CapacityByYearRegion => &[GroupKey::Year, GroupKey::Region],
            ViewKind::CapacityByYearTechnology => &[GroupKey::Year, GroupKey::Technology],
        }
    }

    pub fn metric(self) -> Metric {
        match self {
            ViewKind::GenerationByYear => Metric::GenerationGwh,
            _ => Metric::CapacityMw,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ViewKind::CapacityByYear => "Total Installed Capacity Over Time",
            ViewKind::CapacityByRegion => "Capacity Distribution by Region",
            ViewKind::CapacityByTechnology => "Capacity by Technology",
            ViewKind::CapacityByYearRegion => "Regional Capacity Trends",
            ViewKind::CapacityByYearTechnology => "Technology Adoption Over Time",
            ViewKind::GenerationByYear => "Electricity Generation Over Time",
        }
    }
}

/// Aggregations and key metrics for the filtered Dataset.
#[derive(Debug, Clone, Default)]
pub struct DashboardViews {
    views: HashMap<ViewKind, Vec<AggregateRow>>,
    pub metrics: KeyMetrics,
}

impl DashboardViews {
    /// Compute every view in parallel.
    pub fn compute(dataset: &Dataset, growth: &GrowthStats) -> Result<Self, PipelineError> {
        let views = ViewKind::ALL
            .par_iter()
            .map(|kind| {
                aggregate(dataset, kind.keys(), kind.metric(), Reduction::Sum)
                    .map(|rows| (*kind, rows))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(Self {
            views,
            metrics: StatsCalculator::key_metrics(dataset, growth),
        })
    }

    /// Rows of one view, or `EmptyResult` when it has nothing to show.
    pub fn view(&self, kind: ViewKind) -> Result<&[AggregateRow], PipelineError> {
        match self.views.get(&kind) {
            Some(rows) if !rows.is_empty() => Ok(rows),
            _ => Err(PipelineError::EmptyResult(kind.title().to_string())),
        }
    }
}

/// Everything derived from one recompute.
#[derive(Debug, Clone)]
pub struct DerivedViews {
    pub cleaned: Dataset,
    pub clean_report: CleanReport,
    pub growth: Vec<GrowthRecord>,
    pub growth_stats: GrowthStats,
    pub filtered: Dataset,
    pub dashboard: DashboardViews,
    pub summary: Summary,
}

pub struct Pipeline;

impl Pipeline {
    /// clean -> growth -> filter -> dashboard aggregations.
    ///
    /// Growth is derived from the cleaned Dataset; the dashboard reflects the
    /// sidebar selection.
    pub fn run(
        raw: &Dataset,
        options: &CleanOptions,
        selection: &Selection,
    ) -> Result<DerivedViews, PipelineError> {
        log::debug!(
            "Recompute: {} rows, {} columns, {:?}",
            raw.height(),
            raw.width(),
            options
        );

        let (cleaned, clean_report) = DataProcessor::clean(raw, options)?;
        let growth = compute_growth(&cleaned);
        let growth_stats = StatsCalculator::growth_stats(&growth);
        let filtered = DataProcessor::filter_selection(&cleaned, selection)?;
        let dashboard = DashboardViews::compute(&filtered, &growth_stats)?;
        let summary = StatsCalculator::summary_stats(&cleaned, clean_report.duplicates_removed);

        log::debug!(
            "Recompute done: {} cleaned, {} growth, {} filtered rows",
            cleaned.height(),
            growth.len(),
            filtered.height()
        );

        Ok(DerivedViews {
            cleaned,
            clean_report,
            growth,
            growth_stats,
            filtered,
            dashboard,
            summary,
        })
    }
}
