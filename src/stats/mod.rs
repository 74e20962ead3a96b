//! Stats module - growth rates, aggregations and descriptive statistics

pub mod aggregate;
pub mod calculator;
pub mod growth;

pub use aggregate::{aggregate, AggregateRow, GroupKey, KeyValue, Metric, Reduction};
pub use calculator::{DescriptiveStats, GrowthStats, KeyMetrics, StatsCalculator, Summary};
pub use growth::{compute_growth, growth_frame, GrowthRecord};
