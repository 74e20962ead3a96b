//! Statistics Calculator Module
//! Descriptive statistics for growth rates, dataset summaries and key metrics.

use crate::data::dataset::Dataset;
use crate::data::schema::{CAPACITY, COUNTRY, Field, GENERATION, REGION, TECHNOLOGY};
use crate::stats::growth::{rates_by_category, GrowthRecord};
use rayon::prelude::*;
use serde::Serialize;

/// Descriptive statistics for a set of values.
#[derive(Debug, Clone, Serialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub variance: f64,
    pub p95: f64,
    pub p05: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for DescriptiveStats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            variance: f64::NAN,
            p95: f64::NAN,
            p05: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
        }
    }
}

/// Growth-rate statistics overall and per category (technology, or region
/// when the technology column is absent).
#[derive(Debug, Clone, Default, Serialize)]
pub struct GrowthStats {
    pub overall: DescriptiveStats,
    /// Records whose rate is undefined (zero previous capacity).
    pub undefined: usize,
    pub by_category: Vec<(String, DescriptiveStats)>,
}

impl GrowthStats {
    /// Mean growth rate, `None` when no rate is defined.
    pub fn average(&self) -> Option<f64> {
        (self.overall.count > 0).then_some(self.overall.mean)
    }
}

/// Read-only description of a Dataset.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub row_count: usize,
    pub column_count: usize,
    pub year_min: Option<i64>,
    pub year_max: Option<i64>,
    pub missing_value_count_total: usize,
    pub duplicate_row_count_removed: usize,
    pub region_count: Option<usize>,
    pub technology_count: Option<usize>,
    pub country_count: Option<usize>,
    pub total_capacity_mw: Option<f64>,
    pub total_generation_gwh: Option<f64>,
    pub missing_by_column: Vec<(String, usize)>,
}

/// Headline numbers for the filtered view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyMetrics {
    pub total_capacity_gw: Option<f64>,
    pub total_generation_twh: Option<f64>,
    pub country_count: Option<usize>,
    pub technology_count: Option<usize>,
    pub average_growth_pct: Option<f64>,
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(values: &[f64]) -> DescriptiveStats {
        let n = values.len();
        if n == 0 {
            return DescriptiveStats::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mean = values.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        let variance = if n > 1 {
            values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };

        DescriptiveStats {
            count: n,
            mean,
            median,
            std: variance.sqrt(),
            variance,
            p95: Self::percentile(&sorted, 95.0),
            p05: Self::percentile(&sorted, 5.0),
            min: sorted[0],
            max: sorted[n - 1],
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Statistics over the defined growth rates; categories are computed in parallel.
    pub fn growth_stats(growth: &[GrowthRecord]) -> GrowthStats {
        let rates: Vec<f64> = growth.iter().filter_map(|r| r.growth_rate_pct).collect();

        let by_category = rates_by_category(growth)
            .into_par_iter()
            .map(|(category, values)| (category, Self::compute_descriptive_stats(&values)))
            .collect();

        GrowthStats {
            overall: Self::compute_descriptive_stats(&rates),
            undefined: growth.len() - rates.len(),
            by_category,
        }
    }

    /// Summarize a Dataset. `duplicates_removed` comes from the cleaning step
    /// that produced it.
    pub fn summary_stats(dataset: &Dataset, duplicates_removed: usize) -> Summary {
        let (year_min, year_max) = match dataset.year_bounds() {
            Some((min, max)) => (Some(min), Some(max)),
            None => (None, None),
        };

        Summary {
            row_count: dataset.height(),
            column_count: dataset.width(),
            year_min,
            year_max,
            missing_value_count_total: dataset.missing_total(),
            duplicate_row_count_removed: duplicates_removed,
            region_count: distinct(dataset, Field::Region, REGION),
            technology_count: distinct(dataset, Field::Technology, TECHNOLOGY),
            country_count: distinct(dataset, Field::Country, COUNTRY),
            total_capacity_mw: dataset.column_sum(CAPACITY),
            total_generation_gwh: dataset.column_sum(GENERATION),
            missing_by_column: dataset.missing_counts(),
        }
    }

    pub fn key_metrics(dataset: &Dataset, growth: &GrowthStats) -> KeyMetrics {
        KeyMetrics {
            total_capacity_gw: dataset.column_sum(CAPACITY).map(|mw| mw / 1000.0),
            total_generation_twh: dataset.column_sum(GENERATION).map(|gwh| gwh / 1000.0),
            country_count: distinct(dataset, Field::Country, COUNTRY),
            technology_count: distinct(dataset, Field::Technology, TECHNOLOGY),
            average_growth_pct: growth.average(),
        }
    }
}

fn distinct(dataset: &Dataset, field: Field, column: &str) -> Option<usize> {
    dataset
        .has(field)
        .then(|| dataset.unique_values(column).len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn record(technology: &str, rate: Option<f64>) -> GrowthRecord {
        GrowthRecord {
            row: 0,
            region: Some("Africa".into()),
            country: None,
            technology: Some(technology.into()),
            year: 2021,
            capacity_mw: 1.0,
            generation_gwh: None,
            prev_year_capacity: 1.0,
            growth_rate_pct: rate,
        }
    }

    #[test]
    fn test_descriptive_stats() {
        let stats = StatsCalculator::compute_descriptive_stats(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(stats.count, 4);
        assert!((stats.mean - 2.5).abs() < 1e-12);
        assert!((stats.median - 2.5).abs() < 1e-12);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert!((stats.variance - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_stats_are_nan() {
        let stats = StatsCalculator::compute_descriptive_stats(&[]);
        assert_eq!(stats.count, 0);
        assert!(stats.mean.is_nan());
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted: Vec<f64> = (0..=10).map(f64::from).collect();
        assert!((StatsCalculator::percentile(&sorted, 95.0) - 9.5).abs() < 1e-12);
        assert!((StatsCalculator::percentile(&sorted, 5.0) - 0.5).abs() < 1e-12);
        assert_eq!(StatsCalculator::percentile(&[3.0], 50.0), 3.0);
    }

    #[test]
    fn test_growth_stats_skip_undefined() {
        let growth = vec![
            record("Solar", Some(10.0)),
            record("Solar", Some(30.0)),
            record("Wind", None),
            record("Wind", Some(-5.0)),
        ];
        let stats = StatsCalculator::growth_stats(&growth);
        assert_eq!(stats.overall.count, 3);
        assert_eq!(stats.undefined, 1);
        assert!((stats.average().unwrap() - 35.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.by_category.len(), 2);
        assert_eq!(stats.by_category[0].0, "Solar");
        assert_eq!(stats.by_category[0].1.count, 2);

        assert_eq!(StatsCalculator::growth_stats(&[]).average(), None);
    }

    #[test]
    fn test_summary_stats() {
        let raw = df!(
            "Region Indicator" => [Some("Asia"), Some("Africa"), None],
            "Country" => ["A", "B", "A"],
            "Year" => [Some(2021i64), Some(2019), None],
            "Electricity Installed Capacity (MW)" => [Some(1500.0), None, Some(500.0)]
        )
        .unwrap();
        let ds = Dataset::normalize(&raw).unwrap();
        let summary = StatsCalculator::summary_stats(&ds, 2);

        assert_eq!(summary.row_count, 3);
        assert_eq!(summary.column_count, 4);
        assert_eq!(summary.year_min, Some(2019));
        assert_eq!(summary.year_max, Some(2021));
        assert_eq!(summary.missing_value_count_total, 3);
        assert_eq!(summary.duplicate_row_count_removed, 2);
        assert_eq!(summary.region_count, Some(2));
        assert_eq!(summary.country_count, Some(2));
        assert_eq!(summary.technology_count, None);
        assert_eq!(summary.total_capacity_mw, Some(2000.0));
        assert_eq!(summary.total_generation_gwh, None);
    }

    #[test]
    fn test_key_metrics_units() {
        let raw = df!(
            "Technology" => ["Solar", "Wind", "Solar"],
            "Electricity Installed Capacity (MW)" => [1000.0, 2500.0, 500.0],
            "Electricity Generation (GWh)" => [2000.0, 0.0, 1000.0]
        )
        .unwrap();
        let ds = Dataset::normalize(&raw).unwrap();
        let metrics = StatsCalculator::key_metrics(&ds, &GrowthStats::default());
        assert_eq!(metrics.total_capacity_gw, Some(4.0));
        assert_eq!(metrics.total_generation_twh, Some(3.0));
        assert_eq!(metrics.technology_count, Some(2));
        assert_eq!(metrics.country_count, None);
        assert_eq!(metrics.average_growth_pct, None);
    }
}
