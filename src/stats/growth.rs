//! Growth Rate Module
//! Year-over-year capacity growth within (region, technology) partitions.

use crate::data::dataset::Dataset;
use crate::data::pipeline::Operation;
use crate::data::schema::{
    CAPACITY, COUNTRY, GENERATION, GROWTH_RATE, PREV_YEAR_CAPACITY, REGION, TECHNOLOGY, YEAR,
};
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// One row of the growth view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthRecord {
    /// Row index in the Dataset the record was derived from.
    pub row: usize,
    pub region: Option<String>,
    pub country: Option<String>,
    pub technology: Option<String>,
    pub year: i64,
    pub capacity_mw: f64,
    pub generation_gwh: Option<f64>,
    pub prev_year_capacity: f64,
    /// `None` when the previous capacity is zero.
    pub growth_rate_pct: Option<f64>,
}

/// Partition key. `None` in a slot means the column is absent from the Dataset.
type PartitionKey = (Option<String>, Option<String>);

/// Compute growth rates for every row that has a predecessor in its partition.
///
/// Partitions are visited in ascending key order and rows within a partition
/// in ascending year order (stable for equal years). The first row of each
/// partition never yields a record.
pub fn compute_growth(dataset: &Dataset) -> Vec<GrowthRecord> {
    let op = Operation::GrowthRate;
    if !op.is_supported(dataset.capabilities()) {
        log::info!("Skipping {}: missing {:?}", op, op.missing(dataset.capabilities()));
        return Vec::new();
    }

    let years = dataset.i64_values(YEAR);
    let capacities = dataset.f64_values(CAPACITY);
    let regions = optional_text(dataset, REGION);
    let technologies = optional_text(dataset, TECHNOLOGY);

    let mut partitions: BTreeMap<PartitionKey, Vec<(i64, usize)>> = BTreeMap::new();
    for (row, year) in years.iter().enumerate() {
        let Some(year) = year else {
            continue;
        };
        let Some(region) = key_at(&regions, row) else {
            continue;
        };
        let Some(technology) = key_at(&technologies, row) else {
            continue;
        };
        partitions
            .entry((region, technology))
            .or_default()
            .push((*year, row));
    }

    let countries = dataset.str_values(COUNTRY);
    let generations = dataset.f64_values(GENERATION);
    let mut records = Vec::new();
    let mut zero_base = 0usize;

    for ((region, technology), mut rows) in partitions {
        rows.sort_by_key(|(year, _)| *year);

        for pair in rows.windows(2) {
            let (_, prev_row) = pair[0];
            let (year, row) = pair[1];
            let (Some(prev), Some(current)) = (capacities[prev_row], capacities[row]) else {
                continue;
            };

            let growth_rate_pct = if prev == 0.0 {
                zero_base += 1;
                None
            } else {
                Some((current - prev) / prev * 100.0)
            };

            records.push(GrowthRecord {
                row,
                region: region.clone(),
                country: countries.get(row).cloned().flatten(),
                technology: technology.clone(),
                year,
                capacity_mw: current,
                generation_gwh: generations.get(row).copied().flatten(),
                prev_year_capacity: prev,
                growth_rate_pct,
            });
        }
    }

    if zero_base > 0 {
        log::warn!(
            "{} growth rate(s) undefined because the previous capacity is zero",
            zero_base
        );
    }
    log::debug!("Computed {} growth records", records.len());
    records
}

fn optional_text(dataset: &Dataset, column: &str) -> Option<Vec<Option<String>>> {
    dataset
        .frame()
        .column(column)
        .is_ok()
        .then(|| dataset.str_values(column))
}

/// `Some(None)` when the key column is absent, `None` when the cell is missing.
fn key_at(values: &Option<Vec<Option<String>>>, row: usize) -> Option<Option<String>> {
    match values {
        None => Some(None),
        Some(values) => values.get(row).cloned().flatten().map(Some),
    }
}

/// Materialize the growth view for export: source rows in growth order plus
/// `Prev_Year_Capacity` and `Growth_Rate (%)`.
pub fn growth_frame(dataset: &Dataset, records: &[GrowthRecord]) -> PolarsResult<DataFrame> {
    let indices: Vec<IdxSize> = records.iter().map(|r| r.row as IdxSize).collect();
    let mut frame = dataset
        .frame()
        .take(&IdxCa::from_vec("row".into(), indices))?;

    let prev: Vec<f64> = records.iter().map(|r| r.prev_year_capacity).collect();
    let rates: Vec<Option<f64>> = records.iter().map(|r| r.growth_rate_pct).collect();
    frame.with_column(Series::new(PREV_YEAR_CAPACITY.into(), prev))?;
    frame.with_column(Series::new(GROWTH_RATE.into(), rates))?;
    Ok(frame)
}

/// Finite growth rates grouped by technology (or region when technology is absent).
pub fn rates_by_category(records: &[GrowthRecord]) -> Vec<(String, Vec<f64>)> {
    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in records {
        let Some(rate) = record.growth_rate_pct else {
            continue;
        };
        let category = record
            .technology
            .clone()
            .or_else(|| record.region.clone())
            .unwrap_or_else(|| "All".to_string());
        grouped.entry(category).or_default().push(rate);
    }
    grouped.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(
        regions: &[&str],
        technologies: &[&str],
        years: &[i64],
        capacities: &[Option<f64>],
    ) -> Dataset {
        let raw = df!(
            "Region Indicator" => regions,
            "Technology" => technologies,
            "Year" => years,
            "Electricity Installed Capacity (MW)" => capacities
        )
        .unwrap();
        Dataset::normalize(&raw).unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_single_partition_growth() {
        let ds = dataset(
            &["Africa"; 3],
            &["Solar"; 3],
            &[2022, 2020, 2021],
            &[Some(180.0), Some(100.0), Some(150.0)],
        );
        let growth = compute_growth(&ds);
        assert_eq!(growth.len(), 2);

        assert_eq!(growth[0].year, 2021);
        assert_eq!(growth[0].prev_year_capacity, 100.0);
        assert!(approx(growth[0].growth_rate_pct.unwrap(), 50.0));

        assert_eq!(growth[1].year, 2022);
        assert!(approx(growth[1].growth_rate_pct.unwrap(), 20.0));
        assert_eq!(growth[1].row, 0);
    }

    #[test]
    fn test_partitions_are_isolated() {
        let ds = dataset(
            &["Africa", "Asia", "Africa", "Asia", "Africa"],
            &["Solar", "Solar", "Solar", "Solar", "Wind"],
            &[2020, 2020, 2021, 2021, 2021],
            &[Some(100.0), Some(1000.0), Some(110.0), Some(500.0), Some(7.0)],
        );
        let growth = compute_growth(&ds);

        // (Africa, Solar) and (Asia, Solar) each contribute one record, (Africa, Wind) none.
        assert_eq!(growth.len(), 2);
        assert_eq!(growth[0].region.as_deref(), Some("Africa"));
        assert_eq!(growth[0].prev_year_capacity, 100.0);
        assert!(approx(growth[0].growth_rate_pct.unwrap(), 10.0));
        assert_eq!(growth[1].region.as_deref(), Some("Asia"));
        assert_eq!(growth[1].prev_year_capacity, 1000.0);
        assert!(approx(growth[1].growth_rate_pct.unwrap(), -50.0));
    }

    #[test]
    fn test_n_rows_yield_n_minus_one() {
        for n in 1..6usize {
            let years: Vec<i64> = (0..n as i64).map(|i| 2000 + i).collect();
            let caps: Vec<Option<f64>> = (0..n).map(|i| Some(10.0 + i as f64)).collect();
            let ds = dataset(&vec!["Europe"; n], &vec!["Hydro"; n], &years, &caps);
            assert_eq!(compute_growth(&ds).len(), n - 1);
        }
    }

    #[test]
    fn test_zero_previous_capacity_is_undefined() {
        let ds = dataset(
            &["Africa"; 2],
            &["Solar"; 2],
            &[2020, 2021],
            &[Some(0.0), Some(50.0)],
        );
        let growth = compute_growth(&ds);
        assert_eq!(growth.len(), 1);
        assert_eq!(growth[0].growth_rate_pct, None);
    }

    #[test]
    fn test_missing_capacity_drops_neighbours() {
        let ds = dataset(
            &["Africa"; 3],
            &["Solar"; 3],
            &[2020, 2021, 2022],
            &[Some(10.0), None, Some(30.0)],
        );
        assert!(compute_growth(&ds).is_empty());
    }

    #[test]
    fn test_requires_year_and_capacity() {
        let raw = df!(
            "Region Indicator" => ["Africa", "Africa"],
            "Electricity Installed Capacity (MW)" => [1.0, 2.0]
        )
        .unwrap();
        let ds = Dataset::normalize(&raw).unwrap();
        assert!(compute_growth(&ds).is_empty());
    }

    #[test]
    fn test_absent_partition_columns_form_one_partition() {
        let raw = df!(
            "Year" => [2020i64, 2021, 2022],
            "Electricity Installed Capacity (MW)" => [100.0, 200.0, 100.0]
        )
        .unwrap();
        let ds = Dataset::normalize(&raw).unwrap();
        let growth = compute_growth(&ds);
        assert_eq!(growth.len(), 2);
        assert!(approx(growth[0].growth_rate_pct.unwrap(), 100.0));
        assert!(approx(growth[1].growth_rate_pct.unwrap(), -50.0));
        assert_eq!(growth[0].region, None);
    }

    #[test]
    fn test_growth_frame_columns() {
        let ds = dataset(
            &["Africa"; 3],
            &["Solar"; 3],
            &[2020, 2021, 2022],
            &[Some(100.0), Some(150.0), Some(180.0)],
        );
        let growth = compute_growth(&ds);
        let frame = growth_frame(&ds, &growth).unwrap();
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.width(), ds.width() + 2);

        let rates: Vec<Option<f64>> = frame
            .column(GROWTH_RATE)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert!(approx(rates[0].unwrap(), 50.0));
        assert!(approx(rates[1].unwrap(), 20.0));
    }

    #[test]
    fn test_rates_by_category() {
        let ds = dataset(
            &["Africa", "Africa", "Africa", "Africa"],
            &["Solar", "Solar", "Wind", "Wind"],
            &[2020, 2021, 2020, 2021],
            &[Some(100.0), Some(150.0), Some(0.0), Some(5.0)],
        );
        let grouped = rates_by_category(&compute_growth(&ds));
        // Wind's only rate is undefined and is left out.
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].0, "Solar");
    }
}
