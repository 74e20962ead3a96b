//! End-to-end pipeline tests driven from CSV text.

use renewable_dashboard::charts::ChartData;
use renewable_dashboard::data::schema::{CAPACITY, GENERATION, YEAR};
use renewable_dashboard::data::{
    generate_sample_data, CleanOptions, DataLoader, DataProcessor, Dataset, FillMissing,
    FillStrategy, Pipeline, SampleParams, SchemaError, Selection, ViewKind,
};
use renewable_dashboard::report::ReportGenerator;
use renewable_dashboard::stats::{aggregate, compute_growth, GroupKey, Metric, Reduction};
use std::collections::HashMap;
use std::io::Write;

const EPS: f64 = 1e-9;

fn load(csv: &str) -> Dataset {
    let mut loader = DataLoader::new();
    loader
        .load_csv_bytes("input.csv", csv.as_bytes())
        .unwrap()
        .clone()
}

fn mixed() -> Dataset {
    load(
        "Region Indicator,Country,Technology,Year,Electricity Installed Capacity (MW),Electricity Generation (GWh)\n\
         Africa,Kenya,Solar,2020,100,10\n\
         Africa,Kenya,Solar,2021,150,12\n\
         Africa,Kenya,Solar,2022,180,15\n\
         Asia,China,Wind,2020,200,40\n\
         Asia,China,Wind,2021,220,44\n\
         Asia,China,Wind,2021,220,44\n\
         Europe,Spain,Solar,2021,80,\n",
    )
}

#[test]
fn scenario_a_growth_within_one_partition() {
    let ds = load(
        "Region Indicator,Technology,Year,Electricity Installed Capacity (MW)\n\
         Africa,Solar,2020,100\n\
         Africa,Solar,2021,150\n\
         Africa,Solar,2022,180\n",
    );
    let growth = compute_growth(&ds);

    assert_eq!(growth.len(), 2);
    assert_eq!(growth[0].year, 2021);
    assert!((growth[0].growth_rate_pct.unwrap() - 50.0).abs() < EPS);
    assert_eq!(growth[1].year, 2022);
    assert!((growth[1].growth_rate_pct.unwrap() - 20.0).abs() < EPS);
    assert!(growth.iter().all(|r| r.year != 2020));
}

#[test]
fn scenario_b_duplicate_row_removed_once() {
    let ds = load(
        "Region Indicator,Technology,Year,Electricity Installed Capacity (MW)\n\
         Africa,Solar,2020,100\n\
         Africa,Solar,2020,100\n\
         Africa,Solar,2021,120\n",
    );
    let (deduped, removed) = DataProcessor::remove_duplicates(&ds).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(deduped.height(), 2);
}

#[test]
fn scenario_c_mean_fill() {
    let ds = load(
        "Region Indicator,Year,Electricity Installed Capacity (MW)\n\
         Africa,2020,10\n\
         Africa,2021,\n\
         Africa,2022,30\n",
    );
    let fill = FillMissing {
        strategy: FillStrategy::Mean,
        columns: Some(vec![CAPACITY.to_string()]),
    };
    let (filled, count) = DataProcessor::fill_missing(&ds, &fill).unwrap();
    assert_eq!(count, 1);
    assert_eq!(
        filled.f64_values(CAPACITY),
        vec![Some(10.0), Some(20.0), Some(30.0)]
    );
}

#[test]
fn scenario_d_forward_fill_keeps_leading_gap() {
    let ds = load(
        "Region Indicator,Year,Electricity Installed Capacity (MW)\n\
         Africa,2020,\n\
         Africa,2021,5\n\
         Africa,2022,\n\
         Africa,2023,8\n",
    );
    let fill = FillMissing {
        strategy: FillStrategy::Forward,
        columns: None,
    };
    let (filled, count) = DataProcessor::fill_missing(&ds, &fill).unwrap();
    assert_eq!(count, 1);
    assert_eq!(
        filled.f64_values(CAPACITY),
        vec![None, Some(5.0), Some(5.0), Some(8.0)]
    );
}

#[test]
fn scenario_e_aggregate_on_empty_dataset() {
    let ds = DataProcessor::filter_year_range(&mixed(), 3000, 3001).unwrap();
    assert!(ds.is_empty());
    let rows = aggregate(&ds, &[GroupKey::Year], Metric::CapacityMw, Reduction::Sum).unwrap();
    assert!(rows.is_empty());
}

#[test]
fn dedup_is_idempotent() {
    let ds = mixed();
    let (once, removed) = DataProcessor::remove_duplicates(&ds).unwrap();
    assert_eq!(removed, 1);
    let (twice, removed_again) = DataProcessor::remove_duplicates(&once).unwrap();
    assert_eq!(removed_again, 0);
    assert_eq!(twice.height(), once.height());
}

#[test]
fn growth_partitions_are_isolated() {
    let (ds, _) = DataProcessor::remove_duplicates(&mixed()).unwrap();
    let growth = compute_growth(&ds);

    // Africa/Solar: 2 records, Asia/Wind: 1 record, Europe/Solar: none.
    assert_eq!(growth.len(), 3);
    let asia: Vec<_> = growth
        .iter()
        .filter(|r| r.region.as_deref() == Some("Asia"))
        .collect();
    assert_eq!(asia.len(), 1);
    assert!((asia[0].prev_year_capacity - 200.0).abs() < EPS);
    assert!((asia[0].growth_rate_pct.unwrap() - 10.0).abs() < EPS);
    assert!(growth
        .iter()
        .all(|r| r.region.as_deref() != Some("Europe")));
}

#[test]
fn growth_yields_one_fewer_record_per_partition() {
    let ds = generate_sample_data(&SampleParams::default()).unwrap();
    let growth = compute_growth(&ds);

    let mut partition_sizes: HashMap<(String, String), usize> = HashMap::new();
    let regions = ds.str_values("Region Indicator");
    let technologies = ds.str_values("Technology");
    for (region, technology) in regions.into_iter().zip(technologies) {
        *partition_sizes
            .entry((region.unwrap(), technology.unwrap()))
            .or_default() += 1;
    }
    let expected: usize = partition_sizes.values().map(|n| n - 1).sum();
    assert_eq!(growth.len(), expected);
}

#[test]
fn aggregate_total_matches_column_sum() {
    let ds = mixed();
    for keys in [
        vec![GroupKey::Year],
        vec![GroupKey::Region],
        vec![GroupKey::Year, GroupKey::Technology],
    ] {
        let rows = aggregate(&ds, &keys, Metric::CapacityMw, Reduction::Sum).unwrap();
        let total: f64 = rows.iter().map(|r| r.value).sum();
        assert!((total - ds.column_sum(CAPACITY).unwrap()).abs() < 1e-6);
    }
}

#[test]
fn narrowing_year_range_never_adds_rows() {
    let ds = mixed();
    let mut previous = ds.height();
    for (min, max) in [(2019, 2023), (2020, 2022), (2021, 2022), (2021, 2021), (2022, 2021)] {
        let filtered = DataProcessor::filter_year_range(&ds, min, max).unwrap();
        assert!(filtered.height() <= previous);
        previous = filtered.height();
    }
    assert_eq!(previous, 0);
}

#[test]
fn pipeline_applies_selection_to_dashboard_only() {
    let selection = Selection {
        region: Some("Asia".to_string()),
        ..Default::default()
    };
    let views = Pipeline::run(&mixed(), &CleanOptions::default(), &selection).unwrap();

    assert_eq!(views.cleaned.height(), 6);
    assert_eq!(views.growth.len(), 3);
    assert_eq!(views.filtered.height(), 2);

    let by_region = views.dashboard.view(ViewKind::CapacityByRegion).unwrap();
    assert_eq!(by_region.len(), 1);
    assert!((by_region[0].value - 420.0).abs() < EPS);
    assert_eq!(views.summary.duplicate_row_count_removed, 1);
}

#[test]
fn pipeline_skips_operations_without_columns() {
    let ds = load(
        "Country,Electricity Generation (GWh)\n\
         Kenya,10\n\
         Spain,20\n",
    );
    let options = CleanOptions {
        year_filter: Some((2020, 2021)),
        ..Default::default()
    };
    let views = Pipeline::run(&ds, &options, &Selection::default()).unwrap();

    assert_eq!(views.cleaned.height(), 2);
    assert_eq!(views.clean_report.skipped.len(), 1);
    assert!(views.growth.is_empty());
    assert!(views.dashboard.view(ViewKind::CapacityByYear).is_err());
    assert_eq!(views.dashboard.metrics.country_count, Some(2));
}

#[test]
fn cleaned_csv_reloads_to_same_shape() {
    let views = Pipeline::run(&mixed(), &CleanOptions::default(), &Selection::default()).unwrap();
    let csv = ReportGenerator::cleaned_csv(&views.cleaned).unwrap();

    let reloaded = load(&csv);
    assert_eq!(reloaded.height(), views.cleaned.height());
    assert_eq!(reloaded.column_names(), views.cleaned.column_names());
    assert_eq!(reloaded.f64_values(GENERATION), views.cleaned.f64_values(GENERATION));
}

#[test]
fn failed_load_keeps_previous_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capacity.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "region,technology,year,capacity_mw\nAfrica,Solar,2020,5").unwrap();

    let mut loader = DataLoader::new();
    let ds = loader.load_path(&path).unwrap();
    assert_eq!(ds.i64_values(YEAR), vec![Some(2020)]);

    let missing = loader
        .load_path(&dir.path().join("capacity.xlsx"))
        .unwrap_err();
    assert!(matches!(missing, SchemaError::Io { .. }));

    let broken = dir.path().join("broken.xlsx");
    std::fs::write(&broken, b"not a workbook").unwrap();
    let err = loader.load_path(&broken).unwrap_err();
    assert!(matches!(err, SchemaError::Workbook(_)));
    assert_eq!(loader.get_row_count(), 1);
}

#[test]
fn sample_pipeline_produces_every_chart() {
    let ds = generate_sample_data(&SampleParams::default()).unwrap();
    let views = Pipeline::run(&ds, &CleanOptions::default(), &Selection::default()).unwrap();

    for kind in ViewKind::ALL {
        assert!(!views.dashboard.view(kind).unwrap().is_empty(), "{:?}", kind);
    }
    let charts = ChartData::dashboard(&views);
    assert_eq!(charts.len(), ViewKind::ALL.len() + 1);
    assert!(charts.iter().all(|c| !c.is_empty()));
    assert!(views.dashboard.metrics.average_growth_pct.is_some());
}
