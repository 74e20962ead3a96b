//! Synthetic renewable-energy sample data.
//!
//! Generation is deterministic for a given `SampleParams`. Results are
//! memoized in an explicit `SampleCache` that the UI can clear on demand.

use crate::data::dataset::Dataset;
use crate::data::schema::{
    SchemaError, CAPACITY, COUNTRY, GENERATION, GROWTH_RATE, REGION, TECHNOLOGY, YEAR,
};
use polars::prelude::*;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

pub const SAMPLE_REGIONS: [&str; 5] = ["Africa", "Americas", "Asia", "Europe", "Oceania"];

pub const SAMPLE_TECHNOLOGIES: [&str; 6] = [
    "Solar photovoltaic",
    "Onshore wind energy",
    "Renewable hydropower",
    "Solid biofuels",
    "Offshore wind energy",
    "Geothermal energy",
];

/// Parameters that fully determine a generated sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleParams {
    pub seed: u64,
    pub first_year: i64,
    pub last_year: i64,
}

impl Default for SampleParams {
    fn default() -> Self {
        Self {
            seed: 42,
            first_year: 2010,
            last_year: 2023,
        }
    }
}

/// Generate sample data: 10-29 rows per (year, region, technology).
pub fn generate_sample_data(params: &SampleParams) -> Result<Dataset, SchemaError> {
    let mut rng = StdRng::seed_from_u64(params.seed);

    let mut regions: Vec<&str> = Vec::new();
    let mut countries: Vec<String> = Vec::new();
    let mut technologies: Vec<&str> = Vec::new();
    let mut years: Vec<i64> = Vec::new();
    let mut capacities: Vec<f64> = Vec::new();
    let mut generations: Vec<f64> = Vec::new();
    let mut growth_rates: Vec<f64> = Vec::new();

    for year in params.first_year..=params.last_year {
        for region in SAMPLE_REGIONS {
            for technology in SAMPLE_TECHNOLOGIES {
                for _ in 0..rng.gen_range(10..30) {
                    let capacity = rng.gen_range(10.0..5000.0);
                    regions.push(region);
                    countries.push(format!("Country_{}", rng.gen_range(1..50)));
                    technologies.push(technology);
                    years.push(year);
                    capacities.push(capacity);
                    growth_rates.push(rng.gen_range(-10.0..30.0));
                    generations.push(capacity * rng.gen_range(1000.0..2000.0));
                }
            }
        }
    }

    let df = DataFrame::new(vec![
        Column::new(REGION.into(), regions),
        Column::new(COUNTRY.into(), countries),
        Column::new(TECHNOLOGY.into(), technologies),
        Column::new(YEAR.into(), years),
        Column::new(CAPACITY.into(), capacities),
        Column::new(GENERATION.into(), generations),
        Column::new(GROWTH_RATE.into(), growth_rates),
    ])?;

    log::debug!(
        "Generated {} sample rows with seed {}",
        df.height(),
        params.seed
    );
    Dataset::normalize(&df)
}

/// Memo table for generated samples, keyed by generation parameters.
#[derive(Default)]
pub struct SampleCache {
    entries: HashMap<SampleParams, Dataset>,
}

impl SampleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached sample for `params`, generating it on first use.
    pub fn get_or_generate(&mut self, params: &SampleParams) -> Result<&Dataset, SchemaError> {
        match self.entries.entry(*params) {
            Entry::Occupied(entry) => {
                log::debug!("Sample cache hit for seed {}", params.seed);
                Ok(&*entry.into_mut())
            }
            Entry::Vacant(entry) => {
                let dataset = generate_sample_data(params)?;
                Ok(&*entry.insert(dataset))
            }
        }
    }

    pub fn contains(&self, params: &SampleParams) -> bool {
        self.entries.contains_key(params)
    }

    pub fn invalidate(&mut self, params: &SampleParams) -> bool {
        self.entries.remove(params).is_some()
    }

    /// Drop every cached sample. Returns how many entries were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        log::info!("Sample cache cleared ({} entries)", removed);
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
