//! Data module - schema normalization, loading, cleaning and the recompute pipeline

pub mod dataset;
pub mod loader;
pub mod pipeline;
pub mod processor;
pub mod sample;
pub mod schema;

pub use dataset::Dataset;
pub use loader::{DataLoader, DataSource, FileFormat, ManualRow};
pub use pipeline::{DashboardViews, DerivedViews, Operation, Pipeline, PipelineError, ViewKind};
pub use processor::{CleanOptions, CleanReport, DataProcessor, FillMissing, FillStrategy, Selection};
pub use sample::{generate_sample_data, SampleCache, SampleParams};
pub use schema::{normalize_schema, Capabilities, Field, SchemaError};
