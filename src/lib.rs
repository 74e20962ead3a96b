//! Renewable Energy Dashboard
//!
//! Loads renewable capacity and generation data, cleans it, derives growth
//! rates and aggregate views, and exports reports and charts.

pub mod charts;
pub mod config;
pub mod data;
pub mod gui;
pub mod report;
pub mod stats;
