//! Charts module - chart descriptions, egui plots and PNG rendering

mod plotter;
mod renderer;

pub use plotter::{ChartBody, ChartData, ChartPlotter, NamedSeries, Spread, PALETTE};
pub use renderer::{RenderError, StaticChartRenderer};
