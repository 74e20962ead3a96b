//! GUI module - User interface components

mod app;
mod chart_viewer;
mod control_panel;
mod data_editor;

pub use app::DashboardApp;
pub use chart_viewer::{ChartViewer, Tab, ViewerAction};
pub use control_panel::{ControlPanel, ControlPanelAction, SourceMode, UserSettings};
pub use data_editor::{show_preview, DataEditor};
