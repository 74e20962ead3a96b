//! Control Panel Widget
//! Left side panel: data source, cleaning options, sidebar filters and tools.

use crate::config::DashboardConfig;
use crate::data::{CleanOptions, Dataset, FillMissing, FillStrategy, SampleParams, Selection};
use crate::data::schema::{REGION, TECHNOLOGY};
use crate::report::format_thousands;
use egui::{Color32, ComboBox, RichText};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMode {
    #[default]
    File,
    Sample,
    Manual,
}

/// User settings that drive a recompute.
#[derive(Debug, Clone)]
pub struct UserSettings {
    pub source: SourceMode,
    pub file_path: Option<PathBuf>,
    pub sample: SampleParams,

    pub remove_duplicates: bool,
    pub fill_enabled: bool,
    pub fill_strategy: FillStrategy,
    pub year_filter_enabled: bool,
    pub year_filter: (i64, i64),

    pub year_range: (i64, i64),
    pub region: Option<String>,
    pub technology: Option<String>,
}

impl UserSettings {
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            source: SourceMode::default(),
            file_path: None,
            sample: config.sample,
            remove_duplicates: config.cleaning.remove_duplicates,
            fill_enabled: false,
            fill_strategy: config.cleaning.fill_strategy,
            year_filter_enabled: false,
            year_filter: (0, 0),
            year_range: (0, 0),
            region: None,
            technology: None,
        }
    }

    pub fn clean_options(&self) -> CleanOptions {
        CleanOptions {
            remove_duplicates: self.remove_duplicates,
            fill_missing: self.fill_enabled.then(|| FillMissing {
                strategy: self.fill_strategy,
                columns: None,
            }),
            year_filter: self.year_filter_enabled.then_some(self.year_filter),
        }
    }
}

/// Facts about the loaded Dataset shown in the panel.
#[derive(Debug, Clone, Default)]
struct DataInfo {
    rows: usize,
    columns: Vec<(String, String)>,
    missing: Vec<(String, usize)>,
    year_bounds: Option<(i64, i64)>,
}

/// Left side control panel with data source, cleaning and filter controls.
pub struct ControlPanel {
    pub settings: UserSettings,
    info: Option<DataInfo>,
    /// Year bounds of the cleaned Dataset; `None` hides the year filter.
    filter_years: Option<(i64, i64)>,
    regions: Vec<String>,
    technologies: Vec<String>,
    cached_samples: usize,
    pub status: String,
}

impl ControlPanel {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            settings: UserSettings::from_config(config),
            info: None,
            filter_years: None,
            regions: Vec::new(),
            technologies: Vec::new(),
            cached_samples: 0,
            status: "Ready".to_string(),
        }
    }

    /// Refresh source facts after a successful load and reset the filters.
    pub fn on_dataset_loaded(&mut self, dataset: &Dataset) {
        let year_bounds = dataset.year_bounds();
        self.info = Some(DataInfo {
            rows: dataset.height(),
            columns: dataset.dtypes(),
            missing: dataset.missing_counts(),
            year_bounds,
        });

        let bounds = year_bounds.unwrap_or((0, 0));
        self.settings.year_filter = bounds;
        self.settings.year_range = bounds;
        self.filter_years = None;
        self.settings.region = None;
        self.settings.technology = None;
    }

    /// Refresh filter choices from the cleaned Dataset.
    pub fn update_filter_choices(&mut self, cleaned: &Dataset) {
        let previous = self.filter_years;
        self.filter_years = cleaned.year_bounds();
        if let Some((min, max)) = self.filter_years {
            // An untouched range follows the bounds; a narrowed one is clamped.
            let untouched = previous.map_or(true, |p| p == self.settings.year_range);
            self.settings.year_range = if untouched {
                (min, max)
            } else {
                let (lo, hi) = self.settings.year_range;
                (lo.clamp(min, max), hi.clamp(min, max))
            };
        }
        self.regions = cleaned.unique_values(REGION);
        self.technologies = cleaned.unique_values(TECHNOLOGY);

        if let Some(region) = &self.settings.region {
            if !self.regions.contains(region) {
                self.settings.region = None;
            }
        }
        if let Some(technology) = &self.settings.technology {
            if !self.technologies.contains(technology) {
                self.settings.technology = None;
            }
        }
    }

    pub fn selection(&self) -> Selection {
        Selection {
            year_range: self.filter_years.map(|_| self.settings.year_range),
            region: self.settings.region.clone(),
            technology: self.settings.technology.clone(),
        }
    }

    pub fn set_cached_samples(&mut self, count: usize) {
        self.cached_samples = count;
    }

    pub fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("⚡ Renewable Energy Dashboard")
                    .size(20.0)
                    .color(Color32::from_rgb(46, 134, 171)),
            );
            ui.label(
                RichText::new("Capacity & Generation Analysis")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();

        self.show_source(ui, &mut action);
        self.show_quick_stats(ui);

        if self.info.is_some() {
            ui.separator();
            self.show_cleaning(ui, &mut action);
            ui.separator();
            self.show_filters(ui, &mut action);
            ui.separator();
            self.show_data_info(ui);
        }

        ui.separator();
        ui.label(RichText::new("🛠 Tools").size(14.0).strong());
        ui.horizontal(|ui| {
            if ui.button("Clear Cache").clicked() {
                action = ControlPanelAction::ClearCache;
            }
            ui.label(
                RichText::new(format!("{} cached sample(s)", self.cached_samples))
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });

        ui.add_space(10.0);
        let status_color = if self.status.contains("Error") {
            Color32::from_rgb(220, 53, 69)
        } else if self.status.contains("Loaded") || self.status.contains("Exported") {
            Color32::from_rgb(40, 167, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }

    fn show_source(&mut self, ui: &mut egui::Ui, action: &mut ControlPanelAction) {
        ui.label(RichText::new("📁 Data Source").size(14.0).strong());
        ui.add_space(5.0);

        ui.horizontal(|ui| {
            ui.radio_value(&mut self.settings.source, SourceMode::File, "Upload file");
            ui.radio_value(&mut self.settings.source, SourceMode::Sample, "Sample data");
            ui.radio_value(&mut self.settings.source, SourceMode::Manual, "Manual entry");
        });
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| match self.settings.source {
                SourceMode::File => {
                    ui.horizontal(|ui| {
                        let path_text = self
                            .settings
                            .file_path
                            .as_ref()
                            .and_then(|p| p.file_name())
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_else(|| "No file selected".to_string());
                        ui.label(RichText::new(path_text).size(12.0));

                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("📂 Browse").clicked() {
                                *action = ControlPanelAction::BrowseFile;
                            }
                        });
                    });
                    ui.label(
                        RichText::new("CSV or Excel (.xlsx, .xls); the first worksheet is read.")
                            .size(10.0)
                            .color(Color32::GRAY),
                    );
                }
                SourceMode::Sample => {
                    ui.horizontal(|ui| {
                        ui.label("Seed:");
                        ui.add(egui::DragValue::new(&mut self.settings.sample.seed));
                    });
                    if ui.button("Generate Sample Data").clicked() {
                        *action = ControlPanelAction::LoadSample;
                    }
                }
                SourceMode::Manual => {
                    ui.label(
                        RichText::new("Edit rows in the table, then apply them.")
                            .size(11.0)
                            .color(Color32::GRAY),
                    );
                }
            });
        ui.add_space(5.0);
    }

    fn show_quick_stats(&self, ui: &mut egui::Ui) {
        let Some(info) = &self.info else {
            return;
        };
        let range = info
            .year_bounds
            .map(|(min, max)| format!("{}-{}", min, max))
            .unwrap_or_else(|| "N/A-N/A".to_string());

        egui::Grid::new("quick_stats").num_columns(2).show(ui, |ui| {
            ui.label("Rows Loaded");
            ui.label(RichText::new(format_thousands(info.rows)).strong());
            ui.end_row();
            ui.label("Columns");
            ui.label(RichText::new(info.columns.len().to_string()).strong());
            ui.end_row();
            ui.label("Data Range");
            ui.label(RichText::new(range).strong());
            ui.end_row();
        });
    }

    fn show_cleaning(&mut self, ui: &mut egui::Ui, action: &mut ControlPanelAction) {
        let mut changed = false;
        ui.label(RichText::new("🧹 Data Cleaning").size(14.0).strong());

        changed |= ui
            .checkbox(&mut self.settings.remove_duplicates, "Remove duplicate rows")
            .changed();

        ui.horizontal(|ui| {
            changed |= ui
                .checkbox(&mut self.settings.fill_enabled, "Fill missing values")
                .changed();
            ui.add_enabled_ui(self.settings.fill_enabled, |ui| {
                ComboBox::from_id_salt("fill_strategy")
                    .selected_text(self.settings.fill_strategy.label())
                    .show_ui(ui, |ui| {
                        for strategy in FillStrategy::ALL {
                            changed |= ui
                                .selectable_value(
                                    &mut self.settings.fill_strategy,
                                    strategy,
                                    strategy.label(),
                                )
                                .changed();
                        }
                    });
            });
        });

        let bounds = self.info.as_ref().and_then(|i| i.year_bounds);
        match bounds {
            Some((min, max)) => {
                changed |= ui
                    .checkbox(&mut self.settings.year_filter_enabled, "Filter by year range")
                    .changed();
                if self.settings.year_filter_enabled {
                    changed |= year_range_sliders(ui, &mut self.settings.year_filter, min, max);
                }
            }
            None => {
                ui.label(
                    RichText::new("No Year column: year filter unavailable")
                        .size(11.0)
                        .color(Color32::GRAY),
                );
            }
        }

        if changed {
            *action = ControlPanelAction::OptionsChanged;
        }
    }

    fn show_filters(&mut self, ui: &mut egui::Ui, action: &mut ControlPanelAction) {
        let mut changed = false;
        ui.label(RichText::new("🔍 Filters").size(14.0).strong());

        if let Some((min, max)) = self.filter_years {
            ui.label("Year Range");
            changed |= year_range_sliders(ui, &mut self.settings.year_range, min, max);
        }

        changed |= choice_combo(ui, "Region", "region_filter", &self.regions, &mut self.settings.region);
        changed |= choice_combo(
            ui,
            "Technology",
            "technology_filter",
            &self.technologies,
            &mut self.settings.technology,
        );

        if changed {
            *action = ControlPanelAction::OptionsChanged;
        }
    }

    fn show_data_info(&self, ui: &mut egui::Ui) {
        let Some(info) = &self.info else {
            return;
        };
        egui::CollapsingHeader::new("ℹ Data Information").show(ui, |ui| {
            egui::Grid::new("data_info").striped(true).num_columns(3).show(ui, |ui| {
                ui.label(RichText::new("Column").strong());
                ui.label(RichText::new("Type").strong());
                ui.label(RichText::new("Missing").strong());
                ui.end_row();
                for ((name, dtype), (_, missing)) in info.columns.iter().zip(&info.missing) {
                    ui.label(name);
                    ui.label(dtype);
                    ui.label(missing.to_string());
                    ui.end_row();
                }
            });
        });
    }
}

fn year_range_sliders(ui: &mut egui::Ui, range: &mut (i64, i64), min: i64, max: i64) -> bool {
    let mut changed = false;
    changed |= ui
        .add(egui::Slider::new(&mut range.0, min..=max).text("from"))
        .changed();
    changed |= ui
        .add(egui::Slider::new(&mut range.1, min..=max).text("to"))
        .changed();
    if range.0 > range.1 {
        std::mem::swap(&mut range.0, &mut range.1);
    }
    changed
}

/// "All" plus one entry per choice. Hidden when there are no choices.
fn choice_combo(
    ui: &mut egui::Ui,
    label: &str,
    id: &str,
    choices: &[String],
    selected: &mut Option<String>,
) -> bool {
    if choices.is_empty() {
        return false;
    }
    let mut changed = false;
    ui.horizontal(|ui| {
        ui.add_sized([80.0, 20.0], egui::Label::new(label));
        ComboBox::from_id_salt(id)
            .width(160.0)
            .selected_text(selected.as_deref().unwrap_or("All"))
            .show_ui(ui, |ui| {
                changed |= ui.selectable_value(selected, None, "All").changed();
                for choice in choices {
                    changed |= ui
                        .selectable_value(selected, Some(choice.clone()), choice)
                        .changed();
                }
            });
    });
    changed
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    BrowseFile,
    LoadSample,
    OptionsChanged,
    ClearCache,
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_clean_options_follow_toggles() {
        let mut settings = UserSettings::from_config(&DashboardConfig::default());
        let options = settings.clean_options();
        assert!(options.fill_missing.is_none());
        assert!(options.year_filter.is_none());

        settings.fill_enabled = true;
        settings.fill_strategy = FillStrategy::Median;
        settings.year_filter_enabled = true;
        settings.year_filter = (2012, 2015);
        let options = settings.clean_options();
        assert_eq!(options.fill_missing.unwrap().strategy, FillStrategy::Median);
        assert_eq!(options.year_filter, Some((2012, 2015)));
    }

    #[test]
    fn test_stale_filter_choice_is_reset() {
        let raw = df!(
            "Region Indicator" => ["Africa", "Asia"],
            "Year" => [2020i64, 2022]
        )
        .unwrap();
        let dataset = Dataset::normalize(&raw).unwrap();

        let mut panel = ControlPanel::new(&DashboardConfig::default());
        panel.on_dataset_loaded(&dataset);
        panel.settings.region = Some("Europe".to_string());
        panel.update_filter_choices(&dataset);

        let selection = panel.selection();
        assert_eq!(selection.region, None);
        assert_eq!(selection.year_range, Some((2020, 2022)));
    }

    #[test]
    fn test_year_range_follows_bounds_until_narrowed() {
        let raw = df!(
            "Region Indicator" => ["Africa", "Africa", "Africa"],
            "Year" => [2010i64, 2015, 2023]
        )
        .unwrap();
        let full = Dataset::normalize(&raw).unwrap();
        let trimmed = Dataset::normalize(&raw.slice(1, 2)).unwrap();

        let mut panel = ControlPanel::new(&DashboardConfig::default());
        panel.on_dataset_loaded(&full);
        panel.update_filter_choices(&full);
        assert_eq!(panel.settings.year_range, (2010, 2023));

        // Cleaning filter on, then off again: the range widens back.
        panel.update_filter_choices(&trimmed);
        assert_eq!(panel.settings.year_range, (2015, 2023));
        panel.update_filter_choices(&full);
        assert_eq!(panel.settings.year_range, (2010, 2023));

        // A range the user narrowed stays put.
        panel.settings.year_range = (2012, 2020);
        panel.update_filter_choices(&trimmed);
        assert_eq!(panel.settings.year_range, (2015, 2020));
        panel.update_filter_choices(&full);
        assert_eq!(panel.settings.year_range, (2015, 2020));
    }
}
