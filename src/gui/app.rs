//! Renewable Energy Dashboard Main Application
//! Main window with control panel, data preview and chart viewer.
//!
//! Every option change triggers one synchronous recompute of all derived views.

use crate::charts::{ChartData, StaticChartRenderer};
use crate::config::DashboardConfig;
use crate::data::{
    CleanOptions, DataLoader, DataSource, Dataset, DerivedViews, Pipeline, PipelineError,
    SampleCache,
};
use crate::gui::chart_viewer::{ChartViewer, ViewerAction};
use crate::gui::control_panel::{ControlPanel, ControlPanelAction, SourceMode};
use crate::gui::data_editor::{show_preview, DataEditor};
use crate::report::{
    ReportGenerator, CLEANED_CSV_FILE, GROWTH_CSV_FILE, HTML_REPORT_FILE, SUMMARY_JSON_FILE,
    TEXT_REPORT_FILE,
};
use anyhow::{Context, Result};
use egui::{RichText, SidePanel};
use std::path::PathBuf;

/// Main application window.
pub struct DashboardApp {
    config: DashboardConfig,
    loader: DataLoader,
    samples: SampleCache,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,
    editor: DataEditor,
    views: Option<DerivedViews>,
}

impl DashboardApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: DashboardConfig) -> Self {
        Self {
            control_panel: ControlPanel::new(&config),
            config,
            loader: DataLoader::new(),
            samples: SampleCache::new(),
            chart_viewer: ChartViewer::new(),
            editor: DataEditor::new(),
            views: None,
        }
    }

    fn handle_browse_file(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Data Files", &["csv", "xlsx", "xls"])
            .add_filter("CSV Files", &["csv"])
            .add_filter("Excel Files", &["xlsx", "xls"])
            .add_filter("All Files", &["*"])
            .pick_file()
        else {
            return;
        };

        self.control_panel.settings.file_path = Some(path.clone());
        let result = self.loader.load_path(&path).map(|_| ());
        self.after_load(result.map_err(anyhow::Error::from));
    }

    fn handle_load_sample(&mut self) {
        let params = self.control_panel.settings.sample;
        let result = self
            .samples
            .get_or_generate(&params)
            .cloned()
            .map(|dataset| {
                self.loader.set_dataset(dataset, DataSource::Sample);
            })
            .context("Failed to generate sample data");
        self.control_panel.set_cached_samples(self.samples.len());
        self.after_load(result);
    }

    fn handle_manual_apply(&mut self) {
        let result = self
            .loader
            .load_manual(&self.editor.rows)
            .map(|_| ())
            .context("Invalid manual data");
        self.after_load(result);
    }

    fn handle_clear_cache(&mut self) {
        let removed = self.samples.clear();
        self.control_panel.set_cached_samples(0);
        self.control_panel
            .set_status(&format!("Cache cleared ({} sample(s))", removed));
    }

    /// Reset the panels for a freshly loaded Dataset and recompute. A failed
    /// load keeps the previous Dataset and views.
    fn after_load(&mut self, result: Result<()>) {
        if let Err(e) = result {
            log::error!("Load failed: {:#}", e);
            self.control_panel.set_status(&format!("Error: {:#}", e));
            return;
        }
        let Some(dataset) = self.loader.dataset() else {
            return;
        };

        self.control_panel.on_dataset_loaded(dataset);
        let source = self
            .loader
            .source()
            .map(|s| s.to_string())
            .unwrap_or_default();
        self.control_panel.set_status(&format!(
            "Loaded {} rows from {}",
            self.loader.get_row_count(),
            source
        ));
        self.recompute();
    }

    fn recompute(&mut self) {
        let Some(raw) = self.loader.dataset() else {
            return;
        };

        let options = self.control_panel.settings.clean_options();
        match derive_views(raw, &options, &mut self.control_panel) {
            Ok(views) => {
                let json = ReportGenerator::summary_json(&views.summary).ok();
                self.chart_viewer.set_views(&views, json);
                self.views = Some(views);
            }
            Err(e) => {
                log::error!("Recompute failed: {}", e);
                self.chart_viewer.clear();
                self.views = None;
                self.control_panel.set_status(&format!("Error: {}", e));
            }
        }
    }

    fn handle_viewer_action(&mut self, action: ViewerAction) {
        let result = match action {
            ViewerAction::None => return,
            ViewerAction::ExportCleanedCsv => {
                self.export_file(CLEANED_CSV_FILE, "CSV", "csv", |app| {
                    let views = app.require_views()?;
                    Ok(ReportGenerator::cleaned_csv(&views.cleaned)?.into_bytes())
                })
            }
            ViewerAction::ExportGrowthCsv => {
                self.export_file(GROWTH_CSV_FILE, "CSV", "csv", |app| {
                    let views = app.require_views()?;
                    Ok(ReportGenerator::growth_csv(&views.cleaned, &views.growth)?.into_bytes())
                })
            }
            ViewerAction::ExportTextReport => {
                self.export_file(TEXT_REPORT_FILE, "Text", "txt", |app| {
                    let views = app.require_views()?;
                    let original = app.loader.dataset().context("No data loaded")?;
                    Ok(ReportGenerator::text_report(original, views).into_bytes())
                })
            }
            ViewerAction::ExportHtmlReport => {
                self.export_file(HTML_REPORT_FILE, "HTML", "html", |app| {
                    let views = app.require_views()?;
                    Ok(ReportGenerator::html_report(&views.summary).into_bytes())
                })
                .map(|path| {
                    if let Some(path) = &path {
                        if let Err(e) = open::that(path) {
                            log::warn!("Could not open {}: {}", path.display(), e);
                        }
                    }
                    path
                })
            }
            ViewerAction::ExportSummaryJson => {
                self.export_file(SUMMARY_JSON_FILE, "JSON", "json", |app| {
                    let views = app.require_views()?;
                    Ok(ReportGenerator::summary_json(&views.summary)?.into_bytes())
                })
            }
            ViewerAction::ExportChartImages => self.export_chart_images(),
        };

        match result {
            Ok(Some(path)) => self
                .control_panel
                .set_status(&format!("Exported {}", path.display())),
            Ok(None) => {}
            Err(e) => {
                log::error!("Export failed: {:#}", e);
                self.control_panel.set_status(&format!("Error: {:#}", e));
            }
        }
    }

    fn require_views(&self) -> Result<&DerivedViews> {
        self.views.as_ref().context("No data loaded")
    }

    /// Build a payload and save it where the user chooses. `Ok(None)` if cancelled.
    fn export_file(
        &self,
        default_name: &str,
        filter_name: &str,
        extension: &str,
        build: impl FnOnce(&Self) -> Result<Vec<u8>>,
    ) -> Result<Option<PathBuf>> {
        let contents = build(self)?;
        let Some(path) = rfd::FileDialog::new()
            .add_filter(filter_name, &[extension])
            .set_file_name(default_name)
            .save_file()
        else {
            return Ok(None);
        };
        ReportGenerator::save(&path, &contents)
            .with_context(|| format!("Failed to export {}", default_name))?;
        Ok(Some(path))
    }

    fn export_chart_images(&self) -> Result<Option<PathBuf>> {
        let views = self.require_views()?;
        let Some(dir) = rfd::FileDialog::new().pick_folder() else {
            return Ok(None);
        };

        let charts = ChartData::dashboard(views);
        let paths = StaticChartRenderer::export_charts_as_png(
            &charts,
            &dir,
            self.config.export.chart_width,
            self.config.export.chart_height,
        )
        .context("Failed to render charts")?;
        log::info!("Saved {} chart image(s) to {}", paths.len(), dir.display());

        if let Err(e) = open::that(&dir) {
            log::warn!("Could not open {}: {}", dir.display(), e);
        }
        Ok(Some(dir))
    }
}

/// Run the pipeline with the panel's selection and refresh the panel's filter
/// choices from the cleaned data. The pipeline runs a second time only when
/// that refresh changed the selection.
fn derive_views(
    raw: &Dataset,
    options: &CleanOptions,
    panel: &mut ControlPanel,
) -> Result<DerivedViews, PipelineError> {
    let selection = panel.selection();
    let views = Pipeline::run(raw, options, &selection)?;
    panel.update_filter_choices(&views.cleaned);

    let refreshed = panel.selection();
    if refreshed == selection {
        return Ok(views);
    }
    log::debug!("Selection changed to {:?}, recomputing", refreshed);
    Pipeline::run(raw, options, &refreshed)
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        SidePanel::left("control_panel")
            .min_width(320.0)
            .max_width(380.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    match self.control_panel.show(ui) {
                        ControlPanelAction::BrowseFile => self.handle_browse_file(),
                        ControlPanelAction::LoadSample => self.handle_load_sample(),
                        ControlPanelAction::OptionsChanged => self.recompute(),
                        ControlPanelAction::ClearCache => self.handle_clear_cache(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.control_panel.settings.source == SourceMode::Manual {
                if self.editor.show(ui) {
                    self.handle_manual_apply();
                }
                ui.separator();
            }

            let Some(dataset) = self.loader.dataset() else {
                ui.centered_and_justified(|ui| {
                    ui.label(
                        RichText::new("Load a CSV or Excel file, generate sample data or enter rows to begin")
                            .size(18.0),
                    );
                });
                return;
            };

            show_preview(ui, dataset, self.config.preview_rows);
            ui.separator();

            let action = self.chart_viewer.show(ui);
            self.handle_viewer_action(action);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn raw() -> Dataset {
        let raw = df!(
            "Region Indicator" => ["Africa", "Africa", "Asia"],
            "Technology" => ["Solar", "Solar", "Wind"],
            "Year" => [2010i64, 2015, 2020],
            "Electricity Installed Capacity (MW)" => [10.0, 20.0, 30.0]
        )
        .unwrap();
        Dataset::normalize(&raw).unwrap()
    }

    #[test]
    fn test_derive_views_with_stable_selection() {
        let raw = raw();
        let mut panel = ControlPanel::new(&DashboardConfig::default());
        panel.on_dataset_loaded(&raw);

        let views = derive_views(&raw, &CleanOptions::default(), &mut panel).unwrap();
        assert_eq!(views.filtered.height(), 3);
        assert_eq!(panel.selection().year_range, Some((2010, 2020)));
    }

    #[test]
    fn test_derive_views_applies_refreshed_selection() {
        let raw = raw();
        let mut panel = ControlPanel::new(&DashboardConfig::default());
        panel.on_dataset_loaded(&raw);
        derive_views(&raw, &CleanOptions::default(), &mut panel).unwrap();

        // A region that no longer exists after cleaning is dropped before
        // the dashboard is built.
        panel.settings.region = Some("Asia".to_string());
        let options = CleanOptions {
            year_filter: Some((2010, 2015)),
            ..Default::default()
        };
        let views = derive_views(&raw, &options, &mut panel).unwrap();
        assert_eq!(panel.selection().region, None);
        assert_eq!(views.filtered.height(), 2);
    }
}
