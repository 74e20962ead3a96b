//! Chart Viewer Widget
//! Central panel: key metrics row and the Overview / Regional / Technology /
//! Export tabs.

use crate::charts::{ChartData, ChartPlotter};
use crate::data::{DerivedViews, ViewKind};
use crate::report::format_decimal;
use crate::stats::{GrowthStats, KeyMetrics};
use egui::{Color32, RichText, ScrollArea};
use std::collections::HashMap;

const CHART_HEIGHT: f32 = 320.0;
const CHART_SPACING: f32 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Overview,
    Regional,
    Technology,
    Export,
}

/// Actions triggered from the Export tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerAction {
    None,
    ExportCleanedCsv,
    ExportGrowthCsv,
    ExportTextReport,
    ExportHtmlReport,
    ExportSummaryJson,
    ExportChartImages,
}

#[derive(Default)]
pub struct ChartViewer {
    pub tab: Tab,
    charts: HashMap<ViewKind, ChartData>,
    growth_chart: Option<ChartData>,
    metrics: KeyMetrics,
    growth_stats: GrowthStats,
    has_growth: bool,
    summary_json: Option<String>,
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self {
            tab: self.tab,
            ..Self::default()
        };
    }

    /// Rebuild chart descriptions from a recompute.
    pub fn set_views(&mut self, views: &DerivedViews, summary_json: Option<String>) {
        self.charts = ViewKind::ALL
            .iter()
            .filter_map(|kind| {
                let rows = views.dashboard.view(*kind).ok()?;
                Some((*kind, ChartData::from_view(*kind, rows)))
            })
            .collect();
        self.growth_chart = ChartData::growth_distribution(&views.growth);
        self.metrics = views.dashboard.metrics.clone();
        self.growth_stats = views.growth_stats.clone();
        self.has_growth = !views.growth.is_empty();
        self.summary_json = summary_json;
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty() && self.growth_chart.is_none()
    }

    pub fn show(&mut self, ui: &mut egui::Ui) -> ViewerAction {
        let mut action = ViewerAction::None;

        self.show_metrics(ui);
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.tab, Tab::Overview, "📈 Overview");
            ui.selectable_value(&mut self.tab, Tab::Regional, "🌍 Regional Analysis");
            ui.selectable_value(&mut self.tab, Tab::Technology, "🔧 Technology Breakdown");
            ui.selectable_value(&mut self.tab, Tab::Export, "💾 Export");
        });
        ui.separator();

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| match self.tab {
                Tab::Overview => {
                    self.chart_or_no_data(ui, ViewKind::CapacityByYear);
                    ui.add_space(CHART_SPACING);
                    match &self.growth_chart {
                        Some(chart) => {
                            ChartPlotter::draw_chart(ui, chart, CHART_HEIGHT);
                            self.show_growth_table(ui);
                        }
                        None => no_data(ui, "Growth Rate Distribution"),
                    }
                    ui.add_space(CHART_SPACING);
                    self.chart_or_no_data(ui, ViewKind::GenerationByYear);
                }
                Tab::Regional => {
                    self.chart_or_no_data(ui, ViewKind::CapacityByRegion);
                    ui.add_space(CHART_SPACING);
                    self.chart_or_no_data(ui, ViewKind::CapacityByYearRegion);
                }
                Tab::Technology => {
                    self.chart_or_no_data(ui, ViewKind::CapacityByTechnology);
                    ui.add_space(CHART_SPACING);
                    self.chart_or_no_data(ui, ViewKind::CapacityByYearTechnology);
                }
                Tab::Export => action = self.show_export(ui),
            });

        action
    }

    fn chart_or_no_data(&self, ui: &mut egui::Ui, kind: ViewKind) {
        match self.charts.get(&kind) {
            Some(chart) => ChartPlotter::draw_chart(ui, chart, CHART_HEIGHT),
            None => no_data(ui, kind.title()),
        }
    }

    fn show_metrics(&self, ui: &mut egui::Ui) {
        let m = &self.metrics;
        let cards = [
            (
                "Total Capacity",
                m.total_capacity_gw
                    .map(|gw| format!("{} GW", format_decimal(gw, 1))),
            ),
            (
                "Total Generation",
                m.total_generation_twh
                    .map(|twh| format!("{} TWh", format_decimal(twh, 1))),
            ),
            ("Countries", m.country_count.map(|c| c.to_string())),
            ("Technologies", m.technology_count.map(|c| c.to_string())),
            (
                "Average Growth",
                m.average_growth_pct.map(|g| format!("{:.2}%", g)),
            ),
        ];

        ui.horizontal(|ui| {
            for (label, value) in cards {
                egui::Frame::none()
                    .rounding(8.0)
                    .stroke(egui::Stroke::new(1.0, Color32::from_rgb(46, 134, 171)))
                    .fill(ui.visuals().widgets.noninteractive.bg_fill)
                    .inner_margin(10.0)
                    .show(ui, |ui| {
                        ui.set_min_width(130.0);
                        ui.vertical(|ui| {
                            ui.label(RichText::new(label).size(11.0).color(Color32::GRAY));
                            ui.label(
                                RichText::new(value.unwrap_or_else(|| "N/A".to_string()))
                                    .size(18.0)
                                    .strong(),
                            );
                        });
                    });
            }
        });
    }

    fn show_growth_table(&self, ui: &mut egui::Ui) {
        let stats = &self.growth_stats;
        egui::CollapsingHeader::new("Growth statistics").show(ui, |ui| {
            egui::Grid::new("growth_stats").striped(true).show(ui, |ui| {
                for header in ["Category", "Count", "Mean", "Median", "Std", "P05", "P95"] {
                    ui.label(RichText::new(header).strong());
                }
                ui.end_row();

                let rows = stats
                    .by_category
                    .iter()
                    .map(|(name, s)| (name.as_str(), s))
                    .chain(std::iter::once(("All", &stats.overall)));
                for (name, s) in rows {
                    ui.label(name);
                    ui.label(s.count.to_string());
                    for v in [s.mean, s.median, s.std, s.p05, s.p95] {
                        ui.label(format!("{:.2}", v));
                    }
                    ui.end_row();
                }
            });
            if stats.undefined > 0 {
                ui.label(
                    RichText::new(format!(
                        "{} rate(s) undefined: previous capacity was zero",
                        stats.undefined
                    ))
                    .size(11.0)
                    .color(Color32::from_rgb(243, 156, 18)),
                );
            }
        });
    }

    fn show_export(&self, ui: &mut egui::Ui) -> ViewerAction {
        let mut action = ViewerAction::None;

        ui.columns(2, |columns| {
            columns[0].label(RichText::new("Export Data").size(14.0).strong());
            if columns[0].button("Export Cleaned Data as CSV").clicked() {
                action = ViewerAction::ExportCleanedCsv;
            }
            if columns[0]
                .add_enabled(self.has_growth, egui::Button::new("Export Growth Data as CSV"))
                .clicked()
            {
                action = ViewerAction::ExportGrowthCsv;
            }

            columns[1].label(RichText::new("Export Report").size(14.0).strong());
            if columns[1].button("Generate Analysis Report").clicked() {
                action = ViewerAction::ExportTextReport;
            }
            if columns[1].button("Save Dashboard as HTML").clicked() {
                action = ViewerAction::ExportHtmlReport;
            }
            if columns[1].button("Export Summary as JSON").clicked() {
                action = ViewerAction::ExportSummaryJson;
            }
        });

        ui.add_space(10.0);
        ui.label(RichText::new("Save Visualizations").size(14.0).strong());
        if ui
            .add_enabled(!self.is_empty(), egui::Button::new("Save Charts as PNG"))
            .clicked()
        {
            action = ViewerAction::ExportChartImages;
        }

        if let Some(json) = &self.summary_json {
            ui.add_space(10.0);
            egui::CollapsingHeader::new("Summary (JSON)").show(ui, |ui| {
                ui.label(RichText::new(json).monospace().size(11.0));
            });
        }

        action
    }
}

fn no_data(ui: &mut egui::Ui, title: &str) {
    ui.label(RichText::new(title).strong().size(15.0));
    ui.label(RichText::new("No data").italics().weak());
}
