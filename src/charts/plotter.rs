//! Chart Plotter Module
//! Chart descriptions built from the derived views, drawn interactively with egui_plot.

use crate::data::pipeline::{DerivedViews, ViewKind};
use crate::stats::aggregate::{labelled, pivot_by_second_key, yearly, AggregateRow, GroupKey};
use crate::stats::growth::{rates_by_category, GrowthRecord};
use egui::{Color32, RichText};
use egui_plot::{Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Legend, Line, Plot, PlotPoints, Points};
use std::collections::HashMap;

pub const PALETTE: [Color32; 10] = [
    Color32::from_rgb(46, 134, 171),  // Blue
    Color32::from_rgb(231, 76, 60),   // Red
    Color32::from_rgb(46, 204, 113),  // Green
    Color32::from_rgb(155, 89, 182),  // Purple
    Color32::from_rgb(243, 156, 18),  // Orange
    Color32::from_rgb(26, 188, 156),  // Teal
    Color32::from_rgb(233, 30, 99),   // Pink
    Color32::from_rgb(0, 188, 212),   // Cyan
    Color32::from_rgb(121, 85, 72),   // Brown
    Color32::from_rgb(96, 125, 139),  // Blue Grey
];

/// A named line of `(x, y)` points.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSeries {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartBody {
    Lines(Vec<NamedSeries>),
    Bars(Vec<(String, f64)>),
    /// Raw values per category, drawn as box plots.
    Distribution(Vec<(String, Vec<f64>)>),
}

/// Render-agnostic chart description shared by the GUI and the PNG renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub body: ChartBody,
}

impl ChartData {
    /// Build the chart for one aggregation view.
    pub fn from_view(kind: ViewKind, rows: &[AggregateRow]) -> Self {
        let metric = kind.metric();
        let y_label = format!("{} ({})", metric.label(), metric.unit());
        let keys = kind.keys();

        let (x_label, body) = if keys.len() == 2 {
            let series = pivot_by_second_key(rows)
                .into_iter()
                .map(|(name, points)| NamedSeries {
                    name,
                    points: to_f64_points(&points),
                })
                .collect();
            ("Year".to_string(), ChartBody::Lines(series))
        } else if keys.first() == Some(&GroupKey::Year) {
            let series = NamedSeries {
                name: metric.label().to_string(),
                points: to_f64_points(&yearly(rows)),
            };
            ("Year".to_string(), ChartBody::Lines(vec![series]))
        } else {
            let x_label = keys
                .first()
                .map(|k| k.column_name().to_string())
                .unwrap_or_default();
            (x_label, ChartBody::Bars(labelled(rows)))
        };

        Self {
            title: kind.title().to_string(),
            x_label,
            y_label,
            body,
        }
    }

    /// Growth-rate distribution by technology, `None` when no rate is defined.
    pub fn growth_distribution(growth: &[GrowthRecord]) -> Option<Self> {
        let groups = rates_by_category(growth);
        if groups.is_empty() {
            return None;
        }
        let x_label = if growth.iter().any(|r| r.technology.is_some()) {
            "Technology"
        } else {
            "Region Indicator"
        };
        Some(Self {
            title: "Growth Rate Distribution".to_string(),
            x_label: x_label.to_string(),
            y_label: "Growth_Rate (%)".to_string(),
            body: ChartBody::Distribution(groups),
        })
    }

    /// Every chart the dashboard can show for these views, skipping empty ones.
    pub fn dashboard(views: &DerivedViews) -> Vec<Self> {
        let mut charts: Vec<Self> = ViewKind::ALL
            .iter()
            .filter_map(|kind| {
                let rows = views.dashboard.view(*kind).ok()?;
                Some(Self::from_view(*kind, rows))
            })
            .collect();
        charts.extend(Self::growth_distribution(&views.growth));
        charts
    }

    pub fn is_empty(&self) -> bool {
        match &self.body {
            ChartBody::Lines(series) => series.iter().all(|s| s.points.is_empty()),
            ChartBody::Bars(bars) => bars.is_empty(),
            ChartBody::Distribution(groups) => groups.iter().all(|(_, v)| v.is_empty()),
        }
    }

    /// File-system friendly name derived from the title.
    pub fn file_stem(&self) -> String {
        self.title
            .chars()
            .map(|c| {
                if c.is_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect()
    }
}

fn to_f64_points(points: &[(i64, f64)]) -> Vec<(f64, f64)> {
    points.iter().map(|(x, y)| (*x as f64, *y)).collect()
}

/// Box-plot spread (Tukey whiskers) of a sorted sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spread {
    pub whisker_low: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_high: f64,
}

/// Draws `ChartData` with egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    pub fn series_color(index: usize) -> Color32 {
        PALETTE[index % PALETTE.len()]
    }

    /// Calculate beeswarm positions for points with duplicate values.
    pub fn beeswarm_positions(y_values: &[f64], center: f64, width: f64) -> Vec<f64> {
        let n = y_values.len();
        if n == 0 {
            return Vec::new();
        }

        let mut positions = vec![center; n];

        let precision = 1e6;
        let mut value_indices: HashMap<i64, Vec<usize>> = HashMap::new();
        for (i, &y) in y_values.iter().enumerate() {
            let key = (y * precision).round() as i64;
            value_indices.entry(key).or_default().push(i);
        }

        // Spread duplicates symmetrically
        for indices in value_indices.values() {
            if indices.len() > 1 {
                let count = indices.len();
                let step = width / (count.max(2) - 1) as f64;
                let start = center - width / 2.0;
                for (i, &idx) in indices.iter().enumerate() {
                    positions[idx] = start + i as f64 * step;
                }
            }
        }

        positions
    }

    /// Quartiles and 1.5 IQR whiskers. `None` for an empty sample.
    pub fn spread(values: &[f64]) -> Option<Spread> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = sorted.len();
        let q1 = sorted[n / 4];
        let median = sorted[n / 2];
        let q3 = sorted[(3 * n / 4).min(n - 1)];
        let iqr = q3 - q1;
        let whisker_low = sorted
            .iter()
            .copied()
            .find(|&v| v >= q1 - 1.5 * iqr)
            .unwrap_or(q1);
        let whisker_high = sorted
            .iter()
            .rev()
            .copied()
            .find(|&v| v <= q3 + 1.5 * iqr)
            .unwrap_or(q3);

        Some(Spread {
            whisker_low,
            q1,
            median,
            q3,
            whisker_high,
        })
    }

    /// Draw a chart card: title plus the plot.
    pub fn draw_chart(ui: &mut egui::Ui, chart: &ChartData, height: f32) {
        ui.label(RichText::new(&chart.title).strong().size(15.0));
        if chart.is_empty() {
            ui.label(RichText::new("No data").italics().weak());
            return;
        }

        match &chart.body {
            ChartBody::Lines(series) => Self::draw_lines(ui, chart, series, height),
            ChartBody::Bars(bars) => Self::draw_bars(ui, chart, bars, height),
            ChartBody::Distribution(groups) => Self::draw_distribution(ui, chart, groups, height),
        }
    }

    fn draw_lines(ui: &mut egui::Ui, chart: &ChartData, series: &[NamedSeries], height: f32) {
        Plot::new(format!("lines_{}", chart.title))
            .height(height)
            .legend(Legend::default())
            .x_axis_label(chart.x_label.clone())
            .y_axis_label(chart.y_label.clone())
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                for (i, s) in series.iter().enumerate() {
                    let color = Self::series_color(i);
                    let points: PlotPoints = s.points.iter().map(|&(x, y)| [x, y]).collect();
                    plot_ui.line(Line::new(points).color(color).width(2.0).name(&s.name));

                    let markers: PlotPoints = s.points.iter().map(|&(x, y)| [x, y]).collect();
                    plot_ui.points(Points::new(markers).radius(3.0).color(color));
                }
            });
    }

    fn draw_bars(ui: &mut egui::Ui, chart: &ChartData, bars: &[(String, f64)], height: f32) {
        let labels: Vec<String> = bars.iter().map(|(label, _)| label.clone()).collect();

        Plot::new(format!("bars_{}", chart.title))
            .height(height)
            .x_axis_label(chart.x_label.clone())
            .y_axis_label(chart.y_label.clone())
            .allow_scroll(false)
            .x_axis_formatter(move |mark, _range| {
                let idx = mark.value.round();
                if (mark.value - idx).abs() > 1e-6 || idx < 0.0 {
                    return String::new();
                }
                labels.get(idx as usize).cloned().unwrap_or_default()
            })
            .show(ui, |plot_ui| {
                let elems: Vec<Bar> = bars
                    .iter()
                    .enumerate()
                    .map(|(i, (label, value))| {
                        Bar::new(i as f64, *value)
                            .width(0.6)
                            .name(label)
                            .fill(Self::series_color(i))
                    })
                    .collect();
                plot_ui.bar_chart(BarChart::new(elems).name(&chart.y_label));
            });
    }

    /// Box plot with scatter overlay, one box per category.
    fn draw_distribution(
        ui: &mut egui::Ui,
        chart: &ChartData,
        groups: &[(String, Vec<f64>)],
        height: f32,
    ) {
        let x_labels: Vec<String> = groups.iter().map(|(name, _)| name.clone()).collect();

        Plot::new(format!("boxplot_{}", chart.title))
            .height(height)
            .legend(Legend::default())
            .x_axis_label(chart.x_label.clone())
            .y_axis_label(chart.y_label.clone())
            .allow_scroll(false)
            .x_axis_formatter(move |mark, _range| {
                let idx = mark.value.round() as usize;
                if idx < x_labels.len() {
                    x_labels[idx].clone()
                } else {
                    String::new()
                }
            })
            .show(ui, |plot_ui| {
                for (i, (group, values)) in groups.iter().enumerate() {
                    let Some(spread) = Self::spread(values) else {
                        continue;
                    };
                    let color = Self::series_color(i);

                    let box_elem = BoxElem::new(
                        i as f64,
                        BoxSpread::new(
                            spread.whisker_low,
                            spread.q1,
                            spread.median,
                            spread.q3,
                            spread.whisker_high,
                        ),
                    )
                    .box_width(0.5)
                    .fill(color.gamma_multiply(0.3))
                    .stroke(egui::Stroke::new(1.5, color));
                    plot_ui.box_plot(BoxPlot::new(vec![box_elem]).name(group));

                    let x_positions = Self::beeswarm_positions(values, i as f64, 0.35);
                    let points: PlotPoints = x_positions
                        .iter()
                        .zip(values.iter())
                        .map(|(&x, &y)| [x, y])
                        .collect();
                    plot_ui.points(
                        Points::new(points)
                            .radius(2.0)
                            .color(color.gamma_multiply(0.7)),
                    );
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::aggregate::KeyValue;

    fn row(keys: Vec<KeyValue>, value: f64) -> AggregateRow {
        AggregateRow { keys, value }
    }

    #[test]
    fn test_year_view_is_single_line() {
        let rows = vec![
            row(vec![KeyValue::Year(2020)], 1.0),
            row(vec![KeyValue::Year(2021)], 2.0),
        ];
        let chart = ChartData::from_view(ViewKind::CapacityByYear, &rows);
        assert_eq!(chart.x_label, "Year");
        assert_eq!(chart.y_label, "Capacity_MW (MW)");
        match chart.body {
            ChartBody::Lines(series) => {
                assert_eq!(series.len(), 1);
                assert_eq!(series[0].points, vec![(2020.0, 1.0), (2021.0, 2.0)]);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_region_view_is_bars() {
        let rows = vec![row(vec![KeyValue::Label("Asia".into())], 5.0)];
        let chart = ChartData::from_view(ViewKind::CapacityByRegion, &rows);
        assert_eq!(chart.body, ChartBody::Bars(vec![("Asia".to_string(), 5.0)]));
        assert_eq!(chart.file_stem(), "capacity_distribution_by_region");
    }

    #[test]
    fn test_two_key_view_is_multi_line() {
        let rows = vec![
            row(vec![KeyValue::Year(2020), KeyValue::Label("Solar".into())], 1.0),
            row(vec![KeyValue::Year(2020), KeyValue::Label("Wind".into())], 2.0),
            row(vec![KeyValue::Year(2021), KeyValue::Label("Solar".into())], 3.0),
        ];
        let chart = ChartData::from_view(ViewKind::CapacityByYearTechnology, &rows);
        match chart.body {
            ChartBody::Lines(series) => {
                assert_eq!(series.len(), 2);
                assert_eq!(series[0].name, "Solar");
                assert_eq!(series[0].points.len(), 2);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_spread() {
        let spread = ChartPlotter::spread(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(spread.median, 3.0);
        assert_eq!(spread.q1, 2.0);
        assert_eq!(spread.q3, 4.0);
        // 100 lies beyond q3 + 1.5 IQR
        assert_eq!(spread.whisker_high, 4.0);
        assert!(ChartPlotter::spread(&[]).is_none());
    }

    #[test]
    fn test_beeswarm_spreads_duplicates() {
        let xs = ChartPlotter::beeswarm_positions(&[1.0, 1.0, 2.0], 0.0, 0.4);
        assert!((xs[0] + 0.2).abs() < 1e-12);
        assert!((xs[1] - 0.2).abs() < 1e-12);
        assert_eq!(xs[2], 0.0);
    }
}
