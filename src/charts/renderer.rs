//! Static Chart Renderer
//! Renders `ChartData` to PNG bytes with plotters' bitmap backend.
//!
//! Layout per image: caption on top, mesh with axis descriptions, then the
//! series. Multi-series line charts get a legend in the upper-left corner.

use crate::charts::plotter::{ChartBody, ChartData, NamedSeries};
use image::{ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Chart '{0}' has no data to render")]
    Empty(String),

    #[error("Invalid image size {width}x{height}")]
    Size { width: u32, height: u32 },

    #[error("Drawing failed: {0}")]
    Draw(String),

    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for RenderError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        RenderError::Draw(err.to_string())
    }
}

// Same hues as the interactive palette
const PALETTE: [RGBColor; 10] = [
    RGBColor(46, 134, 171),
    RGBColor(231, 76, 60),
    RGBColor(46, 204, 113),
    RGBColor(155, 89, 182),
    RGBColor(243, 156, 18),
    RGBColor(26, 188, 156),
    RGBColor(233, 30, 99),
    RGBColor(0, 188, 212),
    RGBColor(121, 85, 72),
    RGBColor(96, 125, 139),
];

const FONT: &str = "sans-serif";

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    fn color(index: usize) -> RGBColor {
        PALETTE[index % PALETTE.len()]
    }

    /// Render one chart to PNG bytes.
    pub fn render_png(chart: &ChartData, width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::Size { width, height });
        }
        if chart.is_empty() {
            return Err(RenderError::Empty(chart.title.clone()));
        }

        let mut buffer = vec![255u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE)?;
            match &chart.body {
                ChartBody::Lines(series) => Self::draw_lines(&root, chart, series)?,
                ChartBody::Bars(bars) => Self::draw_bars(&root, chart, bars)?,
                ChartBody::Distribution(groups) => Self::draw_boxplots(&root, chart, groups)?,
            }
            root.present()?;
        }

        Self::encode_png(width, height, buffer)
    }

    /// Write every non-empty chart as `<file_stem>.png` into `dir`.
    pub fn export_charts_as_png(
        charts: &[ChartData],
        dir: &Path,
        width: u32,
        height: u32,
    ) -> Result<Vec<PathBuf>, RenderError> {
        std::fs::create_dir_all(dir)?;

        let mut paths = Vec::new();
        for chart in charts.iter().filter(|c| !c.is_empty()) {
            let bytes = Self::render_png(chart, width, height)?;
            let path = dir.join(format!("{}.png", chart.file_stem()));
            std::fs::write(&path, bytes)?;
            log::debug!("Wrote chart image {}", path.display());
            paths.push(path);
        }
        Ok(paths)
    }

    pub fn encode_png(width: u32, height: u32, rgb: Vec<u8>) -> Result<Vec<u8>, RenderError> {
        let img = RgbImage::from_raw(width, height, rgb).ok_or(RenderError::Size { width, height })?;
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    fn draw_lines(root: &Area, chart: &ChartData, series: &[NamedSeries]) -> Result<(), RenderError> {
        let (x_range, y_range) = line_bounds(series);

        let mut ctx = ChartBuilder::on(root)
            .caption(&chart.title, (FONT, 24))
            .margin(20)
            .set_label_area_size(LabelAreaPosition::Left, 80)
            .set_label_area_size(LabelAreaPosition::Bottom, 45)
            .build_cartesian_2d(x_range, y_range)?;

        ctx.configure_mesh()
            .x_desc(&chart.x_label)
            .y_desc(&chart.y_label)
            .x_label_formatter(&|v| format!("{:.0}", v))
            .y_label_formatter(&|v| format!("{:.0}", v))
            .draw()?;

        for (i, s) in series.iter().enumerate() {
            let color = Self::color(i);
            ctx.draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(2)))?
                .label(s.name.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
            ctx.draw_series(
                s.points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
            )?;
        }

        if series.len() > 1 {
            ctx.configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }
        Ok(())
    }

    fn draw_bars(root: &Area, chart: &ChartData, bars: &[(String, f64)]) -> Result<(), RenderError> {
        let n = bars.len() as u32;
        let y_max = bars.iter().map(|(_, v)| *v).fold(0.0, f64::max);
        let y_min = bars.iter().map(|(_, v)| *v).fold(0.0, f64::min);
        let labels: Vec<&str> = bars.iter().map(|(label, _)| label.as_str()).collect();

        let mut ctx = ChartBuilder::on(root)
            .caption(&chart.title, (FONT, 24))
            .margin(20)
            .set_label_area_size(LabelAreaPosition::Left, 80)
            .set_label_area_size(LabelAreaPosition::Bottom, 45)
            .build_cartesian_2d((0u32..n).into_segmented(), y_min..padded(y_max))?;

        ctx.configure_mesh()
            .disable_x_mesh()
            .x_labels(bars.len())
            .x_desc(&chart.x_label)
            .y_desc(&chart.y_label)
            .x_label_formatter(&|v| segment_label(v, &labels))
            .y_label_formatter(&|v| format!("{:.0}", v))
            .draw()?;

        ctx.draw_series(bars.iter().enumerate().map(|(i, (_, value))| {
            let x = i as u32;
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(x), 0.0), (SegmentValue::Exact(x + 1), *value)],
                Self::color(i).mix(0.85).filled(),
            );
            bar.set_margin(0, 0, 8, 8);
            bar
        }))?;
        Ok(())
    }

    fn draw_boxplots(
        root: &Area,
        chart: &ChartData,
        groups: &[(String, Vec<f64>)],
    ) -> Result<(), RenderError> {
        let n = groups.len() as u32;
        let all = groups.iter().flat_map(|(_, v)| v.iter().copied());
        let (lo, hi) = all.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        let pad = ((hi - lo) * 0.1).max(1.0);
        let labels: Vec<&str> = groups.iter().map(|(label, _)| label.as_str()).collect();

        let mut ctx = ChartBuilder::on(root)
            .caption(&chart.title, (FONT, 24))
            .margin(20)
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 45)
            .build_cartesian_2d(
                (0u32..n).into_segmented(),
                (lo - pad) as f32..(hi + pad) as f32,
            )?;

        ctx.configure_mesh()
            .disable_x_mesh()
            .x_labels(groups.len())
            .x_desc(&chart.x_label)
            .y_desc(&chart.y_label)
            .x_label_formatter(&|v| segment_label(v, &labels))
            .draw()?;

        ctx.draw_series(
            groups
                .iter()
                .enumerate()
                .filter(|(_, (_, values))| !values.is_empty())
                .map(|(i, (_, values))| {
                    let quartiles = Quartiles::new(values);
                    Boxplot::new_vertical(SegmentValue::CenterOf(i as u32), &quartiles)
                        .width(30)
                        .whisker_width(0.5)
                        .style(Self::color(i).stroke_width(2))
                }),
        )?;
        Ok(())
    }
}

fn segment_label(value: &SegmentValue<u32>, labels: &[&str]) -> String {
    match value {
        SegmentValue::CenterOf(i) => labels
            .get(*i as usize)
            .map(|s| s.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn padded(max: f64) -> f64 {
    if max > 0.0 {
        max * 1.1
    } else {
        1.0
    }
}

/// Axis ranges covering every point; degenerate ranges are widened.
fn line_bounds(series: &[NamedSeries]) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let points = series.iter().flat_map(|s| s.points.iter().copied());
    let (x_lo, x_hi, y_hi) = points.fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        |(x_lo, x_hi, y_hi), (x, y)| (x_lo.min(x), x_hi.max(x), y_hi.max(y)),
    );
    let y_lo = series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.1))
        .fold(0.0, f64::min);

    let (x_lo, x_hi) = if x_lo.is_finite() && x_hi > x_lo {
        (x_lo, x_hi)
    } else if x_lo.is_finite() {
        (x_lo - 1.0, x_hi + 1.0)
    } else {
        (0.0, 1.0)
    };
    let y_hi = if y_hi.is_finite() { padded(y_hi) } else { 1.0 };

    (x_lo..x_hi, y_lo..y_hi)
}
