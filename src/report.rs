//! Report Export Module
//! CSV, plain-text, HTML and JSON renderings of the derived views.
//!
//! Every export is produced as an in-memory string or byte buffer first; the
//! GUI decides where (and whether) to write it.

use crate::data::dataset::Dataset;
use crate::data::pipeline::DerivedViews;
use crate::stats::calculator::Summary;
use crate::stats::growth::{growth_frame, GrowthRecord};
use chrono::{DateTime, Local};
use polars::prelude::*;
use std::path::Path;
use thiserror::Error;

pub const CLEANED_CSV_FILE: &str = "cleaned_renewable_energy_data.csv";
pub const GROWTH_CSV_FILE: &str = "growth_rate_data.csv";
pub const TEXT_REPORT_FILE: &str = "renewable_energy_report.txt";
pub const HTML_REPORT_FILE: &str = "renewable_energy_dashboard_report.html";
pub const SUMMARY_JSON_FILE: &str = "renewable_energy_summary.json";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV export failed: {0}")]
    Polars(#[from] PolarsError),

    #[error("Exported CSV is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Nothing to export: {0}")]
    Empty(&'static str),
}

/// Builds export payloads.
pub struct ReportGenerator;

impl ReportGenerator {
    /// The cleaned Dataset as CSV text (header row, no index).
    pub fn cleaned_csv(dataset: &Dataset) -> Result<String, ExportError> {
        frame_to_csv(&mut dataset.frame().clone())
    }

    /// The growth view as CSV text. Undefined rates are written as empty cells.
    pub fn growth_csv(dataset: &Dataset, growth: &[GrowthRecord]) -> Result<String, ExportError> {
        if growth.is_empty() {
            return Err(ExportError::Empty("no growth rates could be computed"));
        }
        frame_to_csv(&mut growth_frame(dataset, growth)?)
    }

    /// Plain-text analysis report.
    ///
    /// `original` is the Dataset as loaded, before cleaning; its missing-value
    /// count is reported under data quality.
    pub fn text_report(original: &Dataset, views: &DerivedViews) -> String {
        let summary = &views.summary;
        let na = || "N/A".to_string();
        let count = |c: Option<usize>| c.map(format_thousands).unwrap_or_else(na);

        let period = match (summary.year_min, summary.year_max) {
            (Some(min), Some(max)) => format!("{} - {}", min, max),
            _ => "N/A - N/A".to_string(),
        };
        let capacity = summary
            .total_capacity_mw
            .map(|mw| format!("{} GW", format_decimal(mw / 1000.0, 1)))
            .unwrap_or_else(na);
        let growth = views
            .growth_stats
            .average()
            .map(|avg| format!("{:.2}%", avg))
            .unwrap_or_else(na);

        let mut lines = vec![
            "Renewable Energy Analysis Report".to_string(),
            String::new(),
            "Summary".to_string(),
            format!("- Total Records: {}", format_thousands(summary.row_count)),
            format!("- Time Period: {}", period),
            format!("- Regions: {}", count(summary.region_count)),
            format!("- Technologies: {}", count(summary.technology_count)),
            format!("- Countries: {}", count(summary.country_count)),
            String::new(),
            "Key Metrics".to_string(),
            format!("- Total Capacity: {}", capacity),
            format!("- Average Growth Rate: {}", growth),
        ];
        if views.growth_stats.undefined > 0 {
            lines.push(format!(
                "- Undefined Growth Rates (zero previous capacity): {}",
                views.growth_stats.undefined
            ));
        }
        lines.extend([
            String::new(),
            "Data Quality".to_string(),
            format!("- Missing Values: {}", format_thousands(original.missing_total())),
            format!(
                "- Duplicate Rows Removed: {}",
                format_thousands(summary.duplicate_row_count_removed)
            ),
            format!(
                "- Rows Removed by Cleaning: {}",
                format_thousands(original.height().saturating_sub(views.cleaned.height()))
            ),
        ]);

        let mut report = lines.join("\n");
        report.push('\n');
        report
    }

    /// Static HTML summary page stamped with the current local time.
    pub fn html_report(summary: &Summary) -> String {
        Self::html_report_at(summary, &Local::now())
    }

    pub fn html_report_at(summary: &Summary, generated_at: &DateTime<Local>) -> String {
        HTML_TEMPLATE
            .replace("{generated_at}", &generated_at.format(TIMESTAMP_FORMAT).to_string())
            .replace("{record_count}", &summary.row_count.to_string())
    }

    pub fn summary_json(summary: &Summary) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(summary)?)
    }

    /// Write an export payload to disk.
    pub fn save(path: &Path, contents: &[u8]) -> Result<(), ExportError> {
        std::fs::write(path, contents).map_err(|source| ExportError::Write {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("Exported {} ({} bytes)", path.display(), contents.len());
        Ok(())
    }
}

fn frame_to_csv(frame: &mut DataFrame) -> Result<String, ExportError> {
    let mut buffer: Vec<u8> = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .with_separator(b',')
        .finish(frame)?;
    Ok(String::from_utf8(buffer)?)
}

/// `1234567` -> `"1,234,567"`.
pub fn format_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Fixed-precision number with thousands separators in the integer part.
pub fn format_decimal(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };
    let grouped = int_part
        .parse::<usize>()
        .map(format_thousands)
        .unwrap_or_else(|_| int_part.to_string());
    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

const HTML_TEMPLATE: &str = r#"<html>
<head>
    <title>Renewable Energy Dashboard Report</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; }
        .header { color: #2E86AB; text-align: center; }
        .metric { background: #f4f4f4; padding: 20px; margin: 10px; border-radius: 10px; }
    </style>
</head>
<body>
    <h1 class="header">Renewable Energy Analysis Report</h1>
    <p>Generated on: {generated_at}</p>
    <div class="metric">
        <h3>Data Summary</h3>
        <p>Total Records: {record_count}</p>
        <p>Analysis completed successfully.</p>
    </div>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::pipeline::Pipeline;
    use crate::data::processor::{CleanOptions, Selection};
    use chrono::TimeZone;

    fn raw() -> Dataset {
        let raw = df!(
            "Region Indicator" => ["Africa", "Africa", "Africa", "Africa"],
            "Technology" => ["Solar", "Solar", "Solar", "Solar"],
            "Year" => [2020i64, 2021, 2021, 2022],
            "Electricity Installed Capacity (MW)" => [Some(0.0), Some(1500.0), Some(1500.0), None]
        )
        .unwrap();
        Dataset::normalize(&raw).unwrap()
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(12345.678, 1), "12,345.7");
        assert_eq!(format_decimal(-1500.0, 2), "-1,500.00");
        assert_eq!(format_decimal(-0.01, 1), "0.0");
        assert_eq!(format_decimal(7.0, 0), "7");
    }

    #[test]
    fn test_cleaned_csv_has_header_and_rows() {
        let csv = ReportGenerator::cleaned_csv(&raw()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(
            lines[0],
            "Region Indicator,Technology,Year,Electricity Installed Capacity (MW)"
        );
        assert!(lines[4].ends_with("2022,"));
    }

    #[test]
    fn test_growth_csv_leaves_undefined_rate_empty() {
        let views = Pipeline::run(&raw(), &CleanOptions::default(), &Selection::default()).unwrap();
        assert_eq!(views.growth.len(), 1);

        let csv = ReportGenerator::growth_csv(&views.cleaned, &views.growth).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[0].ends_with("Prev_Year_Capacity,Growth_Rate (%)"));
        assert!(lines[1].ends_with(",0.0,"));
    }

    #[test]
    fn test_growth_csv_requires_rows() {
        let err = ReportGenerator::growth_csv(&raw(), &[]).unwrap_err();
        assert!(matches!(err, ExportError::Empty(_)));
    }

    #[test]
    fn test_text_report() {
        let original = raw();
        let views =
            Pipeline::run(&original, &CleanOptions::default(), &Selection::default()).unwrap();
        let report = ReportGenerator::text_report(&original, &views);

        assert!(report.contains("- Total Records: 3"));
        assert!(report.contains("- Time Period: 2020 - 2022"));
        assert!(report.contains("- Regions: 1"));
        assert!(report.contains("- Countries: N/A"));
        assert!(report.contains("- Total Capacity: 1.5 GW"));
        assert!(report.contains("- Average Growth Rate: N/A"));
        assert!(report.contains("- Undefined Growth Rates (zero previous capacity): 1"));
        assert!(report.contains("- Missing Values: 1"));
        assert!(report.contains("- Duplicate Rows Removed: 1"));
    }

    #[test]
    fn test_html_report_substitutes_values() {
        let summary = Summary {
            row_count: 42,
            ..Default::default()
        };
        let at = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let html = ReportGenerator::html_report_at(&summary, &at);
        assert!(html.contains("Generated on: 2024-03-05 14:07:09"));
        assert!(html.contains("Total Records: 42"));
        assert!(!html.contains("{record_count}"));
    }

    #[test]
    fn test_summary_json() {
        let summary = Summary {
            row_count: 3,
            year_min: Some(2020),
            ..Default::default()
        };
        let json = ReportGenerator::summary_json(&summary).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["row_count"], 3);
        assert_eq!(value["year_min"], 2020);
        assert!(value["year_max"].is_null());
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TEXT_REPORT_FILE);
        ReportGenerator::save(&path, b"hello").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }
}
