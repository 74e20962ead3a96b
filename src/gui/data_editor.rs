//! Manual data entry table and the read-only data preview.

use crate::data::{Dataset, ManualRow};
use egui::{RichText, ScrollArea, TextEdit};

const HEADERS: [&str; 6] = [
    "Region Indicator",
    "Country",
    "Technology",
    "Year",
    "Electricity Installed Capacity (MW)",
    "Electricity Generation (GWh)",
];

/// Editable grid of `ManualRow`s.
pub struct DataEditor {
    pub rows: Vec<ManualRow>,
}

impl Default for DataEditor {
    fn default() -> Self {
        Self {
            rows: vec![ManualRow::default(); 3],
        }
    }
}

impl DataEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filled_rows(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_blank()).count()
    }

    /// Draw the table. Returns true when the user asks to apply the rows.
    pub fn show(&mut self, ui: &mut egui::Ui) -> bool {
        let mut apply = false;

        ui.label(RichText::new("✏ Manual Data Entry").size(16.0).strong());
        ui.label(
            RichText::new(
                "Year, capacity and generation must be numbers; generation is optional. \
                 Blank rows are ignored.",
            )
            .size(11.0)
            .weak(),
        );
        ui.add_space(5.0);

        let mut remove: Option<usize> = None;
        ScrollArea::horizontal().id_salt("manual_entry").show(ui, |ui| {
            egui::Grid::new("manual_grid").striped(true).show(ui, |ui| {
                for header in HEADERS {
                    ui.label(RichText::new(header).strong().size(11.0));
                }
                ui.end_row();

                for (i, row) in self.rows.iter_mut().enumerate() {
                    for cell in [
                        &mut row.region,
                        &mut row.country,
                        &mut row.technology,
                        &mut row.year,
                        &mut row.capacity_mw,
                        &mut row.generation_gwh,
                    ] {
                        ui.add(TextEdit::singleline(cell).desired_width(120.0));
                    }
                    if ui.small_button("🗑").clicked() {
                        remove = Some(i);
                    }
                    ui.end_row();
                }
            });
        });

        if let Some(i) = remove {
            self.rows.remove(i);
        }

        ui.horizontal(|ui| {
            if ui.button("➕ Add Row").clicked() {
                self.rows.push(ManualRow::default());
            }
            let can_apply = self.filled_rows() > 0;
            if ui
                .add_enabled(can_apply, egui::Button::new("✔ Use This Data"))
                .clicked()
            {
                apply = true;
            }
        });

        apply
    }
}

/// First `n` rows of `dataset` as a striped grid.
pub fn show_preview(ui: &mut egui::Ui, dataset: &Dataset, n: usize) {
    ui.label(RichText::new("📋 Data Preview").size(16.0).strong());

    let names = dataset.column_names();
    let rows = dataset.preview(n);

    ScrollArea::horizontal().id_salt("preview").show(ui, |ui| {
        egui::Grid::new("preview_grid").striped(true).show(ui, |ui| {
            for name in &names {
                ui.label(RichText::new(name).strong().size(11.0));
            }
            ui.end_row();
            for row in &rows {
                for cell in row {
                    ui.label(RichText::new(cell).size(11.0));
                }
                ui.end_row();
            }
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_rows_ignores_blank() {
        let mut editor = DataEditor::new();
        assert_eq!(editor.filled_rows(), 0);
        editor.rows[1].region = "Asia".into();
        assert_eq!(editor.filled_rows(), 1);
    }
}
