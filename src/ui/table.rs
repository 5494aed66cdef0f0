use eframe::egui::{self, Align, Layout, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::table::TableColumn;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Table tab
// ---------------------------------------------------------------------------

/// Paginated event table. Clicking a header sorts by that column; the box
/// under each header filters it (`>5`, `<=70`, or text).
pub fn event_table(ui: &mut Ui, state: &mut AppState) {
    let Some(catalog) = &state.catalog else {
        return;
    };

    let total = state.view.table_rows.len();
    let pages = state.table.page_count(total);
    ui.horizontal(|ui: &mut Ui| {
        if ui
            .add_enabled(state.table.page > 0, egui::Button::new("◀ Prev"))
            .clicked()
        {
            state.table.page -= 1;
        }
        ui.label(format!("Page {} of {pages}", state.table.page + 1));
        if ui
            .add_enabled(state.table.page + 1 < pages, egui::Button::new("Next ▶"))
            .clicked()
        {
            state.table.page += 1;
        }
        ui.separator();
        ui.label(format!("{total} rows"));
    });

    let rows = state.table.page_rows(&state.view.table_rows);
    let sort_column = state.table.sort_column;
    let descending = state.table.descending;
    let mut clicked = None;
    let mut filters: Vec<String> = TableColumn::ALL
        .iter()
        .map(|&c| state.table.filter(c).to_string())
        .collect();

    let mut builder = TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .cell_layout(Layout::left_to_right(Align::Center));
    for column in TableColumn::ALL {
        builder = builder.column(match column {
            TableColumn::Place => Column::initial(260.0).at_least(100.0).clip(true),
            TableColumn::Id => Column::remainder(),
            _ => Column::auto().at_least(80.0),
        });
    }

    builder
        .header(48.0, |mut header| {
            for (column, filter) in TableColumn::ALL.into_iter().zip(filters.iter_mut()) {
                header.col(|ui: &mut Ui| {
                    ui.vertical(|ui: &mut Ui| {
                        let marker = match (column == sort_column, descending) {
                            (true, true) => " ⏷",
                            (true, false) => " ⏶",
                            _ => "",
                        };
                        let title = RichText::new(format!("{}{marker}", column.title())).strong();
                        if ui.add(egui::Button::new(title).frame(false)).clicked() {
                            clicked = Some(column);
                        }
                        ui.add(
                            egui::TextEdit::singleline(filter)
                                .hint_text("filter")
                                .desired_width(f32::INFINITY),
                        );
                    });
                });
            }
        })
        .body(|mut body| {
            for &idx in rows {
                let quake = &catalog.quakes[idx];
                body.row(20.0, |mut row| {
                    for column in TableColumn::ALL {
                        row.col(|ui: &mut Ui| {
                            ui.label(column.cell(quake));
                        });
                    }
                });
            }
        });

    for (column, text) in TableColumn::ALL.into_iter().zip(filters) {
        state.set_table_filter(column, text);
    }
    if let Some(column) = clicked {
        state.toggle_table_sort(column);
    }
}
