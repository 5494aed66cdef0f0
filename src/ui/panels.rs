use eframe::egui::{self, Color32, RichText, ScrollArea, Slider, Ui};
use egui_extras::DatePickerButton;

use crate::data::filter::{ALL_REGIONS, DEPTH_LIMITS, MAG_LIMITS};
use crate::data::model::SourceMode;
use crate::state::{AppState, Tab};

// ---------------------------------------------------------------------------
// Left side panel – filter controls
// ---------------------------------------------------------------------------

/// Render the filter panel. Edits go into `state.draft`; nothing is
/// recomputed until Apply or Reset is pressed.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.strong("Data Source");
            ui.radio_value(&mut state.source_mode, SourceMode::Snapshot, "Snapshot (included)");
            ui.radio_value(&mut state.source_mode, SourceMode::Live, "Live (USGS, if available)");
            ui.add_space(6.0);

            date_range(ui, state);
            ui.add_space(6.0);

            ui.strong("Magnitude Range");
            let (lo, hi) = state.draft.mag;
            ui.add(Slider::new(&mut state.draft.mag.0, MAG_LIMITS.0..=hi).step_by(0.1).text("min"));
            ui.add(Slider::new(&mut state.draft.mag.1, lo..=MAG_LIMITS.1).step_by(0.1).text("max"));
            ui.add_space(6.0);

            ui.strong("Depth (km)");
            let (lo, hi) = state.draft.depth;
            ui.add(Slider::new(&mut state.draft.depth.0, DEPTH_LIMITS.0..=hi).step_by(5.0).text("min"));
            ui.add(Slider::new(&mut state.draft.depth.1, lo..=DEPTH_LIMITS.1).step_by(5.0).text("max"));
            ui.add_space(6.0);

            region_select(ui, state);
            ui.add_space(6.0);

            type_checklist(ui, state);
            ui.add_space(6.0);

            ui.strong("Keyword in Place");
            let response = ui.add(
                egui::TextEdit::singleline(&mut state.draft.keyword)
                    .hint_text("e.g., offshore, Ankara, trench"),
            );
            let submitted =
                response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            ui.add_space(8.0);

            ui.horizontal(|ui: &mut Ui| {
                if ui.button("Apply Filters").clicked() || submitted {
                    state.apply();
                }
                if ui.button("Reset").clicked() {
                    state.reset();
                }
            });

            if let Some(msg) = &state.status_message {
                let color = if state.status_is_error {
                    Color32::RED
                } else {
                    ui.visuals().weak_text_color()
                };
                ui.label(RichText::new(msg).color(color));
            }
        });
}

fn date_range(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Date Range");
    ui.horizontal(|ui: &mut Ui| {
        ui.add(DatePickerButton::new(&mut state.draft.start).id_salt("start_date"));
        ui.label("to");
        ui.add(DatePickerButton::new(&mut state.draft.end).id_salt("end_date"));
    });

    // Keep the pickers inside the loaded data's span.
    if let Some((min, max)) = state.catalog.as_ref().and_then(|c| c.date_bounds()) {
        state.draft.start = state.draft.start.clamp(min, max);
        state.draft.end = state.draft.end.clamp(min, max);
    }
}

fn region_select(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Region");
    let Some(catalog) = &state.catalog else {
        ui.label("No dataset loaded.");
        return;
    };

    let selected_text = if state.draft.all_regions() {
        ALL_REGIONS.to_string()
    } else {
        format!("{} selected", state.draft.regions.len())
    };

    let options: Vec<String> = std::iter::once(ALL_REGIONS.to_string())
        .chain(catalog.regions.iter().cloned())
        .collect();

    egui::ComboBox::from_id_salt("region_select")
        .selected_text(selected_text)
        .height(300.0)
        .show_ui(ui, |ui: &mut Ui| {
            for region in &options {
                let mut checked = state.draft.regions.contains(region);
                let mut text = RichText::new(region);
                if region != ALL_REGIONS {
                    text = text.color(state.color_map.color_for(region));
                }
                if ui.checkbox(&mut checked, text).changed() {
                    state.draft.toggle_region(region, checked);
                }
            }
        });
}

fn type_checklist(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Type");
    let Some(catalog) = &state.catalog else {
        return;
    };
    for kind in &catalog.kinds {
        let mut checked = state.draft.kinds.contains(kind);
        if ui.checkbox(&mut checked, kind).changed() {
            if checked {
                state.draft.kinds.insert(kind.clone());
            } else {
                state.draft.kinds.remove(kind);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open snapshot…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.menu_button("Help", |ui: &mut Ui| {
            ui.set_max_width(360.0);
            ui.label(RichText::new("How to use").strong());
            ui.label("Choose the included snapshot or the live USGS feed, set the filters, then press Apply.");
            ui.label("Switch tabs to explore the map, daily trends, distributions, or the event table.");
            ui.separator();
            ui.label(RichText::new("Data").strong());
            ui.label(
                "Fields: time, latitude, longitude, depth (km), magnitude, place, type, id, \
                 and a region derived from the last part of the place text.",
            );
        });

        ui.separator();

        if let Some(cat) = &state.catalog {
            ui.label(format!(
                "{} events loaded ({}), {} visible",
                cat.len(),
                cat.source,
                state.view.indices.len()
            ));
        }
    });
}

// ---------------------------------------------------------------------------
// KPI strip and tab selector
// ---------------------------------------------------------------------------

pub fn kpi_strip(ui: &mut Ui, state: &AppState) {
    let kpis = &state.view.kpis;
    let cards = [
        ("Events", kpis.count_text()),
        ("Avg Mag", kpis.mean_mag_text()),
        ("Max Mag", kpis.max_mag_text()),
        ("Median Depth (km)", kpis.median_depth_text()),
    ];

    ui.columns(cards.len(), |columns: &mut [Ui]| {
        for (col, (title, value)) in columns.iter_mut().zip(cards) {
            egui::Frame::group(col.style()).show(col, |ui: &mut Ui| {
                ui.set_min_width(ui.available_width());
                ui.vertical_centered(|ui: &mut Ui| {
                    ui.label(RichText::new(title).small());
                    ui.heading(value);
                });
            });
        }
    });
}

pub fn tab_bar(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        for tab in Tab::ALL {
            ui.selectable_value(&mut state.active_tab, tab, RichText::new(tab.label()).strong());
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open earthquake snapshot")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        log::info!("Opening snapshot {}", path.display());
        state.open_snapshot(path);
    }
}
