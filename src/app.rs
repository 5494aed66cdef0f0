use eframe::egui;

use crate::config::Config;
use crate::state::{AppState, Tab};
use crate::ui::{panels, plot, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct QuakeScopeApp {
    pub state: AppState,
}

impl QuakeScopeApp {
    /// Build the app and run the initial snapshot load with default filters.
    pub fn new(config: Config) -> Self {
        let mut state = AppState::new(config);
        state.start();
        Self { state }
    }
}

impl eframe::App for QuakeScopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: KPIs, tabs, tab content ----
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.state.catalog.is_none() {
                ui.centered_and_justified(|ui| {
                    ui.heading("No data loaded  (File → Open snapshot…)");
                });
                return;
            }
            if self.state.catalog.as_ref().is_some_and(|c| c.is_empty()) {
                ui.label("The loaded data contains no events.");
            }

            panels::kpi_strip(ui, &self.state);
            ui.add_space(6.0);
            panels::tab_bar(ui, &mut self.state);
            ui.separator();

            match self.state.active_tab {
                Tab::Map => plot::quake_map(ui, &self.state),
                Tab::Trends => plot::trends(ui, &self.state),
                Tab::Distribution => plot::distribution(ui, &self.state),
                Tab::Table => table::event_table(ui, &mut self.state),
            }
        });
    }
}
