use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use eframe::egui::{Color32, Stroke, Ui};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Legend, Line, Plot, PlotPoints, Points,
};

use crate::color::marker_radius;
use crate::state::AppState;

const ACCENT: Color32 = Color32::from_rgb(66, 133, 244);

// ---------------------------------------------------------------------------
// Map tab
// ---------------------------------------------------------------------------

/// Longitude/latitude scatter, coloured by region, sized by magnitude.
pub fn quake_map(ui: &mut Ui, state: &AppState) {
    let Some(catalog) = &state.catalog else {
        return;
    };

    // One series per (region, whole magnitude) so marker size can vary while
    // the legend still shows one entry per region.
    let mut series: BTreeMap<(&str, i64), Vec<[f64; 2]>> = BTreeMap::new();
    let mut hover: Vec<([f64; 2], String)> = Vec::with_capacity(state.view.indices.len());
    for q in state.view.indices.iter().map(|&i| &catalog.quakes[i]) {
        if !q.longitude.is_finite() || !q.latitude.is_finite() {
            continue;
        }
        let pos = [q.longitude, q.latitude];
        series
            .entry((q.region.as_str(), q.mag.floor() as i64))
            .or_default()
            .push(pos);
        hover.push((
            pos,
            format!(
                "{}\n{}\nM {:.1}, depth {:.1} km",
                q.place,
                q.time.format("%Y-%m-%d %H:%M UTC"),
                q.mag,
                q.depth
            ),
        ));
    }

    Plot::new("quake_map")
        .legend(Legend::default())
        .data_aspect(1.0)
        .include_x(-180.0)
        .include_x(180.0)
        .include_y(-90.0)
        .include_y(90.0)
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .label_formatter(move |_name, value| nearest_label(&hover, [value.x, value.y]))
        .show(ui, |plot_ui| {
            for ((region, mag), points) in series {
                plot_ui.points(
                    Points::new(PlotPoints::from(points))
                        .name(region)
                        .color(state.color_map.color_for(region))
                        .radius(marker_radius(mag as f64 + 0.5))
                        .filled(true),
                );
            }
        });
}

/// Hover text of the event closest to `at`, if one is within two degrees.
fn nearest_label(hover: &[([f64; 2], String)], at: [f64; 2]) -> String {
    hover
        .iter()
        .map(|(p, text)| ((p[0] - at[0]).powi(2) + (p[1] - at[1]).powi(2), text))
        .filter(|(d2, _)| *d2 <= 4.0)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, text)| text.clone())
        .unwrap_or_else(|| format!("lon {:.2}, lat {:.2}", at[0], at[1]))
}

// ---------------------------------------------------------------------------
// Trends tab
// ---------------------------------------------------------------------------

fn day_to_x(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

fn x_to_day(x: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Daily event count and daily average magnitude, stacked.
pub fn trends(ui: &mut Ui, state: &AppState) {
    let daily = &state.view.daily;
    let height = (ui.available_height() / 2.0 - 8.0).max(160.0);

    ui.strong("Daily Earthquake Count");
    let counts: PlotPoints = daily
        .iter()
        .map(|p| [day_to_x(p.date), p.count as f64])
        .collect();
    Plot::new("trend_count")
        .height(height)
        .x_axis_formatter(|mark, _range| x_to_day(mark.value))
        .label_formatter(|_name, value| format!("{}\n{:.0} events", x_to_day(value.x), value.y))
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(counts).color(ACCENT).width(2.0));
        });

    ui.strong("Daily Average Magnitude");
    // Days without events break the line rather than dropping to zero.
    let mut segments: Vec<Vec<[f64; 2]>> = vec![Vec::new()];
    for p in daily {
        match p.mean_mag {
            Some(m) => {
                if let Some(segment) = segments.last_mut() {
                    segment.push([day_to_x(p.date), m]);
                }
            }
            None => segments.push(Vec::new()),
        }
    }
    Plot::new("trend_avg")
        .height(height)
        .x_axis_formatter(|mark, _range| x_to_day(mark.value))
        .label_formatter(|_name, value| format!("{}\nM {:.2}", x_to_day(value.x), value.y))
        .show(ui, |plot_ui| {
            for segment in segments.into_iter().filter(|s| !s.is_empty()) {
                plot_ui.points(Points::new(PlotPoints::from(segment.clone())).color(ACCENT).radius(2.5));
                plot_ui.line(Line::new(PlotPoints::from(segment)).color(ACCENT).width(2.0));
            }
        });
}

// ---------------------------------------------------------------------------
// Distribution tab
// ---------------------------------------------------------------------------

/// Magnitude histogram, depth by top regions, and magnitude vs depth.
pub fn distribution(ui: &mut Ui, state: &AppState) {
    let height = (ui.available_height() - 40.0).max(200.0);

    ui.columns(3, |cols: &mut [Ui]| {
        magnitude_histogram(&mut cols[0], state, height);
        depth_boxes(&mut cols[1], state, height);
        mag_vs_depth(&mut cols[2], state, height);
    });
}

fn magnitude_histogram(ui: &mut Ui, state: &AppState, height: f32) {
    ui.strong("Magnitude Distribution");
    let bars: Vec<Bar> = state
        .view
        .histogram
        .iter()
        .map(|bin| Bar::new(bin.center(), bin.count as f64).width(bin.width()))
        .collect();
    Plot::new("mag_hist")
        .height(height)
        .x_axis_label("Magnitude")
        .y_axis_label("Count")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(ACCENT));
        });
}

fn depth_boxes(ui: &mut Ui, state: &AppState, height: f32) {
    ui.strong("Depth by Top Regions");
    let boxes = &state.view.depth_boxes;
    let labels: Vec<String> = boxes.iter().map(|b| b.label.clone()).collect();

    Plot::new("depth_box")
        .height(height)
        .y_axis_label("Depth (km)")
        .x_axis_formatter(move |mark, _range| {
            let idx = mark.value.round();
            if (mark.value - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            labels.get(idx as usize).cloned().unwrap_or_default()
        })
        .show(ui, |plot_ui| {
            for (i, b) in boxes.iter().enumerate() {
                let x = i as f64;
                let color = state.color_map.color_for(&b.label);
                let elem = BoxElem::new(
                    x,
                    BoxSpread::new(b.lower_whisker, b.q1, b.median, b.q3, b.upper_whisker),
                )
                .name(&b.label)
                .box_width(0.6)
                .fill(color.gamma_multiply(0.4))
                .stroke(Stroke::new(1.5, color));
                plot_ui.box_plot(BoxPlot::new(vec![elem]).name(&b.label).color(color));

                if !b.outliers.is_empty() {
                    let points: PlotPoints = b.outliers.iter().map(|&d| [x, d]).collect();
                    plot_ui.points(Points::new(points).name(&b.label).color(color).radius(2.5));
                }
            }
        });
}

fn mag_vs_depth(ui: &mut Ui, state: &AppState, height: f32) {
    ui.strong("Magnitude vs Depth");
    Plot::new("mag_depth")
        .height(height)
        .legend(Legend::default())
        .x_axis_label("Depth (km)")
        .y_axis_label("Magnitude")
        .show(ui, |plot_ui| {
            for (region, points) in &state.view.scatter {
                plot_ui.points(
                    Points::new(PlotPoints::from(points.clone()))
                        .name(region)
                        .color(state.color_map.color_for(region))
                        .radius(2.5),
                );
            }
        });
}
