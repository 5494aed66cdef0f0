use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` distinct colours. Hues step by the golden angle so that
/// neighbours in a sorted region list do not end up with similar shades.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    const GOLDEN_ANGLE: f32 = 137.507_77;
    (0..n)
        .map(|i| {
            let hue = (i as f32 * GOLDEN_ANGLE) % 360.0;
            let lightness = if i % 2 == 0 { 0.55 } else { 0.45 };
            let rgb: Srgb = Hsl::new(hue, 0.70, lightness).into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Region → Color32
// ---------------------------------------------------------------------------

/// Stable region colours for the map, scatter and legend.
#[derive(Debug, Clone, Default)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
}

impl ColorMap {
    /// Build from the catalog's full region list so colours do not shift
    /// when filters change.
    pub fn new(regions: &BTreeSet<String>) -> Self {
        let mapping = regions
            .iter()
            .cloned()
            .zip(generate_palette(regions.len()))
            .collect();
        ColorMap { mapping }
    }

    pub fn color_for(&self, region: &str) -> Color32 {
        self.mapping.get(region).copied().unwrap_or(Color32::GRAY)
    }
}

/// Marker radius for a magnitude; roughly linear in the 0..10 slider range.
pub fn marker_radius(mag: f64) -> f32 {
    if mag.is_finite() {
        (1.5 + mag.clamp(0.0, 10.0) * 0.9) as f32
    } else {
        1.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_is_distinct() {
        let colors = generate_palette(6);
        assert_eq!(colors.len(), 6);
        let unique: BTreeSet<[u8; 4]> = colors.iter().map(|c| c.to_array()).collect();
        assert_eq!(unique.len(), 6);
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn unknown_region_is_gray() {
        let regions = BTreeSet::from(["Chile".to_string(), "Japan".to_string()]);
        let map = ColorMap::new(&regions);
        assert_ne!(map.color_for("Chile"), map.color_for("Japan"));
        assert_eq!(map.color_for("Mars"), Color32::GRAY);
    }

    #[test]
    fn radius_grows_with_magnitude() {
        assert!(marker_radius(6.0) > marker_radius(3.0));
        assert_eq!(marker_radius(f64::NAN), 1.5);
        assert_eq!(marker_radius(42.0), marker_radius(10.0));
    }
}
