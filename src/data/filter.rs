use std::collections::BTreeSet;

use chrono::NaiveDate;

use super::model::{Catalog, Quake};

/// Region selection sentinel meaning "no region constraint".
pub const ALL_REGIONS: &str = "All";

pub const DEFAULT_MAG_RANGE: (f64, f64) = (3.0, 7.0);
pub const DEFAULT_DEPTH_RANGE: (f64, f64) = (0.0, 200.0);

/// Slider bounds for the magnitude control.
pub const MAG_LIMITS: (f64, f64) = (0.0, 10.0);
/// Slider bounds for the depth control, in km.
pub const DEPTH_LIMITS: (f64, f64) = (0.0, 700.0);

// ---------------------------------------------------------------------------
// FilterSpec – one user's filter selection
// ---------------------------------------------------------------------------

/// Conjunctive filter over a [`Catalog`]. All ranges are closed intervals and
/// are not validated: an inverted range simply matches nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub mag: (f64, f64),
    pub depth: (f64, f64),
    /// Selected regions; empty or containing [`ALL_REGIONS`] means no constraint.
    pub regions: BTreeSet<String>,
    /// Selected types; an empty set matches nothing.
    pub kinds: BTreeSet<String>,
    /// Case-insensitive substring on place; blank means no constraint.
    pub keyword: String,
}

impl FilterSpec {
    /// Fixed defaults for `catalog`: its full date span, every type, all regions.
    pub fn defaults_for(catalog: &Catalog) -> Self {
        let today = chrono::Utc::now().date_naive();
        let (start, end) = catalog.date_bounds().unwrap_or((today, today));
        Self {
            start,
            end,
            mag: DEFAULT_MAG_RANGE,
            depth: DEFAULT_DEPTH_RANGE,
            regions: BTreeSet::from([ALL_REGIONS.to_string()]),
            kinds: catalog.kinds.clone(),
            keyword: String::new(),
        }
    }

    /// Whether the region predicate is inactive.
    pub fn all_regions(&self) -> bool {
        self.regions.is_empty() || self.regions.contains(ALL_REGIONS)
    }

    /// Check or uncheck one entry of the region multi-select. Picking a
    /// concrete region drops the "All" sentinel; picking "All" clears the rest.
    pub fn toggle_region(&mut self, region: &str, selected: bool) {
        if !selected {
            self.regions.remove(region);
        } else if region == ALL_REGIONS {
            self.regions = BTreeSet::from([ALL_REGIONS.to_string()]);
        } else {
            self.regions.remove(ALL_REGIONS);
            self.regions.insert(region.to_string());
        }
    }

    /// Evaluate every predicate against a single event.
    pub fn matches(&self, quake: &Quake) -> bool {
        let date = quake.date();
        if date < self.start || date > self.end {
            return false;
        }
        if !in_range(quake.mag, self.mag) || !in_range(quake.depth, self.depth) {
            return false;
        }
        if !self.kinds.contains(&quake.kind) {
            return false;
        }
        if !self.all_regions() && !self.regions.contains(&quake.region) {
            return false;
        }
        let keyword = self.keyword.trim();
        if !keyword.is_empty()
            && !quake
                .place
                .to_lowercase()
                .contains(&keyword.to_lowercase())
        {
            return false;
        }
        true
    }
}

/// Closed-interval test; NaN never matches.
fn in_range(value: f64, (lo, hi): (f64, f64)) -> bool {
    value >= lo && value <= hi
}

/// Return indices of events that pass the filter, in catalog order.
pub fn filtered_indices(catalog: &Catalog, spec: &FilterSpec) -> Vec<usize> {
    catalog
        .quakes
        .iter()
        .enumerate()
        .filter(|(_, q)| spec.matches(q))
        .map(|(i, _)| i)
        .collect()
}
