use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use super::model::{Catalog, Quake};

/// Shown in place of a statistic over an empty subset.
pub const PLACEHOLDER: &str = "—";

// ---------------------------------------------------------------------------
// KPIs
// ---------------------------------------------------------------------------

/// The four headline statistics of a filtered subset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Kpis {
    pub count: usize,
    pub mean_mag: Option<f64>,
    pub max_mag: Option<f64>,
    pub median_depth: Option<f64>,
}

impl Kpis {
    pub fn compute(catalog: &Catalog, indices: &[usize]) -> Self {
        let quakes = move || indices.iter().map(move |&i| &catalog.quakes[i]);
        let mags: Vec<f64> = quakes().map(|q| q.mag).collect();
        let mut depths: Vec<f64> = quakes().map(|q| q.depth).collect();

        Self {
            count: indices.len(),
            mean_mag: mean(&mags),
            max_mag: mags.iter().copied().reduce(f64::max),
            median_depth: median(&mut depths),
        }
    }

    /// Count with thousands separators, e.g. `1,234`.
    pub fn count_text(&self) -> String {
        group_thousands(self.count)
    }

    pub fn mean_mag_text(&self) -> String {
        self.mean_mag
            .map_or_else(|| PLACEHOLDER.to_string(), |v| format!("{v:.2}"))
    }

    pub fn max_mag_text(&self) -> String {
        self.max_mag
            .map_or_else(|| PLACEHOLDER.to_string(), |v| format!("{v:.1}"))
    }

    pub fn median_depth_text(&self) -> String {
        self.median_depth
            .map_or_else(|| PLACEHOLDER.to_string(), |v| format!("{v:.1}"))
    }
}

fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median; the mean of the two middle values for an even count.
pub fn median(values: &mut [f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Linearly interpolated quantile (`q` in 0..=1). Sorts `values` in place.
pub fn quantile(values: &mut [f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(values[lower] + (values[upper] - values[lower]) * frac)
}

// ---------------------------------------------------------------------------
// Trends: per-day aggregation
// ---------------------------------------------------------------------------

/// One calendar day of the trends view.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub count: usize,
    /// `None` for a day without events.
    pub mean_mag: Option<f64>,
}

/// Group the subset by UTC day, filling empty days between the first and
/// last event so the series is continuous.
pub fn daily_series(catalog: &Catalog, indices: &[usize]) -> Vec<DailyPoint> {
    let mut by_day: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for &i in indices {
        let q = &catalog.quakes[i];
        by_day.entry(q.date()).or_default().push(q.mag);
    }

    let (Some(&first), Some(&last)) = (by_day.keys().next(), by_day.keys().next_back()) else {
        return Vec::new();
    };

    first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|date| match by_day.get(&date) {
            Some(mags) => DailyPoint {
                date,
                count: mags.len(),
                mean_mag: mean(mags),
            },
            None => DailyPoint {
                date,
                count: 0,
                mean_mag: None,
            },
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Distribution views
// ---------------------------------------------------------------------------

/// One histogram bin over `[start, end)` (the last bin is closed).
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

impl Bin {
    pub fn center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }
}

/// Equal-width histogram of magnitudes spanning the subset's min..max.
pub fn magnitude_histogram(catalog: &Catalog, indices: &[usize], bins: usize) -> Vec<Bin> {
    let mags: Vec<f64> = indices
        .iter()
        .map(|&i| catalog.quakes[i].mag)
        .filter(|m| m.is_finite())
        .collect();
    histogram(&mags, bins)
}

pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    let (Some(min), Some(max)) = (
        values.iter().copied().reduce(f64::min),
        values.iter().copied().reduce(f64::max),
    ) else {
        return Vec::new();
    };
    if bins == 0 {
        return Vec::new();
    }
    if max - min <= f64::EPSILON {
        return vec![Bin {
            start: min - 0.05,
            end: min + 0.05,
            count: values.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            start: min + width * i as f64,
            end: min + width * (i + 1) as f64,
            count: 0,
        })
        .collect();
    for &v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

/// The `n` most frequent regions in the subset, most frequent first.
/// Ties are broken by region name.
pub fn top_regions(catalog: &Catalog, indices: &[usize], n: usize) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for &i in indices {
        *counts.entry(catalog.quakes[i].region.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(n)
        .map(|(region, _)| region.to_string())
        .collect()
}

/// Box-and-whisker summary of one group.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub label: String,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Most extreme values within 1.5 IQR of the box.
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    pub fn from_values(label: &str, values: &mut [f64]) -> Option<Self> {
        let q1 = quantile(values, 0.25)?;
        let median = quantile(values, 0.5)?;
        let q3 = quantile(values, 0.75)?;
        let iqr = q3 - q1;
        let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        let inside: Vec<f64> = values
            .iter()
            .copied()
            .filter(|v| *v >= lo_fence && *v <= hi_fence)
            .collect();
        let lower_whisker = inside.iter().copied().reduce(f64::min).unwrap_or(q1);
        let upper_whisker = inside.iter().copied().reduce(f64::max).unwrap_or(q3);
        let outliers = values
            .iter()
            .copied()
            .filter(|v| *v < lo_fence || *v > hi_fence)
            .collect();

        Some(Self {
            label: label.to_string(),
            q1,
            median,
            q3,
            lower_whisker,
            upper_whisker,
            outliers,
        })
    }
}

/// Depth distribution for each of the top regions of the subset, in rank order.
pub fn depth_by_top_regions(catalog: &Catalog, indices: &[usize], n: usize) -> Vec<BoxStats> {
    top_regions(catalog, indices, n)
        .iter()
        .filter_map(|region| {
            let mut depths: Vec<f64> = indices
                .iter()
                .map(|&i| &catalog.quakes[i])
                .filter(|q| &q.region == region && q.depth.is_finite())
                .map(|q| q.depth)
                .collect();
            BoxStats::from_values(region, &mut depths)
        })
        .collect()
}

/// `(depth, magnitude)` pairs grouped by region for the scatter view.
pub fn mag_vs_depth(catalog: &Catalog, indices: &[usize]) -> BTreeMap<String, Vec<[f64; 2]>> {
    let mut groups: BTreeMap<String, Vec<[f64; 2]>> = BTreeMap::new();
    for q in indices.iter().map(|&i| &catalog.quakes[i]) {
        groups.entry(q.region.clone()).or_default().push(point(q));
    }
    groups
}

fn point(q: &Quake) -> [f64; 2] {
    [q.depth, q.mag]
}
