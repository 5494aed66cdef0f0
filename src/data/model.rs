use std::collections::{BTreeSet, HashSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

/// Region used when a record carries no usable place text.
pub const UNKNOWN_REGION: &str = "Unknown";

// ---------------------------------------------------------------------------
// SourceMode – where a catalog came from
// ---------------------------------------------------------------------------

/// Which data source the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMode {
    /// The bundled snapshot file.
    #[default]
    Snapshot,
    /// The remote summary feed, falling back to the snapshot.
    Live,
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceMode::Snapshot => write!(f, "snapshot"),
            SourceMode::Live => write!(f, "live"),
        }
    }
}

// ---------------------------------------------------------------------------
// Quake – one row of the event table
// ---------------------------------------------------------------------------

/// A single earthquake event.
///
/// Missing magnitude or depth values are stored as NaN, which never
/// satisfies a range predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Quake {
    pub time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Depth in km.
    pub depth: f64,
    pub mag: f64,
    pub place: String,
    pub kind: String,
    pub id: String,
    /// Trailing comma segment of `place`, or [`UNKNOWN_REGION`].
    pub region: String,
}

impl Quake {
    /// UTC calendar day of the event.
    pub fn date(&self) -> NaiveDate {
        self.time.date_naive()
    }
}

/// Derive the region from free-text place: the last comma-separated
/// segment, trimmed. Blank or missing place text maps to `"Unknown"`.
pub fn derive_region(place: Option<&str>) -> String {
    place
        .and_then(|p| p.rsplit(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_REGION)
        .to_string()
}

// ---------------------------------------------------------------------------
// Catalog – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full set of loaded events with pre-computed indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    /// All events, ordered by time ascending.
    pub quakes: Vec<Quake>,
    /// Sorted unique regions.
    pub regions: BTreeSet<String>,
    /// Sorted unique event types.
    pub kinds: BTreeSet<String>,
    /// Source that produced the events.
    pub source: SourceMode,
}

impl Catalog {
    /// Sort events by time, drop duplicate ids, and build the indices.
    pub fn from_quakes(mut quakes: Vec<Quake>, source: SourceMode) -> Self {
        quakes.sort_by(|a, b| a.time.cmp(&b.time));

        let mut seen: HashSet<String> = HashSet::with_capacity(quakes.len());
        let before = quakes.len();
        quakes.retain(|q| seen.insert(q.id.clone()));
        if quakes.len() != before {
            log::warn!(
                "Dropped {} events with duplicate ids",
                before - quakes.len()
            );
        }

        let regions = quakes.iter().map(|q| q.region.clone()).collect();
        let kinds = quakes
            .iter()
            .filter(|q| !q.kind.is_empty())
            .map(|q| q.kind.clone())
            .collect();

        Catalog {
            quakes,
            regions,
            kinds,
            source,
        }
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.quakes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quakes.is_empty()
    }

    /// Earliest and latest calendar day, if any events are loaded.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.quakes.first()?;
        let last = self.quakes.last()?;
        Some((first.date(), last.date()))
    }
}
