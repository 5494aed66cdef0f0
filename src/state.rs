use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::color::ColorMap;
use crate::config::Config;
use crate::data::filter::{FilterSpec, filtered_indices};
use crate::data::loader::{self, FeedSource, HttpFeed};
use crate::data::model::{Catalog, SourceMode};
use crate::data::stats::{self, BoxStats, Bin, DailyPoint, Kpis};
use crate::data::table::{TableColumn, TableView};

pub const RESET_STATUS: &str = "Filters reset to defaults using the snapshot.";

// ---------------------------------------------------------------------------
// Tabs and derived views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Map,
    Trends,
    Distribution,
    Table,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Map, Tab::Trends, Tab::Distribution, Tab::Table];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Map => "Map",
            Tab::Trends => "Trends",
            Tab::Distribution => "Distribution",
            Tab::Table => "Table",
        }
    }
}

/// Everything the tabs render, recomputed on each Apply/Reset.
#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    /// Indices of events passing the applied filter, in time order.
    pub indices: Vec<usize>,
    pub kpis: Kpis,
    pub daily: Vec<DailyPoint>,
    pub histogram: Vec<Bin>,
    pub depth_boxes: Vec<BoxStats>,
    pub scatter: BTreeMap<String, Vec<[f64; 2]>>,
    /// `indices` passing the table's column filters, in table sort order.
    pub table_rows: Vec<usize>,
}

impl DashboardView {
    fn compute(catalog: &Catalog, spec: &FilterSpec, config: &Config, table: &TableView) -> Self {
        let indices = filtered_indices(catalog, spec);
        log::debug!("Filter matched {} of {} events", indices.len(), catalog.len());

        let table_rows = Self::table_rows(catalog, &indices, table);

        Self {
            kpis: Kpis::compute(catalog, &indices),
            daily: stats::daily_series(catalog, &indices),
            histogram: stats::magnitude_histogram(catalog, &indices, config.histogram_bins),
            depth_boxes: stats::depth_by_top_regions(catalog, &indices, config.top_regions),
            scatter: stats::mag_vs_depth(catalog, &indices),
            table_rows,
            indices,
        }
    }

    fn table_rows(catalog: &Catalog, indices: &[usize], table: &TableView) -> Vec<usize> {
        let mut rows = indices.to_vec();
        table.retain_matching(catalog, &mut rows);
        table.sort(catalog, &mut rows);
        rows
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: Config,

    /// Loaded catalog (None until the first successful load).
    pub catalog: Option<Catalog>,

    /// Source mode requested when `catalog` was loaded.
    loaded_mode: Option<SourceMode>,

    /// Source selected in the filter panel.
    pub source_mode: SourceMode,

    /// Filter controls as currently edited (not yet applied).
    pub draft: FilterSpec,

    /// Result of the last Apply/Reset.
    pub view: DashboardView,

    pub active_tab: Tab,
    pub table: TableView,

    /// Region colours.
    pub color_map: ColorMap,

    /// Status line under the filter buttons.
    pub status_message: Option<String>,
    pub status_is_error: bool,

    feed: Box<dyn FeedSource>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let feed = HttpFeed {
            url: config.live_feed_url.clone(),
            timeout: Duration::from_secs(config.http_timeout_secs),
        };
        Self::with_feed(config, Box::new(feed))
    }

    pub fn with_feed(config: Config, feed: Box<dyn FeedSource>) -> Self {
        let empty = Catalog::from_quakes(Vec::new(), SourceMode::Snapshot);
        Self {
            draft: FilterSpec::defaults_for(&empty),
            table: TableView::new(config.table_page_size),
            config,
            catalog: None,
            loaded_mode: None,
            source_mode: SourceMode::Snapshot,
            view: DashboardView::default(),
            active_tab: Tab::Map,
            color_map: ColorMap::default(),
            status_message: None,
            status_is_error: false,
            feed,
        }
    }

    /// Apply button: load the selected source if it changed, then recompute
    /// every view from the draft filter.
    pub fn apply(&mut self) {
        if self.loaded_mode != Some(self.source_mode) {
            self.load(self.source_mode);
        }
        self.table.page = 0;
        self.refresh_view();
    }

    /// Initial load: the snapshot with default filters.
    pub fn start(&mut self) {
        self.restore_defaults();
    }

    /// Reset button: back to the snapshot and the fixed default filter.
    pub fn reset(&mut self) {
        if self.restore_defaults() {
            self.set_status(RESET_STATUS.to_string(), false);
        }
    }

    fn restore_defaults(&mut self) -> bool {
        self.source_mode = SourceMode::Snapshot;
        if !self.load(SourceMode::Snapshot) {
            return false;
        }
        if let Some(cat) = &self.catalog {
            self.draft = FilterSpec::defaults_for(cat);
        }
        self.table = TableView::new(self.config.table_page_size);
        self.refresh_view();
        true
    }

    /// Switch to a different snapshot file and reset onto it. On failure the
    /// current snapshot path and catalog stay in place.
    pub fn open_snapshot(&mut self, path: PathBuf) {
        let previous = std::mem::replace(&mut self.config.snapshot_path, path);
        match loader::load_file(&self.config.snapshot_path) {
            Ok(_) => self.reset(),
            Err(e) => {
                log::error!(
                    "Failed to open {}: {e:#}",
                    self.config.snapshot_path.display()
                );
                self.config.snapshot_path = previous;
                self.set_status(format!("Error: {e:#}"), true);
            }
        }
    }

    pub fn toggle_table_sort(&mut self, column: TableColumn) {
        self.table.toggle_sort(column);
        if let Some(cat) = &self.catalog {
            self.table.sort(cat, &mut self.view.table_rows);
        }
    }

    /// Edit one column filter of the table and re-derive its rows from the
    /// applied subset.
    pub fn set_table_filter(&mut self, column: TableColumn, text: String) {
        if self.table.filter(column) == text {
            return;
        }
        self.table.set_filter(column, text);
        if let Some(cat) = &self.catalog {
            self.view.table_rows = DashboardView::table_rows(cat, &self.view.indices, &self.table);
        }
    }

    /// Load `mode` and install the catalog. Returns false (with an error
    /// status) when even the snapshot could not be read.
    fn load(&mut self, mode: SourceMode) -> bool {
        match loader::load_source(mode, &self.config.snapshot_path, self.feed.as_ref()) {
            Ok(outcome) => {
                let status = outcome.status_message();
                self.loaded_mode = Some(outcome.requested);
                let catalog = outcome.catalog;
                self.adopt_catalog(&catalog);
                self.color_map = ColorMap::new(&catalog.regions);
                self.catalog = Some(catalog);
                self.set_status(status, false);
                true
            }
            Err(e) => {
                log::error!("Failed to load data: {e:#}");
                self.set_status(format!("Error: {e:#}"), true);
                false
            }
        }
    }

    /// Fit the draft filter to a newly loaded catalog: the date window spans
    /// the new data and types unseen before are selected. Other controls keep
    /// the user's values.
    fn adopt_catalog(&mut self, catalog: &Catalog) {
        let fresh = FilterSpec::defaults_for(catalog);
        self.draft.start = fresh.start;
        self.draft.end = fresh.end;

        let known = self.catalog.as_ref().map(|c| &c.kinds);
        for kind in &catalog.kinds {
            if !known.is_some_and(|k| k.contains(kind)) {
                self.draft.kinds.insert(kind.clone());
            }
        }
    }

    fn refresh_view(&mut self) {
        self.view = match &self.catalog {
            Some(cat) => DashboardView::compute(cat, &self.draft, &self.config, &self.table),
            None => DashboardView::default(),
        };
    }

    fn set_status(&mut self, message: String, is_error: bool) {
        self.status_message = Some(message);
        self.status_is_error = is_error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::io::Write;

    use crate::data::filter::ALL_REGIONS;
    use crate::data::loader::FeedError;

    const SNAPSHOT: &str = "\
time,latitude,longitude,depth,mag,place,type,id
2024-01-01T00:00:00Z,35.0,139.0,10.0,5.0,\"Near Tokyo, Japan\",earthquake,s1
2024-01-02T00:00:00Z,-33.0,-71.0,40.0,6.5,\"Valparaiso, Chile\",earthquake,s2
2024-01-03T00:00:00Z,61.0,-150.0,5.0,3.2,\"Anchorage, Alaska\",explosion,s3
2024-01-04T00:00:00Z,-18.0,-178.0,550.0,4.1,Fiji region,earthquake,s4
";

    const LIVE: &str = "\
time,latitude,longitude,depth,mag,place,type,id
2024-02-10T00:00:00Z,1.0,1.0,12.0,4.4,\"Somewhere, Peru\",earthquake,l1
2024-02-11T00:00:00Z,1.0,1.0,12.0,4.8,\"Elsewhere, Peru\",ice quake,l2
";

    struct FailingFeed;

    impl FeedSource for FailingFeed {
        fn fetch(&self) -> Result<String, FeedError> {
            Err(FeedError::Empty)
        }
    }

    struct StaticFeed;

    impl FeedSource for StaticFeed {
        fn fetch(&self) -> Result<String, FeedError> {
            Ok(LIVE.to_string())
        }
    }

    fn state_with(feed: Box<dyn FeedSource>) -> (AppState, tempfile::NamedTempFile) {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(SNAPSHOT.as_bytes()).unwrap();
        let config = Config {
            snapshot_path: file.path().to_path_buf(),
            ..Config::default()
        };
        (AppState::with_feed(config, feed), file)
    }

    #[test]
    fn first_apply_loads_snapshot() {
        let (mut state, _file) = state_with(Box::new(FailingFeed));
        state.apply();

        let cat = state.catalog.as_ref().unwrap();
        assert_eq!(cat.len(), 4);
        assert_eq!(state.status_message.as_deref(), Some("Loaded snapshot data."));
        // Draft type selection picks up the catalog's types.
        assert_eq!(state.draft.kinds.len(), 2);
    }

    #[test]
    fn start_reports_snapshot_load() {
        let (mut state, _file) = state_with(Box::new(FailingFeed));
        state.start();
        assert_eq!(state.status_message.as_deref(), Some("Loaded snapshot data."));
        assert_eq!(state.view.kpis.count, 3);
    }

    #[test]
    fn reset_restores_exact_defaults() {
        let (mut state, _file) = state_with(Box::new(StaticFeed));
        state.reset();
        let defaults = state.draft.clone();
        assert_eq!(state.view.kpis.count, 3);

        state.source_mode = SourceMode::Live;
        state.draft.mag = (0.0, 1.0);
        state.draft.regions = BTreeSet::from(["Chile".to_string()]);
        state.draft.kinds.clear();
        state.draft.keyword = "tokyo".to_string();
        state.active_tab = Tab::Table;
        state.table.toggle_sort(TableColumn::Depth);
        state.apply();
        assert_eq!(state.catalog.as_ref().unwrap().source, SourceMode::Live);

        state.reset();
        assert_eq!(state.draft, defaults);
        assert_eq!(state.source_mode, SourceMode::Snapshot);
        assert_eq!(state.catalog.as_ref().unwrap().source, SourceMode::Snapshot);
        assert_eq!(state.table, TableView::new(state.config.table_page_size));
        assert_eq!(state.status_message.as_deref(), Some(RESET_STATUS));
        assert!(state.draft.regions.contains(ALL_REGIONS));
    }

    #[test]
    fn live_failure_falls_back_with_status() {
        let (mut state, _file) = state_with(Box::new(FailingFeed));
        state.source_mode = SourceMode::Live;
        state.apply();

        assert_eq!(state.catalog.as_ref().unwrap().source, SourceMode::Snapshot);
        assert!(!state.status_is_error);
        let status = state.status_message.clone().unwrap();
        assert!(status.contains("showing snapshot"), "{status}");
    }

    #[test]
    fn live_catalog_widens_dates_and_types() {
        let (mut state, _file) = state_with(Box::new(StaticFeed));
        state.reset();
        state.source_mode = SourceMode::Live;
        state.apply();

        assert!(state.draft.kinds.contains("ice quake"));
        assert_eq!(state.view.kpis.count, 2);
        assert_eq!(state.view.kpis.max_mag_text(), "4.8");
    }

    #[test]
    fn empty_result_uses_placeholders() {
        let (mut state, _file) = state_with(Box::new(FailingFeed));
        state.reset();
        state.draft.keyword = "atlantis".to_string();
        state.apply();

        assert_eq!(state.view.kpis.count, 0);
        assert_eq!(state.view.kpis.mean_mag_text(), stats::PLACEHOLDER);
        assert!(state.view.daily.is_empty());
        assert!(state.view.histogram.is_empty());
        assert!(state.view.depth_boxes.is_empty());
        assert!(state.view.table_rows.is_empty());
    }

    #[test]
    fn bad_snapshot_keeps_previous_catalog() {
        let (mut state, file) = state_with(Box::new(FailingFeed));
        state.reset();
        state.open_snapshot(PathBuf::from("/nonexistent/other.csv"));

        assert!(state.status_is_error);
        assert_eq!(state.config.snapshot_path, file.path());
        assert_eq!(state.catalog.as_ref().unwrap().len(), 4);
    }

    #[test]
    fn table_sort_reorders_rows() {
        let (mut state, _file) = state_with(Box::new(FailingFeed));
        state.reset();
        let cat = state.catalog.clone().unwrap();
        // s4 is deeper than the default depth window.
        assert_eq!(cat.quakes[state.view.table_rows[0]].id, "s3");

        state.toggle_table_sort(TableColumn::Magnitude);
        assert_eq!(cat.quakes[state.view.table_rows[0]].id, "s3");
        state.toggle_table_sort(TableColumn::Magnitude);
        assert_eq!(cat.quakes[state.view.table_rows[0]].id, "s2");
    }

    #[test]
    fn table_filter_narrows_rows_not_kpis() {
        let (mut state, _file) = state_with(Box::new(FailingFeed));
        state.reset();
        state.table.page = 1;

        state.set_table_filter(TableColumn::Region, "chile".to_string());
        let cat = state.catalog.clone().unwrap();
        let ids: Vec<&str> = state.view.table_rows.iter().map(|&i| cat.quakes[i].id.as_str()).collect();
        assert_eq!(ids, vec!["s2"]);
        assert_eq!(state.table.page, 0);
        assert_eq!(state.view.kpis.count, 3);

        // Still applied after the filter panel is re-applied.
        state.apply();
        assert_eq!(state.view.table_rows.len(), 1);

        state.set_table_filter(TableColumn::Region, String::new());
        assert_eq!(state.view.table_rows.len(), 3);

        state.set_table_filter(TableColumn::Depth, ">100".to_string());
        assert!(state.view.table_rows.is_empty());
        state.reset();
        assert_eq!(state.table.filter(TableColumn::Depth), "");
        assert_eq!(state.view.table_rows.len(), 3);
    }
}
