use std::cmp::Ordering;

use super::model::{Catalog, Quake};

/// Columns of the table view, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableColumn {
    Time,
    Magnitude,
    Depth,
    Region,
    Place,
    Kind,
    Id,
}

impl TableColumn {
    pub const ALL: [TableColumn; 7] = [
        TableColumn::Time,
        TableColumn::Magnitude,
        TableColumn::Depth,
        TableColumn::Region,
        TableColumn::Place,
        TableColumn::Kind,
        TableColumn::Id,
    ];

    pub fn title(self) -> &'static str {
        match self {
            TableColumn::Time => "Time",
            TableColumn::Magnitude => "Magnitude",
            TableColumn::Depth => "Depth (km)",
            TableColumn::Region => "Region",
            TableColumn::Place => "Place",
            TableColumn::Kind => "Type",
            TableColumn::Id => "ID",
        }
    }

    /// Cell text for one event.
    pub fn cell(self, q: &Quake) -> String {
        match self {
            TableColumn::Time => q.time.format("%Y-%m-%d %H:%M:%S").to_string(),
            TableColumn::Magnitude => format_number(q.mag, 2),
            TableColumn::Depth => format_number(q.depth, 1),
            TableColumn::Region => q.region.clone(),
            TableColumn::Place => q.place.clone(),
            TableColumn::Kind => q.kind.clone(),
            TableColumn::Id => q.id.clone(),
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn is_numeric(self) -> bool {
        matches!(self, TableColumn::Magnitude | TableColumn::Depth)
    }

    fn value(self, q: &Quake) -> f64 {
        match self {
            TableColumn::Magnitude => q.mag,
            TableColumn::Depth => q.depth,
            _ => f64::NAN,
        }
    }

    fn compare(self, a: &Quake, b: &Quake) -> Ordering {
        match self {
            TableColumn::Time => a.time.cmp(&b.time),
            TableColumn::Magnitude => a.mag.total_cmp(&b.mag),
            TableColumn::Depth => a.depth.total_cmp(&b.depth),
            TableColumn::Region => a.region.cmp(&b.region),
            TableColumn::Place => a.place.cmp(&b.place),
            TableColumn::Kind => a.kind.cmp(&b.kind),
            TableColumn::Id => a.id.cmp(&b.id),
        }
    }
}

fn format_number(v: f64, decimals: usize) -> String {
    if v.is_finite() {
        format!("{v:.decimals$}")
    } else {
        String::new()
    }
}

// ---------------------------------------------------------------------------
// Column filters
// ---------------------------------------------------------------------------

/// Comparison operators accepted in front of a number in a numeric column
/// filter, longest first so `>=` is not read as `>`.
const OPERATORS: [(&str, fn(f64, f64) -> bool); 6] = [
    (">=", |v, x| v >= x),
    ("<=", |v, x| v <= x),
    ("!=", |v, x| v != x),
    (">", |v, x| v > x),
    ("<", |v, x| v < x),
    ("=", equal),
];

fn equal(v: f64, x: f64) -> bool {
    v == x
}

/// Whether `q` passes the filter expression typed for `column`.
///
/// Numeric columns take `5.2`, `>=5`, `<100`, `!=10` and similar; a bare
/// number means equality and NaN never matches. Anything else is a
/// case-insensitive substring match on the cell text.
pub fn cell_matches(column: TableColumn, q: &Quake, expr: &str) -> bool {
    let expr = expr.trim();
    if expr.is_empty() {
        return true;
    }
    if column.is_numeric() {
        let (op, rest) = OPERATORS
            .iter()
            .find_map(|(token, op)| expr.strip_prefix(token).map(|rest| (*op, rest)))
            .unwrap_or((equal as fn(f64, f64) -> bool, expr));
        if let Ok(x) = rest.trim().parse::<f64>() {
            return op(column.value(q), x);
        }
    }
    column
        .cell(q)
        .to_lowercase()
        .contains(&expr.to_lowercase())
}

// ---------------------------------------------------------------------------
// TableView – sort order, column filters and pagination
// ---------------------------------------------------------------------------

/// Sort key, direction, column filters and current page of the table tab.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub sort_column: TableColumn,
    pub descending: bool,
    /// Filter expression per column, indexed like [`TableColumn::ALL`].
    filters: [String; TableColumn::ALL.len()],
    /// Zero-based page index.
    pub page: usize,
    pub page_size: usize,
}

impl TableView {
    /// Newest events first.
    pub fn new(page_size: usize) -> Self {
        Self {
            sort_column: TableColumn::Time,
            descending: true,
            filters: Default::default(),
            page: 0,
            page_size: page_size.max(1),
        }
    }

    /// Clicking the active column flips direction; another column sorts
    /// ascending. Either way the view returns to the first page.
    pub fn toggle_sort(&mut self, column: TableColumn) {
        if self.sort_column == column {
            self.descending = !self.descending;
        } else {
            self.sort_column = column;
            self.descending = false;
        }
        self.page = 0;
    }

    pub fn filter(&self, column: TableColumn) -> &str {
        &self.filters[column.index()]
    }

    /// Replace one column's filter. A changed filter returns to the first page.
    pub fn set_filter(&mut self, column: TableColumn, text: String) {
        let slot = &mut self.filters[column.index()];
        if *slot != text {
            *slot = text;
            self.page = 0;
        }
    }

    pub fn has_filters(&self) -> bool {
        self.filters.iter().any(|f| !f.trim().is_empty())
    }

    /// Drop rows failing any column filter, keeping order.
    pub fn retain_matching(&self, catalog: &Catalog, rows: &mut Vec<usize>) {
        if !self.has_filters() {
            return;
        }
        rows.retain(|&i| {
            let q = &catalog.quakes[i];
            TableColumn::ALL
                .iter()
                .zip(&self.filters)
                .all(|(&column, expr)| cell_matches(column, q, expr))
        });
    }

    /// Reorder `indices` by the active column. The sort is stable.
    pub fn sort(&self, catalog: &Catalog, indices: &mut [usize]) {
        indices.sort_by(|&a, &b| {
            let ord = self
                .sort_column
                .compare(&catalog.quakes[a], &catalog.quakes[b]);
            if self.descending { ord.reverse() } else { ord }
        });
    }

    pub fn page_count(&self, rows: usize) -> usize {
        rows.div_ceil(self.page_size).max(1)
    }

    /// Slice of `rows` for the current page, clamping the page into range.
    pub fn page_rows<'a>(&mut self, rows: &'a [usize]) -> &'a [usize] {
        self.page = self.page.min(self.page_count(rows.len()) - 1);
        let start = self.page * self.page_size;
        let end = (start + self.page_size).min(rows.len());
        &rows[start.min(end)..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::SourceMode;
    use crate::data::model::tests::quake;

    fn catalog() -> Catalog {
        Catalog::from_quakes(
            (0..25)
                .map(|i| quake(&format!("q{i:02}"), 1 + i / 2, i % 24, 3.0 + (i % 5) as f64, 10.0, "X, Y"))
                .collect(),
            SourceMode::Snapshot,
        )
    }

    #[test]
    fn default_is_newest_first() {
        let cat = catalog();
        let view = TableView::new(12);
        let mut rows: Vec<usize> = (0..cat.len()).collect();
        view.sort(&cat, &mut rows);
        assert_eq!(cat.quakes[rows[0]].id, "q24");
        assert_eq!(cat.quakes[rows[24]].id, "q00");
    }

    #[test]
    fn pages_are_clamped() {
        let rows: Vec<usize> = (0..25).collect();
        let mut view = TableView::new(12);
        assert_eq!(view.page_count(rows.len()), 3);
        assert_eq!(view.page_rows(&rows).len(), 12);

        view.page = 2;
        assert_eq!(view.page_rows(&rows), &[24]);

        view.page = 9;
        assert_eq!(view.page_rows(&rows), &[24]);
        assert_eq!(view.page, 2);

        let empty: Vec<usize> = Vec::new();
        assert_eq!(view.page_count(0), 1);
        assert!(view.page_rows(&empty).is_empty());
        assert_eq!(view.page, 0);
    }

    #[test]
    fn toggling_sort_resets_page() {
        let cat = catalog();
        let mut view = TableView::new(12);
        view.page = 1;

        view.toggle_sort(TableColumn::Magnitude);
        assert_eq!(view.page, 0);
        assert!(!view.descending);
        let mut rows: Vec<usize> = (0..cat.len()).collect();
        view.sort(&cat, &mut rows);
        assert_eq!(cat.quakes[rows[0]].mag, 3.0);

        view.toggle_sort(TableColumn::Magnitude);
        assert!(view.descending);
        view.sort(&cat, &mut rows);
        assert_eq!(cat.quakes[rows[0]].mag, 7.0);
    }

    fn ids(cat: &Catalog, rows: &[usize]) -> Vec<String> {
        rows.iter().map(|&i| cat.quakes[i].id.clone()).collect()
    }

    #[test]
    fn numeric_filters_accept_operators() {
        let cat = catalog();
        let q = &cat.quakes[0];
        assert_eq!(q.mag, 3.0);
        assert!(cell_matches(TableColumn::Magnitude, q, "3"));
        assert!(cell_matches(TableColumn::Magnitude, q, " >= 3 "));
        assert!(cell_matches(TableColumn::Magnitude, q, "<3.5"));
        assert!(!cell_matches(TableColumn::Magnitude, q, ">3"));
        assert!(!cell_matches(TableColumn::Magnitude, q, "!=3"));
        assert!(cell_matches(TableColumn::Depth, q, "=10"));

        let mut missing = q.clone();
        missing.mag = f64::NAN;
        assert!(!cell_matches(TableColumn::Magnitude, &missing, "<10"));
        assert!(cell_matches(TableColumn::Magnitude, &missing, ""));
    }

    #[test]
    fn text_filters_are_case_insensitive_substrings() {
        let mut q = quake("us7000", 1, 0, 4.0, 10.0, "12 km N of Ankara, Turkey");
        q.kind = "quarry blast".to_string();
        assert!(cell_matches(TableColumn::Place, &q, "ankara"));
        assert!(cell_matches(TableColumn::Region, &q, "TURK"));
        assert!(cell_matches(TableColumn::Kind, &q, "blast"));
        assert!(cell_matches(TableColumn::Id, &q, "7000"));
        assert!(cell_matches(TableColumn::Time, &q, "2024-01-01"));
        assert!(!cell_matches(TableColumn::Place, &q, "konya"));
        assert!(cell_matches(TableColumn::Magnitude, &q, "4.0"));
        // Not a number: matched against the cell text "4.00".
        assert!(!cell_matches(TableColumn::Magnitude, &q, "abc"));
    }

    #[test]
    fn column_filters_combine_before_paging() {
        let cat = catalog();
        let mut view = TableView::new(12);
        view.page = 1;

        view.set_filter(TableColumn::Magnitude, ">=6".to_string());
        assert_eq!(view.page, 0);
        view.set_filter(TableColumn::Time, "2024-01-1".to_string());
        assert!(view.has_filters());

        let mut rows: Vec<usize> = (0..cat.len()).collect();
        view.retain_matching(&cat, &mut rows);
        view.sort(&cat, &mut rows);
        // Days 10..=13 hold q18..q24; magnitudes 6 and 7 are i % 5 of 3 and 4.
        assert_eq!(ids(&cat, &rows), vec!["q24", "q23", "q19", "q18"]);
        assert_eq!(view.page_rows(&rows).len(), 4);

        // Setting the same text again keeps the page.
        view.page = 3;
        view.set_filter(TableColumn::Time, "2024-01-1".to_string());
        assert_eq!(view.page, 3);

        view.set_filter(TableColumn::Magnitude, String::new());
        view.set_filter(TableColumn::Time, "  ".to_string());
        assert!(!view.has_filters());
        assert_eq!(view.filter(TableColumn::Time), "  ");
    }

    #[test]
    fn missing_numbers_render_blank() {
        let mut q = quake("x", 1, 0, f64::NAN, 12.345, "X, Y");
        q.depth = 12.345;
        assert_eq!(TableColumn::Magnitude.cell(&q), "");
        assert_eq!(TableColumn::Depth.cell(&q), "12.3");
        assert_eq!(TableColumn::Time.cell(&q), "2024-01-01 00:00:00");
    }
}
