/// Data layer: core types, loading, filtering, and aggregation.
///
/// Architecture:
/// ```text
///  snapshot (.csv / .json / .parquet)      live CSV feed
///        │                                      │
///        └──────────────┬───────────────────────┘
///                       ▼
///                 ┌──────────┐
///                 │  loader   │  parse rows → Catalog (fallback to snapshot)
///                 └──────────┘
///                       │
///                       ▼
///                 ┌──────────┐
///                 │ Catalog  │  Vec<Quake>, region/type index
///                 └──────────┘
///                       │
///                       ▼
///                 ┌──────────┐
///                 │  filter   │  FilterSpec predicates → filtered indices
///                 └──────────┘
///                       │
///                       ▼
///              ┌─────────────────┐
///              │  stats / table  │  KPIs, daily series, histogram,
///              └─────────────────┘  region boxes, sorted pages
/// ```

pub mod loader;
pub mod model;
pub mod filter;
pub mod stats;
pub mod table;
