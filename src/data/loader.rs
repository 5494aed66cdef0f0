use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int32Type, Int64Type, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::model::{Catalog, Quake, SourceMode, derive_region};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a snapshot catalog from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with `time,latitude,longitude,depth,mag,place,type,id`
/// * `.json`    – `[{ "time": "...", "mag": 4.2, ... }, ...]`
/// * `.parquet` – same column names; `time` as text or an Arrow timestamp
pub fn load_file(path: &Path) -> Result<Catalog> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let quakes = match ext.as_str() {
        "csv" => {
            let file = std::fs::File::open(path).context("opening CSV")?;
            parse_csv(file)?
        }
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };

    Ok(Catalog::from_quakes(quakes, SourceMode::Snapshot))
}

/// Result of resolving a [`SourceMode`] into a catalog.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub catalog: Catalog,
    /// Mode the user asked for (the catalog's own `source` says what was used).
    pub requested: SourceMode,
    /// Why the live feed was abandoned, if it was.
    pub fallback: Option<String>,
}

impl LoadOutcome {
    /// One-line status for the UI.
    pub fn status_message(&self) -> String {
        match &self.fallback {
            Some(reason) => {
                format!("Live feed unavailable ({reason}); showing snapshot data.")
            }
            None => format!("Loaded {} data.", self.catalog.source),
        }
    }
}

/// Load the catalog for `mode`.
///
/// `Live` tries the feed exactly once and falls back to the snapshot on any
/// failure. Only a failing snapshot is reported as an error.
pub fn load_source(mode: SourceMode, snapshot: &Path, feed: &dyn FeedSource) -> Result<LoadOutcome> {
    let (catalog, fallback) = match mode {
        SourceMode::Snapshot => (load_file(snapshot)?, None),
        SourceMode::Live => match load_live(feed) {
            Ok(catalog) => (catalog, None),
            Err(e) => {
                log::warn!("Live load failed; falling back to snapshot. Reason: {e}");
                (load_file(snapshot)?, Some(e.to_string()))
            }
        },
    };

    log::info!(
        "Loaded {} events from {} (requested {mode})",
        catalog.len(),
        catalog.source
    );

    Ok(LoadOutcome {
        catalog,
        requested: mode,
        fallback,
    })
}

// ---------------------------------------------------------------------------
// Live feed
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("feed returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("feed returned no events")]
    Empty,
    #[error("malformed feed: {0}")]
    Parse(String),
}

/// Something that can produce the raw CSV body of the live feed.
pub trait FeedSource {
    fn fetch(&self) -> Result<String, FeedError>;
}

/// The public HTTP summary feed. No authentication, no retries.
pub struct HttpFeed {
    pub url: String,
    pub timeout: Duration,
}

impl FeedSource for HttpFeed {
    fn fetch(&self) -> Result<String, FeedError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("quakescope/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .build()?;

        let resp = client.get(&self.url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::Status(status));
        }
        Ok(resp.text()?)
    }
}

/// Fetch and parse the live feed. The feed carries many more columns than
/// we keep; the CSV header mapping drops the rest.
fn load_live(feed: &dyn FeedSource) -> Result<Catalog, FeedError> {
    let body = feed.fetch()?;
    let quakes = parse_csv(body.as_bytes()).map_err(|e| FeedError::Parse(format!("{e:#}")))?;
    if quakes.is_empty() {
        return Err(FeedError::Empty);
    }
    Ok(Catalog::from_quakes(quakes, SourceMode::Live))
}

// ---------------------------------------------------------------------------
// Row mapping shared by CSV and JSON
// ---------------------------------------------------------------------------

/// One input row before normalisation. Unparseable numbers become `None`.
/// CSV rows deserialize directly; JSON records go through [`RawQuake::from_json`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawQuake {
    time: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option")]
    latitude: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    longitude: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    depth: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    mag: Option<f64>,
    place: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    id: Option<String>,
    region: Option<String>,
}

impl RawQuake {
    /// Map one JSON record. Values of the wrong shape (arrays, objects,
    /// non-numeric text in a number field) read as missing.
    fn from_json(record: &Map<String, Value>) -> Self {
        let text = |key: &str| match record.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let number = |key: &str| match record.get(key) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        RawQuake {
            time: text("time"),
            latitude: number("latitude"),
            longitude: number("longitude"),
            depth: number("depth"),
            mag: number("mag"),
            place: text("place"),
            kind: text("type"),
            id: text("id"),
            region: text("region"),
        }
    }

    fn into_quake(self, time: DateTime<Utc>, row: usize) -> Quake {
        let region = match self.region.as_deref().map(str::trim) {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => derive_region(self.place.as_deref()),
        };
        Quake {
            time,
            latitude: self.latitude.unwrap_or(f64::NAN),
            longitude: self.longitude.unwrap_or(f64::NAN),
            depth: self.depth.unwrap_or(f64::NAN),
            mag: self.mag.unwrap_or(f64::NAN),
            place: self.place.unwrap_or_default(),
            kind: self.kind.unwrap_or_default(),
            id: self
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("row-{row}")),
            region,
        }
    }
}

/// Normalise raw rows, skipping those without a usable timestamp.
fn collect_rows(rows: impl IntoIterator<Item = (usize, RawQuake)>) -> Vec<Quake> {
    let mut skipped = 0usize;
    let quakes: Vec<Quake> = rows
        .into_iter()
        .filter_map(|(row, raw)| match raw.time.as_deref().and_then(parse_time) {
            Some(time) => Some(raw.into_quake(time, row)),
            None => {
                skipped += 1;
                None
            }
        })
        .collect();
    if skipped > 0 {
        log::warn!("Skipped {skipped} rows without a parseable time");
    }
    quakes
}

/// Parse the timestamp layouts seen in snapshots and the feed. Naive
/// timestamps are taken as UTC.
pub fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn parse_csv(input: impl Read) -> Result<Vec<Quake>> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader.headers().context("reading CSV headers")?;
    if !headers.iter().any(|h| h == "time") {
        bail!("CSV missing 'time' column");
    }

    let mut rows = Vec::new();
    for (row_no, result) in reader.deserialize::<RawQuake>().enumerate() {
        let raw = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push((row_no, raw));
    }
    Ok(collect_rows(rows))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, as written by `df.to_json(orient='records')`.
fn load_json(path: &Path) -> Result<Vec<Quake>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let records: Vec<Map<String, Value>> =
        serde_json::from_str(&text).context("parsing JSON (expected an array of records)")?;
    Ok(collect_rows(records.iter().map(RawQuake::from_json).enumerate()))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet snapshot. Works with files written by Pandas, Polars, or
/// the `generate_sample` binary.
fn load_parquet(path: &Path) -> Result<Vec<Quake>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut quakes = Vec::new();
    let mut skipped = 0usize;
    let mut offset = 0usize;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let column = |name: &str| schema.index_of(name).ok().map(|i| batch.column(i).clone());

        let time_col = column("time").context("Parquet file missing 'time' column")?;
        let latitude = column("latitude");
        let longitude = column("longitude");
        let depth = column("depth");
        let mag = column("mag");
        let place = column("place");
        let kind = column("type");
        let id = column("id");
        let region = column("region");

        for row in 0..batch.num_rows() {
            let Some(time) = extract_time(&time_col, row)? else {
                skipped += 1;
                continue;
            };
            let raw = RawQuake {
                time: None,
                latitude: latitude.as_ref().and_then(|c| extract_f64(c, row)),
                longitude: longitude.as_ref().and_then(|c| extract_f64(c, row)),
                depth: depth.as_ref().and_then(|c| extract_f64(c, row)),
                mag: mag.as_ref().and_then(|c| extract_f64(c, row)),
                place: place.as_ref().and_then(|c| extract_string(c, row)),
                kind: kind.as_ref().and_then(|c| extract_string(c, row)),
                id: id.as_ref().and_then(|c| extract_string(c, row)),
                region: region.as_ref().and_then(|c| extract_string(c, row)),
            };
            quakes.push(raw.into_quake(time, offset + row));
        }
        offset += batch.num_rows();
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} parquet rows without a time");
    }
    Ok(quakes)
}

// -- Parquet / Arrow helpers --

fn extract_f64(col: &Arc<dyn Array>, row: usize) -> Option<f64> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Float64 => Some(col.as_primitive::<Float64Type>().value(row)),
        DataType::Float32 => Some(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Int64 => Some(col.as_primitive::<Int64Type>().value(row) as f64),
        DataType::Int32 => Some(col.as_primitive::<Int32Type>().value(row) as f64),
        _ => None,
    }
}

fn extract_string(col: &Arc<dyn Array>, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Utf8 => Some(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Some(col.as_string::<i64>().value(row).to_string()),
        _ => None,
    }
}

/// `Ok(None)` for null or unparseable text; `Err` for an unsupported column type.
fn extract_time(col: &Arc<dyn Array>, row: usize) -> Result<Option<DateTime<Utc>>> {
    if col.is_null(row) {
        return Ok(None);
    }
    let time = match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => {
            extract_string(col, row).as_deref().and_then(parse_time)
        }
        DataType::Timestamp(TimeUnit::Second, _) => {
            DateTime::from_timestamp(col.as_primitive::<TimestampSecondType>().value(row), 0)
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => DateTime::from_timestamp_millis(
            col.as_primitive::<TimestampMillisecondType>().value(row),
        ),
        DataType::Timestamp(TimeUnit::Microsecond, _) => DateTime::from_timestamp_micros(
            col.as_primitive::<TimestampMicrosecondType>().value(row),
        ),
        DataType::Timestamp(TimeUnit::Nanosecond, _) => Some(DateTime::from_timestamp_nanos(
            col.as_primitive::<TimestampNanosecondType>().value(row),
        )),
        other => bail!("Unsupported 'time' column type {other:?}"),
    };
    Ok(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SNAPSHOT: &str = "\
time,latitude,longitude,depth,mag,place,type,id
2024-01-02T03:04:05.000Z,38.1,32.5,10.0,5.1,\"12 km N of Konya, Turkey\",earthquake,us1
2024-01-01T00:00:00Z,-17.9,-178.3,550.5,4.4,Fiji region,earthquake,us2
2024-01-03 10:00:00,61.2,-150.0,,2.1,\"Anchorage, Alaska\",quarry blast,ak3
not a time,0,0,0,0,nowhere,earthquake,bad
";

    struct FailingFeed;

    impl FeedSource for FailingFeed {
        fn fetch(&self) -> Result<String, FeedError> {
            Err(FeedError::Parse("connection refused".to_string()))
        }
    }

    struct StaticFeed(&'static str);

    impl FeedSource for StaticFeed {
        fn fetch(&self) -> Result<String, FeedError> {
            Ok(self.0.to_string())
        }
    }

    fn snapshot_file(ext: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(ext).tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn csv_rows_are_normalised() {
        let file = snapshot_file(".csv", SNAPSHOT);
        let cat = load_file(file.path()).unwrap();

        assert_eq!(cat.len(), 3);
        assert_eq!(cat.source, SourceMode::Snapshot);
        // Sorted by time.
        assert_eq!(cat.quakes[0].id, "us2");
        assert_eq!(cat.quakes[1].region, "Turkey");
        assert_eq!(cat.quakes[2].region, "Alaska");
        assert_eq!(cat.quakes[2].kind, "quarry blast");
        assert!(cat.quakes[2].depth.is_nan());
        assert_eq!(cat.quakes[0].region, "Fiji region");
    }

    #[test]
    fn explicit_region_column_is_kept() {
        let body = "time,mag,depth,place,type,id,region\n\
                    2024-01-01,4.0,5.0,\"X, Y\",earthquake,a,Custom\n\
                    2024-01-01,4.0,5.0,\"X, Y\",earthquake,b,\n";
        let quakes = parse_csv(body.as_bytes()).unwrap();
        assert_eq!(quakes[0].region, "Custom");
        assert_eq!(quakes[1].region, "Y");
    }

    #[test]
    fn json_records_load() {
        let body = r#"[
            {"time": "2024-01-05T00:00:00Z", "latitude": 1.0, "longitude": 2.0,
             "depth": 33.0, "mag": 6.2, "place": "Off the coast, Chile", "type": "earthquake", "id": "j1"},
            {"time": "2024-01-04T00:00:00Z", "mag": null, "place": null, "type": "earthquake", "id": "j2"}
        ]"#;
        let file = snapshot_file(".json", body);
        let cat = load_file(file.path()).unwrap();

        assert_eq!(cat.len(), 2);
        assert_eq!(cat.quakes[0].id, "j2");
        assert_eq!(cat.quakes[0].region, "Unknown");
        assert!(cat.quakes[0].mag.is_nan());
        assert_eq!(cat.quakes[1].region, "Chile");
    }

    #[test]
    fn json_fields_of_the_wrong_shape_read_as_missing() {
        let body = r#"[
            {"time": "2024-01-05T00:00:00Z", "mag": [1], "depth": {"km": 3},
             "latitude": "12.5", "place": "X, Chile", "type": "earthquake", "id": 42},
            {"time": 17, "mag": 4.0, "id": "no-time"}
        ]"#;
        let file = snapshot_file(".json", body);
        let cat = load_file(file.path()).unwrap();

        assert_eq!(cat.len(), 1);
        let q = &cat.quakes[0];
        assert!(q.mag.is_nan());
        assert!(q.depth.is_nan());
        assert_eq!(q.latitude, 12.5);
        assert_eq!(q.id, "42");
        assert_eq!(q.region, "Chile");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let file = snapshot_file(".txt", SNAPSHOT);
        assert!(load_file(file.path()).is_err());
    }

    #[test]
    fn time_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc();
        assert_eq!(parse_time("2024-03-01T12:00:00Z"), Some(expected));
        assert_eq!(parse_time("2024-03-01T14:00:00+02:00"), Some(expected));
        assert_eq!(parse_time("2024-03-01 12:00:00"), Some(expected));
        assert_eq!(parse_time("2024-03-01 12:00:00.000000+00:00"), Some(expected));
        assert_eq!(parse_time("2024-03-01T12:00:00.000"), Some(expected));
        assert!(parse_time("2024-03-01").is_some());
        assert_eq!(parse_time("yesterday"), None);
    }

    #[test]
    fn live_failure_matches_snapshot() {
        // NaN depths never compare equal, so use a fully populated snapshot.
        let file = snapshot_file(".csv", &SNAPSHOT.replace(",,2.1,", ",3.5,2.1,"));
        let direct = load_file(file.path()).unwrap();

        let outcome = load_source(SourceMode::Live, file.path(), &FailingFeed).unwrap();
        assert_eq!(outcome.catalog, direct);
        assert_eq!(outcome.requested, SourceMode::Live);
        assert!(outcome.fallback.is_some());
        assert!(outcome.status_message().contains("showing snapshot"));
    }

    #[test]
    fn empty_live_body_falls_back() {
        let file = snapshot_file(".csv", SNAPSHOT);
        let feed = StaticFeed("time,latitude,longitude,depth,mag,place,type,id\n");
        let outcome = load_source(SourceMode::Live, file.path(), &feed).unwrap();
        assert_eq!(outcome.catalog.source, SourceMode::Snapshot);
        assert_eq!(outcome.fallback.as_deref(), Some("feed returned no events"));
    }

    #[test]
    fn live_success_keeps_known_columns() {
        let file = snapshot_file(".csv", SNAPSHOT);
        let feed = StaticFeed(
            "time,latitude,longitude,depth,mag,magType,nst,place,type,id,updated\n\
             2024-02-01T00:00:00.000Z,1,2,3,4.5,mb,10,\"50 km E of Hualien City, Taiwan\",earthquake,x1,2024-02-02T00:00:00.000Z\n",
        );
        let outcome = load_source(SourceMode::Live, file.path(), &feed).unwrap();
        assert!(outcome.fallback.is_none());
        assert_eq!(outcome.catalog.source, SourceMode::Live);
        assert_eq!(outcome.catalog.quakes[0].region, "Taiwan");
        assert_eq!(outcome.status_message(), "Loaded live data.");
    }

    #[test]
    fn missing_snapshot_is_an_error() {
        let result = load_source(
            SourceMode::Live,
            Path::new("/nonexistent/quakes.csv"),
            &FailingFeed,
        );
        assert!(result.is_err());
    }
}
