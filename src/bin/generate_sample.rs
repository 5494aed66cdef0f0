//! Writes a deterministic synthetic earthquake snapshot to
//! `data/earthquakes_snapshot.csv` and `data/earthquakes_snapshot.parquet`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Duration, Utc};
use parquet::arrow::ArrowWriter;
use serde::Serialize;

const EVENTS: usize = 400;
const DAYS: i64 = 30;
const START: &str = "2025-06-01T00:00:00Z";
const SEED: u64 = 42;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    /// Uniform in [0, 1).
    fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.unit()
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }
}

/// A seismic zone: centre, spread in degrees, typical depth, nearby towns.
struct Zone {
    region: &'static str,
    lat: f64,
    lon: f64,
    spread: f64,
    max_depth: f64,
    towns: &'static [&'static str],
}

const ZONES: &[Zone] = &[
    Zone { region: "Alaska", lat: 61.0, lon: -150.0, spread: 4.0, max_depth: 120.0, towns: &["Anchorage", "Willow", "Cantwell"] },
    Zone { region: "CA", lat: 36.0, lon: -119.0, spread: 3.0, max_depth: 20.0, towns: &["Ridgecrest", "Parkfield", "Petrolia"] },
    Zone { region: "Japan", lat: 37.0, lon: 141.5, spread: 4.0, max_depth: 300.0, towns: &["Namie", "Iwaki", "Hachinohe"] },
    Zone { region: "Indonesia", lat: -3.0, lon: 122.0, spread: 8.0, max_depth: 600.0, towns: &["Ambon", "Palu", "Sinabang"] },
    Zone { region: "Chile", lat: -30.0, lon: -71.5, spread: 6.0, max_depth: 200.0, towns: &["La Serena", "Ovalle", "Valparaiso"] },
    Zone { region: "Turkey", lat: 38.5, lon: 35.0, spread: 4.0, max_depth: 30.0, towns: &["Ankara", "Malatya", "Elazig"] },
    Zone { region: "Tonga", lat: -20.0, lon: -174.5, spread: 3.0, max_depth: 650.0, towns: &["Neiafu", "Pangai"] },
    Zone { region: "Peru", lat: -12.0, lon: -76.0, spread: 5.0, max_depth: 180.0, towns: &["Lima", "Ica", "Arequipa"] },
    Zone { region: "Philippines", lat: 12.0, lon: 125.5, spread: 5.0, max_depth: 100.0, towns: &["Davao", "Surigao", "Bislig"] },
    Zone { region: "Greece", lat: 38.0, lon: 22.5, spread: 2.0, max_depth: 40.0, towns: &["Patras", "Kalamata"] },
];

const DIRECTIONS: &[&str] = &["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

#[derive(Serialize)]
struct Row {
    time: String,
    latitude: f64,
    longitude: f64,
    depth: f64,
    mag: f64,
    place: String,
    #[serde(rename = "type")]
    kind: String,
    id: String,
    #[serde(skip)]
    millis: i64,
}

fn round(v: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (v * f).round() / f
}

/// `EVENTS` rows spread over the `DAYS` days from `start`, in time order.
fn generate(rng: &mut SimpleRng, start: DateTime<Utc>) -> Vec<Row> {
    let span_ms = Duration::days(DAYS).num_milliseconds() as f64;

    let mut rows: Vec<Row> = (0..EVENTS)
        .map(|i| {
            let zone = rng.pick(ZONES);
            let time = start + Duration::milliseconds(rng.range(0.0, span_ms) as i64);
            // Gutenberg-Richter-like: many small events, few large ones.
            let mag = (2.5 - rng.unit().max(1e-9).ln() * 0.9).min(8.2);
            let depth = zone.max_depth * rng.unit().powi(3) + 1.0;

            let kind = if zone.region == "CA" && rng.unit() < 0.15 {
                "quarry blast"
            } else if rng.unit() < 0.02 {
                "explosion"
            } else {
                "earthquake"
            };
            let place = if rng.unit() < 0.08 {
                format!("{} region", zone.region)
            } else {
                format!(
                    "{} km {} of {}, {}",
                    rng.range(3.0, 120.0) as u32,
                    rng.pick(DIRECTIONS),
                    rng.pick(zone.towns),
                    zone.region
                )
            };

            Row {
                time: time.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
                latitude: round(zone.lat + rng.range(-zone.spread, zone.spread), 4),
                longitude: round(zone.lon + rng.range(-zone.spread, zone.spread), 4),
                depth: round(depth, 2),
                mag: round(mag, 1),
                place,
                kind: kind.to_string(),
                id: format!("qs{:08x}", rng.next_u64() as u32 ^ i as u32),
                millis: time.timestamp_millis(),
            }
        })
        .collect();
    rows.sort_by_key(|r| r.millis);
    rows
}

/// LF-terminated, matching the checked-in snapshot.
fn csv_writer<W: std::io::Write>(out: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out)
}

fn write_csv(rows: &[Row], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).context("creating CSV")?;
    let mut writer = csv_writer(file);
    for row in rows {
        writer.serialize(row).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn write_parquet(rows: &[Row], path: &Path) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("time", DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())), false),
        Field::new("latitude", DataType::Float64, false),
        Field::new("longitude", DataType::Float64, false),
        Field::new("depth", DataType::Float64, false),
        Field::new("mag", DataType::Float64, false),
        Field::new("place", DataType::Utf8, false),
        Field::new("type", DataType::Utf8, false),
        Field::new("id", DataType::Utf8, false),
    ]));

    let times: Vec<i64> = rows.iter().map(|r| r.millis).collect();
    let latitude: Vec<f64> = rows.iter().map(|r| r.latitude).collect();
    let longitude: Vec<f64> = rows.iter().map(|r| r.longitude).collect();
    let depth: Vec<f64> = rows.iter().map(|r| r.depth).collect();
    let mag: Vec<f64> = rows.iter().map(|r| r.mag).collect();
    let place: Vec<&str> = rows.iter().map(|r| r.place.as_str()).collect();
    let kind: Vec<&str> = rows.iter().map(|r| r.kind.as_str()).collect();
    let id: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(TimestampMillisecondArray::from(times).with_timezone("UTC")),
            Arc::new(Float64Array::from(latitude)),
            Arc::new(Float64Array::from(longitude)),
            Arc::new(Float64Array::from(depth)),
            Arc::new(Float64Array::from(mag)),
            Arc::new(StringArray::from(place)),
            Arc::new(StringArray::from(kind)),
            Arc::new(StringArray::from(id)),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn start_time() -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(START)
        .context("parsing start time")?
        .with_timezone(&Utc))
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(SEED);
    let rows = generate(&mut rng, start_time()?);

    let dir = Path::new("data");
    std::fs::create_dir_all(dir).context("creating data directory")?;
    let csv_path = dir.join("earthquakes_snapshot.csv");
    let parquet_path = dir.join("earthquakes_snapshot.parquet");
    write_csv(&rows, &csv_path)?;
    write_parquet(&rows, &parquet_path)?;

    println!(
        "Wrote {} events to {} and {}",
        rows.len(),
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_stay_inside_the_window() {
        let start = start_time().unwrap();
        let rows = generate(&mut SimpleRng::new(SEED), start);
        assert_eq!(rows.len(), EVENTS);
        assert!(rows.windows(2).all(|w| w[0].millis <= w[1].millis));
        let end = start + Duration::days(DAYS);
        assert!(rows[0].millis >= start.timestamp_millis());
        assert!(rows[EVENTS - 1].millis < end.timestamp_millis());
    }

    #[test]
    fn default_seed_reproduces_bundled_snapshot() {
        let rows = generate(&mut SimpleRng::new(SEED), start_time().unwrap());
        let mut buf = Vec::new();
        {
            let mut writer = csv_writer(&mut buf);
            for row in &rows {
                writer.serialize(row).unwrap();
            }
            writer.flush().unwrap();
        }
        let written = String::from_utf8(buf).unwrap();
        assert_eq!(written, include_str!("../../data/earthquakes_snapshot.csv"));
    }
}
