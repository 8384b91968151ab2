//! Fixture Files
//!
//! The supervisor writes one fixture per format before any trial runs.
//! Workers inherit the environment, so they resolve the same directory.

use crate::codec::{CodecError, Format};
use crate::record::Flight;
use crate::validate::{ValidationError, validate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Directory holding the fixtures
pub const DATA_DIR_ENV: &str = "FLIGHTS_DATA_DIR";
/// Number of synthetic records to generate
pub const RECORDS_ENV: &str = "FLIGHTS_RECORDS";
/// CSV file to use instead of synthetic records
pub const SOURCE_ENV: &str = "FLIGHTS_SOURCE";

const DEFAULT_DATA_DIR: &str = "target/serdebench-data";
const DEFAULT_RECORDS: usize = 100_000;
const SEED: u64 = 0x5eed_f1a6;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("{path}: {source}")]
    Codec {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("invalid dataset: {0}")]
    Invalid(#[from] ValidationError),

    #[error("invalid {var}={value:?}: expected a record count")]
    Env { var: &'static str, value: String },

    #[error("cannot create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub fn fixture_path(format: Format) -> PathBuf {
    data_dir().join(format.file_name())
}

/// Per-process file for save units, so concurrent trials never collide
pub fn scratch_path(format: Format) -> PathBuf {
    let mut name = fixture_path(format).into_os_string();
    name.push(format!(".{}", std::process::id()));
    PathBuf::from(name)
}

/// Load the dataset that save units write, from the bincode fixture
pub fn load_dataset() -> Result<Vec<Flight>, FixtureError> {
    let path = fixture_path(Format::Bincode);
    Format::Bincode
        .load(&path)
        .map_err(|source| FixtureError::Codec { path, source })
}

/// Write every format's fixture and pin the data directory for workers
///
/// Returns the absolute data directory.
pub fn prepare_fixtures() -> Result<PathBuf, FixtureError> {
    let dir = data_dir();
    std::fs::create_dir_all(&dir).map_err(|source| FixtureError::Io {
        path: dir.clone(),
        source,
    })?;
    let dir = std::fs::canonicalize(&dir).map_err(|source| FixtureError::Io {
        path: dir.clone(),
        source,
    })?;
    // Set before any worker thread or process exists
    std::env::set_var(DATA_DIR_ENV, &dir);

    let flights = source_dataset()?;
    validate(&flights)?;

    for format in Format::ALL {
        let path = dir.join(format.file_name());
        let start = Instant::now();
        format
            .save(&flights, &path)
            .map_err(|source| FixtureError::Codec {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(
            "Wrote {} fixture {} in {:?}",
            format,
            path.display(),
            start.elapsed()
        );
    }

    tracing::info!(
        "Prepared {} fixtures of {} records in {}",
        Format::ALL.len(),
        flights.len(),
        dir.display()
    );
    Ok(dir)
}

fn source_dataset() -> Result<Vec<Flight>, FixtureError> {
    if let Some(source) = std::env::var_os(SOURCE_ENV) {
        let path = PathBuf::from(source);
        tracing::info!("Reading flights from {}", path.display());
        return read_source(&path);
    }

    let records = match std::env::var(RECORDS_ENV) {
        Ok(value) => value.trim().parse().map_err(|_| FixtureError::Env {
            var: RECORDS_ENV,
            value,
        })?,
        Err(_) => DEFAULT_RECORDS,
    };
    Ok(synthetic(records, SEED))
}

fn read_source(path: &Path) -> Result<Vec<Flight>, FixtureError> {
    Format::Csv.load(path).map_err(|source| FixtureError::Codec {
        path: path.to_path_buf(),
        source,
    })
}

const CARRIERS: &[(&str, i64)] = &[
    ("AA", 19805),
    ("AS", 19930),
    ("B6", 20409),
    ("DL", 19790),
    ("F9", 20436),
    ("HA", 19690),
    ("NK", 20416),
    ("OO", 20304),
    ("UA", 19977),
    ("VX", 21171),
    ("WN", 19393),
];

struct Airport {
    id: i64,
    market: i64,
    code: &'static str,
    city: &'static str,
    state: &'static str,
    state_name: &'static str,
    fips: i64,
    wac: i64,
}

#[rustfmt::skip]
const AIRPORTS: &[Airport] = &[
    Airport { id: 10397, market: 30397, code: "ATL", city: "Atlanta, GA", state: "GA", state_name: "Georgia", fips: 13, wac: 34 },
    Airport { id: 10721, market: 30721, code: "BOS", city: "Boston, MA", state: "MA", state_name: "Massachusetts", fips: 25, wac: 13 },
    Airport { id: 11298, market: 30194, code: "DFW", city: "Dallas/Fort Worth, TX", state: "TX", state_name: "Texas", fips: 48, wac: 74 },
    Airport { id: 11292, market: 30325, code: "DEN", city: "Denver, CO", state: "CO", state_name: "Colorado", fips: 8, wac: 82 },
    Airport { id: 12478, market: 31703, code: "JFK", city: "New York, NY", state: "NY", state_name: "New York", fips: 36, wac: 22 },
    Airport { id: 12892, market: 32575, code: "LAX", city: "Los Angeles, CA", state: "CA", state_name: "California", fips: 6, wac: 91 },
    Airport { id: 13204, market: 31454, code: "MCO", city: "Orlando, FL", state: "FL", state_name: "Florida", fips: 12, wac: 33 },
    Airport { id: 13930, market: 30977, code: "ORD", city: "Chicago, IL", state: "IL", state_name: "Illinois", fips: 17, wac: 41 },
    Airport { id: 14747, market: 30559, code: "SEA", city: "Seattle, WA", state: "WA", state_name: "Washington", fips: 53, wac: 93 },
    Airport { id: 14771, market: 32457, code: "SFO", city: "San Francisco, CA", state: "CA", state_name: "California", fips: 6, wac: 91 },
    Airport { id: 12173, market: 32134, code: "HNL", city: "Honolulu, HI", state: "HI", state_name: "Hawaii", fips: 15, wac: 2 },
];

/// Deterministic records shaped like on-time performance data
///
/// About one in twenty flights was cancelled and has no timing columns.
pub fn synthetic(records: usize, seed: u64) -> Vec<Flight> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..records).map(|_| synthetic_flight(&mut rng)).collect()
}

fn synthetic_flight(rng: &mut StdRng) -> Flight {
    let (carrier, airline_id) = CARRIERS[rng.gen_range(0..CARRIERS.len())];
    let origin = &AIRPORTS[rng.gen_range(0..AIRPORTS.len())];
    let dest = loop {
        let dest = &AIRPORTS[rng.gen_range(0..AIRPORTS.len())];
        if dest.id != origin.id {
            break dest;
        }
    };

    let mut flight = Flight {
        fl_date: Some(format!(
            "2017-{:02}-{:02}",
            rng.gen_range(1..=12),
            rng.gen_range(1..=28)
        )),
        airline_id: Some(airline_id),
        carrier: Some(carrier.to_string()),
        tail_num: rng
            .gen_bool(0.98)
            .then(|| format!("N{}{}", rng.gen_range(100..1000), carrier)),
        fl_num: Some(rng.gen_range(1..7000)),
        origin_airport_id: Some(origin.id),
        origin_airport_seq_id: Some(origin.id * 100 + 3),
        origin_city_market_id: Some(origin.market),
        origin: Some(origin.code.to_string()),
        origin_city_name: Some(origin.city.to_string()),
        origin_state_abr: Some(origin.state.to_string()),
        origin_state_fips: Some(origin.fips),
        origin_state_nm: Some(origin.state_name.to_string()),
        origin_wac: Some(origin.wac),
        dest_airport_id: Some(dest.id),
        dest_airport_seq_id: Some(dest.id * 100 + 3),
        dest_city_market_id: Some(dest.market),
        dest: Some(dest.code.to_string()),
        dest_city_name: Some(dest.city.to_string()),
        dest_state_abr: Some(dest.state.to_string()),
        dest_state_fips: Some(dest.fips),
        dest_state_nm: Some(dest.state_name.to_string()),
        dest_wac: Some(dest.wac),
        distance: Some(rng.gen_range(90..5000) as f64),
        ..Flight::default()
    };

    if rng.gen_bool(0.95) {
        let departure = rng.gen_range(500..2300) as f64;
        let taxi_out = rng.gen_range(5..45) as f64;
        let air_time = rng.gen_range(30..600) as f64;
        flight.dep_delay = Some(rng.gen_range(-15..180) as f64);
        flight.taxi_out = Some(taxi_out);
        flight.wheels_off = Some(departure + taxi_out);
        flight.wheels_on = Some(departure + taxi_out + air_time);
        flight.taxi_in = Some(rng.gen_range(2..30) as f64);
        flight.arr_delay = Some(rng.gen_range(-40..200) as f64);
        flight.air_time = Some(air_time);
    }
    flight
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_is_deterministic() {
        assert_eq!(synthetic(200, 42), synthetic(200, 42));
        assert_ne!(synthetic(200, 42), synthetic(200, 43));
    }

    #[test]
    fn test_synthetic_records_validate() {
        let flights = synthetic(1_000, SEED);
        assert_eq!(flights.len(), 1_000);
        validate(&flights).unwrap();
        assert!(flights.iter().any(|f| f.air_time.is_none()));
        assert!(flights
            .iter()
            .all(|f| f.origin_city_name.as_deref().is_some_and(|c| c.contains(", "))));
    }

    #[test]
    fn test_scratch_path_is_per_process() {
        let scratch = scratch_path(Format::Json);
        let expected = format!("data.json.{}", std::process::id());
        assert_eq!(scratch.file_name().unwrap().to_str(), Some(expected.as_str()));
    }

    #[test]
    fn test_source_csv_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.csv");
        Format::Csv.save(&synthetic(5, 9), &path).unwrap();
        assert_eq!(read_source(&path).unwrap(), synthetic(5, 9));

        let missing = read_source(&dir.path().join("missing.csv"));
        assert!(matches!(missing, Err(FixtureError::Codec { .. })));
    }
}
