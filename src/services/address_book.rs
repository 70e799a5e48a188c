//! Street addresses and travel estimates between stops.
//!
//! Uses an external distance-matrix service for live estimates, a per-site
//! CSV cache so repeated runs never re-query the same pair, and flat
//! fallback constants when the service is unreachable. Travel lookups never
//! fail: a schedule with a slightly wrong travel estimate is still useful, a
//! schedule that aborted postalization is not.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Fallback when the matrix service cannot answer: one mile, ten minutes.
pub const FALLBACK_DISTANCE_M: f64 = 1609.0;
pub const FALLBACK_DURATION_S: f64 = 600.0;

const METERS_PER_MILE: f64 = 1609.0;

/// One travel estimate between two addresses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripEstimate {
    pub meters: f64,
    pub seconds: f64,
}

impl TripEstimate {
    pub fn fallback() -> Self {
        Self {
            meters: FALLBACK_DISTANCE_M,
            seconds: FALLBACK_DURATION_S,
        }
    }

    /// Whole travel minutes for schedule arithmetic, never less than one.
    pub fn travel_minutes(&self) -> i64 {
        ((self.seconds / 60.0).ceil() as i64).max(1)
    }

    pub fn miles(&self) -> f64 {
        self.meters / METERS_PER_MILE
    }
}

/// Distance service trait for abstraction (HTTP matrix service, mock, etc.)
#[async_trait]
pub trait DistanceLookup: Send + Sync {
    /// Estimate the driving trip from one street address to another.
    async fn trip(&self, from_address: &str, to_address: &str) -> Result<TripEstimate>;

    /// Get service name for logging
    fn name(&self) -> &str;
}

/// HTTP client for the distance-matrix service.
pub struct MatrixClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct MatrixRequest<'a> {
    from: &'a str,
    to: &'a str,
}

#[derive(Deserialize)]
struct MatrixResponse {
    distance_m: f64,
    duration_s: f64,
}

impl MatrixClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("building matrix HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl DistanceLookup for MatrixClient {
    async fn trip(&self, from_address: &str, to_address: &str) -> Result<TripEstimate> {
        let url = format!("{}/route", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&MatrixRequest {
                from: from_address,
                to: to_address,
            })
            .send()
            .await
            .context("matrix service request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("matrix service returned status {}", response.status());
        }

        let body: MatrixResponse = response
            .json()
            .await
            .context("matrix service returned malformed body")?;

        Ok(TripEstimate {
            meters: body.distance_m,
            seconds: body.duration_s,
        })
    }

    fn name(&self) -> &str {
        "Matrix"
    }
}

/// Mock distance service for tests: fixed table, fallback for unknown pairs.
#[derive(Default)]
pub struct FixedDistanceLookup {
    trips: HashMap<(String, String), TripEstimate>,
}

impl FixedDistanceLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trip(mut self, from: &str, to: &str, meters: f64, seconds: f64) -> Self {
        self.trips
            .insert((from.to_string(), to.to_string()), TripEstimate { meters, seconds });
        self
    }
}

#[async_trait]
impl DistanceLookup for FixedDistanceLookup {
    async fn trip(&self, from_address: &str, to_address: &str) -> Result<TripEstimate> {
        self.trips
            .get(&(from_address.to_string(), to_address.to_string()))
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no fixed trip from {from_address} to {to_address}"))
    }

    fn name(&self) -> &str {
        "FixedDistance"
    }
}

/// Create a distance service based on configuration.
pub fn create_distance_lookup(matrix_url: Option<&str>) -> Box<dyn DistanceLookup> {
    match matrix_url {
        Some(url) => match MatrixClient::new(url) {
            Ok(client) => {
                info!(url, "using matrix distance service");
                Box::new(client)
            }
            Err(e) => {
                warn!(error = %e, "matrix client unusable, falling back to fixed estimates");
                Box::new(FixedDistanceLookup::new())
            }
        },
        None => {
            info!("no matrix service configured, using fixed estimates");
            Box::new(FixedDistanceLookup::new())
        }
    }
}

/// CSV row of the per-site trip cache.
#[derive(Debug, Serialize, Deserialize)]
struct TripRecord {
    from: String,
    to: String,
    meters: f64,
    seconds: f64,
}

/// Per-site address table plus a persistent cache of travel estimates.
pub struct AddressBook {
    /// Stop name to street address.
    addresses: HashMap<String, String>,
    cache: Mutex<HashMap<(String, String), TripEstimate>>,
    cache_path: PathBuf,
    lookup: Box<dyn DistanceLookup>,
}

impl AddressBook {
    /// Open the book for one site, loading any cached trips from earlier
    /// runs.
    pub fn open(
        site_short_name: &str,
        cache_dir: &Path,
        addresses: HashMap<String, String>,
        lookup: Box<dyn DistanceLookup>,
    ) -> Result<Self> {
        let cache_path = cache_dir.join(format!("{}_trips.csv", site_short_name));
        let mut cache = HashMap::new();

        if cache_path.exists() {
            let mut reader = csv::Reader::from_path(&cache_path)
                .with_context(|| format!("opening trip cache {}", cache_path.display()))?;
            for record in reader.deserialize() {
                let record: TripRecord = record.context("malformed trip cache row")?;
                cache.insert(
                    (record.from, record.to),
                    TripEstimate {
                        meters: record.meters,
                        seconds: record.seconds,
                    },
                );
            }
            info!(
                site = site_short_name,
                trips = cache.len(),
                "loaded trip cache"
            );
        }

        Ok(Self {
            addresses,
            cache: Mutex::new(cache),
            cache_path,
            lookup,
        })
    }

    /// Street address for a stop name, if the site's table knows it.
    pub fn resolve_address(&self, stop_name: &str) -> Option<String> {
        self.addresses.get(stop_name).cloned()
    }

    pub fn has_trip(&self, from: &str, to: &str) -> bool {
        self.cache
            .lock()
            .contains_key(&(from.to_string(), to.to_string()))
    }

    /// Travel estimate between two stop names. Cache first, then the
    /// service; any failure (unknown address, service down) degrades to the
    /// fallback constants so postalization always proceeds.
    pub async fn trip(&self, from: &str, to: &str) -> TripEstimate {
        let key = (from.to_string(), to.to_string());
        if let Some(hit) = self.cache.lock().get(&key) {
            return *hit;
        }

        let estimate = match (self.resolve_address(from), self.resolve_address(to)) {
            (Some(from_addr), Some(to_addr)) => {
                match self.lookup.trip(&from_addr, &to_addr).await {
                    Ok(estimate) => {
                        debug!(from, to, service = self.lookup.name(), "fetched trip estimate");
                        estimate
                    }
                    Err(e) => {
                        warn!(from, to, error = %e, "distance service failed, using fallback trip");
                        TripEstimate::fallback()
                    }
                }
            }
            _ => {
                warn!(from, to, "address unknown, using fallback trip");
                TripEstimate::fallback()
            }
        };

        self.cache.lock().insert(key, estimate);
        estimate
    }

    /// Persist the cache for the next run.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating cache dir {}", parent.display()))?;
        }
        let mut writer = csv::Writer::from_path(&self.cache_path)
            .with_context(|| format!("writing trip cache {}", self.cache_path.display()))?;

        let cache = self.cache.lock();
        let mut rows: Vec<(&(String, String), &TripEstimate)> = cache.iter().collect();
        rows.sort_by(|a, b| a.0.cmp(b.0));
        for ((from, to), estimate) in rows {
            writer.serialize(TripRecord {
                from: from.clone(),
                to: to.clone(),
                meters: estimate.meters,
                seconds: estimate.seconds,
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addresses() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(
            "SPRINGFIELD P&DC".to_string(),
            "US POSTAL SERVICE, 1 DEPOT WAY".to_string(),
        );
        map.insert(
            "MAIN ST STATION".to_string(),
            "US POSTAL SERVICE, 100 MAIN ST".to_string(),
        );
        map
    }

    fn book(dir: &Path, lookup: Box<dyn DistanceLookup>) -> AddressBook {
        AddressBook::open("SPRINGFIELD", dir, addresses(), lookup).unwrap()
    }

    #[test]
    fn travel_minutes_round_up_with_a_floor() {
        let estimate = TripEstimate { meters: 5000.0, seconds: 610.0 };
        assert_eq!(estimate.travel_minutes(), 11);

        let short = TripEstimate { meters: 100.0, seconds: 10.0 };
        assert_eq!(short.travel_minutes(), 1);

        assert_eq!(TripEstimate::fallback().travel_minutes(), 10);
        assert!((TripEstimate::fallback().miles() - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn trip_fetched_then_cached() {
        let dir = tempfile::tempdir().unwrap();
        let lookup = FixedDistanceLookup::new().with_trip(
            "US POSTAL SERVICE, 1 DEPOT WAY",
            "US POSTAL SERVICE, 100 MAIN ST",
            3218.0,
            900.0,
        );
        let book = book(dir.path(), Box::new(lookup));

        assert!(!book.has_trip("SPRINGFIELD P&DC", "MAIN ST STATION"));
        let trip = book.trip("SPRINGFIELD P&DC", "MAIN ST STATION").await;
        assert_eq!(trip.travel_minutes(), 15);
        assert!((trip.miles() - 2.0).abs() < 1e-9);
        assert!(book.has_trip("SPRINGFIELD P&DC", "MAIN ST STATION"));
    }

    #[tokio::test]
    async fn unknown_address_degrades_to_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let book = book(dir.path(), Box::new(FixedDistanceLookup::new()));

        let trip = book.trip("SPRINGFIELD P&DC", "NOWHERE ANNEX").await;
        assert_eq!(trip, TripEstimate::fallback());
    }

    #[tokio::test]
    async fn service_failure_degrades_to_fallback() {
        let dir = tempfile::tempdir().unwrap();
        // Known addresses but an empty table: the service errors.
        let book = book(dir.path(), Box::new(FixedDistanceLookup::new()));

        let trip = book.trip("SPRINGFIELD P&DC", "MAIN ST STATION").await;
        assert_eq!(trip, TripEstimate::fallback());
    }

    #[tokio::test]
    async fn cache_round_trips_through_csv() {
        let dir = tempfile::tempdir().unwrap();
        let lookup = FixedDistanceLookup::new().with_trip(
            "US POSTAL SERVICE, 1 DEPOT WAY",
            "US POSTAL SERVICE, 100 MAIN ST",
            3218.0,
            900.0,
        );
        let book = book(dir.path(), Box::new(lookup));
        book.trip("SPRINGFIELD P&DC", "MAIN ST STATION").await;
        book.save().unwrap();

        // A fresh book with no service still answers from the cache.
        let reloaded = AddressBook::open(
            "SPRINGFIELD",
            dir.path(),
            addresses(),
            Box::new(FixedDistanceLookup::new()),
        )
        .unwrap();
        assert!(reloaded.has_trip("SPRINGFIELD P&DC", "MAIN ST STATION"));
        let trip = reloaded.trip("SPRINGFIELD P&DC", "MAIN ST STATION").await;
        assert_eq!(trip.travel_minutes(), 15);
    }
}
