//! Configuration management

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

/// Tunable postalization parameters. Every value has an operational default;
/// any of them can be overridden from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostalConfig {
    /// Minutes a vehicle sits at the vehicle-service facility at the start
    /// and end of a schedule.
    pub pvs_time: i64,

    /// Minutes a vehicle sits at the partner processing facility.
    pub pdc_time: i64,

    /// Travel minutes between the vehicle-service facility and the partner
    /// facility when they are separate sites.
    pub pvs_to_pdc_time: i64,

    /// Required lunch layover, minutes.
    pub lunch_duration: i64,

    /// Longest work segment allowed without a lunch, hours.
    pub hours_without_lunch: i64,

    /// Travel minutes to and from an inserted lunch location.
    pub lunch_travel_time: i64,

    /// Slack minutes demanded around an inserted lunch.
    pub lunch_buffer_time: i64,

    /// Whether lunch may be taken at non-postal locations.
    pub allow_non_postal_lunch: bool,

    /// In-house duty ceiling, hours.
    pub max_duration_hours: i64,

    /// In-house mileage ceiling per schedule occurrence.
    pub max_mileage: f64,

    /// Night differential starts at this wall-clock time.
    pub night_diff_start: NaiveTime,

    /// Night differential ends at this wall-clock time.
    pub night_diff_end: NaiveTime,

    /// Legs closer together than this merge without asking.
    pub merge_min_layover: i64,

    /// Legs farther apart than this never merge.
    pub merge_max_layover: i64,

    /// A merged schedule longer than this is rejected outright.
    pub merge_max_combined: i64,

    /// When set, differing-code leg pairs skip the layover thresholds and
    /// the tight-gap shortcut and always go to the decision policy.
    pub strict_merge: bool,

    /// Start of staffing tour one; the continuous-minute axis anchors here.
    pub tour_one_time: NaiveTime,

    /// Normalized boundary layover for round trips, minutes.
    pub round_time: i64,
}

impl Default for PostalConfig {
    fn default() -> Self {
        Self {
            pvs_time: 14,
            pdc_time: 10,
            pvs_to_pdc_time: 1,
            lunch_duration: 30,
            hours_without_lunch: 6,
            lunch_travel_time: 5,
            lunch_buffer_time: 10,
            allow_non_postal_lunch: true,
            max_duration_hours: 8,
            max_mileage: 350.0,
            night_diff_start: hm(18, 0),
            night_diff_end: hm(6, 0),
            merge_min_layover: 60,
            merge_max_layover: 480,
            merge_max_combined: 1440,
            strict_merge: false,
            tour_one_time: hm(20, 0),
            round_time: 15,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, fallback: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{key}={raw} is invalid: {e}")),
        Err(_) => Ok(fallback),
    }
}

fn env_time(key: &str, fallback: NaiveTime) -> Result<NaiveTime> {
    match std::env::var(key) {
        Ok(raw) => NaiveTime::parse_from_str(&raw, "%H:%M")
            .with_context(|| format!("{key}={raw} is not an HH:MM time")),
        Err(_) => Ok(fallback),
    }
}

impl PostalConfig {
    /// Load parameters from the environment, falling back to the defaults.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let d = Self::default();
        Ok(Self {
            pvs_time: env_parse("POSTAL_PVS_TIME", d.pvs_time)?,
            pdc_time: env_parse("POSTAL_PDC_TIME", d.pdc_time)?,
            pvs_to_pdc_time: env_parse("POSTAL_PVS_TO_PDC_TIME", d.pvs_to_pdc_time)?,
            lunch_duration: env_parse("POSTAL_LUNCH_DURATION", d.lunch_duration)?,
            hours_without_lunch: env_parse("POSTAL_HOURS_WITHOUT_LUNCH", d.hours_without_lunch)?,
            lunch_travel_time: env_parse("POSTAL_LUNCH_TRAVEL_TIME", d.lunch_travel_time)?,
            lunch_buffer_time: env_parse("POSTAL_LUNCH_BUFFER_TIME", d.lunch_buffer_time)?,
            allow_non_postal_lunch: env_parse(
                "POSTAL_ALLOW_NON_POSTAL_LUNCH",
                d.allow_non_postal_lunch,
            )?,
            max_duration_hours: env_parse("POSTAL_MAX_DURATION_HOURS", d.max_duration_hours)?,
            max_mileage: env_parse("POSTAL_MAX_MILEAGE", d.max_mileage)?,
            night_diff_start: env_time("POSTAL_NIGHT_DIFF_START", d.night_diff_start)?,
            night_diff_end: env_time("POSTAL_NIGHT_DIFF_END", d.night_diff_end)?,
            merge_min_layover: env_parse("POSTAL_MERGE_MIN_LAYOVER", d.merge_min_layover)?,
            merge_max_layover: env_parse("POSTAL_MERGE_MAX_LAYOVER", d.merge_max_layover)?,
            merge_max_combined: env_parse("POSTAL_MERGE_MAX_COMBINED", d.merge_max_combined)?,
            strict_merge: env_parse("POSTAL_STRICT_MERGE", d.strict_merge)?,
            tour_one_time: env_time("POSTAL_TOUR_ONE_TIME", d.tour_one_time)?,
            round_time: env_parse("POSTAL_ROUND_TIME", d.round_time)?,
        })
    }

    /// Lunch layover plus the travel to and from the lunch location.
    pub fn lunch_block(&self) -> i64 {
        self.lunch_duration + 2 * self.lunch_travel_time
    }

    /// Total minutes an inserted lunch adds to a schedule, buffer included.
    pub fn lunch_footprint(&self) -> i64 {
        self.lunch_block() + self.lunch_buffer_time
    }
}

/// Worker runtime configuration: where documents come from and where results
/// go. Separate from the postalization parameters so the engine stays usable
/// as a library.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory scanned for plate documents.
    pub input_dir: std::path::PathBuf,

    /// Directory results are written under.
    pub output_dir: std::path::PathBuf,

    /// Trip cache CSV location, one file per site.
    pub cache_dir: std::path::PathBuf,

    /// Reference table CSVs (frequency codes, switch codes, sites).
    pub tables_dir: std::path::PathBuf,

    /// Distance-matrix service URL (optional, falls back to constants if
    /// unavailable).
    pub matrix_url: Option<String>,
}

impl WorkerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let input_dir = std::env::var("POSTAL_INPUT_DIR")
            .context("POSTAL_INPUT_DIR must be set")?
            .into();
        let output_dir = std::env::var("POSTAL_OUTPUT_DIR")
            .unwrap_or_else(|_| "output".to_string())
            .into();
        let cache_dir = std::env::var("POSTAL_CACHE_DIR")
            .unwrap_or_else(|_| "cache".to_string())
            .into();
        let tables_dir = std::env::var("POSTAL_TABLES_DIR")
            .unwrap_or_else(|_| "tables".to_string())
            .into();
        let matrix_url = std::env::var("POSTAL_MATRIX_URL").ok();

        Ok(Self {
            input_dir,
            output_dir,
            cache_dir,
            tables_dir,
            matrix_url,
        })
    }
}
