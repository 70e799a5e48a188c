//! Reference tables backing extraction and merging.
//!
//! Four CSV-backed tables, all per deployment rather than per site:
//! frequency codes (code to operating days and annual trip count), switch
//! codes (known cross-midnight code pairs and their combined code), recorded
//! merge decisions (operator answers replayed on later runs), and site
//! identities (facility naming per site).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::services::merge::MergeTables;
use crate::types::frequency::FrequencyCode;
use crate::types::schedule::SiteIdentity;

/// One row of the frequency-code table.
#[derive(Debug, Clone)]
pub struct FrequencyEntry {
    pub frequency: FrequencyCode,
    pub annual_trips: f64,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FrequencyRow {
    code: String,
    bits: String,
    annual_trips: f64,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SwitchRow {
    first: String,
    second: String,
    combined: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct DecisionRow {
    plate: String,
    first_trip: i64,
    second_trip: i64,
    merge: bool,
}

#[derive(Debug, Deserialize)]
struct SiteRow {
    short_name: String,
    pvs_name: String,
    pdc_name: String,
    #[serde(default)]
    hcr_pdc_name: Option<String>,
    #[serde(default)]
    pdc_address: Option<String>,
}

fn pad_code(code: &str) -> String {
    format!("{:0>4}", code.trim())
}

/// The loaded reference tables. The decision table is the only one that
/// changes at runtime; it is appended to as operators answer merge
/// questions and written back with [`ReferenceLookup::save_decisions`].
pub struct ReferenceLookup {
    frequencies: HashMap<String, FrequencyEntry>,
    switch_codes: HashMap<(String, String), String>,
    sites: HashMap<String, SiteIdentity>,
    decisions: Mutex<HashMap<(String, i64, i64), bool>>,
    decisions_path: PathBuf,
}

fn read_rows<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row.with_context(|| format!("malformed row in {}", path.display()))?);
    }
    Ok(rows)
}

impl ReferenceLookup {
    /// Load every table found under `dir`. Missing files load as empty
    /// tables with a warning; a present-but-broken file is an error.
    pub fn open(dir: &Path) -> Result<Self> {
        let mut frequencies = HashMap::new();
        let freq_path = dir.join("frequency_codes.csv");
        if freq_path.exists() {
            for row in read_rows::<FrequencyRow>(&freq_path)? {
                let frequency = match FrequencyCode::from_bitstring(&row.code, &row.bits) {
                    Ok(frequency) => frequency,
                    Err(e) => {
                        warn!(code = %row.code, error = %e, "skipping bad frequency row");
                        continue;
                    }
                };
                frequencies.insert(
                    pad_code(&row.code),
                    FrequencyEntry {
                        frequency,
                        annual_trips: row.annual_trips,
                        description: row.description,
                    },
                );
            }
        } else {
            warn!(path = %freq_path.display(), "no frequency-code table");
        }

        let mut switch_codes = HashMap::new();
        let switch_path = dir.join("switch_codes.csv");
        if switch_path.exists() {
            for row in read_rows::<SwitchRow>(&switch_path)? {
                switch_codes.insert(
                    (pad_code(&row.first), pad_code(&row.second)),
                    pad_code(&row.combined),
                );
            }
        }

        let mut sites = HashMap::new();
        let sites_path = dir.join("sites.csv");
        if sites_path.exists() {
            for row in read_rows::<SiteRow>(&sites_path)? {
                sites.insert(
                    row.short_name.clone(),
                    SiteIdentity {
                        pvs_name: row.pvs_name,
                        pdc_name: row.pdc_name,
                        hcr_pdc_name: row.hcr_pdc_name,
                        short_name: row.short_name,
                        pdc_address: row.pdc_address,
                    },
                );
            }
        } else {
            warn!(path = %sites_path.display(), "no site table");
        }

        let mut decisions = HashMap::new();
        let decisions_path = dir.join("merge_decisions.csv");
        if decisions_path.exists() {
            for row in read_rows::<DecisionRow>(&decisions_path)? {
                decisions.insert((row.plate, row.first_trip, row.second_trip), row.merge);
            }
        }

        info!(
            frequencies = frequencies.len(),
            switch_codes = switch_codes.len(),
            sites = sites.len(),
            decisions = decisions.len(),
            "reference tables loaded"
        );

        Ok(Self {
            frequencies,
            switch_codes,
            sites,
            decisions: Mutex::new(decisions),
            decisions_path,
        })
    }

    /// Frequency entry for a raw code, zero-padded before lookup.
    pub fn frequency(&self, code: &str) -> Option<&FrequencyEntry> {
        self.frequencies.get(&pad_code(code))
    }

    /// Site identity for a site short name.
    pub fn site(&self, short_name: &str) -> Option<&SiteIdentity> {
        self.sites.get(short_name)
    }

    /// A previously recorded answer for this column pair, if any.
    pub fn merge_decision(&self, plate: &str, first_trip: i64, second_trip: i64) -> Option<bool> {
        self.decisions
            .lock()
            .get(&(plate.to_string(), first_trip, second_trip))
            .copied()
    }

    /// Record an operator's answer so later runs replay it. The batch worker
    /// never asks; answers enter the table through the interactive review
    /// tool, which writes rows here and persists them with
    /// [`save_decisions`]. The worker only replays and re-saves.
    ///
    /// [`save_decisions`]: ReferenceLookup::save_decisions
    pub fn record_merge_decision(
        &self,
        plate: &str,
        first_trip: i64,
        second_trip: i64,
        merge: bool,
    ) {
        self.decisions
            .lock()
            .insert((plate.to_string(), first_trip, second_trip), merge);
    }

    /// Write the decision table back to disk.
    pub fn save_decisions(&self) -> Result<()> {
        if let Some(parent) = self.decisions_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut writer = csv::Writer::from_path(&self.decisions_path)
            .with_context(|| format!("writing {}", self.decisions_path.display()))?;

        let decisions = self.decisions.lock();
        let mut rows: Vec<(&(String, i64, i64), &bool)> = decisions.iter().collect();
        rows.sort();
        for ((plate, first_trip, second_trip), merge) in rows {
            writer.serialize(DecisionRow {
                plate: plate.clone(),
                first_trip: *first_trip,
                second_trip: *second_trip,
                merge: *merge,
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl MergeTables for ReferenceLookup {
    fn switch_code(&self, first_code: &str, second_code: &str) -> Option<String> {
        self.switch_codes
            .get(&(pad_code(first_code), pad_code(second_code)))
            .cloned()
    }

    fn is_rejected_pair(&self, plate: &str, first_trip: i64, second_trip: i64) -> bool {
        self.merge_decision(plate, first_trip, second_trip) == Some(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    fn seeded_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "frequency_codes.csv",
            "code,bits,annual_trips,description\n\
             0110,1111100,255,Monday through Friday\n\
             17,0000011,104,Weekends\n\
             0901,00000001,6,Holidays only\n",
        );
        write_file(
            dir.path(),
            "switch_codes.csv",
            "first,second,combined\n0135,0246,0136\n",
        );
        write_file(
            dir.path(),
            "sites.csv",
            "short_name,pvs_name,pdc_name,hcr_pdc_name,pdc_address\n\
             SPRINGFIELD,SPRINGFIELD PVS,SPRINGFIELD P&DC,SPRINGFIELD PROC & DIST CTR,\"US POSTAL SERVICE, 1 DEPOT WAY\"\n",
        );
        dir
    }

    #[test]
    fn frequency_lookup_pads_codes() {
        let dir = seeded_dir();
        let lookup = ReferenceLookup::open(dir.path()).unwrap();

        let entry = lookup.frequency("110").unwrap();
        assert_eq!(entry.frequency.code, "0110");
        assert!((entry.annual_trips - 255.0).abs() < 1e-9);
        assert_eq!(entry.description.as_deref(), Some("Monday through Friday"));

        // Stored as "17", looked up padded either way.
        assert!(lookup.frequency("0017").is_some());
        assert!(lookup.frequency("9999").is_none());
    }

    #[test]
    fn holiday_bit_survives_the_table() {
        let dir = seeded_dir();
        let lookup = ReferenceLookup::open(dir.path()).unwrap();
        assert!(lookup.frequency("0901").unwrap().frequency.is_holiday);
    }

    #[test]
    fn site_identity_resolves() {
        let dir = seeded_dir();
        let lookup = ReferenceLookup::open(dir.path()).unwrap();

        let site = lookup.site("SPRINGFIELD").unwrap();
        assert_eq!(site.pvs_name, "SPRINGFIELD PVS");
        assert_eq!(
            site.hcr_pdc_name.as_deref(),
            Some("SPRINGFIELD PROC & DIST CTR")
        );
        assert!(!site.same_name());
        assert!(lookup.site("NOWHERE").is_none());
    }

    #[test]
    fn switch_codes_resolve_padded() {
        let dir = seeded_dir();
        let lookup = ReferenceLookup::open(dir.path()).unwrap();
        assert_eq!(lookup.switch_code("135", "246").as_deref(), Some("0136"));
        assert_eq!(lookup.switch_code("0110", "0017"), None);
    }

    #[test]
    fn missing_tables_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let lookup = ReferenceLookup::open(dir.path()).unwrap();
        assert!(lookup.frequency("0110").is_none());
        assert_eq!(lookup.merge_decision("75101", 5, 6), None);
    }

    #[test]
    fn decisions_record_and_replay() {
        let dir = seeded_dir();
        {
            let lookup = ReferenceLookup::open(dir.path()).unwrap();
            lookup.record_merge_decision("75101", 5, 6, true);
            lookup.record_merge_decision("75101", 9, 10, false);
            lookup.save_decisions().unwrap();
        }

        let lookup = ReferenceLookup::open(dir.path()).unwrap();
        assert_eq!(lookup.merge_decision("75101", 5, 6), Some(true));
        assert!(lookup.is_rejected_pair("75101", 9, 10));
        assert!(!lookup.is_rejected_pair("75101", 5, 6));
        assert!(!lookup.is_rejected_pair("75101", 7, 8));
    }
}
