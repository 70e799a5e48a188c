//! Batch processing of extracted plate documents.
//!
//! The extraction stage (outside this worker) turns each scanned plate into
//! a JSON document of panels and raw columns. This module drives one run:
//! read each document, merge its columns into schedules, postalize them, and
//! write the results out. A failed document is logged and skipped; the rest
//! of the batch still runs. Cancellation is honored between documents, never
//! in the middle of one.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{PostalConfig, WorkerConfig};
use crate::services::address_book::{create_distance_lookup, AddressBook};
use crate::services::lookup::ReferenceLookup;
use crate::services::merge::{merge_panel, MergeDecisionPolicy, MergedLeg};
use crate::services::postalize::postalize;
use crate::types::frequency::FrequencyCode;
use crate::types::schedule::Schedule;
use crate::types::upart::UPart;

/// One extracted plate, as handed over by the extraction stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlateDocument {
    pub plate_number: String,
    /// Site short name, resolved against the site table.
    pub site: String,
    #[serde(default)]
    pub source_file: Option<String>,
    /// Panels of columns in document order.
    pub panels: Vec<Vec<UPart>>,
    /// Stop name to street address, as printed on the plate.
    #[serde(default)]
    pub addresses: HashMap<String, String>,
}

/// Counts for one batch run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunSummary {
    pub documents: usize,
    pub failed_documents: usize,
    pub schedules: usize,
    pub postalized: usize,
    pub spotters: usize,
    pub cancelled: bool,
}

/// Replay recorded operator answers for one plate; unanswered pairs stay
/// apart.
struct RecordedMerges<'a> {
    lookup: &'a ReferenceLookup,
    plate: &'a str,
}

impl MergeDecisionPolicy for RecordedMerges<'_> {
    fn should_merge(&self, first: &UPart, second: &UPart, _layover: i64) -> bool {
        self.lookup
            .merge_decision(self.plate, first.schedule_number, second.schedule_number)
            .unwrap_or(false)
    }
}

fn schedule_from_leg(
    leg: MergedLeg,
    document: &PlateDocument,
    site: &crate::types::schedule::SiteIdentity,
    lookup: &ReferenceLookup,
    book: &AddressBook,
) -> Option<Schedule> {
    let MergedLeg {
        part,
        vehicle_category,
        flags,
    } = leg;

    let mut extra_flags = Vec::new();
    let (frequency, table_trips) = match lookup.frequency(&part.frequency_code) {
        Some(entry) => (entry.frequency.clone(), Some(entry.annual_trips)),
        None => {
            warn!(
                code = %part.frequency_code,
                plate = %document.plate_number,
                "frequency code not in table, assuming daily service"
            );
            extra_flags.push(format!("Unknown frequency code {}", part.frequency_code));
            (
                FrequencyCode::from_bitstring(&part.frequency_code, "1111111").ok()?,
                None,
            )
        }
    };
    let annual_trips = part.annual_trips.or(table_trips).unwrap_or(0.0);

    let resolver = |name: &str| book.resolve_address(name);
    let stops = UPart::collapse_into_stops(&part.half_stops, &resolver);
    if stops.is_empty() {
        warn!(
            plate = %document.plate_number,
            trip = part.schedule_number,
            "column collapsed to no stops, dropping"
        );
        return None;
    }

    let mut schedule = Schedule::from_hcr_plate(
        &document.plate_number,
        part.schedule_number,
        site.clone(),
        frequency,
        annual_trips,
        part.vehicle_type.clone(),
        vehicle_category,
        part.mileage,
        stops,
    );
    if let Some(file) = &document.source_file {
        schedule.source_file = Some(file.clone());
    }
    for flag in flags.into_iter().chain(extra_flags) {
        schedule.add_flag(flag);
    }
    Some(schedule)
}

/// Process one plate document into postalized schedules.
pub async fn process_document(
    document: PlateDocument,
    cfg: &PostalConfig,
    worker: &WorkerConfig,
    lookup: &ReferenceLookup,
) -> Result<Vec<Schedule>> {
    let site = lookup
        .site(&document.site)
        .with_context(|| format!("unknown site {}", document.site))?
        .clone();

    let book = AddressBook::open(
        &site.short_name,
        &worker.cache_dir,
        document.addresses.clone(),
        create_distance_lookup(worker.matrix_url.as_deref()),
    )?;

    let policy = RecordedMerges {
        lookup,
        plate: &document.plate_number,
    };

    let mut schedules = Vec::new();
    for mut panel in document.panels.clone() {
        // Plates in border territories mix clock zones; each column is read
        // on its first timestamp's clock, and gaps in the arrive/depart
        // alternation are repaired before any pairing happens.
        for part in &mut panel {
            if let Some(target) = part.half_stops.first().map(|h| h.time_zone) {
                for half in &mut part.half_stops {
                    half.normalize_to(target);
                }
            }
            part.repair_missing_times();
        }

        let legs = merge_panel(cfg, lookup, &policy, &document.plate_number, panel);
        for leg in legs {
            if let Some(mut schedule) = schedule_from_leg(leg, &document, &site, lookup, &book) {
                schedule.insource_eligible_check(cfg);
                postalize(&mut schedule, cfg, &book).await;
                schedules.push(schedule);
            }
        }
    }

    book.save()
        .with_context(|| format!("saving trip cache for {}", site.short_name))?;

    info!(
        plate = %document.plate_number,
        schedules = schedules.len(),
        "document processed"
    );
    Ok(schedules)
}

fn read_document(path: &Path) -> Result<PlateDocument> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn write_results(dir: &Path, plate: &str, schedules: &[Schedule]) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(format!("{plate}_schedules.json"));
    let body = serde_json::to_string_pretty(schedules)?;
    std::fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Run the whole batch: every `.json` document in the input directory, in
/// name order.
pub async fn run_batch(
    cfg: &PostalConfig,
    worker: &WorkerConfig,
    lookup: &ReferenceLookup,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    let mut paths: Vec<_> = std::fs::read_dir(&worker.input_dir)
        .with_context(|| format!("reading input dir {}", worker.input_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
        .collect();
    paths.sort();

    let mut summary = RunSummary::default();

    for path in paths {
        if cancel.is_cancelled() {
            info!("cancellation requested, stopping between documents");
            summary.cancelled = true;
            break;
        }

        let document = match read_document(&path) {
            Ok(document) => document,
            Err(e) => {
                error!(path = %path.display(), error = %e, "skipping unreadable document");
                summary.failed_documents += 1;
                continue;
            }
        };
        let plate = document.plate_number.clone();

        match process_document(document, cfg, worker, lookup).await {
            Ok(schedules) => {
                summary.documents += 1;
                summary.schedules += schedules.len();
                summary.postalized += schedules.iter().filter(|s| s.is_postalized).count();
                summary.spotters += schedules.iter().filter(|s| s.is_spotter_schedule).count();
                write_results(&worker.output_dir, &plate, &schedules)?;
            }
            Err(e) => {
                error!(plate = %plate, error = %e, "document failed");
                summary.failed_documents += 1;
            }
        }
    }

    lookup
        .save_decisions()
        .context("saving merge decisions")?;

    info!(
        documents = summary.documents,
        failed = summary.failed_documents,
        schedules = summary.schedules,
        postalized = summary.postalized,
        "batch complete"
    );
    Ok(summary)
}
