//! Reworking contract schedules into postal-compliant ones.
//!
//! Postalization takes a merged schedule as read from its source document
//! and reshapes it to the operating rules for in-house service: depot legs
//! at both ends with the configured handling times, a minute of travel
//! between every stop, a lunch once the day is long enough, and a ceiling on
//! paid time. The checks live in [`postal_compliance_check`]; the mutation
//! lives in [`postalize`]; [`postal_compliance_possible`] answers "would it
//! work" without touching the schedule.

use tracing::{debug, info, warn};

use crate::config::PostalConfig;
use crate::services::address_book::AddressBook;
use crate::services::clock::{add_minutes, duration};
use crate::services::round_trips::decompose_into_round_trips;
use crate::types::schedule::Schedule;
use crate::types::stop::Stop;

pub const REASON_LAYOVER: &str = "Layover";
pub const REASON_TRAVEL: &str = "Travel";
pub const REASON_START: &str = "Start";
pub const REASON_END: &str = "End";
pub const REASON_LUNCH: &str = "Lunch";
pub const REASON_LUNCH_IMPOSSIBLE: &str = "Lunch Impossible";
pub const REASON_DURATION: &str = "Duration";

/// Check a schedule against the in-house operating rules. Returns every
/// failed rule, empty when compliant. The start/end rules are skipped for
/// spotter schedules, which never leave the yard.
pub fn postal_compliance_check(schedule: &Schedule, cfg: &PostalConfig) -> Vec<String> {
    let mut reasons = Vec::new();
    let stops = &schedule.stops;

    if stops.is_empty() {
        return vec![REASON_START.to_string()];
    }

    if !stops.iter().all(Stop::has_valid_layover) {
        reasons.push(REASON_LAYOVER.to_string());
    }

    if stops
        .windows(2)
        .any(|w| duration(w[0].depart_time, w[1].arrive_time) < 1)
    {
        reasons.push(REASON_TRAVEL.to_string());
    }

    if !schedule.is_spotter_schedule {
        if !start_compliant(schedule, cfg) {
            reasons.push(REASON_START.to_string());
        }
        if !end_compliant(schedule, cfg) {
            reasons.push(REASON_END.to_string());
        }
    }

    let dur = schedule.raw_duration();
    let limit = cfg.hours_without_lunch * 60;
    if dur < limit {
        // Short enough to run straight through.
    } else if dur <= cfg.lunch_duration + 2 * limit {
        if !schedule.has_good_lunch(cfg) {
            reasons.push(REASON_LUNCH.to_string());
        }
    } else {
        debug!(schedule = %schedule.schedule_name, dur, "too long for any lunch placement");
        reasons.push(REASON_DURATION.to_string());
    }

    let lunch_minutes: i64 = stops.iter().filter(|s| s.is_lunch()).map(Stop::layover).sum();
    if dur - lunch_minutes > cfg.max_duration_hours * 60 {
        if !reasons.iter().any(|r| r == REASON_DURATION) {
            reasons.push(REASON_DURATION.to_string());
        }
    }

    reasons
}

fn start_compliant(schedule: &Schedule, cfg: &PostalConfig) -> bool {
    let stops = &schedule.stops;
    let site = &schedule.site;
    if site.same_name() {
        let Some(first) = stops.first() else {
            return false;
        };
        first.stop_name == site.pvs_name
            && first.layover() == cfg.pvs_time + cfg.pdc_time + cfg.pvs_to_pdc_time
    } else {
        if stops.len() < 2 {
            return false;
        }
        stops[0].stop_name == site.pvs_name
            && stops[0].layover() >= cfg.pvs_time
            && site.pdc_names().contains(&stops[1].stop_name.as_str())
            && stops[1].layover() >= cfg.pdc_time
    }
}

fn end_compliant(schedule: &Schedule, cfg: &PostalConfig) -> bool {
    let stops = &schedule.stops;
    let site = &schedule.site;
    if site.same_name() {
        let Some(last) = stops.last() else {
            return false;
        };
        last.stop_name == site.pvs_name
            && last.layover() == cfg.pvs_time + cfg.pdc_time + cfg.pvs_to_pdc_time
    } else {
        if stops.len() < 2 {
            return false;
        }
        let last = &stops[stops.len() - 1];
        let next_to_last = &stops[stops.len() - 2];
        last.stop_name == site.pvs_name
            && last.layover() >= cfg.pvs_time
            && site.pdc_names().contains(&next_to_last.stop_name.as_str())
            && next_to_last.layover() >= cfg.pdc_time
    }
}

/// Minutes from schedule start for each stop's arrival and departure.
fn offsets(stops: &[Stop]) -> Vec<(i64, i64)> {
    let mut out = Vec::with_capacity(stops.len());
    let mut clock = 0;
    for (i, stop) in stops.iter().enumerate() {
        if i > 0 {
            clock += duration(stops[i - 1].depart_time, stop.arrive_time);
        }
        let arrive = clock;
        clock += stop.layover();
        out.push((arrive, clock));
    }
    out
}

struct LunchPlan {
    host_index: usize,
    lunch_start_offset: i64,
    pushback: i64,
}

fn plan_lunch(schedule: &Schedule, cfg: &PostalConfig) -> Option<LunchPlan> {
    let stops = &schedule.stops;
    if stops.len() < 3 {
        return None;
    }

    let dur = schedule.raw_duration();
    let limit = cfg.hours_without_lunch * 60;
    let travel = cfg.lunch_travel_time.max(1);
    // Travel out and back, the lunch itself, and a minute of dwell left on
    // each half of the split host stop.
    let required = cfg.lunch_duration + 2 * travel + 2;

    let offs = offsets(stops);
    let mut candidates: Vec<(i64, bool, i64, usize, i64)> = Vec::new();

    for (i, stop) in stops.iter().enumerate().skip(1) {
        if i == stops.len() - 1 || stop.is_lunch() {
            continue;
        }
        if !stop.is_postal_location && !cfg.allow_non_postal_lunch {
            continue;
        }

        let layover = stop.layover();
        let pushback = (required - layover).max(0);
        let new_dur = dur + pushback;
        let (arrive_off, _) = offs[i];

        let window_lo = (arrive_off + 1 + travel).max(new_dur - limit - cfg.lunch_duration);
        let window_hi =
            (arrive_off + layover + pushback - 1 - travel - cfg.lunch_duration).min(limit);
        if window_lo > window_hi {
            continue;
        }

        // Prefer placements that do not stretch the day, then postal
        // locations, then the roomiest layover.
        candidates.push((pushback, !stop.is_postal_location, -layover, i, window_lo));
    }

    candidates.sort();
    let &(pushback, _, _, host_index, lunch_start_offset) = candidates.first()?;

    Some(LunchPlan {
        host_index,
        lunch_start_offset,
        pushback,
    })
}

/// Carve a lunch into the schedule. The roomiest feasible layover is split
/// around a LUNCH stop with travel on both sides; when no layover is big
/// enough, downstream stops are pushed back to make room and the whole
/// schedule re-centered by half the pushback. Returns false when no
/// placement satisfies both work-segment limits.
pub fn add_a_lunch(schedule: &mut Schedule, cfg: &PostalConfig) -> bool {
    if schedule.has_good_lunch(cfg) {
        return true;
    }

    let Some(plan) = plan_lunch(schedule, cfg) else {
        warn!(schedule = %schedule.schedule_name, "no feasible lunch placement");
        return false;
    };

    let travel = cfg.lunch_travel_time.max(1);
    let i = plan.host_index;
    let offs = offsets(&schedule.stops);
    let (arrive_off, depart_off) = offs[i];

    let host = &schedule.stops[i];
    let host_name = host.stop_name.clone();
    let host_postal = host.is_postal_location;
    let host_arrive = host.arrive_time;

    // First half of the host dwell ends a travel leg before the lunch.
    let first_half = plan.lunch_start_offset - travel - arrive_off;
    let first_depart = add_minutes(host_arrive, first_half);

    let lunch_arrive = add_minutes(first_depart, travel);
    let lunch_depart = add_minutes(lunch_arrive, cfg.lunch_duration);

    let second_arrive = add_minutes(lunch_depart, travel);
    // Second half keeps whatever dwell the original departure (pushed back
    // if needed) leaves.
    let second_depart_off = depart_off + plan.pushback;
    let second_dwell = second_depart_off - (plan.lunch_start_offset + cfg.lunch_duration + travel);
    let second_depart = add_minutes(second_arrive, second_dwell);

    schedule.stops[i].depart_time = first_depart;

    let mut lunch = Stop::new(lunch_arrive, lunch_depart, "LUNCH");
    lunch.is_postal_location = host_postal;

    let mut second_half = Stop::new(second_arrive, second_depart, host_name);
    second_half.is_postal_location = host_postal;

    schedule.stops.insert(i + 1, lunch);
    schedule.stops.insert(i + 2, second_half);

    if plan.pushback > 0 {
        for stop in &mut schedule.stops[i + 3..] {
            stop.shift(plan.pushback);
        }
        // Re-center so the start and end each move half the added time.
        let recenter = plan.pushback / 2;
        for stop in &mut schedule.stops {
            stop.shift(-recenter);
        }
    }

    info!(
        schedule = %schedule.schedule_name,
        host = i,
        pushback = plan.pushback,
        "inserted lunch"
    );
    true
}

/// Rework one schedule into postal-compliant form. Returns whether the
/// schedule ended up compliant; either way the schedule records the attempt
/// and never re-runs it.
pub async fn postalize(schedule: &mut Schedule, cfg: &PostalConfig, book: &AddressBook) -> bool {
    if schedule.has_been_postalized {
        debug!(schedule = %schedule.schedule_name, "already postalized, skipping");
        return schedule.is_postalized;
    }
    schedule.tried_to_postalize = true;
    schedule.has_been_postalized = true;

    schedule.normalize_facility_names();
    schedule.correct_travel_times();

    if !schedule.trim_depot_stops() {
        schedule.is_spotter_schedule = true;
        schedule.add_flag("Schedule never leaves the yard");
    } else {
        // Depot wrap travel comes from the address book; the facility the
        // vehicle actually departs from is the partner facility unless home
        // base is the same site.
        let gate = if schedule.site.same_name() {
            schedule.site.pvs_name.clone()
        } else {
            schedule.site.pdc_name.clone()
        };

        let first_name = match schedule.stops.first() {
            Some(s) => s.stop_name.clone(),
            None => {
                warn!(schedule = %schedule.schedule_name, "no stops left after depot trim");
                schedule.can_postalize = false;
                schedule.cannot_postalize_reasons.push(REASON_START.to_string());
                return false;
            }
        };
        let last_name = schedule
            .stops
            .last()
            .map(|s| s.stop_name.clone())
            .unwrap_or_else(|| first_name.clone());

        let trip_out = book.trip(&gate, &first_name).await;
        let trip_back = book.trip(&last_name, &gate).await;

        if let Some(first) = schedule.stops.first() {
            schedule.first_stop_depart =
                add_minutes(first.arrive_time, -trip_out.travel_minutes());
        }
        if let Some(last) = schedule.stops.last() {
            schedule.last_stop_arrive = add_minutes(last.depart_time, trip_back.travel_minutes());
        }
        schedule.mileage += trip_out.miles() + trip_back.miles();

        schedule.add_depot_wrap(cfg);
    }

    let mut failures = postal_compliance_check(schedule, cfg);
    if failures.iter().any(|r| r == REASON_LUNCH) {
        if add_a_lunch(schedule, cfg) {
            failures = postal_compliance_check(schedule, cfg);
        } else {
            failures.retain(|r| r != REASON_LUNCH);
            failures.push(REASON_LUNCH_IMPOSSIBLE.to_string());
        }
    }

    if !failures.is_empty() {
        warn!(
            schedule = %schedule.schedule_name,
            reasons = ?failures,
            "schedule cannot be postalized"
        );
        schedule.can_postalize = false;
        schedule.cannot_postalize_reasons = failures;
        // Leave the as-read data in place for downstream reporting.
        schedule.stops = schedule.original_stops.clone();
        schedule.mileage = schedule.original_mileage;
        return false;
    }

    schedule.can_postalize = true;
    schedule.is_postalized = true;

    schedule.set_cminutes(cfg);
    schedule.postalized_duration = schedule.raw_duration();
    schedule.postalized_mileage = schedule.mileage;
    schedule.postalized_stops = schedule.stops.clone();

    decompose_into_round_trips(schedule, cfg);
    schedule.detect_holiday();
    schedule.recompute_aggregates(cfg);

    info!(
        schedule = %schedule.schedule_name,
        duration = schedule.postalized_duration,
        trips = schedule.round_trips.len(),
        "postalized"
    );
    true
}

/// Would this schedule postalize? Runs the full rework on a throwaway copy
/// and reports the outcome without touching the original.
pub async fn postal_compliance_possible(
    schedule: &Schedule,
    cfg: &PostalConfig,
    book: &AddressBook,
) -> (bool, Vec<String>) {
    let mut trial = schedule.clone();
    let ok = postalize(&mut trial, cfg, book).await;
    (ok, trial.cannot_postalize_reasons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::address_book::FixedDistanceLookup;
    use crate::types::frequency::FrequencyCode;
    use crate::types::round_trip::TripType;
    use crate::types::schedule::SiteIdentity;
    use crate::types::upart::VehicleCategory;
    use chrono::NaiveTime;
    use std::collections::HashMap;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn site() -> SiteIdentity {
        SiteIdentity {
            pvs_name: "SPRINGFIELD PVS".to_string(),
            pdc_name: "SPRINGFIELD P&DC".to_string(),
            hcr_pdc_name: None,
            short_name: "SPRINGFIELD".to_string(),
            pdc_address: Some("US POSTAL SERVICE, 1 DEPOT WAY".to_string()),
        }
    }

    /// A site whose vehicle facility sits inside the processing plant.
    fn combined_site() -> SiteIdentity {
        SiteIdentity {
            pvs_name: "SPRINGFIELD P&DC".to_string(),
            pdc_name: "SPRINGFIELD P&DC".to_string(),
            hcr_pdc_name: None,
            short_name: "SPRINGFIELD".to_string(),
            pdc_address: Some("US POSTAL SERVICE, 1 DEPOT WAY".to_string()),
        }
    }

    fn schedule_at(site: SiteIdentity, stops: Vec<Stop>) -> Schedule {
        Schedule::from_hcr_plate(
            "75101",
            5,
            site,
            FrequencyCode::from_bitstring("0110", "1111100").unwrap(),
            255.0,
            "T7".to_string(),
            VehicleCategory::Single,
            20.0,
            stops,
        )
    }

    fn schedule(stops: Vec<Stop>) -> Schedule {
        schedule_at(site(), stops)
    }

    fn book(dir: &std::path::Path) -> AddressBook {
        let mut addresses = HashMap::new();
        for name in ["SPRINGFIELD P&DC", "SPRINGFIELD PVS", "MAIN ST STATION", "OAK AVE STATION"] {
            addresses.insert(name.to_string(), format!("US POSTAL SERVICE, {name}"));
        }
        let lookup = FixedDistanceLookup::new();
        AddressBook::open("SPRINGFIELD", dir, addresses, Box::new(lookup)).unwrap()
    }

    fn stop(a: (u32, u32), d: (u32, u32), name: &str) -> Stop {
        Stop::new(hm(a.0, a.1), hm(d.0, d.1), name)
    }

    /// A wrapped, compliant short schedule built by hand.
    fn compliant_stops() -> Vec<Stop> {
        vec![
            stop((7, 30), (7, 44), "SPRINGFIELD PVS"),   // 14 = pvs_time
            stop((7, 45), (7, 55), "SPRINGFIELD P&DC"),  // 10 = pdc_time
            stop((8, 30), (9, 0), "MAIN ST STATION"),
            stop((9, 30), (9, 40), "SPRINGFIELD P&DC"),
            stop((9, 41), (9, 55), "SPRINGFIELD PVS"),
        ]
    }

    #[test]
    fn compliant_schedule_passes() {
        let cfg = PostalConfig::default();
        let s = schedule(compliant_stops());
        assert!(postal_compliance_check(&s, &cfg).is_empty());
    }

    #[test]
    fn zero_layover_and_travel_flagged() {
        let cfg = PostalConfig::default();
        let mut stops = compliant_stops();
        stops[2] = stop((8, 30), (8, 30), "MAIN ST STATION"); // no layover
        stops[3] = stop((8, 30), (8, 40), "SPRINGFIELD P&DC"); // no travel
        let s = schedule(stops);
        let reasons = postal_compliance_check(&s, &cfg);
        assert!(reasons.contains(&REASON_LAYOVER.to_string()));
        assert!(reasons.contains(&REASON_TRAVEL.to_string()));
    }

    #[test]
    fn short_depot_dwell_fails_start() {
        let cfg = PostalConfig::default();
        let mut stops = compliant_stops();
        stops[0] = stop((7, 40), (7, 44), "SPRINGFIELD PVS"); // 4 < pvs_time
        let s = schedule(stops);
        assert!(postal_compliance_check(&s, &cfg).contains(&REASON_START.to_string()));
    }

    #[test]
    fn long_day_without_lunch_flagged() {
        let cfg = PostalConfig::default();
        let mut stops = compliant_stops();
        // Stretch the interior stop to push the day past six hours.
        stops[2] = stop((8, 30), (14, 0), "MAIN ST STATION");
        stops[3] = stop((14, 30), (14, 40), "SPRINGFIELD P&DC");
        stops[4] = stop((14, 41), (14, 55), "SPRINGFIELD PVS");
        let s = schedule(stops);
        assert!(postal_compliance_check(&s, &cfg).contains(&REASON_LUNCH.to_string()));
    }

    #[test]
    fn lunch_added_into_roomy_layover() {
        let cfg = PostalConfig::default();
        let mut stops = compliant_stops();
        stops[2] = stop((8, 30), (14, 0), "MAIN ST STATION");
        stops[3] = stop((14, 30), (14, 40), "SPRINGFIELD P&DC");
        stops[4] = stop((14, 41), (14, 55), "SPRINGFIELD PVS");
        let mut s = schedule(stops);
        let before = s.raw_duration();

        assert!(add_a_lunch(&mut s, &cfg));
        assert!(s.has_good_lunch(&cfg));
        // The roomy layover swallowed the lunch: no pushback.
        assert_eq!(s.raw_duration(), before);
        assert!(postal_compliance_check(&s, &cfg).is_empty());
    }

    #[test]
    fn lunch_pushback_when_no_layover_is_roomy() {
        let cfg = PostalConfig::default();
        let stops = vec![
            stop((7, 30), (7, 44), "SPRINGFIELD PVS"),
            stop((7, 45), (7, 55), "SPRINGFIELD P&DC"),
            stop((9, 0), (9, 10), "MAIN ST STATION"),
            stop((11, 0), (11, 10), "OAK AVE STATION"),
            stop((13, 50), (14, 0), "SPRINGFIELD P&DC"),
            stop((14, 1), (14, 15), "SPRINGFIELD PVS"),
        ];
        let mut s = schedule(stops);
        let before = s.raw_duration();

        assert!(add_a_lunch(&mut s, &cfg));
        assert!(s.has_good_lunch(&cfg));
        let added = s.raw_duration() - before;
        assert!(added > 0 && added <= cfg.lunch_block() + 2);
    }

    #[tokio::test]
    async fn postalize_wraps_and_passes() {
        let cfg = PostalConfig::default();
        let dir = tempfile::tempdir().unwrap();
        let book = book(dir.path());

        // As read from the contract: no depot legs at all.
        let mut s = schedule(vec![
            stop((8, 30), (9, 0), "MAIN ST STATION"),
            stop((9, 30), (9, 45), "OAK AVE STATION"),
        ]);

        assert!(postalize(&mut s, &cfg, &book).await);
        assert!(s.is_postalized);
        assert_eq!(s.stops.first().unwrap().stop_name, "SPRINGFIELD PVS");
        assert_eq!(s.stops[1].stop_name, "SPRINGFIELD P&DC");
        assert_eq!(s.stops.last().unwrap().stop_name, "SPRINGFIELD PVS");
        assert_eq!(s.postalized_stops, s.stops);
        assert!(s.postalized_duration > 0);
        // Fallback trips add a mile each way.
        assert!((s.mileage - 22.0).abs() < 1e-9);
        assert!(!s.round_trips.is_empty());
        assert_eq!(s.schedule_type, Some(TripType::Real));
        // Continuous minutes assigned through the whole list.
        assert!(s.stops.iter().all(|st| st.arrive_cminute.is_some()));
    }

    #[tokio::test]
    async fn combined_depot_site_wraps_once_and_fits_a_lunch() {
        let cfg = PostalConfig::default();
        let dir = tempfile::tempdir().unwrap();
        let book = book(dir.path());

        // Long enough to need a lunch once the depot wrap is on.
        let mut s = schedule_at(
            combined_site(),
            vec![
                stop((8, 0), (9, 0), "MAIN ST STATION"),
                stop((11, 0), (11, 30), "OAK AVE STATION"),
                stop((14, 0), (14, 30), "MAIN ST STATION"),
            ],
        );

        assert!(postalize(&mut s, &cfg, &book).await);
        assert!(s.is_postalized);

        // One depot stop per end, dwelling for the whole combined handling
        // time, instead of the separate vehicle-facility and plant legs.
        let combined = cfg.pvs_time + cfg.pdc_time + cfg.pvs_to_pdc_time;
        let first = s.stops.first().unwrap();
        let last = s.stops.last().unwrap();
        assert_eq!(first.stop_name, "SPRINGFIELD P&DC");
        assert_eq!(first.layover(), combined);
        assert_eq!(last.stop_name, "SPRINGFIELD P&DC");
        assert_eq!(last.layover(), combined);

        assert_eq!(s.stops.iter().filter(|st| st.is_lunch()).count(), 1);
        assert!(s.has_good_lunch(&cfg));
        assert!(postal_compliance_check(&s, &cfg).is_empty());
        // Both work segments fit inside the no-lunch limit.
        assert!(s.raw_duration() - cfg.lunch_duration <= cfg.max_duration_hours * 60);
    }

    #[tokio::test]
    async fn compliant_schedule_stays_compliant_after_postalize() {
        let cfg = PostalConfig::default();
        let dir = tempfile::tempdir().unwrap();
        let book = book(dir.path());

        let mut s = schedule(compliant_stops());
        assert!(postal_compliance_check(&s, &cfg).is_empty());

        assert!(postalize(&mut s, &cfg, &book).await);
        assert!(s.is_postalized);
        assert!(postal_compliance_check(&s, &cfg).is_empty());
        // The wrap is rebuilt but keeps the compliant shape.
        assert_eq!(s.stops.len(), 5);
        assert_eq!(s.stops.first().unwrap().stop_name, "SPRINGFIELD PVS");
        assert_eq!(s.stops[1].stop_name, "SPRINGFIELD P&DC");
        assert_eq!(s.stops.last().unwrap().stop_name, "SPRINGFIELD PVS");
    }

    #[tokio::test]
    async fn postalize_is_idempotent() {
        let cfg = PostalConfig::default();
        let dir = tempfile::tempdir().unwrap();
        let book = book(dir.path());

        let mut s = schedule(vec![
            stop((8, 30), (9, 0), "MAIN ST STATION"),
            stop((9, 30), (9, 45), "OAK AVE STATION"),
        ]);
        assert!(postalize(&mut s, &cfg, &book).await);
        let snapshot = s.postalized_stops.clone();
        let mileage = s.mileage;

        assert!(postalize(&mut s, &cfg, &book).await);
        assert_eq!(s.postalized_stops, snapshot);
        assert!((s.mileage - mileage).abs() < 1e-9);
    }

    #[tokio::test]
    async fn yard_only_schedule_marked_spotter() {
        let cfg = PostalConfig::default();
        let dir = tempfile::tempdir().unwrap();
        let book = book(dir.path());

        let mut s = schedule(vec![
            stop((7, 30), (7, 44), "SPRINGFIELD PVS"),
            stop((7, 45), (11, 0), "SPRINGFIELD P&DC"),
        ]);
        postalize(&mut s, &cfg, &book).await;
        assert!(s.is_spotter_schedule);
    }

    #[tokio::test]
    async fn overlong_schedule_rejected_with_duration() {
        let cfg = PostalConfig::default();
        let dir = tempfile::tempdir().unwrap();
        let book = book(dir.path());

        // Nearly fourteen hours of driving: no lunch placement can fix it.
        let mut s = schedule(vec![
            stop((6, 0), (6, 30), "MAIN ST STATION"),
            stop((19, 30), (19, 45), "OAK AVE STATION"),
        ]);
        assert!(!postalize(&mut s, &cfg, &book).await);
        assert!(s
            .cannot_postalize_reasons
            .contains(&REASON_DURATION.to_string()));
        // As-read stops restored.
        assert_eq!(s.stops, s.original_stops);
        assert!((s.mileage - s.original_mileage).abs() < 1e-9);
    }

    #[tokio::test]
    async fn dry_run_leaves_schedule_untouched() {
        let cfg = PostalConfig::default();
        let dir = tempfile::tempdir().unwrap();
        let book = book(dir.path());

        let s = schedule(vec![
            stop((8, 30), (9, 0), "MAIN ST STATION"),
            stop((9, 30), (9, 45), "OAK AVE STATION"),
        ]);
        let (ok, reasons) = postal_compliance_possible(&s, &cfg, &book).await;
        assert!(ok);
        assert!(reasons.is_empty());
        assert!(!s.tried_to_postalize);
        assert_eq!(s.stops, s.original_stops);
    }
}
