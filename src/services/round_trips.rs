//! Cutting postalized schedules into round trips.
//!
//! The optimizer schedules facility-to-facility trips, not whole days. A
//! postalized schedule is cut at every visit to the partner processing
//! facility; each boundary stop closes one trip and opens the next.

use tracing::{debug, warn};

use crate::config::PostalConfig;
use crate::types::round_trip::RoundTrip;
use crate::types::schedule::Schedule;
use crate::types::stop::Stop;

/// Populate `schedule.round_trips` from the postalized stop list and settle
/// the schedule's overall type from the trips.
pub fn decompose_into_round_trips(schedule: &mut Schedule, cfg: &PostalConfig) {
    schedule.round_trips = cut_trips(schedule, cfg);
    schedule.find_schedule_type();
}

fn cut_trips(schedule: &Schedule, cfg: &PostalConfig) -> Vec<RoundTrip> {
    let mut stops: &[Stop] = &schedule.postalized_stops;
    if stops.is_empty() {
        warn!(schedule = %schedule.schedule_name, "no postalized stops to decompose");
        return Vec::new();
    }

    // When home base is a separate site, the vehicle-service legs on each
    // end belong to no round trip.
    if !schedule.site.same_name() {
        while stops
            .first()
            .map(|s| s.stop_name == schedule.site.pvs_name)
            .unwrap_or(false)
        {
            stops = &stops[1..];
        }
        while stops
            .last()
            .map(|s| s.stop_name == schedule.site.pvs_name)
            .unwrap_or(false)
        {
            stops = &stops[..stops.len() - 1];
        }
    }

    if stops.is_empty() {
        return Vec::new();
    }

    let pdc_names = schedule.site.pdc_names();
    let boundaries: Vec<usize> = stops
        .iter()
        .enumerate()
        .filter(|(_, s)| pdc_names.contains(&s.stop_name.as_str()))
        .map(|(i, _)| i)
        .collect();

    // Back-to-back facility stops leave an empty trip between them; slide
    // the cut forward so both boundary stops land in one trip.
    let mut cuts: Vec<usize> = Vec::new();
    for b in boundaries {
        match cuts.last_mut() {
            Some(prev) if b == *prev + 1 => *prev = b,
            _ => cuts.push(b),
        }
    }

    // A schedule that visits the partner facility at most once is one trip.
    if cuts.len() < 2 {
        debug!(
            schedule = %schedule.schedule_name,
            "fewer than two facility visits, keeping schedule as one trip"
        );
        return vec![make_trip(schedule, cfg, 1, stops.to_vec())];
    }

    // Each cut closes one trip and opens the next, so the boundary stop is
    // shared. Stops before the first cut ride with the first trip, stops
    // after the last cut with the last.
    let mut trips = Vec::new();
    for i in 0..cuts.len() - 1 {
        let lo = if i == 0 { 0 } else { cuts[i] };
        let hi = if i == cuts.len() - 2 {
            stops.len() - 1
        } else {
            cuts[i + 1]
        };
        trips.push(make_trip(schedule, cfg, i + 1, stops[lo..=hi].to_vec()));
    }
    trips
}

fn make_trip(schedule: &Schedule, cfg: &PostalConfig, number: usize, stops: Vec<Stop>) -> RoundTrip {
    RoundTrip::new(
        &schedule.schedule_name,
        number,
        stops,
        schedule.vehicle_category,
        schedule.frequency.clone(),
        &schedule.site.pvs_name,
        cfg.round_time,
    )
}
