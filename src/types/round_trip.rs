//! Facility-to-facility segments of a postalized schedule.
//!
//! After repair, a schedule is cut into round trips bounded by consecutive
//! visits to the partner facility. Each trip is classified by what happens
//! between the boundary stops; the optimizer input generator consumes the
//! trips, the staffing totals consume the classification.

use serde::{Deserialize, Serialize};

use crate::services::clock::{cminute, duration, MINUTES_PER_DAY};
use crate::types::frequency::FrequencyCode;
use crate::types::stop::Stop;
use crate::types::upart::VehicleCategory;

/// What a round trip actually does. Ordering matters: a schedule's overall
/// type is the best trip type it contains (`Real` beats `Spotter` beats
/// `Standby`; `Lunch` never wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripType {
    Real,
    Lunch,
    Spotter,
    Standby,
}

const STANDBY_KEYWORDS: &[&str] = &["STANDBY", "ASSIGNED TO OTHER DUTIES"];

/// Standby stops cover idle time parked at a facility.
pub fn is_standby_keyword(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    STANDBY_KEYWORDS.iter().any(|kw| upper.contains(kw))
}

/// Spotter stops shuttle trailers around a yard rather than carrying mail.
pub fn is_spotter_name(name: &str) -> bool {
    name.to_ascii_uppercase().contains("SPOTTER")
}

fn classify_stop(stop: &Stop, pvs_name: &str) -> TripType {
    let home_idle = !pvs_name.is_empty() && stop.stop_name.contains(pvs_name);
    if home_idle || is_standby_keyword(&stop.stop_name) {
        TripType::Standby
    } else if stop.is_lunch() {
        TripType::Lunch
    } else if is_spotter_name(&stop.stop_name) {
        TripType::Spotter
    } else {
        TripType::Real
    }
}

/// One segment of a postalized schedule, bounded on both ends by the partner
/// facility. Immutable after construction except for the operator-driven
/// `is_selected` toggle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundTrip {
    pub schedule_name: String,
    pub trip_number: usize,
    pub stops: Vec<Stop>,
    pub vehicle_category: VehicleCategory,
    pub frequency: FrequencyCode,
    pub trip_type: TripType,
    pub contains_lunch: bool,
    pub start_minute: i64,
    pub duration: i64,
    /// Whether the trip is included when generating optimizer input.
    pub is_selected: bool,
}

impl RoundTrip {
    /// Build one trip from a boundary-to-boundary stop run. The boundary
    /// layovers are normalized to `boundary_layover` minutes (the configured
    /// partner-facility handling time) so every trip starts and ends with the
    /// same dwell.
    pub fn new(
        schedule_name: &str,
        trip_number: usize,
        mut stops: Vec<Stop>,
        vehicle_category: VehicleCategory,
        frequency: FrequencyCode,
        pvs_name: &str,
        boundary_layover: i64,
    ) -> Self {
        if let Some(first) = stops.first_mut() {
            let excess = first.layover() - boundary_layover;
            if excess != 0 {
                first.shift_arrival(excess);
            }
        }
        if let Some(last) = stops.last_mut() {
            let excess = last.layover() - boundary_layover;
            if excess != 0 {
                last.shift_departure(-excess);
            }
        }

        let trip_type = Self::classify(&stops, pvs_name);
        let contains_lunch = stops.iter().any(Stop::is_lunch);
        let start_minute = stops
            .first()
            .and_then(|s| s.arrive_cminute)
            .unwrap_or_else(|| stops.first().map(|s| cminute(s.arrive_time)).unwrap_or(0));
        let duration = raw_duration(&stops);

        Self {
            schedule_name: schedule_name.to_string(),
            trip_number,
            stops,
            vehicle_category,
            frequency,
            trip_type,
            contains_lunch,
            start_minute,
            duration,
            is_selected: true,
        }
    }

    /// A trip is `Real` if any interior stop is real work; otherwise spotter
    /// beats lunch beats standby.
    fn classify(stops: &[Stop], pvs_name: &str) -> TripType {
        let interior: &[Stop] = if stops.len() > 2 {
            &stops[1..stops.len() - 1]
        } else {
            &[]
        };

        let mut best = TripType::Standby;
        for stop in interior {
            match classify_stop(stop, pvs_name) {
                TripType::Real => return TripType::Real,
                TripType::Spotter => best = TripType::Spotter,
                TripType::Lunch if best == TripType::Standby => best = TripType::Lunch,
                _ => {}
            }
        }
        best
    }

    pub fn end_minute(&self) -> i64 {
        self.start_minute + self.duration
    }

    /// One optimizer-input row, offset onto the requested day of the
    /// staffing week.
    pub fn optimizer_row(&self, day_index: i64) -> OptimizerRow {
        OptimizerRow {
            schedule_name: self.schedule_name.clone(),
            trip_number: self.trip_number,
            has_lunch: self.contains_lunch,
            start_minute: self.start_minute + day_index * MINUTES_PER_DAY,
            end_minute: self.end_minute() + day_index * MINUTES_PER_DAY,
            duration: self.duration,
        }
    }
}

/// Flat row handed to the optimizer-input generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerRow {
    pub schedule_name: String,
    pub trip_number: usize,
    pub has_lunch: bool,
    pub start_minute: i64,
    pub end_minute: i64,
    pub duration: i64,
}

/// Sum of layovers plus inter-stop travel, wraparound aware.
pub fn raw_duration(stops: &[Stop]) -> i64 {
    let mut total = 0;
    for (i, stop) in stops.iter().enumerate() {
        total += stop.layover();
        if let Some(next) = stops.get(i + 1) {
            total += duration(stop.depart_time, next.arrive_time);
        }
    }
    total
}
