//! Raw extraction intermediates for two-sided paper schedules.
//!
//! A document "panel" holds up to a handful of columns ("U-parts"), each the
//! one-sided half of a round trip: an ordered run of timestamps tagged as
//! arrivals or departures. The merge engine pairs panels' columns back into
//! whole schedules; everything here exists only between extraction and merge.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::services::clock::{add_minutes, duration};
use crate::types::stop::Stop;

/// Which side of a stop a one-sided timestamp describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Arrive,
    Depart,
}

/// Time zone tag on an extracted timestamp. Continental zones shift by whole
/// hours when normalized; the island zones and pre-adjusted entries never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeZone {
    #[serde(rename = "ET")]
    Eastern,
    #[serde(rename = "CT")]
    Central,
    #[serde(rename = "MT")]
    Mountain,
    #[serde(rename = "PT")]
    Pacific,
    #[serde(rename = "ADJ")]
    Adjusted,
    #[serde(rename = "PR")]
    PuertoRico,
    #[serde(rename = "HI")]
    Hawaii,
    #[serde(other, rename = "UK")]
    Unknown,
}

impl TimeZone {
    fn continental_index(self) -> Option<i64> {
        match self {
            TimeZone::Eastern => Some(0),
            TimeZone::Central => Some(1),
            TimeZone::Mountain => Some(2),
            TimeZone::Pacific => Some(3),
            _ => None,
        }
    }

    /// Whole hours to add when moving a clock reading from `self` to `to`.
    /// Zero whenever either side is not a continental zone.
    pub fn hours_to(self, to: TimeZone) -> i64 {
        match (self.continental_index(), to.continental_index()) {
            (Some(from), Some(to)) => from - to,
            _ => 0,
        }
    }
}

/// One extracted timestamp: a single side of a stop event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HalfStop {
    pub time: NaiveTime,
    pub tag: Direction,
    pub time_zone: TimeZone,
    pub stop_name: String,
    #[serde(default)]
    pub nass_code: Option<String>,
}

impl HalfStop {
    pub fn push(&mut self, minutes: i64) {
        self.time = add_minutes(self.time, minutes);
    }

    /// Convert this timestamp to the target zone's clock.
    pub fn normalize_to(&mut self, to: TimeZone) {
        if to == TimeZone::Unknown {
            warn!(stop = %self.stop_name, "target time zone unknown, leaving time as read");
            return;
        }
        let minutes = 60 * self.time_zone.hours_to(to);
        self.push(minutes);
        if minutes != 0 {
            self.time_zone = to;
        }
    }
}

/// One column of a two-sided paper schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UPart {
    pub part_label: String,
    pub schedule_number: i64,
    pub frequency_code: String,
    pub half_stops: Vec<HalfStop>,
    pub vehicle_type: String,
    pub mileage: f64,
    #[serde(default)]
    pub annual_trips: Option<f64>,
    #[serde(default)]
    pub frequency_description: Option<String>,
}

/// Tractor class inferred from the vehicle-type code. Surfaced downstream as
/// a data-quality flag when two merged legs disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleCategory {
    Single,
    ElevenTon,
    Unmatched,
}

impl std::fmt::Display for VehicleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VehicleCategory::Single => write!(f, "Single"),
            VehicleCategory::ElevenTon => write!(f, "11-Ton"),
            VehicleCategory::Unmatched => write!(f, "Unmatched, Unknown"),
        }
    }
}

/// Category from a vehicle-type code's first letter: 'T' marks a single-axle
/// tractor, everything else reads as 11-ton.
pub fn vehicle_category(vehicle_type: &str) -> VehicleCategory {
    if vehicle_type.starts_with('T') {
        VehicleCategory::Single
    } else {
        VehicleCategory::ElevenTon
    }
}

impl UPart {
    /// Repair the alternation of arrive/depart tags. Paper forms sometimes
    /// omit one side of a stop, leaving two consecutive timestamps with the
    /// same tag; a synthetic opposite-side timestamp is inserted one minute
    /// before each duplicate.
    pub fn repair_missing_times(&mut self) {
        let mut i = 1;
        while i < self.half_stops.len() {
            if self.half_stops[i].tag == self.half_stops[i - 1].tag {
                let dup = self.half_stops[i].clone();
                let synthetic = HalfStop {
                    time: add_minutes(dup.time, -1),
                    tag: match dup.tag {
                        Direction::Arrive => Direction::Depart,
                        Direction::Depart => Direction::Arrive,
                    },
                    time_zone: dup.time_zone,
                    stop_name: dup.stop_name.clone(),
                    nass_code: dup.nass_code.clone(),
                };
                self.half_stops.insert(i, synthetic);
                i += 1;
            }
            i += 1;
        }
    }

    /// Bookend: a column read mid-trip starts with a departure; give the
    /// first stop a synthetic arrival one minute earlier.
    pub fn ensure_arrival_at_start(&mut self) {
        let Some(first) = self.half_stops.first() else {
            return;
        };
        if first.tag == Direction::Arrive {
            return;
        }
        let synthetic = HalfStop {
            time: add_minutes(first.time, -1),
            tag: Direction::Arrive,
            time_zone: first.time_zone,
            stop_name: first.stop_name.clone(),
            nass_code: first.nass_code.clone(),
        };
        self.half_stops.insert(0, synthetic);
    }

    /// Bookend: mirror of [`ensure_arrival_at_start`] for the final stop.
    ///
    /// [`ensure_arrival_at_start`]: UPart::ensure_arrival_at_start
    pub fn ensure_departure_at_end(&mut self) {
        let Some(last) = self.half_stops.last() else {
            return;
        };
        if last.tag == Direction::Depart {
            return;
        }
        let synthetic = HalfStop {
            time: add_minutes(last.time, 1),
            tag: Direction::Depart,
            time_zone: last.time_zone,
            stop_name: last.stop_name.clone(),
            nass_code: last.nass_code.clone(),
        };
        self.half_stops.push(synthetic);
    }

    pub fn start_time(&self) -> Option<NaiveTime> {
        self.half_stops.first().map(|h| h.time)
    }

    /// Wall-clock span from the first to the last timestamp.
    pub fn raw_duration(&self) -> i64 {
        match (self.half_stops.first(), self.half_stops.last()) {
            (Some(first), Some(last)) => duration(first.time, last.time),
            _ => 0,
        }
    }

    pub fn category(&self) -> VehicleCategory {
        vehicle_category(&self.vehicle_type)
    }

    /// Fold the alternating arrive/depart timestamps into whole stops,
    /// resolving each stop's address through the reader's address table.
    /// Call after the bookends are in place.
    pub fn collapse_into_stops(
        half_stops: &[HalfStop],
        resolve_address: &dyn Fn(&str) -> Option<String>,
    ) -> Vec<Stop> {
        let mut stops = Vec::new();
        for (i, half) in half_stops.iter().enumerate() {
            if half.tag != Direction::Arrive {
                continue;
            }
            let Some(next) = half_stops.get(i + 1) else {
                warn!(stop = %half.stop_name, "arrival with no matching departure, dropped");
                continue;
            };
            let mut stop = Stop::new(half.time, next.time, half.stop_name.clone());
            stop.nass_code = half.nass_code.clone();
            stop.attach_address(resolve_address(&half.stop_name));
            stops.push(stop);
        }
        stops
    }
}
