//! A single arrival/departure event at a named location.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::services::clock::{add_minutes, duration};

/// One stop on a schedule: the vehicle arrives, sits for the layover, and
/// departs. Stops are value-like — every schedule owns its own copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub arrive_time: NaiveTime,
    pub depart_time: NaiveTime,
    pub stop_name: String,
    #[serde(default)]
    pub nass_code: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Whether this location is postal-operated (eligible for lunch breaks
    /// when non-postal locations are disallowed).
    #[serde(default)]
    pub is_postal_location: bool,
    /// Continuous minute of arrival on the staffing-week axis. Assigned
    /// during postalization, absent before.
    #[serde(default)]
    pub arrive_cminute: Option<i64>,
    #[serde(default)]
    pub depart_cminute: Option<i64>,
}

impl Stop {
    pub fn new(arrive_time: NaiveTime, depart_time: NaiveTime, stop_name: impl Into<String>) -> Self {
        let stop_name = stop_name.into();
        let mut stop = Self {
            arrive_time,
            depart_time,
            stop_name,
            nass_code: None,
            address: None,
            is_postal_location: false,
            arrive_cminute: None,
            depart_cminute: None,
        };
        stop.is_postal_location = stop.name_is_postal();
        stop
    }

    /// Minutes between arrival and departure, wrapping at midnight.
    pub fn layover(&self) -> i64 {
        duration(self.arrive_time, self.depart_time)
    }

    /// Compliance requires every stop to sit for at least one minute.
    pub fn has_valid_layover(&self) -> bool {
        self.layover() >= 1
    }

    /// Attach a resolved street address and reclassify the location.
    /// Postal operation is inferred from the address ("US POSTAL SERVICE")
    /// or from facility markers in the stop name.
    pub fn attach_address(&mut self, address: Option<String>) {
        if let Some(addr) = address {
            if addr.contains("US POSTAL SERVICE") {
                self.is_postal_location = true;
            }
            self.address = Some(addr);
        }
        if self.name_is_postal() {
            self.is_postal_location = true;
        }
    }

    fn name_is_postal(&self) -> bool {
        self.stop_name.contains("P&DC") || self.stop_name.contains("PVS")
    }

    /// Move the whole stop by a signed number of minutes.
    pub fn shift(&mut self, minutes: i64) {
        self.arrive_time = add_minutes(self.arrive_time, minutes);
        self.depart_time = add_minutes(self.depart_time, minutes);
        if let Some(m) = self.arrive_cminute.as_mut() {
            *m += minutes;
        }
        if let Some(m) = self.depart_cminute.as_mut() {
            *m += minutes;
        }
    }

    /// Move only the arrival, lengthening or shortening the layover.
    pub fn shift_arrival(&mut self, minutes: i64) {
        self.arrive_time = add_minutes(self.arrive_time, minutes);
        if let Some(m) = self.arrive_cminute.as_mut() {
            *m += minutes;
        }
    }

    /// Move only the departure, lengthening or shortening the layover.
    pub fn shift_departure(&mut self, minutes: i64) {
        self.depart_time = add_minutes(self.depart_time, minutes);
        if let Some(m) = self.depart_cminute.as_mut() {
            *m += minutes;
        }
    }

    /// Lunch stops are matched by name, any casing.
    pub fn is_lunch(&self) -> bool {
        self.stop_name.eq_ignore_ascii_case("LUNCH")
    }
}

impl std::fmt::Display for Stop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} - {})",
            self.stop_name, self.arrive_time, self.depart_time
        )
    }
}
