//! Wall-clock arithmetic for schedule times.
//!
//! Schedule stops carry minute-resolution wall-clock times with no date
//! attached. All duration math therefore wraps at midnight: the gap from
//! 23:50 to 00:10 is 20 minutes, never -1420. Longer-than-a-day intervals
//! are expressed as a start time plus a length in minutes and bucketed with
//! modular arithmetic against the 1440-minute day.

use chrono::{NaiveTime, Timelike};
use tracing::{error, warn};

/// Minutes in one day.
pub const MINUTES_PER_DAY: i64 = 1440;

/// Minutes after midnight for a wall-clock time ("continuous minute" origin).
pub fn cminute(time: NaiveTime) -> i64 {
    (time.num_seconds_from_midnight() / 60) as i64
}

/// Duration in minutes from `start` to `stop`, wrapping at midnight.
///
/// Always in `[0, 1439]`; `duration(t, t) == 0`.
pub fn duration(start: NaiveTime, stop: NaiveTime) -> i64 {
    let diff = cminute(stop) - cminute(start);
    if diff < 0 {
        diff + MINUTES_PER_DAY
    } else {
        diff
    }
}

/// Shift a wall-clock time by a signed number of minutes, wrapping at
/// midnight in both directions.
pub fn add_minutes(time: NaiveTime, minutes: i64) -> NaiveTime {
    let total = (cminute(time) + minutes).rem_euclid(MINUTES_PER_DAY);
    NaiveTime::from_num_seconds_from_midnight_opt(total as u32 * 60, 0).unwrap_or_default()
}

/// Wall-clock time for a continuous minute value (mod one day).
pub fn cminute_to_time(cminute: i64) -> NaiveTime {
    let of_day = cminute.rem_euclid(MINUTES_PER_DAY);
    NaiveTime::from_num_seconds_from_midnight_opt(of_day as u32 * 60, 0).unwrap_or_default()
}

/// Night minutes in `[0, upto)` for a single clock day: minutes before
/// `am_minute` plus minutes at/after `pm_minute`. `upto` in `[0, 1440]`.
fn night_minutes_before(upto: i64, am_minute: i64, pm_minute: i64) -> i64 {
    upto.min(am_minute) + (upto - pm_minute).max(0)
}

/// Night-differential minutes of the interval starting at continuous minute
/// `start_minute` and running for `length` minutes.
///
/// A minute counts as night when its time of day falls before `am_boundary`
/// or at/after `pm_boundary`. The interval may span any number of midnights.
/// Returns `None` if the computed night minutes would exceed `length` —
/// that signals an arithmetic bug upstream, never valid input.
pub fn night_differential(
    am_boundary: NaiveTime,
    pm_boundary: NaiveTime,
    start_minute: i64,
    length: i64,
) -> Option<i64> {
    if length <= 0 {
        return Some(0);
    }

    let am = cminute(am_boundary);
    let pm = cminute(pm_boundary);
    let per_day = night_minutes_before(MINUTES_PER_DAY, am, pm);

    let whole_days = length / MINUTES_PER_DAY;
    let remainder = length % MINUTES_PER_DAY;
    let s = start_minute.rem_euclid(MINUTES_PER_DAY);

    let partial = if s + remainder <= MINUTES_PER_DAY {
        night_minutes_before(s + remainder, am, pm) - night_minutes_before(s, am, pm)
    } else {
        (per_day - night_minutes_before(s, am, pm))
            + night_minutes_before(s + remainder - MINUTES_PER_DAY, am, pm)
    };

    let night = whole_days * per_day + partial;

    if night > length {
        error!(
            night,
            length, "night differential exceeds interval length, dropping value"
        );
        return None;
    }

    Some(night)
}

/// Split of an interval across calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySplit {
    /// Minutes falling on the day the interval starts.
    pub today: i64,
    /// Minutes falling on the following day.
    pub tomorrow: i64,
    /// Minutes falling two or more days out (rare, logged).
    pub day_after: i64,
}

/// Apportion an interval starting at wall-clock `start` across today,
/// tomorrow, and the day after. Used to bucket schedule hours into
/// weekday/Saturday/Sunday totals.
pub fn day_minutes(start: NaiveTime, length: i64) -> DaySplit {
    let length = length.max(0);
    let start_minute = cminute(start);

    let today = (MINUTES_PER_DAY - start_minute).min(length).max(0);
    let rest = length - today;
    let tomorrow = rest.min(MINUTES_PER_DAY);
    let day_after = rest - tomorrow;

    if day_after > 0 {
        warn!(day_after, "schedule interval spills past tomorrow");
    }

    DaySplit {
        today,
        tomorrow,
        day_after,
    }
}

/// Minutes of a week-anchored interval that fall on a Sunday, where
/// continuous minute 0 is midnight starting Sunday. Counts the opening
/// Sunday and the Sunday one week out.
pub fn sunday_minutes(start_minute: i64, length: i64) -> i64 {
    if length <= 0 {
        return 0;
    }

    let overlap = |lo: i64, hi: i64| -> i64 {
        let a = start_minute.max(lo);
        let b = (start_minute + length).min(hi);
        (b - a).max(0)
    };

    overlap(0, MINUTES_PER_DAY) + overlap(7 * MINUTES_PER_DAY, 8 * MINUTES_PER_DAY)
}
