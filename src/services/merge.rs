//! Pairing plate columns back into whole schedules.
//!
//! A two-sided paper schedule prints the outbound and return legs of one
//! vehicle's trip as separate columns with consecutive trip numbers. This
//! module decides, pair by pair, whether two adjacent columns are halves of
//! one schedule, and splices the ones that are. Ambiguous pairs are referred
//! to an injected [`MergeDecisionPolicy`]; the batch-safe default keeps them
//! apart.

use tracing::{info, warn};

use crate::config::PostalConfig;
use crate::services::clock::duration;
use crate::types::upart::{UPart, VehicleCategory};

/// Flag attached to a column that never found its other half.
pub const LONE_COLUMN_FLAG: &str = "This schedule is only one column of a U";

/// Columns per panel beyond which the extraction is suspect.
const PANEL_COLUMN_LIMIT: usize = 5;

/// Seam for merge decisions the tables cannot settle. Implementations may
/// prompt an operator, replay recorded answers, or apply a blanket rule.
pub trait MergeDecisionPolicy {
    /// Should these two columns be spliced into one schedule? `layover` is
    /// the gap in minutes between the first leg's end and the second's start.
    fn should_merge(&self, first: &UPart, second: &UPart, layover: i64) -> bool;
}

/// Keep ambiguous pairs apart. The default for unattended runs: a wrong
/// split is recoverable downstream, a wrong splice is not.
pub struct NeverMerge;

impl MergeDecisionPolicy for NeverMerge {
    fn should_merge(&self, _first: &UPart, _second: &UPart, _layover: i64) -> bool {
        false
    }
}

/// Splice every ambiguous pair. Useful for tests and bulk re-runs where the
/// rejection table already carries the known-bad pairs.
pub struct AlwaysMerge;

impl MergeDecisionPolicy for AlwaysMerge {
    fn should_merge(&self, _first: &UPart, _second: &UPart, _layover: i64) -> bool {
        true
    }
}

/// Reference tables consulted while merging, kept behind a trait so the
/// engine does not care where they are stored.
pub trait MergeTables {
    /// Combined frequency code for a known cross-midnight pair of codes.
    fn switch_code(&self, first_code: &str, second_code: &str) -> Option<String>;

    /// Whether this pair of columns has been recorded as never-merge.
    fn is_rejected_pair(&self, plate: &str, first_trip: i64, second_trip: i64) -> bool;
}

/// Empty tables: no switch codes, nothing rejected.
pub struct NoTables;

impl MergeTables for NoTables {
    fn switch_code(&self, _first_code: &str, _second_code: &str) -> Option<String> {
        None
    }

    fn is_rejected_pair(&self, _plate: &str, _first_trip: i64, _second_trip: i64) -> bool {
        false
    }
}

/// A column after merging: either two legs spliced into one, or a lone
/// column promoted to a whole schedule with a flag.
#[derive(Debug, Clone)]
pub struct MergedLeg {
    pub part: UPart,
    pub vehicle_category: VehicleCategory,
    pub flags: Vec<String>,
}

fn decision(
    cfg: &PostalConfig,
    tables: &dyn MergeTables,
    policy: &dyn MergeDecisionPolicy,
    plate: &str,
    first: &UPart,
    second: &UPart,
) -> bool {
    // A column printed twice is a reprint, never a return leg.
    if is_reprint(first, second) {
        warn!(
            plate,
            trip = first.schedule_number,
            "adjacent columns carry identical times, keeping both as lone legs"
        );
        return false;
    }

    if tables.is_rejected_pair(plate, first.schedule_number, second.schedule_number) {
        return false;
    }

    if first.frequency_code == second.frequency_code {
        return true;
    }

    let layover = leg_gap(first, second);

    // Strict mode ignores the time thresholds and the tight-gap shortcut;
    // every differing-code pair goes to the switch table or the policy.
    if !cfg.strict_merge {
        let combined = first.raw_duration() + layover + second.raw_duration();
        if combined > cfg.merge_max_combined || layover > cfg.merge_max_layover {
            return false;
        }
    }

    // Differing codes with the return leg starting earlier on the clock
    // usually mean the trip crossed midnight. The rollover rule outranks the
    // tight-gap shortcut: a known switch-code pair settles it without
    // asking, an unknown one is for the policy.
    let rolls_over = match (second.start_time(), first.start_time()) {
        (Some(s), Some(f)) => s < f,
        _ => false,
    };
    if rolls_over {
        if tables
            .switch_code(&first.frequency_code, &second.frequency_code)
            .is_some()
        {
            return true;
        }
        return policy.should_merge(first, second, layover);
    }

    if !cfg.strict_merge && layover < cfg.merge_min_layover {
        return true;
    }

    policy.should_merge(first, second, layover)
}

/// Gap in minutes between the first leg's last timestamp and the second
/// leg's first.
fn leg_gap(first: &UPart, second: &UPart) -> i64 {
    match (
        first.half_stops.last().map(|h| h.time),
        second.start_time(),
    ) {
        (Some(end), Some(start)) => duration(end, start),
        _ => 0,
    }
}

fn is_reprint(first: &UPart, second: &UPart) -> bool {
    first.half_stops.len() == second.half_stops.len()
        && first
            .half_stops
            .iter()
            .zip(&second.half_stops)
            .all(|(a, b)| a.time == b.time)
}

/// Splice two legs into one column. Bookends go on the outer ends only: the
/// first leg's closing arrival and the second leg's opening departure must
/// stay unpaired so they collapse into one turnaround stop whose layover is
/// the time between the legs.
fn splice(
    cfg_switch_code: Option<String>,
    mut first: UPart,
    mut second: UPart,
) -> MergedLeg {
    let mut flags = Vec::new();

    first.ensure_arrival_at_start();
    second.ensure_departure_at_end();

    let vehicle_category = if first.vehicle_type == second.vehicle_type {
        first.category()
    } else {
        flags.push(format!(
            "Vehicle types differ between legs: {}/{}",
            first.vehicle_type, second.vehicle_type
        ));
        VehicleCategory::Unmatched
    };

    let vehicle_type = if first.vehicle_type == second.vehicle_type {
        first.vehicle_type.clone()
    } else {
        format!("{}/{}", first.vehicle_type, second.vehicle_type)
    };

    // Trip counts from the two legs only agree when the legs really run the
    // same days; anything else is a data problem, not an average.
    let annual_trips = match (first.annual_trips, second.annual_trips) {
        (Some(a), Some(b)) if (a - b).abs() < f64::EPSILON => Some(a),
        (Some(a), None) | (None, Some(a)) => Some(a),
        (None, None) => None,
        _ => {
            flags.push("Annual trip counts differ between legs".to_string());
            None
        }
    };

    let frequency_code = match cfg_switch_code {
        Some(code) => code,
        None => {
            if first.frequency_code != second.frequency_code {
                flags.push(format!(
                    "Frequency codes differ between legs: {}/{}",
                    first.frequency_code, second.frequency_code
                ));
            }
            first.frequency_code.clone()
        }
    };

    let mut half_stops = first.half_stops;
    half_stops.extend(second.half_stops);

    let part = UPart {
        part_label: format!("{}/{}", first.part_label, second.part_label),
        schedule_number: first.schedule_number,
        frequency_code,
        half_stops,
        vehicle_type,
        mileage: first.mileage + second.mileage,
        annual_trips,
        frequency_description: first.frequency_description,
    };

    MergedLeg {
        part,
        vehicle_category,
        flags,
    }
}

fn promote_lone(mut part: UPart) -> MergedLeg {
    part.ensure_arrival_at_start();
    part.ensure_departure_at_end();
    let vehicle_category = part.category();
    MergedLeg {
        part,
        vehicle_category,
        flags: vec![LONE_COLUMN_FLAG.to_string()],
    }
}

/// Merge one panel's columns. Candidate pairs are any two legs with
/// consecutive trip numbers, wherever they sit in the panel; a matched pair
/// is decided once and consumed either way, spliced or emitted as two lone
/// columns.
pub fn merge_panel(
    cfg: &PostalConfig,
    tables: &dyn MergeTables,
    policy: &dyn MergeDecisionPolicy,
    plate: &str,
    mut columns: Vec<UPart>,
) -> Vec<MergedLeg> {
    if columns.len() > PANEL_COLUMN_LIMIT {
        warn!(
            plate,
            columns = columns.len(),
            "panel has more columns than a plate page holds, extraction suspect"
        );
    }

    let mut out = Vec::new();
    while !columns.is_empty() {
        let first = columns.remove(0);
        let partner = columns
            .iter()
            .position(|c| c.schedule_number == first.schedule_number + 1);
        let Some(j) = partner else {
            out.push(promote_lone(first));
            continue;
        };

        if decision(cfg, tables, policy, plate, &first, &columns[j]) {
            let second = columns.remove(j);
            let switch = if first.frequency_code != second.frequency_code {
                tables.switch_code(&first.frequency_code, &second.frequency_code)
            } else {
                None
            };
            info!(
                plate,
                trips = format!("{}+{}", first.schedule_number, second.schedule_number),
                "spliced columns into one schedule"
            );
            out.push(splice(switch, first, second));
        } else {
            let second = columns.remove(j);
            out.push(promote_lone(first));
            out.push(promote_lone(second));
        }
    }
    out
}
