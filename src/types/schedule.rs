//! The canonical merged schedule: one vehicle's tour of duty.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::PostalConfig;
use crate::services::clock::{cminute, day_minutes, duration, night_differential, MINUTES_PER_DAY};
use crate::types::frequency::FrequencyCode;
use crate::types::round_trip::{is_standby_keyword, raw_duration, RoundTrip, TripType};
use crate::types::stop::Stop;
use crate::types::upart::VehicleCategory;

/// Where the schedule's source document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    /// Highway contract route plate.
    Hcr,
    /// Postal vehicle service document.
    Pvs,
    /// Workforce-management export.
    Jda,
    /// Optimizer output fed back for re-postalization.
    Opt,
}

/// File type the source document was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    Pdf,
    Html,
    Excel,
}

/// Facility identity shared by every schedule read from one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteIdentity {
    /// Home base (vehicle service facility).
    pub pvs_name: String,
    /// Partner processing facility, canonical name.
    pub pdc_name: String,
    /// The partner facility as named in HCR contracts, when it differs.
    #[serde(default)]
    pub hcr_pdc_name: Option<String>,
    /// Short display name for reports.
    pub short_name: String,
    #[serde(default)]
    pub pdc_address: Option<String>,
}

impl SiteIdentity {
    /// Home and partner facility are one and the same site.
    pub fn same_name(&self) -> bool {
        self.pvs_name == self.pdc_name
    }

    /// All names under which the partner facility may appear.
    pub fn pdc_names(&self) -> Vec<&str> {
        let mut names = vec![self.pdc_name.as_str()];
        if let Some(hcr) = self.hcr_pdc_name.as_deref() {
            names.push(hcr);
        }
        names
    }
}

/// Metrics listed on an HTML workforce report, attached verbatim for
/// reconciliation against our own computed aggregates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportedMetrics {
    pub annual_miles: f64,
    pub annual_hours: f64,
    pub holiday_hours: f64,
    pub unassigned_hours: Option<f64>,
}

/// Aggregates recomputed from a stop list, consumed by the cost model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleAggregates {
    pub annual_miles: f64,
    /// Paid minutes per occurrence (raw duration less the lunch layover).
    pub paid_minutes: i64,
    pub annual_hours: f64,
    pub night_hours_as_read: f64,
    pub night_hours_postalized: f64,
    pub weekday_hours: f64,
    pub saturday_hours: f64,
    pub sunday_hours: f64,
    pub annual_calculated_duration_hours: f64,
    pub annual_postalized_duration_hours: f64,
    pub annual_calculated_mileage: f64,
    pub annual_postalized_mileage: f64,
    pub unassigned_hours: f64,
}

/// One schedule instance: ordered stops, applicability, compliance state,
/// and the snapshots postalization works against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub schedule_name: String,
    pub source: Source,
    pub source_type: SourceType,
    pub source_file: Option<String>,

    pub site: SiteIdentity,

    pub frequency: FrequencyCode,
    frequency_adjusted: bool,
    pub annual_trips: f64,

    pub vehicle_type: String,
    pub vehicle_category: VehicleCategory,

    pub mileage: f64,
    pub original_mileage: f64,
    pub postalized_mileage: f64,

    /// Working stop list, mutated by repair.
    pub stops: Vec<Stop>,
    /// As-read snapshot, never mutated after construction.
    pub original_stops: Vec<Stop>,
    /// Result snapshot, populated by postalization.
    pub postalized_stops: Vec<Stop>,

    pub original_duration: i64,
    pub postalized_duration: i64,

    /// Departure anchor for the first non-depot stop, maintained while
    /// depot legs are trimmed and re-added.
    pub first_stop_depart: NaiveTime,
    pub last_stop_arrive: NaiveTime,

    pub flags: Vec<String>,
    pub holiday: bool,
    pub is_spotter_schedule: bool,

    pub is_postalized: bool,
    pub can_postalize: bool,
    pub tried_to_postalize: bool,
    pub has_been_postalized: bool,
    pub cannot_postalize_reasons: Vec<String>,
    pub cannot_insource_reasons: Vec<String>,

    pub reported: Option<ReportedMetrics>,
    pub aggregates: ScheduleAggregates,

    pub round_trips: Vec<RoundTrip>,
    pub schedule_type: Option<TripType>,
}

impl Schedule {
    fn build(
        schedule_name: String,
        source: Source,
        source_type: SourceType,
        source_file: Option<String>,
        site: SiteIdentity,
        frequency: FrequencyCode,
        annual_trips: f64,
        vehicle_type: String,
        vehicle_category: VehicleCategory,
        mileage: f64,
        stops: Vec<Stop>,
    ) -> Self {
        debug_assert!(!stops.is_empty(), "a schedule needs at least one stop");
        let original_duration = raw_duration(&stops);
        let first_stop_depart = stops.first().map(|s| s.depart_time).unwrap_or_default();
        let last_stop_arrive = stops.last().map(|s| s.arrive_time).unwrap_or_default();

        Self {
            schedule_name,
            source,
            source_type,
            source_file,
            site,
            frequency,
            frequency_adjusted: false,
            annual_trips,
            vehicle_type,
            vehicle_category,
            mileage,
            original_mileage: mileage,
            postalized_mileage: 0.0,
            original_stops: stops.clone(),
            postalized_stops: stops.clone(),
            stops,
            original_duration,
            postalized_duration: 0,
            first_stop_depart,
            last_stop_arrive,
            flags: Vec::new(),
            holiday: false,
            is_spotter_schedule: false,
            is_postalized: false,
            can_postalize: false,
            tried_to_postalize: false,
            has_been_postalized: false,
            cannot_postalize_reasons: Vec::new(),
            cannot_insource_reasons: Vec::new(),
            reported: None,
            aggregates: ScheduleAggregates::default(),
            round_trips: Vec::new(),
            schedule_type: None,
        }
    }

    /// A schedule merged (or promoted) from HCR plate columns. Named after
    /// the plate and trip number.
    #[allow(clippy::too_many_arguments)]
    pub fn from_hcr_plate(
        plate_number: &str,
        trip_number: i64,
        site: SiteIdentity,
        frequency: FrequencyCode,
        annual_trips: f64,
        vehicle_type: String,
        vehicle_category: VehicleCategory,
        mileage: f64,
        stops: Vec<Stop>,
    ) -> Self {
        Self::build(
            format!("{} {}", plate_number, trip_number),
            Source::Hcr,
            SourceType::Pdf,
            Some(plate_number.chars().take(5).collect()),
            site,
            frequency,
            annual_trips,
            vehicle_type,
            vehicle_category,
            mileage,
            stops,
        )
    }

    /// A schedule from an HTML workforce report. Named after the partner
    /// facility and schedule number; the report's listed metrics ride along.
    pub fn from_html_report(
        schedule_number: i64,
        site: SiteIdentity,
        frequency: FrequencyCode,
        mileage: f64,
        stops: Vec<Stop>,
        reported: ReportedMetrics,
    ) -> Self {
        let annual_trips = if mileage > 0.0 {
            reported.annual_miles / mileage
        } else {
            0.0
        };
        let mut schedule = Self::build(
            format!("{} {}", site.pdc_name, schedule_number),
            Source::Pvs,
            SourceType::Html,
            None,
            site,
            frequency,
            annual_trips,
            "Unknown Vehicle Type".to_string(),
            VehicleCategory::ElevenTon,
            mileage,
            stops,
        );
        schedule.reported = Some(reported);
        schedule
    }

    /// A schedule fed back from the optimizer. Named tour + vehicle digit +
    /// zero-padded read-in index; the tour is taken from the first stop's
    /// continuous minute.
    pub fn from_optimizer(
        read_in_index: usize,
        site: SiteIdentity,
        frequency: FrequencyCode,
        annual_trips: f64,
        vehicle_type: String,
        mileage: f64,
        stops: Vec<Stop>,
    ) -> Self {
        let start_minute = stops
            .first()
            .and_then(|s| s.arrive_cminute)
            .unwrap_or_else(|| stops.first().map(|s| cminute(s.arrive_time)).unwrap_or(0));

        // Tour boundaries on the staffing axis, with a 15-minute grace.
        let tour = if start_minute < 1680 + 15 {
            '1'
        } else if start_minute < 2161 + 15 {
            '2'
        } else if start_minute < 2641 + 15 {
            '3'
        } else {
            '1'
        };

        let vehicle_digit = match vehicle_type.to_ascii_uppercase().as_str() {
            "SINGLE" => '1',
            "11-TON" => '3',
            _ => '5',
        };

        let vehicle_category = match vehicle_digit {
            '1' => VehicleCategory::Single,
            _ => VehicleCategory::ElevenTon,
        };

        Self::build(
            format!("{}{}{:03}", tour, vehicle_digit, read_in_index),
            Source::Opt,
            SourceType::Excel,
            None,
            site,
            frequency,
            annual_trips,
            vehicle_type,
            vehicle_category,
            mileage,
            stops,
        )
    }

    pub fn add_flag(&mut self, flag: impl Into<String>) {
        self.flags.push(flag.into());
    }

    /// Duration of the working stop list: layovers plus travel.
    pub fn raw_duration(&self) -> i64 {
        raw_duration(&self.stops)
    }

    pub fn lunch_stops(&self) -> Vec<&Stop> {
        self.stops.iter().filter(|s| s.is_lunch()).collect()
    }

    /// Whether the working stops carry a single, valid lunch: long enough,
    /// and placed so neither work segment exceeds the no-lunch limit.
    /// Finding more than one lunch stop is an upstream bug — logged, and
    /// treated as no valid lunch.
    pub fn has_good_lunch(&self, cfg: &PostalConfig) -> bool {
        let lunches = self.lunch_stops();
        if lunches.len() > 1 {
            error!(schedule = %self.schedule_name, "multiple lunch stops found");
            return false;
        }
        let Some(lunch) = lunches.first() else {
            return false;
        };

        if lunch.layover() < cfg.lunch_duration {
            return false;
        }

        let Some(first) = self.stops.first() else {
            return false;
        };
        let Some(last) = self.stops.last() else {
            return false;
        };

        let limit = cfg.hours_without_lunch * 60;
        duration(first.arrive_time, lunch.arrive_time) <= limit
            && duration(lunch.depart_time, last.depart_time) <= limit
    }

    /// Rename stops carrying the contract-side partner-facility name to the
    /// canonical one.
    pub fn normalize_facility_names(&mut self) {
        let Some(hcr_name) = self.site.hcr_pdc_name.clone() else {
            return;
        };
        for stop in &mut self.stops {
            if stop.stop_name == hcr_name {
                stop.stop_name = self.site.pdc_name.clone();
            }
        }
    }

    /// Where document rounding produced back-to-back stops with no travel
    /// time, shift everything before the gap a minute earlier. Applied
    /// stop-by-stop so cascaded artifacts all resolve.
    pub fn correct_travel_times(&mut self) {
        for i in 0..self.stops.len().saturating_sub(1) {
            let travel = duration(self.stops[i].depart_time, self.stops[i + 1].arrive_time);
            if travel < 1 {
                for stop in &mut self.stops[..=i] {
                    stop.shift(-1);
                }
            }
        }
    }

    /// Strip leading/trailing depot-facility stops, remembering the anchor
    /// times for the re-wrap. Returns `false` when every stop is a depot
    /// stop — such schedules never leave the yard (spotter duty) and are not
    /// wrapped.
    pub fn trim_depot_stops(&mut self) -> bool {
        let is_depot = |name: &str| {
            name == self.site.pvs_name
                || name == self.site.pdc_name
                || self.site.hcr_pdc_name.as_deref() == Some(name)
        };

        if self.stops.iter().all(|s| is_depot(&s.stop_name)) {
            return false;
        }

        while self
            .stops
            .first()
            .map(|s| is_depot(&s.stop_name))
            .unwrap_or(false)
        {
            self.first_stop_depart = self.stops[0].depart_time;
            self.stops.remove(0);
        }

        while self
            .stops
            .last()
            .map(|s| is_depot(&s.stop_name))
            .unwrap_or(false)
        {
            self.last_stop_arrive = self.stops[self.stops.len() - 1].arrive_time;
            self.stops.pop();
        }

        true
    }

    /// Prepend and append the depot legs around the trimmed stop list using
    /// the configured facility handling times. `first_stop_depart` /
    /// `last_stop_arrive` must already account for travel to/from the first
    /// and last remaining stop.
    pub fn add_depot_wrap(&mut self, cfg: &PostalConfig) {
        let layover_time = cfg.pvs_time + cfg.pdc_time + cfg.pvs_to_pdc_time;
        let depart_time = self.first_stop_depart;

        if self.site.same_name() {
            let arrive = crate::services::clock::add_minutes(depart_time, -layover_time);
            let mut start = Stop::new(arrive, depart_time, self.site.pvs_name.clone());
            start.attach_address(self.site.pdc_address.clone());
            self.stops.insert(0, start);
        } else {
            let pdc_depart = depart_time;
            let pdc_arrive = crate::services::clock::add_minutes(pdc_depart, -cfg.pdc_time);
            let pvs_depart = crate::services::clock::add_minutes(pdc_arrive, -cfg.pvs_to_pdc_time);
            let pvs_arrive = crate::services::clock::add_minutes(pvs_depart, -cfg.pvs_time);

            let mut pdc_stop = Stop::new(pdc_arrive, pdc_depart, self.site.pdc_name.clone());
            pdc_stop.attach_address(self.site.pdc_address.clone());
            let pvs_stop = Stop::new(pvs_arrive, pvs_depart, self.site.pvs_name.clone());

            self.stops.insert(0, pdc_stop);
            self.stops.insert(0, pvs_stop);
        }

        let arrive_time = self.last_stop_arrive;

        if self.site.same_name() {
            let depart = crate::services::clock::add_minutes(arrive_time, layover_time);
            let mut end = Stop::new(arrive_time, depart, self.site.pvs_name.clone());
            end.attach_address(self.site.pdc_address.clone());
            self.stops.push(end);
        } else {
            let pdc_arrive = arrive_time;
            let pdc_depart = crate::services::clock::add_minutes(pdc_arrive, cfg.pdc_time);
            let pvs_arrive = crate::services::clock::add_minutes(pdc_depart, cfg.pvs_to_pdc_time);
            let pvs_depart = crate::services::clock::add_minutes(pvs_arrive, cfg.pvs_time);

            let mut pdc_stop = Stop::new(pdc_arrive, pdc_depart, self.site.pdc_name.clone());
            pdc_stop.attach_address(self.site.pdc_address.clone());
            let pvs_stop = Stop::new(pvs_arrive, pvs_depart, self.site.pvs_name.clone());

            self.stops.push(pdc_stop);
            self.stops.push(pvs_stop);
        }
    }

    /// Assign continuous minutes along the staffing axis, anchored so tour
    /// one starts the week. When repair pushed an HCR/JDA schedule's start
    /// across midnight, the frequency code is rotated one day forward so the
    /// schedule still runs on the calendar days the contract names.
    pub fn set_cminutes(&mut self, cfg: &PostalConfig) {
        let tour_one = cminute(cfg.tour_one_time);

        let mut original_first = self
            .original_stops
            .first()
            .map(|s| cminute(s.arrive_time))
            .unwrap_or(0);
        let mut postalized_first = self
            .stops
            .first()
            .map(|s| cminute(s.arrive_time))
            .unwrap_or(0);

        if original_first < postalized_first {
            original_first += MINUTES_PER_DAY;
        }
        if original_first < tour_one || postalized_first < tour_one {
            original_first += MINUTES_PER_DAY;
            postalized_first += MINUTES_PER_DAY;
        }

        let adjustable_source = matches!(self.source, Source::Hcr | Source::Jda);
        if original_first < MINUTES_PER_DAY
            && postalized_first > 1200
            && adjustable_source
            && !self.frequency_adjusted
        {
            info!(
                schedule = %self.schedule_name,
                original_first, postalized_first, "start crossed midnight, rotating frequency code"
            );
            self.frequency.rotate_forward();
            self.frequency_adjusted = true;
        }

        let mut prev_depart = postalized_first;
        if let Some(first) = self.stops.first_mut() {
            first.arrive_cminute = Some(postalized_first);
            prev_depart = postalized_first + first.layover();
            first.depart_cminute = Some(prev_depart);
        }

        for i in 1..self.stops.len() {
            let travel = duration(self.stops[i - 1].depart_time, self.stops[i].arrive_time);
            let stop = &mut self.stops[i];
            stop.arrive_cminute = Some(prev_depart + travel);
            prev_depart = prev_depart + travel + stop.layover();
            stop.depart_cminute = Some(prev_depart);
        }
    }

    /// Holiday schedules are excluded from weekday staffing totals. An HCR
    /// schedule with fewer than 40 annual trips is assumed holiday-only.
    pub fn detect_holiday(&mut self) {
        if self.frequency.is_holiday {
            self.holiday = true;
        }
        match self.source {
            Source::Hcr => {
                if self.annual_trips < 40.0 {
                    self.holiday = true;
                }
            }
            Source::Pvs => {
                if let Some(reported) = &self.reported {
                    if reported.holiday_hours > 0.0 {
                        self.holiday = true;
                    }
                }
            }
            _ => {}
        }
    }

    /// Can this contract route be brought in-house at all? Ceiling checks
    /// on the as-read duration and mileage, with reasons recorded.
    pub fn insource_eligible_check(&mut self, cfg: &PostalConfig) -> bool {
        let duration_ok = self.original_duration <= cfg.max_duration_hours * 60;
        let mileage_ok = self.original_mileage <= cfg.max_mileage;

        if duration_ok && mileage_ok {
            return true;
        }
        if !duration_ok {
            self.cannot_insource_reasons.push("Duration".to_string());
        }
        if !mileage_ok {
            self.cannot_insource_reasons.push("Mileage".to_string());
        }
        false
    }

    /// The best trip type among the round trips decides whether the
    /// schedule counts toward staffing.
    pub fn find_schedule_type(&mut self) {
        let types: Vec<TripType> = self.round_trips.iter().map(|t| t.trip_type).collect();
        self.schedule_type = if types.contains(&TripType::Real) {
            Some(TripType::Real)
        } else if types.contains(&TripType::Spotter) {
            Some(TripType::Spotter)
        } else {
            Some(TripType::Standby)
        };
    }

    /// Recompute every derived aggregate from the current snapshots,
    /// annualized by `annual_trips`. Called at the end of postalization;
    /// this is what the cost model reads.
    pub fn recompute_aggregates(&mut self, cfg: &PostalConfig) {
        let trips = self.annual_trips;
        let mut agg = ScheduleAggregates {
            annual_miles: self.mileage * trips,
            ..Default::default()
        };

        let lunch_minutes: i64 = self.stops.iter().filter(|s| s.is_lunch()).map(|s| s.layover()).sum();
        agg.paid_minutes = self.raw_duration() - lunch_minutes;
        agg.annual_hours = agg.paid_minutes as f64 * trips / 60.0;

        if let Some(first) = self.original_stops.first() {
            let night = night_differential(
                cfg.night_diff_end,
                cfg.night_diff_start,
                cminute(first.arrive_time),
                self.original_duration,
            )
            .unwrap_or(0);
            agg.night_hours_as_read = night as f64 * trips / 60.0;
        }

        if let Some(first) = self.postalized_stops.first() {
            let night = night_differential(
                cfg.night_diff_end,
                cfg.night_diff_start,
                cminute(first.arrive_time),
                self.postalized_duration,
            )
            .unwrap_or(0);
            agg.night_hours_postalized = night as f64 * trips / 60.0;

            let split = day_minutes(first.arrive_time, self.postalized_duration);
            let mut weekday = 0;
            let mut saturday = 0;
            let mut sunday = 0;

            for day in 0..7 {
                if !self.frequency.days[day] {
                    continue;
                }
                // day 0 = Monday ... 6 = Sunday; spillover lands on the
                // following calendar day(s).
                let buckets = [split.today, split.tomorrow, split.day_after];
                for (offset, minutes) in buckets.iter().enumerate() {
                    match (day + offset) % 7 {
                        5 => saturday += minutes,
                        6 => sunday += minutes,
                        _ => weekday += minutes,
                    }
                }
            }

            agg.weekday_hours = weekday as f64 / 60.0;
            agg.saturday_hours = saturday as f64 / 60.0;
            agg.sunday_hours = sunday as f64 / 60.0;
        }

        agg.annual_calculated_duration_hours = self.original_duration as f64 * trips / 60.0;
        agg.annual_postalized_duration_hours = self.postalized_duration as f64 * trips / 60.0;
        agg.annual_calculated_mileage = self.original_mileage * trips;
        agg.annual_postalized_mileage = self.postalized_mileage * trips;

        let standby_minutes: i64 = self
            .stops
            .iter()
            .filter(|s| is_standby_keyword(&s.stop_name))
            .map(|s| s.layover())
            .sum();
        agg.unassigned_hours = standby_minutes as f64 * trips / 60.0;
        if agg.unassigned_hours > 0.0 {
            warn!(
                schedule = %self.schedule_name,
                hours = agg.unassigned_hours,
                "schedule carries unassigned standby time"
            );
        }

        self.aggregates = agg;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn site() -> SiteIdentity {
        SiteIdentity {
            pvs_name: "SPRINGFIELD PVS".to_string(),
            pdc_name: "SPRINGFIELD P&DC".to_string(),
            hcr_pdc_name: Some("SPRINGFIELD PROC & DIST CTR".to_string()),
            short_name: "SPRINGFIELD".to_string(),
            pdc_address: Some("US POSTAL SERVICE, 1 DEPOT WAY".to_string()),
        }
    }

    fn freq() -> FrequencyCode {
        FrequencyCode::from_bitstring("0110", "1111100").unwrap()
    }

    fn hcr_schedule(stops: Vec<Stop>) -> Schedule {
        Schedule::from_hcr_plate(
            "75101",
            5,
            site(),
            freq(),
            303.0,
            "T7".to_string(),
            VehicleCategory::Single,
            20.0,
            stops,
        )
    }

    fn basic_stops() -> Vec<Stop> {
        vec![
            Stop::new(hm(8, 0), hm(8, 14), "SPRINGFIELD PVS"),
            Stop::new(hm(8, 15), hm(8, 25), "SPRINGFIELD P&DC"),
            Stop::new(hm(9, 0), hm(9, 30), "MAIN ST STATION"),
            Stop::new(hm(10, 0), hm(10, 10), "SPRINGFIELD P&DC"),
            Stop::new(hm(10, 11), hm(10, 25), "SPRINGFIELD PVS"),
        ]
    }

    #[test]
    fn hcr_name_from_plate_and_trip() {
        let s = hcr_schedule(basic_stops());
        assert_eq!(s.schedule_name, "75101 5");
        assert_eq!(s.source_file.as_deref(), Some("75101"));
        assert_eq!(s.original_duration, s.raw_duration());
        assert_eq!(s.original_stops, s.stops);
    }

    #[test]
    fn snapshots_are_independent() {
        let mut s = hcr_schedule(basic_stops());
        s.stops[0].shift(30);
        assert_ne!(s.stops[0].arrive_time, s.original_stops[0].arrive_time);
    }

    #[test]
    fn optimizer_name_encodes_tour_vehicle_index() {
        let mut stops = basic_stops();
        stops[0].arrive_cminute = Some(1300);
        let s = Schedule::from_optimizer(
            7,
            site(),
            freq(),
            303.0,
            "Single".to_string(),
            20.0,
            stops,
        );
        assert_eq!(s.schedule_name, "11007");

        let mut stops = basic_stops();
        stops[0].arrive_cminute = Some(2100);
        let s = Schedule::from_optimizer(7, site(), freq(), 303.0, "11-Ton".to_string(), 20.0, stops);
        assert_eq!(s.schedule_name, "23007");
    }

    #[test]
    fn html_report_derives_annual_trips_from_miles() {
        let reported = ReportedMetrics {
            annual_miles: 6060.0,
            annual_hours: 2000.0,
            holiday_hours: 0.0,
            unassigned_hours: None,
        };
        let s = Schedule::from_html_report(42, site(), freq(), 20.0, basic_stops(), reported);
        assert!((s.annual_trips - 303.0).abs() < 1e-9);
        assert_eq!(s.schedule_name, "SPRINGFIELD P&DC 42");
    }

    #[test]
    fn good_lunch_detected() {
        let cfg = PostalConfig::default();
        let mut stops = basic_stops();
        stops.insert(3, Stop::new(hm(9, 40), hm(10, 15), "LUNCH"));
        // Stretch the day so the lunch is genuinely inside the window.
        let s = hcr_schedule(stops);
        assert!(s.has_good_lunch(&cfg));
    }

    #[test]
    fn short_lunch_rejected() {
        let cfg = PostalConfig::default();
        let mut stops = basic_stops();
        stops.insert(3, Stop::new(hm(9, 40), hm(9, 50), "LUNCH"));
        let s = hcr_schedule(stops);
        assert!(!s.has_good_lunch(&cfg));
    }

    #[test]
    fn multiple_lunches_rejected() {
        let cfg = PostalConfig::default();
        let mut stops = basic_stops();
        stops.insert(3, Stop::new(hm(9, 40), hm(10, 15), "LUNCH"));
        stops.insert(2, Stop::new(hm(8, 30), hm(8, 59), "Lunch"));
        let s = hcr_schedule(stops);
        assert!(!s.has_good_lunch(&cfg));
    }

    #[test]
    fn facility_names_normalized() {
        let mut stops = basic_stops();
        stops[1].stop_name = "SPRINGFIELD PROC & DIST CTR".to_string();
        let mut s = hcr_schedule(stops);
        s.normalize_facility_names();
        assert_eq!(s.stops[1].stop_name, "SPRINGFIELD P&DC");
    }

    #[test]
    fn travel_time_correction_shifts_preceding_stops() {
        let stops = vec![
            Stop::new(hm(8, 0), hm(8, 10), "A"),
            Stop::new(hm(8, 10), hm(8, 20), "B"), // zero travel from A
            Stop::new(hm(8, 40), hm(8, 50), "C"),
        ];
        let mut s = hcr_schedule(stops);
        s.correct_travel_times();

        assert_eq!(s.stops[0].depart_time, hm(8, 9));
        assert_eq!(duration(s.stops[0].depart_time, s.stops[1].arrive_time), 1);
        // Untouched downstream.
        assert_eq!(s.stops[2].arrive_time, hm(8, 40));
    }

    #[test]
    fn trim_and_wrap_round_trips_depot_legs() {
        let cfg = PostalConfig::default();
        let mut s = hcr_schedule(basic_stops());
        assert!(s.trim_depot_stops());
        assert_eq!(s.stops.len(), 1);
        assert_eq!(s.stops[0].stop_name, "MAIN ST STATION");

        s.add_depot_wrap(&cfg);
        assert_eq!(s.stops.first().unwrap().stop_name, "SPRINGFIELD PVS");
        assert_eq!(s.stops[1].stop_name, "SPRINGFIELD P&DC");
        assert_eq!(s.stops.last().unwrap().stop_name, "SPRINGFIELD PVS");
        assert_eq!(s.stops[1].layover(), cfg.pdc_time);
        assert_eq!(s.stops.first().unwrap().layover(), cfg.pvs_time);
    }

    #[test]
    fn all_depot_stops_marks_spotter() {
        let stops = vec![
            Stop::new(hm(8, 0), hm(8, 14), "SPRINGFIELD PVS"),
            Stop::new(hm(8, 15), hm(8, 25), "SPRINGFIELD P&DC"),
        ];
        let mut s = hcr_schedule(stops);
        assert!(!s.trim_depot_stops());
        assert_eq!(s.stops.len(), 2);
    }

    #[test]
    fn cminutes_walk_the_stop_list() {
        let cfg = PostalConfig::default();
        let mut s = hcr_schedule(basic_stops());
        s.set_cminutes(&cfg);

        let first = s.stops[0].arrive_cminute.unwrap();
        // 08:00 is before tour one (20:00), so the schedule lands on the
        // next staffing day.
        assert_eq!(first, 480 + MINUTES_PER_DAY);
        for i in 1..s.stops.len() {
            let prev = s.stops[i - 1].depart_cminute.unwrap();
            let travel = duration(s.stops[i - 1].depart_time, s.stops[i].arrive_time);
            assert_eq!(s.stops[i].arrive_cminute.unwrap(), prev + travel);
        }
    }

    #[test]
    fn low_trip_hcr_schedule_is_holiday() {
        let mut s = hcr_schedule(basic_stops());
        s.annual_trips = 12.0;
        s.detect_holiday();
        assert!(s.holiday);
    }

    #[test]
    fn insource_check_records_reasons() {
        let cfg = PostalConfig::default();
        let mut s = hcr_schedule(basic_stops());
        s.original_mileage = 1000.0;
        assert!(!s.insource_eligible_check(&cfg));
        assert_eq!(s.cannot_insource_reasons, vec!["Mileage".to_string()]);
    }

    #[test]
    fn aggregates_annualize_by_trips() {
        let cfg = PostalConfig::default();
        let mut s = hcr_schedule(basic_stops());
        s.postalized_duration = s.original_duration;
        s.postalized_mileage = s.mileage;
        s.recompute_aggregates(&cfg);

        assert!((s.aggregates.annual_miles - 20.0 * 303.0).abs() < 1e-9);
        assert_eq!(s.aggregates.paid_minutes, s.raw_duration());
        assert!(
            (s.aggregates.annual_postalized_duration_hours
                - s.postalized_duration as f64 * 303.0 / 60.0)
                .abs()
                < 1e-9
        );
        // 08:00–10:25 is all daytime.
        assert_eq!(s.aggregates.night_hours_as_read, 0.0);
        // Five weekday runs, no weekend spill.
        assert_eq!(s.aggregates.saturday_hours, 0.0);
        assert_eq!(s.aggregates.sunday_hours, 0.0);
        assert!(s.aggregates.weekday_hours > 0.0);
    }

    #[test]
    fn friday_overnight_spills_into_saturday() {
        let cfg = PostalConfig::default();
        let stops = vec![
            Stop::new(hm(22, 0), hm(22, 14), "SPRINGFIELD PVS"),
            Stop::new(hm(23, 0), hm(23, 30), "MAIN ST STATION"),
            Stop::new(hm(2, 0), hm(2, 14), "SPRINGFIELD PVS"),
        ];
        let mut s = Schedule::from_hcr_plate(
            "75101",
            5,
            site(),
            FrequencyCode::from_bitstring("0005", "0000100").unwrap(), // Friday only
            52.0,
            "T7".to_string(),
            VehicleCategory::Single,
            20.0,
            stops,
        );
        s.postalized_duration = s.original_duration;
        s.postalized_stops = s.stops.clone();
        s.recompute_aggregates(&cfg);

        assert!(s.aggregates.saturday_hours > 0.0);
        assert_eq!(s.aggregates.sunday_hours, 0.0);
        // Night differential covers the whole overnight run.
        assert!(s.aggregates.night_hours_postalized > 0.0);
    }
}
