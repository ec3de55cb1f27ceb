use chrono::{Datelike, NaiveDate};

use crate::config::CalendarConfig;
use crate::context::{LegRole, TripContext};

/// Corporate travel-day and trip-length rules for round trips.
#[derive(Debug, Clone, Copy)]
pub struct TripCalendar<'a> {
    rules: &'a CalendarConfig,
    original_duration: i64,
    tolerance: i64,
}

impl<'a> TripCalendar<'a> {
    pub fn new(rules: &'a CalendarConfig, original_duration: i64, tolerance: i64) -> Self {
        Self {
            rules,
            original_duration,
            tolerance: tolerance.max(0),
        }
    }

    /// Built from the selected outbound/return dates, falling back to the
    /// declared trip duration. `None` for trips that are not round trips.
    pub fn for_trip(
        context: &TripContext,
        rules: &'a CalendarConfig,
        tolerance: i64,
    ) -> Option<Self> {
        let declared = context.trip_duration_days?;
        if !context.is_round_trip() {
            return None;
        }
        let selected = context
            .outbound_leg()
            .and_then(|l| l.selected_option())
            .zip(context.return_leg().and_then(|l| l.selected_option()))
            .map(|(out, ret)| (ret.date() - out.date()).num_days());
        Some(Self::new(rules, selected.unwrap_or(declared), tolerance))
    }

    pub fn original_duration(&self) -> i64 {
        self.original_duration
    }

    pub fn outbound_day_allowed(&self, date: NaiveDate) -> bool {
        self.rules.outbound_weekdays.is_empty()
            || self.rules.outbound_weekdays.contains(&date.weekday())
    }

    pub fn return_day_allowed(&self, date: NaiveDate) -> bool {
        self.rules.return_weekdays.is_empty() || self.rules.return_weekdays.contains(&date.weekday())
    }

    pub fn duration_allowed(&self, duration: i64) -> bool {
        duration > 0 && (duration - self.original_duration).abs() <= self.tolerance
    }

    pub fn pair_allowed(&self, outbound: NaiveDate, return_date: NaiveDate) -> bool {
        self.duration_allowed((return_date - outbound).num_days())
            && self.outbound_day_allowed(outbound)
            && self.return_day_allowed(return_date)
    }

    /// Checks a single-leg move with the opposite leg kept on `anchor`.
    ///
    /// Only the moved leg's weekday is checked; the anchor stays where the
    /// traveler booked it even if that day is outside the rules.
    pub fn leg_move_allowed(&self, role: LegRole, new_date: NaiveDate, anchor: NaiveDate) -> bool {
        match role {
            LegRole::Outbound => {
                self.duration_allowed((anchor - new_date).num_days())
                    && self.outbound_day_allowed(new_date)
            }
            LegRole::Return => {
                self.duration_allowed((new_date - anchor).num_days())
                    && self.return_day_allowed(new_date)
            }
            LegRole::Intermediate | LegRole::OneWay => true,
        }
    }
}
