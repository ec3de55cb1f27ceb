pub mod sample;
pub mod validate;

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::airlines::Alliance;

pub use validate::{validate_context, ContextError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CabinClass {
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl CabinClass {
    pub fn one_tier_down(self) -> Option<Self> {
        match self {
            Self::Economy => None,
            Self::PremiumEconomy => Some(Self::Economy),
            Self::Business => Some(Self::PremiumEconomy),
            Self::First => Some(Self::Business),
        }
    }

    pub fn is_premium(self) -> bool {
        matches!(self, Self::Business | Self::First)
    }

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Economy => "economy",
            Self::PremiumEconomy => "premium_economy",
            Self::Business => "business",
            Self::First => "first",
        }
    }
}

impl Display for CabinClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Economy => "Economy",
            Self::PremiumEconomy => "Premium Economy",
            Self::Business => "Business",
            Self::First => "First",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricedOption {
    pub id: String,
    pub airline_code: String,
    pub airline_name: String,
    #[serde(default)]
    pub flight_numbers: Vec<String>,
    pub origin: String,
    pub destination: String,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
    pub duration_minutes: u32,
    #[serde(default)]
    pub stops: u32,
    #[serde(default)]
    pub stop_airports: Vec<String>,
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub cabin: CabinClass,
    #[serde(default)]
    pub is_alternate_airport: bool,
    #[serde(default)]
    pub is_alternate_date: bool,
}

impl PricedOption {
    pub fn date(&self) -> NaiveDate {
        self.departure.date()
    }

    pub fn departure_hour(&self) -> u32 {
        self.departure.hour()
    }

    pub fn has_valid_price(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }

    pub fn same_airports(&self, other: &PricedOption) -> bool {
        self.origin.eq_ignore_ascii_case(&other.origin)
            && self.destination.eq_ignore_ascii_case(&other.destination)
    }

    pub fn same_airline(&self, other: &PricedOption) -> bool {
        self.airline_code.eq_ignore_ascii_case(&other.airline_code)
    }

    pub fn route_label(&self) -> String {
        format!("{}-{}", self.origin, self.destination)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TravelerProfile {
    pub id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub excluded_airlines: BTreeSet<String>,
    #[serde(default)]
    pub preferred_alliances: Vec<Alliance>,
    #[serde(default)]
    pub loyalty_airlines: BTreeSet<String>,
}

impl TravelerProfile {
    pub fn excludes(&self, airline_code: &str) -> bool {
        self.excluded_airlines
            .iter()
            .any(|code| code.eq_ignore_ascii_case(airline_code))
    }

    pub fn is_loyal_to(&self, airline_code: &str) -> bool {
        self.loyalty_airlines
            .iter()
            .any(|code| code.eq_ignore_ascii_case(airline_code))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RateConfidence {
    Known,
    Estimated,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LodgingRate {
    pub nightly_rate: Option<f64>,
    #[serde(default)]
    pub chain: Option<String>,
    #[serde(default)]
    pub confidence: RateConfidence,
}

impl LodgingRate {
    /// A rate usable for arithmetic: present, finite and positive.
    pub fn usable_rate(&self) -> Option<f64> {
        if self.confidence == RateConfidence::Unknown {
            return None;
        }
        self.nightly_rate.filter(|r| r.is_finite() && *r > 0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LegContext {
    pub leg_id: String,
    pub origin: String,
    pub destination: String,
    pub preferred_date: NaiveDate,
    #[serde(default)]
    pub flexibility_days: u32,
    pub cabin: CabinClass,
    #[serde(default = "default_passengers")]
    pub passengers: u32,
    #[serde(default)]
    pub selected: Option<PricedOption>,
    #[serde(default)]
    pub options: Vec<PricedOption>,
    #[serde(default)]
    pub lodging: LodgingRate,
}

impl LegContext {
    pub fn valid_options(&self) -> impl Iterator<Item = &PricedOption> {
        self.options.iter().filter(|o| o.has_valid_price())
    }

    pub fn selected_option(&self) -> Option<&PricedOption> {
        self.selected.as_ref().filter(|s| s.has_valid_price())
    }

    pub fn selected_price(&self) -> Option<f64> {
        self.selected_option().map(|s| s.price)
    }

    /// Priced options on airlines the traveler has not excluded.
    pub fn bookable_options<'a>(
        &'a self,
        traveler: &'a TravelerProfile,
    ) -> impl Iterator<Item = &'a PricedOption> {
        self.valid_options()
            .filter(move |o| !traveler.excludes(&o.airline_code))
    }

    /// Cheapest bookable price for this leg in the selection's cabin (or the
    /// leg cabin), never above the selected price.
    pub fn cheapest_price(&self, traveler: &TravelerProfile) -> Option<f64> {
        let cabin = self.selected_option().map(|s| s.cabin).unwrap_or(self.cabin);
        let cheapest = self
            .bookable_options(traveler)
            .filter(|o| o.cabin == cabin)
            .map(|o| o.price)
            .min_by(|a, b| a.total_cmp(b));
        match (cheapest, self.selected_price()) {
            (Some(c), Some(s)) => Some(c.min(s)),
            (Some(c), None) => Some(c),
            (None, s) => s,
        }
    }

    pub fn route_label(&self) -> String {
        format!("{}-{}", self.origin, self.destination)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LegRole {
    Outbound,
    Return,
    Intermediate,
    OneWay,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripContext {
    pub trip_id: String,
    pub traveler: TravelerProfile,
    pub legs: Vec<LegContext>,
    #[serde(default)]
    pub trip_duration_days: Option<i64>,
    #[serde(default)]
    pub nearby_events: Vec<String>,
}

impl TripContext {
    pub fn is_round_trip(&self) -> bool {
        self.trip_duration_days.is_some() && self.legs.len() >= 2
    }

    pub fn leg_role(&self, index: usize) -> LegRole {
        if !self.is_round_trip() {
            return LegRole::OneWay;
        }
        if index == 0 {
            LegRole::Outbound
        } else if index + 1 == self.legs.len() {
            LegRole::Return
        } else {
            LegRole::Intermediate
        }
    }

    pub fn outbound_leg(&self) -> Option<&LegContext> {
        if self.is_round_trip() {
            self.legs.first()
        } else {
            None
        }
    }

    pub fn return_leg(&self) -> Option<&LegContext> {
        if self.is_round_trip() {
            self.legs.last()
        } else {
            None
        }
    }

    /// Lodging rate that applies to the stay a leg shift would lengthen or shorten.
    ///
    /// Each leg's `lodging` is the stay at its destination, so a return shift
    /// changes the stay reached by the leg before it.
    pub fn stay_rate_for(&self, index: usize) -> Option<&LodgingRate> {
        match self.leg_role(index) {
            LegRole::Return => self.last_stay(),
            LegRole::Outbound | LegRole::Intermediate | LegRole::OneWay => {
                self.legs.get(index).map(|l| &l.lodging)
            }
        }
    }

    /// Stay that begins with the outbound flight.
    pub fn first_stay(&self) -> Option<&LodgingRate> {
        self.outbound_leg().map(|l| &l.lodging)
    }

    /// Stay that ends with the return flight.
    pub fn last_stay(&self) -> Option<&LodgingRate> {
        if !self.is_round_trip() {
            return None;
        }
        self.legs
            .len()
            .checked_sub(2)
            .and_then(|i| self.legs.get(i))
            .map(|l| &l.lodging)
    }

    /// Airlines the traveler already flies on this trip or holds loyalty with.
    pub fn traveler_airlines(&self) -> BTreeSet<String> {
        let mut out: BTreeSet<String> = self
            .traveler
            .loyalty_airlines
            .iter()
            .map(|c| c.to_ascii_uppercase())
            .collect();
        for leg in &self.legs {
            if let Some(selected) = leg.selected_option() {
                out.insert(selected.airline_code.to_ascii_uppercase());
            }
        }
        out
    }

    pub fn has_any_selection(&self) -> bool {
        self.legs.iter().any(|l| l.selected_option().is_some())
    }
}

pub fn round_money(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 100.0).round() / 100.0
}

pub fn percent_of(part: f64, whole: f64) -> f64 {
    if !part.is_finite() || !whole.is_finite() || whole <= 0.0 {
        return 0.0;
    }
    part / whole * 100.0
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_passengers() -> u32 {
    1
}
