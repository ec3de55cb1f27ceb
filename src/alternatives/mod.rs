pub mod calendar;
pub mod layers;
pub mod trip_window;

use std::fmt::{Display, Formatter};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::context::{CabinClass, PricedOption, TripContext};
use crate::lodging::{LodgingImpact, NetSavings};

pub use layers::generate_leg_alternatives;
pub use trip_window::generate_trip_window_proposals;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DisruptionLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ChangedAttribute {
    Airline,
    Airport,
    Routing,
    Date,
    Cabin,
}

/// What an alternative changes relative to the selected flight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlternativeKind {
    SameDateSwap {
        from_airline: String,
        to_airline: String,
    },
    NearbyAirport {
        origin: String,
        destination: String,
        replaces: String,
    },
    AlternateRouting {
        added_stops: u32,
        via: Vec<String>,
    },
    DateShift {
        original_date: NaiveDate,
        new_date: NaiveDate,
        days_shifted: i64,
    },
    CabinDowngrade {
        from_cabin: CabinClass,
        to_cabin: CabinClass,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AlternativeType {
    SameDateSwap,
    NearbyAirport,
    AlternateRouting,
    DateShift,
    CabinDowngrade,
}

impl AlternativeKind {
    pub fn alternative_type(&self) -> AlternativeType {
        match self {
            Self::SameDateSwap { .. } => AlternativeType::SameDateSwap,
            Self::NearbyAirport { .. } => AlternativeType::NearbyAirport,
            Self::AlternateRouting { .. } => AlternativeType::AlternateRouting,
            Self::DateShift { .. } => AlternativeType::DateShift,
            Self::CabinDowngrade { .. } => AlternativeType::CabinDowngrade,
        }
    }

    pub fn layer(&self) -> u8 {
        match self {
            Self::SameDateSwap { .. } | Self::NearbyAirport { .. } | Self::AlternateRouting { .. } => 1,
            Self::DateShift { .. } => 2,
            Self::CabinDowngrade { .. } => 4,
        }
    }

    pub fn disruption(&self) -> DisruptionLevel {
        match self.layer() {
            1 => DisruptionLevel::Low,
            2 => DisruptionLevel::Medium,
            _ => DisruptionLevel::High,
        }
    }
}

impl Display for AlternativeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::SameDateSwap => "same_date_swap",
            Self::NearbyAirport => "nearby_airport",
            Self::AlternateRouting => "alternate_routing",
            Self::DateShift => "date_shift",
            Self::CabinDowngrade => "cabin_downgrade",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alternative {
    pub kind: AlternativeKind,
    pub layer: u8,
    pub disruption: DisruptionLevel,
    pub changed: Vec<ChangedAttribute>,
    pub savings_amount: f64,
    pub savings_percent: f64,
    pub lodging_impact: Option<LodgingImpact>,
    pub net_savings: Option<NetSavings>,
    pub is_user_airline: bool,
    pub option: PricedOption,
}

impl Alternative {
    /// Net savings when lodging was priced, flight savings otherwise.
    pub fn effective_savings(&self) -> f64 {
        self.net_savings
            .as_ref()
            .map(|n| n.amount)
            .unwrap_or(self.savings_amount)
    }

    pub fn alternative_type(&self) -> AlternativeType {
        self.kind.alternative_type()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightSummary {
    pub option_id: String,
    pub airline_code: String,
    pub airline_name: String,
    pub flight_numbers: Vec<String>,
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
    pub stops: u32,
    pub price: f64,
    pub cabin: CabinClass,
}

impl From<&PricedOption> for FlightSummary {
    fn from(option: &PricedOption) -> Self {
        Self {
            option_id: option.id.clone(),
            airline_code: option.airline_code.clone(),
            airline_name: option.airline_name.clone(),
            flight_numbers: option.flight_numbers.clone(),
            origin: option.origin.clone(),
            destination: option.destination.clone(),
            date: option.date(),
            departure: option.departure,
            arrival: option.arrival,
            stops: option.stops,
            price: option.price,
            cabin: option.cabin,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ProposalCategory {
    TripWindow,
    DifferentMonth,
}

impl Display for ProposalCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TripWindow => write!(f, "trip_window"),
            Self::DifferentMonth => write!(f, "different_month"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SearchPass {
    Cheapest,
    TravelerAirline,
    SingleCarrier,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripWindowProposal {
    pub outbound: FlightSummary,
    #[serde(rename = "return")]
    pub return_flight: FlightSummary,
    pub combined_price: f64,
    pub savings_amount: f64,
    pub savings_percent: f64,
    pub trip_duration_days: i64,
    pub duration_change_days: i64,
    pub shift_days: i64,
    pub same_airline: bool,
    pub is_user_airline: bool,
    pub layer: u8,
    pub category: ProposalCategory,
    pub source_pass: SearchPass,
    pub lodging_impact: Option<LodgingImpact>,
    pub net_savings: Option<NetSavings>,
    pub reason: Option<String>,
}

impl TripWindowProposal {
    pub fn key(&self) -> ProposalKey {
        ProposalKey {
            outbound_date: self.outbound.date,
            return_date: self.return_flight.date,
            outbound_airline: self.outbound.airline_code.to_ascii_uppercase(),
            return_airline: self.return_flight.airline_code.to_ascii_uppercase(),
        }
    }

    pub fn effective_savings(&self) -> f64 {
        self.net_savings
            .as_ref()
            .map(|n| n.amount)
            .unwrap_or(self.savings_amount)
    }

    pub fn airline_label(&self) -> String {
        if self.same_airline {
            self.outbound.airline_code.clone()
        } else {
            format!(
                "{}/{}",
                self.outbound.airline_code, self.return_flight.airline_code
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProposalKey {
    pub outbound_date: NaiveDate,
    pub return_date: NaiveDate,
    pub outbound_airline: String,
    pub return_airline: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegAlternatives {
    pub leg_id: String,
    pub selected: Option<PricedOption>,
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedAlternatives {
    pub legs: Vec<LegAlternatives>,
    pub trip_window: Vec<TripWindowProposal>,
    pub different_month: Vec<TripWindowProposal>,
}

pub fn generate_alternatives(context: &TripContext, config: &EngineConfig) -> GeneratedAlternatives {
    let legs = context
        .legs
        .iter()
        .enumerate()
        .map(|(index, leg)| LegAlternatives {
            leg_id: leg.leg_id.clone(),
            selected: leg.selected_option().cloned(),
            alternatives: generate_leg_alternatives(context, index, config),
        })
        .collect::<Vec<_>>();

    let (trip_window, different_month) = generate_trip_window_proposals(context, config);
    debug!(
        "generated {} leg alternatives, {} trip-window and {} different-month proposals",
        legs.iter().map(|l| l.alternatives.len()).sum::<usize>(),
        trip_window.len(),
        different_month.len()
    );

    GeneratedAlternatives {
        legs,
        trip_window,
        different_month,
    }
}
