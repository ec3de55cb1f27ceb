//! Lodging cost effects of date changes.
//!
//! Night deltas follow the traveler's stay: positive means more nights at the
//! destination. A delta is only priced when the stay has a usable corporate
//! rate; otherwise the impact is reported as `unknown` and net savings fall
//! back to the flight savings alone.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::context::{round_money, LegRole, LodgingRate, RateConfidence};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImpactStatus {
    Known,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LodgingImpact {
    pub status: ImpactStatus,
    pub nights_added: i64,
    pub nightly_rate: Option<f64>,
    pub cost_delta: Option<f64>,
    pub rate_confidence: RateConfidence,
    pub chain: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NetBasis {
    LodgingAdjusted,
    FlightOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetSavings {
    pub amount: f64,
    pub basis: NetBasis,
    pub confidently_positive: bool,
}

/// Prices a night delta against a stay's rate.
pub fn price_nights(nights_added: i64, rate: Option<&LodgingRate>) -> LodgingImpact {
    let usable = rate.and_then(LodgingRate::usable_rate);
    let (status, cost_delta) = match usable {
        Some(nightly) => (
            ImpactStatus::Known,
            Some(round_money(nights_added as f64 * nightly)),
        ),
        None => (ImpactStatus::Unknown, None),
    };
    LodgingImpact {
        status,
        nights_added,
        nightly_rate: usable,
        cost_delta,
        rate_confidence: rate.map(|r| r.confidence).unwrap_or_default(),
        chain: rate.and_then(|r| r.chain.clone()),
    }
}

/// Night change caused by moving one leg from `original` to `new`.
pub fn nights_for_leg_shift(role: LegRole, original: NaiveDate, new: NaiveDate) -> i64 {
    let shift = (new - original).num_days();
    match role {
        // Leaving earlier lengthens the stay.
        LegRole::Outbound => -shift,
        LegRole::Return => shift,
        LegRole::Intermediate | LegRole::OneWay => 0,
    }
}

/// Lodging impact of a single-leg date shift.
///
/// Intermediate legs move nights from the stay before the leg (`previous_stay`)
/// to the stay after it (`stay`); the delta is the rate difference times the
/// shift, and is unknown unless both rates are usable.
pub fn leg_shift_impact(
    role: LegRole,
    original: NaiveDate,
    new: NaiveDate,
    stay: Option<&LodgingRate>,
    previous_stay: Option<&LodgingRate>,
) -> LodgingImpact {
    if role != LegRole::Intermediate {
        return price_nights(nights_for_leg_shift(role, original, new), stay);
    }

    let shift = (new - original).num_days();
    let before = previous_stay.and_then(LodgingRate::usable_rate);
    let after = stay.and_then(LodgingRate::usable_rate);
    let mut impact = price_nights(-shift, stay);
    match (before, after) {
        (Some(before), Some(after)) => {
            impact.cost_delta = Some(round_money(shift as f64 * (before - after)));
            impact.status = ImpactStatus::Known;
        }
        _ => {
            impact.cost_delta = None;
            impact.status = ImpactStatus::Unknown;
        }
    }
    impact
}

/// Night change for a round trip moved from one date pair to another.
pub fn nights_for_window_shift(
    original_outbound: NaiveDate,
    original_return: NaiveDate,
    new_outbound: NaiveDate,
    new_return: NaiveDate,
) -> i64 {
    let original = (original_return - original_outbound).num_days();
    let proposed = (new_return - new_outbound).num_days();
    proposed - original
}

/// Lodging impact of moving a round trip to a new date pair.
///
/// The outbound delta is priced at the first stay and the return delta at the
/// last stay; on a two-leg trip both are the same stay. The impact is unknown
/// when any stay whose nights change lacks a usable rate.
pub fn window_shift_impact(
    original_outbound: NaiveDate,
    original_return: NaiveDate,
    new_outbound: NaiveDate,
    new_return: NaiveDate,
    first_stay: Option<&LodgingRate>,
    last_stay: Option<&LodgingRate>,
) -> LodgingImpact {
    let outbound_nights = nights_for_leg_shift(LegRole::Outbound, original_outbound, new_outbound);
    let return_nights = nights_for_leg_shift(LegRole::Return, original_return, new_return);
    let nights_added =
        nights_for_window_shift(original_outbound, original_return, new_outbound, new_return);

    let parts = [(outbound_nights, first_stay), (return_nights, last_stay)];
    let mut cost = 0.0;
    let mut rates = Vec::with_capacity(2);
    let mut known = true;
    for (nights, stay) in parts.iter().filter(|(nights, _)| *nights != 0) {
        match stay.and_then(LodgingRate::usable_rate) {
            Some(rate) => {
                cost += *nights as f64 * rate;
                rates.push(rate);
            }
            None => known = false,
        }
    }
    let nightly_rate = match rates.as_slice() {
        [] => first_stay.and_then(LodgingRate::usable_rate),
        [rate] => Some(*rate),
        [a, b, ..] if a == b => Some(*a),
        _ => None,
    };
    let reference = parts
        .iter()
        .find(|(nights, _)| *nights != 0)
        .and_then(|(_, stay)| *stay)
        .or(first_stay);

    LodgingImpact {
        status: if known {
            ImpactStatus::Known
        } else {
            ImpactStatus::Unknown
        },
        nights_added,
        nightly_rate,
        cost_delta: known.then(|| round_money(cost)),
        rate_confidence: reference.map(|r| r.confidence).unwrap_or_default(),
        chain: reference.and_then(|r| r.chain.clone()),
    }
}

/// Reconciles flight savings with a lodging delta.
pub fn net_savings(
    flight_savings: f64,
    impact: Option<&LodgingImpact>,
    materiality: f64,
) -> NetSavings {
    match impact.and_then(|i| i.cost_delta) {
        Some(delta) => {
            let amount = round_money(flight_savings - delta);
            NetSavings {
                amount,
                basis: NetBasis::LodgingAdjusted,
                confidently_positive: amount > 0.0,
            }
        }
        None => NetSavings {
            amount: round_money(flight_savings),
            basis: NetBasis::FlightOnly,
            confidently_positive: flight_savings > materiality,
        },
    }
}
