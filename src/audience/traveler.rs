use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::advisor::{AdvisorOutput, DecisionLabel, TripTotals};
use crate::alternatives::{AlternativeKind, AlternativeType, FlightSummary};
use crate::config::AdvisorConfig;
use crate::context::{percent_of, round_money, CabinClass, TripContext};
use crate::resolver::{ResolvedLeg, ResolvedProposal};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelerAlternative {
    pub short_id: String,
    pub rank: usize,
    pub alternative_type: AlternativeType,
    pub airline: String,
    pub route: String,
    pub departure: String,
    pub cabin: CabinClass,
    pub stops: u32,
    pub price: f64,
    pub savings_amount: f64,
    pub net_savings: Option<f64>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelerLeg {
    pub leg_id: String,
    pub route: String,
    pub selected: Option<FlightSummary>,
    pub best_savings: Option<f64>,
    pub alternatives: Vec<TravelerAlternative>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelerProposal {
    pub short_id: String,
    pub outbound_date: NaiveDate,
    pub return_date: NaiveDate,
    pub airline: String,
    pub combined_price: f64,
    pub savings_amount: f64,
    pub net_savings: Option<f64>,
    pub nights_change: i64,
    pub reason: String,
}

/// Offered when every leg can drop a cabin tier and the total is worth it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CabinDowngradeSuggestion {
    pub total_savings: f64,
    pub savings_percent: f64,
    pub short_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelerView {
    pub trip_id: String,
    pub decision: Option<DecisionLabel>,
    pub summary: String,
    pub key_insight: String,
    pub totals: TripTotals,
    pub legs: Vec<TravelerLeg>,
    pub trip_window: Vec<TravelerProposal>,
    pub different_month: Vec<TravelerProposal>,
    pub cabin_downgrade: Option<CabinDowngradeSuggestion>,
}

pub fn traveler_view(
    output: &AdvisorOutput,
    context: &TripContext,
    config: &AdvisorConfig,
) -> TravelerView {
    let resolved = &output.resolved;
    TravelerView {
        trip_id: context.trip_id.clone(),
        decision: output.decision,
        summary: output.summary.clone(),
        key_insight: output.key_insight.clone(),
        totals: output.totals.clone(),
        legs: resolved.legs.iter().map(traveler_leg).collect(),
        trip_window: resolved.trip_window.iter().map(traveler_proposal).collect(),
        different_month: resolved
            .different_month
            .iter()
            .map(traveler_proposal)
            .collect(),
        cabin_downgrade: cabin_downgrade_suggestion(&resolved.legs, &output.totals, config),
    }
}

/// Sums the best curated downgrade per leg; `None` unless every leg has one
/// and the total clears both the amount and percentage minimums.
pub fn cabin_downgrade_suggestion(
    legs: &[ResolvedLeg],
    totals: &TripTotals,
    config: &AdvisorConfig,
) -> Option<CabinDowngradeSuggestion> {
    if legs.is_empty() {
        return None;
    }
    let mut total_savings = 0.0;
    let mut short_ids = Vec::with_capacity(legs.len());
    for leg in legs {
        let best = leg
            .alternatives
            .iter()
            .filter(|a| matches!(a.candidate.kind, AlternativeKind::CabinDowngrade { .. }))
            .max_by(|a, b| a.candidate.savings_amount.total_cmp(&b.candidate.savings_amount))?;
        total_savings += best.candidate.savings_amount;
        short_ids.push(best.short_id.clone());
    }
    let savings_percent = percent_of(total_savings, totals.selected_total);
    if total_savings < config.downgrade_suggestion_min_savings
        || savings_percent < config.downgrade_suggestion_min_pct
    {
        return None;
    }
    Some(CabinDowngradeSuggestion {
        total_savings: round_money(total_savings),
        savings_percent: round_money(savings_percent),
        short_ids,
    })
}

fn traveler_leg(leg: &ResolvedLeg) -> TravelerLeg {
    TravelerLeg {
        leg_id: leg.leg_id.clone(),
        route: leg.route.clone(),
        selected: leg.selected.as_ref().map(FlightSummary::from),
        best_savings: leg
            .alternatives
            .iter()
            .map(|a| a.candidate.effective_savings())
            .max_by(f64::total_cmp),
        alternatives: leg
            .alternatives
            .iter()
            .map(|a| {
                let option = &a.candidate.option;
                TravelerAlternative {
                    short_id: a.short_id.clone(),
                    rank: a.rank,
                    alternative_type: a.candidate.alternative_type(),
                    airline: option.airline_name.clone(),
                    route: option.route_label(),
                    departure: option.departure.format("%a %b %-d %H:%M").to_string(),
                    cabin: option.cabin,
                    stops: option.stops,
                    price: option.price,
                    savings_amount: a.candidate.savings_amount,
                    net_savings: a.candidate.net_savings.as_ref().map(|n| n.amount),
                    reason: a.reason.clone().unwrap_or_default(),
                }
            })
            .collect(),
    }
}

fn traveler_proposal(proposal: &ResolvedProposal) -> TravelerProposal {
    let p = &proposal.candidate;
    TravelerProposal {
        short_id: proposal.short_id.clone(),
        outbound_date: p.outbound.date,
        return_date: p.return_flight.date,
        airline: p.airline_label(),
        combined_price: p.combined_price,
        savings_amount: p.savings_amount,
        net_savings: p.net_savings.as_ref().map(|n| n.amount),
        nights_change: p.duration_change_days,
        reason: proposal.reason.clone().unwrap_or_default(),
    }
}
