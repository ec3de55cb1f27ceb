use serde::{Deserialize, Serialize};

use crate::advisor::{AdvisorOutput, DecisionLabel, TripTotals};
use crate::context::TripContext;

/// One line of the approver's per-leg table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproverLeg {
    pub leg_id: String,
    pub route: String,
    pub selected_airline: Option<String>,
    pub selected_price: Option<f64>,
    pub cheapest_price: Option<f64>,
    pub premium: Option<f64>,
    pub best_alternative: Option<String>,
    pub best_savings: Option<f64>,
    pub over_budget: bool,
}

/// Flat summary for whoever signs off on the booking. Carries no
/// candidate lists, only the numbers and the narrative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproverView {
    pub trip_id: String,
    pub traveler_role: String,
    pub decision: Option<DecisionLabel>,
    pub totals: TripTotals,
    pub legs: Vec<ApproverLeg>,
    pub primary_driver: Option<String>,
    pub narrative: String,
    pub justification_prompt: Option<String>,
}

pub fn approver_view(output: &AdvisorOutput, context: &TripContext) -> ApproverView {
    let legs = context
        .legs
        .iter()
        .map(|leg| {
            let selected = leg.selected_option();
            let best = output.resolved.best_leg_alternative(&leg.leg_id);
            let cheapest = leg.cheapest_price(&context.traveler);
            let premium = match (leg.selected_price(), cheapest) {
                (Some(selected), Some(cheapest)) => Some((selected - cheapest).max(0.0)),
                _ => None,
            };
            ApproverLeg {
                leg_id: leg.leg_id.clone(),
                route: leg.route_label(),
                selected_airline: selected.map(|s| s.airline_name.clone()),
                selected_price: leg.selected_price(),
                cheapest_price: cheapest,
                premium,
                best_alternative: best.map(|b| b.short_id.clone()),
                best_savings: best.map(|b| b.candidate.effective_savings()),
                over_budget: output
                    .resolved
                    .legs
                    .iter()
                    .find(|l| l.leg_id == leg.leg_id)
                    .is_some_and(|l| l.alternatives.iter().any(|a| a.policy.is_over_budget())),
            }
        })
        .collect();

    let narrative = if output.key_insight.is_empty() {
        output.summary.clone()
    } else {
        format!("{} {}", output.summary, output.key_insight)
    };

    ApproverView {
        trip_id: context.trip_id.clone(),
        traveler_role: context.traveler.role.clone(),
        decision: output.decision,
        totals: output.totals.clone(),
        legs,
        primary_driver: output.drivers.primary().map(|d| {
            format!("{} on {} (${:.0})", d.kind, d.leg_id, d.amount)
        }),
        narrative,
        justification_prompt: output.justification_prompt.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::EngineConfig;
    use crate::context::sample::sample_round_trip;
    use crate::engine::TradeoffEngine;

    fn run(trip: &TripContext) -> AdvisorOutput {
        let engine = TradeoffEngine::new(Arc::new(EngineConfig::default()), None);
        tokio_test::block_on(engine.run(trip)).expect("valid trip")
    }

    #[test]
    fn summarises_each_leg() {
        let trip = sample_round_trip();
        let output = run(&trip);
        let view = approver_view(&output, &trip);
        assert_eq!(view.legs.len(), 2);
        let outbound = &view.legs[0];
        assert_eq!(outbound.selected_price, Some(620.0));
        assert_eq!(outbound.cheapest_price, Some(350.0));
        assert_eq!(outbound.premium, Some(270.0));
        assert_eq!(outbound.best_alternative.as_deref(), Some("L1A1"));
        assert!(view.narrative.starts_with(&output.summary));
    }

    #[test]
    fn optimize_decision_carries_justification_prompt() {
        let trip = sample_round_trip();
        let output = run(&trip);
        let view = approver_view(&output, &trip);
        assert_eq!(view.decision, Some(DecisionLabel::Optimize));
        assert!(view.justification_prompt.is_some());
        assert!(view.primary_driver.is_some());
    }

    #[test]
    fn no_selection_has_no_decision() {
        let mut trip = sample_round_trip();
        for leg in &mut trip.legs {
            leg.selected = None;
        }
        let output = run(&trip);
        let view = approver_view(&output, &trip);
        assert!(view.decision.is_none());
        assert!(view.legs.iter().all(|l| l.premium.is_none()));
        assert!(view.justification_prompt.is_none());
    }
}
