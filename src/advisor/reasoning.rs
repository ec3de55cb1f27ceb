use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::advisor::fallback::truncate;
use crate::advisor::{DecisionLabel, TripTotals};
use crate::alternatives::AlternativeKind;
use crate::context::TripContext;
use crate::drivers::CostDriverReport;
use crate::resolver::{ResolvedAlternative, ResolvedProposal, ResolvedResult};

const SYSTEM_GUIDANCE: &str = "You explain corporate flight trade-offs. For each candidate id, \
write one plain sentence on why it is worth considering. Reply with a single JSON object with \
keys: reasons (object of id to sentence), summary (one or two sentences), key_insight (one \
sentence), decision (approve, review or optimize) and optional justification_prompt.";

/// Phrases reasons for curated candidates. Implementations may fail or be
/// slow; the advisor bounds every call with a timeout.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    fn name(&self) -> &str;
    async fn reason(&self, request: &ReasoningRequest) -> Result<ReasoningResponse>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripMetadata {
    pub trip_id: String,
    pub traveler_role: String,
    pub legs: Vec<String>,
    pub trip_duration_days: Option<i64>,
    pub nearby_events: Vec<String>,
    pub selected_total: f64,
    pub cheapest_total: f64,
    pub premium: f64,
    pub premium_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningRequest {
    pub system: String,
    pub trip: TripMetadata,
    pub cost_drivers: String,
    pub candidates: String,
    pub decision: DecisionLabel,
    pub reason_max_chars: usize,
}

/// Every field is optional; missing pieces are filled by the fallback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReasoningResponse {
    #[serde(default)]
    pub reasons: BTreeMap<String, String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub key_insight: Option<String>,
    #[serde(default)]
    pub decision: Option<String>,
    #[serde(default)]
    pub justification_prompt: Option<String>,
}

impl ReasoningRequest {
    pub fn build(
        context: &TripContext,
        totals: &TripTotals,
        drivers: &CostDriverReport,
        resolved: &ResolvedResult,
        decision: DecisionLabel,
        reason_max_chars: usize,
    ) -> Self {
        let legs = context
            .legs
            .iter()
            .map(|leg| {
                let selected = leg
                    .selected_option()
                    .map(|s| format!("{} {} ${:.0}", s.airline_code, s.date(), s.price))
                    .unwrap_or_else(|| "no selection".to_string());
                format!("{} {} {} ({selected})", leg.leg_id, leg.route_label(), leg.cabin)
            })
            .collect();
        Self {
            system: SYSTEM_GUIDANCE.to_string(),
            trip: TripMetadata {
                trip_id: context.trip_id.clone(),
                traveler_role: context.traveler.role.clone(),
                legs,
                trip_duration_days: context.trip_duration_days,
                nearby_events: context.nearby_events.clone(),
                selected_total: totals.selected_total,
                cheapest_total: totals.cheapest_total,
                premium: totals.savings_amount,
                premium_percent: totals.savings_percent,
            },
            cost_drivers: drivers.summary_line(),
            candidates: compact_listing(resolved),
            decision,
            reason_max_chars,
        }
    }
}

/// One line per curated candidate, keyed by short id.
pub fn compact_listing(resolved: &ResolvedResult) -> String {
    let mut lines = Vec::with_capacity(resolved.candidate_count());
    for leg in &resolved.legs {
        for alt in &leg.alternatives {
            lines.push(alternative_line(&leg.leg_id, alt));
        }
    }
    for proposal in resolved
        .trip_window
        .iter()
        .chain(resolved.different_month.iter())
    {
        lines.push(proposal_line(proposal));
    }
    lines.join("\n")
}

fn alternative_line(leg_id: &str, alt: &ResolvedAlternative) -> String {
    let a = &alt.candidate;
    let detail = match &a.kind {
        AlternativeKind::SameDateSwap { from_airline, to_airline } => {
            format!("{from_airline}->{to_airline}")
        }
        AlternativeKind::NearbyAirport {
            origin,
            destination,
            ..
        } => format!("{origin}-{destination}"),
        AlternativeKind::AlternateRouting { via, .. } => format!("via {}", via.join("/")),
        AlternativeKind::DateShift {
            new_date,
            days_shifted,
            ..
        } => format!("{new_date} ({days_shifted:+}d)"),
        AlternativeKind::CabinDowngrade { to_cabin, .. } => to_cabin.to_string(),
    };
    let net = a
        .net_savings
        .as_ref()
        .map(|n| format!(" net ${:.0}", n.amount))
        .unwrap_or_default();
    format!(
        "{} | {leg_id} | {} | {} {detail} | ${:.0} | save ${:.0}{net} | score {:.1}",
        alt.short_id,
        a.alternative_type(),
        a.option.airline_code,
        a.option.price,
        a.savings_amount,
        alt.score.composite
    )
}

fn proposal_line(proposal: &ResolvedProposal) -> String {
    let p = &proposal.candidate;
    let net = p
        .net_savings
        .as_ref()
        .map(|n| format!(" net ${:.0}", n.amount))
        .unwrap_or_default();
    format!(
        "{} | trip | {} -> {} | {} | ${:.0} | save ${:.0}{net} | {:+} nights | score {:.1}",
        proposal.short_id,
        p.outbound.date,
        p.return_flight.date,
        p.airline_label(),
        p.combined_price,
        p.savings_amount,
        p.duration_change_days,
        proposal.score.composite
    )
}

/// Copies non-empty reasons onto matching short ids, truncated for display.
pub fn apply_reasons(
    resolved: &mut ResolvedResult,
    reasons: &BTreeMap<String, String>,
    max_chars: usize,
) {
    if reasons.is_empty() {
        return;
    }
    let lookup = |id: &str| {
        reasons
            .get(id)
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(|r| truncate(r, max_chars))
    };
    for leg in &mut resolved.legs {
        for alt in &mut leg.alternatives {
            if let Some(reason) = lookup(&alt.short_id) {
                alt.reason = Some(reason);
            }
        }
    }
    for proposal in resolved
        .trip_window
        .iter_mut()
        .chain(resolved.different_month.iter_mut())
    {
        if let Some(reason) = lookup(&proposal.short_id) {
            proposal.reason = Some(reason);
        }
    }
}

/// Parses a reply that may wrap its JSON object in prose or code fences.
pub fn parse_reply(text: &str) -> Result<ReasoningResponse> {
    let start = text
        .find('{')
        .ok_or_else(|| anyhow!("reasoning reply contains no JSON object"))?;
    let end = text
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| anyhow!("reasoning reply has an unterminated JSON object"))?;
    serde_json::from_str(&text[start..=end]).context("malformed reasoning reply")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::trip_totals;
    use crate::alternatives::generate_alternatives;
    use crate::config::EngineConfig;
    use crate::context::sample::sample_round_trip;
    use crate::drivers::analyze_cost_drivers;
    use crate::resolver::resolve;

    fn resolved_sample() -> (TripContext, ResolvedResult) {
        let trip = sample_round_trip();
        let config = EngineConfig::default();
        let resolved = resolve(&trip, generate_alternatives(&trip, &config), &config);
        (trip, resolved)
    }

    #[test]
    fn listing_has_one_line_per_candidate() {
        let (_, resolved) = resolved_sample();
        let listing = compact_listing(&resolved);
        assert_eq!(listing.lines().count(), resolved.candidate_count());
        assert!(listing.lines().next().is_some_and(|l| l.starts_with("L1A1 | leg-1")));
        assert!(listing.contains("TW1 | trip"));
    }

    #[test]
    fn request_carries_trip_metadata() {
        let (trip, resolved) = resolved_sample();
        let config = EngineConfig::default();
        let drivers = analyze_cost_drivers(&trip, &config.drivers);
        let totals = trip_totals(&trip);
        let request = ReasoningRequest::build(
            &trip,
            &totals,
            &drivers,
            &resolved,
            DecisionLabel::Optimize,
            140,
        );
        assert_eq!(request.trip.trip_id, "TRIP-SAMPLE-001");
        assert_eq!(request.trip.legs.len(), 2);
        assert_eq!(request.trip.selected_total, 1_260.0);
        assert!(request.cost_drivers.starts_with("Premium"));
    }

    #[test]
    fn reply_is_extracted_from_prose() {
        let text = "Here you go:\n```json\n{\"reasons\": {\"L1A1\": \"Cheaper nonstop.\"}, \
                    \"summary\": \"Good options.\"}\n```";
        let reply = parse_reply(text).expect("parse");
        assert_eq!(reply.reasons.get("L1A1").map(String::as_str), Some("Cheaper nonstop."));
        assert_eq!(reply.summary.as_deref(), Some("Good options."));
        assert!(reply.key_insight.is_none());
    }

    #[test]
    fn malformed_reply_is_an_error() {
        assert!(parse_reply("no json here").is_err());
        assert!(parse_reply("{\"reasons\": [1, 2]}").is_err());
    }

    #[test]
    fn unknown_ids_and_blank_reasons_are_ignored() {
        let (_, mut resolved) = resolved_sample();
        let reasons = BTreeMap::from([
            ("ZZ9".to_string(), "ignored".to_string()),
            ("L1A2".to_string(), "   ".to_string()),
            ("TW1".to_string(), "x".repeat(400)),
        ]);
        apply_reasons(&mut resolved, &reasons, 140);
        assert!(resolved.legs[0].alternatives[1].reason.is_none());
        let tw = resolved.trip_window[0].reason.as_deref().unwrap_or_default();
        assert_eq!(tw.chars().count(), 140);
    }
}
