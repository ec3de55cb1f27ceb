use std::collections::BTreeSet;

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::airlines::{AirlineDirectory, AirlineTier, Alliance};
use crate::alternatives::{Alternative, DisruptionLevel, FlightSummary, TripWindowProposal};
use crate::config::ScoringConfig;
use crate::context::{round_money, CabinClass, TripContext};
use crate::resolver::{
    PolicyFlag, ResolvedAlternative, ResolvedCandidate, ResolvedProposal, ScoreBreakdown,
};

/// How a carrier relates to the airlines the traveler already flies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AirlineAffinity {
    Other,
    AlliancePartner,
    Own,
}

/// Per-run scoring inputs: weights and constants plus the traveler's airlines.
pub struct ScoringContext<'a> {
    config: &'a ScoringConfig,
    airlines: &'a AirlineDirectory,
    traveler_airlines: BTreeSet<String>,
    preferred_alliances: BTreeSet<Alliance>,
}

impl<'a> ScoringContext<'a> {
    pub fn new(
        context: &TripContext,
        config: &'a ScoringConfig,
        airlines: &'a AirlineDirectory,
    ) -> Self {
        Self {
            config,
            airlines,
            traveler_airlines: context.traveler_airlines(),
            preferred_alliances: context.traveler.preferred_alliances.iter().copied().collect(),
        }
    }

    pub fn affinity(&self, airline_code: &str) -> AirlineAffinity {
        if self
            .traveler_airlines
            .contains(&airline_code.to_ascii_uppercase())
        {
            return AirlineAffinity::Own;
        }
        let partner = self
            .traveler_airlines
            .iter()
            .any(|own| self.airlines.share_alliance(own, airline_code))
            || self
                .airlines
                .alliance(airline_code)
                .is_some_and(|alliance| self.preferred_alliances.contains(&alliance));
        if partner {
            AirlineAffinity::AlliancePartner
        } else {
            AirlineAffinity::Other
        }
    }

    pub fn preference(&self, airline_code: &str) -> f64 {
        let p = &self.config.preference;
        let score = match self.affinity(airline_code) {
            AirlineAffinity::Own => p.own_airline,
            AirlineAffinity::AlliancePartner => p.alliance_partner,
            AirlineAffinity::Other => match self.airlines.tier(airline_code) {
                Some(AirlineTier::FullService) => p.full_service,
                Some(AirlineTier::MidTier) => p.mid_tier,
                Some(AirlineTier::LowCost) => p.low_cost,
                None => p.unknown,
            },
        };
        unit(score)
    }

    /// The window wraps midnight when start > end (22:00-05:00).
    pub fn is_red_eye(&self, departure_hour: u32) -> bool {
        let start = self.config.red_eye_start_hour;
        let end = self.config.red_eye_end_hour;
        if start > end {
            departure_hour >= start || departure_hour < end
        } else {
            departure_hour >= start && departure_hour < end
        }
    }

    pub fn disruption(&self, level: DisruptionLevel, red_eye: bool, cabin: CabinClass) -> f64 {
        let base = match level {
            DisruptionLevel::Low => 1.0,
            DisruptionLevel::Medium => 0.6,
            DisruptionLevel::High => 0.2,
        };
        if !red_eye {
            return base;
        }
        let multiplier = if cabin.is_premium() {
            self.config.red_eye_premium_multiplier
        } else {
            self.config.red_eye_economy_multiplier
        };
        unit(base * multiplier)
    }

    pub fn breakdown(
        &self,
        savings: f64,
        preference: f64,
        disruption: f64,
        sustainability: f64,
    ) -> ScoreBreakdown {
        let w = &self.config.weights;
        let total = w.total();
        let composite = if total > 0.0 {
            let weighted = w.savings.max(0.0) * savings
                + w.preference.max(0.0) * preference
                + w.disruption.max(0.0) * disruption
                + w.sustainability.max(0.0) * sustainability;
            round_money((100.0 * weighted / total).clamp(0.0, 100.0))
        } else {
            0.0
        };
        ScoreBreakdown {
            savings: unit(savings),
            preference: unit(preference),
            disruption: unit(disruption),
            sustainability: unit(sustainability),
            composite,
        }
    }

    pub fn score_alternatives(
        &self,
        alternatives: Vec<Alternative>,
        policy: impl Fn(&Alternative) -> PolicyFlag,
    ) -> Vec<ResolvedAlternative> {
        let alternatives = alternatives
            .into_iter()
            .filter(|a| a.option.has_valid_price() && a.savings_amount.is_finite())
            .collect::<Vec<_>>();
        let pool_max = pool_max(alternatives.iter().map(Alternative::effective_savings));

        alternatives
            .into_iter()
            .map(|alt| {
                let option = &alt.option;
                let red_eye = self.is_red_eye(option.departure_hour());
                let score = self.breakdown(
                    savings_score(alt.effective_savings(), pool_max),
                    self.preference(&option.airline_code),
                    self.disruption(alt.disruption, red_eye, option.cabin),
                    sustainability_score(option.stops),
                );
                let affinity = self.affinity(&option.airline_code);
                let policy = policy(&alt);
                ResolvedCandidate {
                    short_id: String::new(),
                    rank: 0,
                    affinity,
                    candidate: alt,
                    score,
                    policy,
                    reason: None,
                }
            })
            .collect()
    }

    pub fn score_proposals(
        &self,
        proposals: Vec<TripWindowProposal>,
        policy: impl Fn(&TripWindowProposal) -> PolicyFlag,
    ) -> Vec<ResolvedProposal> {
        let proposals = proposals
            .into_iter()
            .filter(|p| p.combined_price.is_finite() && p.savings_amount.is_finite())
            .collect::<Vec<_>>();
        let pool_max = pool_max(proposals.iter().map(TripWindowProposal::effective_savings));

        proposals
            .into_iter()
            .map(|proposal| {
                let (outbound, ret) = (&proposal.outbound, &proposal.return_flight);
                let level = if proposal.layer <= 2 {
                    DisruptionLevel::Medium
                } else {
                    DisruptionLevel::High
                };
                let red_eye = self.flight_is_red_eye(outbound) || self.flight_is_red_eye(ret);
                let score = self.breakdown(
                    savings_score(proposal.effective_savings(), pool_max),
                    (self.preference(&outbound.airline_code) + self.preference(&ret.airline_code))
                        / 2.0,
                    self.disruption(level, red_eye, outbound.cabin),
                    (sustainability_score(outbound.stops) + sustainability_score(ret.stops)) / 2.0,
                );
                let affinity = self
                    .affinity(&outbound.airline_code)
                    .min(self.affinity(&ret.airline_code));
                let policy = policy(&proposal);
                ResolvedCandidate {
                    short_id: String::new(),
                    rank: 0,
                    affinity,
                    candidate: proposal,
                    score,
                    policy,
                    reason: None,
                }
            })
            .collect()
    }

    fn flight_is_red_eye(&self, flight: &FlightSummary) -> bool {
        self.is_red_eye(flight.departure.hour())
    }
}

pub fn sustainability_score(stops: u32) -> f64 {
    match stops {
        0 => 1.0,
        1 => 0.5,
        _ => 0.2,
    }
}

/// Effective savings relative to the best in the pool; losses score zero.
pub fn savings_score(effective: f64, pool_max: f64) -> f64 {
    if pool_max <= 0.0 || !effective.is_finite() {
        return 0.0;
    }
    unit(effective / pool_max)
}

fn pool_max(values: impl Iterator<Item = f64>) -> f64 {
    values
        .filter(|v| v.is_finite() && *v > 0.0)
        .fold(0.0, f64::max)
}

fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
