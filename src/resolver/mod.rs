pub mod curation;
pub mod policy;
pub mod scoring;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alternatives::{Alternative, GeneratedAlternatives, TripWindowProposal};
use crate::config::EngineConfig;
use crate::context::{PricedOption, TripContext};

pub use curation::{curate, Curatable};
pub use policy::{alternative_policy_flag, policy_flag, proposal_policy_flag};
pub use scoring::{AirlineAffinity, ScoringContext};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub savings: f64,
    pub preference: f64,
    pub disruption: f64,
    pub sustainability: f64,
    pub composite: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyFlagType {
    Compliant,
    OverBudget,
}

/// Budget annotation. Never removes a candidate or changes its score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyFlag {
    pub flag_type: PolicyFlagType,
    pub budget_limit: Option<f64>,
    pub overage: Option<f64>,
}

impl PolicyFlag {
    pub fn is_over_budget(&self) -> bool {
        self.flag_type == PolicyFlagType::OverBudget
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedCandidate<T> {
    pub short_id: String,
    pub rank: usize,
    pub candidate: T,
    pub score: ScoreBreakdown,
    pub affinity: AirlineAffinity,
    pub policy: PolicyFlag,
    pub reason: Option<String>,
}

pub type ResolvedAlternative = ResolvedCandidate<Alternative>;
pub type ResolvedProposal = ResolvedCandidate<TripWindowProposal>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedLeg {
    pub leg_id: String,
    pub route: String,
    pub selected: Option<PricedOption>,
    pub alternatives: Vec<ResolvedAlternative>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolvedResult {
    pub legs: Vec<ResolvedLeg>,
    pub trip_window: Vec<ResolvedProposal>,
    pub different_month: Vec<ResolvedProposal>,
}

impl ResolvedResult {
    pub fn candidate_count(&self) -> usize {
        self.legs.iter().map(|l| l.alternatives.len()).sum::<usize>()
            + self.trip_window.len()
            + self.different_month.len()
    }

    /// Every curated short id, leg alternatives first.
    pub fn short_ids(&self) -> Vec<&str> {
        self.legs
            .iter()
            .flat_map(|l| l.alternatives.iter().map(|a| a.short_id.as_str()))
            .chain(self.trip_window.iter().map(|p| p.short_id.as_str()))
            .chain(self.different_month.iter().map(|p| p.short_id.as_str()))
            .collect()
    }

    pub fn best_leg_alternative(&self, leg_id: &str) -> Option<&ResolvedAlternative> {
        self.legs
            .iter()
            .find(|l| l.leg_id == leg_id)
            .and_then(|l| l.alternatives.first())
    }
}

/// Scores, annotates and curates every generated candidate.
pub fn resolve(
    context: &TripContext,
    generated: GeneratedAlternatives,
    config: &EngineConfig,
) -> ResolvedResult {
    if config.scoring.weights.policy_hard_filter {
        debug!("policy hard filter configured; over-budget candidates are annotated only");
    }
    let scoring = ScoringContext::new(context, &config.scoring, &config.airlines);

    let legs = generated
        .legs
        .into_iter()
        .zip(context.legs.iter())
        .enumerate()
        .map(|(index, (leg_alternatives, leg))| {
            let scored = scoring.score_alternatives(leg_alternatives.alternatives, |alt| {
                alternative_policy_flag(&alt.option, &config.policy)
            });
            let mut curated = curate(scored, config.scoring.per_leg_cap);
            assign_short_ids(&mut curated, |rank| format!("L{}A{rank}", index + 1));
            ResolvedLeg {
                leg_id: leg_alternatives.leg_id,
                route: leg.route_label(),
                selected: leg_alternatives.selected,
                alternatives: curated,
            }
        })
        .collect::<Vec<_>>();

    let trip_window = resolve_proposals(
        &scoring,
        generated.trip_window,
        config,
        config.trip_window.trip_window_cap,
        "TW",
    );
    let different_month = resolve_proposals(
        &scoring,
        generated.different_month,
        config,
        config.trip_window.different_month_cap,
        "DM",
    );

    let result = ResolvedResult {
        legs,
        trip_window,
        different_month,
    };
    debug!("resolver kept {} curated candidates", result.candidate_count());
    result
}

fn resolve_proposals(
    scoring: &ScoringContext<'_>,
    proposals: Vec<TripWindowProposal>,
    config: &EngineConfig,
    cap: usize,
    prefix: &str,
) -> Vec<ResolvedProposal> {
    let scored = scoring.score_proposals(proposals, |p| proposal_policy_flag(p, &config.policy));
    let mut curated = curate(scored, cap);
    assign_short_ids(&mut curated, |rank| format!("{prefix}{rank}"));
    curated
}

fn assign_short_ids<T>(items: &mut [ResolvedCandidate<T>], id_for_rank: impl Fn(usize) -> String) {
    for item in items {
        item.short_id = id_for_rank(item.rank);
    }
}
