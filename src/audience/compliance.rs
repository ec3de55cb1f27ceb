use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::advisor::{AdvisorOutput, DecisionLabel, ReasonSource, TripTotals};
use crate::config::EngineConfig;
use crate::context::TripContext;
use crate::resolver::{PolicyFlag, ResolvedCandidate, ScoreBreakdown};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceEntry {
    pub short_id: String,
    pub scope: String,
    pub rank: usize,
    pub candidate_type: String,
    pub price: f64,
    pub savings_amount: f64,
    pub score: ScoreBreakdown,
    pub policy: PolicyFlag,
}

/// Audit record of one run: the hashed input snapshot, every curated
/// candidate with its score and policy flag, and where the text came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceRecord {
    pub trip_id: String,
    pub context_digest: String,
    pub timestamp: DateTime<Utc>,
    pub decision: Option<DecisionLabel>,
    pub source: ReasonSource,
    pub totals: TripTotals,
    pub entries: Vec<ComplianceEntry>,
    pub over_budget_count: usize,
    pub policy_hard_filter_configured: bool,
}

/// Hex SHA-256 of the snapshot's canonical JSON.
pub fn context_digest(context: &TripContext) -> serde_json::Result<String> {
    let bytes = serde_json::to_vec(context)?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

pub fn compliance_record(
    output: &AdvisorOutput,
    context: &TripContext,
    config: &EngineConfig,
) -> serde_json::Result<ComplianceRecord> {
    let mut entries = Vec::with_capacity(output.resolved.candidate_count());
    for leg in &output.resolved.legs {
        for alt in &leg.alternatives {
            entries.push(entry(
                alt,
                &leg.leg_id,
                alt.candidate.alternative_type().to_string(),
                alt.candidate.option.price,
                alt.candidate.savings_amount,
            ));
        }
    }
    for p in output
        .resolved
        .trip_window
        .iter()
        .chain(&output.resolved.different_month)
    {
        entries.push(entry(
            p,
            "trip",
            p.candidate.category.to_string(),
            p.candidate.combined_price,
            p.candidate.savings_amount,
        ));
    }
    let over_budget_count = entries.iter().filter(|e| e.policy.is_over_budget()).count();
    if config.scoring.weights.policy_hard_filter {
        debug!("policy_hard_filter is set; over-budget candidates are flagged, not removed");
    }

    Ok(ComplianceRecord {
        trip_id: context.trip_id.clone(),
        context_digest: context_digest(context)?,
        timestamp: output.generated_at,
        decision: output.decision,
        source: output.source,
        totals: output.totals.clone(),
        entries,
        over_budget_count,
        policy_hard_filter_configured: config.scoring.weights.policy_hard_filter,
    })
}

fn entry<T>(
    resolved: &ResolvedCandidate<T>,
    scope: &str,
    candidate_type: String,
    price: f64,
    savings_amount: f64,
) -> ComplianceEntry {
    ComplianceEntry {
        short_id: resolved.short_id.clone(),
        scope: scope.to_string(),
        rank: resolved.rank,
        candidate_type,
        price,
        savings_amount,
        score: resolved.score,
        policy: resolved.policy.clone(),
    }
}
