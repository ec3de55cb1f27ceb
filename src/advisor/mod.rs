pub mod decision;
pub mod fallback;
pub mod http;
pub mod reasoning;

use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::context::TripContext;
use crate::drivers::CostDriverReport;
use crate::resolver::ResolvedResult;

pub use decision::{decide, needs_justification, trip_totals};
pub use reasoning::{ReasoningRequest, ReasoningResponse, ReasoningService};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionLabel {
    Approve,
    Review,
    Optimize,
}

impl DecisionLabel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "approve" => Some(Self::Approve),
            "review" => Some(Self::Review),
            "optimize" | "optimise" => Some(Self::Optimize),
            _ => None,
        }
    }
}

impl Display for DecisionLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Approve => "approve",
            Self::Review => "review",
            Self::Optimize => "optimize",
        };
        write!(f, "{display}")
    }
}

/// Where the narrative text came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReasonSource {
    Reasoning,
    Fallback,
    Skipped,
}

impl Display for ReasonSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Reasoning => "reasoning",
            Self::Fallback => "fallback",
            Self::Skipped => "skipped",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TripTotals {
    pub selected_total: f64,
    pub cheapest_total: f64,
    /// Premium of the selection over the cheapest comparable fares.
    pub savings_amount: f64,
    pub savings_percent: f64,
    pub legs_selected: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorOutput {
    pub trip_id: String,
    pub resolved: ResolvedResult,
    pub drivers: CostDriverReport,
    pub totals: TripTotals,
    pub summary: String,
    pub key_insight: String,
    pub decision: Option<DecisionLabel>,
    pub justification_prompt: Option<String>,
    pub source: ReasonSource,
    pub generated_at: DateTime<Utc>,
}

/// Turns curated candidates into a decision and explanations.
///
/// At most one reasoning call is made per run. Anything the call does not
/// supply, including the whole reply on timeout or error, comes from the
/// rule-based generator in [`fallback`].
pub struct Advisor {
    config: Arc<EngineConfig>,
    reasoning: Option<Arc<dyn ReasoningService>>,
}

impl Advisor {
    pub fn new(config: Arc<EngineConfig>, reasoning: Option<Arc<dyn ReasoningService>>) -> Self {
        Self { config, reasoning }
    }

    pub async fn advise(
        &self,
        context: &TripContext,
        drivers: CostDriverReport,
        mut resolved: ResolvedResult,
    ) -> AdvisorOutput {
        let totals = trip_totals(context);
        let generated_at = Utc::now();
        let max_chars = self.config.advisor.reason_max_chars;

        if !context.has_any_selection() {
            debug!("trip {} has no selections, skipping advice", context.trip_id);
            fallback::fill_reasons(&mut resolved, max_chars);
            return AdvisorOutput {
                trip_id: context.trip_id.clone(),
                resolved,
                drivers,
                totals,
                summary: fallback::no_selection_summary(),
                key_insight: "No flights selected yet.".to_string(),
                decision: None,
                justification_prompt: None,
                source: ReasonSource::Skipped,
                generated_at,
            };
        }

        let decision = decide(&totals, &self.config.advisor);
        let reply = self
            .request_reasoning(context, &totals, &drivers, &resolved, decision)
            .await;
        let source = if reply.is_some() {
            ReasonSource::Reasoning
        } else {
            ReasonSource::Fallback
        };
        let reply = reply.unwrap_or_default();

        if let Some(echoed) = reply.decision.as_deref() {
            if DecisionLabel::parse(echoed) != Some(decision) {
                debug!("reasoning suggested decision {echoed:?}; keeping {decision}");
            }
        }

        reasoning::apply_reasons(&mut resolved, &reply.reasons, max_chars);
        fallback::fill_reasons(&mut resolved, max_chars);

        let summary = non_empty(reply.summary.as_deref()).unwrap_or_else(|| {
            fallback::summary(&totals, decision, &drivers, &resolved)
        });
        let key_insight = non_empty(reply.key_insight.as_deref())
            .unwrap_or_else(|| fallback::key_insight(&drivers, &resolved));
        let justification_prompt = needs_justification(decision).then(|| {
            non_empty(reply.justification_prompt.as_deref())
                .unwrap_or_else(|| fallback::justification_prompt(&totals, &drivers))
        });

        info!(
            "trip {}: decision {decision}, {} curated candidates, narrative from {source}",
            context.trip_id,
            resolved.candidate_count()
        );

        AdvisorOutput {
            trip_id: context.trip_id.clone(),
            resolved,
            drivers,
            totals,
            summary,
            key_insight,
            decision: Some(decision),
            justification_prompt,
            source,
            generated_at,
        }
    }

    async fn request_reasoning(
        &self,
        context: &TripContext,
        totals: &TripTotals,
        drivers: &CostDriverReport,
        resolved: &ResolvedResult,
        decision: DecisionLabel,
    ) -> Option<ReasoningResponse> {
        let service = self.reasoning.as_ref()?;
        let request = ReasoningRequest::build(
            context,
            totals,
            drivers,
            resolved,
            decision,
            self.config.advisor.reason_max_chars,
        );
        let limit = Duration::from_secs(self.config.reasoning.timeout_secs);
        match tokio::time::timeout(limit, service.reason(&request)).await {
            Ok(Ok(reply)) => Some(reply),
            Ok(Err(err)) => {
                warn!("reasoning service {} failed, using fallback: {err:#}", service.name());
                None
            }
            Err(_) => {
                warn!(
                    "reasoning service {} timed out after {}s, using fallback",
                    service.name(),
                    limit.as_secs()
                );
                None
            }
        }
    }
}

fn non_empty(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use super::*;
    use crate::alternatives::generate_alternatives;
    use crate::context::sample::sample_round_trip;
    use crate::drivers::analyze_cost_drivers;
    use crate::resolver::resolve;

    enum Script {
        Reply(ReasoningResponse),
        Fail,
        Hang,
    }

    struct ScriptedService {
        script: Script,
        calls: AtomicUsize,
    }

    impl ScriptedService {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ReasoningService for ScriptedService {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn reason(&self, _request: &ReasoningRequest) -> Result<ReasoningResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.script {
                Script::Reply(reply) => Ok(reply.clone()),
                Script::Fail => Err(anyhow!("connection refused")),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(anyhow!("unreachable"))
                }
            }
        }
    }

    fn run(trip: &TripContext, service: Option<Arc<dyn ReasoningService>>) -> AdvisorOutput {
        let mut config = EngineConfig::default();
        config.reasoning.timeout_secs = 1;
        let config = Arc::new(config);
        let drivers = analyze_cost_drivers(trip, &config.drivers);
        let resolved = resolve(trip, generate_alternatives(trip, &config), &config);
        let advisor = Advisor::new(config, service);
        tokio_test::block_on(advisor.advise(trip, drivers, resolved))
    }

    fn all_reasons(output: &AdvisorOutput) -> Vec<Option<String>> {
        let resolved = &output.resolved;
        resolved
            .legs
            .iter()
            .flat_map(|l| l.alternatives.iter().map(|a| a.reason.clone()))
            .chain(resolved.trip_window.iter().map(|p| p.reason.clone()))
            .chain(resolved.different_month.iter().map(|p| p.reason.clone()))
            .collect()
    }

    #[test]
    fn timeout_falls_back_with_reasons_and_same_decision() {
        let trip = sample_round_trip();
        let service = ScriptedService::new(Script::Hang);
        let output = run(&trip, Some(service.clone()));

        assert_eq!(output.source, ReasonSource::Fallback);
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        let expected = decide(&trip_totals(&trip), &EngineConfig::default().advisor);
        assert_eq!(output.decision, Some(expected));
        let reasons = all_reasons(&output);
        assert!(!reasons.is_empty());
        assert!(reasons
            .iter()
            .all(|r| r.as_deref().is_some_and(|t| !t.trim().is_empty())));
        assert!(!output.summary.is_empty());
    }

    #[test]
    fn transport_error_matches_disabled_reasoning() {
        let trip = sample_round_trip();
        let failed = run(&trip, Some(ScriptedService::new(Script::Fail)));
        let disabled = run(&trip, None);
        assert_eq!(failed.source, ReasonSource::Fallback);
        assert_eq!(disabled.source, ReasonSource::Fallback);
        assert_eq!(failed.decision, disabled.decision);
        assert_eq!(failed.summary, disabled.summary);
        assert_eq!(all_reasons(&failed), all_reasons(&disabled));
    }

    #[test]
    fn partial_reply_is_filled_per_candidate() {
        let trip = sample_round_trip();
        let reply = ReasoningResponse {
            reasons: BTreeMap::from([(
                "L1A1".to_string(),
                "Same-day swap keeps the Monday meeting.".to_string(),
            )]),
            summary: Some("Two cheaper same-day options exist.".to_string()),
            key_insight: None,
            decision: Some("approve".to_string()),
            justification_prompt: None,
        };
        let output = run(&trip, Some(ScriptedService::new(Script::Reply(reply))));

        assert_eq!(output.source, ReasonSource::Reasoning);
        assert_eq!(
            output.resolved.legs[0].alternatives[0].reason.as_deref(),
            Some("Same-day swap keeps the Monday meeting.")
        );
        assert!(all_reasons(&output).iter().all(|r| r.is_some()));
        assert_eq!(output.summary, "Two cheaper same-day options exist.");
        assert!(!output.key_insight.is_empty());
        // The echoed label never overrides the computed one.
        assert_eq!(output.decision, Some(DecisionLabel::Optimize));
        assert!(output.justification_prompt.is_some());
    }

    #[test]
    fn no_selection_short_circuits_without_calling_service() {
        let mut trip = sample_round_trip();
        for leg in &mut trip.legs {
            leg.selected = None;
        }
        let service = ScriptedService::new(Script::Fail);
        let output = run(&trip, Some(service.clone()));
        assert_eq!(output.source, ReasonSource::Skipped);
        assert_eq!(output.decision, None);
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
        assert!(output.summary.starts_with("Select flights"));
    }

    #[test]
    fn decision_labels_parse_loosely() {
        assert_eq!(DecisionLabel::parse(" Approve "), Some(DecisionLabel::Approve));
        assert_eq!(DecisionLabel::parse("optimise"), Some(DecisionLabel::Optimize));
        assert_eq!(DecisionLabel::parse("reject"), None);
    }
}
