use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::advisor::{Advisor, AdvisorOutput, ReasoningService};
use crate::alternatives::{generate_alternatives, GeneratedAlternatives};
use crate::audience::{build_views, AudienceViews};
use crate::config::EngineConfig;
use crate::context::{validate_context, ContextError, TripContext};
use crate::drivers::{analyze_cost_drivers, CostDriverReport};
use crate::resolver::{resolve, ResolvedResult};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("failed to serialize trip context: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Runs the pipeline over one trip snapshot: cost drivers, candidate
/// generation, scoring and curation, then the advisor.
pub struct TradeoffEngine {
    config: Arc<EngineConfig>,
    advisor: Advisor,
}

impl TradeoffEngine {
    pub fn new(config: Arc<EngineConfig>, reasoning: Option<Arc<dyn ReasoningService>>) -> Self {
        let advisor = Advisor::new(config.clone(), reasoning);
        Self { config, advisor }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn analyze_drivers(&self, context: &TripContext) -> Result<CostDriverReport, ContextError> {
        validate_context(context)?;
        Ok(analyze_cost_drivers(context, &self.config.drivers))
    }

    pub fn generate(&self, context: &TripContext) -> Result<GeneratedAlternatives, ContextError> {
        validate_context(context)?;
        Ok(generate_alternatives(context, &self.config))
    }

    pub fn resolve(&self, context: &TripContext) -> Result<ResolvedResult, ContextError> {
        let generated = self.generate(context)?;
        Ok(resolve(context, generated, &self.config))
    }

    pub async fn run(&self, context: &TripContext) -> Result<AdvisorOutput, ContextError> {
        validate_context(context)?;
        let drivers = analyze_cost_drivers(context, &self.config.drivers);
        let generated = generate_alternatives(context, &self.config);
        debug!(
            "trip {}: generated {} leg alternatives, {} trip-window and {} different-month proposals",
            context.trip_id,
            generated.legs.iter().map(|l| l.alternatives.len()).sum::<usize>(),
            generated.trip_window.len(),
            generated.different_month.len()
        );
        let resolved = resolve(context, generated, &self.config);
        let output = self.advisor.advise(context, drivers, resolved).await;
        info!(
            "trip {}: selected ${:.0}, cheapest ${:.0}, {} candidates kept",
            output.trip_id,
            output.totals.selected_total,
            output.totals.cheapest_total,
            output.resolved.candidate_count()
        );
        Ok(output)
    }

    /// Runs the pipeline and projects the result for every audience.
    pub async fn run_views(
        &self,
        context: &TripContext,
    ) -> Result<(AdvisorOutput, AudienceViews), EngineError> {
        let output = self.run(context).await?;
        let views = build_views(&output, context, &self.config)?;
        Ok((output, views))
    }
}
