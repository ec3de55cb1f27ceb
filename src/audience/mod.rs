pub mod approver;
pub mod compliance;
pub mod traveler;

use serde::{Deserialize, Serialize};

use crate::advisor::AdvisorOutput;
use crate::config::EngineConfig;
use crate::context::TripContext;

pub use approver::{approver_view, ApproverView};
pub use compliance::{compliance_record, ComplianceRecord};
pub use traveler::{traveler_view, TravelerView};

/// All three projections of one advisor run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudienceViews {
    pub traveler: TravelerView,
    pub approver: ApproverView,
    pub compliance: ComplianceRecord,
}

pub fn build_views(
    output: &AdvisorOutput,
    context: &TripContext,
    config: &EngineConfig,
) -> serde_json::Result<AudienceViews> {
    Ok(AudienceViews {
        traveler: traveler_view(output, context, &config.advisor),
        approver: approver_view(output, context),
        compliance: compliance_record(output, context, config)?,
    })
}
