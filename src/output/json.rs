use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Value};

use crate::audience::AudienceViews;
use crate::output::ViewSelection;

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn views_value(views: &AudienceViews, selection: ViewSelection) -> Result<Value> {
    let value = match selection {
        ViewSelection::Traveler => serde_json::to_value(&views.traveler)?,
        ViewSelection::Approver => serde_json::to_value(&views.approver)?,
        ViewSelection::Compliance => serde_json::to_value(&views.compliance)?,
        ViewSelection::All => json!({
            "traveler": views.traveler,
            "approver": views.approver,
            "compliance": views.compliance,
        }),
    };
    Ok(value)
}

pub fn render_views_json(views: &AudienceViews, selection: ViewSelection) -> Result<String> {
    render_json(&views_value(views, selection)?)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::EngineConfig;
    use crate::context::sample::sample_round_trip;
    use crate::engine::TradeoffEngine;

    fn sample_views() -> AudienceViews {
        let engine = TradeoffEngine::new(Arc::new(EngineConfig::default()), None);
        let (_, views) =
            tokio_test::block_on(engine.run_views(&sample_round_trip())).expect("run");
        views
    }

    #[test]
    fn single_view_is_unwrapped() {
        let value = views_value(&sample_views(), ViewSelection::Approver).expect("json");
        assert_eq!(value["trip_id"], "TRIP-SAMPLE-001");
        assert_eq!(value["decision"], "optimize");
        assert!(value.get("traveler").is_none());
    }

    #[test]
    fn all_views_are_keyed_by_audience() {
        let value = views_value(&sample_views(), ViewSelection::All).expect("json");
        for key in ["traveler", "approver", "compliance"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["compliance"]["context_digest"].as_str().map(str::len), Some(64));
        assert_eq!(value["traveler"]["trip_window"][0]["short_id"], "TW1");
    }
}
