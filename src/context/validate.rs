use std::collections::BTreeSet;

use thiserror::Error;

use crate::context::TripContext;

#[derive(Debug, Error, PartialEq)]
pub enum ContextError {
    #[error("trip {0} has no legs")]
    NoLegs(String),
    #[error("leg #{index} is missing a leg id")]
    MissingLegId { index: usize },
    #[error("duplicate leg id: {0}")]
    DuplicateLegId(String),
    #[error("leg {leg_id} is missing its {field}")]
    MissingAirport { leg_id: String, field: &'static str },
    #[error("leg {0} has zero passengers")]
    NoPassengers(String),
    #[error("trip duration must be positive, got {0} days")]
    InvalidDuration(i64),
    #[error("round trip needs at least two legs, got {0}")]
    IncompleteRoundTrip(usize),
}

/// Rejects snapshots that cannot be scored at all. Missing selections or
/// empty option lists are not errors; they degrade to empty results.
pub fn validate_context(context: &TripContext) -> Result<(), ContextError> {
    if context.legs.is_empty() {
        return Err(ContextError::NoLegs(context.trip_id.clone()));
    }
    if let Some(days) = context.trip_duration_days {
        if days <= 0 {
            return Err(ContextError::InvalidDuration(days));
        }
        if context.legs.len() < 2 {
            return Err(ContextError::IncompleteRoundTrip(context.legs.len()));
        }
    }

    let mut seen = BTreeSet::new();
    for (index, leg) in context.legs.iter().enumerate() {
        let leg_id = leg.leg_id.trim();
        if leg_id.is_empty() {
            return Err(ContextError::MissingLegId { index });
        }
        if !seen.insert(leg_id.to_string()) {
            return Err(ContextError::DuplicateLegId(leg_id.to_string()));
        }
        if leg.origin.trim().is_empty() {
            return Err(ContextError::MissingAirport {
                leg_id: leg_id.to_string(),
                field: "origin",
            });
        }
        if leg.destination.trim().is_empty() {
            return Err(ContextError::MissingAirport {
                leg_id: leg_id.to_string(),
                field: "destination",
            });
        }
        if leg.passengers == 0 {
            return Err(ContextError::NoPassengers(leg_id.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::sample::sample_round_trip;

    #[test]
    fn accepts_sample_trip() {
        assert_eq!(validate_context(&sample_round_trip()), Ok(()));
    }

    #[test]
    fn rejects_duplicate_leg_ids() {
        let mut trip = sample_round_trip();
        trip.legs[1].leg_id = trip.legs[0].leg_id.clone();
        assert_eq!(
            validate_context(&trip),
            Err(ContextError::DuplicateLegId("leg-1".to_string()))
        );
    }

    #[test]
    fn rejects_round_trip_with_single_leg() {
        let mut trip = sample_round_trip();
        trip.legs.truncate(1);
        assert_eq!(
            validate_context(&trip),
            Err(ContextError::IncompleteRoundTrip(1))
        );
    }

    #[test]
    fn missing_selection_is_not_an_error() {
        let mut trip = sample_round_trip();
        for leg in &mut trip.legs {
            leg.selected = None;
            leg.options.clear();
        }
        assert!(validate_context(&trip).is_ok());
    }

    #[test]
    fn rejects_blank_destination() {
        let mut trip = sample_round_trip();
        trip.legs[0].destination = "  ".to_string();
        let err = validate_context(&trip).expect_err("blank destination must fail");
        assert_eq!(err.to_string(), "leg leg-1 is missing its destination");
    }
}
