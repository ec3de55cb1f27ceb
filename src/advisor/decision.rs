use crate::advisor::{DecisionLabel, TripTotals};
use crate::config::AdvisorConfig;
use crate::context::{percent_of, round_money, TripContext};

impl TripTotals {
    /// Totals with non-finite inputs treated as zero and the premium never negative.
    pub fn new(selected_total: f64, cheapest_total: f64, legs_selected: usize) -> Self {
        let selected_total = finite(selected_total);
        let cheapest_total = finite(cheapest_total).min(selected_total);
        let savings_amount = (selected_total - cheapest_total).max(0.0);
        Self {
            selected_total: round_money(selected_total),
            cheapest_total: round_money(cheapest_total),
            savings_amount: round_money(savings_amount),
            savings_percent: round_money(percent_of(savings_amount, selected_total)),
            legs_selected,
        }
    }
}

pub fn trip_totals(context: &TripContext) -> TripTotals {
    let mut selected_total = 0.0;
    let mut cheapest_total = 0.0;
    let mut legs_selected = 0;
    for leg in &context.legs {
        let Some(selected) = leg.selected_price() else {
            continue;
        };
        selected_total += selected;
        cheapest_total += leg.cheapest_price(&context.traveler).unwrap_or(selected);
        legs_selected += 1;
    }
    TripTotals::new(selected_total, cheapest_total, legs_selected)
}

/// Approve when the premium is under both approve limits, optimize when it
/// reaches either optimize limit, review otherwise.
pub fn decide(totals: &TripTotals, config: &AdvisorConfig) -> DecisionLabel {
    let premium = totals.savings_amount;
    let percent = totals.savings_percent;
    if premium <= config.approve_max_premium && percent <= config.approve_max_premium_pct {
        DecisionLabel::Approve
    } else if premium >= config.optimize_min_premium || percent >= config.optimize_min_premium_pct
    {
        DecisionLabel::Optimize
    } else {
        DecisionLabel::Review
    }
}

pub fn needs_justification(decision: DecisionLabel) -> bool {
    decision != DecisionLabel::Approve
}

fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::sample::sample_round_trip;

    #[test]
    fn small_premium_is_approved() {
        let totals = TripTotals::new(1_000.0, 950.0, 2);
        assert_eq!(totals.savings_amount, 50.0);
        assert_eq!(totals.savings_percent, 5.0);
        let decision = decide(&totals, &AdvisorConfig::default());
        assert_eq!(decision, DecisionLabel::Approve);
        assert!(!needs_justification(decision));
    }

    #[test]
    fn large_premium_is_optimize() {
        let totals = TripTotals::new(1_000.0, 600.0, 2);
        assert_eq!(totals.savings_percent, 40.0);
        let decision = decide(&totals, &AdvisorConfig::default());
        assert_eq!(decision, DecisionLabel::Optimize);
        assert!(needs_justification(decision));
    }

    #[test]
    fn middle_band_is_review() {
        let totals = TripTotals::new(1_000.0, 850.0, 2);
        assert_eq!(decide(&totals, &AdvisorConfig::default()), DecisionLabel::Review);
    }

    #[test]
    fn non_finite_totals_are_neutralized() {
        let totals = TripTotals::new(f64::NAN, 500.0, 1);
        assert_eq!(totals.selected_total, 0.0);
        assert_eq!(totals.savings_amount, 0.0);
        assert_eq!(totals.savings_percent, 0.0);
    }

    #[test]
    fn sample_trip_totals_sum_selected_legs() {
        let trip = sample_round_trip();
        let totals = trip_totals(&trip);
        assert_eq!(totals.selected_total, 1_260.0);
        assert_eq!(totals.legs_selected, 2);
        // NK is excluded, so the outbound floor is UA at 350, not NK at 300.
        assert_eq!(totals.cheapest_total, 710.0);
        assert_eq!(totals.savings_amount, 550.0);
        assert_eq!(
            decide(&totals, &AdvisorConfig::default()),
            DecisionLabel::Optimize
        );
    }
}
