use crate::alternatives::TripWindowProposal;
use crate::config::PolicyConfig;
use crate::context::{round_money, PricedOption};
use crate::resolver::{PolicyFlag, PolicyFlagType};

/// Compares a price against a budget. A missing budget is always compliant.
pub fn policy_flag(price: f64, budget: Option<f64>) -> PolicyFlag {
    match budget {
        Some(limit) if price > limit => PolicyFlag {
            flag_type: PolicyFlagType::OverBudget,
            budget_limit: Some(limit),
            overage: Some(round_money(price - limit)),
        },
        _ => PolicyFlag {
            flag_type: PolicyFlagType::Compliant,
            budget_limit: budget,
            overage: None,
        },
    }
}

pub fn alternative_policy_flag(option: &PricedOption, policy: &PolicyConfig) -> PolicyFlag {
    policy_flag(option.price, policy.budget_for(option.cabin))
}

/// Paired proposals are held to the sum of both legs' cabin budgets.
pub fn proposal_policy_flag(proposal: &TripWindowProposal, policy: &PolicyConfig) -> PolicyFlag {
    let budget = policy
        .budget_for(proposal.outbound.cabin)
        .zip(policy.budget_for(proposal.return_flight.cabin))
        .map(|(a, b)| a + b);
    policy_flag(proposal.combined_price, budget)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::sample::option;
    use crate::context::CabinClass;

    #[test]
    fn business_over_budget_reports_overage() {
        let mut business = option("J-1", "DL", "2026-03-02T09:00", 4_300.0);
        business.cabin = CabinClass::Business;
        let flag = alternative_policy_flag(&business, &PolicyConfig::default());
        assert_eq!(flag.flag_type, PolicyFlagType::OverBudget);
        assert_eq!(flag.budget_limit, Some(4_000.0));
        assert_eq!(flag.overage, Some(300.0));
        assert!(flag.is_over_budget());
    }

    #[test]
    fn price_at_budget_is_compliant() {
        let flag = policy_flag(1_500.0, Some(1_500.0));
        assert_eq!(flag.flag_type, PolicyFlagType::Compliant);
        assert_eq!(flag.overage, None);
        assert_eq!(policy_flag(99_999.0, None).flag_type, PolicyFlagType::Compliant);
    }
}
