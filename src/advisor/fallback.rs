//! Rule-based narrative used whenever the reasoning service is absent,
//! fails, or leaves fields out. Pure and infallible.

use crate::advisor::{DecisionLabel, TripTotals};
use crate::alternatives::{Alternative, AlternativeKind, TripWindowProposal};
use crate::drivers::CostDriverReport;
use crate::lodging::{ImpactStatus, LodgingImpact, NetBasis, NetSavings};
use crate::resolver::ResolvedResult;

pub fn fill_reasons(resolved: &mut ResolvedResult, max_chars: usize) {
    for leg in &mut resolved.legs {
        for alt in &mut leg.alternatives {
            if alt.reason.is_none() {
                alt.reason = Some(truncate(&alternative_reason(&alt.candidate), max_chars));
            }
        }
    }
    for proposal in resolved
        .trip_window
        .iter_mut()
        .chain(resolved.different_month.iter_mut())
    {
        if proposal.reason.is_none() {
            proposal.reason = Some(truncate(&proposal_reason(&proposal.candidate), max_chars));
        }
    }
}

pub fn alternative_reason(alt: &Alternative) -> String {
    let airline = &alt.option.airline_name;
    let save = money(alt.savings_amount);
    let base = match &alt.kind {
        AlternativeKind::SameDateSwap { .. } => {
            format!("Switch to {airline} on the same day to save {save}")
        }
        AlternativeKind::NearbyAirport {
            origin,
            destination,
            replaces,
        } => format!("Fly {origin}-{destination} on {airline} instead of {replaces} to save {save}"),
        AlternativeKind::AlternateRouting { via, .. } => {
            format!("Stay on {airline} with a stop in {} to save {save}", via.join("/"))
        }
        AlternativeKind::DateShift {
            new_date,
            days_shifted,
            ..
        } => format!(
            "Fly {airline} on {new_date} ({}) to save {save}",
            day_offset(*days_shifted)
        ),
        AlternativeKind::CabinDowngrade { to_cabin, .. } => {
            format!("Book {to_cabin} on {airline} to save {save}")
        }
    };
    format!(
        "{base}{}.",
        net_clause(alt.net_savings.as_ref(), alt.lodging_impact.as_ref())
    )
}

pub fn proposal_reason(proposal: &TripWindowProposal) -> String {
    let nights = match proposal.duration_change_days {
        0 => String::new(),
        n => format!(", {}", night_delta(n)),
    };
    format!(
        "Travel {} to {} on {} to save {}{nights}{}.",
        proposal.outbound.date,
        proposal.return_flight.date,
        proposal.airline_label(),
        money(proposal.savings_amount),
        net_clause(
            proposal.net_savings.as_ref(),
            proposal.lodging_impact.as_ref()
        )
    )
}

pub fn summary(
    totals: &TripTotals,
    decision: DecisionLabel,
    drivers: &CostDriverReport,
    resolved: &ResolvedResult,
) -> String {
    let total = money(totals.selected_total);
    match decision {
        DecisionLabel::Approve => format!(
            "Selected flights total {total}, within {} of the cheapest comparable fares. \
             No change needed.",
            money(totals.savings_amount)
        ),
        DecisionLabel::Review | DecisionLabel::Optimize => {
            let lead = format!(
                "Selected flights total {total}, {} ({:.0}%) above the cheapest comparable fares.",
                money(totals.savings_amount),
                totals.savings_percent
            );
            match best_opportunity(resolved) {
                Some(best) => format!("{lead} Best option: {best}"),
                None => match drivers.primary() {
                    Some(driver) => format!("{lead} Most of the premium comes from {}.", driver.kind),
                    None => lead,
                },
            }
        }
    }
}

pub fn key_insight(drivers: &CostDriverReport, resolved: &ResolvedResult) -> String {
    if let Some(driver) = drivers.primary() {
        return format!(
            "{} adds {} ({:.0}%) on {}.",
            capitalize(&driver.kind.to_string()),
            money(driver.amount),
            driver.percent,
            driver.leg_id
        );
    }
    match best_opportunity(resolved) {
        Some(best) => best,
        None => "The selected flights are already the best value found.".to_string(),
    }
}

pub fn justification_prompt(totals: &TripTotals, drivers: &CostDriverReport) -> String {
    let cause = drivers
        .primary()
        .map(|d| format!(", mostly from {}", d.kind))
        .unwrap_or_default();
    format!(
        "This booking is {} ({:.0}%) above the cheapest comparable fares{cause}. \
         Please explain why these flights are needed.",
        money(totals.savings_amount),
        totals.savings_percent
    )
}

pub fn no_selection_summary() -> String {
    "Select flights for each leg to see savings and alternatives.".to_string()
}

/// Truncates on a char boundary, marking the cut with "...".
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let mut out: String = text.chars().take(max_chars - 3).collect();
    out.push_str("...");
    out
}

/// The highest-savings curated candidate, phrased as a reason.
fn best_opportunity(resolved: &ResolvedResult) -> Option<String> {
    let alternatives = resolved
        .legs
        .iter()
        .flat_map(|l| l.alternatives.iter())
        .map(|a| (a.candidate.effective_savings(), alternative_reason(&a.candidate)));
    let proposals = resolved
        .trip_window
        .iter()
        .chain(resolved.different_month.iter())
        .map(|p| (p.candidate.effective_savings(), proposal_reason(&p.candidate)));
    alternatives
        .chain(proposals)
        .filter(|(savings, _)| *savings > 0.0)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, reason)| reason)
}

fn net_clause(net: Option<&NetSavings>, impact: Option<&LodgingImpact>) -> String {
    let nights = impact.map(|i| i.nights_added).unwrap_or(0);
    match (net, impact) {
        (Some(net), _) if net.basis == NetBasis::LodgingAdjusted && nights != 0 => {
            if net.amount >= 0.0 {
                format!(", {} net after hotel", money(net.amount))
            } else {
                format!(", but hotel makes it {} more overall", money(-net.amount))
            }
        }
        (_, Some(impact)) if impact.status == ImpactStatus::Unknown && nights != 0 => {
            ", hotel cost not known".to_string()
        }
        _ => String::new(),
    }
}

fn day_offset(days: i64) -> String {
    match days {
        -1 => "1 day earlier".to_string(),
        1 => "1 day later".to_string(),
        d if d < 0 => format!("{} days earlier", -d),
        d => format!("{d} days later"),
    }
}

fn night_delta(nights: i64) -> String {
    match nights {
        1 => "1 more night".to_string(),
        -1 => "1 fewer night".to_string(),
        n if n > 0 => format!("{n} more nights"),
        n => format!("{} fewer nights", -n),
    }
}

fn money(amount: f64) -> String {
    format!("${amount:.0}")
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
