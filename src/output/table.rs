use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::advisor::DecisionLabel;
use crate::audience::{ApproverView, ComplianceRecord, TravelerView};
use crate::drivers::CostDriverReport;
use crate::resolver::{PolicyFlag, ResolvedProposal, ResolvedResult};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn money(value: Option<f64>) -> String {
    value
        .map(|v| format!("${v:.0}"))
        .unwrap_or_else(|| "-".to_string())
}

fn decision_cell(decision: Option<DecisionLabel>) -> Cell {
    match decision {
        Some(DecisionLabel::Approve) => Cell::new("APPROVE").fg(Color::Green),
        Some(DecisionLabel::Review) => Cell::new("REVIEW").fg(Color::Yellow),
        Some(DecisionLabel::Optimize) => Cell::new("OPTIMIZE").fg(Color::Red),
        None => Cell::new("-"),
    }
}

fn policy_cell(policy: &PolicyFlag) -> Cell {
    match policy.overage {
        Some(overage) if policy.is_over_budget() => {
            Cell::new(format!("OVER +${overage:.0}")).fg(Color::Red)
        }
        _ => Cell::new("ok").fg(Color::Green),
    }
}

pub fn render_drivers_table(report: &CostDriverReport) -> String {
    let mut table = new_table();
    table.set_header(vec!["Leg", "Driver", "Amount", "Share", "Detail"]);
    for driver in &report.drivers {
        table.add_row(vec![
            driver.leg_id.clone(),
            driver.kind.to_string(),
            format!("${:.0}", driver.amount),
            format!("{:.1}%", driver.percent),
            driver.detail.clone(),
        ]);
    }
    format!("{table}\n{}", report.summary_line())
}

pub fn render_alternatives_table(resolved: &ResolvedResult) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "ID", "Leg", "Type", "Flight", "Price", "Savings", "Net", "Score", "Policy", "Reason",
    ]);
    for leg in &resolved.legs {
        for alt in &leg.alternatives {
            let a = &alt.candidate;
            table.add_row(Row::from(vec![
                Cell::new(&alt.short_id),
                Cell::new(&leg.leg_id),
                Cell::new(a.alternative_type().to_string()),
                Cell::new(format!(
                    "{} {} {}",
                    a.option.airline_code,
                    a.option.route_label(),
                    a.option.departure.format("%b %-d %H:%M")
                )),
                Cell::new(format!("${:.0}", a.option.price)),
                Cell::new(format!("${:.0} ({:.0}%)", a.savings_amount, a.savings_percent)),
                Cell::new(money(a.net_savings.as_ref().map(|n| n.amount))),
                Cell::new(format!("{:.1}", alt.score.composite)),
                policy_cell(&alt.policy),
                Cell::new(alt.reason.as_deref().unwrap_or("-")),
            ]));
        }
    }
    table.to_string()
}

pub fn render_proposals_table(proposals: &[ResolvedProposal]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "ID", "Dates", "Airline", "Price", "Savings", "Nights", "Net", "Score", "Reason",
    ]);
    for proposal in proposals {
        let p = &proposal.candidate;
        table.add_row(Row::from(vec![
            Cell::new(&proposal.short_id),
            Cell::new(format!("{} -> {}", p.outbound.date, p.return_flight.date)),
            Cell::new(p.airline_label()),
            Cell::new(format!("${:.0}", p.combined_price)),
            Cell::new(format!("${:.0} ({:.0}%)", p.savings_amount, p.savings_percent)),
            Cell::new(format!("{:+}", p.duration_change_days)),
            Cell::new(money(p.net_savings.as_ref().map(|n| n.amount))),
            Cell::new(format!("{:.1}", proposal.score.composite)),
            Cell::new(proposal.reason.as_deref().unwrap_or("-")),
        ]));
    }
    table.to_string()
}

pub fn render_traveler_view(view: &TravelerView) -> String {
    let mut out = format!(
        "Trip {}: {}\n{}\n",
        view.trip_id, view.summary, view.key_insight
    );

    let mut table = new_table();
    table.set_header(vec!["ID", "Leg", "Option", "Price", "You save", "Why"]);
    for leg in &view.legs {
        if leg.alternatives.is_empty() {
            table.add_row(vec![
                "-".to_string(),
                leg.leg_id.clone(),
                "No cheaper alternatives".to_string(),
                money(leg.selected.as_ref().map(|s| s.price)),
                "-".to_string(),
                String::new(),
            ]);
        }
        for alt in &leg.alternatives {
            table.add_row(vec![
                alt.short_id.clone(),
                leg.leg_id.clone(),
                format!("{} {} {}", alt.airline, alt.route, alt.departure),
                format!("${:.0}", alt.price),
                money(alt.net_savings.or(Some(alt.savings_amount))),
                alt.reason.clone(),
            ]);
        }
    }
    out.push_str(&table.to_string());

    let proposals = view.trip_window.iter().chain(&view.different_month);
    let mut dates = new_table();
    dates.set_header(vec!["ID", "Dates", "Airline", "Price", "You save", "Why"]);
    let mut any = false;
    for p in proposals {
        any = true;
        dates.add_row(vec![
            p.short_id.clone(),
            format!("{} -> {}", p.outbound_date, p.return_date),
            p.airline.clone(),
            format!("${:.0}", p.combined_price),
            money(p.net_savings.or(Some(p.savings_amount))),
            p.reason.clone(),
        ]);
    }
    if any {
        out.push('\n');
        out.push_str(&dates.to_string());
    }

    if let Some(downgrade) = &view.cabin_downgrade {
        out.push_str(&format!(
            "\nDropping one cabin tier on every leg saves ${:.0} ({:.0}%): {}",
            downgrade.total_savings,
            downgrade.savings_percent,
            downgrade.short_ids.join(", ")
        ));
    }
    out
}

pub fn render_approver_view(view: &ApproverView) -> String {
    let mut header = new_table();
    header.set_header(vec!["Trip", "Traveler", "Selected", "Cheapest", "Premium", "Decision"]);
    header.add_row(Row::from(vec![
        Cell::new(&view.trip_id),
        Cell::new(&view.traveler_role),
        Cell::new(format!("${:.0}", view.totals.selected_total)),
        Cell::new(format!("${:.0}", view.totals.cheapest_total)),
        Cell::new(format!(
            "${:.0} ({:.0}%)",
            view.totals.savings_amount, view.totals.savings_percent
        )),
        decision_cell(view.decision),
    ]));

    let mut legs = new_table();
    legs.set_header(vec![
        "Leg", "Route", "Airline", "Selected", "Cheapest", "Premium", "Best alt", "Over budget",
    ]);
    for leg in &view.legs {
        legs.add_row(vec![
            leg.leg_id.clone(),
            leg.route.clone(),
            leg.selected_airline.clone().unwrap_or_else(|| "-".to_string()),
            money(leg.selected_price),
            money(leg.cheapest_price),
            money(leg.premium),
            match (&leg.best_alternative, leg.best_savings) {
                (Some(id), Some(savings)) => format!("{id} (${savings:.0})"),
                _ => "-".to_string(),
            },
            if leg.over_budget { "yes" } else { "no" }.to_string(),
        ]);
    }

    let mut out = format!("{header}\n{legs}\n{}", view.narrative);
    if let Some(driver) = &view.primary_driver {
        out.push_str(&format!("\nPrimary driver: {driver}"));
    }
    if let Some(prompt) = &view.justification_prompt {
        out.push_str(&format!("\nJustification: {prompt}"));
    }
    out
}

pub fn render_compliance_table(record: &ComplianceRecord) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "ID", "Scope", "Rank", "Type", "Price", "Savings", "Composite", "Policy",
    ]);
    for entry in &record.entries {
        table.add_row(Row::from(vec![
            Cell::new(&entry.short_id),
            Cell::new(&entry.scope),
            Cell::new(entry.rank),
            Cell::new(&entry.candidate_type),
            Cell::new(format!("${:.0}", entry.price)),
            Cell::new(format!("${:.0}", entry.savings_amount)),
            Cell::new(format!("{:.2}", entry.score.composite)),
            policy_cell(&entry.policy),
        ]));
    }
    format!(
        "{table}\nTrip {} at {}\nContext SHA-256 {}\nNarrative source: {}, over budget: {}, \
         hard filter configured: {}",
        record.trip_id,
        record.timestamp.to_rfc3339(),
        record.context_digest,
        record.source,
        record.over_budget_count,
        record.policy_hard_filter_configured
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::EngineConfig;
    use crate::context::sample::sample_round_trip;
    use crate::engine::TradeoffEngine;

    #[test]
    fn renders_every_view_for_sample_trip() {
        let trip = sample_round_trip();
        let engine = TradeoffEngine::new(Arc::new(EngineConfig::default()), None);
        let (output, views) = tokio_test::block_on(engine.run_views(&trip)).expect("run");

        let drivers = render_drivers_table(&output.drivers);
        assert!(drivers.contains("Premium $"));

        let alternatives = render_alternatives_table(&output.resolved);
        assert!(alternatives.contains("L1A1"));
        assert!(alternatives.contains("L2A1"));

        let proposals = render_proposals_table(&output.resolved.trip_window);
        assert!(proposals.contains("TW1"));

        let traveler = render_traveler_view(&views.traveler);
        assert!(traveler.starts_with("Trip TRIP-SAMPLE-001"));
        assert!(traveler.contains("DM1"));
        assert!(traveler.contains("Dropping one cabin tier"));

        let approver = render_approver_view(&views.approver);
        assert!(approver.contains("OPTIMIZE"));
        assert!(approver.contains("Justification:"));

        let compliance = render_compliance_table(&views.compliance);
        assert!(compliance.contains(&views.compliance.context_digest));
    }
}
