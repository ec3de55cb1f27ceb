use tracing::debug;

use crate::config::DriverConfig;
use crate::context::{
    percent_of, round_money, LegContext, PricedOption, TravelerProfile, TripContext,
};
use crate::drivers::{CostDriver, CostDriverReport, DriverKind};

pub fn analyze_cost_drivers(context: &TripContext, config: &DriverConfig) -> CostDriverReport {
    let mut drivers = Vec::new();
    let mut selected_total = 0.0;
    let mut cheapest_total = 0.0;

    for leg in &context.legs {
        let Some(selected) = leg.selected_option() else {
            debug!("leg {} has no selection, skipping driver analysis", leg.leg_id);
            continue;
        };
        selected_total += selected.price;
        cheapest_total += leg.cheapest_price(&context.traveler).unwrap_or(selected.price);
        drivers.extend(leg_drivers(leg, selected, &context.traveler, config));
    }

    drivers.sort_by(|a, b| {
        b.amount
            .total_cmp(&a.amount)
            .then_with(|| a.leg_id.cmp(&b.leg_id))
            .then_with(|| a.kind.cmp(&b.kind))
    });

    let total_premium = round_money((selected_total - cheapest_total).max(0.0));
    CostDriverReport {
        drivers,
        selected_total: round_money(selected_total),
        cheapest_total: round_money(cheapest_total),
        total_premium,
        total_premium_percent: round_money(percent_of(total_premium, selected_total)),
    }
}

fn leg_drivers(
    leg: &LegContext,
    selected: &PricedOption,
    traveler: &TravelerProfile,
    config: &DriverConfig,
) -> Vec<CostDriver> {
    let same_cabin: Vec<&PricedOption> = leg
        .bookable_options(traveler)
        .filter(|o| o.cabin == selected.cabin)
        .collect();
    let same_day: Vec<&PricedOption> = same_cabin
        .iter()
        .copied()
        .filter(|o| o.date() == selected.date())
        .collect();

    let mut out = Vec::new();
    let mut push = |kind: DriverKind, gap: f64, threshold: f64, detail: String| {
        let percent = percent_of(gap, selected.price);
        if gap > 0.0 && percent > threshold {
            out.push(CostDriver {
                leg_id: leg.leg_id.clone(),
                kind,
                amount: round_money(gap),
                percent: round_money(percent),
                detail,
            });
        }
    };

    if let Some(other) = cheapest(same_day.iter().copied().filter(|o| !o.same_airline(selected))) {
        push(
            DriverKind::Airline,
            selected.price - other.price,
            config.airline_threshold_pct,
            format!("{} is cheaper on the same day", other.airline_name),
        );
    }

    // Date effect is measured cheapest-to-cheapest so the airline effect is excluded.
    if let (Some(day_best), Some(any_best)) = (
        cheapest(same_day.iter().copied()),
        cheapest(same_cabin.iter().copied()),
    ) {
        if any_best.date() != selected.date() {
            push(
                DriverKind::Date,
                day_best.price - any_best.price,
                config.date_threshold_pct,
                format!("fares on {} are lower", any_best.date()),
            );
        }
    }

    if selected.stops == 0 {
        if let Some(connecting) = cheapest(same_day.iter().copied().filter(|o| o.stops > 0)) {
            push(
                DriverKind::Stops,
                selected.price - connecting.price,
                config.stops_threshold_pct,
                format!("connecting via {} costs less", connecting.stop_airports.join("/")),
            );
        }
    }

    let primary_best = cheapest(
        same_day
            .iter()
            .copied()
            .filter(|o| o.same_airports(selected) && !o.is_alternate_airport),
    );
    let alternate_best = cheapest(
        same_day
            .iter()
            .copied()
            .filter(|o| !o.same_airports(selected) || o.is_alternate_airport),
    );
    if let Some(alternate) = alternate_best {
        let primary_price = primary_best.map(|p| p.price).unwrap_or(selected.price);
        push(
            DriverKind::Route,
            primary_price.min(selected.price) - alternate.price,
            config.route_threshold_pct,
            format!("{} is cheaper than {}", alternate.route_label(), selected.route_label()),
        );
    }

    if let Some(lower) = selected.cabin.one_tier_down() {
        let downgraded = cheapest(
            leg.bookable_options(traveler)
                .filter(|o| o.cabin == lower && o.date() == selected.date()),
        );
        if let Some(downgraded) = downgraded {
            push(
                DriverKind::Cabin,
                selected.price - downgraded.price,
                config.cabin_threshold_pct,
                format!("{lower} is available for less"),
            );
        }
    }

    out
}

fn cheapest<'a>(options: impl Iterator<Item = &'a PricedOption>) -> Option<&'a PricedOption> {
    options.min_by(|a, b| a.price.total_cmp(&b.price))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::sample::{option, sample_round_trip};

    #[test]
    fn drivers_are_sorted_by_amount() {
        let trip = sample_round_trip();
        let report = analyze_cost_drivers(&trip, &DriverConfig::default());
        assert!(!report.drivers.is_empty());
        for pair in report.drivers.windows(2) {
            assert!(pair[0].amount >= pair[1].amount);
        }
        assert_eq!(
            report.primary().map(|d| d.amount),
            report.drivers.first().map(|d| d.amount)
        );
    }

    #[test]
    fn airline_driver_reports_same_day_gap() {
        let trip = sample_round_trip();
        let report = analyze_cost_drivers(&trip, &DriverConfig::default());
        let airline = report
            .drivers
            .iter()
            .find(|d| d.leg_id == "leg-1" && d.kind == DriverKind::Airline)
            .expect("airline driver on outbound");
        // NK at 300 is excluded, so AS out of OAK at 430 sets the same-day floor.
        assert_eq!(airline.amount, 190.0);
    }

    #[test]
    fn excluded_airlines_do_not_drive_the_premium() {
        let mut trip = sample_round_trip();
        let report = analyze_cost_drivers(&trip, &DriverConfig::default());
        assert_eq!(report.cheapest_total, 710.0);
        assert_eq!(report.total_premium, 550.0);
        assert!(report
            .drivers
            .iter()
            .all(|d| !d.detail.contains("Spirit")));

        trip.traveler.excluded_airlines.clear();
        let unrestricted = analyze_cost_drivers(&trip, &DriverConfig::default());
        assert_eq!(unrestricted.cheapest_total, 660.0);
        assert!(unrestricted
            .drivers
            .iter()
            .any(|d| d.kind == DriverKind::Airline && d.amount == 320.0));
    }

    #[test]
    fn totals_reflect_selection_and_cheapest() {
        let trip = sample_round_trip();
        let report = analyze_cost_drivers(&trip, &DriverConfig::default());
        assert_eq!(report.selected_total, 1_260.0);
        assert!(report.cheapest_total < report.selected_total);
        assert_eq!(
            report.total_premium,
            round_money(report.selected_total - report.cheapest_total)
        );
    }

    #[test]
    fn small_gaps_stay_below_threshold() {
        let mut trip = sample_round_trip();
        let leg = &mut trip.legs[0];
        let selected = leg.selected.clone().expect("selection");
        leg.options = vec![
            selected,
            option("OUT-DL-X", "DL", "2026-03-02T09:00", 610.0),
        ];
        trip.legs.truncate(1);
        trip.trip_duration_days = None;
        let report = analyze_cost_drivers(&trip, &DriverConfig::default());
        assert!(report.drivers.is_empty());
        assert_eq!(report.total_premium, 10.0);
    }

    #[test]
    fn legs_without_selection_are_skipped() {
        let mut trip = sample_round_trip();
        trip.legs[1].selected = None;
        let report = analyze_cost_drivers(&trip, &DriverConfig::default());
        assert!(report.drivers.iter().all(|d| d.leg_id == "leg-1"));
        assert_eq!(report.selected_total, 620.0);
    }
}
