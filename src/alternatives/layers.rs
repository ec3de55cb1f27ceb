use std::collections::BTreeMap;

use tracing::debug;

use crate::alternatives::calendar::TripCalendar;
use crate::alternatives::{Alternative, AlternativeKind, ChangedAttribute};
use crate::config::{EngineConfig, GenerationConfig};
use crate::context::{percent_of, round_money, LegRole, PricedOption, TripContext};
use crate::lodging::{leg_shift_impact, net_savings};

/// All layer 1, 2 and 4 alternatives for one leg, in layer order.
pub fn generate_leg_alternatives(
    context: &TripContext,
    index: usize,
    config: &EngineConfig,
) -> Vec<Alternative> {
    let Some(leg) = context.legs.get(index) else {
        return Vec::new();
    };
    let Some(selected) = leg.selected_option() else {
        debug!("leg {} has no selection, no alternatives generated", leg.leg_id);
        return Vec::new();
    };

    let pool: Vec<&PricedOption> = leg
        .bookable_options(&context.traveler)
        .filter(|o| o.id != selected.id)
        .collect();
    if pool.is_empty() {
        debug!("leg {} has no priced options besides the selection", leg.leg_id);
        return Vec::new();
    }

    let generation = &config.generation;
    let mut out = Vec::new();
    out.extend(same_date_swaps(selected, &pool, generation));
    out.extend(nearby_airports(selected, &pool, generation));
    out.extend(alternate_routings(selected, &pool, generation));
    out.extend(date_shifts(context, index, selected, &pool, config));
    out.extend(cabin_downgrades(selected, &pool, generation));

    let own = context.traveler_airlines();
    for alternative in &mut out {
        alternative.is_user_airline = own.contains(&alternative.option.airline_code.to_ascii_uppercase());
    }
    debug!("leg {}: {} alternatives", leg.leg_id, out.len());
    out
}

fn same_date_swaps(
    selected: &PricedOption,
    pool: &[&PricedOption],
    config: &GenerationConfig,
) -> Vec<Alternative> {
    let candidates = pool.iter().copied().filter(|o| {
        o.date() == selected.date()
            && o.cabin == selected.cabin
            && o.same_airports(selected)
            && !o.is_alternate_airport
            && !o.same_airline(selected)
            && clears(selected, o, config.layer1_min_savings)
    });
    cheapest_per(candidates, |o| o.airline_code.to_ascii_uppercase())
        .into_iter()
        .take(config.max_airline_swaps)
        .map(|o| {
            build(
                AlternativeKind::SameDateSwap {
                    from_airline: selected.airline_code.clone(),
                    to_airline: o.airline_code.clone(),
                },
                vec![ChangedAttribute::Airline],
                selected,
                o,
            )
        })
        .collect()
}

fn nearby_airports(
    selected: &PricedOption,
    pool: &[&PricedOption],
    config: &GenerationConfig,
) -> Vec<Alternative> {
    let candidates = pool.iter().copied().filter(|o| {
        o.date() == selected.date()
            && o.cabin == selected.cabin
            && (!o.same_airports(selected) || o.is_alternate_airport)
            && clears(selected, o, config.layer1_min_savings)
    });
    cheapest_per(candidates, |o| o.route_label().to_ascii_uppercase())
        .into_iter()
        .take(config.max_nearby_airports)
        .map(|o| {
            let mut changed = vec![ChangedAttribute::Airport];
            if !o.same_airline(selected) {
                changed.push(ChangedAttribute::Airline);
            }
            build(
                AlternativeKind::NearbyAirport {
                    origin: o.origin.clone(),
                    destination: o.destination.clone(),
                    replaces: selected.route_label(),
                },
                changed,
                selected,
                o,
            )
        })
        .collect()
}

/// Same carrier and day with extra connections, for travelers who want to
/// keep their loyalty program.
fn alternate_routings(
    selected: &PricedOption,
    pool: &[&PricedOption],
    config: &GenerationConfig,
) -> Vec<Alternative> {
    let mut candidates: Vec<&PricedOption> = pool
        .iter()
        .copied()
        .filter(|o| {
            o.date() == selected.date()
                && o.cabin == selected.cabin
                && o.same_airline(selected)
                && o.same_airports(selected)
                && o.stops > selected.stops
                && clears(selected, o, config.layer1_min_savings)
        })
        .collect();
    candidates.sort_by(|a, b| a.price.total_cmp(&b.price).then_with(|| a.id.cmp(&b.id)));
    candidates
        .into_iter()
        .take(config.max_routing)
        .map(|o| {
            build(
                AlternativeKind::AlternateRouting {
                    added_stops: o.stops - selected.stops,
                    via: o.stop_airports.clone(),
                },
                vec![ChangedAttribute::Routing],
                selected,
                o,
            )
        })
        .collect()
}

fn date_shifts(
    context: &TripContext,
    index: usize,
    selected: &PricedOption,
    pool: &[&PricedOption],
    config: &EngineConfig,
) -> Vec<Alternative> {
    let leg = &context.legs[index];
    if leg.flexibility_days == 0 {
        debug!("leg {} is not date-flexible, skipping date shifts", leg.leg_id);
        return Vec::new();
    }

    let role = context.leg_role(index);
    let calendar = TripCalendar::for_trip(
        context,
        &config.calendar,
        config.trip_window.duration_tolerance_days,
    );
    let anchor = match role {
        LegRole::Outbound => context.return_leg().and_then(|l| l.selected_option()),
        LegRole::Return => context.outbound_leg().and_then(|l| l.selected_option()),
        LegRole::Intermediate | LegRole::OneWay => None,
    }
    .map(|o| o.date());

    let flexibility = i64::from(leg.flexibility_days);
    let candidates = pool.iter().copied().filter(|o| {
        let shift = (o.date() - selected.date()).num_days();
        let calendar_ok = match (calendar, anchor) {
            (Some(calendar), Some(anchor)) => calendar.leg_move_allowed(role, o.date(), anchor),
            _ => true,
        };
        shift != 0
            && shift.abs() <= flexibility
            && o.cabin == selected.cabin
            && o.same_airline(selected)
            && o.same_airports(selected)
            && clears(selected, o, config.generation.layer2_min_savings)
            && calendar_ok
    });

    let stay = context.stay_rate_for(index);
    let previous_stay = index
        .checked_sub(1)
        .and_then(|i| context.legs.get(i))
        .map(|l| &l.lodging);

    cheapest_per(candidates, |o| o.date())
        .into_iter()
        .take(config.generation.max_date_shifts)
        .map(|o| {
            let mut alternative = build(
                AlternativeKind::DateShift {
                    original_date: selected.date(),
                    new_date: o.date(),
                    days_shifted: (o.date() - selected.date()).num_days(),
                },
                vec![ChangedAttribute::Date],
                selected,
                o,
            );
            let impact = leg_shift_impact(role, selected.date(), o.date(), stay, previous_stay);
            alternative.net_savings = Some(net_savings(
                alternative.savings_amount,
                Some(&impact),
                config.lodging.unknown_impact_materiality,
            ));
            alternative.lodging_impact = Some(impact);
            alternative
        })
        .collect()
}

fn cabin_downgrades(
    selected: &PricedOption,
    pool: &[&PricedOption],
    config: &GenerationConfig,
) -> Vec<Alternative> {
    let Some(lower) = selected.cabin.one_tier_down() else {
        return Vec::new();
    };
    let candidates = pool.iter().copied().filter(|o| {
        o.date() == selected.date()
            && o.cabin == lower
            && o.same_airports(selected)
            && clears(selected, o, config.layer4_min_savings)
    });
    cheapest_per(candidates, |o| o.airline_code.to_ascii_uppercase())
        .into_iter()
        .take(config.max_cabin_downgrades)
        .map(|o| {
            let mut changed = vec![ChangedAttribute::Cabin];
            if !o.same_airline(selected) {
                changed.push(ChangedAttribute::Airline);
            }
            build(
                AlternativeKind::CabinDowngrade {
                    from_cabin: selected.cabin,
                    to_cabin: lower,
                },
                changed,
                selected,
                o,
            )
        })
        .collect()
}

fn clears(selected: &PricedOption, candidate: &PricedOption, minimum: f64) -> bool {
    let savings = selected.price - candidate.price;
    savings > 0.0 && savings >= minimum
}

/// Cheapest option per key, ordered by ascending price.
fn cheapest_per<'a, K: Ord>(
    options: impl Iterator<Item = &'a PricedOption>,
    key: impl Fn(&PricedOption) -> K,
) -> Vec<&'a PricedOption> {
    let mut best: BTreeMap<K, &PricedOption> = BTreeMap::new();
    for option in options {
        let entry = best.entry(key(option)).or_insert(option);
        if option.price < entry.price {
            *entry = option;
        }
    }
    let mut out: Vec<&PricedOption> = best.into_values().collect();
    out.sort_by(|a, b| a.price.total_cmp(&b.price).then_with(|| a.id.cmp(&b.id)));
    out
}

fn build(
    kind: AlternativeKind,
    changed: Vec<ChangedAttribute>,
    selected: &PricedOption,
    option: &PricedOption,
) -> Alternative {
    let savings_amount = selected.price - option.price;
    Alternative {
        layer: kind.layer(),
        disruption: kind.disruption(),
        kind,
        changed,
        savings_amount,
        savings_percent: round_money(percent_of(savings_amount, selected.price)),
        lodging_impact: None,
        net_savings: None,
        is_user_airline: false,
        option: option.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alternatives::AlternativeType;
    use crate::context::sample::{option, sample_round_trip};
    use crate::context::{LodgingRate, RateConfidence};
    use crate::lodging::{ImpactStatus, NetBasis};

    fn of_type(alternatives: &[Alternative], kind: AlternativeType) -> Vec<&Alternative> {
        alternatives
            .iter()
            .filter(|a| a.alternative_type() == kind)
            .collect()
    }

    #[test]
    fn savings_match_price_gap_and_clear_layer_minimum() {
        let trip = sample_round_trip();
        let config = EngineConfig::default();
        for index in 0..trip.legs.len() {
            let selected = trip.legs[index].selected_option().expect("selection");
            for alternative in generate_leg_alternatives(&trip, index, &config) {
                assert_eq!(
                    alternative.savings_amount,
                    selected.price - alternative.option.price
                );
                let minimum = match alternative.layer {
                    1 => config.generation.layer1_min_savings,
                    2 => config.generation.layer2_min_savings,
                    _ => config.generation.layer4_min_savings,
                };
                assert!(alternative.savings_amount >= minimum);
                assert!(alternative.savings_amount > 0.0);
            }
        }
    }

    #[test]
    fn excluded_airlines_never_appear() {
        let trip = sample_round_trip();
        let alternatives = generate_leg_alternatives(&trip, 0, &EngineConfig::default());
        assert!(alternatives.iter().all(|a| a.option.airline_code != "NK"));
    }

    #[test]
    fn swaps_are_one_per_airline_and_capped() {
        let trip = sample_round_trip();
        let config = EngineConfig::default();
        let alternatives = generate_leg_alternatives(&trip, 0, &config);
        let swaps = of_type(&alternatives, AlternativeType::SameDateSwap);
        assert!(swaps.len() <= config.generation.max_airline_swaps);
        let mut airlines: Vec<&str> = swaps.iter().map(|a| a.option.airline_code.as_str()).collect();
        airlines.dedup();
        assert_eq!(airlines.len(), swaps.len());
        // B6 450 and DL 480 are the two cheapest non-excluded same-day carriers.
        assert_eq!(swaps[0].option.id, "OUT-B6-0302");
        assert_eq!(swaps[1].option.id, "OUT-DL-0302");
    }

    #[test]
    fn nearby_airport_and_routing_layers_are_found() {
        let trip = sample_round_trip();
        let alternatives = generate_leg_alternatives(&trip, 0, &EngineConfig::default());
        let nearby = of_type(&alternatives, AlternativeType::NearbyAirport);
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].option.origin, "OAK");

        let routing = of_type(&alternatives, AlternativeType::AlternateRouting);
        assert_eq!(routing.len(), 1);
        assert!(routing[0].is_user_airline);
        assert_eq!(routing[0].savings_amount, 100.0);
    }

    #[test]
    fn outbound_date_shift_carries_lodging_impact() {
        let trip = sample_round_trip();
        let alternatives = generate_leg_alternatives(&trip, 0, &EngineConfig::default());
        let shifts = of_type(&alternatives, AlternativeType::DateShift);
        // Mar 1 (Sun) and Mar 3 (Tue) are both allowed outbound days within two days.
        assert_eq!(shifts.len(), 2);

        let earlier = shifts
            .iter()
            .find(|a| a.option.id == "OUT-UA-0301")
            .expect("sunday departure");
        let impact = earlier.lodging_impact.as_ref().expect("impact");
        assert_eq!(impact.nights_added, 1);
        assert_eq!(impact.status, ImpactStatus::Known);
        let net = earlier.net_savings.as_ref().expect("net savings");
        assert_eq!(net.amount, 120.0 - 250.0);
        assert_eq!(net.basis, NetBasis::LodgingAdjusted);

        let later = shifts
            .iter()
            .find(|a| a.option.id == "OUT-UA-0303")
            .expect("tuesday departure");
        assert_eq!(later.net_savings.as_ref().map(|n| n.amount), Some(400.0));
    }

    #[test]
    fn off_rule_return_does_not_block_outbound_shifts() {
        let mut trip = sample_round_trip();
        let mut sunday_return = trip.legs[1].selected.clone().expect("return selection");
        sunday_return.id = "RET-UA-0308".to_string();
        sunday_return.departure += chrono::Duration::days(2);
        sunday_return.arrival += chrono::Duration::days(2);
        trip.legs[1].selected = Some(sunday_return);
        trip.trip_duration_days = Some(6);

        let alternatives = generate_leg_alternatives(&trip, 0, &EngineConfig::default());
        let mut ids: Vec<&str> = of_type(&alternatives, AlternativeType::DateShift)
            .iter()
            .map(|a| a.option.id.as_str())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["OUT-UA-0301", "OUT-UA-0303"]);
    }

    #[test]
    fn return_shift_on_multi_stay_trip_uses_last_stay_rate() {
        let mut trip = sample_round_trip();
        let mut middle = trip.legs[0].clone();
        middle.leg_id = "leg-mid".to_string();
        middle.origin = "JFK".to_string();
        middle.destination = "BOS".to_string();
        middle.selected = None;
        middle.options.clear();
        middle.lodging = LodgingRate {
            nightly_rate: Some(90.0),
            chain: Some("Hyatt".to_string()),
            confidence: RateConfidence::Known,
        };
        trip.legs.insert(1, middle);

        let alternatives = generate_leg_alternatives(&trip, 2, &EngineConfig::default());
        let later = alternatives
            .iter()
            .find(|a| a.option.id == "RET-UA-0307")
            .expect("saturday return");
        let impact = later.lodging_impact.as_ref().expect("impact");
        assert_eq!(impact.nights_added, 1);
        assert_eq!(impact.nightly_rate, Some(90.0));
        assert_eq!(impact.cost_delta, Some(90.0));
        assert_eq!(later.net_savings.as_ref().map(|n| n.amount), Some(160.0 - 90.0));
    }

    #[test]
    fn zero_flexibility_skips_date_shifts() {
        let mut trip = sample_round_trip();
        trip.legs[0].flexibility_days = 0;
        let alternatives = generate_leg_alternatives(&trip, 0, &EngineConfig::default());
        assert!(of_type(&alternatives, AlternativeType::DateShift).is_empty());
    }

    #[test]
    fn cabin_downgrades_step_one_tier() {
        let trip = sample_round_trip();
        let alternatives = generate_leg_alternatives(&trip, 1, &EngineConfig::default());
        let downgrades = of_type(&alternatives, AlternativeType::CabinDowngrade);
        assert_eq!(downgrades.len(), 2);
        assert!(downgrades.iter().all(|a| a.layer == 4));
        assert!(downgrades
            .iter()
            .all(|a| a.option.cabin == crate::context::CabinClass::Economy));
    }

    #[test]
    fn cheapest_selection_has_no_alternatives() {
        let mut trip = sample_round_trip();
        trip.trip_duration_days = None;
        trip.legs.truncate(1);
        let leg = &mut trip.legs[0];
        let cheapest = option("ONLY-CHEAP", "UA", "2026-03-02T08:00", 200.0);
        leg.options.push(cheapest.clone());
        leg.options.retain(|o| o.cabin == cheapest.cabin);
        leg.selected = Some(cheapest);
        let alternatives = generate_leg_alternatives(&trip, 0, &EngineConfig::default());
        assert!(alternatives.is_empty());
    }

    #[test]
    fn missing_selection_yields_nothing() {
        let mut trip = sample_round_trip();
        trip.legs[0].selected = None;
        assert!(generate_leg_alternatives(&trip, 0, &EngineConfig::default()).is_empty());
    }
}
