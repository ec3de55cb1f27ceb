use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::alternatives::calendar::TripCalendar;
use crate::alternatives::{
    FlightSummary, ProposalCategory, ProposalKey, SearchPass, TripWindowProposal,
};
use crate::config::EngineConfig;
use crate::context::{
    percent_of, round_money, LegContext, LodgingRate, PricedOption, TripContext,
};
use crate::lodging::{net_savings, window_shift_impact};

/// Round-trip date-pair proposals, split into (trip window, different month).
pub fn generate_trip_window_proposals(
    context: &TripContext,
    config: &EngineConfig,
) -> (Vec<TripWindowProposal>, Vec<TripWindowProposal>) {
    let Some(search) = WindowSearch::new(context, config) else {
        return (Vec::new(), Vec::new());
    };

    let mut merged: BTreeMap<ProposalKey, TripWindowProposal> = BTreeMap::new();
    let passes = [
        search.cheapest_pass(),
        search.traveler_airline_pass(),
        search.single_carrier_pass(),
    ];
    for proposal in passes.into_iter().flatten() {
        merge_proposal(&mut merged, proposal);
    }
    debug!("trip window search produced {} unique date pairs", merged.len());

    let ranked = rank_with_reserved_slots(
        merged.into_values().collect(),
        config.trip_window.reserved_user_airline_slots,
        config.trip_window.max_proposals,
    );
    split_by_category(ranked)
}

/// Keeps the higher-savings proposal when two passes find the same key.
pub fn merge_proposal(
    merged: &mut BTreeMap<ProposalKey, TripWindowProposal>,
    proposal: TripWindowProposal,
) {
    let key = proposal.key();
    match merged.get(&key) {
        Some(existing) if existing.savings_amount >= proposal.savings_amount => {}
        _ => {
            merged.insert(key, proposal);
        }
    }
}

/// Reserves the best traveler-airline proposals, then fills by savings.
pub fn rank_with_reserved_slots(
    mut proposals: Vec<TripWindowProposal>,
    reserved: usize,
    max_total: usize,
) -> Vec<TripWindowProposal> {
    proposals.sort_by(|a, b| {
        b.savings_amount
            .total_cmp(&a.savings_amount)
            .then_with(|| a.key().cmp(&b.key()))
    });
    let (own, others): (Vec<_>, Vec<_>) = proposals.into_iter().partition(|p| p.is_user_airline);

    let reserve = reserved.min(own.len()).min(max_total);
    let mut own = own.into_iter();
    let mut out: Vec<TripWindowProposal> = own.by_ref().take(reserve).collect();

    let mut remainder: Vec<TripWindowProposal> = own.chain(others).collect();
    remainder.sort_by(|a, b| {
        b.savings_amount
            .total_cmp(&a.savings_amount)
            .then_with(|| a.key().cmp(&b.key()))
    });
    let room = max_total.saturating_sub(out.len());
    out.extend(remainder.into_iter().take(room));
    out
}

/// Splits by shift layer; when that leaves a bucket empty, the nearer half
/// by shift distance becomes the trip window.
pub fn split_by_category(
    proposals: Vec<TripWindowProposal>,
) -> (Vec<TripWindowProposal>, Vec<TripWindowProposal>) {
    let (near, far): (Vec<_>, Vec<_>) = proposals
        .into_iter()
        .partition(|p| p.category == ProposalCategory::TripWindow);
    if !near.is_empty() && !far.is_empty() {
        return (near, far);
    }

    let mut all: Vec<TripWindowProposal> = near.into_iter().chain(far).collect();
    if all.len() < 2 {
        return all
            .into_iter()
            .partition(|p| p.category == ProposalCategory::TripWindow);
    }
    all.sort_by_key(|p| p.shift_days);
    let cut = all.len().div_ceil(2);
    let far = all.split_off(cut);
    let near = all
        .into_iter()
        .map(|mut p| {
            p.category = ProposalCategory::TripWindow;
            p
        })
        .collect();
    let far = far
        .into_iter()
        .map(|mut p| {
            p.category = ProposalCategory::DifferentMonth;
            p
        })
        .collect();
    (near, far)
}

struct WindowSearch<'a> {
    config: &'a EngineConfig,
    calendar: TripCalendar<'a>,
    first_stay: Option<&'a LodgingRate>,
    last_stay: Option<&'a LodgingRate>,
    outbound: &'a PricedOption,
    return_selected: &'a PricedOption,
    outbound_pool: Vec<&'a PricedOption>,
    return_pool: Vec<&'a PricedOption>,
    traveler_airlines: BTreeSet<String>,
}

impl<'a> WindowSearch<'a> {
    fn new(context: &'a TripContext, config: &'a EngineConfig) -> Option<Self> {
        let outbound_leg = context.outbound_leg()?;
        let return_leg = context.return_leg()?;
        let (Some(outbound), Some(return_selected)) =
            (outbound_leg.selected_option(), return_leg.selected_option())
        else {
            debug!("trip window search needs both outbound and return selections");
            return None;
        };
        let calendar = TripCalendar::for_trip(
            context,
            &config.calendar,
            config.trip_window.duration_tolerance_days,
        )?;

        let window = config.trip_window.search_days.max(0);
        let in_window = |leg: &'a LegContext, selected: &'a PricedOption| -> Vec<&'a PricedOption> {
            leg.bookable_options(&context.traveler)
                .filter(|o| {
                    (o.date() - selected.date()).num_days().abs() <= window
                        && o.cabin == selected.cabin
                        && o.same_airports(selected)
                })
                .collect()
        };

        Some(Self {
            config,
            calendar,
            first_stay: context.first_stay(),
            last_stay: context.last_stay(),
            outbound,
            return_selected,
            outbound_pool: in_window(outbound_leg, outbound),
            return_pool: in_window(return_leg, return_selected),
            traveler_airlines: context.traveler_airlines(),
        })
    }

    /// Pass 1: cheapest flight per date on each leg, any airline.
    fn cheapest_pass(&self) -> Vec<TripWindowProposal> {
        self.pair(
            cheapest_by_date(self.outbound_pool.iter().copied()),
            cheapest_by_date(self.return_pool.iter().copied()),
            SearchPass::Cheapest,
        )
    }

    /// Pass 2: restricted to the traveler's own airlines.
    fn traveler_airline_pass(&self) -> Vec<TripWindowProposal> {
        let own = |o: &&PricedOption| self.is_traveler_airline(&o.airline_code);
        self.pair(
            cheapest_by_date(self.outbound_pool.iter().copied().filter(own)),
            cheapest_by_date(self.return_pool.iter().copied().filter(own)),
            SearchPass::TravelerAirline,
        )
    }

    /// Pass 3: each other carrier that flies both legs inside the window.
    fn single_carrier_pass(&self) -> Vec<TripWindowProposal> {
        let carriers = |pool: &[&PricedOption]| -> BTreeSet<String> {
            pool.iter()
                .map(|o| o.airline_code.to_ascii_uppercase())
                .collect()
        };
        let both = carriers(&self.outbound_pool)
            .intersection(&carriers(&self.return_pool))
            .filter(|code| !self.traveler_airlines.contains(*code))
            .cloned()
            .collect::<Vec<_>>();

        let mut out = Vec::new();
        for code in both {
            let flies = |o: &&PricedOption| o.airline_code.eq_ignore_ascii_case(&code);
            out.extend(self.pair(
                cheapest_by_date(self.outbound_pool.iter().copied().filter(flies)),
                cheapest_by_date(self.return_pool.iter().copied().filter(flies)),
                SearchPass::SingleCarrier,
            ));
        }
        out
    }

    fn pair(
        &self,
        outbound_by_date: BTreeMap<NaiveDate, &PricedOption>,
        return_by_date: BTreeMap<NaiveDate, &PricedOption>,
        pass: SearchPass,
    ) -> Vec<TripWindowProposal> {
        let original_outbound = self.outbound.date();
        let original_return = self.return_selected.date();
        let mut out = Vec::new();
        for (outbound_date, outbound) in &outbound_by_date {
            for (return_date, return_flight) in &return_by_date {
                if *outbound_date == original_outbound && *return_date == original_return {
                    continue;
                }
                if !self.calendar.pair_allowed(*outbound_date, *return_date) {
                    continue;
                }
                if let Some(proposal) = self.build(outbound, return_flight, pass) {
                    out.push(proposal);
                }
            }
        }
        out
    }

    fn build(
        &self,
        outbound: &PricedOption,
        return_flight: &PricedOption,
        pass: SearchPass,
    ) -> Option<TripWindowProposal> {
        let original_price = self.outbound.price + self.return_selected.price;
        let combined_price = outbound.price + return_flight.price;
        let savings_amount = original_price - combined_price;
        if savings_amount <= 0.0 || savings_amount < self.config.trip_window.min_savings {
            return None;
        }

        let original_outbound = self.outbound.date();
        let original_return = self.return_selected.date();
        let trip_duration_days = (return_flight.date() - outbound.date()).num_days();
        let shift_days = (outbound.date() - original_outbound)
            .num_days()
            .abs()
            .max((return_flight.date() - original_return).num_days().abs());
        let layer = if shift_days <= self.config.trip_window.near_shift_max_days {
            2
        } else {
            3
        };

        let impact = window_shift_impact(
            original_outbound,
            original_return,
            outbound.date(),
            return_flight.date(),
            self.first_stay,
            self.last_stay,
        );
        let net = net_savings(
            savings_amount,
            Some(&impact),
            self.config.lodging.unknown_impact_materiality,
        );

        Some(TripWindowProposal {
            outbound: FlightSummary::from(outbound),
            return_flight: FlightSummary::from(return_flight),
            combined_price: round_money(combined_price),
            savings_amount,
            savings_percent: round_money(percent_of(savings_amount, original_price)),
            trip_duration_days,
            duration_change_days: trip_duration_days - self.calendar.original_duration(),
            shift_days,
            same_airline: outbound.same_airline(return_flight),
            is_user_airline: self.is_traveler_airline(&outbound.airline_code)
                && self.is_traveler_airline(&return_flight.airline_code),
            layer,
            category: if layer == 2 {
                ProposalCategory::TripWindow
            } else {
                ProposalCategory::DifferentMonth
            },
            source_pass: pass,
            lodging_impact: Some(impact),
            net_savings: Some(net),
            reason: None,
        })
    }

    fn is_traveler_airline(&self, code: &str) -> bool {
        self.traveler_airlines.contains(&code.to_ascii_uppercase())
    }
}

fn cheapest_by_date<'a>(
    options: impl Iterator<Item = &'a PricedOption>,
) -> BTreeMap<NaiveDate, &'a PricedOption> {
    let mut best: BTreeMap<NaiveDate, &PricedOption> = BTreeMap::new();
    for option in options {
        let entry = best.entry(option.date()).or_insert(option);
        if option.price < entry.price {
            *entry = option;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::sample::{option, sample_round_trip};
    use crate::lodging::NetBasis;

    fn all_proposals(trip: &TripContext) -> Vec<TripWindowProposal> {
        let (near, far) = generate_trip_window_proposals(trip, &EngineConfig::default());
        near.into_iter().chain(far).collect()
    }

    #[test]
    fn proposals_respect_calendar_and_savings_floor() {
        let trip = sample_round_trip();
        let config = EngineConfig::default();
        let proposals = all_proposals(&trip);
        assert!(!proposals.is_empty());
        for p in &proposals {
            assert!(p.savings_amount >= config.trip_window.min_savings);
            assert_eq!(p.savings_amount, 1_260.0 - p.combined_price);
            assert!((p.duration_change_days).abs() <= 2);
            assert!(p.trip_duration_days > 0);
        }
    }

    #[test]
    fn keys_are_unique_after_merge() {
        let trip = sample_round_trip();
        let proposals = all_proposals(&trip);
        let keys: BTreeSet<ProposalKey> = proposals.iter().map(|p| p.key()).collect();
        assert_eq!(keys.len(), proposals.len());
    }

    #[test]
    fn traveler_airline_pass_surfaces_same_airline_pair() {
        let trip = sample_round_trip();
        let proposals = all_proposals(&trip);
        let united = proposals
            .iter()
            .find(|p| p.is_user_airline && p.outbound.date.to_string() == "2026-03-09")
            .expect("UA week-later pair");
        assert!(united.same_airline);
        assert_eq!(united.combined_price, 810.0);
    }

    #[test]
    fn single_carrier_pass_finds_non_traveler_airline() {
        let trip = sample_round_trip();
        let proposals = all_proposals(&trip);
        assert!(proposals
            .iter()
            .any(|p| p.same_airline && p.outbound.airline_code == "B6"));
    }

    #[test]
    fn far_shifts_land_in_different_month() {
        let trip = sample_round_trip();
        let (near, far) = generate_trip_window_proposals(&trip, &EngineConfig::default());
        assert!(near.iter().all(|p| p.shift_days <= 21 && p.layer == 2));
        assert!(far.iter().all(|p| p.layer == 3));
        let april = far.first().expect("april proposal");
        assert_eq!(april.outbound.date.to_string(), "2026-04-06");
        assert_eq!(april.category, ProposalCategory::DifferentMonth);
    }

    #[test]
    fn unchanged_trip_length_has_no_lodging_delta() {
        let trip = sample_round_trip();
        let proposals = all_proposals(&trip);
        let week_later = proposals
            .iter()
            .find(|p| p.trip_duration_days == 4 && p.outbound.date.to_string() == "2026-03-09")
            .expect("week later pair");
        let impact = week_later.lodging_impact.as_ref().expect("impact");
        assert_eq!(impact.nights_added, 0);
        let net = week_later.net_savings.as_ref().expect("net");
        assert_eq!(net.basis, NetBasis::LodgingAdjusted);
        assert_eq!(net.amount, week_later.savings_amount);
    }

    #[test]
    fn window_shift_prices_each_end_at_its_own_stay() {
        let mut trip = sample_round_trip();
        let mut middle = trip.legs[0].clone();
        middle.leg_id = "leg-mid".to_string();
        middle.destination = "BOS".to_string();
        middle.selected = None;
        middle.options.clear();
        middle.lodging.nightly_rate = Some(90.0);
        trip.legs.insert(1, middle);

        let proposals = all_proposals(&trip);
        let week_later = proposals
            .iter()
            .find(|p| {
                p.same_airline
                    && p.outbound.airline_code == "UA"
                    && p.outbound.date.to_string() == "2026-03-09"
                    && p.return_flight.date.to_string() == "2026-03-13"
            })
            .expect("UA week-later pair");
        let impact = week_later.lodging_impact.as_ref().expect("impact");
        // Seven fewer nights at the first stay, seven more at the last.
        assert_eq!(impact.nights_added, 0);
        assert_eq!(impact.cost_delta, Some(-7.0 * 250.0 + 7.0 * 90.0));
        let net = week_later.net_savings.as_ref().expect("net");
        assert_eq!(net.amount, week_later.savings_amount + 7.0 * 160.0);
    }

    #[test]
    fn one_sided_week_shift_is_excluded_by_duration() {
        let mut trip = sample_round_trip();
        // Identical fares a week later on the return only would make an 11-night trip.
        trip.legs[1]
            .options
            .push(option("RET-UA-0313-X", "UA", "2026-03-13T18:00", 100.0));
        let proposals = all_proposals(&trip);
        assert!(proposals.iter().all(|p| !(p.outbound.date.to_string() == "2026-03-02"
            && p.return_flight.date.to_string() == "2026-03-13")));
    }

    #[test]
    fn reserved_slots_keep_traveler_airline_proposals() {
        let trip = sample_round_trip();
        let proposals = all_proposals(&trip);
        let reserved = rank_with_reserved_slots(proposals.clone(), 4, 5);
        assert_eq!(reserved.len(), 5);
        let own = proposals.iter().filter(|p| p.is_user_airline).count().min(4);
        assert!(reserved.iter().filter(|p| p.is_user_airline).count() >= own);
    }

    #[test]
    fn merge_keeps_higher_savings() {
        let trip = sample_round_trip();
        let proposals = all_proposals(&trip);
        let mut low = proposals[0].clone();
        low.savings_amount -= 10.0;
        let high = proposals[0].clone();
        let mut merged = BTreeMap::new();
        merge_proposal(&mut merged, low);
        merge_proposal(&mut merged, high.clone());
        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged.values().next().map(|p| p.savings_amount),
            Some(high.savings_amount)
        );
    }

    #[test]
    fn empty_bucket_falls_back_to_distance_split() {
        let trip = sample_round_trip();
        let near_only: Vec<TripWindowProposal> = all_proposals(&trip)
            .into_iter()
            .filter(|p| p.category == ProposalCategory::TripWindow)
            .collect();
        let count = near_only.len();
        assert!(count >= 2);
        let (near, far) = split_by_category(near_only);
        assert_eq!(near.len() + far.len(), count);
        assert!(!near.is_empty() && !far.is_empty());
        let max_near = near.iter().map(|p| p.shift_days).max().unwrap_or_default();
        assert!(far.iter().all(|p| p.shift_days >= max_near));
    }

    #[test]
    fn one_way_trip_has_no_proposals() {
        let mut trip = sample_round_trip();
        trip.trip_duration_days = None;
        let (near, far) = generate_trip_window_proposals(&trip, &EngineConfig::default());
        assert!(near.is_empty() && far.is_empty());
    }
}
