//! Diversity-preserving top-k selection.
//!
//! Slots are claimed in priority order: the best candidate overall, the best
//! of each alternative type, the traveler's own airline, one alliance
//! partner, one per not-yet-seen airline, and finally the remaining best
//! scores. The kept set is then re-sorted by score with lower price winning
//! ties, and ranked from 1.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::alternatives::{Alternative, AlternativeType, TripWindowProposal};
use crate::resolver::{AirlineAffinity, ResolvedCandidate};

pub trait Curatable {
    /// Identity within one curated list.
    fn dedup_key(&self) -> String;
    /// Type bucket for coverage; `None` when the candidate has no sub-types.
    fn diversity_type(&self) -> Option<AlternativeType>;
    fn airline_label(&self) -> String;
    fn price(&self) -> f64;
}

impl Curatable for Alternative {
    fn dedup_key(&self) -> String {
        self.option.id.clone()
    }

    fn diversity_type(&self) -> Option<AlternativeType> {
        Some(self.alternative_type())
    }

    fn airline_label(&self) -> String {
        self.option.airline_code.to_ascii_uppercase()
    }

    fn price(&self) -> f64 {
        self.option.price
    }
}

impl Curatable for TripWindowProposal {
    fn dedup_key(&self) -> String {
        let key = self.key();
        format!(
            "{}|{}|{}|{}",
            key.outbound_date, key.return_date, key.outbound_airline, key.return_airline
        )
    }

    fn diversity_type(&self) -> Option<AlternativeType> {
        None
    }

    fn airline_label(&self) -> String {
        TripWindowProposal::airline_label(self).to_ascii_uppercase()
    }

    fn price(&self) -> f64 {
        self.combined_price
    }
}

pub fn curate<T: Curatable>(
    candidates: Vec<ResolvedCandidate<T>>,
    cap: usize,
) -> Vec<ResolvedCandidate<T>> {
    if cap == 0 || candidates.is_empty() {
        return Vec::new();
    }

    let mut pool = dedup(candidates);
    pool.sort_by(ranking_order);

    let mut chosen: Vec<usize> = Vec::with_capacity(cap.min(pool.len()));
    let pick = |chosen: &mut Vec<usize>, index: Option<usize>| {
        if let Some(index) = index {
            if chosen.len() < cap && !chosen.contains(&index) {
                chosen.push(index);
            }
        }
    };

    pick(&mut chosen, Some(0));

    let mut covered: BTreeSet<AlternativeType> = BTreeSet::new();
    for (index, item) in pool.iter().enumerate() {
        if let Some(kind) = item.candidate.diversity_type() {
            if covered.insert(kind) {
                pick(&mut chosen, Some(index));
            }
        }
    }

    for affinity in [AirlineAffinity::Own, AirlineAffinity::AlliancePartner] {
        if !chosen.iter().any(|&i| pool[i].affinity == affinity) {
            pick(&mut chosen, pool.iter().position(|c| c.affinity == affinity));
        }
    }

    let mut airlines: BTreeSet<String> = chosen
        .iter()
        .map(|&i| pool[i].candidate.airline_label())
        .collect();
    for (index, item) in pool.iter().enumerate() {
        if airlines.insert(item.candidate.airline_label()) {
            pick(&mut chosen, Some(index));
        }
    }

    for index in 0..pool.len() {
        pick(&mut chosen, Some(index));
    }

    let chosen: BTreeSet<usize> = chosen.into_iter().collect();
    let mut kept: Vec<ResolvedCandidate<T>> = pool
        .into_iter()
        .enumerate()
        .filter(|(index, _)| chosen.contains(index))
        .map(|(_, item)| item)
        .collect();
    kept.sort_by(ranking_order);
    for (index, item) in kept.iter_mut().enumerate() {
        item.rank = index + 1;
    }
    kept
}

/// Higher composite first, then lower price, then key for a stable order.
pub fn ranking_order<T: Curatable>(
    a: &ResolvedCandidate<T>,
    b: &ResolvedCandidate<T>,
) -> Ordering {
    b.score
        .composite
        .total_cmp(&a.score.composite)
        .then_with(|| a.candidate.price().total_cmp(&b.candidate.price()))
        .then_with(|| a.candidate.dedup_key().cmp(&b.candidate.dedup_key()))
}

fn dedup<T: Curatable>(candidates: Vec<ResolvedCandidate<T>>) -> Vec<ResolvedCandidate<T>> {
    let mut best: BTreeMap<String, ResolvedCandidate<T>> = BTreeMap::new();
    for candidate in candidates {
        let key = candidate.candidate.dedup_key();
        match best.get(&key) {
            Some(existing) if ranking_order(existing, &candidate) != Ordering::Greater => {}
            _ => {
                best.insert(key, candidate);
            }
        }
    }
    best.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alternatives::AlternativeType::{CabinDowngrade, SameDateSwap};
    use crate::resolver::AirlineAffinity::{AlliancePartner, Other, Own};
    use crate::resolver::{PolicyFlag, PolicyFlagType, ScoreBreakdown};

    #[derive(Debug, Clone)]
    struct Stub {
        id: &'static str,
        kind: AlternativeType,
        airline: &'static str,
        price: f64,
    }

    impl Curatable for Stub {
        fn dedup_key(&self) -> String {
            self.id.to_string()
        }

        fn diversity_type(&self) -> Option<AlternativeType> {
            Some(self.kind)
        }

        fn airline_label(&self) -> String {
            self.airline.to_string()
        }

        fn price(&self) -> f64 {
            self.price
        }
    }

    fn stub(
        id: &'static str,
        kind: AlternativeType,
        airline: &'static str,
        price: f64,
        composite: f64,
        affinity: AirlineAffinity,
    ) -> ResolvedCandidate<Stub> {
        ResolvedCandidate {
            short_id: String::new(),
            rank: 0,
            candidate: Stub {
                id,
                kind,
                airline,
                price,
            },
            score: ScoreBreakdown {
                savings: 0.5,
                preference: 0.5,
                disruption: 0.5,
                sustainability: 0.5,
                composite,
            },
            affinity,
            policy: PolicyFlag {
                flag_type: PolicyFlagType::Compliant,
                budget_limit: None,
                overage: None,
            },
            reason: None,
        }
    }

    #[test]
    fn ranks_follow_score_with_price_tie_break() {
        let curated = curate(
            vec![
                stub("a", SameDateSwap, "DL", 400.0, 70.0, Other),
                stub("b", SameDateSwap, "B6", 380.0, 70.0, Other),
                stub("c", SameDateSwap, "AA", 450.0, 90.0, Other),
            ],
            5,
        );
        let ids: Vec<&str> = curated.iter().map(|c| c.candidate.id).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        let ranks: Vec<usize> = curated.iter().map(|c| c.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn every_type_gets_a_slot() {
        let curated = curate(
            vec![
                stub("s1", SameDateSwap, "DL", 400.0, 90.0, Other),
                stub("s2", SameDateSwap, "B6", 410.0, 88.0, Other),
                stub("s3", SameDateSwap, "AA", 420.0, 86.0, Other),
                stub("s4", SameDateSwap, "AS", 430.0, 84.0, Other),
                stub("d1", CabinDowngrade, "DL", 300.0, 40.0, Other),
            ],
            3,
        );
        assert_eq!(curated.len(), 3);
        assert!(curated.iter().any(|c| c.candidate.id == "d1"));
        assert_eq!(curated.last().map(|c| c.candidate.id), Some("d1"));
    }

    #[test]
    fn own_airline_and_alliance_partner_are_kept() {
        let curated = curate(
            vec![
                stub("x1", SameDateSwap, "DL", 400.0, 90.0, Other),
                stub("x2", SameDateSwap, "B6", 410.0, 88.0, Other),
                stub("x3", SameDateSwap, "AA", 420.0, 86.0, Other),
                stub("own", SameDateSwap, "UA", 500.0, 50.0, Own),
                stub("ally", SameDateSwap, "AC", 510.0, 45.0, AlliancePartner),
            ],
            3,
        );
        let ids: BTreeSet<&str> = curated.iter().map(|c| c.candidate.id).collect();
        assert_eq!(ids, BTreeSet::from(["x1", "own", "ally"]));
    }

    #[test]
    fn unseen_airlines_beat_repeat_carriers() {
        let curated = curate(
            vec![
                stub("dl1", SameDateSwap, "DL", 400.0, 90.0, Other),
                stub("dl2", SameDateSwap, "DL", 410.0, 85.0, Other),
                stub("dl3", SameDateSwap, "DL", 420.0, 80.0, Other),
                stub("b6", SameDateSwap, "B6", 430.0, 70.0, Other),
            ],
            3,
        );
        let ids: Vec<&str> = curated.iter().map(|c| c.candidate.id).collect();
        assert_eq!(ids, vec!["dl1", "dl2", "b6"]);
    }

    #[test]
    fn duplicate_keys_keep_the_better_score() {
        let curated = curate(
            vec![
                stub("same", SameDateSwap, "DL", 400.0, 60.0, Other),
                stub("same", SameDateSwap, "DL", 400.0, 80.0, Other),
            ],
            5,
        );
        assert_eq!(curated.len(), 1);
        assert_eq!(curated[0].score.composite, 80.0);
    }

    #[test]
    fn zero_cap_yields_nothing() {
        let curated = curate(vec![stub("a", SameDateSwap, "DL", 1.0, 1.0, Other)], 0);
        assert!(curated.is_empty());
    }
}
