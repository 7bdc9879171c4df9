// Ampere Charging Data Project
// Per-field threshold classifier with transitive duplicate propagation
//
// A candidate is a duplicate of the pivot when any single field is close
// enough on its own. Newly labeled duplicates then act as pivots against the
// remaining pool, so a record with no usable address (typical of registry
// data) can be linked via distance first and then pull in further records
// through its own address. The traversal is an explicit breadth-first queue
// rather than recursion, so pathological duplicate chains cannot blow the
// stack, and a labeled record never re-enters a candidate pool.

use super::similarity::component_scores;
use super::{SimilarityScore, StationRecord, ThresholdConfig};
use ahash::AHashSet;
use std::collections::VecDeque;

/// Which per-field rule labeled a candidate. Precedence on report is
/// address, then operator, then distance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchRule {
    Address,
    Operator,
    Distance,
}

/// A candidate labeled duplicate, with its scores and the rule that fired.
#[derive(Clone, Debug)]
pub struct DuplicateMatch {
    pub station: StationRecord,
    pub score: SimilarityScore,
    pub rule: MatchRule,
}

/// First satisfied per-field rule, or None when the candidate stays unlabeled.
/// Thresholds are inclusive.
pub fn match_rule(score: &SimilarityScore, config: &ThresholdConfig) -> Option<MatchRule> {
    if score.address_score >= config.address_threshold {
        Some(MatchRule::Address)
    } else if score.operator_score >= config.operator_threshold {
        Some(MatchRule::Operator)
    } else if score.distance_score >= config.distance_threshold {
        Some(MatchRule::Distance)
    } else {
        None
    }
}

/// Label every candidate transitively reachable from the pivot.
///
/// The candidate slice is an immutable snapshot; the returned matches are
/// the delta of newly labeled records for the caller to fold in.
pub fn classify_duplicates(
    pivot: &StationRecord,
    candidates: &[StationRecord],
    config: &ThresholdConfig,
) -> Vec<DuplicateMatch> {
    let mut labeled: AHashSet<String> = AHashSet::new();
    labeled.insert(pivot.identifier.clone());

    let mut pool: Vec<StationRecord> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if labeled.contains(&candidate.identifier) {
            continue;
        }
        if !candidate.has_valid_point() {
            tracing::warn!(
                identifier = %candidate.identifier,
                "skipping candidate with malformed geometry"
            );
            continue;
        }
        pool.push(candidate.clone());
    }

    let mut queue: VecDeque<StationRecord> = VecDeque::new();
    queue.push_back(pivot.clone());

    let mut matches: Vec<DuplicateMatch> = Vec::new();

    while let Some(current) = queue.pop_front() {
        if pool.is_empty() {
            break;
        }

        let mut still_unlabeled: Vec<StationRecord> = Vec::with_capacity(pool.len());

        for candidate in pool {
            let score = component_scores(&current, &candidate, config.max_distance_m);
            match match_rule(&score, config) {
                Some(rule) => {
                    // duplicate identifiers in the input label only once
                    if labeled.insert(candidate.identifier.clone()) {
                        queue.push_back(candidate.clone());
                        matches.push(DuplicateMatch {
                            station: candidate,
                            score,
                            rule,
                        });
                    }
                }
                None => still_unlabeled.push(candidate),
            }
        }

        pool = still_unlabeled;
    }

    matches
}
