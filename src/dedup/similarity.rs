// Ampere Charging Data Project
// Similarity scoring between two station records

use super::{DistancePolicy, ScoreWeights, SimilarityScore, StationRecord};
use strsim::jaro_winkler;

/// Below this, neither the operator nor the address is considered close
/// enough for the blended score to ever clear a pairwise gate, so the
/// geodesic distance is not worth computing.
pub const CHEAP_REJECTION_FLOOR: f64 = 0.6;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two WGS84 points in meters.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

pub fn distance_between(a: &StationRecord, b: &StationRecord) -> f64 {
    haversine_distance(a.point.y, a.point.x, b.point.y, b.point.x)
}

/// Jaro-Winkler ratio of the normalized operator names, 0 if either is absent.
pub fn operator_score(a: &StationRecord, b: &StationRecord) -> f64 {
    match (a.operator.as_deref(), b.operator.as_deref()) {
        (Some(op_a), Some(op_b)) => jaro_winkler(op_a, op_b),
        _ => 0.0,
    }
}

/// Jaro-Winkler ratio of the normalized "street,town" strings, 0 if either
/// is absent or carries the unknown sentinel.
pub fn address_score(a: &StationRecord, b: &StationRecord) -> f64 {
    match (a.usable_address(), b.usable_address()) {
        (Some(addr_a), Some(addr_b)) => jaro_winkler(addr_a, addr_b),
        _ => 0.0,
    }
}

/// Turn a geodesic distance in meters into a [0,1] score.
pub fn distance_score(distance_m: f64, policy: DistancePolicy) -> f64 {
    match policy {
        DistancePolicy::Linear { max_distance_m } => {
            (1.0 - (distance_m / max_distance_m)).clamp(0.0, 1.0)
        }
        DistancePolicy::Exponential { decay } => decay.powf(distance_m).clamp(0.0, 1.0),
    }
}

/// Component scores for the threshold classifier: linear distance decay,
/// since candidates are already prefiltered to within `max_distance_m`.
pub fn component_scores(
    pivot: &StationRecord,
    candidate: &StationRecord,
    max_distance_m: f64,
) -> SimilarityScore {
    let operator = operator_score(pivot, candidate);
    let address = address_score(pivot, candidate);
    let distance = distance_score(
        distance_between(pivot, candidate),
        DistancePolicy::Linear { max_distance_m },
    );

    SimilarityScore {
        overall: (operator + address + distance) / 3.0,
        operator_score: operator,
        address_score: address,
        distance_score: distance,
    }
}

/// Blended weighted-mean score used by the global pairwise scan.
///
/// May short-circuit to 0 without computing the geodesic distance when both
/// string components fall below [`CHEAP_REJECTION_FLOOR`].
pub fn score_weighted(
    a: &StationRecord,
    b: &StationRecord,
    weights: &ScoreWeights,
    policy: DistancePolicy,
) -> SimilarityScore {
    let operator = operator_score(a, b);
    let address = address_score(a, b);

    if operator < CHEAP_REJECTION_FLOOR && address < CHEAP_REJECTION_FLOOR {
        return SimilarityScore {
            overall: 0.0,
            operator_score: operator,
            address_score: address,
            distance_score: 0.0,
        };
    }

    let distance = distance_score(distance_between(a, b), policy);

    let weight_sum = weights.operator + weights.address + weights.distance;
    let overall = (operator * weights.operator
        + address * weights.address
        + distance * weights.distance)
        / weight_sum;

    SimilarityScore {
        overall: overall.clamp(0.0, 1.0),
        operator_score: operator,
        address_score: address,
        distance_score: distance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::DEFAULT_DISTANCE_DECAY;
    use postgis_diesel::types::Point;

    fn station(id: &str, lat: f64, lon: f64, operator: Option<&str>, address: Option<&str>) -> StationRecord {
        StationRecord {
            identifier: id.to_string(),
            data_source: "OCM".to_string(),
            country_code: "DE".to_string(),
            operator: operator.map(|s| s.to_string()),
            point: Point {
                x: lon,
                y: lat,
                srid: Some(crate::WGS_84_SRID),
            },
            address: address.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        // Munich Marienplatz to Odeonsplatz, roughly 750m
        let d = haversine_distance(48.1374, 11.5755, 48.1428, 11.5777);
        assert!(d > 550.0 && d < 800.0, "unexpected distance {}", d);
    }

    #[test]
    fn test_missing_operator_scores_zero() {
        let a = station("a", 48.0, 11.0, None, None);
        let b = station("b", 48.0, 11.0, Some("enbw"), None);
        assert_eq!(operator_score(&a, &b), 0.0);
    }

    #[test]
    fn test_unknown_address_sentinel_scores_zero() {
        let a = station("a", 48.0, 11.0, None, Some("unknown,unknown"));
        let b = station("b", 48.0, 11.0, None, Some("unknown,unknown"));
        assert_eq!(address_score(&a, &b), 0.0);
    }

    #[test]
    fn test_identical_address_scores_one() {
        let a = station("a", 48.0, 11.0, None, Some("flurstück 313,langenau"));
        let b = station("b", 48.0, 11.0, None, Some("flurstück 313,langenau"));
        assert_eq!(address_score(&a, &b), 1.0);
    }

    #[test]
    fn test_linear_decay_monotonic_and_clamped() {
        let policy = DistancePolicy::Linear { max_distance_m: 100.0 };
        let mut previous = f64::INFINITY;
        for meters in [0.0, 10.0, 50.0, 99.0] {
            let score = distance_score(meters, policy);
            assert!(score < previous, "linear decay must strictly decrease");
            previous = score;
        }
        assert_eq!(distance_score(100.0, policy), 0.0);
        assert_eq!(distance_score(250.0, policy), 0.0);
    }

    #[test]
    fn test_exponential_decay_monotonic() {
        let policy = DistancePolicy::Exponential {
            decay: DEFAULT_DISTANCE_DECAY,
        };
        let mut previous = f64::INFINITY;
        for meters in [0.0, 10.0, 50.0, 100.0, 1000.0] {
            let score = distance_score(meters, policy);
            assert!(score < previous, "exponential decay must strictly decrease");
            previous = score;
        }
        // decays sharply past ~50m but never reaches a hard cutoff
        assert!(distance_score(50.0, policy) < 0.6);
        assert!(distance_score(1000.0, policy) > 0.0);
    }

    #[test]
    fn test_cheap_rejection_skips_distance() {
        let a = station("a", 48.0, 11.0, Some("enbw"), Some("hauptstr. 1,ulm"));
        let b = station("b", 48.0, 11.0, Some("ionity"), Some("bahnhofplatz 9,kiel"));
        let score = score_weighted(
            &a,
            &b,
            &ScoreWeights::default(),
            DistancePolicy::Exponential {
                decay: DEFAULT_DISTANCE_DECAY,
            },
        );
        // same coordinates would give distance_score 1.0, but both string
        // components are below the floor so the pair is rejected outright
        assert_eq!(score.overall, 0.0);
        assert_eq!(score.distance_score, 0.0);
    }

    #[test]
    fn test_weighted_mean_of_components() {
        let a = station("a", 48.0, 11.0, Some("enbw"), Some("hauptstr. 1,ulm"));
        let b = station("b", 48.0, 11.0, Some("enbw"), Some("hauptstr. 1,ulm"));
        let score = score_weighted(
            &a,
            &b,
            &ScoreWeights::default(),
            DistancePolicy::Exponential {
                decay: DEFAULT_DISTANCE_DECAY,
            },
        );
        assert!((score.overall - 1.0).abs() < 1e-9);
    }
}
