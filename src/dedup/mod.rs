// Ampere Charging Data Project
// Deduplication and merge engine for normalized charging-station records
//
// Data flow: candidate records -> similarity scoring -> duplicate labeling
// (threshold classifier or global pairwise scan) -> cluster building ->
// priority-based attribute resolution -> persisted merged station.

use postgis_diesel::types::Point;
use std::hash::{Hash, Hasher};

pub mod classifier;
pub mod cluster;
pub mod coordinator;
pub mod pairwise;
pub mod resolve;
pub mod similarity;
pub mod store;

/// Default search radius for the spatial candidate query, in meters.
pub const DEFAULT_SEARCH_RADIUS_M: f64 = 100.0;

/// Default base of the exponential distance decay, score = decay^meters.
/// Roughly 0.5 at 50m and 0.24 at 100m.
pub const DEFAULT_DISTANCE_DECAY: f64 = 0.986;

/// A normalized charging-station record from one data source.
///
/// Identity is the per-source `identifier` alone: two records from different
/// sources are distinct values even when they describe the same physical
/// station. Linking those is exactly what the engine is for.
#[derive(Clone, Debug)]
pub struct StationRecord {
    pub identifier: String,
    pub data_source: String,
    pub country_code: String,
    /// Normalized lowercase operator name, if the source provided one.
    pub operator: Option<String>,
    /// WGS84 point, x = longitude, y = latitude.
    pub point: Point,
    /// Normalized lowercase "street,town", if the source provided one.
    pub address: Option<String>,
}

impl PartialEq for StationRecord {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for StationRecord {}

impl Hash for StationRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
    }
}

impl StationRecord {
    /// Address usable for similarity scoring, with the upstream
    /// "unknown,unknown" sentinel treated as absent.
    pub fn usable_address(&self) -> Option<&str> {
        match self.address.as_deref() {
            Some(addr) if addr != crate::UNKNOWN_ADDRESS => Some(addr),
            _ => None,
        }
    }

    /// Records with broken geometry are excluded from candidate generation.
    pub fn has_valid_point(&self) -> bool {
        self.point.x.is_finite()
            && self.point.y.is_finite()
            && (-180.0..=180.0).contains(&self.point.x)
            && (-90.0..=90.0).contains(&self.point.y)
    }
}

/// Bounded similarity between an ordered (pivot, candidate) pair,
/// with the three component scores it was blended from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimilarityScore {
    pub overall: f64,
    pub operator_score: f64,
    pub address_score: f64,
    pub distance_score: f64,
}

/// Judgment that two records denote the same physical station.
#[derive(Clone, Debug)]
pub struct DuplicatePair {
    pub station: StationRecord,
    pub duplicate: StationRecord,
    pub score: f64,
}

/// Records believed to be one real-world station. A record belongs to at
/// most one cluster per merge pass.
#[derive(Clone, Debug)]
pub struct Cluster {
    pub members: Vec<StationRecord>,
}

/// The canonical record synthesized from a cluster, with full provenance.
#[derive(Clone, Debug)]
pub struct MergedStation {
    pub operator: Option<String>,
    pub point: Point,
    /// Sorted, comma-joined set of every source that contributed a member.
    pub data_sources: String,
    pub country_code: String,
    /// Identifiers of every absorbed member, highest-priority source first.
    pub provenance: Vec<String>,
}

/// How raw geodesic distance turns into a [0,1] score.
#[derive(Clone, Copy, Debug)]
pub enum DistancePolicy {
    /// `1 - d/max`, clamped. For candidate sets already prefiltered to
    /// within `max_distance_m` by the spatial store.
    Linear { max_distance_m: f64 },
    /// `decay^d`. For unfiltered comparisons where far-apart pairs must
    /// decay sharply rather than hit a hard cutoff.
    Exponential { decay: f64 },
}

/// Weights for the blended overall score. Default is equal thirds.
#[derive(Clone, Copy, Debug)]
pub struct ScoreWeights {
    pub operator: f64,
    pub address: f64,
    pub distance: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            operator: 1.0 / 3.0,
            address: 1.0 / 3.0,
            distance: 1.0 / 3.0,
        }
    }
}

/// Per-field duplicate thresholds for the classifier.
#[derive(Clone, Copy, Debug)]
pub struct ThresholdConfig {
    pub address_threshold: f64,
    pub operator_threshold: f64,
    pub distance_threshold: f64,
    /// Distance at which the linear distance score reaches zero. Must match
    /// the radius the candidate query was prefiltered with.
    pub max_distance_m: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        ThresholdConfig {
            address_threshold: 0.7,
            operator_threshold: 0.7,
            distance_threshold: 0.3,
            max_distance_m: DEFAULT_SEARCH_RADIUS_M,
        }
    }
}

/// Settings for the global all-pairs scan.
#[derive(Clone, Copy, Debug)]
pub struct PairwiseConfig {
    /// Number of contiguous row chunks scored in parallel.
    pub workers: usize,
    /// Same-source duplicates are rare and usually true dupes, so they must
    /// be a near-exact match.
    pub same_source_threshold: f64,
    pub cross_source_threshold: f64,
    pub weights: ScoreWeights,
    pub distance_policy: DistancePolicy,
}

impl Default for PairwiseConfig {
    fn default() -> Self {
        PairwiseConfig {
            workers: 10,
            same_source_threshold: 0.999,
            cross_source_threshold: 0.95,
            weights: ScoreWeights::default(),
            distance_policy: DistancePolicy::Exponential {
                decay: DEFAULT_DISTANCE_DECAY,
            },
        }
    }
}

/// Top-level engine configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct DedupConfig {
    pub thresholds: ThresholdConfig,
    pub pairwise: PairwiseConfig,
}

impl DedupConfig {
    pub fn search_radius_m(&self) -> f64 {
        self.thresholds.max_distance_m
    }
}
