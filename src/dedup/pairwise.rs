// Ampere Charging Data Project
// Brute-force all-pairs duplicate scan for sources without spatial prefiltering
//
// The input is split into contiguous row chunks, one per worker. Every worker
// scores its rows against the whole list (only forward, so each unordered
// pair is reported once) and returns its own pair vector. Workers share no
// mutable state; the join happens in the rayon collect. O(n²) overall, fine
// for per-country record counts in the tens of thousands.

use super::similarity::score_weighted;
use super::{DuplicatePair, PairwiseConfig, StationRecord};
use rayon::prelude::*;

pub fn scan_all_pairs(stations: &[StationRecord], config: &PairwiseConfig) -> Vec<DuplicatePair> {
    if stations.len() < 2 {
        return Vec::new();
    }

    let workers = config.workers.max(1);
    let chunk_size = stations.len().div_ceil(workers);

    stations
        .par_chunks(chunk_size)
        .enumerate()
        .flat_map(|(chunk_index, chunk)| {
            let base = chunk_index * chunk_size;
            let mut pairs: Vec<DuplicatePair> = Vec::new();

            for (offset, station) in chunk.iter().enumerate() {
                if !station.has_valid_point() {
                    continue;
                }
                for candidate in &stations[(base + offset + 1)..] {
                    if !candidate.has_valid_point() {
                        continue;
                    }

                    let score =
                        score_weighted(station, candidate, &config.weights, config.distance_policy);

                    let threshold = if station.data_source == candidate.data_source {
                        config.same_source_threshold
                    } else {
                        config.cross_source_threshold
                    };

                    if score.overall >= threshold {
                        pairs.push(DuplicatePair {
                            station: station.clone(),
                            duplicate: candidate.clone(),
                            score: score.overall,
                        });
                    }
                }
            }

            pairs
        })
        .collect()
}
