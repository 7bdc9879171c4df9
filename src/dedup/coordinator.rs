// Ampere Charging Data Project
// Drives full merge passes over a country's unresolved stations
//
// The spatial pass is strictly sequential: every pivot must observe the
// resolution effects of all pivots before it, so candidate pools never
// resurrect already-merged stations and the pass makes monotonic progress.
// The pairwise pass parallelizes only the pure scoring scan; clustering and
// persistence stay sequential on the calling task.

use super::classifier::classify_duplicates;
use super::cluster::build_clusters;
use super::pairwise::scan_all_pairs;
use super::resolve::{priority_for_country, resolve_cluster};
use super::store::{REASON_DUPLICATE, REASON_SINGLETON, StationStore};
use super::{Cluster, DedupConfig, DuplicatePair, StationRecord};
use ahash::AHashSet;
use anyhow::{Context, Result};

#[derive(Clone, Copy, Debug, Default)]
pub struct MergeSummary {
    pub pivots_processed: usize,
    pub clusters_merged: usize,
    /// Source records consumed into merged records, pivots included.
    pub stations_absorbed: usize,
    /// Merged clusters that had exactly one member.
    pub singletons: usize,
    pub failed_clusters: usize,
    pub skipped_invalid: usize,
}

/// Per-pivot merge pass backed by the spatial candidate query.
///
/// Every unresolved record ends up in exactly one merged record, duplicates
/// and singletons alike, so a re-run over the same data finds nothing left
/// to do. A cluster whose persistence fails is skipped, its members stay
/// unresolved, and the pass continues; those records surface again as
/// pivots or candidates on the next run.
pub async fn run_spatial_pass<S: StationStore>(
    store: &S,
    country_code: &str,
    config: &DedupConfig,
) -> Result<MergeSummary> {
    let priority = priority_for_country(country_code)?;

    let pivots = store
        .unresolved_stations(country_code)
        .await
        .context("loading unresolved pivot stations")?;

    tracing::info!(
        country = country_code,
        pivots = pivots.len(),
        "starting spatial merge pass"
    );

    let mut resolved_this_pass: AHashSet<String> = AHashSet::new();
    let mut summary = MergeSummary::default();

    for pivot in pivots {
        if resolved_this_pass.contains(&pivot.identifier) {
            continue;
        }
        summary.pivots_processed += 1;

        if !pivot.has_valid_point() {
            tracing::warn!(
                identifier = %pivot.identifier,
                "pivot has malformed geometry, skipping"
            );
            summary.skipped_invalid += 1;
            continue;
        }

        let candidates: Vec<StationRecord> = store
            .find_within(&pivot.point, config.search_radius_m(), country_code)
            .await
            .with_context(|| format!("candidate query for pivot {}", pivot.identifier))?
            .into_iter()
            .filter(|candidate| !resolved_this_pass.contains(&candidate.identifier))
            .collect();

        let duplicates = classify_duplicates(&pivot, &candidates, &config.thresholds);

        let cluster = if duplicates.is_empty() {
            Cluster {
                members: vec![pivot.clone()],
            }
        } else {
            let pairs: Vec<DuplicatePair> = duplicates
                .iter()
                .map(|found| DuplicatePair {
                    station: pivot.clone(),
                    duplicate: found.station.clone(),
                    score: found.score.overall,
                })
                .collect();
            let mut clusters = build_clusters(&pairs);
            debug_assert_eq!(clusters.len(), 1, "pivot pairs always share the pivot");
            clusters.remove(0)
        };

        let is_singleton = cluster.members.len() == 1;
        let reason = if is_singleton {
            REASON_SINGLETON
        } else {
            REASON_DUPLICATE
        };

        let merged = resolve_cluster(&cluster, priority);

        match store.persist_merge(&merged, &merged.provenance, reason).await {
            Ok(merged_id) => {
                summary.clusters_merged += 1;
                summary.stations_absorbed += merged.provenance.len();
                if is_singleton {
                    summary.singletons += 1;
                }
                for identifier in &merged.provenance {
                    resolved_this_pass.insert(identifier.clone());
                }
                tracing::debug!(
                    merged_id = %merged_id,
                    members = merged.provenance.len(),
                    "cluster merged"
                );
            }
            Err(error) => {
                // transaction rolled back, members stay unresolved
                tracing::warn!(
                    pivot = %pivot.identifier,
                    error = ?error,
                    "failed to persist cluster, continuing with next pivot"
                );
                summary.failed_clusters += 1;
            }
        }
    }

    tracing::info!(
        country = country_code,
        merged = summary.clusters_merged,
        absorbed = summary.stations_absorbed,
        failed = summary.failed_clusters,
        "spatial merge pass finished"
    );

    Ok(summary)
}

/// Global batch dedup without a spatial index: scan all pairs in parallel,
/// then cluster and persist sequentially. Records untouched by any pair are
/// left unresolved. The discovered pairs are returned for reporting.
pub async fn run_pairwise_pass<S: StationStore>(
    store: &S,
    country_code: &str,
    config: &DedupConfig,
) -> Result<(MergeSummary, Vec<DuplicatePair>)> {
    let priority = priority_for_country(country_code)?;

    let stations = store
        .unresolved_stations(country_code)
        .await
        .context("loading unresolved stations for pairwise scan")?;

    tracing::info!(
        country = country_code,
        stations = stations.len(),
        workers = config.pairwise.workers,
        "starting pairwise scan"
    );

    let pairs = scan_all_pairs(&stations, &config.pairwise);
    let clusters = build_clusters(&pairs);

    let mut summary = MergeSummary {
        pivots_processed: stations.len(),
        ..MergeSummary::default()
    };

    for cluster in &clusters {
        let merged = resolve_cluster(cluster, priority);
        match store
            .persist_merge(&merged, &merged.provenance, REASON_DUPLICATE)
            .await
        {
            Ok(_) => {
                summary.clusters_merged += 1;
                summary.stations_absorbed += merged.provenance.len();
            }
            Err(error) => {
                tracing::warn!(error = ?error, "failed to persist cluster, continuing");
                summary.failed_clusters += 1;
            }
        }
    }

    Ok((summary, pairs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::MergedStation;
    use postgis_diesel::types::Point;
    use std::sync::Mutex;

    struct MemState {
        stations: Vec<(StationRecord, bool)>,
        merged: Vec<(MergedStation, String)>,
        fail_identifier: Option<String>,
    }

    /// In-memory stand-in for the Postgres store.
    struct MemStationStore {
        state: Mutex<MemState>,
    }

    impl MemStationStore {
        fn new(stations: Vec<StationRecord>) -> Self {
            MemStationStore {
                state: Mutex::new(MemState {
                    stations: stations.into_iter().map(|s| (s, false)).collect(),
                    merged: Vec::new(),
                    fail_identifier: None,
                }),
            }
        }

        fn failing_on(stations: Vec<StationRecord>, identifier: &str) -> Self {
            let store = Self::new(stations);
            store.state.lock().unwrap().fail_identifier = Some(identifier.to_string());
            store
        }

        fn merged_count(&self) -> usize {
            self.state.lock().unwrap().merged.len()
        }

        fn unresolved_count(&self) -> usize {
            self.state
                .lock()
                .unwrap()
                .stations
                .iter()
                .filter(|(_, resolved)| !resolved)
                .count()
        }
    }

    impl StationStore for MemStationStore {
        async fn unresolved_stations(&self, country_code: &str) -> Result<Vec<StationRecord>> {
            let state = self.state.lock().unwrap();
            let mut stations: Vec<StationRecord> = state
                .stations
                .iter()
                .filter(|(station, resolved)| {
                    !resolved && station.country_code == country_code
                })
                .map(|(station, _)| station.clone())
                .collect();
            stations.sort_by(|a, b| a.identifier.cmp(&b.identifier));
            Ok(stations)
        }

        async fn find_within(
            &self,
            point: &Point,
            radius_m: f64,
            country_code: &str,
        ) -> Result<Vec<StationRecord>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .stations
                .iter()
                .filter(|(station, resolved)| {
                    !resolved
                        && station.country_code == country_code
                        && station.has_valid_point()
                        && crate::dedup::similarity::haversine_distance(
                            point.y,
                            point.x,
                            station.point.y,
                            station.point.x,
                        ) <= radius_m
                })
                .map(|(station, _)| station.clone())
                .collect())
        }

        async fn persist_merge(
            &self,
            merged: &MergedStation,
            absorbed: &[String],
            reason: &str,
        ) -> Result<String> {
            let mut state = self.state.lock().unwrap();
            if let Some(poison) = &state.fail_identifier {
                if absorbed.contains(poison) {
                    anyhow::bail!("duplicate key value violates unique constraint");
                }
            }
            for (station, resolved) in state.stations.iter_mut() {
                if absorbed.contains(&station.identifier) {
                    *resolved = true;
                }
            }
            state.merged.push((merged.clone(), reason.to_string()));
            Ok(format!("merged-{}", state.merged.len()))
        }
    }

    fn station(id: &str, source: &str, lat: f64, lon: f64, address: Option<&str>) -> StationRecord {
        StationRecord {
            identifier: id.to_string(),
            data_source: source.to_string(),
            country_code: "DE".to_string(),
            operator: Some("enbw".to_string()),
            point: Point {
                x: lon,
                y: lat,
                srid: Some(crate::WGS_84_SRID),
            },
            address: address.map(|s| s.to_string()),
        }
    }

    /// Two records ~10m apart plus one far-away singleton.
    fn seed() -> Vec<StationRecord> {
        vec![
            station("bna-1", "BNA", 48.1000, 11.5000, Some("hauptstr. 1,ulm")),
            station("ocm-1", "OCM", 48.10009, 11.5000, Some("hauptstr. 1,ulm")),
            station("osm-9", "OSM", 49.5000, 8.5000, None),
        ]
    }

    #[tokio::test]
    async fn test_spatial_pass_merges_and_is_idempotent() {
        let store = MemStationStore::new(seed());
        let config = DedupConfig::default();

        let first = run_spatial_pass(&store, "DE", &config).await.unwrap();
        assert_eq!(first.clusters_merged, 2);
        assert_eq!(first.stations_absorbed, 3);
        assert_eq!(first.singletons, 1);
        assert_eq!(store.unresolved_count(), 0);
        assert_eq!(store.merged_count(), 2);

        // round two: everything already resolved, nothing happens
        let second = run_spatial_pass(&store, "DE", &config).await.unwrap();
        assert_eq!(second.pivots_processed, 0);
        assert_eq!(second.clusters_merged, 0);
        assert_eq!(store.merged_count(), 2);
    }

    #[tokio::test]
    async fn test_absorbed_station_is_never_its_own_pivot() {
        let store = MemStationStore::new(seed());
        let summary = run_spatial_pass(&store, "DE", &DedupConfig::default())
            .await
            .unwrap();
        // ocm-1 was absorbed by bna-1's cluster, so only two pivots ran
        assert_eq!(summary.pivots_processed, 2);
    }

    #[tokio::test]
    async fn test_failed_cluster_does_not_abort_pass() {
        let store = MemStationStore::failing_on(seed(), "ocm-1");
        let summary = run_spatial_pass(&store, "DE", &DedupConfig::default())
            .await
            .unwrap();
        // both members of the failed cluster come up as pivots and fail again
        assert_eq!(summary.failed_clusters, 2);
        // the singleton still merged
        assert_eq!(summary.clusters_merged, 1);
        // failed cluster members stay unresolved for a later retry
        assert_eq!(store.unresolved_count(), 2);
    }

    #[tokio::test]
    async fn test_malformed_pivot_skipped() {
        let mut stations = seed();
        stations.push(station("bad-1", "OSM", f64::NAN, 11.0, None));
        let store = MemStationStore::new(stations);
        let summary = run_spatial_pass(&store, "DE", &DedupConfig::default())
            .await
            .unwrap();
        assert_eq!(summary.skipped_invalid, 1);
        assert_eq!(summary.clusters_merged, 2);
    }

    #[tokio::test]
    async fn test_unknown_country_fails_before_any_work() {
        let store = MemStationStore::new(seed());
        assert!(
            run_spatial_pass(&store, "XX", &DedupConfig::default())
                .await
                .is_err()
        );
        assert_eq!(store.merged_count(), 0);
    }

    #[tokio::test]
    async fn test_pairwise_pass_merges_clusters_only() {
        let store = MemStationStore::new(seed());
        let config = DedupConfig::default();

        let (summary, pairs) = run_pairwise_pass(&store, "DE", &config).await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(summary.clusters_merged, 1);
        assert_eq!(summary.stations_absorbed, 2);
        // the far-away singleton is untouched in pairwise mode
        assert_eq!(store.unresolved_count(), 1);
    }
}
