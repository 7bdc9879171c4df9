// Ampere Charging Data Project
// Canonical attribute resolution for a cluster via per-country source priority

use super::{Cluster, MergedStation, StationRecord};
use anyhow::{Result, bail};
use itertools::Itertools;
use lazy_static::lazy_static;
use std::collections::HashMap;

pub const SOURCE_BNA: &str = "BNA";
pub const SOURCE_FR_GOV: &str = "FR_GOV";
pub const SOURCE_GB_GOV: &str = "GB_GOV";
pub const SOURCE_OCM: &str = "OCM";
pub const SOURCE_OSM: &str = "OSM";

lazy_static! {
    /// Per-country attribute priority: the government register first where
    /// one is ingested, then the commercial aggregator, then OSM.
    static ref SOURCE_PRIORITY_BY_COUNTRY: HashMap<&'static str, Vec<&'static str>> =
        HashMap::from([
            ("DE", vec![SOURCE_BNA, SOURCE_OCM, SOURCE_OSM]),
            ("FR", vec![SOURCE_FR_GOV, SOURCE_OCM, SOURCE_OSM]),
            ("GB", vec![SOURCE_GB_GOV, SOURCE_OCM, SOURCE_OSM]),
            // no government register wired up for these yet
            ("AT", vec![SOURCE_OCM, SOURCE_OSM]),
            ("CH", vec![SOURCE_OCM, SOURCE_OSM]),
            ("IT", vec![SOURCE_OCM, SOURCE_OSM]),
            ("NL", vec![SOURCE_OCM, SOURCE_OSM]),
        ]);
}

/// Source priority list for a country. A merge pass cannot run without one,
/// so callers treat an error here as fatal at startup.
pub fn priority_for_country(country_code: &str) -> Result<&'static [&'static str]> {
    match SOURCE_PRIORITY_BY_COUNTRY.get(country_code) {
        Some(priority) => Ok(priority.as_slice()),
        None => bail!(
            "no source priority list configured for country {}",
            country_code
        ),
    }
}

fn priority_rank(record: &StationRecord, priority: &[&str]) -> usize {
    priority
        .iter()
        .position(|source| *source == record.data_source)
        .unwrap_or(priority.len())
}

/// Synthesize the canonical record for a cluster.
///
/// Attributes are taken from the highest-priority member that has them,
/// falling back to any member in deterministic order; a single-member
/// cluster resolves to itself. Every member lands in the provenance list
/// whether or not any of its attributes were used.
pub fn resolve_cluster(cluster: &Cluster, priority: &[&str]) -> MergedStation {
    // highest priority first, identifier as tie-breaker for determinism
    let members: Vec<&StationRecord> = cluster
        .members
        .iter()
        .sorted_by_key(|member| (priority_rank(member, priority), member.identifier.clone()))
        .collect();

    let operator = members
        .iter()
        .find_map(|member| member.operator.clone());

    if operator.is_none() {
        tracing::warn!(
            members = members.len(),
            "no member of cluster has an operator, merged record left without one"
        );
    }

    let canonical = members
        .iter()
        .find(|member| member.has_valid_point())
        .unwrap_or(&members[0]);

    let data_sources = members
        .iter()
        .map(|member| member.data_source.as_str())
        .unique()
        .sorted()
        .join(",");

    MergedStation {
        operator,
        point: canonical.point.clone(),
        data_sources,
        country_code: canonical.country_code.clone(),
        provenance: members
            .iter()
            .map(|member| member.identifier.clone())
            .collect(),
    }
}
