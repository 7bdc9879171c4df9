// Ampere Charging Data Project
// Interface to the spatial store and merge persistence

use super::{MergedStation, StationRecord};
use anyhow::Result;
use postgis_diesel::types::Point;

/// Resolution reason stamped on records absorbed into a multi-member merge.
pub const REASON_DUPLICATE: &str = "merged_duplicate";
/// Resolution reason for the identity merge of a record with no duplicates.
pub const REASON_SINGLETON: &str = "merged_single";

/// Boundary to the external station store: spatial candidate lookup plus
/// transactional merge persistence. The engine never mutates records through
/// any other path.
#[allow(async_fn_in_trait)]
pub trait StationStore {
    /// All not-yet-resolved records for a country, ascending identifier.
    async fn unresolved_stations(&self, country_code: &str) -> Result<Vec<StationRecord>>;

    /// All not-yet-resolved records within `radius_m` meters of the pivot
    /// point, inclusive of the pivot itself. Records flagged resolved by an
    /// earlier pass (or earlier in this pass) must not come back.
    async fn find_within(
        &self,
        point: &Point,
        radius_m: f64,
        country_code: &str,
    ) -> Result<Vec<StationRecord>>;

    /// Insert the merged record and flag every absorbed source record
    /// resolved, as one transaction. Returns the new merged id.
    async fn persist_merge(
        &self,
        merged: &MergedStation,
        absorbed: &[String],
        reason: &str,
    ) -> Result<String>;
}
