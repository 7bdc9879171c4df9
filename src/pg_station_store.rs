// Ampere Charging Data Project
// Postgres/PostGIS implementation of the station store

use crate::dedup::store::StationStore;
use crate::dedup::{MergedStation, StationRecord};
use crate::models::{MergedStationRow, StationRow};
use crate::postgres_tools::AmperePostgresPool;
use anyhow::{Context, Result};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub struct PgStationStore {
    pool: Arc<AmperePostgresPool>,
}

impl PgStationStore {
    pub fn new(pool: Arc<AmperePostgresPool>) -> Self {
        PgStationStore { pool }
    }
}

impl From<StationRow> for StationRecord {
    fn from(row: StationRow) -> Self {
        StationRecord {
            identifier: row.source_id,
            data_source: row.data_source,
            country_code: row.country_code,
            operator: row.operator,
            point: row.point,
            address: row.address,
        }
    }
}

impl StationStore for PgStationStore {
    async fn unresolved_stations(&self, country_code_filter: &str) -> Result<Vec<StationRecord>> {
        use crate::schema::charging::stations::dsl::*;

        let conn = &mut self
            .pool
            .get()
            .await
            .context("getting connection from pool")?;

        let rows: Vec<StationRow> = stations
            .filter(resolved.eq(false))
            .filter(country_code.eq(country_code_filter))
            .order(source_id.asc())
            .select(StationRow::as_select())
            .load(conn)
            .await
            .context("loading unresolved stations")?;

        Ok(rows.into_iter().map(StationRecord::from).collect())
    }

    async fn find_within(
        &self,
        point: &postgis_diesel::types::Point,
        radius_m: f64,
        country_code_filter: &str,
    ) -> Result<Vec<StationRecord>> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("getting connection from pool")?;

        // cast to geography so ST_DWithin measures meters
        let rows: Vec<StationRow> = diesel::sql_query(
            "SELECT * FROM charging.stations
             WHERE resolved = false
             AND country_code = $4
             AND ST_DWithin(point::geography, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography, $3)",
        )
        .bind::<diesel::sql_types::Float8, _>(point.x)
        .bind::<diesel::sql_types::Float8, _>(point.y)
        .bind::<diesel::sql_types::Float8, _>(radius_m)
        .bind::<diesel::sql_types::Text, _>(country_code_filter)
        .load::<StationRow>(conn)
        .await
        .context("spatial candidate query")?;

        Ok(rows.into_iter().map(StationRecord::from).collect())
    }

    async fn persist_merge(
        &self,
        merged: &MergedStation,
        absorbed: &[String],
        reason: &str,
    ) -> Result<String> {
        use crate::schema::charging::merged_stations::dsl as merged_dsl;
        use crate::schema::charging::stations::dsl as stations_dsl;

        let conn = &mut self
            .pool
            .get()
            .await
            .context("getting connection from pool")?;

        let new_merged_id = Uuid::new_v4().to_string();
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or(0);

        let mut point = merged.point.clone();
        point.srid = Some(crate::WGS_84_SRID);

        let row = MergedStationRow {
            merged_id: new_merged_id.clone(),
            operator: merged.operator.clone(),
            point,
            data_sources: merged.data_sources.clone(),
            country_code: merged.country_code.clone(),
            provenance: merged.provenance.iter().cloned().map(Some).collect(),
            merged_unix_time_ms: now_ms,
        };

        // all-or-nothing per cluster: a crash mid-merge must not leave
        // absorbed rows flagged without their merged record or vice versa
        conn.transaction::<_, anyhow::Error, _>(|conn| {
            async move {
                diesel::insert_into(merged_dsl::merged_stations)
                    .values(&row)
                    .execute(conn)
                    .await
                    .context("inserting merged station")?;

                diesel::update(
                    stations_dsl::stations.filter(stations_dsl::source_id.eq_any(absorbed)),
                )
                .set((
                    stations_dsl::resolved.eq(true),
                    stations_dsl::resolution_reason.eq(reason),
                ))
                .execute(conn)
                .await
                .context("flagging absorbed stations resolved")?;

                Ok(())
            }
            .scope_boxed()
        })
        .await?;

        Ok(new_merged_id)
    }
}
