// Ampere Charging Data Project
// Diesel row structs for the charging schema

use diesel::prelude::*;

#[derive(Queryable, QueryableByName, Selectable, Insertable, Clone, Debug)]
#[diesel(table_name = crate::schema::charging::stations)]
pub struct StationRow {
    pub source_id: String,
    pub data_source: String,
    pub country_code: String,
    pub operator: Option<String>,
    pub point: postgis_diesel::types::Point,
    pub address: Option<String>,
    pub resolved: bool,
    pub resolution_reason: Option<String>,
}

#[derive(Queryable, Selectable, Insertable, Clone, Debug)]
#[diesel(table_name = crate::schema::charging::merged_stations)]
pub struct MergedStationRow {
    pub merged_id: String,
    pub operator: Option<String>,
    pub point: postgis_diesel::types::Point,
    pub data_sources: String,
    pub country_code: String,
    pub provenance: Vec<Option<String>>,
    pub merged_unix_time_ms: i64,
}
