// Ampere Charging Data Project
// Deduplication and merge backend for charging-station records

#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::arc_with_non_send_sync,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_unit_value,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::bytes_nth,
    clippy::deprecated_clippy_cfg_attr,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::cmp_null,
    clippy::op_ref
)]

#[macro_use]
extern crate serde;

pub mod dedup;
pub mod export;
pub mod models;
pub mod pg_station_store;
pub mod postgres_tools;
pub mod schema;

pub const WGS_84_SRID: u32 = 4326;

/// Sentinel written by upstream normalization when neither street nor town
/// could be determined. Treated as "no address" everywhere in the engine.
pub const UNKNOWN_ADDRESS: &str = "unknown,unknown";
