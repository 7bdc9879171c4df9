// Ampere Charging Data Project
// Flat CSV report of discovered duplicate pairs, for manual review

use crate::dedup::DuplicatePair;
use anyhow::{Context, Result};
use std::path::Path;

#[derive(Serialize)]
struct ReportRow<'a> {
    station_id: &'a str,
    station_source: &'a str,
    station_operator: Option<&'a str>,
    station_address: Option<&'a str>,
    station_lat: f64,
    station_lon: f64,
    duplicate_id: &'a str,
    duplicate_source: &'a str,
    duplicate_operator: Option<&'a str>,
    duplicate_address: Option<&'a str>,
    duplicate_lat: f64,
    duplicate_lon: f64,
    score: f64,
}

/// Reporting side-channel only; the merge pass does not depend on it.
pub fn write_duplicate_report(path: &Path, pairs: &[DuplicatePair]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating duplicate report at {}", path.display()))?;

    for pair in pairs {
        writer.serialize(ReportRow {
            station_id: &pair.station.identifier,
            station_source: &pair.station.data_source,
            station_operator: pair.station.operator.as_deref(),
            station_address: pair.station.address.as_deref(),
            station_lat: pair.station.point.y,
            station_lon: pair.station.point.x,
            duplicate_id: &pair.duplicate.identifier,
            duplicate_source: &pair.duplicate.data_source,
            duplicate_operator: pair.duplicate.operator.as_deref(),
            duplicate_address: pair.duplicate.address.as_deref(),
            duplicate_lat: pair.duplicate.point.y,
            duplicate_lon: pair.duplicate.point.x,
            score: pair.score,
        })?;
    }

    writer.flush().context("flushing duplicate report")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::StationRecord;
    use postgis_diesel::types::Point;

    fn station(id: &str) -> StationRecord {
        StationRecord {
            identifier: id.to_string(),
            data_source: "OCM".to_string(),
            country_code: "DE".to_string(),
            operator: Some("enbw".to_string()),
            point: Point {
                x: 11.5,
                y: 48.1,
                srid: Some(crate::WGS_84_SRID),
            },
            address: None,
        }
    }

    #[test]
    fn test_report_has_header_and_one_row_per_pair() {
        let path = std::env::temp_dir().join("ampere_duplicate_report_test.csv");
        let pairs = vec![DuplicatePair {
            station: station("a"),
            duplicate: station("b"),
            score: 0.97,
        }];

        write_duplicate_report(&path, &pairs).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("station_id,"));
        assert!(lines[1].contains("0.97"));

        std::fs::remove_file(&path).ok();
    }
}
