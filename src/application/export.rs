// Export - CSV dump of the drawn series
use crate::domain::reading::{ChartPoint, SeriesKind};
use chrono::{DateTime, Utc};
use std::fmt::Write;

pub const CSV_HEADER: &str = "Type,Cycle,Degree,Time(s),Value";

/// One row per point, planned rows first
pub fn series_csv(planned: &[ChartPoint], actual: &[ChartPoint]) -> String {
    let mut csv = String::with_capacity(32 * (planned.len() + actual.len() + 1));
    csv.push_str(CSV_HEADER);
    csv.push('\n');

    for (kind, points) in [(SeriesKind::Planned, planned), (SeriesKind::Actual, actual)] {
        for point in points {
            // Writing to a String cannot fail
            let _ = writeln!(
                csv,
                "{},{},{},{},{}",
                kind.label(),
                point.cycle,
                point.degree,
                point.x,
                point.y
            );
        }
    }

    csv
}

/// `<prefix>_<ISO timestamp with ':' and '.' replaced>.<extension>`
pub fn export_file_name(prefix: &str, extension: &str, at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{}_{}.{}", prefix, stamp, extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(degree: i32, x: f64, y: f64) -> ChartPoint {
        ChartPoint {
            x,
            y,
            degree,
            cycle: 2,
            sub_cycle: 1,
        }
    }

    #[test]
    fn test_series_csv() {
        let csv = series_csv(&[point(90, 0.625, 50.0)], &[point(90, 0.625, 49.5), point(135, 0.6875, 35.1)]);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines,
            vec![
                "Type,Cycle,Degree,Time(s),Value",
                "Planned,2,90,0.625,50",
                "Actual,2,90,0.625,49.5",
                "Actual,2,135,0.6875,35.1",
            ]
        );
    }

    #[test]
    fn test_empty_series_is_header_only() {
        assert_eq!(series_csv(&[], &[]), "Type,Cycle,Degree,Time(s),Value\n");
    }

    #[test]
    fn test_export_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 5, 17, 8, 30, 15).unwrap();
        assert_eq!(
            export_file_name("cycle_data", "csv", at),
            "cycle_data_2024-05-17T08-30-15-000Z.csv"
        );
    }
}
