//! Ward and date-range filtering.

use crate::models::{DateRange, ReportRecord};

/// Keep records of one ward within an inclusive date range.
///
/// Both filters are optional. Ward ids are compared as strings so numeric
/// and string ids from different sources match. With a range, records whose
/// date is missing or unparseable are dropped.
pub fn filter_by_ward_and_date_range(
    records: &[ReportRecord],
    ward_id: Option<&str>,
    range: Option<DateRange>,
) -> Vec<ReportRecord> {
    let ward_id = ward_id.map(str::trim);

    records
        .iter()
        .filter(|record| match ward_id {
            Some(wanted) => record.ward_id.as_deref().map(str::trim) == Some(wanted),
            None => true,
        })
        .filter(|record| match range {
            Some(range) => record.valid_date().is_some_and(|d| range.contains(d)),
            None => true,
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(ward: &str, date: &str) -> ReportRecord {
        ReportRecord {
            ward_id: Some(ward.to_string()),
            date: Some(date.to_string()),
            ..Default::default()
        }
    }

    fn range(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        )
    }

    #[test]
    fn test_no_filters_keeps_everything() {
        let records = vec![record("1", "2024-01-01"), record("2", "garbage")];
        assert_eq!(filter_by_ward_and_date_range(&records, None, None).len(), 2);
    }

    #[test]
    fn test_ward_filter_compares_as_string() {
        let records: Vec<ReportRecord> = serde_json::from_str(
            r#"[{"ward_id": 7, "date": "2024-01-01"}, {"ward_id": "7"}, {"ward_id": 8}]"#,
        )
        .unwrap();

        let filtered = filter_by_ward_and_date_range(&records, Some("7"), None);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let records = vec![
            record("1", "2023-12-31"),
            record("1", "2024-01-01"),
            record("1", "2024-01-15"),
            record("1", "2024-01-31"),
            record("1", "2024-02-01"),
        ];

        let filtered =
            filter_by_ward_and_date_range(&records, None, Some(range((2024, 1, 1), (2024, 1, 31))));
        let dates: Vec<_> = filtered.iter().filter_map(|r| r.date.clone()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-15", "2024-01-31"]);
    }

    #[test]
    fn test_range_drops_undated_records() {
        let mut undated = record("1", "");
        undated.date = None;
        let records = vec![undated, record("1", "soon"), record("1", "2024-01-10")];

        let filtered = filter_by_ward_and_date_range(
            &records,
            Some("1"),
            Some(range((2024, 1, 1), (2024, 1, 31))),
        );
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(filter_by_ward_and_date_range(&[], Some("1"), None).is_empty());
    }
}
