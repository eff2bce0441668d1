//! Print-count aggregation over time, hours, domains and procedures.
//!
//! Every function here is pure: it takes a slice of records and returns a
//! fresh summary collection. Records missing the field an aggregation needs
//! are skipped by that aggregation only.

use crate::models::{
    Granularity, HourlyRow, NamedCount, Overview, ProcedureEntry, RecordDate, ReportRecord,
    TimeBucket, TimeSeries, WeekdayRow,
};
use chrono::{Datelike, Days, NaiveDate};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::warn;

/// First and last working hour of the hourly view.
pub const FIRST_HOUR: i64 = 7;
pub const LAST_HOUR: i64 = 17;
const HOURS: usize = (LAST_HOUR - FIRST_HOUR + 1) as usize;

/// Bucket for records that name no procedure.
pub const UNKNOWN_PROCEDURE: &str = "Không xác định";

const WEEKDAY_LABELS: [&str; 7] = [
    "Thứ 2", "Thứ 3", "Thứ 4", "Thứ 5", "Thứ 6", "Thứ 7", "Chủ nhật",
];

/// Longest procedure name shown before truncation.
const DISPLAY_NAME_LIMIT: usize = 30;

/// Sum prints per day or per ISO week, in chronological order.
///
/// Records without a date are skipped. Records with an unreadable date are
/// skipped with a warning and counted in [`TimeSeries::skipped_dates`].
pub fn by_time_bucket(records: &[ReportRecord], granularity: Granularity) -> TimeSeries {
    let mut buckets: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    let mut skipped_dates = 0;

    for record in records {
        let date = match record.date() {
            RecordDate::Valid(date) => date,
            RecordDate::Missing => continue,
            RecordDate::Invalid(raw) => {
                warn!("Skipping record {:?} with unreadable date {:?}", record.id, raw);
                skipped_dates += 1;
                continue;
            }
        };

        let key = match granularity {
            Granularity::Day => date,
            Granularity::Week => week_start(date),
        };
        let bucket = buckets.entry(key).or_default();
        *bucket = bucket.saturating_add(record.weight());
    }

    let buckets = buckets
        .into_iter()
        .map(|(key, count)| match granularity {
            Granularity::Day => TimeBucket {
                time: key.format("%Y-%m-%d").to_string(),
                count,
                week_start: None,
                week_end: None,
            },
            Granularity::Week => {
                let iso = key.iso_week();
                TimeBucket {
                    time: format!("{}-W{:02}", iso.year(), iso.week()),
                    count,
                    week_start: Some(key),
                    week_end: key.checked_add_days(Days::new(6)),
                }
            }
        })
        .collect();

    TimeSeries {
        buckets,
        skipped_dates,
    }
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday() as u64;
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// Average prints per active day for each working hour 7..=17.
///
/// Always returns one row per hour, in order, even for empty input.
pub fn by_hour_of_day(records: &[ReportRecord]) -> Vec<HourlyRow> {
    let mut totals = [0u64; HOURS];
    let mut active_days = [0u64; HOURS];
    let mut seen: HashSet<(Option<&str>, i64)> = HashSet::new();

    for record in records {
        let Some(hour) = record
            .hour_of_day()
            .filter(|h| (FIRST_HOUR..=LAST_HOUR).contains(h))
        else {
            continue;
        };

        let slot = (hour - FIRST_HOUR) as usize;
        totals[slot] = totals[slot].saturating_add(record.weight());

        if seen.insert((record.date.as_deref().map(str::trim), hour)) {
            active_days[slot] += 1;
        }
    }

    (0..HOURS)
        .map(|slot| HourlyRow {
            hour: (FIRST_HOUR as usize + slot) as u32,
            count: if active_days[slot] > 0 {
                totals[slot] as f64 / active_days[slot] as f64
            } else {
                0.0
            },
            total_count: totals[slot],
            active_days: active_days[slot],
        })
        .collect()
}

/// Sum prints per domain, largest first.
pub fn by_domain(records: &[ReportRecord]) -> Vec<NamedCount> {
    let mut sums = sum_in_encounter_order(records.iter().filter_map(|record| {
        record
            .domain
            .as_deref()
            .filter(|d| !d.is_empty())
            .map(|d| (d, record.weight()))
    }));

    sort_descending(&mut sums);
    sums
}

/// The `k` most printed procedures, with the rest folded into one entry.
pub fn top_procedures(records: &[ReportRecord], k: usize) -> Vec<ProcedureEntry> {
    if records.is_empty() {
        return Vec::new();
    }

    let mut sums = sum_in_encounter_order(records.iter().map(|record| {
        let name = record
            .procedure
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(UNKNOWN_PROCEDURE);
        (name, record.weight())
    }));
    sort_descending(&mut sums);

    let others = if sums.len() > k {
        sums.split_off(k)
    } else {
        Vec::new()
    };

    let mut entries: Vec<ProcedureEntry> = sums
        .into_iter()
        .map(|sum| ProcedureEntry {
            name: display_name(&sum.name),
            full_name: sum.name,
            value: sum.value,
            is_other: false,
            details: Vec::new(),
        })
        .collect();

    let other_value = saturating_sum(others.iter().map(|p| p.value));
    if other_value > 0 {
        entries.push(ProcedureEntry {
            name: format!("Khác ({} thủ tục)", others.len()),
            full_name: format!("{} thủ tục khác", others.len()),
            value: other_value,
            is_other: true,
            details: others,
        });
    }

    entries
}

/// Shorten long procedure names for chart labels.
pub fn display_name(name: &str) -> String {
    if name.chars().count() > DISPLAY_NAME_LIMIT {
        let head: String = name.chars().take(DISPLAY_NAME_LIMIT).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

/// Daily totals grouped by weekday, Monday first.
///
/// Weekdays with no observed day are left out.
pub fn daily_by_weekday(records: &[ReportRecord]) -> Vec<WeekdayRow> {
    let mut daily: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for record in records {
        if let Some(date) = record.valid_date() {
            let day = daily.entry(date).or_default();
            *day = day.saturating_add(record.weight());
        }
    }

    let mut by_weekday: [Vec<u64>; 7] = Default::default();
    for (date, count) in daily {
        by_weekday[date.weekday().num_days_from_monday() as usize].push(count);
    }

    by_weekday
        .into_iter()
        .enumerate()
        .filter(|(_, counts)| !counts.is_empty())
        .map(|(day, daily_counts)| {
            let mut sorted = daily_counts.clone();
            sorted.sort_unstable();
            WeekdayRow {
                weekday: weekday_label(day),
                min: sorted[0],
                q1: quantile(&sorted, 0.25),
                median: quantile(&sorted, 0.5),
                q3: quantile(&sorted, 0.75),
                max: sorted[sorted.len() - 1],
                daily_counts,
            }
        })
        .collect()
}

fn weekday_label(days_from_monday: usize) -> String {
    WEEKDAY_LABELS[days_from_monday % 7].to_string()
}

/// Linear-interpolated quantile of a sorted, non-empty slice.
fn quantile(sorted: &[u64], p: f64) -> f64 {
    let position = p * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] as f64 + (sorted[upper] as f64 - sorted[lower] as f64) * fraction
}

/// Headline numbers: records, prints, distinct units and the date span.
pub fn overview(records: &[ReportRecord]) -> Overview {
    let dates = records.iter().filter_map(ReportRecord::valid_date);

    Overview {
        records: records.len(),
        total_count: saturating_sum(records.iter().map(ReportRecord::weight)),
        wards: count_distinct(records.iter().map(|r| r.ward_id.as_deref())),
        domains: count_distinct(records.iter().map(|r| r.domain.as_deref())),
        procedures: count_distinct(records.iter().map(|r| r.procedure.as_deref())),
        first_date: dates.clone().min(),
        last_date: dates.max(),
    }
}

fn count_distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> usize {
    values
        .flatten()
        .filter(|v| !v.is_empty())
        .collect::<HashSet<_>>()
        .len()
}

/// Share of `value` in `total` as a percentage rounded to one decimal.
///
/// A zero total yields 0.0 rather than NaN.
pub fn percent(value: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (value as f64 / total as f64 * 1000.0).round() / 10.0
}

/// Sum weights per name, keeping names in first-seen order.
fn sum_in_encounter_order<'a, I>(items: I) -> Vec<NamedCount>
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut sums: Vec<NamedCount> = Vec::new();

    for (name, weight) in items {
        match index.get(name) {
            Some(&slot) => sums[slot].value = sums[slot].value.saturating_add(weight),
            None => {
                index.insert(name, sums.len());
                sums.push(NamedCount {
                    name: name.to_string(),
                    value: weight,
                });
            }
        }
    }

    sums
}

/// Sum that stops at `u64::MAX` instead of overflowing.
pub fn saturating_sum(values: impl Iterator<Item = u64>) -> u64 {
    values.fold(0, u64::saturating_add)
}

/// Stable: equal values keep encounter order.
fn sort_descending(sums: &mut [NamedCount]) {
    sums.sort_by(|a, b| b.value.cmp(&a.value));
}
