//! Data models for the print dashboard.
//!
//! This module contains the input record as delivered by the `/reports`
//! endpoint, the closed categorical enums used to normalize it, and the
//! output rows produced by the aggregations.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::ops::RangeInclusive;

/// One logged print event, or a pre-aggregated count of identical events.
///
/// Every field is optional: the API is loose about types (numbers arrive as
/// strings and the other way round) and aggregations skip whatever they
/// cannot use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    #[serde(default, deserialize_with = "lenient_int")]
    pub id: Option<i64>,
    /// Reporting ward, kept as a string so `7` and `"7"` compare equal.
    #[serde(default, alias = "wardId", deserialize_with = "lenient_string")]
    pub ward_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub city_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub ward_name: Option<String>,
    /// Raw calendar date; parsed lazily by [`ReportRecord::date`].
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub print_time: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub hour: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub procedure: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub domain: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub age_group: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub age: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub auth_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub count: Option<i64>,
}

/// Outcome of reading a record's `date` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordDate<'a> {
    Missing,
    Invalid(&'a str),
    Valid(NaiveDate),
}

impl ReportRecord {
    /// Number of events this record stands for. Absent or non-positive
    /// counts weigh 1.
    pub fn weight(&self) -> u64 {
        match self.count {
            Some(count) if count > 0 => count as u64,
            _ => 1,
        }
    }

    pub fn date(&self) -> RecordDate<'_> {
        match self.date.as_deref().map(str::trim) {
            None | Some("") => RecordDate::Missing,
            Some(raw) => match parse_record_date(raw) {
                Some(date) => RecordDate::Valid(date),
                None => RecordDate::Invalid(raw),
            },
        }
    }

    /// The parsed date, or `None` when missing or unparseable.
    pub fn valid_date(&self) -> Option<NaiveDate> {
        match self.date() {
            RecordDate::Valid(date) => Some(date),
            _ => None,
        }
    }

    /// Hour of the print, falling back to `print_time` which the API fills
    /// with the same value.
    pub fn hour_of_day(&self) -> Option<i64> {
        self.hour.or(self.print_time)
    }

    pub fn gender(&self) -> Option<Gender> {
        self.gender.as_deref().and_then(Gender::from_label)
    }

    /// Trimmed gender text, `None` when absent or blank.
    pub fn raw_gender(&self) -> Option<&str> {
        self.gender
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }

    pub fn auth_type(&self) -> AuthType {
        AuthType::from_label(self.auth_type.as_deref())
    }

    pub fn age_group(&self) -> Option<AgeGroup> {
        self.age_group.as_deref().and_then(AgeGroup::from_label)
    }
}

/// Parse the date shapes the API and saved exports produce.
pub fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(datetime.date());
        }
    }

    None
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(int_from_value))
}

fn int_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Text field that drops anything but a string, so one odd value only
/// removes that record from the views that need the field.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Normalized gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "Nam")]
    Male,
    #[serde(rename = "Nữ")]
    Female,
}

/// Accepted spellings, compared after trimming and lowercasing.
const GENDER_ALIASES: &[(&str, Gender)] = &[
    ("nam", Gender::Male),
    ("male", Gender::Male),
    ("nữ", Gender::Female),
    ("nu", Gender::Female),
    ("female", Gender::Female),
];

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase();
        GENDER_ALIASES
            .iter()
            .find(|(alias, _)| *alias == normalized)
            .map(|(_, gender)| *gender)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Nam",
            Gender::Female => "Nữ",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// How the citizen authenticated at the kiosk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthType {
    /// Physical citizen ID card.
    #[serde(rename = "CCCD")]
    Cccd,
    #[serde(rename = "QR")]
    Qr,
}

impl AuthType {
    pub const ALL: [AuthType; 2] = [AuthType::Cccd, AuthType::Qr];

    /// Anything that is not recognizably QR counts as a physical ID.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_uppercase()).as_deref() {
            Some("QR") => AuthType::Qr,
            _ => AuthType::Cccd,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AuthType::Cccd => "CCCD",
            AuthType::Qr => "QR",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Coarse age bucket, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "<18")]
    Under18,
    #[serde(rename = "18-30")]
    From18To30,
    #[serde(rename = "31-50")]
    From31To50,
    #[serde(rename = ">50")]
    Over50,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 4] = [
        AgeGroup::Under18,
        AgeGroup::From18To30,
        AgeGroup::From31To50,
        AgeGroup::Over50,
    ];

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|group| group.label() == label)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeGroup::Under18 => "<18",
            AgeGroup::From18To30 => "18-30",
            AgeGroup::From31To50 => "31-50",
            AgeGroup::Over50 => ">50",
        }
    }

    /// Specific ages a bucket stands for when spreading scatter points.
    pub fn age_range(&self) -> RangeInclusive<u32> {
        match self {
            AgeGroup::Under18 => 12..=17,
            AgeGroup::From18To30 => 18..=30,
            AgeGroup::From31To50 => 31..=50,
            AgeGroup::Over50 => 51..=80,
        }
    }

    pub fn midpoint(&self) -> u32 {
        let range = self.age_range();
        (range.start() + range.end()) / 2
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Bucket size for the prints-over-time view.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Day,
    Week,
}

impl Granularity {
    /// Value of the export endpoint's `group_by` parameter.
    pub fn api_label(&self) -> &'static str {
        match self {
            Granularity::Day => "Ngày",
            Granularity::Week => "Tuần",
        }
    }
}

/// How scatter points place records that only carry an age bucket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ScatterAges {
    /// Whole count on the bucket's midpoint age.
    #[default]
    Midpoint,
    /// Random split driven by a fixed seed.
    Seeded,
    /// Random split that differs on every run.
    Random,
}

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Prints in one day or ISO week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBucket {
    /// `YYYY-MM-DD` for days, `GGGG-Www` for weeks.
    pub time: String,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_end: Option<NaiveDate>,
}

/// Prints over time plus the number of records whose date was unreadable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub buckets: Vec<TimeBucket>,
    pub skipped_dates: usize,
}

/// Average prints for one working hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyRow {
    pub hour: u32,
    /// Average per active day.
    pub count: f64,
    pub total_count: u64,
    pub active_days: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedCount {
    pub name: String,
    pub value: u64,
}

/// One bar of the top-procedures chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureEntry {
    /// Display name, truncated when long.
    pub name: String,
    pub full_name: String,
    pub value: u64,
    #[serde(default)]
    pub is_other: bool,
    /// Procedures folded into the "other" entry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<NamedCount>,
}

/// A category's count and its share of the total, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub name: String,
    pub value: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeGenderRow {
    pub age_range: AgeGroup,
    pub male: u64,
    pub female: u64,
    pub total: u64,
    pub male_percent: f64,
    pub female_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub hour: u32,
    pub age: u32,
    pub gender: Gender,
    pub count: u64,
}

/// Daily totals observed on one weekday, with a five-number summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayRow {
    pub weekday: String,
    pub daily_counts: Vec<u64>,
    pub min: u64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: u64,
}

/// Headline numbers for a record set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overview {
    pub records: usize,
    pub total_count: u64,
    pub wards: usize,
    pub domains: usize,
    pub procedures: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deserializes_loose_types() {
        let json = r#"{
            "id": 12, "ward_id": 7, "date": "2024-01-05", "hour": "9",
            "procedure": "Đăng ký kết hôn", "count": "3", "gender": "Nam",
            "unexpected": {"nested": true}
        }"#;
        let record: ReportRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.id, Some(12));
        assert_eq!(record.ward_id.as_deref(), Some("7"));
        assert_eq!(record.hour, Some(9));
        assert_eq!(record.count, Some(3));
        assert_eq!(record.weight(), 3);
    }

    #[test]
    fn test_unparseable_numbers_become_none() {
        let json = r#"{"hour": "late", "count": null, "age": 31.8}"#;
        let record: ReportRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.hour, None);
        assert_eq!(record.count, None);
        assert_eq!(record.age, Some(31));
    }

    #[test]
    fn test_non_string_text_fields_become_none() {
        let json = r#"{
            "procedure": 42, "domain": ["Hộ tịch"], "gender": 1,
            "age_group": {"min": 18}, "auth_type": true, "ward_name": null,
            "count": 2
        }"#;
        let record: ReportRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.procedure, None);
        assert_eq!(record.domain, None);
        assert_eq!(record.gender, None);
        assert_eq!(record.age_group, None);
        assert_eq!(record.auth_type, None);
        assert_eq!(record.ward_name, None);
        assert_eq!(record.weight(), 2);
    }

    #[test]
    fn test_weight_defaults_to_one() {
        let mut record = ReportRecord::default();
        assert_eq!(record.weight(), 1);

        record.count = Some(0);
        assert_eq!(record.weight(), 1);

        record.count = Some(4);
        assert_eq!(record.weight(), 4);
    }

    #[test]
    fn test_record_date_states() {
        let mut record = ReportRecord::default();
        assert_eq!(record.date(), RecordDate::Missing);

        record.date = Some("not a date".to_string());
        assert_eq!(record.date(), RecordDate::Invalid("not a date"));

        record.date = Some("2024-03-01T10:15:00".to_string());
        assert_eq!(
            record.date(),
            RecordDate::Valid(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
    }

    #[test]
    fn test_parse_record_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2);
        assert_eq!(parse_record_date("2024-01-02"), expected);
        assert_eq!(parse_record_date("2024-01-02T08:00:00Z"), expected);
        assert_eq!(parse_record_date("2024-01-02 08:00:00"), expected);
        assert_eq!(parse_record_date("02/01/2024"), None);
    }

    #[test]
    fn test_gender_aliases() {
        assert_eq!(Gender::from_label("Nam"), Some(Gender::Male));
        assert_eq!(Gender::from_label("MALE"), Some(Gender::Male));
        assert_eq!(Gender::from_label("Nữ"), Some(Gender::Female));
        assert_eq!(Gender::from_label("NỮ"), Some(Gender::Female));
        assert_eq!(Gender::from_label("nu"), Some(Gender::Female));
        assert_eq!(Gender::from_label(" female "), Some(Gender::Female));
        assert_eq!(Gender::from_label("other"), None);
    }

    #[test]
    fn test_auth_type_defaults_to_cccd() {
        assert_eq!(AuthType::from_label(Some("qr")), AuthType::Qr);
        assert_eq!(AuthType::from_label(Some("CCCD")), AuthType::Cccd);
        assert_eq!(AuthType::from_label(Some("passport")), AuthType::Cccd);
        assert_eq!(AuthType::from_label(None), AuthType::Cccd);
    }

    #[test]
    fn test_age_group_labels_and_ranges() {
        assert_eq!(AgeGroup::from_label(" 18-30 "), Some(AgeGroup::From18To30));
        assert_eq!(AgeGroup::from_label("65+"), None);
        assert_eq!(AgeGroup::Under18.age_range(), 12..=17);
        assert_eq!(AgeGroup::Over50.midpoint(), 65);
        assert_eq!(AgeGroup::From31To50.index(), 2);
    }

    #[test]
    fn test_gender_serializes_as_label() {
        let json = serde_json::to_string(&Gender::Female).unwrap();
        assert_eq!(json, "\"Nữ\"");
    }
}
