//! All dashboard views computed from one record set.

use crate::analysis::{aggregator, demographics, scatter, AgeSpread};
use crate::models::{
    AgeGenderRow, DateRange, Granularity, HourlyRow, NamedCount, Overview, ProcedureEntry,
    ReportRecord, ScatterPoint, Share, TimeSeries, WeekdayRow,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Knobs for building a [`Dashboard`].
#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub granularity: Granularity,
    pub top_k: usize,
    pub spread: AgeSpread,
    pub ward_id: Option<String>,
    pub range: Option<DateRange>,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            granularity: Granularity::Day,
            top_k: 5,
            spread: AgeSpread::Midpoint,
            ward_id: None,
            range: None,
        }
    }
}

/// Every chart's data for one filtered record set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub ward_id: Option<String>,
    pub range: Option<DateRange>,
    pub granularity: Granularity,
    pub overview: Overview,
    pub prints_by_time: TimeSeries,
    pub hourly: Vec<HourlyRow>,
    pub weekdays: Vec<WeekdayRow>,
    pub domains: Vec<NamedCount>,
    pub top_procedures: Vec<ProcedureEntry>,
    pub auth_types: Vec<Share>,
    pub genders: Vec<Share>,
    pub age_gender: Vec<AgeGenderRow>,
    pub scatter: Vec<ScatterPoint>,
    /// False when scatter ages were sampled without a seed.
    pub scatter_deterministic: bool,
}

impl Dashboard {
    /// Filter `records` and run every aggregation once.
    pub fn build(records: &[ReportRecord], options: &DashboardOptions) -> Self {
        let filtered = crate::analysis::filter_by_ward_and_date_range(
            records,
            options.ward_id.as_deref(),
            options.range,
        );
        debug!(
            "Building dashboard from {} of {} records",
            filtered.len(),
            records.len()
        );

        Self {
            ward_id: options.ward_id.clone(),
            range: options.range,
            granularity: options.granularity,
            overview: aggregator::overview(&filtered),
            prints_by_time: aggregator::by_time_bucket(&filtered, options.granularity),
            hourly: aggregator::by_hour_of_day(&filtered),
            weekdays: aggregator::daily_by_weekday(&filtered),
            domains: aggregator::by_domain(&filtered),
            top_procedures: aggregator::top_procedures(&filtered, options.top_k),
            auth_types: demographics::by_auth_type(&filtered),
            genders: demographics::by_gender(&filtered),
            age_gender: demographics::by_age_group_and_gender(&filtered),
            scatter: scatter::scatter_points(&filtered, options.spread),
            scatter_deterministic: options.spread.is_deterministic(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.overview.records == 0
    }
}
