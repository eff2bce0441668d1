//! Authentication, gender and age breakdowns.

use crate::analysis::aggregator::{percent, saturating_sum};
use crate::models::{AgeGenderRow, AgeGroup, AuthType, Gender, ReportRecord, Share};

/// Prints per authentication method with their share of the total.
///
/// Unknown or missing methods count as CCCD. Empty categories are omitted.
pub fn by_auth_type(records: &[ReportRecord]) -> Vec<Share> {
    let mut counts = [0u64; AuthType::ALL.len()];
    for record in records {
        let slot = record.auth_type() as usize;
        counts[slot] = counts[slot].saturating_add(record.weight());
    }

    shares(AuthType::ALL.iter().map(AuthType::label).zip(counts))
}

/// Prints per gender with their share of the total.
///
/// Records whose gender is not in the alias table are dropped.
pub fn by_gender(records: &[ReportRecord]) -> Vec<Share> {
    let mut counts = [0u64; Gender::ALL.len()];
    for record in records {
        if let Some(gender) = record.gender() {
            let slot = gender as usize;
            counts[slot] = counts[slot].saturating_add(record.weight());
        }
    }

    shares(Gender::ALL.iter().map(Gender::label).zip(counts))
}

fn shares<'a>(counts: impl Iterator<Item = (&'a str, u64)> + Clone) -> Vec<Share> {
    let total = saturating_sum(counts.clone().map(|(_, value)| value));

    counts
        .filter(|(_, value)| *value > 0)
        .map(|(name, value)| Share {
            name: name.to_string(),
            value,
            percent: percent(value, total),
        })
        .collect()
}

/// Male/female split inside each age bucket, in fixed bucket order.
///
/// A record needs a known age group and a non-empty gender. The bucket
/// total also counts genders outside the alias table, so the two
/// percentages only sum to 100 when every gender was recognized.
pub fn by_age_group_and_gender(records: &[ReportRecord]) -> Vec<AgeGenderRow> {
    let mut buckets = [(0u64, 0u64, 0u64); AgeGroup::ALL.len()];

    for record in records {
        let (Some(group), Some(raw_gender)) = (record.age_group(), record.raw_gender()) else {
            continue;
        };

        let weight = record.weight();
        let bucket = &mut buckets[group.index()];
        match Gender::from_label(raw_gender) {
            Some(Gender::Male) => bucket.0 = bucket.0.saturating_add(weight),
            Some(Gender::Female) => bucket.1 = bucket.1.saturating_add(weight),
            None => {}
        }
        bucket.2 = bucket.2.saturating_add(weight);
    }

    AgeGroup::ALL
        .into_iter()
        .zip(buckets)
        .filter(|(_, (_, _, total))| *total > 0)
        .map(|(group, (male, female, total))| AgeGenderRow {
            age_range: group,
            male,
            female,
            total,
            male_percent: percent(male, total),
            female_percent: percent(female, total),
        })
        .collect()
}
