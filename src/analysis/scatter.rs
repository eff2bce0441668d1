//! Hour × age × gender density points.
//!
//! Records with a specific age map to one point each. Records that only
//! carry an age bucket need a specific age invented for them; how that
//! happens is chosen explicitly through [`AgeSpread`]. Only
//! [`AgeSpread::Random`] is non-deterministic: two calls on the same input
//! produce different point clouds.

use crate::models::{AgeGroup, Gender, ReportRecord, ScatterAges, ScatterPoint};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Hours accepted for scatter points (one wider than the hourly view).
const FIRST_HOUR: i64 = 7;
const LAST_HOUR: i64 = 18;

/// Placement strategy for records that only carry an age bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgeSpread {
    /// Whole count on the bucket midpoint.
    #[default]
    Midpoint,
    /// Split the count over 3-5 sampled ages using a seeded generator.
    Seeded(u64),
    /// Same split with a fresh generator on every call.
    Random,
}

impl AgeSpread {
    pub fn from_setting(setting: ScatterAges, seed: Option<u64>) -> Self {
        match setting {
            ScatterAges::Midpoint => AgeSpread::Midpoint,
            ScatterAges::Seeded => AgeSpread::Seeded(seed.unwrap_or_default()),
            ScatterAges::Random => AgeSpread::Random,
        }
    }

    pub fn is_deterministic(&self) -> bool {
        !matches!(self, AgeSpread::Random)
    }
}

/// Build density points merged by `(hour, age, gender)`, sorted by hour.
///
/// Points outside hours 7..=18 or with a gender outside the alias table are
/// dropped. Bucket-only records whose bucket is not recognized are dropped.
pub fn scatter_points(records: &[ReportRecord], spread: AgeSpread) -> Vec<ScatterPoint> {
    match spread {
        AgeSpread::Midpoint => merge_points(records, |group, count| {
            vec![(group.midpoint(), count)]
        }),
        AgeSpread::Seeded(seed) => {
            let mut rng = StdRng::seed_from_u64(seed);
            merge_points(records, |group, count| split_count(&mut rng, group, count))
        }
        AgeSpread::Random => {
            let mut rng = rand::thread_rng();
            merge_points(records, |group, count| split_count(&mut rng, group, count))
        }
    }
}

fn merge_points<F>(records: &[ReportRecord], mut spread: F) -> Vec<ScatterPoint>
where
    F: FnMut(AgeGroup, u64) -> Vec<(u32, u64)>,
{
    let mut grouped: BTreeMap<(u32, u32, Gender), u64> = BTreeMap::new();

    for record in records {
        let Some(hour) = record
            .hour_of_day()
            .filter(|h| (FIRST_HOUR..=LAST_HOUR).contains(h))
        else {
            continue;
        };
        let Some(gender) = record.gender() else {
            continue;
        };
        let hour = hour as u32;
        let count = record.weight();

        let ages = match record.age.filter(|age| *age > 0) {
            Some(age) => match u32::try_from(age) {
                Ok(age) => vec![(age, count)],
                Err(_) => continue,
            },
            None => match record.age_group() {
                Some(group) => spread(group, count),
                None => continue,
            },
        };

        for (age, part) in ages {
            let total = grouped.entry((hour, age, gender)).or_default();
            *total = total.saturating_add(part);
        }
    }

    grouped
        .into_iter()
        .map(|((hour, age, gender), count)| ScatterPoint {
            hour,
            age,
            gender,
            count,
        })
        .collect()
}

/// Split `count` over 3-5 ages sampled from the bucket range.
///
/// Every part is at least 1 and the parts sum to `count`; small counts get
/// fewer parts.
fn split_count<R: Rng>(rng: &mut R, group: AgeGroup, count: u64) -> Vec<(u32, u64)> {
    let parts = count.min(rng.gen_range(3..=5));
    let mut remaining = count;
    let mut split = Vec::with_capacity(parts as usize);

    for i in 0..parts {
        let age = rng.gen_range(group.age_range());
        let share = if i == parts - 1 {
            remaining
        } else {
            rng.gen_range(1..=remaining - (parts - i - 1))
        };
        remaining -= share;
        split.push((age, share));
    }

    split
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn aged(hour: i64, age: i64, gender: &str, count: i64) -> ReportRecord {
        ReportRecord {
            hour: Some(hour),
            age: Some(age),
            gender: Some(gender.to_string()),
            count: Some(count),
            ..Default::default()
        }
    }

    fn bucketed(hour: i64, group: &str, gender: &str, count: i64) -> ReportRecord {
        ReportRecord {
            hour: Some(hour),
            age_group: Some(group.to_string()),
            gender: Some(gender.to_string()),
            count: Some(count),
            ..Default::default()
        }
    }

    fn totals_by_hour_and_gender(points: &[ScatterPoint]) -> HashMap<(u32, Gender), u64> {
        let mut totals = HashMap::new();
        for point in points {
            *totals.entry((point.hour, point.gender)).or_default() += point.count;
        }
        totals
    }

    #[test]
    fn test_identical_keys_merge() {
        let records = vec![aged(9, 25, "Nam", 3), aged(9, 25, "Nam", 2)];
        let points = scatter_points(&records, AgeSpread::Midpoint);

        assert_eq!(
            points,
            vec![ScatterPoint {
                hour: 9,
                age: 25,
                gender: Gender::Male,
                count: 5,
            }]
        );
    }

    #[test]
    fn test_points_sorted_by_hour() {
        let records = vec![
            aged(15, 40, "Nữ", 1),
            aged(8, 22, "Nam", 1),
            aged(11, 60, "nu", 1),
        ];
        let hours: Vec<_> = scatter_points(&records, AgeSpread::Midpoint)
            .iter()
            .map(|p| p.hour)
            .collect();
        assert_eq!(hours, vec![8, 11, 15]);
    }

    #[test]
    fn test_invalid_points_dropped() {
        let records = vec![
            aged(6, 30, "Nam", 1),
            aged(19, 30, "Nam", 1),
            aged(18, 30, "Nam", 1),
            aged(10, 30, "other", 1),
            bucketed(10, "65+", "Nam", 1),
            ReportRecord::default(),
        ];
        let points = scatter_points(&records, AgeSpread::Midpoint);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].hour, 18);
    }

    #[test]
    fn test_midpoint_keeps_bucket_count() {
        let records = vec![bucketed(10, "31-50", "Nữ", 7)];
        let points = scatter_points(&records, AgeSpread::Midpoint);

        assert_eq!(
            points,
            vec![ScatterPoint {
                hour: 10,
                age: 40,
                gender: Gender::Female,
                count: 7,
            }]
        );
        assert_eq!(points, scatter_points(&records, AgeSpread::Midpoint));
    }

    #[test]
    fn test_seeded_spread_is_reproducible() {
        let records = vec![bucketed(10, "18-30", "Nam", 20), bucketed(14, ">50", "Nữ", 9)];

        let first = scatter_points(&records, AgeSpread::Seeded(42));
        let second = scatter_points(&records, AgeSpread::Seeded(42));
        assert_eq!(first, second);
    }

    // Random placement differs between calls; only the totals and ranges
    // are stable.
    #[test]
    fn test_random_spread_preserves_counts() {
        let records = vec![
            bucketed(9, "<18", "Nam", 12),
            bucketed(9, "18-30", "Nam", 1),
            bucketed(16, ">50", "Nữ", 2),
        ];
        let points = scatter_points(&records, AgeSpread::Random);
        let totals = totals_by_hour_and_gender(&points);

        assert_eq!(totals.get(&(9, Gender::Male)), Some(&13));
        assert_eq!(totals.get(&(16, Gender::Female)), Some(&2));
        for point in &points {
            assert!(point.count >= 1);
            assert!((12..=80).contains(&point.age));
        }
    }

    #[test]
    fn test_split_count_parts() {
        let mut rng = StdRng::seed_from_u64(7);
        for count in 1..40u64 {
            let split = split_count(&mut rng, AgeGroup::From18To30, count);

            assert!(!split.is_empty());
            assert!(split.len() <= 5);
            assert!(split.len() as u64 <= count);
            assert_eq!(split.iter().map(|(_, c)| c).sum::<u64>(), count);
            for (age, part) in split {
                assert!(part >= 1);
                assert!((18..=30).contains(&age));
            }
        }
    }

    #[test]
    fn test_spread_from_setting() {
        assert_eq!(
            AgeSpread::from_setting(ScatterAges::Seeded, Some(3)),
            AgeSpread::Seeded(3)
        );
        assert_eq!(
            AgeSpread::from_setting(ScatterAges::Midpoint, Some(3)),
            AgeSpread::Midpoint
        );
        assert!(!AgeSpread::Random.is_deterministic());
    }

    #[test]
    fn test_empty_input() {
        assert!(scatter_points(&[], AgeSpread::Random).is_empty());
    }

    #[test]
    fn test_huge_counts_saturate() {
        let records = vec![aged(9, 30, "Nam", i64::MAX); 3];
        let points = scatter_points(&records, AgeSpread::Midpoint);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].count, u64::MAX);
    }
}
