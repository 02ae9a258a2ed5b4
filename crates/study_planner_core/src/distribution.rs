//! crates/study_planner_core/src/distribution.rs
//!
//! Allocates one week's session quota across its eligible days.

use std::collections::BTreeMap;

use chrono::NaiveDate;

/// Distributes `quota` sessions over `study_days`.
///
/// Pinned days present in `study_days` get one session first, in the order
/// given, while quota remains. The rest is spread evenly; the remainder goes to
/// the last days chronologically, so density grows toward the exam.
///
/// The counts always sum to `quota`. Returns an empty map when `study_days` is
/// empty.
pub fn distribute(
    study_days: &[NaiveDate],
    quota: u32,
    pinned_days: &[NaiveDate],
) -> BTreeMap<NaiveDate, u32> {
    let mut counts: BTreeMap<NaiveDate, u32> = study_days.iter().map(|d| (*d, 0)).collect();
    if counts.is_empty() {
        return counts;
    }

    let mut remaining = quota;
    for day in pinned_days {
        if remaining == 0 {
            break;
        }
        if let Some(count) = counts.get_mut(day) {
            if *count == 0 {
                *count = 1;
                remaining -= 1;
            }
        }
    }

    let n = counts.len() as u32;
    let base = remaining / n;
    let extra = (remaining % n) as usize;
    let bonus_from = counts.len() - extra;

    // BTreeMap iterates chronologically.
    for (i, count) in counts.values_mut().enumerate() {
        *count += base;
        if i >= bonus_from {
            *count += 1;
        }
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn days(n: i64) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
        (0..n).map(|i| start + Duration::days(i)).collect()
    }

    fn counts_in_order(result: &BTreeMap<NaiveDate, u32>) -> Vec<u32> {
        result.values().copied().collect()
    }

    #[test]
    fn remainder_goes_to_the_last_days() {
        let d = days(5);
        let result = distribute(&d, 7, &[]);
        assert_eq!(counts_in_order(&result), vec![1, 1, 1, 2, 2]);
    }

    #[test]
    fn fewer_sessions_than_days_favors_the_exam_end() {
        let d = days(6);
        let result = distribute(&d, 2, &[]);
        assert_eq!(counts_in_order(&result), vec![0, 0, 0, 0, 1, 1]);
    }

    #[test]
    fn pinned_days_are_covered_before_spreading() {
        let d = days(6);
        let result = distribute(&d, 2, &[d[0]]);
        // One pinned session on day 0, the remaining one on the last day.
        assert_eq!(counts_in_order(&result), vec![1, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn pins_outside_the_week_are_ignored() {
        let d = days(3);
        let outside = d[2] + Duration::days(10);
        let result = distribute(&d, 3, &[outside]);
        assert_eq!(counts_in_order(&result), vec![1, 1, 1]);
    }

    #[test]
    fn duplicate_pins_count_once() {
        let d = days(1);
        let result = distribute(&d, 3, &[d[0], d[0]]);
        assert_eq!(counts_in_order(&result), vec![3]);
    }

    #[test]
    fn quota_smaller_than_pins_never_goes_negative() {
        let d = days(4);
        let result = distribute(&d, 1, &[d[0], d[3]]);
        assert_eq!(counts_in_order(&result), vec![1, 0, 0, 0]);

        let result = distribute(&d, 0, &[d[0], d[3]]);
        assert_eq!(counts_in_order(&result), vec![0, 0, 0, 0]);
    }

    #[test]
    fn empty_study_days_give_empty_result() {
        assert!(distribute(&[], 5, &[]).is_empty());
    }

    #[test]
    fn sum_always_matches_quota() {
        for n in 1..=7 {
            let d = days(n);
            for quota in 0..=25 {
                for pins in [vec![], vec![d[0]], vec![d[d.len() - 1]], vec![d[0], d[d.len() - 1]]] {
                    let result = distribute(&d, quota, &pins);
                    assert_eq!(result.len(), d.len());
                    assert_eq!(result.values().sum::<u32>(), quota);
                    if quota as usize >= pins.len() {
                        for pin in &pins {
                            assert!(result[pin] >= 1);
                        }
                    }
                }
            }
        }
    }
}
