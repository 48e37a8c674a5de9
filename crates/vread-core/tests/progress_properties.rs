//! Property tests for the pure progress transition.

use chrono::{Duration, NaiveDate, Utc};
use proptest::prelude::*;
use vread_core::{
    plan_progress, CompanionRecord, ProgressPolicy, StageCatalog, StageProgression, UserId,
};

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

/// Day offsets between consecutive validations, including zero (same day)
/// and negative (backdated) steps.
fn steps() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(
        prop_oneof![
            4 => Just(0i64),
            6 => Just(1i64),
            3 => 2i64..10,
            1 => -3i64..0,
        ],
        1..60,
    )
}

fn policies() -> impl Strategy<Value = ProgressPolicy> {
    prop_oneof![Just(StageProgression::Catalog), Just(StageProgression::HatchOnly)].prop_map(
        |stage_progression| ProgressPolicy {
            stage_progression,
            ..Default::default()
        },
    )
}

proptest! {
    #[test]
    fn counters_and_latches_never_regress(steps in steps(), policy in policies()) {
        let catalog = StageCatalog::default();
        let mut record = CompanionRecord::new(UserId::new("p").unwrap(), Utc::now());
        let mut date = base_date();
        let mut rituals_seen = (0u32, 0u32, 0u32);

        for step in steps {
            date += Duration::days(step);
            let before = record.clone();
            let plan = plan_progress(&before, date, date, &policy, &catalog).unwrap();
            record.apply(&plan.update, Utc::now());

            prop_assert!(record.longest_streak >= before.longest_streak);
            prop_assert!(record.longest_streak >= record.current_streak);
            prop_assert!(record.total_reading_days >= before.total_reading_days);
            prop_assert!(record.current_stage >= before.current_stage);
            prop_assert!(record.current_streak >= 1);
            prop_assert!(record.has_seen_birth_ritual >= before.has_seen_birth_ritual);
            prop_assert!(record.has_seen_week_ritual >= before.has_seen_week_ritual);
            prop_assert!(record.has_seen_return_ritual >= before.has_seen_return_ritual);
            prop_assert!(record.last_reading_date >= before.last_reading_date);

            if policy.stage_progression == StageProgression::Catalog {
                prop_assert_eq!(
                    record.current_stage,
                    catalog.stage_for_reading_days(record.total_reading_days).id
                );
            } else {
                prop_assert_eq!(record.current_stage, 2);
            }

            rituals_seen.0 += u32::from(plan.rituals.is_first_day);
            rituals_seen.1 += u32::from(plan.rituals.is_first_week);
            rituals_seen.2 += u32::from(plan.rituals.is_return_after_break);
        }

        prop_assert_eq!(rituals_seen.0, 1);
        prop_assert!(rituals_seen.1 <= 1);
        prop_assert!(rituals_seen.2 <= 1);
        prop_assert_eq!(rituals_seen.1 == 1, record.has_seen_week_ritual);
        prop_assert_eq!(rituals_seen.2 == 1, record.has_seen_return_ritual);
    }

    #[test]
    fn same_day_repeats_only_touch_segments(repeats in 1usize..20) {
        let policy = ProgressPolicy::default();
        let catalog = StageCatalog::default();
        let date = base_date() + Duration::days(1); // Thursday
        let mut record = CompanionRecord::new(UserId::new("p").unwrap(), Utc::now());
        let first = plan_progress(&record, date, date, &policy, &catalog).unwrap();
        record.apply(&first.update, Utc::now());
        let after_first = record.clone();

        for _ in 0..repeats {
            let plan = plan_progress(&record, date, date, &policy, &catalog).unwrap();
            record.apply(&plan.update, Utc::now());
        }

        prop_assert_eq!(record.current_streak, after_first.current_streak);
        prop_assert_eq!(record.total_reading_days, after_first.total_reading_days);
        prop_assert_eq!(record.segments_this_week, after_first.segments_this_week + repeats as u32);
    }
}
