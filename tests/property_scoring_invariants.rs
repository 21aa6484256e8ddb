use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use memo_scoring::scoring::config::{LeaderboardConfig, PointsConfig};
use memo_scoring::scoring::coupon::{calculate_discount, Coupon, DiscountType};
use memo_scoring::scoring::filter::LeaderboardPeriod;
use memo_scoring::scoring::leaderboard::{build_leaderboard, CohortMember, LeaderboardKind, LeaderboardRequest};
use memo_scoring::scoring::points::{apply_penalty, calculate_session_points, level_from_points, level_status};
use memo_scoring::scoring::priority::distribute_weekly_goals;
use memo_scoring::scoring::types::{AttemptRecord, LevelFormula, Mood, ScoreInputs, SubjectPriority};

fn mood_strategy() -> impl Strategy<Value = Option<Mood>> {
    prop_oneof![
        Just(None),
        Just(Some(Mood::Happy)),
        Just(Some(Mood::Neutral)),
        Just(Some(Mood::Sad)),
    ]
}

fn formula_strategy() -> impl Strategy<Value = LevelFormula> {
    prop_oneof![Just(LevelFormula::Linear), Just(LevelFormula::Threshold)]
}

proptest! {
    #[test]
    fn pt_session_points_stay_within_ceiling(
        duration in 0_u32..400,
        mood in mood_strategy(),
        streak in 0_u32..60,
        offset_minutes in -120_i64..120,
    ) {
        let scheduled = Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).unwrap();
        let inputs = ScoreInputs {
            duration_minutes: duration,
            mood,
            consecutive_study_days: streak,
            scheduled_at: Some(scheduled),
            actual_start_at: Some(scheduled + Duration::minutes(offset_minutes)),
        };
        let points = calculate_session_points(&inputs, &PointsConfig::default());
        prop_assert!(points <= 25);
        prop_assert!(points >= 8);
    }

    #[test]
    fn pt_penalty_never_goes_below_zero(total in 0_u32..10_000, magnitude in 0_u32..50) {
        let outcome = apply_penalty(total, magnitude);
        prop_assert!(outcome.applied <= magnitude);
        prop_assert_eq!(outcome.new_total + outcome.applied, total);
    }

    #[test]
    fn pt_level_is_monotonic(a in any::<u32>(), b in any::<u32>(), formula in formula_strategy()) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(level_from_points(low, formula) <= level_from_points(high, formula));
        prop_assert!(level_from_points(low, formula) >= 1);

        let status = level_status(high, formula);
        prop_assert!(status.progress_percentage <= 100);
        prop_assert!(status.points_to_next_level <= u32::MAX - high);
        // the last linear level has no representable successor
        if formula == LevelFormula::Linear && high < u32::MAX / 100 * 100 {
            prop_assert!(status.points_to_next_level >= 1);
        }
    }

    #[test]
    fn pt_small_totals_level_monotonically(a in 0_u32..20_000, b in 0_u32..20_000, formula in formula_strategy()) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(level_from_points(low, formula) <= level_from_points(high, formula));
        prop_assert!(level_status(high, formula).progress_percentage <= 100);
    }

    #[test]
    fn pt_goal_allocation_tracks_total(
        total in 0_u32..3000,
        coefficients in proptest::collection::vec(1_u32..9, 1..8),
    ) {
        let subjects: Vec<SubjectPriority> = coefficients
            .iter()
            .enumerate()
            .map(|(idx, c)| SubjectPriority::new(idx as u64, "s", f64::from(*c)))
            .collect();
        let plan = distribute_weekly_goals(total, &subjects);
        prop_assert_eq!(plan.len(), subjects.len());

        let allocated: i64 = plan.iter().map(|g| i64::from(g.allocated_minutes)).sum();
        prop_assert!((allocated - i64::from(total)).abs() <= subjects.len() as i64);
    }

    #[test]
    fn pt_discount_never_exceeds_price(
        price in 0_u64..1_000_000,
        value in 0.0_f64..150.0,
        percentage in any::<bool>(),
        cap in proptest::option::of(0_u64..50_000),
    ) {
        let coupon = Coupon {
            id: 1,
            code: "X".to_string(),
            discount_type: if percentage { DiscountType::Percentage } else { DiscountType::Fixed },
            discount_value: value,
            min_purchase: 0,
            max_discount: cap,
            max_uses: None,
            max_uses_per_user: None,
            current_uses: 0,
            valid_from: None,
            valid_until: None,
            is_active: true,
            course_ids: Vec::new(),
            package_ids: Vec::new(),
            user_ids: Vec::new(),
            first_purchase_only: false,
        };
        let breakdown = calculate_discount(&coupon, price);
        prop_assert!(breakdown.discount_amount <= price);
        prop_assert_eq!(breakdown.final_price + breakdown.discount_amount, price);
        prop_assert!((0.0..=100.0).contains(&breakdown.discount_percentage));
    }

    #[test]
    fn pt_rankings_are_ordered_and_dense(
        score_sets in proptest::collection::vec(proptest::collection::vec(0.0_f64..100.0, 1..6), 1..12),
    ) {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).unwrap();
        let members: Vec<CohortMember> = score_sets
            .iter()
            .enumerate()
            .map(|(idx, scores)| CohortMember {
                user_id: idx as u64 + 1,
                name: None,
                avatar: None,
                total_points: 0,
                attempts: scores
                    .iter()
                    .map(|s| AttemptRecord {
                        item_id: 1,
                        subject_id: 1,
                        score_percentage: *s,
                        completed_at: now - Duration::hours(1),
                    })
                    .collect(),
            })
            .collect();
        let request = LeaderboardRequest {
            kind: LeaderboardKind::Stream,
            period: LeaderboardPeriod::Week,
            limit: 50,
            current_user: &members[0],
            now,
        };
        let board = build_leaderboard(&members, &request, &LeaderboardConfig::default());

        prop_assert_eq!(board.rankings.len(), members.len());
        for (idx, entry) in board.rankings.iter().enumerate() {
            prop_assert_eq!(entry.rank, Some(idx as u32 + 1));
        }
        for pair in board.rankings.windows(2) {
            prop_assert!(pair[0].average_score >= pair[1].average_score);
        }
        prop_assert!(board.current_user.in_list);
    }
}
