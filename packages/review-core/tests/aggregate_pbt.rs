//! Property-Based Tests for the Metric Aggregator and grade estimator
//!
//! Invariants:
//! - Distribution counts sum to the number of non-null values of the dimension
//! - Medians and means stay on the rating scale
//! - Categorical counts (with the unspecified bucket) sum to total reviews
//! - Statistics are withheld below the display threshold
//! - Heuristic grade bounds stay within 0..=100

use proptest::prelude::*;

use review_core::grades::fairness_adjusted_table;
use review_core::{
    stats_for_display, summarize, Dimension, DifficultyValueAlignment, ExamFormat,
    ExtraAssessment, ReviewScores, StatsAvailability,
};

// ============================================================================
// Arbitrary Generators
// ============================================================================

/// Includes out-of-scale values, which the aggregator must ignore.
fn arb_rating() -> impl Strategy<Value = Option<u8>> {
    proptest::option::of(0u8..=7u8)
}

fn arb_alignment() -> impl Strategy<Value = Option<DifficultyValueAlignment>> {
    proptest::option::of(prop_oneof![
        Just(DifficultyValueAlignment::WellBalanced),
        Just(DifficultyValueAlignment::TooDifficult),
        Just(DifficultyValueAlignment::TooEasy),
    ])
}

fn arb_format() -> impl Strategy<Value = Option<ExamFormat>> {
    proptest::option::of(prop_oneof![
        Just(ExamFormat::Classical),
        Just(ExamFormat::Test),
        Just(ExamFormat::Mix),
    ])
}

fn arb_extras() -> impl Strategy<Value = Vec<ExtraAssessment>> {
    proptest::sample::subsequence(ExtraAssessment::ALL.to_vec(), 0..=4)
}

fn arb_review() -> impl Strategy<Value = ReviewScores> {
    (
        (arb_rating(), arb_rating(), arb_rating(), arb_rating()),
        (arb_rating(), arb_rating(), arb_rating()),
        (arb_alignment(), arb_format(), arb_format(), arb_extras()),
    )
        .prop_map(
            |(
                (difficulty, usefulness, workload, material_relevance),
                (exam_predictability, attendance, grading_fairness),
                (difficulty_value_alignment, midterm_format, final_format, extra_assessments),
            )| ReviewScores {
                difficulty,
                usefulness,
                workload,
                material_relevance,
                exam_predictability,
                attendance,
                grading_fairness,
                difficulty_value_alignment,
                midterm_format,
                final_format,
                extra_assessments,
            },
        )
}

fn arb_reviews() -> impl Strategy<Value = Vec<ReviewScores>> {
    proptest::collection::vec(arb_review(), 0..60)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_distribution_sums_to_non_null_count(reviews in arb_reviews()) {
        let stats = summarize(&reviews);
        for dimension in Dimension::ALL {
            let summary = stats.dimension(*dimension);
            let expected = reviews
                .iter()
                .filter_map(|r| r.rating(*dimension))
                .filter(|v| (1..=5).contains(v))
                .count();
            let total: usize = summary.distribution.values().sum();
            prop_assert_eq!(summary.count, expected);
            prop_assert_eq!(total, expected);
            prop_assert_eq!(summary.distribution.len(), 5);
        }
    }

    #[test]
    fn prop_median_and_mean_on_scale(reviews in arb_reviews()) {
        let stats = summarize(&reviews);
        for dimension in Dimension::ALL {
            let summary = stats.dimension(*dimension);
            match (summary.median, summary.mean) {
                (Some(median), Some(mean)) => {
                    prop_assert!((1.0..=5.0).contains(&median));
                    prop_assert!((1.0..=5.0).contains(&mean));
                }
                (None, None) => prop_assert_eq!(summary.count, 0),
                _ => prop_assert!(false, "median and mean must be defined together"),
            }
        }
    }

    #[test]
    fn prop_categorical_counts_cover_every_review(reviews in arb_reviews()) {
        let stats = summarize(&reviews);
        for counts in [
            &stats.difficulty_value_counts,
            &stats.midterm_format_counts,
            &stats.final_format_counts,
        ] {
            let total: usize = counts.values().sum();
            prop_assert_eq!(total, reviews.len());
        }
    }

    #[test]
    fn prop_stats_withheld_below_threshold(reviews in arb_reviews(), min in 1usize..30) {
        match stats_for_display(&reviews, min) {
            StatsAvailability::Available { stats } => {
                prop_assert!(reviews.len() >= min);
                prop_assert_eq!(stats.total_reviews, reviews.len());
            }
            StatsAvailability::InsufficientData { total_reviews, required } => {
                prop_assert!(reviews.len() < min);
                prop_assert_eq!(total_reviews, reviews.len());
                prop_assert_eq!(required, min);
            }
        }
    }

    #[test]
    fn prop_heuristic_bounds_stay_on_percentage_scale(fairness in 1.0f64..=5.0f64) {
        let table = fairness_adjusted_table(fairness);
        prop_assert_eq!(table.bands.len(), 8);
        for band in &table.bands {
            prop_assert!((0..=100).contains(&band.lower));
            prop_assert!((0..=100).contains(&band.upper));
            prop_assert!(band.lower <= band.upper);
        }
    }
}
