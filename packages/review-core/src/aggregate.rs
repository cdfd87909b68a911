//! Metric Aggregator
//!
//! Turns the reviews of one course into a fixed-shape [`CourseStats`]:
//! per-dimension counts, medians, means and 1–5 histograms, plus occurrence
//! counts for the categorical fields.
//!
//! Every statistic is computed over the reviews that actually carry a value
//! for that field, so rows that predate a field never drag a median toward a
//! default. The computation is pure and cheap; callers recompute on every
//! request instead of caching.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{
    is_valid_rating, Dimension, ReviewScores, MAX_RATING, MIN_RATING, UNSPECIFIED,
};

/// Statistics for one scored dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionSummary {
    /// Reviews holding a valid value for this dimension
    pub count: usize,
    /// `None` when `count == 0`
    pub median: Option<f64>,
    /// `None` when `count == 0`
    pub mean: Option<f64>,
    /// Rating value (1..=5) to number of reviews; every key is present
    pub distribution: BTreeMap<u8, usize>,
}

impl DimensionSummary {
    fn from_values(mut values: Vec<u8>) -> Self {
        let mut distribution: BTreeMap<u8, usize> =
            (MIN_RATING..=MAX_RATING).map(|rating| (rating, 0)).collect();
        for value in &values {
            *distribution.entry(*value).or_insert(0) += 1;
        }

        let mean = if values.is_empty() {
            None
        } else {
            let sum: u32 = values.iter().map(|v| u32::from(*v)).sum();
            Some(f64::from(sum) / values.len() as f64)
        };

        values.sort_unstable();
        Self {
            count: values.len(),
            median: median_of_sorted(&values),
            mean,
            distribution,
        }
    }

    /// Share of reviews holding `rating`, in percent. Zero when empty.
    pub fn percentage(&self, rating: u8) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let hits = self.distribution.get(&rating).copied().unwrap_or(0);
        hits as f64 * 100.0 / self.count as f64
    }
}

/// Aggregated statistics for a single course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseStats {
    pub total_reviews: usize,
    pub difficulty: DimensionSummary,
    pub usefulness: DimensionSummary,
    pub workload: DimensionSummary,
    pub material_relevance: DimensionSummary,
    pub exam_predictability: DimensionSummary,
    pub attendance: DimensionSummary,
    pub grading_fairness: DimensionSummary,
    /// Keyed by alignment wire name plus `"unspecified"`; sums to `total_reviews`
    pub difficulty_value_counts: BTreeMap<String, usize>,
    /// Keyed by exam format wire name plus `"unspecified"`; sums to `total_reviews`
    pub midterm_format_counts: BTreeMap<String, usize>,
    /// Keyed by exam format wire name plus `"unspecified"`; sums to `total_reviews`
    pub final_format_counts: BTreeMap<String, usize>,
    /// Multi-valued: one increment per listed assessment
    pub extra_assessment_counts: BTreeMap<String, usize>,
}

impl CourseStats {
    pub fn dimension(&self, dimension: Dimension) -> &DimensionSummary {
        match dimension {
            Dimension::Difficulty => &self.difficulty,
            Dimension::Usefulness => &self.usefulness,
            Dimension::Workload => &self.workload,
            Dimension::MaterialRelevance => &self.material_relevance,
            Dimension::ExamPredictability => &self.exam_predictability,
            Dimension::Attendance => &self.attendance,
            Dimension::GradingFairness => &self.grading_fairness,
        }
    }

    pub fn median(&self, dimension: Dimension) -> Option<f64> {
        self.dimension(dimension).median
    }

    /// Mean grading-fairness rating, the input of the heuristic grade table.
    pub fn average_grading_fairness(&self) -> Option<f64> {
        self.grading_fairness.mean
    }
}

/// Whether a course has enough reviews for its statistics to be shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatsAvailability {
    Available { stats: CourseStats },
    InsufficientData { total_reviews: usize, required: usize },
}

impl StatsAvailability {
    pub fn stats(&self) -> Option<&CourseStats> {
        match self {
            StatsAvailability::Available { stats } => Some(stats),
            StatsAvailability::InsufficientData { .. } => None,
        }
    }

    pub fn into_stats(self) -> Option<CourseStats> {
        match self {
            StatsAvailability::Available { stats } => Some(stats),
            StatsAvailability::InsufficientData { .. } => None,
        }
    }
}

/// Median of an ascending slice; mean of the two middle values for even sizes.
pub fn median_of_sorted(sorted: &[u8]) -> Option<f64> {
    let len = sorted.len();
    if len == 0 {
        return None;
    }
    let mid = len / 2;
    if len % 2 == 1 {
        Some(f64::from(sorted[mid]))
    } else {
        Some((f64::from(sorted[mid - 1]) + f64::from(sorted[mid])) / 2.0)
    }
}

/// Median of an unordered set of ratings.
pub fn median(values: &[u8]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    median_of_sorted(&sorted)
}

fn collect_dimension(reviews: &[ReviewScores], dimension: Dimension) -> DimensionSummary {
    let values: Vec<u8> = reviews
        .iter()
        .filter_map(|review| review.rating(dimension))
        .filter(|value| is_valid_rating(*value))
        .collect();
    DimensionSummary::from_values(values)
}

fn count_categorical<'a, I>(values: I, known: &[&'static str]) -> BTreeMap<String, usize>
where
    I: Iterator<Item = Option<&'a str>>,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in values {
        let key = match value {
            Some(key) if known.iter().any(|k| *k == key) => key,
            _ => UNSPECIFIED,
        };
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Aggregates the reviews of one course.
pub fn summarize(reviews: &[ReviewScores]) -> CourseStats {
    use crate::types::{DifficultyValueAlignment, ExamFormat};

    let alignment_keys: Vec<&'static str> = DifficultyValueAlignment::ALL
        .iter()
        .map(|v| v.as_str())
        .collect();
    let format_keys: Vec<&'static str> = ExamFormat::ALL.iter().map(|v| v.as_str()).collect();

    let mut extra_assessment_counts: BTreeMap<String, usize> = BTreeMap::new();
    for review in reviews {
        for assessment in &review.extra_assessments {
            *extra_assessment_counts
                .entry(assessment.as_str().to_string())
                .or_insert(0) += 1;
        }
    }

    CourseStats {
        total_reviews: reviews.len(),
        difficulty: collect_dimension(reviews, Dimension::Difficulty),
        usefulness: collect_dimension(reviews, Dimension::Usefulness),
        workload: collect_dimension(reviews, Dimension::Workload),
        material_relevance: collect_dimension(reviews, Dimension::MaterialRelevance),
        exam_predictability: collect_dimension(reviews, Dimension::ExamPredictability),
        attendance: collect_dimension(reviews, Dimension::Attendance),
        grading_fairness: collect_dimension(reviews, Dimension::GradingFairness),
        difficulty_value_counts: count_categorical(
            reviews
                .iter()
                .map(|r| r.difficulty_value_alignment.map(|v| v.as_str())),
            &alignment_keys,
        ),
        midterm_format_counts: count_categorical(
            reviews.iter().map(|r| r.midterm_format.map(|v| v.as_str())),
            &format_keys,
        ),
        final_format_counts: count_categorical(
            reviews.iter().map(|r| r.final_format.map(|v| v.as_str())),
            &format_keys,
        ),
        extra_assessment_counts,
    }
}

/// Aggregates only when the course has at least `min_reviews` reviews.
pub fn stats_for_display(reviews: &[ReviewScores], min_reviews: usize) -> StatsAvailability {
    if reviews.len() < min_reviews {
        return StatsAvailability::InsufficientData {
            total_reviews: reviews.len(),
            required: min_reviews,
        };
    }
    StatsAvailability::Available {
        stats: summarize(reviews),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DifficultyValueAlignment, ExamFormat, ExtraAssessment, MIN_REVIEWS_FOR_DISPLAY};

    fn with_difficulty(values: &[u8]) -> Vec<ReviewScores> {
        values
            .iter()
            .map(|v| ReviewScores {
                difficulty: Some(*v),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[1, 2, 3, 4, 5]), Some(3.0));
        assert_eq!(median(&[1, 2, 3, 4]), Some(2.5));
        assert_eq!(median(&[4, 1, 3, 2]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn summarize_difficulty_median() {
        let stats = summarize(&with_difficulty(&[5, 1, 3, 2, 4]));
        assert_eq!(stats.total_reviews, 5);
        assert_eq!(stats.difficulty.median, Some(3.0));
        assert_eq!(stats.difficulty.mean, Some(3.0));
    }

    #[test]
    fn missing_values_are_excluded_from_median_and_histogram() {
        let mut reviews = with_difficulty(&[2, 4]);
        reviews.push(ReviewScores::default());
        let stats = summarize(&reviews);

        assert_eq!(stats.total_reviews, 3);
        assert_eq!(stats.difficulty.count, 2);
        assert_eq!(stats.difficulty.median, Some(3.0));
        assert_eq!(stats.difficulty.distribution.values().sum::<usize>(), 2);
        assert_eq!(stats.usefulness.count, 0);
        assert_eq!(stats.usefulness.median, None);
    }

    #[test]
    fn histogram_always_has_five_keys() {
        let stats = summarize(&with_difficulty(&[5, 5]));
        let keys: Vec<u8> = stats.difficulty.distribution.keys().copied().collect();
        assert_eq!(keys, vec![1, 2, 3, 4, 5]);
        assert_eq!(stats.difficulty.distribution[&5], 2);
        assert_eq!(stats.difficulty.distribution[&1], 0);
        assert!((stats.difficulty.percentage(5) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_scale_values_are_treated_as_absent() {
        let stats = summarize(&with_difficulty(&[0, 6, 3]));
        assert_eq!(stats.difficulty.count, 1);
        assert_eq!(stats.difficulty.median, Some(3.0));
    }

    #[test]
    fn attendance_is_an_ordinary_dimension() {
        let reviews: Vec<ReviewScores> = [1u8, 5, 5]
            .iter()
            .map(|v| ReviewScores {
                attendance: Some(*v),
                ..Default::default()
            })
            .collect();
        let stats = summarize(&reviews);
        assert_eq!(stats.attendance.distribution[&5], 2);
        assert_eq!(stats.attendance.distribution[&1], 1);
        assert_eq!(stats.attendance.median, Some(5.0));
    }

    #[test]
    fn categorical_counts_include_unspecified_bucket() {
        let reviews = vec![
            ReviewScores {
                difficulty_value_alignment: Some(DifficultyValueAlignment::WellBalanced),
                midterm_format: Some(ExamFormat::Test),
                final_format: Some(ExamFormat::Classical),
                extra_assessments: vec![ExtraAssessment::Lab, ExtraAssessment::Quiz],
                ..Default::default()
            },
            ReviewScores {
                difficulty_value_alignment: Some(DifficultyValueAlignment::WellBalanced),
                midterm_format: None,
                final_format: Some(ExamFormat::Classical),
                extra_assessments: vec![ExtraAssessment::Lab],
                ..Default::default()
            },
            ReviewScores::default(),
        ];
        let stats = summarize(&reviews);

        assert_eq!(stats.difficulty_value_counts["well_balanced"], 2);
        assert_eq!(stats.difficulty_value_counts[UNSPECIFIED], 1);
        assert_eq!(stats.midterm_format_counts[UNSPECIFIED], 2);
        assert_eq!(stats.final_format_counts.values().sum::<usize>(), 3);
        assert_eq!(stats.extra_assessment_counts["lab"], 2);
        assert_eq!(stats.extra_assessment_counts["quiz"], 1);
        assert!(!stats.extra_assessment_counts.contains_key(UNSPECIFIED));
    }

    #[test]
    fn empty_input_yields_undefined_medians() {
        let stats = summarize(&[]);
        assert_eq!(stats.total_reviews, 0);
        for dimension in Dimension::ALL {
            assert_eq!(stats.median(*dimension), None);
        }
        assert!(stats.difficulty_value_counts.is_empty());
    }

    #[test]
    fn below_threshold_reports_insufficient_data() {
        let reviews: Vec<ReviewScores> = (0..9)
            .map(|_| ReviewScores {
                difficulty: Some(3),
                usefulness: Some(5),
                workload: Some(2),
                grading_fairness: Some(4),
                ..Default::default()
            })
            .collect();

        let availability = stats_for_display(&reviews, MIN_REVIEWS_FOR_DISPLAY);
        assert_eq!(
            availability,
            StatsAvailability::InsufficientData {
                total_reviews: 9,
                required: 10
            }
        );
        assert!(availability.stats().is_none());
    }

    #[test]
    fn at_threshold_stats_are_available() {
        let reviews = with_difficulty(&[1, 2, 3, 4, 5, 1, 2, 3, 4, 5]);
        let availability = stats_for_display(&reviews, MIN_REVIEWS_FOR_DISPLAY);
        let stats = availability.into_stats().expect("stats available");
        assert_eq!(stats.total_reviews, 10);
        assert_eq!(stats.difficulty.median, Some(3.0));
    }

    #[test]
    fn availability_serializes_with_status_tag() {
        let json = serde_json::to_value(StatsAvailability::InsufficientData {
            total_reviews: 3,
            required: 10,
        })
        .unwrap();
        assert_eq!(json["status"], "insufficient_data");
        assert_eq!(json["total_reviews"], 3);
    }
}
