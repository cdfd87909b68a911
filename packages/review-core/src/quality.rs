//! Overall quality score
//!
//! A single 0–5 figure (5 is best) used for course sorting, the course header
//! and instructor summaries. Difficulty and workload are inverted before they
//! are averaged with usefulness, and every caller goes through
//! [`overall_quality_score`] so the number is identical wherever it is shown.

use serde::{Deserialize, Serialize};

use crate::aggregate::CourseStats;
use crate::types::MAX_RATING;

/// `((5 - difficulty) + usefulness + (5 - workload)) / 3`
pub fn overall_quality_score(
    median_difficulty: f64,
    median_usefulness: f64,
    median_workload: f64,
) -> f64 {
    let top = f64::from(MAX_RATING);
    ((top - median_difficulty) + median_usefulness + (top - median_workload)) / 3.0
}

impl CourseStats {
    /// `None` when any of the three contributing medians is undefined.
    pub fn quality_score(&self) -> Option<f64> {
        Some(overall_quality_score(
            self.difficulty.median?,
            self.usefulness.median?,
            self.workload.median?,
        ))
    }
}

/// Sort key for course lists: courses without displayable stats rank as 0.
pub fn rating_sort_key(score: Option<f64>) -> f64 {
    score.unwrap_or(0.0)
}

/// Review-weighted summary across the courses an instructor teaches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructorRollup {
    pub course_count: usize,
    pub total_reviews: usize,
    pub weighted_difficulty: f64,
    pub weighted_usefulness: f64,
    pub weighted_workload: f64,
    pub quality_score: f64,
}

/// Weights each course's medians by its review count.
///
/// Courses missing one of the three medians are skipped. Returns `None` when
/// nothing contributes.
pub fn instructor_rollup(stats: &[CourseStats]) -> Option<InstructorRollup> {
    let mut total_reviews = 0usize;
    let mut course_count = 0usize;
    let (mut difficulty, mut usefulness, mut workload) = (0.0f64, 0.0f64, 0.0f64);

    for course in stats {
        let (Some(d), Some(u), Some(w)) = (
            course.difficulty.median,
            course.usefulness.median,
            course.workload.median,
        ) else {
            continue;
        };
        if course.total_reviews == 0 {
            continue;
        }
        let weight = course.total_reviews as f64;
        difficulty += d * weight;
        usefulness += u * weight;
        workload += w * weight;
        total_reviews += course.total_reviews;
        course_count += 1;
    }

    if total_reviews == 0 {
        return None;
    }

    let total = total_reviews as f64;
    let weighted_difficulty = difficulty / total;
    let weighted_usefulness = usefulness / total;
    let weighted_workload = workload / total;

    Some(InstructorRollup {
        course_count,
        total_reviews,
        weighted_difficulty,
        weighted_usefulness,
        weighted_workload,
        quality_score: overall_quality_score(
            weighted_difficulty,
            weighted_usefulness,
            weighted_workload,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::summarize;
    use crate::types::ReviewScores;

    fn course(total: usize, difficulty: u8, usefulness: u8, workload: u8) -> CourseStats {
        let reviews: Vec<ReviewScores> = (0..total)
            .map(|_| ReviewScores {
                difficulty: Some(difficulty),
                usefulness: Some(usefulness),
                workload: Some(workload),
                ..Default::default()
            })
            .collect();
        summarize(&reviews)
    }

    #[test]
    fn quality_score_inverts_difficulty_and_workload() {
        let score = overall_quality_score(2.0, 4.0, 2.0);
        assert!((score - 10.0 / 3.0).abs() < 1e-9);
        assert!((overall_quality_score(1.0, 5.0, 1.0) - 13.0 / 3.0).abs() < 1e-9);
        assert!((overall_quality_score(5.0, 1.0, 5.0) - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn course_stats_quality_needs_all_three_medians() {
        let stats = course(10, 2, 4, 2);
        let score = stats.quality_score().unwrap();
        assert!((score - 10.0 / 3.0).abs() < 1e-9);

        let partial = summarize(&[ReviewScores {
            difficulty: Some(2),
            usefulness: Some(4),
            ..Default::default()
        }]);
        assert_eq!(partial.quality_score(), None);
        assert_eq!(rating_sort_key(partial.quality_score()), 0.0);
    }

    #[test]
    fn rollup_weights_by_review_count() {
        let rollup = instructor_rollup(&[course(10, 2, 4, 2), course(30, 4, 2, 4)]).unwrap();
        assert_eq!(rollup.course_count, 2);
        assert_eq!(rollup.total_reviews, 40);
        assert!((rollup.weighted_difficulty - 3.5).abs() < 1e-9);
        assert!((rollup.weighted_usefulness - 2.5).abs() < 1e-9);
        assert!((rollup.weighted_workload - 3.5).abs() < 1e-9);
        let expected = overall_quality_score(3.5, 2.5, 3.5);
        assert!((rollup.quality_score - expected).abs() < 1e-9);
    }

    #[test]
    fn rollup_of_nothing_is_none() {
        assert!(instructor_rollup(&[]).is_none());
        assert!(instructor_rollup(&[summarize(&[])]).is_none());
    }
}
