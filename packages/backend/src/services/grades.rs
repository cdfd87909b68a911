use serde::Deserialize;
use uuid::Uuid;

use review_core::{
    estimate_boundaries, stats_for_display, validate_grade_bands, year_timeline, BoundaryTable,
    ExamType, GradeBands, GradeDistribution, Semester, YearScope, YearSummary,
};

use super::{catalog, ServiceError, ServiceResult};
use crate::models::{GradeDistributionRecord, NewGradeDistribution};
use crate::store::{ContentStore, StoreError};

#[derive(Debug, Clone, Deserialize)]
pub struct GradeSubmission {
    pub academic_year: i32,
    pub semester: Semester,
    pub exam_type: ExamType,
    pub bands: GradeBands,
}

/// Newest academic year first.
pub async fn list_distributions(
    store: &dyn ContentStore,
    course_id: Uuid,
) -> ServiceResult<Vec<GradeDistributionRecord>> {
    catalog::require_course(store, course_id).await?;
    Ok(store.list_grade_distributions(course_id).await?)
}

pub async fn submit_distribution(
    store: &dyn ContentStore,
    user_id: Uuid,
    course_id: Uuid,
    submission: GradeSubmission,
) -> ServiceResult<GradeDistributionRecord> {
    validate_grade_bands(submission.academic_year, &submission.bands)?;
    catalog::require_course(store, course_id).await?;

    let record = store
        .insert_grade_distribution(NewGradeDistribution {
            course_id,
            academic_year: submission.academic_year,
            semester: submission.semester,
            exam_type: submission.exam_type,
            bands: submission.bands,
            submitted_by: user_id,
        })
        .await
        .map_err(|err| match err {
            StoreError::Conflict(_) => ServiceError::Conflict(format!(
                "A {} {} distribution for {} was already submitted",
                submission.semester.as_str(),
                submission.exam_type.as_str(),
                submission.academic_year
            )),
            other => other.into(),
        })?;
    tracing::info!(
        distribution_id = %record.id,
        course_id = %course_id,
        academic_year = record.academic_year,
        "Grade distribution submitted"
    );
    Ok(record)
}

async fn distributions(store: &dyn ContentStore, course_id: Uuid) -> ServiceResult<Vec<GradeDistribution>> {
    Ok(list_distributions(store, course_id)
        .await?
        .iter()
        .map(GradeDistributionRecord::to_distribution)
        .collect())
}

/// Submitted bands for the scope when available; otherwise defaults shifted
/// by the course's average grading fairness once its stats are displayable.
pub async fn grade_boundaries(
    store: &dyn ContentStore,
    course_id: Uuid,
    year: Option<i32>,
    min_reviews: usize,
) -> ServiceResult<BoundaryTable> {
    let records = distributions(store, course_id).await?;
    let scope = year.map_or(YearScope::All, YearScope::Year);

    let scores = catalog::scores_by_course(store, &[course_id])
        .await?
        .remove(&course_id)
        .unwrap_or_default();
    let fairness = stats_for_display(&scores, min_reviews)
        .stats()
        .and_then(|stats| stats.average_grading_fairness());

    Ok(estimate_boundaries(&records, scope, fairness))
}

pub async fn grade_timeline(store: &dyn ContentStore, course_id: Uuid) -> ServiceResult<Vec<YearSummary>> {
    Ok(year_timeline(&distributions(store, course_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Course, NewReview};
    use crate::store::MemoryStore;
    use review_core::{BoundarySource, LetterGrade, ReviewScores, ScoreBand};

    fn seeded() -> (MemoryStore, Course) {
        let store = MemoryStore::new();
        let faculty = store.add_faculty("Engineering", None);
        let course = store.add_course(Course::new(faculty.id, "CENG101", "Intro"));
        (store, course)
    }

    fn submission(year: i32, aa_lower: i32) -> GradeSubmission {
        let mut bands = GradeBands::defaults();
        bands.set(LetterGrade::AA, ScoreBand { lower: aa_lower, upper: 100 });
        GradeSubmission {
            academic_year: year,
            semester: Semester::Fall,
            exam_type: ExamType::Final,
            bands,
        }
    }

    #[tokio::test]
    async fn submitted_bands_are_returned_verbatim() {
        let (store, course) = seeded();
        submit_distribution(&store, Uuid::new_v4(), course.id, submission(2023, 88))
            .await
            .unwrap();

        let table = grade_boundaries(&store, course.id, Some(2023), 10).await.unwrap();
        assert!(table.is_submitted_data());
        assert_eq!(table.band(LetterGrade::AA).map(|b| b.lower), Some(88));
    }

    #[tokio::test]
    async fn fairness_shifts_defaults_when_nothing_submitted() {
        let (store, course) = seeded();
        for _ in 0..3 {
            store
                .insert_review(NewReview {
                    user_id: Uuid::new_v4(),
                    course_id: course.id,
                    instructor_id: None,
                    scores: ReviewScores {
                        grading_fairness: Some(5),
                        ..Default::default()
                    },
                    comment: None,
                })
                .await
                .unwrap();
        }

        let table = grade_boundaries(&store, course.id, None, 3).await.unwrap();
        assert_eq!(
            table.source,
            BoundarySource::FairnessAdjusted {
                average_grading_fairness: 5.0
            }
        );
        assert_eq!(table.band(LetterGrade::AA).map(|b| b.lower), Some(78));

        // Below the display threshold the plain defaults are used.
        let table = grade_boundaries(&store, course.id, None, 10).await.unwrap();
        assert_eq!(table.source, BoundarySource::Default);
    }

    #[tokio::test]
    async fn inverted_band_is_rejected() {
        let (store, course) = seeded();
        let mut bad = submission(2023, 90);
        bad.bands.set(LetterGrade::BA, ScoreBand { lower: 89, upper: 85 });
        let err = submit_distribution(&store, Uuid::new_v4(), course.id, bad)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(list_distributions(&store, course.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn timeline_lists_years_ascending() {
        let (store, course) = seeded();
        for year in [2024, 2022] {
            submit_distribution(&store, Uuid::new_v4(), course.id, submission(year, 90))
                .await
                .unwrap();
        }
        let years: Vec<i32> = grade_timeline(&store, course.id)
            .await
            .unwrap()
            .iter()
            .map(|y| y.year)
            .collect();
        assert_eq!(years, [2022, 2024]);
    }

    #[tokio::test]
    async fn second_submission_for_same_offering_conflicts() {
        let (store, course) = seeded();
        submit_distribution(&store, Uuid::new_v4(), course.id, submission(2024, 90))
            .await
            .unwrap();

        let err = submit_distribution(&store, Uuid::new_v4(), course.id, submission(2024, 85))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let stored = list_distributions(&store, course.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].bands.get(LetterGrade::AA).lower, 90);

        let mut resit = submission(2024, 85);
        resit.exam_type = ExamType::Resit;
        submit_distribution(&store, Uuid::new_v4(), course.id, resit)
            .await
            .unwrap();
        assert_eq!(list_distributions(&store, course.id).await.unwrap().len(), 2);
    }
}
