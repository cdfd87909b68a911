//! Review submission, editing, voting and the course review feed.
//!
//! A review and its tag links are two writes. If linking fails after the
//! review row exists, the review is kept without tags and a warning is
//! logged. The optional survival guide never lands on the review directly;
//! it is queued for moderation.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use review_core::{
    plan_toggle, validate_review, ReviewDraft, ValidReview, ValidationErrors, VoteAction, VoteCounts,
    VoteType,
};

use super::{catalog, moderation, ServiceError, ServiceResult};
use crate::models::{NewReview, Review, ReviewUpdate, ReviewView, Tag};
use crate::store::{ContentStore, ReviewQuery, StoreError};

/// Body of a create or edit request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewInput {
    pub instructor_id: Option<Uuid>,
    #[serde(flatten)]
    pub draft: ReviewDraft,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmittedReview {
    pub review: ReviewView,
    /// True when a survival guide was queued for moderation.
    pub survival_guide_pending: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub action: &'static str,
    /// The caller's vote after the toggle.
    pub vote_type: Option<VoteType>,
    pub votes: VoteCounts,
}

// ==================== Feed ====================

/// Attaches instructor, tags, vote counts and the viewer's vote.
pub(crate) async fn build_views(
    store: &dyn ContentStore,
    reviews: Vec<Review>,
    viewer: Option<Uuid>,
) -> ServiceResult<Vec<ReviewView>> {
    if reviews.is_empty() {
        return Ok(Vec::new());
    }
    let review_ids: Vec<Uuid> = reviews.iter().map(|r| r.id).collect();

    let mut tags: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for (review_id, tag) in store.review_tags(&review_ids).await? {
        tags.entry(review_id).or_default().push(tag);
    }

    let votes = store.list_votes(&review_ids).await?;
    let mut counts: HashMap<Uuid, VoteCounts> = HashMap::new();
    let mut viewer_votes: HashMap<Uuid, VoteType> = HashMap::new();
    for vote in votes {
        counts.entry(vote.review_id).or_default().increment(vote.vote_type);
        if Some(vote.user_id) == viewer {
            viewer_votes.insert(vote.review_id, vote.vote_type);
        }
    }

    let instructor_ids: HashSet<Uuid> = reviews.iter().filter_map(|r| r.instructor_id).collect();
    let mut instructors = HashMap::new();
    for id in instructor_ids {
        if let Some(instructor) = store.get_instructor(id).await? {
            instructors.insert(id, instructor);
        }
    }

    Ok(reviews
        .into_iter()
        .map(|review| ReviewView {
            instructor: review
                .instructor_id
                .and_then(|id| instructors.get(&id).cloned()),
            tags: tags.remove(&review.id).unwrap_or_default(),
            votes: counts.remove(&review.id).unwrap_or_default(),
            user_vote: viewer_votes.remove(&review.id),
            review,
        })
        .collect())
}

/// Visible reviews of a course, newest first.
pub async fn course_reviews(
    store: &dyn ContentStore,
    course_id: Uuid,
    viewer: Option<Uuid>,
) -> ServiceResult<Vec<ReviewView>> {
    catalog::require_course(store, course_id).await?;
    let reviews = store
        .list_reviews(&ReviewQuery::visible_for_course(course_id))
        .await?;
    build_views(store, reviews, viewer).await
}

/// The caller's own review of the course, hidden or not.
pub async fn my_review(
    store: &dyn ContentStore,
    user_id: Uuid,
    course_id: Uuid,
) -> ServiceResult<Option<ReviewView>> {
    let reviews = store
        .list_reviews(&ReviewQuery {
            course_ids: Some(vec![course_id]),
            user_id: Some(user_id),
            include_hidden: true,
        })
        .await?;
    Ok(build_views(store, reviews, Some(user_id)).await?.into_iter().next())
}

// ==================== Writes ====================

async fn check_references(
    store: &dyn ContentStore,
    instructor_id: Option<Uuid>,
    tag_ids: &[Uuid],
) -> ServiceResult<Vec<Uuid>> {
    if let Some(id) = instructor_id {
        store
            .get_instructor(id)
            .await?
            .ok_or(ServiceError::NotFound("instructor"))?;
    }

    let mut unique = Vec::with_capacity(tag_ids.len());
    for id in tag_ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }
    if unique.is_empty() {
        return Ok(unique);
    }
    let known: HashSet<Uuid> = store.list_tags().await?.into_iter().map(|t| t.id).collect();
    if let Some(missing) = unique.iter().find(|id| !known.contains(id)) {
        return Err(ValidationErrors::single("tag_ids", format!("unknown tag {missing}")).into());
    }
    Ok(unique)
}

async fn link_tags(store: &dyn ContentStore, review_id: Uuid, tag_ids: &[Uuid]) {
    if let Err(err) = store.replace_review_tags(review_id, tag_ids).await {
        tracing::warn!(
            review_id = %review_id,
            tag_count = tag_ids.len(),
            error = %err,
            "Review saved but tag links failed"
        );
    }
}

async fn queue_guide(store: &dyn ContentStore, user_id: Uuid, course_id: Uuid, text: &str) -> bool {
    match moderation::submit_survival_guide(store, user_id, course_id, text).await {
        Ok(guide) => {
            tracing::info!(guide_id = %guide.id, course_id = %course_id, "Survival guide queued");
            true
        }
        Err(err) => {
            tracing::warn!(course_id = %course_id, error = %err, "Failed to queue survival guide");
            false
        }
    }
}

pub async fn create_review(
    store: &dyn ContentStore,
    user_id: Uuid,
    course_id: Uuid,
    input: ReviewInput,
) -> ServiceResult<SubmittedReview> {
    let ValidReview {
        scores,
        comment,
        survival_guide,
    } = validate_review(input.draft)?;
    catalog::require_course(store, course_id).await?;
    let tag_ids = check_references(store, input.instructor_id, &input.tag_ids).await?;

    let review = store
        .insert_review(NewReview {
            user_id,
            course_id,
            instructor_id: input.instructor_id,
            scores,
            comment,
        })
        .await
        .map_err(|err| match err {
            StoreError::Conflict(_) => {
                ServiceError::Conflict("You have already reviewed this course".to_string())
            }
            other => other.into(),
        })?;
    tracing::info!(review_id = %review.id, course_id = %course_id, "Review created");

    if !tag_ids.is_empty() {
        link_tags(store, review.id, &tag_ids).await;
    }
    let survival_guide_pending = match survival_guide.as_deref() {
        Some(text) => queue_guide(store, user_id, course_id, text).await,
        None => false,
    };

    let view = build_views(store, vec![review], Some(user_id))
        .await?
        .into_iter()
        .next()
        .ok_or(ServiceError::NotFound("review"))?;
    Ok(SubmittedReview {
        review: view,
        survival_guide_pending,
    })
}

async fn owned_review(store: &dyn ContentStore, user_id: Uuid, review_id: Uuid) -> ServiceResult<Review> {
    let review = store
        .get_review(review_id)
        .await?
        .ok_or(ServiceError::NotFound("review"))?;
    if review.user_id != user_id {
        return Err(ServiceError::Forbidden(
            "Only the author can change this review".to_string(),
        ));
    }
    Ok(review)
}

/// Owner edit; replaces ratings, comment, instructor and tag links.
pub async fn update_review(
    store: &dyn ContentStore,
    user_id: Uuid,
    review_id: Uuid,
    input: ReviewInput,
) -> ServiceResult<SubmittedReview> {
    let existing = owned_review(store, user_id, review_id).await?;
    let ValidReview {
        scores,
        comment,
        survival_guide,
    } = validate_review(input.draft)?;
    let tag_ids = check_references(store, input.instructor_id, &input.tag_ids).await?;

    let review = store
        .update_review(
            review_id,
            ReviewUpdate {
                instructor_id: input.instructor_id,
                scores,
                comment,
            },
        )
        .await?
        .ok_or(ServiceError::NotFound("review"))?;

    link_tags(store, review.id, &tag_ids).await;
    let survival_guide_pending = match survival_guide.as_deref() {
        Some(text) if existing.survival_guide.as_deref() != Some(text) => {
            queue_guide(store, user_id, existing.course_id, text).await
        }
        _ => false,
    };

    let view = build_views(store, vec![review], Some(user_id))
        .await?
        .into_iter()
        .next()
        .ok_or(ServiceError::NotFound("review"))?;
    Ok(SubmittedReview {
        review: view,
        survival_guide_pending,
    })
}

pub async fn delete_review(store: &dyn ContentStore, user_id: Uuid, review_id: Uuid) -> ServiceResult<()> {
    owned_review(store, user_id, review_id).await?;
    if !store.delete_review(review_id).await? {
        return Err(ServiceError::NotFound("review"));
    }
    tracing::info!(review_id = %review_id, "Review deleted by author");
    Ok(())
}

// ==================== Votes ====================

/// Same vote again removes it; a different vote replaces it.
pub async fn toggle_vote(
    store: &dyn ContentStore,
    user_id: Uuid,
    review_id: Uuid,
    requested: VoteType,
) -> ServiceResult<VoteOutcome> {
    store
        .get_review(review_id)
        .await?
        .ok_or(ServiceError::NotFound("review"))?;

    let existing = store.find_vote(review_id, user_id).await?;
    let action = plan_toggle(existing.as_ref().map(|v| v.vote_type), requested);
    match (&action, existing) {
        (VoteAction::Added, _) => {
            store
                .insert_vote(review_id, user_id, requested)
                .await
                .map_err(|err| match err {
                    StoreError::Conflict(_) => {
                        ServiceError::Conflict("Vote changed concurrently, retry".to_string())
                    }
                    other => other.into(),
                })?;
        }
        (VoteAction::Changed { .. }, Some(vote)) => {
            store.update_vote(vote.id, requested).await?;
        }
        (VoteAction::Removed, Some(vote)) => {
            store.delete_vote(vote.id).await?;
        }
        (_, None) => return Err(ServiceError::NotFound("vote")),
    }

    let votes = VoteCounts::from_votes(
        store
            .list_votes(&[review_id])
            .await?
            .into_iter()
            .map(|v| v.vote_type),
    );
    let vote_type = match action {
        VoteAction::Removed => None,
        _ => Some(requested),
    };
    tracing::debug!(review_id = %review_id, action = action.as_str(), "Vote toggled");

    Ok(VoteOutcome {
        action: action.as_str(),
        vote_type,
        votes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Course;
    use crate::store::MemoryStore;
    use review_core::ModerationStatus;

    fn draft() -> ReviewDraft {
        ReviewDraft {
            difficulty: Some(3),
            usefulness: Some(4),
            workload: Some(2),
            attendance: Some(5),
            material_relevance: Some(4),
            exam_predictability: Some(3),
            difficulty_value_alignment: Some("well_balanced".into()),
            midterm_format: Some("classical".into()),
            final_format: Some("test".into()),
            ..ReviewDraft::default()
        }
    }

    fn seeded() -> (MemoryStore, Course) {
        let store = MemoryStore::new();
        let faculty = store.add_faculty("Engineering", None);
        let course = store.add_course(Course::new(faculty.id, "CENG101", "Intro"));
        (store, course)
    }

    #[tokio::test]
    async fn survival_guide_goes_to_moderation_queue() {
        let (store, course) = seeded();
        let user = Uuid::new_v4();
        let input = ReviewInput {
            draft: ReviewDraft {
                survival_guide: Some("Start the project early".into()),
                ..draft()
            },
            ..ReviewInput::default()
        };

        let submitted = create_review(&store, user, course.id, input).await.unwrap();
        assert!(submitted.survival_guide_pending);
        assert_eq!(submitted.review.review.survival_guide, None);

        let guides = store.list_guides(Some(ModerationStatus::Pending)).await.unwrap();
        assert_eq!(guides.len(), 1);
        assert_eq!(guides[0].survival_guide, "Start the project early");
    }

    #[tokio::test]
    async fn second_review_conflicts() {
        let (store, course) = seeded();
        let user = Uuid::new_v4();
        let input = ReviewInput {
            draft: draft(),
            ..ReviewInput::default()
        };
        create_review(&store, user, course.id, input.clone()).await.unwrap();
        let err = create_review(&store, user, course.id, input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn invalid_review_writes_nothing() {
        let (store, course) = seeded();
        let input = ReviewInput {
            draft: ReviewDraft {
                attendance: Some(3),
                ..draft()
            },
            ..ReviewInput::default()
        };
        let err = create_review(&store, Uuid::new_v4(), course.id, input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(course_reviews(&store, course.id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_the_author_may_delete() {
        let (store, course) = seeded();
        let author = Uuid::new_v4();
        let input = ReviewInput {
            draft: draft(),
            ..ReviewInput::default()
        };
        let review = create_review(&store, author, course.id, input).await.unwrap().review.review;

        let err = delete_review(&store, Uuid::new_v4(), review.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        delete_review(&store, author, review.id).await.unwrap();
        assert!(store.get_review(review.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn vote_toggles_on_change_and_off() {
        let (store, course) = seeded();
        let input = ReviewInput {
            draft: draft(),
            ..ReviewInput::default()
        };
        let review = create_review(&store, Uuid::new_v4(), course.id, input)
            .await
            .unwrap()
            .review
            .review;
        let voter = Uuid::new_v4();

        let first = toggle_vote(&store, voter, review.id, VoteType::Helpful).await.unwrap();
        assert_eq!(first.action, "added");
        assert_eq!(first.votes.helpful, 1);

        let second = toggle_vote(&store, voter, review.id, VoteType::RageBait).await.unwrap();
        assert_eq!(second.action, "changed");
        assert_eq!((second.votes.helpful, second.votes.rage_bait), (0, 1));

        let third = toggle_vote(&store, voter, review.id, VoteType::RageBait).await.unwrap();
        assert_eq!(third.action, "removed");
        assert_eq!(third.vote_type, None);
        assert_eq!(third.votes.total(), 0);
    }

    #[tokio::test]
    async fn unknown_tag_is_a_validation_error() {
        let (store, course) = seeded();
        let input = ReviewInput {
            draft: draft(),
            tag_ids: vec![Uuid::new_v4()],
            ..ReviewInput::default()
        };
        let err = create_review(&store, Uuid::new_v4(), course.id, input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
