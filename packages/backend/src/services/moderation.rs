//! Moderation queues and admin actions.
//!
//! Tag suggestions and survival guides move once from `pending` to a
//! terminal status. The store applies a decision only while the row is
//! still pending, so two admins racing on the same item cannot both win.
//! Side effects after the status change (creating the tag, copying the
//! guide onto the review) are separate writes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use review_core::{
    is_troll, validate_survival_guide, validate_tag_name, ModerationDecision, ModerationStatus,
    TagType, ValidationErrors,
};

use super::{catalog, reviews, ServiceError, ServiceResult};
use crate::models::{
    NewPendingTag, NewReport, NewTag, PendingSurvivalGuide, PendingTag, PendingTagDecision, Report,
    ReportTarget, ReviewView, Tag,
};
use crate::store::{ContentStore, FileQuery, ReviewQuery, StoreError};

const MAX_REPORT_REASON_LENGTH: usize = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct TagSuggestion {
    pub name: String,
    #[serde(rename = "type")]
    pub tag_type: TagType,
    pub course_id: Option<Uuid>,
}

/// Admin corrections applied when approving a suggestion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagOverride {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub tag_type: Option<TagType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagInput {
    pub name: String,
    #[serde(rename = "type")]
    pub tag_type: TagType,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagApproval {
    pub pending_tag: PendingTag,
    pub tag: Tag,
    /// False when an existing tag already had this name.
    pub created: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuideApproval {
    pub guide: PendingSurvivalGuide,
    pub applied_to_review: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportInput {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ModerationOverview {
    pub pending_tags: usize,
    pub pending_survival_guides: usize,
    pub pending_files: usize,
    pub review_reports: usize,
    pub file_reports: usize,
    pub troll_reviews: usize,
}

// ==================== Tag suggestions ====================

pub async fn suggest_tag(
    store: &dyn ContentStore,
    user_id: Uuid,
    suggestion: TagSuggestion,
) -> ServiceResult<PendingTag> {
    let name = validate_tag_name(&suggestion.name)?;
    if let Some(course_id) = suggestion.course_id {
        catalog::require_course(store, course_id).await?;
    }
    let pending = store
        .insert_pending_tag(NewPendingTag {
            course_id: suggestion.course_id,
            name,
            suggested_type: suggestion.tag_type,
            submitted_by: user_id,
        })
        .await?;
    tracing::info!(pending_tag_id = %pending.id, "Tag suggested");
    Ok(pending)
}

pub async fn list_pending_tags(
    store: &dyn ContentStore,
    status: Option<ModerationStatus>,
) -> ServiceResult<Vec<PendingTag>> {
    Ok(store.list_pending_tags(status).await?)
}

async fn decide_tag(
    store: &dyn ContentStore,
    id: Uuid,
    decision: ModerationDecision,
    overrides: TagOverride,
) -> ServiceResult<PendingTag> {
    let pending = store
        .get_pending_tag(id)
        .await?
        .ok_or(ServiceError::NotFound("pending tag"))?;
    let status = pending.status.decide(decision)?;

    let name = match overrides.name {
        Some(name) => validate_tag_name(&name)?,
        None => pending.name.clone(),
    };
    let suggested_type = overrides.tag_type.unwrap_or(pending.suggested_type);

    store
        .decide_pending_tag(
            id,
            PendingTagDecision {
                status,
                name,
                suggested_type,
            },
        )
        .await?
        .ok_or_else(|| ServiceError::Conflict("Tag suggestion was already decided".to_string()))
}

/// Approves a suggestion and creates the tag unless one with the same
/// name (ignoring case) already exists. The suggestion is approved either way.
pub async fn approve_pending_tag(
    store: &dyn ContentStore,
    id: Uuid,
    overrides: TagOverride,
) -> ServiceResult<TagApproval> {
    let pending_tag = decide_tag(store, id, ModerationDecision::Approve, overrides).await?;

    if let Some(existing) = store.find_tag_by_name(&pending_tag.name).await? {
        tracing::info!(
            pending_tag_id = %pending_tag.id,
            tag_id = %existing.id,
            "Approved tag suggestion matches an existing tag"
        );
        return Ok(TagApproval {
            pending_tag,
            tag: existing,
            created: false,
        });
    }

    let inserted = store
        .insert_tag(NewTag {
            name: pending_tag.name.clone(),
            tag_type: pending_tag.suggested_type,
            created_by: Some(pending_tag.submitted_by),
        })
        .await;
    match inserted {
        Ok(tag) => {
            tracing::info!(pending_tag_id = %pending_tag.id, tag_id = %tag.id, "Tag created from suggestion");
            Ok(TagApproval {
                pending_tag,
                tag,
                created: true,
            })
        }
        // Another approval created the same name in between.
        Err(StoreError::Conflict(_)) => {
            let tag = store
                .find_tag_by_name(&pending_tag.name)
                .await?
                .ok_or_else(|| ServiceError::Conflict("Tag name is already taken".to_string()))?;
            Ok(TagApproval {
                pending_tag,
                tag,
                created: false,
            })
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn reject_pending_tag(store: &dyn ContentStore, id: Uuid) -> ServiceResult<PendingTag> {
    let pending = decide_tag(store, id, ModerationDecision::Reject, TagOverride::default()).await?;
    tracing::info!(pending_tag_id = %pending.id, "Tag suggestion rejected");
    Ok(pending)
}

// ==================== Survival guides ====================

/// Queues a guide; an open guide of the same user and course is refreshed
/// instead of adding a second one.
pub async fn submit_survival_guide(
    store: &dyn ContentStore,
    user_id: Uuid,
    course_id: Uuid,
    text: &str,
) -> ServiceResult<PendingSurvivalGuide> {
    let text = validate_survival_guide(text)?;
    catalog::require_course(store, course_id).await?;

    if let Some(open) = store.find_open_guide(course_id, user_id).await? {
        return store
            .refresh_guide(open.id, &text)
            .await?
            .ok_or(ServiceError::NotFound("survival guide"));
    }
    Ok(store.insert_guide(course_id, user_id, &text).await?)
}

pub async fn my_survival_guides(
    store: &dyn ContentStore,
    user_id: Uuid,
    course_id: Uuid,
) -> ServiceResult<Vec<PendingSurvivalGuide>> {
    Ok(store.list_user_guides(course_id, user_id).await?)
}

pub async fn list_survival_guides(
    store: &dyn ContentStore,
    status: Option<ModerationStatus>,
) -> ServiceResult<Vec<PendingSurvivalGuide>> {
    Ok(store.list_guides(status).await?)
}

async fn decide_guide(
    store: &dyn ContentStore,
    id: Uuid,
    decision: ModerationDecision,
) -> ServiceResult<PendingSurvivalGuide> {
    let guide = store
        .get_guide(id)
        .await?
        .ok_or(ServiceError::NotFound("survival guide"))?;
    let status = guide.status.decide(decision)?;
    store
        .decide_guide(id, status)
        .await?
        .ok_or_else(|| ServiceError::Conflict("Survival guide was already decided".to_string()))
}

/// Approves the guide, then copies it onto the author's review of the
/// course. A missing review or a failed copy leaves the approval in place.
pub async fn approve_survival_guide(store: &dyn ContentStore, id: Uuid) -> ServiceResult<GuideApproval> {
    let guide = decide_guide(store, id, ModerationDecision::Approve).await?;

    let applied_to_review = match store
        .set_survival_guide(guide.course_id, guide.submitted_by, &guide.survival_guide)
        .await
    {
        Ok(true) => true,
        Ok(false) => {
            tracing::warn!(
                guide_id = %guide.id,
                course_id = %guide.course_id,
                "Approved survival guide has no matching review"
            );
            false
        }
        Err(err) => {
            tracing::error!(guide_id = %guide.id, error = %err, "Failed to copy survival guide onto review");
            false
        }
    };

    Ok(GuideApproval {
        guide,
        applied_to_review,
    })
}

pub async fn reject_survival_guide(
    store: &dyn ContentStore,
    id: Uuid,
) -> ServiceResult<PendingSurvivalGuide> {
    decide_guide(store, id, ModerationDecision::Reject).await
}

// ==================== Reports ====================

pub async fn submit_report(
    store: &dyn ContentStore,
    reporter_id: Uuid,
    target: ReportTarget,
    target_id: Uuid,
    input: ReportInput,
) -> ServiceResult<Report> {
    let reason = input
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    if let Some(reason) = &reason {
        if reason.chars().count() > MAX_REPORT_REASON_LENGTH {
            return Err(ValidationErrors::single(
                "reason",
                format!("must be at most {MAX_REPORT_REASON_LENGTH} characters"),
            )
            .into());
        }
    }

    let report = store
        .insert_report(NewReport {
            target,
            target_id,
            reporter_id,
            reason,
        })
        .await?;
    tracing::info!(report_id = %report.id, target = ?target, target_id = %target_id, "Content reported");
    Ok(report)
}

pub async fn list_reports(store: &dyn ContentStore, target: ReportTarget) -> ServiceResult<Vec<Report>> {
    Ok(store.list_reports(target).await?)
}

// ==================== Reviews ====================

/// Every review including hidden ones, newest first.
pub async fn all_reviews(store: &dyn ContentStore) -> ServiceResult<Vec<ReviewView>> {
    let reviews = store
        .list_reviews(&ReviewQuery {
            include_hidden: true,
            ..ReviewQuery::default()
        })
        .await?;
    reviews::build_views(store, reviews, None).await
}

/// Reviews with at least `threshold` rage-bait votes, most flagged first.
pub async fn troll_reviews(store: &dyn ContentStore, threshold: u32) -> ServiceResult<Vec<ReviewView>> {
    let mut flagged: Vec<ReviewView> = all_reviews(store)
        .await?
        .into_iter()
        .filter(|view| is_troll(&view.votes, threshold))
        .collect();
    flagged.sort_by(|a, b| b.votes.rage_bait.cmp(&a.votes.rage_bait));
    Ok(flagged)
}

pub async fn admin_delete_review(store: &dyn ContentStore, id: Uuid) -> ServiceResult<()> {
    if !store.delete_review(id).await? {
        return Err(ServiceError::NotFound("review"));
    }
    tracing::info!(review_id = %id, "Review deleted by admin");
    Ok(())
}

// ==================== Tags ====================

pub async fn list_tags(store: &dyn ContentStore) -> ServiceResult<Vec<Tag>> {
    Ok(store.list_tags().await?)
}

fn duplicate_name(name: &str) -> ServiceError {
    ServiceError::Conflict(format!("A tag named {name:?} already exists"))
}

pub async fn create_tag(store: &dyn ContentStore, input: TagInput) -> ServiceResult<Tag> {
    let name = validate_tag_name(&input.name)?;
    if store.find_tag_by_name(&name).await?.is_some() {
        return Err(duplicate_name(&name));
    }
    store
        .insert_tag(NewTag {
            name: name.clone(),
            tag_type: input.tag_type,
            created_by: None,
        })
        .await
        .map_err(|err| match err {
            StoreError::Conflict(_) => duplicate_name(&name),
            other => other.into(),
        })
}

pub async fn update_tag(store: &dyn ContentStore, id: Uuid, input: TagInput) -> ServiceResult<Tag> {
    let name = validate_tag_name(&input.name)?;
    if let Some(existing) = store.find_tag_by_name(&name).await? {
        if existing.id != id {
            return Err(duplicate_name(&name));
        }
    }
    store
        .update_tag(id, &name, input.tag_type)
        .await
        .map_err(|err| match err {
            StoreError::Conflict(_) => duplicate_name(&name),
            other => other.into(),
        })?
        .ok_or(ServiceError::NotFound("tag"))
}

pub async fn delete_tag(store: &dyn ContentStore, id: Uuid) -> ServiceResult<()> {
    if !store.delete_tag(id).await? {
        return Err(ServiceError::NotFound("tag"));
    }
    Ok(())
}

// ==================== Overview ====================

pub async fn overview(store: &dyn ContentStore, troll_threshold: u32) -> ServiceResult<ModerationOverview> {
    let pending = Some(ModerationStatus::Pending);
    Ok(ModerationOverview {
        pending_tags: store.list_pending_tags(pending).await?.len(),
        pending_survival_guides: store.list_guides(pending).await?.len(),
        pending_files: store
            .list_files(&FileQuery {
                verified: Some(false),
                include_hidden: true,
                ..FileQuery::default()
            })
            .await?
            .len(),
        review_reports: store.list_reports(ReportTarget::Review).await?.len(),
        file_reports: store.list_reports(ReportTarget::File).await?.len(),
        troll_reviews: troll_reviews(store, troll_threshold).await?.len(),
    })
}
