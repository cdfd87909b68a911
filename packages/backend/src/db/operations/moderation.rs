use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use review_core::{ModerationStatus, TagType};

use crate::db::PgStore;
use crate::models::{NewPendingTag, NewTag, PendingSurvivalGuide, PendingTag, PendingTagDecision, Tag};
use crate::store::{StoreError, StoreResult};

use super::{is_unique_violation, map_tag, parse_column};

// ==================== Tags ====================

pub async fn list_tags(store: &PgStore) -> StoreResult<Vec<Tag>> {
    let rows = sqlx::query(r#"SELECT * FROM "tags" ORDER BY "name" ASC"#)
        .fetch_all(store.pool())
        .await?;
    rows.iter().map(map_tag).collect()
}

pub async fn get_tag(store: &PgStore, id: Uuid) -> StoreResult<Option<Tag>> {
    let row = sqlx::query(r#"SELECT * FROM "tags" WHERE "id" = $1 LIMIT 1"#)
        .bind(id)
        .fetch_optional(store.pool())
        .await?;
    row.as_ref().map(map_tag).transpose()
}

pub async fn find_tag_by_name(store: &PgStore, name: &str) -> StoreResult<Option<Tag>> {
    let row = sqlx::query(
        r#"SELECT * FROM "tags" WHERE LOWER(TRIM("name")) = LOWER(TRIM($1)) LIMIT 1"#,
    )
    .bind(name)
    .fetch_optional(store.pool())
    .await?;
    row.as_ref().map(map_tag).transpose()
}

pub async fn insert_tag(store: &PgStore, tag: NewTag) -> StoreResult<Tag> {
    let result = sqlx::query(
        r#"
        INSERT INTO "tags" ("name", "type", "is_verified", "created_by")
        VALUES ($1, $2, TRUE, $3)
        RETURNING *
        "#,
    )
    .bind(&tag.name)
    .bind(tag.tag_type.as_str())
    .bind(tag.created_by)
    .fetch_one(store.pool())
    .await;

    match result {
        Ok(row) => map_tag(&row),
        Err(err) if is_unique_violation(&err) => {
            Err(StoreError::Conflict(format!("tag '{}' already exists", tag.name)))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn update_tag(
    store: &PgStore,
    id: Uuid,
    name: &str,
    tag_type: TagType,
) -> StoreResult<Option<Tag>> {
    let result = sqlx::query(r#"UPDATE "tags" SET "name" = $1, "type" = $2 WHERE "id" = $3 RETURNING *"#)
        .bind(name)
        .bind(tag_type.as_str())
        .bind(id)
        .fetch_optional(store.pool())
        .await;

    match result {
        Ok(row) => row.as_ref().map(map_tag).transpose(),
        Err(err) if is_unique_violation(&err) => {
            Err(StoreError::Conflict(format!("tag '{}' already exists", name)))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn delete_tag(store: &PgStore, id: Uuid) -> StoreResult<bool> {
    sqlx::query(r#"DELETE FROM "review_tags" WHERE "tag_id" = $1"#)
        .bind(id)
        .execute(store.pool())
        .await?;
    let result = sqlx::query(r#"DELETE FROM "tags" WHERE "id" = $1"#)
        .bind(id)
        .execute(store.pool())
        .await?;
    Ok(result.rows_affected() > 0)
}

// ==================== Pending tags ====================

pub async fn insert_pending_tag(store: &PgStore, tag: NewPendingTag) -> StoreResult<PendingTag> {
    let row = sqlx::query(
        r#"
        INSERT INTO "pending_tags" ("course_id", "name", "suggested_type", "submitted_by")
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(tag.course_id)
    .bind(&tag.name)
    .bind(tag.suggested_type.as_str())
    .bind(tag.submitted_by)
    .fetch_one(store.pool())
    .await?;
    map_pending_tag(&row)
}

pub async fn list_pending_tags(
    store: &PgStore,
    status: Option<ModerationStatus>,
) -> StoreResult<Vec<PendingTag>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM "pending_tags"
        WHERE $1::text IS NULL OR "status" = $1
        ORDER BY "created_at" DESC
        "#,
    )
    .bind(status.map(|s| s.as_str()))
    .fetch_all(store.pool())
    .await?;
    rows.iter().map(map_pending_tag).collect()
}

pub async fn get_pending_tag(store: &PgStore, id: Uuid) -> StoreResult<Option<PendingTag>> {
    let row = sqlx::query(r#"SELECT * FROM "pending_tags" WHERE "id" = $1 LIMIT 1"#)
        .bind(id)
        .fetch_optional(store.pool())
        .await?;
    row.as_ref().map(map_pending_tag).transpose()
}

pub async fn decide_pending_tag(
    store: &PgStore,
    id: Uuid,
    decision: PendingTagDecision,
) -> StoreResult<Option<PendingTag>> {
    let row = sqlx::query(
        r#"
        UPDATE "pending_tags"
        SET "status" = $1, "name" = $2, "suggested_type" = $3, "reviewed_at" = $4
        WHERE "id" = $5 AND "status" = 'pending'
        RETURNING *
        "#,
    )
    .bind(decision.status.as_str())
    .bind(&decision.name)
    .bind(decision.suggested_type.as_str())
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(store.pool())
    .await?;
    row.as_ref().map(map_pending_tag).transpose()
}

// ==================== Survival guides ====================

pub async fn find_open_guide(
    store: &PgStore,
    course_id: Uuid,
    user_id: Uuid,
) -> StoreResult<Option<PendingSurvivalGuide>> {
    let row = sqlx::query(
        r#"
        SELECT * FROM "pending_survival_guides"
        WHERE "course_id" = $1 AND "submitted_by" = $2 AND "status" = 'pending'
        ORDER BY "created_at" DESC
        LIMIT 1
        "#,
    )
    .bind(course_id)
    .bind(user_id)
    .fetch_optional(store.pool())
    .await?;
    row.as_ref().map(map_guide).transpose()
}

pub async fn list_user_guides(
    store: &PgStore,
    course_id: Uuid,
    user_id: Uuid,
) -> StoreResult<Vec<PendingSurvivalGuide>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM "pending_survival_guides"
        WHERE "course_id" = $1 AND "submitted_by" = $2
        ORDER BY "created_at" DESC
        "#,
    )
    .bind(course_id)
    .bind(user_id)
    .fetch_all(store.pool())
    .await?;
    rows.iter().map(map_guide).collect()
}

pub async fn insert_guide(
    store: &PgStore,
    course_id: Uuid,
    user_id: Uuid,
    text: &str,
) -> StoreResult<PendingSurvivalGuide> {
    let row = sqlx::query(
        r#"
        INSERT INTO "pending_survival_guides" ("course_id", "survival_guide", "submitted_by")
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(course_id)
    .bind(text)
    .bind(user_id)
    .fetch_one(store.pool())
    .await?;
    map_guide(&row)
}

pub async fn refresh_guide(
    store: &PgStore,
    id: Uuid,
    text: &str,
) -> StoreResult<Option<PendingSurvivalGuide>> {
    let row = sqlx::query(
        r#"
        UPDATE "pending_survival_guides"
        SET "survival_guide" = $1, "created_at" = $2
        WHERE "id" = $3
        RETURNING *
        "#,
    )
    .bind(text)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(store.pool())
    .await?;
    row.as_ref().map(map_guide).transpose()
}

pub async fn list_guides(
    store: &PgStore,
    status: Option<ModerationStatus>,
) -> StoreResult<Vec<PendingSurvivalGuide>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM "pending_survival_guides"
        WHERE $1::text IS NULL OR "status" = $1
        ORDER BY "created_at" DESC
        "#,
    )
    .bind(status.map(|s| s.as_str()))
    .fetch_all(store.pool())
    .await?;
    rows.iter().map(map_guide).collect()
}

pub async fn get_guide(store: &PgStore, id: Uuid) -> StoreResult<Option<PendingSurvivalGuide>> {
    let row = sqlx::query(r#"SELECT * FROM "pending_survival_guides" WHERE "id" = $1 LIMIT 1"#)
        .bind(id)
        .fetch_optional(store.pool())
        .await?;
    row.as_ref().map(map_guide).transpose()
}

pub async fn decide_guide(
    store: &PgStore,
    id: Uuid,
    status: ModerationStatus,
) -> StoreResult<Option<PendingSurvivalGuide>> {
    let row = sqlx::query(
        r#"
        UPDATE "pending_survival_guides"
        SET "status" = $1, "reviewed_at" = $2
        WHERE "id" = $3 AND "status" = 'pending'
        RETURNING *
        "#,
    )
    .bind(status.as_str())
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(store.pool())
    .await?;
    row.as_ref().map(map_guide).transpose()
}

fn map_pending_tag(row: &PgRow) -> StoreResult<PendingTag> {
    Ok(PendingTag {
        id: row.try_get("id")?,
        course_id: row.try_get("course_id")?,
        name: row.try_get("name")?,
        suggested_type: parse_column(row, "suggested_type")?,
        submitted_by: row.try_get("submitted_by")?,
        status: parse_column(row, "status")?,
        created_at: row.try_get("created_at")?,
        reviewed_at: row.try_get("reviewed_at")?,
    })
}

fn map_guide(row: &PgRow) -> StoreResult<PendingSurvivalGuide> {
    Ok(PendingSurvivalGuide {
        id: row.try_get("id")?,
        course_id: row.try_get("course_id")?,
        survival_guide: row.try_get("survival_guide")?,
        submitted_by: row.try_get("submitted_by")?,
        status: parse_column(row, "status")?,
        created_at: row.try_get("created_at")?,
        reviewed_at: row.try_get("reviewed_at")?,
    })
}
