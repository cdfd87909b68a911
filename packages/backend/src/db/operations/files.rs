use sqlx::postgres::PgRow;
use sqlx::{QueryBuilder, Row};
use uuid::Uuid;

use crate::db::PgStore;
use crate::models::{CourseFile, NewCourseFile};
use crate::store::{FileQuery, StoreResult};

use super::parse_column;

pub async fn list_files(store: &PgStore, query: &FileQuery) -> StoreResult<Vec<CourseFile>> {
    let mut qb = QueryBuilder::<sqlx::Postgres>::new(r#"SELECT * FROM "files" WHERE 1=1"#);
    if !query.include_hidden {
        qb.push(r#" AND "is_hidden" = FALSE"#);
    }
    if let Some(course_id) = query.course_id {
        qb.push(r#" AND "course_id" = "#);
        qb.push_bind(course_id);
    }
    if let Some(verified) = query.verified {
        qb.push(r#" AND "is_verified" = "#);
        qb.push_bind(verified);
    }
    qb.push(r#" ORDER BY "created_at" DESC"#);

    let rows = qb.build().fetch_all(store.pool()).await?;
    rows.iter().map(map_file).collect()
}

pub async fn get_file(store: &PgStore, id: Uuid) -> StoreResult<Option<CourseFile>> {
    let row = sqlx::query(r#"SELECT * FROM "files" WHERE "id" = $1 LIMIT 1"#)
        .bind(id)
        .fetch_optional(store.pool())
        .await?;
    row.as_ref().map(map_file).transpose()
}

pub async fn insert_file(store: &PgStore, file: NewCourseFile) -> StoreResult<CourseFile> {
    let row = sqlx::query(
        r#"
        INSERT INTO "files" (
            "course_id", "user_id", "type", "file_name", "file_path",
            "file_url", "content_type", "file_size"
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(file.course_id)
    .bind(file.user_id)
    .bind(file.kind.as_str())
    .bind(&file.file_name)
    .bind(&file.file_path)
    .bind(&file.file_url)
    .bind(&file.content_type)
    .bind(file.file_size)
    .fetch_one(store.pool())
    .await?;
    map_file(&row)
}

pub async fn mark_file_verified(store: &PgStore, id: Uuid) -> StoreResult<bool> {
    let result = sqlx::query(
        r#"UPDATE "files" SET "is_verified" = TRUE WHERE "id" = $1 AND "is_verified" = FALSE"#,
    )
    .execute(store.pool())
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_pending_file(store: &PgStore, id: Uuid) -> StoreResult<bool> {
    let result = sqlx::query(r#"DELETE FROM "files" WHERE "id" = $1 AND "is_verified" = FALSE"#)
        .bind(id)
        .execute(store.pool())
        .await?;
    Ok(result.rows_affected() > 0)
}

fn map_file(row: &PgRow) -> StoreResult<CourseFile> {
    Ok(CourseFile {
        id: row.try_get("id")?,
        course_id: row.try_get("course_id")?,
        user_id: row.try_get("user_id")?,
        kind: parse_column(row, "type")?,
        file_name: row.try_get("file_name")?,
        file_path: row.try_get("file_path")?,
        file_url: row.try_get("file_url")?,
        content_type: row.try_get("content_type")?,
        file_size: row.try_get("file_size")?,
        report_count: row.try_get("report_count")?,
        is_hidden: row.try_get("is_hidden")?,
        is_verified: row.try_get("is_verified")?,
        created_at: row.try_get("created_at")?,
    })
}
