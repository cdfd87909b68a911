use std::str::FromStr;

use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{QueryBuilder, Row};
use uuid::Uuid;

use review_core::{ReviewScores, VoteType};

use crate::db::PgStore;
use crate::models::{NewReport, NewReview, Report, ReportTarget, Review, ReviewUpdate, Tag, Vote};
use crate::store::{ReviewQuery, StoreError, StoreResult};

use super::{is_unique_violation, map_tag, parse_column};

pub async fn list_reviews(store: &PgStore, query: &ReviewQuery) -> StoreResult<Vec<Review>> {
    let mut qb = QueryBuilder::<sqlx::Postgres>::new(r#"SELECT * FROM "reviews" WHERE 1=1"#);
    if !query.include_hidden {
        qb.push(r#" AND "is_hidden" = FALSE"#);
    }
    if let Some(course_ids) = &query.course_ids {
        qb.push(r#" AND "course_id" = ANY("#);
        qb.push_bind(course_ids.clone());
        qb.push(")");
    }
    if let Some(user_id) = query.user_id {
        qb.push(r#" AND "user_id" = "#);
        qb.push_bind(user_id);
    }
    qb.push(r#" ORDER BY "created_at" DESC"#);

    let rows = qb.build().fetch_all(store.pool()).await?;
    rows.iter().map(map_review).collect()
}

pub async fn get_review(store: &PgStore, id: Uuid) -> StoreResult<Option<Review>> {
    let row = sqlx::query(r#"SELECT * FROM "reviews" WHERE "id" = $1 LIMIT 1"#)
        .bind(id)
        .fetch_optional(store.pool())
        .await?;
    row.as_ref().map(map_review).transpose()
}

pub async fn insert_review(store: &PgStore, review: NewReview) -> StoreResult<Review> {
    let scores = &review.scores;
    let result = sqlx::query(
        r#"
        INSERT INTO "reviews" (
            "user_id", "course_id", "instructor_id",
            "difficulty", "usefulness", "workload", "material_relevance",
            "exam_predictability", "attendance", "grading_fairness",
            "difficulty_value_alignment", "midterm_format", "final_format",
            "extra_assessments", "comment"
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING *
        "#,
    )
    .bind(review.user_id)
    .bind(review.course_id)
    .bind(review.instructor_id)
    .bind(scores.difficulty.map(i16::from))
    .bind(scores.usefulness.map(i16::from))
    .bind(scores.workload.map(i16::from))
    .bind(scores.material_relevance.map(i16::from))
    .bind(scores.exam_predictability.map(i16::from))
    .bind(scores.attendance.map(i16::from))
    .bind(scores.grading_fairness.map(i16::from))
    .bind(scores.difficulty_value_alignment.map(|v| v.as_str()))
    .bind(scores.midterm_format.map(|v| v.as_str()))
    .bind(scores.final_format.map(|v| v.as_str()))
    .bind(extra_assessment_names(scores))
    .bind(&review.comment)
    .fetch_one(store.pool())
    .await;

    match result {
        Ok(row) => map_review(&row),
        Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict(
            "user has already reviewed this course".to_string(),
        )),
        Err(err) => Err(err.into()),
    }
}

pub async fn update_review(
    store: &PgStore,
    id: Uuid,
    update: ReviewUpdate,
) -> StoreResult<Option<Review>> {
    let scores = &update.scores;
    let row = sqlx::query(
        r#"
        UPDATE "reviews" SET
            "instructor_id" = $1,
            "difficulty" = $2, "usefulness" = $3, "workload" = $4,
            "material_relevance" = $5, "exam_predictability" = $6,
            "attendance" = $7, "grading_fairness" = $8,
            "difficulty_value_alignment" = $9, "midterm_format" = $10,
            "final_format" = $11, "extra_assessments" = $12,
            "comment" = $13, "updated_at" = $14
        WHERE "id" = $15
        RETURNING *
        "#,
    )
    .bind(update.instructor_id)
    .bind(scores.difficulty.map(i16::from))
    .bind(scores.usefulness.map(i16::from))
    .bind(scores.workload.map(i16::from))
    .bind(scores.material_relevance.map(i16::from))
    .bind(scores.exam_predictability.map(i16::from))
    .bind(scores.attendance.map(i16::from))
    .bind(scores.grading_fairness.map(i16::from))
    .bind(scores.difficulty_value_alignment.map(|v| v.as_str()))
    .bind(scores.midterm_format.map(|v| v.as_str()))
    .bind(scores.final_format.map(|v| v.as_str()))
    .bind(extra_assessment_names(scores))
    .bind(&update.comment)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(store.pool())
    .await?;
    row.as_ref().map(map_review).transpose()
}

/// Votes, tag links and reports go with the review via ON DELETE CASCADE.
pub async fn delete_review(store: &PgStore, id: Uuid) -> StoreResult<bool> {
    let result = sqlx::query(r#"DELETE FROM "reviews" WHERE "id" = $1"#)
        .bind(id)
        .execute(store.pool())
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn replace_review_tags(store: &PgStore, review_id: Uuid, tag_ids: &[Uuid]) -> StoreResult<()> {
    sqlx::query(r#"DELETE FROM "review_tags" WHERE "review_id" = $1"#)
        .bind(review_id)
        .execute(store.pool())
        .await?;
    if tag_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        r#"
        INSERT INTO "review_tags" ("review_id", "tag_id")
        SELECT $1, UNNEST($2::uuid[])
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(review_id)
    .bind(tag_ids.to_vec())
    .execute(store.pool())
    .await?;
    Ok(())
}

pub async fn review_tags(store: &PgStore, review_ids: &[Uuid]) -> StoreResult<Vec<(Uuid, Tag)>> {
    if review_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query(
        r#"
        SELECT rt."review_id", t.*
        FROM "review_tags" rt
        JOIN "tags" t ON t."id" = rt."tag_id"
        WHERE rt."review_id" = ANY($1)
        "#,
    )
    .bind(review_ids.to_vec())
    .fetch_all(store.pool())
    .await?;
    rows.iter()
        .map(|row| -> StoreResult<(Uuid, Tag)> { Ok((row.try_get("review_id")?, map_tag(row)?)) })
        .collect()
}

pub async fn set_survival_guide(
    store: &PgStore,
    course_id: Uuid,
    user_id: Uuid,
    text: &str,
) -> StoreResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE "reviews" SET "survival_guide" = $1, "updated_at" = $2
        WHERE "course_id" = $3 AND "user_id" = $4
        "#,
    )
    .bind(text)
    .bind(Utc::now())
    .bind(course_id)
    .bind(user_id)
    .execute(store.pool())
    .await?;
    Ok(result.rows_affected() > 0)
}

// ==================== Votes ====================

pub async fn list_votes(store: &PgStore, review_ids: &[Uuid]) -> StoreResult<Vec<Vote>> {
    if review_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query(r#"SELECT * FROM "review_votes" WHERE "review_id" = ANY($1)"#)
        .bind(review_ids.to_vec())
        .fetch_all(store.pool())
        .await?;
    rows.iter().map(map_vote).collect()
}

pub async fn find_vote(store: &PgStore, review_id: Uuid, user_id: Uuid) -> StoreResult<Option<Vote>> {
    let row = sqlx::query(
        r#"SELECT * FROM "review_votes" WHERE "review_id" = $1 AND "user_id" = $2 LIMIT 1"#,
    )
    .bind(review_id)
    .bind(user_id)
    .fetch_optional(store.pool())
    .await?;
    row.as_ref().map(map_vote).transpose()
}

pub async fn insert_vote(
    store: &PgStore,
    review_id: Uuid,
    user_id: Uuid,
    vote_type: VoteType,
) -> StoreResult<Vote> {
    let result = sqlx::query(
        r#"
        INSERT INTO "review_votes" ("review_id", "user_id", "vote_type")
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(review_id)
    .bind(user_id)
    .bind(vote_type.as_str())
    .fetch_one(store.pool())
    .await;

    match result {
        Ok(row) => map_vote(&row),
        Err(err) if is_unique_violation(&err) => {
            Err(StoreError::Conflict("vote already exists".to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn update_vote(store: &PgStore, id: Uuid, vote_type: VoteType) -> StoreResult<bool> {
    let result = sqlx::query(r#"UPDATE "review_votes" SET "vote_type" = $1 WHERE "id" = $2"#)
        .bind(vote_type.as_str())
        .bind(id)
        .execute(store.pool())
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_vote(store: &PgStore, id: Uuid) -> StoreResult<bool> {
    let result = sqlx::query(r#"DELETE FROM "review_votes" WHERE "id" = $1"#)
        .bind(id)
        .execute(store.pool())
        .await?;
    Ok(result.rows_affected() > 0)
}

// ==================== Reports ====================

fn report_tables(target: ReportTarget) -> (&'static str, &'static str, &'static str) {
    match target {
        ReportTarget::Review => ("review_reports", "review_id", "reviews"),
        ReportTarget::File => ("file_reports", "file_id", "files"),
    }
}

pub async fn insert_report(store: &PgStore, report: NewReport) -> StoreResult<Report> {
    let (table, column, parent) = report_tables(report.target);

    let bumped = sqlx::query(&format!(
        r#"UPDATE "{parent}" SET "report_count" = "report_count" + 1 WHERE "id" = $1"#
    ))
    .bind(report.target_id)
    .execute(store.pool())
    .await?;
    if bumped.rows_affected() == 0 {
        return Err(StoreError::NotFound(match report.target {
            ReportTarget::Review => "review",
            ReportTarget::File => "file",
        }));
    }

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO "{table}" ("{column}", "reporter_id", "reason")
        VALUES ($1, $2, $3)
        RETURNING "id", "{column}" AS "target_id", "reporter_id", "reason", "created_at"
        "#
    ))
    .bind(report.target_id)
    .bind(report.reporter_id)
    .bind(&report.reason)
    .fetch_one(store.pool())
    .await?;
    map_report(&row, report.target)
}

pub async fn list_reports(store: &PgStore, target: ReportTarget) -> StoreResult<Vec<Report>> {
    let (table, column, _) = report_tables(target);
    let rows = sqlx::query(&format!(
        r#"
        SELECT "id", "{column}" AS "target_id", "reporter_id", "reason", "created_at"
        FROM "{table}"
        ORDER BY "created_at" DESC
        "#
    ))
    .fetch_all(store.pool())
    .await?;
    rows.iter().map(|row| map_report(row, target)).collect()
}

// ==================== Row mapping ====================

fn rating(row: &PgRow, column: &str) -> StoreResult<Option<u8>> {
    let raw: Option<i16> = row.try_get(column)?;
    Ok(raw.and_then(|value| u8::try_from(value).ok()))
}

/// Unrecognized categorical values read as absent.
fn lenient<T: FromStr>(row: &PgRow, column: &str) -> StoreResult<Option<T>> {
    let raw: Option<String> = row.try_get(column)?;
    Ok(raw.and_then(|value| value.parse().ok()))
}

fn extra_assessment_names(scores: &ReviewScores) -> Vec<String> {
    scores
        .extra_assessments
        .iter()
        .map(|kind| kind.as_str().to_string())
        .collect()
}

fn map_review(row: &PgRow) -> StoreResult<Review> {
    let extras: Vec<String> = row.try_get("extra_assessments")?;
    let scores = ReviewScores {
        difficulty: rating(row, "difficulty")?,
        usefulness: rating(row, "usefulness")?,
        workload: rating(row, "workload")?,
        material_relevance: rating(row, "material_relevance")?,
        exam_predictability: rating(row, "exam_predictability")?,
        attendance: rating(row, "attendance")?,
        grading_fairness: rating(row, "grading_fairness")?,
        difficulty_value_alignment: lenient(row, "difficulty_value_alignment")?,
        midterm_format: lenient(row, "midterm_format")?,
        final_format: lenient(row, "final_format")?,
        extra_assessments: extras.iter().filter_map(|value| value.parse().ok()).collect(),
    };

    Ok(Review {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        course_id: row.try_get("course_id")?,
        instructor_id: row.try_get("instructor_id")?,
        scores,
        comment: row.try_get("comment")?,
        survival_guide: row.try_get("survival_guide")?,
        report_count: row.try_get("report_count")?,
        is_hidden: row.try_get("is_hidden")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_vote(row: &PgRow) -> StoreResult<Vote> {
    Ok(Vote {
        id: row.try_get("id")?,
        review_id: row.try_get("review_id")?,
        user_id: row.try_get("user_id")?,
        vote_type: parse_column(row, "vote_type")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_report(row: &PgRow, target: ReportTarget) -> StoreResult<Report> {
    Ok(Report {
        id: row.try_get("id")?,
        target,
        target_id: row.try_get("target_id")?,
        reporter_id: row.try_get("reporter_id")?,
        reason: row.try_get("reason")?,
        created_at: row.try_get("created_at")?,
    })
}
