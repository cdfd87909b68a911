use sqlx::postgres::PgRow;
use sqlx::{QueryBuilder, Row};
use uuid::Uuid;

use review_core::{GradeBands, LetterGrade, ScoreBand};

use crate::db::PgStore;
use crate::models::{FacultyRequest, GradeDistributionRecord, NewFacultyRequest, NewGradeDistribution};
use crate::store::{StoreError, StoreResult};

use super::{is_unique_violation, parse_column};

fn band_columns(grade: LetterGrade) -> (String, String) {
    let prefix = grade.as_str().to_ascii_lowercase();
    (format!("{prefix}_lower"), format!("{prefix}_upper"))
}

pub async fn list_grade_distributions(
    store: &PgStore,
    course_id: Uuid,
) -> StoreResult<Vec<GradeDistributionRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM "course_grade_distributions"
        WHERE "course_id" = $1
        ORDER BY "academic_year" DESC, "semester" ASC
        "#,
    )
    .bind(course_id)
    .fetch_all(store.pool())
    .await?;
    rows.iter().map(map_distribution).collect()
}

pub async fn insert_grade_distribution(
    store: &PgStore,
    record: NewGradeDistribution,
) -> StoreResult<GradeDistributionRecord> {
    let mut qb = QueryBuilder::<sqlx::Postgres>::new(
        r#"INSERT INTO "course_grade_distributions" ("course_id", "academic_year", "semester", "exam_type", "submitted_by""#,
    );
    for grade in LetterGrade::ALL {
        let (lower, upper) = band_columns(grade);
        qb.push(format!(r#", "{lower}", "{upper}""#));
    }
    qb.push(") VALUES (");
    {
        let mut values = qb.separated(", ");
        values.push_bind(record.course_id);
        values.push_bind(record.academic_year);
        values.push_bind(record.semester.as_str());
        values.push_bind(record.exam_type.as_str());
        values.push_bind(record.submitted_by);
        for (_, band) in record.bands.iter() {
            values.push_bind(band.lower);
            values.push_bind(band.upper);
        }
    }
    qb.push(") RETURNING *");

    match qb.build().fetch_one(store.pool()).await {
        Ok(row) => map_distribution(&row),
        Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict(format!(
            "grade distribution for {} {} {} already exists",
            record.academic_year,
            record.semester.as_str(),
            record.exam_type.as_str()
        ))),
        Err(err) => Err(err.into()),
    }
}

pub async fn insert_faculty_request(
    store: &PgStore,
    request: NewFacultyRequest,
) -> StoreResult<FacultyRequest> {
    let row = sqlx::query(
        r#"
        INSERT INTO "faculty_requests" ("faculty_name", "major_name", "email", "message")
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(&request.faculty_name)
    .bind(&request.major_name)
    .bind(&request.email)
    .bind(&request.message)
    .fetch_one(store.pool())
    .await?;

    Ok(FacultyRequest {
        id: row.try_get("id")?,
        faculty_name: row.try_get("faculty_name")?,
        major_name: row.try_get("major_name")?,
        email: row.try_get("email")?,
        message: row.try_get("message")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_distribution(row: &PgRow) -> StoreResult<GradeDistributionRecord> {
    let mut bands = GradeBands::defaults();
    for grade in LetterGrade::ALL {
        let (lower, upper) = band_columns(grade);
        bands.set(
            grade,
            ScoreBand {
                lower: row.try_get(lower.as_str())?,
                upper: row.try_get(upper.as_str())?,
            },
        );
    }

    Ok(GradeDistributionRecord {
        id: row.try_get("id")?,
        course_id: row.try_get("course_id")?,
        academic_year: row.try_get("academic_year")?,
        semester: parse_column(row, "semester")?,
        exam_type: parse_column(row, "exam_type")?,
        bands,
        submitted_by: row.try_get("submitted_by")?,
        created_at: row.try_get("created_at")?,
    })
}
