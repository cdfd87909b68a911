use std::collections::HashMap;

use sqlx::postgres::PgRow;
use sqlx::{QueryBuilder, Row};
use uuid::Uuid;

use crate::db::PgStore;
use crate::models::{Course, Faculty, Instructor};
use crate::store::{CourseQuery, StoreResult};

pub async fn list_faculties(store: &PgStore) -> StoreResult<Vec<Faculty>> {
    let rows = sqlx::query(r#"SELECT * FROM "faculties" ORDER BY "name" ASC"#)
        .fetch_all(store.pool())
        .await?;
    rows.iter().map(map_faculty).collect()
}

pub async fn get_faculty(store: &PgStore, id: Uuid) -> StoreResult<Option<Faculty>> {
    let row = sqlx::query(r#"SELECT * FROM "faculties" WHERE "id" = $1 LIMIT 1"#)
        .bind(id)
        .fetch_optional(store.pool())
        .await?;
    row.as_ref().map(map_faculty).transpose()
}

pub async fn course_counts_by_faculty(store: &PgStore) -> StoreResult<HashMap<Uuid, usize>> {
    let rows = sqlx::query(
        r#"SELECT "faculty_id", COUNT(*) AS "count" FROM "courses" GROUP BY "faculty_id""#,
    )
    .fetch_all(store.pool())
    .await?;

    let mut counts = HashMap::with_capacity(rows.len());
    for row in rows {
        let faculty_id: Uuid = row.try_get("faculty_id")?;
        let count: i64 = row.try_get("count")?;
        counts.insert(faculty_id, count.max(0) as usize);
    }
    Ok(counts)
}

pub async fn list_courses(store: &PgStore, query: &CourseQuery) -> StoreResult<Vec<Course>> {
    let mut qb = QueryBuilder::<sqlx::Postgres>::new(r#"SELECT * FROM "courses" WHERE 1=1"#);
    if let Some(faculty_id) = query.faculty_id {
        qb.push(r#" AND "faculty_id" = "#);
        qb.push_bind(faculty_id);
    }
    if let Some(ids) = &query.ids {
        qb.push(r#" AND "id" = ANY("#);
        qb.push_bind(ids.clone());
        qb.push(")");
    }
    if let Some(search) = query.search.as_deref() {
        let pattern = format!("%{}%", search);
        qb.push(r#" AND ("name" ILIKE "#);
        qb.push_bind(pattern.clone());
        qb.push(r#" OR "code" ILIKE "#);
        qb.push_bind(pattern);
        qb.push(")");
    }
    if let Some(course_type) = query.course_type.as_deref() {
        qb.push(r#" AND "course_type" = "#);
        qb.push_bind(course_type.to_string());
    }
    if let Some(class_type) = query.class_type.as_deref() {
        qb.push(r#" AND "class_type" = "#);
        qb.push_bind(class_type.to_string());
    }
    if let Some(semester) = query.semester {
        qb.push(r#" AND "semester" = "#);
        qb.push_bind(semester);
    }
    qb.push(r#" ORDER BY "code" ASC"#);
    if let Some(limit) = query.limit {
        qb.push(" LIMIT ");
        qb.push_bind(limit as i64);
    }

    let rows = qb.build().fetch_all(store.pool()).await?;
    rows.iter().map(map_course).collect()
}

pub async fn get_course(store: &PgStore, id: Uuid) -> StoreResult<Option<Course>> {
    let row = sqlx::query(r#"SELECT * FROM "courses" WHERE "id" = $1 LIMIT 1"#)
        .bind(id)
        .fetch_optional(store.pool())
        .await?;
    row.as_ref().map(map_course).transpose()
}

pub async fn get_instructor(store: &PgStore, id: Uuid) -> StoreResult<Option<Instructor>> {
    let row = sqlx::query(r#"SELECT * FROM "instructors" WHERE "id" = $1 LIMIT 1"#)
        .bind(id)
        .fetch_optional(store.pool())
        .await?;
    row.as_ref().map(map_instructor).transpose()
}

pub async fn search_instructors(
    store: &PgStore,
    term: &str,
    limit: usize,
) -> StoreResult<Vec<Instructor>> {
    let rows = sqlx::query(
        r#"SELECT * FROM "instructors" WHERE "name" ILIKE $1 ORDER BY "name" ASC LIMIT $2"#,
    )
    .bind(format!("%{}%", term))
    .bind(limit as i64)
    .fetch_all(store.pool())
    .await?;
    rows.iter().map(map_instructor).collect()
}

pub async fn course_instructors(
    store: &PgStore,
    course_ids: &[Uuid],
) -> StoreResult<Vec<(Uuid, Instructor)>> {
    if course_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query(
        r#"
        SELECT ci."course_id", i.*
        FROM "course_instructors" ci
        JOIN "instructors" i ON i."id" = ci."instructor_id"
        WHERE ci."course_id" = ANY($1)
        ORDER BY i."name" ASC
        "#,
    )
    .bind(course_ids.to_vec())
    .fetch_all(store.pool())
    .await?;

    rows.iter()
        .map(|row| -> StoreResult<(Uuid, Instructor)> {
            Ok((row.try_get("course_id")?, map_instructor(row)?))
        })
        .collect()
}

pub async fn instructor_course_ids(store: &PgStore, instructor_id: Uuid) -> StoreResult<Vec<Uuid>> {
    let ids: Vec<Uuid> = sqlx::query_scalar(
        r#"SELECT "course_id" FROM "course_instructors" WHERE "instructor_id" = $1"#,
    )
    .bind(instructor_id)
    .fetch_all(store.pool())
    .await?;
    Ok(ids)
}

fn map_faculty(row: &PgRow) -> StoreResult<Faculty> {
    Ok(Faculty {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        name_tr: row.try_get("name_tr")?,
        parent_id: row.try_get("parent_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_course(row: &PgRow) -> StoreResult<Course> {
    Ok(Course {
        id: row.try_get("id")?,
        faculty_id: row.try_get("faculty_id")?,
        name: row.try_get("name")?,
        code: row.try_get("code")?,
        credit_theory: row.try_get("credit_theory")?,
        ects: row.try_get("ects")?,
        term: row.try_get("term")?,
        semester: row.try_get("semester")?,
        course_type: row.try_get("course_type")?,
        class_type: row.try_get("class_type")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_instructor(row: &PgRow) -> StoreResult<Instructor> {
    Ok(Instructor {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        title: row.try_get("title")?,
        created_at: row.try_get("created_at")?,
    })
}
