pub mod catalog;
pub mod files;
pub mod grades;
pub mod moderation;
pub mod reviews;

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use review_core::{ModerationStatus, TagType, VoteType};

use crate::db::PgStore;
use crate::models::{
    Course, CourseFile, Faculty, FacultyRequest, GradeDistributionRecord, Instructor,
    NewCourseFile, NewFacultyRequest, NewGradeDistribution, NewPendingTag, NewReport, NewReview,
    NewTag, PendingSurvivalGuide, PendingTag, PendingTagDecision, Report, ReportTarget, Review,
    ReviewUpdate, Tag, Vote,
};
use crate::store::{ContentStore, CourseQuery, FileQuery, ReviewQuery, StoreError, StoreResult};

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Reads a text column holding one of the closed wire enums.
pub(crate) fn parse_column<T>(row: &PgRow, column: &str) -> StoreResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|err: T::Err| StoreError::Corrupt(format!("{column}: {err}")))
}

pub(crate) fn map_tag(row: &PgRow) -> StoreResult<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        name_tr: row.try_get("name_tr")?,
        tag_type: parse_column(row, "type")?,
        is_verified: row.try_get("is_verified")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ContentStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(self.pool()).await?;
        Ok(())
    }

    async fn list_faculties(&self) -> StoreResult<Vec<Faculty>> {
        catalog::list_faculties(self).await
    }

    async fn get_faculty(&self, id: Uuid) -> StoreResult<Option<Faculty>> {
        catalog::get_faculty(self, id).await
    }

    async fn course_counts_by_faculty(&self) -> StoreResult<HashMap<Uuid, usize>> {
        catalog::course_counts_by_faculty(self).await
    }

    async fn list_courses(&self, query: &CourseQuery) -> StoreResult<Vec<Course>> {
        catalog::list_courses(self, query).await
    }

    async fn get_course(&self, id: Uuid) -> StoreResult<Option<Course>> {
        catalog::get_course(self, id).await
    }

    async fn get_instructor(&self, id: Uuid) -> StoreResult<Option<Instructor>> {
        catalog::get_instructor(self, id).await
    }

    async fn search_instructors(&self, term: &str, limit: usize) -> StoreResult<Vec<Instructor>> {
        catalog::search_instructors(self, term, limit).await
    }

    async fn course_instructors(&self, course_ids: &[Uuid]) -> StoreResult<Vec<(Uuid, Instructor)>> {
        catalog::course_instructors(self, course_ids).await
    }

    async fn instructor_course_ids(&self, instructor_id: Uuid) -> StoreResult<Vec<Uuid>> {
        catalog::instructor_course_ids(self, instructor_id).await
    }

    async fn list_reviews(&self, query: &ReviewQuery) -> StoreResult<Vec<Review>> {
        reviews::list_reviews(self, query).await
    }

    async fn get_review(&self, id: Uuid) -> StoreResult<Option<Review>> {
        reviews::get_review(self, id).await
    }

    async fn insert_review(&self, review: NewReview) -> StoreResult<Review> {
        reviews::insert_review(self, review).await
    }

    async fn update_review(&self, id: Uuid, update: ReviewUpdate) -> StoreResult<Option<Review>> {
        reviews::update_review(self, id, update).await
    }

    async fn delete_review(&self, id: Uuid) -> StoreResult<bool> {
        reviews::delete_review(self, id).await
    }

    async fn replace_review_tags(&self, review_id: Uuid, tag_ids: &[Uuid]) -> StoreResult<()> {
        reviews::replace_review_tags(self, review_id, tag_ids).await
    }

    async fn review_tags(&self, review_ids: &[Uuid]) -> StoreResult<Vec<(Uuid, Tag)>> {
        reviews::review_tags(self, review_ids).await
    }

    async fn set_survival_guide(&self, course_id: Uuid, user_id: Uuid, text: &str) -> StoreResult<bool> {
        reviews::set_survival_guide(self, course_id, user_id, text).await
    }

    async fn list_votes(&self, review_ids: &[Uuid]) -> StoreResult<Vec<Vote>> {
        reviews::list_votes(self, review_ids).await
    }

    async fn find_vote(&self, review_id: Uuid, user_id: Uuid) -> StoreResult<Option<Vote>> {
        reviews::find_vote(self, review_id, user_id).await
    }

    async fn insert_vote(&self, review_id: Uuid, user_id: Uuid, vote_type: VoteType) -> StoreResult<Vote> {
        reviews::insert_vote(self, review_id, user_id, vote_type).await
    }

    async fn update_vote(&self, id: Uuid, vote_type: VoteType) -> StoreResult<bool> {
        reviews::update_vote(self, id, vote_type).await
    }

    async fn delete_vote(&self, id: Uuid) -> StoreResult<bool> {
        reviews::delete_vote(self, id).await
    }

    async fn insert_report(&self, report: NewReport) -> StoreResult<Report> {
        reviews::insert_report(self, report).await
    }

    async fn list_reports(&self, target: ReportTarget) -> StoreResult<Vec<Report>> {
        reviews::list_reports(self, target).await
    }

    async fn list_files(&self, query: &FileQuery) -> StoreResult<Vec<CourseFile>> {
        files::list_files(self, query).await
    }

    async fn get_file(&self, id: Uuid) -> StoreResult<Option<CourseFile>> {
        files::get_file(self, id).await
    }

    async fn insert_file(&self, file: NewCourseFile) -> StoreResult<CourseFile> {
        files::insert_file(self, file).await
    }

    async fn mark_file_verified(&self, id: Uuid) -> StoreResult<bool> {
        files::mark_file_verified(self, id).await
    }

    async fn delete_pending_file(&self, id: Uuid) -> StoreResult<bool> {
        files::delete_pending_file(self, id).await
    }

    async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        moderation::list_tags(self).await
    }

    async fn get_tag(&self, id: Uuid) -> StoreResult<Option<Tag>> {
        moderation::get_tag(self, id).await
    }

    async fn find_tag_by_name(&self, name: &str) -> StoreResult<Option<Tag>> {
        moderation::find_tag_by_name(self, name).await
    }

    async fn insert_tag(&self, tag: NewTag) -> StoreResult<Tag> {
        moderation::insert_tag(self, tag).await
    }

    async fn update_tag(&self, id: Uuid, name: &str, tag_type: TagType) -> StoreResult<Option<Tag>> {
        moderation::update_tag(self, id, name, tag_type).await
    }

    async fn delete_tag(&self, id: Uuid) -> StoreResult<bool> {
        moderation::delete_tag(self, id).await
    }

    async fn insert_pending_tag(&self, tag: NewPendingTag) -> StoreResult<PendingTag> {
        moderation::insert_pending_tag(self, tag).await
    }

    async fn list_pending_tags(&self, status: Option<ModerationStatus>) -> StoreResult<Vec<PendingTag>> {
        moderation::list_pending_tags(self, status).await
    }

    async fn get_pending_tag(&self, id: Uuid) -> StoreResult<Option<PendingTag>> {
        moderation::get_pending_tag(self, id).await
    }

    async fn decide_pending_tag(
        &self,
        id: Uuid,
        decision: PendingTagDecision,
    ) -> StoreResult<Option<PendingTag>> {
        moderation::decide_pending_tag(self, id, decision).await
    }

    async fn find_open_guide(&self, course_id: Uuid, user_id: Uuid) -> StoreResult<Option<PendingSurvivalGuide>> {
        moderation::find_open_guide(self, course_id, user_id).await
    }

    async fn list_user_guides(&self, course_id: Uuid, user_id: Uuid) -> StoreResult<Vec<PendingSurvivalGuide>> {
        moderation::list_user_guides(self, course_id, user_id).await
    }

    async fn insert_guide(&self, course_id: Uuid, user_id: Uuid, text: &str) -> StoreResult<PendingSurvivalGuide> {
        moderation::insert_guide(self, course_id, user_id, text).await
    }

    async fn refresh_guide(&self, id: Uuid, text: &str) -> StoreResult<Option<PendingSurvivalGuide>> {
        moderation::refresh_guide(self, id, text).await
    }

    async fn list_guides(&self, status: Option<ModerationStatus>) -> StoreResult<Vec<PendingSurvivalGuide>> {
        moderation::list_guides(self, status).await
    }

    async fn get_guide(&self, id: Uuid) -> StoreResult<Option<PendingSurvivalGuide>> {
        moderation::get_guide(self, id).await
    }

    async fn decide_guide(&self, id: Uuid, status: ModerationStatus) -> StoreResult<Option<PendingSurvivalGuide>> {
        moderation::decide_guide(self, id, status).await
    }

    async fn list_grade_distributions(&self, course_id: Uuid) -> StoreResult<Vec<GradeDistributionRecord>> {
        grades::list_grade_distributions(self, course_id).await
    }

    async fn insert_grade_distribution(&self, record: NewGradeDistribution) -> StoreResult<GradeDistributionRecord> {
        grades::insert_grade_distribution(self, record).await
    }

    async fn insert_faculty_request(&self, request: NewFacultyRequest) -> StoreResult<FacultyRequest> {
        grades::insert_faculty_request(self, request).await
    }
}
