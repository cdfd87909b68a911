//! Content store
//!
//! Typed query interface over every persisted entity. Handlers and services
//! only talk to `dyn ContentStore`; `PgStore` backs it with PostgreSQL and
//! [`MemoryStore`] keeps everything in process for development and tests.
//!
//! The store performs single-entity operations only. Multi-step workflows
//! (review plus tag links, guide approval plus review update) are sequenced by
//! the service layer and are not atomic.

pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use review_core::{ModerationStatus, TagType, VoteType};

use crate::models::{
    Course, CourseFile, Faculty, FacultyRequest, GradeDistributionRecord, Instructor,
    NewCourseFile, NewFacultyRequest, NewGradeDistribution, NewPendingTag, NewReport, NewReview,
    NewTag, PendingSurvivalGuide, PendingTag, PendingTagDecision, Report, ReportTarget, Review,
    ReviewUpdate, Tag, Vote,
};

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid stored value: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Course listing filter; every field narrows the result when set.
#[derive(Debug, Clone, Default)]
pub struct CourseQuery {
    pub faculty_id: Option<Uuid>,
    pub ids: Option<Vec<Uuid>>,
    /// Case-insensitive substring of name or code
    pub search: Option<String>,
    pub course_type: Option<String>,
    pub class_type: Option<String>,
    pub semester: Option<i32>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewQuery {
    pub course_ids: Option<Vec<Uuid>>,
    pub user_id: Option<Uuid>,
    pub include_hidden: bool,
}

impl ReviewQuery {
    pub fn visible_for_course(course_id: Uuid) -> Self {
        Self {
            course_ids: Some(vec![course_id]),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileQuery {
    pub course_id: Option<Uuid>,
    pub verified: Option<bool>,
    pub include_hidden: bool,
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Cheap round trip used by readiness checks.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    // ---- faculties & courses ----
    async fn list_faculties(&self) -> StoreResult<Vec<Faculty>>;
    async fn get_faculty(&self, id: Uuid) -> StoreResult<Option<Faculty>>;
    async fn course_counts_by_faculty(&self) -> StoreResult<HashMap<Uuid, usize>>;
    async fn list_courses(&self, query: &CourseQuery) -> StoreResult<Vec<Course>>;
    async fn get_course(&self, id: Uuid) -> StoreResult<Option<Course>>;

    // ---- instructors ----
    async fn get_instructor(&self, id: Uuid) -> StoreResult<Option<Instructor>>;
    async fn search_instructors(&self, term: &str, limit: usize) -> StoreResult<Vec<Instructor>>;
    /// (course id, instructor) pairs for the given courses.
    async fn course_instructors(&self, course_ids: &[Uuid]) -> StoreResult<Vec<(Uuid, Instructor)>>;
    async fn instructor_course_ids(&self, instructor_id: Uuid) -> StoreResult<Vec<Uuid>>;

    // ---- reviews ----
    /// Newest first.
    async fn list_reviews(&self, query: &ReviewQuery) -> StoreResult<Vec<Review>>;
    async fn get_review(&self, id: Uuid) -> StoreResult<Option<Review>>;
    /// Fails with `Conflict` when the user already reviewed the course.
    async fn insert_review(&self, review: NewReview) -> StoreResult<Review>;
    async fn update_review(&self, id: Uuid, update: ReviewUpdate) -> StoreResult<Option<Review>>;
    /// Also removes the review's votes, tag links and reports.
    async fn delete_review(&self, id: Uuid) -> StoreResult<bool>;
    async fn replace_review_tags(&self, review_id: Uuid, tag_ids: &[Uuid]) -> StoreResult<()>;
    /// (review id, tag) pairs for the given reviews.
    async fn review_tags(&self, review_ids: &[Uuid]) -> StoreResult<Vec<(Uuid, Tag)>>;
    /// Writes the survival guide onto the user's review of the course.
    /// Returns false when no such review exists.
    async fn set_survival_guide(&self, course_id: Uuid, user_id: Uuid, text: &str)
        -> StoreResult<bool>;

    // ---- votes ----
    async fn list_votes(&self, review_ids: &[Uuid]) -> StoreResult<Vec<Vote>>;
    async fn find_vote(&self, review_id: Uuid, user_id: Uuid) -> StoreResult<Option<Vote>>;
    async fn insert_vote(&self, review_id: Uuid, user_id: Uuid, vote_type: VoteType)
        -> StoreResult<Vote>;
    async fn update_vote(&self, id: Uuid, vote_type: VoteType) -> StoreResult<bool>;
    async fn delete_vote(&self, id: Uuid) -> StoreResult<bool>;

    // ---- reports ----
    /// Also bumps the target's report count.
    async fn insert_report(&self, report: NewReport) -> StoreResult<Report>;
    async fn list_reports(&self, target: ReportTarget) -> StoreResult<Vec<Report>>;

    // ---- files ----
    async fn list_files(&self, query: &FileQuery) -> StoreResult<Vec<CourseFile>>;
    async fn get_file(&self, id: Uuid) -> StoreResult<Option<CourseFile>>;
    async fn insert_file(&self, file: NewCourseFile) -> StoreResult<CourseFile>;
    /// Only touches unverified files; false when none matched.
    async fn mark_file_verified(&self, id: Uuid) -> StoreResult<bool>;
    /// Only deletes unverified files; false when none matched.
    async fn delete_pending_file(&self, id: Uuid) -> StoreResult<bool>;

    // ---- tags ----
    async fn list_tags(&self) -> StoreResult<Vec<Tag>>;
    async fn get_tag(&self, id: Uuid) -> StoreResult<Option<Tag>>;
    /// Case-insensitive exact match on the name.
    async fn find_tag_by_name(&self, name: &str) -> StoreResult<Option<Tag>>;
    async fn insert_tag(&self, tag: NewTag) -> StoreResult<Tag>;
    async fn update_tag(&self, id: Uuid, name: &str, tag_type: TagType) -> StoreResult<Option<Tag>>;
    /// Removes review links first, then the tag.
    async fn delete_tag(&self, id: Uuid) -> StoreResult<bool>;

    // ---- pending tags ----
    async fn insert_pending_tag(&self, tag: NewPendingTag) -> StoreResult<PendingTag>;
    async fn list_pending_tags(&self, status: Option<ModerationStatus>) -> StoreResult<Vec<PendingTag>>;
    async fn get_pending_tag(&self, id: Uuid) -> StoreResult<Option<PendingTag>>;
    /// Applies the decision only while the suggestion is still pending.
    async fn decide_pending_tag(
        &self,
        id: Uuid,
        decision: PendingTagDecision,
    ) -> StoreResult<Option<PendingTag>>;

    // ---- pending survival guides ----
    async fn find_open_guide(&self, course_id: Uuid, user_id: Uuid)
        -> StoreResult<Option<PendingSurvivalGuide>>;
    async fn list_user_guides(&self, course_id: Uuid, user_id: Uuid)
        -> StoreResult<Vec<PendingSurvivalGuide>>;
    async fn insert_guide(&self, course_id: Uuid, user_id: Uuid, text: &str)
        -> StoreResult<PendingSurvivalGuide>;
    /// Replaces the text and bumps `created_at`.
    async fn refresh_guide(&self, id: Uuid, text: &str) -> StoreResult<Option<PendingSurvivalGuide>>;
    async fn list_guides(&self, status: Option<ModerationStatus>)
        -> StoreResult<Vec<PendingSurvivalGuide>>;
    async fn get_guide(&self, id: Uuid) -> StoreResult<Option<PendingSurvivalGuide>>;
    /// Applies the status only while the guide is still pending.
    async fn decide_guide(&self, id: Uuid, status: ModerationStatus)
        -> StoreResult<Option<PendingSurvivalGuide>>;

    // ---- grade distributions ----
    /// Newest academic year first, then semester ascending.
    async fn list_grade_distributions(&self, course_id: Uuid)
        -> StoreResult<Vec<GradeDistributionRecord>>;
    async fn insert_grade_distribution(&self, record: NewGradeDistribution)
        -> StoreResult<GradeDistributionRecord>;

    // ---- faculty requests ----
    async fn insert_faculty_request(&self, request: NewFacultyRequest) -> StoreResult<FacultyRequest>;
}
