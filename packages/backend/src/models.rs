use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use review_core::{
    ExamType, FileKind, GradeBands, GradeDistribution, ModerationStatus, ReviewScores, Semester,
    TagType, VoteCounts, VoteType,
};

// ==================== Catalog ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faculty {
    pub id: Uuid,
    pub name: String,
    pub name_tr: Option<String>,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FacultySummary {
    #[serde(flatten)]
    pub faculty: Faculty,
    pub course_count: usize,
    pub child_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FacultyDetail {
    #[serde(flatten)]
    pub faculty: Faculty,
    pub parent: Option<Faculty>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub faculty_id: Uuid,
    pub name: String,
    pub code: String,
    pub credit_theory: Option<f64>,
    pub ects: Option<f64>,
    pub term: Option<String>,
    pub semester: Option<i32>,
    pub course_type: Option<String>,
    pub class_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Course {
    /// A course with only the identifying fields set.
    pub fn new(faculty_id: Uuid, code: &str, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            faculty_id,
            name: name.to_string(),
            code: code.to_string(),
            credit_theory: None,
            ects: None,
            term: None,
            semester: None,
            course_type: None,
            class_type: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instructor {
    pub id: Uuid,
    pub name: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ==================== Reviews ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub instructor_id: Option<Uuid>,
    #[serde(flatten)]
    pub scores: ReviewScores,
    pub comment: Option<String>,
    pub survival_guide: Option<String>,
    pub report_count: i32,
    pub is_hidden: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub instructor_id: Option<Uuid>,
    pub scores: ReviewScores,
    pub comment: Option<String>,
}

/// Replacement values for an owner's edit; the survival guide is never edited here.
#[derive(Debug, Clone)]
pub struct ReviewUpdate {
    pub instructor_id: Option<Uuid>,
    pub scores: ReviewScores,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: Uuid,
    pub review_id: Uuid,
    pub user_id: Uuid,
    pub vote_type: VoteType,
    pub created_at: DateTime<Utc>,
}

/// A review as shown on the course page.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: Review,
    pub instructor: Option<Instructor>,
    pub tags: Vec<Tag>,
    pub votes: VoteCounts,
    pub user_vote: Option<VoteType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportTarget {
    Review,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub target: ReportTarget,
    pub target_id: Uuid,
    pub reporter_id: Uuid,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub target: ReportTarget,
    pub target_id: Uuid,
    pub reporter_id: Uuid,
    pub reason: Option<String>,
}

// ==================== Files ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseFile {
    pub id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub file_name: String,
    pub file_path: String,
    pub file_url: String,
    pub content_type: String,
    pub file_size: i64,
    pub report_count: i32,
    pub is_hidden: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl CourseFile {
    /// Files have no status column: unverified rows are pending, verified
    /// rows approved, and rejected files are deleted.
    pub fn moderation_status(&self) -> ModerationStatus {
        if self.is_verified {
            ModerationStatus::Approved
        } else {
            ModerationStatus::Pending
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCourseFile {
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub kind: FileKind,
    pub file_name: String,
    pub file_path: String,
    pub file_url: String,
    pub content_type: String,
    pub file_size: i64,
}

// ==================== Tags ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub name_tr: Option<String>,
    #[serde(rename = "type")]
    pub tag_type: TagType,
    pub is_verified: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTag {
    pub name: String,
    pub tag_type: TagType,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTag {
    pub id: Uuid,
    pub course_id: Option<Uuid>,
    pub name: String,
    pub suggested_type: TagType,
    pub submitted_by: Uuid,
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewPendingTag {
    pub course_id: Option<Uuid>,
    pub name: String,
    pub suggested_type: TagType,
    pub submitted_by: Uuid,
}

/// Terminal decision on a pending tag, with the final name and type.
#[derive(Debug, Clone)]
pub struct PendingTagDecision {
    pub status: ModerationStatus,
    pub name: String,
    pub suggested_type: TagType,
}

// ==================== Survival guides ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSurvivalGuide {
    pub id: Uuid,
    pub course_id: Uuid,
    pub survival_guide: String,
    pub submitted_by: Uuid,
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

// ==================== Grades ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeDistributionRecord {
    pub id: Uuid,
    pub course_id: Uuid,
    pub academic_year: i32,
    pub semester: Semester,
    pub exam_type: ExamType,
    pub bands: GradeBands,
    pub submitted_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl GradeDistributionRecord {
    pub fn to_distribution(&self) -> GradeDistribution {
        GradeDistribution {
            academic_year: self.academic_year,
            semester: self.semester,
            exam_type: self.exam_type,
            submitted_at: self.created_at.timestamp_millis(),
            bands: self.bands,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewGradeDistribution {
    pub course_id: Uuid,
    pub academic_year: i32,
    pub semester: Semester,
    pub exam_type: ExamType,
    pub bands: GradeBands,
    pub submitted_by: Uuid,
}

// ==================== Faculty requests ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacultyRequest {
    pub id: Uuid,
    pub faculty_name: String,
    pub major_name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFacultyRequest {
    pub faculty_name: String,
    pub major_name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}
