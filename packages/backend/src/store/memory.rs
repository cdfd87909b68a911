use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use review_core::{tag_key, ModerationStatus, TagType, VoteType};

use super::{ContentStore, CourseQuery, FileQuery, ReviewQuery, StoreError, StoreResult};
use crate::models::{
    Course, CourseFile, Faculty, FacultyRequest, GradeDistributionRecord, Instructor,
    NewCourseFile, NewFacultyRequest, NewGradeDistribution, NewPendingTag, NewReport, NewReview,
    NewTag, PendingSurvivalGuide, PendingTag, PendingTagDecision, Report, ReportTarget, Review,
    ReviewUpdate, Tag, Vote,
};

#[derive(Default)]
struct Tables {
    faculties: Vec<Faculty>,
    courses: Vec<Course>,
    instructors: Vec<Instructor>,
    course_instructors: Vec<(Uuid, Uuid)>,
    reviews: Vec<Review>,
    review_tags: Vec<(Uuid, Uuid)>,
    votes: Vec<Vote>,
    reports: Vec<Report>,
    files: Vec<CourseFile>,
    tags: Vec<Tag>,
    pending_tags: Vec<PendingTag>,
    guides: Vec<PendingSurvivalGuide>,
    grade_distributions: Vec<GradeDistributionRecord>,
    faculty_requests: Vec<FacultyRequest>,
}

/// In-process [`ContentStore`] used when no database is configured.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Newest first; ties keep the later insertion first.
fn newest_first<T: Clone>(rows: impl DoubleEndedIterator<Item = T>, key: impl Fn(&T) -> i64) -> Vec<T> {
    let mut out: Vec<T> = rows.rev().collect();
    out.sort_by_key(|row| std::cmp::Reverse(key(row)));
    out
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Catalog rows are managed outside the API (imports); these seed them.

    pub fn add_faculty(&self, name: &str, parent_id: Option<Uuid>) -> Faculty {
        let faculty = Faculty {
            id: Uuid::new_v4(),
            name: name.to_string(),
            name_tr: None,
            parent_id,
            created_at: Utc::now(),
        };
        self.tables.write().faculties.push(faculty.clone());
        faculty
    }

    pub fn add_course(&self, course: Course) -> Course {
        self.tables.write().courses.push(course.clone());
        course
    }

    pub fn add_instructor(&self, name: &str, title: Option<&str>) -> Instructor {
        let instructor = Instructor {
            id: Uuid::new_v4(),
            name: name.to_string(),
            title: title.map(str::to_string),
            created_at: Utc::now(),
        };
        self.tables.write().instructors.push(instructor.clone());
        instructor
    }

    pub fn assign_instructor(&self, course_id: Uuid, instructor_id: Uuid) {
        let mut tables = self.tables.write();
        if !tables
            .course_instructors
            .iter()
            .any(|(c, i)| *c == course_id && *i == instructor_id)
        {
            tables.course_instructors.push((course_id, instructor_id));
        }
    }

    pub fn hide_review(&self, id: Uuid) -> bool {
        let mut tables = self.tables.write();
        match tables.reviews.iter_mut().find(|r| r.id == id) {
            Some(review) => {
                review.is_hidden = true;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn list_faculties(&self) -> StoreResult<Vec<Faculty>> {
        let mut faculties = self.tables.read().faculties.clone();
        faculties.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(faculties)
    }

    async fn get_faculty(&self, id: Uuid) -> StoreResult<Option<Faculty>> {
        Ok(self.tables.read().faculties.iter().find(|f| f.id == id).cloned())
    }

    async fn course_counts_by_faculty(&self) -> StoreResult<HashMap<Uuid, usize>> {
        let mut counts = HashMap::new();
        for course in &self.tables.read().courses {
            *counts.entry(course.faculty_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn list_courses(&self, query: &CourseQuery) -> StoreResult<Vec<Course>> {
        let tables = self.tables.read();
        let mut courses: Vec<Course> = tables
            .courses
            .iter()
            .filter(|c| query.faculty_id.map_or(true, |id| c.faculty_id == id))
            .filter(|c| query.ids.as_ref().map_or(true, |ids| ids.contains(&c.id)))
            .filter(|c| {
                query
                    .search
                    .as_deref()
                    .map_or(true, |term| contains_ci(&c.name, term) || contains_ci(&c.code, term))
            })
            .filter(|c| {
                query
                    .course_type
                    .as_deref()
                    .map_or(true, |t| c.course_type.as_deref() == Some(t))
            })
            .filter(|c| {
                query
                    .class_type
                    .as_deref()
                    .map_or(true, |t| c.class_type.as_deref() == Some(t))
            })
            .filter(|c| query.semester.map_or(true, |s| c.semester == Some(s)))
            .cloned()
            .collect();
        courses.sort_by(|a, b| a.code.cmp(&b.code));
        if let Some(limit) = query.limit {
            courses.truncate(limit);
        }
        Ok(courses)
    }

    async fn get_course(&self, id: Uuid) -> StoreResult<Option<Course>> {
        Ok(self.tables.read().courses.iter().find(|c| c.id == id).cloned())
    }

    async fn get_instructor(&self, id: Uuid) -> StoreResult<Option<Instructor>> {
        Ok(self.tables.read().instructors.iter().find(|i| i.id == id).cloned())
    }

    async fn search_instructors(&self, term: &str, limit: usize) -> StoreResult<Vec<Instructor>> {
        let mut found: Vec<Instructor> = self
            .tables
            .read()
            .instructors
            .iter()
            .filter(|i| contains_ci(&i.name, term))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found.truncate(limit);
        Ok(found)
    }

    async fn course_instructors(&self, course_ids: &[Uuid]) -> StoreResult<Vec<(Uuid, Instructor)>> {
        let tables = self.tables.read();
        Ok(tables
            .course_instructors
            .iter()
            .filter(|(course_id, _)| course_ids.contains(course_id))
            .filter_map(|(course_id, instructor_id)| {
                tables
                    .instructors
                    .iter()
                    .find(|i| i.id == *instructor_id)
                    .map(|i| (*course_id, i.clone()))
            })
            .collect())
    }

    async fn instructor_course_ids(&self, instructor_id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(self
            .tables
            .read()
            .course_instructors
            .iter()
            .filter(|(_, i)| *i == instructor_id)
            .map(|(c, _)| *c)
            .collect())
    }

    async fn list_reviews(&self, query: &ReviewQuery) -> StoreResult<Vec<Review>> {
        let tables = self.tables.read();
        let rows = tables
            .reviews
            .iter()
            .filter(|r| query.include_hidden || !r.is_hidden)
            .filter(|r| {
                query
                    .course_ids
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&r.course_id))
            })
            .filter(|r| query.user_id.map_or(true, |u| r.user_id == u))
            .cloned();
        Ok(newest_first(rows.collect::<Vec<_>>().into_iter(), |r| {
            r.created_at.timestamp_nanos_opt().unwrap_or_default()
        }))
    }

    async fn get_review(&self, id: Uuid) -> StoreResult<Option<Review>> {
        Ok(self.tables.read().reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn insert_review(&self, review: NewReview) -> StoreResult<Review> {
        let mut tables = self.tables.write();
        if tables
            .reviews
            .iter()
            .any(|r| r.user_id == review.user_id && r.course_id == review.course_id)
        {
            return Err(StoreError::Conflict(
                "user has already reviewed this course".to_string(),
            ));
        }
        let now = Utc::now();
        let row = Review {
            id: Uuid::new_v4(),
            user_id: review.user_id,
            course_id: review.course_id,
            instructor_id: review.instructor_id,
            scores: review.scores,
            comment: review.comment,
            survival_guide: None,
            report_count: 0,
            is_hidden: false,
            created_at: now,
            updated_at: now,
        };
        tables.reviews.push(row.clone());
        Ok(row)
    }

    async fn update_review(&self, id: Uuid, update: ReviewUpdate) -> StoreResult<Option<Review>> {
        let mut tables = self.tables.write();
        let Some(review) = tables.reviews.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        review.instructor_id = update.instructor_id;
        review.scores = update.scores;
        review.comment = update.comment;
        review.updated_at = Utc::now();
        Ok(Some(review.clone()))
    }

    async fn delete_review(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        let before = tables.reviews.len();
        tables.reviews.retain(|r| r.id != id);
        if tables.reviews.len() == before {
            return Ok(false);
        }
        tables.votes.retain(|v| v.review_id != id);
        tables.review_tags.retain(|(r, _)| *r != id);
        tables
            .reports
            .retain(|r| !(r.target == ReportTarget::Review && r.target_id == id));
        Ok(true)
    }

    async fn replace_review_tags(&self, review_id: Uuid, tag_ids: &[Uuid]) -> StoreResult<()> {
        let mut tables = self.tables.write();
        tables.review_tags.retain(|(r, _)| *r != review_id);
        for tag_id in tag_ids {
            if !tables.tags.iter().any(|t| t.id == *tag_id) {
                return Err(StoreError::NotFound("tag"));
            }
            if !tables.review_tags.contains(&(review_id, *tag_id)) {
                tables.review_tags.push((review_id, *tag_id));
            }
        }
        Ok(())
    }

    async fn review_tags(&self, review_ids: &[Uuid]) -> StoreResult<Vec<(Uuid, Tag)>> {
        let tables = self.tables.read();
        Ok(tables
            .review_tags
            .iter()
            .filter(|(review_id, _)| review_ids.contains(review_id))
            .filter_map(|(review_id, tag_id)| {
                tables
                    .tags
                    .iter()
                    .find(|t| t.id == *tag_id)
                    .map(|t| (*review_id, t.clone()))
            })
            .collect())
    }

    async fn set_survival_guide(&self, course_id: Uuid, user_id: Uuid, text: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        match tables
            .reviews
            .iter_mut()
            .find(|r| r.course_id == course_id && r.user_id == user_id)
        {
            Some(review) => {
                review.survival_guide = Some(text.to_string());
                review.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_votes(&self, review_ids: &[Uuid]) -> StoreResult<Vec<Vote>> {
        Ok(self
            .tables
            .read()
            .votes
            .iter()
            .filter(|v| review_ids.contains(&v.review_id))
            .cloned()
            .collect())
    }

    async fn find_vote(&self, review_id: Uuid, user_id: Uuid) -> StoreResult<Option<Vote>> {
        Ok(self
            .tables
            .read()
            .votes
            .iter()
            .find(|v| v.review_id == review_id && v.user_id == user_id)
            .cloned())
    }

    async fn insert_vote(&self, review_id: Uuid, user_id: Uuid, vote_type: VoteType) -> StoreResult<Vote> {
        let mut tables = self.tables.write();
        if tables
            .votes
            .iter()
            .any(|v| v.review_id == review_id && v.user_id == user_id)
        {
            return Err(StoreError::Conflict("vote already exists".to_string()));
        }
        let vote = Vote {
            id: Uuid::new_v4(),
            review_id,
            user_id,
            vote_type,
            created_at: Utc::now(),
        };
        tables.votes.push(vote.clone());
        Ok(vote)
    }

    async fn update_vote(&self, id: Uuid, vote_type: VoteType) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        match tables.votes.iter_mut().find(|v| v.id == id) {
            Some(vote) => {
                vote.vote_type = vote_type;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_vote(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        let before = tables.votes.len();
        tables.votes.retain(|v| v.id != id);
        Ok(tables.votes.len() != before)
    }

    async fn insert_report(&self, report: NewReport) -> StoreResult<Report> {
        let mut tables = self.tables.write();
        let bumped = match report.target {
            ReportTarget::Review => tables
                .reviews
                .iter_mut()
                .find(|r| r.id == report.target_id)
                .map(|r| r.report_count += 1),
            ReportTarget::File => tables
                .files
                .iter_mut()
                .find(|f| f.id == report.target_id)
                .map(|f| f.report_count += 1),
        };
        if bumped.is_none() {
            return Err(StoreError::NotFound(match report.target {
                ReportTarget::Review => "review",
                ReportTarget::File => "file",
            }));
        }
        let row = Report {
            id: Uuid::new_v4(),
            target: report.target,
            target_id: report.target_id,
            reporter_id: report.reporter_id,
            reason: report.reason,
            created_at: Utc::now(),
        };
        tables.reports.push(row.clone());
        Ok(row)
    }

    async fn list_reports(&self, target: ReportTarget) -> StoreResult<Vec<Report>> {
        let tables = self.tables.read();
        let rows: Vec<Report> = tables
            .reports
            .iter()
            .filter(|r| r.target == target)
            .cloned()
            .collect();
        Ok(newest_first(rows.into_iter(), |r| r.created_at.timestamp_millis()))
    }

    async fn list_files(&self, query: &FileQuery) -> StoreResult<Vec<CourseFile>> {
        let tables = self.tables.read();
        let rows: Vec<CourseFile> = tables
            .files
            .iter()
            .filter(|f| query.include_hidden || !f.is_hidden)
            .filter(|f| query.course_id.map_or(true, |c| f.course_id == c))
            .filter(|f| query.verified.map_or(true, |v| f.is_verified == v))
            .cloned()
            .collect();
        Ok(newest_first(rows.into_iter(), |f| f.created_at.timestamp_millis()))
    }

    async fn get_file(&self, id: Uuid) -> StoreResult<Option<CourseFile>> {
        Ok(self.tables.read().files.iter().find(|f| f.id == id).cloned())
    }

    async fn insert_file(&self, file: NewCourseFile) -> StoreResult<CourseFile> {
        let row = CourseFile {
            id: Uuid::new_v4(),
            course_id: file.course_id,
            user_id: file.user_id,
            kind: file.kind,
            file_name: file.file_name,
            file_path: file.file_path,
            file_url: file.file_url,
            content_type: file.content_type,
            file_size: file.file_size,
            report_count: 0,
            is_hidden: false,
            is_verified: false,
            created_at: Utc::now(),
        };
        self.tables.write().files.push(row.clone());
        Ok(row)
    }

    async fn mark_file_verified(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        match tables.files.iter_mut().find(|f| f.id == id && !f.is_verified) {
            Some(file) => {
                file.is_verified = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_pending_file(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        let before = tables.files.len();
        tables.files.retain(|f| f.id != id || f.is_verified);
        if tables.files.len() == before {
            return Ok(false);
        }
        tables
            .reports
            .retain(|r| !(r.target == ReportTarget::File && r.target_id == id));
        Ok(true)
    }

    async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        let mut tags = self.tables.read().tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn get_tag(&self, id: Uuid) -> StoreResult<Option<Tag>> {
        Ok(self.tables.read().tags.iter().find(|t| t.id == id).cloned())
    }

    async fn find_tag_by_name(&self, name: &str) -> StoreResult<Option<Tag>> {
        let key = tag_key(name);
        Ok(self
            .tables
            .read()
            .tags
            .iter()
            .find(|t| tag_key(&t.name) == key)
            .cloned())
    }

    async fn insert_tag(&self, tag: NewTag) -> StoreResult<Tag> {
        let row = Tag {
            id: Uuid::new_v4(),
            name: tag.name,
            name_tr: None,
            tag_type: tag.tag_type,
            is_verified: true,
            created_by: tag.created_by,
            created_at: Utc::now(),
        };
        self.tables.write().tags.push(row.clone());
        Ok(row)
    }

    async fn update_tag(&self, id: Uuid, name: &str, tag_type: TagType) -> StoreResult<Option<Tag>> {
        let mut tables = self.tables.write();
        let Some(tag) = tables.tags.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        tag.name = name.to_string();
        tag.tag_type = tag_type;
        Ok(Some(tag.clone()))
    }

    async fn delete_tag(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        tables.review_tags.retain(|(_, t)| *t != id);
        let before = tables.tags.len();
        tables.tags.retain(|t| t.id != id);
        Ok(tables.tags.len() != before)
    }

    async fn insert_pending_tag(&self, tag: NewPendingTag) -> StoreResult<PendingTag> {
        let row = PendingTag {
            id: Uuid::new_v4(),
            course_id: tag.course_id,
            name: tag.name,
            suggested_type: tag.suggested_type,
            submitted_by: tag.submitted_by,
            status: ModerationStatus::Pending,
            created_at: Utc::now(),
            reviewed_at: None,
        };
        self.tables.write().pending_tags.push(row.clone());
        Ok(row)
    }

    async fn list_pending_tags(&self, status: Option<ModerationStatus>) -> StoreResult<Vec<PendingTag>> {
        let rows: Vec<PendingTag> = self
            .tables
            .read()
            .pending_tags
            .iter()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        Ok(newest_first(rows.into_iter(), |t| t.created_at.timestamp_millis()))
    }

    async fn get_pending_tag(&self, id: Uuid) -> StoreResult<Option<PendingTag>> {
        Ok(self
            .tables
            .read()
            .pending_tags
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn decide_pending_tag(
        &self,
        id: Uuid,
        decision: PendingTagDecision,
    ) -> StoreResult<Option<PendingTag>> {
        let mut tables = self.tables.write();
        let Some(tag) = tables
            .pending_tags
            .iter_mut()
            .find(|t| t.id == id && t.status == ModerationStatus::Pending)
        else {
            return Ok(None);
        };
        tag.status = decision.status;
        tag.name = decision.name;
        tag.suggested_type = decision.suggested_type;
        tag.reviewed_at = Some(Utc::now());
        Ok(Some(tag.clone()))
    }

    async fn find_open_guide(&self, course_id: Uuid, user_id: Uuid) -> StoreResult<Option<PendingSurvivalGuide>> {
        Ok(self
            .tables
            .read()
            .guides
            .iter()
            .find(|g| {
                g.course_id == course_id
                    && g.submitted_by == user_id
                    && g.status == ModerationStatus::Pending
            })
            .cloned())
    }

    async fn list_user_guides(&self, course_id: Uuid, user_id: Uuid) -> StoreResult<Vec<PendingSurvivalGuide>> {
        let rows: Vec<PendingSurvivalGuide> = self
            .tables
            .read()
            .guides
            .iter()
            .filter(|g| g.course_id == course_id && g.submitted_by == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows.into_iter(), |g| g.created_at.timestamp_millis()))
    }

    async fn insert_guide(&self, course_id: Uuid, user_id: Uuid, text: &str) -> StoreResult<PendingSurvivalGuide> {
        let row = PendingSurvivalGuide {
            id: Uuid::new_v4(),
            course_id,
            survival_guide: text.to_string(),
            submitted_by: user_id,
            status: ModerationStatus::Pending,
            created_at: Utc::now(),
            reviewed_at: None,
        };
        self.tables.write().guides.push(row.clone());
        Ok(row)
    }

    async fn refresh_guide(&self, id: Uuid, text: &str) -> StoreResult<Option<PendingSurvivalGuide>> {
        let mut tables = self.tables.write();
        let Some(guide) = tables.guides.iter_mut().find(|g| g.id == id) else {
            return Ok(None);
        };
        guide.survival_guide = text.to_string();
        guide.created_at = Utc::now();
        Ok(Some(guide.clone()))
    }

    async fn list_guides(&self, status: Option<ModerationStatus>) -> StoreResult<Vec<PendingSurvivalGuide>> {
        let rows: Vec<PendingSurvivalGuide> = self
            .tables
            .read()
            .guides
            .iter()
            .filter(|g| status.map_or(true, |s| g.status == s))
            .cloned()
            .collect();
        Ok(newest_first(rows.into_iter(), |g| g.created_at.timestamp_millis()))
    }

    async fn get_guide(&self, id: Uuid) -> StoreResult<Option<PendingSurvivalGuide>> {
        Ok(self.tables.read().guides.iter().find(|g| g.id == id).cloned())
    }

    async fn decide_guide(&self, id: Uuid, status: ModerationStatus) -> StoreResult<Option<PendingSurvivalGuide>> {
        let mut tables = self.tables.write();
        let Some(guide) = tables
            .guides
            .iter_mut()
            .find(|g| g.id == id && g.status == ModerationStatus::Pending)
        else {
            return Ok(None);
        };
        guide.status = status;
        guide.reviewed_at = Some(Utc::now());
        Ok(Some(guide.clone()))
    }

    async fn list_grade_distributions(&self, course_id: Uuid) -> StoreResult<Vec<GradeDistributionRecord>> {
        let mut rows: Vec<GradeDistributionRecord> = self
            .tables
            .read()
            .grade_distributions
            .iter()
            .filter(|d| d.course_id == course_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.academic_year
                .cmp(&a.academic_year)
                .then(a.semester.cmp(&b.semester))
        });
        Ok(rows)
    }

    async fn insert_grade_distribution(&self, record: NewGradeDistribution) -> StoreResult<GradeDistributionRecord> {
        let mut tables = self.tables.write();
        if tables.grade_distributions.iter().any(|d| {
            d.course_id == record.course_id
                && d.academic_year == record.academic_year
                && d.semester == record.semester
                && d.exam_type == record.exam_type
        }) {
            return Err(StoreError::Conflict(
                "grade distribution for this offering already exists".to_string(),
            ));
        }
        let row = GradeDistributionRecord {
            id: Uuid::new_v4(),
            course_id: record.course_id,
            academic_year: record.academic_year,
            semester: record.semester,
            exam_type: record.exam_type,
            bands: record.bands,
            submitted_by: record.submitted_by,
            created_at: Utc::now(),
        };
        tables.grade_distributions.push(row.clone());
        Ok(row)
    }

    async fn insert_faculty_request(&self, request: NewFacultyRequest) -> StoreResult<FacultyRequest> {
        let row = FacultyRequest {
            id: Uuid::new_v4(),
            faculty_name: request.faculty_name,
            major_name: request.major_name,
            email: request.email,
            message: request.message,
            created_at: Utc::now(),
        };
        self.tables.write().faculty_requests.push(row.clone());
        Ok(row)
    }
}
