use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use review_core::{
    instructor_rollup, rating_sort_key, stats_for_display, CourseStats, InstructorRollup, ReviewScores,
    StatsAvailability,
};

use super::{ServiceError, ServiceResult};
use crate::models::{Course, Faculty, FacultyDetail, FacultySummary, Instructor};
use crate::store::{ContentStore, CourseQuery, ReviewQuery};

const MIN_SEARCH_LENGTH: usize = 2;
const DEFAULT_SEARCH_LIMIT: usize = 20;
const MAX_SEARCH_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseSort {
    Name,
    Code,
    #[default]
    Credits,
    Rating,
    Reviews,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub search: Option<String>,
    pub course_type: Option<String>,
    pub class_type: Option<String>,
    pub semester: Option<i32>,
    /// Case-insensitive substring of an instructor name
    pub instructor: Option<String>,
    pub has_reviews: Option<bool>,
    pub sort: CourseSort,
    pub order: SortOrder,
}

/// A course row in listings.
#[derive(Debug, Clone, Serialize)]
pub struct CourseListItem {
    #[serde(flatten)]
    pub course: Course,
    pub instructors: Vec<Instructor>,
    pub review_count: usize,
    /// Only set once the course has enough reviews for stats.
    pub quality_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub faculty: Option<Faculty>,
    pub instructors: Vec<Instructor>,
    pub review_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstructorSummary {
    #[serde(flatten)]
    pub instructor: Instructor,
    pub course_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstructorCourses {
    pub instructor: Instructor,
    pub courses: Vec<CourseListItem>,
    pub rollup: Option<InstructorRollup>,
}

// ==================== Faculties ====================

async fn faculty_summaries(store: &dyn ContentStore) -> ServiceResult<Vec<FacultySummary>> {
    let faculties = store.list_faculties().await?;
    let course_counts = store.course_counts_by_faculty().await?;

    let mut child_counts: HashMap<Uuid, usize> = HashMap::new();
    for faculty in &faculties {
        if let Some(parent) = faculty.parent_id {
            *child_counts.entry(parent).or_default() += 1;
        }
    }

    Ok(faculties
        .into_iter()
        .map(|faculty| FacultySummary {
            course_count: course_counts.get(&faculty.id).copied().unwrap_or(0),
            child_count: child_counts.get(&faculty.id).copied().unwrap_or(0),
            faculty,
        })
        .collect())
}

/// Every faculty; with `hide_empty`, those without courses or sub-units are dropped.
pub async fn list_faculties(
    store: &dyn ContentStore,
    hide_empty: bool,
) -> ServiceResult<Vec<FacultySummary>> {
    let mut summaries = faculty_summaries(store).await?;
    if hide_empty {
        summaries.retain(|s| s.course_count > 0 || s.child_count > 0);
    }
    Ok(summaries)
}

pub async fn top_level_faculties(store: &dyn ContentStore) -> ServiceResult<Vec<FacultySummary>> {
    let mut summaries = faculty_summaries(store).await?;
    summaries.retain(|s| s.faculty.parent_id.is_none());
    Ok(summaries)
}

pub async fn faculty_children(
    store: &dyn ContentStore,
    faculty_id: Uuid,
) -> ServiceResult<Vec<FacultySummary>> {
    require_faculty(store, faculty_id).await?;
    let mut summaries = faculty_summaries(store).await?;
    summaries.retain(|s| s.faculty.parent_id == Some(faculty_id));
    Ok(summaries)
}

pub async fn faculty_detail(store: &dyn ContentStore, faculty_id: Uuid) -> ServiceResult<FacultyDetail> {
    let faculty = require_faculty(store, faculty_id).await?;
    let parent = match faculty.parent_id {
        Some(parent_id) => store.get_faculty(parent_id).await?,
        None => None,
    };
    Ok(FacultyDetail { faculty, parent })
}

async fn require_faculty(store: &dyn ContentStore, faculty_id: Uuid) -> ServiceResult<Faculty> {
    store
        .get_faculty(faculty_id)
        .await?
        .ok_or(ServiceError::NotFound("faculty"))
}

pub async fn faculty_courses(
    store: &dyn ContentStore,
    faculty_id: Uuid,
    filter: CourseFilter,
    min_reviews: usize,
) -> ServiceResult<Vec<CourseListItem>> {
    require_faculty(store, faculty_id).await?;

    let query = CourseQuery {
        faculty_id: Some(faculty_id),
        search: filter.search.clone().filter(|s| !s.trim().is_empty()),
        course_type: filter.course_type.clone(),
        class_type: filter.class_type.clone(),
        semester: filter.semester,
        ..CourseQuery::default()
    };
    let courses = store.list_courses(&query).await?;
    let mut items = list_items(store, courses, min_reviews).await?;

    if let Some(needle) = filter
        .instructor
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let needle = needle.to_lowercase();
        items.retain(|item| {
            item.instructors
                .iter()
                .any(|i| i.name.to_lowercase().contains(&needle))
        });
    }
    match filter.has_reviews {
        Some(true) => items.retain(|item| item.review_count > 0),
        Some(false) => items.retain(|item| item.review_count == 0),
        None => {}
    }

    sort_courses(&mut items, filter.sort, filter.order);
    Ok(items)
}

fn sort_courses(items: &mut [CourseListItem], sort: CourseSort, order: SortOrder) {
    items.sort_by(|a, b| {
        let ordering = match sort {
            CourseSort::Name => a.course.name.to_lowercase().cmp(&b.course.name.to_lowercase()),
            CourseSort::Code => a.course.code.cmp(&b.course.code),
            CourseSort::Credits => a
                .course
                .credit_theory
                .unwrap_or(0.0)
                .total_cmp(&b.course.credit_theory.unwrap_or(0.0)),
            CourseSort::Rating => {
                rating_sort_key(a.quality_score).total_cmp(&rating_sort_key(b.quality_score))
            }
            CourseSort::Reviews => a.review_count.cmp(&b.review_count),
        };
        let ordering = match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        // Stable tie-break on code.
        if ordering == Ordering::Equal {
            a.course.code.cmp(&b.course.code)
        } else {
            ordering
        }
    });
}

/// Instructors teaching in the faculty, one entry each, by name.
pub async fn faculty_instructors(
    store: &dyn ContentStore,
    faculty_id: Uuid,
) -> ServiceResult<Vec<InstructorSummary>> {
    require_faculty(store, faculty_id).await?;

    let courses = store
        .list_courses(&CourseQuery {
            faculty_id: Some(faculty_id),
            ..CourseQuery::default()
        })
        .await?;
    let course_ids: Vec<Uuid> = courses.iter().map(|c| c.id).collect();
    let pairs = store.course_instructors(&course_ids).await?;

    let mut by_id: HashMap<Uuid, (Instructor, HashSet<Uuid>)> = HashMap::new();
    for (course_id, instructor) in pairs {
        by_id
            .entry(instructor.id)
            .or_insert_with(|| (instructor, HashSet::new()))
            .1
            .insert(course_id);
    }

    let mut summaries: Vec<InstructorSummary> = by_id
        .into_values()
        .map(|(instructor, courses)| InstructorSummary {
            instructor,
            course_count: courses.len(),
        })
        .collect();
    summaries.sort_by(|a, b| a.instructor.name.cmp(&b.instructor.name));
    Ok(summaries)
}

// ==================== Courses ====================

/// Visible review scores per course.
pub(crate) async fn scores_by_course(
    store: &dyn ContentStore,
    course_ids: &[Uuid],
) -> ServiceResult<HashMap<Uuid, Vec<ReviewScores>>> {
    let mut grouped: HashMap<Uuid, Vec<ReviewScores>> = HashMap::new();
    if course_ids.is_empty() {
        return Ok(grouped);
    }
    let reviews = store
        .list_reviews(&ReviewQuery {
            course_ids: Some(course_ids.to_vec()),
            ..ReviewQuery::default()
        })
        .await?;
    for review in reviews {
        grouped.entry(review.course_id).or_default().push(review.scores);
    }
    Ok(grouped)
}

async fn instructors_by_course(
    store: &dyn ContentStore,
    course_ids: &[Uuid],
) -> ServiceResult<HashMap<Uuid, Vec<Instructor>>> {
    let mut grouped: HashMap<Uuid, Vec<Instructor>> = HashMap::new();
    if course_ids.is_empty() {
        return Ok(grouped);
    }
    for (course_id, instructor) in store.course_instructors(course_ids).await? {
        grouped.entry(course_id).or_default().push(instructor);
    }
    Ok(grouped)
}

async fn list_items(
    store: &dyn ContentStore,
    courses: Vec<Course>,
    min_reviews: usize,
) -> ServiceResult<Vec<CourseListItem>> {
    let course_ids: Vec<Uuid> = courses.iter().map(|c| c.id).collect();
    let mut scores = scores_by_course(store, &course_ids).await?;
    let mut instructors = instructors_by_course(store, &course_ids).await?;

    Ok(courses
        .into_iter()
        .map(|course| {
            let reviews = scores.remove(&course.id).unwrap_or_default();
            let quality_score = stats_for_display(&reviews, min_reviews)
                .stats()
                .and_then(CourseStats::quality_score);
            CourseListItem {
                instructors: instructors.remove(&course.id).unwrap_or_default(),
                review_count: reviews.len(),
                quality_score,
                course,
            }
        })
        .collect())
}

/// Name/code search; terms shorter than two characters return nothing.
pub async fn search_courses(
    store: &dyn ContentStore,
    term: &str,
    limit: Option<usize>,
) -> ServiceResult<Vec<Course>> {
    let term = term.trim();
    if term.chars().count() < MIN_SEARCH_LENGTH {
        return Ok(Vec::new());
    }
    let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);
    Ok(store
        .list_courses(&CourseQuery {
            search: Some(term.to_string()),
            limit: Some(limit),
            ..CourseQuery::default()
        })
        .await?)
}

pub(crate) async fn require_course(store: &dyn ContentStore, course_id: Uuid) -> ServiceResult<Course> {
    store
        .get_course(course_id)
        .await?
        .ok_or(ServiceError::NotFound("course"))
}

pub async fn course_detail(store: &dyn ContentStore, course_id: Uuid) -> ServiceResult<CourseDetail> {
    let course = require_course(store, course_id).await?;
    let faculty = store.get_faculty(course.faculty_id).await?;
    let instructors = store
        .course_instructors(&[course_id])
        .await?
        .into_iter()
        .map(|(_, instructor)| instructor)
        .collect();
    let review_count = store
        .list_reviews(&ReviewQuery::visible_for_course(course_id))
        .await?
        .len();

    Ok(CourseDetail {
        course,
        faculty,
        instructors,
        review_count,
    })
}

/// Statistics over the course's visible reviews, withheld below `min_reviews`.
pub async fn course_stats(
    store: &dyn ContentStore,
    course_id: Uuid,
    min_reviews: usize,
) -> ServiceResult<StatsAvailability> {
    require_course(store, course_id).await?;
    let scores = scores_by_course(store, &[course_id])
        .await?
        .remove(&course_id)
        .unwrap_or_default();
    Ok(stats_for_display(&scores, min_reviews))
}

// ==================== Instructors ====================

pub async fn search_instructors(
    store: &dyn ContentStore,
    term: &str,
    limit: Option<usize>,
) -> ServiceResult<Vec<Instructor>> {
    let term = term.trim();
    if term.chars().count() < MIN_SEARCH_LENGTH {
        return Ok(Vec::new());
    }
    let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);
    Ok(store.search_instructors(term, limit).await?)
}

pub async fn instructor_detail(
    store: &dyn ContentStore,
    instructor_id: Uuid,
) -> ServiceResult<Instructor> {
    store
        .get_instructor(instructor_id)
        .await?
        .ok_or(ServiceError::NotFound("instructor"))
}

/// The instructor's courses plus a rollup over those with displayable stats.
pub async fn instructor_courses(
    store: &dyn ContentStore,
    instructor_id: Uuid,
    min_reviews: usize,
) -> ServiceResult<InstructorCourses> {
    let instructor = instructor_detail(store, instructor_id).await?;
    let course_ids = store.instructor_course_ids(instructor_id).await?;
    let courses = if course_ids.is_empty() {
        Vec::new()
    } else {
        store
            .list_courses(&CourseQuery {
                ids: Some(course_ids.clone()),
                ..CourseQuery::default()
            })
            .await?
    };

    let scores = scores_by_course(store, &course_ids).await?;
    let displayable: Vec<CourseStats> = scores
        .values()
        .filter_map(|reviews| stats_for_display(reviews, min_reviews).into_stats())
        .collect();
    let rollup = instructor_rollup(&displayable);

    let mut items = list_items(store, courses, min_reviews).await?;
    items.sort_by(|a, b| a.course.code.cmp(&b.course.code));

    Ok(InstructorCourses {
        instructor,
        courses: items,
        rollup,
    })
}
