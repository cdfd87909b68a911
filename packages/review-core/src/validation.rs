//! Input validation
//!
//! Checks run before anything is written. Every check collects all problems
//! into [`ValidationErrors`] instead of stopping at the first one, so a form
//! can highlight each offending field.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::grades::{GradeBands, SCORE_CEILING, SCORE_FLOOR};
use crate::types::{
    is_valid_rating, DifficultyValueAlignment, ExamFormat, ExtraAssessment, ReviewScores,
    ALLOWED_FILE_TYPES, MAX_COMMENT_LENGTH, MAX_FILE_SIZE, MAX_RATING, MAX_SURVIVAL_GUIDE_LENGTH,
    MIN_RATING,
};

pub const MIN_TAG_NAME_LENGTH: usize = 2;
pub const MAX_TAG_NAME_LENGTH: usize = 40;
pub const MIN_ACADEMIC_YEAR: i32 = 2000;
pub const MAX_ACADEMIC_YEAR: i32 = 2100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => f.write_str("validation failed"),
            [only] => write!(f, "{}: {}", only.field, only.message),
            [first, rest @ ..] => write!(
                f,
                "{}: {} (and {} more)",
                first.field,
                first.message,
                rest.len()
            ),
        }
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

// ==================== Reviews ====================

/// A review as submitted, before any checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub difficulty: Option<u8>,
    pub usefulness: Option<u8>,
    pub workload: Option<u8>,
    pub attendance: Option<u8>,
    pub material_relevance: Option<u8>,
    pub exam_predictability: Option<u8>,
    pub grading_fairness: Option<u8>,
    pub difficulty_value_alignment: Option<String>,
    pub midterm_format: Option<String>,
    pub final_format: Option<String>,
    #[serde(default)]
    pub extra_assessments: Vec<String>,
    pub comment: Option<String>,
    pub survival_guide: Option<String>,
}

/// A review that passed every check.
///
/// `scores` has every required rating and format populated. Blank comment
/// and survival guide become `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidReview {
    pub scores: ReviewScores,
    pub comment: Option<String>,
    pub survival_guide: Option<String>,
}

fn required_rating(errors: &mut ValidationErrors, field: &str, value: Option<u8>) -> Option<u8> {
    match value {
        None | Some(0) => {
            errors.push(field, "is required");
            None
        }
        Some(v) if !is_valid_rating(v) => {
            errors.push(
                field,
                format!("must be between {MIN_RATING} and {MAX_RATING}"),
            );
            None
        }
        Some(v) => Some(v),
    }
}

fn required_choice<T: FromStr>(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
) -> Option<T> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        errors.push(field, "is required");
        return None;
    };
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.push(field, format!("unknown value {raw:?}"));
            None
        }
    }
}

fn optional_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    max_chars: usize,
) -> Option<String> {
    let text = value.map(str::trim).filter(|v| !v.is_empty())?;
    if text.chars().count() > max_chars {
        errors.push(field, format!("must be at most {max_chars} characters"));
        return None;
    }
    Some(text.to_string())
}

pub fn validate_review(draft: ReviewDraft) -> Result<ValidReview, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let difficulty = required_rating(&mut errors, "difficulty", draft.difficulty);
    let usefulness = required_rating(&mut errors, "usefulness", draft.usefulness);
    let workload = required_rating(&mut errors, "workload", draft.workload);
    let material_relevance =
        required_rating(&mut errors, "material_relevance", draft.material_relevance);
    let exam_predictability =
        required_rating(&mut errors, "exam_predictability", draft.exam_predictability);

    let attendance = required_rating(&mut errors, "attendance", draft.attendance);
    let attendance = match attendance {
        Some(v) if v != MIN_RATING && v != MAX_RATING => {
            errors.push(
                "attendance",
                format!("must be {MIN_RATING} (not required) or {MAX_RATING} (required)"),
            );
            None
        }
        other => other,
    };

    let grading_fairness = match draft.grading_fairness {
        None => None,
        Some(v) if is_valid_rating(v) => Some(v),
        Some(_) => {
            errors.push(
                "grading_fairness",
                format!("must be between {MIN_RATING} and {MAX_RATING}"),
            );
            None
        }
    };

    let difficulty_value_alignment: Option<DifficultyValueAlignment> = required_choice(
        &mut errors,
        "difficulty_value_alignment",
        draft.difficulty_value_alignment.as_deref(),
    );
    let midterm_format: Option<ExamFormat> =
        required_choice(&mut errors, "midterm_format", draft.midterm_format.as_deref());
    let final_format: Option<ExamFormat> =
        required_choice(&mut errors, "final_format", draft.final_format.as_deref());

    let mut extra_assessments: Vec<ExtraAssessment> = Vec::new();
    for raw in &draft.extra_assessments {
        match raw.parse::<ExtraAssessment>() {
            Ok(kind) if !extra_assessments.contains(&kind) => extra_assessments.push(kind),
            Ok(_) => {}
            Err(_) => errors.push("extra_assessments", format!("unknown value {raw:?}")),
        }
    }

    let comment = optional_text(
        &mut errors,
        "comment",
        draft.comment.as_deref(),
        MAX_COMMENT_LENGTH,
    );
    let survival_guide = optional_text(
        &mut errors,
        "survival_guide",
        draft.survival_guide.as_deref(),
        MAX_SURVIVAL_GUIDE_LENGTH,
    );

    let scores = ReviewScores {
        difficulty,
        usefulness,
        workload,
        material_relevance,
        exam_predictability,
        attendance,
        grading_fairness,
        difficulty_value_alignment,
        midterm_format,
        final_format,
        extra_assessments,
    };

    errors.into_result(ValidReview {
        scores,
        comment,
        survival_guide,
    })
}

/// Checks a standalone survival guide submission; returns the trimmed text.
pub fn validate_survival_guide(text: &str) -> Result<String, ValidationErrors> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationErrors::single("content", "is required"));
    }
    let mut errors = ValidationErrors::new();
    let text = optional_text(
        &mut errors,
        "content",
        Some(trimmed),
        MAX_SURVIVAL_GUIDE_LENGTH,
    );
    errors.into_result(text.unwrap_or_default())
}

// ==================== Files ====================

pub fn validate_upload(
    file_name: &str,
    content_type: &str,
    size: u64,
) -> Result<(), ValidationErrors> {
    validate_upload_with_limit(file_name, content_type, size, MAX_FILE_SIZE)
}

/// Same as [`validate_upload`] with a deployment-specific size limit.
pub fn validate_upload_with_limit(
    file_name: &str,
    content_type: &str,
    size: u64,
    max_size: u64,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if file_name.trim().is_empty() {
        errors.push("file_name", "is required");
    }
    if !ALLOWED_FILE_TYPES.contains(&content_type) {
        errors.push("file_type", format!("{content_type:?} is not an allowed file type"));
    }
    if size == 0 {
        errors.push("file_size", "file is empty");
    } else if size > max_size {
        errors.push(
            "file_size",
            format!("must be at most {} MB", max_size / (1024 * 1024)),
        );
    }
    errors.into_result(())
}

// ==================== Grade distributions ====================

pub fn validate_grade_bands(academic_year: i32, bands: &GradeBands) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if !(MIN_ACADEMIC_YEAR..=MAX_ACADEMIC_YEAR).contains(&academic_year) {
        errors.push(
            "academic_year",
            format!("must be between {MIN_ACADEMIC_YEAR} and {MAX_ACADEMIC_YEAR}"),
        );
    }
    for (grade, band) in bands.iter() {
        let field = grade.as_str();
        let in_range = |v: i32| (SCORE_FLOOR..=SCORE_CEILING).contains(&v);
        if !in_range(band.lower) || !in_range(band.upper) {
            errors.push(
                field,
                format!("bounds must be between {SCORE_FLOOR} and {SCORE_CEILING}"),
            );
        } else if band.lower > band.upper {
            errors.push(field, "lower bound exceeds upper bound");
        }
    }
    errors.into_result(())
}

// ==================== Tags ====================

/// Returns the trimmed name.
pub fn validate_tag_name(name: &str) -> Result<String, ValidationErrors> {
    let trimmed = name.trim();
    let length = trimmed.chars().count();
    if !(MIN_TAG_NAME_LENGTH..=MAX_TAG_NAME_LENGTH).contains(&length) {
        return Err(ValidationErrors::single(
            "name",
            format!("must be {MIN_TAG_NAME_LENGTH}-{MAX_TAG_NAME_LENGTH} characters"),
        ));
    }
    Ok(trimmed.to_string())
}
