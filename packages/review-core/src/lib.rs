//! # review-core - course review domain logic
//!
//! Pure, synchronous building blocks for the course-review backend. Nothing
//! here performs I/O; every function works on records already loaded by the
//! caller and can be used concurrently without coordination.
//!
//! ## Modules
//!
//! - [`types`] - shared enums, the rating record and constants
//! - [`aggregate`] - per-course medians, means, distributions and categorical counts
//! - [`quality`] - overall quality score and instructor rollups
//! - [`grades`] - letter-grade boundary estimation
//! - [`moderation`] - pending/approved/rejected lifecycle and tag duplicate checks
//! - [`votes`] - vote toggling, troll detection and optimistic updates
//! - [`validation`] - review, upload, grade and tag input checks
//!
//! ## Example
//!
//! ```rust
//! use review_core::{stats_for_display, ReviewScores, MIN_REVIEWS_FOR_DISPLAY};
//!
//! let reviews = vec![ReviewScores { difficulty: Some(4), ..Default::default() }; 12];
//! let stats = stats_for_display(&reviews, MIN_REVIEWS_FOR_DISPLAY);
//! assert_eq!(stats.stats().unwrap().difficulty.median, Some(4.0));
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod types;
pub mod aggregate;
pub mod quality;
pub mod grades;
pub mod moderation;
pub mod votes;
pub mod validation;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use aggregate::{
    median, stats_for_display, summarize, CourseStats, DimensionSummary, StatsAvailability,
};

pub use quality::{instructor_rollup, overall_quality_score, rating_sort_key, InstructorRollup};

pub use grades::{
    estimate_boundaries, year_timeline, BoundarySource, BoundaryTable, GradeBand, GradeBands,
    GradeDistribution, LetterGrade, ScoreBand, YearScope, YearSummary,
};

pub use moderation::{find_duplicate_tag, tag_key, ModerationDecision, TransitionError};

pub use votes::{is_troll, plan_toggle, OptimisticLedger, Ticket, VoteAction, VoteCounts, VoteState};

pub use validation::{
    validate_grade_bands, validate_review, validate_survival_guide, validate_tag_name,
    validate_upload, validate_upload_with_limit, FieldError, ReviewDraft, ValidReview,
    ValidationErrors,
};
