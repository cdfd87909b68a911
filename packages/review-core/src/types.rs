//! Common Types and Constants
//!
//! Shared records and enumerations used by the aggregation, grade, moderation
//! and vote modules. Every enumeration has a stable snake_case wire name that
//! matches the stored column values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Lowest value on every rating scale
pub const MIN_RATING: u8 = 1;

/// Highest value on every rating scale
pub const MAX_RATING: u8 = 5;

/// Reviews a course needs before its statistics are shown
pub const MIN_REVIEWS_FOR_DISPLAY: usize = 10;

/// Maximum review comment length (characters)
pub const MAX_COMMENT_LENGTH: usize = 300;

/// Maximum survival guide length (characters)
pub const MAX_SURVIVAL_GUIDE_LENGTH: usize = 280;

/// Maximum uploaded file size (bytes)
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// MIME types accepted for course file uploads
pub const ALLOWED_FILE_TYPES: &[&str] = &[
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/msword",
    "image/jpeg",
    "image/png",
];

/// Rage-bait votes after which a review is surfaced to moderators
pub const TROLL_VOTE_THRESHOLD: u32 = 3;

/// Key used for absent or unrecognized categorical values
pub const UNSPECIFIED: &str = "unspecified";

// ==================== Wire enums ====================

/// Error returned when a stored or submitted string is not a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim() {
                    $($wire => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Scored review dimensions, each on the 1–5 scale.
    ///
    /// `Attendance` is stored as 1 (not required) or 5 (required); the
    /// aggregator treats it like any other dimension.
    Dimension, "dimension" {
        Difficulty => "difficulty",
        Usefulness => "usefulness",
        Workload => "workload",
        MaterialRelevance => "material_relevance",
        ExamPredictability => "exam_predictability",
        Attendance => "attendance",
        GradingFairness => "grading_fairness",
    }
}

wire_enum! {
    /// Whether the course's difficulty matches the value it delivers.
    DifficultyValueAlignment, "difficulty_value_alignment" {
        WellBalanced => "well_balanced",
        TooDifficult => "too_difficult",
        TooEasy => "too_easy",
    }
}

wire_enum! {
    /// Midterm or final exam format.
    ExamFormat, "exam_format" {
        Classical => "classical",
        Test => "test",
        Mix => "mix",
    }
}

wire_enum! {
    ExtraAssessment, "extra_assessment" {
        Project => "project",
        Lab => "lab",
        Quiz => "quiz",
        Homework => "homework",
    }
}

wire_enum! {
    TagType, "tag_type" {
        Positive => "positive",
        Negative => "negative",
    }
}

wire_enum! {
    /// Category of an uploaded course file.
    FileKind, "file_kind" {
        Exam => "exam",
        Notes => "notes",
        Other => "other",
    }
}

wire_enum! {
    VoteType, "vote_type" {
        Helpful => "helpful",
        MissingParts => "missing_parts",
        TotallyWrong => "totally_wrong",
        RageBait => "rage_bait",
    }
}

wire_enum! {
    Semester, "semester" {
        Fall => "fall",
        Spring => "spring",
        Summer => "summer",
    }
}

wire_enum! {
    /// Exam session a grade distribution was published for.
    ExamType, "exam_type" {
        Final => "final",
        Resit => "resit",
    }
}

wire_enum! {
    /// Lifecycle of moderated content: `pending` moves once to a terminal state.
    ModerationStatus, "moderation_status" {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

// ==================== Review scores ====================

/// Rating and categorical fields of one review, as consumed by the aggregator.
///
/// Several fields were introduced after launch, so every field is optional:
/// `None` means the row predates the field or holds an unrecognized value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewScores {
    pub difficulty: Option<u8>,
    pub usefulness: Option<u8>,
    pub workload: Option<u8>,
    pub material_relevance: Option<u8>,
    pub exam_predictability: Option<u8>,
    pub attendance: Option<u8>,
    pub grading_fairness: Option<u8>,
    pub difficulty_value_alignment: Option<DifficultyValueAlignment>,
    pub midterm_format: Option<ExamFormat>,
    pub final_format: Option<ExamFormat>,
    #[serde(default)]
    pub extra_assessments: Vec<ExtraAssessment>,
}

impl ReviewScores {
    pub fn rating(&self, dimension: Dimension) -> Option<u8> {
        match dimension {
            Dimension::Difficulty => self.difficulty,
            Dimension::Usefulness => self.usefulness,
            Dimension::Workload => self.workload,
            Dimension::MaterialRelevance => self.material_relevance,
            Dimension::ExamPredictability => self.exam_predictability,
            Dimension::Attendance => self.attendance,
            Dimension::GradingFairness => self.grading_fairness,
        }
    }
}

/// True when `value` lies on the 1–5 scale.
pub fn is_valid_rating(value: u8) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip_through_from_str() {
        for vote in VoteType::ALL {
            assert_eq!(vote.as_str().parse::<VoteType>().unwrap(), *vote);
        }
        assert_eq!("rage_bait".parse::<VoteType>().unwrap(), VoteType::RageBait);
    }

    #[test]
    fn unknown_values_are_rejected_with_kind() {
        let err = "oral".parse::<ExamFormat>().unwrap_err();
        assert_eq!(err.kind, "exam_format");
        assert_eq!(err.value, "oral");
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&DifficultyValueAlignment::TooDifficult).unwrap();
        assert_eq!(json, "\"too_difficult\"");
        let parsed: ModerationStatus = serde_json::from_str("\"approved\"").unwrap();
        assert_eq!(parsed, ModerationStatus::Approved);
    }

    #[test]
    fn rating_accessor_covers_every_dimension() {
        let scores = ReviewScores {
            difficulty: Some(1),
            usefulness: Some(2),
            workload: Some(3),
            material_relevance: Some(4),
            exam_predictability: Some(5),
            attendance: Some(1),
            grading_fairness: None,
            ..Default::default()
        };
        let collected: Vec<Option<u8>> = Dimension::ALL.iter().map(|d| scores.rating(*d)).collect();
        assert_eq!(
            collected,
            vec![Some(1), Some(2), Some(3), Some(4), Some(5), Some(1), None]
        );
    }
}
