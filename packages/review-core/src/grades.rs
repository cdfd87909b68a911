//! Grade-Boundary Estimator
//!
//! Produces the eight-row (AA..FF) letter-grade table shown for a course.
//! Submitted grade distributions are always preferred and used verbatim; when
//! none exist for the requested scope the table falls back to the default
//! boundaries, optionally shifted by the course's average grading-fairness
//! rating. A table never mixes the two: [`BoundaryTable::source`] names the
//! mode that produced every row.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{ExamType, Semester};

/// Lowest score on the percentage scale
pub const SCORE_FLOOR: i32 = 0;

/// Highest score on the percentage scale
pub const SCORE_CEILING: i32 = 100;

/// Fairness rating that leaves the default boundaries untouched
pub const NEUTRAL_FAIRNESS: f64 = 3.0;

/// Points of shift per fairness step away from neutral
pub const POINTS_PER_FAIRNESS_STEP: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LetterGrade {
    AA,
    BA,
    BB,
    CB,
    CC,
    DC,
    DD,
    FF,
}

impl LetterGrade {
    pub const ALL: [LetterGrade; 8] = [
        LetterGrade::AA,
        LetterGrade::BA,
        LetterGrade::BB,
        LetterGrade::CB,
        LetterGrade::CC,
        LetterGrade::DC,
        LetterGrade::DD,
        LetterGrade::FF,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LetterGrade::AA => "AA",
            LetterGrade::BA => "BA",
            LetterGrade::BB => "BB",
            LetterGrade::CB => "CB",
            LetterGrade::CC => "CC",
            LetterGrade::DC => "DC",
            LetterGrade::DD => "DD",
            LetterGrade::FF => "FF",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Boundaries used when no grade data was submitted.
    pub fn default_band(self) -> ScoreBand {
        let (lower, upper) = match self {
            LetterGrade::AA => (90, 100),
            LetterGrade::BA => (85, 89),
            LetterGrade::BB => (80, 84),
            LetterGrade::CB => (75, 79),
            LetterGrade::CC => (70, 74),
            LetterGrade::DC => (65, 69),
            LetterGrade::DD => (60, 64),
            LetterGrade::FF => (0, 59),
        };
        ScoreBand { lower, upper }
    }

    /// Per-grade scale of the fairness shift; higher grades move further.
    pub fn shift_weight(self) -> f64 {
        match self {
            LetterGrade::AA => 1.2,
            LetterGrade::BA => 1.1,
            LetterGrade::BB => 1.0,
            LetterGrade::CB => 0.9,
            LetterGrade::CC => 0.8,
            LetterGrade::DC => 0.7,
            LetterGrade::DD | LetterGrade::FF => 0.6,
        }
    }
}

/// Inclusive score range for one letter grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBand {
    pub lower: i32,
    pub upper: i32,
}

/// The eight bands of a submitted distribution, in AA..FF order.
///
/// Serialized as an object keyed by grade; all eight grades are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeBands([ScoreBand; 8]);

impl GradeBands {
    pub fn new(bands: [ScoreBand; 8]) -> Self {
        Self(bands)
    }

    pub fn defaults() -> Self {
        Self(LetterGrade::ALL.map(LetterGrade::default_band))
    }

    pub fn get(&self, grade: LetterGrade) -> ScoreBand {
        self.0[grade.index()]
    }

    pub fn set(&mut self, grade: LetterGrade, band: ScoreBand) {
        self.0[grade.index()] = band;
    }

    pub fn iter(&self) -> impl Iterator<Item = (LetterGrade, ScoreBand)> + '_ {
        LetterGrade::ALL.iter().map(move |grade| (*grade, self.get(*grade)))
    }
}

impl Default for GradeBands {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Serialize for GradeBands {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for GradeBands {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<LetterGrade, ScoreBand>::deserialize(deserializer)?;
        let mut bands = GradeBands::defaults();
        for grade in LetterGrade::ALL {
            let band = map
                .get(&grade)
                .ok_or_else(|| D::Error::custom(format!("missing band for {}", grade.as_str())))?;
            bands.set(grade, *band);
        }
        Ok(bands)
    }
}

/// A grade distribution submitted for one offering of a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeDistribution {
    pub academic_year: i32,
    pub semester: Semester,
    pub exam_type: ExamType,
    /// Submission time, unix milliseconds
    pub submitted_at: i64,
    pub bands: GradeBands,
}

/// Which academic years a table is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearScope {
    /// Only the most recent year with data
    All,
    Year(i32),
}

/// How the numbers of a [`BoundaryTable`] were produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BoundarySource {
    Submitted {
        academic_year: i32,
        semester: Semester,
        exam_type: ExamType,
    },
    Default,
    FairnessAdjusted { average_grading_fairness: f64 },
}

fn integer_string<S: Serializer>(value: &i32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GradeBand {
    pub grade: LetterGrade,
    #[serde(serialize_with = "integer_string")]
    pub lower: i32,
    #[serde(serialize_with = "integer_string")]
    pub upper: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundaryTable {
    pub source: BoundarySource,
    pub bands: Vec<GradeBand>,
}

impl BoundaryTable {
    fn from_bands(source: BoundarySource, bands: &GradeBands) -> Self {
        Self {
            source,
            bands: bands
                .iter()
                .map(|(grade, band)| GradeBand {
                    grade,
                    lower: band.lower,
                    upper: band.upper,
                })
                .collect(),
        }
    }

    pub fn band(&self, grade: LetterGrade) -> Option<&GradeBand> {
        self.bands.iter().find(|band| band.grade == grade)
    }

    pub fn is_submitted_data(&self) -> bool {
        matches!(self.source, BoundarySource::Submitted { .. })
    }
}

/// The unmodified default table.
pub fn default_table() -> BoundaryTable {
    BoundaryTable::from_bands(BoundarySource::Default, &GradeBands::defaults())
}

fn shift_bound(bound: i32, adjustment: f64, weight: f64) -> i32 {
    let shifted = f64::from(bound) - adjustment * weight;
    (shifted.round() as i32).clamp(SCORE_FLOOR, SCORE_CEILING)
}

/// Default boundaries shifted by the average grading-fairness rating.
///
/// Harsh grading (fairness below 3) raises every boundary, lenient grading
/// lowers them. Results are clamped to 0..=100.
pub fn fairness_adjusted_table(average_grading_fairness: f64) -> BoundaryTable {
    let adjustment = (average_grading_fairness - NEUTRAL_FAIRNESS) * POINTS_PER_FAIRNESS_STEP;
    let mut bands = GradeBands::defaults();
    for grade in LetterGrade::ALL {
        let base = grade.default_band();
        let weight = grade.shift_weight();
        bands.set(
            grade,
            ScoreBand {
                lower: shift_bound(base.lower, adjustment, weight),
                upper: shift_bound(base.upper, adjustment, weight),
            },
        );
    }
    BoundaryTable::from_bands(
        BoundarySource::FairnessAdjusted {
            average_grading_fairness,
        },
        &bands,
    )
}

/// Picks the record that represents `scope`, if any.
///
/// `All` narrows to the most recent academic year. Within the scope a
/// `final` record wins over other exam types; ties go to the latest
/// submission.
pub fn select_distribution(
    records: &[GradeDistribution],
    scope: YearScope,
) -> Option<&GradeDistribution> {
    let year = match scope {
        YearScope::Year(year) => year,
        YearScope::All => records.iter().map(|r| r.academic_year).max()?,
    };

    records
        .iter()
        .filter(|record| record.academic_year == year)
        .max_by_key(|record| (record.exam_type == ExamType::Final, record.submitted_at))
}

/// Builds the grade table for `scope`.
pub fn estimate_boundaries(
    records: &[GradeDistribution],
    scope: YearScope,
    average_grading_fairness: Option<f64>,
) -> BoundaryTable {
    if let Some(record) = select_distribution(records, scope) {
        return BoundaryTable::from_bands(
            BoundarySource::Submitted {
                academic_year: record.academic_year,
                semester: record.semester,
                exam_type: record.exam_type,
            },
            &record.bands,
        );
    }

    match average_grading_fairness {
        Some(fairness) if fairness.is_finite() => fairness_adjusted_table(fairness),
        _ => default_table(),
    }
}

/// Years with submitted data, for the year-by-year view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearSummary {
    pub year: i32,
    pub has_final: bool,
    pub has_resit: bool,
}

/// One entry per academic year, ascending.
pub fn year_timeline(records: &[GradeDistribution]) -> Vec<YearSummary> {
    let mut years: BTreeMap<i32, YearSummary> = BTreeMap::new();
    for record in records {
        let entry = years.entry(record.academic_year).or_insert(YearSummary {
            year: record.academic_year,
            has_final: false,
            has_resit: false,
        });
        match record.exam_type {
            ExamType::Final => entry.has_final = true,
            ExamType::Resit => entry.has_resit = true,
        }
    }
    years.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: i32, exam_type: ExamType, submitted_at: i64, aa_lower: i32) -> GradeDistribution {
        let mut bands = GradeBands::defaults();
        bands.set(
            LetterGrade::AA,
            ScoreBand {
                lower: aa_lower,
                upper: 100,
            },
        );
        GradeDistribution {
            academic_year: year,
            semester: Semester::Fall,
            exam_type,
            submitted_at,
            bands,
        }
    }

    fn aa_lower(table: &BoundaryTable) -> i32 {
        table.band(LetterGrade::AA).unwrap().lower
    }

    #[test]
    fn submitted_data_is_used_verbatim() {
        let records = vec![record(2024, ExamType::Final, 1, 88)];
        let table = estimate_boundaries(&records, YearScope::Year(2024), Some(1.0));
        assert!(table.is_submitted_data());
        assert_eq!(aa_lower(&table), 88);
    }

    #[test]
    fn final_is_preferred_over_resit() {
        let records = vec![
            record(2024, ExamType::Resit, 50, 70),
            record(2024, ExamType::Final, 10, 88),
        ];
        let table = estimate_boundaries(&records, YearScope::Year(2024), None);
        assert_eq!(aa_lower(&table), 88);
        assert_eq!(
            table.source,
            BoundarySource::Submitted {
                academic_year: 2024,
                semester: Semester::Fall,
                exam_type: ExamType::Final,
            }
        );
    }

    #[test]
    fn latest_submission_wins_without_final() {
        let records = vec![
            record(2024, ExamType::Resit, 10, 70),
            record(2024, ExamType::Resit, 20, 75),
        ];
        let table = estimate_boundaries(&records, YearScope::Year(2024), None);
        assert_eq!(aa_lower(&table), 75);
    }

    #[test]
    fn all_years_uses_most_recent_year_only() {
        let records = vec![
            record(2022, ExamType::Final, 100, 80),
            record(2024, ExamType::Resit, 5, 92),
            record(2023, ExamType::Final, 50, 85),
        ];
        let table = estimate_boundaries(&records, YearScope::All, None);
        assert_eq!(aa_lower(&table), 92);
    }

    #[test]
    fn missing_year_falls_back_to_defaults() {
        let records = vec![record(2024, ExamType::Final, 1, 88)];
        let table = estimate_boundaries(&records, YearScope::Year(2020), None);
        assert_eq!(table.source, BoundarySource::Default);
        assert_eq!(aa_lower(&table), 90);
        assert_eq!(table.band(LetterGrade::FF).unwrap().upper, 59);
    }

    #[test]
    fn neutral_fairness_keeps_defaults() {
        let table = estimate_boundaries(&[], YearScope::All, Some(3.0));
        assert!(matches!(table.source, BoundarySource::FairnessAdjusted { .. }));
        for (grade, band) in LetterGrade::ALL.iter().zip(table.bands.iter()) {
            assert_eq!(band.lower, grade.default_band().lower);
            assert_eq!(band.upper, grade.default_band().upper);
        }
    }

    #[test]
    fn harsh_grading_raises_boundaries_and_clamps_at_ceiling() {
        let table = fairness_adjusted_table(1.0);
        // 90 + 12 = 102, clamped
        assert_eq!(aa_lower(&table), 100);
        assert_eq!(table.band(LetterGrade::BA).unwrap().lower, 96);
        assert_eq!(table.band(LetterGrade::BB).unwrap().lower, 90);
        assert_eq!(table.band(LetterGrade::FF).unwrap().lower, 6);
    }

    #[test]
    fn lenient_grading_lowers_boundaries_and_clamps_at_floor() {
        let table = fairness_adjusted_table(5.0);
        assert_eq!(aa_lower(&table), 78);
        assert_eq!(table.band(LetterGrade::DD).unwrap().lower, 54);
        assert_eq!(table.band(LetterGrade::FF).unwrap().lower, 0);
        assert_eq!(table.band(LetterGrade::FF).unwrap().upper, 53);
    }

    #[test]
    fn fractional_fairness_rounds_to_integers() {
        // adjustment = -2.0; BA lower = 85 + 2.2 = 87.2
        let table = fairness_adjusted_table(2.6);
        assert_eq!(table.band(LetterGrade::BA).unwrap().lower, 87);
    }

    #[test]
    fn bounds_serialize_as_integer_strings() {
        let json = serde_json::to_value(default_table()).unwrap();
        assert_eq!(json["source"]["mode"], "default");
        assert_eq!(json["bands"][0]["grade"], "AA");
        assert_eq!(json["bands"][0]["lower"], "90");
        assert_eq!(json["bands"][7]["upper"], "59");
    }

    #[test]
    fn bands_serialize_keyed_by_grade() {
        let json = serde_json::to_value(GradeBands::defaults()).unwrap();
        assert_eq!(json["AA"]["lower"], 90);
        assert_eq!(json["FF"]["upper"], 59);

        let parsed: GradeBands = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(parsed, GradeBands::defaults());

        let mut partial = json;
        partial.as_object_mut().unwrap().remove("DD");
        let err = serde_json::from_value::<GradeBands>(partial).unwrap_err();
        assert!(err.to_string().contains("missing band for DD"));
    }

    #[test]
    fn timeline_groups_by_year_ascending() {
        let records = vec![
            record(2024, ExamType::Resit, 1, 90),
            record(2023, ExamType::Final, 1, 90),
            record(2024, ExamType::Final, 2, 90),
        ];
        let timeline = year_timeline(&records);
        assert_eq!(
            timeline,
            vec![
                YearSummary {
                    year: 2023,
                    has_final: true,
                    has_resit: false
                },
                YearSummary {
                    year: 2024,
                    has_final: true,
                    has_resit: true
                },
            ]
        );
    }
}
