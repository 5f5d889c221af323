//! Grade derivation and grade-distance helpers

use super::registry::GameConfig;
use serde::Serialize;

// Percent computed from integer scores may land a hair under a boundary
// computed from a fraction (e.g. 8/9).
const BOUNDARY_EPSILON: f64 = 1e-9;

impl GameConfig {
    /// Grade and grade index reached by `percent`
    pub fn grade_for_percent(&self, percent: f64) -> (&'static str, usize) {
        let index = self
            .grade_boundaries
            .iter()
            .rposition(|boundary| percent + BOUNDARY_EPSILON >= *boundary)
            .unwrap_or(0);
        let grade = self.grades.value_at(index).unwrap_or("");
        (grade, index)
    }

    /// How far `score` sits above the threshold of the grade at `grade_index`
    ///
    /// Negative when the score is below that grade.
    pub fn absolute_grade_delta(&self, score: f64, max_score: f64, grade_index: usize) -> Option<f64> {
        let boundary = self.grade_boundaries.get(grade_index)?;
        let grade_score = ((boundary / 100.0) * max_score - BOUNDARY_EPSILON).ceil();
        Some(score - grade_score)
    }

    /// Distance to the grade `relative` steps away from `grade_index`
    pub fn relative_grade_delta(
        &self,
        score: f64,
        max_score: f64,
        grade_index: usize,
        relative: i64,
    ) -> Option<GradeDelta> {
        let target = i64::try_from(grade_index).ok()?.checked_add(relative)?;
        let target = usize::try_from(target).ok()?;
        let grade = self.grades.value_at(target)?;
        Some(GradeDelta {
            grade,
            delta: self.absolute_grade_delta(score, max_score, target)?,
        })
    }

    /// "AA+120" / "AAA-340" style summary with whichever side is closer
    pub fn format_grade_delta(&self, score: f64, max_score: f64, grade_index: usize) -> Option<GradeDeltaDisplay> {
        let grade = self.grades.value_at(grade_index)?;
        let lower = self.absolute_grade_delta(score, max_score, grade_index)?;
        let lower_text = format!("{}+{}", wrap_grade(grade), lower);

        match self.relative_grade_delta(score, max_score, grade_index, 1) {
            None => Some(GradeDeltaDisplay {
                lower: lower_text,
                upper: None,
                closer: Closer::Lower,
            }),
            Some(upper) => Some(GradeDeltaDisplay {
                lower: lower_text,
                upper: Some(format!("{}{}", wrap_grade(upper.grade), upper.delta)),
                closer: if upper.delta + lower < 0.0 {
                    Closer::Lower
                } else {
                    Closer::Upper
                },
            }),
        }
    }
}

fn wrap_grade(grade: &str) -> String {
    if grade.ends_with('-') || grade.ends_with('+') {
        format!("({})", grade)
    } else {
        grade.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeDelta {
    pub grade: &'static str,
    pub delta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Closer {
    Lower,
    Upper,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeDeltaDisplay {
    pub lower: String,
    pub upper: Option<String>,
    pub closer: Closer,
}
