//! Self-assessment scoring.
//!
//! Pure and deterministic: a fixed answer sequence always yields the same
//! report. Sits beside the sequencer, not inside it; the questionnaire UI
//! is out of scope, only the scoring lives here.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Highest selectable answer value ("Always" on a five-point scale).
pub const MAX_ANSWER: u8 = 4;

/// Severity band for an assessment percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssessmentBand {
    /// Below 40%.
    Low,
    /// 40% up to but not including 75%.
    Moderate,
    /// 75% and above.
    High,
}

impl AssessmentBand {
    fn for_percentage(percentage: u8) -> Self {
        if percentage >= 75 {
            AssessmentBand::High
        } else if percentage >= 40 {
            AssessmentBand::Moderate
        } else {
            AssessmentBand::Low
        }
    }

    fn narrative(self) -> &'static str {
        match self {
            AssessmentBand::Low => {
                "Your attention habits look largely intact. Keep doing what already works, \
                 and use sessions as maintenance rather than repair."
            }
            AssessmentBand::Moderate => {
                "Distraction is taking a noticeable bite out of your day. Regular recovery \
                 sessions should make a measurable difference within a few weeks."
            }
            AssessmentBand::High => {
                "Distraction is interfering heavily with your day-to-day focus. A daily \
                 recovery session is strongly recommended as a starting point."
            }
        }
    }
}

/// Result of scoring one completed questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentReport {
    /// Sum of all answer values.
    pub total: u32,
    /// `round(100 * total / (4 * count))`, 0..=100.
    pub percentage: u8,
    pub band: AssessmentBand,
    pub narrative: String,
}

/// Score an ordered answer sequence, each answer 0..=4.
///
/// # Errors
/// Returns an error if `answers` is empty or any answer exceeds
/// [`MAX_ANSWER`].
pub fn compute_report(answers: &[u8]) -> Result<AssessmentReport, ValidationError> {
    if answers.is_empty() {
        return Err(ValidationError::EmptyCollection("answers".into()));
    }
    if let Some(index) = answers.iter().position(|&a| a > MAX_ANSWER) {
        return Err(ValidationError::InvalidValue {
            field: format!("answers[{index}]"),
            message: format!("answer must be 0..={MAX_ANSWER}, got {}", answers[index]),
        });
    }

    let total: u32 = answers.iter().map(|&a| u32::from(a)).sum();
    let max = u32::from(MAX_ANSWER) * answers.len() as u32;
    let percentage = (100.0 * f64::from(total) / f64::from(max)).round() as u8;
    let band = AssessmentBand::for_percentage(percentage);

    Ok(AssessmentReport {
        total,
        percentage,
        band,
        narrative: band.narrative().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_questionnaire_all_sometimes_is_moderate() {
        let answers = vec![2u8; 73];
        let report = compute_report(&answers).unwrap();
        assert_eq!(report.total, 146);
        assert_eq!(report.percentage, 50);
        assert_eq!(report.band, AssessmentBand::Moderate);
    }

    #[test]
    fn extremes_hit_outer_bands() {
        let zeros = compute_report(&[0u8; 10]).unwrap();
        assert_eq!(zeros.percentage, 0);
        assert_eq!(zeros.band, AssessmentBand::Low);

        let fours = compute_report(&[4u8; 10]).unwrap();
        assert_eq!(fours.percentage, 100);
        assert_eq!(fours.band, AssessmentBand::High);
    }

    #[test]
    fn band_thresholds_are_inclusive_on_the_upper_band() {
        // 10 questions, max 40: total 16 -> 40%, total 30 -> 75%.
        let at_forty = compute_report(&[4, 4, 4, 4, 0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(at_forty.percentage, 40);
        assert_eq!(at_forty.band, AssessmentBand::Moderate);

        let just_below = compute_report(&[4, 4, 4, 3, 0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(just_below.percentage, 38);
        assert_eq!(just_below.band, AssessmentBand::Low);

        let at_seventy_five = compute_report(&[4, 4, 4, 4, 4, 4, 4, 2, 0, 0]).unwrap();
        assert_eq!(at_seventy_five.percentage, 75);
        assert_eq!(at_seventy_five.band, AssessmentBand::High);
    }

    #[test]
    fn percentage_rounds_half_up() {
        // total 1 of max 8 -> 12.5 -> rounds away from zero to 13.
        let report = compute_report(&[1, 0]).unwrap();
        assert_eq!(report.percentage, 13);
    }

    #[test]
    fn report_is_deterministic() {
        let answers = [3, 1, 4, 0, 2, 2, 1];
        assert_eq!(
            compute_report(&answers).unwrap(),
            compute_report(&answers).unwrap()
        );
    }

    #[test]
    fn empty_answers_are_rejected() {
        assert!(matches!(
            compute_report(&[]),
            Err(ValidationError::EmptyCollection(_))
        ));
    }

    #[test]
    fn out_of_range_answer_is_rejected() {
        match compute_report(&[2, 5, 1]) {
            Err(ValidationError::InvalidValue { field, .. }) => {
                assert_eq!(field, "answers[1]");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }
}
