//! Transition guards for the objective-exam grading pipeline.

use thiserror::Error;

use crate::db::types::{ExamStatus, GradingMethod, GradingMode, SubmissionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub(crate) enum GradingDenied {
    #[error("AI grading has not finished for this submission yet")]
    GradingInProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub(crate) enum ExamStatusDenied {
    #[error("an exam needs at least one question before it can be activated")]
    NoQuestions,
    #[error("exam cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: ExamStatus, to: ExamStatus },
}

impl ExamStatusDenied {
    pub(crate) fn code(self) -> &'static str {
        match self {
            Self::NoQuestions => "NoQuestions",
            Self::InvalidTransition { .. } => "InvalidTransition",
        }
    }
}

/// A teacher may write scores when the exam is fully manual. For AI exams
/// the write is only allowed once the automated pass has finished or failed,
/// so a human write never races the grader.
pub(crate) fn manual_grading_allowed(
    mode: GradingMode,
    status: SubmissionStatus,
) -> Result<(), GradingDenied> {
    match mode {
        GradingMode::Manual => Ok(()),
        GradingMode::Ai => {
            if matches!(status, SubmissionStatus::Graded | SubmissionStatus::Error) {
                Ok(())
            } else {
                Err(GradingDenied::GradingInProgress)
            }
        }
    }
}

/// Scores are clamped regardless of what the client submitted.
pub(crate) fn clamp_score(score: f64, max_marks: f64) -> f64 {
    score.clamp(0.0, max_marks)
}

/// Provenance of a manual write: whether an AI score pre-existed at write
/// time decides the recorded method, not which actor wrote last.
pub(crate) fn method_for_manual_write(ai_score_exists: bool) -> GradingMethod {
    if ai_score_exists {
        GradingMethod::AiOverride
    } else {
        GradingMethod::Manual
    }
}

/// Forward-only pipeline moves, with `error` reachable from every
/// non-terminal state. `graded` is terminal.
pub(crate) fn submission_can_transition(from: SubmissionStatus, to: SubmissionStatus) -> bool {
    use SubmissionStatus::*;

    match (from, to) {
        (Pending, OcrProcessing) => true,
        (OcrProcessing, OcrComplete) => true,
        (OcrComplete, Grading) => true,
        (Grading, Graded) => true,
        (from, Error) => from != Graded,
        _ => false,
    }
}

pub(crate) fn exam_can_transition(
    from: ExamStatus,
    to: ExamStatus,
    question_count: i64,
) -> Result<(), ExamStatusDenied> {
    match (from, to) {
        (ExamStatus::Draft, ExamStatus::Active) => {
            if question_count == 0 {
                Err(ExamStatusDenied::NoQuestions)
            } else {
                Ok(())
            }
        }
        (ExamStatus::Active, ExamStatus::Closed) => Ok(()),
        // Explicitly permitted revert.
        (ExamStatus::Closed, ExamStatus::Draft) => Ok(()),
        (from, to) => Err(ExamStatusDenied::InvalidTransition { from, to }),
    }
}

pub(crate) fn aggregate_scored_marks(final_scores: &[f64]) -> f64 {
    final_scores.iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_mode_always_allows_teacher_writes() {
        for status in [
            SubmissionStatus::Pending,
            SubmissionStatus::OcrProcessing,
            SubmissionStatus::OcrComplete,
            SubmissionStatus::Grading,
            SubmissionStatus::Graded,
            SubmissionStatus::Error,
        ] {
            assert!(manual_grading_allowed(GradingMode::Manual, status).is_ok());
        }
    }

    #[test]
    fn ai_mode_locks_until_graded_or_error() {
        for status in [
            SubmissionStatus::Pending,
            SubmissionStatus::OcrProcessing,
            SubmissionStatus::OcrComplete,
            SubmissionStatus::Grading,
        ] {
            assert_eq!(
                manual_grading_allowed(GradingMode::Ai, status),
                Err(GradingDenied::GradingInProgress)
            );
        }

        assert!(manual_grading_allowed(GradingMode::Ai, SubmissionStatus::Graded).is_ok());
        assert!(manual_grading_allowed(GradingMode::Ai, SubmissionStatus::Error).is_ok());
    }

    #[test]
    fn clamp_score_bounds_both_ends() {
        assert_eq!(clamp_score(15.0, 10.0), 10.0);
        assert_eq!(clamp_score(-2.0, 10.0), 0.0);
        assert_eq!(clamp_score(7.5, 10.0), 7.5);
    }

    #[test]
    fn manual_write_over_ai_score_records_override() {
        assert_eq!(method_for_manual_write(true), GradingMethod::AiOverride);
        assert_eq!(method_for_manual_write(false), GradingMethod::Manual);
    }

    #[test]
    fn pipeline_moves_forward_only() {
        use SubmissionStatus::*;

        assert!(submission_can_transition(Pending, OcrProcessing));
        assert!(submission_can_transition(OcrProcessing, OcrComplete));
        assert!(submission_can_transition(OcrComplete, Grading));
        assert!(submission_can_transition(Grading, Graded));

        assert!(!submission_can_transition(OcrComplete, Pending));
        assert!(!submission_can_transition(Graded, Grading));
        assert!(!submission_can_transition(Pending, Graded));
    }

    #[test]
    fn error_reachable_from_every_non_terminal_state() {
        use SubmissionStatus::*;

        for from in [Pending, OcrProcessing, OcrComplete, Grading, Error] {
            assert!(submission_can_transition(from, Error));
        }
        assert!(!submission_can_transition(Graded, Error));
    }

    #[test]
    fn exam_activation_requires_questions() {
        assert_eq!(
            exam_can_transition(ExamStatus::Draft, ExamStatus::Active, 0),
            Err(ExamStatusDenied::NoQuestions)
        );
        assert!(exam_can_transition(ExamStatus::Draft, ExamStatus::Active, 3).is_ok());
    }

    #[test]
    fn exam_close_and_reopen_are_the_only_other_moves() {
        assert!(exam_can_transition(ExamStatus::Active, ExamStatus::Closed, 5).is_ok());
        assert!(exam_can_transition(ExamStatus::Closed, ExamStatus::Draft, 5).is_ok());

        assert!(exam_can_transition(ExamStatus::Draft, ExamStatus::Closed, 5).is_err());
        assert!(exam_can_transition(ExamStatus::Closed, ExamStatus::Active, 5).is_err());
        assert!(exam_can_transition(ExamStatus::Active, ExamStatus::Draft, 5).is_err());
    }

    #[test]
    fn aggregate_sums_final_scores() {
        assert_eq!(aggregate_scored_marks(&[3.0, 4.5, 2.0]), 9.5);
        assert_eq!(aggregate_scored_marks(&[]), 0.0);
    }
}
