use std::collections::HashSet;

use thiserror::Error;

use crate::{Question, QuestionKind};

pub const MAX_PROMPT_LEN: usize = 2000;
pub const MAX_OPTION_LEN: usize = 500;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;
pub const MAX_ACCEPTED_ANSWERS: usize = 20;
pub const MAX_POINTS: u32 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuestionError {
    #[error("Question prompt cannot be empty")]
    EmptyPrompt,
    #[error("Question prompt must be at most {max} characters", max = MAX_PROMPT_LEN)]
    PromptTooLong,
    #[error("Question points must be between 1 and {max}", max = MAX_POINTS)]
    InvalidPoints,
    #[error("Question must have between {min} and {max} options", min = MIN_OPTIONS, max = MAX_OPTIONS)]
    OptionCount,
    #[error("Question options must be non-empty and at most {max} characters", max = MAX_OPTION_LEN)]
    InvalidOption,
    #[error("Correct option index {0} is out of range")]
    CorrectOutOfRange(usize),
    #[error("Multi-select question needs at least one correct option")]
    NoCorrectOption,
    #[error("Correct option index {0} is listed twice")]
    DuplicateCorrect(usize),
    #[error("Short answer question needs between 1 and {max} accepted answers", max = MAX_ACCEPTED_ANSWERS)]
    AcceptedCount,
    #[error("Accepted answers must contain at least one letter or digit")]
    BlankAccepted,
}

/// Validate the shape and answer key of a question.
pub fn validate_question(question: &Question) -> Result<(), QuestionError> {
    let prompt = question.prompt.trim();
    if prompt.is_empty() {
        return Err(QuestionError::EmptyPrompt);
    }
    if prompt.chars().count() > MAX_PROMPT_LEN {
        return Err(QuestionError::PromptTooLong);
    }
    if question.points == 0 || question.points > MAX_POINTS {
        return Err(QuestionError::InvalidPoints);
    }

    match &question.kind {
        QuestionKind::MultipleChoice { options, correct } => {
            validate_options(options)?;
            if *correct >= options.len() {
                return Err(QuestionError::CorrectOutOfRange(*correct));
            }
        }
        QuestionKind::MultiSelect { options, correct } => {
            validate_options(options)?;
            if correct.is_empty() {
                return Err(QuestionError::NoCorrectOption);
            }
            let mut seen = HashSet::new();
            for &idx in correct {
                if idx >= options.len() {
                    return Err(QuestionError::CorrectOutOfRange(idx));
                }
                if !seen.insert(idx) {
                    return Err(QuestionError::DuplicateCorrect(idx));
                }
            }
        }
        QuestionKind::TrueFalse { .. } => {}
        QuestionKind::ShortAnswer { accepted } => {
            if accepted.is_empty() || accepted.len() > MAX_ACCEPTED_ANSWERS {
                return Err(QuestionError::AcceptedCount);
            }
            // An answer that normalizes to nothing could never be matched
            if accepted
                .iter()
                .any(|a| crate::normalize_answer(a).is_empty())
            {
                return Err(QuestionError::BlankAccepted);
            }
        }
    }

    Ok(())
}

fn validate_options(options: &[String]) -> Result<(), QuestionError> {
    if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
        return Err(QuestionError::OptionCount);
    }
    if options
        .iter()
        .any(|o| o.trim().is_empty() || o.chars().count() > MAX_OPTION_LEN)
    {
        return Err(QuestionError::InvalidOption);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn question(kind: QuestionKind) -> Question {
        Question {
            id: Uuid::new_v4(),
            prompt: "Prompt".to_string(),
            kind,
            points: 1,
        }
    }

    fn options(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("option {i}")).collect()
    }

    #[test]
    fn test_validate_prompt_and_points() {
        let mut q = question(QuestionKind::TrueFalse { correct: true });
        assert!(validate_question(&q).is_ok());

        q.prompt = "   ".to_string();
        assert_eq!(validate_question(&q), Err(QuestionError::EmptyPrompt));

        q.prompt = "x".repeat(MAX_PROMPT_LEN + 1);
        assert_eq!(validate_question(&q), Err(QuestionError::PromptTooLong));

        q.prompt = "ok".to_string();
        q.points = 0;
        assert_eq!(validate_question(&q), Err(QuestionError::InvalidPoints));
        q.points = MAX_POINTS + 1;
        assert_eq!(validate_question(&q), Err(QuestionError::InvalidPoints));
    }

    #[test]
    fn test_validate_multiple_choice() {
        assert!(
            validate_question(&question(QuestionKind::MultipleChoice {
                options: options(4),
                correct: 3,
            }))
            .is_ok()
        );
        assert_eq!(
            validate_question(&question(QuestionKind::MultipleChoice {
                options: options(4),
                correct: 4,
            })),
            Err(QuestionError::CorrectOutOfRange(4))
        );
        assert_eq!(
            validate_question(&question(QuestionKind::MultipleChoice {
                options: options(1),
                correct: 0,
            })),
            Err(QuestionError::OptionCount)
        );
        assert_eq!(
            validate_question(&question(QuestionKind::MultipleChoice {
                options: options(MAX_OPTIONS + 1),
                correct: 0,
            })),
            Err(QuestionError::OptionCount)
        );
        assert_eq!(
            validate_question(&question(QuestionKind::MultipleChoice {
                options: vec!["a".into(), " ".into()],
                correct: 0,
            })),
            Err(QuestionError::InvalidOption)
        );
    }

    #[test]
    fn test_validate_multi_select() {
        assert!(
            validate_question(&question(QuestionKind::MultiSelect {
                options: options(3),
                correct: vec![0, 2],
            }))
            .is_ok()
        );
        assert_eq!(
            validate_question(&question(QuestionKind::MultiSelect {
                options: options(3),
                correct: vec![],
            })),
            Err(QuestionError::NoCorrectOption)
        );
        assert_eq!(
            validate_question(&question(QuestionKind::MultiSelect {
                options: options(3),
                correct: vec![1, 1],
            })),
            Err(QuestionError::DuplicateCorrect(1))
        );
        assert_eq!(
            validate_question(&question(QuestionKind::MultiSelect {
                options: options(3),
                correct: vec![5],
            })),
            Err(QuestionError::CorrectOutOfRange(5))
        );
    }

    #[test]
    fn test_validate_short_answer() {
        assert!(
            validate_question(&question(QuestionKind::ShortAnswer {
                accepted: vec!["Paris".into()],
            }))
            .is_ok()
        );
        assert_eq!(
            validate_question(&question(QuestionKind::ShortAnswer { accepted: vec![] })),
            Err(QuestionError::AcceptedCount)
        );
        assert_eq!(
            validate_question(&question(QuestionKind::ShortAnswer {
                accepted: vec!["...".into()],
            })),
            Err(QuestionError::BlankAccepted)
        );
    }
}
