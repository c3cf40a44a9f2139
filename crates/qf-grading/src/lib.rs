//! Quiz grading library for QuizForge
//!
//! This crate holds the database-free pieces of the quiz engine: question and
//! answer types, single-pass grading, question validation and generation of
//! multiple-choice questions from flashcards.

mod generate;
mod grade;
mod normalize;
mod validate;

pub use generate::{GenerateError, SourceCard, generate_questions};
pub use grade::{GradeReport, QuestionResult, grade, grade_question};
pub use normalize::normalize_answer;
pub use validate::{QuestionError, validate_question};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single quiz question together with its answer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub prompt: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    pub points: u32,
}

/// Question shape and answer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice { options: Vec<String>, correct: usize },
    MultiSelect { options: Vec<String>, correct: Vec<usize> },
    TrueFalse { correct: bool },
    ShortAnswer { accepted: Vec<String> },
}

/// Question as shown to someone taking the quiz: the answer key is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactedQuestion {
    pub id: Uuid,
    pub prompt: String,
    #[serde(flatten)]
    pub kind: RedactedKind,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RedactedKind {
    MultipleChoice { options: Vec<String> },
    MultiSelect { options: Vec<String> },
    TrueFalse,
    ShortAnswer,
}

/// A submitted answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Answer {
    MultipleChoice { choice: usize },
    MultiSelect { choices: Vec<usize> },
    TrueFalse { value: bool },
    ShortAnswer { text: String },
}

impl Question {
    /// Strip the answer key.
    pub fn redacted(&self) -> RedactedQuestion {
        let kind = match &self.kind {
            QuestionKind::MultipleChoice { options, .. } => RedactedKind::MultipleChoice {
                options: options.clone(),
            },
            QuestionKind::MultiSelect { options, .. } => RedactedKind::MultiSelect {
                options: options.clone(),
            },
            QuestionKind::TrueFalse { .. } => RedactedKind::TrueFalse,
            QuestionKind::ShortAnswer { .. } => RedactedKind::ShortAnswer,
        };

        RedactedQuestion {
            id: self.id,
            prompt: self.prompt.clone(),
            kind,
            points: self.points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_wire_format() {
        let question = Question {
            id: Uuid::nil(),
            prompt: "2 + 2?".to_string(),
            kind: QuestionKind::MultipleChoice {
                options: vec!["3".to_string(), "4".to_string()],
                correct: 1,
            },
            points: 2,
        };

        let json = serde_json::to_value(&question).expect("Failed to serialize question");
        assert_eq!(json["type"], "multiple_choice");
        assert_eq!(json["correct"], 1);
        assert_eq!(json["options"][1], "4");
    }

    #[test]
    fn test_redacted_question_hides_answer_key() {
        let question = Question {
            id: Uuid::new_v4(),
            prompt: "Capital of France?".to_string(),
            kind: QuestionKind::ShortAnswer {
                accepted: vec!["Paris".to_string()],
            },
            points: 1,
        };

        let json = serde_json::to_string(&question.redacted()).expect("Failed to serialize");
        assert!(!json.contains("Paris"));
        assert!(json.contains("short_answer"));
    }

    #[test]
    fn test_answer_deserialization() {
        let answer: Answer =
            serde_json::from_str(r#"{"type":"multi_select","choices":[0,2]}"#).unwrap();
        assert_eq!(
            answer,
            Answer::MultiSelect {
                choices: vec![0, 2]
            }
        );

        let answer: Answer = serde_json::from_str(r#"{"type":"true_false","value":false}"#).unwrap();
        assert_eq!(answer, Answer::TrueFalse { value: false });
    }
}
