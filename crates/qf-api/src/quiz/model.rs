use std::collections::HashSet;

use qf_db::models::{Quiz, Visibility};
use qf_grading::{Question, QuestionKind, RedactedQuestion, validate_question};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    validation::{optional_text, required_text},
};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 1000;
pub const MAX_QUESTIONS: usize = 200;
pub const MAX_TIME_LIMIT_MINUTES: i32 = 600;
pub const MAX_PUBLISH_SECTIONS: usize = 50;

#[derive(Debug, Deserialize)]
pub struct QuestionInput {
    /// Kept on full replacement so open attempts keep matching ids
    pub id: Option<Uuid>,
    pub prompt: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    #[serde(default = "default_points")]
    pub points: u32,
}

const fn default_points() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct QuizInput {
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_visibility")]
    pub visibility: Visibility,
    pub time_limit_minutes: Option<i32>,
    pub questions: Vec<QuestionInput>,
}

fn default_visibility() -> Visibility {
    Visibility::Private
}

/// Validated quiz contents
#[derive(Debug)]
pub struct ValidQuiz {
    pub title: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub time_limit_minutes: Option<i32>,
    pub questions: Vec<Question>,
}

impl QuizInput {
    /// Validate and convert. With `keep_ids` client supplied question ids are
    /// kept (they must be unique); otherwise every question gets a new id.
    pub fn validate(self, keep_ids: bool) -> Result<ValidQuiz, ApiError> {
        let title = required_text("Title", &self.title, MAX_TITLE_LEN)?;
        let description =
            optional_text("Description", self.description.as_deref(), MAX_DESCRIPTION_LEN)?;

        if let Some(minutes) = self.time_limit_minutes
            && !(1..=MAX_TIME_LIMIT_MINUTES).contains(&minutes)
        {
            return Err(ApiError::Validation(format!(
                "Time limit must be between 1 and {MAX_TIME_LIMIT_MINUTES} minutes"
            )));
        }

        if self.questions.is_empty() || self.questions.len() > MAX_QUESTIONS {
            return Err(ApiError::Validation(format!(
                "A quiz needs between 1 and {MAX_QUESTIONS} questions"
            )));
        }

        let mut seen = HashSet::new();
        let mut questions = Vec::with_capacity(self.questions.len());
        for (i, input) in self.questions.into_iter().enumerate() {
            let id = match input.id {
                Some(id) if keep_ids => id,
                _ => Uuid::new_v4(),
            };
            if !seen.insert(id) {
                return Err(ApiError::Validation(format!(
                    "Question {}: duplicate question id",
                    i + 1
                )));
            }

            let question = Question {
                id,
                prompt: input.prompt.trim().to_string(),
                kind: input.kind,
                points: input.points,
            };
            validate_question(&question)
                .map_err(|e| ApiError::Validation(format!("Question {}: {e}", i + 1)))?;
            questions.push(question);
        }

        Ok(ValidQuiz {
            title,
            description,
            visibility: self.visibility,
            time_limit_minutes: self.time_limit_minutes,
            questions,
        })
    }
}

/// Quiz with its questions, as cached and as returned to the owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizWithQuestions {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<Question>,
}

impl QuizWithQuestions {
    pub fn redacted(&self) -> RedactedQuiz {
        RedactedQuiz {
            quiz: self.quiz.clone(),
            questions: self.questions.iter().map(Question::redacted).collect(),
        }
    }
}

/// Quiz as shown to anyone but its owner
#[derive(Debug, Clone, Serialize)]
pub struct RedactedQuiz {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<RedactedQuestion>,
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub section_ids: Vec<Uuid>,
}

impl PublishRequest {
    /// Deduplicated section ids
    pub fn validate(&self) -> Result<Vec<Uuid>, ApiError> {
        let mut ids: Vec<Uuid> = self.section_ids.clone();
        ids.sort_unstable();
        ids.dedup();

        if ids.is_empty() || ids.len() > MAX_PUBLISH_SECTIONS {
            return Err(ApiError::Validation(format!(
                "Choose between 1 and {MAX_PUBLISH_SECTIONS} sections"
            )));
        }
        Ok(ids)
    }
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: i16,
}

impl RatingRequest {
    pub fn validate(&self) -> Result<i16, ApiError> {
        if !(1..=5).contains(&self.rating) {
            return Err(ApiError::Validation(
                "Rating must be between 1 and 5".to_string(),
            ));
        }
        Ok(self.rating)
    }
}
