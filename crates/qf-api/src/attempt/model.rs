use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use qf_db::models::{Attempt, LiveAttempt};
use qf_grading::{Answer, Question};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, quiz::model::RedactedQuiz};

/// Seconds allowed past the limit before a submission counts as late
pub const LATE_GRACE_SECONDS: i64 = 30;
/// Open attempts without a heartbeat for this long show as idle
pub const IDLE_AFTER_SECONDS: i64 = 120;

/// Whether a submission at `submitted_at` is past the time limit plus grace
pub fn is_late(
    started_at: DateTime<Utc>,
    time_limit_minutes: Option<i32>,
    submitted_at: DateTime<Utc>,
) -> bool {
    match time_limit_minutes {
        Some(minutes) => {
            let deadline = started_at
                + Duration::minutes(i64::from(minutes))
                + Duration::seconds(LATE_GRACE_SECONDS);
            submitted_at > deadline
        }
        None => false,
    }
}

pub fn is_idle(last_heartbeat_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - last_heartbeat_at > Duration::seconds(IDLE_AFTER_SECONDS)
}

/// Attempt together with the questions to answer
#[derive(Debug, Serialize)]
pub struct StartedAttempt {
    pub attempt: Attempt,
    pub quiz: RedactedQuiz,
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub answered_count: i32,
    pub focus_lost_count: i32,
}

impl ProgressRequest {
    pub fn validate(&self, question_count: usize) -> Result<(), ApiError> {
        if self.answered_count < 0 || self.focus_lost_count < 0 {
            return Err(ApiError::Validation(
                "Progress counters cannot be negative".to_string(),
            ));
        }
        if self.answered_count as usize > question_count {
            return Err(ApiError::Validation(format!(
                "Answered count cannot exceed the {question_count} questions of this quiz"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: Uuid,
    pub answer: Answer,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
}

impl SubmitRequest {
    /// Key the answers by question, rejecting ids the quiz does not have
    pub fn into_answer_map(self, questions: &[Question]) -> Result<HashMap<Uuid, Answer>, ApiError> {
        let known: HashSet<Uuid> = questions.iter().map(|q| q.id).collect();
        let mut answers = HashMap::with_capacity(self.answers.len());

        for submitted in self.answers {
            if !known.contains(&submitted.question_id) {
                return Err(ApiError::Validation(format!(
                    "Unknown question id {}",
                    submitted.question_id
                )));
            }
            if answers.insert(submitted.question_id, submitted.answer).is_some() {
                return Err(ApiError::Validation(format!(
                    "Question {} answered more than once",
                    submitted.question_id
                )));
            }
        }
        Ok(answers)
    }
}

#[derive(Debug, Serialize)]
pub struct LiveParticipant {
    #[serde(flatten)]
    pub attempt: LiveAttempt,
    pub idle: bool,
}

/// Live monitor for a quiz owner
#[derive(Debug, Serialize)]
pub struct LiveSession {
    pub quiz_id: Uuid,
    pub total_questions: usize,
    pub in_progress: Vec<LiveParticipant>,
    pub submitted_count: i64,
    pub average_percentage: Option<f64>,
}
