use std::collections::HashMap;

use chrono::{DateTime, Utc};
use qf_grading::{Answer, GradeReport, Question, QuestionKind};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use uuid::Uuid;

/// Account role, stored as the `user_role` enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Teacher,
    Student,
}

impl UserRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::Student => "student",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "teacher" => Ok(Self::Teacher),
            "student" => Ok(Self::Student),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Who can see a quiz or flashcard set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "visibility", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Owner only
    Private,
    /// Owner and members of the sections it is shared with
    Sections,
    /// Everyone signed in
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "connection_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "attempt_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
    Abandoned,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Full user record as seen by the user themself
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to check a login
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub password_hash: String,
}

/// What other users may see about someone
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PublicProfile {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub device_info: Option<String>,
    pub expires_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Sections and connections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Section {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub join_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Section listing row with its member count
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SectionSummary {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_username: String,
    pub name: String,
    pub description: Option<String>,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SectionMember {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Connection {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub recipient_id: Uuid,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

/// Connection joined with the profile of the party that is not the caller
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ConnectionWithUser {
    pub id: Uuid,
    pub status: ConnectionStatus,
    /// Whether the caller sent the request
    pub outgoing: bool,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub other_user_id: Uuid,
    pub other_username: String,
    pub other_display_name: Option<String>,
    pub other_role: UserRole,
}

// ---------------------------------------------------------------------------
// Flashcards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FlashcardSet {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FlashcardSetSummary {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_username: String,
    pub title: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub card_count: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Flashcard {
    pub id: Uuid,
    pub position: i32,
    pub term: String,
    pub definition: String,
}

/// Card content for inserts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFlashcard {
    pub term: String,
    pub definition: String,
}

// ---------------------------------------------------------------------------
// Quizzes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Quiz {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub time_limit_minutes: Option<i32>,
    pub source_set_id: Option<Uuid>,
    pub rating_avg: f64,
    pub rating_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizSummary {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_username: String,
    pub title: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub time_limit_minutes: Option<i32>,
    pub question_count: i64,
    pub rating_avg: f64,
    pub rating_count: i32,
    pub updated_at: DateTime<Utc>,
}

/// Quiz metadata for inserts and full replacements
#[derive(Debug, Clone)]
pub struct QuizDraft<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub visibility: Visibility,
    pub time_limit_minutes: Option<i32>,
    pub source_set_id: Option<Uuid>,
}

#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub id: Uuid,
    pub position: i32,
    pub prompt: String,
    pub kind: Json<QuestionKind>,
    pub points: i32,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Self {
            id: row.id,
            prompt: row.prompt,
            kind: row.kind.0,
            points: u32::try_from(row.points).unwrap_or_default(),
        }
    }
}

/// Result of recording a rating
#[derive(Debug, Clone, Copy, Serialize, FromRow)]
pub struct RatingSummary {
    pub rating_avg: f64,
    pub rating_count: i32,
}

// ---------------------------------------------------------------------------
// Attempts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Attempt {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub user_id: Uuid,
    pub status: AttemptStatus,
    pub answers: Option<Json<HashMap<Uuid, Answer>>>,
    pub report: Option<Json<GradeReport>>,
    pub score: Option<i32>,
    pub max_score: Option<i32>,
    pub percentage: Option<f64>,
    pub answered_count: i32,
    pub focus_lost_count: i32,
    pub late: bool,
    pub started_at: DateTime<Utc>,
    pub last_heartbeat_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Attempt row for a quiz owner's gradebook
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AttemptWithUser {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub status: AttemptStatus,
    pub score: Option<i32>,
    pub max_score: Option<i32>,
    pub percentage: Option<f64>,
    pub late: bool,
    pub focus_lost_count: i32,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Attempt row for a student's own history
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AttemptWithQuiz {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub quiz_title: String,
    pub status: AttemptStatus,
    pub score: Option<i32>,
    pub max_score: Option<i32>,
    pub percentage: Option<f64>,
    pub late: bool,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// In-progress attempt as shown on the live monitor
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LiveAttempt {
    pub attempt_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub answered_count: i32,
    pub focus_lost_count: i32,
    pub started_at: DateTime<Utc>,
    pub last_heartbeat_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, FromRow)]
pub struct SubmissionStats {
    pub submitted_count: i64,
    pub average_percentage: Option<f64>,
}

/// Graded submission to persist
#[derive(Debug, Clone)]
pub struct GradedSubmission {
    pub answers: HashMap<Uuid, Answer>,
    pub report: GradeReport,
    pub late: bool,
}
