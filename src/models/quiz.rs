// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,

    /// The teacher who created the quiz.
    pub owner_id: i64,

    pub name: String,

    pub subject_id: i64,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Row of the teacher's quiz list, owned or shared.
#[derive(Debug, Serialize, FromRow)]
pub struct TeacherQuizSummary {
    pub id: i64,
    pub name: String,
    pub subject_id: i64,
    pub subject_name: String,
    pub questions_count: i64,
    pub taken_count: i64,
    /// True when the quiz belongs to another teacher and was shared with the caller.
    pub shared: bool,
}

/// Row of the student's list of quizzes still open to them.
#[derive(Debug, Serialize, FromRow)]
pub struct StudentQuizSummary {
    pub id: i64,
    pub name: String,
    pub subject_id: i64,
    pub subject_name: String,
    pub questions_count: i64,
}

/// Question row inside the teacher's quiz detail view.
#[derive(Debug, Serialize, FromRow)]
pub struct QuestionSummary {
    pub id: i64,
    pub text: String,
    pub choices_count: i64,
}

/// DTO for the teacher's quiz detail view.
#[derive(Debug, Serialize)]
pub struct QuizDetailResponse {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub shared: bool,
    pub questions: Vec<QuestionSummary>,
}

/// DTO for creating a new quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub subject_id: i64,
}

/// DTO for updating a quiz. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub subject_id: Option<i64>,
}

/// DTO for sharing a quiz with another teacher.
#[derive(Debug, Deserialize, Validate)]
pub struct ShareQuizRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
}
