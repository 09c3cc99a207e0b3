// src/models/answer.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::PublicQuestion;

/// Represents the 'student_answers' table in the database.
/// The chosen choices live in 'student_answer_choices'.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StudentAnswer {
    pub id: i64,
    pub student_id: i64,
    pub question_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for answering one question of a quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    pub question_id: i64,

    /// Selected choice IDs. At least one is required.
    #[validate(length(min = 1, message = "Choose at least one answer."))]
    pub choice_ids: Vec<i64>,
}

/// DTO returned after an answer is recorded.
#[derive(Debug, Serialize)]
pub struct SubmitAnswerResponse {
    pub answer_id: i64,
    /// True once every question of the quiz has an answer.
    pub completed: bool,
    /// Final percentage, present only when `completed` is true.
    pub score: Option<f64>,
    pub correct_count: Option<usize>,
    pub remaining: usize,
}

/// DTO for the take-quiz view: the next question and how far along the student is.
#[derive(Debug, Serialize)]
pub struct QuizProgressResponse {
    pub quiz_id: i64,
    pub quiz_name: String,
    pub total_questions: usize,
    pub unanswered_count: usize,
    pub progress: i64,
    pub question: PublicQuestion,
}
