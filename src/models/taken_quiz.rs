// src/models/taken_quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'taken_quizzes' table in the database.
/// Created once per (student, quiz) when the last question gets answered.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TakenQuiz {
    pub id: i64,
    pub student_id: i64,
    pub quiz_id: i64,
    pub score: f64,
    pub date: chrono::DateTime<chrono::Utc>,
}

/// Row of the student's completed quizzes list.
#[derive(Debug, Serialize, FromRow)]
pub struct TakenQuizEntry {
    pub quiz_id: i64,
    pub quiz_name: String,
    pub subject_name: String,
    pub score: f64,
    pub date: chrono::DateTime<chrono::Utc>,
}

/// Row of a quiz's results, joined with `users`.
#[derive(Debug, Serialize, FromRow)]
pub struct QuizResultEntry {
    pub student_id: i64,
    pub username: String,
    pub score: f64,
    pub date: chrono::DateTime<chrono::Utc>,
}

/// DTO for the teacher's results view.
#[derive(Debug, Serialize)]
pub struct QuizResultsResponse {
    pub quiz_id: i64,
    pub quiz_name: String,
    pub total_taken: usize,
    pub average_score: Option<f64>,
    pub taken_quizzes: Vec<QuizResultEntry>,
}
