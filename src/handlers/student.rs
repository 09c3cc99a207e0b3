// src/handlers/student.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    attempt,
    error::AppError,
    handlers::subject::{fetch_interests, replace_interests},
    models::{
        answer::{SubmitAnswerRequest, SubmitAnswerResponse},
        quiz::StudentQuizSummary,
        subject::UpdateInterestsRequest,
        taken_quiz::TakenQuizEntry,
    },
    utils::jwt::Claims,
};

/// Returns the subjects the current student is interested in.
pub async fn get_interests(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let mut conn = pool.acquire().await?;

    Ok(Json(fetch_interests(&mut conn, student_id).await?))
}

/// Replaces the current student's interests.
pub async fn update_interests(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateInterestsRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let student_id = claims.user_id()?;

    let mut tx = pool.begin().await?;
    replace_interests(&mut tx, student_id, &payload.subject_ids).await?;
    let subjects = fetch_interests(&mut tx, student_id).await?;
    tx.commit().await?;

    Ok(Json(subjects))
}

/// Lists quizzes the student can still take.
///
/// Only quizzes in the student's interest subjects, not yet completed, and
/// with at least one question. Ordered by name.
pub async fn list_available_quizzes(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;

    let quizzes = sqlx::query_as::<_, StudentQuizSummary>(
        r#"
        SELECT
            qz.id,
            qz.name,
            qz.subject_id,
            s.name AS subject_name,
            (SELECT COUNT(*) FROM questions q WHERE q.quiz_id = qz.id) AS questions_count
        FROM quizzes qz
        JOIN subjects s ON s.id = qz.subject_id
        WHERE qz.subject_id IN (
                SELECT subject_id FROM student_interests WHERE student_id = ?
            )
          AND qz.id NOT IN (
                SELECT quiz_id FROM taken_quizzes WHERE student_id = ?
            )
          AND EXISTS (SELECT 1 FROM questions q WHERE q.quiz_id = qz.id)
        ORDER BY qz.name, qz.id
        "#,
    )
    .bind(student_id)
    .bind(student_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list available quizzes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(quizzes))
}

/// Lists the quizzes the student completed, with their scores.
pub async fn list_taken_quizzes(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;

    let taken = sqlx::query_as::<_, TakenQuizEntry>(
        r#"
        SELECT
            t.quiz_id,
            qz.name AS quiz_name,
            s.name AS subject_name,
            t.score,
            t.date
        FROM taken_quizzes t
        JOIN quizzes qz ON qz.id = t.quiz_id
        JOIN subjects s ON s.id = qz.subject_id
        WHERE t.student_id = ?
        ORDER BY qz.name, t.id
        "#,
    )
    .bind(student_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list taken quizzes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(taken))
}

/// Shows the next unanswered question of a quiz along with the progress.
pub async fn take_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;

    Ok(Json(attempt::quiz_progress(&pool, student_id, quiz_id).await?))
}

/// Records the answer to one question.
///
/// When it was the last open question, the quiz is graded and the response
/// carries the final score.
pub async fn submit_answer(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let student_id = claims.user_id()?;

    let outcome = attempt::submit_answer(&pool, student_id, quiz_id, &payload).await?;

    Ok(Json(SubmitAnswerResponse {
        answer_id: outcome.answer.id,
        completed: outcome.completion.is_some(),
        score: outcome.completion.as_ref().map(|c| c.taken.score),
        correct_count: outcome.completion.as_ref().map(|c| c.result.correct_count),
        remaining: outcome.remaining,
    }))
}
