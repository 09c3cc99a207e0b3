// src/handlers/teacher.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{SqliteConnection, SqlitePool};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        question::{Choice, ChoiceInput, Question, QuestionDetailResponse, SaveQuestionRequest},
        quiz::{
            CreateQuizRequest, QuestionSummary, Quiz, QuizDetailResponse, ShareQuizRequest,
            TeacherQuizSummary, UpdateQuizRequest,
        },
        taken_quiz::{QuizResultEntry, QuizResultsResponse},
        user::ROLE_TEACHER,
    },
    utils::{html::clean_html, jwt::Claims},
};

/// Sanitizes teacher-authored text and rejects it if nothing is left.
fn sanitize(field: &str, input: &str) -> Result<String, AppError> {
    let cleaned = clean_html(input);
    if cleaned.is_empty() {
        return Err(AppError::BadRequest(format!("{} cannot be empty", field)));
    }
    Ok(cleaned)
}

/// Loads a quiz the teacher owns or that was shared with them.
/// Returns the quiz and whether access comes through sharing.
async fn editable_quiz(
    conn: &mut SqliteConnection,
    quiz_id: i64,
    teacher_id: i64,
) -> Result<(Quiz, bool), AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, owner_id, name, subject_id, created_at
        FROM quizzes
        WHERE id = ?
          AND (owner_id = ?
               OR EXISTS (
                   SELECT 1 FROM quiz_shared_owners
                   WHERE quiz_id = quizzes.id AND teacher_id = ?
               ))
        "#,
    )
    .bind(quiz_id)
    .bind(teacher_id)
    .bind(teacher_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let shared = quiz.owner_id != teacher_id;
    Ok((quiz, shared))
}

/// Loads a quiz only if the teacher is its owner.
async fn owned_quiz(
    conn: &mut SqliteConnection,
    quiz_id: i64,
    teacher_id: i64,
) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, owner_id, name, subject_id, created_at
        FROM quizzes
        WHERE id = ? AND owner_id = ?
        "#,
    )
    .bind(quiz_id)
    .bind(teacher_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

async fn ensure_subject(conn: &mut SqliteConnection, subject_id: i64) -> Result<(), AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM subjects WHERE id = ?")
        .bind(subject_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::BadRequest("Unknown subject".to_string()))?;
    Ok(())
}

/// Lists quizzes created by or shared with the current teacher.
pub async fn list_quizzes(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let teacher_id = claims.user_id()?;

    let quizzes = sqlx::query_as::<_, TeacherQuizSummary>(
        r#"
        SELECT
            qz.id,
            qz.name,
            qz.subject_id,
            s.name AS subject_name,
            (SELECT COUNT(*) FROM questions q WHERE q.quiz_id = qz.id) AS questions_count,
            (SELECT COUNT(*) FROM taken_quizzes t WHERE t.quiz_id = qz.id) AS taken_count,
            (qz.owner_id != ?) AS shared
        FROM quizzes qz
        JOIN subjects s ON s.id = qz.subject_id
        WHERE qz.owner_id = ?
           OR qz.id IN (SELECT quiz_id FROM quiz_shared_owners WHERE teacher_id = ?)
        ORDER BY qz.name, qz.id
        "#,
    )
    .bind(teacher_id)
    .bind(teacher_id)
    .bind(teacher_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list teacher quizzes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(quizzes))
}

/// Creates a new quiz owned by the current teacher.
pub async fn create_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let teacher_id = claims.user_id()?;
    let name = sanitize("Quiz name", &payload.name)?;

    let mut conn = pool.acquire().await?;
    ensure_subject(&mut conn, payload.subject_id).await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO quizzes (owner_id, name, subject_id) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(teacher_id)
    .bind(&name)
    .bind(payload.subject_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!("Teacher {} created quiz '{}' ({})", teacher_id, name, id);
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Returns a quiz with its questions.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let teacher_id = claims.user_id()?;
    let mut conn = pool.acquire().await?;

    let (quiz, shared) = editable_quiz(&mut conn, quiz_id, teacher_id).await?;

    let questions = sqlx::query_as::<_, QuestionSummary>(
        r#"
        SELECT
            q.id,
            q.text,
            (SELECT COUNT(*) FROM choices c WHERE c.question_id = q.id) AS choices_count
        FROM questions q
        WHERE q.quiz_id = ?
        ORDER BY q.id
        "#,
    )
    .bind(quiz_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Json(QuizDetailResponse {
        quiz,
        shared,
        questions,
    }))
}

/// Updates a quiz's name and/or subject. Shared owners may edit too.
pub async fn update_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let teacher_id = claims.user_id()?;

    let mut tx = pool.begin().await?;
    editable_quiz(&mut tx, quiz_id, teacher_id).await?;

    if let Some(name) = &payload.name {
        let name = sanitize("Quiz name", name)?;
        sqlx::query("UPDATE quizzes SET name = ? WHERE id = ?")
            .bind(name)
            .bind(quiz_id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(subject_id) = payload.subject_id {
        ensure_subject(&mut tx, subject_id).await?;
        sqlx::query("UPDATE quizzes SET subject_id = ? WHERE id = ?")
            .bind(subject_id)
            .bind(quiz_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(StatusCode::OK)
}

/// Deletes a quiz. Only the owner can delete; shared owners get 404.
pub async fn delete_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let teacher_id = claims.user_id()?;
    let mut conn = pool.acquire().await?;

    let quiz = owned_quiz(&mut conn, quiz_id, teacher_id).await?;

    sqlx::query("DELETE FROM quizzes WHERE id = ?")
        .bind(quiz_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    tracing::info!("Teacher {} deleted quiz '{}'", teacher_id, quiz.name);
    Ok(StatusCode::NO_CONTENT)
}

/// Shows who completed a quiz, newest first, with the average score.
pub async fn quiz_results(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let teacher_id = claims.user_id()?;
    let mut conn = pool.acquire().await?;

    let (quiz, _) = editable_quiz(&mut conn, quiz_id, teacher_id).await?;

    let taken_quizzes = sqlx::query_as::<_, QuizResultEntry>(
        r#"
        SELECT t.student_id, u.username, t.score, t.date
        FROM taken_quizzes t
        JOIN users u ON u.id = t.student_id
        WHERE t.quiz_id = ?
        ORDER BY t.date DESC, t.id DESC
        "#,
    )
    .bind(quiz_id)
    .fetch_all(&mut *conn)
    .await?;

    let average_score: Option<f64> =
        sqlx::query_scalar("SELECT AVG(score) FROM taken_quizzes WHERE quiz_id = ?")
            .bind(quiz_id)
            .fetch_one(&mut *conn)
            .await?;

    Ok(Json(QuizResultsResponse {
        quiz_id: quiz.id,
        quiz_name: quiz.name,
        total_taken: taken_quizzes.len(),
        average_score,
        taken_quizzes,
    }))
}

/// Shares a quiz with another teacher. Owner only; sharing twice is a no-op.
pub async fn share_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<ShareQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let teacher_id = claims.user_id()?;
    let mut conn = pool.acquire().await?;

    owned_quiz(&mut conn, quiz_id, teacher_id).await?;

    let target: i64 = sqlx::query_scalar("SELECT id FROM users WHERE username = ? AND role = ?")
        .bind(&payload.username)
        .bind(ROLE_TEACHER)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound(format!(
            "Teacher with username {} does not exist",
            payload.username
        )))?;

    if target == teacher_id {
        return Err(AppError::BadRequest(
            "Cannot share a quiz with yourself".to_string(),
        ));
    }

    sqlx::query("INSERT OR IGNORE INTO quiz_shared_owners (quiz_id, teacher_id) VALUES (?, ?)")
        .bind(quiz_id)
        .bind(target)
        .execute(&mut *conn)
        .await?;

    tracing::info!("Quiz {} shared with {}", quiz_id, payload.username);
    Ok(Json(serde_json::json!({
        "message": format!("Quiz successfully shared with {}", payload.username)
    })))
}

async fn insert_choices(
    conn: &mut SqliteConnection,
    question_id: i64,
    choices: &[ChoiceInput],
) -> Result<(), AppError> {
    for choice in choices {
        let text = sanitize("Choice", &choice.text)?;
        sqlx::query("INSERT INTO choices (question_id, text, is_correct) VALUES (?, ?, ?)")
            .bind(question_id)
            .bind(text)
            .bind(choice.is_correct)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn load_question(
    conn: &mut SqliteConnection,
    quiz_id: i64,
    question_id: i64,
) -> Result<QuestionDetailResponse, AppError> {
    let question = sqlx::query_as::<_, Question>(
        "SELECT id, quiz_id, text FROM questions WHERE id = ? AND quiz_id = ?",
    )
    .bind(question_id)
    .bind(quiz_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    let choices = sqlx::query_as::<_, Choice>(
        "SELECT id, question_id, text, is_correct FROM choices WHERE question_id = ? ORDER BY id",
    )
    .bind(question_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(QuestionDetailResponse { question, choices })
}

/// Adds a question with its choices to a quiz.
pub async fn add_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<SaveQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let teacher_id = claims.user_id()?;
    let text = sanitize("Question", &payload.text)?;

    let mut tx = pool.begin().await?;
    editable_quiz(&mut tx, quiz_id, teacher_id).await?;

    let question_id: i64 =
        sqlx::query_scalar("INSERT INTO questions (quiz_id, text) VALUES (?, ?) RETURNING id")
            .bind(quiz_id)
            .bind(&text)
            .fetch_one(&mut *tx)
            .await?;

    insert_choices(&mut tx, question_id, &payload.choices).await?;
    let detail = load_question(&mut tx, quiz_id, question_id).await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

/// Returns a question with its choices, correctness flags included.
pub async fn get_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((quiz_id, question_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let teacher_id = claims.user_id()?;
    let mut conn = pool.acquire().await?;

    editable_quiz(&mut conn, quiz_id, teacher_id).await?;

    Ok(Json(load_question(&mut conn, quiz_id, question_id).await?))
}

/// Replaces a question's text and its whole choice set.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((quiz_id, question_id)): Path<(i64, i64)>,
    Json(payload): Json<SaveQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let teacher_id = claims.user_id()?;
    let text = sanitize("Question", &payload.text)?;

    let mut tx = pool.begin().await?;
    editable_quiz(&mut tx, quiz_id, teacher_id).await?;
    load_question(&mut tx, quiz_id, question_id).await?;

    sqlx::query("UPDATE questions SET text = ? WHERE id = ?")
        .bind(&text)
        .bind(question_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM choices WHERE question_id = ?")
        .bind(question_id)
        .execute(&mut *tx)
        .await?;

    insert_choices(&mut tx, question_id, &payload.choices).await?;
    let detail = load_question(&mut tx, quiz_id, question_id).await?;

    tx.commit().await?;

    Ok(Json(detail))
}

/// Deletes a question. Shared owners may delete too.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((quiz_id, question_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let teacher_id = claims.user_id()?;
    let mut conn = pool.acquire().await?;

    editable_quiz(&mut conn, quiz_id, teacher_id).await?;

    let result = sqlx::query("DELETE FROM questions WHERE id = ? AND quiz_id = ?")
        .bind(question_id)
        .bind(quiz_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
