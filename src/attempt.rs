// src/attempt.rs

//! A student's pass through a quiz: which questions are still open, recording
//! one answer per question, and grading the quiz once nothing is left.
//!
//! The functions taking a `SqliteConnection` run inside the caller's
//! transaction; `submit_answer` owns the transaction for a whole submission.

use std::collections::{BTreeSet, HashMap, HashSet};

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::{
    error::{AppError, is_unique_violation},
    grading::{self, QuizScore},
    models::{
        answer::{QuizProgressResponse, StudentAnswer, SubmitAnswerRequest},
        question::{PublicChoice, PublicQuestion, Question},
        quiz::Quiz,
        taken_quiz::TakenQuiz,
    },
};

/// Result of a recorded answer.
#[derive(Debug)]
pub struct SubmitOutcome {
    pub answer: StudentAnswer,
    /// Questions still unanswered after this one.
    pub remaining: usize,
    /// Present when this answer completed the quiz.
    pub completion: Option<Completion>,
}

#[derive(Debug)]
pub struct Completion {
    pub taken: TakenQuiz,
    pub result: QuizScore,
}

pub async fn fetch_quiz(conn: &mut SqliteConnection, quiz_id: i64) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>(
        "SELECT id, owner_id, name, subject_id, created_at FROM quizzes WHERE id = ?",
    )
    .bind(quiz_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

pub async fn find_taken_quiz(
    conn: &mut SqliteConnection,
    student_id: i64,
    quiz_id: i64,
) -> Result<Option<TakenQuiz>, AppError> {
    let taken = sqlx::query_as::<_, TakenQuiz>(
        r#"
        SELECT id, student_id, quiz_id, score, date
        FROM taken_quizzes
        WHERE student_id = ? AND quiz_id = ?
        "#,
    )
    .bind(student_id)
    .bind(quiz_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(taken)
}

/// Returns the quiz's questions the student has not answered yet, ordered by text.
pub async fn get_unanswered_questions(
    conn: &mut SqliteConnection,
    student_id: i64,
    quiz_id: i64,
) -> Result<Vec<Question>, AppError> {
    fetch_quiz(conn, quiz_id).await?;

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT q.id, q.quiz_id, q.text
        FROM questions q
        WHERE q.quiz_id = ?
          AND NOT EXISTS (
              SELECT 1 FROM student_answers a
              WHERE a.question_id = q.id AND a.student_id = ?
          )
        ORDER BY q.text, q.id
        "#,
    )
    .bind(quiz_id)
    .bind(student_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(questions)
}

/// Stores the student's answer to one question.
///
/// Every chosen ID must be a choice of `question_id`. A second answer to the
/// same question is rejected with `Conflict`.
pub async fn record_answer(
    conn: &mut SqliteConnection,
    student_id: i64,
    question_id: i64,
    choice_ids: &[i64],
) -> Result<StudentAnswer, AppError> {
    let chosen: BTreeSet<i64> = choice_ids.iter().copied().collect();
    if chosen.is_empty() {
        return Err(AppError::BadRequest("Choose at least one answer".to_string()));
    }

    let mut query_builder =
        QueryBuilder::<Sqlite>::new("SELECT id FROM choices WHERE question_id = ");
    query_builder.push_bind(question_id);
    query_builder.push(" AND id IN (");
    let mut separated = query_builder.separated(",");
    for id in &chosen {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let owned: Vec<i64> = query_builder
        .build_query_scalar()
        .fetch_all(&mut *conn)
        .await?;

    if owned.len() != chosen.len() {
        return Err(AppError::BadRequest(
            "Chosen answers do not belong to this question".to_string(),
        ));
    }

    let answer = sqlx::query_as::<_, StudentAnswer>(
        r#"
        INSERT INTO student_answers (student_id, question_id)
        VALUES (?, ?)
        RETURNING id, student_id, question_id, created_at
        "#,
    )
    .bind(student_id)
    .bind(question_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Question already answered".to_string())
        } else {
            tracing::error!("Failed to insert student answer: {:?}", e);
            AppError::from(e)
        }
    })?;

    for choice_id in &chosen {
        sqlx::query("INSERT INTO student_answer_choices (answer_id, choice_id) VALUES (?, ?)")
            .bind(answer.id)
            .bind(*choice_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(answer)
}

/// Grades a fully answered quiz and stores the completion record.
///
/// The score is recomputed from the stored answers. If a record already
/// exists for (student, quiz) it is returned unchanged.
pub async fn complete_quiz(
    conn: &mut SqliteConnection,
    student_id: i64,
    quiz_id: i64,
) -> Result<Completion, AppError> {
    let question_ids: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM questions WHERE quiz_id = ? ORDER BY id")
            .bind(quiz_id)
            .fetch_all(&mut *conn)
            .await?;

    let correct_rows: Vec<(i64, i64)> = sqlx::query_as(
        r#"
        SELECT c.question_id, c.id
        FROM choices c
        JOIN questions q ON q.id = c.question_id
        WHERE q.quiz_id = ? AND c.is_correct = 1
        "#,
    )
    .bind(quiz_id)
    .fetch_all(&mut *conn)
    .await?;

    // LEFT JOIN keeps answers whose choices were removed by a later edit;
    // those grade as an empty selection.
    let chosen_rows: Vec<(i64, Option<i64>)> = sqlx::query_as(
        r#"
        SELECT a.question_id, ac.choice_id
        FROM student_answers a
        JOIN questions q ON q.id = a.question_id
        LEFT JOIN student_answer_choices ac ON ac.answer_id = a.id
        WHERE a.student_id = ? AND q.quiz_id = ?
        "#,
    )
    .bind(student_id)
    .bind(quiz_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut correct: HashMap<i64, HashSet<i64>> = HashMap::new();
    for (q_id, choice_id) in correct_rows {
        correct.entry(q_id).or_default().insert(choice_id);
    }

    let mut chosen: HashMap<i64, HashSet<i64>> = HashMap::new();
    for (q_id, choice_id) in chosen_rows {
        let entry = chosen.entry(q_id).or_default();
        if let Some(id) = choice_id {
            entry.insert(id);
        }
    }

    let result = grading::score_quiz(&question_ids, &correct, &chosen)?;

    sqlx::query(
        r#"
        INSERT INTO taken_quizzes (student_id, quiz_id, score)
        VALUES (?, ?, ?)
        ON CONFLICT(student_id, quiz_id) DO NOTHING
        "#,
    )
    .bind(student_id)
    .bind(quiz_id)
    .bind(result.score)
    .execute(&mut *conn)
    .await?;

    let taken = find_taken_quiz(conn, student_id, quiz_id)
        .await?
        .ok_or(AppError::InternalServerError(
            "Completion record missing after insert".to_string(),
        ))?;

    Ok(Completion { taken, result })
}

/// Records one answer and, if it was the last open question, grades the quiz.
///
/// Runs in a single transaction: either the answer (and the completion record,
/// when due) is stored, or nothing is.
pub async fn submit_answer(
    pool: &SqlitePool,
    student_id: i64,
    quiz_id: i64,
    req: &SubmitAnswerRequest,
) -> Result<SubmitOutcome, AppError> {
    let mut tx = pool.begin().await?;

    let quiz = fetch_quiz(&mut tx, quiz_id).await?;

    if find_taken_quiz(&mut tx, student_id, quiz_id).await?.is_some() {
        return Err(AppError::Conflict("Quiz already completed".to_string()));
    }

    let belongs = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM questions WHERE id = ? AND quiz_id = ?",
    )
    .bind(req.question_id)
    .bind(quiz_id)
    .fetch_optional(&mut *tx)
    .await?;

    if belongs.is_none() {
        return Err(AppError::NotFound("Question not found in this quiz".to_string()));
    }

    let answer = record_answer(&mut tx, student_id, req.question_id, &req.choice_ids).await?;

    let remaining = get_unanswered_questions(&mut tx, student_id, quiz_id)
        .await?
        .len();

    let completion = if remaining == 0 {
        Some(complete_quiz(&mut tx, student_id, quiz_id).await?)
    } else {
        None
    };

    tx.commit().await?;

    match &completion {
        Some(c) => tracing::info!(
            "Student {} completed quiz '{}' ({}) with score {}",
            student_id,
            quiz.name,
            quiz_id,
            c.taken.score
        ),
        None => tracing::debug!(
            "Student {} answered question {} of quiz {}, {} left",
            student_id,
            req.question_id,
            quiz_id,
            remaining
        ),
    }

    Ok(SubmitOutcome {
        answer,
        remaining,
        completion,
    })
}

/// Builds the take-quiz view: the first open question and the progress so far.
///
/// A student with every question answered but no completion record (the last
/// open question was deleted by a teacher) gets the quiz graded here, and the
/// view answers `Conflict` carrying the stored score.
pub async fn quiz_progress(
    pool: &SqlitePool,
    student_id: i64,
    quiz_id: i64,
) -> Result<QuizProgressResponse, AppError> {
    let mut tx = pool.begin().await?;

    let quiz = fetch_quiz(&mut tx, quiz_id).await?;

    if find_taken_quiz(&mut tx, student_id, quiz_id).await?.is_some() {
        return Err(AppError::Conflict("Quiz already completed".to_string()));
    }

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE quiz_id = ?")
        .bind(quiz_id)
        .fetch_one(&mut *tx)
        .await?;
    let total_questions = total as usize;

    let unanswered = get_unanswered_questions(&mut tx, student_id, quiz_id).await?;
    let unanswered_count = unanswered.len();
    let progress = grading::progress(total_questions, unanswered_count)?;

    let Some(next) = unanswered.into_iter().next() else {
        let completion = complete_quiz(&mut tx, student_id, quiz_id).await?;
        tx.commit().await?;

        tracing::info!(
            "Student {} completed quiz '{}' ({}) on opening it, score {}",
            student_id,
            quiz.name,
            quiz_id,
            completion.taken.score
        );

        return Err(AppError::Conflict(format!(
            "Quiz already completed with score {}",
            completion.taken.score
        )));
    };

    let choices = sqlx::query_as::<_, PublicChoice>(
        "SELECT id, text FROM choices WHERE question_id = ? ORDER BY id",
    )
    .bind(next.id)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(QuizProgressResponse {
        quiz_id: quiz.id,
        quiz_name: quiz.name,
        total_questions,
        unanswered_count,
        progress,
        question: PublicQuestion {
            id: next.id,
            text: next.text,
            choices,
        },
    })
}
