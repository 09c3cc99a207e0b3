// tests/attempt_tests.rs

use std::str::FromStr;

use classroom::{
    attempt::{self, SubmitOutcome},
    error::AppError,
    models::answer::SubmitAnswerRequest,
};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// In-memory database with migrations applied.
/// A single connection that never expires keeps the database alive.
async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    pool
}

async fn insert_user(pool: &SqlitePool, username: &str, role: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO users (username, password, role) VALUES (?, 'x', ?) RETURNING id",
    )
    .bind(username)
    .bind(role)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn insert_quiz(pool: &SqlitePool, owner_id: i64, name: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO quizzes (owner_id, name, subject_id) VALUES (?, ?, 1) RETURNING id",
    )
    .bind(owner_id)
    .bind(name)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn insert_question(pool: &SqlitePool, quiz_id: i64, text: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO questions (quiz_id, text) VALUES (?, ?) RETURNING id")
        .bind(quiz_id)
        .bind(text)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn insert_choice(pool: &SqlitePool, question_id: i64, text: &str, is_correct: bool) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO choices (question_id, text, is_correct) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(question_id)
    .bind(text)
    .bind(is_correct)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn count_taken(pool: &SqlitePool, student_id: i64, quiz_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM taken_quizzes WHERE student_id = ? AND quiz_id = ?")
        .bind(student_id)
        .bind(quiz_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Two questions:
/// * question1: choice11 (correct), choice12 (correct), choice13
/// * question2: choice21, choice22 (correct), choice23, choice24 (correct)
struct Fixture {
    pool: SqlitePool,
    student_id: i64,
    quiz_id: i64,
    question1: i64,
    question2: i64,
    choice11: i64,
    choice12: i64,
    choice13: i64,
    choice21: i64,
    choice22: i64,
    choice24: i64,
}

async fn fixture() -> Fixture {
    let pool = test_pool().await;
    let teacher_id = insert_user(&pool, "teacher1", "teacher").await;
    let student_id = insert_user(&pool, "student1", "student").await;
    let quiz_id = insert_quiz(&pool, teacher_id, "quiz1").await;

    let question1 = insert_question(&pool, quiz_id, "question1").await;
    let choice11 = insert_choice(&pool, question1, "choice11", true).await;
    let choice12 = insert_choice(&pool, question1, "choice12", true).await;
    let choice13 = insert_choice(&pool, question1, "choice13", false).await;

    let question2 = insert_question(&pool, quiz_id, "question2").await;
    let choice21 = insert_choice(&pool, question2, "choice21", false).await;
    let choice22 = insert_choice(&pool, question2, "choice22", true).await;
    insert_choice(&pool, question2, "choice23", false).await;
    let choice24 = insert_choice(&pool, question2, "choice24", true).await;

    Fixture {
        pool,
        student_id,
        quiz_id,
        question1,
        question2,
        choice11,
        choice12,
        choice13,
        choice21,
        choice22,
        choice24,
    }
}

async fn submit(f: &Fixture, question_id: i64, choice_ids: &[i64]) -> Result<SubmitOutcome, AppError> {
    let req = SubmitAnswerRequest {
        question_id,
        choice_ids: choice_ids.to_vec(),
    };
    attempt::submit_answer(&f.pool, f.student_id, f.quiz_id, &req).await
}

async fn unanswered_texts(f: &Fixture) -> Vec<String> {
    let mut conn = f.pool.acquire().await.unwrap();
    attempt::get_unanswered_questions(&mut conn, f.student_id, f.quiz_id)
        .await
        .unwrap()
        .into_iter()
        .map(|q| q.text)
        .collect()
}

#[tokio::test]
async fn test_unanswered_questions_shrink_as_answers_arrive() {
    let f = fixture().await;

    assert_eq!(unanswered_texts(&f).await, vec!["question1", "question2"]);

    submit(&f, f.question1, &[f.choice11, f.choice12]).await.unwrap();
    assert_eq!(unanswered_texts(&f).await, vec!["question2"]);

    submit(&f, f.question2, &[f.choice21, f.choice22]).await.unwrap();
    assert!(unanswered_texts(&f).await.is_empty());
}

#[tokio::test]
async fn test_unanswered_questions_are_the_complement_ordered_by_text() {
    let pool = test_pool().await;
    let teacher_id = insert_user(&pool, "t", "teacher").await;
    let student_id = insert_user(&pool, "s", "student").await;
    let quiz_id = insert_quiz(&pool, teacher_id, "ordering").await;

    let q_banana = insert_question(&pool, quiz_id, "banana").await;
    insert_question(&pool, quiz_id, "cherry").await;
    insert_question(&pool, quiz_id, "apple").await;
    let choice = insert_choice(&pool, q_banana, "yes", true).await;
    insert_choice(&pool, q_banana, "no", false).await;

    let mut conn = pool.acquire().await.unwrap();
    attempt::record_answer(&mut conn, student_id, q_banana, &[choice])
        .await
        .unwrap();

    let texts: Vec<String> = attempt::get_unanswered_questions(&mut conn, student_id, quiz_id)
        .await
        .unwrap()
        .into_iter()
        .map(|q| q.text)
        .collect();

    assert_eq!(texts, vec!["apple", "cherry"]);
}

#[tokio::test]
async fn test_unanswered_questions_unknown_quiz() {
    let pool = test_pool().await;
    let mut conn = pool.acquire().await.unwrap();

    let result = attempt::get_unanswered_questions(&mut conn, 1, 999).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_final_answer_creates_exactly_one_completion() {
    let f = fixture().await;

    let first = submit(&f, f.question1, &[f.choice11, f.choice12]).await.unwrap();
    assert_eq!(first.remaining, 1);
    assert!(first.completion.is_none());
    assert_eq!(count_taken(&f.pool, f.student_id, f.quiz_id).await, 0);

    let last = submit(&f, f.question2, &[f.choice22, f.choice24]).await.unwrap();
    assert_eq!(last.remaining, 0);
    let completion = last.completion.expect("quiz should be complete");
    assert_eq!(completion.taken.score, 100.0);
    assert_eq!(completion.result.correct_count, 2);
    assert_eq!(count_taken(&f.pool, f.student_id, f.quiz_id).await, 1);
}

#[tokio::test]
async fn test_one_of_two_correct_scores_fifty() {
    let f = fixture().await;

    submit(&f, f.question1, &[f.choice11, f.choice12]).await.unwrap();
    let last = submit(&f, f.question2, &[f.choice21, f.choice22]).await.unwrap();

    let completion = last.completion.unwrap();
    assert_eq!(completion.taken.score, 50.0);
    assert_eq!(completion.result.correct_count, 1);
    assert_eq!(completion.result.total_questions, 2);
}

#[tokio::test]
async fn test_partial_or_extra_choices_count_as_wrong() {
    let f = fixture().await;

    // {A} misses a correct choice, {A, C} adds a wrong one.
    submit(&f, f.question1, &[f.choice11, f.choice13]).await.unwrap();
    let last = submit(&f, f.question2, &[f.choice22]).await.unwrap();

    assert_eq!(last.completion.unwrap().taken.score, 0.0);
}

#[tokio::test]
async fn test_completion_is_idempotent() {
    let f = fixture().await;

    submit(&f, f.question1, &[f.choice11, f.choice12]).await.unwrap();
    let last = submit(&f, f.question2, &[f.choice22, f.choice24]).await.unwrap();
    let first_record = last.completion.unwrap().taken;

    let mut conn = f.pool.acquire().await.unwrap();
    let again = attempt::complete_quiz(&mut conn, f.student_id, f.quiz_id)
        .await
        .unwrap();
    drop(conn);

    assert_eq!(again.taken.id, first_record.id);
    assert_eq!(count_taken(&f.pool, f.student_id, f.quiz_id).await, 1);

    let resubmit = submit(&f, f.question2, &[f.choice22]).await;
    assert!(matches!(resubmit, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_zero_question_quiz_is_not_scored() {
    let pool = test_pool().await;
    let teacher_id = insert_user(&pool, "t", "teacher").await;
    let student_id = insert_user(&pool, "s", "student").await;
    let quiz_id = insert_quiz(&pool, teacher_id, "empty").await;

    let mut conn = pool.acquire().await.unwrap();
    let result = attempt::complete_quiz(&mut conn, student_id, quiz_id).await;
    drop(conn);
    assert!(matches!(result, Err(AppError::Unprocessable(_))));

    let progress = attempt::quiz_progress(&pool, student_id, quiz_id).await;
    assert!(matches!(progress, Err(AppError::Unprocessable(_))));

    assert_eq!(count_taken(&pool, student_id, quiz_id).await, 0);
}

#[tokio::test]
async fn test_choices_of_another_question_are_rejected() {
    let f = fixture().await;

    let result = submit(&f, f.question1, &[f.choice11, f.choice21]).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    // Nothing was stored.
    assert_eq!(unanswered_texts(&f).await, vec!["question1", "question2"]);
}

#[tokio::test]
async fn test_empty_choice_set_is_rejected() {
    let f = fixture().await;

    let result = submit(&f, f.question1, &[]).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn test_second_answer_to_same_question_is_rejected() {
    let f = fixture().await;

    submit(&f, f.question1, &[f.choice11]).await.unwrap();
    let again = submit(&f, f.question1, &[f.choice12]).await;

    assert!(matches!(again, Err(AppError::Conflict(_))));
    assert_eq!(unanswered_texts(&f).await, vec!["question2"]);
}

#[tokio::test]
async fn test_question_from_another_quiz_is_not_found() {
    let f = fixture().await;
    let other_quiz = insert_quiz(&f.pool, 1, "other").await;
    let foreign = insert_question(&f.pool, other_quiz, "foreign").await;
    let choice = insert_choice(&f.pool, foreign, "x", true).await;

    let result = submit(&f, foreign, &[choice]).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_progress_reports_next_question() {
    let f = fixture().await;

    let view = attempt::quiz_progress(&f.pool, f.student_id, f.quiz_id)
        .await
        .unwrap();
    assert_eq!(view.question.id, f.question1);
    assert_eq!(view.question.choices.len(), 3);
    assert_eq!(view.total_questions, 2);
    assert_eq!(view.unanswered_count, 2);
    assert_eq!(view.progress, 50);

    submit(&f, f.question1, &[f.choice11, f.choice12]).await.unwrap();

    let view = attempt::quiz_progress(&f.pool, f.student_id, f.quiz_id)
        .await
        .unwrap();
    assert_eq!(view.question.id, f.question2);
    assert_eq!(view.progress, 100);
}

#[tokio::test]
async fn test_progress_after_completion_is_conflict() {
    let f = fixture().await;

    submit(&f, f.question1, &[f.choice11, f.choice12]).await.unwrap();
    submit(&f, f.question2, &[f.choice22, f.choice24]).await.unwrap();

    let view = attempt::quiz_progress(&f.pool, f.student_id, f.quiz_id).await;
    assert!(matches!(view, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_opening_quiz_grades_it_when_last_open_question_was_deleted() {
    let f = fixture().await;

    submit(&f, f.question1, &[f.choice11, f.choice12]).await.unwrap();

    sqlx::query("DELETE FROM questions WHERE id = ?")
        .bind(f.question2)
        .execute(&f.pool)
        .await
        .unwrap();

    let view = attempt::quiz_progress(&f.pool, f.student_id, f.quiz_id).await;
    match view {
        Err(AppError::Conflict(msg)) => assert!(msg.contains("100")),
        other => panic!("expected conflict with score, got {:?}", other),
    }
    assert_eq!(count_taken(&f.pool, f.student_id, f.quiz_id).await, 1);

    let score: f64 =
        sqlx::query_scalar("SELECT score FROM taken_quizzes WHERE student_id = ? AND quiz_id = ?")
            .bind(f.student_id)
            .bind(f.quiz_id)
            .fetch_one(&f.pool)
            .await
            .unwrap();
    assert_eq!(score, 100.0);

    // Opening it again reports the stored record without grading twice.
    let again = attempt::quiz_progress(&f.pool, f.student_id, f.quiz_id).await;
    assert!(matches!(again, Err(AppError::Conflict(_))));
    assert_eq!(count_taken(&f.pool, f.student_id, f.quiz_id).await, 1);
}
