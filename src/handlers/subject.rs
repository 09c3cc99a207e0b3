// src/handlers/subject.rs

use std::collections::BTreeSet;

use axum::{Json, extract::State, response::IntoResponse};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::{error::AppError, models::subject::Subject};

/// Lists all subjects, alphabetically.
pub async fn list_subjects(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let subjects =
        sqlx::query_as::<_, Subject>("SELECT id, name, color FROM subjects ORDER BY name")
            .fetch_all(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list subjects: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

    Ok(Json(subjects))
}

/// Replaces the interest set of a student.
///
/// Every ID must reference an existing subject.
pub async fn replace_interests(
    conn: &mut SqliteConnection,
    student_id: i64,
    subject_ids: &[i64],
) -> Result<(), AppError> {
    let wanted: BTreeSet<i64> = subject_ids.iter().copied().collect();
    if wanted.is_empty() {
        return Err(AppError::BadRequest("Pick at least one subject".to_string()));
    }

    let mut query_builder =
        QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM subjects WHERE id IN (");
    let mut separated = query_builder.separated(",");
    for id in &wanted {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let found: i64 = query_builder
        .build_query_scalar()
        .fetch_one(&mut *conn)
        .await?;

    if found as usize != wanted.len() {
        return Err(AppError::BadRequest("Unknown subject".to_string()));
    }

    sqlx::query("DELETE FROM student_interests WHERE student_id = ?")
        .bind(student_id)
        .execute(&mut *conn)
        .await?;

    for subject_id in &wanted {
        sqlx::query("INSERT INTO student_interests (student_id, subject_id) VALUES (?, ?)")
            .bind(student_id)
            .bind(*subject_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Subjects a student picked, alphabetically.
pub async fn fetch_interests(
    conn: &mut SqliteConnection,
    student_id: i64,
) -> Result<Vec<Subject>, AppError> {
    let subjects = sqlx::query_as::<_, Subject>(
        r#"
        SELECT s.id, s.name, s.color
        FROM subjects s
        JOIN student_interests si ON si.subject_id = s.id
        WHERE si.student_id = ?
        ORDER BY s.name
        "#,
    )
    .bind(student_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(subjects)
}
