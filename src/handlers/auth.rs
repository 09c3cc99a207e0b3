// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    handlers::subject::replace_interests,
    models::user::{
        CreateStudentRequest, CreateUserRequest, LoginRequest, ROLE_STUDENT, ROLE_TEACHER, User,
    },
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

/// Inserts a user with an Argon2-hashed password.
/// Maps a duplicate username to 409 Conflict.
async fn insert_user(
    conn: &mut SqliteConnection,
    username: &str,
    password: &str,
    role: &str,
) -> Result<User, AppError> {
    let hashed_password = hash_password(password)?;

    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, password, role)
        VALUES (?, ?, ?)
        RETURNING id, username, password, role, created_at
        "#,
    )
    .bind(username)
    .bind(hashed_password)
    .bind(role)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Username '{}' already exists", username))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })
}

/// Registers a new student together with their subject interests.
///
/// Returns 201 Created and the user object (excluding password).
pub async fn register_student(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = pool.begin().await?;

    let user = insert_user(&mut tx, &payload.username, &payload.password, ROLE_STUDENT).await?;
    replace_interests(&mut tx, user.id, &payload.interests).await?;

    tx.commit().await?;

    tracing::info!("Registered student '{}'", user.username);
    Ok((StatusCode::CREATED, Json(user)))
}

/// Registers a new teacher.
///
/// Returns 201 Created and the user object (excluding password).
pub async fn register_teacher(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut conn = pool.acquire().await?;
    let user = insert_user(&mut conn, &payload.username, &payload.password, ROLE_TEACHER).await?;

    tracing::info!("Registered teacher '{}'", user.username);
    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and returns a JWT token.
///
/// Verifies the username and password against the database.
/// If valid, signs a JWT token with the user's ID and role.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password, role, created_at
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let user = user.ok_or(AppError::AuthError("Invalid username or password".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Invalid username or password".to_string()));
    }

    let token = sign_jwt(user.id, &user.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "role": user.role
    })))
}
