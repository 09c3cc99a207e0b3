// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, student, subject, teacher},
    state::AppState,
    utils::jwt::{auth_middleware, student_middleware, teacher_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, subjects, students, teachers).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool, Config).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/register/student", post(auth::register_student))
        .route("/register/teacher", post(auth::register_teacher))
        .route("/login", post(auth::login));

    let student_routes = Router::new()
        .route(
            "/interests",
            get(student::get_interests).put(student::update_interests),
        )
        .route("/quizzes", get(student::list_available_quizzes))
        .route("/quizzes/taken", get(student::list_taken_quizzes))
        .route("/quizzes/{id}", get(student::take_quiz))
        .route("/quizzes/{id}/answers", post(student::submit_answer))
        // Auth first, then the role check
        .layer(middleware::from_fn(student_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let teacher_routes = Router::new()
        .route(
            "/quizzes",
            get(teacher::list_quizzes).post(teacher::create_quiz),
        )
        .route(
            "/quizzes/{id}",
            get(teacher::get_quiz)
                .put(teacher::update_quiz)
                .delete(teacher::delete_quiz),
        )
        .route("/quizzes/{id}/results", get(teacher::quiz_results))
        .route("/quizzes/{id}/share", post(teacher::share_quiz))
        .route("/quizzes/{id}/questions", post(teacher::add_question))
        .route(
            "/quizzes/{id}/questions/{question_id}",
            get(teacher::get_question)
                .put(teacher::update_question)
                .delete(teacher::delete_question),
        )
        .layer(middleware::from_fn(teacher_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .route("/api/subjects", get(subject::list_subjects))
        .nest("/api/students", student_routes)
        .nest("/api/teachers", teacher_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
