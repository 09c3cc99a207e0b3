use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'subjects' table. Quizzes are filed under a subject and
/// students pick the subjects they are interested in.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    /// Badge color as a `#rrggbb` hex string.
    pub color: String,
}

/// DTO for replacing a student's interests.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInterestsRequest {
    #[validate(length(min = 1, message = "Pick at least one subject."))]
    pub subject_ids: Vec<i64>,
}
