// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

pub const MIN_CHOICES: usize = 2;
pub const MAX_CHOICES: usize = 5;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: i64,

    pub quiz_id: i64,

    /// The text of the question. Unanswered questions are served in text order.
    pub text: String,
}

/// Represents the 'choices' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Choice {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
}

/// DTO for sending a choice to a student (excludes the correctness flag).
#[derive(Debug, Serialize, FromRow)]
pub struct PublicChoice {
    pub id: i64,
    pub text: String,
}

/// DTO for sending a question to a student.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub choices: Vec<PublicChoice>,
}

/// DTO for the teacher's question editor.
#[derive(Debug, Serialize)]
pub struct QuestionDetailResponse {
    #[serde(flatten)]
    pub question: Question,
    pub choices: Vec<Choice>,
}

/// One choice inside a question payload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChoiceInput {
    #[validate(length(min = 1, max = 255))]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// DTO for creating or replacing a question along with its choices.
#[derive(Debug, Deserialize, Validate)]
pub struct SaveQuestionRequest {
    #[validate(length(min = 1, max = 255))]
    pub text: String,
    #[validate(nested, custom(function = validate_choices))]
    pub choices: Vec<ChoiceInput>,
}

/// A question needs between 2 and 5 choices, at least one of them correct.
fn validate_choices(choices: &[ChoiceInput]) -> Result<(), validator::ValidationError> {
    if choices.len() < MIN_CHOICES || choices.len() > MAX_CHOICES {
        return Err(validator::ValidationError::new("choices_count_out_of_range"));
    }
    if !choices.iter().any(|c| c.is_correct) {
        return Err(validator::ValidationError::new("no_correct_answer")
            .with_message("Mark at least one answer as correct.".into()));
    }
    Ok(())
}
