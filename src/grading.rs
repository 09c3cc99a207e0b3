// src/grading.rs

//! Quiz grading.
//!
//! A question counts as correct only when the set of choices the student
//! picked is exactly the set of choices flagged correct. There is no partial
//! credit and no negative marking.

use std::collections::{HashMap, HashSet};

/// Reasons a quiz cannot be graded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradingError {
    /// The quiz has no questions, so no percentage can be derived.
    NoQuestions,
    /// A question of the quiz has no recorded answer.
    MissingAnswer(i64),
}

/// Outcome of grading a fully answered quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizScore {
    pub correct_count: usize,
    pub total_questions: usize,
    /// Percentage rounded to two decimal places.
    pub score: f64,
}

/// Exact set comparison between the correct choices and the chosen ones.
pub fn is_answer_correct(correct: &HashSet<i64>, chosen: &HashSet<i64>) -> bool {
    correct == chosen
}

/// Grades every question of a quiz.
///
/// * `question_ids`: all questions belonging to the quiz.
/// * `correct`: question id -> ids of the choices flagged correct.
/// * `chosen`: question id -> ids of the choices the student submitted.
pub fn score_quiz(
    question_ids: &[i64],
    correct: &HashMap<i64, HashSet<i64>>,
    chosen: &HashMap<i64, HashSet<i64>>,
) -> Result<QuizScore, GradingError> {
    if question_ids.is_empty() {
        return Err(GradingError::NoQuestions);
    }

    let empty = HashSet::new();
    let mut correct_count = 0;

    for q_id in question_ids {
        let picked = chosen.get(q_id).ok_or(GradingError::MissingAnswer(*q_id))?;
        let expected = correct.get(q_id).unwrap_or(&empty);

        if is_answer_correct(expected, picked) {
            correct_count += 1;
        }
    }

    let total_questions = question_ids.len();
    let score = round2(correct_count as f64 / total_questions as f64 * 100.0);

    Ok(QuizScore {
        correct_count,
        total_questions,
        score,
    })
}

/// Percentage of the quiz already behind the student, counting the question
/// currently shown as done.
pub fn progress(total_questions: usize, unanswered: usize) -> Result<i64, GradingError> {
    if total_questions == 0 {
        return Err(GradingError::NoQuestions);
    }

    let remaining = unanswered as f64 - 1.0;
    let value = 100 - (remaining / total_questions as f64 * 100.0).round_ties_even() as i64;
    Ok(value.clamp(0, 100))
}

/// Halves round to the even neighbour.
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
