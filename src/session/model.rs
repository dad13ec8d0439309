//! Session data model — one user's in-progress quiz attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Answer;

/// A recorded answer. Immutable once appended; answers are append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// Id of the question this answers.
    pub question_id: String,
    /// The chosen answer.
    pub answer: Answer,
    /// Points earned.
    pub points: u32,
    /// When the answer was accepted.
    pub answered_at: DateTime<Utc>,
}

/// One chat's quiz attempt, keyed by chat id.
///
/// Invariants (outside an in-progress mutation): `current_question`
/// equals `answers.len()`, and `score` equals the sum of recorded
/// points. Complete iff `current_question` equals the catalog length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Telegram chat id owning this session.
    pub chat_id: i64,
    /// User's display name for the report.
    pub display_name: String,
    /// Accepted answers, in question order.
    pub answers: Vec<AnswerRecord>,
    /// Index of the question currently awaiting an answer.
    pub current_question: usize,
    /// Running total score.
    pub score: u32,
    /// When the session was started.
    pub started_at: DateTime<Utc>,
}

impl Session {
    /// Start a fresh session at the first question.
    pub fn new(chat_id: i64, display_name: impl Into<String>) -> Self {
        Self {
            chat_id,
            display_name: display_name.into(),
            answers: Vec::new(),
            current_question: 0,
            score: 0,
            started_at: Utc::now(),
        }
    }

    /// Append an answer for the current question and advance.
    ///
    /// The only mutation path for `answers`, `score`, and
    /// `current_question`.
    pub fn record_answer(&mut self, question_id: &str, answer: Answer) {
        let points = answer.points();
        self.answers.push(AnswerRecord {
            question_id: question_id.to_string(),
            answer,
            points,
            answered_at: Utc::now(),
        });
        self.score += points;
        self.current_question += 1;
    }

    /// Whether every question has been answered.
    pub fn is_complete(&self, total_questions: usize) -> bool {
        self.current_question >= total_questions
    }

    /// Whether the session was started on the current calendar day.
    pub fn started_today(&self, now: DateTime<Utc>) -> bool {
        self.started_at.date_naive() == now.date_naive()
    }
}
