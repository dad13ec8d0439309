//! Final report — the structured result of a completed session.
//!
//! A report is a value, not formatted text; rendering lives in
//! `render`. Aggregate statistics are computed by the caller from the
//! store *after* the reporting session has been removed, so a user's
//! own finished run never counts toward them.

use chrono::{DateTime, Duration, Utc};

use crate::catalog::{Answer, Catalog, Level, MAX_POINTS_PER_QUESTION, Question};
use crate::session::model::{AnswerRecord, Session};
use crate::session::store::AggregateStats;

/// Count of answers per canonical choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnswerTally {
    pub everyone: usize,
    pub contacts: usize,
    pub nobody: usize,
}

impl AnswerTally {
    pub fn count_for(&self, answer: Answer) -> usize {
        match answer {
            Answer::Everyone => self.everyone,
            Answer::Contacts => self.contacts,
            Answer::Nobody => self.nobody,
        }
    }

    /// Total answers tallied; equals the question count for a
    /// completed session.
    pub fn total(&self) -> usize {
        self.everyone + self.contacts + self.nobody
    }
}

/// An answered question that scored below the per-question maximum,
/// paired with its question for the remediation text.
#[derive(Debug, Clone)]
pub struct WeakPoint {
    pub question: Question,
    pub record: AnswerRecord,
}

/// Personalized audit report for one completed session.
#[derive(Debug, Clone)]
pub struct Report {
    pub display_name: String,
    pub score: u32,
    pub max_score: u32,
    pub level: Level,
    /// Time from session start to report generation.
    pub duration: Duration,
    pub finished_at: DateTime<Utc>,
    pub tally: AnswerTally,
    /// Weak points in original question order.
    pub weak_points: Vec<WeakPoint>,
    /// Filled segments of the linear score bar (== score).
    pub bar_filled: usize,
    /// Empty segments (== max − score).
    pub bar_empty: usize,
    pub aggregate: AggregateStats,
}

impl Report {
    /// Build the report for a completed session.
    pub fn build(session: &Session, catalog: &Catalog, aggregate: AggregateStats) -> Report {
        let finished_at = Utc::now();
        let score = session.score;
        let max_score = catalog.max_score();

        let mut tally = AnswerTally::default();
        for record in &session.answers {
            match record.answer {
                Answer::Everyone => tally.everyone += 1,
                Answer::Contacts => tally.contacts += 1,
                Answer::Nobody => tally.nobody += 1,
            }
        }

        let weak_points = session
            .answers
            .iter()
            .filter(|r| r.points < MAX_POINTS_PER_QUESTION)
            .filter_map(|record| {
                catalog.question_by_id(&record.question_id).map(|question| WeakPoint {
                    question: question.clone(),
                    record: record.clone(),
                })
            })
            .collect();

        Report {
            display_name: session.display_name.clone(),
            score,
            max_score,
            level: *catalog.level_for(i64::from(score)),
            duration: finished_at - session.started_at,
            finished_at,
            tally,
            weak_points,
            bar_filled: score as usize,
            bar_empty: max_score.saturating_sub(score) as usize,
            aggregate,
        }
    }
}
