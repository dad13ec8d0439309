//! Session state machine — pure transitions.
//!
//! Transitions mutate a `Session` and return the effects to emit; no
//! I/O happens here. The dispatcher's effect executor renders and sends
//! them (and owns the pause after a risk explanation), so the machine
//! is unit-testable without a transport.

use crate::catalog::{Answer, Catalog};
use crate::session::model::Session;

/// A side effect requested by a transition, to be executed later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Show the welcome screen with the begin button.
    ShowWelcome,
    /// Ask the question at this catalog index, answer keyboard attached.
    AskQuestion { index: usize },
    /// Explain the risk of the answer just given to this question.
    ExplainRisk { index: usize, answer: Answer },
    /// Acknowledge a cancelled check.
    Cancelled,
}

/// Outcome of submitting an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The session continues; emit these effects.
    Advanced(Vec<Effect>),
    /// The session is over. The caller removes it from the store and,
    /// if `report` is set, builds and sends the final report.
    Ended { report: bool, effects: Vec<Effect> },
}

/// What the user pressed on the answer keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Choice(Answer),
    Cancel,
}

/// Start a fresh session. Any prior session for the chat is discarded
/// by the caller when it inserts this one into the store.
pub fn start(chat_id: i64, display_name: &str) -> (Session, Vec<Effect>) {
    (
        Session::new(chat_id, display_name),
        vec![Effect::ShowWelcome],
    )
}

/// The begin button was pressed: (re-)emit the current question.
pub fn begin(session: &Session) -> Effect {
    Effect::AskQuestion {
        index: session.current_question,
    }
}

/// Accept an answer (or a cancel) for the session's current question.
///
/// The risk explanation is emitted before the completion check, so it
/// is shown even for the final question, immediately ahead of the
/// report.
pub fn submit_answer(session: &mut Session, submission: Submission, catalog: &Catalog) -> Step {
    let choice = match submission {
        Submission::Cancel => {
            return Step::Ended {
                report: false,
                effects: vec![Effect::Cancelled],
            };
        }
        Submission::Choice(answer) => answer,
    };

    let index = session.current_question;
    let Some(question) = catalog.question(index) else {
        // Completed sessions are removed from the store, so this is
        // unreachable under the dispatcher's routing contract.
        return Step::Advanced(Vec::new());
    };

    session.record_answer(question.id, choice);

    let mut effects = vec![Effect::ExplainRisk {
        index,
        answer: choice,
    }];

    if session.is_complete(catalog.len()) {
        Step::Ended {
            report: true,
            effects,
        }
    } else {
        effects.push(Effect::AskQuestion { index: index + 1 });
        Step::Advanced(effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::standard()
    }

    #[test]
    fn start_emits_welcome_only() {
        let (session, effects) = start(7, "Alice");
        assert_eq!(session.chat_id, 7);
        assert_eq!(session.current_question, 0);
        assert_eq!(effects, vec![Effect::ShowWelcome]);
    }

    #[test]
    fn begin_asks_the_current_question() {
        let (mut session, _) = start(7, "Alice");
        assert_eq!(begin(&session), Effect::AskQuestion { index: 0 });

        submit_answer(&mut session, Submission::Choice(Answer::Nobody), &catalog());
        assert_eq!(begin(&session), Effect::AskQuestion { index: 1 });
    }

    #[test]
    fn answer_explains_risk_then_asks_next() {
        let catalog = catalog();
        let (mut session, _) = start(1, "Alice");

        let step = submit_answer(&mut session, Submission::Choice(Answer::Everyone), &catalog);
        assert_eq!(
            step,
            Step::Advanced(vec![
                Effect::ExplainRisk { index: 0, answer: Answer::Everyone },
                Effect::AskQuestion { index: 1 },
            ])
        );
        assert_eq!(session.current_question, 1);
        assert_eq!(session.score, 0);
    }

    #[test]
    fn final_answer_still_explains_risk_before_ending() {
        let catalog = catalog();
        let (mut session, _) = start(1, "Alice");
        for _ in 0..4 {
            submit_answer(&mut session, Submission::Choice(Answer::Nobody), &catalog);
        }

        let step = submit_answer(&mut session, Submission::Choice(Answer::Contacts), &catalog);
        assert_eq!(
            step,
            Step::Ended {
                report: true,
                effects: vec![Effect::ExplainRisk { index: 4, answer: Answer::Contacts }],
            }
        );
        assert!(session.is_complete(catalog.len()));
        assert_eq!(session.score, 9);
    }

    #[test]
    fn cancel_ends_without_report_at_any_index() {
        let catalog = catalog();
        for answered_before_cancel in 0..catalog.len() {
            let (mut session, _) = start(1, "Alice");
            for _ in 0..answered_before_cancel {
                submit_answer(&mut session, Submission::Choice(Answer::Nobody), &catalog);
            }

            let step = submit_answer(&mut session, Submission::Cancel, &catalog);
            assert_eq!(
                step,
                Step::Ended {
                    report: false,
                    effects: vec![Effect::Cancelled],
                },
                "cancel after {answered_before_cancel} answers"
            );
            // Cancel records nothing.
            assert_eq!(session.answers.len(), answered_before_cancel);
        }
    }

    #[test]
    fn records_carry_the_current_questions_id() {
        let catalog = catalog();
        let (mut session, _) = start(1, "Alice");
        submit_answer(&mut session, Submission::Choice(Answer::Nobody), &catalog);
        submit_answer(&mut session, Submission::Choice(Answer::Everyone), &catalog);

        assert_eq!(session.answers[0].question_id, "phone");
        assert_eq!(session.answers[1].question_id, "last_seen");
    }

    #[test]
    fn full_run_accumulates_score() {
        let catalog = catalog();
        let (mut session, _) = start(1, "Alice");
        let answers = [
            Answer::Everyone,
            Answer::Contacts,
            Answer::Nobody,
            Answer::Everyone,
            Answer::Contacts,
        ];
        let mut last = Step::Advanced(Vec::new());
        for answer in answers {
            last = submit_answer(&mut session, Submission::Choice(answer), &catalog);
        }
        assert!(matches!(last, Step::Ended { report: true, .. }));
        assert_eq!(session.score, 4);
        assert_eq!(session.answers.len(), 5);
    }
}
