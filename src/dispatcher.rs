//! Dispatcher — routes inbound chat events, serializes per-chat
//! processing, and executes the state machine's effects.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::sync::Mutex;

use crate::catalog::{Answer, CANCEL_LABEL, Catalog};
use crate::channels::{BEGIN_CALLBACK, Channel, ChatEvent, Controls, EventKind, OutboundMessage};
use crate::config::BotConfig;
use crate::error::Error;
use crate::render;
use crate::report::Report;
use crate::session::machine::{self, Effect, Step, Submission};
use crate::session::store::SessionStore;

/// Routes events to the session state machine and emits the results.
///
/// Events for the same chat are processed strictly one at a time;
/// different chats proceed concurrently on their own tasks.
pub struct Dispatcher {
    config: BotConfig,
    catalog: Catalog,
    store: Arc<SessionStore>,
    channel: Arc<dyn Channel>,
    /// One lock per chat seen; entries live for the process lifetime.
    chat_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
    /// Round-robin cursor over the unknown-input replies.
    unknown_cursor: AtomicUsize,
    launched_at: DateTime<Utc>,
}

impl Dispatcher {
    pub fn new(
        config: BotConfig,
        catalog: Catalog,
        store: Arc<SessionStore>,
        channel: Arc<dyn Channel>,
    ) -> Self {
        Self {
            config,
            catalog,
            store,
            channel,
            chat_locks: Mutex::new(HashMap::new()),
            unknown_cursor: AtomicUsize::new(0),
            launched_at: Utc::now(),
        }
    }

    // ── Main loop ───────────────────────────────────────────────────

    /// Start the channel and process its events until shutdown.
    pub async fn run(self: Arc<Self>) -> Result<(), Error> {
        let mut events = self.channel.start().await?;

        tracing::info!("Dispatcher ready and listening");

        loop {
            let event = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                event = events.next() => {
                    match event {
                        Some(e) => e,
                        None => {
                            tracing::info!("Event stream ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            let dispatcher = Arc::clone(&self);
            tokio::spawn(async move { dispatcher.dispatch(event).await });
        }

        self.channel.shutdown().await?;
        Ok(())
    }

    /// Process one event under the chat's lock.
    pub async fn dispatch(&self, event: ChatEvent) {
        let lock = self.chat_lock(event.chat_id).await;
        let _guard = lock.lock().await;
        self.handle_event(&event).await;
    }

    async fn chat_lock(&self, chat_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.chat_locks.lock().await;
        Arc::clone(locks.entry(chat_id).or_default())
    }

    // ── Routing ─────────────────────────────────────────────────────

    async fn handle_event(&self, event: &ChatEvent) {
        match event.kind {
            EventKind::Command => match event.payload.as_str() {
                "/start" | "/help" => self.handle_start(event).await,
                "/stats" => self.handle_admin_stats(event).await,
                "/version" => self.handle_version(event).await,
                _ => self.handle_unknown(event).await,
            },
            EventKind::Button if event.payload == BEGIN_CALLBACK => {
                self.handle_begin(event).await;
            }
            EventKind::Text if event.payload == CANCEL_LABEL => {
                self.handle_submission(event, Submission::Cancel).await;
            }
            EventKind::Text => match Answer::parse(&event.payload) {
                Some(answer) => {
                    self.handle_submission(event, Submission::Choice(answer)).await;
                }
                None => self.handle_unknown(event).await,
            },
            _ => self.handle_unknown(event).await,
        }
    }

    // ── Session transitions ─────────────────────────────────────────

    async fn handle_start(&self, event: &ChatEvent) {
        let (session, effects) = machine::start(event.chat_id, &event.display_name);
        if self.store.insert(session).await.is_some() {
            tracing::info!(chat_id = event.chat_id, "Session restarted, prior progress discarded");
        } else {
            tracing::info!(chat_id = event.chat_id, user_id = event.user_id, "Session started");
        }
        self.execute_effects(event, &effects).await;
    }

    async fn handle_begin(&self, event: &ChatEvent) {
        match self.store.with_session(event.chat_id, |s| machine::begin(s)).await {
            Some(effect) => self.execute_effects(event, &[effect]).await,
            None => self.send_restart_prompt(event.chat_id).await,
        }
    }

    async fn handle_submission(&self, event: &ChatEvent, submission: Submission) {
        let step = self
            .store
            .with_session(event.chat_id, |session| {
                machine::submit_answer(session, submission, &self.catalog)
            })
            .await;

        match step {
            None => self.send_restart_prompt(event.chat_id).await,
            Some(Step::Advanced(effects)) => self.execute_effects(event, &effects).await,
            Some(Step::Ended { report, effects }) => {
                let session = self.store.remove(event.chat_id).await;
                self.execute_effects(event, &effects).await;
                if report {
                    if let Some(session) = session {
                        self.send_report(&session).await;
                    }
                }
            }
        }
    }

    /// Build and deliver the final report, then the aggregate stats.
    ///
    /// Called after the session has left the store, so the aggregates
    /// never count the reporting session itself.
    async fn send_report(&self, session: &crate::session::model::Session) {
        let stats = self.store.stats_for(session.score).await;
        let report = Report::build(session, &self.catalog, stats);

        self.send_logged(
            OutboundMessage::text(session.chat_id, render::report_text(&report))
                .with_controls(Controls::RemoveKeyboard),
        )
        .await;
        self.send_logged(OutboundMessage::text(
            session.chat_id,
            render::aggregate_stats(&report),
        ))
        .await;

        tracing::info!(
            chat_id = session.chat_id,
            score = report.score,
            max = report.max_score,
            "Audit completed"
        );
    }

    // ── Informational routes ────────────────────────────────────────

    async fn handle_admin_stats(&self, event: &ChatEvent) {
        if !self.config.is_admin(event.user_id) {
            self.send_logged(OutboundMessage::text(event.chat_id, render::ADMIN_REFUSAL))
                .await;
            return;
        }

        let stats = self.store.stats_for(0).await;
        let uptime_hours =
            (Utc::now() - self.launched_at).num_seconds() as f64 / 3600.0;
        self.send_logged(OutboundMessage::text(
            event.chat_id,
            render::admin_stats(
                env!("CARGO_PKG_VERSION"),
                stats.active_sessions,
                stats.started_today,
                stats.average_score,
                self.catalog.max_score(),
                uptime_hours,
            ),
        ))
        .await;
    }

    async fn handle_version(&self, event: &ChatEvent) {
        self.send_logged(OutboundMessage::text(
            event.chat_id,
            render::version_info(&self.config.bot_name, env!("CARGO_PKG_VERSION")),
        ))
        .await;
    }

    async fn handle_unknown(&self, event: &ChatEvent) {
        let index = self.unknown_cursor.fetch_add(1, Ordering::Relaxed);
        let reply = render::UNKNOWN_REPLIES[index % render::UNKNOWN_REPLIES.len()];
        self.send_logged(
            OutboundMessage::text(event.chat_id, reply).with_controls(Controls::AnswerKeyboard),
        )
        .await;
    }

    async fn send_restart_prompt(&self, chat_id: i64) {
        self.send_logged(OutboundMessage::text(chat_id, render::RESTART_PROMPT))
            .await;
    }

    // ── Effect execution ────────────────────────────────────────────

    async fn execute_effects(&self, event: &ChatEvent, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::ShowWelcome => {
                    self.send_logged(
                        OutboundMessage::text(
                            event.chat_id,
                            render::welcome(
                                &event.display_name,
                                &self.config.bot_name,
                                env!("CARGO_PKG_VERSION"),
                            ),
                        )
                        .with_controls(Controls::BeginButton),
                    )
                    .await;
                }
                Effect::AskQuestion { index } => {
                    let Some(question) = self.catalog.question(*index) else {
                        continue;
                    };
                    self.send_logged(
                        OutboundMessage::text(
                            event.chat_id,
                            render::question_prompt(*index, self.catalog.len(), question),
                        )
                        .with_controls(Controls::AnswerKeyboard),
                    )
                    .await;
                }
                Effect::ExplainRisk { index, answer } => {
                    let Some(question) = self.catalog.question(*index) else {
                        continue;
                    };
                    self.send_logged(
                        OutboundMessage::text(
                            event.chat_id,
                            render::risk_explanation(question, *answer),
                        )
                        .with_controls(Controls::RemoveKeyboard),
                    )
                    .await;
                    // Let the user read the explanation before the next
                    // message arrives.
                    tokio::time::sleep(self.config.question_delay).await;
                }
                Effect::Cancelled => {
                    self.send_logged(
                        OutboundMessage::text(event.chat_id, render::CANCELLED)
                            .with_controls(Controls::RemoveKeyboard),
                    )
                    .await;
                }
            }
        }
    }

    /// Deliver one message; failures are logged and never fatal, and
    /// session state is untouched either way.
    async fn send_logged(&self, message: OutboundMessage) {
        let chat_id = message.chat_id;
        if let Err(e) = self.channel.send(message).await {
            tracing::warn!(chat_id, error = %e, "Failed to deliver message");
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────
