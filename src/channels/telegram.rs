//! Telegram channel — long-polls the Bot API for updates.
//!
//! Maps messages and callback queries into `ChatEvent`s and renders
//! `Controls` into native reply markup. HTML-first sendMessage with a
//! plain-text fallback.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::catalog::{Answer, CANCEL_LABEL};
use crate::channels::{
    BEGIN_CALLBACK, Channel, ChatEvent, Controls, DEFAULT_DISPLAY_NAME, EventKind, EventStream,
    OutboundMessage,
};
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Label on the inline button that starts the questions.
const BEGIN_BUTTON_LABEL: &str = "🚀 Начать проверку";

/// Telegram channel — connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.bot_token.expose_secret()
        )
    }

    /// Send a single chunk (≤4096 chars), HTML-first with plain fallback.
    async fn send_chunk(
        &self,
        chat_id: i64,
        text: &str,
        controls: Option<Controls>,
    ) -> Result<(), ChannelError> {
        let mut html_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });
        if let Some(controls) = controls {
            html_body["reply_markup"] = reply_markup(controls);
        }

        let html_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&html_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if html_resp.status().is_success() {
            return Ok(());
        }

        let html_status = html_resp.status();
        let _html_err = html_resp.text().await.unwrap_or_default();
        tracing::warn!(
            status = ?html_status,
            "Telegram sendMessage with HTML failed; retrying without parse_mode"
        );

        // Retry without parse_mode
        let mut plain_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(controls) = controls {
            plain_body["reply_markup"] = reply_markup(controls);
        }
        let plain_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&plain_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !plain_resp.status().is_success() {
            let plain_err = plain_resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!(
                    "sendMessage failed (html: {}, plain: {})",
                    html_status, plain_err
                ),
            });
        }

        Ok(())
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let bot_token = self.bot_token.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for updates...");

            loop {
                let url = format!(
                    "https://api.telegram.org/bot{}/getUpdates",
                    bot_token.expose_secret()
                );
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message", "callback_query"],
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: serde_json::Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let Some(results) = data.get("result").and_then(serde_json::Value::as_array)
                else {
                    continue;
                };

                for update in results {
                    if let Some(uid) = update.get("update_id").and_then(serde_json::Value::as_i64)
                    {
                        offset = uid + 1;
                    }

                    let event = if let Some(message) = update.get("message") {
                        event_from_message(message)
                    } else if let Some(query) = update.get("callback_query") {
                        let Some((event, callback_id)) = event_from_callback(query) else {
                            continue;
                        };
                        // Ack the button press so the client stops its spinner.
                        let _ = client
                            .post(format!(
                                "https://api.telegram.org/bot{}/answerCallbackQuery",
                                bot_token.expose_secret()
                            ))
                            .json(&serde_json::json!({ "callback_query_id": callback_id }))
                            .send()
                            .await;
                        Some(event)
                    } else {
                        None
                    };

                    let Some(event) = event else { continue };
                    if tx.send(event).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send(&self, message: OutboundMessage) -> Result<(), ChannelError> {
        let chunks = split_message(&message.text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let last = chunks.len() - 1;
        for (i, chunk) in chunks.iter().enumerate() {
            // Controls ride on the final chunk only.
            let controls = if i == last { message.controls } else { None };
            self.send_chunk(message.chat_id, chunk, controls).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Update classification ───────────────────────────────────────────

/// Map a Telegram message object to a `ChatEvent`.
fn event_from_message(message: &serde_json::Value) -> Option<ChatEvent> {
    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(serde_json::Value::as_i64)?;
    let text = message.get("text").and_then(serde_json::Value::as_str)?;

    let (kind, payload) = match command_token(text) {
        Some(command) => (EventKind::Command, command.to_string()),
        None => (EventKind::Text, text.to_string()),
    };

    let mut event = ChatEvent::new(chat_id, kind, payload);
    if let Some(from) = message.get("from") {
        if let Some(user_id) = from.get("id").and_then(serde_json::Value::as_i64) {
            event = event.with_user_id(user_id);
        }
        let name = from
            .get("first_name")
            .and_then(|n| n.as_str())
            .filter(|n| !n.is_empty())
            .or_else(|| from.get("username").and_then(|u| u.as_str()))
            .unwrap_or(DEFAULT_DISPLAY_NAME);
        event = event.with_display_name(name);
    }
    Some(event)
}

/// Map a callback query to a `ChatEvent` plus the id to acknowledge.
fn event_from_callback(query: &serde_json::Value) -> Option<(ChatEvent, String)> {
    let callback_id = query.get("id").and_then(|i| i.as_str())?.to_string();
    let data = query.get("data").and_then(|d| d.as_str())?;
    let chat_id = query
        .get("message")
        .and_then(|m| m.get("chat"))
        .and_then(|c| c.get("id"))
        .and_then(serde_json::Value::as_i64)?;

    let mut event = ChatEvent::new(chat_id, EventKind::Button, data);
    if let Some(from) = query.get("from") {
        if let Some(user_id) = from.get("id").and_then(serde_json::Value::as_i64) {
            event = event.with_user_id(user_id);
        }
        if let Some(name) = from.get("first_name").and_then(|n| n.as_str()) {
            event = event.with_display_name(name);
        }
    }
    Some((event, callback_id))
}

/// Extract the bare command from message text ("/start@bot arg" → "/start").
fn command_token(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    if !first.starts_with('/') {
        return None;
    }
    Some(first.split('@').next().unwrap_or(first))
}

// ── Reply markup ────────────────────────────────────────────────────

/// Render abstract controls into Telegram reply markup JSON.
fn reply_markup(controls: Controls) -> serde_json::Value {
    match controls {
        Controls::AnswerKeyboard => serde_json::json!({
            "keyboard": [
                [
                    Answer::Everyone.as_str(),
                    Answer::Contacts.as_str(),
                    Answer::Nobody.as_str(),
                ],
                [CANCEL_LABEL],
            ],
            "resize_keyboard": true,
        }),
        Controls::BeginButton => serde_json::json!({
            "inline_keyboard": [[{
                "text": BEGIN_BUTTON_LABEL,
                "callback_data": BEGIN_CALLBACK,
            }]],
        }),
        Controls::RemoveKeyboard => serde_json::json!({
            "remove_keyboard": true,
        }),
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.chars().count() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        // Byte offset of the max_len-th char; slicing below stays on
        // char boundaries.
        let hard_cut = remaining
            .char_indices()
            .nth(max_len)
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());
        let window = &remaining[..hard_cut];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .unwrap_or(hard_cut);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { hard_cut } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    if chunks.is_empty() {
        chunks.push(String::new());
    }
    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
