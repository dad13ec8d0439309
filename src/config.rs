//! Configuration types and startup resolution.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Bot name shown in /version.
    pub bot_name: String,
    /// User ids allowed to call /stats.
    pub admin_ids: Vec<i64>,
    /// Pause between a risk explanation and the next message.
    pub question_delay: Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_name: "Telegram Privacy Auditor".to_string(),
            admin_ids: Vec::new(),
            question_delay: Duration::from_secs(1),
        }
    }
}

impl BotConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(admins) = std::env::var("PRIVACY_BOT_ADMINS") {
            config.admin_ids = parse_admin_list(&admins);
        }
        if let Some(ms) = std::env::var("PRIVACY_BOT_QUESTION_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.question_delay = Duration::from_millis(ms);
        }
        config
    }

    /// Whether this user may call admin commands.
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

/// Parse a comma-separated list of admin user ids; junk entries are
/// dropped.
fn parse_admin_list(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect()
}

// ── Token resolution ────────────────────────────────────────────────

/// Resolve the bot token: `BOT_TOKEN` env var first, then the token
/// file (`BOT_TOKEN_FILE`, defaulting to `token.txt`).
pub fn load_token() -> Result<SecretString, ConfigError> {
    if let Ok(token) = std::env::var("BOT_TOKEN") {
        let token = token.trim().to_string();
        if !validate_token(&token) {
            return Err(ConfigError::InvalidValue {
                key: "BOT_TOKEN".into(),
                message: "expected <bot_id>:<secret> as issued by @BotFather".into(),
            });
        }
        tracing::info!("Bot token loaded from environment");
        return Ok(SecretString::from(token));
    }

    let path = std::env::var("BOT_TOKEN_FILE").unwrap_or_else(|_| "token.txt".to_string());
    match std::fs::read_to_string(&path) {
        Ok(contents) => {
            let token = contents.trim().to_string();
            if !validate_token(&token) {
                return Err(ConfigError::InvalidValue {
                    key: path,
                    message: "file does not contain a valid bot token".into(),
                });
            }
            tracing::info!(path = %path, "Bot token loaded from file");
            Ok(SecretString::from(token))
        }
        Err(_) => Err(ConfigError::MissingRequired {
            key: "BOT_TOKEN".into(),
            hint: format!(
                "export BOT_TOKEN=<bot_id>:<secret>, or write the token to {path}"
            ),
        }),
    }
}

/// Telegram token shape: numeric bot id, a colon, and a secret of at
/// least 10 characters.
pub fn validate_token(token: &str) -> bool {
    let mut parts = token.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(id), Some(secret), None) => {
            !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) && secret.len() >= 10
        }
        _ => false,
    }
}
