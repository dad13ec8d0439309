//! Question catalog — the five privacy checks, answer scoring, and
//! protection levels.
//!
//! Loaded once at process start and never mutated. Question order is
//! significant: numbering and the final report's weak-point listing
//! both follow declaration order.

use serde::{Deserialize, Serialize};

/// Maximum points a single answer can earn.
pub const MAX_POINTS_PER_QUESTION: u32 = 2;

/// Reply-keyboard label that aborts a running check.
pub const CANCEL_LABEL: &str = "❌ Отмена";

// ── Answers ─────────────────────────────────────────────────────────

/// The three canonical answers every question accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    /// "Все" — the setting is visible to everyone.
    Everyone,
    /// "Мои контакты" — visible to contacts only.
    Contacts,
    /// "Никто" — visible to nobody.
    Nobody,
}

impl Answer {
    /// All answers, in keyboard order.
    pub const ALL: [Answer; 3] = [Answer::Everyone, Answer::Contacts, Answer::Nobody];

    /// The exact button/message text for this answer.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Everyone => "Все",
            Self::Contacts => "Мои контакты",
            Self::Nobody => "Никто",
        }
    }

    /// Parse message text into an answer. Exact match only — anything
    /// else is not an answer and belongs to another route.
    pub fn parse(text: &str) -> Option<Answer> {
        Self::ALL.iter().copied().find(|a| a.as_str() == text)
    }

    /// Points awarded for this answer.
    pub fn points(&self) -> u32 {
        match self {
            Self::Everyone => 0,
            Self::Contacts => 1,
            Self::Nobody => 2,
        }
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Questions ───────────────────────────────────────────────────────

/// A single privacy check. Content is compiled in and immutable.
#[derive(Debug, Clone)]
pub struct Question {
    /// Stable identifier recorded with each answer.
    pub id: &'static str,
    /// The question shown to the user.
    pub prompt: &'static str,
    risk_everyone: &'static str,
    risk_contacts: &'static str,
    risk_nobody: &'static str,
    /// Where in the Telegram settings to fix this.
    pub remediation: &'static str,
}

impl Question {
    /// Risk explanation for the given answer.
    pub fn risk_for(&self, answer: Answer) -> &'static str {
        match answer {
            Answer::Everyone => self.risk_everyone,
            Answer::Contacts => self.risk_contacts,
            Answer::Nobody => self.risk_nobody,
        }
    }
}

// ── Levels ──────────────────────────────────────────────────────────

/// Protection level descriptor for a total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    pub label: &'static str,
    pub color: &'static str,
    pub description: &'static str,
}

// ── Catalog ─────────────────────────────────────────────────────────

/// Read-only catalog: ordered questions plus the score→level table.
pub struct Catalog {
    questions: Vec<Question>,
    levels: Vec<Level>,
}

impl Catalog {
    /// The standard five-question privacy audit.
    pub fn standard() -> Self {
        Self {
            questions: standard_questions(),
            levels: standard_levels(),
        }
    }

    /// Number of questions.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Question at a position, in declaration order.
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Question by stable id.
    pub fn question_by_id(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Maximum achievable total score.
    pub fn max_score(&self) -> u32 {
        MAX_POINTS_PER_QUESTION * self.questions.len() as u32
    }

    /// Level for a total score. Any score outside the table (negative
    /// or above the maximum) falls back to the entry for 0.
    pub fn level_for(&self, score: i64) -> &Level {
        usize::try_from(score)
            .ok()
            .and_then(|s| self.levels.get(s))
            .unwrap_or(&self.levels[0])
    }
}

fn standard_questions() -> Vec<Question> {
    vec![
        Question {
            id: "phone",
            prompt: "📱 Кто видит ваш номер телефона?",
            risk_everyone: "🔴 <b>ВЫСОКИЙ РИСК</b>\n• Номер могут использовать для спама и фишинга\n• Можно найти вас в социальных сетях\n• Возможна подмена SIM-карты (SIM-swap)",
            risk_contacts: "🟡 <b>СРЕДНИЙ РИСК</b>\n• Контакты могут случайно раскрыть номер\n• При утечке телефона контактов - номер доступен",
            risk_nobody: "🟢 <b>НИЗКИЙ РИСК</b>\n• Максимальная защита номера\n• Рекомендуемая настройка",
            remediation: "Настройки → Конфиденциальность → Номер телефона",
        },
        Question {
            id: "last_seen",
            prompt: "⏰ Кто видит, когда вы были в сети?",
            risk_everyone: "🔴 <b>ВЫСОКИЙ РИСК</b>\n• Можно отследить ваш график активности\n• Злоумышленники знают когда вы онлайн\n• Упрощает социальную инженерию",
            risk_contacts: "🟡 <b>СРЕДНИЙ РИСК</b>\n• Контакты видят вашу активность\n• Могут определить когда вы спите/работаете",
            risk_nobody: "🟢 <b>НИЗКИЙ РИСК</b>\n• Полная анонимность статуса\n• Рекомендуемая настройка",
            remediation: "Настройки → Конфиденциальность → Время последнего посещения",
        },
        Question {
            id: "profile_photo",
            prompt: "🖼️ Кто видит вашу фотографию профиля?",
            risk_everyone: "🔴 <b>ВЫСОКИЙ РИСК</b>\n• Фото можно использовать для поиска по изображению\n• Возможность создания фейковых аккаунтов\n• Сбор биометрических данных",
            risk_contacts: "🟡 <b>СРЕДНИЙ РИСК</b>\n• Ограниченный круг видимости\n• Риск если телефон контакта скомпрометирован",
            risk_nobody: "🟢 <b>НИЗКИЙ РИСК</b>\n• Максимальная приватность\n• Рекомендуемая настройка",
            remediation: "Настройки → Конфиденциальность → Фотография профиля",
        },
        Question {
            id: "groups",
            prompt: "👥 Кто может добавлять вас в группы?",
            risk_everyone: "🔴 <b>ВЫСОКИЙ РИСК</b>\n• Вас могут добавлять в спам-чаты\n• Мошеннические группы и фишинг\n• Потеря контроля над вступлением",
            risk_contacts: "🟡 <b>СРЕДНИЙ РИСК</b>\n• Только знакомые могут добавлять\n• Риск если контакт скомпрометирован",
            risk_nobody: "🟢 <b>НИЗКИЙ РИСК</b>\n• Полный контроль над группами\n• Рекомендуемая настройка",
            remediation: "Настройки → Конфиденциальность → Группы и каналы",
        },
        Question {
            id: "forwarding",
            prompt: "🔗 Кто может создавать ссылки на ваш профиль?",
            risk_everyone: "🔴 <b>ВЫСОКИЙ РИСК</b>\n• Ваш профиль могут репостить где угодно\n• Упрощает сбор информации о вас\n• Спам через упоминания",
            risk_contacts: "🟡 <b>СРЕДНИЙ РИСК</b>\n• Ограниченный круг\n• Риск неконтролируемого распространения",
            risk_nobody: "🟢 <b>НИЗКИЙ РИСК</b>\n• Максимальная защита от упоминаний\n• Рекомендуемая настройка",
            remediation: "Настройки → Конфиденциальность → Пересылка сообщений",
        },
    ]
}

/// One level per achievable score, indexed 0..=10.
fn standard_levels() -> Vec<Level> {
    vec![
        Level { label: "☢️ ЯДЕРНЫЙ УРОВЕНЬ", color: "☢️", description: "Вы вообще не скрываетесь?!" },
        Level { label: "💀 АПОКАЛИПСИС", color: "💀", description: "Немедленно настройте приватность!" },
        Level { label: "💀 КАТАСТРОФА", color: "💀", description: "Ваши данные полностью уязвимы!" },
        Level { label: "🚨 КРИТИЧЕСКИ", color: "🔴", description: "Критически низкая защита!" },
        Level { label: "🔴 ОПАСНО", color: "🔴", description: "Опасный уровень. Срочно меняйте настройки!" },
        Level { label: "🔴 ТРЕВОГА", color: "🔴", description: "Низкая защита. Вы в зоне риска." },
        Level { label: "⚠️ УДОВЛЕТВОРИТЕЛЬНО", color: "🟡", description: "Приемлемо, но нужно работать." },
        Level { label: "⚠️ НОРМАЛЬНО", color: "🟡", description: "Средний уровень. Есть что улучшить." },
        Level { label: "👍 ХОРОШО", color: "🟢", description: "Хорошая защита. Небольшие риски." },
        Level { label: "✅ ОТЛИЧНО", color: "🟢", description: "Почти идеально. Можно расслабиться." },
        Level { label: "🎉 ИДЕАЛЬНО", color: "🟢", description: "Вы хакер уровня паранойи! Идеальная защита." },
    ]
}

// ── Tests ───────────────────────────────────────────────────────────
