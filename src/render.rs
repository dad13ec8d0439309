//! User-facing message text (Telegram HTML).
//!
//! Pure formatting over the structured values; no transport or state
//! access here.

use crate::catalog::{Answer, Question};
use crate::report::Report;

/// Replies for input the bot does not understand, cycled in order.
pub const UNKNOWN_REPLIES: [&str; 4] = [
    "Я понимаю только кнопки и команды /start",
    "Пожалуйста, используйте кнопки для ответов",
    "Напишите /start чтобы начать проверку",
    "Выберите вариант ответа из кнопок ниже",
];

/// Fixed refusal for unauthorized admin commands.
pub const ADMIN_REFUSAL: &str = "⛔ Эта команда только для администраторов";

/// Prompt shown when an action needs a session that does not exist.
pub const RESTART_PROMPT: &str = "Напишите /start чтобы начать";

/// Acknowledgment for a cancelled check.
pub const CANCELLED: &str = "❌ Проверка отменена. Для начала новой напишите /start";

/// Welcome screen shown on /start.
pub fn welcome(display_name: &str, bot_name: &str, version: &str) -> String {
    format!(
        "<b>👋 Привет, {display_name}!</b>\n\n\
         Я — <b>{bot_name} v{version}</b>\n\
         Проверю 5 ключевых настроек приватности и дам персонализированные рекомендации.\n\n\
         <b>📊 Как работает оценка:</b>\n\
         • <code>Все</code> = 0 баллов (🔴 высокий риск)\n\
         • <code>Мои контакты</code> = 1 балл (🟡 средний риск)\n\
         • <code>Никто</code> = 2 балла (🟢 низкий риск)\n\n\
         <b>🎯 Максимальный результат:</b> 10/10 баллов\n\n\
         <b>📝 Для каждого ответа вы получите:</b>\n\
         1. Объяснение рисков\n\
         2. Рекомендации по исправлению\n\
         3. Персональный отчет в конце\n\n\
         <code>Нажмите кнопку ниже чтобы начать проверку!</code>"
    )
}

/// Numbered question prompt.
pub fn question_prompt(index: usize, total: usize, question: &Question) -> String {
    format!(
        "<b>Вопрос {} из {}</b>\n\n{}\n\nВыберите вариант ответа:",
        index + 1,
        total,
        question.prompt
    )
}

/// Risk explanation for an accepted answer.
pub fn risk_explanation(question: &Question, answer: Answer) -> String {
    format!(
        "<b>Ваш ответ:</b> <code>{}</code>\n\n{}\n\n\
         <b>🔧 Как исправить:</b>\n{}",
        answer.as_str(),
        question.risk_for(answer),
        question.remediation
    )
}

/// The personalized final report.
pub fn report_text(report: &Report) -> String {
    let (minutes, seconds) = minutes_seconds(report.duration);
    let color = report.level.color;

    let mut text = format!(
        "{color} <b>ПЕРСОНАЛИЗИРОВАННЫЙ ОТЧЕТ</b> {color}\n\n\
         <b>👤 Пользователь:</b> {}\n\
         <b>📅 Дата проверки:</b> {}\n\
         <b>⏱️ Время прохождения:</b> {minutes} мин {seconds} сек\n\n\
         <b>🎯 ИТОГОВЫЙ РЕЗУЛЬТАТ:</b>\n\
         <b>Оценка:</b> <code>{}/{} баллов</code>\n\
         <b>Уровень защиты:</b> <code>{}</code>\n\
         <b>Описание:</b> {}\n\n\
         <b>📊 РАСПРЕДЕЛЕНИЕ ОТВЕТОВ:</b>\n\
         • <code>Никто</code> (🟢 безопасно): {}/{}\n\
         • <code>Мои контакты</code> (🟡 средний риск): {}/{}\n\
         • <code>Все</code> (🔴 высокий риск): {}/{}\n\n\
         <b>🔍 ДЕТАЛЬНЫЙ АНАЛИЗ:</b>\n",
        report.display_name,
        report.finished_at.format("%d.%m.%Y %H:%M"),
        report.score,
        report.max_score,
        report.level.label,
        report.level.description,
        report.tally.nobody,
        report.tally.total(),
        report.tally.contacts,
        report.tally.total(),
        report.tally.everyone,
        report.tally.total(),
    );

    if report.weak_points.is_empty() {
        text.push_str("\n<b>✅ Отличная работа! Все настройки оптимальны.</b>\n");
    } else {
        text.push_str("\n<b>🚨 СЛАБЫЕ МЕСТА (рекомендуем исправить):</b>\n");
        for weak in &report.weak_points {
            let risk_level = if weak.record.points == 0 {
                "🔴 ВЫСОКИЙ"
            } else {
                "🟡 СРЕДНИЙ"
            };
            text.push_str(&format!(
                "\n• <b>{}</b>\n  Ваш ответ: <code>{}</code> ({risk_level} риск)\n  Исправить: {}\n",
                weak.question.prompt,
                weak.record.answer.as_str(),
                weak.question.remediation,
            ));
        }
    }

    let bar: String = "🟩".repeat(report.bar_filled) + &"⬜".repeat(report.bar_empty);
    text.push_str(&format!(
        "\n<b>📈 ВИЗУАЛЬНАЯ ШКАЛА ЗАЩИТЫ:</b>\n{bar} {}/{}\n\n\
         <b>🔄 Для нового теста напишите</b> <code>/start</code>\n\n\
         <b>💡 Совет:</b> Регулярно проверяйте настройки приватности!\n\
         <b>🔐 Берегите свои данные!</b>",
        report.score, report.max_score,
    ));

    text
}

/// Cross-session statistics sent right after the report.
pub fn aggregate_stats(report: &Report) -> String {
    format!(
        "<b>📈 СТАТИСТИКА ПРОВЕРКИ:</b>\n\
         • Всего проверок сегодня: {}\n\
         • Средний результат: <code>{:.1}/{}</code>\n\
         • Ваш результат лучше чем у {:.0}% пользователей\n\n\
         <i>Результат сохранен в логах бота</i>",
        report.aggregate.started_today,
        report.aggregate.average_score,
        report.max_score,
        report.aggregate.percentile,
    )
}

/// Admin-only bot statistics.
pub fn admin_stats(
    version: &str,
    active_sessions: usize,
    started_today: usize,
    average_score: f64,
    max_score: u32,
    uptime_hours: f64,
) -> String {
    format!(
        "<b>📊 СТАТИСТИКА БОТА:</b>\n\
         • Версия: {version}\n\
         • Активных сессий: {active_sessions}\n\
         • Всего пользователей сегодня: {started_today}\n\
         • Средний балл: {average_score:.1}/{max_score}\n\
         • Время работы: {uptime_hours:.1} часов"
    )
}

/// Static bot info for /version.
pub fn version_info(bot_name: &str, version: &str) -> String {
    format!(
        "<b>ℹ️ ИНФОРМАЦИЯ О БОТЕ:</b>\n\
         • Название: {bot_name}\n\
         • Версия: {version}"
    )
}

/// Break a duration into whole minutes and leftover seconds.
fn minutes_seconds(duration: chrono::Duration) -> (i64, i64) {
    let total = duration.num_seconds().max(0);
    (total / 60, total % 60)
}
