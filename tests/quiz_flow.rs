//! End-to-end conversation flows through the dispatcher.
//!
//! Each test drives a full conversation against a recording stub
//! channel and asserts on what the user would actually see.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use privacy_auditor::catalog::{CANCEL_LABEL, Catalog};
use privacy_auditor::channels::{
    BEGIN_CALLBACK, Channel, ChatEvent, Controls, EventKind, EventStream, OutboundMessage,
};
use privacy_auditor::config::BotConfig;
use privacy_auditor::dispatcher::Dispatcher;
use privacy_auditor::error::ChannelError;
use privacy_auditor::session::store::SessionStore;

/// Channel stub that records every outbound message.
#[derive(Default)]
struct RecordingChannel {
    sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingChannel {
    async fn texts_for(&self, chat_id: i64) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .map(|m| m.text.clone())
            .collect()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        Ok(Box::pin(futures::stream::empty()))
    }

    async fn send(&self, message: OutboundMessage) -> Result<(), ChannelError> {
        self.sent.lock().await.push(message);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

fn fixture() -> (Arc<Dispatcher>, Arc<SessionStore>, Arc<RecordingChannel>) {
    let config = BotConfig {
        question_delay: Duration::ZERO,
        ..BotConfig::default()
    };
    let store = Arc::new(SessionStore::new());
    let channel = Arc::new(RecordingChannel::default());
    let dispatcher = Arc::new(Dispatcher::new(
        config,
        Catalog::standard(),
        Arc::clone(&store),
        Arc::clone(&channel) as Arc<dyn Channel>,
    ));
    (dispatcher, store, channel)
}

async fn run_quiz(dispatcher: &Dispatcher, chat_id: i64, answers: &[&str]) {
    dispatcher
        .dispatch(
            ChatEvent::new(chat_id, EventKind::Command, "/start").with_display_name("Алиса"),
        )
        .await;
    dispatcher
        .dispatch(ChatEvent::new(chat_id, EventKind::Button, BEGIN_CALLBACK))
        .await;
    for answer in answers {
        dispatcher
            .dispatch(ChatEvent::new(chat_id, EventKind::Text, *answer))
            .await;
    }
}

fn report_of(texts: &[String]) -> &String {
    texts
        .iter()
        .find(|t| t.contains("ПЕРСОНАЛИЗИРОВАННЫЙ ОТЧЕТ"))
        .expect("report was sent")
}

// ── Complete runs ───────────────────────────────────────────────────

#[tokio::test]
async fn perfect_run_scores_ten_with_no_weak_points() {
    let (dispatcher, store, channel) = fixture();
    run_quiz(&dispatcher, 1, &["Никто"; 5]).await;

    assert!(!store.contains(1).await, "finished session leaves the store");

    let texts = channel.texts_for(1).await;
    let report = report_of(&texts);
    assert!(report.contains("<code>10/10 баллов</code>"));
    assert!(report.contains("🎉 ИДЕАЛЬНО"));
    assert!(report.contains("Все настройки оптимальны"));
    assert!(report.contains("<code>Никто</code> (🟢 безопасно): 5/5"));
    assert!(report.contains("<code>Мои контакты</code> (🟡 средний риск): 0/5"));
    assert!(report.contains("<code>Все</code> (🔴 высокий риск): 0/5"));
    assert!(report.contains(&"🟩".repeat(10)));
}

#[tokio::test]
async fn worst_run_scores_zero_with_every_question_weak() {
    let (dispatcher, _, channel) = fixture();
    run_quiz(&dispatcher, 1, &["Все"; 5]).await;

    let texts = channel.texts_for(1).await;
    let report = report_of(&texts);
    assert!(report.contains("<code>0/10 баллов</code>"));
    assert!(report.contains("☢️ ЯДЕРНЫЙ УРОВЕНЬ"));
    assert!(report.contains("СЛАБЫЕ МЕСТА"));
    assert_eq!(report.matches("Ваш ответ: <code>Все</code>").count(), 5);

    // Weak points keep original question order.
    let phone = report.find("номер телефона").unwrap();
    let last_seen = report.find("были в сети").unwrap();
    let photo = report.find("фотографию профиля").unwrap();
    let groups = report.find("добавлять вас в группы").unwrap();
    let links = report.find("ссылки на ваш профиль").unwrap();
    assert!(phone < last_seen && last_seen < photo && photo < groups && groups < links);
}

#[tokio::test]
async fn mixed_run_scores_four_and_lists_four_weak_points() {
    let (dispatcher, _, channel) = fixture();
    run_quiz(
        &dispatcher,
        1,
        &["Все", "Мои контакты", "Никто", "Все", "Мои контакты"],
    )
    .await;

    let texts = channel.texts_for(1).await;
    let report = report_of(&texts);
    assert!(report.contains("<code>4/10 баллов</code>"));
    assert_eq!(report.matches("Исправить:").count(), 4);
    // The question answered with "Никто" is not a weak point.
    assert!(!report.contains("• <b>🖼️ Кто видит вашу фотографию профиля?</b>"));
}

#[tokio::test]
async fn every_answer_gets_a_risk_explanation_before_the_report() {
    let (dispatcher, _, channel) = fixture();
    run_quiz(&dispatcher, 1, &["Никто"; 5]).await;

    let texts = channel.texts_for(1).await;
    let explanations = texts.iter().filter(|t| t.contains("Ваш ответ:")).count();
    assert_eq!(explanations, 5);

    let last_explanation = texts.iter().rposition(|t| t.contains("Ваш ответ:")).unwrap();
    let report = texts
        .iter()
        .position(|t| t.contains("ПЕРСОНАЛИЗИРОВАННЫЙ ОТЧЕТ"))
        .unwrap();
    assert!(last_explanation < report);
}

#[tokio::test]
async fn report_removes_the_keyboard() {
    let (dispatcher, _, channel) = fixture();
    run_quiz(&dispatcher, 1, &["Никто"; 5]).await;

    let sent = channel.sent.lock().await;
    let report = sent
        .iter()
        .find(|m| m.text.contains("ПЕРСОНАЛИЗИРОВАННЫЙ ОТЧЕТ"))
        .unwrap();
    assert_eq!(report.controls, Some(Controls::RemoveKeyboard));
}

// ── Restart and cancel ──────────────────────────────────────────────

#[tokio::test]
async fn restart_discards_progress_entirely() {
    let (dispatcher, store, channel) = fixture();
    run_quiz(&dispatcher, 1, &["Все", "Все"]).await;
    run_quiz(&dispatcher, 1, &["Никто"; 5]).await;

    assert!(!store.contains(1).await);
    let texts = channel.texts_for(1).await;
    // The two discarded "Все" answers never reach the report.
    let report = report_of(&texts);
    assert!(report.contains("<code>10/10 баллов</code>"));
    assert!(report.contains("<code>Все</code> (🔴 высокий риск): 0/5"));
}

#[tokio::test]
async fn cancel_mid_quiz_produces_no_report() {
    let (dispatcher, store, channel) = fixture();
    run_quiz(&dispatcher, 1, &["Никто", "Все"]).await;
    dispatcher
        .dispatch(ChatEvent::new(1, EventKind::Text, CANCEL_LABEL))
        .await;

    assert!(!store.contains(1).await);
    let texts = channel.texts_for(1).await;
    assert!(texts.last().unwrap().contains("Проверка отменена"));
    assert!(texts.iter().all(|t| !t.contains("ПЕРСОНАЛИЗИРОВАННЫЙ ОТЧЕТ")));
}

// ── Concurrency ─────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_chats_do_not_interfere() {
    let (dispatcher, store, channel) = fixture();

    let a = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move { run_quiz(&dispatcher, 100, &["Никто"; 5]).await })
    };
    let b = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move { run_quiz(&dispatcher, 200, &["Все"; 5]).await })
    };
    a.await.unwrap();
    b.await.unwrap();

    assert!(store.is_empty().await);
    assert!(report_of(&channel.texts_for(100).await).contains("<code>10/10 баллов</code>"));
    assert!(report_of(&channel.texts_for(200).await).contains("<code>0/10 баллов</code>"));
}

#[tokio::test]
async fn same_chat_events_are_serialized() {
    let (dispatcher, store, channel) = fixture();
    dispatcher
        .dispatch(ChatEvent::new(1, EventKind::Command, "/start"))
        .await;

    // Five answers land concurrently; each must be applied exactly once.
    let mut handles = Vec::new();
    for _ in 0..5 {
        let dispatcher = Arc::clone(&dispatcher);
        handles.push(tokio::spawn(async move {
            dispatcher
                .dispatch(ChatEvent::new(1, EventKind::Text, "Никто"))
                .await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(!store.contains(1).await);
    let texts = channel.texts_for(1).await;
    let reports = texts
        .iter()
        .filter(|t| t.contains("ПЕРСОНАЛИЗИРОВАННЫЙ ОТЧЕТ"))
        .count();
    assert_eq!(reports, 1);
    assert!(report_of(&texts).contains("<code>10/10 баллов</code>"));
}
