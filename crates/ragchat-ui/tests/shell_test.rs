use ragchat_client::{BackendCall, InMemoryBackend};
use ragchat_types::{HealthResponse, Message, Role, ThreadId};
use ragchat_ui::chat::SEND_FAILED_MESSAGE;
use ragchat_ui::render::{render_transcript, WELCOME_TITLE};
use ragchat_ui::{PollIntervals, SendRejected, Shell};
use std::sync::Arc;
use std::time::Duration;

fn seeded_backend() -> Arc<InMemoryBackend> {
    Arc::new(
        InMemoryBackend::new()
            .with_conversation(
                "a",
                "Alpha",
                "2023-12-01T00:00:00Z",
                vec![
                    Message::user("from a"),
                    Message::assistant("answer a", Vec::new()),
                ],
            )
            .with_conversation(
                "b",
                "Beta",
                "2023-12-02T00:00:00Z",
                vec![Message::user("from b")],
            ),
    )
}

async fn mounted(backend: Arc<InMemoryBackend>) -> Shell {
    let mut shell = Shell::new(backend, PollIntervals::default());
    shell.mount();
    shell.settle().await;
    shell
}

fn contents(shell: &Shell) -> Vec<String> {
    shell
        .chat()
        .messages()
        .iter()
        .map(|m| m.content().to_string())
        .collect()
}

#[tokio::test]
async fn test_empty_backend_shows_welcome() {
    let backend = Arc::new(InMemoryBackend::new());
    let shell = mounted(backend).await;

    assert!(shell.list().conversations().is_empty());
    assert!(shell.active().is_none());
    assert!(shell.chat().is_welcome());
    assert!(render_transcript(shell.chat())[0].starts_with(WELCOME_TITLE));
}

#[tokio::test]
async fn test_first_message_creates_and_activates_thread() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.set_answer("Hi", Vec::new());
    let mut shell = mounted(backend.clone()).await;

    shell.set_input("Hello");
    shell.submit().unwrap();
    assert_eq!(contents(&shell), vec!["Hello"]);
    assert!(shell.chat().is_thinking());
    assert_eq!(shell.chat().input(), "");

    shell.settle().await;

    let roles: Vec<Role> = shell.chat().messages().iter().map(Message::role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);
    assert_eq!(contents(&shell), vec!["Hello", "Hi"]);
    assert_eq!(shell.active(), Some(&ThreadId::from("t1")));
    assert_eq!(shell.list().conversations().len(), 1);
    assert_eq!(
        backend.count_calls(|c| *c == BackendCall::GetConversations),
        2
    );
    assert!(shell.take_notifications().is_empty());
}

#[tokio::test]
async fn test_failed_send_keeps_user_message() {
    let backend = seeded_backend();
    let mut shell = mounted(backend.clone()).await;
    let a = ThreadId::from("a");

    shell.select_thread(a.clone());
    shell.settle().await;
    assert_eq!(contents(&shell), vec!["from a", "answer a"]);

    backend.set_chat_failure(true);
    shell.set_input("Hello");
    shell.submit().unwrap();
    shell.settle().await;

    assert_eq!(contents(&shell), vec!["from a", "answer a", "Hello"]);
    assert!(shell.chat().messages()[2].is_user());
    assert_eq!(shell.active(), Some(&a));

    let notifications = shell.take_notifications();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].is_error());
    assert_eq!(notifications[0].message, SEND_FAILED_MESSAGE);
}

#[tokio::test]
async fn test_continue_existing_thread_reconciles() {
    let backend = seeded_backend();
    let mut shell = mounted(backend.clone()).await;
    let a = ThreadId::from("a");

    shell.select_thread(a.clone());
    shell.settle().await;

    shell.set_input("More?");
    shell.submit().unwrap();
    shell.settle().await;

    assert_eq!(
        contents(&shell),
        vec!["from a", "answer a", "More?", "Echo: More?"]
    );
    assert_eq!(shell.chat().messages(), backend.messages(&a).unwrap().as_slice());
    // Continued thread moves to the top
    assert_eq!(shell.list().get(0).unwrap().thread_id, a);
}

#[tokio::test(start_paused = true)]
async fn test_double_submit_sends_once() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.set_chat_latency(Duration::from_secs(2));
    let mut shell = mounted(backend.clone()).await;

    shell.set_input("Hello");
    shell.submit().unwrap();
    shell.set_input("Hello");
    assert_eq!(shell.submit(), Err(SendRejected::InFlight));

    shell.settle().await;

    assert_eq!(
        backend.count_calls(|c| matches!(c, BackendCall::Chat(_))),
        1
    );
    assert_eq!(contents(&shell), vec!["Hello", "Echo: Hello"]);
}

#[tokio::test]
async fn test_blank_submit_is_ignored() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut shell = mounted(backend.clone()).await;

    shell.set_input("  \n ");
    assert_eq!(shell.submit(), Err(SendRejected::Blank));
    shell.settle().await;

    assert!(shell.chat().is_welcome());
    assert_eq!(
        backend.count_calls(|c| matches!(c, BackendCall::Chat(_))),
        0
    );
}

#[tokio::test]
async fn test_delete_active_conversation_clears_selection() {
    let backend = seeded_backend();
    let mut shell = mounted(backend.clone()).await;
    let a = ThreadId::from("a");

    shell.select_thread(a.clone());
    shell.settle().await;

    assert!(shell.request_delete(&a));
    assert!(shell.confirm_delete());
    shell.settle().await;

    assert!(shell.active().is_none());
    assert!(shell.chat().is_welcome());
    let ids: Vec<&str> = shell
        .list()
        .conversations()
        .iter()
        .map(|c| c.thread_id.as_str())
        .collect();
    assert_eq!(ids, vec!["b"]);
}

#[tokio::test]
async fn test_delete_other_conversation_keeps_selection() {
    let backend = seeded_backend();
    let mut shell = mounted(backend.clone()).await;
    let a = ThreadId::from("a");
    let b = ThreadId::from("b");

    shell.select_thread(b.clone());
    shell.settle().await;

    shell.request_delete(&a);
    shell.confirm_delete();
    shell.settle().await;

    assert_eq!(shell.active(), Some(&b));
    assert_eq!(contents(&shell), vec!["from b"]);
    assert_eq!(shell.list().conversations().len(), 1);
}

#[tokio::test]
async fn test_cancelled_delete_issues_no_call() {
    let backend = seeded_backend();
    let mut shell = mounted(backend.clone()).await;

    shell.request_delete(&ThreadId::from("a"));
    shell.cancel_delete();
    assert!(!shell.confirm_delete());
    shell.settle().await;

    assert_eq!(
        backend.count_calls(|c| matches!(c, BackendCall::Delete(_))),
        0
    );
}

#[tokio::test]
async fn test_blank_rename_issues_no_call() {
    let backend = seeded_backend();
    let mut shell = mounted(backend.clone()).await;

    assert!(shell.start_rename(&ThreadId::from("a")));
    shell.edit_rename("   ");
    assert!(!shell.confirm_rename());
    shell.settle().await;

    assert_eq!(
        backend.count_calls(|c| matches!(c, BackendCall::Rename { .. })),
        0
    );
    assert!(shell.list().rename_draft().is_some());
}

#[tokio::test]
async fn test_rename_refreshes_list() {
    let backend = seeded_backend();
    let mut shell = mounted(backend.clone()).await;
    let a = ThreadId::from("a");

    shell.start_rename(&a);
    shell.edit_rename("Budget 2024");
    assert!(shell.confirm_rename());
    shell.settle().await;

    assert_eq!(shell.list().find(&a).unwrap().title, "Budget 2024");
    assert!(shell.list().rename_draft().is_none());
}

#[tokio::test]
async fn test_failed_rename_notifies() {
    let backend = seeded_backend();
    let mut shell = mounted(backend.clone()).await;
    let a = ThreadId::from("a");

    backend.set_offline(true);
    shell.start_rename(&a);
    shell.edit_rename("Budget");
    shell.confirm_rename();
    shell.settle().await;

    let notifications = shell.take_notifications();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].is_error());
    assert_eq!(shell.list().find(&a).unwrap().title, "Alpha");
}

#[tokio::test(start_paused = true)]
async fn test_slow_history_for_left_thread_is_discarded() {
    let backend = seeded_backend();
    backend.set_conversation_latency("a", Duration::from_secs(5));
    let mut shell = mounted(backend.clone()).await;
    let b = ThreadId::from("b");

    shell.select_thread(ThreadId::from("a"));
    shell.select_thread(b.clone());
    shell.settle().await;

    assert_eq!(shell.active(), Some(&b));
    assert_eq!(shell.chat().thread_id(), Some(&b));
    assert_eq!(contents(&shell), vec!["from b"]);
}

#[tokio::test(start_paused = true)]
async fn test_answer_for_left_thread_only_refreshes_list() {
    let backend = seeded_backend();
    backend.set_chat_latency(Duration::from_secs(3));
    let mut shell = mounted(backend.clone()).await;
    let b = ThreadId::from("b");

    shell.set_input("Hello");
    shell.submit().unwrap();
    shell.select_thread(b.clone());
    shell.settle().await;

    assert_eq!(shell.active(), Some(&b));
    assert_eq!(contents(&shell), vec!["from b"]);
    assert_eq!(shell.list().conversations().len(), 3);
}

#[tokio::test]
async fn test_reopening_cached_thread_skips_fetch() {
    let backend = seeded_backend();
    let mut shell = mounted(backend.clone()).await;
    let a = ThreadId::from("a");

    shell.select_thread(a.clone());
    shell.settle().await;
    shell.new_chat();
    assert!(shell.chat().is_welcome());
    shell.select_thread(a.clone());
    shell.settle().await;

    assert_eq!(contents(&shell), vec!["from a", "answer a"]);
    assert_eq!(
        backend.count_calls(|c| *c == BackendCall::GetConversation(a.clone())),
        1
    );
}

#[tokio::test]
async fn test_health_requires_every_component() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.set_health(HealthResponse {
        status: "healthy".to_string(),
        pinecone_connected: true,
        gemini_connected: false,
    });
    let mut shell = mounted(backend).await;

    while shell.status().is_loading() {
        let event = shell.next_event().await.unwrap();
        shell.handle_event(event);
    }

    assert!(shell.status().health().is_some());
    assert!(!shell.status().is_healthy());
}

#[tokio::test(start_paused = true)]
async fn test_answer_after_back_to_new_chat_stays_out_of_welcome() {
    let backend = seeded_backend();
    backend.set_chat_latency(Duration::from_secs(3));
    let mut shell = mounted(backend.clone()).await;

    shell.set_input("Hello");
    shell.submit().unwrap();
    shell.select_thread(ThreadId::from("a"));
    shell.new_chat();
    shell.settle().await;

    assert!(shell.active().is_none());
    assert!(shell.chat().is_welcome());
    assert_eq!(shell.list().conversations().len(), 3);
}
