use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use solace::store::{ChatStore, MemoryStore};
use solace::types::{Message, Role};

async fn seed(store: &MemoryStore, conversation: &str, n: usize) -> Vec<Message> {
    let mut out = Vec::new();
    for i in 0..n {
        let msg = store
            .append(conversation, Role::User, &format!("msg {i}"))
            .await
            .expect("append");
        out.push(msg);
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    out
}

#[tokio::test]
async fn append_assigns_id_and_timestamp() {
    let store = MemoryStore::new();
    let before = Utc::now();
    let msg = store.append("conv", Role::User, "hello").await.expect("append");

    assert_eq!(msg.conversation_id, "conv");
    assert_eq!(msg.role, Role::User);
    assert_eq!(msg.content, "hello");
    assert!(msg.created_at >= before);
    assert_ne!(msg.id, Uuid::nil());
}

#[tokio::test]
async fn fetch_recent_is_ascending_and_bounded() {
    let store = MemoryStore::new();
    seed(&store, "conv", 10).await;

    let recent = store.fetch_recent("conv", 3).await.expect("fetch");
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].content, "msg 7");
    assert_eq!(recent[2].content, "msg 9");
    assert!(recent.windows(2).all(|w| w[0].sort_key() <= w[1].sort_key()));

    let all = store.fetch_recent("conv", 100).await.expect("fetch");
    assert_eq!(all.len(), 10);

    let missing = store.fetch_recent("nobody", 5).await.expect("fetch");
    assert!(missing.is_empty());
}

#[test]
fn equal_timestamps_order_by_id() {
    let mut a = Message::new("conv", Role::User, "first");
    let mut b = Message::new("conv", Role::User, "second");
    let now = Utc::now();
    a.created_at = now;
    b.created_at = now;

    let mut messages = vec![b.clone(), a.clone()];
    messages.sort_by_key(Message::sort_key);
    // Tie broken by id, deterministically.
    assert_eq!(messages[0].id, a.id.min(b.id));
    assert_eq!(messages[1].id, a.id.max(b.id));
}

#[tokio::test]
async fn digest_upsert_overwrites_and_timestamp_never_decreases() {
    let store = MemoryStore::new();

    assert!(store.fetch_digest("conv").await.expect("fetch").is_none());

    store.upsert_digest("conv", "first digest").await.expect("upsert");
    let first = store
        .fetch_digest("conv")
        .await
        .expect("fetch")
        .expect("present");
    assert_eq!(first.digest, "first digest");

    store.upsert_digest("conv", "second digest").await.expect("upsert");
    let second = store
        .fetch_digest("conv")
        .await
        .expect("fetch")
        .expect("present");
    assert_eq!(second.digest, "second digest");
    assert!(second.updated_at >= first.updated_at);

    // Idempotent in content: re-saving identical text changes nothing
    // beyond the timestamp.
    store.upsert_digest("conv", "second digest").await.expect("upsert");
    let third = store
        .fetch_digest("conv")
        .await
        .expect("fetch")
        .expect("present");
    assert_eq!(third.digest, "second digest");
    assert!(third.updated_at >= second.updated_at);
}

#[tokio::test]
async fn same_day_count_excludes_given_id_and_agent_messages() {
    let store = MemoryStore::new();

    let first = store.append("conv", Role::User, "one").await.expect("append");
    store.append("conv", Role::Agent, "reply").await.expect("append");
    let second = store.append("conv", Role::User, "two").await.expect("append");

    let today = second.created_at.date_naive();

    // Excluding the just-written message leaves one prior user message.
    let count = store
        .count_user_messages_on("conv", today, second.id)
        .await
        .expect("count");
    assert_eq!(count, 1);

    // Excluding the first instead: only the second remains.
    let count = store
        .count_user_messages_on("conv", today, first.id)
        .await
        .expect("count");
    assert_eq!(count, 1);

    let none = store
        .count_user_messages_on("nobody", today, Uuid::new_v4())
        .await
        .expect("count");
    assert_eq!(none, 0);
}

#[tokio::test]
async fn chat_day_streak_counts_up() {
    let store = MemoryStore::new();

    assert_eq!(store.chat_days("conv").await.expect("days"), 0);
    assert_eq!(store.bump_chat_days("conv").await.expect("bump"), 1);
    assert_eq!(store.bump_chat_days("conv").await.expect("bump"), 2);
    assert_eq!(store.chat_days("conv").await.expect("days"), 2);

    // Streaks are per conversation.
    assert_eq!(store.chat_days("other").await.expect("days"), 0);
}
