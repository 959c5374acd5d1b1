//! Queue cap enforcement and terminal-entry eviction.

use super::*;
use crate::config::RETENTION_MS;
use crate::protocol::next_id;

/// A sent question whose terminal timestamp is past the retention
/// window, making it eligible for eviction.
fn old_sent(text: &str, age_beyond_retention_ms: u64) -> Question {
    let now = now_ms();
    let mut q = Question::new(next_id(), text.to_string(), now - RETENTION_MS - 100_000);
    q.status = QuestionStatus::Sent;
    q.sent_at = Some(now - RETENTION_MS - age_beyond_retention_ms);
    q
}

#[tokio::test]
async fn test_queue_full_when_nothing_evictable() {
    let ctx = setup();
    set_max_queue_size(&ctx, 3).await;
    let t = now_ms();

    for i in 0..3u64 {
        ctx.queue
            .add_question(&format!("q{}", i), t + i)
            .await
            .unwrap();
    }

    // All entries are pending; the cap holds.
    let result = ctx.queue.add_question("overflow", t + 10).await;
    assert!(matches!(result, Err(QueueError::QueueFull)));
    assert_eq!(ctx.queue.snapshot().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_insert_evicts_old_terminal_entry() {
    let ctx = setup();
    set_max_queue_size(&ctx, 3).await;

    persist_queue(
        &ctx,
        &vec![
            old_sent("ancient one", 5_000),
            old_sent("ancient two", 1_000),
        ],
    )
    .await;
    ctx.queue.add_question("fills the cap", now_ms()).await.unwrap();

    // Cap reached; the oldest terminated entry makes room.
    let id = ctx
        .queue
        .add_question("newcomer", now_ms())
        .await
        .unwrap()
        .expect("not a duplicate");

    let queue = ctx.queue.snapshot().await.unwrap();
    assert_eq!(queue.len(), 3);
    assert!(queue.iter().any(|q| q.id == id));
    assert!(!queue.iter().any(|q| q.text == "ancient one"));
    assert!(queue.iter().any(|q| q.text == "ancient two"));
}

#[tokio::test]
async fn test_batch_eviction_restores_cap() {
    let ctx = setup();

    // Five old terminal entries persisted above a cap of three.
    persist_queue(
        &ctx,
        &vec![
            old_sent("s1", 5_000),
            old_sent("s2", 4_000),
            old_sent("s3", 3_000),
            old_sent("s4", 2_000),
            old_sent("s5", 1_000),
        ],
    )
    .await;
    set_max_queue_size(&ctx, 3).await;

    ctx.queue.add_question("fresh", now_ms()).await.unwrap();

    let queue = ctx.queue.snapshot().await.unwrap();
    assert_eq!(queue.len(), 3);
    assert!(queue.iter().any(|q| q.text == "fresh"));
    // The oldest terminations went first.
    assert!(!queue.iter().any(|q| q.text == "s1"));
    assert!(!queue.iter().any(|q| q.text == "s2"));
    assert!(!queue.iter().any(|q| q.text == "s3"));
}

#[tokio::test]
async fn test_recent_terminal_entries_are_retained() {
    let ctx = setup();
    set_max_queue_size(&ctx, 2).await;
    let t = now_ms();

    let id = ctx.queue.add_question("kept", t).await.unwrap().unwrap();
    ctx.queue.mark_as_sent(id).await.unwrap();
    ctx.queue.add_question("pending", t + 1).await.unwrap();

    // The sent entry is inside the retention window, so nothing is
    // evictable and the cap rejects the insert.
    let result = ctx.queue.add_question("overflow", t + 2).await;
    assert!(matches!(result, Err(QueueError::QueueFull)));
}

#[tokio::test]
async fn test_cap_invariant_under_sustained_inserts() {
    let ctx = setup();
    set_max_queue_size(&ctx, 4).await;

    persist_queue(
        &ctx,
        &vec![
            old_sent("e1", 4_000),
            old_sent("e2", 3_000),
            old_sent("e3", 2_000),
            old_sent("e4", 1_000),
        ],
    )
    .await;

    let t = now_ms();
    for i in 0..4u64 {
        ctx.queue
            .add_question(&format!("new {}", i), t + i)
            .await
            .unwrap();
        assert!(ctx.queue.snapshot().await.unwrap().len() <= 4);
    }
}
