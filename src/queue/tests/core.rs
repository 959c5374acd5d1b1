//! Core queue operations: add, promote, mark terminal.

use super::*;

#[tokio::test]
async fn test_empty_queue_has_no_next() {
    let ctx = setup();
    assert!(ctx.queue.get_next_question().await.unwrap().is_none());
}

#[tokio::test]
async fn test_add_then_snapshot_roundtrip() {
    let ctx = setup();

    let id = ctx
        .queue
        .add_question("why is the sky blue?", now_ms())
        .await
        .unwrap()
        .expect("not a duplicate");

    let queue = ctx.queue.snapshot().await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].id, id);
    assert_eq!(queue[0].text, "why is the sky blue?");
    assert_eq!(queue[0].status, QuestionStatus::Pending);
    assert_eq!(queue[0].retry_count, 0);
}

#[tokio::test]
async fn test_oldest_received_is_promoted_first() {
    let ctx = setup();
    let t = now_ms() - 300_000;

    // Inserted newest-first to exercise the re-sort.
    ctx.queue.add_question("third", t + 120_000).await.unwrap();
    ctx.queue.add_question("second", t + 60_000).await.unwrap();
    let first = ctx
        .queue
        .add_question("first", t)
        .await
        .unwrap()
        .expect("not a duplicate");

    let next = ctx.queue.get_next_question().await.unwrap().unwrap();
    assert_eq!(next.id, first);
    assert_eq!(next.status, QuestionStatus::Next);
    assert_eq!(next.received_at, t);
}

#[tokio::test]
async fn test_get_next_is_idempotent() {
    let ctx = setup();
    ctx.queue.add_question("only", now_ms()).await.unwrap();

    let a = ctx.queue.get_next_question().await.unwrap().unwrap();
    let b = ctx.queue.get_next_question().await.unwrap().unwrap();
    assert_eq!(a.id, b.id);

    let queue = ctx.queue.snapshot().await.unwrap();
    let next_count = queue
        .iter()
        .filter(|q| q.status == QuestionStatus::Next)
        .count();
    assert_eq!(next_count, 1);
}

#[tokio::test]
async fn test_at_most_one_next_across_promotions() {
    let ctx = setup();
    let t = now_ms();
    for i in 0..5u64 {
        ctx.queue
            .add_question(&format!("question {}", i), t + i)
            .await
            .unwrap();
    }

    ctx.queue.get_next_question().await.unwrap();
    ctx.queue.add_question("late arrival", t + 100).await.unwrap();
    ctx.queue.get_next_question().await.unwrap();

    let queue = ctx.queue.snapshot().await.unwrap();
    let next_count = queue
        .iter()
        .filter(|q| q.status == QuestionStatus::Next)
        .count();
    assert_eq!(next_count, 1);
}

#[tokio::test]
async fn test_mark_as_sent_resets_retry_count() {
    let ctx = setup();
    let id = ctx
        .queue
        .add_question("flaky", now_ms())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(ctx.queue.bump_retry(id).await.unwrap(), Some(1));
    assert_eq!(ctx.queue.bump_retry(id).await.unwrap(), Some(2));

    assert!(ctx.queue.mark_as_sent(id).await.unwrap());
    let queue = ctx.queue.snapshot().await.unwrap();
    assert_eq!(queue[0].status, QuestionStatus::Sent);
    assert_eq!(queue[0].retry_count, 0);
    assert!(queue[0].sent_at.is_some());
}

#[tokio::test]
async fn test_mark_unknown_id_returns_false() {
    let ctx = setup();
    assert!(!ctx.queue.mark_as_sent(9999).await.unwrap());
    assert!(!ctx.queue.mark_as_skipped(9999, "nope").await.unwrap());
    assert_eq!(ctx.queue.bump_retry(9999).await.unwrap(), None);
}

#[tokio::test]
async fn test_terminal_states_are_immutable() {
    let ctx = setup();
    let id = ctx
        .queue
        .add_question("done", now_ms())
        .await
        .unwrap()
        .unwrap();

    assert!(ctx.queue.mark_as_sent(id).await.unwrap());
    // A terminal entry cannot transition again.
    assert!(!ctx.queue.mark_as_skipped(id, "too late").await.unwrap());
    assert!(!ctx.queue.mark_as_sent(id).await.unwrap());
    assert_eq!(ctx.queue.bump_retry(id).await.unwrap(), None);
}

#[tokio::test]
async fn test_skip_records_reason() {
    let ctx = setup();
    let id = ctx
        .queue
        .add_question("blocked", now_ms())
        .await
        .unwrap()
        .unwrap();

    assert!(ctx.queue.mark_as_skipped(id, "NG content").await.unwrap());
    let queue = ctx.queue.snapshot().await.unwrap();
    assert_eq!(queue[0].status, QuestionStatus::Skipped);
    assert_eq!(queue[0].skipped_reason.as_deref(), Some("NG content"));
    assert!(queue[0].skipped_at.is_some());
}
