//! Soft dedup behavior.

use super::*;
use crate::config::DEDUP_WINDOW_MS;

#[tokio::test]
async fn test_duplicate_within_window_is_dropped() {
    let ctx = setup();
    let t = now_ms();

    let first = ctx.queue.add_question("same question", t).await.unwrap();
    assert!(first.is_some());

    let second = ctx
        .queue
        .add_question("same question", t + 60_000)
        .await
        .unwrap();
    assert!(second.is_none());

    assert_eq!(ctx.queue.snapshot().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_dedup_uses_normalized_text() {
    let ctx = setup();
    let t = now_ms();

    ctx.queue.add_question("Hello   World", t).await.unwrap();
    let dup = ctx.queue.add_question("  hello world ", t + 1).await.unwrap();
    assert!(dup.is_none());
}

#[tokio::test]
async fn test_same_text_outside_window_is_accepted() {
    let ctx = setup();
    let t = now_ms();

    ctx.queue.add_question("evergreen", t).await.unwrap();
    let second = ctx
        .queue
        .add_question("evergreen", t + DEDUP_WINDOW_MS + 1)
        .await
        .unwrap();
    assert!(second.is_some());
    assert_eq!(ctx.queue.snapshot().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_sent_entry_still_blocks_duplicate() {
    let ctx = setup();
    let t = now_ms();

    let id = ctx
        .queue
        .add_question("already answered", t)
        .await
        .unwrap()
        .unwrap();
    ctx.queue.mark_as_sent(id).await.unwrap();

    let dup = ctx
        .queue
        .add_question("already answered", t + 1000)
        .await
        .unwrap();
    assert!(dup.is_none());
}

#[tokio::test]
async fn test_skipped_entry_allows_reask() {
    let ctx = setup();
    let t = now_ms();

    let id = ctx
        .queue
        .add_question("second chance", t)
        .await
        .unwrap()
        .unwrap();
    ctx.queue.mark_as_skipped(id, "transient failure").await.unwrap();

    let again = ctx
        .queue
        .add_question("second chance", t + 1000)
        .await
        .unwrap();
    assert!(again.is_some());
}

#[tokio::test]
async fn test_rejected_inputs() {
    let ctx = setup();
    assert!(ctx.queue.add_question("", now_ms()).await.is_err());
    assert!(ctx.queue.add_question("   ", now_ms()).await.is_err());
    assert!(ctx
        .queue
        .add_question(&"x".repeat(501), now_ms())
        .await
        .is_err());
}

#[tokio::test]
async fn test_batch_counts_duplicates_and_rejects() {
    let ctx = setup();
    let t = now_ms();

    let outcome = ctx
        .queue
        .add_batch(vec![
            ("one".to_string(), t),
            ("two".to_string(), t + 1),
            ("one".to_string(), t + 2),
            ("".to_string(), t + 3),
        ])
        .await
        .unwrap();

    assert_eq!(outcome.added.len(), 2);
    assert_eq!(outcome.duplicates, 1);
    assert_eq!(outcome.rejected, 1);
    assert_eq!(ctx.queue.snapshot().await.unwrap().len(), 2);
}
