//! Explicit promotion via set_as_next.

use super::*;

#[tokio::test]
async fn test_set_as_next_displaces_current_next() {
    let ctx = setup();
    let t = now_ms();

    let id_a = ctx.queue.add_question("a", t).await.unwrap().unwrap();
    let id_b = ctx.queue.add_question("b", t + 1000).await.unwrap().unwrap();

    // The older question is promoted by the scheduler path.
    let next = ctx.queue.get_next_question().await.unwrap().unwrap();
    assert_eq!(next.id, id_a);

    // The user overrides the selection.
    assert!(ctx.queue.set_as_next(id_b).await.unwrap());

    let queue = ctx.queue.snapshot().await.unwrap();
    let a = queue.iter().find(|q| q.id == id_a).unwrap();
    let b = queue.iter().find(|q| q.id == id_b).unwrap();
    assert_eq!(a.status, QuestionStatus::Pending);
    assert!(a.next_at.is_none());
    assert_eq!(b.status, QuestionStatus::Next);
    assert!(b.next_at.is_some());
}

#[tokio::test]
async fn test_set_as_next_then_get_next_returns_override() {
    let ctx = setup();
    let t = now_ms();

    ctx.queue.add_question("older", t).await.unwrap();
    let id = ctx
        .queue
        .add_question("newer", t + 1000)
        .await
        .unwrap()
        .unwrap();

    assert!(ctx.queue.set_as_next(id).await.unwrap());
    let next = ctx.queue.get_next_question().await.unwrap().unwrap();
    assert_eq!(next.id, id);
}

#[tokio::test]
async fn test_set_as_next_rejects_missing_or_non_pending() {
    let ctx = setup();

    assert!(!ctx.queue.set_as_next(12345).await.unwrap());

    let id = ctx
        .queue
        .add_question("finished", now_ms())
        .await
        .unwrap()
        .unwrap();
    ctx.queue.mark_as_sent(id).await.unwrap();
    assert!(!ctx.queue.set_as_next(id).await.unwrap());
}
