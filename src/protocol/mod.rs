//! Core protocol types shared by the queue, scheduler, and HTTP layer.

mod types;

pub use types::{
    next_id, now_ms, set_id_counter, PostStats, Question, QuestionStatus, QueueStats,
    SchedulerStatus,
};
