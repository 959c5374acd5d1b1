//! OpenAPI documentation.

use utoipa::OpenApi;

use super::{control, items, questions, status};
use super::types;
use crate::notify::{Notification, Severity};
use crate::protocol::{PostStats, Question, QuestionStatus, QueueStats, SchedulerStatus};
use crate::scheduler::PostOutcome;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "postQ API",
        description = "Durable auto-posting question queue control plane"
    ),
    paths(
        items::add_incoming_items,
        control::manual_post,
        control::start_auto_posting,
        control::stop_auto_posting,
        control::pause_auto_posting,
        control::resume_auto_posting,
        control::update_interval,
        questions::list_questions,
        questions::set_question_as_next,
        questions::delete_question,
        questions::clear_queue,
        status::get_system_status,
        status::get_settings,
        status::update_settings,
        status::health,
    ),
    components(schemas(
        Question,
        QuestionStatus,
        Severity,
        QueueStats,
        PostStats,
        SchedulerStatus,
        PostOutcome,
        Notification,
        types::IncomingItem,
        types::IncomingItemsRequest,
        types::IngestContext,
        types::IngestResult,
        types::ManualPostRequest,
        types::StartRequest,
        types::IntervalRequest,
        types::UpdateSettingsRequest,
        types::SettingsView,
        types::SystemStatus,
        types::StoreStatus,
        types::LockStatus,
        types::ProducerState,
    )),
    tags(
        (name = "Queue", description = "Question ingestion and lifecycle"),
        (name = "Scheduler", description = "Auto-posting control"),
        (name = "Status", description = "Status, settings, health")
    )
)]
pub struct ApiDoc;
