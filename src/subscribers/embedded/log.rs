//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [queued] scope=connections key="dev-1" job=job#3
//! [started] scope=connections key="dev-1" job=job#3
//! [resolved] scope=connections key="dev-1" job=job#3
//! [unmatched-completion] scope=connections key="dev-1" reason=no_job_to_execute
//! [executor-removed] scope=connections key="dev-1"
//! [stream-terminated] scope=scan
//! ```

use std::fmt::Write as _;

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn tag(kind: EventKind) -> &'static str {
        match kind {
            EventKind::SubscriberPanicked => "subscriber-panicked",
            EventKind::SubscriberOverflow => "subscriber-overflow",
            EventKind::JobQueued => "queued",
            EventKind::JobStarted => "started",
            EventKind::JobResolved => "resolved",
            EventKind::JobCancelled => "cancelled",
            EventKind::Broadcast => "broadcast",
            EventKind::ExecutorCreated => "executor-created",
            EventKind::ExecutorRemoved => "executor-removed",
            EventKind::ExecutorDestroyed => "executor-destroyed",
            EventKind::UnmatchedCompletion => "unmatched-completion",
            EventKind::ExecutorNotFound => "executor-not-found",
            EventKind::TriggerPanicked => "trigger-panicked",
            EventKind::StreamStarted => "stream-started",
            EventKind::StreamRejected => "stream-rejected",
            EventKind::StreamStartFailed => "stream-start-failed",
            EventKind::StreamTerminated => "stream-terminated",
            EventKind::StreamTerminationFailed => "stream-termination-failed",
            EventKind::StreamValueDropped => "stream-value-dropped",
            EventKind::SlotConflict => "slot-conflict",
        }
    }

    /// Renders one event as a single log line.
    pub(crate) fn format(e: &Event) -> String {
        let mut line = format!("[{}]", Self::tag(e.kind));
        if let Some(scope) = &e.scope {
            let _ = write!(line, " scope={scope}");
        }
        if let Some(key) = &e.key {
            let _ = write!(line, " key={key}");
        }
        if let Some(job) = e.job {
            let _ = write!(line, " job={job}");
        }
        if let Some(reason) = &e.reason {
            let _ = write!(line, " reason={reason}");
        }
        line
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        println!("{}", Self::format(e));
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::JobId;

    #[test]
    fn test_line_includes_set_fields_only() {
        let ev = Event::new(EventKind::UnmatchedCompletion)
            .with_scope("connections")
            .with_key("\"dev-1\"")
            .with_reason("no_job_to_execute");
        assert_eq!(
            LogWriter::format(&ev),
            "[unmatched-completion] scope=connections key=\"dev-1\" reason=no_job_to_execute"
        );

        let id = JobId::next();
        let ev = Event::new(EventKind::JobStarted).with_job(id);
        assert_eq!(LogWriter::format(&ev), format!("[started] job={id}"));
    }
}
