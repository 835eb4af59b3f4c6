use std::sync::Arc;

use chrono::{FixedOffset, Utc};

use crate::github::EventSource;
use crate::line::PushSink;
use crate::policy::{self, Decision};
use crate::tally;

/// Runs one commit check end to end: fetch the tracked account's
/// events, tally today, decide against the threshold, push the
/// rendered message.
///
/// The GitHub account is fixed at construction: the bot reports one
/// developer's activity to however many chat users subscribe.
pub struct Notifier {
    source: Arc<dyn EventSource>,
    sink: Arc<dyn PushSink>,
    threshold: u64,
    offset: FixedOffset,
}

impl Notifier {
    pub fn new(
        source: Arc<dyn EventSource>,
        sink: Arc<dyn PushSink>,
        threshold: u64,
        offset: FixedOffset,
    ) -> Self {
        Self {
            source,
            sink,
            threshold,
            offset,
        }
    }

    /// Check today's commits and, when the decision calls for it, push
    /// the result to `user_id`. Fetch and push failures are logged and
    /// swallowed; a failed fetch never produces an outbound message.
    pub async fn check_and_notify(&self, user_id: &str, immediate: bool) {
        let decision = self.check(immediate).await;

        let Some(text) = policy::render(&decision) else {
            tracing::debug!("Nothing to send to {user_id} ({decision:?})");
            return;
        };

        match self.sink.send_text(user_id, &text).await {
            Ok(()) => tracing::info!("Notified {user_id}: {decision:?}"),
            Err(e) => tracing::error!("Failed to push to {user_id}: {e}"),
        }
    }

    /// Fetch and classify without sending anything.
    pub async fn check(&self, immediate: bool) -> Decision {
        let events = match self.source.fetch_events().await {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("Commit check failed: {e}");
                return Decision::Unknown;
            }
        };

        let count = tally::count_today(&events, Utc::now(), self.offset);
        tracing::info!("Today's commit count: {count}");
        policy::decide(count, self.threshold, immediate)
    }
}
