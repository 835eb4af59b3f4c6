use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};
use tokio::task::JoinHandle;

use crate::notifier::Notifier;
use crate::registry::UserRegistry;

/// Fires the nightly commit check once per day at a fixed local
/// wall-clock time.
///
/// One background task owns the loop; users in a sweep are notified
/// sequentially, and the next firing is computed only after a sweep
/// finishes, so sweeps never overlap. Firings missed while the
/// process is down are simply lost.
pub struct Scheduler {
    notifier: Arc<Notifier>,
    registry: Arc<UserRegistry>,
    offset: FixedOffset,
    hour: u32,
    minute: u32,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(
        notifier: Arc<Notifier>,
        registry: Arc<UserRegistry>,
        offset: FixedOffset,
        hour: u32,
        minute: u32,
    ) -> Self {
        Self {
            notifier,
            registry,
            offset,
            hour,
            minute,
            handle: None,
        }
    }

    /// Spawn the daily loop. Calling start on a running scheduler is
    /// a no-op; the trigger must not be registered twice.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            tracing::warn!("Scheduler already started");
            return;
        }

        let notifier = self.notifier.clone();
        let registry = self.registry.clone();
        let offset = self.offset;
        let (hour, minute) = (self.hour, self.minute);

        self.handle = Some(tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next = next_fire_after(now, offset, hour, minute);
                tracing::info!(
                    "Next nightly commit check at {}",
                    next.with_timezone(&offset)
                );

                let wait = (next - now).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;

                let users = registry.snapshot();
                tracing::info!("Nightly commit check for {} user(s)", users.len());
                for user_id in users {
                    notifier.check_and_notify(&user_id, true).await;
                }
            }
        }));
        tracing::info!(
            "Scheduler started (daily at {:02}:{:02} {})",
            self.hour,
            self.minute,
            self.offset
        );
    }

    /// Cancel the pending trigger. In-flight notifications are not
    /// awaited.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::info!("Scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

/// The next instant strictly after `after` whose local wall-clock time
/// in `offset` is hour:minute.
fn next_fire_after(
    after: DateTime<Utc>,
    offset: FixedOffset,
    hour: u32,
    minute: u32,
) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    let local_date = after.with_timezone(&offset).date_naive();
    let to_utc = Duration::seconds(offset.local_minus_utc() as i64);

    let candidate = Utc.from_utc_datetime(&(local_date.and_time(time) - to_utc));
    if candidate > after {
        return candidate;
    }
    let tomorrow = local_date.succ_opt().unwrap_or(local_date);
    Utc.from_utc_datetime(&(tomorrow.and_time(time) - to_utc))
}
