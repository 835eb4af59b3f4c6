use chrono::{DateTime, FixedOffset, Utc};

use crate::github::Event;

/// Sum the commits from today's push events.
///
/// "Today" is the civil date of `now` in `offset`; each event's UTC
/// timestamp is converted to the same offset before comparing, so a
/// push late in the UTC evening can land on the next local day.
pub fn count_today(events: &[Event], now: DateTime<Utc>, offset: FixedOffset) -> u64 {
    let today = now.with_timezone(&offset).date_naive();

    events
        .iter()
        .filter(|e| e.is_push())
        .filter(|e| e.created_at.with_timezone(&offset).date_naive() == today)
        .map(|e| e.push_size())
        .sum()
}
