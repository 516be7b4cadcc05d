//! Conversation log and the timestamp-divider policy.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Minimum gap between two timestamp dividers.
pub const MARKER_GAP_SECS: i64 = 2 * 60;

/// Which side of the conversation a message renders on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Authored by the conventional "self" (first role), right-aligned.
    Sent,
    /// Authored by any other party, left-aligned.
    Received,
}

/// One entry in the rendered conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ConversationItem {
    /// Divider inserted when enough time has passed since the last one.
    TimestampMarker { display_time: String },
    Message {
        text: String,
        sender_id: u64,
        side: Side,
    },
}

/// Append-only session history plus the last-divider memory.
///
/// Items are only ever appended by the composer and destroyed in bulk by
/// [`ConversationLog::clear`]. The last marker instant is tracked here
/// rather than derived by scanning the items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationLog {
    items: Vec<ConversationItem>,
    last_marker: Option<DateTime<Utc>>,
}

impl ConversationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, item: ConversationItem) {
        self.items.push(item);
    }

    /// Record that a marker was appended at `now`.
    pub fn note_marker(&mut self, now: DateTime<Utc>) {
        self.last_marker = Some(now);
    }

    /// Whether a message composed at `now` must be preceded by a divider.
    #[must_use]
    pub fn marker_due(&self, now: DateTime<Utc>) -> bool {
        should_insert_marker(now, self.last_marker)
    }

    /// Empty the log and forget the last divider.
    pub fn clear(&mut self) {
        self.items.clear();
        self.last_marker = None;
    }

    #[must_use]
    pub fn items(&self) -> &[ConversationItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn last_marker(&self) -> Option<DateTime<Utc>> {
        self.last_marker
    }
}

/// Divider policy: insert when no divider exists yet, or when the gap since
/// the last one exceeds [`MARKER_GAP_SECS`]. Pure; the caller records the
/// new marker time as part of the same mutation.
#[must_use]
pub fn should_insert_marker(now: DateTime<Utc>, last_marker: Option<DateTime<Utc>>) -> bool {
    match last_marker {
        None => true,
        Some(last) => (now - last).num_seconds() > MARKER_GAP_SECS,
    }
}

/// HH:MM display string for divider and header clock purposes, in local time.
#[must_use]
pub fn format_clock(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&Local).format("%H:%M").to_string()
}
