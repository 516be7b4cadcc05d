//! Change notifications emitted to renderer subscribers.

use serde::{Deserialize, Serialize};

use super::log::ConversationItem;
use super::roles::Role;

/// Broadcast after every successful mutation so dependent views (role list,
/// sender picker, chat header, conversation area) can redraw. Carries enough
/// data for the subscriber to repaint the affected region without a refetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ChangeEvent {
    RoleListChanged { roles: Vec<Role>, title: String },
    SelectionChanged { selected: Option<u64> },
    ConversationChanged { appended: Vec<ConversationItem> },
    ConversationCleared,
}
