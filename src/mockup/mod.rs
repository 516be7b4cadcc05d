//! Mockup state: roles, conversation log, and change notification.
//!
//! A [`Mockup`] is one staged conversation. All state lives behind a single
//! `RwLock` so every operation is one atomic transition: the divider
//! decision, the marker-memory update, and the message append happen under
//! one write guard with nothing interleaving.

pub mod avatar;
pub mod events;
pub mod log;
pub mod roles;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub use events::ChangeEvent;
pub use log::{ConversationItem, ConversationLog, Side, format_clock, should_insert_marker};
pub use roles::{Role, RoleStore};

/// Buffered change events per mockup; slow SSE subscribers lag past this.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Why a compose call did not produce a message.
///
/// Both cases leave the conversation untouched; the UI keeps the input
/// fields as-is for the user to correct.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComposeError {
    #[error("message text is empty")]
    EmptyText,
    #[error("unknown sender id {0}")]
    UnknownSender(u64),
}

/// A single staged conversation.
///
/// Cheap to clone; clones share state. Mutations broadcast a
/// [`ChangeEvent`] for renderer subscribers.
#[derive(Debug)]
pub struct Mockup {
    inner: Arc<MockupInner>,
}

#[derive(Debug)]
struct MockupInner {
    /// Unique mockup identifier.
    id: String,
    /// Roles and conversation under one lock (atomicity contract).
    state: RwLock<State>,
    /// Mockup creation time.
    created_at: DateTime<Utc>,
    /// Change notification fan-out.
    events: broadcast::Sender<ChangeEvent>,
}

#[derive(Debug, Default)]
struct State {
    roles: RoleStore,
    log: ConversationLog,
}

/// Serializable snapshot of a mockup, served to the page as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockupState {
    pub id: String,
    pub title: String,
    pub roles: Vec<Role>,
    pub selected_sender: Option<u64>,
    pub items: Vec<ConversationItem>,
    pub created_at: String, // RFC3339
}

impl Clone for Mockup {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Mockup {
    fn new(id: String) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(MockupInner {
                id,
                state: RwLock::new(State::default()),
                created_at: Utc::now(),
                events,
            }),
        }
    }

    /// Get the mockup ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.events.subscribe()
    }

    // Dropped when nobody is subscribed, which is fine.
    fn emit(&self, event: ChangeEvent) {
        let _ = self.inner.events.send(event);
    }

    fn emit_roles_changed(&self, state: &State) {
        self.emit(ChangeEvent::RoleListChanged {
            roles: state.roles.roles().to_vec(),
            title: state.roles.title(),
        });
    }

    /// Create a role and select it as the sender. Always succeeds.
    pub fn create_role(&self, name: Option<String>, avatar: Option<String>) -> Role {
        let mut state = self.inner.state.write().unwrap();
        let role = state.roles.create(name, avatar);
        self.emit_roles_changed(&state);
        self.emit(ChangeEvent::SelectionChanged {
            selected: state.roles.selected(),
        });
        role
    }

    /// Rename a role in place. Silent no-op on unknown ids.
    pub fn rename_role(&self, id: u64, name: impl Into<String>) {
        let mut state = self.inner.state.write().unwrap();
        if state.roles.rename(id, name) {
            self.emit_roles_changed(&state);
        }
    }

    /// Overwrite a role's avatar reference. Silent no-op on unknown ids.
    pub fn set_avatar(&self, id: u64, avatar: impl Into<String>) {
        let mut state = self.inner.state.write().unwrap();
        if state.roles.set_avatar(id, avatar) {
            self.emit_roles_changed(&state);
        }
    }

    /// Delete a role, repairing the sender selection when it pointed at the
    /// removed role. Silent no-op on unknown ids.
    pub fn delete_role(&self, id: u64) {
        let mut state = self.inner.state.write().unwrap();
        let selected_before = state.roles.selected();
        if state.roles.delete(id) {
            self.emit_roles_changed(&state);
            if state.roles.selected() != selected_before {
                self.emit(ChangeEvent::SelectionChanged {
                    selected: state.roles.selected(),
                });
            }
        }
    }

    /// Select the sender for the next composed message. Silent no-op unless
    /// the id resolves.
    pub fn select_sender(&self, id: u64) {
        let mut state = self.inner.state.write().unwrap();
        if state.roles.select(id) {
            self.emit(ChangeEvent::SelectionChanged {
                selected: Some(id),
            });
        }
    }

    /// Chat header title derived from the role list.
    #[must_use]
    pub fn title(&self) -> String {
        self.inner.state.read().unwrap().roles.title()
    }

    /// Compose a message from `sender_id` at the current instant.
    ///
    /// Returns the appended items: the message, preceded by a timestamp
    /// divider when the 2-minute gap policy triggers.
    pub fn compose_message(
        &self,
        text: &str,
        sender_id: u64,
    ) -> Result<Vec<ConversationItem>, ComposeError> {
        self.compose_message_at(text, sender_id, Utc::now())
    }

    /// Compose at an explicit instant. Divider decision, marker-memory
    /// update, and append all happen under one write guard.
    pub fn compose_message_at(
        &self,
        text: &str,
        sender_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<ConversationItem>, ComposeError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ComposeError::EmptyText);
        }

        let mut state = self.inner.state.write().unwrap();
        if state.roles.get(sender_id).is_none() {
            return Err(ComposeError::UnknownSender(sender_id));
        }

        let mut appended = Vec::with_capacity(2);
        if state.log.marker_due(now) {
            let marker = ConversationItem::TimestampMarker {
                display_time: format_clock(now),
            };
            state.log.append(marker.clone());
            state.log.note_marker(now);
            appended.push(marker);
        }

        let side = if state.roles.is_self(sender_id) {
            Side::Sent
        } else {
            Side::Received
        };
        let message = ConversationItem::Message {
            text: text.to_string(),
            sender_id,
            side,
        };
        state.log.append(message.clone());
        appended.push(message);

        self.emit(ChangeEvent::ConversationChanged {
            appended: appended.clone(),
        });
        Ok(appended)
    }

    /// Empty the conversation and forget the divider memory.
    pub fn clear_conversation(&self) {
        let mut state = self.inner.state.write().unwrap();
        state.log.clear();
        self.emit(ChangeEvent::ConversationCleared);
    }

    /// Number of conversation items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.inner.state.read().unwrap().log.len()
    }

    /// All conversation items, in order.
    #[must_use]
    pub fn items(&self) -> Vec<ConversationItem> {
        self.inner.state.read().unwrap().log.items().to_vec()
    }

    /// Current role list, in display order.
    #[must_use]
    pub fn roles(&self) -> Vec<Role> {
        self.inner.state.read().unwrap().roles.roles().to_vec()
    }

    /// Look up one role.
    #[must_use]
    pub fn role(&self, id: u64) -> Option<Role> {
        self.inner.state.read().unwrap().roles.get(id).cloned()
    }

    #[must_use]
    pub fn selected_sender(&self) -> Option<u64> {
        self.inner.state.read().unwrap().roles.selected()
    }

    /// Snapshot for API responses and rendering.
    #[must_use]
    pub fn to_state(&self) -> MockupState {
        let state = self.inner.state.read().unwrap();
        MockupState {
            id: self.inner.id.clone(),
            title: state.roles.title(),
            roles: state.roles.roles().to_vec(),
            selected_sender: state.roles.selected(),
            items: state.log.items().to_vec(),
            created_at: self.inner.created_at.to_rfc3339(),
        }
    }

    /// Starter content matching the original page: two roles and a short
    /// scripted exchange, with the first role selected as sender.
    pub fn seed_demo(&self) {
        let me = self.create_role(
            Some("Me".to_string()),
            Some(avatar::placeholder_avatar("Me")),
        );
        let friend = self.create_role(
            Some("Friend".to_string()),
            Some(avatar::placeholder_avatar("Friend")),
        );
        self.select_sender(me.id);

        let _ = self.compose_message("Hey, how does this work?", friend.id);
        let _ = self.compose_message("Add roles and messages from the panel on the right.", me.id);
        let _ = self.compose_message("Got it, thanks!", friend.id);
    }
}

/// Thread-safe store for mockups.
///
/// Provides methods for creating, retrieving, and removing mockups.
#[derive(Debug, Clone, Default)]
pub struct MockupStore {
    inner: Arc<MockupStoreInner>,
}

#[derive(Debug, Default)]
struct MockupStoreInner {
    mockups: RwLock<HashMap<String, Mockup>>,
}

impl MockupStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new mockup and return it.
    #[must_use]
    pub fn create(&self) -> Mockup {
        let id = Uuid::new_v4().to_string();
        let mockup = Mockup::new(id.clone());
        let mut guard = self.inner.mockups.write().unwrap();
        guard.insert(id, mockup.clone());
        mockup
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Mockup> {
        let guard = self.inner.mockups.read().unwrap();
        guard.get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> Option<Mockup> {
        let mut guard = self.inner.mockups.write().unwrap();
        guard.remove(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.mockups.read().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn list_ids(&self) -> Vec<String> {
        self.inner
            .mockups
            .read()
            .unwrap()
            .keys()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn two_roles(mockup: &Mockup) -> (Role, Role) {
        let me = mockup.create_role(Some("Me".into()), None);
        let friend = mockup.create_role(Some("Friend".into()), None);
        (me, friend)
    }

    #[test]
    fn test_invalid_compose_never_mutates_log() {
        let mockup = MockupStore::new().create();
        let (me, _) = two_roles(&mockup);

        assert_eq!(
            mockup.compose_message("   ", me.id),
            Err(ComposeError::EmptyText)
        );
        assert_eq!(
            mockup.compose_message("hi", 9999),
            Err(ComposeError::UnknownSender(9999))
        );
        assert_eq!(mockup.item_count(), 0);
    }

    #[test]
    fn test_marker_timing() {
        let mockup = MockupStore::new().create();
        let (me, _) = two_roles(&mockup);
        let t0 = Utc::now();

        // First message always gets a divider.
        let appended = mockup.compose_message_at("one", me.id, t0).unwrap();
        assert_eq!(appended.len(), 2);
        assert!(matches!(
            appended[0],
            ConversationItem::TimestampMarker { .. }
        ));

        // 119s later: inside the gap, no divider.
        let appended = mockup
            .compose_message_at("two", me.id, t0 + Duration::seconds(119))
            .unwrap();
        assert_eq!(appended.len(), 1);

        // 121s after the first divider: new divider, and the memory moves.
        let t1 = t0 + Duration::seconds(121);
        let appended = mockup.compose_message_at("three", me.id, t1).unwrap();
        assert_eq!(appended.len(), 2);

        // Gap is measured from the latest divider, not the first.
        let appended = mockup
            .compose_message_at("four", me.id, t1 + Duration::seconds(60))
            .unwrap();
        assert_eq!(appended.len(), 1);
    }

    #[test]
    fn test_side_tracks_current_first_role() {
        let mockup = MockupStore::new().create();
        let (me, friend) = two_roles(&mockup);
        let t0 = Utc::now();

        let appended = mockup.compose_message_at("mine", me.id, t0).unwrap();
        assert!(matches!(
            appended.last(),
            Some(ConversationItem::Message {
                side: Side::Sent,
                ..
            })
        ));

        // Delete the original self; the second role becomes index 0 and
        // composes on the sent side from now on.
        mockup.delete_role(me.id);
        let appended = mockup
            .compose_message_at("now mine", friend.id, t0 + Duration::seconds(10))
            .unwrap();
        assert!(matches!(
            appended.last(),
            Some(ConversationItem::Message {
                side: Side::Sent,
                ..
            })
        ));
    }

    #[test]
    fn test_clear_resets_marker_memory() {
        let mockup = MockupStore::new().create();
        let (me, _) = two_roles(&mockup);
        let t0 = Utc::now();

        mockup.compose_message_at("before", me.id, t0).unwrap();
        mockup.clear_conversation();
        assert_eq!(mockup.item_count(), 0);

        // Only 10s later, but the memory was reset with the log.
        let appended = mockup
            .compose_message_at("after", me.id, t0 + Duration::seconds(10))
            .unwrap();
        assert_eq!(appended.len(), 2);
        assert!(matches!(
            appended[0],
            ConversationItem::TimestampMarker { .. }
        ));
    }

    #[test]
    fn test_two_role_conversation_flow() {
        let mockup = MockupStore::new().create();
        let (me, friend) = two_roles(&mockup);
        let t0 = Utc::now();

        mockup.select_sender(friend.id);
        mockup.compose_message_at("hi", friend.id, t0).unwrap();

        mockup.select_sender(me.id);
        mockup
            .compose_message_at("hello", me.id, t0 + Duration::seconds(30))
            .unwrap();

        let items = mockup.items();
        assert_eq!(items.len(), 3);
        assert!(matches!(items[0], ConversationItem::TimestampMarker { .. }));
        assert_eq!(
            items[1],
            ConversationItem::Message {
                text: "hi".into(),
                sender_id: friend.id,
                side: Side::Received,
            }
        );
        assert_eq!(
            items[2],
            ConversationItem::Message {
                text: "hello".into(),
                sender_id: me.id,
                side: Side::Sent,
            }
        );
    }

    #[test]
    fn test_change_events_are_broadcast() {
        let mockup = MockupStore::new().create();
        let mut rx = mockup.subscribe();

        let role = mockup.create_role(Some("Me".into()), None);
        assert!(matches!(
            rx.try_recv().unwrap(),
            ChangeEvent::RoleListChanged { .. }
        ));
        assert_eq!(
            rx.try_recv().unwrap(),
            ChangeEvent::SelectionChanged {
                selected: Some(role.id)
            }
        );

        mockup.rename_role(9999, "ghost");
        mockup.select_sender(9999);
        // No-ops emit nothing.
        assert!(rx.try_recv().is_err());

        mockup.compose_message("hi", role.id).unwrap();
        assert!(matches!(
            rx.try_recv().unwrap(),
            ChangeEvent::ConversationChanged { .. }
        ));

        mockup.clear_conversation();
        assert_eq!(rx.try_recv().unwrap(), ChangeEvent::ConversationCleared);
    }

    #[test]
    fn test_mockup_store() {
        let store = MockupStore::new();
        assert!(store.is_empty());

        let mockup = store.create();
        assert_eq!(store.len(), 1);

        let retrieved = store.get(mockup.id()).unwrap();
        assert_eq!(retrieved.id(), mockup.id());

        store.remove(mockup.id());
        assert!(store.is_empty());
    }

    #[test]
    fn test_demo_seed() {
        let mockup = MockupStore::new().create();
        mockup.seed_demo();

        assert_eq!(mockup.roles().len(), 2);
        assert_eq!(mockup.title(), "Friend");
        assert_eq!(mockup.selected_sender(), Some(mockup.roles()[0].id));
        // Divider plus three scripted messages.
        assert_eq!(mockup.item_count(), 4);
    }
}
