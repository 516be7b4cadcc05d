//! Roles and sender selection.

use serde::{Deserialize, Serialize};

/// Header title shown before any role exists.
pub const EMPTY_TITLE: &str = "New Chat";

/// A chat participant that can author messages.
///
/// The role at list position 0 is the conventional "self": its messages
/// render on the sent side, everyone else renders as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique per mockup, monotonically assigned, never reused.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Avatar reference (URL or `data:` URI). The renderer substitutes a
    /// generated placeholder when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Ordered role list plus the currently selected sender.
///
/// Insertion order is display order and is load-bearing: index 0 is "self"
/// and index 1 names the chat header. Mutations that cannot resolve their
/// target id are silent no-ops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleStore {
    roles: Vec<Role>,
    next_id: u64,
    selected: Option<u64>,
}

impl Default for RoleStore {
    fn default() -> Self {
        Self {
            roles: Vec::new(),
            next_id: 1,
            selected: None,
        }
    }
}

impl RoleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a role and auto-select it as the sender.
    ///
    /// Always succeeds; a missing name defaults to `Role {id}`.
    pub fn create(&mut self, name: Option<String>, avatar: Option<String>) -> Role {
        let id = self.next_id;
        self.next_id += 1;

        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("Role {id}"));
        let role = Role { id, name, avatar };
        self.roles.push(role.clone());
        self.selected = Some(id);
        role
    }

    /// Rename in place, preserving list position. No-op on unknown ids.
    ///
    /// Returns whether anything changed.
    pub fn rename(&mut self, id: u64, name: impl Into<String>) -> bool {
        match self.roles.iter_mut().find(|r| r.id == id) {
            Some(role) => {
                role.name = name.into();
                true
            }
            None => false,
        }
    }

    /// Overwrite the avatar reference. No-op on unknown ids.
    pub fn set_avatar(&mut self, id: u64, avatar: impl Into<String>) -> bool {
        match self.roles.iter_mut().find(|r| r.id == id) {
            Some(role) => {
                role.avatar = Some(avatar.into());
                true
            }
            None => false,
        }
    }

    /// Remove a role. If it was the selected sender, selection falls back to
    /// the first remaining role (or none when the list is empty).
    ///
    /// Returns whether a role was removed.
    pub fn delete(&mut self, id: u64) -> bool {
        let before = self.roles.len();
        self.roles.retain(|r| r.id != id);
        if self.roles.len() == before {
            return false;
        }
        if self.selected == Some(id) {
            self.selected = self.roles.first().map(|r| r.id);
        }
        true
    }

    /// Select the sender for subsequently composed messages.
    ///
    /// No-op unless a role with that id exists. Returns whether it resolved.
    pub fn select(&mut self, id: u64) -> bool {
        if self.roles.iter().any(|r| r.id == id) {
            self.selected = Some(id);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn get(&self, id: u64) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == id)
    }

    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    #[must_use]
    pub fn selected(&self) -> Option<u64> {
        self.selected
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Whether messages from this role render on the sent side.
    ///
    /// Bound to the *current* index 0: deleting the original first role
    /// reassigns "self" to whichever role is now first.
    #[must_use]
    pub fn is_self(&self, id: u64) -> bool {
        self.roles.first().is_some_and(|r| r.id == id)
    }

    /// Chat header title: a fixed placeholder when empty, the sole role's
    /// name when alone, otherwise the second role (the "other party"),
    /// no matter how many further roles exist.
    #[must_use]
    pub fn title(&self) -> String {
        match self.roles.len() {
            0 => EMPTY_TITLE.to_string(),
            1 => self.roles[0].name.clone(),
            _ => self.roles[1].name.clone(),
        }
    }
}
