//! Server-side HTML rendering of mockup state.
//!
//! This is the view collaborator: it reads a [`MockupState`] snapshot and
//! produces fragments the static page swaps in. It never mutates state.

use std::fmt::Write as _;

use crate::mockup::avatar::placeholder_avatar;
use crate::mockup::{ConversationItem, MockupState, Role, Side};

/// Render the phone-frame view: header bar plus the conversation area.
#[must_use]
pub fn render_view(state: &MockupState) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        r#"<div class="mockup" id="mockup-{id}"><header class="mockup-header"><span class="mockup-title">{title}</span></header><div class="chat-area">"#,
        id = escape(&state.id),
        title = escape(&state.title),
    );

    for item in &state.items {
        match item {
            ConversationItem::TimestampMarker { display_time } => {
                let _ = write!(
                    html,
                    r#"<div class="timestamp"><span>{}</span></div>"#,
                    escape(display_time)
                );
            }
            ConversationItem::Message {
                text,
                sender_id,
                side,
            } => {
                html.push_str(&render_message(state, text, *sender_id, *side));
            }
        }
    }

    html.push_str("</div></div>");
    html
}

/// Render the roles control panel: one row per role with its avatar, name,
/// and selection state.
#[must_use]
pub fn render_roles_panel(state: &MockupState) -> String {
    if state.roles.is_empty() {
        return r#"<p class="roles-empty">No roles yet. Add one to get started.</p>"#.to_string();
    }

    let mut html = String::from(r#"<ul class="roles-list">"#);
    for role in &state.roles {
        let selected = state.selected_sender == Some(role.id);
        let _ = write!(
            html,
            r#"<li class="role-item{sel_class}" data-role-id="{id}"><img class="role-avatar" src="{avatar}" alt="{name}"><span class="role-name">{name}</span><span class="role-selected">{sel_label}</span></li>"#,
            sel_class = if selected { " selected" } else { "" },
            id = role.id,
            avatar = escape(&avatar_for(role)),
            name = escape(&role.name),
            sel_label = if selected { "sending" } else { "" },
        );
    }
    html.push_str("</ul>");
    html
}

fn render_message(state: &MockupState, text: &str, sender_id: u64, side: Side) -> String {
    // Avatars are looked up at render time so a role's current avatar and
    // name apply to its past messages too.
    let sender = state.roles.iter().find(|r| r.id == sender_id);
    let (avatar, name) = match sender {
        Some(role) => (avatar_for(role), role.name.clone()),
        None => (placeholder_avatar("?"), String::from("?")),
    };

    let avatar_img = format!(
        r#"<img class="message-avatar" src="{}" alt="{}">"#,
        escape(&avatar),
        escape(&name)
    );
    let bubble = format!(r#"<div class="message-bubble">{}</div>"#, escape(text));

    // Sent rows put the bubble before the avatar (right-aligned).
    match side {
        Side::Sent => format!(
            r#"<div class="message sent" data-sender-id="{sender_id}">{bubble}{avatar_img}</div>"#
        ),
        Side::Received => format!(
            r#"<div class="message received" data-sender-id="{sender_id}">{avatar_img}{bubble}</div>"#
        ),
    }
}

fn avatar_for(role: &Role) -> String {
    role.avatar
        .clone()
        .unwrap_or_else(|| placeholder_avatar(&role.name))
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
