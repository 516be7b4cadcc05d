//! Chatshot
//!
//! A chat-conversation mockup generator: stage roles and messages in a fake
//! messaging-app view, then export the rendered conversation as an image.
//! HTML-first and inspectable: a static page drives a JSON API.
//!
//! # Architecture
//!
//! - **Server**: Axum-based HTTP server with SSE change notifications
//! - **Mockup core**: roles, sender selection, conversation log, and the
//!   timestamp-divider policy, behind a single lock per mockup
//! - **Renderer**: server-side HTML fragments consumed by the static page
//! - **Exporter**: opaque "view to image" capability via an external command
//!
//! # Modules
//!
//! - [`mockup`]: role & message state management
//! - [`render`]: read-only view rendering
//! - [`export`]: image capture capability
//! - [`server`]: HTTP surface

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::default_trait_access)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod export;
pub mod mockup;
pub mod render;
pub mod server;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::export::ImageExporter;
use crate::mockup::MockupStore;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Mockup store for staged conversations.
    pub mockups: MockupStore,
    /// Image export capability, when configured.
    pub exporter: Option<Arc<dyn ImageExporter>>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}
