use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{
        Html, IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, get_service, patch, post},
};
use chrono::Utc;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::config::AppConfig;
use crate::export::{CommandExporter, ExportError, ImageExporter};
use crate::mockup::{
    ChangeEvent, ComposeError, ConversationItem, MockupState, MockupStore, Role, format_clock,
};
use crate::render;

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let exporter: Option<Arc<dyn ImageExporter>> = config
        .export_command()
        .map(|cmd| Arc::new(CommandExporter::new(cmd)) as Arc<dyn ImageExporter>);

    if exporter.is_some() {
        info!(name: "export.configured", "Image export command configured");
    } else {
        info!(name: "export.unconfigured", "No image export command; export will be unavailable");
    }

    let state = AppState {
        mockups: MockupStore::new(),
        exporter,
        config: config.clone(),
    };

    let app = app(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the application router. Split out so tests can drive it directly.
pub fn app(state: AppState) -> Router {
    let timeout_duration = if state.config.resilience.timeout_disabled {
        Duration::from_secs(365 * 24 * 60 * 60)
    } else {
        Duration::from_secs(30)
    };

    Router::new()
        .route("/", get_service(ServeFile::new("static/index.html")))
        .nest_service("/static", ServeDir::new("static"))
        .route("/api/mockups", post(api_create_mockup).get(api_list_mockups))
        .route(
            "/api/mockups/{id}",
            get(api_get_mockup).delete(api_delete_mockup),
        )
        .route("/api/mockups/{id}/roles", post(api_create_role))
        .route(
            "/api/mockups/{id}/roles/{rid}",
            patch(api_rename_role).delete(api_delete_role),
        )
        .route("/api/mockups/{id}/roles/{rid}/avatar", post(api_upload_avatar))
        .route("/api/mockups/{id}/roles/{rid}/select", post(api_select_sender))
        .route(
            "/api/mockups/{id}/messages",
            post(api_compose_message).delete(api_clear_conversation),
        )
        .route("/api/mockups/{id}/view", get(api_view))
        .route("/api/mockups/{id}/panel", get(api_roles_panel))
        .route("/api/mockups/{id}/events", get(api_events))
        .route("/api/mockups/{id}/export", post(api_export))
        .route("/api/clock", get(api_clock))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB limit
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| {
                let duration = timeout_duration;
                async move {
                    match tokio::time::timeout(duration, next.run(req)).await {
                        Ok(res) => res,
                        Err(_) => {
                            (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response()
                        }
                    }
                }
            },
        ))
        .with_state(state)
}

fn sse_response<S>(stream: S) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send>
where
    S: Stream<Item = ChangeEvent> + Send + 'static,
{
    let stream = stream.map(|event| {
        let json = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().event("change").data(json))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// User-visible error notice.
#[derive(Debug, Serialize)]
struct ErrorNotice {
    error: String,
}

fn notice(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorNotice {
            error: message.into(),
        }),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct CreateMockupParams {
    /// Seed the new mockup with the demo roles and messages.
    #[serde(default)]
    demo: bool,
}

#[derive(Debug, Serialize)]
struct MockupCreated {
    id: String,
}

/// POST /api/mockups - Create a mockup, optionally demo-seeded.
async fn api_create_mockup(
    State(state): State<AppState>,
    Query(params): Query<CreateMockupParams>,
) -> Json<MockupCreated> {
    let mockup = state.mockups.create();
    if params.demo {
        mockup.seed_demo();
    }

    info!(
        name: "mockup.created",
        mockup_id = %mockup.id(),
        demo = params.demo,
        "Mockup created"
    );

    Json(MockupCreated {
        id: mockup.id().to_string(),
    })
}

/// GET /api/mockups - List mockup ids.
async fn api_list_mockups(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.mockups.list_ids())
}

/// GET /api/mockups/:id - Full mockup state.
async fn api_get_mockup(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MockupState>, StatusCode> {
    match state.mockups.get(&id) {
        Some(mockup) => Ok(Json(mockup.to_state())),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// DELETE /api/mockups/:id
async fn api_delete_mockup(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> StatusCode {
    match state.mockups.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

#[derive(Debug, Deserialize)]
struct CreateRoleRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
}

/// POST /api/mockups/:id/roles - Create a role (auto-selected as sender).
async fn api_create_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CreateRoleRequest>,
) -> Result<Json<Role>, StatusCode> {
    match state.mockups.get(&id) {
        Some(mockup) => {
            let role = mockup.create_role(req.name, req.avatar);
            info!(
                name: "mockup.role.created",
                mockup_id = %id,
                role_id = role.id,
                "Role created"
            );
            Ok(Json(role))
        }
        None => Err(StatusCode::NOT_FOUND),
    }
}

#[derive(Debug, Deserialize)]
struct RenameRoleRequest {
    name: String,
}

/// PATCH /api/mockups/:id/roles/:rid - Rename. Unknown role ids are no-ops
/// per the core contract; the repaired state is returned either way.
async fn api_rename_role(
    State(state): State<AppState>,
    Path((id, rid)): Path<(String, u64)>,
    Json(req): Json<RenameRoleRequest>,
) -> Result<Json<MockupState>, StatusCode> {
    match state.mockups.get(&id) {
        Some(mockup) => {
            mockup.rename_role(rid, req.name);
            Ok(Json(mockup.to_state()))
        }
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// POST /api/mockups/:id/roles/:rid/avatar - Multipart avatar upload.
///
/// The uploaded bytes are embedded on the role as a base64 `data:` URI; the
/// MIME type comes from the part's content type, falling back to a guess
/// from the filename.
async fn api_upload_avatar(
    State(state): State<AppState>,
    Path((id, rid)): Path<(String, u64)>,
    mut multipart: Multipart,
) -> Result<Json<MockupState>, Response> {
    let mockup = state
        .mockups
        .get(&id)
        .ok_or_else(|| StatusCode::NOT_FOUND.into_response())?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| notice(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.file_name().is_none() && field.name() != Some("avatar") {
            continue;
        }

        let mime = field
            .content_type()
            .map(ToString::to_string)
            .or_else(|| {
                field
                    .file_name()
                    .map(|f| mime_guess::from_path(f).first_or_octet_stream().to_string())
            })
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let bytes = field
            .bytes()
            .await
            .map_err(|e| notice(StatusCode::BAD_REQUEST, e.to_string()))?;

        mockup.set_avatar(rid, crate::mockup::avatar::data_uri(&mime, &bytes));
        return Ok(Json(mockup.to_state()));
    }

    Err(notice(StatusCode::BAD_REQUEST, "no avatar file in request"))
}

/// DELETE /api/mockups/:id/roles/:rid
async fn api_delete_role(
    State(state): State<AppState>,
    Path((id, rid)): Path<(String, u64)>,
) -> Result<Json<MockupState>, StatusCode> {
    match state.mockups.get(&id) {
        Some(mockup) => {
            mockup.delete_role(rid);
            Ok(Json(mockup.to_state()))
        }
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// POST /api/mockups/:id/roles/:rid/select
async fn api_select_sender(
    State(state): State<AppState>,
    Path((id, rid)): Path<(String, u64)>,
) -> Result<Json<MockupState>, StatusCode> {
    match state.mockups.get(&id) {
        Some(mockup) => {
            mockup.select_sender(rid);
            Ok(Json(mockup.to_state()))
        }
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// Request body for message composition.
#[derive(Debug, Deserialize)]
struct ComposeRequest {
    text: String,
    sender_id: u64,
}

/// POST /api/mockups/:id/messages - Compose a message.
///
/// Returns the appended items (divider first when one was due). Invalid
/// input leaves the conversation untouched and maps to 422 so the page can
/// keep the input fields as typed.
async fn api_compose_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ComposeRequest>,
) -> Result<Json<Vec<ConversationItem>>, Response> {
    let mockup = state
        .mockups
        .get(&id)
        .ok_or_else(|| StatusCode::NOT_FOUND.into_response())?;

    match mockup.compose_message(&req.text, req.sender_id) {
        Ok(appended) => Ok(Json(appended)),
        Err(e @ (ComposeError::EmptyText | ComposeError::UnknownSender(_))) => {
            Err(notice(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))
        }
    }
}

/// DELETE /api/mockups/:id/messages - Clear the conversation.
async fn api_clear_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> StatusCode {
    match state.mockups.get(&id) {
        Some(mockup) => {
            mockup.clear_conversation();
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

/// GET /api/mockups/:id/view - Rendered conversation fragment.
async fn api_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, StatusCode> {
    match state.mockups.get(&id) {
        Some(mockup) => Ok(Html(render::render_view(&mockup.to_state()))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// GET /api/mockups/:id/panel - Rendered roles panel fragment.
async fn api_roles_panel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, StatusCode> {
    match state.mockups.get(&id) {
        Some(mockup) => Ok(Html(render::render_roles_panel(&mockup.to_state()))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// GET /api/mockups/:id/events - SSE change stream.
async fn api_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let mockup = state.mockups.get(&id).ok_or(StatusCode::NOT_FOUND)?;

    let stream =
        BroadcastStream::new(mockup.subscribe()).filter_map(|res: Result<ChangeEvent, _>| res.ok());

    Ok(sse_response(stream))
}

/// POST /api/mockups/:id/export - Capture the rendered view as an image.
///
/// The only user-visible error surface: an unconfigured exporter is a 503
/// notice, a failing capture a 502. Conversation state is never affected.
async fn api_export(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(mockup) = state.mockups.get(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let Some(exporter) = &state.exporter else {
        return notice(
            StatusCode::SERVICE_UNAVAILABLE,
            "image export is not configured; set an export command to enable screenshots",
        );
    };

    // Bind-all hosts are not dialable; point the capture at loopback.
    let host = match state.config.server.host.as_str() {
        "0.0.0.0" | "::" => "127.0.0.1",
        host => host,
    };
    let view_url = format!(
        "http://{host}:{}/api/mockups/{}/view",
        state.config.server.port,
        mockup.id()
    );

    match exporter.capture(&view_url).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "image/png".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"chatshot-{}.png\"", mockup.id()),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(ExportError::Unavailable) => notice(
            StatusCode::SERVICE_UNAVAILABLE,
            ExportError::Unavailable.to_string(),
        ),
        Err(e) => notice(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct ClockParams {
    /// User-supplied display string; wins over the wall clock when present.
    #[serde(default, rename = "override")]
    override_value: Option<String>,
}

#[derive(Debug, Serialize)]
struct ClockResponse {
    display: String,
}

/// GET /api/clock - Header display time (HH:MM or the user override).
///
/// Display-only phone chrome; deliberately outside the mockup state.
async fn api_clock(Query(params): Query<ClockParams>) -> Json<ClockResponse> {
    let display = params
        .override_value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| format_clock(Utc::now()));

    Json(ClockResponse { display })
}
