//! HTTP control API.
//!
//! JSON over HTTP on localhost; the static page at `/` drives it.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use chrono::{DateTime, Local};
use steamshelf_protocol::messages::{
    ApiError, OperationResult, ServerStatus, ShareView, StartDownloadRequest,
    StartDownloadResponse, SystemStatus,
};
use steamshelf_protocol::{DownloadEntry, GameInfo, InstalledGame, ShareRecord};
use steamshelf_shares::{ShareError, generate_access_url};
use steamshelf_steamcmd::{
    SteamCmdError, cleanup_failed_download, game_path, is_valid_app_id, list_installed_games,
};

use crate::app::AppState;

type SharedState = Arc<AppState>;

const INDEX_HTML: &str = include_str!("../ui/index.html");

/// Error response: a status code plus an [`ApiError`] body.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    message: String,
}

impl ApiFailure {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = ApiError {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<SteamCmdError> for ApiFailure {
    fn from(e: SteamCmdError) -> Self {
        match &e {
            SteamCmdError::InvalidAppId(_) => Self::bad_request(format!("Error: {e}")),
            _ => Self::internal(format!("Error: {e}")),
        }
    }
}

impl From<ShareError> for ApiFailure {
    fn from(e: ShareError) -> Self {
        match &e {
            ShareError::GameNotFound(_) => Self::not_found(format!("Error: {e}")),
            _ => Self::internal(format!("Error: {e}")),
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiFailure>;

/// Builds the control panel router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/status", get(system_status))
        .route("/api/steamcmd/install", post(install_steamcmd))
        .route("/api/games", get(list_games))
        .route("/api/games/{app_id}", get(game_info).delete(delete_game))
        .route("/api/games/{app_id}/share", post(share_game))
        .route("/api/downloads", get(list_downloads).post(start_download))
        .route("/api/downloads/{id}/cancel", post(cancel_download))
        .route("/api/downloads/{id}", delete(remove_download))
        .route("/api/shares", get(list_shares))
        .route("/api/shares/{id}", delete(delete_share))
        .route("/api/server", get(server_status))
        .route("/api/server/start", post(start_server))
        .route("/api/server/stop", post(stop_server))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

fn require_app_id(app_id: &str) -> Result<(), ApiFailure> {
    if is_valid_app_id(app_id) {
        Ok(())
    } else {
        Err(ApiFailure::bad_request(format!("Invalid app id: {app_id}")))
    }
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

async fn system_status(State(state): State<SharedState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        steamcmd_installed: state.steamcmd.launcher_path().exists(),
        steamcmd_dir: state.steamcmd.root().display().to_string(),
        games_dir: state.games_dir.display().to_string(),
        active_downloads: state.downloads.active_count().await,
        file_server: state.file_server.status().await,
    })
}

async fn install_steamcmd(State(state): State<SharedState>) -> Json<OperationResult> {
    if state.steamcmd.is_installed() {
        return Json(OperationResult::ok("SteamCMD already installed"));
    }
    match state.steamcmd.install().await {
        Ok(msg) => Json(OperationResult::ok(msg)),
        Err(e) => {
            tracing::error!("Installation failed: {e}");
            Json(OperationResult::failed(format!("Installation failed: {e}")))
        }
    }
}

// ---------------------------------------------------------------------------
// Games
// ---------------------------------------------------------------------------

async fn list_games(State(state): State<SharedState>) -> Json<Vec<InstalledGame>> {
    Json(list_installed_games(&state.games_dir, &state.steamcmd).await)
}

async fn game_info(
    State(state): State<SharedState>,
    Path(app_id): Path<String>,
) -> ApiResult<GameInfo> {
    require_app_id(&app_id)?;
    Ok(Json(state.steamcmd.get_game_info(&app_id).await))
}

async fn delete_game(
    State(state): State<SharedState>,
    Path(app_id): Path<String>,
) -> ApiResult<OperationResult> {
    require_app_id(&app_id)?;
    if cleanup_failed_download(&state.games_dir, &app_id) {
        Ok(Json(OperationResult::ok(format!("Deleted app {app_id}"))))
    } else {
        Err(ApiFailure::internal(format!("Failed to delete app {app_id}")))
    }
}

async fn share_game(
    State(state): State<SharedState>,
    Path(app_id): Path<String>,
) -> ApiResult<ShareView> {
    require_app_id(&app_id)?;
    let path = game_path(&state.games_dir, &app_id);
    if !path.is_dir() {
        return Err(ApiFailure::not_found(format!("Game {app_id} is not installed")));
    }

    let info = state.steamcmd.get_game_info(&app_id).await;
    let record = state
        .shares
        .create_share(&path, &info.name, &app_id)
        .await
        .inspect_err(|e| tracing::error!(app_id, "Failed to create share: {e}"))?;

    Ok(Json(share_view(&state, record)))
}

// ---------------------------------------------------------------------------
// Downloads
// ---------------------------------------------------------------------------

async fn list_downloads(State(state): State<SharedState>) -> Json<Vec<DownloadEntry>> {
    Json(state.downloads.snapshot().await)
}

async fn start_download(
    State(state): State<SharedState>,
    Json(req): Json<StartDownloadRequest>,
) -> ApiResult<StartDownloadResponse> {
    let app_id = req.app_id.trim().to_string();
    require_app_id(&app_id)?;

    let credentials = req.credentials();
    let info = state.steamcmd.get_game_info(&app_id).await;
    let install_dir = game_path(&state.games_dir, &app_id);

    let child = state
        .steamcmd
        .download_game(&app_id, &credentials, &install_dir)
        .await
        .inspect_err(|e| tracing::error!(app_id, "failed to start download: {e}"))?;

    let download_id = state.downloads.track(&app_id, &info.name, child).await;
    Ok(Json(StartDownloadResponse {
        download_id,
        message: format!("Download started for {}", info.name),
    }))
}

async fn cancel_download(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<OperationResult> {
    if state.downloads.get(&id).await.is_none() {
        return Err(ApiFailure::not_found(format!("Unknown download: {id}")));
    }
    if state.downloads.cancel(&id).await {
        Ok(Json(OperationResult::ok("Download cancelled")))
    } else {
        Err(ApiFailure::conflict("Download is not running"))
    }
}

async fn remove_download(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<OperationResult> {
    if state.downloads.get(&id).await.is_none() {
        return Err(ApiFailure::not_found(format!("Unknown download: {id}")));
    }
    if state.downloads.remove(&id).await {
        Ok(Json(OperationResult::ok("Download removed")))
    } else {
        Err(ApiFailure::conflict("Download is still running"))
    }
}

// ---------------------------------------------------------------------------
// Shares
// ---------------------------------------------------------------------------

fn share_view(state: &AppState, share: ShareRecord) -> ShareView {
    let url = generate_access_url(&share.id, &state.share_host, state.share_port);
    let created_at = DateTime::from_timestamp(share.created_at, 0)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    ShareView {
        share,
        url,
        created_at,
    }
}

async fn list_shares(State(state): State<SharedState>) -> Json<Vec<ShareView>> {
    let shares = state.shares.list_shares().await;
    Json(shares.into_iter().map(|s| share_view(&state, s)).collect())
}

async fn delete_share(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<OperationResult> {
    if state.shares.delete_share(&id).await {
        Ok(Json(OperationResult::ok(format!("Share {id} deleted"))))
    } else {
        Err(ApiFailure::not_found(format!("Share not found: {id}")))
    }
}

// ---------------------------------------------------------------------------
// File server
// ---------------------------------------------------------------------------

async fn server_status(State(state): State<SharedState>) -> Json<ServerStatus> {
    Json(state.file_server.status().await)
}

async fn start_server(State(state): State<SharedState>) -> ApiResult<ServerStatus> {
    if let Err(e) = state.shares.ensure_share_dir().await {
        tracing::warn!("cannot prepare shares directory: {e}");
    }
    state
        .file_server
        .start()
        .await
        .map(Json)
        .map_err(|e| ApiFailure::internal(e.to_string()))
}

async fn stop_server(State(state): State<SharedState>) -> Json<ServerStatus> {
    Json(state.file_server.stop().await)
}
