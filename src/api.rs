//! JSON HTTP surface over the note database.

use crate::auth::{register, CredentialVerifier, RegisterForm};
use crate::catalog::{owned_by, total_downloads, CatalogQuery, SortMode};
use crate::db::NoteDb;
use crate::error::{AuthError, Error, SessionError, StoreError, UploadError};
use crate::models::{Branch, Note, NoteRequest, Semester, User};
use crate::session::{ProfileChanges, Session};
use crate::storage::Storage;
use crate::summary::SummaryService;
use crate::upload::UploadForm;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub type DynDb = NoteDb<Box<dyn Storage>>;

type ApiResult<T> = Result<T, (StatusCode, String)>;

/// Database and session live behind one lock so each request is a single writer.
pub struct Workspace {
    pub db: DynDb,
    pub session: Session,
}

pub struct AppState {
    workspace: Mutex<Workspace>,
    summary: SummaryService,
    verifier: Box<dyn CredentialVerifier>,
    max_file_size: u64,
}

impl AppState {
    pub fn new(
        db: DynDb,
        session: Session,
        summary: SummaryService,
        verifier: Box<dyn CredentialVerifier>,
        max_file_size: u64,
    ) -> Self {
        Self {
            workspace: Mutex::new(Workspace { db, session }),
            summary,
            verifier,
            max_file_size,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: Option<User>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogParams {
    pub q: Option<String>,
    pub branch: Option<String>,
    pub semester: Option<String>,
    pub sort: Option<String>,
}

impl CatalogParams {
    /// Blank parameters mean "no filter".
    fn into_query(self) -> Result<CatalogQuery, String> {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        Ok(CatalogQuery {
            query: self.q.unwrap_or_default(),
            branch: present(self.branch).map(|b| b.parse::<Branch>()).transpose()?,
            semester: present(self.semester).map(|s| s.parse::<Semester>()).transpose()?,
            sort: present(self.sort)
                .map(|s| s.parse::<SortMode>())
                .transpose()?
                .unwrap_or(SortMode::Newest),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NoteListResponse {
    pub notes: Vec<Note>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub notes: Vec<Note>,
    pub total_downloads: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub highlights: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub subject: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestListResponse {
    pub requests: Vec<NoteRequest>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/register", post(register_user))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/session", get(current_session))
        .route("/api/notes", get(list_notes).post(upload_note))
        .route("/api/notes/mine", get(my_notes))
        .route("/api/notes/:id", delete(delete_note))
        .route("/api/notes/:id/download", post(download_note))
        .route("/api/notes/:id/summary", get(note_summary))
        .route("/api/requests", get(list_requests).post(create_request))
        .route("/api/profile", put(update_profile))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn reject<E: Into<Error>>(err: E) -> (StatusCode, String) {
    let err = err.into();
    let status = match &err {
        Error::Auth(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
        Error::Auth(AuthError::EmailTaken(_)) => StatusCode::CONFLICT,
        Error::Auth(AuthError::Invalid(_)) => StatusCode::BAD_REQUEST,
        Error::Auth(AuthError::Hash(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        Error::Upload(_) => StatusCode::BAD_REQUEST,
        Error::Session(SessionError::NotLoggedIn) => StatusCode::UNAUTHORIZED,
        Error::Session(SessionError::UnknownUser(_)) => StatusCode::NOT_FOUND,
        Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("request failed: {}", err);
    }
    (status, err.to_string())
}

fn not_found(id: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("Note not found: {}", id))
}

async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(form): Json<RegisterForm>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let ws = state.workspace.lock().await;
    let user = register(&ws.db, form, state.verifier.as_ref()).map_err(reject)?;
    Ok((StatusCode::CREATED, Json(user.without_password())))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<User>> {
    let mut ws = state.workspace.lock().await;
    let Workspace { db, session } = &mut *ws;

    session
        .login(&*db, &payload.email, &payload.password, state.verifier.as_ref())
        .map_err(reject)?
        .map(Json)
        .ok_or_else(|| reject(AuthError::InvalidCredentials))
}

async fn logout(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    let mut ws = state.workspace.lock().await;
    let Workspace { db, session } = &mut *ws;
    session.logout(&*db).map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn current_session(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    let ws = state.workspace.lock().await;
    Json(SessionResponse {
        user: ws.session.current().cloned(),
    })
}

async fn list_notes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CatalogParams>,
) -> ApiResult<Json<NoteListResponse>> {
    let query = params
        .into_query()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let ws = state.workspace.lock().await;
    let notes = ws.db.notes().map_err(reject)?;
    Ok(Json(NoteListResponse {
        notes: query.apply(&notes),
    }))
}

async fn upload_note(
    State(state): State<Arc<AppState>>,
    Json(form): Json<UploadForm>,
) -> ApiResult<(StatusCode, Json<Note>)> {
    let ws = state.workspace.lock().await;
    let uploader = ws.session.require().map_err(reject)?;

    let note = form
        .into_note(uploader, state.max_file_size)
        .map_err(reject::<UploadError>)?;
    ws.db.save_note(note.clone()).map_err(reject)?;

    tracing::info!(note_id = %note.id, uploader = %note.uploader_id, "note uploaded");
    Ok((StatusCode::CREATED, Json(note)))
}

async fn my_notes(State(state): State<Arc<AppState>>) -> ApiResult<Json<DashboardResponse>> {
    let ws = state.workspace.lock().await;
    let user = ws.session.require().map_err(reject)?;

    let notes = owned_by(&ws.db.notes().map_err(reject)?, &user.id);
    Ok(Json(DashboardResponse {
        total_downloads: total_downloads(&notes),
        notes,
    }))
}

async fn download_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Note>> {
    let ws = state.workspace.lock().await;
    if !ws.db.update_note_download(&id).map_err(reject)? {
        return Err(not_found(&id));
    }
    let note = ws
        .db
        .find_note(&id)
        .map_err(reject)?
        .ok_or_else(|| not_found(&id))?;
    Ok(Json(note))
}

async fn delete_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let ws = state.workspace.lock().await;
    let user = ws.session.require().map_err(reject)?;

    let note = ws
        .db
        .find_note(&id)
        .map_err(reject)?
        .ok_or_else(|| not_found(&id))?;
    if note.uploader_id != user.id {
        return Err((
            StatusCode::FORBIDDEN,
            "Only the uploader can delete this note".to_string(),
        ));
    }

    ws.db.delete_note(&id).map_err(reject)?;
    tracing::info!(note_id = %id, "note deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn note_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SummaryResponse>> {
    let note = {
        let ws = state.workspace.lock().await;
        ws.db
            .find_note(&id)
            .map_err(reject)?
            .ok_or_else(|| not_found(&id))?
    };

    let highlights = state
        .summary
        .request_summary(&note.title, &note.description, &note.subject)
        .await;
    Ok(Json(SummaryResponse { highlights }))
}

async fn list_requests(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<RequestListResponse>> {
    let ws = state.workspace.lock().await;
    let requests = ws.db.requests().map_err(reject)?;
    Ok(Json(RequestListResponse { requests }))
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateNoteRequest>,
) -> ApiResult<(StatusCode, Json<NoteRequest>)> {
    let subject = payload.subject.trim();
    if subject.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Subject cannot be empty".to_string(),
        ));
    }

    let request = NoteRequest::new(subject.to_string());
    let ws = state.workspace.lock().await;
    ws.db.add_request(request.clone()).map_err(reject::<StoreError>)?;
    tracing::info!(subject = %request.subject, "note request broadcast");
    Ok((StatusCode::CREATED, Json(request)))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Json(changes): Json<ProfileChanges>,
) -> ApiResult<Json<User>> {
    let mut ws = state.workspace.lock().await;
    let Workspace { db, session } = &mut *ws;
    let user = session.update_profile(&*db, changes).map_err(reject)?;
    Ok(Json(user))
}
