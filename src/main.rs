use anyhow::{Context, Result};
use noteshare::api::{router, AppState};
use noteshare::auth::verifier_for;
use noteshare::db::NoteDb;
use noteshare::session::Session;
use noteshare::settings::Settings;
use noteshare::storage::{FileStorage, Storage};
use noteshare::summary::{GeminiClient, SummaryService};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    noteshare::init_tracing("info");

    let settings = Settings::new().context("Failed to load settings")?;

    let storage =
        FileStorage::new(&settings.storage.dir).context("Failed to initialize storage")?;
    tracing::info!("Storage directory: {}", storage.dir().display());
    let db = NoteDb::new(Box::new(storage) as Box<dyn Storage>);
    let session = Session::restore(&db).context("Failed to restore session")?;
    if let Some(user) = session.current() {
        tracing::info!("Restored session for {}", user.email);
    }

    let gemini = GeminiClient::new(
        settings.summary.api_key.clone(),
        settings.summary.model.clone(),
        settings.summary.base_url.clone(),
    );

    let app_state = Arc::new(AppState::new(
        db,
        session,
        SummaryService::new(Arc::new(gemini)),
        verifier_for(settings.auth.verify_passwords),
        settings.upload.max_file_size,
    ));

    let app = router(app_state);

    let addr = settings.server.addr().context("Invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("NoteShare running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("   POST   /api/register, /api/login, /api/logout");
    tracing::info!("   GET    /api/session");
    tracing::info!("   GET    /api/notes?q=&branch=&semester=&sort=newest|popular");
    tracing::info!("   POST   /api/notes            - Upload note metadata");
    tracing::info!("   GET    /api/notes/mine       - Your notes and download total");
    tracing::info!("   POST   /api/notes/:id/download");
    tracing::info!("   DELETE /api/notes/:id");
    tracing::info!("   GET    /api/notes/:id/summary");
    tracing::info!("   GET    /api/requests, POST /api/requests");
    tracing::info!("   PUT    /api/profile");

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
