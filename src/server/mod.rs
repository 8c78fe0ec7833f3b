//! # HTTP Service
//!
//! JSON API over the engine and the template store.
//!
//! ## Usage
//!
//! ```bash
//! folio serve --listen 0.0.0.0:8080 --seed-dir templates/
//! ```
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /api/render` | Final output via the rasterizer; 422 when required fields are missing |
//! | `POST /api/preview` | Laid-out pages with diagnostics |
//! | `POST /api/contract/evaluate` | Mapped data and per-field diagnostics |
//! | `POST /api/validate` | Template validation issues |
//! | `GET/POST /api/templates` | List / create stored templates |
//! | `GET/PATCH /api/templates/:id` | Read / update metadata |
//! | `GET/POST /api/templates/:id/versions` | List / add versions |
//! | `GET /api/templates/:id/audit?limit=` | Audit trail |

mod handlers;
mod state;

pub use state::{AppState, ServerConfig};

use axum::{
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::FolioError;
use crate::store::{NewTemplate, TemplateStore};

/// Build the router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Engine API
        .route("/api/render", post(handlers::render::render))
        .route("/api/preview", post(handlers::render::preview))
        .route("/api/contract/evaluate", post(handlers::render::evaluate_contract))
        .route("/api/validate", post(handlers::render::validate))
        // Template store API
        .route(
            "/api/templates",
            get(handlers::templates::list).post(handlers::templates::create),
        )
        .route(
            "/api/templates/:id",
            get(handlers::templates::get).patch(handlers::templates::update),
        )
        .route(
            "/api/templates/:id/versions",
            get(handlers::templates::versions).post(handlers::templates::create_version),
        )
        .route("/api/templates/:id/audit", get(handlers::templates::audit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Load every `*.json` template in `dir` into the store. Returns the number
/// of templates created.
pub async fn seed_store(store: &dyn TemplateStore, dir: &Path) -> Result<usize, FolioError> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut created = 0;
    for path in paths {
        let content: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        let name = content
            .get("name")
            .and_then(|n| n.as_str())
            .filter(|n| !n.trim().is_empty())
            .map(str::to_string)
            .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_default();
        store
            .create(NewTemplate {
                name,
                content,
                ..Default::default()
            })
            .await?;
        created += 1;
    }
    Ok(created)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use folio::server::{serve, ServerConfig};
///
/// # async fn example() -> Result<(), folio::error::FolioError> {
/// let config = ServerConfig {
///     listen_addr: "0.0.0.0:8080".to_string(),
///     seed_dir: None,
/// };
///
/// serve(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig) -> Result<(), FolioError> {
    let app_state = Arc::new(AppState::new(config));
    app_state.seed().await?;

    let addr = app_state.config.listen_addr.clone();
    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        FolioError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to bind to {}: {}", addr, e),
        ))
    })?;

    tracing::info!(%addr, "folio HTTP server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
