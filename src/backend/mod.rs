//! Sandbox API: an in-memory axum server speaking the same HTTP contract as
//! the real backend. Used by `server` mode and by the integration tests.

mod handlers;
mod routes;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

pub use store::Store;

#[derive(Clone, Default)]
pub struct AppState {
    pub store: Arc<RwLock<Store>>,
}

/// Full API plus `/health`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "Backend is running" }))
        .merge(routes::api_routes())
        .with_state(state)
}

/// Auth and CRUD routes without the dashboard and insights endpoints.
/// Lets a caller observe per-panel fallback against a live server.
pub fn router_without_analytics(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/login/", axum::routing::post(handlers::login))
        .route("/api/auth/register/", axum::routing::post(handlers::register))
        .route("/api/transactions/", get(handlers::list_transactions))
        .route("/api/dashboard/stats/", get(handlers::dashboard_stats))
        .with_state(state)
}

pub async fn run_server(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(AppState::default())).await?;
    Ok(())
}

/// Bind `addr` (port 0 picks a free one), serve `app` on a background task
/// and return the bound address.
pub async fn spawn(addr: SocketAddr, app: Router) -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "sandbox server stopped");
        }
    });
    tracing::debug!(%local, "sandbox server spawned");
    Ok(local)
}
