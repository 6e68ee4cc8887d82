#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use finance_dashboard::backend::{self, AppState};
use finance_dashboard::cli::api::Client;
use finance_dashboard::cli::session::{MemorySessionStorage, SessionStore};

pub async fn serve(app: Router) -> Client {
    let addr = backend::spawn("127.0.0.1:0".parse().unwrap(), app).await.unwrap();
    Client::new(format!("http://{addr}"), Duration::from_secs(5)).unwrap()
}

pub async fn sandbox() -> Client {
    serve(backend::router(AppState::default())).await
}

/// A fresh sandbox with `sam@example.com` registered and logged in.
pub async fn signed_in(api: Client) -> Arc<SessionStore> {
    let store = SessionStore::restore(api, Arc::new(MemorySessionStorage::default()))
        .await
        .unwrap();
    store.register("sam", "sam@example.com", "secret").await.unwrap();
    Arc::new(store)
}
