//! Session lifecycle: `Anonymous --login/register--> Authenticated --logout--> Anonymous`.
//!
//! The store is built once at startup from persisted storage and handed to
//! everything that makes authenticated calls. Code running inside
//! [`SessionStore::scope`] can also reach it through [`current`].

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use sqlx::{Pool, Sqlite};

use crate::cli::api::Client;
use crate::database::db::queries;
use crate::database::models::{Session, User};
use crate::error::AppResult;

#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn load(&self) -> AppResult<Option<Session>>;
    async fn save(&self, session: &Session) -> AppResult<()>;
    async fn clear(&self) -> AppResult<()>;
}

/// Persists the session in the `session_store` table under `token` / `user`.
#[derive(Clone)]
pub struct SqliteSessionStorage {
    pool: Pool<Sqlite>,
}

impl SqliteSessionStorage {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStorage for SqliteSessionStorage {
    async fn load(&self) -> AppResult<Option<Session>> {
        let token = queries::get_value(&self.pool, queries::TOKEN_KEY).await?;
        let user = queries::get_value(&self.pool, queries::USER_KEY).await?;

        match (token, user) {
            (Some(token), Some(user_json)) => match serde_json::from_str::<User>(&user_json) {
                Ok(user) => Ok(Some(Session { token, user })),
                Err(e) => {
                    tracing::warn!(error = %e, "discarding persisted session with unreadable user");
                    queries::clear_session(&self.pool).await?;
                    Ok(None)
                }
            },
            (None, None) => Ok(None),
            _ => {
                tracing::warn!("discarding half-written persisted session");
                queries::clear_session(&self.pool).await?;
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &Session) -> AppResult<()> {
        let user_json = serde_json::to_string(&session.user)?;
        queries::put_session(&self.pool, &session.token, &user_json).await?;
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        queries::clear_session(&self.pool).await?;
        Ok(())
    }
}

/// Non-persistent storage, for tests and throwaway runs.
#[derive(Default)]
pub struct MemorySessionStorage {
    slot: Mutex<Option<Session>>,
}

impl MemorySessionStorage {
    pub fn with(session: Session) -> Self {
        Self { slot: Mutex::new(Some(session)) }
    }

    pub fn stored(&self) -> Option<Session> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn load(&self) -> AppResult<Option<Session>> {
        Ok(self.stored())
    }

    async fn save(&self, session: &Session) -> AppResult<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

tokio::task_local! {
    static CURRENT: Arc<SessionStore>;
}

pub struct SessionStore {
    api: Client,
    storage: Arc<dyn SessionStorage>,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    /// Start anonymous, or authenticated if storage holds a session. The
    /// token is not validated here; an expired one surfaces on the next call.
    pub async fn restore(api: Client, storage: Arc<dyn SessionStorage>) -> AppResult<Self> {
        let current = storage.load().await?;
        match &current {
            Some(session) => {
                api.set_bearer(&session.token);
                tracing::info!(user = %session.user.email, "restored persisted session");
            }
            None => api.clear_bearer(),
        }
        Ok(Self {
            api,
            storage,
            current: RwLock::new(current),
        })
    }

    pub fn api(&self) -> &Client {
        &self.api
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    pub fn user(&self) -> Option<User> {
        self.read().as_ref().map(|s| s.user.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.token.clone())
    }

    pub fn session(&self) -> Option<Session> {
        self.read().clone()
    }

    /// On failure the store is left exactly as it was and the backend error
    /// is returned for the form to show.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<Session> {
        let resp = self.api.login(email, password).await.map_err(|e| {
            tracing::warn!(%email, error = %e, "login failed");
            e
        })?;

        let session = Session { token: resp.access, user: resp.user };
        self.storage.save(&session).await?;
        self.api.set_bearer(&session.token);
        *self.write() = Some(session.clone());

        tracing::info!(user = %session.user.email, "logged in");
        Ok(session)
    }

    /// Creates the account, then logs in with the same credentials. A failed
    /// login after a successful registration does not undo the account.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> AppResult<Session> {
        self.api.register(username, email, password).await.map_err(|e| {
            tracing::warn!(%email, error = %e, "registration failed");
            e
        })?;
        tracing::info!(%email, "registered");
        self.login(email, password).await
    }

    /// Never fails and is idempotent. Memory and the request header are
    /// cleared first; a storage error is only logged.
    pub async fn logout(&self) {
        let previous = self.write().take();
        self.api.clear_bearer();

        if let Err(e) = self.storage.clear().await {
            tracing::warn!(error = %e, "could not clear persisted session");
        }
        if let Some(session) = previous {
            tracing::info!(user = %session.user.email, "logged out");
        }
    }

    /// Run `fut` with this store reachable through [`current`].
    pub async fn scope<F: Future>(self: Arc<Self>, fut: F) -> F::Output {
        CURRENT.scope(self, fut).await
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The store of the enclosing [`SessionStore::scope`].
///
/// # Panics
/// Outside a scope. That is a wiring bug, not a runtime condition.
pub fn current() -> Arc<SessionStore> {
    try_current().unwrap_or_else(|| panic!("session::current() called outside SessionStore::scope"))
}

pub fn try_current() -> Option<Arc<SessionStore>> {
    CURRENT.try_with(Arc::clone).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    // Points at a port that was just released, so any request is refused.
    fn client() -> Client {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        Client::new(format!("http://127.0.0.1:{port}"), Duration::from_millis(500)).unwrap()
    }

    fn alice() -> Session {
        Session {
            token: "tok-alice".into(),
            user: User { id: 7, email: "alice@example.com".into(), username: "alice".into() },
        }
    }

    #[tokio::test]
    async fn restore_from_storage_authenticates_and_attaches_token() {
        let api = client();
        let store = SessionStore::restore(api.clone(), Arc::new(MemorySessionStorage::with(alice())))
            .await
            .unwrap();

        assert!(store.is_authenticated());
        assert_eq!(store.user().unwrap().username, "alice");
        assert_eq!(api.bearer().as_deref(), Some("tok-alice"));
    }

    #[tokio::test]
    async fn authenticated_iff_token_and_user_present() {
        let store = SessionStore::restore(client(), Arc::new(MemorySessionStorage::default()))
            .await
            .unwrap();
        assert!(!store.is_authenticated());
        assert_eq!(store.token(), None);
        assert_eq!(store.user(), None);
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let storage = Arc::new(MemorySessionStorage::with(alice()));
        let api = client();
        let store = SessionStore::restore(api.clone(), storage.clone()).await.unwrap();

        store.logout().await;
        let after_first = (store.is_authenticated(), store.token(), store.user(), api.bearer(), storage.stored());
        store.logout().await;
        let after_second = (store.is_authenticated(), store.token(), store.user(), api.bearer(), storage.stored());

        assert_eq!(after_first, (false, None, None, None, None));
        assert_eq!(after_first, after_second);
    }

    #[tokio::test]
    async fn failed_login_leaves_state_untouched() {
        let store = SessionStore::restore(client(), Arc::new(MemorySessionStorage::default()))
            .await
            .unwrap();
        let err = store.login("alice@example.com", "pw").await.unwrap_err();
        assert!(err.is_transport());
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn current_is_available_inside_scope() {
        let store = Arc::new(
            SessionStore::restore(client(), Arc::new(MemorySessionStorage::with(alice())))
                .await
                .unwrap(),
        );
        let email = store
            .clone()
            .scope(async { current().user().map(|u| u.email) })
            .await;
        assert_eq!(email.as_deref(), Some("alice@example.com"));
        assert!(try_current().is_none());
    }

    #[tokio::test]
    #[should_panic(expected = "outside SessionStore::scope")]
    async fn current_outside_scope_fails_fast() {
        let _ = current();
    }

    #[tokio::test]
    async fn sqlite_storage_discards_half_written_session() {
        use crate::database::db::{connection, migrate};

        let pool = connection::get_memory_pool().await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        let storage = SqliteSessionStorage::new(pool.clone());

        storage.save(&alice()).await.unwrap();
        assert_eq!(storage.load().await.unwrap(), Some(alice()));

        sqlx::query("DELETE FROM session_store WHERE key = 'user'")
            .execute(&pool)
            .await
            .unwrap();
        assert_eq!(storage.load().await.unwrap(), None);
        assert_eq!(queries::get_value(&pool, queries::TOKEN_KEY).await.unwrap(), None);
    }
}
