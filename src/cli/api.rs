use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::database::models::User;
use crate::error::{AppError, AppResult};

/// Paginated list envelope: `{ "results": [...] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub user: User,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

/// The one HTTP client every page talks through. Cloning is cheap and all
/// clones share the bearer-token slot, so setting the token once attaches it
/// to every later request.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    bearer: Arc<RwLock<Option<String>>>,
}

impl Client {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            bearer: Arc::new(RwLock::new(None)),
        })
    }

    pub fn from_config(cfg: &Config) -> AppResult<Self> {
        Self::new(cfg.api_url.clone(), cfg.http_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_bearer(&self, token: &str) {
        *self.bearer.write().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
    }

    pub fn clear_bearer(&self) {
        *self.bearer.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn bearer(&self) -> Option<String> {
        self.bearer.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    // ============= Plumbing =============

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.http.request(method, format!("{}{}", self.base_url, path));
        match self.bearer() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> AppResult<reqwest::Response> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(AppError::from_status(status, &body))
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        tracing::debug!(path, "GET");
        let resp = self.send(self.request(Method::GET, path)).await?;
        Ok(resp.json().await?)
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> AppResult<T> {
        tracing::debug!(path, "POST");
        let resp = self.send(self.request(Method::POST, path).json(body)).await?;
        Ok(resp.json().await?)
    }

    /// Full replacement. The response body is ignored; callers refetch.
    pub async fn put(&self, path: &str, body: &(impl Serialize + ?Sized)) -> AppResult<()> {
        tracing::debug!(path, "PUT");
        self.send(self.request(Method::PUT, path).json(body)).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> AppResult<()> {
        tracing::debug!(path, "DELETE");
        self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    // ============= Auth =============

    /// Bad credentials come back as `AppError::Auth` whether the backend
    /// answers 400 or 401.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<LoginResponse> {
        let body = LoginBody { email, password };
        match self.post_json("/api/auth/login/", &body).await {
            Err(AppError::Api { status: 400, message }) => Err(AppError::Auth(message)),
            other => other,
        }
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> AppResult<()> {
        let body = RegisterBody { username, email, password };
        tracing::debug!(path = "/api/auth/register/", "POST");
        self.send(self.request(Method::POST, "/api/auth/register/").json(&body))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_slot_is_shared_between_clones() {
        let a = Client::new("http://localhost:3000/", Duration::from_secs(1)).unwrap();
        let b = a.clone();
        assert_eq!(a.base_url(), "http://localhost:3000");

        a.set_bearer("abc");
        assert_eq!(b.bearer().as_deref(), Some("abc"));
        b.clear_bearer();
        assert_eq!(a.bearer(), None);
    }
}
