/// Crate-wide error type. Library code returns `AppResult<T>`; the binary and
/// the terminal glue wrap it in `anyhow`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The request never produced an HTTP response (refused, timed out, DNS).
    #[error("Network error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// True when the backend could not be reached at all. Reads fall back to
    /// sample data only in this case.
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::Transport(_))
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = extract_detail(body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        if status == reqwest::StatusCode::UNAUTHORIZED {
            AppError::Auth(message)
        } else {
            AppError::Api { status: status.as_u16(), message }
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AppError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            AppError::Api { status: status.as_u16(), message: e.to_string() }
        } else {
            AppError::Transport(e)
        }
    }
}

// REST backends answer `{"detail": "..."}` on most errors.
fn extract_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => map
            .get("detail")
            .or_else(|| map.get("error"))
            .and_then(|v| v.as_str())
            .map(str::to_string),
        _ => Some(trimmed.to_string()),
    }
}
