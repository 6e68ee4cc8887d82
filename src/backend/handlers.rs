// src/backend/handlers.rs
use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::backend::AppState;
use crate::database::models::{
    Budget, BudgetDraft, CategorySlice, DashboardStats, Insight, PatternPoint, Prediction, Transaction,
    TransactionDraft, TrendPoint, User,
};
use crate::error::AppError;

type ApiResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let detail = match self {
            AppError::Auth(m) | AppError::Validation(m) => m,
            AppError::NotFound(what) => format!("{what} not found"),
            other => {
                tracing::error!(error = %other, "request failed");
                "Internal server error".to_string()
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Owner id resolved from `Authorization: Bearer <token>`.
pub struct AuthUser(pub i64);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Auth("Authentication credentials were not provided.".into()))?;

        state
            .store
            .read()
            .await
            .user_for_token(token.trim())
            .map(AuthUser)
            .ok_or_else(|| AppError::Auth("Given token not valid for any token type".into()))
    }
}

#[derive(Serialize)]
pub struct Page<T> {
    pub results: Vec<T>,
}

impl<T> From<Vec<T>> for Page<T> {
    fn from(results: Vec<T>) -> Self {
        Self { results }
    }
}

// ============= Auth =============

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginReply {
    pub access: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub async fn login(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> ApiResult<Json<LoginReply>> {
    let (access, user) = state.store.write().await.login(&body.email, &body.password)?;
    tracing::info!(user = %user.email, "login");
    Ok(Json(LoginReply { access, user }))
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state
        .store
        .write()
        .await
        .register(&body.username, &body.email, &body.password)?;
    tracing::info!(user = %user.email, "registered");
    Ok((StatusCode::CREATED, Json(user)))
}

// ============= Budgets =============

pub async fn list_budgets(State(state): State<AppState>, AuthUser(me): AuthUser) -> Json<Page<Budget>> {
    Json(state.store.read().await.budgets(me).into())
}

pub async fn create_budget(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Json(draft): Json<BudgetDraft>,
) -> ApiResult<(StatusCode, Json<Budget>)> {
    let budget = state.store.write().await.create_budget(me, &draft)?;
    tracing::debug!(id = budget.id, category = %budget.category, "budget created");
    Ok((StatusCode::CREATED, Json(budget)))
}

pub async fn update_budget(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Path(id): Path<i64>,
    Json(draft): Json<BudgetDraft>,
) -> ApiResult<Json<Budget>> {
    Ok(Json(state.store.write().await.update_budget(me, id, &draft)?))
}

pub async fn delete_budget(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.store.write().await.delete_budget(me, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============= Transactions =============

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Query(params): Query<ListParams>,
) -> Json<Page<Transaction>> {
    Json(state.store.read().await.transactions(me, params.limit).into())
}

pub async fn create_transaction(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Json(draft): Json<TransactionDraft>,
) -> ApiResult<(StatusCode, Json<Transaction>)> {
    let txn = state.store.write().await.create_transaction(me, &draft)?;
    tracing::debug!(id = txn.id, category = %txn.category, "transaction created");
    Ok((StatusCode::CREATED, Json(txn)))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Path(id): Path<i64>,
    Json(draft): Json<TransactionDraft>,
) -> ApiResult<Json<Transaction>> {
    Ok(Json(state.store.write().await.update_transaction(me, id, &draft)?))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.store.write().await.delete_transaction(me, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============= Analytics =============

pub async fn dashboard_stats(State(state): State<AppState>, AuthUser(me): AuthUser) -> Json<DashboardStats> {
    Json(state.store.read().await.stats(me))
}

pub async fn category_breakdown(State(state): State<AppState>, AuthUser(me): AuthUser) -> Json<Vec<CategorySlice>> {
    Json(state.store.read().await.category_breakdown(me))
}

pub async fn monthly_trend(State(state): State<AppState>, AuthUser(me): AuthUser) -> Json<Vec<TrendPoint>> {
    Json(state.store.read().await.monthly_trend(me))
}

pub async fn spending_pattern(State(state): State<AppState>, AuthUser(me): AuthUser) -> Json<Vec<PatternPoint>> {
    Json(state.store.read().await.spending_pattern(me))
}

pub async fn insights(State(state): State<AppState>, AuthUser(me): AuthUser) -> Json<Vec<Insight>> {
    Json(state.store.read().await.insights(me))
}

pub async fn predictions(State(state): State<AppState>, AuthUser(me): AuthUser) -> Json<Vec<Prediction>> {
    Json(state.store.read().await.predictions(me))
}
