use axum::{
    routing::{get, post, put},
    Router,
};
use crate::backend::{handlers, AppState};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login/", post(handlers::login))
        .route("/api/auth/register/", post(handlers::register))
        .route("/api/budgets/", get(handlers::list_budgets).post(handlers::create_budget))
        .route("/api/budgets/:id/", put(handlers::update_budget).delete(handlers::delete_budget))
        .route("/api/transactions/", get(handlers::list_transactions).post(handlers::create_transaction))
        .route(
            "/api/transactions/:id/",
            put(handlers::update_transaction).delete(handlers::delete_transaction),
        )
        .merge(analytics_routes())
}

pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard/stats/", get(handlers::dashboard_stats))
        .route("/api/analytics/category-breakdown/", get(handlers::category_breakdown))
        .route("/api/analytics/monthly-trend/", get(handlers::monthly_trend))
        .route("/api/analytics/spending-pattern/", get(handlers::spending_pattern))
        .route("/api/ml/insights/", get(handlers::insights))
        .route("/api/ml/predictions/", get(handlers::predictions))
}
