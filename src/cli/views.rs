//! Dashboard and insights pages. The backend precomputes everything; this
//! module only fetches, falls back and formats.

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::cli::api::{Client, Page};
use crate::cli::fallback::{self, DataSource};
use crate::database::models::{
    CategorySlice, DashboardStats, Insight, PatternPoint, Prediction, SavingsGoal, Transaction, TrendPoint,
};

pub const STATS_PATH: &str = "/api/dashboard/stats/";
pub const RECENT_PATH: &str = "/api/transactions/?limit=5";
pub const CATEGORY_BREAKDOWN_PATH: &str = "/api/analytics/category-breakdown/";
pub const MONTHLY_TREND_PATH: &str = "/api/analytics/monthly-trend/";
pub const INSIGHTS_PATH: &str = "/api/ml/insights/";
pub const PREDICTIONS_PATH: &str = "/api/ml/predictions/";
pub const SPENDING_PATTERN_PATH: &str = "/api/analytics/spending-pattern/";

/// One independently fetched piece of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel<T> {
    pub data: T,
    pub source: DataSource,
}

impl<T> Panel<T> {
    fn live(data: T) -> Self {
        Self { data, source: DataSource::Live }
    }

    fn sample(data: T) -> Self {
        Self { data, source: DataSource::Sample }
    }

    pub fn is_live(&self) -> bool {
        self.source == DataSource::Live
    }
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub stats: Panel<DashboardStats>,
    pub recent: Panel<Vec<Transaction>>,
    pub categories: Panel<Vec<CategorySlice>>,
    pub trend: Panel<Vec<TrendPoint>>,
}

impl Dashboard {
    pub fn fully_live(&self) -> bool {
        self.stats.is_live() && self.recent.is_live() && self.categories.is_live() && self.trend.is_live()
    }
}

#[derive(Debug, Clone)]
pub struct Insights {
    pub insights: Panel<Vec<Insight>>,
    pub predictions: Panel<Vec<Prediction>>,
    pub pattern: Panel<Vec<PatternPoint>>,
    pub goal: SavingsGoal,
}

impl Insights {
    pub fn fully_live(&self) -> bool {
        self.insights.is_live() && self.predictions.is_live() && self.pattern.is_live()
    }
}

// Any failure on a read-only panel falls back to that panel's sample data.
async fn fetch_panel<T: DeserializeOwned>(api: &Client, path: &str, sample: fn() -> T) -> Panel<T> {
    match api.get_json::<T>(path).await {
        Ok(data) => Panel::live(data),
        Err(e) => {
            tracing::warn!(path, error = %e, "panel unavailable, using sample data");
            Panel::sample(sample())
        }
    }
}

#[derive(Clone)]
pub struct ViewComposer {
    api: Client,
}

impl ViewComposer {
    pub fn new(api: Client) -> Self {
        Self { api }
    }

    /// Fetch the dashboard batch concurrently. Returns `None` if `cancel`
    /// fires first, so a page that was left never receives stale data.
    pub async fn dashboard(&self, cancel: &CancellationToken) -> Option<Dashboard> {
        let api = &self.api;
        let batch = async {
            let (stats, recent, categories, trend) = tokio::join!(
                fetch_panel(api, STATS_PATH, fallback::dashboard_stats),
                fetch_panel::<Page<Transaction>>(api, RECENT_PATH, || Page {
                    results: fallback::recent_transactions(),
                }),
                fetch_panel(api, CATEGORY_BREAKDOWN_PATH, fallback::category_breakdown),
                fetch_panel(api, MONTHLY_TREND_PATH, fallback::monthly_trend),
            );
            Dashboard {
                stats,
                recent: Panel { data: recent.data.results, source: recent.source },
                categories,
                trend,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("dashboard load cancelled");
                None
            }
            dashboard = batch => Some(dashboard),
        }
    }

    pub async fn insights(&self, cancel: &CancellationToken) -> Option<Insights> {
        let api = &self.api;
        let batch = async {
            let (insights, predictions, pattern) = tokio::join!(
                fetch_panel(api, INSIGHTS_PATH, fallback::insights),
                fetch_panel(api, PREDICTIONS_PATH, fallback::predictions),
                fetch_panel(api, SPENDING_PATTERN_PATH, fallback::spending_pattern),
            );
            Insights {
                insights,
                predictions,
                pattern,
                goal: SavingsGoal::default(),
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("insights load cancelled");
                None
            }
            insights = batch => Some(insights),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn offline_client() -> Client {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        Client::new(format!("http://127.0.0.1:{port}"), Duration::from_millis(500)).unwrap()
    }

    #[tokio::test]
    async fn offline_dashboard_is_all_sample() {
        let views = ViewComposer::new(offline_client());
        let dash = views.dashboard(&CancellationToken::new()).await.unwrap();
        assert!(!dash.fully_live());
        assert_eq!(dash.stats.source, DataSource::Sample);
        assert_eq!(dash.recent.data.len(), 5);
        assert_eq!(dash.trend.data.len(), 6);
    }

    #[tokio::test]
    async fn cancelled_load_yields_nothing() {
        let views = ViewComposer::new(offline_client());
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(views.dashboard(&cancel).await.is_none());
        assert!(views.insights(&cancel).await.is_none());
    }

    #[tokio::test]
    async fn cancelling_mid_flight_abandons_the_load() {
        // Accepts connections and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((sock, _)) = listener.accept().await {
                held.push(sock);
            }
        });
        let api = Client::new(format!("http://{addr}"), Duration::from_secs(30)).unwrap();
        let views = ViewComposer::new(api);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let dash = tokio::time::timeout(Duration::from_secs(2), views.dashboard(&cancel))
            .await
            .expect("cancellation should end the load");
        assert!(dash.is_none());
    }

    #[tokio::test]
    async fn offline_insights_keep_default_goal() {
        let views = ViewComposer::new(offline_client());
        let page = views.insights(&CancellationToken::new()).await.unwrap();
        assert_eq!(page.goal.months_to_goal(), Some(15));
        assert_eq!(page.predictions.data.len(), 5);
        assert!(!page.pattern.is_live());
    }
}
