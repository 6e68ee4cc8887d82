mod common;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use finance_dashboard::backend::{self, AppState};
use finance_dashboard::cli::fallback::DataSource;
use finance_dashboard::cli::resources::TransactionController;
use finance_dashboard::cli::views::ViewComposer;
use finance_dashboard::database::models::{TransactionDraft, TxnKind};

fn draft(amount: i64, kind: TxnKind, category: &str, day: u32) -> TransactionDraft {
    TransactionDraft {
        amount: Decimal::from(amount),
        category: category.into(),
        kind,
        date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
        description: format!("{category} {day}"),
    }
}

#[tokio::test]
async fn dashboard_is_live_against_the_full_api() {
    let session = common::signed_in(common::sandbox().await).await;
    let mut txns = TransactionController::new(session.api().clone());
    txns.create(draft(3000, TxnKind::Income, "Salary", 1)).await.unwrap();
    for day in 2..=7 {
        txns.create(draft(50, TxnKind::Expense, "Groceries", day)).await.unwrap();
    }

    let views = ViewComposer::new(session.api().clone());
    let dash = views.dashboard(&CancellationToken::new()).await.unwrap();
    assert!(dash.fully_live());
    assert_eq!(dash.stats.data.total_income, Decimal::from(3000));
    assert_eq!(dash.stats.data.balance, Decimal::from(2700));
    assert_eq!(dash.recent.data.len(), 5);
    assert_eq!(dash.recent.data[0].description, "Groceries 7");
    assert_eq!(dash.categories.data[0].name, "Groceries");

    let page = views.insights(&CancellationToken::new()).await.unwrap();
    assert!(page.fully_live());
    assert_eq!(page.pattern.data.len(), 7);
    assert_eq!(page.predictions.data[0].category, "Groceries");
}

#[tokio::test]
async fn missing_endpoints_fall_back_one_panel_at_a_time() {
    let api = common::serve(backend::router_without_analytics(AppState::default())).await;
    let session = common::signed_in(api).await;

    let views = ViewComposer::new(session.api().clone());
    let dash = views.dashboard(&CancellationToken::new()).await.unwrap();

    assert_eq!(dash.stats.source, DataSource::Live);
    assert_eq!(dash.recent.source, DataSource::Live);
    assert!(dash.recent.data.is_empty());
    assert_eq!(dash.categories.source, DataSource::Sample);
    assert_eq!(dash.trend.source, DataSource::Sample);
    assert!(!dash.fully_live());
}

#[tokio::test]
async fn expired_token_falls_back_for_views() {
    let session = common::signed_in(common::sandbox().await).await;
    session.api().set_bearer("not-a-real-token");

    let views = ViewComposer::new(session.api().clone());
    let page = views.insights(&CancellationToken::new()).await.unwrap();
    assert_eq!(page.insights.source, DataSource::Sample);
    assert_eq!(page.insights.data.len(), 4);
    assert_eq!(page.goal.months_to_goal(), Some(15));
}
