use chrono::NaiveDate;
use cofin_core::config::Settings;
use cofin_core::feed::{FeedOptions, WebSocketFeed};
use cofin_core::http::HttpBackendClient;
use cofin_core::storage::FilePreferenceStore;
use cofin_core::store::{DashboardState, DashboardStore, NewsRange, StoreOptions};
use cofin_core::time::SystemClock;
use std::sync::Arc;

/// The parts of the state worth a log line when they change.
#[derive(Debug, Clone, PartialEq)]
struct Summary {
    symbol: String,
    price: Option<f64>,
    percent_change: Option<f64>,
    market_open: Option<bool>,
    news: usize,
    loading: bool,
    connected: bool,
    error: Option<String>,
}

impl Summary {
    fn of(state: &DashboardState) -> Self {
        Self {
            symbol: state.symbol.clone(),
            price: state.dashboard.as_ref().map(|d| d.quote.current_price),
            percent_change: state.dashboard.as_ref().map(|d| d.quote.percent_change),
            market_open: state.market_status.as_ref().map(|m| m.is_open),
            news: state.company_news.len(),
            loading: state.is_loading,
            connected: state.is_socket_connected,
            error: state.error.clone(),
        }
    }
}

pub async fn run(
    settings: &Settings,
    symbol: Option<String>,
    range: Option<(NaiveDate, NaiveDate)>,
) -> anyhow::Result<()> {
    let api = Arc::new(HttpBackendClient::from_settings(settings)?);
    let feed = Arc::new(WebSocketFeed::new(
        settings.feed_url()?,
        FeedOptions::from_settings(settings),
    ));
    let prefs = Arc::new(FilePreferenceStore::new(settings.state_path.clone()));

    let store = Arc::new(DashboardStore::new(
        api,
        feed,
        prefs,
        Arc::new(SystemClock),
        StoreOptions::from_settings(settings)?,
    ));

    let mut rx = store.subscribe();
    let render = tokio::spawn(async move {
        let mut last: Option<Summary> = None;
        while rx.changed().await.is_ok() {
            let summary = Summary::of(&rx.borrow_and_update());
            if last.as_ref() == Some(&summary) {
                continue;
            }
            report(&summary, last.as_ref());
            last = Some(summary);
        }
    });

    tracing::info!(
        symbol = %store.symbol(),
        exchange = %settings.exchange,
        "starting dashboard session"
    );

    let session = {
        let store = store.clone();
        async move {
            let range = range.map(|(from, to)| NewsRange::new(Some(from), Some(to)));
            store.select(symbol.as_deref(), range).await;
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = session => {}
        res = tokio::signal::ctrl_c() => {
            res?;
            tracing::info!("interrupt received; shutting down");
        }
    }

    store.shutdown();
    render.abort();
    Ok(())
}

fn report(summary: &Summary, last: Option<&Summary>) {
    if let Some(error) = &summary.error {
        if last.and_then(|l| l.error.as_ref()) != Some(error) {
            sentry::capture_message(error, sentry::Level::Warning);
            tracing::warn!(symbol = %summary.symbol, %error, "dashboard error");
        }
    }

    tracing::info!(
        symbol = %summary.symbol,
        price = ?summary.price,
        percent_change = ?summary.percent_change,
        market_open = ?summary.market_open,
        news = summary.news,
        loading = summary.loading,
        connected = summary.connected,
        "dashboard"
    );
}
