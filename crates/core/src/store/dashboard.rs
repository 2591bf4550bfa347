use crate::config::Settings;
use crate::domain::feed::FeedMessage;
use crate::feed::LiveFeed;
use crate::http::MarketDataApi;
use crate::storage::{PreferenceStore, SYMBOL_KEY};
use crate::store::market_sync::{MarketSync, StatusSink};
use crate::store::state::{DashboardState, NewsRange, Selection};
use crate::store::{DEFAULT_NEWS_LOOKBACK_DAYS, DEFAULT_SYMBOL};
use crate::time::Clock;
use chrono::DateTime;
use chrono_tz::Tz;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub exchange: String,
    pub market_tz: Tz,
}

impl StoreOptions {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self {
            exchange: settings.exchange.clone(),
            market_tz: settings.market_tz()?,
        })
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            exchange: "US".to_string(),
            market_tz: chrono_tz::America::New_York,
        }
    }
}

/// State container for one dashboard session.
///
/// Observers call [`DashboardStore::subscribe`] for change notifications or
/// [`DashboardStore::snapshot`] for a copy of the current state.
pub struct DashboardStore {
    api: Arc<dyn MarketDataApi>,
    feed: Arc<dyn LiveFeed>,
    prefs: Arc<dyn PreferenceStore>,
    clock: Arc<dyn Clock>,
    market_sync: MarketSync,
    exchange: String,
    state: Arc<watch::Sender<DashboardState>>,
    // Bumped by every load; results from an older load are dropped.
    generation: AtomicU64,
    listening: AtomicBool,
}

impl DashboardStore {
    pub fn new(
        api: Arc<dyn MarketDataApi>,
        feed: Arc<dyn LiveFeed>,
        prefs: Arc<dyn PreferenceStore>,
        clock: Arc<dyn Clock>,
        options: StoreOptions,
    ) -> Self {
        let symbol = match prefs.get(SYMBOL_KEY) {
            Ok(Some(s)) if !s.trim().is_empty() => s,
            Ok(_) => DEFAULT_SYMBOL.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read saved symbol; using default");
                DEFAULT_SYMBOL.to_string()
            }
        };

        let today = clock.now().date_naive();
        let news_range = NewsRange::trailing(today, DEFAULT_NEWS_LOOKBACK_DAYS);

        let (tx, _) = watch::channel(DashboardState::new(symbol, news_range));
        let state = Arc::new(tx);

        let status_state = state.clone();
        let sink: StatusSink = Arc::new(move |status| {
            status_state.send_modify(|s| s.market_status = Some(status));
        });
        let market_sync = MarketSync::new(api.clone(), clock.clone(), options.market_tz, sink);

        Self {
            api,
            feed,
            prefs,
            clock,
            market_sync,
            exchange: options.exchange,
            state,
            generation: AtomicU64::new(0),
            listening: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    pub fn selection(&self) -> Selection {
        self.state.borrow().selection()
    }

    pub fn symbol(&self) -> String {
        self.state.borrow().symbol.clone()
    }

    pub fn market_sync(&self) -> &MarketSync {
        &self.market_sync
    }

    /// Reloads everything for the active symbol.
    ///
    /// The bundle, news and market-status requests run concurrently and each result is
    /// applied as it settles. Only a failed bundle sets `error`; news and status failures
    /// keep the previous values.
    pub async fn load_dashboard(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (symbol, range) = {
            let s = self.state.borrow();
            (s.symbol.clone(), s.news_range.bounds())
        };

        tracing::info!(%symbol, generation, "loading dashboard");
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });

        self.ensure_trade_listener();
        self.feed.connect(&symbol);
        self.feed.subscribe(&symbol);
        self.state.send_modify(|s| s.is_socket_connected = true);

        self.market_sync.start(&self.exchange);

        let bundle = async {
            match self.api.dashboard(&symbol).await {
                Ok(data) => {
                    self.apply(generation, |s| {
                        s.dashboard = Some(data);
                        s.dashboard_symbol = Some(symbol.clone());
                    });
                }
                Err(e) => {
                    let detail = format!("{e:#}");
                    tracing::error!(%symbol, error = %detail, "dashboard load failed");
                    let message = format!("Failed to load dashboard data: {detail}");
                    self.apply(generation, |s| s.error = Some(message));
                }
            }
        };

        let news = async {
            let result = match range {
                Some((from, to)) => self.api.company_news(&symbol, from, to).await,
                None => Ok(Vec::new()),
            };
            match result {
                Ok(items) => {
                    self.apply(generation, |s| s.company_news = items);
                }
                Err(e) => tracing::warn!(%symbol, error = %e, "company news load failed"),
            }
        };

        let status = async {
            match self.api.market_status(&self.exchange).await {
                Ok(status) => {
                    self.apply(generation, |s| s.market_status = Some(status));
                }
                Err(e) => {
                    tracing::warn!(exchange = %self.exchange, error = %e, "market status load failed")
                }
            }
        };

        tokio::join!(bundle, news, status);

        if self.apply(generation, |s| s.is_loading = false) {
            tracing::info!(%symbol, generation, "dashboard load settled");
        }
    }

    /// Switches the active symbol (uppercased), persists it and reloads. Blank input is ignored.
    pub async fn set_symbol(&self, symbol: &str) {
        if self.switch_symbol(symbol) {
            self.load_dashboard().await;
        }
    }

    /// Applies a symbol and news window together with a single reload.
    ///
    /// A blank or missing symbol keeps the active one; a missing range keeps the current window.
    pub async fn select(&self, symbol: Option<&str>, range: Option<NewsRange>) {
        if let Some(symbol) = symbol {
            self.switch_symbol(symbol);
        }
        if let Some(range) = range {
            self.state.send_modify(|s| s.news_range = range);
        }
        self.load_dashboard().await;
    }

    fn switch_symbol(&self, symbol: &str) -> bool {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return false;
        }

        let symbol = symbol.to_uppercase();
        self.state.send_modify(|s| s.symbol = symbol.clone());

        if let Err(e) = self.prefs.set(SYMBOL_KEY, &symbol) {
            tracing::warn!(%symbol, error = %e, "failed to persist symbol");
        }
        true
    }

    /// Replaces the news window and reloads.
    pub async fn set_date_range(
        &self,
        from: Option<chrono::NaiveDate>,
        to: Option<chrono::NaiveDate>,
    ) {
        self.state
            .send_modify(|s| s.news_range = NewsRange::new(from, to));
        self.load_dashboard().await;
    }

    /// Disconnects the live feed. The market schedule keeps running; see [`Self::shutdown`].
    pub fn cleanup(&self) {
        self.feed.disconnect();
        self.listening.store(false, Ordering::SeqCst);
        self.state.send_modify(|s| s.is_socket_connected = false);
    }

    /// Tears the session down: disconnects the feed and stops the market schedule.
    pub fn shutdown(&self) {
        self.cleanup();
        self.market_sync.stop();
    }

    fn apply(&self, generation: u64, f: impl FnOnce(&mut DashboardState)) -> bool {
        let current = &self.generation;
        self.state.send_if_modified(|s| {
            if current.load(Ordering::SeqCst) != generation {
                tracing::debug!(generation, "discarding stale dashboard result");
                return false;
            }
            f(s);
            true
        })
    }

    // Listeners are dropped by `LiveFeed::disconnect`, so this re-registers after cleanup.
    fn ensure_trade_listener(&self) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let state = self.state.clone();
        let clock = self.clock.clone();
        self.feed.on_message(Arc::new(move |msg: &FeedMessage| {
            apply_trade(&state, clock.as_ref(), msg);
        }));
    }
}

// Ticks land only on a dashboard loaded for the active symbol. After a symbol switch the
// old bundle stays on screen until the new one arrives and must not take the new price.
fn apply_trade(state: &watch::Sender<DashboardState>, clock: &dyn Clock, msg: &FeedMessage) {
    state.send_if_modified(|s| {
        if s.current_dashboard().is_none() {
            return false;
        }
        let Some(trade) = msg.latest_trade_for(&s.symbol) else {
            return false;
        };
        let Some(dashboard) = s.dashboard.as_mut() else {
            return false;
        };

        dashboard.quote.current_price = trade.price;
        s.last_trade_at = Some(
            trade
                .timestamp_ms
                .and_then(DateTime::from_timestamp_millis)
                .unwrap_or_else(|| clock.now()),
        );
        true
    });
}
