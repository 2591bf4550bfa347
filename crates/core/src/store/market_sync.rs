use crate::domain::market::MarketStatus;
use crate::http::MarketDataApi;
use crate::time::us_market::{delay_until_next_tick, is_market_open, market_local};
use crate::time::Clock;
use chrono_tz::Tz;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

// Floor for a single wait, so a boundary computed a hair in the past never spins.
const MIN_DELAY: Duration = Duration::from_secs(1);

pub type StatusSink = Arc<dyn Fn(MarketStatus) + Send + Sync>;

/// Refreshes market status on `:30` boundaries during the regular session.
///
/// Each wake computes the next boundary from the clock instead of using a fixed interval,
/// so polls stay aligned to the half hour. At most one schedule runs per instance.
pub struct MarketSync {
    api: Arc<dyn MarketDataApi>,
    clock: Arc<dyn Clock>,
    tz: Tz,
    sink: StatusSink,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MarketSync {
    pub fn new(
        api: Arc<dyn MarketDataApi>,
        clock: Arc<dyn Clock>,
        tz: Tz,
        sink: StatusSink,
    ) -> Self {
        Self {
            api,
            clock,
            tz,
            sink,
            task: Mutex::new(None),
        }
    }

    /// Cancels any running schedule, then checks immediately and keeps re-arming itself.
    pub fn start(&self, exchange: &str) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = task.take() {
            handle.abort();
        }

        tracing::debug!(exchange, tz = %self.tz, "market sync started");
        *task = Some(tokio::spawn(run(
            self.api.clone(),
            self.clock.clone(),
            self.tz,
            self.sink.clone(),
            exchange.to_string(),
        )));
    }

    pub fn stop(&self) {
        let handle = self
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
            tracing::debug!("market sync stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for MarketSync {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(
    api: Arc<dyn MarketDataApi>,
    clock: Arc<dyn Clock>,
    tz: Tz,
    sink: StatusSink,
    exchange: String,
) {
    loop {
        let now = clock.now();
        if is_market_open(market_local(now, tz)) {
            match api.market_status(&exchange).await {
                Ok(status) => {
                    tracing::debug!(exchange = %exchange, is_open = status.is_open, "market status refreshed");
                    sink(status);
                }
                Err(e) => {
                    tracing::warn!(exchange = %exchange, error = %e, "market status refresh failed");
                }
            }
        }

        let delay = delay_until_next_tick(clock.now(), tz).max(MIN_DELAY);
        tracing::debug!(exchange = %exchange, ?delay, "next market tick scheduled");
        tokio::time::sleep(delay).await;
    }
}
