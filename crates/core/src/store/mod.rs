pub mod dashboard;
pub mod market_sync;
pub mod state;

pub use dashboard::{DashboardStore, StoreOptions};
pub use market_sync::MarketSync;
pub use state::{DashboardState, NewsRange, Selection};

/// Ticker used when nothing has been persisted yet.
pub const DEFAULT_SYMBOL: &str = "AAPL";

/// Default news lookback in days, counting back from today.
pub const DEFAULT_NEWS_LOOKBACK_DAYS: i64 = 5;
