use crate::domain::dashboard::{CompanyNews, DashboardData};
use crate::domain::market::MarketStatus;
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// News lookback window. Requests are only made when both ends are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NewsRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl NewsRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// `lookback_days` before `today` through `today`.
    pub fn trailing(today: NaiveDate, lookback_days: i64) -> Self {
        Self {
            from: Some(today - Duration::days(lookback_days)),
            to: Some(today),
        }
    }

    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.from?, self.to?))
    }
}

/// Everything a view needs to render the dashboard for the active symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    pub symbol: String,
    pub news_range: NewsRange,
    pub dashboard: Option<DashboardData>,
    /// Symbol `dashboard` was loaded for. Lags `symbol` until the next bundle lands.
    pub dashboard_symbol: Option<String>,
    pub company_news: Vec<CompanyNews>,
    pub market_status: Option<MarketStatus>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub is_socket_connected: bool,
    /// Time of the last live trade applied to the quote.
    pub last_trade_at: Option<DateTime<Utc>>,
}

impl DashboardState {
    pub fn new(symbol: String, news_range: NewsRange) -> Self {
        Self {
            symbol,
            news_range,
            dashboard: None,
            dashboard_symbol: None,
            company_news: Vec::new(),
            market_status: None,
            is_loading: false,
            error: None,
            is_socket_connected: false,
            last_trade_at: None,
        }
    }

    /// The loaded dashboard, if it belongs to the active symbol.
    pub fn current_dashboard(&self) -> Option<&DashboardData> {
        self.dashboard
            .as_ref()
            .filter(|_| self.dashboard_symbol.as_deref() == Some(self.symbol.as_str()))
    }

    pub fn selection(&self) -> Selection {
        Selection {
            symbol: self.symbol.clone(),
            news_range: self.news_range,
        }
    }
}

/// The user's current choice of symbol and news window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub symbol: String,
    pub news_range: NewsRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_range_ends_today() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 6).unwrap();
        let range = NewsRange::trailing(today, 5);
        assert_eq!(
            range.bounds(),
            Some((NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), today))
        );
    }

    #[test]
    fn open_ended_range_has_no_bounds() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 6).unwrap();
        assert_eq!(NewsRange::new(Some(today), None).bounds(), None);
        assert_eq!(NewsRange::default().bounds(), None);
    }
}
