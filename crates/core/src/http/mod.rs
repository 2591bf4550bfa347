pub mod client;
pub mod error;

use crate::domain::dashboard::{
    BasicFinancials, CompanyNews, DashboardData, EarningsSurprise, InsiderTransaction,
    RecommendationTrend,
};
use crate::domain::market::MarketStatus;
use crate::domain::quote::StockQuote;
use anyhow::Result;
use chrono::NaiveDate;

pub use client::HttpBackendClient;
pub use error::BackendError;

/// REST surface of the dashboard backend.
#[async_trait::async_trait]
pub trait MarketDataApi: Send + Sync {
    async fn quote(&self, symbol: &str) -> Result<StockQuote>;

    async fn dashboard(&self, symbol: &str) -> Result<DashboardData>;

    async fn company_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CompanyNews>>;

    async fn market_status(&self, exchange: &str) -> Result<MarketStatus>;

    async fn financials(&self, symbol: &str) -> Result<BasicFinancials>;

    async fn earnings(&self, symbol: &str) -> Result<Vec<EarningsSurprise>>;

    async fn recommendations(&self, symbol: &str) -> Result<Vec<RecommendationTrend>>;

    async fn insider_transactions(&self, symbol: &str) -> Result<Vec<InsiderTransaction>>;
}
