use crate::config::Settings;
use crate::domain::dashboard::{
    BasicFinancials, CompanyNews, DashboardData, EarningsSurprise, InsiderTransaction,
    RecommendationTrend,
};
use crate::domain::market::MarketStatus;
use crate::domain::quote::StockQuote;
use crate::http::error::BackendError;
use crate::http::MarketDataApi;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::time::Duration;

const API_PREFIX: &str = "/api";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct HttpBackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build backend http client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.require_backend_url()?, settings.backend_timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}/{}", self.base_url, API_PREFIX, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let res = self
            .http
            .get(self.url(endpoint))
            .query(query)
            .send()
            .await
            .with_context(|| format!("backend request failed (endpoint={endpoint})"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .with_context(|| format!("failed to read backend response (endpoint={endpoint})"))?;

        if !status.is_success() {
            return Err(BackendError::from_body(endpoint, status, &text).into());
        }

        serde_json::from_str::<T>(&text)
            .with_context(|| format!("failed to decode backend response (endpoint={endpoint}): {text}"))
    }
}

#[async_trait::async_trait]
impl MarketDataApi for HttpBackendClient {
    async fn quote(&self, symbol: &str) -> Result<StockQuote> {
        self.get_json("quote", &[("symbol", symbol)]).await
    }

    async fn dashboard(&self, symbol: &str) -> Result<DashboardData> {
        self.get_json("dashboard", &[("symbol", symbol)]).await
    }

    async fn company_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CompanyNews>> {
        let from = from.format(DATE_FORMAT).to_string();
        let to = to.format(DATE_FORMAT).to_string();
        let out: Option<Vec<CompanyNews>> = self
            .get_json(
                "company-news",
                &[("symbol", symbol), ("from", from.as_str()), ("to", to.as_str())],
            )
            .await?;
        Ok(out.unwrap_or_default())
    }

    async fn market_status(&self, exchange: &str) -> Result<MarketStatus> {
        self.get_json("market-status", &[("exchange", exchange)])
            .await
    }

    async fn financials(&self, symbol: &str) -> Result<BasicFinancials> {
        self.get_json("financials", &[("symbol", symbol)]).await
    }

    async fn earnings(&self, symbol: &str) -> Result<Vec<EarningsSurprise>> {
        let out: Option<Vec<EarningsSurprise>> =
            self.get_json("earnings", &[("symbol", symbol)]).await?;
        Ok(out.unwrap_or_default())
    }

    async fn recommendations(&self, symbol: &str) -> Result<Vec<RecommendationTrend>> {
        let out: Option<Vec<RecommendationTrend>> = self
            .get_json("recommendations", &[("symbol", symbol)])
            .await?;
        Ok(out.unwrap_or_default())
    }

    async fn insider_transactions(&self, symbol: &str) -> Result<Vec<InsiderTransaction>> {
        let out: Option<Vec<InsiderTransaction>> =
            self.get_json("insider", &[("symbol", symbol)]).await?;
        Ok(out.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn spawn_backend(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base: &str) -> HttpBackendClient {
        HttpBackendClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn sends_symbol_and_date_range_as_query() {
        let app = Router::new().route(
            "/api/company-news",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                Json(json!([{
                    "headline": format!("{} {}..{}", q["symbol"], q["from"], q["to"]),
                    "id": 1
                }]))
            }),
        );
        let base = spawn_backend(app).await;

        let news = client(&base)
            .company_news(
                "AAPL",
                NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 9).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(news[0].headline, "AAPL 2026-01-05..2026-01-09");
    }

    #[tokio::test]
    async fn surfaces_backend_error_message() {
        let app = Router::new().route(
            "/api/dashboard",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Failed to fetch dashboard data: rate limited"})),
                )
            }),
        );
        let base = spawn_backend(app).await;

        let err = client(&base).dashboard("AAPL").await.unwrap_err();
        let backend = err.downcast_ref::<BackendError>().unwrap();
        assert_eq!(backend.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(backend.endpoint, "dashboard");
        assert!(backend.message.contains("rate limited"));
    }

    #[tokio::test]
    async fn fetches_market_status_for_exchange() {
        let app = Router::new().route(
            "/api/market-status",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                Json(json!({
                    "exchange": q.get("exchange").cloned().unwrap_or_default(),
                    "isOpen": true, "session": "regular", "holiday": null,
                    "t": 1, "timezone": "America/New_York"
                }))
            }),
        );
        let base = spawn_backend(app).await;

        let status = client(&base).market_status("US").await.unwrap();
        assert_eq!(status.exchange, "US");
        assert!(status.is_open);
    }

    #[tokio::test]
    async fn null_list_endpoints_become_empty() {
        let app = Router::new().route("/api/earnings", get(|| async { Json(Value::Null) }));
        let base = spawn_backend(app).await;

        let earnings = client(&base).earnings("AAPL").await.unwrap();
        assert!(earnings.is_empty());
    }

    #[tokio::test]
    async fn null_company_news_becomes_empty() {
        let app = Router::new().route("/api/company-news", get(|| async { Json(Value::Null) }));
        let base = spawn_backend(app).await;

        let day = NaiveDate::from_ymd_opt(2026, 1, 6).unwrap();
        let news = client(&base).company_news("AAPL", day, day).await.unwrap();
        assert!(news.is_empty());
    }

    #[tokio::test]
    async fn rejects_malformed_body() {
        let app = Router::new().route("/api/quote", get(|| async { "not json" }));
        let base = spawn_backend(app).await;

        let err = client(&base).quote("AAPL").await.unwrap_err();
        assert!(format!("{err:#}").contains("failed to decode backend response"));
    }

    #[test]
    fn joins_base_url_and_path() {
        let c = client("http://localhost:8080/");
        assert_eq!(c.url("quote"), "http://localhost:8080/api/quote");
    }
}
