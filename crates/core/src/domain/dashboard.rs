use crate::domain::null_as_default;
use crate::domain::quote::StockQuote;
use serde::{Deserialize, Serialize};

/// Everything the backend's `/api/dashboard` bundles for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub quote: StockQuote,
    pub financials: BasicFinancials,
    #[serde(default, deserialize_with = "null_as_default")]
    pub earnings: Vec<EarningsSurprise>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recommendations: Vec<RecommendationTrend>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub insiders: Vec<InsiderTransaction>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BasicFinancials {
    #[serde(default)]
    pub metric: FinancialMetrics,
    #[serde(rename = "Series", default)]
    pub series: Option<FinancialSeries>,
    #[serde(rename = "metricType", default)]
    pub metric_type: String,
    #[serde(default)]
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FinancialMetrics {
    #[serde(rename = "peBasicExclExtraTTM", default)]
    pub pe_basic_excl_extra_ttm: f64,
    #[serde(rename = "marketCapitalization", default)]
    pub market_capitalization: f64,
    #[serde(rename = "52WeekHigh", default)]
    pub high_52_week: f64,
    #[serde(rename = "52WeekLow", default)]
    pub low_52_week: f64,
    #[serde(rename = "dividendYieldIndicatedAnnual", default)]
    pub dividend_yield: f64,
    #[serde(default)]
    pub beta: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FinancialSeries {
    #[serde(rename = "Annual", default)]
    pub annual: AnnualSeries,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnnualSeries {
    #[serde(rename = "currentRatio", default, deserialize_with = "null_as_default")]
    pub current_ratio: Vec<PeriodValue>,
    #[serde(rename = "salesPerShare", default, deserialize_with = "null_as_default")]
    pub sales_per_share: Vec<PeriodValue>,
    #[serde(rename = "netMargin", default, deserialize_with = "null_as_default")]
    pub net_margin: Vec<PeriodValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodValue {
    pub period: String,
    pub v: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsSurprise {
    #[serde(default)]
    pub actual: f64,
    #[serde(default)]
    pub estimate: f64,
    pub period: String,
    #[serde(default)]
    pub quarter: i32,
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub surprise: f64,
    #[serde(rename = "surprisePercent", default)]
    pub surprise_percent: f64,
    #[serde(default)]
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationTrend {
    #[serde(default)]
    pub buy: i32,
    #[serde(default)]
    pub hold: i32,
    pub period: String,
    #[serde(default)]
    pub sell: i32,
    #[serde(rename = "strongBuy", default)]
    pub strong_buy: i32,
    #[serde(rename = "strongSell", default)]
    pub strong_sell: i32,
    #[serde(default)]
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsiderTransaction {
    pub name: String,
    #[serde(default)]
    pub share: f64,
    #[serde(default)]
    pub change: f64,
    #[serde(rename = "filingDate", default)]
    pub filing_date: String,
    #[serde(rename = "transactionDate", default)]
    pub transaction_date: String,
    #[serde(rename = "transactionPrice", default)]
    pub transaction_price: f64,
    #[serde(default)]
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyNews {
    #[serde(default)]
    pub category: String,
    /// Epoch seconds.
    #[serde(default)]
    pub datetime: i64,
    pub headline: String,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub related: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub url: String,
}
