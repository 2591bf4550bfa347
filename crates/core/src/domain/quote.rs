use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StockQuote {
    #[serde(rename = "c")]
    pub current_price: f64,
    #[serde(rename = "d", default)]
    pub change: f64,
    #[serde(rename = "dp", default)]
    pub percent_change: f64,
    #[serde(rename = "h", default)]
    pub high_price: f64,
    #[serde(rename = "l", default)]
    pub low_price: f64,
    #[serde(rename = "o", default)]
    pub open_price: f64,
    #[serde(rename = "pc", default)]
    pub previous_close: f64,
    /// Epoch seconds of the last quote update.
    #[serde(rename = "t", default)]
    pub timestamp: i64,
}
