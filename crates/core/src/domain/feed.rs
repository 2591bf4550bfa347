use serde::{Deserialize, Serialize};

/// Inbound live-feed message, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedMessage {
    Trade {
        #[serde(default)]
        data: Vec<Trade>,
    },
    Ping,
    #[serde(other)]
    Other,
}

impl FeedMessage {
    /// The last trade record in this message for `symbol`, if any.
    pub fn latest_trade_for(&self, symbol: &str) -> Option<&Trade> {
        match self {
            FeedMessage::Trade { data } => data.iter().rev().find(|t| t.symbol == symbol),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "p")]
    pub price: f64,
    /// Epoch milliseconds.
    #[serde(rename = "t", default)]
    pub timestamp_ms: Option<i64>,
    #[serde(rename = "v", default)]
    pub volume: Option<f64>,
    #[serde(rename = "c", default)]
    pub conditions: Option<Vec<String>>,
}

/// Outbound live-feed message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Subscribe { symbol: String },
}
