use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Session {
    #[serde(rename = "pre-market")]
    PreMarket,
    #[serde(rename = "regular")]
    Regular,
    #[serde(rename = "post-market")]
    PostMarket,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStatus {
    pub exchange: String,
    #[serde(rename = "isOpen")]
    pub is_open: bool,
    #[serde(default)]
    pub session: Option<Session>,
    #[serde(default)]
    pub holiday: Option<String>,
    #[serde(default)]
    pub t: i64,
    #[serde(default)]
    pub timezone: String,
}
