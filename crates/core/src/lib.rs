pub mod domain;
pub mod feed;
pub mod http;
pub mod storage;
pub mod store;
pub mod time;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;
    use std::time::Duration;

    const DEFAULT_EXCHANGE: &str = "US";
    const DEFAULT_MARKET_TZ: &str = "America/New_York";
    const DEFAULT_STATE_PATH: &str = ".cofin_state.json";
    const DEFAULT_TIMEOUT_SECS: u64 = 10;
    const DEFAULT_RECONNECT_MAX_SECS: u64 = 30;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub backend_url: Option<String>,
        pub backend_ws_url: Option<String>,
        pub backend_timeout: Duration,
        pub exchange: String,
        pub market_tz: String,
        pub state_path: PathBuf,
        pub feed_reconnect: bool,
        pub feed_reconnect_max: Duration,
        pub sentry_dsn: Option<String>,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                backend_url: None,
                backend_ws_url: None,
                backend_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
                exchange: DEFAULT_EXCHANGE.to_string(),
                market_tz: DEFAULT_MARKET_TZ.to_string(),
                state_path: PathBuf::from(DEFAULT_STATE_PATH),
                feed_reconnect: true,
                feed_reconnect_max: Duration::from_secs(DEFAULT_RECONNECT_MAX_SECS),
                sentry_dsn: None,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let mut out = Self {
                backend_url: non_empty_var("BACKEND_URL"),
                backend_ws_url: non_empty_var("BACKEND_WS_URL"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                ..Self::default()
            };

            if let Some(s) = non_empty_var("BACKEND_TIMEOUT_SECS") {
                out.backend_timeout = parse_secs("BACKEND_TIMEOUT_SECS", &s)?;
            }

            if let Some(s) = non_empty_var("MARKET_EXCHANGE") {
                out.exchange = s;
            }

            if let Some(s) = non_empty_var("MARKET_TZ") {
                out.market_tz = s;
            }

            if let Some(s) = non_empty_var("COFIN_STATE_PATH") {
                out.state_path = PathBuf::from(s);
            }

            if let Some(s) = non_empty_var("FEED_RECONNECT") {
                out.feed_reconnect = !matches!(s.to_ascii_lowercase().as_str(), "0" | "false" | "off" | "no");
            }

            if let Some(s) = non_empty_var("FEED_RECONNECT_MAX_SECS") {
                out.feed_reconnect_max = parse_secs("FEED_RECONNECT_MAX_SECS", &s)?;
            }

            Ok(out)
        }

        pub fn require_backend_url(&self) -> anyhow::Result<&str> {
            self.backend_url
                .as_deref()
                .context("BACKEND_URL is required")
        }

        /// WebSocket endpoint: `BACKEND_WS_URL` if set, otherwise the backend URL with its
        /// scheme swapped to `ws`/`wss` and `/ws` appended.
        pub fn feed_url(&self) -> anyhow::Result<String> {
            if let Some(url) = &self.backend_ws_url {
                return Ok(url.clone());
            }
            let base = self.require_backend_url()?;
            Ok(ws_url_from_http(base))
        }

        pub fn market_tz(&self) -> anyhow::Result<chrono_tz::Tz> {
            self.market_tz
                .parse::<chrono_tz::Tz>()
                .map_err(|e| anyhow::anyhow!("invalid MARKET_TZ {:?}: {e}", self.market_tz))
        }
    }

    pub fn ws_url_from_http(base: &str) -> String {
        let base = base.trim_end_matches('/');
        let swapped = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{swapped}/ws")
    }

    // Whole seconds, at least one; a zero timeout would fail every request.
    fn parse_secs(key: &str, raw: &str) -> anyhow::Result<Duration> {
        let secs = raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{key} must be an integer (got {raw})"))?;
        Ok(Duration::from_secs(secs.max(1)))
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }

}
