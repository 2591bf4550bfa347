pub mod ws;

use crate::config::Settings;
use crate::domain::feed::FeedMessage;
use std::sync::Arc;
use std::time::Duration;

pub use ws::WebSocketFeed;

pub type Listener = Arc<dyn Fn(&FeedMessage) + Send + Sync>;

/// One real-time connection to the backend feed, fanning inbound messages out to listeners.
pub trait LiveFeed: Send + Sync {
    /// Opens a connection that subscribes to `symbol` once open. No-op while already open.
    fn connect(&self, symbol: &str);

    /// Sends a subscribe request if the connection is open; otherwise does nothing.
    fn subscribe(&self, symbol: &str);

    fn on_message(&self, listener: Listener);

    /// Closes the connection and drops every listener.
    fn disconnect(&self);

    fn is_open(&self) -> bool;

    fn subscribed_symbol(&self) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct FeedOptions {
    /// Reconnect with exponential backoff after the connection drops.
    pub reconnect: bool,
    pub reconnect_base: Duration,
    pub reconnect_max: Duration,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            reconnect: true,
            reconnect_base: Duration::from_secs(1),
            reconnect_max: Duration::from_secs(30),
        }
    }
}

impl FeedOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            reconnect: settings.feed_reconnect,
            reconnect_max: settings.feed_reconnect_max,
            ..Self::default()
        }
    }

    pub(crate) fn backoff(&self, failures: u32) -> Duration {
        let factor = 1u32 << failures.min(16);
        self.reconnect_base
            .saturating_mul(factor)
            .min(self.reconnect_max)
    }
}
