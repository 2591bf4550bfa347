use crate::domain::feed::{ClientMessage, FeedMessage};
use crate::feed::{FeedOptions, LiveFeed, Listener};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

enum Command {
    Send(ClientMessage),
    Close,
}

enum SessionEnd {
    Dropped,
    Stopped,
}

struct Connection {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Shared {
    listeners: Mutex<Vec<Listener>>,
    symbol: Mutex<Option<String>>,
    open: AtomicBool,
    // Id of the connection allowed to touch `open` and listeners; bumped on disconnect.
    current: AtomicU64,
}

impl Shared {
    fn is_current(&self, id: u64) -> bool {
        self.current.load(Ordering::SeqCst) == id
    }

    fn set_open(&self, id: u64, open: bool) {
        if self.is_current(id) {
            self.open.store(open, Ordering::SeqCst);
        }
    }

    fn symbol(&self) -> Option<String> {
        lock(&self.symbol).clone()
    }

    fn dispatch(&self, id: u64, text: &str) {
        let msg = match serde_json::from_str::<FeedMessage>(text) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(error = %e, payload = text, "dropping malformed live feed message");
                return;
            }
        };

        if !self.is_current(id) {
            return;
        }

        let listeners = lock(&self.listeners).clone();
        for listener in listeners {
            listener(&msg);
        }
    }
}

/// WebSocket implementation of [`LiveFeed`], owned by one dashboard session.
pub struct WebSocketFeed {
    url: String,
    options: FeedOptions,
    shared: Arc<Shared>,
    conn: Mutex<Option<Connection>>,
}

impl WebSocketFeed {
    pub fn new(url: impl Into<String>, options: FeedOptions) -> Self {
        Self {
            url: url.into(),
            options,
            shared: Arc::new(Shared::default()),
            conn: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl LiveFeed for WebSocketFeed {
    fn connect(&self, symbol: &str) {
        let mut conn = lock(&self.conn);

        if self.shared.open.load(Ordering::SeqCst) {
            return;
        }

        *lock(&self.shared.symbol) = Some(symbol.to_string());

        if conn.as_ref().is_some_and(|c| !c.task.is_finished()) {
            tracing::debug!(symbol, "live feed already connecting; updated pending subscription");
            return;
        }

        let id = self.shared.current.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_connection(
            self.url.clone(),
            self.options.clone(),
            self.shared.clone(),
            id,
            rx,
        ));

        *conn = Some(Connection { commands: tx, task });
    }

    fn subscribe(&self, symbol: &str) {
        if !self.shared.open.load(Ordering::SeqCst) {
            tracing::debug!(symbol, "live feed not open; subscribe skipped");
            return;
        }

        let conn = lock(&self.conn);
        let Some(conn) = conn.as_ref() else {
            return;
        };

        *lock(&self.shared.symbol) = Some(symbol.to_string());
        let msg = ClientMessage::Subscribe {
            symbol: symbol.to_string(),
        };
        if conn.commands.send(Command::Send(msg)).is_err() {
            tracing::warn!(symbol, "live feed task has exited; subscribe dropped");
        }
    }

    fn on_message(&self, listener: Listener) {
        lock(&self.shared.listeners).push(listener);
    }

    fn disconnect(&self) {
        let Some(conn) = lock(&self.conn).take() else {
            return;
        };

        self.shared.current.fetch_add(1, Ordering::SeqCst);
        self.shared.open.store(false, Ordering::SeqCst);
        lock(&self.shared.listeners).clear();
        *lock(&self.shared.symbol) = None;

        // The task sends a close frame and exits; if it is gone already, nothing to do.
        let _ = conn.commands.send(Command::Close);
        tracing::info!(url = %self.url, "live feed disconnected");
    }

    fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }

    fn subscribed_symbol(&self) -> Option<String> {
        self.shared.symbol()
    }
}

impl Drop for WebSocketFeed {
    fn drop(&mut self) {
        if let Some(conn) = lock(&self.conn).take() {
            conn.task.abort();
        }
    }
}

async fn run_connection(
    url: String,
    options: FeedOptions,
    shared: Arc<Shared>,
    id: u64,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let mut failures: u32 = 0;

    loop {
        tracing::debug!(%url, "live feed connecting");

        let connected = tokio::select! {
            res = tokio_tungstenite::connect_async(url.as_str()) => res,
            _ = wait_for_close(&mut commands) => return,
        };

        match connected {
            Ok((stream, resp)) => {
                failures = 0;
                shared.set_open(id, true);
                tracing::info!(%url, status = %resp.status(), "live feed connected");

                let end = run_session(stream, &shared, id, &mut commands).await;
                shared.set_open(id, false);

                if matches!(end, SessionEnd::Stopped) {
                    return;
                }
                tracing::warn!(%url, "live feed connection lost");
            }
            Err(e) => {
                tracing::error!(%url, error = %e, "live feed connect failed");
            }
        }

        if !options.reconnect || !shared.is_current(id) {
            return;
        }

        let backoff = options.backoff(failures);
        failures = failures.saturating_add(1);
        tracing::warn!(%url, ?backoff, "live feed reconnecting");

        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            _ = wait_for_close(&mut commands) => return,
        }
    }
}

async fn run_session(
    stream: WsStream,
    shared: &Shared,
    id: u64,
    commands: &mut mpsc::UnboundedReceiver<Command>,
) -> SessionEnd {
    let (mut write, mut read) = stream.split();

    if let Some(symbol) = shared.symbol() {
        let msg = ClientMessage::Subscribe { symbol };
        if let Err(e) = send_json(&mut write, &msg).await {
            tracing::warn!(error = %e, "live feed subscribe failed");
            return SessionEnd::Dropped;
        }
    }

    loop {
        tokio::select! {
            msg = read.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "live feed read error");
                        return SessionEnd::Dropped;
                    }
                    None => return SessionEnd::Dropped,
                };

                match msg {
                    Message::Text(txt) => shared.dispatch(id, txt.as_str()),
                    Message::Ping(payload) => {
                        let _ = write.send(Message::Pong(payload)).await;
                    }
                    Message::Close(frame) => {
                        tracing::info!(?frame, "live feed closed by server");
                        return SessionEnd::Dropped;
                    }
                    _ => {}
                }
            }
            cmd = commands.recv() => {
                match cmd {
                    Some(Command::Send(msg)) => {
                        if let Err(e) = send_json(&mut write, &msg).await {
                            tracing::warn!(error = %e, "live feed send failed");
                            return SessionEnd::Dropped;
                        }
                    }
                    Some(Command::Close) | None => {
                        let _ = write.send(Message::Close(None)).await;
                        return SessionEnd::Stopped;
                    }
                }
            }
        }
    }
}

async fn send_json<S>(write: &mut S, msg: &ClientMessage) -> anyhow::Result<()>
where
    S: futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let payload = serde_json::to_string(msg)?;
    write.send(Message::Text(payload.into())).await?;
    if let ClientMessage::Subscribe { symbol } = msg {
        tracing::info!(symbol = %symbol, "live feed subscribed");
    }
    Ok(())
}

// Resolves once the owner asks to close or drops its handle. Sends queued before the
// connection opened are dropped, matching subscribe's no-queue contract.
async fn wait_for_close(commands: &mut mpsc::UnboundedReceiver<Command>) {
    loop {
        match commands.recv().await {
            Some(Command::Close) | None => return,
            Some(Command::Send(_)) => continue,
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ws::{Message as AxumMessage, WebSocket, WebSocketUpgrade};
    use axum::extract::State;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;
    use serde_json::{json, Value};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Clone)]
    struct Backend {
        received: mpsc::UnboundedSender<Value>,
        // Messages pushed to the client after each subscribe.
        replies: Arc<Vec<String>>,
        close_after_subscribe: bool,
        ping_after_subscribe: bool,
        connections: Arc<AtomicUsize>,
    }

    async fn ws_route(ws: WebSocketUpgrade, State(backend): State<Backend>) -> impl IntoResponse {
        backend.connections.fetch_add(1, Ordering::SeqCst);
        ws.on_upgrade(move |socket| serve_socket(socket, backend))
    }

    async fn serve_socket(mut socket: WebSocket, backend: Backend) {
        while let Some(Ok(msg)) = socket.recv().await {
            let text = match msg {
                AxumMessage::Text(text) => text,
                AxumMessage::Pong(payload) => {
                    let payload = String::from_utf8_lossy(&payload).into_owned();
                    let _ = backend.received.send(json!({"pong": payload}));
                    continue;
                }
                _ => continue,
            };
            let Ok(value) = serde_json::from_str::<Value>(&text) else {
                continue;
            };
            let _ = backend.received.send(value);

            for reply in backend.replies.iter() {
                if socket.send(AxumMessage::Text(reply.clone())).await.is_err() {
                    return;
                }
            }

            if backend.ping_after_subscribe
                && socket.send(AxumMessage::Ping(b"hb".to_vec())).await.is_err()
            {
                return;
            }

            if backend.close_after_subscribe {
                let _ = socket.send(AxumMessage::Close(None)).await;
                return;
            }
        }
    }

    async fn spawn_backend(
        replies: Vec<String>,
        close_after_subscribe: bool,
    ) -> (String, mpsc::UnboundedReceiver<Value>) {
        let (url, rx, _) = spawn_backend_with(replies, close_after_subscribe, false).await;
        (url, rx)
    }

    async fn spawn_backend_with(
        replies: Vec<String>,
        close_after_subscribe: bool,
        ping_after_subscribe: bool,
    ) -> (String, mpsc::UnboundedReceiver<Value>, Arc<AtomicUsize>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connections = Arc::new(AtomicUsize::new(0));
        let backend = Backend {
            received: tx,
            replies: Arc::new(replies),
            close_after_subscribe,
            ping_after_subscribe,
            connections: connections.clone(),
        };
        let app = Router::new().route("/ws", get(ws_route)).with_state(backend);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("ws://{addr}/ws"), rx, connections)
    }

    fn collecting_listener() -> (Listener, mpsc::UnboundedReceiver<FeedMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener: Listener = Arc::new(move |msg: &FeedMessage| {
            let _ = tx.send(msg.clone());
        });
        (listener, rx)
    }

    async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for message")
            .expect("channel closed")
    }

    async fn wait_open(feed: &WebSocketFeed) {
        for _ in 0..200 {
            if feed.is_open() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("feed never opened");
    }

    fn no_reconnect() -> FeedOptions {
        FeedOptions {
            reconnect: false,
            ..FeedOptions::default()
        }
    }

    #[tokio::test]
    async fn subscribes_on_open_and_fans_out_parsed_messages() {
        let replies = vec![
            json!({"type": "trade", "data": [{"s": "AAPL", "p": 101.5, "t": 1_700_000_000_000_i64}]})
                .to_string(),
            "{this is not json".to_string(),
            json!({"type": "ping"}).to_string(),
        ];
        let (url, mut received) = spawn_backend(replies, false).await;

        let feed = WebSocketFeed::new(url, no_reconnect());
        let (listener, mut messages) = collecting_listener();
        feed.on_message(listener);
        feed.connect("AAPL");

        assert_eq!(
            next(&mut received).await,
            json!({"type": "subscribe", "symbol": "AAPL"})
        );

        let first = next(&mut messages).await;
        assert_eq!(first.latest_trade_for("AAPL").unwrap().price, 101.5);
        // The malformed payload is skipped; the ping is next.
        assert_eq!(next(&mut messages).await, FeedMessage::Ping);

        feed.disconnect();
    }

    #[tokio::test]
    async fn subscribe_switches_symbol_on_open_connection() {
        let (url, mut received) = spawn_backend(vec![], false).await;

        let feed = WebSocketFeed::new(url, no_reconnect());
        feed.connect("AAPL");
        next(&mut received).await;
        wait_open(&feed).await;

        // Already open: connect is a no-op, subscribe does the switch.
        feed.connect("MSFT");
        feed.subscribe("MSFT");

        assert_eq!(
            next(&mut received).await,
            json!({"type": "subscribe", "symbol": "MSFT"})
        );
        assert_eq!(feed.subscribed_symbol().as_deref(), Some("MSFT"));
        feed.disconnect();
    }

    #[tokio::test]
    async fn connect_while_connecting_updates_pending_symbol_on_one_socket() {
        let (url, mut received, connections) = spawn_backend_with(vec![], false, false).await;

        let feed = WebSocketFeed::new(url, no_reconnect());
        feed.connect("AAPL");
        feed.connect("MSFT");
        assert!(!feed.is_open());
        assert_eq!(feed.subscribed_symbol().as_deref(), Some("MSFT"));

        assert_eq!(
            next(&mut received).await,
            json!({"type": "subscribe", "symbol": "MSFT"})
        );
        wait_open(&feed).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(connections.load(Ordering::SeqCst), 1);
        assert!(received.try_recv().is_err());
        feed.disconnect();
    }

    #[tokio::test]
    async fn answers_server_ping_with_pong() {
        let (url, mut received, _) = spawn_backend_with(vec![], false, true).await;

        let feed = WebSocketFeed::new(url, no_reconnect());
        feed.connect("AAPL");

        assert_eq!(
            next(&mut received).await,
            json!({"type": "subscribe", "symbol": "AAPL"})
        );
        assert_eq!(next(&mut received).await, json!({"pong": "hb"}));
        feed.disconnect();
    }

    #[tokio::test]
    async fn subscribe_is_noop_while_closed() {
        let feed = WebSocketFeed::new("ws://127.0.0.1:9/ws", no_reconnect());
        feed.subscribe("AAPL");
        assert!(!feed.is_open());
        assert_eq!(feed.subscribed_symbol(), None);
    }

    #[tokio::test]
    async fn disconnect_clears_listeners_and_allows_fresh_connect() {
        let trade = json!({"type": "trade", "data": [{"s": "AAPL", "p": 1.0}]}).to_string();
        let (url, mut received) = spawn_backend(vec![trade], false).await;

        let feed = WebSocketFeed::new(url, no_reconnect());
        let (old_listener, mut old_messages) = collecting_listener();
        feed.on_message(old_listener);
        feed.connect("AAPL");
        next(&mut received).await;
        next(&mut old_messages).await;

        feed.disconnect();
        assert!(!feed.is_open());

        let (new_listener, mut new_messages) = collecting_listener();
        feed.on_message(new_listener);
        feed.connect("TSLA");

        assert_eq!(
            next(&mut received).await,
            json!({"type": "subscribe", "symbol": "TSLA"})
        );
        next(&mut new_messages).await;
        wait_open(&feed).await;
        assert!(old_messages.try_recv().is_err());
        feed.disconnect();
    }

    #[tokio::test]
    async fn reconnects_and_resubscribes_after_server_close() {
        let (url, mut received) = spawn_backend(vec![], true).await;

        let feed = WebSocketFeed::new(
            url,
            FeedOptions {
                reconnect: true,
                reconnect_base: Duration::from_millis(10),
                reconnect_max: Duration::from_millis(50),
            },
        );
        feed.connect("NVDA");

        let expected = json!({"type": "subscribe", "symbol": "NVDA"});
        assert_eq!(next(&mut received).await, expected);
        assert_eq!(next(&mut received).await, expected);
        feed.disconnect();
    }

    #[tokio::test]
    async fn stays_down_after_close_without_reconnect() {
        let (url, mut received) = spawn_backend(vec![], true).await;

        let feed = WebSocketFeed::new(url, no_reconnect());
        feed.connect("AMD");
        next(&mut received).await;

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!feed.is_open());
        assert!(received.try_recv().is_err());
    }
}
