//! High-level client: connection, framing, cache and typed dispatch.

use std::sync::Arc;
use std::time::Duration;

use foldmon_pyon::FrameBuffer;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::cache::MessageCache;
use crate::command::Command;
use crate::config::ClientConfig;
use crate::connection::{Connection, ConnectionInfo, ConnectionState, PollOutcome};
use crate::error::Result;
use crate::events::{ClientEvent, EventSink};
use crate::message::Message;
use crate::models::LogText;
use crate::reconnect::ReconnectPolicy;
use crate::registry::{MessageRegistry, TypedMessage};

/// A monitoring client for one Folding@Home instance.
///
/// Every poll tick that receives data drains complete frames from the
/// receive buffer, folds each into the [`MessageCache`], projects it through
/// the [`MessageRegistry`] and raises one [`ClientEvent::Message`] per frame
/// followed by a single [`ClientEvent::MessagesUpdated`].
pub struct FahClient {
    connection: Connection,
    cache: Arc<MessageCache>,
    registry: Arc<MessageRegistry>,
}

impl FahClient {
    /// Create a client using the standard message registry.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_registry(config, MessageRegistry::standard())
    }

    /// Create a client with a custom registry.
    pub fn with_registry(config: ClientConfig, registry: MessageRegistry) -> Self {
        let events = EventSink::new(config.event_capacity);
        let connection = Connection::with_events(config, events.clone());
        let cache = Arc::new(MessageCache::new());
        let registry = Arc::new(registry);

        {
            let cache = Arc::clone(&cache);
            let registry = Arc::clone(&registry);
            connection.register_handler(Box::new(move |buffer: &FrameBuffer| {
                process_frames(buffer, &cache, &registry, &events);
            }));
        }

        Self {
            connection,
            cache,
            registry,
        }
    }

    /// Connect and start polling.
    ///
    /// The cache is emptied first so a new connection never shows data from
    /// the previous one.
    pub async fn connect(&self, host: &str, port: u16, password: &str) -> Result<()> {
        if self.connection.state() == ConnectionState::Disconnected {
            self.cache.clear();
        }
        self.connection.connect(host, port, password).await
    }

    /// Connect, retrying transient failures according to `policy`.
    ///
    /// Usage errors such as `AlreadyConnected` or a blank host are returned
    /// immediately.
    pub async fn connect_with_retry(
        &self,
        host: &str,
        port: u16,
        password: &str,
        policy: &ReconnectPolicy,
    ) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.connect(host, port, password).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && policy.should_retry(attempt) => {
                    let delay = policy.delay_for(attempt);
                    warn!(
                        "Connect attempt {} to {}:{} failed: {}; retrying in {:?}",
                        attempt, host, port, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Close the connection. Cached messages stay readable.
    pub async fn close(&self) {
        self.connection.close().await;
    }

    /// Send a raw command line.
    pub async fn send_command(&self, command: &str) -> Result<()> {
        self.connection.send_command(command).await
    }

    /// Send a typed command.
    pub async fn send(&self, command: &Command) -> Result<()> {
        self.connection.send_command(&command.to_string()).await
    }

    /// Subscribe to the standard status feeds, refreshed every `interval`.
    pub async fn subscribe_updates(&self, interval: Duration) -> Result<()> {
        for command in Command::standard_updates(interval) {
            self.send(&command).await?;
        }
        info!("Subscribed to updates every {:?}", interval);
        Ok(())
    }

    /// Receive client events. Drop the receiver to unsubscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.connection.subscribe()
    }

    /// Latest cached message for `key`.
    pub fn message(&self, key: &str) -> Option<Message> {
        self.cache.get(key)
    }

    /// Latest cached message for `key`, parsed by the registry.
    pub fn typed(&self, key: &str) -> Option<TypedMessage> {
        let message = self.cache.get(key)?;
        self.registry.project(&message)
    }

    /// The aggregated log.
    pub fn log(&self) -> Option<LogText> {
        self.cache.log().map(|message| LogText(message.value().to_string()))
    }

    pub fn cache(&self) -> &MessageCache {
        &self.cache
    }

    pub fn registry(&self) -> &MessageRegistry {
        &self.registry
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Copy the unparsed receive buffer, optionally clearing it.
    pub fn buffer_snapshot(&self, clear: bool) -> String {
        self.connection.buffer_snapshot(clear)
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn info(&self) -> Option<Arc<ConnectionInfo>> {
        self.connection.info()
    }

    /// Run one poll tick now.
    pub async fn poll_once(&self) -> PollOutcome {
        self.connection.poll_once().await
    }
}

impl std::fmt::Debug for FahClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FahClient")
            .field("connection", &self.connection)
            .field("cached", &self.cache.len())
            .finish()
    }
}

fn process_frames(
    buffer: &FrameBuffer,
    cache: &MessageCache,
    registry: &MessageRegistry,
    events: &EventSink,
) {
    let frames = buffer.drain_frames();
    if frames.is_empty() {
        return;
    }

    let mut updated: Vec<String> = Vec::new();
    for frame in frames {
        let message = Message::from(frame);
        let key = cache.update(&message);
        if !updated.contains(&key) {
            updated.push(key);
        }

        let event = registry.dispatch(message);
        debug!(
            key = event.message.key(),
            typed = event.typed.as_ref().map(TypedMessage::kind),
            "Received message"
        );
        events.emit(ClientEvent::Message(Arc::new(event)));
    }

    events.emit(ClientEvent::MessagesUpdated { keys: updated });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LOG_KEY;
    use crate::error::Error;
    use crate::models::SlotStatus;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;
    use tokio_test::assert_ok;

    fn test_config() -> ClientConfig {
        ClientConfig::default().with_poll_interval(Duration::from_millis(10))
    }

    async fn wait_for_update(
        rx: &mut broadcast::Receiver<ClientEvent>,
        key: &str,
    ) -> Vec<String> {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let ClientEvent::MessagesUpdated { keys } = rx.recv().await.unwrap() {
                    if keys.iter().any(|k| k == key) {
                        return keys;
                    }
                }
            }
        })
        .await
        .expect("cache not updated")
    }

    #[tokio::test]
    async fn test_fragmented_frames_reach_cache() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let chunks: [&[u8]; 4] = [
                b"PyON 1 slots\n[{\"id\": \"00\", \"status\": \"RUNNING\",",
                b" \"description\": \"cpu:4\", \"idle\": False}]\n",
                b"---\nPyON 1 log-restart\n\"line one\\n\"\n---\n",
                b"PyON 1 log-update\n\"line two\\n\"\n---\n",
            ];
            for chunk in chunks {
                stream.write_all(chunk).await.unwrap();
                stream.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let client = FahClient::new(test_config());
        let mut events = client.subscribe();
        assert_ok!(client.connect("127.0.0.1", port, "").await);

        wait_for_update(&mut events, "slots").await;
        match client.typed("slots") {
            Some(TypedMessage::Slots(slots)) => {
                assert_eq!(slots.len(), 1);
                assert_eq!(slots[0].status, SlotStatus::Running);
                assert_eq!(slots[0].idle, Some(false));
            }
            other => panic!("unexpected projection: {:?}", other),
        }

        while client.log().map(|log| log.0) != Some("line one\nline two\n".to_string()) {
            wait_for_update(&mut events, LOG_KEY).await;
        }
        assert!(client.message("log-update").is_none());
        assert_eq!(client.buffer_snapshot(false), "");

        client.close().await;
    }

    #[tokio::test]
    async fn test_message_events_carry_typed_payload() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream
                .write_all(b"PyON 1 heartbeat\n7\n---\nPyON 1 mystery\n{}\n---\n")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let client = FahClient::new(test_config());
        let mut events = client.subscribe();
        assert_ok!(client.connect("127.0.0.1", port, "").await);

        let mut seen = Vec::new();
        tokio::time::timeout(Duration::from_secs(2), async {
            while seen.len() < 2 {
                if let ClientEvent::Message(event) = events.recv().await.unwrap() {
                    seen.push(event);
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(seen[0].message.key(), "heartbeat");
        assert!(matches!(
            seen[0].typed,
            Some(TypedMessage::Heartbeat(ref h)) if h.sequence == 7
        ));
        // unknown keys still arrive, untyped
        assert_eq!(seen[1].message.key(), "mystery");
        assert!(seen[1].typed.is_none());
        assert!(client.message("mystery").is_some());

        client.close().await;
    }

    #[tokio::test]
    async fn test_custom_registry_entry() {
        let mut registry = MessageRegistry::standard();
        registry.register("ppd", |value| {
            serde_json::from_str(value).map(TypedMessage::Other)
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(b"PyON 1 ppd\n123456\n---\n").await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let client = FahClient::with_registry(test_config(), registry);
        let mut events = client.subscribe();
        assert_ok!(client.connect("127.0.0.1", port, "").await);
        wait_for_update(&mut events, "ppd").await;

        assert_eq!(
            client.typed("ppd"),
            Some(TypedMessage::Other(serde_json::json!(123456)))
        );
        client.close().await;
    }

    #[tokio::test]
    async fn test_subscribe_updates_sends_standard_set() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut lines = BufReader::new(stream).lines();
            let mut received = Vec::new();
            while received.len() < 8 {
                match lines.next_line().await.unwrap() {
                    Some(line) => received.push(line),
                    None => break,
                }
            }
            received
        });

        let client = FahClient::new(test_config());
        assert_ok!(client.connect("127.0.0.1", port, "pw").await);
        assert_ok!(client.subscribe_updates(Duration::from_secs(5)).await);

        let received = server.await.unwrap();
        assert_eq!(received[0], "auth pw");
        assert_eq!(received[1], "updates clear");
        assert_eq!(received[2], "log-updates restart");
        assert_eq!(received[7], "updates add 4 5 $queue-info");

        client.close().await;
    }

    #[tokio::test]
    async fn test_reconnect_clears_cache() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _server = tokio::spawn(async move {
            for body in ["1", "2"] {
                let (mut stream, _) = listener.accept().await.unwrap();
                let frame = format!("PyON 1 heartbeat\n{}\n---\n", body);
                stream.write_all(frame.as_bytes()).await.unwrap();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    drop(stream);
                });
            }
        });

        let client = FahClient::new(test_config());
        let mut events = client.subscribe();
        assert_ok!(client.connect("127.0.0.1", port, "").await);
        wait_for_update(&mut events, "heartbeat").await;
        client.cache().update(&Message::new("stale", "true"));
        client.close().await;

        // closing keeps the cache readable
        assert!(client.message("stale").is_some());

        assert_ok!(client.connect("127.0.0.1", port, "").await);
        assert!(client.message("stale").is_none());
        wait_for_update(&mut events, "heartbeat").await;
        assert_eq!(client.message("heartbeat").unwrap().value(), "2");

        client.close().await;
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let policy = ReconnectPolicy::default()
            .with_initial_delay(Duration::from_millis(5))
            .with_max_attempts(3);
        let client = FahClient::new(test_config());

        let result = client
            .connect_with_retry("127.0.0.1", port, "", &policy)
            .await;
        assert!(matches!(result, Err(Error::Io(_))));
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_retry_skips_usage_errors() {
        let policy = ReconnectPolicy::default().with_initial_delay(Duration::from_secs(30));
        let client = FahClient::new(test_config());

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            client.connect_with_retry("", 36330, "", &policy),
        )
        .await
        .unwrap();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_process_frames_batches_keys() {
        let buffer = FrameBuffer::new();
        let cache = MessageCache::new();
        let registry = MessageRegistry::standard();
        let events = EventSink::new(16);
        let mut rx = events.subscribe();

        buffer.append("PyON 1 heartbeat\n1\n---\nPyON 1 heartbeat\n2\n---\nPyON 1 units\n[]\n---\n");
        process_frames(&buffer, &cache, &registry, &events);

        let mut messages = 0;
        let mut updated = None;
        while let Ok(event) = rx.try_recv() {
            match event {
                ClientEvent::Message(_) => messages += 1,
                ClientEvent::MessagesUpdated { keys } => updated = Some(keys),
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert_eq!(messages, 3);
        assert_eq!(
            updated,
            Some(vec!["heartbeat".to_string(), "units".to_string()])
        );
        assert_eq!(cache.get("heartbeat").unwrap().value(), "2");
    }

    #[test]
    fn test_process_frames_without_frames_is_silent() {
        let buffer = FrameBuffer::new();
        let events = EventSink::new(4);
        let mut rx = events.subscribe();

        buffer.append("PyON 1 units\n[");
        process_frames(&buffer, &MessageCache::new(), &MessageRegistry::standard(), &events);

        assert!(rx.try_recv().is_err());
        assert_eq!(buffer.len(), "PyON 1 units\n[".len());
    }
}
