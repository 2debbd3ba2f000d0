//! TCP connection to a client's command port.
//!
//! Owns the socket lifecycle and the poll loop. The connection knows nothing
//! about framing: each poll tick drains every byte the socket has ready into
//! the [`FrameBuffer`] and then hands the buffer to the registered
//! [`ReceiveHandler`].
//!
//! ```text
//! Disconnected --connect ok--------> Connected
//! Disconnected --timeout/failure---> Disconnected
//! Connected    --close-------------> Disconnected
//! Connected    --poll/send error---> Disconnected   (internal close)
//! ```
//!
//! I/O failures on the poll task close the connection and surface as
//! error-level status events. A read that finds the connection already torn
//! down by a concurrent `close` is expected and stays silent.

use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use foldmon_pyon::FrameBuffer;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::decode::Utf8Decoder;
use crate::error::{Error, Result};
use crate::events::{ClientEvent, EventSink, StatusLevel};
use crate::resource::{Guarded, Published};

/// Winsock "blocking operation interrupted" code, raised when a socket is
/// closed under a pending read.
#[cfg(windows)]
const WSAEINTR: i32 = 10004;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}

/// Details of the current connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub host: String,
    pub port: u16,
    pub peer_addr: Option<SocketAddr>,
    pub connected_at: SystemTime,
}

/// Result of one poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Another tick was still running.
    Skipped,
    /// No open connection.
    Disconnected,
    /// Bytes drained from the socket (possibly zero).
    Received(usize),
    /// The tick hit an I/O failure and closed the connection.
    Failed,
}

/// Called after every tick that received bytes.
pub type ReceiveHandler = Box<dyn Fn(&FrameBuffer) + Send + Sync>;

struct Inner {
    config: ClientConfig,
    state: Mutex<ConnectionState>,
    stream: Guarded<TcpStream>,
    info: Published<ConnectionInfo>,
    buffer: FrameBuffer,
    decoder: Mutex<Utf8Decoder>,
    polling: AtomicBool,
    poll_stop: Mutex<Option<oneshot::Sender<()>>>,
    handler: Mutex<Option<ReceiveHandler>>,
    events: EventSink,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the re-entrancy flag when a tick ends.
struct PollGuard<'a>(&'a AtomicBool);

impl<'a> PollGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PollGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Bytes drained in one tick and whether the peer hung up.
struct Drained {
    bytes: usize,
    remote_closed: bool,
}

fn is_cancellation(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::Interrupted || is_wsa_interrupt(e)
}

#[cfg(windows)]
fn is_wsa_interrupt(e: &io::Error) -> bool {
    e.raw_os_error() == Some(WSAEINTR)
}

#[cfg(not(windows))]
fn is_wsa_interrupt(_e: &io::Error) -> bool {
    false
}

/// Keep passwords out of logs.
fn redact(command: &str) -> &str {
    if command.trim_start().starts_with("auth ") {
        "auth ********"
    } else {
        command.trim_end()
    }
}

impl Inner {
    fn state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    fn begin_connect(&self) -> Result<()> {
        let mut state = lock(&self.state);
        if *state != ConnectionState::Disconnected {
            return Err(Error::AlreadyConnected);
        }
        *state = ConnectionState::Connecting;
        Ok(())
    }

    fn abandon_connect(&self) {
        let mut state = lock(&self.state);
        if *state == ConnectionState::Connecting {
            *state = ConnectionState::Disconnected;
        }
    }

    fn stop_polling(&self) {
        let stop = lock(&self.poll_stop).take();
        if let Some(stop) = stop {
            let _ = stop.send(());
        }
    }

    async fn close(&self) {
        self.stop_polling();

        let previous = std::mem::replace(&mut *lock(&self.state), ConnectionState::Disconnected);

        if let Some(mut stream) = self.stream.take().await {
            if let Err(e) = stream.shutdown().await {
                debug!("Socket shutdown: {}", e);
            }
        }
        self.info.clear();

        if previous == ConnectionState::Connected {
            self.events.emit(ClientEvent::ConnectedChanged { connected: false });
            self.events.status(StatusLevel::Info, "Connection closed");
        }
    }

    async fn send_line(&self, command: &str) -> Result<()> {
        if self.state() != ConnectionState::Connected {
            return Err(Error::NotConnected);
        }
        if command.trim().is_empty() {
            self.events.status(StatusLevel::Warning, "No command text given");
            return Ok(());
        }

        let mut line = command.to_string();
        if !line.ends_with('\n') {
            line.push('\n');
        }

        let written = {
            let mut stream = self.stream.lock().await;
            match stream.as_mut() {
                Some(stream) => stream.write_all(line.as_bytes()).await.map_err(Error::from),
                None => Err(Error::NotConnected),
            }
        };

        match written {
            Ok(()) => {
                debug!(command = redact(command), bytes = line.len(), "Sent command");
                self.events.emit(ClientEvent::DataSent { bytes: line.len() });
                Ok(())
            }
            Err(Error::NotConnected) => Err(Error::NotConnected),
            Err(e) => {
                self.close().await;
                self.events
                    .status(StatusLevel::Error, format!("Failed to send command: {}", e));
                Err(e)
            }
        }
    }

    async fn drain(&self) -> Result<Drained> {
        let stream = self.stream.lock().await;
        let Some(stream) = stream.as_ref() else {
            return Err(Error::Cancelled);
        };

        let mut scratch = vec![0u8; self.config.read_buffer_size];
        let mut decoder = lock(&self.decoder);
        let mut drained = Drained {
            bytes: 0,
            remote_closed: false,
        };

        loop {
            match stream.try_read(&mut scratch) {
                Ok(0) => {
                    drained.remote_closed = true;
                    break;
                }
                Ok(n) => {
                    drained.bytes += n;
                    self.buffer.append(&decoder.decode(&scratch[..n]));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if is_cancellation(&e) => {
                    if self.state() != ConnectionState::Connected {
                        return Err(Error::Cancelled);
                    }
                    // interrupted without a close; read again
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(drained)
    }

    async fn poll_once(&self) -> PollOutcome {
        let Some(_guard) = PollGuard::acquire(&self.polling) else {
            return PollOutcome::Skipped;
        };
        if self.state() != ConnectionState::Connected {
            return PollOutcome::Disconnected;
        }

        let drained = match self.drain().await {
            Ok(drained) => drained,
            Err(Error::Cancelled) if self.state() != ConnectionState::Connected => {
                return PollOutcome::Disconnected;
            }
            Err(e) => {
                self.close().await;
                self.events
                    .status(StatusLevel::Error, format!("Connection failed: {}", e));
                return PollOutcome::Failed;
            }
        };

        if drained.bytes > 0 {
            self.events.emit(ClientEvent::DataReceived {
                bytes: drained.bytes,
            });
            let handler = lock(&self.handler);
            if let Some(handler) = handler.as_ref() {
                handler(&self.buffer);
            }
        }

        if drained.remote_closed {
            self.close().await;
            self.events.status(
                StatusLevel::Error,
                format!("Connection failed: {}", Error::RemoteClosed),
            );
            return PollOutcome::Failed;
        }

        PollOutcome::Received(drained.bytes)
    }
}

/// A connection to one client's command port.
pub struct Connection {
    inner: Arc<Inner>,
}

impl Connection {
    /// Create a disconnected connection with its own event channel.
    pub fn new(config: ClientConfig) -> Self {
        let events = EventSink::new(config.event_capacity);
        Self::with_events(config, events)
    }

    pub(crate) fn with_events(config: ClientConfig, events: EventSink) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(ConnectionState::Disconnected),
                stream: Guarded::empty(),
                info: Published::empty(),
                buffer: FrameBuffer::new(),
                decoder: Mutex::new(Utf8Decoder::default()),
                polling: AtomicBool::new(false),
                poll_stop: Mutex::new(None),
                handler: Mutex::new(None),
                events,
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Details of the open connection.
    pub fn info(&self) -> Option<Arc<ConnectionInfo>> {
        self.inner.info.get()
    }

    /// Receive connection events. Drop the receiver to unsubscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    /// Register the handler run after each tick that received bytes.
    pub fn register_handler(&self, handler: ReceiveHandler) {
        *lock(&self.inner.handler) = Some(handler);
    }

    /// The receive buffer.
    pub fn buffer(&self) -> &FrameBuffer {
        &self.inner.buffer
    }

    /// Copy the receive buffer, optionally clearing it.
    pub fn buffer_snapshot(&self, clear: bool) -> String {
        self.inner.buffer.snapshot(clear)
    }

    /// Connect to `host:port`.
    ///
    /// A non-empty `password` is sent as `auth <password>` right after the
    /// handshake. Fails with `AlreadyConnected` unless disconnected, with
    /// `Config` when the configuration cannot be run, and with
    /// `ConnectTimeout` when the handshake exceeds the configured bound.
    pub async fn connect(&self, host: &str, port: u16, password: &str) -> Result<()> {
        self.connect_via(host, port, password, TcpStream::connect((host, port)))
            .await
    }

    /// Connect using `dial` to open the stream.
    pub(crate) async fn connect_via<F>(
        &self,
        host: &str,
        port: u16,
        password: &str,
        dial: F,
    ) -> Result<()>
    where
        F: Future<Output = io::Result<TcpStream>>,
    {
        if self.state() != ConnectionState::Disconnected {
            return Err(Error::AlreadyConnected);
        }
        if host.trim().is_empty() {
            return Err(Error::InvalidArgument("host is required".into()));
        }
        if port == 0 {
            return Err(Error::InvalidArgument("port must be non-zero".into()));
        }
        self.inner.config.validate()?;

        self.inner.begin_connect()?;
        info!("Connecting to {}:{}", host, port);

        let timeout = self.inner.config.connect_timeout;
        let stream = match tokio::time::timeout(timeout, dial).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                self.inner.abandon_connect();
                warn!("Failed to connect to {}:{}: {}", host, port, e);
                return Err(e.into());
            }
            Err(_) => {
                // dropping the dial future aborts the half-open socket
                self.inner.abandon_connect();
                warn!("Connect to {}:{} timed out after {:?}", host, port, timeout);
                return Err(Error::ConnectTimeout(timeout));
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay: {}", e);
        }
        let peer_addr = stream.peer_addr().ok();

        self.inner.buffer.clear();
        lock(&self.inner.decoder).reset();
        self.inner.stream.publish(stream).await;

        let promoted = {
            let mut state = lock(&self.inner.state);
            let connecting = *state == ConnectionState::Connecting;
            if connecting {
                *state = ConnectionState::Connected;
            }
            connecting
        };
        if !promoted {
            // closed while the handshake was in flight
            self.inner.stream.take().await;
            return Err(Error::Cancelled);
        }

        self.inner.info.publish(ConnectionInfo {
            host: host.to_string(),
            port,
            peer_addr,
            connected_at: SystemTime::now(),
        });

        self.inner.events.emit(ClientEvent::ConnectedChanged { connected: true });
        self.inner
            .events
            .status(StatusLevel::Info, format!("Connected to {}:{}", host, port));

        if !password.is_empty() {
            self.inner.send_line(&format!("auth {}", password)).await?;
        }

        self.start_polling();
        Ok(())
    }

    fn start_polling(&self) {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        if let Some(previous) = lock(&self.inner.poll_stop).replace(stop_tx) {
            let _ = previous.send(());
        }

        let inner = Arc::clone(&self.inner);
        let period = inner.config.poll_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = interval.tick() => {
                        if inner.poll_once().await == PollOutcome::Disconnected {
                            break;
                        }
                    }
                }
            }

            debug!("Poll loop stopped");
        });
    }

    /// Run one poll tick now.
    ///
    /// Returns `Skipped` without touching the buffer if another tick is in
    /// flight.
    pub async fn poll_once(&self) -> PollOutcome {
        self.inner.poll_once().await
    }

    /// Send one command line; a trailing newline is added if missing.
    ///
    /// Blank input is ignored with a warning. A write failure closes the
    /// connection, is reported as a status event and is returned.
    pub async fn send_command(&self, command: &str) -> Result<()> {
        self.inner.send_line(command).await
    }

    /// Stop polling and close the socket. Closing twice is harmless.
    pub async fn close(&self) {
        self.inner.close().await;
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.inner.stop_polling();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state())
            .field("info", &self.info())
            .finish()
    }
}
