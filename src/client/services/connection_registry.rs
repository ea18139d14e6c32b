use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::client::error::ConnectionError;
use crate::client::models::frames::OutboundFrame;
use crate::client::models::messages::ThreadId;

/// One logical websocket: the global notification feed or the chat of one
/// open thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelKey {
    Notifications,
    Thread(ThreadId),
}

impl ChannelKey {
    pub fn thread_id(&self) -> Option<&str> {
        match self {
            ChannelKey::Notifications => None,
            ChannelKey::Thread(id) => Some(id.as_str()),
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKey::Notifications => write!(f, "notifications"),
            ChannelKey::Thread(id) => write!(f, "chat:{}", id),
        }
    }
}

/// `Idle -> Connecting -> Open -> (Closed -> Connecting) | Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Connecting,
    Open,
    /// Dropped unexpectedly, waiting for the reconnect timer.
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    Frame { channel: ChannelKey, text: String },
    StateChanged { channel: ChannelKey, state: ChannelState },
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub connect_debounce: Duration,
    pub reconnect_delay: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            connect_debounce: Duration::from_millis(100),
            reconnect_delay: Duration::from_secs(3),
        }
    }
}

/// A live bidirectional text stream.
#[async_trait]
pub trait Transport: Send {
    async fn send_text(&mut self, text: String) -> Result<(), ConnectionError>;
    /// `None` once the peer has closed the stream. Must be cancel safe.
    async fn next_text(&mut self) -> Option<Result<String, ConnectionError>>;
    async fn close(&mut self);
}

#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Transport>, ConnectionError>;
}

/// Production connector backed by tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Transport>, ConnectionError> {
        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| ConnectionError::ConnectFailed(format!("Failed to connect: {}", e)))?;
        Ok(Box::new(WsTransport { stream }))
    }
}

struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), ConnectionError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| ConnectionError::SendFailed(e.to_string()))
    }

    async fn next_text(&mut self) -> Option<Result<String, ConnectionError>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text)),
                Some(Ok(Message::Close(_))) | None => return None,
                // binary, ping, pong
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Some(Err(ConnectionError::Closed(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("[WS:REGISTRY] close handshake failed: {}", e);
        }
    }
}

struct ChannelSlot {
    outbound: mpsc::UnboundedSender<String>,
    state: watch::Receiver<ChannelState>,
    shutdown: Option<oneshot::Sender<()>>,
    attempts: Arc<AtomicU32>,
    worker: JoinHandle<()>,
}

/// Single owner of every socket. At most one live connection per
/// [`ChannelKey`]; inbound text is forwarded on the event receiver handed
/// out by [`ConnectionRegistry::init`].
#[derive(Clone)]
pub struct ConnectionRegistry {
    config: RegistryConfig,
    connector: Arc<dyn Connector>,
    events: mpsc::UnboundedSender<RegistryEvent>,
    channels: Arc<Mutex<HashMap<ChannelKey, ChannelSlot>>>,
}

impl ConnectionRegistry {
    pub fn init(
        config: RegistryConfig,
        connector: Arc<dyn Connector>,
    ) -> (Self, mpsc::UnboundedReceiver<RegistryEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let registry = Self {
            config,
            connector,
            events,
            channels: Arc::new(Mutex::new(HashMap::new())),
        };
        (registry, rx)
    }

    /// First call wins: returns `false` when the channel is already
    /// pending or open.
    pub async fn connect(&self, channel: ChannelKey, url: Url) -> bool {
        let mut channels = self.channels.lock().await;
        if channels.contains_key(&channel) {
            debug!("[WS:REGISTRY] {} already registered, ignoring connect", channel);
            return false;
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ChannelState::Connecting);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let attempts = Arc::new(AtomicU32::new(0));

        let worker = ChannelWorker {
            channel: channel.clone(),
            url,
            config: self.config.clone(),
            connector: self.connector.clone(),
            events: self.events.clone(),
            state: state_tx,
            attempts: attempts.clone(),
            channels: self.channels.clone(),
        };
        let handle = tokio::spawn(worker.run(outbound_rx, shutdown_rx));

        let _ = self.events.send(RegistryEvent::StateChanged {
            channel: channel.clone(),
            state: ChannelState::Connecting,
        });
        channels.insert(
            channel,
            ChannelSlot {
                outbound: outbound_tx,
                state: state_rx,
                shutdown: Some(shutdown_tx),
                attempts,
                worker: handle,
            },
        );
        true
    }

    /// Closes and unregisters the channel. Any pending debounce or
    /// reconnect timer is cancelled with it.
    pub async fn disconnect(&self, channel: &ChannelKey) -> bool {
        let slot = self.channels.lock().await.remove(channel);
        let Some(mut slot) = slot else {
            return false;
        };
        if let Some(shutdown) = slot.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = slot.worker.await {
            warn!("[WS:REGISTRY] worker for {} ended abnormally: {}", channel, e);
        }
        info!("[WS:REGISTRY] {} disconnected", channel);
        true
    }

    pub async fn teardown(&self) {
        let keys: Vec<ChannelKey> = self.channels.lock().await.keys().cloned().collect();
        for key in keys {
            self.disconnect(&key).await;
        }
    }

    /// Fire-and-forget write on an open channel.
    pub async fn send(&self, channel: &ChannelKey, frame: &OutboundFrame) -> Result<(), ConnectionError> {
        let channels = self.channels.lock().await;
        let slot = channels
            .get(channel)
            .ok_or_else(|| ConnectionError::NotConnected(channel.to_string()))?;
        if *slot.state.borrow() != ChannelState::Open {
            return Err(ConnectionError::NotConnected(channel.to_string()));
        }
        let text = frame
            .to_json()
            .map_err(|e| ConnectionError::SendFailed(format!("Failed to serialize frame: {}", e)))?;
        slot.outbound
            .send(text)
            .map_err(|_| ConnectionError::SendFailed(format!("{} worker stopped", channel)))
    }

    pub async fn state(&self, channel: &ChannelKey) -> ChannelState {
        match self.channels.lock().await.get(channel) {
            Some(slot) => *slot.state.borrow(),
            None => ChannelState::Idle,
        }
    }

    pub async fn connection_attempts(&self, channel: &ChannelKey) -> u32 {
        self.channels
            .lock()
            .await
            .get(channel)
            .map(|slot| slot.attempts.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub async fn channels(&self) -> Vec<ChannelKey> {
        self.channels.lock().await.keys().cloned().collect()
    }
}

enum PumpExit {
    Shutdown,
    Dropped,
    /// Nobody consumes events any more; the worker retires itself.
    Abandoned,
}

struct ChannelWorker {
    channel: ChannelKey,
    url: Url,
    config: RegistryConfig,
    connector: Arc<dyn Connector>,
    events: mpsc::UnboundedSender<RegistryEvent>,
    state: watch::Sender<ChannelState>,
    attempts: Arc<AtomicU32>,
    channels: Arc<Mutex<HashMap<ChannelKey, ChannelSlot>>>,
}

impl ChannelWorker {
    async fn run(
        self,
        mut outbound: mpsc::UnboundedReceiver<String>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        // Debounce: rapid connect/disconnect churn never dials.
        tokio::select! {
            _ = &mut shutdown => {
                self.set_state(ChannelState::Idle);
                return;
            }
            _ = tokio::time::sleep(self.config.connect_debounce) => {}
        }

        loop {
            self.set_state(ChannelState::Connecting);
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            debug!("[WS:REGISTRY] {} dialing (attempt {})", self.channel, attempt);

            let dialed = tokio::select! {
                _ = &mut shutdown => {
                    self.set_state(ChannelState::Idle);
                    return;
                }
                dialed = self.connector.connect(&self.url) => dialed,
            };

            match dialed {
                Ok(mut transport) => {
                    info!("[WS:REGISTRY] {} connected", self.channel);
                    self.set_state(ChannelState::Open);
                    let exit = self.pump(transport.as_mut(), &mut outbound, &mut shutdown).await;
                    transport.close().await;
                    match exit {
                        PumpExit::Shutdown => {
                            self.set_state(ChannelState::Idle);
                            return;
                        }
                        PumpExit::Abandoned => {
                            self.set_state(ChannelState::Idle);
                            self.release().await;
                            return;
                        }
                        PumpExit::Dropped => {}
                    }
                }
                Err(e) => {
                    warn!("[WS:REGISTRY] {} connection attempt {} failed: {}", self.channel, attempt, e);
                }
            }

            self.set_state(ChannelState::Closed);
            let mut dropped = 0usize;
            while outbound.try_recv().is_ok() {
                dropped += 1;
            }
            if dropped > 0 {
                warn!("[WS:REGISTRY] {} discarded {} unsent frame(s)", self.channel, dropped);
            }

            info!("[WS:REGISTRY] {} reconnecting in {:?}", self.channel, self.config.reconnect_delay);
            tokio::select! {
                _ = &mut shutdown => {
                    self.set_state(ChannelState::Idle);
                    return;
                }
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }
    }

    async fn pump(
        &self,
        transport: &mut dyn Transport,
        outbound: &mut mpsc::UnboundedReceiver<String>,
        shutdown: &mut oneshot::Receiver<()>,
    ) -> PumpExit {
        loop {
            tokio::select! {
                _ = &mut *shutdown => return PumpExit::Shutdown,
                frame = outbound.recv() => match frame {
                    Some(text) => {
                        if let Err(e) = transport.send_text(text).await {
                            warn!("[WS:REGISTRY] {} send failed, forcing close: {}", self.channel, e);
                            return PumpExit::Dropped;
                        }
                    }
                    None => return PumpExit::Shutdown,
                },
                inbound = transport.next_text() => match inbound {
                    Some(Ok(text)) => {
                        let event = RegistryEvent::Frame { channel: self.channel.clone(), text };
                        if self.events.send(event).is_err() {
                            debug!("[WS:REGISTRY] event receiver dropped, stopping {}", self.channel);
                            return PumpExit::Abandoned;
                        }
                    }
                    Some(Err(e)) => {
                        warn!("[WS:REGISTRY] {} socket error, forcing close: {}", self.channel, e);
                        return PumpExit::Dropped;
                    }
                    None => {
                        info!("[WS:REGISTRY] {} closed by server", self.channel);
                        return PumpExit::Dropped;
                    }
                },
            }
        }
    }

    /// Unregisters this worker's slot, unless it was already replaced.
    async fn release(&self) {
        let mut channels = self.channels.lock().await;
        let ours = channels
            .get(&self.channel)
            .map(|slot| Arc::ptr_eq(&slot.attempts, &self.attempts))
            .unwrap_or(false);
        if ours {
            channels.remove(&self.channel);
            info!("[WS:REGISTRY] {} released, no event consumer left", self.channel);
        }
    }

    fn set_state(&self, state: ChannelState) {
        if *self.state.borrow() == state {
            return;
        }
        self.state.send_replace(state);
        let _ = self.events.send(RegistryEvent::StateChanged {
            channel: self.channel.clone(),
            state,
        });
    }
}
