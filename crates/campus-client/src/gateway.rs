//! WebSocket gateway transport.
//!
//! One background task owns the socket. It identifies with the bearer token,
//! pumps frames in both directions and reconnects after a fixed delay when
//! the connection drops. The session only ever sees [`TransportEvent`]s and
//! the non-blocking [`GatewayTransport::emit`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};

use campus_chat::{Transport, TransportEvent};
use campus_types::events::{GatewayCommand, GatewayEvent};

use crate::error::ClientError;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// `ws://` or `wss://` endpoint
    pub url: String,
    pub token: String,
    pub reconnect_delay: Duration,
}

impl GatewayConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Sending half handed to the session.
#[derive(Debug, Clone)]
pub struct GatewayTransport {
    outbound: mpsc::UnboundedSender<GatewayCommand>,
    connected: Arc<AtomicBool>,
}

impl GatewayTransport {
    /// Spawn the connection task. Events arrive on the returned receiver;
    /// the task exits once every transport clone is dropped.
    pub fn connect(
        config: GatewayConfig,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>, JoinHandle<()>) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (events, events_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(run(config, outbound_rx, events, connected.clone()));

        (Self { outbound, connected }, events_rx, task)
    }
}

impl Transport for GatewayTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn emit(&self, command: GatewayCommand) {
        if !self.is_connected() {
            trace!("Dropping command while offline: {:?}", command);
            return;
        }
        if self.outbound.send(command).is_err() {
            debug!("Gateway task gone; command dropped");
        }
    }
}

/// Why a connection ended.
enum Exit {
    /// Every transport handle was dropped
    Closed,
    /// Socket failed or the server hung up
    Dropped,
}

async fn run(
    config: GatewayConfig,
    mut outbound: mpsc::UnboundedReceiver<GatewayCommand>,
    events: mpsc::UnboundedSender<TransportEvent>,
    connected: Arc<AtomicBool>,
) {
    loop {
        let exit = match session(&config, &mut outbound, &events, &connected).await {
            Ok(exit) => exit,
            Err(e) => {
                warn!("Gateway connection failed: {}", e);
                Exit::Dropped
            }
        };

        if connected.swap(false, Ordering::AcqRel) {
            let _ = events.send(TransportEvent::Disconnected);
        }

        // Commands queued against the dead socket must not replay later
        let mut stale = 0;
        while outbound.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            debug!(stale, "Discarded commands queued before disconnect");
        }

        match exit {
            Exit::Closed => break,
            Exit::Dropped => {
                if events.is_closed() {
                    break;
                }
                info!("Reconnecting to gateway in {:?}", config.reconnect_delay);
                tokio::time::sleep(config.reconnect_delay).await;
            }
        }
    }
    info!("Gateway task stopped");
}

async fn session(
    config: &GatewayConfig,
    outbound: &mut mpsc::UnboundedReceiver<GatewayCommand>,
    events: &mpsc::UnboundedSender<TransportEvent>,
    connected: &AtomicBool,
) -> Result<Exit, ClientError> {
    let (ws_stream, _) = connect_async(config.url.as_str()).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    let identify = GatewayCommand::Identify {
        token: config.token.clone(),
    };
    ws_tx
        .send(Message::Text(serde_json::to_string(&identify)?.into()))
        .await?;

    info!(url = %config.url, "Gateway connected");
    connected.store(true, Ordering::Release);
    let _ = events.send(TransportEvent::Connected);

    loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<GatewayEvent>(&text) {
                    Ok(event) => {
                        trace!("Gateway event: {:?}", event);
                        if events.send(TransportEvent::Event(event)).is_err() {
                            return Ok(Exit::Closed);
                        }
                    }
                    Err(e) => warn!(
                        "Malformed gateway event: {} -- raw: {}",
                        e,
                        excerpt(&text)
                    ),
                },
                Some(Ok(Message::Close(_))) | None => {
                    info!("Gateway closed the connection");
                    return Ok(Exit::Dropped);
                }
                // Pings are answered by tungstenite on the next flush
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
            command = outbound.recv() => match command {
                Some(command) => {
                    let text = serde_json::to_string(&command)?;
                    ws_tx.send(Message::Text(text.into())).await?;
                }
                None => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    return Ok(Exit::Closed);
                }
            },
        }
    }
}

/// First 200 characters of a frame, for logs.
fn excerpt(text: &str) -> &str {
    let end = text.char_indices().nth(200).map_or(text.len(), |(i, _)| i);
    &text[..end]
}
