//! WebSocket relay and client using `tokio-tungstenite`.
//!
//! The relay is the server half of the update channel: clients connect,
//! send one `Subscribe` frame naming a room, get a `Subscribed` ack, and from
//! then on receive an `Update` frame for every record the store publishes
//! through a [`RelayHandle`].

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fourline_protocol::{ChannelFrame, Codec, JsonCodec, RoomCode, SessionRecord};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{ChannelError, Publisher, UpdateChannel, UpdateStream};

/// Counter for relay-side subscriber IDs.
static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

type ClientStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<TcpStream>,
>;

fn io_error(kind: std::io::ErrorKind, e: tungstenite::Error) -> std::io::Error {
    std::io::Error::new(kind, e)
}

fn frame_kind(frame: &ChannelFrame) -> &'static str {
    match frame {
        ChannelFrame::Subscribe { .. } => "Subscribe",
        ChannelFrame::Subscribed { .. } => "Subscribed",
        ChannelFrame::Update { .. } => "Update",
    }
}

// ---------------------------------------------------------------------------
// Frame I/O
// ---------------------------------------------------------------------------

async fn send_frame<S>(sink: &mut S, frame: &ChannelFrame) -> Result<(), ChannelError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let bytes = JsonCodec.encode(frame)?;
    sink.send(Message::Binary(bytes.into())).await.map_err(|e| {
        ChannelError::SendFailed(io_error(std::io::ErrorKind::BrokenPipe, e))
    })
}

/// Reads the next frame, skipping control messages.
///
/// Returns `Ok(None)` on a clean close.
async fn read_frame<S>(source: &mut S) -> Result<Option<ChannelFrame>, ChannelError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        match source.next().await {
            Some(Ok(Message::Binary(data))) => {
                return Ok(Some(JsonCodec.decode(&data)?));
            }
            Some(Ok(Message::Text(text))) => {
                return Ok(Some(JsonCodec.decode(text.as_bytes())?));
            }
            Some(Ok(Message::Close(_))) | None => return Ok(None),
            Some(Ok(_)) => continue, // ping/pong/frame
            Some(Err(e)) => {
                return Err(ChannelError::ReceiveFailed(io_error(
                    std::io::ErrorKind::ConnectionReset,
                    e,
                )));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Relay (server side)
// ---------------------------------------------------------------------------

type RoomSubscribers = HashMap<RoomCode, Vec<(u64, mpsc::UnboundedSender<Message>)>>;

#[derive(Default)]
struct Registry {
    rooms: Mutex<RoomSubscribers>,
}

impl Registry {
    fn rooms(&self) -> MutexGuard<'_, RoomSubscribers> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, room_code: &RoomCode, id: u64, tx: mpsc::UnboundedSender<Message>) {
        self.rooms().entry(room_code.clone()).or_default().push((id, tx));
    }

    fn unregister(&self, room_code: &RoomCode, id: u64) {
        let mut rooms = self.rooms();
        if let Some(subs) = rooms.get_mut(room_code) {
            subs.retain(|(sub_id, _)| *sub_id != id);
            if subs.is_empty() {
                rooms.remove(room_code);
            }
        }
    }
}

/// Removes a subscriber from the registry when its connection task exits.
struct Registration {
    registry: Arc<Registry>,
    room_code: RoomCode,
    id: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.unregister(&self.room_code, self.id);
    }
}

/// A WebSocket server that fans published records out to subscribers.
pub struct WebSocketRelay {
    listener: TcpListener,
    registry: Arc<Registry>,
}

impl WebSocketRelay {
    /// Binds a relay to the given address.
    pub async fn bind(addr: &str) -> Result<Self, ChannelError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(ChannelError::AcceptFailed)?;
        tracing::info!(addr, "update relay listening");
        Ok(Self {
            listener,
            registry: Arc::new(Registry::default()),
        })
    }

    /// Returns the local address the relay is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// A publisher feeding this relay. Take it before calling
    /// [`run`](Self::run).
    pub fn handle(&self) -> RelayHandle {
        RelayHandle {
            registry: Arc::clone(&self.registry),
        }
    }

    /// Runs the accept loop until the process exits.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let registry = Arc::clone(&self.registry);
                    tokio::spawn(async move {
                        if let Err(e) = serve_subscriber(stream, addr, registry).await {
                            tracing::debug!(%addr, error = %e, "subscriber ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

async fn serve_subscriber(
    stream: TcpStream,
    addr: SocketAddr,
    registry: Arc<Registry>,
) -> Result<(), ChannelError> {
    let ws = tokio_tungstenite::accept_async(stream).await.map_err(|e| {
        ChannelError::AcceptFailed(io_error(std::io::ErrorKind::ConnectionRefused, e))
    })?;
    let (mut sink, mut source) = ws.split();

    let room_code = match read_frame(&mut source).await? {
        Some(ChannelFrame::Subscribe { room_code }) => room_code,
        Some(other) => {
            return Err(ChannelError::UnexpectedFrame(format!(
                "expected Subscribe, got {}",
                frame_kind(&other)
            )));
        }
        None => return Ok(()),
    };

    let id = NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed);
    let (tx, mut rx) = mpsc::unbounded_channel();
    registry.register(&room_code, id, tx);
    let _registration = Registration {
        registry,
        room_code: room_code.clone(),
        id,
    };
    send_frame(
        &mut sink,
        &ChannelFrame::Subscribed {
            room_code: room_code.clone(),
        },
    )
    .await?;
    tracing::debug!(id, %addr, %room_code, "relay subscriber registered");

    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Some(msg) => sink.send(msg).await.map_err(|e| {
                    ChannelError::SendFailed(io_error(std::io::ErrorKind::BrokenPipe, e))
                })?,
                None => break,
            },
            inbound = source.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // subscribers only listen
                Some(Err(e)) => {
                    return Err(ChannelError::ReceiveFailed(io_error(
                        std::io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            },
        }
    }

    tracing::debug!(id, %room_code, "relay subscriber left");
    Ok(())
}

/// Publishes records to the subscribers of a [`WebSocketRelay`].
#[derive(Clone)]
pub struct RelayHandle {
    registry: Arc<Registry>,
}

impl RelayHandle {
    /// Number of connected subscribers of `room_code`.
    pub fn subscriber_count(&self, room_code: &RoomCode) -> usize {
        self.registry.rooms().get(room_code).map_or(0, Vec::len)
    }
}

impl Publisher for RelayHandle {
    fn publish(&self, record: &SessionRecord) {
        let frame = ChannelFrame::Update {
            record: record.clone(),
        };
        let bytes = match JsonCodec.encode(&frame) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode update");
                return;
            }
        };
        let msg = Message::Binary(bytes.into());

        let mut rooms = self.registry.rooms();
        if let Some(subs) = rooms.get_mut(&record.room_code) {
            subs.retain(|(_, tx)| tx.send(msg.clone()).is_ok());
        }
    }
}

// ---------------------------------------------------------------------------
// Client side
// ---------------------------------------------------------------------------

/// An [`UpdateChannel`] that subscribes through a [`WebSocketRelay`].
#[derive(Debug, Clone)]
pub struct WebSocketChannel {
    url: String,
}

impl WebSocketChannel {
    /// Creates a channel pointing at a relay, e.g. `ws://127.0.0.1:9000`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl UpdateChannel for WebSocketChannel {
    type Stream = RelayStream;

    async fn open(&self, room_code: &RoomCode) -> Result<RelayStream, ChannelError> {
        let (mut ws, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| {
                ChannelError::ConnectFailed(io_error(std::io::ErrorKind::ConnectionRefused, e))
            })?;

        send_frame(
            &mut ws,
            &ChannelFrame::Subscribe {
                room_code: room_code.clone(),
            },
        )
        .await?;

        match read_frame(&mut ws).await? {
            Some(ChannelFrame::Subscribed { room_code: acked }) if acked == *room_code => {
                Ok(RelayStream { ws })
            }
            Some(other) => Err(ChannelError::UnexpectedFrame(format!(
                "expected Subscribed, got {}",
                frame_kind(&other)
            ))),
            None => Err(ChannelError::Closed),
        }
    }
}

/// Client end of a relay subscription.
pub struct RelayStream {
    ws: ClientStream,
}

impl UpdateStream for RelayStream {
    async fn recv(&mut self) -> Result<Option<SessionRecord>, ChannelError> {
        loop {
            match read_frame(&mut self.ws).await? {
                Some(ChannelFrame::Update { record }) => return Ok(Some(record)),
                Some(ChannelFrame::Subscribed { .. }) => continue,
                Some(other) => {
                    return Err(ChannelError::UnexpectedFrame(
                        frame_kind(&other).to_string(),
                    ));
                }
                None => return Ok(None),
            }
        }
    }
}
