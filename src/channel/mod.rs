//! Client for the storefront's realtime delivery gateway.
//!
//! The gateway pushes status and courier-location events into rooms scoped to
//! one order or one courier. `TcpChannel` keeps a background connection task
//! alive, reconnects with jittered backoff when the transport drops, and
//! re-announces every joined room after reconnecting so updates keep flowing.

pub mod wire;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use rand::Rng;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ChannelError;

pub use wire::{
    ClientFrame, CourierAssignment, CourierPing, GatewayEvent, RawFrame, StatusUpdate,
};

/// Buffered events per subscriber before slow consumers start lagging.
const EVENT_BUFFER: usize = 256;
/// Random delay spread before each reconnect attempt.
const RECONNECT_MAX_JITTER_MS: u64 = 1_000;

/// Type alias for a dynamic channel trait object wrapped in Arc.
pub type DynChannel = Arc<dyn Channel>;

/// A subscription scope on the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Room {
    Order(String),
    Courier(String),
}

impl Room {
    fn join_frame(&self) -> ClientFrame {
        match self {
            Self::Order(number) => ClientFrame::JoinOrderRoom(number.clone()),
            Self::Courier(id) => ClientFrame::JoinPilotRoom(id.clone()),
        }
    }

    fn leave_frame(&self) -> ClientFrame {
        match self {
            Self::Order(number) => ClientFrame::LeaveOrderRoom(number.clone()),
            Self::Courier(id) => ClientFrame::LeavePilotRoom(id.clone()),
        }
    }
}

/// Gateway abstraction supporting both the real TCP client and a logging
/// stand-in for dry runs.
#[async_trait::async_trait]
pub trait Channel: Send + Sync + fmt::Debug {
    /// Announce interest in a room. The room stays joined across reconnects
    /// until `leave` is called.
    async fn join(&self, room: Room) -> Result<(), ChannelError>;

    /// Retract interest in a room.
    async fn leave(&self, room: Room) -> Result<(), ChannelError>;

    /// Fire a client event at the gateway.
    async fn emit(&self, frame: ClientFrame) -> Result<(), ChannelError>;

    /// A new consumer of typed gateway events.
    fn subscribe(&self) -> broadcast::Receiver<GatewayEvent>;
}

#[derive(Debug)]
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Real gateway client over newline-delimited JSON frames on TCP.
#[derive(Debug)]
pub struct TcpChannel {
    outbound_tx: mpsc::UnboundedSender<ClientFrame>,
    events_tx: broadcast::Sender<GatewayEvent>,
    rooms: Arc<Mutex<HashSet<Room>>>,
    _task: AbortOnDrop,
}

impl TcpChannel {
    /// Connect to the gateway and spawn the connection task. The initial
    /// connection is retried with backoff before giving up.
    pub async fn connect(addr: impl Into<String>) -> Result<Self, ChannelError> {
        let addr = addr.into();

        let stream = (|| async { TcpStream::connect(&addr).await })
            .retry(ExponentialBuilder::default())
            .await?;
        info!("Connected to delivery gateway at {addr}");

        let (events_tx, _) = broadcast::channel(EVENT_BUFFER);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let rooms = Arc::new(Mutex::new(HashSet::new()));

        let task = tokio::spawn(connection_task(
            addr,
            stream,
            events_tx.clone(),
            outbound_rx,
            Arc::clone(&rooms),
        ));

        Ok(Self {
            outbound_tx,
            events_tx,
            rooms,
            _task: AbortOnDrop(task),
        })
    }

    fn send(&self, frame: ClientFrame) -> Result<(), ChannelError> {
        self.outbound_tx
            .send(frame)
            .map_err(|_| ChannelError::Closed)
    }
}

#[async_trait::async_trait]
impl Channel for TcpChannel {
    async fn join(&self, room: Room) -> Result<(), ChannelError> {
        self.rooms.lock().await.insert(room.clone());
        self.send(room.join_frame())
    }

    async fn leave(&self, room: Room) -> Result<(), ChannelError> {
        self.rooms.lock().await.remove(&room);
        self.send(room.leave_frame())
    }

    async fn emit(&self, frame: ClientFrame) -> Result<(), ChannelError> {
        self.send(frame)
    }

    fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.events_tx.subscribe()
    }
}

enum DriveEnd {
    Disconnected,
    HandleDropped,
}

async fn connection_task(
    addr: String,
    first: TcpStream,
    events_tx: broadcast::Sender<GatewayEvent>,
    mut outbound_rx: mpsc::UnboundedReceiver<ClientFrame>,
    rooms: Arc<Mutex<HashSet<Room>>>,
) {
    let mut stream = Some(first);

    loop {
        let current = match stream.take() {
            Some(established) => established,
            None => {
                let jitter = rand::thread_rng().gen_range(0..RECONNECT_MAX_JITTER_MS);
                tokio::time::sleep(Duration::from_millis(jitter)).await;

                match (|| async { TcpStream::connect(&addr).await })
                    .retry(ExponentialBuilder::default().with_max_times(usize::MAX))
                    .await
                {
                    Ok(reconnected) => {
                        info!("Reconnected to delivery gateway at {addr}");
                        reconnected
                    }
                    Err(e) => {
                        warn!("Gateway reconnect failed permanently: {e}");
                        return;
                    }
                }
            }
        };

        let (read_half, mut write_half) = current.into_split();

        // Re-announce every joined room. Losing this after a reconnect would
        // silently stop all updates for the tracked order.
        if announce_rooms(&mut write_half, &rooms).await.is_err() {
            warn!("Gateway connection lost while re-joining rooms");
            continue;
        }

        match drive(read_half, write_half, &events_tx, &mut outbound_rx).await {
            DriveEnd::HandleDropped => return,
            DriveEnd::Disconnected => {
                warn!("Disconnected from delivery gateway, reconnecting");
            }
        }
    }
}

async fn announce_rooms(
    write_half: &mut OwnedWriteHalf,
    rooms: &Mutex<HashSet<Room>>,
) -> Result<(), ChannelError> {
    let snapshot: Vec<Room> = rooms.lock().await.iter().cloned().collect();
    for room in snapshot {
        write_frame(write_half, &room.join_frame()).await?;
    }
    Ok(())
}

async fn drive(
    read_half: OwnedReadHalf,
    mut write_half: OwnedWriteHalf,
    events_tx: &broadcast::Sender<GatewayEvent>,
    outbound_rx: &mut mpsc::UnboundedReceiver<ClientFrame>,
) -> DriveEnd {
    let mut lines = BufReader::new(read_half).lines();

    loop {
        tokio::select! {
            line = next_line(&mut lines) => match line {
                Some(line) => dispatch_line(&line, events_tx),
                None => return DriveEnd::Disconnected,
            },
            frame = outbound_rx.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = write_frame(&mut write_half, &frame).await {
                        warn!("Gateway write failed: {e}");
                        return DriveEnd::Disconnected;
                    }
                }
                None => return DriveEnd::HandleDropped,
            },
        }
    }
}

async fn next_line(lines: &mut Lines<BufReader<OwnedReadHalf>>) -> Option<String> {
    match lines.next_line().await {
        Ok(line) => line,
        Err(e) => {
            warn!("Gateway read failed: {e}");
            None
        }
    }
}

/// Decode one wire line and fan the typed event out to subscribers. Malformed
/// frames and unknown event names are dropped, keeping the connection alive.
fn dispatch_line(line: &str, events_tx: &broadcast::Sender<GatewayEvent>) {
    let frame = match RawFrame::decode(line) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Malformed gateway frame: {e}");
            return;
        }
    };

    let name = frame.event.clone();
    match frame.into_event() {
        Ok(Some(event)) => {
            // Send fails only when nobody is subscribed.
            let _ = events_tx.send(event);
        }
        Ok(None) => debug!("Ignoring unknown gateway event: {name}"),
        Err(e) => warn!("Malformed {name} payload: {e}"),
    }
}

async fn write_frame(
    write_half: &mut OwnedWriteHalf,
    frame: &ClientFrame,
) -> Result<(), ChannelError> {
    let mut line = frame.encode()?;
    line.push('\n');
    write_half.write_all(line.as_bytes()).await?;
    Ok(())
}

/// Mock channel for dry-run mode: logs every frame instead of sending it and
/// never produces events.
#[derive(Debug, Clone)]
pub struct LogChannel {
    emitted: Arc<AtomicU64>,
    events_tx: broadcast::Sender<GatewayEvent>,
}

impl LogChannel {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            emitted: Arc::new(AtomicU64::new(0)),
            events_tx,
        }
    }

    pub fn emitted_count(&self) -> u64 {
        self.emitted.load(Ordering::SeqCst)
    }
}

impl Default for LogChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Channel for LogChannel {
    async fn join(&self, room: Room) -> Result<(), ChannelError> {
        warn!("[DRY-RUN] Would join {room:?}");
        Ok(())
    }

    async fn leave(&self, room: Room) -> Result<(), ChannelError> {
        warn!("[DRY-RUN] Would leave {room:?}");
        Ok(())
    }

    async fn emit(&self, frame: ClientFrame) -> Result<(), ChannelError> {
        self.emitted.fetch_add(1, Ordering::SeqCst);
        warn!("[DRY-RUN] Would emit {}: {}", frame.event(), frame.encode()?);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.events_tx.subscribe()
    }
}
