//! The concurrent send/receive pipeline.
//!
//! Four tasks share two bounded queues:
//!
//! - **receiver** reads datagrams, decodes every frame and pushes messages
//!   onto the inbound queue;
//! - **ticker** pushes a tick onto the inbound queue, immediately and then
//!   once per heartbeat interval;
//! - **dispatcher** drains the inbound queue into the [`Connection`] state
//!   machine, enqueues what it asks for and notifies the observer;
//! - **writer** drains the outbound queue one message at a time, pacing
//!   writes so the light can keep up.
//!
//! Only the dispatcher touches the state machine. Each task is abortable and
//! [`Pipeline::shutdown`] waits for all of them to stop.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::channel::mpsc;
use futures::future::{AbortHandle, Abortable, Aborted};
use futures::{SinkExt, StreamExt};
use log::{debug, error, trace, warn};

use crate::config::Config;
use crate::errors::Error;
use crate::event::Observer;
use crate::history::{Direction, MessageHistory};
use crate::message::Message;
use crate::registry::MessageRegistry;
use crate::runtime::{self, AsyncUdpSocket, JoinHandle, Mutex, UdpSocket};
use crate::state::{Connection, DeviceState};

type Result<T> = std::result::Result<T, Error>;

/// Large enough for several concatenated maximum-size frames.
const RECV_BUFFER: usize = 2048;

/// Upper bound on waiting for an aborted task to wind down.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Work for the dispatcher.
#[derive(Debug)]
pub(crate) enum Input {
    Message(Message),
    Tick,
}

/// A message waiting to be written, with its failed write count.
#[derive(Debug)]
pub(crate) struct Outbound {
    message: Message,
    attempts: u32,
}

impl Outbound {
    pub(crate) fn new(message: Message) -> Self {
        Outbound {
            message,
            attempts: 0,
        }
    }
}

/// State that outlives a single pipeline and survives reconnects.
#[derive(Clone)]
pub(crate) struct Shared {
    pub registry: Arc<MessageRegistry>,
    pub observer: Arc<Mutex<Box<dyn Observer>>>,
    pub snapshot: Arc<Mutex<DeviceState>>,
    pub history: Arc<Mutex<MessageHistory>>,
}

struct Task {
    name: &'static str,
    abort: AbortHandle,
    join: JoinHandle<std::result::Result<(), Aborted>>,
}

fn spawn_task<F>(name: &'static str, future: F) -> Task
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let (abort, registration) = AbortHandle::new_pair();
    let join = runtime::spawn(Abortable::new(future, registration));
    Task { name, abort, join }
}

/// One running connection: a socket pair, two queues and four tasks.
pub(crate) struct Pipeline {
    outbound: mpsc::Sender<Outbound>,
    local_addr: SocketAddr,
    tasks: Vec<Task>,
}

impl Pipeline {
    /// Open the sockets and start all four tasks.
    ///
    /// Socket setup is the only failure surfaced to the caller.
    pub(crate) async fn start(config: &Config, shared: Shared) -> Result<Self> {
        let unspecified = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);
        let tx = UdpSocket::bind(unspecified)
            .await
            .map_err(|e| Error::socket("bind", e))?;
        tx.connect(config.device_addr())
            .await
            .map_err(|e| Error::socket("connect", e))?;

        let rx = UdpSocket::bind(config.listen_addr())
            .await
            .map_err(|e| Error::socket("bind listener", e))?;
        let local_addr = rx
            .local_addr()
            .map_err(|e| Error::socket("local_addr", e))?;

        let (out_tx, out_rx) = mpsc::channel(config.queue_capacity);
        let (in_tx, in_rx) = mpsc::channel(config.queue_capacity);

        debug!(
            "Starting pipeline: device {}, listening on {}",
            config.device_addr(),
            local_addr
        );

        let connection = Connection::new(config.client_ip, config.heartbeat_timeout());
        let tasks = vec![
            spawn_task(
                "receiver",
                receive_loop(
                    rx,
                    config.device_ip,
                    Arc::clone(&shared.registry),
                    Arc::clone(&shared.history),
                    in_tx.clone(),
                ),
            ),
            spawn_task(
                "writer",
                write_loop(
                    tx,
                    out_rx,
                    out_tx.clone(),
                    WritePolicy {
                        interval: config.write_interval(),
                        max_retries: config.max_write_retries,
                    },
                    Arc::clone(&shared.history),
                ),
            ),
            spawn_task("ticker", tick_loop(in_tx, config.heartbeat_interval())),
            spawn_task(
                "dispatcher",
                dispatch_loop(connection, in_rx, out_tx.clone(), shared),
            ),
        ];

        Ok(Pipeline {
            outbound: out_tx,
            local_addr,
            tasks,
        })
    }

    pub(crate) fn sender(&self) -> mpsc::Sender<Outbound> {
        self.outbound.clone()
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop every task and wait for it to exit.
    pub(crate) async fn shutdown(mut self) {
        let tasks = std::mem::take(&mut self.tasks);
        for task in &tasks {
            task.abort.abort();
        }
        for task in tasks {
            match runtime::timeout(SHUTDOWN_TIMEOUT, task.join).await {
                Ok(Ok(())) => debug!("{} task finished", task.name),
                Ok(Err(Aborted)) => trace!("{} task aborted", task.name),
                Err(_) => warn!("{} task did not stop within {:?}", task.name, SHUTDOWN_TIMEOUT),
            }
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort.abort();
        }
    }
}

fn from_device(src: SocketAddr, device_ip: Ipv4Addr) -> bool {
    src.ip() == IpAddr::V4(device_ip)
}

async fn receive_loop(
    socket: UdpSocket,
    device_ip: Ipv4Addr,
    registry: Arc<MessageRegistry>,
    history: Arc<Mutex<MessageHistory>>,
    mut inbound: mpsc::Sender<Input>,
) {
    let mut buffer = [0u8; RECV_BUFFER];
    loop {
        let (size, src) = match socket.recv_from(&mut buffer).await {
            Ok(received) => received,
            Err(e) => {
                error!("Error reading from UDP: {e}");
                history.lock().await.record_error(&e.to_string());
                continue;
            }
        };

        if !from_device(src, device_ip) {
            warn!("Received message from unexpected source: {src}");
            continue;
        }

        for result in registry.parse_all(&buffer[..size]) {
            match result {
                Ok(message) => {
                    trace!("Received {message:?}");
                    history.lock().await.record(Direction::Inbound, &message);
                    if inbound.send(Input::Message(message)).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!("Error parsing message ({:?}): {e}", e.kind());
                    history.lock().await.record_error(&e.to_string());
                }
            }
        }
    }
}

struct WritePolicy {
    interval: Duration,
    max_retries: u32,
}

async fn write_loop(
    socket: UdpSocket,
    mut queue: mpsc::Receiver<Outbound>,
    mut requeue: mpsc::Sender<Outbound>,
    policy: WritePolicy,
    history: Arc<Mutex<MessageHistory>>,
) {
    while let Some(item) = queue.next().await {
        let bytes = match item.message.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Error serializing {}: {e}", item.message.name());
                continue;
            }
        };

        match socket.send(&bytes).await {
            Ok(_) => {
                trace!("Sent {:?}", item.message);
                history
                    .lock()
                    .await
                    .record(Direction::Outbound, &item.message);
                runtime::sleep(policy.interval).await;
            }
            Err(e) => {
                error!("Error writing to UDP: {e}");
                history.lock().await.record_error(&e.to_string());

                if item.attempts >= policy.max_retries {
                    error!(
                        "Dropping {} after {} failed writes",
                        item.message.name(),
                        item.attempts + 1
                    );
                    continue;
                }
                let retry = Outbound {
                    attempts: item.attempts + 1,
                    ..item
                };
                // Never block on our own queue: if it is full nobody else can drain it.
                if let Err(e) = requeue.try_send(retry) {
                    error!(
                        "Dropping {}: outbound queue unavailable for retry",
                        e.into_inner().message.name()
                    );
                }
            }
        }
    }
}

async fn tick_loop(mut inbound: mpsc::Sender<Input>, interval: Duration) {
    loop {
        if inbound.send(Input::Tick).await.is_err() {
            return;
        }
        runtime::sleep(interval).await;
    }
}

async fn dispatch_loop(
    mut connection: Connection,
    mut inbound: mpsc::Receiver<Input>,
    mut outbound: mpsc::Sender<Outbound>,
    shared: Shared,
) {
    while let Some(input) = inbound.next().await {
        let now = Instant::now();
        let effects = match input {
            Input::Message(message) => connection.handle(&message, now),
            Input::Tick => connection.tick(now),
        };

        for message in effects.outbound {
            if outbound.send(Outbound::new(message)).await.is_err() {
                return;
            }
        }

        if effects.events.is_empty() {
            continue;
        }
        *shared.snapshot.lock().await = *connection.state();
        let mut observer = shared.observer.lock().await;
        for event in &effects.events {
            observer.notify(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(feature = "runtime-tokio")]
    use crate::types::StateKind;

    #[test]
    fn test_from_device_matches_ip_only() {
        let device = Ipv4Addr::new(192, 168, 1, 40);
        assert!(from_device("192.168.1.40:5052".parse().unwrap(), device));
        assert!(from_device("192.168.1.40:40000".parse().unwrap(), device));
        assert!(!from_device("192.168.1.41:5052".parse().unwrap(), device));
    }

    #[cfg(feature = "runtime-tokio")]
    #[tokio::test]
    async fn test_writer_paces_and_orders() {
        let device = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let socket = UdpSocket::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        socket.connect(device.local_addr().unwrap()).await.unwrap();

        let (mut tx, rx) = mpsc::channel(10);
        let history = Arc::new(Mutex::new(MessageHistory::new()));
        let policy = WritePolicy {
            interval: Duration::from_millis(50),
            max_retries: 3,
        };
        let writer = spawn_task(
            "writer",
            write_loop(socket, rx, tx.clone(), policy, Arc::clone(&history)),
        );

        let start = Instant::now();
        tx.send(Outbound::new(Message::ClientHeartbeat)).await.unwrap();
        tx.send(Outbound::new(Message::HostHeartbeat)).await.unwrap();

        let registry = MessageRegistry::new();
        let mut buf = [0u8; 64];
        let (n, _) = device.recv_from(&mut buf).await.unwrap();
        assert_eq!(registry.parse(&buf[..n]).0.unwrap(), Message::ClientHeartbeat);
        let (n, _) = device.recv_from(&mut buf).await.unwrap();
        assert_eq!(registry.parse(&buf[..n]).0.unwrap(), Message::HostHeartbeat);
        assert!(start.elapsed() >= Duration::from_millis(50));

        writer.abort.abort();
        assert_eq!(writer.join.await, Err(Aborted));
        assert_eq!(history.lock().await.summary().outbound_count, 2);
    }

    /// A loopback address nothing listens on. Once the first datagram bounces,
    /// the next write on a connected socket is refused.
    #[cfg(feature = "runtime-tokio")]
    fn closed_port() -> SocketAddr {
        let socket = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.local_addr().unwrap()
    }

    #[cfg(feature = "runtime-tokio")]
    async fn refused_writer(
        max_retries: u32,
        history: &Arc<Mutex<MessageHistory>>,
    ) -> (mpsc::Sender<Outbound>, Task) {
        let socket = UdpSocket::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        socket.connect(closed_port()).await.unwrap();

        let (tx, rx) = mpsc::channel(10);
        let policy = WritePolicy {
            interval: Duration::from_millis(10),
            max_retries,
        };
        let writer = spawn_task(
            "writer",
            write_loop(socket, rx, tx.clone(), policy, Arc::clone(history)),
        );
        (tx, writer)
    }

    #[cfg(feature = "runtime-tokio")]
    async fn wait_for_outbound(history: &Arc<Mutex<MessageHistory>>, count: usize) {
        runtime::timeout(Duration::from_secs(2), async {
            while history.lock().await.summary().outbound_count < count {
                runtime::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("writes never completed");
    }

    #[cfg(feature = "runtime-tokio")]
    #[tokio::test]
    async fn test_refused_write_is_retried() {
        let history = Arc::new(Mutex::new(MessageHistory::new()));
        let (mut tx, writer) = refused_writer(3, &history).await;

        for _ in 0..4 {
            tx.send(Outbound::new(Message::ClientHeartbeat)).await.unwrap();
        }
        wait_for_outbound(&history, 4).await;

        let history = history.lock().await;
        assert_eq!(history.count(Direction::Outbound, "ClientHeartbeat"), 4);
        assert!(history.last_error().is_some());
        writer.abort.abort();
    }

    #[cfg(feature = "runtime-tokio")]
    #[tokio::test]
    async fn test_refused_write_is_dropped_without_retries() {
        let history = Arc::new(Mutex::new(MessageHistory::new()));
        let (mut tx, writer) = refused_writer(0, &history).await;

        // The second write hits the bounce from the first and is refused.
        tx.send(Outbound::new(Message::ClientHeartbeat)).await.unwrap();
        tx.send(Outbound::new(Message::HostHeartbeat)).await.unwrap();
        tx.send(Outbound::new(Message::QueryState(StateKind::Power)))
            .await
            .unwrap();
        wait_for_outbound(&history, 2).await;
        runtime::sleep(Duration::from_millis(50)).await;

        let history = history.lock().await;
        assert_eq!(history.count(Direction::Outbound, "ClientHeartbeat"), 1);
        assert_eq!(history.count(Direction::Outbound, "QueryState"), 1);
        assert_eq!(history.count(Direction::Outbound, "HostHeartbeat"), 0);
        assert!(history.last_error().is_some());
        writer.abort.abort();
    }
}
