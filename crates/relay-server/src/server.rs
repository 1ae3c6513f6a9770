//! `RelayServer`: TCP accept loop and per-connection I/O tasks.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use relay_core::{CloseReason, ConnId, EventSink, SharedConnection};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::connection::TcpConnection;
use crate::errors::ServerError;
use crate::shutdown::ShutdownCoordinator;

/// Pause after a failed accept (e.g. file descriptor exhaustion).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Per-connection settings copied out of [`ServerConfig`].
#[derive(Clone, Copy, Debug)]
struct ConnectionSettings {
    send_queue_capacity: usize,
    read_buffer_size: usize,
}

impl From<&ServerConfig> for ConnectionSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            send_queue_capacity: config.send_queue_capacity.max(1),
            read_buffer_size: config.read_buffer_size.max(1),
        }
    }
}

/// The relay reactor.
///
/// Owns the socket I/O and drives an [`EventSink`] with open, traffic and
/// close events.
pub struct RelayServer {
    config: ServerConfig,
    sink: Arc<dyn EventSink>,
    shutdown: Arc<ShutdownCoordinator>,
}

impl RelayServer {
    pub fn new(config: ServerConfig, sink: Arc<dyn EventSink>) -> Self {
        Self {
            config,
            sink,
            shutdown: Arc::new(ShutdownCoordinator::new()),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Bind the listener and spawn the accept loop.
    ///
    /// Returns the bound address and the accept loop's handle. Bind failure
    /// is the only error; everything after that is contained per connection.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        self.sink.on_boot(local_addr);

        let handle = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.sink),
            ConnectionSettings::from(&self.config),
            self.shutdown.token(),
            self.shutdown.tracker(),
        ));
        Ok((local_addr, handle))
    }

    /// Stop accepting, close every connection, and wait for their tasks.
    pub async fn stop(&self, accept_loop: JoinHandle<()>) {
        let timeout = Duration::from_secs(self.config.shutdown_timeout_secs);
        self.shutdown
            .graceful_shutdown(vec![accept_loop], Some(timeout))
            .await;
        info!("relay server stopped");
    }
}

async fn accept_loop(
    listener: TcpListener,
    sink: Arc<dyn EventSink>,
    settings: ConnectionSettings,
    shutdown: CancellationToken,
    tracker: TaskTracker,
) {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                debug!("accept loop cancelled");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let _ = tracker.spawn(serve_connection(
                        stream,
                        peer,
                        Arc::clone(&sink),
                        settings,
                        shutdown.child_token(),
                    ));
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }
}

/// Drive one connection from open to close.
///
/// `aborted` tears the connection down at once (server shutdown or a failed
/// socket write). When the peer stops sending instead, the connection stops
/// taking new frames but the writer still flushes what was already queued.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    sink: Arc<dyn EventSink>,
    settings: ConnectionSettings,
    aborted: CancellationToken,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(%peer, error = %e, "failed to set TCP_NODELAY");
    }
    let (reader, writer) = stream.into_split();
    let (tx, rx) = mpsc::channel(settings.send_queue_capacity);
    let closing = aborted.child_token();

    let tcp = Arc::new(TcpConnection::new(
        ConnId::new(),
        peer.to_string(),
        tx,
        closing.clone(),
    ));
    let conn: SharedConnection = tcp.clone();

    sink.on_open(&conn);

    let write_task = tokio::spawn(write_loop(
        writer,
        rx,
        aborted.clone(),
        closing.clone(),
        conn.id().clone(),
    ));
    let reason = read_loop(reader, &conn, sink.as_ref(), settings.read_buffer_size, &aborted).await;

    // Reject new frames before the sink forgets the connection.
    closing.cancel();
    sink.on_close(&conn, &reason);

    if let Err(e) = write_task.await {
        warn!(conn_id = %conn.id(), error = %e, "writer task failed");
    }
    debug!(
        conn_id = %conn.id(),
        age_ms = tcp.age().as_millis() as u64,
        dropped_frames = tcp.drop_count(),
        "connection finished"
    );
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    conn: &SharedConnection,
    sink: &dyn EventSink,
    buffer_size: usize,
    aborted: &CancellationToken,
) -> CloseReason {
    let mut buf = BytesMut::with_capacity(buffer_size);
    loop {
        buf.reserve(buffer_size);
        tokio::select! {
            () = aborted.cancelled() => return CloseReason::Local,
            read = reader.read_buf(&mut buf) => match read {
                Ok(0) => return CloseReason::PeerClosed,
                Ok(_) => {
                    let frame: Bytes = buf.split().freeze();
                    sink.on_traffic(conn, frame);
                }
                Err(e) => {
                    debug!(conn_id = %conn.id(), error = %e, "read failed");
                    return CloseReason::ReadFailed(e.kind());
                }
            }
        }
    }
}

/// Drain the send queue onto the socket.
///
/// Runs until `aborted`, or until `closing` is set and the queue is empty.
async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::Receiver<Bytes>,
    aborted: CancellationToken,
    closing: CancellationToken,
    conn_id: ConnId,
) {
    loop {
        let frame = tokio::select! {
            biased;
            () = aborted.cancelled() => break,
            frame = rx.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
            // Only reached while the queue is empty.
            () = closing.cancelled() => break,
        };

        let written = tokio::select! {
            () = aborted.cancelled() => break,
            res = writer.write_all(&frame) => res,
        };
        if let Err(e) = written {
            debug!(conn_id = %conn_id, error = %e, "write failed, closing connection");
            aborted.cancel();
            break;
        }
    }
    let _ = writer.shutdown().await;
}
