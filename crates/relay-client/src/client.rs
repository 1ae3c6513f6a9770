//! Connection setup and the two relay tasks.

use std::net::SocketAddr;

use bytes::Bytes;
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{lookup_host, TcpStream};
use tokio::task::JoinError;
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::errors::ClientError;

/// Why the client session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientExit {
    /// The operator typed the exit sentinel.
    Sentinel,
    /// Input reached end of stream.
    InputClosed,
    /// The server closed the connection.
    ServerClosed,
    /// Stopped through the caller's cancellation token.
    Interrupted,
}

/// How one relay task ended.
enum TaskEnd {
    Finished(ClientExit),
    Cancelled,
}

/// A connected client.
pub struct Client {
    stream: TcpStream,
    peer: SocketAddr,
    exit_sentinel: String,
}

impl Client {
    /// Resolve the configured target and connect to the first address that
    /// accepts.
    pub async fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        let target = config.target();
        let addrs = lookup_host(&target)
            .await
            .map_err(|source| ClientError::Resolve {
                target: target.clone(),
                source,
            })?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    info!(%addr, "connected to relay server");
                    return Ok(Self {
                        stream,
                        peer: addr,
                        exit_sentinel: config.exit_sentinel.clone(),
                    });
                }
                Err(e) => {
                    debug!(%addr, error = %e, "connect attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(match last_err {
            Some(source) => ClientError::Connect { target, source },
            None => ClientError::NoAddress(target),
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Relay until either side finishes.
    pub async fn run<I, O>(self, input: I, output: O) -> Result<ClientExit, ClientError>
    where
        I: AsyncRead + Unpin + Send + 'static,
        O: AsyncWrite + Unpin + Send + 'static,
    {
        self.run_until(input, output, CancellationToken::new()).await
    }

    /// Relay until either side finishes or `shutdown` is cancelled.
    ///
    /// Input lines are sent to the server with a trailing newline, except
    /// the exit sentinel which ends the session without being sent. Lines
    /// from the server are written to `output`. Whichever task stops first
    /// cancels the other.
    pub async fn run_until<I, O>(
        self,
        input: I,
        output: O,
        shutdown: CancellationToken,
    ) -> Result<ClientExit, ClientError>
    where
        I: AsyncRead + Unpin + Send + 'static,
        O: AsyncWrite + Unpin + Send + 'static,
    {
        let (reader, writer) = self.stream.into_split();
        let session = shutdown.child_token();

        let outbound = tokio::spawn(forward_input(
            input,
            writer,
            self.exit_sentinel,
            session.clone(),
        ));
        let inbound = tokio::spawn(print_incoming(reader, output, session));

        let (outbound, inbound) = tokio::join!(outbound, inbound);
        let exit = settle(flatten(outbound)?, flatten(inbound)?);
        debug!(?exit, "client session ended");
        Ok(exit)
    }
}

fn flatten(
    joined: Result<Result<TaskEnd, ClientError>, JoinError>,
) -> Result<TaskEnd, ClientError> {
    joined.map_err(|e| ClientError::Task(e.to_string()))?
}

/// The task that finished on its own decides the exit reason; input wins a tie.
fn settle(outbound: TaskEnd, inbound: TaskEnd) -> ClientExit {
    match (outbound, inbound) {
        (TaskEnd::Finished(exit), _) | (TaskEnd::Cancelled, TaskEnd::Finished(exit)) => exit,
        (TaskEnd::Cancelled, TaskEnd::Cancelled) => ClientExit::Interrupted,
    }
}

/// Read lines from `input` and send each, newline-terminated, to the server.
///
/// Lines are forwarded as raw bytes; only a trailing `\r` is removed.
async fn forward_input<I>(
    input: I,
    mut socket: OwnedWriteHalf,
    exit_sentinel: String,
    session: CancellationToken,
) -> Result<TaskEnd, ClientError>
where
    I: AsyncRead + Unpin,
{
    let _stop_peer = session.clone().drop_guard();
    let mut lines = FramedRead::new(input, newline_codec());

    loop {
        let next = tokio::select! {
            () = session.cancelled() => return Ok(TaskEnd::Cancelled),
            next = lines.next() => next,
        };
        let Some(line) = next.transpose().map_err(ClientError::Input)? else {
            let _ = socket.shutdown().await;
            return Ok(TaskEnd::Finished(ClientExit::InputClosed));
        };
        let line = strip_cr(&line);
        if line == exit_sentinel.as_bytes() {
            return Ok(TaskEnd::Finished(ClientExit::Sentinel));
        }

        let mut frame = Vec::with_capacity(line.len() + 1);
        frame.extend_from_slice(line);
        frame.push(b'\n');
        socket.write_all(&frame).await?;
    }
}

/// Print every line the server sends until it closes the connection.
async fn print_incoming<O>(
    socket: OwnedReadHalf,
    mut output: O,
    session: CancellationToken,
) -> Result<TaskEnd, ClientError>
where
    O: AsyncWrite + Unpin,
{
    let _stop_peer = session.clone().drop_guard();
    let mut lines = FramedRead::new(socket, newline_codec());

    loop {
        let next = tokio::select! {
            () = session.cancelled() => return Ok(TaskEnd::Cancelled),
            next = lines.next() => next,
        };
        let Some(line) = next.transpose()? else {
            return Ok(TaskEnd::Finished(ClientExit::ServerClosed));
        };

        output.write_all(strip_cr(&line)).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
}

fn newline_codec() -> AnyDelimiterCodec {
    AnyDelimiterCodec::new(b"\n".to_vec(), b"\n".to_vec())
}

fn strip_cr(line: &Bytes) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}
