use std::io;

use tokio_util::codec::AnyDelimiterCodecError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to resolve {target}: {source}")]
    Resolve {
        target: String,
        #[source]
        source: io::Error,
    },
    #[error("{0} did not resolve to any address")]
    NoAddress(String),
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: io::Error,
    },
    #[error("reading input failed: {0}")]
    Input(#[source] AnyDelimiterCodecError),
    #[error("reading from server failed: {0}")]
    Socket(#[from] AnyDelimiterCodecError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("client task failed: {0}")]
    Task(String),
}
