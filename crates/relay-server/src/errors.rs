use std::io;

/// Fatal startup errors. Per-connection I/O errors never surface here; they
/// end only the affected connection.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to read listener address: {0}")]
    LocalAddr(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_error_names_address() {
        let err = ServerError::Bind {
            addr: "0.0.0.0:9000".into(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        };
        let msg = err.to_string();
        assert!(msg.contains("0.0.0.0:9000"));
        assert!(msg.contains("in use"));
    }

    #[test]
    fn bind_error_keeps_source() {
        use std::error::Error;
        let err = ServerError::Bind {
            addr: "x".into(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.source().is_some());
    }
}
