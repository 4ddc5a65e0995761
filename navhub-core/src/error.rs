use thiserror::Error;

/// Errors raised while starting a source or output service.
///
/// These are all open-time failures: once a worker is running, transport
/// errors are logged and handled inside the worker loop instead of being
/// surfaced through `Result`.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to open serial port {port}: {source}")]
    SerialOpen {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("failed to bind UDP listener on port {port}: {source}")]
    UdpBind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open UDP sender socket: {0}")]
    UdpOpen(#[source] std::io::Error),

    #[error("cannot resolve output target {host}:{port}")]
    Resolve { host: String, port: u16 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised by the sentence decoder.
///
/// A decode error is bounded to the offending sentence: callers log it and
/// move on, the navigation record is not published.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("sentence has no checksum delimiter: {0}")]
    MissingChecksum(String),

    #[error("checksum mismatch, computed {computed:02X} got \"{received}\": {sentence}")]
    ChecksumMismatch {
        computed: u8,
        received: String,
        sentence: String,
    },

    #[error("malformed sentence: {0}")]
    Malformed(String),
}
