use thiserror::Error;

/// Which fetch path a transport failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Realtime,
    Rest,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Realtime => f.write_str("realtime"),
            TransportKind::Rest => f.write_str("rest"),
        }
    }
}

/// Failure taxonomy of the history pipeline. Empty history is not an error
/// and is represented as an empty batch, never as a variant here.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("room id must not be empty")]
    EmptyRoomId,
    /// Network/auth/decode failure during the fetch, passed through with its
    /// source chain intact. No retry or classification happens at this layer.
    #[error("history fetch failed over {transport} transport: {source}")]
    Transport {
        transport: TransportKind,
        #[source]
        source: anyhow::Error,
    },
    /// A raw record was missing a required field. Raised before any store
    /// write, so a partial batch can never half-commit.
    #[error("malformed history record at index {index}: missing {field}")]
    MalformedRecord { index: usize, field: &'static str },
    #[error("failed to commit history batch: {0}")]
    Store(#[source] anyhow::Error),
}
