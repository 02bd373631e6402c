use std::sync::Arc;

use anyhow::{anyhow, Result};
use shared::domain::{CanonicalMessage, RoomHistoryCursor, RoomId, UserId};
use storage::Storage;
use tracing::debug;
use url::Url;

pub mod error;
pub mod normalize;
pub mod transport;

pub use error::{HistoryError, TransportKind};
pub use normalize::{normalize, to_raw, MissingField};
pub use transport::{
    PersistentTransport, RestHistoryTransport, StatelessTransport, WsRealtimeTransport,
};

/// Page size requested on the realtime history path. The stateless path
/// sends no limit; the server controls batch size there.
pub const REALTIME_HISTORY_PAGE_SIZE: u32 = 20;

/// Credentials carried on every stateless call.
#[derive(Debug, Clone)]
pub struct SessionAuth {
    pub token: String,
    pub user_id: UserId,
}

/// Read-only connectivity state for one app run: realtime server address,
/// credentials, and whether the persistent connection is logged in. Passed
/// into the pipeline explicitly; the history path never mutates it.
#[derive(Debug, Clone)]
pub struct Session {
    server_url: Url,
    auth: SessionAuth,
    realtime_logged_in: bool,
}

impl Session {
    pub fn new(server_url: Url, auth: SessionAuth, realtime_logged_in: bool) -> Self {
        Self {
            server_url,
            auth,
            realtime_logged_in,
        }
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    pub fn auth(&self) -> &SessionAuth {
        &self.auth
    }

    /// Pure predicate driving transport selection.
    pub fn has_active_realtime(&self) -> bool {
        self.realtime_logged_in
    }

    /// Derives the stateless endpoint base by swapping the realtime scheme
    /// for the request/response scheme.
    pub fn rest_base_url(&self) -> Result<Url> {
        let scheme = match self.server_url.scheme() {
            "ws" => "http",
            "wss" => "https",
            other => {
                return Err(anyhow!(
                    "server url must use ws:// or wss://, got {other}://"
                ))
            }
        };
        let mut url = self.server_url.clone();
        url.set_scheme(scheme)
            .map_err(|_| anyhow!("failed to derive rest url from {}", self.server_url))?;
        Ok(url)
    }
}

/// Linear history pipeline: pick a transport, fetch one bounded batch,
/// normalize it, commit it atomically, return it. No state is retained
/// across calls beyond the injected session.
pub struct HistoryLoader {
    session: Session,
    realtime: Arc<dyn PersistentTransport>,
    rest: Arc<dyn StatelessTransport>,
    storage: Storage,
}

impl HistoryLoader {
    pub fn new(
        session: Session,
        realtime: Arc<dyn PersistentTransport>,
        rest: Arc<dyn StatelessTransport>,
        storage: Storage,
    ) -> Self {
        Self {
            session,
            realtime,
            rest,
            storage,
        }
    }

    /// Wires the concrete websocket and REST transports from the session's
    /// server address.
    pub fn for_session(session: Session, storage: Storage) -> Result<Self> {
        let realtime = Arc::new(WsRealtimeTransport::new(session.server_url().clone()));
        let rest = Arc::new(RestHistoryTransport::new(session.rest_base_url()?));
        Ok(Self::new(session, realtime, rest, storage))
    }

    pub async fn load_messages_for_room(
        &self,
        room_id: &RoomId,
        before: RoomHistoryCursor,
    ) -> Result<Vec<CanonicalMessage>, HistoryError> {
        if room_id.is_empty() {
            return Err(HistoryError::EmptyRoomId);
        }

        let (transport, raw) = if self.session.has_active_realtime() {
            debug!(room_id = %room_id, "history: fetching over realtime transport");
            let batch = self
                .realtime
                .load_history(room_id, before, REALTIME_HISTORY_PAGE_SIZE)
                .await
                .map_err(|source| HistoryError::Transport {
                    transport: TransportKind::Realtime,
                    source,
                })?;
            // Absent response or an empty list is ordinary empty history.
            let messages = batch.map(|b| b.messages).unwrap_or_default();
            (TransportKind::Realtime, messages)
        } else {
            debug!(room_id = %room_id, "history: fetching over rest transport");
            let messages = self
                .rest
                .channel_history(self.session.auth(), room_id, before)
                .await
                .map_err(|source| HistoryError::Transport {
                    transport: TransportKind::Rest,
                    source,
                })?;
            (TransportKind::Rest, messages)
        };

        let mut batch = Vec::with_capacity(raw.len());
        for (index, record) in raw.iter().enumerate() {
            let message = normalize(record).map_err(|field| HistoryError::MalformedRecord {
                index,
                field: field.name(),
            })?;
            batch.push(message);
        }

        if batch.is_empty() {
            debug!(room_id = %room_id, %transport, "history: empty batch, nothing to commit");
            return Ok(batch);
        }

        self.storage
            .upsert_messages(&batch)
            .await
            .map_err(HistoryError::Store)?;
        debug!(room_id = %room_id, %transport, count = batch.len(), "history: batch committed");

        Ok(batch)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
