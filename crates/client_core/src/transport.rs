use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::Value;
use shared::{
    domain::{RoomHistoryCursor, RoomId},
    error::ApiException,
    protocol::{ChannelHistoryResponse, HistoryBatch, RawMessage, RealtimeFrame, LOAD_HISTORY_METHOD},
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;
use uuid::Uuid;

use crate::SessionAuth;

/// Fetch path over the persistent realtime connection.
///
/// `Ok(None)` means the server produced no response for the call; callers
/// treat that the same as an empty batch, not as a failure.
#[async_trait]
pub trait PersistentTransport: Send + Sync {
    async fn load_history(
        &self,
        room_id: &RoomId,
        before: RoomHistoryCursor,
        limit: u32,
    ) -> Result<Option<HistoryBatch>>;
}

/// Stateless request/response fallback, authenticated per call.
#[async_trait]
pub trait StatelessTransport: Send + Sync {
    async fn channel_history(
        &self,
        auth: &SessionAuth,
        room_id: &RoomId,
        before: RoomHistoryCursor,
    ) -> Result<Vec<RawMessage>>;
}

/// One-shot history RPC over the realtime socket: send a `method` frame,
/// answer keepalive pings, and wait for the matching `result` frame.
pub struct WsRealtimeTransport {
    url: Url,
}

impl WsRealtimeTransport {
    pub fn new(url: Url) -> Self {
        Self { url }
    }
}

#[async_trait]
impl PersistentTransport for WsRealtimeTransport {
    async fn load_history(
        &self,
        room_id: &RoomId,
        before: RoomHistoryCursor,
        limit: u32,
    ) -> Result<Option<HistoryBatch>> {
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .with_context(|| format!("failed to connect websocket: {}", self.url))?;
        let (mut writer, mut reader) = ws_stream.split();

        let call_id = Uuid::new_v4().to_string();
        let params = vec![
            Value::String(room_id.as_str().to_string()),
            match before.timestamp() {
                Some(ts) => Value::String(ts.to_rfc3339()),
                None => Value::Null,
            },
            Value::from(limit),
        ];
        let call = RealtimeFrame::Method {
            id: call_id.clone(),
            method: LOAD_HISTORY_METHOD.to_string(),
            params,
        };
        writer
            .send(Message::Text(serde_json::to_string(&call)?))
            .await
            .context("failed to send history call")?;

        while let Some(frame) = reader.next().await {
            match frame.context("websocket receive failed")? {
                Message::Text(text) => match serde_json::from_str::<RealtimeFrame>(&text)
                    .with_context(|| format!("invalid realtime frame: {text}"))?
                {
                    RealtimeFrame::Result { id, result, error } if id == call_id => {
                        if let Some(error) = error {
                            return Err(ApiException::from(error).into());
                        }
                        return Ok(result);
                    }
                    RealtimeFrame::Ping => {
                        writer
                            .send(Message::Text(serde_json::to_string(&RealtimeFrame::Pong)?))
                            .await
                            .context("failed to answer ping")?;
                    }
                    _ => {}
                },
                Message::Close(_) => break,
                _ => {}
            }
        }

        // Connection ended before a result frame arrived: absent response.
        Ok(None)
    }
}

/// `GET /api/v1/channels.history` with per-call token/user-id auth headers.
pub struct RestHistoryTransport {
    http: Client,
    base_url: Url,
}

impl RestHistoryTransport {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl StatelessTransport for RestHistoryTransport {
    async fn channel_history(
        &self,
        auth: &SessionAuth,
        room_id: &RoomId,
        before: RoomHistoryCursor,
    ) -> Result<Vec<RawMessage>> {
        let url = self
            .base_url
            .join("api/v1/channels.history")
            .context("invalid rest base url")?;

        let mut request = self
            .http
            .get(url)
            .header("X-Auth-Token", &auth.token)
            .header("X-User-Id", auth.user_id.as_str())
            .query(&[("roomId", room_id.as_str())]);
        if let Some(ts) = before.timestamp() {
            request = request.query(&[("latest", ts.to_rfc3339())]);
        }

        // Deliberately no page-size parameter: the server controls batch
        // size on this path.
        let response: ChannelHistoryResponse = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("invalid channel history response")?;
        Ok(response.messages)
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
