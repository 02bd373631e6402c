use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Method name of the realtime history RPC.
pub const LOAD_HISTORY_METHOD: &str = "load_history";

/// Timestamp as either transport emits it: RFC 3339 text on the REST path,
/// `{"$date": millis}` on the realtime path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    Rfc3339(DateTime<Utc>),
    Millis {
        #[serde(rename = "$date")]
        millis: i64,
    },
}

impl WireTimestamp {
    pub fn to_utc(self) -> Option<DateTime<Utc>> {
        match self {
            WireTimestamp::Rfc3339(ts) => Some(ts),
            WireTimestamp::Millis { millis } => DateTime::from_timestamp_millis(millis),
        }
    }
}

impl From<DateTime<Utc>> for WireTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        WireTimestamp::Rfc3339(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAuthor {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Loosely structured message record as received from either transport.
/// Field names follow the server's wire schema; everything the normalizer
/// requires is optional here so that malformed records survive parsing and
/// can be reported per record instead of failing the whole response decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "rid", default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(rename = "msg", default)]
    pub body: String,
    #[serde(rename = "u", default, skip_serializing_if = "Option::is_none")]
    pub author: Option<RawAuthor>,
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(rename = "ts", default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<WireTimestamp>,
    #[serde(
        rename = "_updatedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<WireTimestamp>,
}

/// Payload of a successful history call on either path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryBatch {
    #[serde(default)]
    pub messages: Vec<RawMessage>,
}

/// Frames exchanged on the persistent realtime connection. Only the subset
/// this client speaks: method calls with positional params, their results,
/// and keepalive pings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "snake_case")]
pub enum RealtimeFrame {
    Method {
        id: String,
        method: String,
        params: Vec<Value>,
    },
    Result {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<HistoryBatch>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ApiError>,
    },
    Ping,
    Pong,
}

/// Body of `GET /api/v1/channels.history` on the stateless path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelHistoryResponse {
    #[serde(default)]
    pub messages: Vec<RawMessage>,
    #[serde(default)]
    pub success: bool,
}
