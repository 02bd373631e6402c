use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(RoomId);
id_newtype!(MessageId);

/// Oldest point already fetched for a room. `Latest` is the sentinel for
/// "most recent"; the cursor is supplied by the caller and never persisted
/// by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomHistoryCursor {
    Latest,
    Before(DateTime<Utc>),
}

impl RoomHistoryCursor {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            RoomHistoryCursor::Latest => None,
            RoomHistoryCursor::Before(ts) => Some(*ts),
        }
    }
}

/// Normalized, storage-ready message representation. Built once by the
/// normalizer and replaced wholesale on a later sync pass; never mutated in
/// place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalMessage {
    pub id: MessageId,
    pub room_id: RoomId,
    pub body: String,
    pub author_id: UserId,
    pub author_username: Option<String>,
    /// Display name derived at normalization time: username when present,
    /// otherwise the author id.
    pub author_display: String,
    /// System-message marker (`t` on the wire); absent for plain messages.
    pub message_type: Option<String>,
    pub sent_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
