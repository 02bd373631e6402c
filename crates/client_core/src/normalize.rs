use chrono::{DateTime, Utc};
use shared::{
    domain::{CanonicalMessage, MessageId, RoomId, UserId},
    protocol::{RawAuthor, RawMessage, WireTimestamp},
};

/// Required field a malformed raw record is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Id,
    RoomId,
}

impl MissingField {
    pub fn name(self) -> &'static str {
        match self {
            MissingField::Id => "id",
            MissingField::RoomId => "room id",
        }
    }
}

/// Maps a transport record onto the canonical schema. Pure, and idempotent:
/// normalizing the raw projection of an already-canonical record yields a
/// field-for-field identical record.
pub fn normalize(raw: &RawMessage) -> Result<CanonicalMessage, MissingField> {
    let id = match raw.id.as_deref() {
        Some(id) if !id.is_empty() => MessageId::new(id),
        _ => return Err(MissingField::Id),
    };
    let room_id = match raw.room_id.as_deref() {
        Some(rid) if !rid.is_empty() => RoomId::new(rid),
        _ => return Err(MissingField::RoomId),
    };

    let author = raw.author.clone().unwrap_or_default();
    let author_id = UserId::new(author.id.unwrap_or_default());
    let author_username = author.username.filter(|username| !username.is_empty());
    let author_display = author_username
        .clone()
        .or_else(|| (!author_id.is_empty()).then(|| author_id.as_str().to_string()))
        .unwrap_or_else(|| "unknown".to_string());

    Ok(CanonicalMessage {
        id,
        room_id,
        body: raw.body.clone(),
        author_id,
        author_username,
        author_display,
        message_type: raw.message_type.clone(),
        sent_at: resolve_timestamp(raw.sent_at),
        updated_at: raw.updated_at.and_then(WireTimestamp::to_utc),
    })
}

/// Raw projection of a canonical record; this is what makes re-normalization
/// observable (`normalize(&to_raw(&msg)) == msg`).
pub fn to_raw(message: &CanonicalMessage) -> RawMessage {
    RawMessage {
        id: Some(message.id.as_str().to_string()),
        room_id: Some(message.room_id.as_str().to_string()),
        body: message.body.clone(),
        author: Some(RawAuthor {
            id: Some(message.author_id.as_str().to_string()),
            username: message.author_username.clone(),
        }),
        message_type: message.message_type.clone(),
        sent_at: Some(message.sent_at.into()),
        updated_at: message.updated_at.map(WireTimestamp::from),
    }
}

fn resolve_timestamp(ts: Option<WireTimestamp>) -> DateTime<Utc> {
    // Deterministic fallback keeps normalization pure when a record carries
    // no timestamp at all.
    ts.and_then(WireTimestamp::to_utc)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
#[path = "tests/normalize_tests.rs"]
mod tests;
