use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use client_core::{HistoryLoader, Session, SessionAuth};
use shared::domain::{RoomHistoryCursor, RoomId, UserId};
use storage::Storage;
use url::Url;

mod config;
use config::{load_settings, normalize_database_url};

/// One-shot history load: fetch a batch of messages for a room, persist
/// them into the local store, and print them.
#[derive(Parser, Debug)]
struct Args {
    /// Room to load history for.
    #[arg(long)]
    room: String,
    /// Load messages older than this RFC 3339 timestamp; latest when omitted.
    #[arg(long)]
    before: Option<DateTime<Utc>>,
    /// Treat the realtime connection as logged in (use the socket path).
    #[arg(long, default_value_t = false)]
    realtime: bool,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long)]
    token: Option<String>,
    #[arg(long)]
    user_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(v) = args.server_url {
        settings.server_url = v;
    }
    if let Some(v) = args.database_url {
        settings.database_url = v;
    }
    if let Some(v) = args.token {
        settings.token = v;
    }
    if let Some(v) = args.user_id {
        settings.user_id = v;
    }

    let server_url = Url::parse(&settings.server_url)?;
    let storage = Storage::new(&normalize_database_url(&settings.database_url)).await?;
    let session = Session::new(
        server_url,
        SessionAuth {
            token: settings.token,
            user_id: UserId::new(settings.user_id),
        },
        args.realtime,
    );
    let loader = HistoryLoader::for_session(session, storage)?;

    let cursor = match args.before {
        Some(ts) => RoomHistoryCursor::Before(ts),
        None => RoomHistoryCursor::Latest,
    };
    let batch = loader
        .load_messages_for_room(&RoomId::new(args.room), cursor)
        .await?;

    println!("Fetched {} message(s)", batch.len());
    for message in &batch {
        println!(
            "[{}] {}: {}",
            message.sent_at.to_rfc3339(),
            message.author_display,
            message.body
        );
    }

    Ok(())
}
