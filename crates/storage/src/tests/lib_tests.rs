use super::*;

fn sample_message(id: &str, room_id: &str, body: &str) -> CanonicalMessage {
    CanonicalMessage {
        id: MessageId::new(id),
        room_id: RoomId::new(room_id),
        body: body.to_string(),
        author_id: UserId::new("u1"),
        author_username: Some("alice".to_string()),
        author_display: "alice".to_string(),
        message_type: None,
        sent_at: "2024-01-01T00:00:00Z".parse().expect("timestamp"),
        updated_at: None,
    }
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("temp dir");
    let db_path = temp_root.path().join("nested").join("client.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[tokio::test]
async fn upserts_and_reads_back_a_batch() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let batch = vec![
        sample_message("m1", "room42", "first"),
        sample_message("m2", "room42", "second"),
    ];

    storage.upsert_messages(&batch).await.expect("upsert");

    let loaded = storage
        .message(&MessageId::new("m1"))
        .await
        .expect("load")
        .expect("present");
    assert_eq!(loaded, batch[0]);
    assert_eq!(
        storage
            .count_room_messages(&RoomId::new("room42"))
            .await
            .expect("count"),
        2
    );
}

#[tokio::test]
async fn colliding_identity_replaces_without_growing_the_store() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .upsert_messages(&[sample_message("m1", "room42", "original")])
        .await
        .expect("first upsert");

    let mut replacement = sample_message("m1", "room42", "edited");
    replacement.author_username = None;
    replacement.author_display = "u1".to_string();
    storage
        .upsert_messages(&[replacement.clone()])
        .await
        .expect("second upsert");

    assert_eq!(
        storage
            .count_room_messages(&RoomId::new("room42"))
            .await
            .expect("count"),
        1
    );
    let loaded = storage
        .message(&MessageId::new("m1"))
        .await
        .expect("load")
        .expect("present");
    assert_eq!(loaded, replacement);
}

#[tokio::test]
async fn failed_batch_commits_nothing() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .upsert_messages(&[sample_message("m1", "room42", "original")])
        .await
        .expect("seed");

    // Second record violates the non-empty id constraint, so the whole
    // transaction must roll back, including the edit of m1.
    let batch = vec![
        sample_message("m1", "room42", "edited"),
        sample_message("", "room42", "invalid"),
    ];
    storage
        .upsert_messages(&batch)
        .await
        .expect_err("batch must fail");

    assert_eq!(
        storage
            .count_room_messages(&RoomId::new("room42"))
            .await
            .expect("count"),
        1
    );
    let loaded = storage
        .message(&MessageId::new("m1"))
        .await
        .expect("load")
        .expect("present");
    assert_eq!(loaded.body, "original");
}

#[tokio::test]
async fn paginates_room_history_by_sent_at() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let mut first = sample_message("m1", "room42", "first");
    first.sent_at = "2024-01-01T00:00:01Z".parse().expect("timestamp");
    let mut second = sample_message("m2", "room42", "second");
    second.sent_at = "2024-01-01T00:00:02Z".parse().expect("timestamp");
    let mut third = sample_message("m3", "room42", "third");
    third.sent_at = "2024-01-01T00:00:03Z".parse().expect("timestamp");
    let mut elsewhere = sample_message("m4", "room7", "elsewhere");
    elsewhere.sent_at = "2024-01-01T00:00:02Z".parse().expect("timestamp");

    storage
        .upsert_messages(&[first.clone(), second.clone(), third.clone(), elsewhere])
        .await
        .expect("upsert");

    let newest_two = storage
        .list_room_messages(&RoomId::new("room42"), 2, None)
        .await
        .expect("messages");
    assert_eq!(newest_two.len(), 2);
    assert_eq!(newest_two[0].id, second.id);
    assert_eq!(newest_two[1].id, third.id);

    let older = storage
        .list_room_messages(&RoomId::new("room42"), 2, Some(second.sent_at))
        .await
        .expect("messages");
    assert_eq!(older.len(), 1);
    assert_eq!(older[0].id, first.id);
}
