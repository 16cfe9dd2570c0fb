//! Note service operations over the in-memory platform: CRUD wiring, session
//! reuse, image insertion, summarize and search.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::sleep;
use uuid::Uuid;

use collabnote::models::{RecordEvent, ServiceError, StoreError};
use collabnote::services::{NoteList, NoteService};
use common::{identity, sample_note, FakePlatform};

fn service(platform: &Arc<FakePlatform>) -> NoteService {
    NoteService::new(
        platform.clone(),
        platform.clone(),
        platform.clone(),
        platform.clone(),
    )
}

#[tokio::test(start_paused = true)]
async fn create_note_uses_dashboard_defaults() {
    let platform = FakePlatform::new(vec![]);
    let service = service(&platform);
    let owner = Uuid::new_v4();

    let note = service.create_note(owner).await.unwrap();
    assert_eq!(note.title, "Untitled Note");
    assert_eq!(note.content, "");
    assert_eq!(note.owner_id, owner);
    assert!(!note.is_public);
}

#[tokio::test(start_paused = true)]
async fn open_note_reuses_live_session() {
    let note = sample_note(Uuid::new_v4());
    let platform = FakePlatform::new(vec![note.clone()]);
    let service = service(&platform);

    let first = service
        .open_note(note.id, identity("me@example.com"))
        .await
        .unwrap();
    let second = service
        .open_note(note.id, identity("me@example.com"))
        .await
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test(start_paused = true)]
async fn open_unknown_note_reports_not_found() {
    let platform = FakePlatform::new(vec![]);
    let service = service(&platform);

    let result = service
        .open_note(Uuid::new_v4(), identity("me@example.com"))
        .await;
    assert!(matches!(
        result,
        Err(ServiceError::Store(StoreError::NotFound))
    ));
}

#[tokio::test(start_paused = true)]
async fn close_note_stops_the_session() {
    let note = sample_note(Uuid::new_v4());
    let platform = FakePlatform::new(vec![note.clone()]);
    let service = service(&platform);

    let session = service
        .open_note(note.id, identity("me@example.com"))
        .await
        .unwrap();
    service.close_note(note.id).await;
    sleep(Duration::from_millis(1)).await;

    assert!(session.is_stopped());
    assert_eq!(platform.closed_feeds(), 2);
}

#[tokio::test(start_paused = true)]
async fn delete_note_removes_record_and_session() {
    let note = sample_note(Uuid::new_v4());
    let platform = FakePlatform::new(vec![note.clone()]);
    let service = service(&platform);

    let session = service
        .open_note(note.id, identity("me@example.com"))
        .await
        .unwrap();
    service.delete_note(note.id).await.unwrap();
    sleep(Duration::from_millis(1)).await;

    assert!(session.is_stopped());
    assert!(platform.notes.lock().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn insert_image_appends_markdown_and_persists() {
    let note = sample_note(Uuid::new_v4());
    let platform = FakePlatform::new(vec![note.clone()]);
    let service = service(&platform);
    let session = service
        .open_note(note.id, identity("me@example.com"))
        .await
        .unwrap();

    let url = service
        .insert_image(&session, "photo.png", vec![0xFF, 0xD8])
        .await
        .unwrap();

    let uploads = platform.uploads.lock().await;
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].starts_with(&note.owner_id.to_string()));
    assert!(uploads[0].ends_with(".png"));
    assert_eq!(url, format!("https://cdn.test/{}", uploads[0]));
    drop(uploads);

    // The append was persisted immediately, not debounced
    assert_eq!(platform.update_count().await, 1);
    let patch = platform.last_update().await.unwrap();
    let body = patch.content.unwrap();
    assert!(body.contains(&format!("![Image]({})", url)));
}

#[tokio::test(start_paused = true)]
async fn summarize_appends_summary_separated_from_text() {
    let note = sample_note(Uuid::new_v4());
    let platform = FakePlatform::new(vec![note.clone()]);
    platform
        .set_task_result("summarize-note", json!({ "summary": "Three key points." }))
        .await;
    let service = service(&platform);
    let session = service
        .open_note(note.id, identity("me@example.com"))
        .await
        .unwrap();

    session.edit_body("my own words").await;
    let summary = service.summarize(&session).await.unwrap();
    assert_eq!(summary, "Three key points.");

    let body = session.buffer().body;
    assert!(body.starts_with("my own words"));
    assert!(body.contains("\n\n---\nThree key points.\n"));

    let invocations = platform.invocations.lock().await;
    assert_eq!(invocations[0].0, "summarize-note");
    assert_eq!(invocations[0].1, json!({ "noteId": note.id }));
}

#[tokio::test(start_paused = true)]
async fn summarize_failure_leaves_body_untouched() {
    let note = sample_note(Uuid::new_v4());
    let platform = FakePlatform::new(vec![note.clone()]);
    let service = service(&platform);
    let session = service
        .open_note(note.id, identity("me@example.com"))
        .await
        .unwrap();

    // No task result registered: invoke fails
    let result = service.summarize(&session).await;
    assert!(matches!(result, Err(ServiceError::Store(_))));
    assert_eq!(session.buffer().body, "");
}

#[tokio::test(start_paused = true)]
async fn index_note_invokes_embedding_task() {
    let note = sample_note(Uuid::new_v4());
    let platform = FakePlatform::new(vec![note.clone()]);
    platform
        .set_task_result("generate-embedding", json!({ "ok": true }))
        .await;
    let service = service(&platform);

    service.index_note(note.id, "note body").await.unwrap();

    let invocations = platform.invocations.lock().await;
    assert_eq!(invocations[0].0, "generate-embedding");
    assert_eq!(
        invocations[0].1,
        json!({ "noteId": note.id, "content": "note body" })
    );
}

#[tokio::test(start_paused = true)]
async fn search_parses_hits_with_similarity() {
    let platform = FakePlatform::new(vec![]);
    let hit_id = Uuid::new_v4();
    platform
        .set_task_result(
            "search-notes",
            json!({
                "notes": [
                    { "id": hit_id, "title": "Meeting Notes", "content": "agenda", "similarity": 0.87 }
                ]
            }),
        )
        .await;
    let service = service(&platform);

    let hits = service.search("meeting").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, hit_id);
    assert_eq!(hits[0].title, "Meeting Notes");
    assert_eq!(hits[0].similarity, Some(0.87));

    let invocations = platform.invocations.lock().await;
    assert_eq!(invocations[0].1, json!({ "query": "meeting" }));
}

#[tokio::test(start_paused = true)]
async fn owner_feed_drives_note_list() {
    let owner = Uuid::new_v4();
    let first = sample_note(owner);
    let platform = FakePlatform::new(vec![first.clone()]);
    let service = service(&platform);

    let mut feed = service.subscribe_owner(owner).await.unwrap();
    let mut list = NoteList::new(vec![first.clone()]);

    let mut second = sample_note(owner);
    second.title = "Second".to_string();
    platform
        .push_change(RecordEvent::Inserted(second.clone()))
        .await;
    platform.push_change(RecordEvent::Deleted(first.id)).await;

    while let Ok(event) = tokio::time::timeout(Duration::from_millis(10), feed.recv()).await {
        match event {
            Some(event) => list.apply(event),
            None => break,
        }
    }

    assert_eq!(list.len(), 1);
    assert_eq!(list.notes()[0].title, "Second");
}
