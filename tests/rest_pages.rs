use marketplace_messaging::client::error::ApiError;
use marketplace_messaging::client::models::messages::Message;
use marketplace_messaging::client::models::notifications::Notification;
use marketplace_messaging::client::models::threads::{ThreadStatus, ThreadSummary, ThreadType};
use marketplace_messaging::client::services::api::{read_count, Page};

#[test]
fn bare_array_is_a_single_complete_page() {
    let body = r#"[
        {"id": 1, "thread": 9, "sender_id": 4, "content": "hi", "created_at": "2024-05-01T10:00:00Z"},
        {"id": 2, "thread": 9, "sender_id": 5, "content": "hey", "created_at": 1714557660}
    ]"#;
    let page: Page<Message> = Page::from_json(body).unwrap();
    assert_eq!(page.count, Some(2));
    assert!(!page.has_more());
    assert_eq!(page.results[0].thread_id, "9");
    assert_eq!(page.results[1].sender, "5");
}

#[test]
fn envelope_carries_paging_links() {
    let body = r#"{
        "count": 41,
        "next": "https://api.example.com/threads/?page=2",
        "previous": null,
        "results": [
            {"id": "t1", "type": "booking", "participants": ["a", "b"], "unread_count": 3,
             "last_message": {"id": "m1", "sender": "a", "content": "ok"}},
            {"id": "t2", "thread_type": "dispute", "status": "locked", "participants": ["a", "c"]}
        ]
    }"#;
    let page: Page<ThreadSummary> = Page::from_json(body).unwrap();
    assert_eq!(page.count, Some(41));
    assert!(page.has_more());
    assert_eq!(page.results[0].unread_count, 3);
    assert_eq!(page.results[0].last_message.as_ref().unwrap().id, "m1");
    assert_eq!(page.results[1].thread_type, ThreadType::Dispute);
    assert_eq!(page.results[1].status, ThreadStatus::Locked);
}

#[test]
fn notification_list_accepts_backend_field_names() {
    let body = r#"{"results": [
        {"id": 7, "notification_type": "ride", "title": "Driver assigned",
         "message": "Your ride is on the way", "status": "unread",
         "created_at": "2024-05-01T10:00:00+02:00", "data": {"ride_id": 3}}
    ]}"#;
    let page: Page<Notification> = Page::from_json(body).unwrap();
    assert_eq!(page.count, None);
    let n = &page.results[0];
    assert_eq!(n.id, "7");
    assert_eq!(n.body, "Your ride is on the way");
    assert!(n.is_unread());
    assert!(n.thread_id().is_none());
}

#[test]
fn garbage_bodies_are_decode_errors() {
    assert!(matches!(
        Page::<Message>::from_json("{\"detail\": \"Not found\"}"),
        Err(ApiError::Decode(_))
    ));
    assert!(matches!(Page::<Message>::from_json("<html>"), Err(ApiError::Decode(_))));
}

#[test]
fn read_response_count_is_extracted() {
    let body: serde_json::Value = serde_json::from_str(r#"{"status": "ok", "marked_read": 4}"#).unwrap();
    assert_eq!(read_count(&body), 4);
}
