//! Wire format compatibility.
//!
//! Payloads here are shaped like what other community platforms send: JSON-LD
//! context, addressing fields and properties this node ignores.

#![allow(clippy::unwrap_used, clippy::panic)]

use fedsync_federation::{AnnouncableActivity, ApPage, InboxActivity, UndoObject};
use serde_json::json;

fn page() -> serde_json::Value {
    json!({
        "type": "Page",
        "id": "https://alpha.example/post/01j0",
        "attributedTo": "https://alpha.example/u/alice",
        "audience": "https://alpha.example/c/main",
        "to": ["https://alpha.example/c/main", "https://www.w3.org/ns/activitystreams#Public"],
        "name": "Hello",
        "content": "<p>Hello</p>",
        "mediaType": "text/html",
        "source": {"content": "Hello", "mediaType": "text/markdown"},
        "sensitive": false,
        "commentsEnabled": true,
        "published": "2024-03-01T10:00:00Z",
        "updated": "2024-03-01T11:00:00Z",
        "language": {"identifier": "en", "name": "English"}
    })
}

#[test]
fn test_create_page_with_extra_properties() {
    let activity: InboxActivity = serde_json::from_value(json!({
        "@context": ["https://www.w3.org/ns/activitystreams", "https://w3id.org/security/v1"],
        "type": "Create",
        "id": "https://alpha.example/activities/create/1",
        "actor": "https://alpha.example/u/alice",
        "object": page(),
        "to": ["https://alpha.example/c/main"],
        "cc": [],
        "published": "2024-03-01T10:00:00Z"
    }))
    .unwrap();

    let InboxActivity::Announcable(AnnouncableActivity::CreateOrUpdate(create)) = activity else {
        panic!("expected Create");
    };
    assert_eq!(create.object.name, "Hello");
    assert_eq!(create.object.content.as_deref(), Some("<p>Hello</p>"));
    assert!(create.object.updated.is_some());
    assert!(create.object.locked.is_none());
}

#[test]
fn test_announced_removal() {
    let activity: InboxActivity = serde_json::from_value(json!({
        "type": "Announce",
        "id": "https://alpha.example/activities/announce/1",
        "actor": "https://alpha.example/c/main",
        "to": ["https://www.w3.org/ns/activitystreams#Public"],
        "object": {
            "type": "Delete",
            "id": "https://beta.example/activities/delete/1",
            "actor": "https://beta.example/u/bob",
            "object": "https://alpha.example/post/01j0",
            "audience": "https://alpha.example/c/main",
            "remove": true,
            "summary": "off topic",
            "published": "2024-03-02T08:00:00Z"
        },
        "published": "2024-03-02T08:00:01Z"
    }))
    .unwrap();

    let InboxActivity::Announce(announce) = activity else {
        panic!("expected Announce");
    };
    let AnnouncableActivity::Delete(delete) = *announce.object else {
        panic!("expected Delete");
    };
    assert!(delete.remove);
    assert_eq!(delete.summary.as_deref(), Some("off topic"));
}

#[test]
fn test_site_ban_and_its_undo() {
    let block = json!({
        "type": "Block",
        "id": "https://alpha.example/activities/block/1",
        "actor": "https://alpha.example/u/admin",
        "object": "https://beta.example/u/bob",
        "target": "https://alpha.example/",
        "removeData": true,
        "expires": "2030-01-01T00:00:00Z",
        "published": "2024-03-03T00:00:00Z"
    });

    let activity: InboxActivity = serde_json::from_value(block.clone()).unwrap();
    let InboxActivity::Announcable(AnnouncableActivity::Block(ban)) = activity else {
        panic!("expected Block");
    };
    assert!(ban.remove_data);
    assert!(ban.expires.is_some());

    let undo: InboxActivity = serde_json::from_value(json!({
        "type": "Undo",
        "id": "https://alpha.example/activities/undo/1",
        "actor": "https://alpha.example/u/admin",
        "object": block,
        "published": "2024-03-04T00:00:00Z"
    }))
    .unwrap();
    let InboxActivity::Announcable(AnnouncableActivity::Undo(undo)) = undo else {
        panic!("expected Undo");
    };
    assert!(matches!(undo.object, UndoObject::Block(_)));
}

#[test]
fn test_flag_carries_snapshot() {
    let activity: InboxActivity = serde_json::from_value(json!({
        "type": "Flag",
        "id": "https://gamma.example/activities/flag/1",
        "actor": "https://gamma.example/u/carol",
        "object": "https://alpha.example/post/01j0",
        "audience": "https://alpha.example/c/main",
        "attributedTo": "https://alpha.example/u/alice",
        "summary": "spam",
        "originalPostName": "Hello",
        "published": "2024-03-05T00:00:00Z"
    }))
    .unwrap();

    assert_eq!(activity.activity_type(), "Flag");
    let InboxActivity::Report(report) = activity else {
        panic!("expected Flag");
    };
    assert_eq!(report.original_post_name, "Hello");
    assert!(report.original_post_body.is_none());
}

#[test]
fn test_unsupported_activity_has_no_actor() {
    let activity: InboxActivity = serde_json::from_value(json!({
        "type": "Move",
        "id": "https://alpha.example/activities/move/1",
        "object": "https://alpha.example/u/alice",
        "target": "https://elsewhere.example/u/alice"
    }))
    .unwrap();

    assert_eq!(activity.activity_type(), "Unknown");
    assert!(activity.actor().is_none());
}

#[test]
fn test_page_serializes_camel_case_and_skips_empty() {
    let page: ApPage = serde_json::from_value(page()).unwrap();
    let value = serde_json::to_value(&page).unwrap();

    assert_eq!(value["attributedTo"], "https://alpha.example/u/alice");
    assert!(value.get("attributed_to").is_none());
    assert!(value.get("embedTitle").is_none());
    assert!(value.get("stickied").is_none());
    assert_eq!(value["sensitive"], false);
}
