//! Fixtures for tests in this and dependent crates.

use std::collections::BTreeSet;

use chrono::Utc;
use fedsync_common::ObjectId;
use url::Url;

use crate::entities::{
    Community, EmbedMetadata, Facet, Follow, FollowState, Person, Post,
};

fn parse(raw: &str) -> ObjectId {
    ObjectId::new(Url::parse(raw).unwrap_or_else(|e| panic!("bad fixture url {raw}: {e}")))
}

/// `https://{label}.example/u/{name}`
#[must_use]
pub fn person_id(label: &str, name: &str) -> ObjectId {
    parse(&format!("https://{label}.example/u/{name}"))
}

/// `https://{label}.example/c/{name}`
#[must_use]
pub fn community_id(label: &str, name: &str) -> ObjectId {
    parse(&format!("https://{label}.example/c/{name}"))
}

/// A person homed on `label`.
#[must_use]
pub fn person_fixture(label: &str, name: &str, local: bool) -> Person {
    Person {
        id: 0,
        ap_id: person_id(label, name),
        name: name.to_string(),
        local,
        admin: false,
        banned: Facet::default(),
        ban_expires_at: None,
        published_at: Utc::now(),
    }
}

/// A community homed on `label`.
#[must_use]
pub fn community_fixture(label: &str, name: &str, local: bool) -> Community {
    Community {
        id: 0,
        ap_id: community_id(label, name),
        name: name.to_string(),
        title: name.to_string(),
        local,
        moderators: BTreeSet::new(),
        removed: false,
        deleted: false,
        published_at: Utc::now(),
    }
}

/// A post by `alice@{label}` in `{community}@{label}`.
#[must_use]
pub fn post_fixture(ap_id: &str, label: &str, community: &str) -> Post {
    Post {
        id: 0,
        ap_id: parse(ap_id),
        local: true,
        name: "A post".to_string(),
        body: None,
        url: None,
        nsfw: false,
        embed: EmbedMetadata::default(),
        creator_id: person_id(label, "alice"),
        community_id: community_id(label, community),
        published_at: Utc::now(),
        updated_at: None,
        locked: Facet::default(),
        removed: Facet::default(),
        removed_by: None,
        deleted: Facet::default(),
        featured_community: Facet::default(),
        local_removals: BTreeSet::new(),
        score: 0,
    }
}

/// A pending follow.
#[must_use]
pub fn follow_fixture(follower: &ObjectId, community: &ObjectId) -> Follow {
    Follow {
        id: 0,
        follower_id: follower.clone(),
        community_id: community.clone(),
        state: FollowState::Pending,
        published_at: Utc::now(),
    }
}
