//! Page object (a post).

use activitypub_federation::kinds::object::PageType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A moderation facet as carried on the wire: the value and when it was set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApFacet {
    pub value: bool,
    pub updated: DateTime<Utc>,
}

/// A post.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApPage {
    #[serde(rename = "type")]
    pub kind: PageType,
    pub id: Url,
    pub attributed_to: Url,
    /// Community the post belongs to.
    pub audience: Url,
    pub name: String,

    /// Markdown body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,

    #[serde(default)]
    pub sensitive: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_video_url: Option<Url>,

    pub published: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<ApFacet>,

    /// Featured in the community.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stickied: Option<ApFacet>,
}
