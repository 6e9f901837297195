//! Featured posts collection.

use activitypub_federation::kinds::collection::OrderedCollectionType;
use serde::{Deserialize, Serialize};
use url::Url;

use super::ApPage;

/// A community's featured posts, served at `{community}/featured`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApFeaturedCollection {
    #[serde(rename = "type")]
    pub kind: OrderedCollectionType,
    pub id: Url,
    pub total_items: usize,
    #[serde(default)]
    pub ordered_items: Vec<ApPage>,
}

impl ApFeaturedCollection {
    #[must_use]
    pub fn new(id: Url, ordered_items: Vec<ApPage>) -> Self {
        Self {
            kind: OrderedCollectionType::OrderedCollection,
            id,
            total_items: ordered_items.len(),
            ordered_items,
        }
    }
}
