//! Add and Remove against a community collection.
//!
//! The `target` names the collection: `{community}/featured` for featured
//! posts, `{community}/moderators` for the moderator list.

use activitypub_federation::kinds::activity::{AddType, RemoveType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Which community collection an Add or Remove targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectionTarget {
    Featured(Url),
    Moderators(Url),
}

impl CollectionTarget {
    /// Parse a collection URL into the collection and its community.
    #[must_use]
    pub fn parse(target: &Url) -> Option<Self> {
        let path = target.path().trim_end_matches('/');
        let (community_path, collection) = path.rsplit_once('/')?;
        let mut community = target.clone();
        community.set_path(community_path);
        community.set_query(None);
        match collection {
            "featured" => Some(Self::Featured(community)),
            "moderators" => Some(Self::Moderators(community)),
            _ => None,
        }
    }

    /// The community owning the collection.
    #[must_use]
    pub const fn community(&self) -> &Url {
        match self {
            Self::Featured(c) | Self::Moderators(c) => c,
        }
    }
}

/// URL of a community's featured collection.
#[must_use]
pub fn featured_url(community: &Url) -> Url {
    collection_url(community, "featured")
}

/// URL of a community's moderators collection.
#[must_use]
pub fn moderators_url(community: &Url) -> Url {
    collection_url(community, "moderators")
}

fn collection_url(community: &Url, name: &str) -> Url {
    let mut url = community.clone();
    let path = format!("{}/{name}", community.path().trim_end_matches('/'));
    url.set_path(&path);
    url
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionAdd {
    #[serde(rename = "type")]
    pub kind: AddType,
    pub id: Url,
    pub actor: Url,
    /// Post to feature, or person to make moderator.
    pub object: Url,
    pub target: Url,
    pub published: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRemove {
    #[serde(rename = "type")]
    pub kind: RemoveType,
    pub id: Url,
    pub actor: Url,
    pub object: Url,
    pub target: Url,
    pub published: DateTime<Utc>,
}
