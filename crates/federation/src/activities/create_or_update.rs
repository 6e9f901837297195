//! Create or Update of a post.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::kinds::CreateOrUpdateType;
use crate::objects::ApPage;

/// Create or Update activity carrying a full [`ApPage`].
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrUpdatePage {
    #[serde(rename = "type")]
    pub kind: CreateOrUpdateType,
    pub id: Url,
    pub actor: Url,
    pub object: ApPage,
    pub published: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<Url>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<Url>,
}

impl CreateOrUpdatePage {
    /// Create a new Create or Update activity.
    #[must_use]
    pub fn new(
        kind: CreateOrUpdateType,
        id: Url,
        actor: Url,
        object: ApPage,
        published: DateTime<Utc>,
    ) -> Self {
        let to = vec![object.audience.clone()];
        Self {
            kind,
            id,
            actor,
            object,
            published,
            to,
            cc: Vec::new(),
        }
    }
}
