//! Community <-> `ApGroup` conversion.

use std::collections::BTreeSet;

use activitypub_federation::kinds::actor::GroupType;
use fedsync_common::{AppResult, ObjectId};
use fedsync_db::entities::Community;

use crate::activities::featured_url;
use crate::objects::ApGroup;

/// Extension trait for converting a community to `ApGroup`.
pub trait CommunityToApGroup {
    /// Convert to `ApGroup`.
    fn to_ap_group(&self) -> AppResult<ApGroup>;
}

impl CommunityToApGroup for Community {
    fn to_ap_group(&self) -> AppResult<ApGroup> {
        Ok(ApGroup {
            kind: GroupType::Group,
            id: self.ap_id.inner().clone(),
            preferred_username: self.name.clone(),
            name: self.title.clone(),
            inbox: self.ap_id.instance()?.inbox_url()?,
            moderators: self.moderators.iter().map(|m| m.inner().clone()).collect(),
            featured: featured_url(self.ap_id.inner()),
            removed: self.removed,
            deleted: self.deleted,
            published: self.published_at,
        })
    }
}

/// Extension trait for `ApGroup`.
pub trait ApGroupExt {
    /// Build a mirror community.
    fn to_community(&self) -> AppResult<Community>;
}

impl ApGroupExt for ApGroup {
    fn to_community(&self) -> AppResult<Community> {
        let ap_id = ObjectId::new(self.id.clone());
        ap_id.instance()?;
        Ok(Community {
            id: 0,
            ap_id,
            name: self.preferred_username.clone(),
            title: self.name.clone(),
            local: false,
            moderators: self
                .moderators
                .iter()
                .cloned()
                .map(ObjectId::new)
                .collect::<BTreeSet<_>>(),
            removed: self.removed,
            deleted: self.deleted,
            published_at: self.published,
        })
    }
}
