//! Ban entities.
//!
//! A ban by a person's home instance is held on the person row itself
//! (`person::Model::banned`). Bans issued by any other instance and community
//! bans live here. Lifting a ban keeps the row with `banned` cleared, so a
//! late ban older than the lift can be recognised as stale.

use chrono::{DateTime, Utc};
use fedsync_common::{InstanceId, ObjectId};
use serde::{Deserialize, Serialize};

use super::post::Facet;

/// A person banned by an instance that is not their home.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceBan {
    pub id: i64,
    pub person_id: ObjectId,
    /// The banning instance.
    pub instance: InstanceId,
    pub banned: Facet,
    pub reason: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl InstanceBan {
    /// A row that has never been written.
    #[must_use]
    pub const fn empty(person_id: ObjectId, instance: InstanceId) -> Self {
        Self {
            id: 0,
            person_id,
            instance,
            banned: Facet {
                value: false,
                updated_at: None,
            },
            reason: None,
            expires_at: None,
        }
    }
}

/// A person banned from a community.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityBan {
    pub id: i64,
    pub person_id: ObjectId,
    pub community_id: ObjectId,
    pub banned: Facet,
    pub reason: Option<String>,
    /// When this node learned of the ban.
    pub received_ban_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CommunityBan {
    /// A row that has never been written.
    #[must_use]
    pub const fn empty(person_id: ObjectId, community_id: ObjectId) -> Self {
        Self {
            id: 0,
            person_id,
            community_id,
            banned: Facet {
                value: false,
                updated_at: None,
            },
            reason: None,
            received_ban_at: None,
            expires_at: None,
        }
    }
}

macro_rules! impl_in_force {
    ($ty:ty) => {
        impl $ty {
            /// Whether the ban is in force at `now`.
            #[must_use]
            pub fn is_in_force(&self, now: DateTime<Utc>) -> bool {
                self.banned.value && self.expires_at.is_none_or(|expires| expires > now)
            }
        }
    };
}

impl_in_force!(InstanceBan);
impl_in_force!(CommunityBan);
