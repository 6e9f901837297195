//! Capability resolution.
//!
//! Authority over a post is computed from the actor, the post's creator and
//! the owning community. Nothing here looks at where an activity came from;
//! callers pass the already-verified actor.

use std::collections::BTreeSet;
use std::fmt;

use fedsync_common::ObjectId;
use fedsync_db::entities::{Community, Person};

/// A role an actor holds over an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// Creator of the object, or an admin of the creator's home instance.
    Owner,
    /// Moderator of the owning community.
    CommunityMod,
    /// Admin of the community's home instance.
    SiteAdmin,
    /// No authority.
    None,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Owner => "owner",
            Self::CommunityMod => "community_mod",
            Self::SiteAdmin => "site_admin",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// The capabilities an actor holds over one object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities(BTreeSet<Capability>);

impl Capabilities {
    /// Whether `capability` is held. `Capability::None` is held iff nothing else is.
    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::None => self.0.is_empty(),
            other => self.0.contains(&other),
        }
    }

    /// Whether the actor may moderate the community (lock, feature, remove, ban).
    #[must_use]
    pub fn can_moderate(&self) -> bool {
        self.has(Capability::CommunityMod) || self.has(Capability::SiteAdmin)
    }

    /// Whether the actor owns the object.
    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.has(Capability::Owner)
    }

    /// Held capabilities, `[None]` if empty.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Capability> {
        if self.0.is_empty() {
            vec![Capability::None]
        } else {
            self.0.iter().copied().collect()
        }
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.to_vec().iter().map(ToString::to_string).collect();
        f.write_str(&names.join(","))
    }
}

/// Resolve what `actor` may do to an object created by `creator` in `community`.
///
/// Pass `creator = None` for community-level actions (bans, moderator changes).
#[must_use]
pub fn resolve_capabilities(
    actor: &Person,
    creator: Option<&ObjectId>,
    community: &Community,
) -> Capabilities {
    let mut caps = BTreeSet::new();

    if creator.is_some_and(|creator| creator == &actor.ap_id || is_home_admin(actor, creator)) {
        caps.insert(Capability::Owner);
    }
    if community.is_moderator(&actor.ap_id) {
        caps.insert(Capability::CommunityMod);
    }
    if is_home_admin(actor, &community.ap_id) {
        caps.insert(Capability::SiteAdmin);
    }

    Capabilities(caps)
}

/// Whether `actor` is an admin of the instance `object` lives on.
fn is_home_admin(actor: &Person, object: &ObjectId) -> bool {
    actor.admin
        && matches!(
            (actor.ap_id.instance(), object.instance()),
            (Ok(actor_home), Ok(object_home)) if actor_home == object_home
        )
}
