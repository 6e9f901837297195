//! Entities held by a node.
//!
//! Each module exposes a plain `Model`. Keys are assigned by the repository on
//! insert and never leave the node; `ap_id` is the federated identity.

#![allow(missing_docs)]

pub mod ban;
pub mod community;
pub mod follow;
pub mod local_site;
pub mod person;
pub mod post;
pub mod report;
pub mod vote;

pub use ban::{CommunityBan, InstanceBan};
pub use community::Model as Community;
pub use follow::{FollowState, Model as Follow};
pub use local_site::Model as LocalSite;
pub use person::Model as Person;
pub use post::{EmbedMetadata, Facet, LocalRemoval, Model as Post, PostFilter, RemovalSource};
pub use report::Model as Report;
pub use vote::Model as Vote;
