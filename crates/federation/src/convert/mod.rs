//! Conversion between entities and federated objects.

#![allow(missing_docs)]

mod community;
mod links;
mod page;
mod person;

pub use community::{ApGroupExt, CommunityToApGroup};
pub use links::{parse_permalink, permalink, rewrite_post_links};
pub use page::{ApPageExt, PostToApPage};
pub use person::{ApPersonExt, PersonToApPerson};
