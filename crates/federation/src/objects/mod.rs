//! Federated object types.

#![allow(missing_docs)]

mod collection;
mod group;
mod page;
mod person;

pub use collection::ApFeaturedCollection;
pub use group::ApGroup;
pub use page::{ApFacet, ApPage};
pub use person::ApPerson;
