//! What a node answers over HTTP: the shared inbox and object fetches.

#![allow(missing_docs)]

mod inbox;
mod object;

pub use inbox::{ACTOR_HEADER, inbox_handler};
pub use object::{ObjectServer, object_handler};

use crate::processor::InboxProcessor;

/// State shared by the federation routes.
#[derive(Clone)]
pub struct FederationState {
    pub inbox: InboxProcessor,
    pub objects: ObjectServer,
}
