//! Core logic for fedsync.
//!
//! - [`authority`]: who may do what to a post or community
//! - [`facets`]: last-writer-wins moderation facets and moderation actions
//! - [`services`]: local intents, the policy filter and the announcement seam

pub mod authority;
pub mod facets;
pub mod services;

pub use authority::{Capabilities, Capability, resolve_capabilities};
pub use facets::{FacetKind, FacetOutcome, ModerationAction, apply_to_post, write_facet};
pub use services::*;
