//! Federation for fedsync.
//!
//! - **Activities**: the wire vocabulary exchanged between nodes
//! - **Processor**: applies inbound activities after policy and authority checks
//! - **Announcer**: turns local changes into activities and routes them
//! - **Resolver**: fetches unknown objects, coalescing concurrent lookups
//! - **Handler**: the shared inbox and the object server

pub mod activities;
pub mod announcer;
pub mod context;
pub mod convert;
pub mod delivery;
pub mod fetch;
pub mod handler;
pub mod locks;
pub mod objects;
pub mod processor;
pub mod resolver;

pub use activities::*;
pub use announcer::OutboundAnnouncer;
pub use context::{FederationContext, ResolveTimeouts};
pub use convert::*;
pub use delivery::{
    CollectingQueue, DeliveryQueue, DiscardingQueue, DeliveryQueueService, activity_type,
};
pub use fetch::{ACTIVITY_JSON, FetchResponse, HttpFetcher, ObjectFetcher, REQUESTER_HEADER};
pub use handler::{ACTOR_HEADER, FederationState, ObjectServer, inbox_handler, object_handler};
pub use locks::ObjectLocks;
pub use objects::*;
pub use processor::{InboxOutcome, InboxProcessor};
pub use resolver::Resolver;
