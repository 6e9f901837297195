//! Outbound delivery for fedsync.
//!
//! - **Jobs**: one activity for one instance's shared inbox
//! - **Workers**: the apalis `deliver` worker, with exponential backoff and
//!   bounded dead letters
//! - **Transport**: HTTP POST to `{instance}/inbox`

pub mod delivery_impl;
pub mod jobs;
pub mod retry;
pub mod transport;
pub mod workers;

pub use delivery_impl::TaskDeliveryQueue;
pub use jobs::*;
pub use retry::{DeadLetterEntry, RetryConfig};
pub use transport::{DeliveryTransport, HttpTransport};
pub use workers::*;
