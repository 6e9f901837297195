//! Common utilities and shared types for fedsync.
//!
//! This crate provides foundational components used across all fedsync crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Identifiers**: Origin-qualified [`ObjectId`]s, [`InstanceId`]s and ULID generation
//!
//! # Example
//!
//! ```no_run
//! use fedsync_common::{AppResult, Config, IdGenerator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let base = config.server.base_url()?;
//!     let post_id = IdGenerator::new().object_id(&base, "post")?;
//!     println!("Minted {post_id} on {}", post_id.instance()?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;

pub use config::Config;
pub use error::{AppError, AppResult, PolicyViolation};
pub use id::{IdGenerator, InstanceId, ObjectId};
