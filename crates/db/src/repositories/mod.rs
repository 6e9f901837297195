//! Repositories over the in-memory tables.

pub mod ban;
pub mod community;
pub mod follow;
pub mod local_site;
pub mod person;
pub mod post;
pub mod report;
pub mod table;
pub mod vote;

pub use ban::BanRepository;
pub use community::CommunityRepository;
pub use follow::FollowRepository;
pub use local_site::LocalSiteRepository;
pub use person::PersonRepository;
pub use post::PostRepository;
pub use report::{ReportFilter, ReportRepository};
pub use table::{Record, Table};
pub use vote::VoteRepository;
