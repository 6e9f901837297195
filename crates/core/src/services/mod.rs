//! Business logic services.

#![allow(missing_docs)]

pub mod delivery;
pub mod following;
pub mod instance;
pub mod moderation;
pub mod policy;
pub mod post;
pub mod report;

pub use delivery::{Announcement, Announcer, AnnouncerService, NoOpAnnouncer};
pub use following::{FollowResult, FollowingService};
pub use instance::{EditSiteInput, InstanceService};
pub use moderation::{BanInput, ModerationService, check_not_banned};
pub use policy::{PolicyFilter, PolicySnapshot, normalize_url_pattern};
pub use post::{CreatePostInput, PostService, UpdatePostInput};
pub use report::{CreateReportInput, ReportService};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing {
    use std::time::Duration;

    use fedsync_common::config::PolicyConfig;
    use fedsync_common::{InstanceId, ObjectId};
    use fedsync_db::Store;
    use fedsync_db::entities::Person;
    use fedsync_db::test_utils::{community_fixture, person_fixture};
    use url::Url;

    use super::policy::PolicyFilter;

    /// A store for `alpha.example` holding the local community `main`.
    pub async fn alpha_store() -> (Store, PolicyFilter, ObjectId) {
        let instance =
            InstanceId::from_url(&Url::parse("https://alpha.example/").unwrap()).unwrap();
        let store = Store::new(instance, &PolicyConfig::default());
        let community = store
            .communities
            .create(community_fixture("alpha", "main", true))
            .await
            .unwrap();
        let policy = PolicyFilter::new(store.local_site.clone(), Duration::ZERO);
        (store, policy, community.ap_id)
    }

    pub async fn local_person(store: &Store, name: &str) -> Person {
        store
            .persons
            .create(person_fixture("alpha", name, true))
            .await
            .unwrap()
    }

    pub async fn remote_person(store: &Store, label: &str, name: &str) -> Person {
        store
            .persons
            .create(person_fixture(label, name, false))
            .await
            .unwrap()
    }
}
