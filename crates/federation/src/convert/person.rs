//! Person <-> `ApPerson` conversion.

use activitypub_federation::kinds::actor::PersonType;
use fedsync_common::{AppResult, ObjectId};
use fedsync_db::entities::{Facet, Person};

use crate::objects::ApPerson;

/// Extension trait for converting a person to `ApPerson`.
pub trait PersonToApPerson {
    /// Convert to `ApPerson`.
    fn to_ap_person(&self) -> AppResult<ApPerson>;
}

impl PersonToApPerson for Person {
    fn to_ap_person(&self) -> AppResult<ApPerson> {
        Ok(ApPerson {
            kind: PersonType::Person,
            id: self.ap_id.inner().clone(),
            preferred_username: self.name.clone(),
            inbox: self.home()?.inbox_url()?,
            admin: self.admin,
            published: self.published_at,
        })
    }
}

/// Extension trait for `ApPerson`.
pub trait ApPersonExt {
    /// Build a mirror person.
    fn to_person(&self) -> AppResult<Person>;
}

impl ApPersonExt for ApPerson {
    fn to_person(&self) -> AppResult<Person> {
        let ap_id = ObjectId::new(self.id.clone());
        ap_id.instance()?;
        Ok(Person {
            id: 0,
            ap_id,
            name: self.preferred_username.clone(),
            local: false,
            admin: self.admin,
            banned: Facet::default(),
            ban_expires_at: None,
            published_at: self.published,
        })
    }
}
