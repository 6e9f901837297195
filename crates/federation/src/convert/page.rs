//! Post <-> `ApPage` conversion.

use activitypub_federation::kinds::object::PageType;
use fedsync_common::{AppResult, ObjectId};
use fedsync_db::entities::{EmbedMetadata, Facet, Post};

use crate::objects::{ApFacet, ApPage};

/// Extension trait for converting a post to `ApPage`.
pub trait PostToApPage {
    /// Convert to `ApPage`.
    fn to_ap_page(&self) -> ApPage;
}

impl PostToApPage for Post {
    fn to_ap_page(&self) -> ApPage {
        ApPage {
            kind: PageType::Page,
            id: self.ap_id.inner().clone(),
            attributed_to: self.creator_id.inner().clone(),
            audience: self.community_id.inner().clone(),
            name: self.name.clone(),
            content: self.body.clone(),
            url: self.url.clone(),
            sensitive: self.nsfw,
            embed_title: self.embed.title.clone(),
            embed_description: self.embed.description.clone(),
            embed_video_url: self.embed.video_url.clone(),
            published: self.published_at,
            updated: self.updated_at,
            locked: to_ap_facet(self.locked),
            stickied: to_ap_facet(self.featured_community),
        }
    }
}

fn to_ap_facet(facet: Facet) -> Option<ApFacet> {
    facet.updated_at.map(|updated| ApFacet {
        value: facet.value,
        updated,
    })
}

fn from_ap_facet(facet: Option<ApFacet>) -> Facet {
    facet.map_or_else(Facet::default, |f| Facet::set(f.value, f.updated))
}

/// Extension trait for `ApPage`.
pub trait ApPageExt {
    /// Build a mirror post. The local key is assigned on insert.
    fn to_post(&self) -> AppResult<Post>;
}

impl ApPageExt for ApPage {
    fn to_post(&self) -> AppResult<Post> {
        let ap_id = ObjectId::new(self.id.clone());
        // Validates that the id carries a host.
        ap_id.instance()?;

        Ok(Post {
            id: 0,
            ap_id,
            local: false,
            name: self.name.clone(),
            body: self.content.clone(),
            url: self.url.clone(),
            nsfw: self.sensitive,
            embed: EmbedMetadata {
                title: self.embed_title.clone(),
                description: self.embed_description.clone(),
                video_url: self.embed_video_url.clone(),
            },
            creator_id: ObjectId::new(self.attributed_to.clone()),
            community_id: ObjectId::new(self.audience.clone()),
            published_at: self.published,
            updated_at: self.updated,
            locked: from_ap_facet(self.locked),
            removed: Facet::default(),
            removed_by: None,
            deleted: Facet::default(),
            featured_community: from_ap_facet(self.stickied),
            local_removals: Default::default(),
            score: 0,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fedsync_db::test_utils::post_fixture;

    #[test]
    fn test_page_carries_content_and_facets() {
        let mut post = post_fixture("https://alpha.example/post/abc", "alpha", "main");
        post.body = Some("body".to_string());
        post.nsfw = true;
        post.embed.title = Some("Embedded".to_string());
        post.locked = Facet::set(true, Utc::now());

        let page = post.to_ap_page();
        assert_eq!(page.id.as_str(), "https://alpha.example/post/abc");
        assert!(page.sensitive);
        assert_eq!(page.locked.map(|f| f.value), Some(true));
        assert!(page.stickied.is_none());

        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["type"], "Page");
        assert_eq!(json["embedTitle"], "Embedded");

        let mirror = serde_json::from_value::<ApPage>(json).unwrap().to_post().unwrap();
        assert!(!mirror.local);
        assert_eq!(mirror.name, post.name);
        assert_eq!(mirror.body, post.body);
        assert_eq!(mirror.embed, post.embed);
        assert_eq!(mirror.locked, post.locked);
        assert!(!mirror.featured_community.value);
        assert!(mirror.featured_community.updated_at.is_none());
    }
}
