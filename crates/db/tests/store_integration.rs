//! Store-level tests across repositories.

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use fedsync_common::config::PolicyConfig;
use fedsync_common::{AppError, InstanceId};
use fedsync_db::Store;
use fedsync_db::entities::{FollowState, PostFilter, Vote};
use fedsync_db::test_utils::{
    community_fixture, community_id, follow_fixture, person_fixture, person_id, post_fixture,
};
use maplit::btreeset;
use url::Url;

fn instance(label: &str) -> InstanceId {
    InstanceId::from_url(&Url::parse(&format!("https://{label}.example/")).unwrap()).unwrap()
}

fn store() -> Store {
    let policy = PolicyConfig {
        blocked_instances: vec![" Spam.Example ".to_string()],
        ..PolicyConfig::default()
    };
    Store::new(instance("alpha"), &policy)
}

#[tokio::test]
async fn test_site_is_seeded_from_config() {
    let store = store();
    let site = store.local_site.get().await.unwrap();

    assert_eq!(site.instance, instance("alpha"));
    assert_eq!(site.blocked_instances, btreeset! {"spam.example".to_string()});
    assert!(!site.disallow_nsfw_content);
}

#[tokio::test]
async fn test_duplicate_identifier_conflicts() {
    let store = store();
    store
        .persons
        .create(person_fixture("beta", "bob", false))
        .await
        .unwrap();

    let err = store
        .persons
        .create(person_fixture("beta", "bob", false))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_moderated_communities() {
    let store = store();
    let bob = person_id("beta", "bob");
    let mut main = community_fixture("alpha", "main", true);
    main.moderators = btreeset! {person_id("alpha", "mod"), bob.clone()};
    store.communities.create(main).await.unwrap();
    store
        .communities
        .create(community_fixture("alpha", "quiet", true))
        .await
        .unwrap();

    let moderated = store.communities.find_moderated_by(&bob).await.unwrap();
    assert_eq!(moderated.len(), 1);
    assert_eq!(moderated[0].ap_id, community_id("alpha", "main"));
}

#[tokio::test]
async fn test_post_filter_by_community_instance() {
    let store = store();
    store
        .posts
        .create(post_fixture("https://alpha.example/post/a", "alpha", "main"))
        .await
        .unwrap();
    store
        .posts
        .create(post_fixture("https://beta.example/post/b", "beta", "side"))
        .await
        .unwrap();

    let filter = PostFilter {
        community_instance: Some(instance("beta")),
        ..PostFilter::default()
    };
    let posts = store.posts.list(&filter).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].ap_id.as_str(), "https://beta.example/post/b");
}

#[tokio::test]
async fn test_vote_score_sums_records() {
    let store = store();
    let post = store
        .posts
        .create(post_fixture("https://alpha.example/post/a", "alpha", "main"))
        .await
        .unwrap();
    for (voter, score) in [("alice", 1), ("bob", 1), ("carol", -1)] {
        store
            .votes
            .upsert(Vote {
                id: 0,
                person_id: person_id("alpha", voter),
                post_id: post.ap_id.clone(),
                score,
                published_at: Utc::now(),
            })
            .await
            .unwrap();
    }
    assert_eq!(store.votes.score(&post.ap_id).await.unwrap(), 1);

    // Changing a vote replaces it.
    store
        .votes
        .upsert(Vote {
            id: 0,
            person_id: person_id("alpha", "carol"),
            post_id: post.ap_id.clone(),
            score: 1,
            published_at: Utc::now(),
        })
        .await
        .unwrap();
    assert_eq!(store.votes.score(&post.ap_id).await.unwrap(), 3);

    store
        .votes
        .delete(&person_id("alpha", "bob"), &post.ap_id)
        .await
        .unwrap();
    assert_eq!(store.votes.score(&post.ap_id).await.unwrap(), 2);
}

#[tokio::test]
async fn test_follow_lifecycle() {
    let store = store();
    let community = community_id("alpha", "main");
    let bob = person_id("beta", "bob");

    store
        .follows
        .upsert(follow_fixture(&bob, &community))
        .await
        .unwrap();
    assert!(store.follows.follower_instances(&community).await.unwrap().is_empty());
    assert!(
        store
            .follows
            .has_follower_from(&community, &instance("beta"))
            .await
            .unwrap()
    );

    let accepted = store.follows.accept(&bob, &community).await.unwrap().unwrap();
    assert_eq!(accepted.state, FollowState::Accepted);
    assert_eq!(
        store.follows.follower_instances(&community).await.unwrap(),
        vec![instance("beta")]
    );

    assert!(store.follows.delete(&bob, &community).await.unwrap());
    assert!(store.follows.find(&bob, &community).await.unwrap().is_none());
    assert!(store.follows.accept(&bob, &community).await.unwrap().is_none());
}
