//! Report delivery and resolution convergence.

#![allow(clippy::unwrap_used)]

mod common;

use common::{Cluster, copy_of};
use fedsync_common::AppError;
use fedsync_core::CreateReportInput;
use fedsync_db::entities::{Post, Report};
use fedsync_server::Node;

fn report_input(post: &Post, reason: &str) -> CreateReportInput {
    CreateReportInput {
        post_id: post.ap_id.clone(),
        reason: reason.to_string(),
    }
}

async fn held(node: &Node, report: &Report) -> Option<Report> {
    node.store.reports.find_by_ap_id(&report.ap_id).await.unwrap()
}

#[tokio::test]
async fn test_report_reaches_community_home_and_creator_home() {
    let c = Cluster::new().await;
    let post = c.post(&c.beta, &c.bob, "questionable").await;

    let report = c
        .gamma
        .reports
        .create_report(&c.carol, report_input(&post, "rule 3"))
        .await
        .unwrap();
    c.net.settle().await;

    assert!(report.local);
    for node in [&c.alpha, &c.beta] {
        let copy = held(node, &report).await.unwrap();
        assert!(!copy.local);
        assert_eq!(copy.reason, "rule 3");
        assert_eq!(copy.reporter_id, c.carol.ap_id);
        assert_eq!(copy.creator_id, c.bob.ap_id);
        assert_eq!(copy.original_post_name, "questionable");
        assert!(!copy.is_resolved());
    }
}

#[tokio::test]
async fn test_report_snapshot_survives_edit() {
    let c = Cluster::new().await;
    let post = c.post(&c.alpha, &c.alice, "before").await;
    let report = c
        .gamma
        .reports
        .create_report(&c.carol, report_input(&post, "spam"))
        .await
        .unwrap();
    c.net.settle().await;

    let mut edit = fedsync_core::UpdatePostInput::new(post.ap_id.clone());
    edit.name = Some("after".to_string());
    c.alpha.posts.update(&c.alice, edit).await.unwrap();
    c.net.settle().await;

    assert_eq!(copy_of(&c.alpha, &post).await.unwrap().name, "after");
    assert_eq!(held(&c.alpha, &report).await.unwrap().original_post_name, "before");
}

#[tokio::test]
async fn test_resolution_by_remote_moderator_converges() {
    let c = Cluster::new().await;
    c.alpha
        .moderation
        .set_moderator(&c.alpha_mod, &c.community.ap_id, &c.bob.ap_id, true)
        .await
        .unwrap();
    let post = c.post(&c.alpha, &c.alice, "reported").await;
    let report = c
        .gamma
        .reports
        .create_report(&c.carol, report_input(&post, "off topic"))
        .await
        .unwrap();
    c.net.settle().await;
    assert!(held(&c.beta, &report).await.is_some());

    c.beta
        .reports
        .resolve_report(&c.bob, &report.ap_id, true)
        .await
        .unwrap();
    c.net.settle().await;

    for node in [&c.alpha, &c.beta, &c.gamma] {
        let copy = held(node, &report).await.unwrap();
        assert!(copy.is_resolved(), "unresolved on {}", node.instance);
        assert_eq!(copy.resolver_id.as_ref(), Some(&c.bob.ap_id));
    }
    // Nothing was sent back to the resolving node.
    assert!(c.net.deliveries_to(&c.beta, "Resolve").await.is_empty());
}

#[tokio::test]
async fn test_resolving_twice_is_idempotent() {
    let c = Cluster::new().await;
    let post = c.post(&c.alpha, &c.alice, "reported").await;
    let report = c
        .gamma
        .reports
        .create_report(&c.carol, report_input(&post, "dupe"))
        .await
        .unwrap();
    c.net.settle().await;

    let first = c
        .alpha
        .reports
        .resolve_report(&c.alpha_mod, &report.ap_id, true)
        .await
        .unwrap();
    c.net.settle().await;
    c.net.clear_deliveries().await;

    let second = c
        .alpha
        .reports
        .resolve_report(&c.alpha_mod, &report.ap_id, true)
        .await
        .unwrap();
    c.net.settle().await;

    assert_eq!(first.resolved, second.resolved);
    assert!(c.net.deliveries().await.is_empty());
    assert!(held(&c.gamma, &report).await.unwrap().is_resolved());
}

#[tokio::test]
async fn test_unresolve_converges() {
    let c = Cluster::new().await;
    let post = c.post(&c.alpha, &c.alice, "reported").await;
    let report = c
        .gamma
        .reports
        .create_report(&c.carol, report_input(&post, "maybe"))
        .await
        .unwrap();
    c.net.settle().await;

    c.alpha
        .reports
        .resolve_report(&c.alpha_mod, &report.ap_id, true)
        .await
        .unwrap();
    c.net.settle().await;
    c.alpha
        .reports
        .resolve_report(&c.alpha_mod, &report.ap_id, false)
        .await
        .unwrap();
    c.net.settle().await;

    assert!(!held(&c.gamma, &report).await.unwrap().is_resolved());
}

#[tokio::test]
async fn test_reporter_cannot_resolve() {
    let c = Cluster::new().await;
    let post = c.post(&c.alpha, &c.alice, "reported").await;
    let report = c
        .gamma
        .reports
        .create_report(&c.carol, report_input(&post, "mine"))
        .await
        .unwrap();

    let err = c
        .gamma
        .reports
        .resolve_report(&c.carol, &report.ap_id, true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn test_listing_by_role() {
    let c = Cluster::new().await;
    let post = c.post(&c.beta, &c.bob, "listed").await;
    let report = c
        .gamma
        .reports
        .create_report(&c.carol, report_input(&post, "check"))
        .await
        .unwrap();
    c.net.settle().await;

    let for_mod = c
        .alpha
        .reports
        .list_reports(&c.alpha_mod, false, true)
        .await
        .unwrap();
    assert_eq!(for_mod.len(), 1);
    assert_eq!(for_mod[0].ap_id, report.ap_id);

    let for_home_admin = c
        .alpha
        .reports
        .list_reports(&c.alpha_admin, false, true)
        .await
        .unwrap();
    assert_eq!(for_home_admin.len(), 1);

    // Beta holds it as the creator's home, but only shows it on request.
    let hidden = c
        .beta
        .reports
        .list_reports(&c.beta_admin, false, false)
        .await
        .unwrap();
    assert!(hidden.is_empty());
    let shown = c
        .beta
        .reports
        .list_reports(&c.beta_admin, true, false)
        .await
        .unwrap();
    assert_eq!(shown.len(), 1);

    c.alpha
        .reports
        .resolve_report(&c.alpha_mod, &report.ap_id, true)
        .await
        .unwrap();
    let unresolved = c
        .alpha
        .reports
        .list_reports(&c.alpha_mod, false, true)
        .await
        .unwrap();
    assert!(unresolved.is_empty());
}
