mod common;

use common::{member, Cluster};
use hearth_core::{
    partition, GrainIdentity, GrainMessage, InvokeError, Member, MemberId, MembershipUpdate,
    MembershipView, RemoteInvocation,
};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// First `lamp/rN` identity owned by `owner` under `view`.
fn identity_owned_by(owner: &MemberId, view: &MembershipView) -> GrainIdentity {
    (0..)
        .map(|i| GrainIdentity::new("lamp", format!("r{i}")))
        .find(|id| partition::owner_of(id, view).as_ref() == Some(owner))
        .unwrap()
}

#[tokio::test]
async fn test_rebalance_evicts_only_moved_grains() {
    let cluster = Cluster::start(3);
    let first = &cluster.nodes[0];

    for i in 0..30 {
        first.grain("lamp", format!("room-{i}")).call("turn_on", json!({})).await.unwrap();
    }
    let before: usize = cluster.nodes.iter().map(|n| n.activations().directory().len()).sum();
    assert_eq!(before, 30);

    // A fourth member joins the view. Existing nodes only lose grains.
    let mut members: Vec<MemberId> = cluster.nodes.iter().map(|n| n.member().clone()).collect();
    members.push(MemberId::new("m4:7000"));
    cluster.publish(&members);

    let mut evicted = 0;
    for node in &cluster.nodes {
        let report = node.rebalance_now().await;
        assert_eq!(report.version, 2);
        evicted += report.evicted.len();

        let view = node.membership().current();
        for identity in node.activations().directory().list_all() {
            assert_eq!(partition::owner_of(&identity, &view).as_ref(), Some(node.member()));
        }
    }

    let after: usize = cluster.nodes.iter().map(|n| n.activations().directory().len()).sum();
    // The background loop may have evicted some before the explicit pass.
    assert!(after + evicted <= 30);
    assert_eq!(after + cluster.stats.deactivations.load(Ordering::SeqCst), 30);
    assert!(after > 0, "expected most grains to stay put");
}

#[tokio::test]
async fn test_stale_sender_gets_not_owner() {
    let cluster = Cluster::start(2);
    let identity = GrainIdentity::new("lamp", "kitchen");
    let owner = partition::owner_of(&identity, &cluster.nodes[0].membership().current()).unwrap();
    let other = cluster.nodes.iter().find(|n| *n.member() != owner).unwrap();

    let err = other
        .router()
        .handle_remote(RemoteInvocation {
            identity,
            message: GrainMessage::method("get_state"),
            view_version: 1,
            timeout_ms: 500,
        })
        .await
        .unwrap_err();
    assert_eq!(err, InvokeError::NotOwner { current_version: 1 });
}

#[tokio::test]
async fn test_shutdown_drains_all_activations() {
    let cluster = Cluster::start(1);
    let node = &cluster.nodes[0];
    for i in 0..5 {
        node.grain("lamp", format!("room-{i}")).call("turn_on", json!({})).await.unwrap();
    }

    assert_eq!(node.shutdown().await, 5);
    assert!(node.activations().directory().is_empty());
    assert_eq!(cluster.stats.deactivations.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_not_owner_triggers_one_refresh() {
    let cluster = Cluster::start(2);
    let v1 = cluster.nodes[0].membership().current();
    let identity = identity_owned_by(&member(2), &v1);

    // m2 already knows it left; m1 still routes with v1.
    let v2 = MembershipUpdate::new(2, vec![Member::active(member(1), 1)]);
    cluster.nodes[1].apply_membership(v2.clone());

    let lagging = cluster.nodes[0].membership().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        lagging.apply(v2);
    });

    let state = cluster.nodes[0]
        .grain("lamp", identity.identity.clone())
        .call("get_state", json!(null))
        .await
        .unwrap();
    assert_eq!(state["member"], "m1:7000");
}

#[tokio::test]
async fn test_not_owner_is_surfaced_when_view_never_catches_up() {
    let cluster = Cluster::start(2);
    let v1 = cluster.nodes[0].membership().current();
    let identity = identity_owned_by(&member(2), &v1);

    cluster.nodes[1].apply_membership(MembershipUpdate::new(2, vec![Member::active(member(1), 1)]));

    let err = cluster.nodes[0]
        .grain("lamp", identity.identity.clone())
        .call("get_state", json!(null))
        .await
        .unwrap_err();
    assert_eq!(err, InvokeError::NotOwner { current_version: 2 });
}

#[tokio::test]
async fn test_lagging_owner_waits_for_sender_view() {
    let cluster = Cluster::start(2);
    let v1 = cluster.nodes[0].membership().current();
    let identity = identity_owned_by(&member(1), &v1);

    // m1 leaves: it learns first, m2 learns shortly after.
    let v2 = MembershipUpdate::new(2, vec![Member::active(member(2), 1)]);
    cluster.nodes[0].apply_membership(v2.clone());

    let lagging = cluster.nodes[1].membership().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        lagging.apply(v2);
    });

    let state = cluster.nodes[0]
        .grain("lamp", identity.identity.clone())
        .call("get_state", json!(null))
        .await
        .unwrap();
    assert_eq!(state["member"], "m2:7000");
}

#[tokio::test]
async fn test_rebalance_eviction_waits_for_in_flight_call() {
    let cluster = Cluster::start(2);
    let v1 = cluster.nodes[0].membership().current();
    let identity = identity_owned_by(&member(1), &v1);

    let grain = cluster.nodes[0].grain("lamp", identity.identity.clone());
    grain.call("turn_on", json!({})).await.unwrap();
    let in_flight = {
        let grain = grain.clone();
        tokio::spawn(async move { grain.call("slow", json!(100)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Ownership moves to m2 while the call is still running on m1.
    cluster.publish(&[member(2)]);
    cluster.nodes[0].rebalance_now().await;

    assert_eq!(in_flight.await.unwrap().unwrap(), json!("done"));
    assert!(cluster.nodes[0].activations().directory().get(&identity).await.is_none());
    assert_eq!(cluster.stats.deactivations.load(Ordering::SeqCst), 1);

    let state = cluster.nodes[1]
        .grain("lamp", identity.identity.clone())
        .call("get_state", json!(null))
        .await
        .unwrap();
    assert_eq!(state["state"], "unknown");
    assert_eq!(state["member"], "m2:7000");
}
