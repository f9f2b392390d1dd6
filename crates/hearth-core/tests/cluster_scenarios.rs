mod common;

use common::{member, Cluster};
use hearth_core::{partition, GrainIdentity, GrainMessage, InvokeError, MemberId};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn kitchen() -> GrainIdentity {
    GrainIdentity::new("lamp", "kitchen")
}

#[tokio::test]
async fn test_first_call_creates_grain_on_owner() {
    let cluster = Cluster::start(4);
    let owner = partition::owner_of(&kitchen(), &cluster.nodes[0].membership().current()).unwrap();

    // Call from a member that is not the owner.
    let caller = cluster.nodes.iter().find(|n| *n.member() != owner).unwrap();
    let reply = caller.grain("lamp", "kitchen").call("turn_on", json!({})).await.unwrap();
    assert_eq!(reply, json!("on"));

    assert_eq!(cluster.hosts_of(&kitchen()).await, vec![owner.clone()]);

    // Any member sees the same instance.
    for node in &cluster.nodes {
        let state = node.grain("lamp", "kitchen").call("get_state", json!(null)).await.unwrap();
        assert_eq!(state["state"], "on");
        assert_eq!(state["member"], owner.as_str());
    }
    assert_eq!(cluster.stats.creates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_owner_removal_fails_over_to_fresh_state() {
    let cluster = Cluster::start(4);
    let old_owner = partition::owner_of(&kitchen(), &cluster.nodes[0].membership().current()).unwrap();
    cluster.nodes[0].grain("lamp", "kitchen").call("turn_on", json!({})).await.unwrap();

    // The owner disappears: unreachable on the wire and gone from the view.
    cluster.transport.partition(&old_owner);
    let survivors: Vec<MemberId> = cluster
        .nodes
        .iter()
        .map(|n| n.member().clone())
        .filter(|m| *m != old_owner)
        .collect();
    cluster.publish(&survivors);

    let new_owner = partition::owner_of(&kitchen(), &cluster.node(&survivors[0]).membership().current()).unwrap();
    assert_ne!(new_owner, old_owner);

    let state = cluster
        .node(&survivors[0])
        .grain("lamp", "kitchen")
        .call("get_state", json!(null))
        .await
        .unwrap();
    assert_eq!(state["state"], "unknown");
    assert_eq!(state["member"], new_owner.as_str());
    assert_eq!(cluster.stats.creates.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_simultaneous_first_calls_share_one_activation() {
    let cluster = Cluster::start(4);
    let bedroom = GrainIdentity::new("lamp", "bedroom");
    let owner = partition::owner_of(&bedroom, &cluster.nodes[0].membership().current()).unwrap();
    let owner_node = cluster.node(&owner);

    let a = owner_node.grain("lamp", "bedroom");
    let b = owner_node.grain("lamp", "bedroom");
    let (ra, rb) = tokio::join!(a.call("get_state", json!(null)), b.call("get_state", json!(null)));

    assert_eq!(ra.unwrap()["member"], owner.as_str());
    assert_eq!(rb.unwrap()["member"], owner.as_str());
    assert_eq!(cluster.stats.creates.load(Ordering::SeqCst), 1);
    assert_eq!(owner_node.activations().directory().len(), 1);
}

#[tokio::test]
async fn test_unresolvable_until_a_member_joins() {
    let cluster = Cluster::start(2);
    cluster.publish(&[]);

    let grain = cluster.nodes[0].grain("lamp", "kitchen");
    let err = grain.call("turn_on", json!({})).await.unwrap_err();
    assert!(matches!(err, InvokeError::Unresolvable { .. }));
    assert!(err.is_retryable());

    cluster.publish(&[member(2)]);
    let reply = grain.call("turn_on", json!({})).await.unwrap();
    assert_eq!(reply, json!("on"));
    assert_eq!(cluster.hosts_of(&kitchen()).await, vec![member(2)]);
}

#[tokio::test]
async fn test_concurrent_first_calls_from_every_member() {
    let cluster = Cluster::start(4);
    let identity = GrainIdentity::new("lamp", "hallway");

    let calls = cluster.nodes.iter().flat_map(|node| {
        (0..8).map(move |_| async move {
            node.grain("lamp", "hallway").call("get_state", json!(null)).await
        })
    });
    let replies = futures::future::join_all(calls).await;

    let owner = partition::owner_of(&identity, &cluster.nodes[0].membership().current()).unwrap();
    for reply in replies {
        assert_eq!(reply.unwrap()["member"], owner.as_str());
    }
    assert_eq!(cluster.stats.creates.load(Ordering::SeqCst), 1);
    assert_eq!(cluster.hosts_of(&identity).await, vec![owner]);
}

#[tokio::test]
async fn test_dispatch_is_serialized_per_activation() {
    let cluster = Cluster::start(1);
    let grain = cluster.nodes[0].grain("lamp", "study");

    let calls = (0..10).map(|_| grain.call("slow", json!(5)));
    for reply in futures::future::join_all(calls).await {
        assert_eq!(reply.unwrap(), json!("done"));
    }
    assert!(!cluster.stats.overlapping.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_call_after_eviction_creates_exactly_once() {
    let cluster = Cluster::start(1);
    let node = &cluster.nodes[0];
    let grain = node.grain("lamp", "garage");

    grain.call("turn_on", json!({})).await.unwrap();
    assert!(node.deactivate("lamp", "garage").await);
    assert!(!node.deactivate("lamp", "garage").await);
    assert_eq!(cluster.stats.deactivations.load(Ordering::SeqCst), 1);

    let calls = (0..6).map(|_| grain.call("get_state", json!(null)));
    for reply in futures::future::join_all(calls).await {
        assert_eq!(reply.unwrap()["state"], "unknown");
    }
    assert_eq!(cluster.stats.creates.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_grain_fault_keeps_activation_alive() {
    let cluster = Cluster::start(1);
    let grain = cluster.nodes[0].grain("lamp", "porch");

    grain.call("turn_on", json!({})).await.unwrap();

    let err = grain.call("fail", json!(null)).await.unwrap_err();
    assert!(matches!(&err, InvokeError::GrainFault { message, .. } if message.contains("lamp is broken")));

    let err = grain.call("panic", json!(null)).await.unwrap_err();
    assert!(matches!(&err, InvokeError::GrainFault { message, .. } if message.contains("lamp exploded")));

    let state = grain.call("get_state", json!(null)).await.unwrap();
    assert_eq!(state["state"], "on");
    assert_eq!(cluster.stats.creates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_local_dispatch_timeout() {
    let cluster = Cluster::start(1);
    let grain = cluster.nodes[0].grain("lamp", "attic");

    let err = grain
        .send_with_timeout(GrainMessage::new("slow", json!(200)), Duration::from_millis(20))
        .await
        .unwrap_err();
    assert!(matches!(err, InvokeError::Timeout { after_ms, .. } if after_ms <= 20));
}

#[tokio::test]
async fn test_partitioned_owner_is_unreachable() {
    let cluster = Cluster::start(3);
    let owner = partition::owner_of(&kitchen(), &cluster.nodes[0].membership().current()).unwrap();
    let caller = cluster.nodes.iter().find(|n| *n.member() != owner).unwrap();

    cluster.transport.partition(&owner);
    let err = caller.grain("lamp", "kitchen").call("turn_on", json!({})).await.unwrap_err();
    assert!(matches!(err, InvokeError::Unreachable { member, .. } if member == owner));
}

#[tokio::test]
async fn test_unknown_kind_is_reported() {
    let cluster = Cluster::start(2);
    let err = cluster.nodes[0]
        .grain("toaster", "kitchen")
        .call("toast", json!(null))
        .await
        .unwrap_err();
    assert!(matches!(err, InvokeError::UnknownKind { kind } if kind == "toaster"));
}

#[tokio::test]
async fn test_timed_out_first_call_does_not_leave_a_second_instance() {
    let cluster = Cluster::start(1);
    let grain = cluster.nodes[0].grain("lamp", "sleepy-nursery");

    // The deadline expires while the activation is still starting.
    let err = grain
        .send_with_timeout(GrainMessage::new("get_state", json!(null)), Duration::from_millis(20))
        .await
        .unwrap_err();
    assert!(matches!(err, InvokeError::Timeout { .. }));

    let state = grain
        .send_with_timeout(GrainMessage::new("get_state", json!(null)), Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(state["state"], "unknown");

    assert_eq!(cluster.stats.creates.load(Ordering::SeqCst), 1);
    assert_eq!(cluster.stats.max_live.load(Ordering::SeqCst), 1);
    assert_eq!(cluster.nodes[0].activations().directory().len(), 1);
}

#[tokio::test]
async fn test_deactivate_drains_in_flight_call() {
    let cluster = Cluster::start(1);
    let node = &cluster.nodes[0];
    let grain = node.grain("lamp", "cellar");
    grain.call("turn_on", json!({})).await.unwrap();

    let in_flight = {
        let grain = grain.clone();
        tokio::spawn(async move { grain.call("slow", json!(100)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let started = tokio::time::Instant::now();
    assert!(node.deactivate("lamp", "cellar").await);
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(cluster.stats.deactivations.load(Ordering::SeqCst), 1);

    assert_eq!(in_flight.await.unwrap().unwrap(), json!("done"));
}
