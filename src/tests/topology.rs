//! Tests for derived graph views and the audit check

use super::helpers::*;
use crate::{
    orchestrator::Orchestrator,
    properties::{LinkStatus, NodeKind, NodeState, PassThroughState},
    store::MemoryStore,
    topology::{audit, ConnectivityGraph, TopoNode},
};
use test_log::test;

#[test]
fn test_connectivity_graph_components() {
    let mut store = MemoryStore::new();
    let orchestrator = Orchestrator::new();
    let a = endpoint(&mut store, NodeKind::Interface);
    let b = endpoint(&mut store, NodeKind::Interface);
    let c = endpoint(&mut store, NodeKind::Interface);
    let (front, rear) = panel(&mut store);
    let (link1, _) = connect(
        &mut store,
        &orchestrator,
        &[a],
        &[front],
        LinkStatus::Connected,
    );
    let (link2, _) = connect(
        &mut store,
        &orchestrator,
        &[rear],
        &[b],
        LinkStatus::Connected,
    );

    let graph = ConnectivityGraph::from_store(&store).unwrap();
    let component = graph.component_of(TopoNode::Node(a));
    for member in [
        TopoNode::Node(a),
        TopoNode::Link(link1.id),
        TopoNode::Node(front),
        TopoNode::Node(rear),
        TopoNode::Link(link2.id),
        TopoNode::Node(b),
    ] {
        assert!(component.contains(&member), "component missing {member:?}");
    }
    assert!(!component.contains(&TopoNode::Node(c)));
    assert!(graph.component_of(TopoNode::Node(c)).is_empty());
}

#[test]
fn test_audit_clean_through_lifecycle() {
    let mut store = MemoryStore::new();
    let orchestrator = Orchestrator::new();
    let a = endpoint(&mut store, NodeKind::Interface);
    let b = endpoint(&mut store, NodeKind::Interface);
    let (front, rear) = panel(&mut store);
    connect(
        &mut store,
        &orchestrator,
        &[a],
        &[front],
        LinkStatus::Connected,
    );
    let (link2, _) = connect(
        &mut store,
        &orchestrator,
        &[rear],
        &[b],
        LinkStatus::Connected,
    );
    assert_eq!(audit(&store).unwrap(), Vec::<String>::new());

    set_status(&mut store, &orchestrator, &link2.id, LinkStatus::NotConnected);
    assert_eq!(audit(&store).unwrap(), Vec::<String>::new());

    set_status(&mut store, &orchestrator, &link2.id, LinkStatus::Connected);
    assert_eq!(audit(&store).unwrap(), Vec::<String>::new());

    delete_link(&mut store, &orchestrator, &link2.id);
    assert_eq!(audit(&store).unwrap(), Vec::<String>::new());
}

#[test]
fn test_audit_detects_out_of_band_status_change() {
    let mut store = MemoryStore::new();
    let orchestrator = Orchestrator::new();
    let a = endpoint(&mut store, NodeKind::Interface);
    let b = endpoint(&mut store, NodeKind::Interface);
    let (front, rear) = panel(&mut store);
    connect(
        &mut store,
        &orchestrator,
        &[a],
        &[front],
        LinkStatus::Connected,
    );
    let (link2, _) = connect(
        &mut store,
        &orchestrator,
        &[rear],
        &[b],
        LinkStatus::Connected,
    );

    // Flip the status behind the engine's back: the derived rows go stale.
    store
        .set_link_status(&link2.id, LinkStatus::NotConnected)
        .unwrap();
    let errors = audit(&store).unwrap();
    assert!(!errors.is_empty());
    assert!(errors.iter().any(|e| e.contains("is_active")));
}

#[test]
fn test_audit_detects_asymmetric_pairing() {
    let mut store = MemoryStore::new();
    let (_front, rear) = panel(&mut store);
    store.insert_node(NodeState::PassThrough(PassThroughState {
        node: rear,
        peer: rear,
        link: None,
    }));

    let errors = audit(&store).unwrap();
    assert!(
        errors.iter().any(|e| e.contains("not symmetric")),
        "{errors:?}"
    );
}
