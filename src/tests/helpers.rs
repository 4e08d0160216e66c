//! Shared test utilities for the tracing engine

use crate::{
    event::{LinkEvent, PathEvent},
    orchestrator::Orchestrator,
    path::CablePath,
    properties::{CableEnd, Link, LinkStatus, NodeKind, NodeRef, ObjectId, TerminationRef},
    store::{MemoryStore, Store},
};

pub fn endpoint(store: &mut MemoryStore, kind: NodeKind) -> NodeRef {
    store.insert_endpoint(kind).unwrap()
}

pub fn panel(store: &mut MemoryStore) -> (NodeRef, NodeRef) {
    store.insert_pass_through_pair()
}

/// Cable two termination sets together and run the creation event through
/// the orchestrator, as the storage boundary would.
pub fn connect(
    store: &mut MemoryStore,
    orchestrator: &Orchestrator,
    a: &[NodeRef],
    b: &[NodeRef],
    status: LinkStatus,
) -> (Link, Vec<PathEvent>) {
    let mut terminations: Vec<TerminationRef> = a
        .iter()
        .map(|n| TerminationRef::new(*n, CableEnd::A))
        .collect();
    terminations.extend(b.iter().map(|n| TerminationRef::new(*n, CableEnd::B)));
    let link = Link::new(status, terminations);
    store.insert_link(link.clone()).unwrap();
    let events = orchestrator
        .apply(
            store,
            &LinkEvent::Saved {
                link: link.clone(),
                created: true,
                status_changed: false,
            },
        )
        .unwrap();
    (link, events)
}

/// Flip a link's status and run the status-change event.
pub fn set_status(
    store: &mut MemoryStore,
    orchestrator: &Orchestrator,
    link: &ObjectId,
    status: LinkStatus,
) -> Vec<PathEvent> {
    let link = store.set_link_status(link, status).unwrap();
    orchestrator
        .apply(
            store,
            &LinkEvent::Saved {
                link,
                created: false,
                status_changed: true,
            },
        )
        .unwrap()
}

/// Remove a link row and run the deletion event.
pub fn delete_link(
    store: &mut MemoryStore,
    orchestrator: &Orchestrator,
    link: &ObjectId,
) -> Vec<PathEvent> {
    let link = store.remove_link(link).unwrap();
    orchestrator
        .apply(store, &LinkEvent::Deleted(link))
        .unwrap()
}

/// The stored path originating at the given endpoint, if any.
pub fn path_from(store: &MemoryStore, origin: &NodeRef) -> Option<CablePath> {
    store
        .all_paths()
        .unwrap()
        .into_iter()
        .find(|p| p.origins.contains(origin))
}

/// The cached link peer of an endpoint.
pub fn link_peer(store: &MemoryStore, node: &NodeRef) -> Option<NodeRef> {
    match store.node(node).unwrap() {
        Some(crate::properties::NodeState::Endpoint(e)) => e.link_peer,
        _ => None,
    }
}
