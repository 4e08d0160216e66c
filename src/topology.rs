//! Derived graph views and consistency checks.
//!
//! [ConnectivityGraph] renders a store snapshot as an undirected petgraph:
//! links, their terminating nodes and pass-through pairings become edges.
//! It backs component queries for reporting, and [audit] uses it together
//! with direct store reads to verify every derived invariant the engine is
//! supposed to uphold.

use petgraph::{
    graphmap::GraphMap,
    visit::{depth_first_search, DfsEvent},
    Undirected,
};
use std::collections::BTreeSet;

use crate::{
    error::ConduitError,
    path::PathHop,
    properties::{NodeKind, NodeRef, NodeState, ObjectId},
    store::Store,
};

/// A vertex of the derived connectivity graph: either a link or a
/// connectable node.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum TopoNode {
    Link(ObjectId),
    Node(NodeRef),
}

#[derive(Debug, Default)]
pub struct ConnectivityGraph(GraphMap<TopoNode, (), Undirected>);

impl ConnectivityGraph {
    pub fn as_graph(&self) -> &GraphMap<TopoNode, (), Undirected> {
        &self.0
    }

    /// Render the store's links, terminations and pass-through pairings as
    /// one undirected graph.
    pub fn from_store<S: Store>(store: &S) -> Result<Self, ConduitError> {
        let mut graph = GraphMap::new();
        for link in store.all_links()? {
            for termination in &link.terminations {
                graph.add_edge(TopoNode::Link(link.id), TopoNode::Node(termination.node), ());
            }
        }
        for state in store.find_nodes(NodeKind::pass_through_kinds())? {
            if let Some(peer) = state.opposite_side() {
                graph.add_edge(
                    TopoNode::Node(state.node_ref()),
                    TopoNode::Node(peer),
                    (),
                );
            }
        }
        Ok(ConnectivityGraph(graph))
    }

    /// Every vertex reachable from `start`, including itself. Useful for
    /// answering "what shares infrastructure with this node".
    pub fn component_of(&self, start: TopoNode) -> BTreeSet<TopoNode> {
        let mut component = BTreeSet::new();
        if self.0.contains_node(start) {
            depth_first_search(&self.0, Some(start), |event| {
                if let DfsEvent::Discover(node, _) = event {
                    component.insert(node);
                }
            });
        }
        component
    }
}

/// Verify the derived state against the live inventory. Returns one
/// human-readable violation per inconsistency; an empty list means the
/// store upholds every invariant this engine maintains.
pub fn audit<S: Store>(store: &S) -> Result<Vec<String>, ConduitError> {
    let mut errors = Vec::new();

    // Pass-through pairings must be symmetric.
    for state in store.find_nodes(NodeKind::pass_through_kinds())? {
        let node = state.node_ref();
        let Some(peer) = state.opposite_side() else {
            errors.push(format!("pass-through {node} has no second side"));
            continue;
        };
        match store.node(&peer)? {
            Some(peer_state) if peer_state.opposite_side() == Some(node) => {}
            Some(_) => errors.push(format!(
                "pass-through pairing {node} <-> {peer} is not symmetric"
            )),
            None => errors.push(format!("pass-through {node} pairs with missing side {peer}")),
        }
    }

    for path in store.all_paths()? {
        if let Err(e) = path.validate() {
            errors.push(format!("{e}"));
        }

        let mut all_connected = true;
        for link_id in path.links() {
            match store.link(link_id)? {
                Some(link) => {
                    if !link.status.is_connected() {
                        all_connected = false;
                    }
                }
                None => {
                    errors.push(format!("path {} references missing link {link_id}", path.id));
                    all_connected = false;
                }
            }
        }
        if path.is_active != all_connected {
            errors.push(format!(
                "path {} is_active={} but traversed links say {}",
                path.id, path.is_active, all_connected
            ));
        }

        for hop in &path.hops {
            if let PathHop::Nodes(nodes) = hop {
                for node in nodes {
                    if store.node(node)?.is_none() {
                        errors.push(format!("path {} traverses missing node {node}", path.id));
                    }
                }
            }
        }

        // Link-peer caches must agree with the path originating at each
        // endpoint; the origin row is authoritative for the cache.
        let resolved = path.is_complete() && path.is_active && !path.is_split;
        for node in &path.origins {
            let Some(NodeState::Endpoint(endpoint)) = store.node(node)? else {
                errors.push(format!("path {} origin {node} missing", path.id));
                continue;
            };
            let expected = match (resolved, path.destinations.len()) {
                (true, 1) => path.destinations.iter().next().copied(),
                _ => None,
            };
            if endpoint.link_peer != expected {
                errors.push(format!(
                    "endpoint {node} caches link peer {:?}, path {} implies {:?}",
                    endpoint.link_peer, path.id, expected
                ));
            }
        }
    }

    Ok(errors)
}
