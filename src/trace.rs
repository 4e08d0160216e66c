//! The path tracing algorithm.
//!
//! [PathTracer] owns every [CablePath] row: it creates them when a new link
//! starts a traceable chain from an endpoint, re-walks them when a link
//! inside them changes, and deletes them when their origin no longer begins
//! a chain. The walk itself is pure in-memory traversal over [Store]
//! lookups; persistence happens only after a branch completes.

use std::collections::BTreeSet;

use crate::{
    config::TraceConfig,
    error::ConduitError,
    event::PathEvent,
    path::{CablePath, PathHop},
    properties::{NodeCategory, NodeRef, NodeState, ObjectId},
    store::Store,
};

/// The raw result of one walk, before it is attached to a path row.
#[derive(Debug, Clone, PartialEq, Eq)]
struct WalkResult {
    hops: Vec<PathHop>,
    destinations: BTreeSet<NodeRef>,
    is_active: bool,
    is_split: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PathTracer {
    config: TraceConfig,
}

impl PathTracer {
    pub fn new() -> Self {
        PathTracer::default()
    }

    pub fn with_config(config: TraceConfig) -> Self {
        PathTracer { config }
    }

    /// Initiate a new path from a set of originating endpoints (the
    /// terminations of one end of a newly cabled link).
    ///
    /// Returns `None` when the origins do not begin a traceable chain (no
    /// link attached). A cycle aborts the branch: nothing is persisted and
    /// the error carries the diagnostic.
    pub fn create_cablepath<S: Store>(
        &self,
        store: &mut S,
        origins: &[NodeRef],
    ) -> Result<Option<CablePath>, ConduitError> {
        if origins.is_empty() {
            return Ok(None);
        }
        if let Some(stray) = origins
            .iter()
            .find(|n| n.category() != NodeCategory::Endpoint)
        {
            return Err(ConduitError::Structural(format!(
                "cannot originate a path at non-endpoint node {stray}"
            )));
        }
        let origin_set: BTreeSet<NodeRef> = origins.iter().copied().collect();
        let walk = self.walk(store, &origin_set)?;
        if walk.hops.is_empty() {
            return Ok(None);
        }
        let mut path = CablePath::new(origin_set);
        path.destinations = walk.destinations;
        path.hops = walk.hops;
        path.is_active = walk.is_active;
        path.is_split = walk.is_split;
        store.save_path(&path)?;
        self.refresh_peers(store, None, &path)?;
        tracing::debug!("created {path}");
        Ok(Some(path))
    }

    /// Re-walk every stored path whose hop sequence traverses any of the
    /// given pass-through nodes. Re-walking from scratch trades efficiency
    /// for correctness: one changed link can alter the reachability of an
    /// entire downstream chain.
    pub fn rebuild_paths<S: Store>(
        &self,
        store: &mut S,
        nodes: &[NodeRef],
    ) -> Result<Vec<PathEvent>, ConduitError> {
        let mut affected: Vec<CablePath> = Vec::new();
        let mut seen: BTreeSet<ObjectId> = BTreeSet::new();
        for node in nodes {
            for path in store.paths_through_node(node)? {
                if seen.insert(path.id) {
                    affected.push(path);
                }
            }
        }
        self.retrace_batch(store, affected)
    }

    /// Re-walk every stored path containing the given link.
    pub fn rebuild_paths_through_link<S: Store>(
        &self,
        store: &mut S,
        link: &ObjectId,
    ) -> Result<Vec<PathEvent>, ConduitError> {
        let affected = store.paths_through_link(link)?;
        self.retrace_batch(store, affected)
    }

    /// Re-walk one stored path against current link/termination state.
    /// Either replaces the row's contents in place, or deletes the row when
    /// its origins no longer begin a traceable chain. Idempotent on an
    /// already-correct path.
    pub fn retrace<S: Store>(
        &self,
        store: &mut S,
        path: &CablePath,
    ) -> Result<Vec<PathEvent>, ConduitError> {
        let mut origins: BTreeSet<NodeRef> = BTreeSet::new();
        for origin in &path.origins {
            match store.node(origin)? {
                Some(NodeState::Endpoint(_)) => {
                    origins.insert(*origin);
                }
                Some(_) => {
                    tracing::warn!("path {} origin {origin} is no longer an endpoint", path.id);
                }
                None => {
                    tracing::warn!("path {} origin {origin} no longer exists", path.id);
                }
            }
        }
        if origins.is_empty() {
            return self.remove_path(store, path);
        }
        let walk = self.walk(store, &origins)?;
        if walk.hops.is_empty() {
            return self.remove_path(store, path);
        }
        let mut updated = path.clone();
        updated.origins = origins;
        updated.destinations = walk.destinations;
        updated.hops = walk.hops;
        updated.is_active = walk.is_active;
        updated.is_split = walk.is_split;
        if updated == *path {
            return Ok(vec![]);
        }
        store.save_path(&updated)?;
        self.refresh_peers(store, Some(path), &updated)?;
        tracing::debug!("retraced {updated}");
        Ok(vec![PathEvent::PathSaved(updated)])
    }

    /// Retrace a batch as one unit: every member is processed before control
    /// returns. A cycle in one member aborts only that member's branch.
    fn retrace_batch<S: Store>(
        &self,
        store: &mut S,
        paths: Vec<CablePath>,
    ) -> Result<Vec<PathEvent>, ConduitError> {
        let mut events = Vec::new();
        for path in paths {
            match self.retrace(store, &path) {
                Ok(mut derived) => events.append(&mut derived),
                Err(ConduitError::Cycle(msg)) => {
                    tracing::warn!("skipping retrace of path {}: {msg}", path.id);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(events)
    }

    fn remove_path<S: Store>(
        &self,
        store: &mut S,
        path: &CablePath,
    ) -> Result<Vec<PathEvent>, ConduitError> {
        store.delete_path(&path.id)?;
        self.clear_peers(store, path)?;
        tracing::debug!("removed path {}", path.id);
        Ok(vec![PathEvent::PathRemoved(path.id)])
    }

    /// Walk the graph from a set of originating endpoints.
    ///
    /// Termination of the walk: reaching endpoints (complete), reaching a
    /// link not in connected status (inactive), running out of onward links
    /// or terminations (incomplete), or divergent onward links (split).
    /// Revisiting any node is a cycle and aborts the branch.
    fn walk<S: Store>(
        &self,
        store: &S,
        origins: &BTreeSet<NodeRef>,
    ) -> Result<WalkResult, ConduitError> {
        let mut hops: Vec<PathHop> = Vec::new();
        let mut destinations: BTreeSet<NodeRef> = BTreeSet::new();
        let mut is_active = true;
        let mut is_split = false;
        let mut visited: BTreeSet<NodeRef> = origins.clone();

        let mut cursor: Vec<NodeState> = Vec::new();
        for origin in origins {
            match store.node(origin)? {
                Some(state) => cursor.push(state),
                None => tracing::warn!("origin {origin} does not resolve to a node, skipping"),
            }
        }

        'walk: while !cursor.is_empty() {
            if hops.len() >= self.config.max_hops {
                return Err(ConduitError::Cycle(format!(
                    "walk exceeded {} hops without terminating",
                    self.config.max_hops
                )));
            }

            // Candidate links out of the current frontier. Dangling frontier
            // nodes simply do not contribute.
            let mut links: BTreeSet<ObjectId> = BTreeSet::new();
            for state in &cursor {
                if let Some(link) = state.connected_link() {
                    links.insert(link);
                }
            }
            let Some(link_id) = links.pop_first() else {
                break; // incomplete: no onward link
            };
            if !links.is_empty() {
                is_split = true;
                break;
            }
            let Some(link) = store.link(&link_id)? else {
                // Stale reference to a removed link; the surviving prefix
                // ends here.
                tracing::debug!("link {link_id} no longer exists, ending walk");
                break;
            };
            hops.push(PathHop::Link(link_id));
            if !link.status.is_connected() {
                is_active = false;
                break;
            }

            let Some(near_end) = cursor.iter().find_map(|s| link.end_of(&s.node_ref())) else {
                tracing::warn!(
                    "link {link_id} does not terminate any frontier node, ending walk"
                );
                break;
            };
            let far_nodes = match link.end_nodes(near_end.opposite()) {
                Ok(nodes) => nodes,
                Err(e) => {
                    tracing::warn!("inconsistent terminations on link {link_id}: {e}");
                    break;
                }
            };
            if far_nodes.is_empty() {
                break; // incomplete: far end never terminated
            }

            match far_nodes[0].category() {
                NodeCategory::Endpoint => {
                    destinations.extend(far_nodes);
                    break;
                }
                NodeCategory::PassThrough => {
                    // Relay: enter each far side, exit through its second
                    // internal side. The hop records every side traversed so
                    // later mutations on either side find this path.
                    let mut relay: BTreeSet<NodeRef> = BTreeSet::new();
                    let mut next_cursor: Vec<NodeState> = Vec::new();
                    for node in far_nodes {
                        if !visited.insert(node) {
                            return Err(ConduitError::Cycle(format!("node {node} revisited")));
                        }
                        let Some(state) = store.node(&node)? else {
                            tracing::warn!("termination {node} does not resolve, skipping");
                            continue;
                        };
                        relay.insert(node);
                        let Some(peer) = state.opposite_side() else {
                            tracing::warn!("{node} has no second side, skipping");
                            continue;
                        };
                        if !visited.insert(peer) {
                            return Err(ConduitError::Cycle(format!("node {peer} revisited")));
                        }
                        let Some(peer_state) = store.node(&peer)? else {
                            tracing::warn!("{node} pairs with missing side {peer}");
                            relay.insert(peer);
                            continue;
                        };
                        relay.insert(peer);
                        next_cursor.push(peer_state);
                    }
                    if relay.is_empty() {
                        break 'walk; // every far side was unresolvable
                    }
                    hops.push(PathHop::Nodes(relay));
                    cursor = next_cursor;
                }
            }
        }

        Ok(WalkResult {
            hops,
            destinations,
            is_active,
            is_split,
        })
    }

    /// Refresh the denormalized `link_peer` cache on the origin endpoints of
    /// a path write. The peer names what an endpoint is ultimately connected
    /// to, so the path originating at that endpoint is authoritative for it;
    /// destination-side rows never write the cache, which would conflict in
    /// split and fan-out topologies. A peer is recorded only for an active,
    /// unsplit, complete path with a single destination.
    fn refresh_peers<S: Store>(
        &self,
        store: &mut S,
        previous: Option<&CablePath>,
        current: &CablePath,
    ) -> Result<(), ConduitError> {
        if let Some(previous) = previous {
            for node in &previous.origins {
                if !current.origins.contains(node) {
                    store.set_endpoint_peer(node, None)?;
                }
            }
        }
        let resolved = current.is_complete() && current.is_active && !current.is_split;
        for origin in &current.origins {
            let peer = match (resolved, current.destinations.len()) {
                (true, 1) => current.destinations.iter().next().copied(),
                _ => None,
            };
            store.set_endpoint_peer(origin, peer)?;
        }
        Ok(())
    }

    fn clear_peers<S: Store>(
        &self,
        store: &mut S,
        path: &CablePath,
    ) -> Result<(), ConduitError> {
        for node in &path.origins {
            store.set_endpoint_peer(node, None)?;
        }
        Ok(())
    }
}
