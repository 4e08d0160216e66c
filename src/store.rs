//! The storage collaborator seam.
//!
//! [Store] is the typed rendition of the persistence operations this core
//! consumes: lookups, full saves and bulk field updates. The engine assumes
//! every call happens inside an appropriately isolated transaction supplied
//! by the collaborator; it holds no locks of its own.
//!
//! [MemoryStore] is the in-memory reference implementation used by tests and
//! by embedders that keep inventory resident. Its inventory helpers
//! (`insert_endpoint`, `insert_link`, ...) are conveniences for standing up
//! state; inventory CRUD as such is outside this core.

use std::collections::BTreeMap;

use crate::{
    error::ConduitError,
    path::CablePath,
    properties::{
        EndpointState, Link, LinkStatus, NodeKind, NodeKindSet, NodeRef, NodeState, ObjectId,
        PassThroughState, TerminationRef,
    },
};

pub trait Store {
    fn link(&self, id: &ObjectId) -> Result<Option<Link>, ConduitError>;

    fn all_links(&self) -> Result<Vec<Link>, ConduitError>;

    fn node(&self, node: &NodeRef) -> Result<Option<NodeState>, ConduitError>;

    /// All node states whose kind is in the given set.
    fn find_nodes(&self, kinds: NodeKindSet) -> Result<Vec<NodeState>, ConduitError>;

    fn path(&self, id: &ObjectId) -> Result<Option<CablePath>, ConduitError>;

    fn all_paths(&self) -> Result<Vec<CablePath>, ConduitError>;

    /// Every stored path whose hop sequence traverses the given node.
    fn paths_through_node(&self, node: &NodeRef) -> Result<Vec<CablePath>, ConduitError>;

    /// Every stored path whose hop sequence contains the given link.
    fn paths_through_link(&self, link: &ObjectId) -> Result<Vec<CablePath>, ConduitError>;

    fn save_path(&mut self, path: &CablePath) -> Result<(), ConduitError>;

    fn delete_path(&mut self, id: &ObjectId) -> Result<(), ConduitError>;

    /// Bulk flag update on every path containing `link`, without per-row
    /// re-save semantics. Returns the ids of the affected rows.
    fn update_path_active(
        &mut self,
        link: &ObjectId,
        active: bool,
    ) -> Result<Vec<ObjectId>, ConduitError>;

    /// Bulk field update of an endpoint's cached link peer. A no-op for
    /// nodes that are not endpoints.
    fn set_endpoint_peer(
        &mut self,
        node: &NodeRef,
        peer: Option<NodeRef>,
    ) -> Result<(), ConduitError>;
}

/// BTreeMap-backed [Store]. Single-threaded by design; wrap it externally if
/// shared access is needed, per the unit-of-work concurrency model.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    links: BTreeMap<ObjectId, Link>,
    nodes: BTreeMap<NodeRef, NodeState>,
    paths: BTreeMap<ObjectId, CablePath>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Insert a node state directly. Exposed for embedders restoring
    /// inventory from elsewhere; the typed helpers below are friendlier.
    pub fn insert_node(&mut self, state: NodeState) {
        self.nodes.insert(state.node_ref(), state);
    }

    /// Create an endpoint object of the given kind.
    pub fn insert_endpoint(&mut self, kind: NodeKind) -> Result<NodeRef, ConduitError> {
        let node = NodeRef::new(kind, ObjectId::new());
        if node.category() != crate::properties::NodeCategory::Endpoint {
            return Err(ConduitError::Structural(format!(
                "{kind} is not an endpoint kind"
            )));
        }
        self.insert_node(NodeState::Endpoint(EndpointState {
            node,
            link: None,
            link_peer: None,
        }));
        Ok(node)
    }

    /// Create a pass-through pair: a front side and a rear side wired to each
    /// other as the two internal sides of one relay.
    pub fn insert_pass_through_pair(&mut self) -> (NodeRef, NodeRef) {
        let front = NodeRef::new(NodeKind::FrontPort, ObjectId::new());
        let rear = NodeRef::new(NodeKind::RearPort, ObjectId::new());
        self.insert_node(NodeState::PassThrough(PassThroughState {
            node: front,
            peer: rear,
            link: None,
        }));
        self.insert_node(NodeState::PassThrough(PassThroughState {
            node: rear,
            peer: front,
            link: None,
        }));
        (front, rear)
    }

    /// Register a link and mark its terminating nodes as occupied. Rejects
    /// invalid termination sets and double-cabling before anything is
    /// written.
    pub fn insert_link(&mut self, link: Link) -> Result<(), ConduitError> {
        link.validate()?;
        for termination in &link.terminations {
            match self.nodes.get(&termination.node) {
                None => {
                    return Err(ConduitError::NotFound(format!(
                        "termination {termination} does not resolve to a node"
                    )))
                }
                Some(state) => {
                    if let Some(existing) = state.connected_link() {
                        if existing != link.id {
                            return Err(ConduitError::Structural(format!(
                                "node {} already cabled by link {existing}",
                                termination.node
                            )));
                        }
                    }
                }
            }
        }
        for termination in &link.terminations {
            if let Some(state) = self.nodes.get_mut(&termination.node) {
                match state {
                    NodeState::Endpoint(e) => e.link = Some(link.id),
                    NodeState::PassThrough(p) => p.link = Some(link.id),
                }
            }
        }
        self.links.insert(link.id, link);
        Ok(())
    }

    /// Remove a link row and free its terminating nodes. Returns the removed
    /// instance so the caller can feed it to the orchestrator's post-delete
    /// handling.
    pub fn remove_link(&mut self, id: &ObjectId) -> Result<Link, ConduitError> {
        let link = self
            .links
            .remove(id)
            .ok_or_else(|| ConduitError::NotFound(format!("link {id}")))?;
        for termination in &link.terminations {
            if let Some(state) = self.nodes.get_mut(&termination.node) {
                match state {
                    NodeState::Endpoint(e) => e.link = None,
                    NodeState::PassThrough(p) => p.link = None,
                }
            }
        }
        Ok(link)
    }

    /// Mutate a link's status in place. Termination sets are immutable;
    /// status is the only field this core ever updates on an existing link.
    pub fn set_link_status(
        &mut self,
        id: &ObjectId,
        status: LinkStatus,
    ) -> Result<Link, ConduitError> {
        let link = self
            .links
            .get_mut(id)
            .ok_or_else(|| ConduitError::NotFound(format!("link {id}")))?;
        link.status = status;
        Ok(link.clone())
    }

    /// Remove a termination from a stored link's set. This models the
    /// lifecycle layer deleting a termination row; the orchestrator's
    /// `on_termination_deleted` performs the dependent back-reference write.
    pub fn remove_termination(
        &mut self,
        termination: &TerminationRef,
    ) -> Result<(), ConduitError> {
        for link in self.links.values_mut() {
            link.terminations.retain(|t| t != termination);
        }
        if let Some(NodeState::Endpoint(e)) = self.nodes.get_mut(&termination.node) {
            e.link = None;
        } else if let Some(NodeState::PassThrough(p)) = self.nodes.get_mut(&termination.node) {
            p.link = None;
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn link(&self, id: &ObjectId) -> Result<Option<Link>, ConduitError> {
        Ok(self.links.get(id).cloned())
    }

    fn all_links(&self) -> Result<Vec<Link>, ConduitError> {
        Ok(self.links.values().cloned().collect())
    }

    fn node(&self, node: &NodeRef) -> Result<Option<NodeState>, ConduitError> {
        Ok(self.nodes.get(node).copied())
    }

    fn find_nodes(&self, kinds: NodeKindSet) -> Result<Vec<NodeState>, ConduitError> {
        Ok(self
            .nodes
            .values()
            .filter(|state| kinds.contains(state.node_ref().kind))
            .copied()
            .collect())
    }

    fn path(&self, id: &ObjectId) -> Result<Option<CablePath>, ConduitError> {
        Ok(self.paths.get(id).cloned())
    }

    fn all_paths(&self) -> Result<Vec<CablePath>, ConduitError> {
        Ok(self.paths.values().cloned().collect())
    }

    fn paths_through_node(&self, node: &NodeRef) -> Result<Vec<CablePath>, ConduitError> {
        Ok(self
            .paths
            .values()
            .filter(|path| path.contains_node(node))
            .cloned()
            .collect())
    }

    fn paths_through_link(&self, link: &ObjectId) -> Result<Vec<CablePath>, ConduitError> {
        Ok(self
            .paths
            .values()
            .filter(|path| path.contains_link(link))
            .cloned()
            .collect())
    }

    fn save_path(&mut self, path: &CablePath) -> Result<(), ConduitError> {
        self.paths.insert(path.id, path.clone());
        Ok(())
    }

    fn delete_path(&mut self, id: &ObjectId) -> Result<(), ConduitError> {
        self.paths.remove(id);
        Ok(())
    }

    fn update_path_active(
        &mut self,
        link: &ObjectId,
        active: bool,
    ) -> Result<Vec<ObjectId>, ConduitError> {
        let mut affected = Vec::new();
        for path in self.paths.values_mut() {
            if path.contains_link(link) && path.is_active != active {
                path.is_active = active;
                affected.push(path.id);
            }
        }
        Ok(affected)
    }

    fn set_endpoint_peer(
        &mut self,
        node: &NodeRef,
        peer: Option<NodeRef>,
    ) -> Result<(), ConduitError> {
        if let Some(NodeState::Endpoint(e)) = self.nodes.get_mut(node) {
            e.link_peer = peer;
        }
        Ok(())
    }
}
