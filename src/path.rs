//! Derived cable path records.
//!
//! A [CablePath] is the persisted result of one trace: the ordered hops the
//! walk took, the endpoints it started from and the endpoints it reached.
//! Path rows are exclusively owned by [crate::trace::PathTracer]; nothing
//! else constructs or mutates their hop sequence.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
};

use crate::{
    error::ConduitError,
    properties::{NodeRef, ObjectId},
};

/// One entry in a path's hop sequence. Hops strictly alternate: even indices
/// are links, odd indices are the pass-through side objects traversed while
/// relaying between two links. A `Nodes` hop carries every side of the relay
/// (entry and exit), so membership queries match a path no matter which side
/// a later mutation touches.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum PathHop {
    Link(ObjectId),
    Nodes(BTreeSet<NodeRef>),
}

impl PathHop {
    pub fn is_link(&self) -> bool {
        matches!(self, PathHop::Link(_))
    }

    pub fn as_link(&self) -> Option<&ObjectId> {
        match self {
            PathHop::Link(id) => Some(id),
            PathHop::Nodes(_) => None,
        }
    }

    pub fn contains_node(&self, node: &NodeRef) -> bool {
        match self {
            PathHop::Link(_) => false,
            PathHop::Nodes(nodes) => nodes.contains(node),
        }
    }
}

impl Display for PathHop {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            PathHop::Link(id) => write!(f, "link:{id}"),
            PathHop::Nodes(nodes) => {
                let names: Vec<String> = nodes.iter().map(|n| n.to_string()).collect();
                write!(f, "[{}]", names.join(", "))
            }
        }
    }
}

/// A derived, cached record of one traced connectivity chain.
///
/// `origins` holds the endpoint(s) the trace started from; `destinations` the
/// endpoint(s) it reached, empty while the chain does not yet terminate.
/// `is_active` is false iff any traversed link is not in connected status.
/// `is_split` records that parallel pass-through sides diverged onto more
/// than one onward link, at which point the walk stops.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CablePath {
    pub id: ObjectId,
    pub origins: BTreeSet<NodeRef>,
    pub destinations: BTreeSet<NodeRef>,
    pub hops: Vec<PathHop>,
    pub is_active: bool,
    pub is_split: bool,
}

impl CablePath {
    pub fn new(origins: BTreeSet<NodeRef>) -> Self {
        CablePath {
            id: ObjectId::new(),
            origins,
            destinations: BTreeSet::new(),
            hops: Vec::new(),
            is_active: true,
            is_split: false,
        }
    }

    /// Whether the chain reached at least one destination endpoint.
    pub fn is_complete(&self) -> bool {
        !self.destinations.is_empty()
    }

    pub fn links(&self) -> impl Iterator<Item = &ObjectId> {
        self.hops.iter().filter_map(|hop| hop.as_link())
    }

    pub fn contains_link(&self, link: &ObjectId) -> bool {
        self.links().any(|id| id == link)
    }

    /// Whether the hop sequence traverses the given pass-through side.
    /// Origins and destinations are held outside the hop sequence and are
    /// not matched here.
    pub fn contains_node(&self, node: &NodeRef) -> bool {
        self.hops.iter().any(|hop| hop.contains_node(node))
    }

    /// Check the contiguity/alternation invariant: a non-empty sequence
    /// starts with a link, alternates link/nodes, never repeats a link and
    /// never carries an empty node set.
    pub fn validate(&self) -> Result<(), ConduitError> {
        let mut seen_links = BTreeSet::new();
        for (idx, hop) in self.hops.iter().enumerate() {
            match hop {
                PathHop::Link(id) => {
                    if idx % 2 != 0 {
                        return Err(ConduitError::Structural(format!(
                            "path {}: link hop {id} at odd index {idx}",
                            self.id
                        )));
                    }
                    if !seen_links.insert(*id) {
                        return Err(ConduitError::Structural(format!(
                            "path {}: link {id} appears twice",
                            self.id
                        )));
                    }
                }
                PathHop::Nodes(nodes) => {
                    if idx % 2 == 0 {
                        return Err(ConduitError::Structural(format!(
                            "path {}: node hop at even index {idx}",
                            self.id
                        )));
                    }
                    if nodes.is_empty() {
                        return Err(ConduitError::Structural(format!(
                            "path {}: empty node hop at index {idx}",
                            self.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Replace the traced contents of this row while keeping its identity.
    pub fn replace_contents(&mut self, other: CablePath) {
        self.origins = other.origins;
        self.destinations = other.destinations;
        self.hops = other.hops;
        self.is_active = other.is_active;
        self.is_split = other.is_split;
    }
}

impl Display for CablePath {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let origins: Vec<String> = self.origins.iter().map(|n| n.to_string()).collect();
        let destinations: Vec<String> = self.destinations.iter().map(|n| n.to_string()).collect();
        let hops: Vec<String> = self.hops.iter().map(|h| h.to_string()).collect();
        write!(
            f,
            "CablePath {} [{}] -> [{}] via {} (active: {}, split: {})",
            self.id,
            origins.join(", "),
            destinations.join(", "),
            hops.join(" -> "),
            self.is_active,
            self.is_split
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{NodeKind, NodeRef};

    fn node(kind: NodeKind) -> NodeRef {
        NodeRef::new(kind, ObjectId::new())
    }

    fn path_with_hops(hops: Vec<PathHop>) -> CablePath {
        let mut path = CablePath::new(BTreeSet::from([node(NodeKind::Interface)]));
        path.hops = hops;
        path
    }

    #[test]
    fn test_alternating_sequence_validates() {
        let relay = BTreeSet::from([node(NodeKind::FrontPort), node(NodeKind::RearPort)]);
        let path = path_with_hops(vec![
            PathHop::Link(ObjectId::new()),
            PathHop::Nodes(relay),
            PathHop::Link(ObjectId::new()),
        ]);
        assert!(path.validate().is_ok());
        assert!(path_with_hops(vec![]).validate().is_ok());
    }

    #[test]
    fn test_sequence_must_start_with_a_link() {
        let relay = BTreeSet::from([node(NodeKind::FrontPort)]);
        let path = path_with_hops(vec![PathHop::Nodes(relay)]);
        assert!(path.validate().is_err());
    }

    #[test]
    fn test_adjacent_links_are_rejected() {
        let path = path_with_hops(vec![
            PathHop::Link(ObjectId::new()),
            PathHop::Link(ObjectId::new()),
        ]);
        assert!(path.validate().is_err());
    }

    #[test]
    fn test_repeated_link_is_rejected() {
        let link = ObjectId::new();
        let relay = BTreeSet::from([node(NodeKind::FrontPort)]);
        let path = path_with_hops(vec![
            PathHop::Link(link),
            PathHop::Nodes(relay),
            PathHop::Link(link),
        ]);
        assert!(path.validate().is_err());
    }

    #[test]
    fn test_empty_node_hop_is_rejected() {
        let path = path_with_hops(vec![
            PathHop::Link(ObjectId::new()),
            PathHop::Nodes(BTreeSet::new()),
        ]);
        assert!(path.validate().is_err());
    }

    #[test]
    fn test_membership_queries() {
        let link = ObjectId::new();
        let front = node(NodeKind::FrontPort);
        let rear = node(NodeKind::RearPort);
        let path = path_with_hops(vec![
            PathHop::Link(link),
            PathHop::Nodes(BTreeSet::from([front, rear])),
        ]);
        assert!(path.contains_link(&link));
        assert!(!path.contains_link(&ObjectId::new()));
        assert!(path.contains_node(&front));
        assert!(path.contains_node(&rear));
        assert!(!path.contains_node(&node(NodeKind::FrontPort)));
        assert_eq!(path.links().count(), 1);
    }
}
