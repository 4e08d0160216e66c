pub use enumset::EnumSet;
/// [crate::properties] contains the basic building blocks for describing physical
/// connectivity: object identities, cable ends, link status, node kinds and the
/// tagged node-state variants the [crate::trace::PathTracer] walks over.
use enumset::EnumSetType;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

pub use uuid::Uuid;

use crate::error::ConduitError;

/// Identity of any inventory object tracked by the engine: links, endpoint
/// terminations and pass-through sides all draw from the same id space.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ObjectId(Uuid);

impl ObjectId {
    pub fn new() -> Self {
        ObjectId(Uuid::new_v4())
    }

    /// A nil id marks an object with no assigned identity yet. Never persisted.
    pub fn nil() -> Self {
        ObjectId(Uuid::nil())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        ObjectId::new()
    }
}

impl From<Uuid> for ObjectId {
    fn from(id: Uuid) -> Self {
        ObjectId(id)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> String {
        id.to_string()
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0.as_simple())
    }
}

impl FromStr for ObjectId {
    type Err = ConduitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ObjectId(Uuid::try_parse(s)?))
    }
}

/// The side of a cable a termination occupies.
#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord, Default,
)]
pub enum CableEnd {
    #[default]
    A,
    B,
}

impl CableEnd {
    pub fn opposite(&self) -> CableEnd {
        match self {
            CableEnd::A => CableEnd::B,
            CableEnd::B => CableEnd::A,
        }
    }
}

impl Display for CableEnd {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            CableEnd::A => write!(f, "A"),
            CableEnd::B => write!(f, "B"),
        }
    }
}

/// Lifecycle status of a physical link. Only [LinkStatus::Connected] links
/// carry a live path; the distinction between [LinkStatus::NotConnected] and
/// [LinkStatus::Planned] matters to inventory reporting, not to tracing.
#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord, Default,
)]
pub enum LinkStatus {
    #[default]
    Connected,
    NotConnected,
    Planned,
}

impl LinkStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, LinkStatus::Connected)
    }
}

impl Display for LinkStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            LinkStatus::Connected => write!(f, "connected"),
            LinkStatus::NotConnected => write!(f, "not-connected"),
            LinkStatus::Planned => write!(f, "planned"),
        }
    }
}

/// Whether a node terminates a logical path or relays it onward.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeCategory {
    Endpoint,
    PassThrough,
}

/// [NodeKind] enumerates the connectable object types this core recognizes.
/// Each kind belongs to exactly one [NodeCategory]; the category drives the
/// dispatch at every trace step (examine the type of the first termination,
/// all terminations on an end share it).
#[derive(Debug, Default, Serialize, Deserialize, PartialOrd, Ord, Hash, EnumSetType)]
#[enumset(repr = "u16")]
pub enum NodeKind {
    /// A network interface on a device.
    #[default]
    Interface,
    /// A console port on a device.
    ConsolePort,
    /// The server side of a console connection.
    ConsoleServerPort,
    /// A power inlet on a device.
    PowerPort,
    /// A power outlet feeding downstream devices.
    PowerOutlet,
    /// The field-facing side of a patch panel position.
    FrontPort,
    /// The trunk-facing side of a patch panel position.
    RearPort,
}

/// A set of node kinds, used to express store queries such as "all endpoint
/// kinds" without enumerating variants at every call site.
pub type NodeKindSet = EnumSet<NodeKind>;

impl NodeKind {
    pub fn category(&self) -> NodeCategory {
        match self {
            NodeKind::Interface
            | NodeKind::ConsolePort
            | NodeKind::ConsoleServerPort
            | NodeKind::PowerPort
            | NodeKind::PowerOutlet => NodeCategory::Endpoint,
            NodeKind::FrontPort | NodeKind::RearPort => NodeCategory::PassThrough,
        }
    }

    pub fn endpoint_kinds() -> NodeKindSet {
        NodeKind::Interface
            | NodeKind::ConsolePort
            | NodeKind::ConsoleServerPort
            | NodeKind::PowerPort
            | NodeKind::PowerOutlet
    }

    pub fn pass_through_kinds() -> NodeKindSet {
        NodeKind::FrontPort | NodeKind::RearPort
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let name = match self {
            NodeKind::Interface => "interface",
            NodeKind::ConsolePort => "console-port",
            NodeKind::ConsoleServerPort => "console-server-port",
            NodeKind::PowerPort => "power-port",
            NodeKind::PowerOutlet => "power-outlet",
            NodeKind::FrontPort => "front-port",
            NodeKind::RearPort => "rear-port",
        };
        write!(f, "{name}")
    }
}

/// A typed pointer to a connectable object.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeRef {
    pub kind: NodeKind,
    pub id: ObjectId,
}

impl NodeRef {
    pub fn new(kind: NodeKind, id: ObjectId) -> Self {
        NodeRef { kind, id }
    }

    pub fn category(&self) -> NodeCategory {
        self.kind.category()
    }
}

impl Default for NodeRef {
    fn default() -> Self {
        NodeRef {
            kind: NodeKind::default(),
            id: ObjectId::nil(),
        }
    }
}

impl Display for NodeRef {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A [NodeRef] plus the cable end it occupies. Termination references are
/// immutable once their link exists; re-terminating a link is rejected
/// upstream of this core.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TerminationRef {
    pub node: NodeRef,
    pub end: CableEnd,
}

impl TerminationRef {
    pub fn new(node: NodeRef, end: CableEnd) -> Self {
        TerminationRef { node, end }
    }
}

impl Display for TerminationRef {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.node, self.end)
    }
}

/// A physical cable: an edge between two non-empty sets of terminations.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub id: ObjectId,
    pub status: LinkStatus,
    pub terminations: Vec<TerminationRef>,
}

impl Link {
    pub fn new(status: LinkStatus, terminations: Vec<TerminationRef>) -> Self {
        Link {
            id: ObjectId::new(),
            status,
            terminations,
        }
    }

    pub fn terminations(&self, end: CableEnd) -> impl Iterator<Item = &TerminationRef> {
        self.terminations.iter().filter(move |t| t.end == end)
    }

    /// The nodes terminating the given end. Enforces the uniform-category
    /// invariant: every termination on one end must resolve to the same
    /// [NodeCategory].
    pub fn end_nodes(&self, end: CableEnd) -> Result<Vec<NodeRef>, ConduitError> {
        let nodes: Vec<NodeRef> = self.terminations(end).map(|t| t.node).collect();
        if let Some(first) = nodes.first() {
            let category = first.category();
            if let Some(stray) = nodes.iter().find(|n| n.category() != category) {
                return Err(ConduitError::Structural(format!(
                    "link {} end {end} mixes node categories: {first} vs {stray}",
                    self.id
                )));
            }
        }
        Ok(nodes)
    }

    /// Which end of this link the given node terminates, if any.
    pub fn end_of(&self, node: &NodeRef) -> Option<CableEnd> {
        self.terminations
            .iter()
            .find(|t| t.node == *node)
            .map(|t| t.end)
    }

    /// Both ends must be non-empty and internally uniform before the link may
    /// participate in tracing.
    pub fn validate(&self) -> Result<(), ConduitError> {
        for end in [CableEnd::A, CableEnd::B] {
            let nodes = self.end_nodes(end)?;
            if nodes.is_empty() {
                return Err(ConduitError::Structural(format!(
                    "link {} has no terminations on end {end}",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// State of an object that terminates logical paths. `link_peer` is the
/// denormalized back-reference to the far side of this endpoint's own cable,
/// maintained transactionally alongside path writes for fast lookups.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointState {
    pub node: NodeRef,
    pub link: Option<ObjectId>,
    pub link_peer: Option<NodeRef>,
}

/// State of an object that relays a connection between its two internal
/// sides. `peer` names the second side; the pairing is symmetric, so a valid
/// inventory holds `peer.peer == self`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PassThroughState {
    pub node: NodeRef,
    pub peer: NodeRef,
    pub link: Option<ObjectId>,
}

/// Tagged variant over the two node categories. The trace algorithm only ever
/// needs the two capability methods: which link is attached here, and where a
/// relayed connection exits.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeState {
    Endpoint(EndpointState),
    PassThrough(PassThroughState),
}

impl NodeState {
    pub fn node_ref(&self) -> NodeRef {
        match self {
            NodeState::Endpoint(e) => e.node,
            NodeState::PassThrough(p) => p.node,
        }
    }

    pub fn category(&self) -> NodeCategory {
        match self {
            NodeState::Endpoint(_) => NodeCategory::Endpoint,
            NodeState::PassThrough(_) => NodeCategory::PassThrough,
        }
    }

    /// The link attached at this node, if any.
    pub fn connected_link(&self) -> Option<ObjectId> {
        match self {
            NodeState::Endpoint(e) => e.link,
            NodeState::PassThrough(p) => p.link,
        }
    }

    /// The second internal side of a pass-through node. Endpoints terminate,
    /// so they have no opposite side.
    pub fn opposite_side(&self) -> Option<NodeRef> {
        match self {
            NodeState::Endpoint(_) => None,
            NodeState::PassThrough(p) => Some(p.peer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_object_id_round_trips() {
        let id = ObjectId::new();
        assert_eq!(ObjectId::from_str(&id.to_string()).unwrap(), id);
        assert!(ObjectId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn test_kind_categories_partition_the_kinds() {
        let endpoints = NodeKind::endpoint_kinds();
        let relays = NodeKind::pass_through_kinds();
        assert!((endpoints & relays).is_empty());
        assert_eq!(endpoints | relays, NodeKindSet::all());
        for kind in endpoints {
            assert_eq!(kind.category(), NodeCategory::Endpoint);
        }
        for kind in relays {
            assert_eq!(kind.category(), NodeCategory::PassThrough);
        }
    }

    #[test]
    fn test_end_nodes_rejects_mixed_categories() {
        let interface = NodeRef::new(NodeKind::Interface, ObjectId::new());
        let front = NodeRef::new(NodeKind::FrontPort, ObjectId::new());
        let far = NodeRef::new(NodeKind::Interface, ObjectId::new());
        let link = Link::new(
            LinkStatus::Connected,
            vec![
                TerminationRef::new(interface, CableEnd::A),
                TerminationRef::new(front, CableEnd::A),
                TerminationRef::new(far, CableEnd::B),
            ],
        );
        assert!(link.end_nodes(CableEnd::A).is_err());
        assert!(link.end_nodes(CableEnd::B).is_ok());
        assert!(link.validate().is_err());
    }

    #[test]
    fn test_validate_requires_both_ends() {
        let interface = NodeRef::new(NodeKind::Interface, ObjectId::new());
        let link = Link::new(
            LinkStatus::Connected,
            vec![TerminationRef::new(interface, CableEnd::A)],
        );
        assert!(link.validate().is_err());
        assert_eq!(link.end_of(&interface), Some(CableEnd::A));
    }

    #[test]
    fn test_capability_dispatch() {
        let front = NodeRef::new(NodeKind::FrontPort, ObjectId::new());
        let rear = NodeRef::new(NodeKind::RearPort, ObjectId::new());
        let relay = NodeState::PassThrough(PassThroughState {
            node: front,
            peer: rear,
            link: None,
        });
        assert_eq!(relay.opposite_side(), Some(rear));
        assert_eq!(relay.connected_link(), None);

        let endpoint = NodeState::Endpoint(EndpointState {
            node: NodeRef::new(NodeKind::Interface, ObjectId::new()),
            link: Some(ObjectId::new()),
            link_peer: None,
        });
        assert_eq!(endpoint.opposite_side(), None);
        assert!(endpoint.connected_link().is_some());
    }
}
