//! Events crossing the engine boundary.
//!
//! [LinkEvent]s arrive from the storage-mutation boundary as explicit calls
//! (no implicit pub/sub runtime); [PathEvent]s are the derivative outputs a
//! mutation produced, consumed by cache mirrors and change tracking.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::{
    path::CablePath,
    properties::{Link, NodeRef, ObjectId, TerminationRef},
};

/// A link lifecycle notification. Produced by the storage/lifecycle layer
/// inside the same unit of work as the triggering mutation, so derived path
/// state is never observably stale relative to link state.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum LinkEvent {
    /// A link row was written. `created` distinguishes first save from
    /// updates; `status_changed` marks a status transition on an existing
    /// link. Termination sets of existing links never change.
    Saved {
        link: Link,
        created: bool,
        status_changed: bool,
    },
    /// A link row was removed. Carries the removed instance, since the store
    /// no longer holds it.
    Deleted(Link),
    /// A termination reference was removed from inventory.
    TerminationDeleted(TerminationRef),
}

impl Display for LinkEvent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            LinkEvent::Saved {
                link,
                created,
                status_changed,
            } => write!(
                f,
                "Saved({}, created: {created}, status_changed: {status_changed})",
                link.id
            ),
            LinkEvent::Deleted(link) => write!(f, "Deleted({})", link.id),
            LinkEvent::TerminationDeleted(t) => write!(f, "TerminationDeleted({t})"),
        }
    }
}

/// Derivative output of one processed [LinkEvent]: exactly the path rows and
/// back-reference fields the mutation wrote.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum PathEvent {
    /// A path row was created or its contents replaced in place.
    PathSaved(CablePath),
    /// A path row was deleted.
    PathRemoved(ObjectId),
    /// A path's active flag was flipped without retracing.
    PathActiveChanged(ObjectId, bool),
    /// An endpoint's cached link peer was cleared.
    PeerCleared(NodeRef),
}

impl Display for PathEvent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            PathEvent::PathSaved(path) => write!(f, "PathSaved({})", path.id),
            PathEvent::PathRemoved(id) => write!(f, "PathRemoved({id})"),
            PathEvent::PathActiveChanged(id, active) => {
                write!(f, "PathActiveChanged({id}, {active})")
            }
            PathEvent::PeerCleared(node) => write!(f, "PeerCleared({node})"),
        }
    }
}
