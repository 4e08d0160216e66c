//! Reaction layer for link lifecycle events.
//!
//! The storage-mutation boundary calls these handlers explicitly, inside the
//! same unit of work as the triggering mutation. Each handler classifies the
//! change and drives [PathTracer] so the derived path set is consistent
//! before control returns; the derivative [PathEvent]s describe exactly what
//! was written.

use crate::{
    error::ConduitError,
    event::{LinkEvent, PathEvent},
    properties::{CableEnd, Link, NodeCategory, TerminationRef},
    store::Store,
    trace::PathTracer,
};

#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    tracer: PathTracer,
}

impl Orchestrator {
    pub fn new() -> Self {
        Orchestrator::default()
    }

    pub fn with_tracer(tracer: PathTracer) -> Self {
        Orchestrator { tracer }
    }

    pub fn tracer(&self) -> &PathTracer {
        &self.tracer
    }

    /// Dispatch an event to the matching handler.
    pub fn apply<S: Store>(
        &self,
        store: &mut S,
        event: &LinkEvent,
    ) -> Result<Vec<PathEvent>, ConduitError> {
        tracing::debug!("processing {event}");
        match event {
            LinkEvent::Saved {
                link,
                created,
                status_changed,
            } => self.on_link_saved(store, link, *created, *status_changed),
            LinkEvent::Deleted(link) => self.on_link_deleted(store, link),
            LinkEvent::TerminationDeleted(termination) => {
                self.on_termination_deleted(store, termination)
            }
        }
    }

    /// A link row was written.
    ///
    /// On create, each end seeds path work according to the category of its
    /// terminations: endpoint ends originate new paths, pass-through ends
    /// rebuild whatever stored paths already traverse them. On a status
    /// change, leaving connected status merely deactivates the containing
    /// paths (the shape is unchanged, only reachability); entering connected
    /// status rebuilds them fully.
    pub fn on_link_saved<S: Store>(
        &self,
        store: &mut S,
        link: &Link,
        created: bool,
        status_changed: bool,
    ) -> Result<Vec<PathEvent>, ConduitError> {
        let mut events = Vec::new();
        if created {
            link.validate()?;
            for end in [CableEnd::A, CableEnd::B] {
                let nodes = link.end_nodes(end)?;
                let Some(first) = nodes.first() else {
                    continue;
                };
                match first.category() {
                    NodeCategory::Endpoint => {
                        match self.tracer.create_cablepath(store, &nodes) {
                            Ok(Some(path)) => events.push(PathEvent::PathSaved(path)),
                            Ok(None) => {}
                            Err(ConduitError::Cycle(msg)) => {
                                tracing::warn!(
                                    "no path created from end {end} of link {}: {msg}",
                                    link.id
                                );
                            }
                            Err(e) => return Err(e),
                        }
                    }
                    NodeCategory::PassThrough => {
                        events.append(&mut self.tracer.rebuild_paths(store, &nodes)?);
                    }
                }
            }
        } else if status_changed {
            if !link.status.is_connected() {
                let affected = store.paths_through_link(&link.id)?;
                for id in store.update_path_active(&link.id, false)? {
                    events.push(PathEvent::PathActiveChanged(id, false));
                }
                // The ultimate-connectivity cache no longer holds for the
                // origins of a deactivated path. Destination endpoints are
                // covered by their own origin rows.
                for path in &affected {
                    for node in &path.origins {
                        store.set_endpoint_peer(node, None)?;
                        events.push(PathEvent::PeerCleared(*node));
                    }
                }
            } else {
                events.append(
                    &mut self
                        .tracer
                        .rebuild_paths_through_link(store, &link.id)?,
                );
            }
        }
        Ok(events)
    }

    /// A link row was removed. Invoked after the store dropped the row; each
    /// containing path is retraced and finds the instance missing, shrinking
    /// to its surviving prefix or disappearing entirely.
    pub fn on_link_deleted<S: Store>(
        &self,
        store: &mut S,
        link: &Link,
    ) -> Result<Vec<PathEvent>, ConduitError> {
        self.tracer.rebuild_paths_through_link(store, &link.id)
    }

    /// A termination reference was removed: clear the cached link peer on
    /// the owning endpoint. A pure side-effect write, independent of path
    /// tracing.
    pub fn on_termination_deleted<S: Store>(
        &self,
        store: &mut S,
        termination: &TerminationRef,
    ) -> Result<Vec<PathEvent>, ConduitError> {
        if termination.node.category() != NodeCategory::Endpoint {
            return Ok(vec![]);
        }
        store.set_endpoint_peer(&termination.node, None)?;
        Ok(vec![PathEvent::PeerCleared(termination.node)])
    }
}
