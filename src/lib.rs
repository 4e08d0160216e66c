//! # conduit-core
//!
//! A cable path tracing engine: the subsystem that maintains derived
//! connectivity records ([`path::CablePath`]) over a network of physical
//! links and pass-through devices in a data-center-infrastructure model.
//!
//! ## Overview
//!
//! Every mutation to a physical link is propagated through the chain of
//! pass-through components it touches until one or more logical endpoints
//! are reached (or the chain is found to be broken). The result is cached
//! as a `CablePath` row, kept consistent under edits and correctly
//! invalidated or rebuilt on partial changes.
//!
//! ### Key properties
//!
//! - **Incremental maintenance**: link create/update/delete events trigger
//!   exactly the path work they require; unrelated paths are untouched.
//! - **Rebuild over patch**: a changed link re-walks every affected path
//!   from scratch, trading efficiency for correctness since one link can
//!   alter the reachability of an entire downstream chain.
//! - **Inactive and incomplete paths are first-class**: a path through a
//!   disconnected link, or one ending at a dangling patch panel, is a
//!   queryable record, not an error.
//! - **Unit-of-work semantics**: tracing for a mutation completes before
//!   control returns, so derived state is never observably stale relative
//!   to the link state that produced it.
//!
//! ## Architecture
//!
//! - [`properties`]: object ids, cable ends, link status, node kinds and
//!   the tagged node-state variants with the `connected_link()` /
//!   `opposite_side()` capabilities.
//! - [`path`]: the derived `CablePath` record and its invariants.
//! - [`trace`]: the walk algorithm (`PathTracer`), path creation, rebuild
//!   and retrace.
//! - [`orchestrator`]: classifies link lifecycle events and drives the
//!   tracer.
//! - [`event`]: input events from the storage boundary, derivative events
//!   for downstream caches.
//! - [`store`]: the storage collaborator trait plus an in-memory
//!   implementation.
//! - [`topology`]: petgraph views of the connectivity graph and the
//!   `audit` consistency check.
//! - `db` (feature `service`): a SQLite mirror of the path cache for
//!   reporting consumers.
//!
//! ## Quick Start
//!
//! Stand up a store, cable two interfaces through a patch panel, and let
//! the orchestrator maintain the derived paths:
//!
//! ```rust
//! use conduit_core::{
//!     event::LinkEvent,
//!     orchestrator::Orchestrator,
//!     properties::{CableEnd, Link, LinkStatus, NodeKind, TerminationRef},
//!     store::{MemoryStore, Store},
//! };
//!
//! fn main() -> Result<(), conduit_core::ConduitError> {
//!     let mut store = MemoryStore::new();
//!     let a = store.insert_endpoint(NodeKind::Interface)?;
//!     let b = store.insert_endpoint(NodeKind::Interface)?;
//!     let (front, rear) = store.insert_pass_through_pair();
//!     let orchestrator = Orchestrator::new();
//!
//!     // Cable interface `a` into the panel's front side.
//!     let link1 = Link::new(
//!         LinkStatus::Connected,
//!         vec![
//!             TerminationRef::new(a, CableEnd::A),
//!             TerminationRef::new(front, CableEnd::B),
//!         ],
//!     );
//!     store.insert_link(link1.clone())?;
//!     orchestrator.apply(
//!         &mut store,
//!         &LinkEvent::Saved { link: link1, created: true, status_changed: false },
//!     )?;
//!
//!     // Cable the panel's rear side to `b`; the stored path extends to `b`.
//!     let link2 = Link::new(
//!         LinkStatus::Connected,
//!         vec![
//!             TerminationRef::new(rear, CableEnd::A),
//!             TerminationRef::new(b, CableEnd::B),
//!         ],
//!     );
//!     store.insert_link(link2.clone())?;
//!     orchestrator.apply(
//!         &mut store,
//!         &LinkEvent::Saved { link: link2, created: true, status_changed: false },
//!     )?;
//!
//!     let path = store
//!         .paths_through_node(&front)?
//!         .into_iter()
//!         .find(|p| p.origins.contains(&a))
//!         .expect("path originating at a");
//!     assert!(path.is_active);
//!     assert!(path.destinations.contains(&b));
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### One path per origin end
//!
//! Tracing a link end whose terminations are endpoints produces one
//! `CablePath` whose `origins` set holds all of them; every endpoint in
//! the far termination set of the final link lands in `destinations`.
//! A chain traced from both directions yields two rows, one per
//! direction, as reporting consumers expect.
//!
//! ### Pass-through relays
//!
//! A pass-through object exposes exactly two internal sides (a patch
//! panel position's front and rear). A walk enters through the side the
//! cable lands on and exits through the other. Both sides are recorded in
//! the path's hop sequence, so a later cable plugged into either side
//! finds and rebuilds the path.
//!
//! ### Events at the boundary
//!
//! There is no pub/sub runtime: the storage layer calls the orchestrator
//! inside the same unit of work as the triggering mutation and receives
//! the derivative [`event::PathEvent`]s, which the optional SQLite cache
//! mirror consumes.

pub mod config;
#[cfg(feature = "service")]
pub mod db;
pub mod error;
pub mod event;
pub mod orchestrator;
pub mod path;
pub mod properties;
pub mod store;
pub mod topology;
pub mod trace;

#[cfg(test)]
mod tests;

pub use error::*;
