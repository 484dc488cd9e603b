//! Optimistic synchronization of client-held collections.
//!
//! A [`SyncedCollection`] caches records believed to mirror server state.
//! Mutations are applied locally first through one of the `begin_*` methods,
//! which return a [`PendingMutation`] holding the pre-change snapshot. Once the
//! gateway answers, [`PendingMutation::settle`] either commits the speculative
//! state (optionally replacing it with the canonical server record) or restores
//! the snapshot in a single state write and raises one alert.

mod collection;
mod mutation;

use std::fmt;
use std::hash::Hash;

pub use collection::{
    CollectionState, InsertionPolicy, LoadingGuard, OverlapPolicy, SyncedCollection,
};
pub use mutation::{MutationPhase, PendingMutation};

/// A record that can live in a [`SyncedCollection`].
///
/// The id must be stable for the record's lifetime and unique within the
/// collection.
pub trait Record: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    type Id: Clone + Eq + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    fn id(&self) -> &Self::Id;
}
