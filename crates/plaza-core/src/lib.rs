//! plaza-core - Client state for Plaza
//!
//! Reactive collections with optimistic mutations, the gateway contract they
//! talk to (with an in-memory mock backend), durable key-value storage and the
//! state stores built on top of them.

pub mod alerts;
pub mod app;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod storage;
pub mod stores;
pub mod sync;
pub mod util;

pub use app::AppServices;
pub use error::{Error, Result};
pub use sync::{CollectionState, SyncedCollection};
