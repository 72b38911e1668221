//! foreman-core: entity lifecycle and cross-document consistency engine.
//!
//! Three independently stored document kinds — principals, collections, and
//! work items — with the invariants between them enforced here rather than
//! by the store:
//!
//! - [`lifecycle`] validates and applies work-item state transitions behind
//!   a role-aware permission predicate
//! - [`progress`] derives a collection's completion percentage from its
//!   work items after every change
//! - [`membership`] keeps the bidirectional collection/principal membership
//!   references in sync through explicit two-sided writes, with a standing
//!   reconciliation pass to repair drift
//!
//! The [`store::EntityStore`] trait models the backing document store:
//! per-document atomicity only, no multi-document transactions, no
//! referential integrity. Presentation and routing live elsewhere; this
//! crate exposes only programmatic operations returning typed
//! [`error::CoreError`] values.
//!
//! # Conventions
//!
//! - **Errors**: typed [`error::CoreError`] from every public operation;
//!   `anyhow::Result` only in setup plumbing (config, store open).
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod membership;
pub mod model;
pub mod progress;
pub mod store;

pub use error::{CoreError, ErrorCode, Side};
pub use model::{
    Collection, CollectionId, CollectionStatus, EntityKind, NewWorkItem, Principal, PrincipalId,
    Priority, Role, Status, WorkItem, WorkItemId,
};
pub use store::{EntityStore, MemoryStore, SqliteStore, StoreError};
