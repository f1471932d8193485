//! # remstate-client: Remote State Client and Workspace Manager
//!
//! Reads and writes state snapshots in a blob store and exposes the
//! workspace operations built on top of them.
//!
//! ## Modules
//!
//! - **Store** (`store.rs`): the [`ObjectStore`] trait, lazy paginated
//!   listing, and the in-memory [`MemoryObjectStore`].
//! - **Client** (`client.rs`): [`RemoteClient`] bound to one resolved path.
//!   Writes are assessed for staleness, then re-read and verified.
//! - **Workspace** (`workspace.rs`): [`WorkspaceManager`] enumerates,
//!   selects, creates, deletes, and locks workspaces by name.
//!
//! ## Locking
//!
//! [`RemoteClient::put`] does not lock. Callers bracket writes with the
//! lock coordinator, directly or through [`WorkspaceManager::lock`] and
//! [`WorkspaceManager::unlock`].

pub mod client;
pub mod store;
pub mod workspace;

pub use client::{ClientError, LineageMismatch, PersistReceipt, RemoteClient, Retrieved};
pub use store::{ListPage, MemoryObjectStore, ObjectPaths, ObjectStore, StoreError};
pub use workspace::{WorkspaceError, WorkspaceManager};
