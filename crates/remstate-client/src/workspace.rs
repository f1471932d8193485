//! # Workspace Manager
//!
//! Named workspaces over one configured backend. Each workspace owns one
//! state object at the path the key resolver assigns it; the `default`
//! workspace always exists and lives at the unprefixed base key.
//!
//! Enumeration lists the blob store under the workspace listing prefix and
//! keeps only the paths the resolver can identify, so stray objects that
//! happen to share the prefix never show up as workspaces.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use remstate_core::{
    EncryptionDirective, KeyLayout, LockId, OpContext, StalenessPolicy,
    ValidatedConfig, WorkspaceName,
};
use remstate_lock::{LockCoordinator, LockError, LockInfo, LockState, LockTable, NoLocking};
use remstate_snapshot::StateSnapshot;
use thiserror::Error;

use crate::client::{ClientError, RemoteClient};
use crate::store::{ObjectPaths, ObjectStore, StoreError};

/// Error from a workspace operation.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// The workspace does not exist.
    #[error("workspace {name:?} does not exist")]
    NotFound {
        /// The requested workspace.
        name: String,
    },

    /// The workspace is selected and deletion was not forced.
    #[error("workspace {name:?} is currently selected; select another workspace or force deletion")]
    InUse {
        /// The selected workspace.
        name: String,
    },

    /// The default workspace cannot be deleted.
    #[error("the default workspace cannot be deleted")]
    DefaultNotDeletable,

    /// A state read or write failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A lock operation failed.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Listing the blob store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Workspace operations over one backend configuration.
pub struct WorkspaceManager {
    store: Arc<dyn ObjectStore>,
    locks: LockCoordinator,
    layout: KeyLayout,
    encryption: EncryptionDirective,
    policy: StalenessPolicy,
    selected: Mutex<WorkspaceName>,
    clients: Mutex<HashMap<WorkspaceName, Arc<RemoteClient>>>,
}

impl std::fmt::Debug for WorkspaceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceManager")
            .field("layout", &self.layout)
            .field("encryption", &self.encryption.mode())
            .field("locks", &self.locks)
            .field("selected", &*self.selected.lock())
            .finish()
    }
}

impl WorkspaceManager {
    /// Build a manager from a validated configuration.
    ///
    /// `lock_table` is used only when the configuration names a lock table;
    /// otherwise locking is disabled. Lock records are keyed under the
    /// bucket name.
    pub fn new(
        config: ValidatedConfig,
        store: Arc<dyn ObjectStore>,
        lock_table: Arc<dyn LockTable>,
    ) -> Self {
        let table: Arc<dyn LockTable> = match &config.lock_table {
            Some(name) => {
                tracing::debug!(lock_table = %name, "state locking enabled");
                lock_table
            }
            None => {
                tracing::debug!("no lock table configured; state locking disabled");
                Arc::new(NoLocking)
            }
        };
        Self {
            store,
            locks: LockCoordinator::new(table).with_namespace(config.bucket),
            layout: config.layout,
            encryption: config.encryption,
            policy: config.staleness_policy,
            selected: Mutex::new(WorkspaceName::default_workspace()),
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// The key layout in use.
    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    /// The lock coordinator guarding every workspace path.
    pub fn locks(&self) -> &LockCoordinator {
        &self.locks
    }

    /// The physical object path of `name`'s state.
    pub fn resolve_path(&self, name: &WorkspaceName) -> String {
        self.layout.path_for(name)
    }

    /// Every workspace with stored state, plus `default`. Sorted with
    /// `default` first.
    pub fn workspaces(&self, ctx: &OpContext) -> Result<Vec<WorkspaceName>, WorkspaceError> {
        let prefix = self.layout.workspace_listing_prefix();
        let mut named = BTreeSet::new();
        for path in ObjectPaths::new(self.store.clone(), ctx.clone(), prefix) {
            let path = path?;
            let Some(name) = self.layout.workspace_for(&path) else {
                tracing::trace!(path = %path, "ignoring non-workspace object");
                continue;
            };
            match WorkspaceName::new(name) {
                Ok(name) => {
                    named.insert(name);
                }
                Err(err) => {
                    tracing::trace!(path = %path, error = %err, "ignoring invalid workspace name");
                }
            }
        }

        let default = WorkspaceName::default_workspace();
        named.remove(&default);
        let mut all = Vec::with_capacity(named.len() + 1);
        all.push(default);
        all.extend(named);
        Ok(all)
    }

    /// Whether `name` exists. `default` always exists.
    pub fn exists(&self, ctx: &OpContext, name: &WorkspaceName) -> Result<bool, WorkspaceError> {
        if name.is_default() {
            return Ok(true);
        }
        Ok(self.workspaces(ctx)?.contains(name))
    }

    /// The currently selected workspace.
    pub fn selected(&self) -> WorkspaceName {
        self.selected.lock().clone()
    }

    /// Select an existing workspace.
    pub fn select(&self, ctx: &OpContext, name: &WorkspaceName) -> Result<(), WorkspaceError> {
        if !self.exists(ctx, name)? {
            return Err(WorkspaceError::NotFound {
                name: name.to_string(),
            });
        }
        *self.selected.lock() = name.clone();
        tracing::info!(workspace = %name, "workspace selected");
        Ok(())
    }

    /// The client for `name`'s state. Clients are cached per workspace so
    /// lineage observations persist across calls.
    pub fn client(&self, name: &WorkspaceName) -> Arc<RemoteClient> {
        self.clients
            .lock()
            .entry(name.clone())
            .or_insert_with(|| {
                Arc::new(RemoteClient::new(
                    self.store.clone(),
                    self.layout.path_for(name),
                    self.encryption.clone(),
                    self.policy,
                ))
            })
            .clone()
    }

    /// Create `name` with an empty initial snapshot, under its lock.
    /// Returns `false` if state already existed.
    pub fn create(
        &self,
        ctx: &OpContext,
        name: &WorkspaceName,
        info: LockInfo,
    ) -> Result<bool, WorkspaceError> {
        let client = self.client(name);
        self.locks.with_lock(ctx, client.path(), info, |_| {
            if client.get(ctx)?.is_some() {
                return Ok(false);
            }
            client.put(ctx, &StateSnapshot::initial(Vec::new()))?;
            tracing::info!(workspace = %name, path = client.path(), "workspace created");
            Ok(true)
        })
    }

    /// Delete `name`'s state.
    ///
    /// # Errors
    ///
    /// [`WorkspaceError::DefaultNotDeletable`] for `default`, and
    /// [`WorkspaceError::InUse`] if `name` is selected and `force` is false.
    pub fn delete(
        &self,
        ctx: &OpContext,
        name: &WorkspaceName,
        force: bool,
    ) -> Result<(), WorkspaceError> {
        if name.is_default() {
            return Err(WorkspaceError::DefaultNotDeletable);
        }
        if !force && *self.selected.lock() == *name {
            return Err(WorkspaceError::InUse {
                name: name.to_string(),
            });
        }

        self.client(name).delete(ctx)?;
        self.clients.lock().remove(name);

        let mut selected = self.selected.lock();
        if *selected == *name {
            *selected = WorkspaceName::default_workspace();
        }
        tracing::info!(workspace = %name, force, "workspace deleted");
        Ok(())
    }

    /// Acquire the lock on `name`'s state path.
    pub fn lock(
        &self,
        ctx: &OpContext,
        name: &WorkspaceName,
        info: LockInfo,
    ) -> Result<LockId, WorkspaceError> {
        Ok(self.locks.acquire(ctx, &self.resolve_path(name), info)?)
    }

    /// Release the lock on `name`'s state path held under `id`.
    pub fn unlock(
        &self,
        ctx: &OpContext,
        name: &WorkspaceName,
        id: &LockId,
    ) -> Result<(), WorkspaceError> {
        Ok(self.locks.release(ctx, &self.resolve_path(name), id)?)
    }

    /// Remove any lock on `name`'s state path.
    pub fn force_unlock(&self, ctx: &OpContext, name: &WorkspaceName) -> Result<(), WorkspaceError> {
        Ok(self.locks.force_unlock(ctx, &self.resolve_path(name))?)
    }

    /// Report the lock on `name`'s state path.
    pub fn lock_status(
        &self,
        ctx: &OpContext,
        name: &WorkspaceName,
    ) -> Result<LockState, WorkspaceError> {
        Ok(self.locks.status(ctx, &self.resolve_path(name))?)
    }
}
