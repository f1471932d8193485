//! # Object Store
//!
//! The blob store seen by the remote client: get, put, delete, and
//! paginated listing by prefix. The encryption directive travels with every
//! read and write and is interpreted only by the store.
//!
//! [`ObjectPaths`] turns `list_page` into a lazy iterator. It fetches one
//! page at a time, checks the operation context before every page request,
//! and can be restarted from the beginning.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use remstate_core::{EncryptionDirective, OpContext, OperationCancelled};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Default number of paths returned per page by [`MemoryObjectStore`].
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Error from the blob store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The request was refused, e.g. a customer-key object read without
    /// the matching key.
    #[error("access to {path:?} denied: {reason}")]
    AccessDenied {
        /// Object path.
        path: String,
        /// Store-specific detail.
        reason: String,
    },

    /// The store failed or could not be reached.
    #[error("object store {operation} on {path:?} failed: {reason}")]
    Backend {
        /// The request that failed.
        operation: &'static str,
        /// Object path or listing prefix.
        path: String,
        /// Store-specific detail.
        reason: String,
    },

    /// The context was cancelled before a page request was issued.
    #[error(transparent)]
    Cancelled(#[from] OperationCancelled),
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Object paths on this page.
    pub paths: Vec<String>,
    /// Token for the next page; `None` on the last page.
    pub next: Option<String>,
}

/// A blob store holding state objects.
pub trait ObjectStore: Send + Sync {
    /// Fetch the object at `path`. Absence is `Ok(None)`.
    fn get_object(
        &self,
        path: &str,
        directive: &EncryptionDirective,
    ) -> Result<Option<Vec<u8>>, StoreError>;

    /// Write the object at `path`, replacing any previous content.
    fn put_object(
        &self,
        path: &str,
        bytes: &[u8],
        directive: &EncryptionDirective,
    ) -> Result<(), StoreError>;

    /// Remove the object at `path`. Removing an absent object succeeds.
    fn delete_object(&self, path: &str) -> Result<(), StoreError>;

    /// List object paths starting with `prefix`, resuming after
    /// `continuation` when given.
    fn list_page(&self, prefix: &str, continuation: Option<&str>) -> Result<ListPage, StoreError>;
}

/// Lazy, restartable iterator over every object path under a prefix.
///
/// Yields `Err` at most once; iteration stops after an error until
/// [`restart`](Self::restart) is called.
pub struct ObjectPaths {
    store: Arc<dyn ObjectStore>,
    ctx: OpContext,
    prefix: String,
    buffered: VecDeque<String>,
    continuation: Option<String>,
    exhausted: bool,
}

impl ObjectPaths {
    /// Iterate over `prefix` in `store`. No request is issued until the
    /// first call to `next`.
    pub fn new(store: Arc<dyn ObjectStore>, ctx: OpContext, prefix: impl Into<String>) -> Self {
        Self {
            store,
            ctx,
            prefix: prefix.into(),
            buffered: VecDeque::new(),
            continuation: None,
            exhausted: false,
        }
    }

    /// Discard progress and start again from the first page.
    pub fn restart(&mut self) {
        self.buffered.clear();
        self.continuation = None;
        self.exhausted = false;
    }

    fn fetch_page(&mut self) -> Result<(), StoreError> {
        self.ctx.check("list", &self.prefix)?;
        let page = self
            .store
            .list_page(&self.prefix, self.continuation.as_deref())?;
        tracing::debug!(prefix = %self.prefix, count = page.paths.len(), more = page.next.is_some(), "listed page");
        self.buffered.extend(page.paths);
        self.exhausted = page.next.is_none();
        self.continuation = page.next;
        Ok(())
    }
}

impl Iterator for ObjectPaths {
    type Item = Result<String, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(path) = self.buffered.pop_front() {
                return Some(Ok(path));
            }
            if self.exhausted {
                return None;
            }
            if let Err(e) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    directive: EncryptionDirective,
}

/// In-process blob store.
///
/// Objects written with [`EncryptionDirective::CustomerKey`] can only be
/// read back by presenting the same key.
#[derive(Debug)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    page_size: usize,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryObjectStore {
    /// An empty store returning [`DEFAULT_PAGE_SIZE`] paths per page.
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// An empty store returning at most `page_size` paths per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            page_size: page_size.max(1),
        }
    }

    /// The directive an object was written with.
    pub fn directive_of(&self, path: &str) -> Option<EncryptionDirective> {
        self.objects.lock().get(path).map(|o| o.directive.clone())
    }

    /// Whether an object exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().contains_key(path)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }
}

fn key_matches(stored: &EncryptionDirective, presented: &EncryptionDirective) -> bool {
    match (stored, presented) {
        (EncryptionDirective::CustomerKey(a), EncryptionDirective::CustomerKey(b)) => {
            a.as_bytes()[..].ct_eq(&b.as_bytes()[..]).into()
        }
        (EncryptionDirective::CustomerKey(_), _) => false,
        _ => true,
    }
}

impl ObjectStore for MemoryObjectStore {
    fn get_object(
        &self,
        path: &str,
        directive: &EncryptionDirective,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let objects = self.objects.lock();
        let Some(object) = objects.get(path) else {
            return Ok(None);
        };
        if !key_matches(&object.directive, directive) {
            return Err(StoreError::AccessDenied {
                path: path.to_string(),
                reason: "object is encrypted with a customer key that was not presented".into(),
            });
        }
        Ok(Some(object.bytes.clone()))
    }

    fn put_object(
        &self,
        path: &str,
        bytes: &[u8],
        directive: &EncryptionDirective,
    ) -> Result<(), StoreError> {
        self.objects.lock().insert(
            path.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                directive: directive.clone(),
            },
        );
        Ok(())
    }

    fn delete_object(&self, path: &str) -> Result<(), StoreError> {
        self.objects.lock().remove(path);
        Ok(())
    }

    fn list_page(&self, prefix: &str, continuation: Option<&str>) -> Result<ListPage, StoreError> {
        let objects = self.objects.lock();
        let mut matching = objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .filter(|k| continuation.map_or(true, |after| k.as_str() > after));
        let paths: Vec<String> = matching.by_ref().take(self.page_size).cloned().collect();
        let next = match (matching.next(), paths.last()) {
            (Some(_), Some(last)) => Some(last.clone()),
            _ => None,
        };
        Ok(ListPage { paths, next })
    }
}
