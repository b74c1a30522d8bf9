//! Coordination registry for namespace state shared between workers
//!
//! One [`NamespaceShared`] exists per (namespace, workspace) pair. It owns
//! the table (behind the namespace lock) and the pending-flush flags of
//! every store attached to it, along with the digest of the snapshot as
//! this deployment last loaded or wrote it. The registry creates entries on
//! first use and drops them all on [`SharedRegistry::finalize`].

use dsmeta_common::ContentDigest;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use tokio::sync::MutexGuard;
use tracing::debug;

/// Records of one namespace, keyed by record id
///
/// Iteration is in ascending id order, which makes table order (and every
/// tie-break derived from it) deterministic.
pub type Table = BTreeMap<String, Value>;

/// Identity of one namespace within one workspace
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceKey {
    pub namespace: String,
    pub workspace: String,
}

impl NamespaceKey {
    pub fn new(namespace: impl Into<String>, workspace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            workspace: workspace.into(),
        }
    }
}

impl fmt::Display for NamespaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.workspace.is_empty() {
            f.write_str(&self.namespace)
        } else {
            write!(f, "{}/{}", self.workspace, self.namespace)
        }
    }
}

/// Shared state of one namespace
pub struct NamespaceShared {
    key: NamespaceKey,
    /// The namespace lock and the table it protects
    table: tokio::sync::Mutex<Table>,
    /// Pending-flush flags, one per attached store
    flags: Mutex<Vec<Weak<AtomicBool>>>,
    /// Set once the table has been seeded; only written under the init gate
    initialized: AtomicBool,
    /// Snapshot digest as last loaded or written by any attached store
    digest: Mutex<Option<ContentDigest>>,
}

impl NamespaceShared {
    fn new(key: NamespaceKey) -> Self {
        Self {
            key,
            table: tokio::sync::Mutex::new(Table::new()),
            flags: Mutex::new(Vec::new()),
            initialized: AtomicBool::new(false),
            digest: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn key(&self) -> &NamespaceKey {
        &self.key
    }

    /// Digest of the snapshot this deployment last loaded or wrote
    #[must_use]
    pub fn digest(&self) -> Option<ContentDigest> {
        *self.digest.lock()
    }

    pub fn set_digest(&self, digest: Option<ContentDigest>) {
        *self.digest.lock() = digest;
    }

    /// Acquire the namespace lock
    pub async fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().await
    }

    /// Register a new pending-flush flag, initially clear
    #[must_use]
    pub fn register_flag(&self) -> Arc<AtomicBool> {
        let flag = Arc::new(AtomicBool::new(false));
        let mut flags = self.flags.lock();
        flags.retain(|f| f.strong_count() > 0);
        flags.push(Arc::downgrade(&flag));
        flag
    }

    /// Number of live flags (one per attached store)
    #[must_use]
    pub fn flag_count(&self) -> usize {
        self.flags.lock().iter().filter(|f| f.strong_count() > 0).count()
    }

    /// Set the pending-flush flag of every attached store
    pub fn broadcast_dirty(&self) {
        self.store_all(true);
    }

    /// Clear the pending-flush flag of every attached store
    pub fn clear_dirty(&self) {
        self.store_all(false);
    }

    fn store_all(&self, value: bool) {
        for flag in self.flags.lock().iter().filter_map(Weak::upgrade) {
            flag.store(value, Ordering::Release);
        }
    }
}

/// Registry of all shared namespaces of one deployment
pub struct SharedRegistry {
    namespaces: Mutex<HashMap<NamespaceKey, Arc<NamespaceShared>>>,
    /// Serializes first-time namespace setup
    init_gate: tokio::sync::Mutex<()>,
}

impl Default for SharedRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            namespaces: Mutex::new(HashMap::new()),
            init_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Process-wide default registry
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<SharedRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::new())))
    }

    /// Shared state for (namespace, workspace), created on first use
    pub fn namespace(&self, namespace: &str, workspace: &str) -> Arc<NamespaceShared> {
        let key = NamespaceKey::new(namespace, workspace);
        let mut namespaces = self.namespaces.lock();
        Arc::clone(
            namespaces
                .entry(key.clone())
                .or_insert_with(|| Arc::new(NamespaceShared::new(key))),
        )
    }

    /// Gate serializing first-time setup across all namespaces
    #[must_use]
    pub const fn init_gate(&self) -> &tokio::sync::Mutex<()> {
        &self.init_gate
    }

    /// Returns true exactly once per (namespace, workspace) per registry
    /// lifetime. The caller that sees true seeds the table from disk.
    pub fn try_initialize(&self, namespace: &str, workspace: &str) -> bool {
        let shared = self.namespace(namespace, workspace);
        let first = !shared.initialized.swap(true, Ordering::AcqRel);
        if first {
            debug!("[{}] Namespace {} claimed for initialization", workspace, namespace);
        }
        first
    }

    /// Register a pending-flush flag for (namespace, workspace)
    pub fn update_flag(&self, namespace: &str, workspace: &str) -> Arc<AtomicBool> {
        self.namespace(namespace, workspace).register_flag()
    }

    /// Set the pending-flush flag for every store of (namespace, workspace)
    pub fn broadcast_dirty(&self, namespace: &str, workspace: &str) {
        self.namespace(namespace, workspace).broadcast_dirty();
    }

    /// Clear the pending-flush flag for every store of (namespace, workspace)
    pub fn clear_dirty(&self, namespace: &str, workspace: &str) {
        self.namespace(namespace, workspace).clear_dirty();
    }

    /// Number of namespaces currently registered
    #[must_use]
    pub fn len(&self) -> usize {
        self.namespaces.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespaces.lock().is_empty()
    }

    /// Tear down every namespace (deployment shutdown)
    ///
    /// Stores still holding a namespace keep their handle but are detached
    /// from the registry; a later `namespace()` call starts from scratch.
    pub fn finalize(&self) {
        let dropped = {
            let mut namespaces = self.namespaces.lock();
            let n = namespaces.len();
            namespaces.clear();
            n
        };
        debug!("Shared registry finalized ({} namespaces)", dropped);
    }
}
