use crate::{
    bootstrap::Bootstrap,
    call_site::CallSiteTable,
    config::LinkerConfig,
    constraints::{LoaderConstraintTable, LoaderDependencies},
    intrinsics::IntrinsicTable,
    metrics::{CacheSizes, CacheStats, RuntimeMetrics},
    statics::InitializationManager,
};
use classlink_types::{Symbol, TypeId, TypeRegistry, members::MethodRef};
use classlink_utils::sync::Arc;
use dashmap::DashMap;

/// Which member table a method reference names.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MethodLookupKind {
    Method,
    InterfaceMethod,
}

/// Resolution results shared by every thread.
#[derive(Debug, Default)]
pub struct GlobalCaches {
    /// Successful member lookups: (owner, name, descriptor, kind) -> declared method
    pub method_cache: DashMap<(TypeId, Symbol, Symbol, MethodLookupKind), MethodRef>,
    /// Signature-polymorphic adapters: (kind, erased signature) -> method
    pub intrinsics: IntrinsicTable,
    pub call_sites: CallSiteTable,
}

impl GlobalCaches {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Thread-safe state shared by every resolver instance.
pub struct SharedLinkState {
    pub registry: Arc<dyn TypeRegistry>,
    pub config: LinkerConfig,
    pub metrics: RuntimeMetrics,
    pub caches: Arc<GlobalCaches>,
    pub initialization: Arc<InitializationManager>,
    pub constraints: LoaderConstraintTable,
    pub dependencies: LoaderDependencies,
    pub bootstrap: Option<Arc<dyn Bootstrap>>,
}

impl SharedLinkState {
    /// Shared state with configuration read from the environment.
    pub fn new(registry: Arc<dyn TypeRegistry>) -> Self {
        Self::with_config(registry, LinkerConfig::from_env())
    }

    pub fn with_config(registry: Arc<dyn TypeRegistry>, config: LinkerConfig) -> Self {
        Self {
            registry,
            config,
            metrics: RuntimeMetrics::new(),
            caches: Arc::new(GlobalCaches::new()),
            initialization: Arc::new(InitializationManager::new()),
            constraints: LoaderConstraintTable::new(),
            dependencies: LoaderDependencies::new(),
            bootstrap: None,
        }
    }

    pub fn with_bootstrap(mut self, bootstrap: Arc<dyn Bootstrap>) -> Self {
        self.bootstrap = Some(bootstrap);
        self
    }

    pub fn get_cache_stats(&self) -> CacheStats {
        self.metrics.cache_statistics(CacheSizes {
            member_size: self.caches.method_cache.len(),
            intrinsic_size: self.caches.intrinsics.len(),
            call_site_size: self.caches.call_sites.len(),
            loader_constraint_size: self.constraints.len(),
        })
    }
}

impl std::fmt::Debug for SharedLinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedLinkState")
            .field("config", &self.config)
            .field("caches", &self.caches)
            .field("initialization", &self.initialization)
            .field("has_bootstrap", &self.bootstrap.is_some())
            .finish_non_exhaustive()
    }
}
