use crate::{error::LinkError, metrics::RuntimeMetrics};
use classlink_types::{TypeHandle, TypeId, TypeRegistry, error::InitializerError};
use classlink_utils::{
    DebugStr, ThreadId,
    sync::{Arc, AtomicU8, AtomicU64, Condvar, Mutex, OnceLock, Ordering, get_current_thread_id},
};
use dashmap::DashMap;
use std::fmt::{self, Debug, Formatter};
use tracing::{debug, warn};

/// Initialization states for a type's static initializer.
pub const INIT_STATE_UNINITIALIZED: u8 = 0;
pub const INIT_STATE_INITIALIZING: u8 = 1;
pub const INIT_STATE_INITIALIZED: u8 = 2;
pub const INIT_STATE_FAILED: u8 = 3;

pub struct InitState {
    state: AtomicU8,
    /// Only meaningful while `state` is INITIALIZING.
    initializing_thread: AtomicU64,
    /// Set before `state` becomes FAILED.
    failure: OnceLock<InitializerError>,
    cond: Condvar,
    mutex: Mutex<()>,
}

impl InitState {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(INIT_STATE_UNINITIALIZED),
            initializing_thread: AtomicU64::new(ThreadId::INVALID.as_u64()),
            failure: OnceLock::new(),
            cond: Condvar::new(),
            mutex: Mutex::new(()),
        }
    }

    pub fn state(&self) -> u8 {
        self.state.load(Ordering::Acquire)
    }

    fn finish(&self, state: u8) {
        self.state.store(state, Ordering::Release);
        let _lock = self.mutex.lock();
        self.cond.notify_all();
    }
}

impl Debug for InitState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.state() {
            INIT_STATE_INITIALIZED => write!(f, "initialized"),
            INIT_STATE_INITIALIZING => write!(
                f,
                "initializing on thread {}",
                self.initializing_thread.load(Ordering::Acquire)
            ),
            INIT_STATE_FAILED => write!(f, "failed"),
            _ => write!(f, "uninitialized"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum StaticInitResult {
    /// This thread must run the initializer.
    Execute,
    Initialized,
    /// The calling thread is already initializing this type; proceed as if initialized.
    Recursive,
    /// A previous attempt failed with this exception.
    Failed(InitializerError),
    /// Another thread is initializing this type.
    Waiting,
}

/// Tracks static initialization of every type so that each initializer runs
/// at most once, superclasses first.
#[derive(Default)]
pub struct InitializationManager {
    types: DashMap<TypeId, Arc<InitState>>,
}

impl Debug for InitializationManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.types
                    .iter()
                    .map(|e| (DebugStr(e.key().to_string()), format!("{:?}", e.value()))),
            )
            .finish()
    }
}

impl InitializationManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn state_of(&self, ty: TypeId) -> Arc<InitState> {
        self.types
            .entry(ty)
            .or_insert_with(|| Arc::new(InitState::new()))
            .clone()
    }

    pub fn get_init_state(&self, ty: TypeId) -> u8 {
        self.types
            .get(&ty)
            .map(|s| s.state())
            .unwrap_or(INIT_STATE_UNINITIALIZED)
    }

    pub fn is_initialized(&self, ty: TypeId) -> bool {
        self.get_init_state(ty) == INIT_STATE_INITIALIZED
    }

    /// Decide what `thread` should do about initializing `ty`. At most one
    /// thread is ever told to execute a given type's initializer.
    pub fn begin(&self, ty: TypeId, thread: ThreadId) -> StaticInitResult {
        let state = self.state_of(ty);
        let current = state.state();

        if current == INIT_STATE_INITIALIZED {
            return StaticInitResult::Initialized;
        }
        if current == INIT_STATE_FAILED {
            return self.failed_result(&state);
        }
        if current == INIT_STATE_INITIALIZING
            && state.initializing_thread.load(Ordering::Acquire) == thread.as_u64()
        {
            return StaticInitResult::Recursive;
        }

        match state.state.compare_exchange(
            INIT_STATE_UNINITIALIZED,
            INIT_STATE_INITIALIZING,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                state
                    .initializing_thread
                    .store(thread.as_u64(), Ordering::Release);
                StaticInitResult::Execute
            }
            Err(INIT_STATE_INITIALIZED) => StaticInitResult::Initialized,
            Err(INIT_STATE_FAILED) => self.failed_result(&state),
            Err(_) => StaticInitResult::Waiting,
        }
    }

    fn failed_result(&self, state: &InitState) -> StaticInitResult {
        match state.failure.get() {
            Some(cause) => StaticInitResult::Failed(cause.clone()),
            None => StaticInitResult::Failed(InitializerError {
                type_name: String::new(),
                message: "initialization failed".to_string(),
            }),
        }
    }

    pub fn mark_initialized(&self, ty: TypeId) {
        if let Some(state) = self.types.get(&ty).map(|s| s.clone()) {
            state.finish(INIT_STATE_INITIALIZED);
        }
    }

    /// Record `cause` as the permanent outcome for `ty` and wake waiters.
    pub fn mark_failed(&self, ty: TypeId, cause: InitializerError) {
        if let Some(state) = self.types.get(&ty).map(|s| s.clone()) {
            let _ = state.failure.set(cause);
            state.finish(INIT_STATE_FAILED);
        }
    }

    /// Block until another thread finishes initializing `ty`.
    pub fn wait_for_init(&self, ty: TypeId, metrics: &RuntimeMetrics) {
        let state = self.state_of(ty);
        if state.state() == INIT_STATE_INITIALIZING {
            metrics.record_initialization_wait();
        }
        loop {
            if state.state() != INIT_STATE_INITIALIZING {
                break;
            }
            let mut lock = state.mutex.lock();
            if state.state() != INIT_STATE_INITIALIZING {
                break;
            }
            state.cond.wait(&mut lock);
        }
    }

    /// Ensure `ty` is initialized on the calling thread, running its
    /// superclass initializers first. Interfaces do not initialize their
    /// superclass.
    pub fn initialize(
        &self,
        registry: &dyn TypeRegistry,
        ty: &TypeHandle,
        metrics: &RuntimeMetrics,
    ) -> Result<(), LinkError> {
        let thread = get_current_thread_id();
        loop {
            match self.begin(ty.id(), thread) {
                StaticInitResult::Initialized | StaticInitResult::Recursive => return Ok(()),
                StaticInitResult::Failed(cause) => {
                    return Err(LinkError::PriorInitializationFailure {
                        type_name: ty.display_name().to_string(),
                        cause,
                    });
                }
                StaticInitResult::Waiting => self.wait_for_init(ty.id(), metrics),
                StaticInitResult::Execute => return self.execute(registry, ty, metrics),
            }
        }
    }

    fn execute(
        &self,
        registry: &dyn TypeRegistry,
        ty: &TypeHandle,
        metrics: &RuntimeMetrics,
    ) -> Result<(), LinkError> {
        if !ty.is_interface() {
            if let Some(super_id) = ty.super_type() {
                let super_type = match registry.get(super_id) {
                    Ok(s) => s,
                    Err(e) => {
                        self.mark_failed(
                            ty.id(),
                            InitializerError {
                                type_name: ty.display_name().to_string(),
                                message: e.to_string(),
                            },
                        );
                        return Err(e.into());
                    }
                };
                if let Err(e) = self.initialize(registry, &super_type, metrics) {
                    let cause = e.initializer_cause().cloned().unwrap_or_else(|| {
                        InitializerError {
                            type_name: ty.display_name().to_string(),
                            message: e.to_string(),
                        }
                    });
                    self.mark_failed(ty.id(), cause);
                    return Err(e);
                }
            }
        }

        if !ty.has_static_initializer() {
            self.mark_initialized(ty.id());
            return Ok(());
        }

        debug!(type_name = ty.display_name(), "running static initializer");
        metrics.record_initializer_run();
        match registry.run_static_initializer(ty) {
            Ok(()) => {
                self.mark_initialized(ty.id());
                Ok(())
            }
            Err(cause) => {
                warn!(
                    type_name = ty.display_name(),
                    error = %cause,
                    "static initializer failed"
                );
                self.mark_failed(ty.id(), cause.clone());
                Err(LinkError::InitializationFailed {
                    type_name: ty.display_name().to_string(),
                    cause,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LinkErrorKind;
    use classlink_types::{
        LoaderId, Symbol, SymbolTable,
        error::TypeResolutionError,
        table::{ClassBuilder, ClassTable},
    };
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_begin_state_machine() {
        let manager = InitializationManager::new();
        let ty = TypeId(5);
        let me = ThreadId::new(1);
        let other = ThreadId::new(2);

        assert_eq!(manager.begin(ty, me), StaticInitResult::Execute);
        assert_eq!(manager.begin(ty, me), StaticInitResult::Recursive);
        assert_eq!(manager.begin(ty, other), StaticInitResult::Waiting);
        manager.mark_initialized(ty);
        assert_eq!(manager.begin(ty, other), StaticInitResult::Initialized);
        assert!(manager.is_initialized(ty));
    }

    #[test]
    fn test_failure_is_permanent() {
        let table = ClassTable::new().unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let id = table
            .define(ClassBuilder::class("p/Broken").initializer(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("boom".to_string())
            }))
            .unwrap();
        let ty = table.get(id).unwrap();
        let manager = InitializationManager::new();
        let metrics = RuntimeMetrics::new();

        let first = manager.initialize(&table, &ty, &metrics).unwrap_err();
        assert!(matches!(first, LinkError::InitializationFailed { .. }));
        let second = manager.initialize(&table, &ty, &metrics).unwrap_err();
        assert!(matches!(second, LinkError::PriorInitializationFailure { .. }));
        assert_eq!(first.initializer_cause(), second.initializer_cause());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(manager.get_init_state(id), INIT_STATE_FAILED);
    }

    #[test]
    fn test_superclass_initialized_first() {
        let table = ClassTable::new().unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (order.clone(), order.clone());
        table
            .define(ClassBuilder::class("p/Parent").initializer(move || {
                a.lock().push("parent");
                Ok(())
            }))
            .unwrap();
        let child = table
            .define(
                ClassBuilder::class("p/Child")
                    .extends("p/Parent")
                    .initializer(move || {
                        b.lock().push("child");
                        Ok(())
                    }),
            )
            .unwrap();

        let manager = InitializationManager::new();
        let metrics = RuntimeMetrics::new();
        let child = table.get(child).unwrap();
        manager.initialize(&table, &child, &metrics).unwrap();
        manager.initialize(&table, &child, &metrics).unwrap();
        assert_eq!(*order.lock(), vec!["parent", "child"]);
        assert_eq!(metrics.initializer_runs.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_failed_superclass_fails_subclass() {
        let table = ClassTable::new().unwrap();
        table
            .define(ClassBuilder::class("p/Parent").initializer(|| Err("bad parent".into())))
            .unwrap();
        let child = table
            .define(ClassBuilder::class("p/Child").extends("p/Parent"))
            .unwrap();
        let manager = InitializationManager::new();
        let metrics = RuntimeMetrics::new();
        let child = table.get(child).unwrap();

        let err = manager.initialize(&table, &child, &metrics).unwrap_err();
        assert_eq!(err.initializer_cause().unwrap().message, "bad parent");
        assert_eq!(manager.get_init_state(child.id()), INIT_STATE_FAILED);
    }

    /// Delegates to a class table but cannot resolve one hidden type.
    struct HidingRegistry {
        inner: ClassTable,
        hidden: TypeId,
    }

    impl TypeRegistry for HidingRegistry {
        fn symbols(&self) -> &SymbolTable {
            self.inner.symbols()
        }

        fn get(&self, id: TypeId) -> Result<TypeHandle, TypeResolutionError> {
            if id == self.hidden {
                return Err(TypeResolutionError::InvalidHandle(id));
            }
            self.inner.get(id)
        }

        fn lookup(&self, name: Symbol, loader: LoaderId) -> Option<TypeHandle> {
            self.inner.lookup(name, loader)
        }

        fn root_type(&self) -> TypeHandle {
            self.inner.root_type()
        }

        fn method_handle_type(&self) -> Option<TypeHandle> {
            self.inner.method_handle_type()
        }

        fn loader_parent(&self, loader: LoaderId) -> Option<LoaderId> {
            self.inner.loader_parent(loader)
        }

        fn run_static_initializer(&self, ty: &TypeHandle) -> Result<(), InitializerError> {
            self.inner.run_static_initializer(ty)
        }
    }

    #[test]
    fn test_unresolvable_ancestor_fails_whole_chain() {
        let table = ClassTable::new().unwrap();
        let grand = table.define(ClassBuilder::class("p/Grand")).unwrap();
        table
            .define(ClassBuilder::class("p/Middle").extends("p/Grand"))
            .unwrap();
        let child = table
            .define(ClassBuilder::class("p/Leaf").extends("p/Middle"))
            .unwrap();
        let child = table.get(child).unwrap();
        let registry = HidingRegistry {
            inner: table,
            hidden: grand,
        };
        let manager = InitializationManager::new();
        let metrics = RuntimeMetrics::new();

        let first = manager.initialize(&registry, &child, &metrics).unwrap_err();
        assert!(matches!(first, LinkError::TypeResolution(_)));
        assert_eq!(manager.get_init_state(child.id()), INIT_STATE_FAILED);
        assert_eq!(
            manager.begin(child.id(), ThreadId::new(2)),
            StaticInitResult::Failed(InitializerError {
                type_name: "p/Leaf".to_string(),
                message: first.to_string(),
            })
        );

        // The initializing thread must not read the failed state as recursion.
        let second = manager.initialize(&registry, &child, &metrics).unwrap_err();
        assert_eq!(second.kind(), LinkErrorKind::InitializationFailure);
        assert!(matches!(second, LinkError::PriorInitializationFailure { .. }));
    }

    #[test]
    fn test_concurrent_initialization_runs_once() {
        let table = ClassTable::new().unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let id = table
            .define(ClassBuilder::class("p/Slow").initializer(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(20));
                Ok(())
            }))
            .unwrap();
        let ty = table.get(id).unwrap();
        let manager = InitializationManager::new();
        let metrics = RuntimeMetrics::new();

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| manager.initialize(&table, &ty, &metrics).unwrap());
            }
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(manager.is_initialized(id));
        assert!(format!("{:?}", manager).contains("initialized"));
    }
}
