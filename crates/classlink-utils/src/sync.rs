//! Basic synchronization primitives.
//!
//! This module provides a single place the rest of the workspace imports its
//! locks and atomics from, so low-level crates can depend on it without
//! pulling in the resolver.
use crate::ThreadId;
use std::cell::Cell;

pub use parking_lot::{
    Condvar, MappedRwLockReadGuard, MappedRwLockWriteGuard, Mutex, MutexGuard, RwLock,
    RwLockReadGuard, RwLockWriteGuard,
};
pub use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, AtomicUsize, Ordering},
};

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Cached runtime thread ID for the current OS thread
    static CURRENT_THREAD_ID: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Get the current thread's runtime ID, assigning one on first use.
pub fn get_current_thread_id() -> ThreadId {
    CURRENT_THREAD_ID.with(|id| match id.get() {
        Some(existing) => ThreadId::new(existing),
        None => {
            let fresh = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
            id.set(Some(fresh));
            ThreadId::new(fresh)
        }
    })
}
