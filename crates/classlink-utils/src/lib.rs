//! # classlink-utils
//!
//! Shared utilities for the classlink workspace: synchronization primitives,
//! thread identity, and strongly-typed indices.
use std::fmt::{Debug, Formatter};

pub mod newtypes;
pub mod sync;

pub use newtypes::{ByteOffset, FieldIndex, LoaderId, ObjectHandle, ThreadId, TypeId, VtableIndex};

pub struct DebugStr(pub String);

impl Debug for DebugStr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
