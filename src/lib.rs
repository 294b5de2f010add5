//! Symbolic reference resolution and call dispatch for a class-based runtime.
//!
//! This crate re-exports the workspace members:
//!
//! - [`types`]: the class model and the in-memory [`types::table::ClassTable`].
//! - [`vm`]: the [`vm::LinkResolver`] and its caches.
//! - [`cli`]: the manifest-driven command-line front end.
pub use classlink_cli as cli;
pub use classlink_types as types;
pub use classlink_utils as utils;
pub use classlink_vm as vm;
