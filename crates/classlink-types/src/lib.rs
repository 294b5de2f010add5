//! # classlink-types
//!
//! Read-only runtime model of classes, interfaces, and their members, as seen
//! by the link resolver.
//!
//! ## Core Types
//!
//! - **[`Symbol`](symbols::Symbol)**: an interned, identity-comparable name or descriptor.
//! - **[`TypeHandle`](registry::TypeHandle)**: a finalized class, interface, or array type.
//! - **[`MethodEntry`](members::MethodEntry)** / **[`FieldEntry`](members::FieldEntry)**: declared members.
//! - **[`TypeRegistry`](registry::TypeRegistry)**: the collaborator the resolver queries.
//! - **[`ClassTable`](table::ClassTable)**: an in-memory registry that computes
//!   vtables and itables when a type is defined.
pub mod descriptor;
pub mod error;
pub mod flags;
pub mod members;
pub mod registry;
pub mod symbols;
pub mod table;

pub use classlink_utils::{ByteOffset, FieldIndex, LoaderId, ObjectHandle, TypeId, VtableIndex};
pub use registry::{TypeHandle, TypeRegistry};
pub use symbols::{Symbol, SymbolTable};

/// Internal name of the root of every class hierarchy.
pub const ROOT_CLASS_NAME: &str = "java/lang/Object";

/// Internal name of the class that declares the signature-polymorphic invokers.
pub const METHOD_HANDLE_CLASS_NAME: &str = "java/lang/invoke/MethodHandle";

/// Package portion of an internal class name (everything before the last `/`).
///
/// Array names resolve to the package of their element type; primitive arrays
/// live in the unnamed package.
pub fn package_of(name: &str) -> &str {
    let element = if name.starts_with('[') {
        let inner = name.trim_start_matches('[');
        match inner.strip_prefix('L').and_then(|e| e.strip_suffix(';')) {
            Some(class) => class,
            None => return "",
        }
    } else {
        name
    };
    match element.rfind('/') {
        Some(idx) => &element[..idx],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_of() {
        assert_eq!(package_of("java/lang/Object"), "java/lang");
        assert_eq!(package_of("Toplevel"), "");
        assert_eq!(package_of("[Lshapes/Circle;"), "shapes");
        assert_eq!(package_of("[[I"), "");
    }
}
