use crate::{LoaderId, TypeId};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeResolutionError {
    #[error("Type not found: {0}")]
    TypeNotFound(String),
    #[error("Invalid type handle: {0}")]
    InvalidHandle(TypeId),
    #[error("Unknown class loader: {0}")]
    UnknownLoader(LoaderId),
    #[error("Type {name} is already defined by {loader}")]
    DuplicateDefinition { name: String, loader: LoaderId },
    #[error("Invalid hierarchy for {name}: {reason}")]
    InvalidHierarchy { name: String, reason: String },
    #[error("Malformed descriptor: {0}")]
    Descriptor(#[from] DescriptorError),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DescriptorError {
    #[error("unexpected end of descriptor {0:?}")]
    UnexpectedEnd(String),
    #[error("invalid character {found:?} at {position} in descriptor {descriptor:?}")]
    InvalidCharacter {
        descriptor: String,
        position: usize,
        found: char,
    },
    #[error("trailing characters in descriptor {0:?}")]
    TrailingCharacters(String),
    #[error("void is only valid as a return type in {0:?}")]
    VoidParameter(String),
}

/// An exception raised by a type's static initializer, as reported by the
/// executing layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{type_name}.<clinit> failed: {message}")]
pub struct InitializerError {
    pub type_name: String,
    pub message: String,
}
