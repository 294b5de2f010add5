use classlink_types::error::{InitializerError, TypeResolutionError};
use thiserror::Error;

/// Error reported by a [`Bootstrap`](crate::bootstrap::Bootstrap) collaborator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BootstrapError {
    /// A linkage-category failure; wrapped as [`LinkError::BootstrapFailure`].
    #[error("linkage error: {0}")]
    Linkage(String),
    /// Already specialized as a bootstrap failure; passed through unchanged.
    #[error("bootstrap method error: {0}")]
    BootstrapMethod(String),
    /// Anything else thrown by the bootstrap method; passed through unchanged.
    #[error("{0}")]
    Other(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LinkErrorKind {
    NoSuchMember,
    IncompatibleKind,
    AbstractTarget,
    AccessViolation,
    LoaderConstraintViolation,
    BootstrapFailure,
    NullReceiver,
    InitializationFailure,
    TypeResolution,
    /// A non-linkage error raised by a bootstrap method.
    External,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LinkError {
    #[error("no such member: {member}")]
    NoSuchMember {
        member: String,
        #[source]
        cause: Option<Box<LinkError>>,
    },
    #[error("incompatible member kind for {member}: {reason}")]
    IncompatibleKind { member: String, reason: String },
    #[error("abstract target: {member}")]
    AbstractTarget { member: String },
    #[error("{referrer} cannot access {member} (selected via {selected})")]
    AccessViolation {
        member: String,
        referrer: String,
        selected: String,
    },
    #[error(
        "loader constraint violated for {type_name} in {member}: {referrer_loader} and {declaring_loader} disagree"
    )]
    LoaderConstraintViolation {
        type_name: String,
        member: String,
        referrer_loader: String,
        declaring_loader: String,
    },
    #[error("bootstrap method failed: {cause}")]
    BootstrapFailure {
        #[source]
        cause: BootstrapError,
    },
    #[error(transparent)]
    Bootstrap(BootstrapError),
    #[error("null receiver for {member}")]
    NullReceiver { member: String },
    #[error("initialization of {type_name} failed: {cause}")]
    InitializationFailed {
        type_name: String,
        #[source]
        cause: InitializerError,
    },
    #[error("could not initialize {type_name}: prior failure: {cause}")]
    PriorInitializationFailure {
        type_name: String,
        #[source]
        cause: InitializerError,
    },
    #[error("type resolution failed: {0}")]
    TypeResolution(#[from] TypeResolutionError),
}

impl LinkError {
    pub fn kind(&self) -> LinkErrorKind {
        match self {
            LinkError::NoSuchMember { .. } => LinkErrorKind::NoSuchMember,
            LinkError::IncompatibleKind { .. } => LinkErrorKind::IncompatibleKind,
            LinkError::AbstractTarget { .. } => LinkErrorKind::AbstractTarget,
            LinkError::AccessViolation { .. } => LinkErrorKind::AccessViolation,
            LinkError::LoaderConstraintViolation { .. } => {
                LinkErrorKind::LoaderConstraintViolation
            }
            LinkError::BootstrapFailure { .. } => LinkErrorKind::BootstrapFailure,
            LinkError::Bootstrap(BootstrapError::Other(_)) => LinkErrorKind::External,
            LinkError::Bootstrap(_) => LinkErrorKind::BootstrapFailure,
            LinkError::NullReceiver { .. } => LinkErrorKind::NullReceiver,
            LinkError::InitializationFailed { .. }
            | LinkError::PriorInitializationFailure { .. } => LinkErrorKind::InitializationFailure,
            LinkError::TypeResolution(_) => LinkErrorKind::TypeResolution,
        }
    }

    /// The initializer exception behind an initialization failure.
    pub fn initializer_cause(&self) -> Option<&InitializerError> {
        match self {
            LinkError::InitializationFailed { cause, .. }
            | LinkError::PriorInitializationFailure { cause, .. } => Some(cause),
            _ => None,
        }
    }
}
