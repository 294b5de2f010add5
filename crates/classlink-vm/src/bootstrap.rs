//! The collaborator that computes dynamic call-site targets and
//! generic method-handle invokers.
use crate::error::{BootstrapError, LinkError};
use classlink_types::{ObjectHandle, Symbol, TypeHandle, members::MethodRef};

/// How to compute a dynamic call site's target on first use.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BootstrapSpecifier {
    pub method_index: u16,
    pub static_arguments: Vec<Symbol>,
}

/// A bootstrap result: the target plus its optional extra argument and
/// adjusted method type.
#[derive(Clone, Debug, PartialEq)]
pub struct DynamicTarget {
    pub method: MethodRef,
    pub appendix: Option<ObjectHandle>,
    pub method_type: Option<Symbol>,
}

pub trait Bootstrap: Send + Sync {
    fn resolve_call_site(
        &self,
        specifier: &BootstrapSpecifier,
        name: Symbol,
        descriptor: Symbol,
        caller: &TypeHandle,
    ) -> Result<DynamicTarget, BootstrapError>;

    /// Adapter for a generic `invoke`/`invokeExact` call with `descriptor`.
    fn link_invoker(
        &self,
        name: Symbol,
        descriptor: Symbol,
        caller: &TypeHandle,
    ) -> Result<DynamicTarget, BootstrapError> {
        let _ = (name, descriptor, caller);
        Err(BootstrapError::Linkage(
            "generic invokers are not supported".to_string(),
        ))
    }
}

/// Linkage failures are wrapped; specialized and foreign errors pass through.
pub fn translate_bootstrap_error(error: BootstrapError) -> LinkError {
    match error {
        BootstrapError::Linkage(_) => LinkError::BootstrapFailure { cause: error },
        other => LinkError::Bootstrap(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LinkErrorKind;

    #[test]
    fn test_translate_bootstrap_error() {
        let wrapped = translate_bootstrap_error(BootstrapError::Linkage("missing".into()));
        assert_eq!(
            wrapped,
            LinkError::BootstrapFailure {
                cause: BootstrapError::Linkage("missing".into())
            }
        );

        let specialized = BootstrapError::BootstrapMethod("bad".into());
        assert_eq!(
            translate_bootstrap_error(specialized.clone()),
            LinkError::Bootstrap(specialized)
        );

        let foreign = translate_bootstrap_error(BootstrapError::Other("oops".into()));
        assert_eq!(foreign.kind(), LinkErrorKind::External);
        assert_eq!(foreign.to_string(), "oops");
    }
}
