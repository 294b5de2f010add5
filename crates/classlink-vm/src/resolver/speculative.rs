//! Lookups that report failure as `None`, for reflective and compiler-driven
//! callers that check whether a reference would link. None of these run type
//! initializers or require a receiver.
use crate::{
    call_info::ResolvedCall,
    error::LinkError,
    resolver::{LinkInfo, LinkResolver},
};
use classlink_types::{TypeHandle, VtableIndex, members::MethodRef};
use tracing::trace;

fn speculative<T>(what: &str, result: Result<T, LinkError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            trace!(lookup = what, error = %e, "speculative resolution failed");
            None
        }
    }
}

impl LinkResolver {
    pub fn resolve_static_call_or_null(&self, info: &LinkInfo) -> Option<ResolvedCall> {
        speculative("static call", self.resolve_static_call(info, false))
    }

    pub fn resolve_special_call_or_null(&self, info: &LinkInfo) -> Option<ResolvedCall> {
        speculative("special call", self.resolve_special_call(info))
    }

    pub fn resolve_virtual_call_or_null(
        &self,
        info: &LinkInfo,
        receiver: Option<&TypeHandle>,
    ) -> Option<ResolvedCall> {
        speculative(
            "virtual call",
            self.resolve_virtual_call(info, receiver, false),
        )
    }

    pub fn resolve_interface_call_or_null(
        &self,
        info: &LinkInfo,
        receiver: Option<&TypeHandle>,
    ) -> Option<ResolvedCall> {
        speculative(
            "interface call",
            self.resolve_interface_call(info, receiver, false),
        )
    }

    pub fn linktime_resolve_virtual_method_or_null(&self, info: &LinkInfo) -> Option<MethodRef> {
        speculative("virtual method", self.linktime_resolve_virtual_method(info))
    }

    pub fn linktime_resolve_interface_method_or_null(&self, info: &LinkInfo) -> Option<MethodRef> {
        speculative(
            "interface method",
            self.linktime_resolve_interface_method(info),
        )
    }

    /// Vtable slot a virtual call through `info` dispatches on, if any.
    pub fn resolve_virtual_vtable_index(
        &self,
        info: &LinkInfo,
        receiver: &TypeHandle,
    ) -> Option<VtableIndex> {
        self.resolve_virtual_call_or_null(info, Some(receiver))?
            .vtable_index()
    }
}
