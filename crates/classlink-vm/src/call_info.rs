use classlink_types::{
    ObjectHandle, Symbol, TypeId, VtableIndex,
    members::MethodRef,
};

/// How the executing layer reaches the selected method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchKind {
    Static,
    /// Bound to the selected method; no indirection.
    Direct,
    Vtable(VtableIndex),
    /// Selected per receiver through the receiver's itable.
    Itable,
    Handle {
        appendix: Option<ObjectHandle>,
        method_type: Option<Symbol>,
    },
}

/// A linked invocation. Immutable once built.
#[derive(Clone, Debug)]
pub struct ResolvedCall {
    resolved_owner: TypeId,
    selected_owner: TypeId,
    resolved_method: MethodRef,
    selected_method: MethodRef,
    dispatch: DispatchKind,
}

/// A selected method whose descriptor differs from the resolved one. Only a
/// registry with inconsistent vtables or itables produces this.
#[derive(Clone, Debug)]
pub struct DescriptorMismatch {
    pub resolved: MethodRef,
    pub selected: MethodRef,
}

impl ResolvedCall {
    fn new(
        resolved_owner: TypeId,
        resolved_method: MethodRef,
        selected_method: MethodRef,
        dispatch: DispatchKind,
    ) -> Result<Self, DescriptorMismatch> {
        if resolved_method.descriptor() != selected_method.descriptor() {
            return Err(DescriptorMismatch {
                resolved: resolved_method,
                selected: selected_method,
            });
        }
        debug_assert!(
            !matches!(dispatch, DispatchKind::Vtable(_)) || resolved_method.has_vtable_index(),
            "vtable dispatch requires a vtable-indexed resolved method"
        );
        Ok(Self::unchecked(resolved_owner, resolved_method, selected_method, dispatch))
    }

    fn unchecked(
        resolved_owner: TypeId,
        resolved_method: MethodRef,
        selected_method: MethodRef,
        dispatch: DispatchKind,
    ) -> Self {
        Self {
            resolved_owner,
            selected_owner: selected_method.owner(),
            resolved_method,
            selected_method,
            dispatch,
        }
    }

    pub fn static_call(resolved_owner: TypeId, method: MethodRef) -> Self {
        Self::unchecked(resolved_owner, method.clone(), method, DispatchKind::Static)
    }

    pub fn direct(
        resolved_owner: TypeId,
        resolved: MethodRef,
        selected: MethodRef,
    ) -> Result<Self, DescriptorMismatch> {
        Self::new(resolved_owner, resolved, selected, DispatchKind::Direct)
    }

    pub fn virtual_call(
        resolved_owner: TypeId,
        resolved: MethodRef,
        selected: MethodRef,
        index: VtableIndex,
    ) -> Result<Self, DescriptorMismatch> {
        Self::new(resolved_owner, resolved, selected, DispatchKind::Vtable(index))
    }

    pub fn interface_call(
        resolved_owner: TypeId,
        resolved: MethodRef,
        selected: MethodRef,
    ) -> Result<Self, DescriptorMismatch> {
        Self::new(resolved_owner, resolved, selected, DispatchKind::Itable)
    }

    pub fn handle(
        resolved_owner: TypeId,
        method: MethodRef,
        appendix: Option<ObjectHandle>,
        method_type: Option<Symbol>,
    ) -> Self {
        Self::unchecked(
            resolved_owner,
            method.clone(),
            method,
            DispatchKind::Handle {
                appendix,
                method_type,
            },
        )
    }

    pub fn resolved_owner(&self) -> TypeId {
        self.resolved_owner
    }

    pub fn selected_owner(&self) -> TypeId {
        self.selected_owner
    }

    pub fn resolved_method(&self) -> &MethodRef {
        &self.resolved_method
    }

    pub fn selected_method(&self) -> &MethodRef {
        &self.selected_method
    }

    pub fn dispatch(&self) -> &DispatchKind {
        &self.dispatch
    }

    pub fn vtable_index(&self) -> Option<VtableIndex> {
        match self.dispatch {
            DispatchKind::Vtable(index) => Some(index),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classlink_types::{
        LoaderId, TypeRegistry,
        flags::AccessFlags,
        table::{ClassBuilder, ClassTable},
    };

    #[test]
    fn test_selected_descriptor_must_match() {
        let table = ClassTable::new().unwrap();
        let id = table
            .define(
                ClassBuilder::class("p/Gauge")
                    .method("read", "()I", AccessFlags::PUBLIC)
                    .method("read", "()J", AccessFlags::PUBLIC),
            )
            .unwrap();
        let gauge = table.lookup_name("p/Gauge", LoaderId::BOOTSTRAP).unwrap();
        let symbols = table.symbols();
        let read = symbols.intern("read");
        let int = gauge.declared_method(read, symbols.intern("()I")).unwrap().clone();
        let long = gauge.declared_method(read, symbols.intern("()J")).unwrap().clone();

        let call = ResolvedCall::direct(id, int.clone(), int.clone()).unwrap();
        assert_eq!(call.selected_owner(), id);

        let index = int.vtable_index.unwrap();
        let err = ResolvedCall::virtual_call(id, int.clone(), long.clone(), index).unwrap_err();
        assert_eq!(err.resolved.descriptor(), int.descriptor());
        assert_eq!(err.selected.descriptor(), long.descriptor());
        assert!(ResolvedCall::interface_call(id, long.clone(), int.clone()).is_err());
        assert!(ResolvedCall::direct(id, long, int).is_err());
    }
}
