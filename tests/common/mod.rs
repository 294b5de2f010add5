#![allow(dead_code)]

use classlink::{
    types::{
        LoaderId, TypeHandle, TypeRegistry,
        table::{ClassBuilder, ClassTable},
    },
    vm::{
        Bootstrap, LinkInfo, LinkResolver, LinkerConfig, MemberRef, ResolvedCall,
        SharedLinkState, call_info::DispatchKind,
    },
};
use std::sync::Arc;

/// A class table plus a resolver over it.
pub struct TestHarness {
    pub table: Arc<ClassTable>,
    pub resolver: LinkResolver,
}

impl TestHarness {
    pub fn new(classes: Vec<ClassBuilder>) -> Self {
        Self::build(|_| classes, None)
    }

    /// `define` receives the fresh table so it can add loaders before
    /// returning the classes to define, in order.
    pub fn build(
        define: impl FnOnce(&ClassTable) -> Vec<ClassBuilder>,
        bootstrap: Option<Arc<dyn Bootstrap>>,
    ) -> Self {
        let table = ClassTable::new().unwrap();
        for builder in define(&table) {
            table.define(builder).unwrap();
        }
        let table = Arc::new(table);
        let mut shared = SharedLinkState::with_config(table.clone(), LinkerConfig::default());
        if let Some(bootstrap) = bootstrap {
            shared = shared.with_bootstrap(bootstrap);
        }
        let resolver = LinkResolver::new(Arc::new(shared));
        Self { table, resolver }
    }

    pub fn ty(&self, name: &str) -> TypeHandle {
        self.ty_in(name, LoaderId::BOOTSTRAP)
    }

    pub fn ty_in(&self, name: &str, loader: LoaderId) -> TypeHandle {
        self.table
            .lookup_name(name, loader)
            .unwrap_or_else(|| panic!("{} is not visible to {}", name, loader))
    }

    pub fn reference(&self, owner: &str, name: &str, descriptor: &str) -> MemberRef {
        MemberRef::new(self.table.symbols(), owner, name, descriptor)
    }

    pub fn info(
        &self,
        owner: &str,
        name: &str,
        descriptor: &str,
        caller: Option<&TypeHandle>,
    ) -> LinkInfo {
        self.resolver
            .link_info(&self.reference(owner, name, descriptor), caller)
            .unwrap()
    }

    pub fn method_name(&self, call: &ResolvedCall) -> String {
        self.table.describe_method(call.selected_method())
    }
}

/// Checks that hold for every successfully linked call.
pub fn assert_coherent(call: &ResolvedCall) {
    assert_eq!(
        call.resolved_method().descriptor(),
        call.selected_method().descriptor()
    );
    if let DispatchKind::Vtable(index) = call.dispatch() {
        assert_eq!(call.resolved_method().vtable_index, Some(*index));
    }
}
