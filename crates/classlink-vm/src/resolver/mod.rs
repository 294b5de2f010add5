//! Symbolic reference resolution and call linkage.
//!
//! [`LinkResolver`] is a facade over several subsystems, each in its own
//! submodule:
//!
//! - **Lookup** (`lookup`): searches class chains, superinterfaces, and
//!   declared fields for a name and descriptor.
//! - **Methods** (`methods`): method and interface-method resolution, with
//!   access checks, loader constraints, and signature-polymorphic lookup.
//! - **Calls** (`calls`): turns a resolved method plus an [`InvokeKind`]
//!   into a [`ResolvedCall`], and links dynamic call sites.
//! - **Fields** (`fields`): field resolution for the four field access kinds.
//! - **Speculative** (`speculative`): `Option`-returning variants for
//!   reflective and compiler-driven lookups, which never initialize types.
//!
//! # Caching
//!
//! Member lookups are memoized in [`GlobalCaches::method_cache`] per
//! (owner, name, descriptor). Access and loader-constraint checks are not:
//! they depend on the referring type and run on every resolution.
//!
//! Call sites hold at most one published result. Threads racing on an
//! unresolved site all run the full algorithm; the first publish wins and
//! the others return the winner's entry.
//!
//! # Example
//!
//! ```ignore
//! let resolver = LinkResolver::new(shared);
//! let reference = MemberRef::new(resolver.symbols(), "shapes/Base", "area", "()D");
//! let site = resolver.call_site(caller.id(), 7);
//! let entry = resolver.resolve_invoke(&site, InvokeKind::Virtual, &reference, Some(&caller), Some(&receiver))?;
//! ```
use crate::{
    access::check_class_accessibility,
    call_info::ResolvedCall,
    call_site::{CallSite, CallSiteEntry},
    config::LinkerConfig,
    error::LinkError,
    metrics::RuntimeMetrics,
    state::{GlobalCaches, SharedLinkState},
};
use classlink_types::{
    LoaderId, Symbol, SymbolTable, TypeHandle, TypeId, TypeRegistry, members::MemberDescriptor,
};
use classlink_utils::sync::Arc;
use tracing::debug;

mod calls;
mod fields;
mod lookup;
mod methods;
mod speculative;

pub use fields::{FieldAccess, FieldAccessKind};

/// An unresolved (owner, name, descriptor) triple as it appears in a
/// referring type's constant table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub owner: Symbol,
    pub name: Symbol,
    pub descriptor: Symbol,
}

impl MemberRef {
    pub fn new(symbols: &SymbolTable, owner: &str, name: &str, descriptor: &str) -> Self {
        Self {
            owner: symbols.intern(owner),
            name: symbols.intern(name),
            descriptor: symbols.intern(descriptor),
        }
    }
}

/// A member reference whose owner class has been resolved.
#[derive(Clone, Debug)]
pub struct LinkInfo {
    pub owner: TypeHandle,
    pub name: Symbol,
    pub descriptor: Symbol,
    pub caller: Option<TypeHandle>,
    /// Access and loader-constraint checks apply.
    pub check_access: bool,
}

impl LinkInfo {
    pub fn new(owner: TypeHandle, name: Symbol, descriptor: Symbol) -> Self {
        Self {
            owner,
            name,
            descriptor,
            caller: None,
            check_access: false,
        }
    }

    pub fn member(&self) -> MemberDescriptor {
        MemberDescriptor::new(self.owner.id(), self.name, self.descriptor)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Static,
    Special,
    Virtual,
    Interface,
    /// A signature-polymorphic method handle call.
    Handle,
}

/// Resolves symbolic references against a shared [`TypeRegistry`].
#[derive(Clone, Debug)]
pub struct LinkResolver {
    shared: Arc<SharedLinkState>,
}

impl LinkResolver {
    pub fn new(shared: Arc<SharedLinkState>) -> Self {
        Self { shared }
    }

    pub fn shared(&self) -> &Arc<SharedLinkState> {
        &self.shared
    }

    pub fn registry(&self) -> &dyn TypeRegistry {
        self.shared.registry.as_ref()
    }

    pub fn symbols(&self) -> &SymbolTable {
        self.shared.registry.symbols()
    }

    pub fn config(&self) -> &LinkerConfig {
        &self.shared.config
    }

    pub fn metrics(&self) -> &RuntimeMetrics {
        &self.shared.metrics
    }

    pub fn caches(&self) -> &GlobalCaches {
        &self.shared.caches
    }

    /// The call site `index` of `caller`, created unresolved on first use.
    pub fn call_site(&self, caller: TypeId, index: u32) -> Arc<CallSite> {
        self.shared.caches.call_sites.site(caller, index)
    }

    /// Resolve the owner class of `reference` through the caller's loader
    /// and check that the caller may see it.
    pub fn link_info(
        &self,
        reference: &MemberRef,
        caller: Option<&TypeHandle>,
    ) -> Result<LinkInfo, LinkError> {
        let loader = caller
            .map(TypeHandle::defining_loader)
            .unwrap_or(LoaderId::BOOTSTRAP);
        let owner = self.registry().resolve_class(reference.owner, loader)?;
        let check_access = self.config().check_access && caller.is_some();
        if check_access {
            if let Some(caller) = caller {
                check_class_accessibility(self.registry(), caller, &owner)?;
            }
        }
        Ok(LinkInfo {
            owner,
            name: reference.name,
            descriptor: reference.descriptor,
            caller: caller.cloned(),
            check_access,
        })
    }

    /// Link `reference` at `site` for an invocation of `kind`, reusing the
    /// published result if the site is already resolved.
    pub fn resolve_invoke(
        &self,
        site: &CallSite,
        kind: InvokeKind,
        reference: &MemberRef,
        caller: Option<&TypeHandle>,
        receiver: Option<&TypeHandle>,
    ) -> Result<Arc<CallSiteEntry>, LinkError> {
        if let Some(existing) = site.get() {
            self.metrics().record_call_site_hit();
            return Ok(existing);
        }
        self.metrics().record_call_site_miss();

        let info = self.link_info(reference, caller)?;
        let call = self.resolve_call(kind, &info, receiver, true)?;
        Ok(self.publish(site, CallSiteEntry::Call(call)))
    }

    pub fn resolve_call(
        &self,
        kind: InvokeKind,
        info: &LinkInfo,
        receiver: Option<&TypeHandle>,
        runtime_checks: bool,
    ) -> Result<ResolvedCall, LinkError> {
        match kind {
            InvokeKind::Static => self.resolve_static_call(info, true),
            InvokeKind::Special => self.resolve_special_call(info),
            InvokeKind::Virtual if self.is_handle_call(info) => self.resolve_handle_call(info),
            InvokeKind::Virtual => self.resolve_virtual_call(info, receiver, runtime_checks),
            InvokeKind::Interface => self.resolve_interface_call(info, receiver, runtime_checks),
            InvokeKind::Handle => self.resolve_handle_call(info),
        }
    }

    /// Run the static initializer of `ty` and its superclasses if needed.
    pub fn initialize_type(&self, ty: &TypeHandle) -> Result<(), LinkError> {
        self.shared
            .initialization
            .initialize(self.registry(), ty, self.metrics())
    }

    pub(crate) fn publish(&self, site: &CallSite, entry: CallSiteEntry) -> Arc<CallSiteEntry> {
        let (winner, won) = site.publish(entry);
        if !won {
            self.metrics().record_publish_race_lost();
            debug!("call site already resolved by another thread; discarding result");
        }
        winner
    }

    pub(crate) fn describe(&self, info: &LinkInfo) -> String {
        self.registry().describe_member(&info.member())
    }
}
