use crate::{
    bootstrap::{BootstrapSpecifier, translate_bootstrap_error},
    call_info::{DescriptorMismatch, ResolvedCall},
    call_site::{CallSite, CallSiteEntry},
    error::{BootstrapError, LinkError},
    resolver::{LinkInfo, LinkResolver},
};
use classlink_types::{
    Symbol, TypeHandle,
    flags::ClassFlags,
    members::{IntrinsicKind, MethodRef},
};
use classlink_utils::sync::Arc;
use tracing::{debug, info, trace};

impl LinkResolver {
    /// Static linkage. With `initialize`, the owner is initialized and the
    /// method looked up again if initialization actually ran.
    pub fn resolve_static_call(
        &self,
        info: &LinkInfo,
        initialize: bool,
    ) -> Result<ResolvedCall, LinkError> {
        let mut method = self.linktime_resolve_static_method(info)?;
        if initialize && !self.shared().initialization.is_initialized(info.owner.id()) {
            self.initialize_type(&info.owner)?;
            method = self.linktime_resolve_static_method(info)?;
        }
        Ok(ResolvedCall::static_call(info.owner.id(), method))
    }

    pub fn linktime_resolve_static_method(&self, info: &LinkInfo) -> Result<MethodRef, LinkError> {
        let method = self.resolve_method(info)?;
        let declarer = self.registry().get(method.owner())?;
        if declarer.is_interface() {
            return Err(LinkError::IncompatibleKind {
                member: self.registry().describe_method(&method),
                reason: "static linkage of an interface-declared method".to_string(),
            });
        }
        if !method.is_static() {
            return Err(LinkError::IncompatibleKind {
                member: self.registry().describe_method(&method),
                reason: "expected static method".to_string(),
            });
        }
        Ok(method)
    }

    pub fn resolve_special_call(&self, info: &LinkInfo) -> Result<ResolvedCall, LinkError> {
        let resolved = self.linktime_resolve_special_method(info)?;
        self.runtime_resolve_special_method(info, resolved)
    }

    pub fn linktime_resolve_special_method(&self, info: &LinkInfo) -> Result<MethodRef, LinkError> {
        let resolved = if info.owner.is_interface() {
            self.resolve_interface_method(info)?
        } else {
            self.resolve_method(info)?
        };

        // Constructors are never inherited.
        if resolved.is_object_initializer() && resolved.owner() != info.owner.id() {
            return Err(self.no_such_member(info, None));
        }
        if resolved.is_static() {
            return Err(LinkError::IncompatibleKind {
                member: self.registry().describe_method(&resolved),
                reason: "expected non-static method".to_string(),
            });
        }
        Ok(resolved)
    }

    fn runtime_resolve_special_method(
        &self,
        info: &LinkInfo,
        resolved: MethodRef,
    ) -> Result<ResolvedCall, LinkError> {
        let mut selected = resolved.clone();

        if let Some(caller) = &info.caller {
            let searches_super = caller.flags().contains(ClassFlags::SUPER)
                || !self.config().allow_non_virtual_calls;
            if info.check_access
                && searches_super
                && !resolved.is_object_initializer()
                && !info.owner.is_interface()
                && caller.is_strict_subclass_of(resolved.owner())
            {
                let Some(super_id) = caller.super_type() else {
                    return Err(self.abstract_target(&resolved));
                };
                let super_type = self.registry().get(super_id)?;
                selected = self
                    .lookup_instance_method_in_classes(&super_type, info.name, info.descriptor)?
                    .ok_or_else(|| self.abstract_target(&resolved))?;
                if selected.owner() != resolved.owner() {
                    trace!(
                        resolved = %self.registry().describe_method(&resolved),
                        selected = %self.registry().describe_method(&selected),
                        "special call re-selected through superclass"
                    );
                    let declarer = self.registry().get(selected.owner())?;
                    self.check_loader_constraints(caller, &declarer, selected.descriptor(), || {
                        self.registry().describe_method(&selected)
                    })?;
                }
            }
        }

        if selected.is_static() {
            return Err(LinkError::IncompatibleKind {
                member: self.registry().describe_method(&selected),
                reason: "expected non-static method".to_string(),
            });
        }
        if selected.is_abstract() {
            return Err(self.abstract_target(&selected));
        }
        ResolvedCall::direct(info.owner.id(), resolved, selected)
            .map_err(|e| self.descriptor_mismatch(e))
    }

    pub fn resolve_virtual_call(
        &self,
        info: &LinkInfo,
        receiver: Option<&TypeHandle>,
        runtime_checks: bool,
    ) -> Result<ResolvedCall, LinkError> {
        let resolved = self.linktime_resolve_virtual_method(info)?;
        self.runtime_resolve_virtual_method(info, resolved, receiver, runtime_checks)
    }

    pub fn linktime_resolve_virtual_method(&self, info: &LinkInfo) -> Result<MethodRef, LinkError> {
        let resolved = self.resolve_method(info)?;
        if resolved.is_static() {
            return Err(LinkError::IncompatibleKind {
                member: self.registry().describe_method(&resolved),
                reason: "expected non-static method".to_string(),
            });
        }
        Ok(resolved)
    }

    fn runtime_resolve_virtual_method(
        &self,
        info: &LinkInfo,
        resolved: MethodRef,
        receiver: Option<&TypeHandle>,
        runtime_checks: bool,
    ) -> Result<ResolvedCall, LinkError> {
        let receiver = match receiver {
            Some(r) => r.clone(),
            None if runtime_checks => {
                return Err(LinkError::NullReceiver {
                    member: self.registry().describe_method(&resolved),
                });
            }
            None => info.owner.clone(),
        };
        if !receiver.is_subtype_of(info.owner.id()) {
            return Err(LinkError::IncompatibleKind {
                member: self.registry().describe_method(&resolved),
                reason: format!(
                    "receiver {} is not a subtype of {}",
                    receiver.display_name(),
                    info.owner.display_name()
                ),
            });
        }

        // An interface-declared method reached through a class reference is a
        // miranda or default: its slot comes from the resolved class's vtable.
        let declarer = self.registry().get(resolved.owner())?;
        let (resolved, index) = if declarer.is_interface() {
            let slot = info
                .owner
                .vtable_index_of(info.name, info.descriptor)
                .ok_or_else(|| self.abstract_target(&resolved))?;
            let entry = info
                .owner
                .vtable_entry(slot)
                .cloned()
                .ok_or_else(|| self.abstract_target(&resolved))?;
            (entry, Some(slot))
        } else {
            let index = resolved.vtable_index;
            (resolved, index)
        };

        let selected = match index {
            Some(slot) => receiver
                .vtable_entry(slot)
                .cloned()
                .ok_or_else(|| self.abstract_target(&resolved))?,
            None => resolved.clone(),
        };
        if runtime_checks && selected.is_abstract() {
            return Err(self.abstract_target(&selected));
        }

        match index {
            Some(slot) => ResolvedCall::virtual_call(info.owner.id(), resolved, selected, slot),
            None => ResolvedCall::direct(info.owner.id(), resolved, selected),
        }
        .map_err(|e| self.descriptor_mismatch(e))
    }

    pub fn resolve_interface_call(
        &self,
        info: &LinkInfo,
        receiver: Option<&TypeHandle>,
        runtime_checks: bool,
    ) -> Result<ResolvedCall, LinkError> {
        let resolved = self.linktime_resolve_interface_method(info)?;
        self.runtime_resolve_interface_method(info, resolved, receiver, runtime_checks)
    }

    pub fn linktime_resolve_interface_method(
        &self,
        info: &LinkInfo,
    ) -> Result<MethodRef, LinkError> {
        let resolved = self.resolve_interface_method(info)?;
        if resolved.is_static() {
            return Err(LinkError::IncompatibleKind {
                member: self.registry().describe_method(&resolved),
                reason: "expected non-static method".to_string(),
            });
        }
        Ok(resolved)
    }

    fn runtime_resolve_interface_method(
        &self,
        info: &LinkInfo,
        resolved: MethodRef,
        receiver: Option<&TypeHandle>,
        runtime_checks: bool,
    ) -> Result<ResolvedCall, LinkError> {
        let receiver = match receiver {
            Some(r) => r.clone(),
            None if runtime_checks => {
                return Err(LinkError::NullReceiver {
                    member: self.registry().describe_method(&resolved),
                });
            }
            None => {
                return ResolvedCall::interface_call(info.owner.id(), resolved.clone(), resolved)
                    .map_err(|e| self.descriptor_mismatch(e));
            }
        };
        if !receiver.is_subtype_of(info.owner.id()) {
            return Err(LinkError::IncompatibleKind {
                member: self.registry().describe_method(&resolved),
                reason: format!(
                    "receiver {} does not implement {}",
                    receiver.display_name(),
                    info.owner.display_name()
                ),
            });
        }

        let root = self.registry().root_type();
        if resolved.owner() == root.id() {
            if let Some(slot) = resolved.vtable_index {
                let selected = receiver
                    .vtable_entry(slot)
                    .cloned()
                    .ok_or_else(|| self.abstract_target(&resolved))?;
                return ResolvedCall::virtual_call(info.owner.id(), resolved, selected, slot)
                    .map_err(|e| self.descriptor_mismatch(e));
            }
        }

        let selected = match self.lookup_instance_method_in_classes(
            &receiver,
            info.name,
            info.descriptor,
        )? {
            Some(found) => found,
            None => self
                .select_from_itable(&receiver, &resolved)
                .ok_or_else(|| self.abstract_target(&resolved))?,
        };

        if !selected.is_public() {
            return Err(LinkError::AccessViolation {
                member: self.registry().describe_method(&selected),
                referrer: info
                    .caller
                    .as_ref()
                    .map(|c| c.display_name().to_string())
                    .unwrap_or_else(|| receiver.display_name().to_string()),
                selected: receiver.display_name().to_string(),
            });
        }
        if runtime_checks && selected.is_abstract() {
            return Err(self.abstract_target(&selected));
        }
        ResolvedCall::interface_call(info.owner.id(), resolved, selected)
            .map_err(|e| self.descriptor_mismatch(e))
    }

    /// The receiver's implementation of `resolved` when no class declares one:
    /// the itable slot for the declaring interface, else the vtable, where
    /// defaults are installed.
    fn select_from_itable(&self, receiver: &TypeHandle, resolved: &MethodRef) -> Option<MethodRef> {
        let name = resolved.name();
        let descriptor = resolved.descriptor();
        receiver
            .itable_entry(resolved.owner())
            .and_then(|entry| entry.find(name, descriptor))
            .and_then(|slot| slot.selected.clone())
            .or_else(|| {
                receiver
                    .vtable_index_of(name, descriptor)
                    .and_then(|slot| receiver.vtable_entry(slot).cloned())
            })
    }

    /// Link a signature-polymorphic call on a method handle.
    pub fn resolve_handle_call(&self, info: &LinkInfo) -> Result<ResolvedCall, LinkError> {
        let Some(mh) = self.registry().method_handle_type() else {
            return Err(self.no_such_member(info, None));
        };
        if !self.config().enable_invoke_dynamic || !info.owner.is_subtype_of(mh.id()) {
            return Err(LinkError::IncompatibleKind {
                member: self.describe(info),
                reason: "not a signature-polymorphic method handle call".to_string(),
            });
        }

        let target = self
            .lookup_polymorphic_method(info, true)?
            .ok_or_else(|| self.no_such_member(info, None))?;
        if info.check_access && target.method.intrinsic == Some(IntrinsicKind::InvokeBasic) {
            self.check_method_accessibility(info, &target.method)?;
        }
        if self.config().trace_method_handles {
            info!(
                call = %self.describe(info),
                adapter = %self.registry().describe_method(&target.method),
                appendix = ?target.appendix,
                "linked method handle call"
            );
        }
        Ok(ResolvedCall::handle(
            info.owner.id(),
            target.method,
            target.appendix,
            target.method_type,
        ))
    }

    /// Link a dynamically computed call site through the bootstrap
    /// collaborator. The collaborator runs at most once per site that
    /// publishes successfully; threads racing on an unresolved site may each
    /// run it, and all of them return the first published target.
    pub fn resolve_dynamic_call(
        &self,
        site: &CallSite,
        specifier: &BootstrapSpecifier,
        name: Symbol,
        descriptor: Symbol,
        caller: &TypeHandle,
    ) -> Result<Arc<CallSiteEntry>, LinkError> {
        if let Some(existing) = site.get() {
            self.metrics().record_call_site_hit();
            return Ok(existing);
        }
        self.metrics().record_call_site_miss();

        if !self.config().enable_invoke_dynamic {
            return Err(LinkError::IncompatibleKind {
                member: format!(
                    "{}{}",
                    self.symbols().display(name),
                    self.symbols().display(descriptor)
                ),
                reason: "dynamic call sites are disabled".to_string(),
            });
        }
        let Some(bootstrap) = self.shared().bootstrap.as_ref() else {
            return Err(LinkError::BootstrapFailure {
                cause: BootstrapError::Linkage("no bootstrap collaborator installed".to_string()),
            });
        };

        debug!(
            caller = caller.display_name(),
            bootstrap_method = specifier.method_index,
            name = %self.symbols().display(name),
            "invoking bootstrap method"
        );
        self.metrics().record_bootstrap_invocation();
        let target = bootstrap
            .resolve_call_site(specifier, name, descriptor, caller)
            .map_err(translate_bootstrap_error)?;
        if self.config().trace_method_handles {
            info!(
                target = %self.registry().describe_method(&target.method),
                appendix = ?target.appendix,
                "linked dynamic call site"
            );
        }
        Ok(self.publish(site, CallSiteEntry::Dynamic(target)))
    }

    pub(crate) fn abstract_target(&self, method: &MethodRef) -> LinkError {
        LinkError::AbstractTarget {
            member: self.registry().describe_method(method),
        }
    }

    pub(crate) fn descriptor_mismatch(&self, mismatch: DescriptorMismatch) -> LinkError {
        LinkError::IncompatibleKind {
            member: self.registry().describe_method(&mismatch.selected),
            reason: format!(
                "selected method does not match resolved {}",
                self.registry().describe_method(&mismatch.resolved)
            ),
        }
    }
}
