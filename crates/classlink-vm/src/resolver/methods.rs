use crate::{
    access::{check_member_access, effective_method_flags},
    bootstrap::{DynamicTarget, translate_bootstrap_error},
    error::{BootstrapError, LinkError},
    resolver::{LinkInfo, LinkResolver},
    state::MethodLookupKind,
};
use classlink_types::{
    Symbol, TypeHandle,
    descriptor::{MethodDescriptor, referenced_class_names},
    error::TypeResolutionError,
    members::{IntrinsicKind, MethodRef},
};
use tracing::{debug, trace};

impl LinkResolver {
    /// Resolve a method reference whose owner must be a class.
    pub fn resolve_method(&self, info: &LinkInfo) -> Result<MethodRef, LinkError> {
        if info.owner.is_interface() {
            return Err(LinkError::IncompatibleKind {
                member: self.describe(info),
                reason: format!(
                    "found interface {}, but class was expected",
                    info.owner.display_name()
                ),
            });
        }

        let method = self.lookup_method_cached(info, MethodLookupKind::Method)?;
        if method.is_abstract() && !info.owner.is_abstract() {
            return Err(LinkError::AbstractTarget {
                member: self.registry().describe_method(&method),
            });
        }

        if info.check_access {
            self.check_method_accessibility(info, &method)?;
            self.check_method_loader_constraints(info, &method)?;
        }
        Ok(method)
    }

    /// Resolve a method reference whose owner must be an interface.
    pub fn resolve_interface_method(&self, info: &LinkInfo) -> Result<MethodRef, LinkError> {
        if !info.owner.is_interface() {
            return Err(LinkError::IncompatibleKind {
                member: self.describe(info),
                reason: format!(
                    "found class {}, but interface was expected",
                    info.owner.display_name()
                ),
            });
        }

        let method = self.lookup_method_cached(info, MethodLookupKind::InterfaceMethod)?;
        if info.check_access {
            self.check_method_accessibility(info, &method)?;
            self.check_method_loader_constraints(info, &method)?;
        }
        Ok(method)
    }

    fn lookup_method_cached(
        &self,
        info: &LinkInfo,
        kind: MethodLookupKind,
    ) -> Result<MethodRef, LinkError> {
        let key = (info.owner.id(), info.name, info.descriptor, kind);
        if let Some(cached) = self.caches().method_cache.get(&key) {
            self.metrics().record_member_cache_hit();
            return Ok(cached.clone());
        }
        self.metrics().record_member_cache_miss();

        let found = match kind {
            MethodLookupKind::Method => {
                let mut found =
                    self.lookup_method_in_classes(&info.owner, info.name, info.descriptor)?;
                if found.is_none() && !info.owner.is_array() {
                    found =
                        self.lookup_method_in_interfaces(&info.owner, info.name, info.descriptor)?;
                }
                found
            }
            MethodLookupKind::InterfaceMethod => {
                self.lookup_interface_method(&info.owner, info.name, info.descriptor)?
            }
        };

        match found {
            Some(method) => {
                self.caches().method_cache.insert(key, method.clone());
                Ok(method)
            }
            None if kind == MethodLookupKind::Method => match self.lookup_polymorphic_method(info, false) {
                Ok(Some(target)) => Ok(target.method),
                Ok(None) => Err(self.no_such_member(info, None)),
                Err(cause) => Err(self.no_such_member(info, Some(cause))),
            },
            None => Err(self.no_such_member(info, None)),
        }
    }

    pub(crate) fn no_such_member(&self, info: &LinkInfo, cause: Option<LinkError>) -> LinkError {
        LinkError::NoSuchMember {
            member: self.describe(info),
            cause: cause.map(Box::new),
        }
    }

    /// Whether `info` names a signature-polymorphic method on the method
    /// handle type itself.
    pub(crate) fn is_handle_call(&self, info: &LinkInfo) -> bool {
        self.config().enable_invoke_dynamic
            && IntrinsicKind::from_name(info.name).is_some()
            && self
                .registry()
                .method_handle_type()
                .is_some_and(|mh| mh.id() == info.owner.id())
    }

    /// Signature-polymorphic lookup. Intrinsics come from the shared
    /// intrinsic table; generic invokers are linked through the bootstrap
    /// collaborator, and only when `with_invoker` is set.
    pub fn lookup_polymorphic_method(
        &self,
        info: &LinkInfo,
        with_invoker: bool,
    ) -> Result<Option<DynamicTarget>, LinkError> {
        if !self.config().enable_invoke_dynamic {
            return Ok(None);
        }
        let Some(mh) = self.registry().method_handle_type() else {
            return Ok(None);
        };
        if !info.owner.is_subtype_of(mh.id()) {
            return Ok(None);
        }
        let Some(kind) = IntrinsicKind::from_name(info.name) else {
            return Ok(None);
        };
        let Some(template) = mh.methods().iter().find(|m| m.name() == info.name) else {
            return Ok(None);
        };

        if kind.is_signature_polymorphic_intrinsic() {
            let descriptor = self.symbols().display(info.descriptor);
            let parsed = MethodDescriptor::parse(&descriptor).map_err(TypeResolutionError::from)?;
            let basic = self
                .symbols()
                .intern(&parsed.basic_signature(kind.is_static_linker()));
            trace!(?kind, signature = %descriptor, "linking intrinsic");
            let method = self
                .caches()
                .intrinsics
                .find_or_create(kind, basic, template, self.metrics());
            return Ok(Some(DynamicTarget {
                method,
                appendix: None,
                method_type: None,
            }));
        }

        if !with_invoker {
            return Ok(None);
        }
        let Some(bootstrap) = self.shared().bootstrap.as_ref() else {
            return Err(LinkError::BootstrapFailure {
                cause: BootstrapError::Linkage("no bootstrap collaborator installed".to_string()),
            });
        };
        let caller = info.caller.clone().unwrap_or_else(|| mh.clone());
        self.metrics().record_bootstrap_invocation();
        let target = bootstrap
            .link_invoker(info.name, info.descriptor, &caller)
            .map_err(translate_bootstrap_error)?;
        debug!(
            method = %self.registry().describe_method(&target.method),
            has_appendix = target.appendix.is_some(),
            "linked generic invoker"
        );
        Ok(Some(target))
    }

    /// Access check of `method` as named through `info.owner`. Crossing
    /// loaders records a loader dependency.
    pub(crate) fn check_method_accessibility(
        &self,
        info: &LinkInfo,
        method: &MethodRef,
    ) -> Result<(), LinkError> {
        let Some(caller) = &info.caller else {
            return Ok(());
        };
        let declarer = self.registry().get(method.owner())?;
        let root = self.registry().root_type();
        let flags = effective_method_flags(root.id(), &info.owner, method);
        check_member_access(
            self.registry(),
            caller,
            &info.owner,
            &declarer,
            &method.member,
            flags,
        )?;
        self.shared().dependencies.record(
            self.registry(),
            caller.defining_loader(),
            declarer.defining_loader(),
        );
        Ok(())
    }

    fn check_method_loader_constraints(
        &self,
        info: &LinkInfo,
        method: &MethodRef,
    ) -> Result<(), LinkError> {
        let Some(caller) = &info.caller else {
            return Ok(());
        };
        let declarer = self.registry().get(method.owner())?;
        self.check_loader_constraints(
            caller,
            &declarer,
            method.descriptor(),
            || self.registry().describe_method(method),
        )
    }

    /// Every class named in `descriptor` must be the same type whether seen
    /// from `referrer`'s loader or from `declarer`'s loader.
    pub(crate) fn check_loader_constraints(
        &self,
        referrer: &TypeHandle,
        declarer: &TypeHandle,
        descriptor: Symbol,
        describe: impl Fn() -> String,
    ) -> Result<(), LinkError> {
        let referrer_loader = referrer.defining_loader();
        let declaring_loader = declarer.defining_loader();
        if referrer_loader == declaring_loader {
            return Ok(());
        }

        let text = self.symbols().display(descriptor);
        for class_name in referenced_class_names(&text).map_err(TypeResolutionError::from)? {
            let name = self.symbols().intern(&class_name);
            let seen_by_referrer = self.registry().lookup(name, referrer_loader).map(|t| t.id());
            let seen_by_declarer = self.registry().lookup(name, declaring_loader).map(|t| t.id());
            self.shared()
                .constraints
                .add_constraint(
                    name,
                    referrer_loader,
                    seen_by_referrer,
                    declaring_loader,
                    seen_by_declarer,
                )
                .map_err(|conflict| {
                    debug!(
                        type_name = %class_name,
                        first = %conflict.first,
                        second = %conflict.second,
                        "loader constraint violated"
                    );
                    LinkError::LoaderConstraintViolation {
                        type_name: class_name.clone(),
                        member: describe(),
                        referrer_loader: self.registry().loader_name(referrer_loader),
                        declaring_loader: self.registry().loader_name(declaring_loader),
                    }
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        config::LinkerConfig,
        error::LinkErrorKind,
        resolver::{LinkResolver, MemberRef},
        state::SharedLinkState,
    };
    use classlink_types::{
        LoaderId, TypeRegistry,
        flags::{AccessFlags, ClassFlags},
        members::IntrinsicKind,
        table::{ClassBuilder, ClassTable},
    };
    use classlink_utils::sync::{Arc, Ordering};

    fn resolver(table: Arc<ClassTable>) -> LinkResolver {
        LinkResolver::new(Arc::new(SharedLinkState::with_config(
            table,
            LinkerConfig::default(),
        )))
    }

    #[test]
    fn test_owner_kind_checks() {
        let table = Arc::new(ClassTable::new().unwrap());
        table
            .define(ClassBuilder::interface("p/Api").method("m", "()V", AccessFlags::PUBLIC))
            .unwrap();
        table
            .define(ClassBuilder::class("p/Impl").method("m", "()V", AccessFlags::PUBLIC))
            .unwrap();
        let resolver = resolver(table.clone());
        let symbols = table.symbols();

        let on_iface = resolver
            .link_info(&MemberRef::new(symbols, "p/Api", "m", "()V"), None)
            .unwrap();
        let err = resolver.resolve_method(&on_iface).unwrap_err();
        assert_eq!(err.kind(), LinkErrorKind::IncompatibleKind);
        assert!(resolver.resolve_interface_method(&on_iface).is_ok());

        let on_class = resolver
            .link_info(&MemberRef::new(symbols, "p/Impl", "m", "()V"), None)
            .unwrap();
        let err = resolver.resolve_interface_method(&on_class).unwrap_err();
        assert_eq!(err.kind(), LinkErrorKind::IncompatibleKind);
    }

    #[test]
    fn test_member_cache_hits() {
        let table = Arc::new(ClassTable::new().unwrap());
        table
            .define(ClassBuilder::class("p/A").method("m", "()V", AccessFlags::PUBLIC))
            .unwrap();
        let resolver = resolver(table.clone());
        let reference = MemberRef::new(table.symbols(), "p/A", "m", "()V");
        let info = resolver.link_info(&reference, None).unwrap();

        let first = resolver.resolve_method(&info).unwrap();
        let second = resolver.resolve_method(&info).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        let metrics = resolver.metrics();
        assert_eq!(metrics.member_cache_hits.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.member_cache_misses.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_abstract_method_in_concrete_owner() {
        let table = Arc::new(ClassTable::new().unwrap());
        table
            .define(ClassBuilder::interface("p/Job").method(
                "run",
                "()V",
                AccessFlags::PUBLIC | AccessFlags::ABSTRACT,
            ))
            .unwrap();
        table
            .define(ClassBuilder::class("p/Lazy").implements("p/Job"))
            .unwrap();
        let resolver = resolver(table.clone());
        let info = resolver
            .link_info(&MemberRef::new(table.symbols(), "p/Lazy", "run", "()V"), None)
            .unwrap();
        let err = resolver.resolve_method(&info).unwrap_err();
        assert_eq!(err.kind(), LinkErrorKind::AbstractTarget);
    }

    #[test]
    fn test_missing_method_reports_no_such_member() {
        let table = Arc::new(ClassTable::new().unwrap());
        table.define(ClassBuilder::class("p/A")).unwrap();
        let resolver = resolver(table.clone());
        let info = resolver
            .link_info(&MemberRef::new(table.symbols(), "p/A", "gone", "()V"), None)
            .unwrap();
        let err = resolver.resolve_method(&info).unwrap_err();
        assert_eq!(err.kind(), LinkErrorKind::NoSuchMember);
        assert!(err.to_string().contains("p/A.gone()V"));
    }

    #[test]
    fn test_polymorphic_failure_is_nested_cause() {
        let table = Arc::new(ClassTable::new().unwrap());
        let resolver = resolver(table.clone());
        // A malformed call-site descriptor only fails once polymorphic
        // lookup tries to erase it.
        let info = resolver
            .link_info(
                &MemberRef::new(
                    table.symbols(),
                    "java/lang/invoke/MethodHandle",
                    "invokeBasic",
                    "(Q)V",
                ),
                None,
            )
            .unwrap();
        let err = resolver.resolve_method(&info).unwrap_err();
        match err {
            crate::error::LinkError::NoSuchMember { cause: Some(cause), .. } => {
                assert_eq!(cause.kind(), LinkErrorKind::TypeResolution);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_intrinsics_share_erased_signature() {
        let table = Arc::new(ClassTable::new().unwrap());
        let resolver = resolver(table.clone());
        let symbols = table.symbols();
        let mh = "java/lang/invoke/MethodHandle";

        let a = resolver
            .link_info(&MemberRef::new(symbols, mh, "invokeBasic", "(Ljava/lang/String;I)V"), None)
            .unwrap();
        let b = resolver
            .link_info(&MemberRef::new(symbols, mh, "invokeBasic", "(Lp/Point;I)V"), None)
            .unwrap();
        let c = resolver
            .link_info(&MemberRef::new(symbols, mh, "invokeBasic", "(Lp/Point;J)V"), None)
            .unwrap();
        let ma = resolver.resolve_method(&a).unwrap();
        let mb = resolver.resolve_method(&b).unwrap();
        let mc = resolver.resolve_method(&c).unwrap();
        assert!(Arc::ptr_eq(&ma, &mb));
        assert!(!Arc::ptr_eq(&ma, &mc));
        assert_eq!(ma.intrinsic, Some(IntrinsicKind::InvokeBasic));
        assert_eq!(
            &*symbols.display(ma.descriptor()),
            "(Ljava/lang/Object;I)V"
        );

        let link = resolver
            .link_info(
                &MemberRef::new(symbols, mh, "linkToStatic", "(Ljava/lang/String;Lp/Name;)V"),
                None,
            )
            .unwrap();
        let linker = resolver.resolve_method(&link).unwrap();
        assert_eq!(
            &*symbols.display(linker.descriptor()),
            "(Ljava/lang/Object;Lp/Name;)V"
        );
    }

    #[test]
    fn test_private_method_access() {
        let table = Arc::new(ClassTable::new().unwrap());
        let a = table
            .define(ClassBuilder::class("p/A").method("secret", "()V", AccessFlags::PRIVATE))
            .unwrap();
        let b = table.define(ClassBuilder::class("p/B")).unwrap();
        let resolver = resolver(table.clone());
        let reference = MemberRef::new(table.symbols(), "p/A", "secret", "()V");

        let a = table.get(a).unwrap();
        let b = table.get(b).unwrap();
        let own = resolver.link_info(&reference, Some(&a)).unwrap();
        assert!(resolver.resolve_method(&own).is_ok());
        let other = resolver.link_info(&reference, Some(&b)).unwrap();
        let err = resolver.resolve_method(&other).unwrap_err();
        assert_eq!(err.kind(), LinkErrorKind::AccessViolation);
    }

    #[test]
    fn test_inaccessible_class_rejected() {
        let table = Arc::new(ClassTable::new().unwrap());
        table
            .define(ClassBuilder::class("a/Hidden").flags(ClassFlags::SUPER))
            .unwrap();
        let caller = table.define(ClassBuilder::class("b/Caller")).unwrap();
        let resolver = resolver(table.clone());
        let caller = table.get(caller).unwrap();
        let err = resolver
            .link_info(
                &MemberRef::new(table.symbols(), "a/Hidden", "m", "()V"),
                Some(&caller),
            )
            .unwrap_err();
        assert_eq!(err.kind(), LinkErrorKind::AccessViolation);
    }

    #[test]
    fn test_cross_loader_dependency_recorded() {
        let table = Arc::new(ClassTable::new().unwrap());
        let app = table.define_loader("app", LoaderId::BOOTSTRAP).unwrap();
        let plugin = table.define_loader("plugin", LoaderId::BOOTSTRAP).unwrap();
        table
            .define(
                ClassBuilder::class("lib/Util")
                    .loader(app)
                    .method("help", "()V", AccessFlags::PUBLIC | AccessFlags::STATIC),
            )
            .unwrap();
        let caller = table
            .define(ClassBuilder::class("ext/Caller").loader(plugin))
            .unwrap();
        let resolver = resolver(table.clone());
        let caller = table.get(caller).unwrap();
        let util = table.lookup_name("lib/Util", app).unwrap();

        let info = crate::resolver::LinkInfo {
            caller: Some(caller.clone()),
            check_access: true,
            ..crate::resolver::LinkInfo::new(
                util,
                table.symbols().intern("help"),
                table.symbols().intern("()V"),
            )
        };
        resolver.resolve_method(&info).unwrap();
        assert!(resolver.shared().dependencies.depends_on(plugin, app));
    }
}
