use crate::{
    access::check_member_access,
    call_site::{CallSite, CallSiteEntry},
    error::LinkError,
    resolver::{LinkInfo, LinkResolver, MemberRef},
};
use classlink_types::{
    ByteOffset, FieldIndex, Symbol, TypeHandle, TypeId,
    descriptor::FieldType,
    error::TypeResolutionError,
    flags::AccessFlags,
};
use classlink_utils::sync::Arc;
use tracing::trace;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldAccessKind {
    GetStatic,
    PutStatic,
    GetField,
    PutField,
}

impl FieldAccessKind {
    pub fn is_static(self) -> bool {
        matches!(self, Self::GetStatic | Self::PutStatic)
    }

    pub fn is_put(self) -> bool {
        matches!(self, Self::PutStatic | Self::PutField)
    }
}

/// A linked field: where it lives and how to read it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldAccess {
    /// The type that declares the field.
    pub holder: TypeId,
    pub name: Symbol,
    pub index: FieldIndex,
    pub offset: ByteOffset,
    pub field_type: FieldType,
    pub flags: AccessFlags,
}

impl FieldAccess {
    pub fn is_static(&self) -> bool {
        self.flags.is_static()
    }
}

impl LinkResolver {
    pub fn resolve_field(
        &self,
        reference: &MemberRef,
        caller: Option<&TypeHandle>,
        kind: FieldAccessKind,
        initialize: bool,
    ) -> Result<FieldAccess, LinkError> {
        let info = self.link_info(reference, caller)?;
        self.resolve_field_with(&info, kind, initialize)
    }

    /// Link a field reference at `site`; static accesses initialize the
    /// declaring type before the result is published.
    pub fn resolve_field_site(
        &self,
        site: &CallSite,
        reference: &MemberRef,
        caller: Option<&TypeHandle>,
        kind: FieldAccessKind,
    ) -> Result<Arc<CallSiteEntry>, LinkError> {
        if let Some(existing) = site.get() {
            self.metrics().record_call_site_hit();
            return Ok(existing);
        }
        self.metrics().record_call_site_miss();
        let access = self.resolve_field(reference, caller, kind, true)?;
        Ok(self.publish(site, CallSiteEntry::Field(access)))
    }

    pub fn resolve_field_with(
        &self,
        info: &LinkInfo,
        kind: FieldAccessKind,
        initialize: bool,
    ) -> Result<FieldAccess, LinkError> {
        let Some((declarer, field)) = self.lookup_field(&info.owner, info.name, info.descriptor)?
        else {
            return Err(self.no_such_member(info, None));
        };

        if info.check_access {
            if let Some(caller) = &info.caller {
                check_member_access(
                    self.registry(),
                    caller,
                    &info.owner,
                    &declarer,
                    &field.member,
                    field.flags,
                )?;
                self.shared().dependencies.record(
                    self.registry(),
                    caller.defining_loader(),
                    declarer.defining_loader(),
                );
            }
        }

        if kind.is_static() != field.is_static() {
            return Err(LinkError::IncompatibleKind {
                member: self.registry().describe_member(&field.member),
                reason: if field.is_static() {
                    "expected non-static field".to_string()
                } else {
                    "expected static field".to_string()
                },
            });
        }

        if kind.is_put() && field.is_final() {
            if let Some(caller) = &info.caller {
                if caller.id() != declarer.id() {
                    return Err(LinkError::AccessViolation {
                        member: self.registry().describe_member(&field.member),
                        referrer: caller.display_name().to_string(),
                        selected: info.owner.display_name().to_string(),
                    });
                }
            }
        }

        if kind.is_static() && initialize {
            self.initialize_type(&declarer)?;
        }

        if info.check_access {
            if let Some(caller) = &info.caller {
                self.check_loader_constraints(caller, &declarer, field.member.descriptor, || {
                    self.registry().describe_member(&field.member)
                })?;
            }
        }

        let field_type = FieldType::parse(&self.symbols().display(field.member.descriptor))
            .map_err(TypeResolutionError::from)?;
        trace!(
            field = %self.registry().describe_member(&field.member),
            offset = %field.offset,
            "resolved field"
        );
        Ok(FieldAccess {
            holder: declarer.id(),
            name: field.member.name,
            index: field.index,
            offset: field.offset,
            field_type,
            flags: field.flags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::LinkerConfig, error::LinkErrorKind, state::SharedLinkState};
    use classlink_types::{
        LoaderId, TypeRegistry,
        table::{ClassBuilder, ClassTable},
    };
    use classlink_utils::sync::{AtomicUsize, Ordering};

    fn setup() -> (LinkResolver, Arc<ClassTable>) {
        let table = Arc::new(ClassTable::new().unwrap());
        let shared = SharedLinkState::with_config(table.clone(), LinkerConfig::default());
        (LinkResolver::new(Arc::new(shared)), table)
    }

    #[test]
    fn test_static_mismatch() {
        let (resolver, table) = setup();
        table
            .define(
                ClassBuilder::class("p/Point")
                    .field("x", "I", AccessFlags::PUBLIC)
                    .field("ORIGIN", "Lp/Point;", AccessFlags::PUBLIC | AccessFlags::STATIC),
            )
            .unwrap();
        let symbols = table.symbols();
        let x = MemberRef::new(symbols, "p/Point", "x", "I");
        let origin = MemberRef::new(symbols, "p/Point", "ORIGIN", "Lp/Point;");

        let err = resolver
            .resolve_field(&x, None, FieldAccessKind::GetStatic, false)
            .unwrap_err();
        assert_eq!(err.kind(), LinkErrorKind::IncompatibleKind);
        let err = resolver
            .resolve_field(&origin, None, FieldAccessKind::GetField, false)
            .unwrap_err();
        assert_eq!(err.kind(), LinkErrorKind::IncompatibleKind);

        let access = resolver
            .resolve_field(&origin, None, FieldAccessKind::GetStatic, false)
            .unwrap();
        assert!(access.is_static());
        assert_eq!(access.field_type, FieldType::Object("p/Point".to_string()));
    }

    #[test]
    fn test_final_put_from_other_type() {
        let (resolver, table) = setup();
        let holder = table
            .define(ClassBuilder::class("p/Holder").field(
                "value",
                "J",
                AccessFlags::PUBLIC | AccessFlags::FINAL,
            ))
            .unwrap();
        let other = table.define(ClassBuilder::class("p/Other")).unwrap();
        let holder = table.get(holder).unwrap();
        let other = table.get(other).unwrap();
        let value = MemberRef::new(table.symbols(), "p/Holder", "value", "J");

        let own = resolver
            .resolve_field(&value, Some(&holder), FieldAccessKind::PutField, false)
            .unwrap();
        assert_eq!(own.offset, ByteOffset::ZERO);
        let err = resolver
            .resolve_field(&value, Some(&other), FieldAccessKind::PutField, false)
            .unwrap_err();
        assert_eq!(err.kind(), LinkErrorKind::AccessViolation);
        assert!(
            resolver
                .resolve_field(&value, Some(&other), FieldAccessKind::GetField, false)
                .is_ok()
        );
    }

    #[test]
    fn test_static_field_initializes_declarer() {
        let (resolver, table) = setup();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        table
            .define(
                ClassBuilder::class("p/Config")
                    .field("LEVEL", "I", AccessFlags::PUBLIC | AccessFlags::STATIC)
                    .initializer(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }),
            )
            .unwrap();
        table
            .define(ClassBuilder::class("p/Derived").extends("p/Config"))
            .unwrap();
        let level = MemberRef::new(table.symbols(), "p/Derived", "LEVEL", "I");

        let unchecked = resolver
            .resolve_field(&level, None, FieldAccessKind::GetStatic, false)
            .unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        let config = table.lookup_name("p/Config", LoaderId::BOOTSTRAP).unwrap();
        let derived = table.lookup_name("p/Derived", LoaderId::BOOTSTRAP).unwrap();
        let site = resolver.call_site(derived.id(), 1);
        let entry = resolver
            .resolve_field_site(&site, &level, None, FieldAccessKind::GetStatic)
            .unwrap();
        assert_eq!(entry.as_field(), Some(&unchecked));
        assert_eq!(unchecked.holder, config.id());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(resolver.shared().initialization.is_initialized(config.id()));
        assert!(!resolver.shared().initialization.is_initialized(derived.id()));
    }

    #[test]
    fn test_missing_field() {
        let (resolver, table) = setup();
        table.define(ClassBuilder::class("p/Empty")).unwrap();
        let err = resolver
            .resolve_field(
                &MemberRef::new(table.symbols(), "p/Empty", "nothing", "I"),
                None,
                FieldAccessKind::GetField,
                false,
            )
            .unwrap_err();
        assert_eq!(err.kind(), LinkErrorKind::NoSuchMember);
    }
}
