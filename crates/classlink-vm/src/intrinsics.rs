//! Process-wide table of signature-polymorphic intrinsic adapters, keyed by
//! kind and erased signature.
use crate::metrics::RuntimeMetrics;
use classlink_types::{
    Symbol,
    members::{IntrinsicKind, MemberDescriptor, MethodEntry, MethodRef},
};
use classlink_utils::sync::Arc;
use dashmap::DashMap;
use tracing::trace;

#[derive(Debug, Default)]
pub struct IntrinsicTable {
    entries: DashMap<(IntrinsicKind, Symbol), MethodRef>,
}

impl IntrinsicTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared adapter for (`kind`, `basic_signature`), created from
    /// `template` (the declared invoker) on first request.
    pub fn find_or_create(
        &self,
        kind: IntrinsicKind,
        basic_signature: Symbol,
        template: &MethodEntry,
        metrics: &RuntimeMetrics,
    ) -> MethodRef {
        if let Some(existing) = self.entries.get(&(kind, basic_signature)) {
            metrics.record_intrinsic_cache_hit();
            return existing.clone();
        }
        metrics.record_intrinsic_cache_miss();

        self.entries
            .entry((kind, basic_signature))
            .or_insert_with(|| {
                trace!(?kind, ?basic_signature, "creating intrinsic adapter");
                Arc::new(MethodEntry {
                    member: MemberDescriptor::new(
                        template.owner(),
                        template.name(),
                        basic_signature,
                    ),
                    flags: template.flags,
                    vtable_index: None,
                    intrinsic: Some(kind),
                })
            })
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classlink_types::{
        SymbolTable, TypeId,
        flags::AccessFlags,
        symbols::well_known,
    };

    #[test]
    fn test_shared_per_kind_and_signature() {
        let symbols = SymbolTable::new();
        let metrics = RuntimeMetrics::new();
        let table = IntrinsicTable::new();
        let template = MethodEntry {
            member: MemberDescriptor::new(
                TypeId(1),
                well_known::INVOKE_BASIC,
                symbols.intern("([Ljava/lang/Object;)Ljava/lang/Object;"),
            ),
            flags: AccessFlags::FINAL | AccessFlags::NATIVE,
            vtable_index: None,
            intrinsic: Some(IntrinsicKind::InvokeBasic),
        };
        let sig = symbols.intern("(Ljava/lang/Object;I)V");

        let a = table.find_or_create(IntrinsicKind::InvokeBasic, sig, &template, &metrics);
        let b = table.find_or_create(IntrinsicKind::InvokeBasic, sig, &template, &metrics);
        let c = table.find_or_create(IntrinsicKind::LinkToStatic, sig, &template, &metrics);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(a.descriptor(), sig);
        assert_eq!(table.len(), 2);
        assert_eq!(metrics.intrinsic_cache_hits.load(std::sync::atomic::Ordering::Relaxed), 1);
    }
}
