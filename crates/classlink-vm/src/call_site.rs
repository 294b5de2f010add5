//! Per-call-site result slots.
//!
//! A slot moves from unresolved to resolved at most once. Resolvers may race
//! to compute a result; only the first publish lands and everyone else reads
//! the winner.
use crate::{bootstrap::DynamicTarget, call_info::ResolvedCall, resolver::FieldAccess};
use classlink_types::TypeId;
use classlink_utils::sync::{Arc, OnceLock};
use dashmap::DashMap;

#[derive(Clone, Debug)]
pub enum CallSiteEntry {
    Call(ResolvedCall),
    Dynamic(DynamicTarget),
    Field(FieldAccess),
}

impl CallSiteEntry {
    pub fn as_call(&self) -> Option<&ResolvedCall> {
        match self {
            CallSiteEntry::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_dynamic(&self) -> Option<&DynamicTarget> {
        match self {
            CallSiteEntry::Dynamic(target) => Some(target),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&FieldAccess> {
        match self {
            CallSiteEntry::Field(field) => Some(field),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct CallSite {
    slot: OnceLock<Arc<CallSiteEntry>>,
}

impl CallSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<CallSiteEntry>> {
        self.slot.get().cloned()
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Publish `entry` unless another result is already present. Returns the
    /// entry now in the slot and whether it is the one passed in.
    pub fn publish(&self, entry: CallSiteEntry) -> (Arc<CallSiteEntry>, bool) {
        let mut won = false;
        let winner = self
            .slot
            .get_or_init(|| {
                won = true;
                Arc::new(entry)
            })
            .clone();
        (winner, won)
    }
}

/// Identity of a call site: the referring type and its constant-table index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CallSiteKey {
    pub caller: TypeId,
    pub index: u32,
}

#[derive(Debug, Default)]
pub struct CallSiteTable {
    sites: DashMap<CallSiteKey, Arc<CallSite>>,
}

impl CallSiteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn site(&self, caller: TypeId, index: u32) -> Arc<CallSite> {
        self.sites
            .entry(CallSiteKey { caller, index })
            .or_default()
            .clone()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::DynamicTarget;
    use classlink_types::{
        SymbolTable,
        flags::AccessFlags,
        members::{MemberDescriptor, MethodEntry},
    };

    fn target(symbols: &SymbolTable, name: &str) -> CallSiteEntry {
        CallSiteEntry::Dynamic(DynamicTarget {
            method: Arc::new(MethodEntry {
                member: MemberDescriptor::new(TypeId(0), symbols.intern(name), symbols.intern("()V")),
                flags: AccessFlags::PUBLIC | AccessFlags::STATIC,
                vtable_index: None,
                intrinsic: None,
            }),
            appendix: None,
            method_type: None,
        })
    }

    #[test]
    fn test_first_publish_wins() {
        let symbols = SymbolTable::new();
        let site = CallSite::new();
        assert!(!site.is_resolved());

        let (first, won) = site.publish(target(&symbols, "a"));
        assert!(won);
        let (second, won) = site.publish(target(&symbols, "b"));
        assert!(!won);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            second.as_dynamic().map(|t| t.method.name()),
            Some(symbols.intern("a"))
        );
    }

    #[test]
    fn test_concurrent_publish_single_winner() {
        let symbols = SymbolTable::new();
        let site = CallSite::new();
        let results: Vec<(Arc<CallSiteEntry>, bool)> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let entry = target(&symbols, &format!("m{}", i));
                    let site = &site;
                    s.spawn(move || site.publish(entry))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("publisher panicked"))
                .collect()
        });

        assert_eq!(results.iter().filter(|(_, won)| *won).count(), 1);
        let winner = &results[0].0;
        assert!(results.iter().all(|(e, _)| Arc::ptr_eq(e, winner)));
    }

    #[test]
    fn test_table_returns_same_site() {
        let table = CallSiteTable::new();
        let a = table.site(TypeId(3), 7);
        let b = table.site(TypeId(3), 7);
        let c = table.site(TypeId(3), 8);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(table.len(), 2);
    }
}
