//! Interned names and descriptors.
//!
//! Every member name, descriptor, and class name the resolver compares goes
//! through a [`SymbolTable`], so equality checks are integer comparisons.
use classlink_utils::sync::{Arc, RwLock};
use dashmap::{DashMap, mapref::entry::Entry};
use std::fmt::{Debug, Formatter};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Debug for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "sym#{}", self.0)
    }
}

impl Symbol {
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Symbols interned by every table at construction, in this exact order.
pub mod well_known {
    use super::Symbol;

    pub const OBJECT_INITIALIZER: Symbol = Symbol(0);
    pub const CLASS_INITIALIZER: Symbol = Symbol(1);
    pub const CLONE: Symbol = Symbol(2);
    pub const INVOKE: Symbol = Symbol(3);
    pub const INVOKE_EXACT: Symbol = Symbol(4);
    pub const INVOKE_BASIC: Symbol = Symbol(5);
    pub const LINK_TO_VIRTUAL: Symbol = Symbol(6);
    pub const LINK_TO_STATIC: Symbol = Symbol(7);
    pub const LINK_TO_SPECIAL: Symbol = Symbol(8);
    pub const LINK_TO_INTERFACE: Symbol = Symbol(9);

    pub(super) const NAMES: [&str; 10] = [
        "<init>",
        "<clinit>",
        "clone",
        "invoke",
        "invokeExact",
        "invokeBasic",
        "linkToVirtual",
        "linkToStatic",
        "linkToSpecial",
        "linkToInterface",
    ];
}

pub struct SymbolTable {
    ids: DashMap<Arc<str>, Symbol>,
    names: RwLock<Vec<Arc<str>>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        let table = Self {
            ids: DashMap::new(),
            names: RwLock::new(Vec::new()),
        };
        for name in well_known::NAMES {
            table.intern(name);
        }
        table
    }

    /// Return the symbol for `text`, creating it if this is the first request.
    pub fn intern(&self, text: &str) -> Symbol {
        if let Some(existing) = self.ids.get(text) {
            return *existing;
        }

        match self.ids.entry(Arc::from(text)) {
            Entry::Occupied(o) => *o.get(),
            Entry::Vacant(v) => {
                // The names lock is always taken innermost.
                let mut names = self.names.write();
                let symbol = Symbol(names.len() as u32);
                names.push(v.key().clone());
                v.insert(symbol);
                symbol
            }
        }
    }

    /// Look up `text` without interning it.
    pub fn lookup(&self, text: &str) -> Option<Symbol> {
        self.ids.get(text).map(|s| *s)
    }

    pub fn resolve(&self, symbol: Symbol) -> Option<Arc<str>> {
        self.names.read().get(symbol.0 as usize).cloned()
    }

    /// Text of `symbol` for diagnostics.
    pub fn display(&self, symbol: Symbol) -> Arc<str> {
        self.resolve(symbol)
            .unwrap_or_else(|| Arc::from(format!("{:?}", symbol)))
    }

    pub fn len(&self) -> usize {
        self.names.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for SymbolTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolTable")
            .field("len", &self.len())
            .finish()
    }
}
