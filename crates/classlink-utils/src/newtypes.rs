use std::fmt::{self, Display, Formatter};

/// Stable arena index of a finalized type in a type registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl Display for TypeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for TypeId {
    fn from(id: u32) -> Self {
        TypeId(id)
    }
}

impl From<TypeId> for usize {
    fn from(id: TypeId) -> Self {
        id.0 as usize
    }
}

impl TypeId {
    pub fn new(id: u32) -> Self {
        TypeId(id)
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Identity of a defining or initiating class loader.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoaderId(pub u32);

impl Display for LoaderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_bootstrap() {
            write!(f, "<bootstrap>")
        } else {
            write!(f, "loader#{}", self.0)
        }
    }
}

impl From<u32> for LoaderId {
    fn from(id: u32) -> Self {
        LoaderId(id)
    }
}

impl LoaderId {
    pub const BOOTSTRAP: Self = LoaderId(0);

    pub fn new(id: u32) -> Self {
        LoaderId(id)
    }

    pub fn is_bootstrap(self) -> bool {
        self == Self::BOOTSTRAP
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VtableIndex(pub usize);

impl Display for VtableIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for VtableIndex {
    fn from(index: usize) -> Self {
        VtableIndex(index)
    }
}

impl From<VtableIndex> for usize {
    fn from(index: VtableIndex) -> Self {
        index.0
    }
}

impl VtableIndex {
    pub fn new(index: usize) -> Self {
        VtableIndex(index)
    }

    pub fn as_usize(self) -> usize {
        self.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ByteOffset(pub usize);

impl Display for ByteOffset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for ByteOffset {
    fn from(offset: usize) -> Self {
        ByteOffset(offset)
    }
}

impl From<ByteOffset> for usize {
    fn from(offset: ByteOffset) -> Self {
        offset.0
    }
}

impl ByteOffset {
    pub const ZERO: Self = ByteOffset(0);

    pub fn new(offset: usize) -> Self {
        ByteOffset(offset)
    }

    pub fn checked_add(self, other: impl Into<usize>) -> Option<Self> {
        self.0.checked_add(other.into()).map(ByteOffset)
    }

    pub fn as_usize(self) -> usize {
        self.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldIndex(pub usize);

impl Display for FieldIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for FieldIndex {
    fn from(index: usize) -> Self {
        FieldIndex(index)
    }
}

impl From<FieldIndex> for usize {
    fn from(index: FieldIndex) -> Self {
        index.0
    }
}

impl FieldIndex {
    pub fn new(index: usize) -> Self {
        FieldIndex(index)
    }

    pub fn as_usize(self) -> usize {
        self.0
    }
}

/// Runtime identity of a thread driving resolution.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(pub u64);

impl Display for ThreadId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ThreadId {
    fn from(id: u64) -> Self {
        ThreadId(id)
    }
}

impl ThreadId {
    pub const INVALID: Self = ThreadId(0);

    pub fn new(id: u64) -> Self {
        ThreadId(id)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Opaque reference to a heap value owned by the executing layer
/// (bootstrap appendices, call-site objects).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectHandle(pub u64);

impl Display for ObjectHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "obj@{:x}", self.0)
    }
}

impl From<u64> for ObjectHandle {
    fn from(raw: u64) -> Self {
        ObjectHandle(raw)
    }
}
