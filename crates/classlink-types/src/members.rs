use crate::{
    ByteOffset, FieldIndex, TypeId, VtableIndex,
    flags::AccessFlags,
    symbols::{Symbol, well_known},
};
use classlink_utils::sync::Arc;

/// Owner, name, and descriptor of a member. Equality is by symbol identity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MemberDescriptor {
    pub owner: TypeId,
    pub name: Symbol,
    pub descriptor: Symbol,
}

impl MemberDescriptor {
    pub fn new(owner: TypeId, name: Symbol, descriptor: Symbol) -> Self {
        Self {
            owner,
            name,
            descriptor,
        }
    }

    pub fn matches(&self, name: Symbol, descriptor: Symbol) -> bool {
        self.name == name && self.descriptor == descriptor
    }
}

/// The fixed set of signature-polymorphic method handle primitives.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntrinsicKind {
    /// `invoke` and `invokeExact`; linked through a generated invoker.
    InvokeGeneric,
    InvokeBasic,
    LinkToVirtual,
    LinkToStatic,
    LinkToSpecial,
    LinkToInterface,
}

impl IntrinsicKind {
    pub fn from_name(name: Symbol) -> Option<Self> {
        match name {
            well_known::INVOKE | well_known::INVOKE_EXACT => Some(Self::InvokeGeneric),
            well_known::INVOKE_BASIC => Some(Self::InvokeBasic),
            well_known::LINK_TO_VIRTUAL => Some(Self::LinkToVirtual),
            well_known::LINK_TO_STATIC => Some(Self::LinkToStatic),
            well_known::LINK_TO_SPECIAL => Some(Self::LinkToSpecial),
            well_known::LINK_TO_INTERFACE => Some(Self::LinkToInterface),
            _ => None,
        }
    }

    /// Kinds served straight from the intrinsic table.
    pub fn is_signature_polymorphic_intrinsic(self) -> bool {
        !matches!(self, Self::InvokeGeneric)
    }

    /// `linkTo*` primitives take a trailing member-name argument that survives erasure.
    pub fn is_static_linker(self) -> bool {
        matches!(
            self,
            Self::LinkToVirtual | Self::LinkToStatic | Self::LinkToSpecial | Self::LinkToInterface
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodEntry {
    pub member: MemberDescriptor,
    pub flags: AccessFlags,
    /// Absent for methods that are never dispatched through a vtable.
    pub vtable_index: Option<VtableIndex>,
    pub intrinsic: Option<IntrinsicKind>,
}

pub type MethodRef = Arc<MethodEntry>;

impl MethodEntry {
    pub fn owner(&self) -> TypeId {
        self.member.owner
    }

    pub fn name(&self) -> Symbol {
        self.member.name
    }

    pub fn descriptor(&self) -> Symbol {
        self.member.descriptor
    }

    pub fn is_static(&self) -> bool {
        self.flags.is_static()
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.is_abstract()
    }

    pub fn is_public(&self) -> bool {
        self.flags.is_public()
    }

    pub fn is_private(&self) -> bool {
        self.flags.is_private()
    }

    pub fn is_final(&self) -> bool {
        self.flags.is_final()
    }

    pub fn is_object_initializer(&self) -> bool {
        self.member.name == well_known::OBJECT_INITIALIZER
    }

    pub fn is_signature_polymorphic(&self) -> bool {
        self.intrinsic.is_some()
    }

    pub fn has_vtable_index(&self) -> bool {
        self.vtable_index.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldEntry {
    pub member: MemberDescriptor,
    pub offset: ByteOffset,
    pub flags: AccessFlags,
    pub index: FieldIndex,
}

impl FieldEntry {
    pub fn owner(&self) -> TypeId {
        self.member.owner
    }

    pub fn is_static(&self) -> bool {
        self.flags.is_static()
    }

    pub fn is_final(&self) -> bool {
        self.flags.is_final()
    }
}
