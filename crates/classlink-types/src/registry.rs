use crate::{
    LoaderId, TypeId, VtableIndex,
    error::{InitializerError, TypeResolutionError},
    flags::ClassFlags,
    members::{FieldEntry, MemberDescriptor, MethodEntry, MethodRef},
    package_of,
    symbols::{Symbol, SymbolTable},
};
use classlink_utils::sync::Arc;
use std::fmt::{self, Debug, Formatter};

/// One interface's slice of a class's itable: the interface's declared
/// instance methods, each paired with the implementation selected for the
/// class (absent when nothing implements it).
#[derive(Clone, Debug)]
pub struct ItableEntry {
    pub interface: TypeId,
    pub slots: Vec<ItableSlot>,
}

#[derive(Clone, Debug)]
pub struct ItableSlot {
    pub declared: MethodRef,
    pub selected: Option<MethodRef>,
}

impl ItableEntry {
    pub fn find(&self, name: Symbol, descriptor: Symbol) -> Option<&ItableSlot> {
        self.slots
            .iter()
            .find(|s| s.declared.member.matches(name, descriptor))
    }
}

/// Finalized state of a type. Built once by a registry, never mutated after.
#[derive(Debug)]
pub struct TypeRecord {
    pub id: TypeId,
    pub name: Symbol,
    pub display_name: String,
    pub loader: LoaderId,
    pub flags: ClassFlags,
    pub super_type: Option<TypeId>,
    pub local_interfaces: Vec<TypeId>,
    /// Transitive interfaces in declared order, deduplicated.
    pub all_interfaces: Vec<TypeId>,
    /// Superclass chain, nearest first.
    pub supers: Vec<TypeId>,
    pub methods: Vec<MethodRef>,
    pub fields: Vec<FieldEntry>,
    pub vtable: Vec<MethodRef>,
    pub itable: Vec<ItableEntry>,
    /// Bytes of instance field storage, including inherited fields.
    pub instance_size: usize,
    pub has_static_initializer: bool,
}

#[derive(Clone)]
pub struct TypeHandle(pub Arc<TypeRecord>);

impl Debug for TypeHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.0.display_name, self.0.id)
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for TypeHandle {}

impl std::hash::Hash for TypeHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl TypeHandle {
    pub fn new(record: TypeRecord) -> Self {
        Self(Arc::new(record))
    }

    pub fn id(&self) -> TypeId {
        self.0.id
    }

    pub fn name(&self) -> Symbol {
        self.0.name
    }

    pub fn display_name(&self) -> &str {
        &self.0.display_name
    }

    pub fn package(&self) -> &str {
        package_of(&self.0.display_name)
    }

    pub fn defining_loader(&self) -> LoaderId {
        self.0.loader
    }

    pub fn flags(&self) -> ClassFlags {
        self.0.flags
    }

    pub fn super_type(&self) -> Option<TypeId> {
        self.0.super_type
    }

    pub fn is_interface(&self) -> bool {
        self.0.flags.is_interface()
    }

    pub fn is_array(&self) -> bool {
        self.0.flags.is_array()
    }

    pub fn is_abstract(&self) -> bool {
        self.0.flags.is_abstract()
    }

    pub fn is_public(&self) -> bool {
        self.0.flags.is_public()
    }

    pub fn local_interfaces(&self) -> &[TypeId] {
        &self.0.local_interfaces
    }

    pub fn all_interfaces(&self) -> &[TypeId] {
        &self.0.all_interfaces
    }

    pub fn supers(&self) -> &[TypeId] {
        &self.0.supers
    }

    pub fn methods(&self) -> &[MethodRef] {
        &self.0.methods
    }

    pub fn fields(&self) -> &[FieldEntry] {
        &self.0.fields
    }

    pub fn declared_method(&self, name: Symbol, descriptor: Symbol) -> Option<&MethodRef> {
        self.0
            .methods
            .iter()
            .find(|m| m.member.matches(name, descriptor))
    }

    pub fn declared_field(&self, name: Symbol, descriptor: Symbol) -> Option<&FieldEntry> {
        self.0
            .fields
            .iter()
            .find(|f| f.member.matches(name, descriptor))
    }

    pub fn vtable(&self) -> &[MethodRef] {
        &self.0.vtable
    }

    pub fn vtable_entry(&self, index: VtableIndex) -> Option<&MethodRef> {
        self.0.vtable.get(index.as_usize())
    }

    /// Slot of the vtable entry with this name and descriptor, if any.
    pub fn vtable_index_of(&self, name: Symbol, descriptor: Symbol) -> Option<VtableIndex> {
        self.0
            .vtable
            .iter()
            .position(|m| m.member.matches(name, descriptor))
            .map(VtableIndex::new)
    }

    pub fn itable(&self) -> &[ItableEntry] {
        &self.0.itable
    }

    pub fn itable_entry(&self, interface: TypeId) -> Option<&ItableEntry> {
        self.0.itable.iter().find(|e| e.interface == interface)
    }

    /// Reflexive: a type is a subtype of itself.
    pub fn is_subtype_of(&self, other: TypeId) -> bool {
        self.0.id == other || self.0.supers.contains(&other) || self.0.all_interfaces.contains(&other)
    }

    pub fn is_strict_subclass_of(&self, other: TypeId) -> bool {
        self.0.supers.contains(&other)
    }

    /// Same package name and same defining loader.
    pub fn is_same_class_package(&self, other: &TypeHandle) -> bool {
        self.0.loader == other.0.loader && self.package() == other.package()
    }

    pub fn has_static_initializer(&self) -> bool {
        self.0.has_static_initializer
    }

    pub fn instance_size(&self) -> usize {
        self.0.instance_size
    }
}

/// Read-mostly view of the loaded type universe.
pub trait TypeRegistry: Send + Sync {
    fn symbols(&self) -> &SymbolTable;

    fn get(&self, id: TypeId) -> Result<TypeHandle, TypeResolutionError>;

    /// Find the type `name` as seen by `loader`, without defining anything.
    fn lookup(&self, name: Symbol, loader: LoaderId) -> Option<TypeHandle>;

    fn resolve_class(
        &self,
        name: Symbol,
        loader: LoaderId,
    ) -> Result<TypeHandle, TypeResolutionError> {
        self.lookup(name, loader).ok_or_else(|| {
            TypeResolutionError::TypeNotFound(self.symbols().display(name).to_string())
        })
    }

    fn root_type(&self) -> TypeHandle;

    /// The type declaring signature-polymorphic invokers, if loaded.
    fn method_handle_type(&self) -> Option<TypeHandle>;

    fn loader_parent(&self, loader: LoaderId) -> Option<LoaderId>;

    fn loader_name(&self, loader: LoaderId) -> String {
        loader.to_string()
    }

    /// Run the static initializer of `ty` itself. Ordering, locking, and
    /// failure caching are the caller's concern.
    fn run_static_initializer(&self, ty: &TypeHandle) -> Result<(), InitializerError>;

    fn describe_member(&self, member: &MemberDescriptor) -> String {
        let owner = self
            .get(member.owner)
            .map(|t| t.display_name().to_string())
            .unwrap_or_else(|_| member.owner.to_string());
        format!(
            "{}.{}{}",
            owner,
            self.symbols().display(member.name),
            self.symbols().display(member.descriptor)
        )
    }

    fn describe_method(&self, method: &MethodEntry) -> String {
        self.describe_member(&method.member)
    }

    fn type_name(&self, id: TypeId) -> String {
        self.get(id)
            .map(|t| t.display_name().to_string())
            .unwrap_or_else(|_| id.to_string())
    }
}
