//! In-memory [`TypeRegistry`] with parent-first loader delegation.
//!
//! Types are defined bottom-up through [`ClassBuilder`]: a type's superclass
//! and interfaces must already be visible to its loader. Vtables, itables, and
//! field offsets are computed once at definition and never change.
use crate::{
    ByteOffset, FieldIndex, LoaderId, METHOD_HANDLE_CLASS_NAME, ROOT_CLASS_NAME, TypeId,
    VtableIndex,
    descriptor::{BasicType, FieldType, MethodDescriptor},
    error::{InitializerError, TypeResolutionError},
    flags::{AccessFlags, ClassFlags},
    members::{FieldEntry, IntrinsicKind, MemberDescriptor, MethodEntry, MethodRef},
    package_of,
    registry::{ItableEntry, ItableSlot, TypeHandle, TypeRecord, TypeRegistry},
    symbols::{Symbol, SymbolTable, well_known},
};
use classlink_utils::sync::{Arc, Mutex, RwLock};
use dashmap::DashMap;
use tracing::{debug, trace};

pub type StaticInitializer = Arc<dyn Fn() -> Result<(), String> + Send + Sync>;

struct MethodSpec {
    name: String,
    descriptor: String,
    flags: AccessFlags,
}

struct FieldSpec {
    name: String,
    descriptor: String,
    flags: AccessFlags,
}

/// Description of a type to define in a [`ClassTable`].
pub struct ClassBuilder {
    name: String,
    loader: LoaderId,
    flags: ClassFlags,
    super_name: Option<String>,
    interfaces: Vec<String>,
    methods: Vec<MethodSpec>,
    fields: Vec<FieldSpec>,
    initializer: Option<StaticInitializer>,
}

impl ClassBuilder {
    fn with_flags(name: impl Into<String>, flags: ClassFlags) -> Self {
        Self {
            name: name.into(),
            loader: LoaderId::BOOTSTRAP,
            flags,
            super_name: None,
            interfaces: vec![],
            methods: vec![],
            fields: vec![],
            initializer: None,
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::with_flags(name, ClassFlags::PUBLIC | ClassFlags::SUPER)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::with_flags(
            name,
            ClassFlags::PUBLIC | ClassFlags::INTERFACE | ClassFlags::ABSTRACT,
        )
    }

    /// An array type such as `[Lshapes/Circle;`. Arrays inherit the root
    /// type's methods and implement no interfaces.
    pub fn array(name: impl Into<String>) -> Self {
        Self::with_flags(
            name,
            ClassFlags::PUBLIC | ClassFlags::FINAL | ClassFlags::ARRAY,
        )
    }

    pub fn loader(mut self, loader: LoaderId) -> Self {
        self.loader = loader;
        self
    }

    /// Replace the type flags. The array marker is kept.
    pub fn flags(mut self, flags: ClassFlags) -> Self {
        self.flags = flags | (self.flags & ClassFlags::ARRAY);
        self
    }

    pub fn extends(mut self, name: impl Into<String>) -> Self {
        self.super_name = Some(name.into());
        self
    }

    pub fn implements(mut self, name: impl Into<String>) -> Self {
        self.interfaces.push(name.into());
        self
    }

    pub fn method(
        mut self,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        flags: AccessFlags,
    ) -> Self {
        self.methods.push(MethodSpec {
            name: name.into(),
            descriptor: descriptor.into(),
            flags,
        });
        self
    }

    pub fn field(
        mut self,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        flags: AccessFlags,
    ) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            descriptor: descriptor.into(),
            flags,
        });
        self
    }

    /// Static initializer body. An `Err` is reported as the initializer's exception.
    pub fn initializer(
        mut self,
        body: impl Fn() -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.initializer = Some(Arc::new(body));
        self
    }
}

struct LoaderRecord {
    name: String,
    parent: Option<LoaderId>,
}

pub struct ClassTable {
    symbols: SymbolTable,
    types: RwLock<Vec<TypeHandle>>,
    defined: DashMap<(Symbol, LoaderId), TypeId>,
    loaders: RwLock<Vec<LoaderRecord>>,
    initializers: DashMap<TypeId, StaticInitializer>,
    define_lock: Mutex<()>,
}

const ROOT_TYPE: TypeId = TypeId(0);
const METHOD_HANDLE_TYPE: TypeId = TypeId(1);

enum VtableSlot {
    Inherited(MethodRef),
    Declared(usize),
}

impl ClassTable {
    /// A table holding the bootstrap loader, the root type, and the method
    /// handle type with its signature-polymorphic invokers.
    pub fn new() -> Result<Self, TypeResolutionError> {
        let table = Self {
            symbols: SymbolTable::new(),
            types: RwLock::new(vec![]),
            defined: DashMap::new(),
            loaders: RwLock::new(vec![LoaderRecord {
                name: "bootstrap".to_string(),
                parent: None,
            }]),
            initializers: DashMap::new(),
            define_lock: Mutex::new(()),
        };

        let public = AccessFlags::PUBLIC;
        let public_native = AccessFlags::PUBLIC | AccessFlags::NATIVE;
        table.define(
            ClassBuilder::class(ROOT_CLASS_NAME)
                .method("<init>", "()V", public)
                .method("equals", "(Ljava/lang/Object;)Z", public)
                .method("hashCode", "()I", public_native)
                .method(
                    "clone",
                    "()Ljava/lang/Object;",
                    AccessFlags::PROTECTED | AccessFlags::NATIVE,
                ),
        )?;

        let varargs = "([Ljava/lang/Object;)Ljava/lang/Object;";
        let abstract_class = ClassFlags::PUBLIC | ClassFlags::SUPER | ClassFlags::ABSTRACT;
        let linker = AccessFlags::STATIC | AccessFlags::NATIVE;
        table.define(
            ClassBuilder::class(METHOD_HANDLE_CLASS_NAME)
                .flags(abstract_class)
                .method("invoke", varargs, public_native | AccessFlags::FINAL)
                .method("invokeExact", varargs, public_native | AccessFlags::FINAL)
                .method("invokeBasic", varargs, AccessFlags::FINAL | AccessFlags::NATIVE)
                .method("linkToVirtual", varargs, linker)
                .method("linkToStatic", varargs, linker)
                .method("linkToSpecial", varargs, linker)
                .method("linkToInterface", varargs, linker),
        )?;

        Ok(table)
    }

    pub fn define_loader(
        &self,
        name: impl Into<String>,
        parent: LoaderId,
    ) -> Result<LoaderId, TypeResolutionError> {
        let mut loaders = self.loaders.write();
        if parent.0 as usize >= loaders.len() {
            return Err(TypeResolutionError::UnknownLoader(parent));
        }
        let id = LoaderId::new(loaders.len() as u32);
        loaders.push(LoaderRecord {
            name: name.into(),
            parent: Some(parent),
        });
        debug!(loader = %id, %parent, "defined class loader");
        Ok(id)
    }

    /// `loader` followed by its ancestors, ending at the bootstrap loader.
    fn delegation_chain(&self, loader: LoaderId) -> Vec<LoaderId> {
        let loaders = self.loaders.read();
        let mut chain = vec![];
        let mut current = Some(loader);
        while let Some(l) = current {
            let Some(record) = loaders.get(l.0 as usize) else {
                break;
            };
            chain.push(l);
            current = record.parent;
        }
        chain
    }

    pub fn lookup_name(&self, name: &str, loader: LoaderId) -> Option<TypeHandle> {
        let symbol = self.symbols.lookup(name)?;
        self.lookup(symbol, loader)
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resolve_visible(&self, name: &str, loader: LoaderId) -> Result<TypeHandle, TypeResolutionError> {
        self.lookup_name(name, loader)
            .ok_or_else(|| TypeResolutionError::TypeNotFound(name.to_string()))
    }

    pub fn define(&self, builder: ClassBuilder) -> Result<TypeId, TypeResolutionError> {
        let _guard = self.define_lock.lock();

        if builder.loader.0 as usize >= self.loaders.read().len() {
            return Err(TypeResolutionError::UnknownLoader(builder.loader));
        }
        let name = self.symbols.intern(&builder.name);
        if self.defined.contains_key(&(name, builder.loader)) {
            return Err(TypeResolutionError::DuplicateDefinition {
                name: builder.name,
                loader: builder.loader,
            });
        }

        let id = TypeId::new(self.types.read().len() as u32);
        let is_interface = builder.flags.is_interface();
        let is_array = builder.flags.is_array();
        let hierarchy_error = |reason: String| TypeResolutionError::InvalidHierarchy {
            name: builder.name.clone(),
            reason,
        };

        let super_type = if id == ROOT_TYPE {
            None
        } else {
            let super_name = match (&builder.super_name, is_interface || is_array) {
                (Some(n), false) => n.as_str(),
                _ => ROOT_CLASS_NAME,
            };
            let super_type = self.resolve_visible(super_name, builder.loader)?;
            if super_type.is_interface() {
                return Err(hierarchy_error(format!(
                    "superclass {} is an interface",
                    super_name
                )));
            }
            if super_type.flags().contains(ClassFlags::FINAL) {
                return Err(hierarchy_error(format!("superclass {} is final", super_name)));
            }
            Some(super_type)
        };

        let mut local_interfaces = vec![];
        let mut all_interfaces: Vec<TypeId> = vec![];
        for iface_name in &builder.interfaces {
            let iface = self.resolve_visible(iface_name, builder.loader)?;
            if !iface.is_interface() {
                return Err(hierarchy_error(format!("{} is not an interface", iface_name)));
            }
            local_interfaces.push(iface.id());
            for i in std::iter::once(iface.id()).chain(iface.all_interfaces().iter().copied()) {
                if !all_interfaces.contains(&i) {
                    all_interfaces.push(i);
                }
            }
        }
        let mut supers = vec![];
        if let Some(s) = &super_type {
            supers.push(s.id());
            supers.extend_from_slice(s.supers());
            for i in s.all_interfaces() {
                if !all_interfaces.contains(i) {
                    all_interfaces.push(*i);
                }
            }
        }

        let is_method_handle = builder.name == METHOD_HANDLE_CLASS_NAME;
        let mut entries = Vec::with_capacity(builder.methods.len());
        let mut has_clinit = false;
        for spec in &builder.methods {
            MethodDescriptor::parse(&spec.descriptor)?;
            let method_name = self.symbols.intern(&spec.name);
            has_clinit |= method_name == well_known::CLASS_INITIALIZER;
            let intrinsic = if is_method_handle && spec.flags.contains(AccessFlags::NATIVE) {
                IntrinsicKind::from_name(method_name)
            } else {
                None
            };
            entries.push(MethodEntry {
                member: MemberDescriptor::new(
                    id,
                    method_name,
                    self.symbols.intern(&spec.descriptor),
                ),
                flags: spec.flags,
                vtable_index: None,
                intrinsic,
            });
        }

        let package = package_of(&builder.name);
        let mut slots: Vec<VtableSlot> = match (&super_type, is_interface) {
            (Some(s), false) => s.vtable().iter().cloned().map(VtableSlot::Inherited).collect(),
            _ => vec![],
        };
        if !is_interface {
            let class_is_final = builder.flags.contains(ClassFlags::FINAL);
            for (i, entry) in entries.iter_mut().enumerate() {
                if !is_vtable_candidate(entry) {
                    continue;
                }
                let mut overridden = None;
                for (slot_index, slot) in slots.iter_mut().enumerate() {
                    let VtableSlot::Inherited(existing) = slot else {
                        continue;
                    };
                    if !existing.member.matches(entry.name(), entry.descriptor()) {
                        continue;
                    }
                    if !self.can_override(existing, builder.loader, package)? {
                        continue;
                    }
                    if existing.is_final() {
                        return Err(hierarchy_error(format!(
                            "{} overrides a final method",
                            self.symbols.display(entry.name())
                        )));
                    }
                    *slot = VtableSlot::Declared(i);
                    overridden.get_or_insert(slot_index);
                }
                entry.vtable_index = match overridden {
                    Some(slot_index) => Some(VtableIndex::new(slot_index)),
                    None if entry.is_final() || class_is_final => None,
                    None => {
                        slots.push(VtableSlot::Declared(i));
                        Some(VtableIndex::new(slots.len() - 1))
                    }
                };
            }
        }

        let methods: Vec<MethodRef> = entries.into_iter().map(Arc::new).collect();
        let mut vtable: Vec<MethodRef> = slots
            .into_iter()
            .map(|slot| match slot {
                VtableSlot::Inherited(m) => m,
                VtableSlot::Declared(i) => methods[i].clone(),
            })
            .collect();

        // Interface methods nothing overrides become miranda entries. The
        // first default in declared interface order wins.
        let mut itable = vec![];
        if !is_interface && !is_array {
            for iface_id in &all_interfaces {
                let iface = self.get(*iface_id)?;
                for declared in iface.methods().iter().filter(|m| is_interface_virtual(m)) {
                    match vtable
                        .iter()
                        .position(|v| v.member.matches(declared.name(), declared.descriptor()))
                    {
                        Some(pos) => {
                            let current = &vtable[pos];
                            if current.is_abstract()
                                && !declared.is_abstract()
                                && self.is_interface_owned(current)
                            {
                                vtable[pos] = miranda_entry(declared, pos);
                            }
                        }
                        None => {
                            let pos = vtable.len();
                            vtable.push(miranda_entry(declared, pos));
                        }
                    }
                }
            }

            for iface_id in &all_interfaces {
                let iface = self.get(*iface_id)?;
                let slots = iface
                    .methods()
                    .iter()
                    .filter(|m| is_interface_virtual(m))
                    .map(|declared| {
                        let selected = self.select_implementation(
                            &methods,
                            &supers,
                            &vtable,
                            declared,
                        )?;
                        Ok(ItableSlot {
                            declared: declared.clone(),
                            selected,
                        })
                    })
                    .collect::<Result<Vec<_>, TypeResolutionError>>()?;
                itable.push(ItableEntry {
                    interface: *iface_id,
                    slots,
                });
            }
        }

        let mut instance_size = super_type.as_ref().map(|s| s.instance_size()).unwrap_or(0);
        let mut static_size = 0;
        let mut fields = Vec::with_capacity(builder.fields.len());
        for (i, spec) in builder.fields.iter().enumerate() {
            let field_type = FieldType::parse(&spec.descriptor)?;
            let size = field_size(&field_type);
            let cursor = if spec.flags.is_static() {
                &mut static_size
            } else {
                &mut instance_size
            };
            let offset = cursor.next_multiple_of(size);
            *cursor = offset + size;
            fields.push(FieldEntry {
                member: MemberDescriptor::new(
                    id,
                    self.symbols.intern(&spec.name),
                    self.symbols.intern(&spec.descriptor),
                ),
                offset: ByteOffset::new(offset),
                flags: spec.flags,
                index: FieldIndex::new(i),
            });
        }

        let has_static_initializer = has_clinit || builder.initializer.is_some();
        if let Some(init) = builder.initializer {
            self.initializers.insert(id, init);
        }

        let handle = TypeHandle::new(TypeRecord {
            id,
            name,
            display_name: builder.name,
            loader: builder.loader,
            flags: builder.flags,
            super_type: super_type.as_ref().map(TypeHandle::id),
            local_interfaces,
            all_interfaces,
            supers,
            methods,
            fields,
            vtable,
            itable,
            instance_size,
            has_static_initializer,
        });
        debug!(
            type_name = handle.display_name(),
            %id,
            loader = %handle.defining_loader(),
            vtable_len = handle.vtable().len(),
            "defined type"
        );
        self.types.write().push(handle);
        self.defined.insert((name, builder.loader), id);
        Ok(id)
    }

    /// Whether a method declared by a new type in (`loader`, `package`) may
    /// take over the inherited vtable slot holding `existing`.
    fn can_override(
        &self,
        existing: &MethodEntry,
        loader: LoaderId,
        package: &str,
    ) -> Result<bool, TypeResolutionError> {
        if existing.is_public() || existing.flags.is_protected() {
            return Ok(true);
        }
        let owner = self.get(existing.owner())?;
        Ok(owner.defining_loader() == loader && owner.package() == package)
    }

    fn is_interface_owned(&self, method: &MethodEntry) -> bool {
        self.get(method.owner())
            .map(|owner| owner.is_interface())
            .unwrap_or(false)
    }

    /// Class-chain implementation of `declared`, falling back to the vtable
    /// (which carries selected defaults).
    fn select_implementation(
        &self,
        own_methods: &[MethodRef],
        supers: &[TypeId],
        vtable: &[MethodRef],
        declared: &MethodEntry,
    ) -> Result<Option<MethodRef>, TypeResolutionError> {
        let name = declared.name();
        let descriptor = declared.descriptor();
        let matching = |m: &&MethodRef| !m.is_static() && m.member.matches(name, descriptor);

        if let Some(found) = own_methods.iter().find(matching) {
            return Ok(Some(found.clone()));
        }
        for super_id in supers {
            let super_type = self.get(*super_id)?;
            if let Some(found) = super_type.methods().iter().find(matching) {
                return Ok(Some(found.clone()));
            }
        }
        Ok(vtable.iter().find(matching).cloned())
    }
}

/// A vtable copy of an interface method, carrying the slot it occupies.
fn miranda_entry(declared: &MethodEntry, slot: usize) -> MethodRef {
    Arc::new(MethodEntry {
        vtable_index: Some(VtableIndex::new(slot)),
        ..declared.clone()
    })
}

fn is_vtable_candidate(method: &MethodEntry) -> bool {
    !method.is_static()
        && !method.is_private()
        && method.name() != well_known::OBJECT_INITIALIZER
        && method.name() != well_known::CLASS_INITIALIZER
}

fn is_interface_virtual(method: &MethodEntry) -> bool {
    !method.is_static() && !method.is_private() && method.name() != well_known::CLASS_INITIALIZER
}

fn field_size(field_type: &FieldType) -> usize {
    match field_type.basic_type() {
        BasicType::Long | BasicType::Double | BasicType::Reference => 8,
        BasicType::Int | BasicType::Float => 4,
        BasicType::Short | BasicType::Char => 2,
        BasicType::Boolean | BasicType::Byte | BasicType::Void => 1,
    }
}

impl TypeRegistry for ClassTable {
    fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    fn get(&self, id: TypeId) -> Result<TypeHandle, TypeResolutionError> {
        self.types
            .read()
            .get(id.as_usize())
            .cloned()
            .ok_or(TypeResolutionError::InvalidHandle(id))
    }

    fn lookup(&self, name: Symbol, loader: LoaderId) -> Option<TypeHandle> {
        // Parent-first: the outermost ancestor that defines the name wins.
        let chain = self.delegation_chain(loader);
        let id = chain
            .iter()
            .rev()
            .find_map(|l| self.defined.get(&(name, *l)).map(|id| *id))?;
        self.get(id).ok()
    }

    fn root_type(&self) -> TypeHandle {
        self.types.read()[ROOT_TYPE.as_usize()].clone()
    }

    fn method_handle_type(&self) -> Option<TypeHandle> {
        self.get(METHOD_HANDLE_TYPE).ok()
    }

    fn loader_parent(&self, loader: LoaderId) -> Option<LoaderId> {
        self.loaders
            .read()
            .get(loader.0 as usize)
            .and_then(|l| l.parent)
    }

    fn loader_name(&self, loader: LoaderId) -> String {
        self.loaders
            .read()
            .get(loader.0 as usize)
            .map(|l| l.name.clone())
            .unwrap_or_else(|| loader.to_string())
    }

    fn run_static_initializer(&self, ty: &TypeHandle) -> Result<(), InitializerError> {
        let Some(body) = self.initializers.get(&ty.id()).map(|b| b.clone()) else {
            return Ok(());
        };
        trace!(type_name = ty.display_name(), "running static initializer");
        body().map_err(|message| InitializerError {
            type_name: ty.display_name().to_string(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(table: &ClassTable, s: &str) -> Symbol {
        table.symbols().intern(s)
    }

    #[test]
    fn test_bootstrap_types() {
        let table = ClassTable::new().unwrap();
        let root = table.root_type();
        assert_eq!(root.display_name(), ROOT_CLASS_NAME);
        assert_eq!(root.super_type(), None);
        assert_eq!(root.vtable().len(), 3);

        let mh = table.method_handle_type().unwrap();
        let invoke_basic = mh
            .declared_method(
                well_known::INVOKE_BASIC,
                sym(&table, "([Ljava/lang/Object;)Ljava/lang/Object;"),
            )
            .unwrap();
        assert_eq!(invoke_basic.intrinsic, Some(IntrinsicKind::InvokeBasic));
    }

    #[test]
    fn test_override_reuses_slot() {
        let table = ClassTable::new().unwrap();
        let base = table
            .define(ClassBuilder::class("shapes/Base").method("area", "()D", AccessFlags::PUBLIC))
            .unwrap();
        let circle = table
            .define(
                ClassBuilder::class("shapes/Circle")
                    .extends("shapes/Base")
                    .method("area", "()D", AccessFlags::PUBLIC)
                    .method("radius", "()D", AccessFlags::PUBLIC | AccessFlags::FINAL),
            )
            .unwrap();

        let area = sym(&table, "area");
        let d = sym(&table, "()D");
        let base = table.get(base).unwrap();
        let circle = table.get(circle).unwrap();
        let base_area = base.declared_method(area, d).unwrap();
        let circle_area = circle.declared_method(area, d).unwrap();
        assert_eq!(base_area.vtable_index, Some(VtableIndex(3)));
        assert_eq!(circle_area.vtable_index, Some(VtableIndex(3)));
        assert!(Arc::ptr_eq(circle.vtable_entry(VtableIndex(3)).unwrap(), circle_area));
        assert_eq!(circle.vtable().len(), 4);

        let radius = circle.declared_method(sym(&table, "radius"), d).unwrap();
        assert_eq!(radius.vtable_index, None);
        assert!(circle.is_strict_subclass_of(base.id()));
        assert!(circle.is_subtype_of(table.root_type().id()));
    }

    #[test]
    fn test_package_private_method_not_overridden_across_packages() {
        let table = ClassTable::new().unwrap();
        table
            .define(ClassBuilder::class("a/Base").method("size", "()I", AccessFlags::empty()))
            .unwrap();
        let sub = table
            .define(
                ClassBuilder::class("b/Sub")
                    .extends("a/Base")
                    .method("size", "()I", AccessFlags::PUBLIC),
            )
            .unwrap();
        let sub = table.get(sub).unwrap();
        assert_eq!(sub.vtable().len(), 5);
        assert_eq!(
            sub.declared_method(sym(&table, "size"), sym(&table, "()I"))
                .unwrap()
                .vtable_index,
            Some(VtableIndex(4))
        );
    }

    #[test]
    fn test_first_default_in_declared_order_wins() {
        let table = ClassTable::new().unwrap();
        let abstract_public = AccessFlags::PUBLIC | AccessFlags::ABSTRACT;
        table
            .define(ClassBuilder::interface("shapes/Shape").method("area", "()D", abstract_public))
            .unwrap();
        let round = table
            .define(
                ClassBuilder::interface("shapes/Round")
                    .implements("shapes/Shape")
                    .method("area", "()D", AccessFlags::PUBLIC),
            )
            .unwrap();
        table
            .define(
                ClassBuilder::interface("shapes/Polygon")
                    .implements("shapes/Shape")
                    .method("area", "()D", AccessFlags::PUBLIC),
            )
            .unwrap();
        let shape_id = table.lookup_name("shapes/Shape", LoaderId::BOOTSTRAP).unwrap().id();
        let blob = table
            .define(
                ClassBuilder::class("shapes/Blob")
                    .implements("shapes/Round")
                    .implements("shapes/Polygon"),
            )
            .unwrap();

        let blob = table.get(blob).unwrap();
        let area = sym(&table, "area");
        let d = sym(&table, "()D");
        let slot = blob.vtable_index_of(area, d).unwrap();
        let selected = blob.vtable_entry(slot).unwrap();
        assert_eq!(selected.owner(), round);
        assert_eq!(selected.vtable_index, Some(slot));

        let shape_slot = blob.itable_entry(shape_id).unwrap().find(area, d).unwrap();
        assert_eq!(shape_slot.selected.as_ref().unwrap().owner(), round);
    }

    #[test]
    fn test_abstract_class_keeps_miranda_slot() {
        let table = ClassTable::new().unwrap();
        table
            .define(ClassBuilder::interface("p/Runner").method(
                "run",
                "()V",
                AccessFlags::PUBLIC | AccessFlags::ABSTRACT,
            ))
            .unwrap();
        let task = table
            .define(
                ClassBuilder::class("p/Task")
                    .flags(ClassFlags::PUBLIC | ClassFlags::SUPER | ClassFlags::ABSTRACT)
                    .implements("p/Runner"),
            )
            .unwrap();
        let impl_id = table
            .define(
                ClassBuilder::class("p/Impl")
                    .extends("p/Task")
                    .method("run", "()V", AccessFlags::PUBLIC),
            )
            .unwrap();

        let run = sym(&table, "run");
        let v = sym(&table, "()V");
        let task = table.get(task).unwrap();
        let slot = task.vtable_index_of(run, v).unwrap();
        assert!(task.vtable_entry(slot).unwrap().is_abstract());

        let implementation = table.get(impl_id).unwrap();
        assert_eq!(implementation.vtable_entry(slot).unwrap().owner(), impl_id);
    }

    #[test]
    fn test_parent_first_lookup() {
        let table = ClassTable::new().unwrap();
        let parent = table.define_loader("app", LoaderId::BOOTSTRAP).unwrap();
        let child = table.define_loader("plugin", parent).unwrap();
        let in_parent = table
            .define(ClassBuilder::class("p/T").loader(parent))
            .unwrap();
        let in_child = table
            .define(ClassBuilder::class("p/T").loader(child))
            .unwrap();
        assert_ne!(in_parent, in_child);

        assert_eq!(table.lookup_name("p/T", child).unwrap().id(), in_parent);
        assert!(table.lookup_name("p/T", LoaderId::BOOTSTRAP).is_none());
        assert_eq!(table.loader_parent(child), Some(parent));
        assert_eq!(table.loader_name(child), "plugin");
    }

    #[test]
    fn test_definition_errors() {
        let table = ClassTable::new().unwrap();
        table.define(ClassBuilder::class("p/A")).unwrap();
        assert!(matches!(
            table.define(ClassBuilder::class("p/A")),
            Err(TypeResolutionError::DuplicateDefinition { .. })
        ));
        assert!(matches!(
            table.define(ClassBuilder::class("p/B").extends("p/Missing")),
            Err(TypeResolutionError::TypeNotFound(_))
        ));
        assert!(matches!(
            table.define(ClassBuilder::class("p/C").implements("p/A")),
            Err(TypeResolutionError::InvalidHierarchy { .. })
        ));
        assert!(matches!(
            table.define(ClassBuilder::class("p/D").method("m", "(V)V", AccessFlags::PUBLIC)),
            Err(TypeResolutionError::Descriptor(_))
        ));
        assert!(matches!(
            table.define_loader("orphan", LoaderId::new(42)),
            Err(TypeResolutionError::UnknownLoader(_))
        ));
    }

    #[test]
    fn test_field_layout() {
        let table = ClassTable::new().unwrap();
        table
            .define(
                ClassBuilder::class("p/Point")
                    .field("flag", "Z", AccessFlags::PUBLIC)
                    .field("x", "J", AccessFlags::PUBLIC)
                    .field("COUNT", "I", AccessFlags::PUBLIC | AccessFlags::STATIC),
            )
            .unwrap();
        let labeled = table
            .define(
                ClassBuilder::class("p/Labeled")
                    .extends("p/Point")
                    .field("label", "Ljava/lang/Object;", AccessFlags::PRIVATE),
            )
            .unwrap();

        let point = table.lookup_name("p/Point", LoaderId::BOOTSTRAP).unwrap();
        let x = &point.fields()[1];
        assert_eq!(x.offset, ByteOffset(8));
        assert_eq!(x.index, FieldIndex(1));
        assert_eq!(point.fields()[2].offset, ByteOffset::ZERO);
        assert_eq!(point.instance_size(), 16);

        let labeled = table.get(labeled).unwrap();
        assert_eq!(labeled.fields()[0].offset, ByteOffset(16));
    }

    #[test]
    fn test_static_initializer_reports_type() {
        let table = ClassTable::new().unwrap();
        let id = table
            .define(ClassBuilder::class("p/Broken").initializer(|| Err("boom".to_string())))
            .unwrap();
        let ty = table.get(id).unwrap();
        assert!(ty.has_static_initializer());
        let err = table.run_static_initializer(&ty).unwrap_err();
        assert_eq!(err.type_name, "p/Broken");
        assert_eq!(err.message, "boom");
    }
}
