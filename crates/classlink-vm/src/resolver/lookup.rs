use crate::{error::LinkError, resolver::LinkResolver};
use classlink_types::{
    Symbol, TypeHandle,
    members::{FieldEntry, MethodRef},
};

impl LinkResolver {
    /// Walk `start` and its superclasses for a declared method, first match
    /// wins. Signature-polymorphic declarations are left to polymorphic lookup.
    pub fn lookup_method_in_classes(
        &self,
        start: &TypeHandle,
        name: Symbol,
        descriptor: Symbol,
    ) -> Result<Option<MethodRef>, LinkError> {
        self.walk_classes(start, name, descriptor, false)
    }

    /// Like [`lookup_method_in_classes`](Self::lookup_method_in_classes) but
    /// skips static methods, as dispatch against a receiver does.
    pub fn lookup_instance_method_in_classes(
        &self,
        start: &TypeHandle,
        name: Symbol,
        descriptor: Symbol,
    ) -> Result<Option<MethodRef>, LinkError> {
        self.walk_classes(start, name, descriptor, true)
    }

    fn walk_classes(
        &self,
        start: &TypeHandle,
        name: Symbol,
        descriptor: Symbol,
        skip_static: bool,
    ) -> Result<Option<MethodRef>, LinkError> {
        let mut current = Some(start.clone());
        while let Some(ty) = current {
            if let Some(method) = ty.declared_method(name, descriptor) {
                if !method.is_signature_polymorphic() && !(skip_static && method.is_static()) {
                    return Ok(Some(method.clone()));
                }
            }
            current = match ty.super_type() {
                Some(id) => Some(self.registry().get(id)?),
                None => None,
            };
        }
        Ok(None)
    }

    /// Non-static, non-private method among the transitive interfaces of
    /// `ty`. The first default in declared order wins; an abstract
    /// declaration is returned only when no interface supplies a body.
    pub fn lookup_method_in_interfaces(
        &self,
        ty: &TypeHandle,
        name: Symbol,
        descriptor: Symbol,
    ) -> Result<Option<MethodRef>, LinkError> {
        let mut first_abstract = None;
        for iface in ty.all_interfaces() {
            let iface = self.registry().get(*iface)?;
            if let Some(method) = iface.declared_method(name, descriptor) {
                if method.is_static() || method.is_private() {
                    continue;
                }
                if !method.is_abstract() {
                    return Ok(Some(method.clone()));
                }
                if first_abstract.is_none() {
                    first_abstract = Some(method.clone());
                }
            }
        }
        Ok(first_abstract)
    }

    /// Interface-method search: the interface itself, then public instance
    /// methods of the root type, then superinterfaces.
    pub fn lookup_interface_method(
        &self,
        iface: &TypeHandle,
        name: Symbol,
        descriptor: Symbol,
    ) -> Result<Option<MethodRef>, LinkError> {
        if let Some(method) = iface.declared_method(name, descriptor) {
            return Ok(Some(method.clone()));
        }
        let root = self.registry().root_type();
        if let Some(method) = root.declared_method(name, descriptor) {
            if method.is_public() && !method.is_static() {
                return Ok(Some(method.clone()));
            }
        }
        self.lookup_method_in_interfaces(iface, name, descriptor)
    }

    /// Find a field and the type that declares it: own fields, then direct
    /// superinterfaces (recursively), then the superclass.
    pub fn lookup_field(
        &self,
        ty: &TypeHandle,
        name: Symbol,
        descriptor: Symbol,
    ) -> Result<Option<(TypeHandle, FieldEntry)>, LinkError> {
        if let Some(field) = ty.declared_field(name, descriptor) {
            return Ok(Some((ty.clone(), field.clone())));
        }
        for iface in ty.local_interfaces() {
            let iface = self.registry().get(*iface)?;
            if let Some(found) = self.lookup_field(&iface, name, descriptor)? {
                return Ok(Some(found));
            }
        }
        match ty.super_type() {
            Some(id) => {
                let super_type = self.registry().get(id)?;
                self.lookup_field(&super_type, name, descriptor)
            }
            None => Ok(None),
        }
    }
}
