//! Access control for classes and members.
use crate::error::LinkError;
use classlink_types::{
    TypeHandle, TypeId, TypeRegistry,
    flags::AccessFlags,
    members::{MemberDescriptor, MethodEntry},
    symbols::well_known,
};

/// A class is accessible if it is public or in the referrer's runtime package.
pub fn is_class_accessible(referrer: &TypeHandle, target: &TypeHandle) -> bool {
    target.is_public() || referrer.is_same_class_package(target)
}

pub fn check_class_accessibility(
    registry: &dyn TypeRegistry,
    referrer: &TypeHandle,
    target: &TypeHandle,
) -> Result<(), LinkError> {
    if is_class_accessible(referrer, target) {
        return Ok(());
    }
    Err(LinkError::AccessViolation {
        member: target.display_name().to_string(),
        referrer: referrer.display_name().to_string(),
        selected: registry.type_name(target.id()),
    })
}

/// Whether `referrer` (R) may use a member with `flags` declared in
/// `declarer` (D) and named through `selected` (S).
pub fn is_member_accessible(
    referrer: &TypeHandle,
    selected: &TypeHandle,
    declarer: &TypeHandle,
    flags: AccessFlags,
    is_static: bool,
) -> bool {
    if flags.is_public() {
        return true;
    }
    if referrer.id() == declarer.id() {
        return true;
    }
    if flags.is_private() {
        return false;
    }

    let same_package = referrer.is_same_class_package(declarer);
    if flags.is_protected() {
        if same_package {
            return true;
        }
        if !referrer.is_subtype_of(declarer.id()) {
            return false;
        }
        if is_static {
            return true;
        }
        return selected.id() == referrer.id()
            || referrer.is_subtype_of(selected.id())
            || selected.is_subtype_of(referrer.id());
    }

    same_package
}

/// Access flags used when checking `method`. Array types see the root
/// type's `clone` as public.
pub fn effective_method_flags(
    root: TypeId,
    selected: &TypeHandle,
    method: &MethodEntry,
) -> AccessFlags {
    if selected.is_array() && method.owner() == root && method.name() == well_known::CLONE {
        (method.flags - AccessFlags::PROTECTED - AccessFlags::PRIVATE) | AccessFlags::PUBLIC
    } else {
        method.flags
    }
}

pub fn check_member_access(
    registry: &dyn TypeRegistry,
    referrer: &TypeHandle,
    selected: &TypeHandle,
    declarer: &TypeHandle,
    member: &MemberDescriptor,
    flags: AccessFlags,
) -> Result<(), LinkError> {
    if is_member_accessible(referrer, selected, declarer, flags, flags.is_static()) {
        return Ok(());
    }
    Err(LinkError::AccessViolation {
        member: registry.describe_member(member),
        referrer: referrer.display_name().to_string(),
        selected: selected.display_name().to_string(),
    })
}
