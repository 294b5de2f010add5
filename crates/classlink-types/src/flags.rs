use bitflags::bitflags;

bitflags! {
    /// Member access and property flags, using the class-file bit values.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
    }
}

impl AccessFlags {
    pub fn is_public(self) -> bool {
        self.contains(Self::PUBLIC)
    }

    pub fn is_private(self) -> bool {
        self.contains(Self::PRIVATE)
    }

    pub fn is_protected(self) -> bool {
        self.contains(Self::PROTECTED)
    }

    /// No visibility bit set.
    pub fn is_package_private(self) -> bool {
        !self.intersects(Self::PUBLIC | Self::PRIVATE | Self::PROTECTED)
    }

    pub fn is_static(self) -> bool {
        self.contains(Self::STATIC)
    }

    pub fn is_final(self) -> bool {
        self.contains(Self::FINAL)
    }

    pub fn is_abstract(self) -> bool {
        self.contains(Self::ABSTRACT)
    }
}

bitflags! {
    /// Type-level flags.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct ClassFlags: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        /// Invokespecial on a superclass method re-selects from the caller's superclass.
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        /// Not a class-file bit; set by the registry on array types.
        const ARRAY = 0x8000;
    }
}

impl ClassFlags {
    pub fn is_public(self) -> bool {
        self.contains(Self::PUBLIC)
    }

    pub fn is_interface(self) -> bool {
        self.contains(Self::INTERFACE)
    }

    pub fn is_abstract(self) -> bool {
        self.contains(Self::ABSTRACT)
    }

    pub fn is_array(self) -> bool {
        self.contains(Self::ARRAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_private() {
        assert!(AccessFlags::STATIC.is_package_private());
        assert!(!(AccessFlags::PROTECTED | AccessFlags::FINAL).is_package_private());
        assert!(AccessFlags::empty().is_package_private());
    }
}
