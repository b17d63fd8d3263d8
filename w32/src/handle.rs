//! Typed wrappers for the opaque OS handles that cross the script boundary.
//!
//! Scripts see plain integers. A wrapper only records which category a value
//! belongs to; the bits are carried unchanged and no validity check is made.
//! Nothing here closes a handle on drop: ownership stays with the script.

use std::fmt;

use w32_script::Variant;

use crate::constants;

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(isize);

        impl $name {
            pub const NULL: Self = Self(0);

            pub const fn from_raw(raw: isize) -> Self {
                Self(raw)
            }

            pub const fn as_raw(self) -> isize {
                self.0
            }

            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }

        impl From<isize> for $name {
            fn from(raw: isize) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for Variant {
            fn from(h: $name) -> Self {
                Variant::Int(h.0 as i64)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }
    };
}

define_handle!(
    /// Window handle.
    Hwnd
);

define_handle!(
    /// Kernel object: event, mutex, semaphore, process, thread or file.
    KernelHandle
);

define_handle!(
    /// Directory enumeration cursor, closed with `FindClose`.
    FindHandle
);

define_handle!(
    /// Registry key, including the predefined roots.
    RegKey
);

define_handle!(
    /// Service control manager or service handle.
    ScHandle
);

impl KernelHandle {
    pub const INVALID: Self = Self(constants::INVALID_HANDLE_VALUE);

    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }
}

impl FindHandle {
    pub const INVALID: Self = Self(constants::INVALID_HANDLE_VALUE);
}

impl RegKey {
    pub const CLASSES_ROOT: Self = Self(constants::HKEY_CLASSES_ROOT);
    pub const CURRENT_USER: Self = Self(constants::HKEY_CURRENT_USER);
    pub const LOCAL_MACHINE: Self = Self(constants::HKEY_LOCAL_MACHINE);
    pub const USERS: Self = Self(constants::HKEY_USERS);
    pub const CURRENT_CONFIG: Self = Self(constants::HKEY_CURRENT_CONFIG);

    pub fn is_predefined(self) -> bool {
        matches!(
            self,
            Self::CLASSES_ROOT | Self::CURRENT_USER | Self::LOCAL_MACHINE | Self::USERS | Self::CURRENT_CONFIG
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn raw_bits_round_trip() {
        for raw in [0isize, 1, -1, 0x7FFF_FFFF, isize::MIN, isize::MAX, constants::HKEY_USERS] {
            let v = Variant::from(KernelHandle::from_raw(raw));
            assert_eq!(v.as_int().map(|i| i as isize), Some(raw));
        }
    }

    #[test]
    fn predefined_roots() {
        assert!(RegKey::from_raw(constants::HKEY_LOCAL_MACHINE).is_predefined());
        assert!(!RegKey::from_raw(0x80000002).is_predefined());
        assert!(KernelHandle::from_raw(-1).is_invalid());
    }
}
