#![no_std]
extern crate alloc;

use core::fmt::{Display, Formatter};

pub use mapper::*;
pub use register::*;
pub use table::*;

mod devicetree;
mod mapper;
mod platform;
mod register;
mod table;

pub use devicetree::*;
pub use platform::*;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

/// A physical address of a 32-bit device register.
/// Holding a `PhysAddr` does not imply that anything is mapped there.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysAddr(u64);

impl PhysAddr {
    /// # Errors
    /// Returns an error if the address is null or not aligned to a 32-bit
    /// register boundary.
    pub const fn try_new(addr: u64) -> Result<Self, MapError> {
        if addr == 0 || addr & 3 != 0 {
            Err(MapError::Misaligned(addr))
        } else {
            Ok(Self(addr))
        }
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for PhysAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
