use core::ptr::NonNull;

use thiserror::Error;

use crate::PhysAddr;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum MapError {
    #[error("address {0:#x} is null or not 32-bit aligned")]
    Misaligned(u64),
    #[error("no device memory at {0}")]
    OutOfRange(PhysAddr),
    #[error("the host refused to map {0}")]
    Rejected(PhysAddr),
}

/// The host's `ioremap`/`iounmap` pair.
///
/// Implementations hand out uncached virtual windows onto device memory.
/// Callers never dereference the returned pointer directly, all accesses go
/// through [`Mmio32`](crate::Mmio32).
pub trait IoMapper: Send + Sync {
    /// Maps `len` bytes of device memory starting at `phys`.
    ///
    /// # Errors
    /// Returns an error if the range is not backed by device memory or the
    /// host cannot map it.
    fn map(&self, phys: PhysAddr, len: usize) -> Result<NonNull<u8>, MapError>;

    /// # Safety
    /// `virt` must have been returned by [`IoMapper::map`] on this mapper with
    /// the same `len`, and must not have been unmapped already. No access
    /// through `virt` may happen after this call.
    unsafe fn unmap(&self, virt: NonNull<u8>, len: usize);
}
