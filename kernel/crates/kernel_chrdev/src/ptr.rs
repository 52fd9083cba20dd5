//! Moving bytes across the boundary between the calling process and the
//! driver.
//!
//! Entry points never touch caller memory directly. They go through
//! [`UserRead`] and [`UserWrite`], which either copy the whole requested
//! range or fail with a [`CopyFault`] before the driver acts on the data.

use core::ptr::{with_exposed_provenance, with_exposed_provenance_mut};

use kernel_abi::{EFAULT, Errno};
use thiserror::Error;

/// Addresses at or above this belong to the kernel half.
const USERSPACE_END: usize = 1 << (usize::BITS - 1);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
#[error("cannot copy {len} bytes at {addr:#x}")]
pub struct CopyFault {
    pub addr: usize,
    pub len: usize,
}

impl From<CopyFault> for Errno {
    fn from(_: CopyFault) -> Self {
        EFAULT
    }
}

/// Caller memory the driver can copy out of.
pub trait UserRead {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fills `dst` from the start of this buffer.
    ///
    /// # Errors
    /// Returns an error if `dst` is longer than this buffer or the memory
    /// cannot be read.
    fn copy_to_kernel(&self, dst: &mut [u8]) -> Result<(), CopyFault>;
}

/// Caller memory the driver can copy into.
pub trait UserWrite {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies all of `src` to the start of this buffer.
    ///
    /// # Errors
    /// Returns an error if `src` is longer than this buffer or the memory
    /// cannot be written.
    fn copy_from_kernel(&mut self, src: &[u8]) -> Result<(), CopyFault>;
}

impl UserRead for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_to_kernel(&self, dst: &mut [u8]) -> Result<(), CopyFault> {
        let src = self.get(..dst.len()).ok_or(CopyFault {
            addr: self.as_ptr().addr(),
            len: dst.len(),
        })?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl UserWrite for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_from_kernel(&mut self, src: &[u8]) -> Result<(), CopyFault> {
        let addr = self.as_ptr().addr();
        let dst = self.get_mut(..src.len()).ok_or(CopyFault {
            addr,
            len: src.len(),
        })?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

fn check_range(addr: usize, len: usize) -> Result<(), CopyFault> {
    let fault = CopyFault { addr, len };
    if addr == 0 {
        return Err(fault);
    }
    let end = addr.checked_add(len).ok_or(fault)?;
    if end > USERSPACE_END {
        return Err(fault);
    }
    Ok(())
}

/// A readable range in the caller's address space.
pub struct UserSlice {
    ptr: *const u8,
    len: usize,
}

impl UserSlice {
    /// # Errors
    /// Returns an error if the range is null, wraps around, or reaches into
    /// the kernel half of the address space.
    ///
    /// # Safety
    /// The caller must ensure that a range that passes these checks is
    /// mapped and readable for as long as the returned value lives.
    pub unsafe fn try_from_usize(addr: usize, len: usize) -> Result<Self, CopyFault> {
        check_range(addr, len)?;
        Ok(Self {
            ptr: with_exposed_provenance(addr),
            len,
        })
    }
}

impl UserRead for UserSlice {
    fn len(&self) -> usize {
        self.len
    }

    fn copy_to_kernel(&self, dst: &mut [u8]) -> Result<(), CopyFault> {
        if dst.len() > self.len {
            return Err(CopyFault {
                addr: self.ptr.addr(),
                len: dst.len(),
            });
        }
        unsafe {
            // SAFETY: the range was checked on construction and is valid by
            // the contract of `try_from_usize`
            core::ptr::copy_nonoverlapping(self.ptr, dst.as_mut_ptr(), dst.len());
        }
        Ok(())
    }
}

/// A writable range in the caller's address space.
pub struct UserSliceMut {
    ptr: *mut u8,
    len: usize,
}

impl UserSliceMut {
    /// # Errors
    /// Returns an error if the range is null, wraps around, or reaches into
    /// the kernel half of the address space.
    ///
    /// # Safety
    /// The caller must ensure that a range that passes these checks is
    /// mapped and writable, and not aliased, for as long as the returned
    /// value lives.
    pub unsafe fn try_from_usize(addr: usize, len: usize) -> Result<Self, CopyFault> {
        check_range(addr, len)?;
        Ok(Self {
            ptr: with_exposed_provenance_mut(addr),
            len,
        })
    }
}

impl UserRead for UserSliceMut {
    fn len(&self) -> usize {
        self.len
    }

    fn copy_to_kernel(&self, dst: &mut [u8]) -> Result<(), CopyFault> {
        if dst.len() > self.len {
            return Err(CopyFault {
                addr: self.ptr.addr(),
                len: dst.len(),
            });
        }
        unsafe {
            // SAFETY: see `UserSlice::copy_to_kernel`
            core::ptr::copy_nonoverlapping(self.ptr.cast_const(), dst.as_mut_ptr(), dst.len());
        }
        Ok(())
    }
}

impl UserWrite for UserSliceMut {
    fn len(&self) -> usize {
        self.len
    }

    fn copy_from_kernel(&mut self, src: &[u8]) -> Result<(), CopyFault> {
        if src.len() > self.len {
            return Err(CopyFault {
                addr: self.ptr.addr(),
                len: src.len(),
            });
        }
        unsafe {
            // SAFETY: the range was checked on construction and is valid and
            // exclusive by the contract of `try_from_usize`
            core::ptr::copy_nonoverlapping(src.as_ptr(), self.ptr, src.len());
        }
        Ok(())
    }
}
