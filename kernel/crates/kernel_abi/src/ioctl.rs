//! Control command numbers, encoded the same way the `_IO`/`_IOR`/`_IOW`/`_IOWR`
//! macros do: `nr` in bits 0..=7, the type (domain) byte in 8..=15, the argument
//! size in 16..=29 and the transfer direction in 30..=31.

use bitfield::bitfield;
use bitflags::bitflags;

bitflags! {
    /// Transfer direction seen from the caller. `WRITE` means the caller hands
    /// data in, `READ` means the driver hands data out.
    #[derive(Debug, Copy, Clone, Eq, PartialEq)]
    pub struct IoctlDir: u8 {
        const WRITE = 1;
        const READ = 2;
    }
}

impl IoctlDir {
    pub const NONE: Self = Self::empty();
}

bitfield! {
    #[repr(transparent)]
    #[derive(Copy, Clone, Eq, PartialEq)]
    pub struct IoctlCmd(u32);
    impl Debug;

    pub u8, raw_dir, _: 31, 30;
    pub u16, size, _: 29, 16;
    pub u8, kind, _: 15, 8;
    pub u8, nr, _: 7, 0;
}

impl IoctlCmd {
    #[must_use]
    pub fn dir(self) -> IoctlDir {
        IoctlDir::from_bits_truncate(self.raw_dir())
    }
}

impl From<u32> for IoctlCmd {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

const NR_SHIFT: u32 = 0;
const KIND_SHIFT: u32 = 8;
const SIZE_SHIFT: u32 = 16;
const DIR_SHIFT: u32 = 30;
const SIZE_MASK: u32 = (1 << 14) - 1;

#[must_use]
pub const fn ioc(dir: IoctlDir, kind: u8, nr: u8, size: u32) -> u32 {
    ((dir.bits() as u32) << DIR_SHIFT)
        | ((size & SIZE_MASK) << SIZE_SHIFT)
        | ((kind as u32) << KIND_SHIFT)
        | ((nr as u32) << NR_SHIFT)
}

#[must_use]
pub const fn io(kind: u8, nr: u8) -> u32 {
    ioc(IoctlDir::NONE, kind, nr, 0)
}

#[must_use]
pub const fn ior(kind: u8, nr: u8, size: u32) -> u32 {
    ioc(IoctlDir::READ, kind, nr, size)
}

#[must_use]
pub const fn iow(kind: u8, nr: u8, size: u32) -> u32 {
    ioc(IoctlDir::WRITE, kind, nr, size)
}

#[must_use]
pub const fn iowr(kind: u8, nr: u8, size: u32) -> u32 {
    ioc(IoctlDir::READ.union(IoctlDir::WRITE), kind, nr, size)
}
