use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt::{Display, Formatter};
use core::ptr::NonNull;

use log::{debug, trace};
use volatile::VolatilePtr;

use crate::{IoMapper, MapError, PhysAddr, RegisterAddressTable, ResolveError};

const REGISTER_WIDTH: usize = size_of::<u32>();

/// The registers the LED pin needs, in the order they are configured.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RegisterRole {
    ClockEnable,
    Mode,
    OutputType,
    Speed,
    Pull,
    BitSetReset,
}

impl RegisterRole {
    pub const COUNT: usize = 6;

    pub const ALL: [RegisterRole; Self::COUNT] = [
        RegisterRole::ClockEnable,
        RegisterRole::Mode,
        RegisterRole::OutputType,
        RegisterRole::Speed,
        RegisterRole::Pull,
        RegisterRole::BitSetReset,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The name a board file uses for this register in its platform data.
    #[must_use]
    pub const fn platform_name(self) -> &'static str {
        match self {
            RegisterRole::ClockEnable => "MPU_AHB4_PERIPH_RCC_PI",
            RegisterRole::Mode => "GPIOI_MODER_PI",
            RegisterRole::OutputType => "GPIOI_OTYPER_PI",
            RegisterRole::Speed => "GPIOI_OSPEEDR_PI",
            RegisterRole::Pull => "GPIOI_PUPDR_PI",
            RegisterRole::BitSetReset => "GPIOI_BSRR_PI",
        }
    }

    #[must_use]
    pub fn from_platform_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.platform_name() == name)
    }
}

impl Display for RegisterRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.pad(self.platform_name())
    }
}

/// A contiguous run of bits inside a 32-bit register.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Field {
    shift: u8,
    width: u8,
}

impl Field {
    #[must_use]
    pub const fn new(shift: u8, width: u8) -> Self {
        assert!(width > 0 && shift as u32 + width as u32 <= 32);
        Self { shift, width }
    }

    #[must_use]
    pub const fn bit(shift: u8) -> Self {
        Self::new(shift, 1)
    }

    #[must_use]
    pub const fn mask(self) -> u32 {
        (u32::MAX >> (32 - self.width as u32)) << self.shift
    }

    #[must_use]
    pub const fn place(self, value: u32) -> u32 {
        (value << self.shift) & self.mask()
    }
}

/// An exclusively owned mapping of one 32-bit device register.
///
/// The mapping is created by [`Mmio32::map`] and released exactly once when
/// the handle is dropped. The handle is neither `Copy` nor `Clone`, so no
/// access can outlive the mapping.
pub struct Mmio32 {
    role: RegisterRole,
    phys: PhysAddr,
    virt: NonNull<u32>,
    mapper: Arc<dyn IoMapper>,
}

// The mapping is owned by exactly one handle, moving it to another thread
// moves the only way to reach the register.
unsafe impl Send for Mmio32 {}

impl Mmio32 {
    /// # Errors
    /// Returns an error if the mapper cannot map the register or hands back a
    /// window that is not suitably aligned for 32-bit accesses.
    pub fn map(
        role: RegisterRole,
        phys: PhysAddr,
        mapper: Arc<dyn IoMapper>,
    ) -> Result<Self, MapError> {
        let virt = mapper.map(phys, REGISTER_WIDTH)?;
        if virt.as_ptr().align_offset(align_of::<u32>()) != 0 {
            unsafe {
                // SAFETY: we just mapped it and never handed it out
                mapper.unmap(virt, REGISTER_WIDTH);
            }
            return Err(MapError::Rejected(phys));
        }
        debug!("mapped {role} at {phys}");
        Ok(Self {
            role,
            phys,
            virt: virt.cast(),
            mapper,
        })
    }

    #[must_use]
    pub fn role(&self) -> RegisterRole {
        self.role
    }

    fn ptr(&self) -> VolatilePtr<'_, u32> {
        unsafe {
            // SAFETY: `virt` stays mapped until `self` is dropped
            VolatilePtr::new(self.virt)
        }
    }

    #[must_use]
    pub fn read(&self) -> u32 {
        self.ptr().read()
    }

    pub fn write(&self, value: u32) {
        self.ptr().write(value);
    }

    /// Read-modify-write: clears `field`, then sets it to `value`.
    /// Bits outside of `field` are written back unchanged.
    pub fn modify(&self, field: Field, value: u32) {
        let old = self.read();
        let new = (old & !field.mask()) | field.place(value);
        trace!("{}: {old:#010x} -> {new:#010x}", self.role);
        self.write(new);
    }
}

impl Drop for Mmio32 {
    fn drop(&mut self) {
        unsafe {
            // SAFETY: the window came from this mapper and this is the only
            // place that releases it
            self.mapper.unmap(self.virt.cast(), REGISTER_WIDTH);
        }
        debug!("unmapped {} at {}", self.role, self.phys);
    }
}

/// One mapped handle per [`RegisterRole`].
pub struct RegisterSet {
    registers: Vec<Mmio32>,
}

impl RegisterSet {
    /// Resolves every role in `table` and maps it.
    ///
    /// All addresses are resolved before the first mapping is attempted. If
    /// any role is missing or cannot be mapped, every mapping made so far is
    /// released again and nothing is returned.
    ///
    /// # Errors
    /// Returns an error naming the first role that could not be resolved or
    /// mapped.
    pub fn map(
        table: &RegisterAddressTable,
        mapper: &Arc<dyn IoMapper>,
    ) -> Result<Self, ResolveError> {
        let resolved = RegisterRole::ALL
            .into_iter()
            .map(|role| {
                table
                    .get(role)
                    .map(|phys| (role, phys))
                    .ok_or(ResolveError::Missing(role))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let registers = resolved
            .into_iter()
            .map(|(role, phys)| {
                Mmio32::map(role, phys, mapper.clone())
                    .map_err(|source| ResolveError::Map { role, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { registers })
    }

    #[must_use]
    pub fn get(&self, role: RegisterRole) -> &Mmio32 {
        &self.registers[role.index()]
    }
}
