use thiserror::Error;

use crate::{MapError, PhysAddr, RegisterRole};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum ResolveError {
    #[error("no address for {0}")]
    Missing(RegisterRole),
    #[error("{role}: {source}")]
    Map {
        role: RegisterRole,
        #[source]
        source: MapError,
    },
    #[error("device tree node is not compatible with this driver")]
    Incompatible,
    #[error("device tree node is disabled")]
    Disabled,
    #[error("reg property has {found} cells, expected {expected}")]
    RegLength { expected: usize, found: usize },
    #[error("{role}: register window of {size} bytes is too small")]
    RegSize { role: RegisterRole, size: u64 },
    #[error("{role}: {source}")]
    InvalidAddress {
        role: RegisterRole,
        #[source]
        source: MapError,
    },
}

/// Physical register address per [`RegisterRole`], as discovered by the
/// host (board constants, platform data or a device tree node).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct RegisterAddressTable {
    addresses: [Option<PhysAddr>; RegisterRole::COUNT],
}

// STM32MP157, GPIO bank I and the clock enable register that gates it.
const PERIPH_BASE: u64 = 0x4000_0000;
const MPU_AHB4_PERIPH_BASE: u64 = PERIPH_BASE + 0x1000_0000;
const RCC_BASE: u64 = MPU_AHB4_PERIPH_BASE;
const RCC_MP_AHB4ENSETR: u64 = RCC_BASE + 0xA28;
const GPIOI_BASE: u64 = MPU_AHB4_PERIPH_BASE + 0xA000;
const GPIOI_MODER: u64 = GPIOI_BASE;
const GPIOI_OTYPER: u64 = GPIOI_BASE + 0x04;
const GPIOI_OSPEEDR: u64 = GPIOI_BASE + 0x08;
const GPIOI_PUPDR: u64 = GPIOI_BASE + 0x0C;
const GPIOI_BSRR: u64 = GPIOI_BASE + 0x18;

impl RegisterAddressTable {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            addresses: [None; RegisterRole::COUNT],
        }
    }

    /// The fixed register layout of the STM32MP157 GPIOI bank.
    #[must_use]
    pub const fn stm32mp157_gpioi() -> Self {
        Self {
            addresses: [
                Some(PhysAddr(RCC_MP_AHB4ENSETR)),
                Some(PhysAddr(GPIOI_MODER)),
                Some(PhysAddr(GPIOI_OTYPER)),
                Some(PhysAddr(GPIOI_OSPEEDR)),
                Some(PhysAddr(GPIOI_PUPDR)),
                Some(PhysAddr(GPIOI_BSRR)),
            ],
        }
    }

    pub fn insert(&mut self, role: RegisterRole, addr: PhysAddr) -> Option<PhysAddr> {
        self.addresses[role.index()].replace(addr)
    }

    pub fn remove(&mut self, role: RegisterRole) -> Option<PhysAddr> {
        self.addresses[role.index()].take()
    }

    #[must_use]
    pub fn get(&self, role: RegisterRole) -> Option<PhysAddr> {
        self.addresses[role.index()]
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.addresses.iter().all(Option::is_some)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RegisterRole, PhysAddr)> + '_ {
        RegisterRole::ALL
            .into_iter()
            .filter_map(|role| self.get(role).map(|addr| (role, addr)))
    }
}
