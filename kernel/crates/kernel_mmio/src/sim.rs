//! An in-memory register bank that stands in for device memory on a host.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use core::ptr::NonNull;
use core::sync::atomic::Ordering::Relaxed;
use core::sync::atomic::{AtomicU32, AtomicUsize};

use crate::{IoMapper, MapError, PhysAddr, RegisterAddressTable};

/// A sparse set of 32-bit registers keyed by physical address.
///
/// Every register starts out as zero. The bank counts how often it was
/// mapped and unmapped so callers can check that each mapping is released
/// exactly once.
pub struct SimulatedBank {
    words: BTreeMap<PhysAddr, Box<AtomicU32>>,
    unmappable: Option<PhysAddr>,
    maps: AtomicUsize,
    unmaps: AtomicUsize,
}

impl SimulatedBank {
    pub fn new(addresses: impl IntoIterator<Item = PhysAddr>) -> Self {
        Self {
            words: addresses
                .into_iter()
                .map(|addr| (addr, Box::new(AtomicU32::new(0))))
                .collect(),
            unmappable: None,
            maps: AtomicUsize::new(0),
            unmaps: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn for_table(table: &RegisterAddressTable) -> Self {
        Self::new(table.iter().map(|(_, addr)| addr))
    }

    /// Makes every attempt to map `addr` fail.
    #[must_use]
    pub fn with_unmappable(mut self, addr: PhysAddr) -> Self {
        self.unmappable = Some(addr);
        self
    }

    #[must_use]
    pub fn peek(&self, addr: PhysAddr) -> Option<u32> {
        self.words.get(&addr).map(|w| w.load(Relaxed))
    }

    pub fn poke(&self, addr: PhysAddr, value: u32) -> bool {
        self.words
            .get(&addr)
            .map(|w| w.store(value, Relaxed))
            .is_some()
    }

    #[must_use]
    pub fn map_count(&self) -> usize {
        self.maps.load(Relaxed)
    }

    #[must_use]
    pub fn unmap_count(&self) -> usize {
        self.unmaps.load(Relaxed)
    }

    #[must_use]
    pub fn live_mappings(&self) -> usize {
        self.map_count() - self.unmap_count()
    }
}

impl IoMapper for SimulatedBank {
    fn map(&self, phys: PhysAddr, len: usize) -> Result<NonNull<u8>, MapError> {
        if self.unmappable == Some(phys) {
            return Err(MapError::Rejected(phys));
        }
        if len > size_of::<u32>() {
            return Err(MapError::OutOfRange(phys));
        }
        let word = self.words.get(&phys).ok_or(MapError::OutOfRange(phys))?;
        let ptr = NonNull::new(word.as_ptr().cast::<u8>()).ok_or(MapError::Rejected(phys))?;
        self.maps.fetch_add(1, Relaxed);
        Ok(ptr)
    }

    unsafe fn unmap(&self, _virt: NonNull<u8>, _len: usize) {
        self.unmaps.fetch_add(1, Relaxed);
    }
}
