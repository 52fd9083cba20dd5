use log::{info, warn};

use crate::{PhysAddr, RegisterAddressTable, RegisterRole};

/// A register a board file describes in its platform data.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PlatformPin<'a> {
    pub name: &'a str,
    pub mode: &'a str,
    pub addr: u64,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResourceKind {
    Mem,
    Irq,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Resource {
    pub kind: ResourceKind,
    pub start: u64,
    pub end: u64,
}

/// The hardware description a platform device carries: mode-setting
/// registers as named platform data, the output register as a memory
/// resource and the pin number as an interrupt-typed resource.
#[derive(Debug, Copy, Clone)]
pub struct PlatformDevice<'a> {
    pub name: &'a str,
    pub pins: &'a [PlatformPin<'a>],
    pub resources: &'a [Resource],
}

impl PlatformDevice<'_> {
    #[must_use]
    pub fn resource(&self, kind: ResourceKind, index: usize) -> Option<&Resource> {
        self.resources.iter().filter(|r| r.kind == kind).nth(index)
    }
}

impl RegisterAddressTable {
    /// Builds a table out of a platform device.
    ///
    /// Pins with unknown names or unusable addresses are skipped. The output
    /// register is only taken if the device's pin resource names `pin`.
    /// Anything left out shows up as a missing role once the registers are
    /// mapped.
    #[must_use]
    pub fn from_platform_device(device: &PlatformDevice<'_>, pin: u8) -> Self {
        let mut table = Self::new();

        for p in device.pins {
            let Some(role) = RegisterRole::from_platform_name(p.name) else {
                warn!("{}: unknown platform pin {}", device.name, p.name);
                continue;
            };
            match PhysAddr::try_new(p.addr) {
                Ok(addr) => {
                    info!("{}: {role} ({}) at {addr}", device.name, p.mode);
                    table.insert(role, addr);
                }
                Err(e) => warn!("{}: {role}: {e}", device.name),
            }
        }

        let irq = device.resource(ResourceKind::Irq, 0);
        let mem = device.resource(ResourceKind::Mem, 0);
        match (irq, mem) {
            (Some(irq), Some(mem)) if irq.start == u64::from(pin) => {
                match PhysAddr::try_new(mem.start) {
                    Ok(addr) => {
                        table.insert(RegisterRole::BitSetReset, addr);
                    }
                    Err(e) => warn!("{}: {}: {e}", device.name, RegisterRole::BitSetReset),
                }
            }
            (Some(irq), Some(_)) => {
                warn!(
                    "{}: pin resource {} does not match pin {pin}",
                    device.name, irq.start
                );
            }
            _ => warn!("{}: missing pin or memory resource", device.name),
        }

        table
    }
}
