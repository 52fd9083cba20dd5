use crate::{PhysAddr, RegisterAddressTable, RegisterRole, ResolveError};

const STATUS_OKAY: &str = "okay";

/// The properties of a device tree node this driver binds to.
///
/// `reg` holds one `<address size>` pair per [`RegisterRole`], in
/// [`RegisterRole::ALL`] order.
#[derive(Debug, Copy, Clone)]
pub struct DeviceTreeNode<'a> {
    pub compatible: &'a str,
    pub status: &'a str,
    pub reg: &'a [u64],
}

impl RegisterAddressTable {
    /// # Errors
    /// Returns an error if the node is for a different device, is disabled,
    /// or its `reg` property does not describe one usable 32-bit window per
    /// register.
    pub fn from_device_tree(
        node: &DeviceTreeNode<'_>,
        compatible: &str,
    ) -> Result<Self, ResolveError> {
        if node.compatible != compatible {
            return Err(ResolveError::Incompatible);
        }
        if node.status != STATUS_OKAY {
            return Err(ResolveError::Disabled);
        }

        let expected = RegisterRole::COUNT * 2;
        if node.reg.len() != expected {
            return Err(ResolveError::RegLength {
                expected,
                found: node.reg.len(),
            });
        }

        let mut table = Self::new();
        for (role, cells) in RegisterRole::ALL.into_iter().zip(node.reg.chunks_exact(2)) {
            let (addr, size) = (cells[0], cells[1]);
            if size < size_of::<u32>() as u64 {
                return Err(ResolveError::RegSize { role, size });
            }
            let addr = PhysAddr::try_new(addr)
                .map_err(|source| ResolveError::InvalidAddress { role, source })?;
            table.insert(role, addr);
        }
        Ok(table)
    }
}
