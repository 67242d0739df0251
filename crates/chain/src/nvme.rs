// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! NVMe disk address descriptors

use core::fmt;

use serde::{Deserialize, Serialize};

/// PCI address of an NVMe controller
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PciAddress {
    pub domain: u32,
    pub bus: u8,
    pub slot: u8,
    pub function: u8,
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{:x}",
            self.domain, self.bus, self.slot, self.function
        )
    }
}

/// Identifies one namespace of an NVMe disk by controller address
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmeDef {
    /// Namespace identifier within the controller
    pub namespace: u64,
    /// Whether detaching the device from the host is handled for the caller
    pub managed: bool,
    pub pci_addr: PciAddress,
}
