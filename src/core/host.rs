//! Type definition for a physical host whose capacity pool is shared by
//! virtual machines placed on it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Host {
    /// Assigned by the datacenter when the host is added. A value present on
    /// an input template is ignored.
    #[serde(default)]
    pub id: u32,
    /// Number of identical processing elements.
    pub pe_count: u32,
    /// Processing rate of a single processing element, in MIPS.
    pub mips_per_pe: f64,
    pub ram: u64,
    pub bw: u64,
    pub storage: u64,
}

impl Host {
    pub fn new(pe_count: u32, mips_per_pe: f64, ram: u64, bw: u64, storage: u64) -> Self {
        Self {
            id: 0,
            pe_count,
            mips_per_pe,
            ram,
            bw,
            storage,
        }
    }

    pub fn total_mips(&self) -> f64 {
        self.pe_count as f64 * self.mips_per_pe
    }
}
