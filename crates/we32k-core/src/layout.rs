use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::Pa;

/// Physical address map of the system.
///
/// The defaults describe a 3B2/400 with 4 MiB of main memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryLayout {
    /// Size of the boot ROM, mapped at physical address zero.
    pub rom_size: u32,

    /// Base address of main memory.
    pub ram_base: u32,

    /// Size of main memory in bytes.
    pub ram_size: u32,

    /// Windows routed to the I/O bus.
    pub io: Vec<Range<u32>>,

    /// Window occupied by the MMU's own register block. It must lie inside
    /// one of the I/O windows.
    pub mmu: Range<u32>,
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self {
            rom_size: 0x1_0000,
            ram_base: 0x0200_0000,
            ram_size: 0x40_0000,
            io: vec![0x0004_0000..0x0005_0000, 0x0020_0000..0x0200_0000],
            mmu: 0x0004_0000..0x0004_1000,
        }
    }
}

impl MemoryLayout {
    /// Returns a copy of the layout with a different amount of main memory.
    pub fn with_ram_size(self, ram_size: u32) -> Self {
        Self { ram_size, ..self }
    }

    /// Returns a copy of the layout with a different ROM size.
    pub fn with_rom_size(self, rom_size: u32) -> Self {
        Self { rom_size, ..self }
    }

    /// Checks if the address falls into the boot ROM.
    pub fn is_rom(&self, pa: Pa) -> bool {
        pa.0 < self.rom_size
    }

    /// Checks if the address falls into main memory.
    pub fn is_ram(&self, pa: Pa) -> bool {
        pa.0 >= self.ram_base && pa.0 - self.ram_base < self.ram_size
    }

    /// Checks if the address falls into one of the I/O windows.
    pub fn is_io(&self, pa: Pa) -> bool {
        self.io.iter().any(|window| window.contains(&pa.0))
    }

    /// Checks if the address falls into the MMU register block.
    pub fn is_mmu(&self, pa: Pa) -> bool {
        self.mmu.contains(&pa.0)
    }

    /// Checks if anything at all is mapped at the address.
    pub fn is_mapped(&self, pa: Pa) -> bool {
        self.is_io(pa) || self.is_rom(pa) || self.is_ram(pa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_regions() {
        let layout = MemoryLayout::default();

        assert!(layout.is_rom(Pa(0)));
        assert!(layout.is_rom(Pa(0xfffc)));
        assert!(!layout.is_rom(Pa(0x1_0000)));

        assert!(layout.is_ram(Pa(0x0200_0000)));
        assert!(layout.is_ram(Pa(0x023f_fffc)));
        assert!(!layout.is_ram(Pa(0x0240_0000)));

        assert!(layout.is_io(Pa(0x0004_0000)));
        assert!(layout.is_mmu(Pa(0x0004_0b00)));
        assert!(!layout.is_mmu(Pa(0x0004_1000)));

        assert!(!layout.is_mapped(Pa(0x0300_0000)));
        assert!(!layout.is_mapped(Pa(0xffff_fffc)));
    }

    #[test]
    fn ram_window_at_top_of_address_space() {
        let layout = MemoryLayout {
            ram_base: 0xffff_f000,
            ram_size: 0x1000,
            ..Default::default()
        };

        assert!(layout.is_ram(Pa(0xffff_fffc)));
        assert!(!layout.is_ram(Pa(0xffff_efff)));
    }
}
