//! MMU register block.
//!
//! The register block is decoded from the physical address: bits 11..8
//! select a register group and bits 6..2 an index within the group.
//!
//! ```text
//! group  register
//!   0    segment descriptor cache, low words (SDCL)
//!   1    segment descriptor cache, high words (SDCH)
//!   2    page descriptor cache, right way, low words (PDCRL)
//!   3    page descriptor cache, right way, high words (PDCRH)
//!   4    page descriptor cache, left way, low words (PDCLL)
//!   5    page descriptor cache, left way, high words (PDCLH)
//!   6    section RAM A, section base (SRAMA)
//!   7    section RAM B, section length (SRAMB)
//!   8    fault code
//!   9    fault address
//!  10    configuration
//!  11    virtual address (VAR)
//!  12    enable
//! ```
//!
//! Section registers only have four entries; their index is taken modulo
//! four. Reads of the remaining groups return zero and writes are ignored.

use we32k_core::{Pa, Va};

use crate::{
    MmuOptions, We32101,
    cache::{CacheWord, PageDescriptorCache, PageWay, SegmentDescriptorCache},
    config::Configuration,
};

/// Decoded section RAM registers of one section.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    /// Physical address of the segment descriptor table.
    pub base: Pa,

    /// Highest valid segment selector.
    pub length: u32,
}

impl Section {
    /// Decodes the section base out of a SRAMA value.
    pub fn base_from_register(value: u32) -> Pa {
        Pa(value & 0xffff_ffe0)
    }

    /// Decodes the section length out of a SRAMB value.
    pub fn length_from_register(value: u32) -> u32 {
        (value >> 10) & 0x1fff
    }
}

/// Fault code and fault address registers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FaultRegisters {
    /// Fault code register.
    ///
    /// Holds the access kind in bits 10..7, the execution level in bits
    /// 6..5 and the fault code in bits 4..0.
    pub code: u32,

    /// Fault address register.
    pub address: u32,
}

/// A register group of the MMU register block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RegisterGroup {
    /// Segment descriptor cache, low words.
    SegmentCacheLow = 0,

    /// Segment descriptor cache, high words.
    SegmentCacheHigh = 1,

    /// Page descriptor cache, right way, low words.
    PageCacheRightLow = 2,

    /// Page descriptor cache, right way, high words.
    PageCacheRightHigh = 3,

    /// Page descriptor cache, left way, low words.
    PageCacheLeftLow = 4,

    /// Page descriptor cache, left way, high words.
    PageCacheLeftHigh = 5,

    /// Section base registers.
    SectionBase = 6,

    /// Section length registers.
    SectionLength = 7,

    /// Fault code register.
    FaultCode = 8,

    /// Fault address register.
    FaultAddress = 9,

    /// Configuration register.
    Configuration = 10,

    /// Virtual address register.
    VirtualAddress = 11,

    /// Enable register.
    Enable = 12,
}

impl RegisterGroup {
    const ALL: [Self; 13] = [
        Self::SegmentCacheLow,
        Self::SegmentCacheHigh,
        Self::PageCacheRightLow,
        Self::PageCacheRightHigh,
        Self::PageCacheLeftLow,
        Self::PageCacheLeftHigh,
        Self::SectionBase,
        Self::SectionLength,
        Self::FaultCode,
        Self::FaultAddress,
        Self::Configuration,
        Self::VirtualAddress,
        Self::Enable,
    ];

    /// Decodes the register group and index addressed by `pa`.
    ///
    /// Returns `None` for unmapped groups.
    pub fn decode(pa: Pa) -> Option<(Self, usize)> {
        let group = Self::ALL.get(((pa.0 >> 8) & 0xf) as usize).copied()?;
        Some((group, ((pa.0 >> 2) & 0x1f) as usize))
    }

    /// Returns the physical address of a register, relative to the start
    /// of the register block.
    pub fn offset(self, index: usize) -> u32 {
        ((self as u32) << 8) | ((index as u32 & 0x1f) << 2)
    }

    /// Returns the mnemonic of the register group.
    pub fn name(self) -> &'static str {
        REGISTERS[self as usize].name
    }
}

/// Typed accessors of a register group.
struct Accessor {
    name: &'static str,
    read: fn(&MmuRegisters, usize) -> u32,
    write: fn(&mut MmuRegisters, usize, u32, &MmuOptions),
}

/// Accessors, indexed by register group.
const REGISTERS: [Accessor; 13] = [
    Accessor {
        name: "SDCL",
        read: read_sdcl,
        write: write_sdcl,
    },
    Accessor {
        name: "SDCH",
        read: read_sdch,
        write: write_sdch,
    },
    Accessor {
        name: "PDCRL",
        read: read_pdcrl,
        write: write_pdcrl,
    },
    Accessor {
        name: "PDCRH",
        read: read_pdcrh,
        write: write_pdcrh,
    },
    Accessor {
        name: "PDCLL",
        read: read_pdcll,
        write: write_pdcll,
    },
    Accessor {
        name: "PDCLH",
        read: read_pdclh,
        write: write_pdclh,
    },
    Accessor {
        name: "SRAMA",
        read: read_srama,
        write: write_srama,
    },
    Accessor {
        name: "SRAMB",
        read: read_sramb,
        write: write_sramb,
    },
    Accessor {
        name: "FAULT_CODE",
        read: |regs, _| regs.fault.code,
        write: |regs, _, value, _| regs.fault.code = value,
    },
    Accessor {
        name: "FAULT_ADDR",
        read: |regs, _| regs.fault.address,
        write: |regs, _, value, _| regs.fault.address = value,
    },
    Accessor {
        name: "CONF",
        read: |regs, _| regs.conf.bits(),
        write: |regs, _, value, _| regs.conf = Configuration::from_register(value),
    },
    Accessor {
        name: "VAR",
        read: |regs, _| regs.var,
        write: write_var,
    },
    Accessor {
        name: "ENABLE",
        read: |regs, _| regs.enabled as u32,
        write: |regs, _, value, _| regs.enabled = value & 1 != 0,
    },
];

fn read_sdcl(regs: &MmuRegisters, index: usize) -> u32 {
    regs.sd_cache.read_raw(index, CacheWord::Low)
}

fn read_sdch(regs: &MmuRegisters, index: usize) -> u32 {
    regs.sd_cache.read_raw(index, CacheWord::High)
}

fn read_pdcrl(regs: &MmuRegisters, index: usize) -> u32 {
    regs.pd_cache.read_raw(PageWay::Right, index, CacheWord::Low)
}

fn read_pdcrh(regs: &MmuRegisters, index: usize) -> u32 {
    regs.pd_cache.read_raw(PageWay::Right, index, CacheWord::High)
}

fn read_pdcll(regs: &MmuRegisters, index: usize) -> u32 {
    regs.pd_cache.read_raw(PageWay::Left, index, CacheWord::Low)
}

fn read_pdclh(regs: &MmuRegisters, index: usize) -> u32 {
    regs.pd_cache.read_raw(PageWay::Left, index, CacheWord::High)
}

fn read_srama(regs: &MmuRegisters, index: usize) -> u32 {
    regs.srama[index % We32101::SECTIONS]
}

fn read_sramb(regs: &MmuRegisters, index: usize) -> u32 {
    regs.sramb[index % We32101::SECTIONS]
}

fn write_sdcl(regs: &mut MmuRegisters, index: usize, value: u32, _: &MmuOptions) {
    regs.sd_cache.write_raw(index, CacheWord::Low, value);
}

fn write_sdch(regs: &mut MmuRegisters, index: usize, value: u32, _: &MmuOptions) {
    regs.sd_cache.write_raw(index, CacheWord::High, value);
}

fn write_pdcrl(regs: &mut MmuRegisters, index: usize, value: u32, _: &MmuOptions) {
    regs.pd_cache
        .write_raw(PageWay::Right, index, CacheWord::Low, value);
}

fn write_pdcrh(regs: &mut MmuRegisters, index: usize, value: u32, _: &MmuOptions) {
    regs.pd_cache
        .write_raw(PageWay::Right, index, CacheWord::High, value);
}

fn write_pdcll(regs: &mut MmuRegisters, index: usize, value: u32, _: &MmuOptions) {
    regs.pd_cache
        .write_raw(PageWay::Left, index, CacheWord::Low, value);
}

fn write_pdclh(regs: &mut MmuRegisters, index: usize, value: u32, _: &MmuOptions) {
    regs.pd_cache
        .write_raw(PageWay::Left, index, CacheWord::High, value);
}

fn write_srama(regs: &mut MmuRegisters, index: usize, value: u32, _: &MmuOptions) {
    let section = index % We32101::SECTIONS;

    regs.srama[section] = value;
    regs.sections[section].base = Section::base_from_register(value);
    regs.flush_section(section);
}

fn write_sramb(regs: &mut MmuRegisters, index: usize, value: u32, options: &MmuOptions) {
    let section = index % We32101::SECTIONS;

    regs.sramb[section] = value;
    regs.sections[section].length = Section::length_from_register(value);

    if options.flush_on_section_length_write {
        regs.flush_section(section);
    }
}

fn write_var(regs: &mut MmuRegisters, _: usize, value: u32, _: &MmuOptions) {
    regs.var = value;
    regs.sd_cache.flush_matching(Va(value));
    regs.pd_cache.flush_matching(Va(value));
}

/// MMU register state, including the descriptor caches.
#[derive(Debug, Default, Clone)]
pub struct MmuRegisters {
    pub(crate) srama: [u32; We32101::SECTIONS],
    pub(crate) sramb: [u32; We32101::SECTIONS],
    pub(crate) sections: [Section; We32101::SECTIONS],
    pub(crate) fault: FaultRegisters,
    pub(crate) var: u32,
    pub(crate) conf: Configuration,
    pub(crate) enabled: bool,
    pub(crate) sd_cache: SegmentDescriptorCache,
    pub(crate) pd_cache: PageDescriptorCache,
}

impl MmuRegisters {
    /// Returns the decoded registers of a section.
    pub fn section(&self, section: usize) -> Section {
        self.sections[section % We32101::SECTIONS]
    }

    /// Returns the fault registers.
    pub fn fault(&self) -> FaultRegisters {
        self.fault
    }

    /// Returns the virtual address register.
    pub fn var(&self) -> Va {
        Va(self.var)
    }

    /// Returns the configuration register.
    pub fn configuration(&self) -> Configuration {
        self.conf
    }

    /// Checks if address translation is enabled.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the segment descriptor cache.
    pub fn segment_cache(&self) -> &SegmentDescriptorCache {
        &self.sd_cache
    }

    /// Returns the page descriptor cache.
    pub fn page_cache(&self) -> &PageDescriptorCache {
        &self.pd_cache
    }

    /// Reads the register addressed by `pa`.
    pub fn read(&self, pa: Pa) -> u32 {
        let Some((group, index)) = RegisterGroup::decode(pa) else {
            tracing::debug!(%pa, "read from unmapped MMU register");
            return 0;
        };

        let value = (REGISTERS[group as usize].read)(self, index);
        tracing::debug!(register = group.name(), index, value, "MMU register read");
        value
    }

    /// Writes the register addressed by `pa`.
    pub fn write(&mut self, pa: Pa, value: u32, options: &MmuOptions) {
        let Some((group, index)) = RegisterGroup::decode(pa) else {
            tracing::debug!(%pa, value, "write to unmapped MMU register");
            return;
        };

        tracing::debug!(register = group.name(), index, value, "MMU register write");
        (REGISTERS[group as usize].write)(self, index, value, options);
    }

    /// Invalidates the cached descriptors of a section.
    pub(crate) fn flush_section(&mut self, section: usize) {
        tracing::trace!(section, "flushing section");
        self.sd_cache.flush_section(section);
        self.pd_cache.flush_section(section);
    }
}
