//! WE32101 memory management unit.
//!
//! The MMU translates the virtual addresses produced by the WE32100 into
//! physical addresses. A virtual address is split into four fields:
//!
//! ```text
//!  31  30 29                 17 16          11 10            0
//! +------+---------------------+--------------+---------------+
//! | SID  |         SSL         |     PSL      |      POT      |
//! +------+---------------------+--------------+---------------+
//!                              |             SOT              |
//!                              +------------------------------+
//! ```
//!
//! The section id (SID) selects one of four sections, each described by a
//! pair of section RAM registers. The segment selector (SSL) indexes the
//! section's segment descriptor table. Contiguous segments are addressed by
//! the segment offset (SOT); paged segments split it further into a page
//! selector (PSL) and a page offset (POT).

mod cache;
mod config;
mod descriptor;
mod mmu;
mod registers;
mod translation;


use we32k_core::Va;

pub use self::{
    cache::{
        CACHE_SIZE, CacheWord, PageCacheEntry, PageDescriptorCache, PageWay, SegmentCacheEntry,
        SegmentDescriptorCache,
    },
    config::{Configuration, MmuOptions},
    descriptor::{
        AccessRights, PageDescriptor, PageFlags, Permission, SegmentDescriptor, SegmentFlags,
    },
    mmu::Mmu,
    registers::{FaultRegisters, MmuRegisters, RegisterGroup, Section},
};

/// WE32101 address layout.
#[derive(Debug)]
pub struct We32101;

impl We32101 {
    /// Number of sections.
    pub const SECTIONS: usize = 4;

    /// Size of a page in bytes.
    pub const PAGE_SIZE: u32 = 0x800;

    /// The number of bits to shift when converting between page numbers and
    /// addresses.
    pub const PAGE_SHIFT: u32 = 11;

    /// Size of a segment descriptor in bytes.
    pub const SD_SIZE: u32 = 8;

    /// Size of a page descriptor in bytes.
    pub const PD_SIZE: u32 = 4;

    /// Returns the section id (SID) of a virtual address.
    pub fn section(va: Va) -> usize {
        ((va.0 >> 30) & 0b11) as usize
    }

    /// Returns the segment selector (SSL) of a virtual address.
    pub fn segment_selector(va: Va) -> u32 {
        (va.0 >> 17) & 0x1fff
    }

    /// Returns the segment offset (SOT) of a virtual address.
    pub fn segment_offset(va: Va) -> u32 {
        va.0 & 0x1_ffff
    }

    /// Returns the page selector (PSL) of a virtual address.
    pub fn page_selector(va: Va) -> u32 {
        (va.0 >> Self::PAGE_SHIFT) & 0x3f
    }

    /// Returns the page offset (POT) of a virtual address.
    pub fn page_offset(va: Va) -> u32 {
        va.0 & (Self::PAGE_SIZE - 1)
    }

    /// Builds a virtual address out of its fields.
    pub fn va(section: usize, ssl: u32, sot: u32) -> Va {
        Va(((section as u32 & 0b11) << 30) | ((ssl & 0x1fff) << 17) | (sot & 0x1_ffff))
    }
}
