//! Segment and page descriptor caches.
//!
//! Both caches are small, fixed-size arrays of optional entries. A slot is
//! selected by the section id and the low bits of a selector field of the
//! virtual address; the remaining selector bits form the tag stored with
//! the entry. Invalidation clears slots back to `None`.
//!
//! The caches never touch memory or registers. The raw entry words are
//! exposed through the MMU register block for diagnostics.

mod page;
mod segment;

pub use self::{
    page::{PageCacheEntry, PageDescriptorCache, PageWay},
    segment::{SegmentCacheEntry, SegmentDescriptorCache},
};
use crate::We32101;

/// Number of slots (sets, for the page cache) in a descriptor cache.
pub const CACHE_SIZE: usize = 32;

/// Number of slots belonging to a single section.
const SLOTS_PER_SECTION: usize = CACHE_SIZE / We32101::SECTIONS;

/// One of the two words of a raw cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheWord {
    /// Low word: access rights and tag.
    Low,

    /// High word: address and status bits.
    High,
}

/// Returns the slots belonging to a section.
fn section_slots(section: usize) -> std::ops::Range<usize> {
    let first = (section % We32101::SECTIONS) * SLOTS_PER_SECTION;
    first..first + SLOTS_PER_SECTION
}

/// Returns the slot for a section and a selector.
fn slot(section: usize, selector: u32) -> usize {
    section * SLOTS_PER_SECTION + (selector as usize & (SLOTS_PER_SECTION - 1))
}
