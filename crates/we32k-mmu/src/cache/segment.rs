use we32k_core::Va;

use super::{CACHE_SIZE, CacheWord, section_slots, slot};
use crate::{
    We32101,
    descriptor::{SegmentDescriptor, SegmentFlags},
};

/// A segment descriptor cache entry, in its hardware word format.
///
/// ```text
/// low:  | access (31..24) | max offset (23..10) | tag (9..0)     |
/// high: | address (31..5)                      | T $ C M P (4..0) |
/// ```
///
/// Only valid, present descriptors are ever cached, and fetching them sets
/// the referenced bit, so those bits are implied rather than stored.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SegmentCacheEntry {
    /// Low entry word.
    pub low: u32,

    /// High entry word.
    pub high: u32,
}

impl SegmentCacheEntry {
    const TAG_MASK: u32 = 0x3ff;
    const STATUS_MASK: u32 = 0x1f;

    /// Builds an entry for a descriptor.
    pub fn new(tag: u32, sd: SegmentDescriptor) -> Self {
        Self {
            low: (sd.sd0 & 0xffff_fc00) | (tag & Self::TAG_MASK),
            high: (sd.sd1 & 0xffff_ffe0) | (sd.sd0 & Self::STATUS_MASK),
        }
    }

    /// Returns the tag of the entry.
    pub fn tag(self) -> u32 {
        self.low & Self::TAG_MASK
    }

    /// Reconstructs the cached descriptor.
    pub fn descriptor(self) -> SegmentDescriptor {
        let implied = (SegmentFlags::VALID | SegmentFlags::REFERENCED).bits();

        SegmentDescriptor {
            sd0: (self.low & 0xffff_fc00) | implied | (self.high & Self::STATUS_MASK),
            sd1: self.high & 0xffff_ffe0,
        }
    }
}

/// Segment descriptor cache.
///
/// Direct mapped, 32 entries, eight per section. The slot is selected by
/// the section id and the three low bits of the segment selector; the
/// remaining ten selector bits are the tag.
#[derive(Debug, Clone)]
pub struct SegmentDescriptorCache {
    entries: [Option<SegmentCacheEntry>; CACHE_SIZE],
}

impl Default for SegmentDescriptorCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentDescriptorCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: [None; CACHE_SIZE],
        }
    }

    fn slot(va: Va) -> usize {
        slot(We32101::section(va), We32101::segment_selector(va))
    }

    fn tag(va: Va) -> u32 {
        We32101::segment_selector(va) >> 3
    }

    /// Looks up the descriptor of the segment `va` belongs to.
    pub fn lookup(&self, va: Va) -> Option<SegmentDescriptor> {
        self.entries[Self::slot(va)]
            .filter(|entry| entry.tag() == Self::tag(va))
            .map(SegmentCacheEntry::descriptor)
    }

    /// Caches the descriptor of the segment `va` belongs to, evicting
    /// whatever occupied the slot.
    pub fn insert(&mut self, va: Va, sd: SegmentDescriptor) {
        let index = Self::slot(va);
        let entry = SegmentCacheEntry::new(Self::tag(va), sd);

        tracing::trace!(%va, index, low = entry.low, high = entry.high, "SD cache fill");
        self.entries[index] = Some(entry);
    }

    /// Mirrors a modified bit write-back into the cached copy, if any.
    pub fn set_modified(&mut self, va: Va) {
        let tag = Self::tag(va);

        if let Some(entry) = &mut self.entries[Self::slot(va)]
            && entry.tag() == tag
        {
            entry.high |= SegmentFlags::MODIFIED.bits();
        }
    }

    /// Invalidates the entry for the segment `va` belongs to.
    pub fn flush_matching(&mut self, va: Va) {
        let index = Self::slot(va);

        if self.entries[index].is_some_and(|entry| entry.tag() == Self::tag(va)) {
            tracing::trace!(%va, index, "SD cache flush");
            self.entries[index] = None;
        }
    }

    /// Invalidates every entry belonging to a section.
    pub fn flush_section(&mut self, section: usize) {
        self.entries[section_slots(section)].fill(None);
    }

    /// Invalidates the whole cache.
    pub fn flush_all(&mut self) {
        self.entries.fill(None);
    }

    /// Returns the entry in a slot.
    pub fn entry(&self, index: usize) -> Option<SegmentCacheEntry> {
        self.entries[index % CACHE_SIZE]
    }

    /// Returns the number of occupied slots.
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    /// Checks if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads a raw entry word. Empty slots read as zero.
    pub fn read_raw(&self, index: usize, word: CacheWord) -> u32 {
        let entry = self.entry(index).unwrap_or_default();

        match word {
            CacheWord::Low => entry.low,
            CacheWord::High => entry.high,
        }
    }

    /// Writes a raw entry word, occupying the slot.
    pub fn write_raw(&mut self, index: usize, word: CacheWord, value: u32) {
        let slot = &mut self.entries[index % CACHE_SIZE];
        let entry = slot.get_or_insert_default();

        match word {
            CacheWord::Low => entry.low = value,
            CacheWord::High => entry.high = value,
        }
    }
}
