use we32k_core::Va;

use super::{CACHE_SIZE, CacheWord, section_slots, slot};
use crate::{
    We32101,
    descriptor::{AccessRights, PageDescriptor, PageFlags, SegmentDescriptor},
};

/// One of the two ways of a page descriptor cache set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageWay {
    /// Left way.
    Left = 0,

    /// Right way.
    Right = 1,
}

impl PageWay {
    fn other(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// A page descriptor cache entry, in its hardware word format.
///
/// ```text
/// low:  | access (31..24) |          | tag (15..0)         |
/// high: | address (31..11)     | U (10) | W - L M P (4..0) |
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageCacheEntry {
    /// Low entry word.
    pub low: u32,

    /// High entry word.
    pub high: u32,
}

impl PageCacheEntry {
    const TAG_MASK: u32 = 0xffff;
    const DESCRIPTOR_MASK: u32 = 0xffff_f81f;

    /// Set on the most recently filled way of a set.
    const USED: u32 = 1 << 10;

    /// Builds an entry for a page descriptor. The access rights are those
    /// of the owning segment.
    pub fn new(tag: u32, access: AccessRights, pd: PageDescriptor) -> Self {
        Self {
            low: ((access.0 as u32) << 24) | (tag & Self::TAG_MASK),
            high: pd.0 & Self::DESCRIPTOR_MASK,
        }
    }

    /// Returns the tag of the entry.
    pub fn tag(self) -> u32 {
        self.low & Self::TAG_MASK
    }

    /// Returns the access rights inherited from the segment.
    pub fn access(self) -> AccessRights {
        AccessRights((self.low >> 24) as u8)
    }

    /// Reconstructs the cached page descriptor.
    pub fn descriptor(self) -> PageDescriptor {
        PageDescriptor(self.high & Self::DESCRIPTOR_MASK)
    }

    /// Checks if this is the most recently filled way of its set.
    pub fn recently_used(self) -> bool {
        self.high & Self::USED != 0
    }
}

/// Page descriptor cache.
///
/// Two-way set associative with 32 sets, eight per section. The set is
/// selected by the section id and the three low bits of the page selector;
/// the segment selector and the remaining page selector bits form the tag.
/// A fill reuses the way already holding the tag, then an empty way (left
/// first), then the way that was not filled most recently.
#[derive(Debug, Clone)]
pub struct PageDescriptorCache {
    ways: [[Option<PageCacheEntry>; CACHE_SIZE]; 2],
}

impl Default for PageDescriptorCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PageDescriptorCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            ways: [[None; CACHE_SIZE]; 2],
        }
    }

    fn set(va: Va) -> usize {
        slot(We32101::section(va), We32101::page_selector(va))
    }

    fn tag(va: Va) -> u32 {
        (We32101::segment_selector(va) << 3) | (We32101::page_selector(va) >> 3)
    }

    fn find(&self, va: Va) -> Option<PageWay> {
        let (set, tag) = (Self::set(va), Self::tag(va));

        [PageWay::Left, PageWay::Right]
            .into_iter()
            .find(|&way| self.ways[way as usize][set].is_some_and(|entry| entry.tag() == tag))
    }

    /// Looks up the descriptor of the page `va` belongs to, together with
    /// the access rights it inherited from its segment.
    pub fn lookup(&self, va: Va) -> Option<(PageDescriptor, AccessRights)> {
        let way = self.find(va)?;
        let entry = self.ways[way as usize][Self::set(va)]?;
        Some((entry.descriptor(), entry.access()))
    }

    /// Caches the descriptor of the page `va` belongs to.
    pub fn insert(&mut self, va: Va, sd: SegmentDescriptor, pd: PageDescriptor) {
        let set = Self::set(va);
        let way = self.find(va).unwrap_or_else(|| self.victim(set));

        let mut entry = PageCacheEntry::new(Self::tag(va), sd.access(), pd);
        entry.high |= PageCacheEntry::USED;

        tracing::trace!(%va, set, ?way, low = entry.low, high = entry.high, "PD cache fill");
        self.ways[way as usize][set] = Some(entry);

        if let Some(other) = &mut self.ways[way.other() as usize][set] {
            other.high &= !PageCacheEntry::USED;
        }
    }

    fn victim(&self, set: usize) -> PageWay {
        match (self.ways[0][set], self.ways[1][set]) {
            (None, _) => PageWay::Left,
            (_, None) => PageWay::Right,
            (Some(left), _) if !left.recently_used() => PageWay::Left,
            _ => PageWay::Right,
        }
    }

    /// Mirrors a modified bit write-back into the cached copy, if any.
    pub fn set_modified(&mut self, va: Va) {
        if let Some(way) = self.find(va)
            && let Some(entry) = &mut self.ways[way as usize][Self::set(va)]
        {
            entry.high |= PageFlags::MODIFIED.bits();
        }
    }

    /// Invalidates the entry for the page `va` belongs to.
    ///
    /// Both ways of the set are checked, since raw writes may leave the
    /// same tag in each.
    pub fn flush_matching(&mut self, va: Va) {
        let (set, tag) = (Self::set(va), Self::tag(va));

        for way in [PageWay::Left, PageWay::Right] {
            let entry = &mut self.ways[way as usize][set];

            if entry.is_some_and(|entry| entry.tag() == tag) {
                tracing::trace!(%va, ?way, "PD cache flush");
                *entry = None;
            }
        }
    }

    /// Invalidates every entry belonging to a section.
    pub fn flush_section(&mut self, section: usize) {
        for way in &mut self.ways {
            way[section_slots(section)].fill(None);
        }
    }

    /// Invalidates the whole cache.
    pub fn flush_all(&mut self) {
        for way in &mut self.ways {
            way.fill(None);
        }
    }

    /// Returns the entry in a way of a set.
    pub fn entry(&self, way: PageWay, index: usize) -> Option<PageCacheEntry> {
        self.ways[way as usize][index % CACHE_SIZE]
    }

    /// Returns the number of occupied entries.
    pub fn len(&self) -> usize {
        self.ways.iter().flatten().flatten().count()
    }

    /// Checks if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads a raw entry word. Empty entries read as zero.
    pub fn read_raw(&self, way: PageWay, index: usize, word: CacheWord) -> u32 {
        let entry = self.entry(way, index).unwrap_or_default();

        match word {
            CacheWord::Low => entry.low,
            CacheWord::High => entry.high,
        }
    }

    /// Writes a raw entry word, occupying the entry.
    pub fn write_raw(&mut self, way: PageWay, index: usize, word: CacheWord, value: u32) {
        let entry = self.ways[way as usize][index % CACHE_SIZE].get_or_insert_default();

        match word {
            CacheWord::Low => entry.low = value,
            CacheWord::High => entry.high = value,
        }
    }
}
