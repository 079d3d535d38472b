use we32k_core::{AccessKind, ExecutionLevel, Pa};

bitflags::bitflags! {
    /// Status bits in the first word of a segment descriptor.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct SegmentFlags: u32 {
        /// P: the segment (or its page descriptor table) is present.
        const PRESENT = 1 << 0;

        /// M: the segment has been written to.
        const MODIFIED = 1 << 1;

        /// C: the segment is contiguous (as opposed to paged).
        const CONTIGUOUS = 1 << 2;

        /// $: the descriptor may be cached.
        const CACHEABLE = 1 << 3;

        /// T: references to the segment raise an object trap.
        const OBJECT_TRAP = 1 << 4;

        /// R: the segment has been referenced.
        const REFERENCED = 1 << 5;

        /// V: the descriptor is valid.
        const VALID = 1 << 6;

        /// I: the descriptor points to another descriptor.
        const INDIRECT = 1 << 7;
    }
}

bitflags::bitflags! {
    /// Status bits of a page descriptor.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct PageFlags: u32 {
        /// P: the page is present.
        const PRESENT = 1 << 0;

        /// M: the page has been written to.
        const MODIFIED = 1 << 1;

        /// L: the page is the last page of its segment.
        const LAST = 1 << 2;

        /// W: writes to the page raise a page write fault.
        const WRITE_FAULT = 1 << 4;

        /// R: the page has been referenced.
        const REFERENCED = 1 << 5;
    }
}

/// What an execution level may do with a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// No access at all.
    None,

    /// Instruction fetches only.
    ExecuteOnly,

    /// Reads and instruction fetches.
    ReadExecute,

    /// Unrestricted access.
    ReadWriteExecute,
}

impl Permission {
    /// Checks if the permission allows the given access.
    pub fn allows(self, access: AccessKind) -> bool {
        match self {
            Self::None => false,
            Self::ExecuteOnly => access.is_instruction_fetch(),
            Self::ReadExecute => matches!(
                access,
                AccessKind::AddressFetch
                    | AccessKind::OperandFetch
                    | AccessKind::InstructionFetch
                    | AccessKind::InstructionFetchAfterDiscontinuity
                    | AccessKind::MoveTranslated
            ),
            Self::ReadWriteExecute => true,
        }
    }
}

/// Access rights byte of a segment descriptor.
///
/// Holds one 2-bit permission per execution level, the kernel level in the
/// most significant pair.
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub struct AccessRights(pub u8);

impl AccessRights {
    /// Full access for every execution level.
    pub const ALL: Self = Self(0xff);

    /// Returns the permission granted to an execution level.
    pub fn permission(self, level: ExecutionLevel) -> Permission {
        let shift = (3 - level.number()) * 2;

        match (self.0 >> shift) & 0b11 {
            0 => Permission::None,
            1 => Permission::ExecuteOnly,
            2 => Permission::ReadExecute,
            _ => Permission::ReadWriteExecute,
        }
    }

    /// Checks if an execution level may perform the given access.
    pub fn allows(self, level: ExecutionLevel, access: AccessKind) -> bool {
        self.permission(level).allows(access)
    }
}

impl std::fmt::Debug for AccessRights {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("AccessRights")
            .field("kernel", &self.permission(ExecutionLevel::Kernel))
            .field("executive", &self.permission(ExecutionLevel::Executive))
            .field("supervisor", &self.permission(ExecutionLevel::Supervisor))
            .field("user", &self.permission(ExecutionLevel::User))
            .finish()
    }
}

/// A segment descriptor.
///
/// Segment descriptors are two words long. The first word holds the access
/// rights, the maximum offset and the status bits; the second word holds
/// the base address of a contiguous segment, or the address of the page
/// descriptor table of a paged segment.
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub struct SegmentDescriptor {
    /// First descriptor word.
    pub sd0: u32,

    /// Second descriptor word.
    pub sd1: u32,
}

impl SegmentDescriptor {
    /// Creates a descriptor from its two words.
    pub fn new(sd0: u32, sd1: u32) -> Self {
        Self { sd0, sd1 }
    }

    /// Returns the status bits.
    pub fn flags(self) -> SegmentFlags {
        SegmentFlags::from_bits_truncate(self.sd0)
    }

    /// Checks if the segment (or its page descriptor table) is present.
    pub fn present(self) -> bool {
        self.flags().contains(SegmentFlags::PRESENT)
    }

    /// Checks if the segment has been written to.
    pub fn modified(self) -> bool {
        self.flags().contains(SegmentFlags::MODIFIED)
    }

    /// Checks if the segment is contiguous. A segment that is not contiguous
    /// is paged.
    pub fn contiguous(self) -> bool {
        self.flags().contains(SegmentFlags::CONTIGUOUS)
    }

    /// Checks if the descriptor may be cached.
    pub fn cacheable(self) -> bool {
        self.flags().contains(SegmentFlags::CACHEABLE)
    }

    /// Checks if references to the segment raise an object trap.
    pub fn object_trap(self) -> bool {
        self.flags().contains(SegmentFlags::OBJECT_TRAP)
    }

    /// Checks if the segment has been referenced.
    pub fn referenced(self) -> bool {
        self.flags().contains(SegmentFlags::REFERENCED)
    }

    /// Checks if the descriptor is valid.
    pub fn valid(self) -> bool {
        self.flags().contains(SegmentFlags::VALID)
    }

    /// Checks if the descriptor is indirect.
    pub fn indirect(self) -> bool {
        self.flags().contains(SegmentFlags::INDIRECT)
    }

    /// Returns the access rights.
    pub fn access(self) -> AccessRights {
        AccessRights((self.sd0 >> 24) as u8)
    }

    /// Returns the raw maximum offset field, in units of 8 bytes.
    pub fn max_offset_field(self) -> u32 {
        (self.sd0 >> 10) & 0x3fff
    }

    /// Returns the largest valid byte offset into the segment. For paged
    /// segments this also bounds the page descriptor table.
    pub fn max_offset(self) -> u32 {
        self.max_offset_field() * 8 + 7
    }

    /// Returns the base address of a contiguous segment, or the address of
    /// the page descriptor table of a paged segment.
    pub fn address(self) -> Pa {
        Pa(self.sd1 & 0xffff_ffe0)
    }
}

impl std::fmt::Debug for SegmentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("SegmentDescriptor")
            .field("access", &self.access())
            .field("max_offset", &self.max_offset())
            .field("flags", &self.flags())
            .field("address", &self.address())
            .finish()
    }
}

/// A page descriptor.
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub struct PageDescriptor(pub u32);

impl PageDescriptor {
    /// Returns the status bits.
    pub fn flags(self) -> PageFlags {
        PageFlags::from_bits_truncate(self.0)
    }

    /// Checks if the page is present.
    pub fn present(self) -> bool {
        self.flags().contains(PageFlags::PRESENT)
    }

    /// Checks if the page has been written to.
    pub fn modified(self) -> bool {
        self.flags().contains(PageFlags::MODIFIED)
    }

    /// Checks if this is the last page of the segment.
    pub fn last(self) -> bool {
        self.flags().contains(PageFlags::LAST)
    }

    /// Checks if writes to the page raise a page write fault.
    pub fn write_fault(self) -> bool {
        self.flags().contains(PageFlags::WRITE_FAULT)
    }

    /// Checks if the page has been referenced.
    pub fn referenced(self) -> bool {
        self.flags().contains(PageFlags::REFERENCED)
    }

    /// Returns the physical base address of the page.
    pub fn address(self) -> Pa {
        Pa(self.0 & 0xffff_f800)
    }
}

impl std::fmt::Debug for PageDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("PageDescriptor")
            .field("flags", &self.flags())
            .field("address", &self.address())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_descriptor_fields() {
        let sd = SegmentDescriptor::new(0xf0_000a_6d, 0x0200_2013);

        assert_eq!(sd.access(), AccessRights(0xf0));
        assert_eq!(sd.max_offset_field(), 2);
        assert!(sd.present());
        assert!(!sd.modified());
        assert!(sd.contiguous());
        assert!(sd.cacheable());
        assert!(!sd.object_trap());
        assert!(sd.referenced());
        assert!(sd.valid());
        assert!(!sd.indirect());
        assert_eq!(sd.address(), Pa(0x0200_2000));
    }

    #[test]
    fn max_offset_is_in_double_words() {
        let sd = SegmentDescriptor::new(10 << 10, 0);
        assert_eq!(sd.max_offset(), 0x57);
    }

    #[test]
    fn page_descriptor_fields() {
        let pd = PageDescriptor(0x0200_4835);

        assert!(pd.present());
        assert!(!pd.modified());
        assert!(pd.last());
        assert!(pd.write_fault());
        assert!(pd.referenced());
        assert_eq!(pd.address(), Pa(0x0200_4800));
    }

    #[test]
    fn access_rights_per_level() {
        // kernel: rwx, executive: rx, supervisor: x, user: none
        let rights = AccessRights(0b11_10_01_00);

        assert!(rights.allows(ExecutionLevel::Kernel, AccessKind::Write));
        assert!(rights.allows(ExecutionLevel::Executive, AccessKind::OperandFetch));
        assert!(!rights.allows(ExecutionLevel::Executive, AccessKind::Write));
        assert!(!rights.allows(ExecutionLevel::Executive, AccessKind::ReadWrite));
        assert!(rights.allows(ExecutionLevel::Supervisor, AccessKind::InstructionFetch));
        assert!(!rights.allows(ExecutionLevel::Supervisor, AccessKind::OperandFetch));
        assert!(!rights.allows(ExecutionLevel::User, AccessKind::InstructionFetch));
    }
}
