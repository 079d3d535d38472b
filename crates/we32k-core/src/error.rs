use crate::{AccessWidth, Pa, Va};

/// An error that can occur while accessing emulated memory.
///
/// Translation faults and bus faults abort the instruction that caused them;
/// the CPU core converts them into a guest exception with
/// [`Error::exception`]. An indirect segment descriptor is not a guest
/// visible condition and stops the simulation instead.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The MMU could not translate a virtual address.
    #[error("MMU fault {fault} at {va}")]
    Fault {
        /// The reason of the fault.
        fault: Fault,

        /// The virtual address being translated.
        va: Va,
    },

    /// A halfword or word access was not naturally aligned.
    #[error("Misaligned {width} access at {pa}")]
    Alignment {
        /// The offending physical address.
        pa: Pa,

        /// The width of the access.
        width: AccessWidth,
    },

    /// The segment descriptor uses indirection, which is not emulated.
    #[error("Indirect segment descriptor for {va} (sd0: {sd0:#010x})")]
    IndirectDescriptor {
        /// The virtual address being translated.
        va: Va,

        /// The first word of the offending descriptor.
        sd0: u32,
    },

    /// Nothing is mapped at the physical address.
    #[error("Non-existent memory at {0}")]
    NonExistentMemory(Pa),

    /// A memory image has an invalid size.
    #[error("Invalid memory image (len: {len}, max: {max})")]
    InvalidImage {
        /// Length of the image in bytes.
        len: usize,

        /// Maximum accepted length in bytes.
        max: usize,
    },
}

/// MMU fault codes, as reported in the low five bits of the fault code
/// register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Fault {
    /// Segment selector beyond the section's descriptor table length.
    SdtLength = 0x3,

    /// Write to a page with the write-fault bit set.
    PageWrite = 0x4,

    /// Page selector beyond the page descriptor table length.
    PdtLength = 0x5,

    /// Segment descriptor not marked valid.
    InvalidSegmentDescriptor = 0x6,

    /// Contiguous segment not present.
    SegmentNotPresent = 0x7,

    /// Object trap.
    ObjectTrap = 0x8,

    /// Page descriptor table of a paged segment not present.
    PdtNotPresent = 0x9,

    /// Page not present.
    PageNotPresent = 0xa,

    /// Access rights violation.
    Access = 0xd,

    /// Offset beyond the segment's maximum offset.
    SegmentOffset = 0xe,
}

impl Fault {
    /// Returns the numeric fault code.
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Self::SdtLength => "SDTLEN",
            Self::PageWrite => "PW",
            Self::PdtLength => "PDTLEN",
            Self::InvalidSegmentDescriptor => "INV_SD",
            Self::SegmentNotPresent => "SEG_NOT_PRES",
            Self::ObjectTrap => "OTRAP",
            Self::PdtNotPresent => "PDT_NOT_PRES",
            Self::PageNotPresent => "PAGE_NOT_PRES",
            Self::Access => "ACC",
            Self::SegmentOffset => "SEG_OFFSET",
        };

        write!(f, "{name} ({:#x})", self.code())
    }
}

/// Exception class delivered to the CPU core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionClass {
    /// Normal exception.
    Normal,
}

/// Exception cause delivered to the CPU core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCause {
    /// External memory fault, raised for MMU and bus faults.
    ExternalMemoryFault,
}

impl Error {
    /// Creates a new translation fault error.
    pub fn fault(fault: Fault, va: impl Into<Va>) -> Self {
        Self::Fault {
            fault,
            va: va.into(),
        }
    }

    /// Returns the translation fault, if this is one.
    pub fn as_fault(&self) -> Option<Fault> {
        match self {
            Self::Fault { fault, .. } => Some(*fault),
            _ => None,
        }
    }

    /// Returns the exception the CPU core must deliver for this error, or
    /// `None` if the error is not guest visible.
    pub fn exception(&self) -> Option<(ExceptionClass, ExceptionCause)> {
        match self {
            Self::Fault { .. } | Self::Alignment { .. } => Some((
                ExceptionClass::Normal,
                ExceptionCause::ExternalMemoryFault,
            )),
            _ => None,
        }
    }

    /// Checks if the error must stop the simulation.
    pub fn is_stop(&self) -> bool {
        matches!(self, Self::IndirectDescriptor { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faults_map_to_external_memory_fault() {
        let err = Error::fault(Fault::SegmentOffset, Va(0x8000_0020));
        assert_eq!(
            err.exception(),
            Some((ExceptionClass::Normal, ExceptionCause::ExternalMemoryFault))
        );
        assert!(!err.is_stop());
        assert_eq!(err.as_fault(), Some(Fault::SegmentOffset));
    }

    #[test]
    fn indirect_descriptor_stops() {
        let err = Error::IndirectDescriptor {
            va: Va(0),
            sd0: 0xc0,
        };
        assert_eq!(err.exception(), None);
        assert!(err.is_stop());
    }

    #[test]
    fn fault_display() {
        assert_eq!(Fault::SdtLength.to_string(), "SDTLEN (0x3)");
        assert_eq!(Fault::SegmentOffset.to_string(), "SEG_OFFSET (0xe)");
    }
}
