use serde::{Deserialize, Serialize};

/// The kind of memory reference made by the processor.
///
/// Each access kind carries the numeric code the hardware reports in the
/// upper bits of the MMU fault code register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AccessKind {
    /// Move translated word (also used for diagnostic examine/deposit).
    MoveTranslated = 0,

    /// Support processor write.
    SupportProcessorWrite = 1,

    /// Support processor fetch.
    SupportProcessorFetch = 3,

    /// Interlocked read (read-modify-write cycle).
    InterlockedRead = 7,

    /// Read of an operand that is about to be written back.
    ReadWrite = 8,

    /// Write.
    Write = 9,

    /// Address fetch.
    AddressFetch = 10,

    /// Operand fetch.
    OperandFetch = 11,

    /// Instruction fetch after a discontinuity (jump, call, return).
    InstructionFetchAfterDiscontinuity = 12,

    /// Instruction fetch.
    InstructionFetch = 13,
}

impl AccessKind {
    /// Returns the 4-bit hardware code of the access kind.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Checks if the access is an instruction fetch of either flavour.
    pub fn is_instruction_fetch(self) -> bool {
        matches!(
            self,
            Self::InstructionFetch | Self::InstructionFetchAfterDiscontinuity
        )
    }

    /// Checks if the access may modify memory, i.e. a write or the read
    /// half of an interlocked read-modify-write cycle.
    pub fn is_write_like(self) -> bool {
        matches!(self, Self::Write | Self::InterlockedRead)
    }
}

/// Width of a physical memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessWidth {
    /// 8-bit access.
    Byte,

    /// 16-bit access.
    Halfword,

    /// 32-bit access.
    Word,
}

impl AccessWidth {
    /// Returns the width in bits.
    pub fn bits(self) -> u32 {
        match self {
            Self::Byte => 8,
            Self::Halfword => 16,
            Self::Word => 32,
        }
    }

    /// Returns the width in bytes, which is also the required alignment.
    pub fn bytes(self) -> u32 {
        self.bits() / 8
    }
}

impl std::fmt::Display for AccessWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// Processor execution level, taken from the current execution mode field
/// of the PSW. Lower values are more privileged.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ExecutionLevel {
    /// Kernel level.
    #[default]
    Kernel = 0,

    /// Executive level.
    Executive = 1,

    /// Supervisor level.
    Supervisor = 2,

    /// User level.
    User = 3,
}

impl ExecutionLevel {
    /// Returns the 2-bit level number.
    pub fn number(self) -> u8 {
        self as u8
    }
}
