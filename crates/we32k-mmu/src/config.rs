use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// MMU configuration register.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Configuration: u32 {
        /// Update the modified bit of descriptors on writes.
        const MODIFIED = 1 << 0;

        /// Update the referenced bit of descriptors on fetch.
        const REFERENCED = 1 << 1;

        /// Enable the descriptor caches.
        const CACHE = 1 << 2;
    }
}

impl Configuration {
    /// Mask of the implemented register bits.
    pub const MASK: u32 = 0x7;

    /// Creates a configuration from a raw register value, discarding
    /// unimplemented bits.
    pub fn from_register(value: u32) -> Self {
        Self::from_bits_truncate(value & Self::MASK)
    }
}

/// Emulation options that have no hardware register.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MmuOptions {
    /// Flush the descriptor caches of a section when its length register
    /// (SRAMB) is written. Writing the base register (SRAMA) always flushes.
    pub flush_on_section_length_write: bool,
}

impl MmuOptions {
    /// Sets whether section length writes flush the descriptor caches.
    pub fn with_flush_on_section_length_write(self, flush: bool) -> Self {
        Self {
            flush_on_section_length_write: flush,
        }
    }
}
