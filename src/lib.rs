//! WE32100 system emulation.
//!
//! This crate re-exports the member crates of the workspace:
//!
//! - [`we32k_core`]: address types, the error taxonomy, collaborator traits
//!   and the physical memory router.
//! - [`we32k_mmu`]: the WE32101 memory management unit (descriptor caches,
//!   register interface and the address translator).

pub use we32k_core::*;

/// WE32101 memory management unit.
#[cfg(feature = "mmu")]
pub mod mmu {
    pub use we32k_mmu::*;
}
