//! Core types for WE32100 system emulation.
//!
//! This crate holds everything the memory management unit shares with the
//! rest of the emulated system: address newtypes, access kinds, the error
//! taxonomy, the collaborator traits through which the MMU reaches the I/O
//! space and the processor, and the physical memory router.

mod core;
mod error;
mod layout;
mod memory;
mod platform;

pub use self::{
    core::{AccessKind, AccessWidth, ExecutionLevel, Hex, Pa, Va},
    error::{Error, ExceptionCause, ExceptionClass, Fault},
    layout::MemoryLayout,
    memory::{BusStatus, PhysicalMemory},
    platform::{IoBus, NullIo, Platform},
};
