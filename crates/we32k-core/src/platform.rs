use crate::{AccessWidth, ExecutionLevel, Pa};

/// Memory-mapped I/O space.
///
/// The physical memory router forwards every access that falls into an I/O
/// window to this trait. Devices are free to decode the address and width
/// however they need to; the value of a narrow read is taken from the low
/// bits of the returned word.
pub trait IoBus {
    /// Reads from the device mapped at `pa`.
    fn io_read(&mut self, pa: Pa, width: AccessWidth) -> u32;

    /// Writes to the device mapped at `pa`.
    fn io_write(&mut self, pa: Pa, value: u32, width: AccessWidth);
}

/// The system the MMU is embedded in.
///
/// Besides the I/O space, the MMU needs a view of the processor state: the
/// current execution level drives access right checks and is recorded in
/// the fault code register, and the program counter is used in log
/// messages only.
pub trait Platform: IoBus {
    /// Returns the current execution level of the processor.
    fn execution_level(&self) -> ExecutionLevel;

    /// Returns the program counter of the instruction being executed.
    fn pc(&self) -> u32 {
        0
    }
}

/// An I/O space with nothing attached.
///
/// Reads return zero and writes are discarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIo;

impl IoBus for NullIo {
    fn io_read(&mut self, _pa: Pa, _width: AccessWidth) -> u32 {
        0
    }

    fn io_write(&mut self, _pa: Pa, _value: u32, _width: AccessWidth) {}
}
