use std::ops::Range;

use we32k_core::{
    AccessKind, AccessWidth, Error, IoBus, MemoryLayout, Pa, PhysicalMemory, Platform, Va,
};

use crate::{MmuOptions, registers::MmuRegisters};

/// WE32101 memory management unit.
///
/// The MMU owns physical memory and its own register state. Everything the
/// physical memory router forwards to the I/O space goes to the platform,
/// except for the MMU register block, which is served here.
///
/// Virtual accesses come in two flavours. The `read_*` and `write_*`
/// methods perform a full translation: descriptor caches are filled,
/// referenced and modified bits are written back, access rights are
/// enforced and faults are recorded in the fault registers. The
/// [`examine`] and [`deposit`] methods are diagnostic: they translate
/// without any side effect.
///
/// [`examine`]: Self::examine
/// [`deposit`]: Self::deposit
pub struct Mmu<P>
where
    P: Platform,
{
    pub(crate) registers: MmuRegisters,
    pub(crate) memory: PhysicalMemory,
    pub(crate) platform: P,
    pub(crate) options: MmuOptions,
    window: Range<u32>,
}

/// Routes I/O accesses either to the MMU register block or to the platform.
struct Bus<'a, P> {
    registers: &'a mut MmuRegisters,
    platform: &'a mut P,
    options: &'a MmuOptions,
    window: &'a Range<u32>,
}

impl<P> IoBus for Bus<'_, P>
where
    P: Platform,
{
    fn io_read(&mut self, pa: Pa, width: AccessWidth) -> u32 {
        if self.window.contains(&pa.0) {
            return self.registers.read(pa);
        }

        self.platform.io_read(pa, width)
    }

    fn io_write(&mut self, pa: Pa, value: u32, width: AccessWidth) {
        if self.window.contains(&pa.0) {
            self.registers.write(pa, value, self.options);
            return;
        }

        self.platform.io_write(pa, value, width);
    }
}

impl<P> Mmu<P>
where
    P: Platform,
{
    /// Creates a disabled MMU with the default memory layout.
    pub fn new(platform: P) -> Self {
        let layout = MemoryLayout::default();

        Self {
            registers: MmuRegisters::default(),
            window: layout.mmu.clone(),
            memory: PhysicalMemory::new(layout),
            platform,
            options: MmuOptions::default(),
        }
    }

    /// Replaces physical memory with zero-filled memory of the given
    /// layout.
    pub fn with_layout(self, layout: MemoryLayout) -> Self {
        Self {
            window: layout.mmu.clone(),
            memory: PhysicalMemory::new(layout),
            ..self
        }
    }

    /// Sets the emulation options.
    pub fn with_options(self, options: MmuOptions) -> Self {
        Self { options, ..self }
    }

    /// Resets the MMU.
    ///
    /// Flushes both descriptor caches and clears every register, leaving
    /// address translation disabled. Memory is left intact.
    pub fn reset(&mut self) {
        tracing::debug!(pc = %self.pc(), "MMU reset");
        self.registers = MmuRegisters::default();
    }

    /// Enables address translation.
    pub fn enable(&mut self) {
        tracing::debug!(pc = %self.pc(), "enabling MMU");
        self.registers.enabled = true;
    }

    /// Disables address translation.
    pub fn disable(&mut self) {
        tracing::debug!(pc = %self.pc(), "disabling MMU");
        self.registers.enabled = false;
    }

    /// Checks if address translation is enabled.
    pub fn is_enabled(&self) -> bool {
        self.registers.enabled
    }

    /// Returns the MMU registers.
    pub fn registers(&self) -> &MmuRegisters {
        &self.registers
    }

    /// Returns the emulation options.
    pub fn options(&self) -> &MmuOptions {
        &self.options
    }

    /// Returns physical memory.
    pub fn memory(&self) -> &PhysicalMemory {
        &self.memory
    }

    /// Returns physical memory.
    pub fn memory_mut(&mut self) -> &mut PhysicalMemory {
        &mut self.memory
    }

    /// Returns the platform.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Returns the platform.
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Reads the MMU register addressed by `pa`.
    pub fn register_read(&self, pa: Pa) -> u32 {
        self.registers.read(pa)
    }

    /// Writes the MMU register addressed by `pa`.
    pub fn register_write(&mut self, pa: Pa, value: u32) {
        self.registers.write(pa, value, &self.options);
    }

    pub(crate) fn pc(&self) -> we32k_core::Hex<u32> {
        we32k_core::Hex(self.platform.pc())
    }

    fn split(&mut self) -> (&mut PhysicalMemory, Bus<'_, P>) {
        let bus = Bus {
            registers: &mut self.registers,
            platform: &mut self.platform,
            options: &self.options,
            window: &self.window,
        };

        (&mut self.memory, bus)
    }

    /// Reads a byte of physical memory.
    pub fn pread_b(&mut self, pa: Pa) -> u8 {
        let (memory, mut bus) = self.split();
        memory.read_byte(pa, &mut bus)
    }

    /// Reads a halfword of physical memory.
    pub fn pread_h(&mut self, pa: Pa) -> Result<u16, Error> {
        let (memory, mut bus) = self.split();
        memory.read_halfword(pa, &mut bus)
    }

    /// Reads a word of physical memory.
    pub fn pread_w(&mut self, pa: Pa) -> Result<u32, Error> {
        let (memory, mut bus) = self.split();
        memory.read_word(pa, &mut bus)
    }

    /// Writes a byte of physical memory.
    pub fn pwrite_b(&mut self, pa: Pa, value: u8) {
        let (memory, mut bus) = self.split();
        memory.write_byte(pa, value, &mut bus);
    }

    /// Writes a halfword of physical memory.
    pub fn pwrite_h(&mut self, pa: Pa, value: u16) -> Result<(), Error> {
        let (memory, mut bus) = self.split();
        memory.write_halfword(pa, value, &mut bus)
    }

    /// Writes a word of physical memory.
    pub fn pwrite_w(&mut self, pa: Pa, value: u32) -> Result<(), Error> {
        let (memory, mut bus) = self.split();
        memory.write_word(pa, value, &mut bus)
    }

    /// Translates a virtual address for an access by the processor.
    ///
    /// On success the virtual address is latched into the virtual address
    /// register. On failure the fault registers describe the fault, and
    /// the processor is expected to deliver the exception returned by
    /// [`Error::exception`].
    pub fn xlate(&mut self, va: Va, access: AccessKind) -> Result<Pa, Error> {
        let pa = self.translate(va, access, true)?;
        self.registers.var = va.0;
        Ok(pa)
    }

    /// Reads a byte of virtual memory.
    pub fn read_b(&mut self, va: Va, access: AccessKind) -> Result<u8, Error> {
        let pa = self.xlate(va, access)?;
        Ok(self.pread_b(pa))
    }

    /// Reads a halfword of virtual memory.
    pub fn read_h(&mut self, va: Va, access: AccessKind) -> Result<u16, Error> {
        let pa = self.xlate(va, access)?;
        self.pread_h(pa)
    }

    /// Reads a word of virtual memory.
    pub fn read_w(&mut self, va: Va, access: AccessKind) -> Result<u32, Error> {
        let pa = self.xlate(va, access)?;
        self.pread_w(pa)
    }

    /// Writes a byte of virtual memory.
    pub fn write_b(&mut self, va: Va, value: u8) -> Result<(), Error> {
        let pa = self.xlate(va, AccessKind::Write)?;
        self.pwrite_b(pa, value);
        Ok(())
    }

    /// Writes a halfword of virtual memory.
    pub fn write_h(&mut self, va: Va, value: u16) -> Result<(), Error> {
        let pa = self.xlate(va, AccessKind::Write)?;
        self.pwrite_h(pa, value)
    }

    /// Writes a word of virtual memory.
    pub fn write_w(&mut self, va: Va, value: u32) -> Result<(), Error> {
        let pa = self.xlate(va, AccessKind::Write)?;
        self.pwrite_w(pa, value)
    }

    /// Fetches an operand byte.
    ///
    /// Unlike [`read_b`], this leaves the virtual address register alone.
    ///
    /// [`read_b`]: Self::read_b
    pub fn read_operand(&mut self, va: Va) -> Result<u8, Error> {
        let pa = self.translate(va, AccessKind::OperandFetch, true)?;
        Ok(self.pread_b(pa))
    }

    /// Reads a byte of virtual memory without side effects.
    ///
    /// # Errors
    ///
    /// Fails with the translation fault, if any, or with
    /// [`Error::NonExistentMemory`] if nothing is mapped at the translated
    /// address.
    pub fn examine(&mut self, va: Va) -> Result<u8, Error> {
        let pa = self.translate(va, AccessKind::MoveTranslated, false)?;

        if !self.memory.layout().is_mapped(pa) {
            return Err(Error::NonExistentMemory(pa));
        }

        Ok(self.pread_b(pa))
    }

    /// Writes a byte of virtual memory without side effects.
    ///
    /// # Errors
    ///
    /// Fails with the translation fault, if any, or with
    /// [`Error::NonExistentMemory`] if the translated address is neither
    /// main memory nor I/O space.
    pub fn deposit(&mut self, va: Va, value: u8) -> Result<(), Error> {
        let pa = self.translate(va, AccessKind::MoveTranslated, false)?;

        let layout = self.memory.layout();
        if !layout.is_ram(pa) && !layout.is_io(pa) {
            return Err(Error::NonExistentMemory(pa));
        }

        self.pwrite_b(pa, value);
        Ok(())
    }
}

impl<P> std::fmt::Debug for Mmu<P>
where
    P: Platform,
{
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Mmu")
            .field("registers", &self.registers)
            .field("memory", &self.memory)
            .field("options", &self.options)
            .finish()
    }
}
