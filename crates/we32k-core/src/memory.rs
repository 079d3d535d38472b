use serde::{Deserialize, Serialize};
use zerocopy::{FromBytes, IntoBytes, byteorder::big_endian::U32};

use crate::{AccessWidth, Error, IoBus, MemoryLayout, Pa};

bitflags::bitflags! {
    /// Sticky bus status bits, mirrored into the system control/status
    /// register by the embedding system.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BusStatus: u16 {
        /// A halfword or word access was not naturally aligned.
        const ALIGNMENT = 0b00000001;
    }
}

/// Physical memory router.
///
/// Maps a physical address to the boot ROM, main memory or the I/O space
/// and performs the access there. The WE32100 is big-endian: the most
/// significant byte of a word lives at the lowest address. ROM and RAM are
/// stored as words and narrower accesses are carved out of the containing
/// word.
///
/// Accesses to unmapped addresses do not fault: reads return zero and
/// writes are discarded.
pub struct PhysicalMemory {
    layout: MemoryLayout,
    rom: Vec<u32>,
    ram: Vec<u32>,
    status: BusStatus,
}

impl PhysicalMemory {
    /// Creates zero-filled ROM and RAM for the given layout.
    pub fn new(layout: MemoryLayout) -> Self {
        let rom = vec![0; layout.rom_size.div_ceil(4) as usize];
        let ram = vec![0; layout.ram_size.div_ceil(4) as usize];

        Self {
            layout,
            rom,
            ram,
            status: BusStatus::empty(),
        }
    }

    /// Returns the physical address map.
    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    /// Returns the sticky bus status bits.
    pub fn status(&self) -> BusStatus {
        self.status
    }

    /// Clears the given bus status bits.
    pub fn clear_status(&mut self, bits: BusStatus) {
        self.status.remove(bits);
    }

    /// Loads a big-endian boot ROM image, starting at physical address zero.
    pub fn load_rom(&mut self, image: &[u8]) -> Result<(), Error> {
        let max = self.rom.len() * size_of::<u32>();
        let invalid = Error::InvalidImage {
            len: image.len(),
            max,
        };

        if image.len() > max {
            return Err(invalid);
        }

        let words = <[U32]>::ref_from_bytes(image).map_err(|_| invalid)?;
        for (slot, word) in self.rom.iter_mut().zip(words) {
            *slot = word.get();
        }

        tracing::debug!(len = image.len(), "loaded boot ROM");
        Ok(())
    }

    /// Returns a big-endian snapshot of main memory.
    pub fn ram_image(&self) -> Vec<u8> {
        let words = self.ram.iter().copied().map(U32::new).collect::<Vec<_>>();
        words.as_bytes().to_vec()
    }

    /// Reads a word.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Alignment`] if `pa` is not 4-byte aligned.
    pub fn read_word(&mut self, pa: Pa, io: &mut impl IoBus) -> Result<u32, Error> {
        self.check_alignment(pa, AccessWidth::Word)?;

        if self.layout.is_io(pa) {
            return Ok(io.io_read(pa, AccessWidth::Word));
        }

        Ok(self.word(pa).unwrap_or(0))
    }

    /// Reads a halfword.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Alignment`] if `pa` is not 2-byte aligned.
    pub fn read_halfword(&mut self, pa: Pa, io: &mut impl IoBus) -> Result<u16, Error> {
        self.check_alignment(pa, AccessWidth::Halfword)?;

        if self.layout.is_io(pa) {
            return Ok(io.io_read(pa, AccessWidth::Halfword) as u16);
        }

        let word = self.word(pa).unwrap_or(0);
        Ok((word >> halfword_shift(pa)) as u16)
    }

    /// Reads a byte. Byte accesses have no alignment requirement.
    pub fn read_byte(&mut self, pa: Pa, io: &mut impl IoBus) -> u8 {
        if self.layout.is_io(pa) {
            return io.io_read(pa, AccessWidth::Byte) as u8;
        }

        let word = self.word(pa).unwrap_or(0);
        (word >> byte_shift(pa)) as u8
    }

    /// Writes a word. Writes to the ROM are discarded.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Alignment`] if `pa` is not 4-byte aligned.
    pub fn write_word(&mut self, pa: Pa, value: u32, io: &mut impl IoBus) -> Result<(), Error> {
        self.check_alignment(pa, AccessWidth::Word)?;

        if self.layout.is_io(pa) {
            io.io_write(pa, value, AccessWidth::Word);
            return Ok(());
        }

        self.update_word(pa, !0, value);
        Ok(())
    }

    /// Writes a halfword. Writes to the ROM are discarded.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Alignment`] if `pa` is not 2-byte aligned.
    pub fn write_halfword(
        &mut self,
        pa: Pa,
        value: u16,
        io: &mut impl IoBus,
    ) -> Result<(), Error> {
        self.check_alignment(pa, AccessWidth::Halfword)?;

        if self.layout.is_io(pa) {
            io.io_write(pa, value as u32, AccessWidth::Halfword);
            return Ok(());
        }

        let shift = halfword_shift(pa);
        self.update_word(pa, 0xffff << shift, (value as u32) << shift);
        Ok(())
    }

    /// Writes a byte. Writes to the ROM are discarded.
    pub fn write_byte(&mut self, pa: Pa, value: u8, io: &mut impl IoBus) {
        if self.layout.is_io(pa) {
            io.io_write(pa, value as u32, AccessWidth::Byte);
            return;
        }

        let shift = byte_shift(pa);
        self.update_word(pa, 0xff << shift, (value as u32) << shift);
    }

    fn check_alignment(&mut self, pa: Pa, width: AccessWidth) -> Result<(), Error> {
        if pa.is_aligned(width.bytes()) {
            return Ok(());
        }

        tracing::debug!(%pa, %width, "misaligned physical access");
        self.status.insert(BusStatus::ALIGNMENT);
        Err(Error::Alignment { pa, width })
    }

    /// Returns the word containing `pa`, or `None` if neither ROM nor RAM
    /// is mapped there.
    fn word(&self, pa: Pa) -> Option<u32> {
        if self.layout.is_rom(pa) {
            return self.rom.get((pa.0 >> 2) as usize).copied();
        }

        self.ram_index(pa).map(|index| self.ram[index])
    }

    /// Replaces the bits selected by `mask` in the RAM word containing `pa`.
    fn update_word(&mut self, pa: Pa, mask: u32, value: u32) {
        if let Some(index) = self.ram_index(pa) {
            let word = &mut self.ram[index];
            *word = (*word & !mask) | (value & mask);
        }
    }

    fn ram_index(&self, pa: Pa) -> Option<usize> {
        if !self.layout.is_ram(pa) {
            return None;
        }

        let index = ((pa.0 - self.layout.ram_base) >> 2) as usize;
        (index < self.ram.len()).then_some(index)
    }
}

impl std::fmt::Debug for PhysicalMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("PhysicalMemory")
            .field("layout", &self.layout)
            .field("rom_words", &self.rom.len())
            .field("ram_words", &self.ram.len())
            .field("status", &self.status)
            .finish()
    }
}

/// Shift of the halfword at `pa` within its word.
fn halfword_shift(pa: Pa) -> u32 {
    if pa.0 & 2 != 0 { 0 } else { 16 }
}

/// Shift of the byte at `pa` within its word.
fn byte_shift(pa: Pa) -> u32 {
    (3 - (pa.0 & 3)) * 8
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const RAM: Pa = Pa(0x0200_0000);

    #[derive(Default)]
    struct RecordingIo {
        regs: HashMap<u32, u32>,
        writes: Vec<(Pa, u32, AccessWidth)>,
    }

    impl IoBus for RecordingIo {
        fn io_read(&mut self, pa: Pa, _width: AccessWidth) -> u32 {
            self.regs.get(&pa.0).copied().unwrap_or(0)
        }

        fn io_write(&mut self, pa: Pa, value: u32, width: AccessWidth) {
            self.writes.push((pa, value, width));
        }
    }

    fn memory() -> PhysicalMemory {
        PhysicalMemory::new(MemoryLayout::default())
    }

    #[test]
    fn big_endian_byte_order() -> Result<(), Error> {
        let mut mem = memory();
        let mut io = RecordingIo::default();

        mem.write_word(RAM, 0x1122_3344, &mut io)?;

        assert_eq!(mem.read_byte(RAM, &mut io), 0x11);
        assert_eq!(mem.read_byte(RAM + 1, &mut io), 0x22);
        assert_eq!(mem.read_byte(RAM + 2, &mut io), 0x33);
        assert_eq!(mem.read_byte(RAM + 3, &mut io), 0x44);
        assert_eq!(mem.read_halfword(RAM, &mut io)?, 0x1122);
        assert_eq!(mem.read_halfword(RAM + 2, &mut io)?, 0x3344);

        Ok(())
    }

    #[test]
    fn narrow_writes_merge_into_word() -> Result<(), Error> {
        let mut mem = memory();
        let mut io = RecordingIo::default();

        mem.write_word(RAM, 0x1122_3344, &mut io)?;
        mem.write_byte(RAM + 1, 0xaa, &mut io);
        mem.write_halfword(RAM + 2, 0xbbcc, &mut io)?;

        assert_eq!(mem.read_word(RAM, &mut io)?, 0x11aa_bbcc);

        mem.write_halfword(RAM, 0x5566, &mut io)?;
        assert_eq!(mem.read_word(RAM, &mut io)?, 0x5566_bbcc);

        Ok(())
    }

    #[test]
    fn misaligned_word_read_sets_status() {
        let mut mem = memory();
        let mut io = RecordingIo::default();

        let err = mem.read_word(RAM + 2, &mut io).unwrap_err();
        assert_eq!(
            err,
            Error::Alignment {
                pa: RAM + 2,
                width: AccessWidth::Word
            }
        );
        assert!(mem.status().contains(BusStatus::ALIGNMENT));

        mem.clear_status(BusStatus::ALIGNMENT);
        assert!(mem.status().is_empty());
    }

    #[test]
    fn misaligned_halfword_write_is_not_applied() -> Result<(), Error> {
        let mut mem = memory();
        let mut io = RecordingIo::default();

        assert!(mem.write_halfword(RAM + 1, 0xffff, &mut io).is_err());
        assert_eq!(mem.read_word(RAM, &mut io)?, 0);
        assert!(mem.status().contains(BusStatus::ALIGNMENT));

        Ok(())
    }

    #[test]
    fn unmapped_reads_zero_and_writes_discarded() -> Result<(), Error> {
        let mut mem = memory();
        let mut io = RecordingIo::default();
        let hole = Pa(0x0300_0000);

        mem.write_word(hole, 0xdead_beef, &mut io)?;
        assert_eq!(mem.read_word(hole, &mut io)?, 0);
        assert_eq!(mem.read_byte(hole, &mut io), 0);
        assert!(io.writes.is_empty());
        assert!(mem.status().is_empty());

        Ok(())
    }

    #[test]
    fn rom_is_read_only() -> Result<(), Error> {
        let mut mem = memory();
        let mut io = RecordingIo::default();

        mem.load_rom(&[0xde, 0xad, 0xbe, 0xef, 0x00, 0x01, 0x02, 0x03])?;
        assert_eq!(mem.read_word(Pa(0), &mut io)?, 0xdead_beef);
        assert_eq!(mem.read_halfword(Pa(6), &mut io)?, 0x0203);

        mem.write_word(Pa(0), 0, &mut io)?;
        mem.write_byte(Pa(1), 0, &mut io);
        assert_eq!(mem.read_word(Pa(0), &mut io)?, 0xdead_beef);

        Ok(())
    }

    #[test]
    fn rom_image_must_be_whole_words() {
        let mut mem = memory();
        assert!(matches!(
            mem.load_rom(&[1, 2, 3]),
            Err(Error::InvalidImage { len: 3, .. })
        ));
    }

    #[test]
    fn io_routing() -> Result<(), Error> {
        let mut mem = memory();
        let mut io = RecordingIo::default();
        io.regs.insert(0x0004_4000, 0x1234_5678);

        assert_eq!(mem.read_word(Pa(0x0004_4000), &mut io)?, 0x1234_5678);

        mem.write_byte(Pa(0x0004_4003), 0x7f, &mut io);
        mem.write_halfword(Pa(0x0004_4002), 0x1234, &mut io)?;
        assert_eq!(
            io.writes,
            vec![
                (Pa(0x0004_4003), 0x7f, AccessWidth::Byte),
                (Pa(0x0004_4002), 0x1234, AccessWidth::Halfword),
            ]
        );

        Ok(())
    }

    #[test]
    fn ram_image_is_big_endian() -> Result<(), Error> {
        let mut mem = PhysicalMemory::new(MemoryLayout::default().with_ram_size(8));
        let mut io = RecordingIo::default();

        mem.write_word(RAM + 4, 0x0102_0304, &mut io)?;
        assert_eq!(mem.ram_image(), vec![0, 0, 0, 0, 1, 2, 3, 4]);

        Ok(())
    }
}
