//! Virtual address translation.
//!
//! Translation resolves the segment descriptor of a virtual address, from
//! the segment descriptor cache or from the section's descriptor table,
//! and then either adds the segment offset to the base of a contiguous
//! segment, or resolves the page descriptor of a paged segment and adds
//! the page offset to the page base.
//!
//! When side effects are disabled, translation only computes the physical
//! address: caches are not filled, referenced and modified bits are not
//! written back, access rights and object traps are not checked, and the
//! fault registers are left alone. The segment table length check and the
//! segment offset check are performed regardless.

use we32k_core::{AccessKind, Error, Fault, Pa, Platform, Va};

use crate::{
    Mmu, We32101,
    config::Configuration,
    descriptor::{PageDescriptor, PageFlags, SegmentDescriptor, SegmentFlags},
};

/// A resolved segment descriptor.
struct Segment {
    descriptor: SegmentDescriptor,
    cached: bool,
}

impl<P> Mmu<P>
where
    P: Platform,
{
    /// Translates a virtual address into a physical address.
    ///
    /// While the MMU is disabled, virtual addresses map to the identical
    /// physical address.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Fault`] if the address cannot be translated,
    /// and with [`Error::IndirectDescriptor`] if the segment descriptor is
    /// indirect. When `side_effects` is set, a fault is also recorded in
    /// the fault registers.
    pub fn translate(&mut self, va: Va, access: AccessKind, side_effects: bool) -> Result<Pa, Error> {
        if !self.registers.enabled {
            return Ok(Pa::from(va));
        }

        let result = self.decode(va, access, side_effects);

        if side_effects && let Err(Error::Fault { fault, va }) = result {
            self.record_fault(fault, va, access);
        }

        result
    }

    fn decode(&mut self, va: Va, access: AccessKind, side_effects: bool) -> Result<Pa, Error> {
        let section = self.registers.section(We32101::section(va));
        let ssl = We32101::segment_selector(va);

        if ssl > section.length {
            tracing::debug!(
                pc = %self.pc(),
                %va,
                ssl,
                length = section.length,
                "SDT length fault"
            );
            return Err(Error::fault(Fault::SdtLength, va));
        }

        let segment = self.segment(va, access, side_effects)?;
        let sd = segment.descriptor;

        if side_effects && sd.object_trap() {
            tracing::debug!(pc = %self.pc(), %va, "object trap");
            return Err(Error::fault(Fault::ObjectTrap, va));
        }

        if sd.contiguous() {
            self.decode_contiguous(va, access, sd, side_effects)
        } else {
            self.decode_paged(va, access, segment, side_effects)
        }
    }

    /// Returns the address of the segment descriptor for `va`.
    fn segment_descriptor_address(&self, va: Va) -> Pa {
        let section = self.registers.section(We32101::section(va));
        section.base + We32101::segment_selector(va) * We32101::SD_SIZE
    }

    /// Resolves the segment descriptor for `va`.
    fn segment(&mut self, va: Va, access: AccessKind, side_effects: bool) -> Result<Segment, Error> {
        let mut segment = match self.registers.sd_cache.lookup(va) {
            Some(descriptor) => Segment {
                descriptor,
                cached: true,
            },
            None => Segment {
                descriptor: self.fetch_segment_descriptor(va, side_effects)?,
                cached: false,
            },
        };

        if self.should_update(side_effects, Configuration::MODIFIED, segment.descriptor.modified())
            && access == AccessKind::Write
        {
            self.update_segment_descriptor(va, SegmentFlags::MODIFIED)?;
            self.registers.sd_cache.set_modified(va);
            segment.descriptor.sd0 |= SegmentFlags::MODIFIED.bits();
        }

        Ok(segment)
    }

    fn fetch_segment_descriptor(
        &mut self,
        va: Va,
        side_effects: bool,
    ) -> Result<SegmentDescriptor, Error> {
        let address = self.segment_descriptor_address(va);
        let mut sd = SegmentDescriptor::new(
            self.pread_w(address)?,
            self.pread_w(address + 4)?,
        );

        if !sd.valid() {
            tracing::debug!(pc = %self.pc(), %va, ?sd, "invalid segment descriptor");
            return Err(Error::fault(Fault::InvalidSegmentDescriptor, va));
        }

        if sd.indirect() {
            tracing::warn!(pc = %self.pc(), %va, ?sd, "indirect segment descriptor");
            return Err(Error::IndirectDescriptor { va, sd0: sd.sd0 });
        }

        if !sd.present() {
            let fault = if sd.contiguous() {
                Fault::SegmentNotPresent
            } else {
                Fault::PdtNotPresent
            };

            tracing::debug!(pc = %self.pc(), %va, %fault, "segment not present");
            return Err(Error::fault(fault, va));
        }

        if side_effects && sd.cacheable() {
            self.registers.sd_cache.insert(va, sd);
        }

        if self.should_update(side_effects, Configuration::REFERENCED, sd.referenced()) {
            self.update_segment_descriptor(va, SegmentFlags::REFERENCED)?;
            sd.sd0 |= SegmentFlags::REFERENCED.bits();
        }

        Ok(sd)
    }

    fn decode_contiguous(
        &mut self,
        va: Va,
        access: AccessKind,
        sd: SegmentDescriptor,
        side_effects: bool,
    ) -> Result<Pa, Error> {
        let sot = We32101::segment_offset(va);

        if side_effects && !sd.access().allows(self.platform.execution_level(), access) {
            tracing::debug!(
                pc = %self.pc(),
                %va,
                ?access,
                level = ?self.platform.execution_level(),
                rights = ?sd.access(),
                "segment access fault"
            );
            return Err(Error::fault(Fault::Access, va));
        }

        if sot > sd.max_offset() {
            tracing::debug!(
                pc = %self.pc(),
                %va,
                sot,
                max_offset = sd.max_offset(),
                "contiguous segment offset fault"
            );
            return Err(Error::fault(Fault::SegmentOffset, va));
        }

        Ok(sd.address() + sot)
    }

    fn decode_paged(
        &mut self,
        va: Va,
        access: AccessKind,
        segment: Segment,
        side_effects: bool,
    ) -> Result<Pa, Error> {
        let sd = segment.descriptor;
        let pot = We32101::page_offset(va);
        let pdt_offset = We32101::page_selector(va) * We32101::PD_SIZE;
        let pd_address = sd.address() + pdt_offset;

        let (pd, rights, pd_cached) = match self.registers.pd_cache.lookup(va) {
            Some((pd, rights)) => (pd, rights, true),
            None => {
                if pdt_offset > sd.max_offset() {
                    tracing::debug!(
                        pc = %self.pc(),
                        %va,
                        pdt_offset,
                        max_offset = sd.max_offset(),
                        "PDT length fault"
                    );
                    return Err(Error::fault(Fault::PdtLength, va));
                }

                let mut pd = PageDescriptor(self.pread_w(pd_address)?);

                if side_effects && pd.present() {
                    self.registers.pd_cache.insert(va, sd, pd);
                }

                if self.should_update(side_effects, Configuration::REFERENCED, pd.referenced()) {
                    self.update_page_descriptor(pd_address, PageFlags::REFERENCED)?;
                    pd.0 |= PageFlags::REFERENCED.bits();
                }

                (pd, sd.access(), false)
            }
        };

        if side_effects && !rights.allows(self.platform.execution_level(), access) {
            tracing::debug!(
                pc = %self.pc(),
                %va,
                ?access,
                level = ?self.platform.execution_level(),
                ?rights,
                ?pd,
                pd_cached,
                segment_cached = segment.cached,
                "page access fault"
            );
            return Err(Error::fault(Fault::Access, va));
        }

        // A cached last page may extend past the end of the segment.
        if pd_cached
            && pd.last()
            && u64::from(pd.address().0) + u64::from(pot)
                > u64::from(sd.address().0) + u64::from(sd.max_offset())
        {
            tracing::debug!(pc = %self.pc(), %va, ?pd, "paged segment offset fault");
            return Err(Error::fault(Fault::SegmentOffset, va));
        }

        if !pd.present() {
            tracing::debug!(pc = %self.pc(), %va, ?access, ?sd, ?pd, "page not present");
            return Err(Error::fault(Fault::PageNotPresent, va));
        }

        if side_effects {
            if access.is_write_like() && pd.write_fault() {
                tracing::debug!(pc = %self.pc(), %va, "page write fault");
                return Err(Error::fault(Fault::PageWrite, va));
            }

            if access == AccessKind::Write
                && self.should_update(side_effects, Configuration::MODIFIED, pd.modified())
            {
                self.update_page_descriptor(pd_address, PageFlags::MODIFIED)?;
                self.registers.pd_cache.set_modified(va);
            }
        }

        Ok(pd.address() + pot)
    }

    /// Checks if a referenced or modified bit that is currently clear has
    /// to be written back.
    fn should_update(&self, side_effects: bool, bit: Configuration, set: bool) -> bool {
        side_effects && !set && self.registers.conf.contains(bit)
    }

    fn update_segment_descriptor(&mut self, va: Va, flag: SegmentFlags) -> Result<(), Error> {
        let address = self.segment_descriptor_address(va);
        let sd0 = self.pread_w(address)?;

        tracing::trace!(%va, %address, ?flag, "updating segment descriptor");
        self.pwrite_w(address, sd0 | flag.bits())
    }

    fn update_page_descriptor(&mut self, address: Pa, flag: PageFlags) -> Result<(), Error> {
        let pd = self.pread_w(address)?;

        tracing::trace!(%address, ?flag, "updating page descriptor");
        self.pwrite_w(address, pd | flag.bits())
    }

    fn record_fault(&mut self, fault: Fault, va: Va, access: AccessKind) {
        let level = self.platform.execution_level();
        let code = ((access.code() as u32) << 7)
            | ((level.number() as u32) << 5)
            | fault.code() as u32;

        tracing::debug!(pc = %self.pc(), %va, %fault, code, "MMU fault");
        self.registers.fault.code = code;
        self.registers.fault.address = va.0;
    }
}
