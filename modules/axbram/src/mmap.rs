// /starry/.arceos/modules/axbram/src/mmap.rs

//! Validation and installation of caller mappings.

use memory_addr::{PhysAddr, VirtAddr, align_down_4k, align_up_4k};

use crate::config;
use crate::device::BramDevice;
use crate::error::{BramError, BramResult};
use crate::hal::{MappingFlags, UserAddrSpace};

bitflags::bitflags! {
    /// `PROT_*` flags of a mapping request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MmapProt: u32 {
        /// Page can be read.
        const READ = 1 << 0;
        /// Page can be written.
        const WRITE = 1 << 1;
        /// Page can be executed.
        const EXEC = 1 << 2;
    }
}

impl From<MmapProt> for MappingFlags {
    fn from(value: MmapProt) -> Self {
        // 硬件区域内容会被异步修改，必须关闭缓存
        let mut flags = MappingFlags::USER | MappingFlags::DEVICE | MappingFlags::UNCACHED;
        if value.contains(MmapProt::READ) {
            flags |= MappingFlags::READ;
        }
        if value.contains(MmapProt::WRITE) {
            flags |= MappingFlags::WRITE;
        }
        if value.contains(MmapProt::EXEC) {
            flags |= MappingFlags::EXECUTE;
        }
        flags
    }
}

/// A view of a region installed in the caller's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerMapping {
    pub vaddr: VirtAddr,
    pub paddr: PhysAddr,
    /// Bytes requested by the caller.
    pub size: usize,
    pub flags: MappingFlags,
}

impl CallerMapping {
    /// Bytes of address space actually covered (whole pages).
    pub fn mapped_len(&self) -> usize {
        align_up_4k(self.size)
    }
}

/// Checks that `requested_size` bytes, rounded up to whole pages, fit in
/// the region of `device`.
pub fn validate_request(device: &BramDevice, requested_size: usize) -> BramResult {
    if requested_size == 0 {
        return Err(BramError::EmptyMapping);
    }
    // 用户能访问到整页，按页对齐后的长度比较
    let mapped = requested_size.checked_next_multiple_of(config::PAGE_SIZE);
    if mapped.is_none_or(|len| len > device.region().size) {
        return Err(BramError::SizeExceedsRegion);
    }
    Ok(())
}

/// Maps the first `requested_size` bytes of the device's region into
/// `aspace`, non-cacheable.
///
/// The mapping always starts at the region base. Page-table failures are
/// reported as [`BramError::RemapFailed`] and not retried.
pub fn map_into_caller(
    device: &BramDevice,
    aspace: &mut dyn UserAddrSpace,
    hint: VirtAddr,
    requested_size: usize,
    prot: MmapProt,
) -> BramResult<CallerMapping> {
    validate_request(device, requested_size)?;

    let paddr = device.region().paddr;
    let len = align_up_4k(requested_size);
    let vaddr = aspace
        .find_free_area(VirtAddr::from(align_down_4k(hint.as_usize())), len)
        .ok_or(BramError::RemapFailed(axerrno::AxError::NoMemory))?;
    let flags = MappingFlags::from(prot);

    aspace
        .map_physical(vaddr, paddr, len, flags)
        .map_err(BramError::RemapFailed)?;

    info!(
        "bram: mapped device {} paddr {:#x} to vaddr {:#x}, size {:#x}",
        device.id(),
        paddr,
        vaddr,
        requested_size
    );
    Ok(CallerMapping {
        vaddr,
        paddr,
        size: requested_size,
        flags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceId;
    use crate::mock::{MockAddrSpace, MockHal};
    use alloc::sync::Arc;

    const RW: MmapProt = MmapProt::READ.union(MmapProt::WRITE);

    fn device(size: usize) -> BramDevice {
        let region = crate::device::BramRegion {
            paddr: PhysAddr::from(0x4000_0000),
            size,
        };
        let hal = Arc::new(MockHal::new());
        BramDevice::new(DeviceId::new(0), region, None, VirtAddr::from(0xffff_0000_0000), hal)
    }

    #[test]
    fn size_must_fit_in_region() {
        let dev = device(4096);
        let mut aspace = MockAddrSpace::new();
        let hint = VirtAddr::from(0);
        for size in [1, 100, 4095, 4096] {
            let m = map_into_caller(&dev, &mut aspace, hint, size, RW).unwrap();
            assert_eq!(m.size, size);
            assert_eq!(m.mapped_len(), 4096);
        }
        assert_eq!(
            map_into_caller(&dev, &mut aspace, hint, 4097, RW),
            Err(BramError::SizeExceedsRegion)
        );
        assert_eq!(
            map_into_caller(&dev, &mut aspace, hint, 0, RW),
            Err(BramError::EmptyMapping)
        );
        assert_eq!(aspace.mappings.len(), 4);
    }

    #[test]
    fn mapping_is_uncached_and_starts_at_region_base() {
        let dev = device(0x3000);
        let mut aspace = MockAddrSpace::new();
        let m = map_into_caller(&dev, &mut aspace, VirtAddr::from(0x2000_0123), 0x2800, RW)
            .unwrap();
        assert_eq!(m.vaddr, VirtAddr::from(0x2000_0000));
        assert_eq!(m.paddr, PhysAddr::from(0x4000_0000));
        assert!(m.flags.contains(MappingFlags::UNCACHED | MappingFlags::USER));
        assert!(!m.flags.contains(MappingFlags::EXECUTE));

        let (vaddr, paddr, len, flags) = aspace.mappings[0];
        assert_eq!((vaddr, paddr, len, flags), (m.vaddr, m.paddr, 0x3000, m.flags));
    }

    #[test]
    fn partial_last_page_is_not_exposed() {
        let dev = device(0x2800);
        let mut aspace = MockAddrSpace::new();
        let hint = VirtAddr::from(0);
        for size in [0x2001, 0x2800] {
            assert_eq!(
                map_into_caller(&dev, &mut aspace, hint, size, RW),
                Err(BramError::SizeExceedsRegion)
            );
        }
        assert!(aspace.mappings.is_empty());

        let m = map_into_caller(&dev, &mut aspace, hint, 0x2000, RW).unwrap();
        assert_eq!(m.mapped_len(), 0x2000);
        assert_eq!(aspace.mappings[0].2, 0x2000);
        assert_eq!(
            map_into_caller(&dev, &mut aspace, hint, usize::MAX, RW),
            Err(BramError::SizeExceedsRegion)
        );
    }

    #[test]
    fn page_table_failure_is_remap_failed() {
        let dev = device(4096);
        let mut aspace = MockAddrSpace::new();
        aspace.fail = true;
        assert_eq!(
            map_into_caller(&dev, &mut aspace, VirtAddr::from(0), 4096, MmapProt::READ),
            Err(BramError::RemapFailed(axerrno::AxError::NoMemory))
        );
    }
}
