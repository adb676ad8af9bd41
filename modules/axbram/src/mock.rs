// /starry/.arceos/modules/axbram/src/mock.rs

//! Host-side stand-ins for the kernel services, used by the unit tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Condvar, Mutex};
use std::vec::Vec;

use axerrno::{AxError, AxResult};
use memory_addr::{PhysAddr, VirtAddr};

use crate::device::DeviceId;
use crate::hal::{BramHal, IrqFlags, IrqHandler, IrqReturn, MappingFlags, UserAddrSpace};

const KERNEL_IO_BASE: usize = 0xffff_0000_0000;

#[derive(Default)]
struct HalState {
    handlers: BTreeMap<usize, Vec<(DeviceId, IrqHandler)>>,
    busy: BTreeSet<usize>,
    bad_paddrs: BTreeSet<usize>,
    iomaps: BTreeMap<usize, usize>,
    next_io: usize,
    free_irq_calls: usize,
}

#[derive(Default)]
struct Sleepers {
    count: usize,
    checks: usize,
}

#[derive(Default)]
pub struct MockHal {
    state: Mutex<HalState>,
    sleepers: Mutex<Sleepers>,
    wake: Condvar,
}

impl MockHal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `irq` exclusively, so every request for it fails.
    pub fn set_busy(&self, irq: usize) {
        self.state.lock().unwrap().busy.insert(irq);
    }

    pub fn fail_ioremap(&self, paddr: usize) {
        self.state.lock().unwrap().bad_paddrs.insert(paddr);
    }

    /// Raises `irq` and returns what each installed handler reported.
    pub fn fire(&self, irq: usize) -> Vec<IrqReturn> {
        self.handlers(irq).iter().map(|h| h()).collect()
    }

    pub fn handlers(&self, irq: usize) -> Vec<IrqHandler> {
        let state = self.state.lock().unwrap();
        state
            .handlers
            .get(&irq)
            .map(|hs| hs.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default()
    }

    pub fn handler_count(&self, irq: usize) -> usize {
        self.state.lock().unwrap().handlers.get(&irq).map_or(0, Vec::len)
    }

    pub fn free_irq_calls(&self) -> usize {
        self.state.lock().unwrap().free_irq_calls
    }

    /// Number of live kernel mappings.
    pub fn live_iomaps(&self) -> usize {
        self.state.lock().unwrap().iomaps.len()
    }

    /// Tasks currently asleep in [`BramHal::wait_until`].
    pub fn sleepers(&self) -> usize {
        self.sleepers.lock().unwrap().count
    }

    /// How often a wait condition has been evaluated so far.
    pub fn condition_checks(&self) -> usize {
        self.sleepers.lock().unwrap().checks
    }

    pub fn wait_for_sleepers(&self, n: usize) {
        while self.sleepers() < n {
            std::thread::yield_now();
        }
    }
}

impl BramHal for MockHal {
    fn ioremap(&self, paddr: PhysAddr, size: usize) -> AxResult<VirtAddr> {
        let mut state = self.state.lock().unwrap();
        if state.bad_paddrs.contains(&paddr.as_usize()) {
            return Err(AxError::BadAddress);
        }
        let vaddr = KERNEL_IO_BASE + state.next_io;
        state.next_io += memory_addr::align_up_4k(size);
        state.iomaps.insert(vaddr, size);
        Ok(VirtAddr::from(vaddr))
    }

    fn iounmap(&self, vaddr: VirtAddr, size: usize) {
        let mut state = self.state.lock().unwrap();
        assert_eq!(state.iomaps.remove(&vaddr.as_usize()), Some(size));
    }

    fn request_irq(
        &self,
        irq: usize,
        flags: IrqFlags,
        _name: &str,
        cookie: DeviceId,
        handler: IrqHandler,
    ) -> AxResult {
        assert!(flags.contains(IrqFlags::SHARED));
        let mut state = self.state.lock().unwrap();
        if state.busy.contains(&irq) {
            return Err(AxError::ResourceBusy);
        }
        let line = state.handlers.entry(irq).or_default();
        if line.iter().any(|(c, _)| *c == cookie) {
            return Err(AxError::AlreadyExists);
        }
        line.push((cookie, handler));
        Ok(())
    }

    fn free_irq(&self, irq: usize, cookie: DeviceId) {
        let mut state = self.state.lock().unwrap();
        state.free_irq_calls += 1;
        if let Some(line) = state.handlers.get_mut(&irq) {
            line.retain(|(c, _)| *c != cookie);
        }
    }

    fn wait_until(&self, _key: DeviceId, condition: &dyn Fn() -> bool) {
        // one condvar for every key; waking too many is harmless
        let mut sleepers = self.sleepers.lock().unwrap();
        loop {
            sleepers.checks += 1;
            if condition() {
                return;
            }
            sleepers.count += 1;
            sleepers = self.wake.wait(sleepers).unwrap();
            sleepers.count -= 1;
        }
    }

    fn notify_all(&self, _key: DeviceId) {
        let _sleepers = self.sleepers.lock().unwrap();
        self.wake.notify_all();
    }
}

/// A caller address space that hands out consecutive page ranges.
pub struct MockAddrSpace {
    next: usize,
    pub fail: bool,
    pub mappings: Vec<(VirtAddr, PhysAddr, usize, MappingFlags)>,
}

impl MockAddrSpace {
    pub fn new() -> Self {
        Self {
            next: 0x1000_0000,
            fail: false,
            mappings: Vec::new(),
        }
    }
}

impl UserAddrSpace for MockAddrSpace {
    fn find_free_area(&self, hint: VirtAddr, _size: usize) -> Option<VirtAddr> {
        if hint.as_usize() != 0 {
            Some(hint)
        } else {
            Some(VirtAddr::from(self.next))
        }
    }

    fn map_physical(
        &mut self,
        vaddr: VirtAddr,
        paddr: PhysAddr,
        size: usize,
        flags: MappingFlags,
    ) -> AxResult {
        if self.fail {
            return Err(AxError::NoMemory);
        }
        self.next = vaddr.as_usize() + size;
        self.mappings.push((vaddr, paddr, size, flags));
        Ok(())
    }
}
