// /starry/.arceos/modules/axbram/src/hal.rs

//! Kernel services the mapper depends on.
//!
//! The mapper never programs page tables or interrupt controllers itself.
//! The platform implements [`BramHal`] (kernel mappings, interrupt lines,
//! task suspension) and the process layer implements [`UserAddrSpace`] for the
//! caller whose address space receives a mapping.

use alloc::sync::Arc;
use axerrno::AxResult;
use memory_addr::{PhysAddr, VirtAddr};

use crate::device::DeviceId;

bitflags::bitflags! {
    /// Flags used when requesting an interrupt line.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IrqFlags: u32 {
        /// The line may be shared with other devices.
        const SHARED = 1 << 0;
        /// Trigger on the rising edge.
        const TRIGGER_RISING = 1 << 1;
    }
}

bitflags::bitflags! {
    /// Page-table flags of a mapping.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MappingFlags: u32 {
        /// Readable.
        const READ = 1 << 0;
        /// Writable.
        const WRITE = 1 << 1;
        /// Executable.
        const EXECUTE = 1 << 2;
        /// Accessible from user mode.
        const USER = 1 << 3;
        /// Device memory.
        const DEVICE = 1 << 4;
        /// Caching disabled.
        const UNCACHED = 1 << 5;
    }
}

/// What an interrupt handler reports back to the interrupt controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqReturn {
    /// The interrupt was not for this handler (shared line).
    None,
    /// The interrupt was handled.
    Handled,
}

/// Callback installed on an interrupt line.
///
/// Runs in interrupt context: it must not block.
pub type IrqHandler = Arc<dyn Fn() -> IrqReturn + Send + Sync>;

/// Platform services used by the registry and the interrupt bridge.
pub trait BramHal: Send + Sync {
    /// Maps `size` bytes at `paddr` into the kernel address space.
    fn ioremap(&self, paddr: PhysAddr, size: usize) -> AxResult<VirtAddr>;

    /// Releases a mapping returned by [`BramHal::ioremap`].
    fn iounmap(&self, vaddr: VirtAddr, size: usize);

    /// Installs `handler` on `irq`.
    ///
    /// `cookie` identifies the handler on a shared line and is passed back to
    /// [`BramHal::free_irq`].
    fn request_irq(
        &self,
        irq: usize,
        flags: IrqFlags,
        name: &str,
        cookie: DeviceId,
        handler: IrqHandler,
    ) -> AxResult;

    /// Removes the handler installed with `cookie` from `irq`.
    fn free_irq(&self, irq: usize, cookie: DeviceId);

    /// Suspends the current task until `condition` holds.
    ///
    /// `condition` is checked before sleeping and again after every
    /// [`BramHal::notify_all`] on `key`. A notify issued after the condition
    /// became true but before the task went to sleep must not be lost, as
    /// with a kernel wait queue's `wait_until`.
    fn wait_until(&self, key: DeviceId, condition: &dyn Fn() -> bool);

    /// Wakes every task suspended on `key`.
    ///
    /// Called from interrupt context; must not block.
    fn notify_all(&self, key: DeviceId);
}

/// The address space of the caller that asked for a mapping.
pub trait UserAddrSpace {
    /// Finds `size` bytes of unmapped, page-aligned address space, starting
    /// the search at `hint`.
    fn find_free_area(&self, hint: VirtAddr, size: usize) -> Option<VirtAddr>;

    /// Maps `size` bytes of `paddr` at `vaddr`.
    fn map_physical(
        &mut self,
        vaddr: VirtAddr,
        paddr: PhysAddr,
        size: usize,
        flags: MappingFlags,
    ) -> AxResult;
}
