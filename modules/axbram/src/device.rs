// /starry/.arceos/modules/axbram/src/device.rs

use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use memory_addr::{PhysAddr, VirtAddr};
use spin::Mutex;

use crate::hal::BramHal;
use crate::irq::InterruptBridge;
use crate::wait::WaitChannel;

/// Opaque handle of a registered device.
///
/// The minor number is what the device-node layer hands back on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(usize);

impl DeviceId {
    pub const fn new(minor: usize) -> Self {
        Self(minor)
    }

    pub const fn minor(self) -> usize {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical range of one block-RAM region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BramRegion {
    pub paddr: PhysAddr,
    pub size: usize,
}

/// A registered block-RAM device.
///
/// The region and irq never change after registration. The kernel mapping
/// is owned by the record and released by [`BramRegistry::unregister`].
///
/// [`BramRegistry::unregister`]: crate::BramRegistry::unregister
pub struct BramDevice {
    pub(crate) id: DeviceId,
    pub(crate) region: BramRegion,
    pub(crate) irq: Option<usize>,
    pub(crate) mapped_base: Mutex<Option<VirtAddr>>,
    pub(crate) channel: Arc<WaitChannel>,
    pub(crate) bridge: InterruptBridge,
    /// 当前打开该设备的句柄数
    pub(crate) sessions: Mutex<usize>,
    pub(crate) removed: AtomicBool,
}

impl BramDevice {
    pub(crate) fn new(
        id: DeviceId,
        region: BramRegion,
        irq: Option<usize>,
        mapped_base: VirtAddr,
        hal: Arc<dyn BramHal>,
    ) -> Self {
        let channel = Arc::new(WaitChannel::new(hal, id));
        Self {
            id,
            region,
            irq,
            mapped_base: Mutex::new(Some(mapped_base)),
            bridge: InterruptBridge::new(id, irq, channel.clone()),
            channel,
            sessions: Mutex::new(0),
            removed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn region(&self) -> BramRegion {
        self.region
    }

    pub fn irq(&self) -> Option<usize> {
        self.irq
    }

    /// Kernel-visible mapping of the region; `None` once unregistered.
    pub fn mapped_base(&self) -> Option<VirtAddr> {
        *self.mapped_base.lock()
    }

    pub fn wait_channel(&self) -> &WaitChannel {
        &self.channel
    }

    /// Whether the interrupt bridge is currently bound.
    pub fn is_attached(&self) -> bool {
        self.bridge.is_attached()
    }

    /// Number of open handles.
    pub fn sessions(&self) -> usize {
        *self.sessions.lock()
    }

    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    /// Detaches the interrupt, wakes blocked readers and releases the kernel
    /// mapping. Runs once, under the registry lock.
    pub(crate) fn teardown(&self, hal: &dyn BramHal) {
        {
            // 与 open 互斥，避免删除后又重新挂上中断
            let _sessions = self.sessions.lock();
            self.removed.store(true, Ordering::Release);
            self.bridge.detach(hal);
        }
        self.channel.close();
        match self.mapped_base.lock().take() {
            Some(vaddr) => hal.iounmap(vaddr, self.region.size),
            None => warn!("bram: device {} has no kernel mapping to release", self.id),
        }
    }
}

impl fmt::Debug for BramDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BramDevice")
            .field("id", &self.id)
            .field("paddr", &self.region.paddr)
            .field("size", &self.region.size)
            .field("irq", &self.irq)
            .field("attached", &self.is_attached())
            .finish()
    }
}
