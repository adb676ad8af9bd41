// /starry/.arceos/modules/axbram/src/manager.rs

use alloc::sync::Arc;
use alloc::vec::Vec;
use memory_addr::PhysAddr;
use spin::Mutex;

use crate::config::{self, MAX_DEVICES};
use crate::device::{BramDevice, BramRegion, DeviceId};
use crate::error::{BramError, BramResult};
use crate::hal::BramHal;

/// Table of the currently exposed block-RAM regions.
///
/// Registration, removal and lookup serialize on one lock; the interrupt and
/// wait paths never take it.
pub struct BramRegistry {
    hal: Arc<dyn BramHal>,
    slots: Mutex<[Option<Arc<BramDevice>>; MAX_DEVICES]>,
}

impl BramRegistry {
    pub fn new(hal: Arc<dyn BramHal>) -> Self {
        Self {
            hal,
            slots: Mutex::new([const { None }; MAX_DEVICES]),
        }
    }

    pub(crate) fn hal(&self) -> &Arc<dyn BramHal> {
        &self.hal
    }

    /// 注册一个新的 BRAM 设备
    ///
    /// Takes the lowest free slot. A slot becomes reusable only after the
    /// device that held it has been fully unregistered.
    pub fn register(
        &self,
        paddr: PhysAddr,
        size: usize,
        irq: Option<usize>,
    ) -> BramResult<DeviceId> {
        let region = BramRegion { paddr, size };
        validate(&region)?;

        let mut slots = self.slots.lock();
        let Some(index) = slots.iter().position(Option::is_none) else {
            error!("bram: too many {} devices", config::DEV_NAME);
            return Err(BramError::TableFull);
        };
        let id = DeviceId::new(index);

        let mapped_base = self
            .hal
            .ioremap(paddr, size)
            .map_err(BramError::MapFailed)?;
        let device = BramDevice::new(id, region, irq, mapped_base, self.hal.clone());
        slots[index] = Some(Arc::new(device));

        info!(
            "bram: registered {}: paddr {:#x}, size {:#x}, irq {:?}",
            config::device_name(id),
            paddr,
            size,
            irq
        );
        Ok(id)
    }

    /// Removes a device. Unknown ids are ignored.
    ///
    /// The interrupt is detached and the kernel mapping released before the
    /// slot is marked free. Handles still open on the device fail with
    /// [`BramError::Removed`] from then on; mappings already handed to
    /// callers are not revoked.
    pub fn unregister(&self, id: DeviceId) {
        let mut slots = self.slots.lock();
        let Some(slot) = slots.get_mut(id.minor()) else {
            return;
        };
        let Some(device) = slot.as_ref() else {
            debug!("bram: unregister of absent device {}", id);
            return;
        };
        if device.sessions() > 0 {
            warn!(
                "bram: removing {} with {} open handle(s)",
                config::device_name(id),
                device.sessions()
            );
        }
        device.teardown(self.hal.as_ref());
        *slot = None;
        info!("bram: unregistered {}", config::device_name(id));
    }

    /// Unregisters every device that is currently registered.
    pub fn unregister_all(&self) {
        for id in self.ids() {
            self.unregister(id);
        }
    }

    pub fn lookup(&self, id: DeviceId) -> BramResult<Arc<BramDevice>> {
        self.slots
            .lock()
            .get(id.minor())
            .and_then(Option::clone)
            .ok_or(BramError::NotFound)
    }

    /// Ids of the registered devices, in slot order.
    pub fn ids(&self) -> Vec<DeviceId> {
        self.slots
            .lock()
            .iter()
            .flatten()
            .map(|dev| dev.id())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for BramRegistry {
    fn drop(&mut self) {
        self.unregister_all();
    }
}

fn validate(region: &BramRegion) -> BramResult {
    let start = region.paddr.as_usize();
    if region.size == 0 || start.checked_add(region.size).is_none() {
        return Err(BramError::InvalidResource);
    }
    // 映射总是从区域起始页开始
    if start % config::PAGE_SIZE != 0 {
        return Err(BramError::InvalidResource);
    }
    Ok(())
}
