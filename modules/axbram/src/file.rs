// /starry/.arceos/modules/axbram/src/file.rs

use alloc::sync::Arc;
use memory_addr::VirtAddr;

use super::device::{BramDevice, DeviceId};
use super::error::{BramError, BramResult};
use super::hal::{BramHal, UserAddrSpace};
use super::manager::BramRegistry;
use super::mmap::{self, CallerMapping, MmapProt};
use super::wait::CancelToken;

/// An open handle on a block-RAM device.
///
/// The first handle on a device attaches its interrupt; the last one to
/// close detaches it. Dropping the handle closes it.
pub struct BramDeviceFile {
    device: Arc<BramDevice>,
    hal: Arc<dyn BramHal>,
    cancel: CancelToken,
    open: bool,
}

impl BramDeviceFile {
    /// Opens device `id` of `registry`.
    ///
    /// Fails with [`BramError::InterruptRegistrationFailed`] if the interrupt
    /// cannot be claimed; no handle is produced in that case.
    pub fn open(registry: &BramRegistry, id: DeviceId) -> BramResult<Self> {
        let device = registry.lookup(id)?;
        {
            let mut sessions = device.sessions.lock();
            if device.is_removed() {
                return Err(BramError::NotFound);
            }
            if *sessions == 0 {
                device.bridge.attach(registry.hal().as_ref())?;
            }
            *sessions += 1;
        }
        debug!("bram: open device {}", id);
        Ok(Self {
            device,
            hal: registry.hal().clone(),
            cancel: CancelToken::new(),
            open: true,
        })
    }

    pub fn device(&self) -> &Arc<BramDevice> {
        &self.device
    }

    /// Closes the handle. Never fails.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        let mut sessions = self.device.sessions.lock();
        match *sessions {
            0 => warn!("bram: close of device {} with no open handle", self.device.id()),
            n => *sessions = n - 1,
        }
        if *sessions == 0 {
            self.device.bridge.detach(self.hal.as_ref());
        }
        debug!("bram: close device {}", self.device.id());
    }

    /// Blocks until the hardware signals new data.
    ///
    /// Carries no payload and returns `Ok(0)`; the data itself is read
    /// through the mapping. Returns [`BramError::Interrupted`] once per
    /// cancellation request and [`BramError::Removed`] if the device goes
    /// away.
    pub fn read(&self) -> BramResult<usize> {
        self.device.wait_channel().wait_for_data(&self.cancel)?;
        Ok(0)
    }

    /// Cancels a blocked [`read`](Self::read), or the next one.
    pub fn interrupt(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels reads on this handle from another task.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Maps `length` bytes of the region into `aspace`.
    ///
    /// Only offset 0 is supported: the mapping always starts at the region
    /// base.
    pub fn mmap(
        &self,
        aspace: &mut dyn UserAddrSpace,
        hint: VirtAddr,
        length: usize,
        offset: usize,
        prot: MmapProt,
    ) -> BramResult<CallerMapping> {
        if offset != 0 {
            return Err(BramError::UnsupportedOffset);
        }
        if self.device.is_removed() {
            return Err(BramError::Removed);
        }
        mmap::map_into_caller(&self.device, aspace, hint, length, prot)
    }
}

impl Drop for BramDeviceFile {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(feature = "vfs")]
mod vfs {
    use axerrno::{AxError, AxResult};
    use axfs_vfs::{VfsNodeAttr, VfsNodeOps, VfsNodePerm, VfsNodeType};

    use super::BramDeviceFile;

    impl VfsNodeOps for BramDeviceFile {
        fn get_attr(&self) -> AxResult<VfsNodeAttr> {
            Ok(VfsNodeAttr::new(
                VfsNodePerm::from_bits_truncate(0o666),
                VfsNodeType::CharDevice,
                0,
                0,
            ))
        }

        // 只作为同步信号，不搬运数据
        fn read_at(&self, _offset: u64, _buf: &mut [u8]) -> AxResult<usize> {
            Ok(self.read()?)
        }

        fn write_at(&self, _offset: u64, _buf: &[u8]) -> AxResult<usize> {
            Err(AxError::Unsupported)
        }

        // mmap 系统调用通过向下转型拿到 BramDeviceFile
        fn as_any(&self) -> &dyn core::any::Any {
            self
        }
    }
}
