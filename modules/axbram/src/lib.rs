// /starry/.arceos/modules/axbram/src/lib.rs

//! Block-RAM regions exposed to user space.
//!
//! Each region discovered by the platform layer (a `zynq-bram` node) is
//! registered in a [`BramRegistry`]. Opening a device gives a
//! [`BramDeviceFile`]: `mmap` maps the region non-cacheable into the
//! caller, and `read` blocks until the device raises its interrupt.
//!
//! # Cargo Features
//!
//! - `vfs`: Implement [`axfs_vfs::VfsNodeOps`] for [`BramDeviceFile`], so a
//!   handle can be mounted as a device node. This feature is **enabled** by
//!   default.

#![cfg_attr(all(not(test), not(doc)), no_std)]

#[macro_use]
extern crate log;
extern crate alloc;

pub mod config;
mod device;
mod error;
pub mod file;
pub mod hal;
mod irq;
mod manager;
pub mod mmap;
mod wait;

#[cfg(test)]
mod mock;

pub use device::{BramDevice, BramRegion, DeviceId};
pub use error::{BramError, BramResult};
pub use file::BramDeviceFile;
pub use irq::InterruptBridge;
pub use manager::BramRegistry;
pub use wait::{CancelToken, WaitChannel};

use alloc::sync::Arc;
use alloc::vec::Vec;
use lazy_static::lazy_static;
use spin::Mutex;

use hal::BramHal;

lazy_static! {
    static ref REGISTRY: Mutex<Option<Arc<BramRegistry>>> = Mutex::new(None);
}

/// Installs the global registry on top of the platform services.
///
/// Only the first call takes effect.
pub fn init(hal: Arc<dyn BramHal>) {
    let mut registry = REGISTRY.lock();
    if registry.is_some() {
        warn!("axbram: already initialized");
        return;
    }
    *registry = Some(Arc::new(BramRegistry::new(hal)));
    info!("axbram module initialized.");
}

/// The global registry, if [`init`] has run.
pub fn registry() -> Option<Arc<BramRegistry>> {
    REGISTRY.lock().as_ref().cloned()
}

/// Opens device `id` of the global registry.
pub fn open(id: DeviceId) -> BramResult<BramDeviceFile> {
    let registry = registry().ok_or(BramError::NotFound)?;
    BramDeviceFile::open(&registry, id)
}

/// Registers every discovered `zynq-bram` region in the global registry.
///
/// Returns the ids that were assigned. Regions without an MMIO range or
/// that fail to register are logged and skipped.
pub fn register_discovered_devices() -> Vec<DeviceId> {
    let Some(registry) = registry() else {
        warn!("axbram: not initialized, discovered devices left queued");
        return Vec::new();
    };
    register_discovered_into(&registry)
}

fn register_discovered_into(registry: &BramRegistry) -> Vec<DeviceId> {
    info!("axbram: Registering discovered devices from axdevice_event...");

    let mut ids = Vec::new();
    for info in axdevice_event::take_matching(config::COMPATIBLE) {
        let Some((paddr, size)) = info.mmio_region else {
            warn!(
                "axbram: Discovered device {} has no MMIO region, skipping.",
                info.name
            );
            continue;
        };
        match registry.register(paddr, size, info.irq_num) {
            Ok(id) => {
                info!(
                    "axbram: {} registered as /dev/{}",
                    info.name,
                    config::device_name(id)
                );
                ids.push(id);
            }
            Err(e) => error!("axbram: failed to register {}: {}", info.name, e),
        }
    }
    ids
}

/// Unregisters every device of the global registry.
pub fn remove_all() {
    if let Some(registry) = registry() {
        registry.unregister_all();
    }
}
