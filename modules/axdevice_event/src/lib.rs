//! Hand-off queue between device discovery and the modules that expose
//! discovered devices.
//!
//! The bus / device-tree layer publishes what it finds; consumers take the
//! records that match their compatible string and leave the rest queued.

#![cfg_attr(not(test), no_std)]
extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use lazy_static::lazy_static;
use memory_addr::PhysAddr;
use spin::Mutex;

/// Information about a discovered device, to be passed between modules.
#[derive(Debug, Clone)]
pub struct DiscoveredDeviceInfo {
    pub name: String,
    pub compatible: String, // e.g. "zynq-bram"
    pub mmio_region: Option<(PhysAddr, usize)>, // Base address and size (physical)
    pub irq_num: Option<usize>,
}

lazy_static! {
    /// A global list where discovered device info is pushed by the bus layer.
    pub static ref DISCOVERED_DEVICES: Mutex<Vec<DiscoveredDeviceInfo>> = Mutex::new(Vec::new());
}

/// Publishes a new discovered device's information.
pub fn publish_device_info(info: DiscoveredDeviceInfo) {
    DISCOVERED_DEVICES.lock().push(info);
}

/// Removes and returns every queued device whose compatible string is
/// `compatible`, in publication order.
pub fn take_matching(compatible: &str) -> Vec<DiscoveredDeviceInfo> {
    let mut queue = DISCOVERED_DEVICES.lock();
    let (taken, rest): (Vec<_>, Vec<_>) = queue
        .drain(..)
        .partition(|info| info.compatible == compatible);
    *queue = rest;
    taken
}
