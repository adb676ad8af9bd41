// /starry/.arceos/modules/axbram/src/config.rs

//! Compile-time configuration of the block-RAM mapper.

use alloc::format;
use alloc::string::String;

use crate::device::DeviceId;

/// Maximum number of block-RAM regions registered at the same time.
pub const MAX_DEVICES: usize = 8;

/// Base name of the device nodes (`/dev/bram_map0`, `/dev/bram_map1`, ...).
pub const DEV_NAME: &str = "bram_map";

/// Device-tree compatible string matched by the discovery layer.
pub const COMPATIBLE: &str = "zynq-bram";

/// Granularity of every caller mapping.
pub const PAGE_SIZE: usize = memory_addr::PAGE_SIZE_4K;

/// Node name of a registered device.
pub fn device_name(id: DeviceId) -> String {
    format!("{}{}", DEV_NAME, id.minor())
}

/// Name the interrupt line is requested under.
pub fn irq_name(id: DeviceId) -> String {
    format!("bram_intr{}", id.minor())
}
