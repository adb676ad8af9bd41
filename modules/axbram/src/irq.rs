// /starry/.arceos/modules/axbram/src/irq.rs

//! Binds a device's interrupt line to its [`WaitChannel`].

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};
use spin::Mutex;

use crate::config;
use crate::device::DeviceId;
use crate::error::{BramError, BramResult};
use crate::hal::{BramHal, IrqFlags, IrqHandler, IrqReturn};
use crate::wait::WaitChannel;

/// Interrupt binding of one device.
///
/// The installed handler captures the device's channel and an `armed` flag
/// instead of a pointer back into the registry, so it never takes the
/// registry lock from interrupt context.
pub struct InterruptBridge {
    id: DeviceId,
    irq: Option<usize>,
    channel: Arc<WaitChannel>,
    armed: Arc<AtomicBool>,
    bound: Mutex<bool>,
}

impl InterruptBridge {
    pub(crate) fn new(id: DeviceId, irq: Option<usize>, channel: Arc<WaitChannel>) -> Self {
        Self {
            id,
            irq,
            channel,
            armed: Arc::new(AtomicBool::new(false)),
            bound: Mutex::new(false),
        }
    }

    /// Whether the handler is currently installed.
    pub fn is_attached(&self) -> bool {
        *self.bound.lock()
    }

    /// Installs the handler on the device's interrupt line.
    ///
    /// A device without an interrupt line attaches trivially; reads on it
    /// then block until cancelled. Attaching twice is refused with
    /// [`BramError::InterruptRegistrationFailed`], like a second claim of
    /// the same shared-line cookie.
    pub fn attach(&self, hal: &dyn BramHal) -> BramResult {
        let Some(irq) = self.irq else {
            return Ok(());
        };
        let mut bound = self.bound.lock();
        if *bound {
            warn!("bram: irq {} of device {} is already attached", irq, self.id);
            return Err(BramError::InterruptRegistrationFailed(
                axerrno::AxError::ResourceBusy,
            ));
        }

        // 先置位再注册：注册成功后中断可能立即到来
        self.armed.store(true, Ordering::Release);
        let handler = self.handler();
        if let Err(e) = hal.request_irq(
            irq,
            IrqFlags::SHARED | IrqFlags::TRIGGER_RISING,
            &config::irq_name(self.id),
            self.id,
            handler,
        ) {
            self.armed.store(false, Ordering::Release);
            error!("bram: request irq {} for device {} failed: {:?}", irq, self.id, e);
            return Err(BramError::InterruptRegistrationFailed(e));
        }
        *bound = true;
        debug!("bram: irq {} attached to device {}", irq, self.id);
        Ok(())
    }

    /// Removes the handler. Safe to call when nothing is attached.
    pub fn detach(&self, hal: &dyn BramHal) {
        let Some(irq) = self.irq else {
            return;
        };
        let mut bound = self.bound.lock();
        if !*bound {
            return;
        }
        self.armed.store(false, Ordering::Release);
        hal.free_irq(irq, self.id);
        *bound = false;
        debug!("bram: irq {} detached from device {}", irq, self.id);
    }

    fn handler(&self) -> IrqHandler {
        let id = self.id;
        let channel = self.channel.clone();
        let armed = self.armed.clone();
        Arc::new(move || {
            // a shared line can still fire for us between free_irq and return
            if !armed.load(Ordering::Acquire) {
                return IrqReturn::None;
            }
            channel.notify();
            trace!("bram: irq for device {} handled", id);
            IrqReturn::Handled
        })
    }
}
