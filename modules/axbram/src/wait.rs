// /starry/.arceos/modules/axbram/src/wait.rs

//! Data-available flag shared by the interrupt path and blocked readers.

use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use spin::Mutex;

use crate::device::DeviceId;
use crate::error::{BramError, BramResult};
use crate::hal::BramHal;

/// Where a sleeping reader can be woken.
#[derive(Clone)]
struct Waker {
    hal: Arc<dyn BramHal>,
    key: DeviceId,
}

impl Waker {
    fn wake(&self) {
        self.hal.notify_all(self.key);
    }
}

#[derive(Default)]
struct CancelState {
    requested: AtomicBool,
    // 最近一次等待所在的通道
    waker: Mutex<Option<Waker>>,
}

/// A one-shot cancellation request for a blocked reader.
///
/// Cloning yields a handle to the same request, so another task can cancel
/// a read that is already waiting. The request is consumed by the wait that
/// observes it; a request made while nobody waits cancels the next wait.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<CancelState>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation and wakes the reader sleeping on it, if any.
    pub fn cancel(&self) {
        self.0.requested.store(true, Ordering::Release);
        let waker = self.0.waker.lock().clone();
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.requested.load(Ordering::Acquire)
    }

    fn take(&self) -> bool {
        self.0.requested.swap(false, Ordering::AcqRel)
    }

    fn bind(&self, waker: &Waker) {
        *self.0.waker.lock() = Some(waker.clone());
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CancelToken").field(&self.is_cancelled()).finish()
    }
}

/// Single-flag blocking/notification channel, one per device.
///
/// `available` is set only by [`WaitChannel::notify`] and cleared by the
/// readers it releases. Every notify also advances `generation`, so all
/// readers that were waiting when it happened are released together even
/// though only one of them can observe the flag itself.
///
/// Readers sleep through [`BramHal::wait_until`]; notify, close and
/// cancellation wake them through [`BramHal::notify_all`].
pub struct WaitChannel {
    available: AtomicBool,
    generation: AtomicU64,
    closed: AtomicBool,
    waiters: AtomicUsize,
    waker: Waker,
}

impl WaitChannel {
    pub fn new(hal: Arc<dyn BramHal>, key: DeviceId) -> Self {
        Self {
            available: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            waiters: AtomicUsize::new(0),
            waker: Waker { hal, key },
        }
    }

    /// Marks data as available and wakes every waiter.
    ///
    /// Lock-free on our side; safe to call from interrupt context and with
    /// no waiter.
    pub fn notify(&self) {
        // flag first: a reader that sees the new generation must see it set
        self.available.store(true, Ordering::Release);
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.waker.wake();
    }

    /// Whether a notification is pending.
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Consumes a pending notification without blocking.
    pub fn try_consume(&self) -> bool {
        self.available.swap(false, Ordering::AcqRel)
    }

    /// Suspends the caller until data is available, then clears the flag.
    ///
    /// A cancellation observed on `cancel` returns
    /// [`BramError::Interrupted`] without touching the flag; closing the
    /// channel returns [`BramError::Removed`].
    pub fn wait_for_data(&self, cancel: &CancelToken) -> BramResult {
        let seen = self.generation.load(Ordering::Acquire);
        if self.try_consume() {
            return Ok(());
        }
        cancel.bind(&self.waker);
        self.waiters.fetch_add(1, Ordering::AcqRel);
        let res = loop {
            self.waker.hal.wait_until(self.waker.key, &|| {
                self.generation.load(Ordering::Acquire) != seen
                    || self.closed.load(Ordering::Acquire)
                    || cancel.is_cancelled()
            });
            if self.generation.load(Ordering::Acquire) != seen {
                // notifies that arrived while we slept are coalesced into this one
                self.available.store(false, Ordering::Release);
                break Ok(());
            }
            if self.closed.load(Ordering::Acquire) {
                break Err(BramError::Removed);
            }
            if cancel.take() {
                break Err(BramError::Interrupted);
            }
        };
        self.waiters.fetch_sub(1, Ordering::AcqRel);
        res
    }

    /// Number of readers currently suspended on this channel.
    pub fn waiters(&self) -> usize {
        self.waiters.load(Ordering::Acquire)
    }

    /// Releases every waiter with [`BramError::Removed`]; later waits fail
    /// the same way unless data is still pending.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.waker.wake();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
