//! Bounded frame holding area between the network and the renderer.
//!
//! The queue decouples arrival jitter from render cadence. It is a
//! single-producer/single-consumer structure: the ingestor pushes,
//! the scheduler pops, and nobody else touches it. Because producer
//! and consumer live on different threads here, the append +
//! check-and-shed sequence runs as one atomic unit under a mutex;
//! the overflow check must never observe a half-applied push.
//!
//! ## Shedding
//!
//! When a push grows the queue past [`SHED_THRESHOLD`], the *entire*
//! queue is cleared, not trimmed to capacity. Under sustained
//! backlog it is better to resynchronize to the newest incoming frame
//! than to render an ever-growing tail of stale ones. Everything
//! before a shed event is discarded, not reordered.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;
use tracing::debug;

use crate::frame::YuvFrame;

/// Queue length above which the whole queue is shed.
pub const SHED_THRESHOLD: usize = 5;

struct Inner {
    frames: VecDeque<YuvFrame>,
    /// True while a drain loop is scheduled. Prevents duplicate
    /// concurrent drain loops and busy-waiting while idle.
    active: bool,
    sheds: u64,
}

/// Bounded SPSC frame queue with shed-on-overflow and an idle/active
/// scheduling flag.
pub struct FrameQueue {
    inner: Mutex<Inner>,
    wake: Notify,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                frames: VecDeque::with_capacity(SHED_THRESHOLD + 1),
                active: false,
                sheds: 0,
            }),
            wake: Notify::new(),
        }
    }

    /// Append a frame to the tail, shedding everything if the queue
    /// grows past [`SHED_THRESHOLD`].
    ///
    /// Returns `true` when this push found the scheduler idle and
    /// flipped it to active; the caller must then signal the
    /// scheduler to resume its per-frame loop. Returns `false` while
    /// a drain loop is already running.
    pub fn push(&self, frame: YuvFrame) -> bool {
        let woke = {
            let mut inner = self.inner.lock().expect("frame queue poisoned");
            inner.frames.push_back(frame);
            if inner.frames.len() > SHED_THRESHOLD {
                inner.sheds += 1;
                let dropped = inner.frames.len();
                inner.frames.clear();
                debug!(dropped, total_sheds = inner.sheds, "queue backlog shed");
            }
            if inner.active {
                false
            } else {
                inner.active = true;
                true
            }
        };
        if woke {
            self.wake.notify_one();
        }
        woke
    }

    /// Remove and return the head frame.
    ///
    /// On an empty queue this flips the active flag off and returns
    /// `None`, signalling the scheduler to stop ticking.
    pub fn pop_one(&self) -> Option<YuvFrame> {
        let mut inner = self.inner.lock().expect("frame queue poisoned");
        match inner.frames.pop_front() {
            Some(frame) => Some(frame),
            None => {
                inner.active = false;
                None
            }
        }
    }

    /// Whether a drain loop is currently scheduled.
    pub fn is_draining(&self) -> bool {
        self.inner.lock().expect("frame queue poisoned").active
    }

    /// Current number of buffered frames.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("frame queue poisoned").frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard all buffered frames. Used on geometry change: frames
    /// validated against the old geometry must never reach the
    /// rebuilt surface. The active flag is left alone; a running
    /// drain loop will find the queue empty and go idle on its own.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("frame queue poisoned");
        inner.frames.clear();
    }

    /// Total shed events since construction.
    pub fn shed_count(&self) -> u64 {
        self.inner.lock().expect("frame queue poisoned").sheds
    }

    /// Wait until a push flips the queue from idle to active.
    ///
    /// Used by the headless async driver; the windowed viewer gets
    /// the same wake via [`StreamEvent::Wake`](crate::StreamEvent).
    pub async fn wait_until_active(&self) {
        loop {
            if self.is_draining() {
                return;
            }
            self.wake.notified().await;
        }
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new()
    }
}
