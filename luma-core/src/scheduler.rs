//! Per-frame drain loop over the frame queue.
//!
//! The scheduler consumes at most one frame per tick and hands it to
//! the sink, so the display never burns through backlog faster than
//! the refresh cadence; backlog beyond one frame per tick is the
//! shed policy's problem, not the renderer's. When a tick finds the
//! queue empty the loop goes idle; the next push restarts it. There
//! is no "stream ended" signal in scope and no cancellation
//! primitive: idling is the only stop.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::frame::YuvFrame;
use crate::queue::FrameQueue;

/// Display refresh cadence assumed by the headless driver (~60 Hz).
pub const TICK_INTERVAL: Duration = Duration::from_micros(16_667);

/// Consumer seam: anything that can display one frame.
///
/// Per-frame failures stay inside the sink (soft-fail, logged); a
/// single bad draw must never stop the stream, so the contract is
/// infallible from the scheduler's point of view.
pub trait FrameSink {
    fn render(&mut self, frame: &YuvFrame);
}

/// Drives the queue → sink hand-off, one frame per display tick.
///
/// State machine: **Idle** → **Running** on an external wake
/// ([`FrameQueue::push`] reporting a transition), **Running** →
/// **Idle** when [`tick`](Self::tick) finds the queue empty.
pub struct RenderScheduler {
    queue: Arc<FrameQueue>,
    tick_interval: Duration,
}

impl RenderScheduler {
    pub fn new(queue: Arc<FrameQueue>) -> Self {
        Self {
            queue,
            tick_interval: TICK_INTERVAL,
        }
    }

    /// Override the tick cadence. Headless driver only; a windowed
    /// host is paced by its own present/vsync timing instead.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// The queue this scheduler drains.
    pub fn queue(&self) -> &Arc<FrameQueue> {
        &self.queue
    }

    /// Consume at most one frame and render it.
    ///
    /// Returns `true` if the loop should be rescheduled for the next
    /// frame tick, `false` once the queue has drained (the queue
    /// flips itself idle in the same step).
    pub fn tick<S: FrameSink>(&self, sink: &mut S) -> bool {
        match self.queue.pop_one() {
            Some(frame) => {
                sink.render(&frame);
                true
            }
            None => false,
        }
    }

    /// Headless driver: park until a push wakes the queue, then tick
    /// at the refresh cadence until it drains, and repeat.
    ///
    /// Never returns; callers drop the task to stop. Missed ticks are
    /// skipped rather than bursted, so a stall never renders two
    /// frames in one refresh interval.
    pub async fn run<S: FrameSink>(&self, sink: &mut S) {
        loop {
            self.queue.wait_until_active().await;

            let mut ticker = tokio::time::interval(self.tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if !self.tick(sink) {
                    break;
                }
            }
        }
    }
}
