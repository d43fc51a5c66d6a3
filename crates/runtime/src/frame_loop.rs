//! Host-driven frame loop.
//!
//! The host (a browser's `requestAnimationFrame`, or a test clock) owns the
//! timing; the loop only decides whether to ask for another frame. Each queued
//! callback holds a weak reference to the loop state so a stopped or dropped
//! loop never runs its handler again, even when the host fires a callback that
//! was already queued.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, error, warn};

use crate::frame::Frame;

pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// Host-issued id of a pending frame request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub i32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    Unavailable(String),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::Unavailable(msg) => write!(f, "frame scheduler unavailable: {msg}"),
        }
    }
}

impl std::error::Error for SchedulerError {}

pub trait FrameScheduler {
    fn request_frame(&self, callback: FrameCallback) -> Result<FrameRequest, SchedulerError>;
    fn cancel_frame(&self, request: FrameRequest);
}

/// Work done once per host frame.
pub trait FrameHandler {
    type Error: fmt::Display;

    fn on_frame(&mut self, frame: Frame) -> Result<(), Self::Error>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoopStatus {
    Running,
    Stopped,
    /// The handler returned an error or the next frame could not be requested.
    Failed,
}

struct LoopShared<S> {
    scheduler: S,
    status: Cell<LoopStatus>,
    pending: Cell<Option<FrameRequest>>,
    next_index: Cell<u64>,
}

pub struct FrameLoop<S: FrameScheduler + 'static> {
    shared: Rc<LoopShared<S>>,
}

impl<S: FrameScheduler + 'static> FrameLoop<S> {
    /// Request the first frame. Subsequent frames are requested from inside
    /// each callback for as long as the loop keeps running.
    pub fn start<H>(scheduler: S, handler: Rc<RefCell<H>>) -> Result<Self, SchedulerError>
    where
        H: FrameHandler + 'static,
    {
        let shared = Rc::new(LoopShared {
            scheduler,
            status: Cell::new(LoopStatus::Running),
            pending: Cell::new(None),
            next_index: Cell::new(0),
        });
        schedule_next(&shared, handler)?;
        Ok(Self { shared })
    }

    pub fn status(&self) -> LoopStatus {
        self.shared.status.get()
    }

    pub fn is_running(&self) -> bool {
        self.status() == LoopStatus::Running
    }

    pub fn frames_run(&self) -> u64 {
        self.shared.next_index.get()
    }

    pub fn pending_request(&self) -> Option<FrameRequest> {
        self.shared.pending.get()
    }

    /// Stop the loop and cancel the outstanding request, if any.
    ///
    /// Returns whether the loop was running. Safe to call repeatedly.
    pub fn stop(&self) -> bool {
        let was_running = self.is_running();
        if was_running {
            self.shared.status.set(LoopStatus::Stopped);
        }
        if let Some(request) = self.shared.pending.take() {
            self.shared.scheduler.cancel_frame(request);
        }
        was_running
    }
}

impl<S: FrameScheduler + 'static> Drop for FrameLoop<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn schedule_next<S, H>(
    shared: &Rc<LoopShared<S>>,
    handler: Rc<RefCell<H>>,
) -> Result<(), SchedulerError>
where
    S: FrameScheduler + 'static,
    H: FrameHandler + 'static,
{
    let weak: Weak<LoopShared<S>> = Rc::downgrade(shared);
    let request = shared.scheduler.request_frame(Box::new(move |timestamp_ms| {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        run_frame(&shared, handler, timestamp_ms);
    }))?;
    shared.pending.set(Some(request));
    Ok(())
}

fn run_frame<S, H>(shared: &Rc<LoopShared<S>>, handler: Rc<RefCell<H>>, timestamp_ms: f64)
where
    S: FrameScheduler + 'static,
    H: FrameHandler + 'static,
{
    shared.pending.set(None);
    if shared.status.get() != LoopStatus::Running {
        debug!("frame fired after the loop stopped; ignoring");
        return;
    }

    let index = shared.next_index.get();
    shared.next_index.set(index + 1);

    let result = match handler.try_borrow_mut() {
        Ok(mut h) => h.on_frame(Frame::new(index, timestamp_ms)),
        Err(_) => {
            warn!(frame = index, "frame handler is busy; skipping frame");
            Ok(())
        }
    };
    if let Err(err) = result {
        error!(frame = index, %err, "frame failed; stopping the loop");
        shared.status.set(LoopStatus::Failed);
        return;
    }

    // The handler may have stopped the loop from inside the frame.
    if shared.status.get() != LoopStatus::Running {
        return;
    }
    if let Err(err) = schedule_next(shared, handler) {
        error!(%err, "could not request the next frame");
        shared.status.set(LoopStatus::Failed);
    }
}

#[derive(Default)]
struct ManualQueue {
    queue: RefCell<VecDeque<(FrameRequest, FrameCallback)>>,
    next_id: Cell<i32>,
    cancelled: Cell<u64>,
}

/// Scheduler whose frames fire only when told to. Used by tests and the
/// headless simulation.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Rc<ManualQueue>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Number of requests cancelled while still queued.
    pub fn cancelled(&self) -> u64 {
        self.inner.cancelled.get()
    }

    /// Fire the oldest queued callback. Returns false when nothing was queued.
    pub fn run_next(&self, timestamp_ms: f64) -> bool {
        let next = self.inner.queue.borrow_mut().pop_front();
        match next {
            Some((_, callback)) => {
                callback(timestamp_ms);
                true
            }
            None => false,
        }
    }

    /// Fire up to `count` frames spaced `dt_ms` apart; returns how many fired.
    pub fn run_frames(&self, count: usize, start_ms: f64, dt_ms: f64) -> usize {
        let mut fired = 0;
        while fired < count && self.run_next(start_ms + fired as f64 * dt_ms) {
            fired += 1;
        }
        fired
    }

    /// Remove the oldest callback without running it, as if the host had
    /// already committed to firing it.
    pub fn take_next(&self) -> Option<FrameCallback> {
        self.inner
            .queue
            .borrow_mut()
            .pop_front()
            .map(|(_, callback)| callback)
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&self, callback: FrameCallback) -> Result<FrameRequest, SchedulerError> {
        let id = self.inner.next_id.get() + 1;
        self.inner.next_id.set(id);
        let request = FrameRequest(id);
        self.inner.queue.borrow_mut().push_back((request, callback));
        Ok(request)
    }

    fn cancel_frame(&self, request: FrameRequest) {
        let mut queue = self.inner.queue.borrow_mut();
        let before = queue.len();
        queue.retain(|(r, _)| *r != request);
        if queue.len() < before {
            self.inner.cancelled.set(self.inner.cancelled.get() + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<Frame>,
        fail_at: Option<u64>,
    }

    impl FrameHandler for Recorder {
        type Error = String;

        fn on_frame(&mut self, frame: Frame) -> Result<(), String> {
            if self.fail_at == Some(frame.index) {
                return Err(format!("boom at {}", frame.index));
            }
            self.frames.push(frame);
            Ok(())
        }
    }

    #[test]
    fn runs_one_frame_per_host_callback() {
        let sched = ManualScheduler::new();
        let handler = Rc::new(RefCell::new(Recorder::default()));
        let lp = FrameLoop::start(sched.clone(), handler.clone()).unwrap();

        assert_eq!(sched.pending(), 1);
        assert_eq!(sched.run_frames(3, 100.0, 16.0), 3);
        assert_eq!(sched.pending(), 1);
        assert!(lp.is_running());
        assert_eq!(lp.frames_run(), 3);

        let frames = &handler.borrow().frames;
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2], Frame::new(2, 132.0));
    }

    #[test]
    fn stop_cancels_the_pending_request() {
        let sched = ManualScheduler::new();
        let handler = Rc::new(RefCell::new(Recorder::default()));
        let lp = FrameLoop::start(sched.clone(), handler.clone()).unwrap();
        sched.run_next(0.0);

        assert!(lp.stop());
        assert!(!lp.stop());
        assert_eq!(lp.status(), LoopStatus::Stopped);
        assert_eq!(sched.pending(), 0);
        assert_eq!(sched.cancelled(), 1);
        assert!(!sched.run_next(16.0));
        assert_eq!(handler.borrow().frames.len(), 1);
    }

    #[test]
    fn callback_already_in_flight_is_ignored_after_stop() {
        let sched = ManualScheduler::new();
        let handler = Rc::new(RefCell::new(Recorder::default()));
        let lp = FrameLoop::start(sched.clone(), handler.clone()).unwrap();

        let in_flight = sched.take_next().unwrap();
        lp.stop();
        in_flight(16.0);

        assert!(handler.borrow().frames.is_empty());
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn dropping_the_loop_stops_it() {
        let sched = ManualScheduler::new();
        let handler = Rc::new(RefCell::new(Recorder::default()));
        let lp = FrameLoop::start(sched.clone(), handler.clone()).unwrap();
        let in_flight = sched.take_next().unwrap();
        drop(lp);

        in_flight(0.0);
        assert!(handler.borrow().frames.is_empty());
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn handler_error_stops_the_loop() {
        let sched = ManualScheduler::new();
        let handler = Rc::new(RefCell::new(Recorder {
            fail_at: Some(1),
            ..Recorder::default()
        }));
        let lp = FrameLoop::start(sched.clone(), handler.clone()).unwrap();

        assert_eq!(sched.run_frames(5, 0.0, 16.0), 2);
        assert_eq!(lp.status(), LoopStatus::Failed);
        assert!(!lp.is_running());
        assert_eq!(handler.borrow().frames.len(), 1);
    }

    #[test]
    fn busy_handler_skips_the_frame_but_keeps_running() {
        let sched = ManualScheduler::new();
        let handler = Rc::new(RefCell::new(Recorder::default()));
        let lp = FrameLoop::start(sched.clone(), handler.clone()).unwrap();

        {
            let _guard = handler.borrow_mut();
            sched.run_next(0.0);
        }
        sched.run_next(16.0);

        assert!(lp.is_running());
        assert_eq!(handler.borrow().frames, vec![Frame::new(1, 16.0)]);
    }
}
