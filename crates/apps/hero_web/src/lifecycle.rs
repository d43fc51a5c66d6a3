//! Ties a [`HeroGlobe`] to a frame loop and to the host listeners it owns.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use gpu::{RenderBackend, Viewport};
use runtime::{AnimationState, FrameLoop, FrameScheduler, LoopStatus, Subscription, Subscriptions};
use tracing::{info, warn};

use crate::error::HeroError;
use crate::hero::HeroGlobe;

pub struct HeroRuntime<B, S>
where
    B: RenderBackend + 'static,
    S: FrameScheduler + 'static,
{
    globe: Rc<RefCell<HeroGlobe<B>>>,
    frame_loop: Option<FrameLoop<S>>,
    subscriptions: Subscriptions,
    torn_down: bool,
}

impl<B, S> HeroRuntime<B, S>
where
    B: RenderBackend + 'static,
    S: FrameScheduler + 'static,
{
    /// Start drawing `globe` on every frame `scheduler` delivers.
    pub fn start(globe: HeroGlobe<B>, scheduler: S) -> Result<Self, HeroError> {
        let globe = Rc::new(RefCell::new(globe));
        let frame_loop = FrameLoop::start(scheduler, globe.clone())?;
        Ok(Self {
            globe,
            frame_loop: Some(frame_loop),
            subscriptions: Subscriptions::new(),
            torn_down: false,
        })
    }

    /// Handle for host listeners; it does not keep the globe alive.
    pub fn globe(&self) -> Weak<RefCell<HeroGlobe<B>>> {
        Rc::downgrade(&self.globe)
    }

    /// Register a host listener to be removed on teardown. After teardown
    /// the subscription is released immediately.
    pub fn add_subscription(&mut self, subscription: impl Subscription + 'static) {
        self.subscriptions.push(subscription);
        if self.torn_down {
            self.subscriptions.release_all();
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn status(&self) -> LoopStatus {
        self.frame_loop
            .as_ref()
            .map_or(LoopStatus::Stopped, FrameLoop::status)
    }

    pub fn is_running(&self) -> bool {
        self.status() == LoopStatus::Running
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn frames_run(&self) -> u64 {
        self.frame_loop.as_ref().map_or(0, FrameLoop::frames_run)
    }

    pub fn state(&self) -> AnimationState {
        self.globe.borrow().state()
    }

    pub fn resize(&self, viewport: Viewport) -> Result<(), HeroError> {
        resize_globe(&self.globe, viewport)
    }

    pub fn set_scroll_progress(&self, progress: f32) {
        match self.globe.try_borrow_mut() {
            Ok(mut globe) => globe.set_scroll_progress(progress),
            Err(_) => warn!("hero busy; dropping scroll update"),
        }
    }

    /// Stop the loop, remove host listeners and release the scene.
    ///
    /// Returns `false` when already torn down.
    pub fn teardown(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.torn_down = true;

        let frames = self.frames_run();
        if let Some(frame_loop) = self.frame_loop.take() {
            frame_loop.stop();
        }
        let listeners = self.subscriptions.release_all();
        match self.globe.try_borrow_mut() {
            Ok(mut globe) => {
                globe.teardown();
            }
            // Only reachable from inside a frame; the globe releases itself
            // when the last reference goes away.
            Err(_) => warn!("hero busy during teardown; deferring release"),
        }
        info!(frames, listeners, "hero runtime torn down");
        true
    }
}

impl<B, S> Drop for HeroRuntime<B, S>
where
    B: RenderBackend + 'static,
    S: FrameScheduler + 'static,
{
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Resize through a shared handle, as host listeners do.
pub fn resize_globe<B: RenderBackend>(
    globe: &RefCell<HeroGlobe<B>>,
    viewport: Viewport,
) -> Result<(), HeroError> {
    match globe.try_borrow_mut() {
        Ok(mut globe) => globe.resize(viewport),
        Err(_) => {
            warn!("hero busy; dropping resize");
            Ok(())
        }
    }
}
