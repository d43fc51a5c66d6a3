//! Intro/idle animation of the hero globe.
//!
//! The driver is a pure function of the frame timestamps it is fed plus its own
//! previous state, so a recorded sequence of timestamps always replays to the
//! same states.

use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::fmt;

use foundation::math::Orientation;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::easing::{Easing, lerp};
use crate::frame::Frame;

pub const DEFAULT_DURATION_MS: f32 = 4000.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Zooming in and spinning down.
    Entering,
    /// Still inside the intro window, blending towards the featured region.
    Focusing,
    /// Intro finished; slow spin until teardown.
    Idle,
}

/// Couples camera distance and an extra yaw to page scroll.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrollCoupling {
    /// Scroll progress below which nothing happens.
    pub threshold: f32,
    /// Added to the camera distance at full scroll.
    pub distance_delta: f32,
    /// Added to the model yaw at full scroll (radians).
    pub yaw_delta: f32,
    pub easing: Easing,
}

impl Default for ScrollCoupling {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            distance_delta: -1.5,
            yaw_delta: FRAC_PI_2,
            easing: Easing::Smoothstep,
        }
    }
}

impl ScrollCoupling {
    /// Eased coupling factor for a raw scroll progress in `[0, 1]`.
    pub fn factor(&self, scroll_progress: f32) -> f32 {
        let span = (1.0 - self.threshold).max(f32::EPSILON);
        self.easing
            .apply(((scroll_progress - self.threshold) / span).clamp(0.0, 1.0))
    }
}

/// Per-particle brightness/size pulsing, mirrored by the particle shader.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PulseParams {
    pub rate: f32,
    pub spread: f32,
    pub amplitude: f32,
}

impl Default for PulseParams {
    fn default() -> Self {
        Self {
            rate: 2.0,
            spread: 10.0,
            amplitude: 0.1,
        }
    }
}

impl PulseParams {
    /// `sin(time * rate + x * spread) * amplitude + 1`
    pub fn factor(&self, time_s: f32, position_x: f32) -> f32 {
        (time_s * self.rate + position_x * self.spread).sin() * self.amplitude + 1.0
    }
}

/// Timing, easing and target parameters for one hero variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnimationProfile {
    /// Intro length; set from the top-level `animationDuration` option.
    #[serde(skip)]
    pub duration_ms: f32,
    pub start_distance: f32,
    pub end_distance: f32,
    pub start_scale: f32,
    pub end_scale: f32,
    pub scale_easing: Easing,
    pub camera_easing: Easing,
    /// Yaw added per frame at progress 0 (radians).
    pub rotation_speed: f32,
    /// Fraction of `rotation_speed` lost by progress 1.
    pub rotation_decay: f32,
    /// Yaw added per frame once the intro is over.
    pub idle_rotation_speed: f32,
    pub focus_threshold: f32,
    /// Per-frame blend factor towards the focus orientation at full focus.
    pub focus_rate: f32,
    pub focus_easing: Easing,
    /// Overrides the orientation derived from the featured region.
    pub focus_orientation: Option<Orientation>,
    pub pulse: PulseParams,
    pub scroll: Option<ScrollCoupling>,
}

impl Default for AnimationProfile {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_DURATION_MS,
            start_distance: 15.0,
            end_distance: 4.0,
            start_scale: 0.1,
            end_scale: 1.0,
            scale_easing: Easing::EaseOutCubic,
            camera_easing: Easing::EaseInOutQuart,
            rotation_speed: 0.015,
            rotation_decay: 0.7,
            idle_rotation_speed: 0.015 * 0.3,
            focus_threshold: 0.6,
            focus_rate: 0.03,
            focus_easing: Easing::EaseInOutQuart,
            focus_orientation: None,
            pulse: PulseParams::default(),
            scroll: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvalidProfile {
    pub field: &'static str,
    pub reason: String,
}

impl fmt::Display for InvalidProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid animation profile field `{}`: {}", self.field, self.reason)
    }
}

impl std::error::Error for InvalidProfile {}

impl AnimationProfile {
    /// Default timings plus scroll-coupled zoom and yaw.
    pub fn scroll_coupled() -> Self {
        Self {
            scroll: Some(ScrollCoupling::default()),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), InvalidProfile> {
        let bad = |field, reason: &str| {
            Err(InvalidProfile {
                field,
                reason: reason.to_string(),
            })
        };

        if !(self.duration_ms.is_finite() && self.duration_ms > 0.0) {
            return bad("durationMs", "must be a positive number");
        }
        for (field, v) in [
            ("startDistance", self.start_distance),
            ("endDistance", self.end_distance),
            ("startScale", self.start_scale),
            ("endScale", self.end_scale),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return bad(field, "must be a positive number");
            }
        }
        if !(0.0..1.0).contains(&self.focus_threshold) {
            return bad("focusThreshold", "must be in [0, 1)");
        }
        if !(0.0..=1.0).contains(&self.focus_rate) {
            return bad("focusRate", "must be in [0, 1]");
        }
        if let Some(scroll) = &self.scroll {
            if !(0.0..1.0).contains(&scroll.threshold) {
                return bad("scroll.threshold", "must be in [0, 1)");
            }
        }
        Ok(())
    }
}

/// Everything the renderer needs from the animation for one frame.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationState {
    pub frame_index: u64,
    pub elapsed_ms: f64,
    pub progress: f32,
    pub phase: Phase,
    pub camera_distance: f32,
    pub scale: f32,
    pub yaw: f32,
    pub pitch: f32,
    /// Scroll-driven yaw, added on top of `yaw` without accumulating.
    pub scroll_yaw: f32,
    /// Shader time uniform (seconds).
    pub time_s: f32,
}

impl AnimationState {
    pub fn initial(profile: &AnimationProfile) -> Self {
        Self {
            frame_index: 0,
            elapsed_ms: 0.0,
            progress: 0.0,
            phase: Phase::Entering,
            camera_distance: profile.start_distance,
            scale: profile.start_scale,
            yaw: 0.0,
            pitch: 0.0,
            scroll_yaw: 0.0,
            time_s: 0.0,
        }
    }

    /// Rotation applied to every globe layer.
    pub fn model_orientation(&self) -> Orientation {
        Orientation::new(self.yaw + self.scroll_yaw, self.pitch)
    }
}

/// `clamp(elapsed / duration, 0, 1)`
pub fn progress_at(elapsed_ms: f64, duration_ms: f32) -> f32 {
    if duration_ms <= 0.0 {
        return 1.0;
    }
    ((elapsed_ms / duration_ms as f64) as f32).clamp(0.0, 1.0)
}

pub fn phase_at(elapsed_ms: f64, profile: &AnimationProfile) -> Phase {
    if elapsed_ms >= profile.duration_ms as f64 {
        Phase::Idle
    } else if progress_at(elapsed_ms, profile.duration_ms) > profile.focus_threshold {
        Phase::Focusing
    } else {
        Phase::Entering
    }
}

/// `target` shifted by whole turns to lie within half a turn of `current`.
fn nearest_turn(target: f32, current: f32) -> f32 {
    current + (target - current + PI).rem_euclid(TAU) - PI
}

/// Advances the intro/idle animation once per frame.
#[derive(Debug, Clone)]
pub struct AnimationDriver {
    profile: AnimationProfile,
    focus: Option<Orientation>,
    state: AnimationState,
    start_ms: Option<f64>,
    scroll_progress: f32,
}

impl AnimationDriver {
    /// `focus` is used unless the profile carries its own `focus_orientation`.
    pub fn new(profile: AnimationProfile, focus: Option<Orientation>) -> Self {
        let focus = profile.focus_orientation.or(focus);
        Self {
            state: AnimationState::initial(&profile),
            profile,
            focus,
            start_ms: None,
            scroll_progress: 0.0,
        }
    }

    pub fn profile(&self) -> &AnimationProfile {
        &self.profile
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    pub fn focus_target(&self) -> Option<Orientation> {
        self.focus
    }

    pub fn scroll_progress(&self) -> f32 {
        self.scroll_progress
    }

    /// Scroll progress is clamped to `[0, 1]`; NaN counts as 0.
    pub fn set_scroll_progress(&mut self, progress: f32) {
        self.scroll_progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
    }

    /// Compute the state for `frame`. The first frame fixes the start time.
    pub fn step(&mut self, frame: Frame) -> AnimationState {
        let p = &self.profile;
        let start = *self.start_ms.get_or_insert(frame.timestamp_ms);
        let elapsed_ms = (frame.timestamp_ms - start).max(self.state.elapsed_ms);

        let progress = progress_at(elapsed_ms, p.duration_ms);
        let phase = phase_at(elapsed_ms, p);

        let scale_t = p.scale_easing.apply(progress);
        let camera_t = p.camera_easing.apply(progress);
        let mut camera_distance = lerp(p.start_distance, p.end_distance, camera_t);
        let scale = lerp(p.start_scale, p.end_scale, scale_t);

        let mut yaw = self.state.yaw;
        let mut pitch = self.state.pitch;
        if phase == Phase::Idle {
            yaw += p.idle_rotation_speed;
        } else {
            yaw += p.rotation_speed * (1.0 - progress * p.rotation_decay);
        }

        if phase == Phase::Focusing {
            if let Some(target) = self.focus {
                let focus_t = (progress - p.focus_threshold) / (1.0 - p.focus_threshold);
                let k = p.focus_easing.apply(focus_t) * p.focus_rate;
                yaw += (nearest_turn(target.yaw, yaw) - yaw) * k;
                pitch += (target.pitch - pitch) * k;
            }
        }

        if yaw.abs() > TAU {
            yaw = yaw.rem_euclid(TAU);
        }

        let mut scroll_yaw = 0.0;
        if let Some(scroll) = &p.scroll {
            let s = scroll.factor(self.scroll_progress);
            camera_distance += scroll.distance_delta * s;
            scroll_yaw = scroll.yaw_delta * s;
        }

        if phase != self.state.phase {
            debug!(frame = frame.index, ?phase, elapsed_ms, "animation phase changed");
        }

        self.state = AnimationState {
            frame_index: frame.index,
            elapsed_ms,
            progress,
            phase,
            camera_distance,
            scale,
            yaw,
            pitch,
            scroll_yaw,
            time_s: (elapsed_ms / 1000.0) as f32,
        };
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(driver: &mut AnimationDriver, until_ms: f64, dt_ms: f64) -> Vec<AnimationState> {
        let mut out = Vec::new();
        let mut frame = Frame::new(0, 0.0);
        while frame.timestamp_ms <= until_ms {
            out.push(driver.step(frame));
            frame = frame.next(dt_ms);
        }
        out
    }

    #[test]
    fn first_frame_starts_the_clock() {
        let mut d = AnimationDriver::new(AnimationProfile::default(), None);
        let s = d.step(Frame::new(0, 12_345.0));
        assert_eq!(s.elapsed_ms, 0.0);
        assert_eq!(s.progress, 0.0);
        assert_eq!(s.phase, Phase::Entering);
        assert_eq!(s.camera_distance, 15.0);
        assert_eq!(s.scale, 0.1);
        assert_eq!(s.yaw, 0.015);
    }

    #[test]
    fn halfway_through_default_intro() {
        let mut d = AnimationDriver::new(AnimationProfile::default(), None);
        d.step(Frame::new(0, 1000.0));
        let s = d.step(Frame::new(1, 3000.0));
        assert_eq!(s.progress, 0.5);
        assert_eq!(s.phase, Phase::Entering);
        assert_eq!(s.camera_distance, 9.5);
        assert!((s.scale - (0.1 + 0.9 * 0.875)).abs() < 1e-6);
        assert_eq!(s.time_s, 2.0);
    }

    #[test]
    fn cubic_camera_easing_matches_worked_example() {
        let profile = AnimationProfile {
            camera_easing: Easing::EaseOutCubic,
            ..AnimationProfile::default()
        };
        let mut d = AnimationDriver::new(profile, None);
        d.step(Frame::new(0, 0.0));
        let s = d.step(Frame::new(1, 2000.0));
        assert_eq!(s.camera_distance, 5.375);
    }

    #[test]
    fn progress_is_monotonic_and_clamped() {
        let mut d = AnimationDriver::new(AnimationProfile::default(), None);
        let stamps = [0.0, 500.0, 400.0, 3999.0, 4000.0, 3000.0, 9000.0];
        let mut prev = 0.0;
        for (i, ts) in stamps.into_iter().enumerate() {
            let s = d.step(Frame::new(i as u64, ts));
            assert!(s.progress >= prev, "progress went back at {ts}");
            prev = s.progress;
        }
        assert_eq!(prev, 1.0);
        assert_eq!(progress_at(1e9, 4000.0), 1.0);
        assert_eq!(progress_at(-5.0, 4000.0), 0.0);
    }

    #[test]
    fn phases_follow_threshold_and_duration() {
        let p = AnimationProfile::default();
        assert_eq!(phase_at(0.0, &p), Phase::Entering);
        assert_eq!(phase_at(2400.0, &p), Phase::Entering);
        assert_eq!(phase_at(2500.0, &p), Phase::Focusing);
        assert_eq!(phase_at(3999.0, &p), Phase::Focusing);
        assert_eq!(phase_at(4000.0, &p), Phase::Idle);
    }

    #[test]
    fn rotation_slows_down_over_the_intro() {
        let mut d = AnimationDriver::new(AnimationProfile::default(), None);
        let states = run(&mut d, 3900.0, 100.0);
        let steps: Vec<f32> = states.windows(2).map(|w| w[1].yaw - w[0].yaw).collect();
        assert!(steps.windows(2).all(|w| w[1] <= w[0] + 1e-6));
        assert!(steps[0] > steps[steps.len() - 1]);
    }

    #[test]
    fn focusing_pulls_pitch_towards_target() {
        let target = Orientation::new(0.0, 0.5);
        let profile = AnimationProfile {
            rotation_speed: 0.0,
            ..AnimationProfile::default()
        };
        let mut d = AnimationDriver::new(profile, Some(target));
        let states = run(&mut d, 3999.0, 16.0);

        for s in states.iter().filter(|s| s.phase == Phase::Entering) {
            assert_eq!(s.pitch, 0.0);
        }
        let focusing: Vec<_> = states.iter().filter(|s| s.phase == Phase::Focusing).collect();
        assert!(!focusing.is_empty());
        assert!(focusing.windows(2).all(|w| w[1].pitch >= w[0].pitch));
        let last = focusing[focusing.len() - 1];
        assert!(last.pitch > 0.0 && last.pitch < 0.5);
    }

    #[test]
    fn focusing_takes_the_short_way_round() {
        let target = Orientation::new(-PI * 0.25, 0.0);
        let profile = AnimationProfile {
            rotation_speed: 0.0,
            focus_threshold: 0.0,
            ..AnimationProfile::default()
        };
        let mut d = AnimationDriver::new(profile, Some(target));
        d.state.yaw = 3.0 * TAU;
        let mut prev_gap = f32::MAX;
        for s in run(&mut d, 3999.0, 50.0).iter().skip(1) {
            let gap = (nearest_turn(target.yaw, s.yaw) - s.yaw).abs();
            assert!(gap <= prev_gap + 1e-5);
            prev_gap = gap;
        }
        assert!(prev_gap < PI * 0.25);
    }

    #[test]
    fn profile_focus_overrides_region_focus() {
        let profile = AnimationProfile {
            focus_orientation: Some(Orientation::new(1.0, 0.2)),
            ..AnimationProfile::default()
        };
        let d = AnimationDriver::new(profile, Some(Orientation::new(-1.0, 0.0)));
        assert_eq!(d.focus_target(), Some(Orientation::new(1.0, 0.2)));
    }

    #[test]
    fn idle_spins_slowly_without_focus_blend() {
        let target = Orientation::new(2.0, 0.3);
        let mut d = AnimationDriver::new(AnimationProfile::default(), Some(target));
        d.step(Frame::new(0, 0.0));
        let a = d.step(Frame::new(1, 5000.0));
        let b = d.step(Frame::new(2, 5016.0));
        assert_eq!(a.phase, Phase::Idle);
        assert_eq!(b.progress, 1.0);
        assert_eq!(b.camera_distance, 4.0);
        assert_eq!(b.scale, 1.0);
        assert!((b.yaw - a.yaw - 0.0045).abs() < 1e-6);
        assert_eq!(b.pitch, a.pitch);
    }

    #[test]
    fn scroll_coupling_is_opt_in() {
        let mut plain = AnimationDriver::new(AnimationProfile::default(), None);
        plain.set_scroll_progress(1.0);
        plain.step(Frame::new(0, 0.0));
        let s = plain.step(Frame::new(1, 5000.0));
        assert_eq!(s.camera_distance, 4.0);
        assert_eq!(s.scroll_yaw, 0.0);

        let mut scrolled = AnimationDriver::new(AnimationProfile::scroll_coupled(), None);
        scrolled.set_scroll_progress(1.0);
        scrolled.step(Frame::new(0, 0.0));
        let s = scrolled.step(Frame::new(1, 5000.0));
        assert_eq!(s.camera_distance, 2.5);
        assert_eq!(s.scroll_yaw, FRAC_PI_2);
        assert_eq!(s.model_orientation().yaw, s.yaw + FRAC_PI_2);
    }

    #[test]
    fn scroll_progress_is_sanitized() {
        let mut d = AnimationDriver::new(AnimationProfile::scroll_coupled(), None);
        d.set_scroll_progress(f32::NAN);
        assert_eq!(d.scroll_progress(), 0.0);
        d.set_scroll_progress(7.0);
        assert_eq!(d.scroll_progress(), 1.0);
        assert_eq!(ScrollCoupling::default().factor(0.05), 0.0);
    }

    #[test]
    fn pulse_desynchronizes_particles() {
        let pulse = PulseParams::default();
        assert_eq!(pulse.factor(0.0, 0.0), 1.0);
        assert_ne!(pulse.factor(1.0, 0.0), pulse.factor(1.0, 0.3));
        for i in 0..100 {
            let f = pulse.factor(i as f32 * 0.37, i as f32 * 0.01);
            assert!((0.9..=1.1).contains(&f));
        }
    }

    #[test]
    fn validation_rejects_bad_profiles() {
        assert!(AnimationProfile::default().validate().is_ok());
        let bad = AnimationProfile {
            duration_ms: 0.0,
            ..AnimationProfile::default()
        };
        assert_eq!(bad.validate().unwrap_err().field, "durationMs");
        let bad = AnimationProfile {
            focus_threshold: 1.0,
            ..AnimationProfile::default()
        };
        assert_eq!(bad.validate().unwrap_err().field, "focusThreshold");
    }

    #[test]
    fn profile_deserializes_partially() {
        let p: AnimationProfile =
            serde_json::from_str(r#"{"endDistance": 5.0, "scroll": {"yawDelta": 1.0}}"#).unwrap();
        assert_eq!(p.end_distance, 5.0);
        assert_eq!(p.start_distance, 15.0);
        assert_eq!(p.duration_ms, DEFAULT_DURATION_MS);
        assert_eq!(p.scroll.unwrap().yaw_delta, 1.0);
        assert_eq!(p.scroll.unwrap().threshold, 0.1);
    }
}
