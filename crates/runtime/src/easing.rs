//! Easing curves used to shape animation progress.
//!
//! Every curve maps `[0, 1]` onto `[0, 1]`, fixes both endpoints and clamps its
//! input first.

use serde::{Deserialize, Serialize};

pub fn linear(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// `1 - (1 - t)^3`
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// `8t^4` below one half, `1 - (-2t + 2)^4 / 2` above.
pub fn ease_in_out_quart(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        8.0 * t * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
    }
}

/// `3t^2 - 2t^3`
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
    Linear,
    #[default]
    EaseOutCubic,
    EaseInOutQuart,
    Smoothstep,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Easing::Linear => linear(t),
            Easing::EaseOutCubic => ease_out_cubic(t),
            Easing::EaseInOutQuart => ease_in_out_quart(t),
            Easing::Smoothstep => smoothstep(t),
        }
    }
}

/// `a + (b - a) * t`
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 4] = [
        Easing::Linear,
        Easing::EaseOutCubic,
        Easing::EaseInOutQuart,
        Easing::Smoothstep,
    ];

    #[test]
    fn endpoints_are_fixed() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert_eq!(ease_in_out_quart(0.0), 0.0);
        assert_eq!(ease_in_out_quart(0.5), 0.5);
        assert_eq!(ease_in_out_quart(1.0), 1.0);
        for e in ALL {
            assert_eq!(e.apply(0.0), 0.0, "{e:?}");
            assert_eq!(e.apply(1.0), 1.0, "{e:?}");
        }
    }

    #[test]
    fn midpoint_values() {
        assert_eq!(ease_out_cubic(0.5), 0.875);
        assert_eq!(smoothstep(0.5), 0.5);
        assert!((ease_in_out_quart(0.25) - 0.03125).abs() < 1e-7);
        assert!((ease_in_out_quart(0.75) - 0.96875).abs() < 1e-7);
    }

    #[test]
    fn curves_are_monotonic_and_clamped() {
        for e in ALL {
            let mut prev = e.apply(-1.0);
            assert_eq!(prev, 0.0);
            for i in 0..=200 {
                let v = e.apply(i as f32 / 200.0);
                assert!(v >= prev, "{e:?} decreased at step {i}");
                prev = v;
            }
            assert_eq!(e.apply(3.0), 1.0);
        }
    }

    #[test]
    fn lerp_matches_camera_example() {
        assert_eq!(lerp(15.0, 4.0, 0.875), 5.375);
    }

    #[test]
    fn easing_names_are_camel_case() {
        let e: Easing = serde_json::from_str("\"easeInOutQuart\"").unwrap();
        assert_eq!(e, Easing::EaseInOutQuart);
    }
}
