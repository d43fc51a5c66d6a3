//! Column-major (WGSL layout) matrix helpers and the hero's perspective camera.

use foundation::math::Orientation;

pub type Mat4 = [[f32; 4]; 4];

pub const MAT4_IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// `a * b`
pub fn mat4_mul(a: Mat4, b: Mat4) -> Mat4 {
    let mut c = [[0.0f32; 4]; 4];
    for col in 0..4 {
        for row in 0..4 {
            c[col][row] = a[0][row] * b[col][0]
                + a[1][row] * b[col][1]
                + a[2][row] * b[col][2]
                + a[3][row] * b[col][3];
        }
    }
    c
}

pub fn mat4_transform(m: Mat4, v: [f32; 4]) -> [f32; 4] {
    let mut out = [0.0f32; 4];
    for (row, o) in out.iter_mut().enumerate() {
        *o = m[0][row] * v[0] + m[1][row] * v[1] + m[2][row] * v[2] + m[3][row] * v[3];
    }
    out
}

/// Right-handed perspective with depth in `[0, 1]`.
pub fn mat4_perspective_rh_z0(fov_y_rad: f64, aspect: f64, near: f64, far: f64) -> Mat4 {
    let f = 1.0 / (0.5 * fov_y_rad).tan();
    let m00 = (f / aspect) as f32;
    let m11 = f as f32;
    let m22 = (far / (near - far)) as f32;
    let m23 = ((near * far) / (near - far)) as f32;

    [
        [m00, 0.0, 0.0, 0.0],
        [0.0, m11, 0.0, 0.0],
        [0.0, 0.0, m22, -1.0],
        [0.0, 0.0, m23, 0.0],
    ]
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(a: [f64; 3]) -> [f64; 3] {
    let n = dot(a, a).sqrt();
    if n <= 0.0 {
        [0.0, 0.0, 0.0]
    } else {
        [a[0] / n, a[1] / n, a[2] / n]
    }
}

pub fn mat4_look_at_rh(eye: [f64; 3], target: [f64; 3], up: [f64; 3]) -> Mat4 {
    let f = normalize(sub(target, eye));
    let s = normalize(cross(f, up));
    let u = cross(s, f);

    let ex = -dot(s, eye);
    let ey = -dot(u, eye);
    let ez = dot(f, eye);

    [
        [s[0] as f32, u[0] as f32, (-f[0]) as f32, 0.0],
        [s[1] as f32, u[1] as f32, (-f[1]) as f32, 0.0],
        [s[2] as f32, u[2] as f32, (-f[2]) as f32, 0.0],
        [ex as f32, ey as f32, ez as f32, 1.0],
    ]
}

pub fn mat4_rotation_y(angle: f32) -> Mat4 {
    let (s, c) = angle.sin_cos();
    [
        [c, 0.0, -s, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [s, 0.0, c, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

pub fn mat4_rotation_x(angle: f32) -> Mat4 {
    let (s, c) = angle.sin_cos();
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, c, s, 0.0],
        [0.0, -s, c, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

pub fn mat4_scale(s: f32) -> Mat4 {
    [
        [s, 0.0, 0.0, 0.0],
        [0.0, s, 0.0, 0.0],
        [0.0, 0.0, s, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// `Rx(pitch) * Ry(yaw) * S(scale)`, shared by every globe layer.
pub fn model_matrix(orientation: Orientation, scale: f32) -> Mat4 {
    mat4_mul(
        mat4_rotation_x(orientation.pitch),
        mat4_mul(mat4_rotation_y(orientation.yaw), mat4_scale(scale)),
    )
}

/// Camera on +Z looking at the origin.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_y_rad: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
    pub distance: f64,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            fov_y_rad: 45f64.to_radians(),
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
            distance: 15.0,
        }
    }
}

impl PerspectiveCamera {
    /// Aspect from pixel dimensions; a zero height counts as square.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = if height == 0 {
            1.0
        } else {
            (width as f64 / height as f64).max(1e-6)
        };
    }

    pub fn position(&self) -> [f64; 3] {
        [0.0, 0.0, self.distance]
    }

    pub fn view(&self) -> Mat4 {
        mat4_look_at_rh(self.position(), [0.0, 0.0, 0.0], [0.0, 1.0, 0.0])
    }

    pub fn projection(&self) -> Mat4 {
        mat4_perspective_rh_z0(self.fov_y_rad, self.aspect, self.near, self.far)
    }

    pub fn view_proj(&self) -> Mat4 {
        mat4_mul(self.projection(), self.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundation::math::{GeoPoint, orientation_facing, project_to_unit_sphere};

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn identity_is_neutral() {
        let m = mat4_rotation_y(0.7);
        assert_eq!(mat4_mul(MAT4_IDENTITY, m), m);
        assert_eq!(mat4_mul(m, MAT4_IDENTITY), m);
    }

    #[test]
    fn model_matrix_turns_region_to_camera() {
        let p = GeoPoint::new(-100.0, 45.0);
        let v = project_to_unit_sphere(p).as_f32_array();
        let m = model_matrix(orientation_facing(p), 2.0);
        let out = mat4_transform(m, [v[0], v[1], v[2], 1.0]);
        assert!(close(out[0], 0.0) && close(out[1], 0.0), "{out:?}");
        assert!(close(out[2], 2.0), "{out:?}");
    }

    #[test]
    fn origin_projects_to_screen_center() {
        let mut cam = PerspectiveCamera::default();
        cam.set_viewport(1600, 900);
        let clip = mat4_transform(cam.view_proj(), [0.0, 0.0, 0.0, 1.0]);
        assert!(close(clip[0], 0.0) && close(clip[1], 0.0));
        assert!(close(clip[3], 15.0));
        let depth = clip[2] / clip[3];
        assert!((0.0..=1.0).contains(&depth));
    }

    #[test]
    fn zero_height_means_square_aspect() {
        let mut cam = PerspectiveCamera::default();
        cam.set_viewport(800, 0);
        assert_eq!(cam.aspect, 1.0);
        cam.set_viewport(800, 400);
        assert_eq!(cam.aspect, 2.0);
    }
}
