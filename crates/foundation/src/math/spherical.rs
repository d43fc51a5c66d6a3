use std::f64::consts::{FRAC_PI_2, TAU};

use serde::{Deserialize, Serialize};

use super::Vec3;

/// Geographic coordinates in degrees.
///
/// Serialized as a `[lon, lat]` pair, matching the order used by the outline data.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl GeoPoint {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(p: GeoPoint) -> Self {
        [p.lon_deg, p.lat_deg]
    }
}

/// Spherical angles in radians.
///
/// `phi` is the polar angle measured from +Y, `theta` the azimuth in the XZ plane
/// measured from +X towards +Z.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SphericalAngles {
    pub phi: f64,
    pub theta: f64,
}

/// Model rotation as yaw (about Y) then pitch (about X), radians.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub yaw: f32,
    pub pitch: f32,
}

impl Orientation {
    pub fn new(yaw: f32, pitch: f32) -> Self {
        Self { yaw, pitch }
    }
}

pub fn geo_to_spherical(p: GeoPoint) -> SphericalAngles {
    SphericalAngles {
        phi: (90.0 - p.lat_deg).to_radians(),
        theta: (p.lon_deg + 180.0).to_radians(),
    }
}

pub fn spherical_to_unit(a: SphericalAngles) -> Vec3 {
    let sin_phi = a.phi.sin();
    Vec3::new(sin_phi * a.theta.cos(), a.phi.cos(), sin_phi * a.theta.sin())
}

/// Map a geographic position onto the unit sphere.
///
/// lat = +90 lands on +Y; lon = -180 has theta = 0 and lands in the +X half.
pub fn project_to_unit_sphere(p: GeoPoint) -> Vec3 {
    spherical_to_unit(geo_to_spherical(p))
}

/// Inverse of [`spherical_to_unit`]; theta is wrapped to `[0, 2π)`.
pub fn unit_to_spherical(v: Vec3) -> SphericalAngles {
    let phi = v.y.clamp(-1.0, 1.0).acos();
    let theta = v.z.atan2(v.x).rem_euclid(TAU);
    SphericalAngles { phi, theta }
}

pub fn spherical_to_geo(a: SphericalAngles) -> GeoPoint {
    GeoPoint::new(a.theta.to_degrees() - 180.0, 90.0 - a.phi.to_degrees())
}

/// Orientation that turns `p` towards a camera sitting on +Z.
///
/// Assumes the model transform `Rx(pitch) * Ry(yaw)`.
pub fn orientation_facing(p: GeoPoint) -> Orientation {
    let theta = geo_to_spherical(p).theta;
    Orientation::new((theta - FRAC_PI_2) as f32, p.lat_deg.to_radians() as f32)
}
