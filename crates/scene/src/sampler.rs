//! Turns region outlines into a regular lon/lat dot matrix.

use foundation::math::{
    GeoPoint, SphericalAngles, Vec3, geo_to_spherical, spherical_to_geo, spherical_to_unit,
    unit_to_spherical,
};
use foundation::{GeoBounds, Rgb};
use tracing::debug;

use crate::region::{Region, RegionError};

pub const DEFAULT_STEP_DEG: f64 = 1.5;

/// Even-odd ray casting towards +lon.
///
/// Points exactly on an edge fall wherever the half-open comparison puts them;
/// outlines with fewer than three vertices contain nothing.
pub fn point_in_polygon(p: GeoPoint, polygon: &[GeoPoint]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let (x, y) = (p.lon_deg, p.lat_deg);
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (xi, yi) = (polygon[i].lon_deg, polygon[i].lat_deg);
        let (xj, yj) = (polygon[j].lon_deg, polygon[j].lat_deg);
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Grid coordinates `min + i * step` up to and including `max`.
fn grid_axis(min: f64, max: f64, step: f64) -> impl Iterator<Item = f64> {
    (0u64..)
        .map(move |i| min + i as f64 * step)
        .take_while(move |v| *v <= max)
}

/// A grid cell inside a region, with its projection on the unit sphere.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SampledPoint {
    pub geo: GeoPoint,
    pub angles: SphericalAngles,
    pub position: Vec3,
}

impl SampledPoint {
    pub fn from_geo(geo: GeoPoint) -> Self {
        let angles = geo_to_spherical(geo);
        Self {
            geo,
            angles,
            position: spherical_to_unit(angles),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionSamples {
    pub region_id: String,
    pub color: Rgb,
    pub points: Vec<SampledPoint>,
}

impl RegionSamples {
    /// Geographic point under the mean direction of the samples.
    pub fn centroid(&self) -> Option<GeoPoint> {
        if self.points.is_empty() {
            return None;
        }
        let sum = self
            .points
            .iter()
            .fold(Vec3::ZERO, |acc, p| acc + p.position);
        let dir = sum.normalize();
        if dir == Vec3::ZERO {
            return None;
        }
        Some(spherical_to_geo(unit_to_spherical(dir)))
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeographySampler {
    step_deg: f64,
}

impl Default for GeographySampler {
    fn default() -> Self {
        Self {
            step_deg: DEFAULT_STEP_DEG,
        }
    }
}

impl GeographySampler {
    pub fn new(step_deg: f64) -> Result<Self, RegionError> {
        if !(step_deg.is_finite() && step_deg > 0.0) {
            return Err(RegionError::InvalidStep(step_deg));
        }
        Ok(Self { step_deg })
    }

    pub fn step_deg(&self) -> f64 {
        self.step_deg
    }

    /// Grid points of the outline's bounding box that lie inside the outline,
    /// longitude-major.
    pub fn sample_polygon(&self, outline: &[GeoPoint]) -> Vec<SampledPoint> {
        let Some(bounds) = GeoBounds::from_points(outline) else {
            return Vec::new();
        };
        if outline.len() < 3 {
            return Vec::new();
        }

        let mut points = Vec::new();
        for lon in grid_axis(bounds.min.lon_deg, bounds.max.lon_deg, self.step_deg) {
            for lat in grid_axis(bounds.min.lat_deg, bounds.max.lat_deg, self.step_deg) {
                let p = GeoPoint::new(lon, lat);
                if point_in_polygon(p, outline) {
                    points.push(SampledPoint::from_geo(p));
                }
            }
        }
        points
    }

    pub fn sample_region(&self, region: &Region) -> RegionSamples {
        let points = self.sample_polygon(&region.outline);
        debug!(region = %region.id, points = points.len(), "sampled region");
        RegionSamples {
            region_id: region.id.clone(),
            color: region.color,
            points,
        }
    }

    pub fn sample_regions(&self, regions: &[Region]) -> Vec<RegionSamples> {
        regions.iter().map(|r| self.sample_region(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::builtin_regions;
    use pretty_assertions::assert_eq;

    fn square() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(10.0, 0.0),
            GeoPoint::new(10.0, 10.0),
            GeoPoint::new(0.0, 10.0),
        ]
    }

    #[test]
    fn square_with_step_five() {
        let sampler = GeographySampler::new(5.0).unwrap();
        let mut got: Vec<_> = sampler
            .sample_polygon(&square())
            .iter()
            .map(|p| (p.geo.lon_deg, p.geo.lat_deg))
            .collect();
        got.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(got, vec![(0.0, 0.0), (0.0, 5.0), (5.0, 0.0), (5.0, 5.0)]);
    }

    #[test]
    fn ray_cast_edge_convention() {
        let sq = square();
        assert!(point_in_polygon(GeoPoint::new(0.0, 0.0), &sq));
        assert!(point_in_polygon(GeoPoint::new(5.0, 5.0), &sq));
        assert!(!point_in_polygon(GeoPoint::new(10.0, 5.0), &sq));
        assert!(!point_in_polygon(GeoPoint::new(5.0, 10.0), &sq));
        assert!(!point_in_polygon(GeoPoint::new(-1.0, 5.0), &sq));
    }

    #[test]
    fn concave_outline_excludes_the_notch() {
        // U shape open towards +lat.
        let u = vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(9.0, 0.0),
            GeoPoint::new(9.0, 9.0),
            GeoPoint::new(6.0, 9.0),
            GeoPoint::new(6.0, 3.0),
            GeoPoint::new(3.0, 3.0),
            GeoPoint::new(3.0, 9.0),
            GeoPoint::new(0.0, 9.0),
        ];
        assert!(point_in_polygon(GeoPoint::new(1.5, 6.0), &u));
        assert!(!point_in_polygon(GeoPoint::new(4.5, 6.0), &u));
        assert!(point_in_polygon(GeoPoint::new(4.5, 1.5), &u));
    }

    #[test]
    fn degenerate_outlines_yield_nothing() {
        let sampler = GeographySampler::default();
        assert!(sampler.sample_polygon(&[]).is_empty());
        assert!(
            sampler
                .sample_polygon(&[GeoPoint::new(0.0, 0.0), GeoPoint::new(5.0, 5.0)])
                .is_empty()
        );
    }

    #[test]
    fn rejects_bad_steps() {
        assert_eq!(
            GeographySampler::new(0.0),
            Err(RegionError::InvalidStep(0.0))
        );
        assert!(GeographySampler::new(-1.5).is_err());
        assert!(GeographySampler::new(f64::NAN).is_err());
        assert_eq!(GeographySampler::default().step_deg(), 1.5);
    }

    #[test]
    fn grid_has_no_accumulated_drift() {
        let axis: Vec<f64> = grid_axis(-80.0, -60.0, 1.5).collect();
        assert_eq!(axis.len(), 14);
        assert_eq!(axis[10], -80.0 + 10.0 * 1.5);
        assert!(axis.iter().all(|v| *v <= -60.0));
    }

    /// Crossing parity from the sign of the edge cross product, with no
    /// division. Same half-open rule for vertices as the ray cast.
    fn crossing_parity(p: GeoPoint, outline: &[GeoPoint]) -> bool {
        let mut crossings = 0;
        for (i, a) in outline.iter().enumerate() {
            let b = outline[(i + 1) % outline.len()];
            let side = (b.lon_deg - a.lon_deg) * (p.lat_deg - a.lat_deg)
                - (p.lon_deg - a.lon_deg) * (b.lat_deg - a.lat_deg);
            let upward = a.lat_deg <= p.lat_deg && p.lat_deg < b.lat_deg;
            let downward = b.lat_deg <= p.lat_deg && p.lat_deg < a.lat_deg;
            if (upward && side > 0.0) || (downward && side < 0.0) {
                crossings += 1;
            }
        }
        crossings % 2 == 1
    }

    #[test]
    fn crossing_parity_agrees_with_hand_checked_points() {
        let sq = square();
        assert!(crossing_parity(GeoPoint::new(5.0, 5.0), &sq));
        assert!(!crossing_parity(GeoPoint::new(12.0, 5.0), &sq));
        assert!(!crossing_parity(GeoPoint::new(5.0, -3.0), &sq));
    }

    #[test]
    fn builtin_samples_are_inside_and_on_the_unit_sphere() {
        let sampler = GeographySampler::default();
        for region in builtin_regions().unwrap() {
            let samples = sampler.sample_region(&region);
            let bounds = region.bounds().unwrap();
            assert!(!samples.points.is_empty(), "{} is empty", region.id);
            assert_eq!(samples.color, region.color);
            for p in &samples.points {
                assert!(bounds.contains(p.geo));
                assert!(
                    crossing_parity(p.geo, &region.outline),
                    "{} kept {:?} outside its outline",
                    region.id,
                    p.geo
                );
                assert!((p.position.length() - 1.0).abs() < 1e-6);
            }

            // Every grid cell the parity check places inside was kept.
            let step = sampler.step_deg();
            let expected = grid_axis(bounds.min.lon_deg, bounds.max.lon_deg, step)
                .flat_map(|lon| {
                    grid_axis(bounds.min.lat_deg, bounds.max.lat_deg, step)
                        .map(move |lat| GeoPoint::new(lon, lat))
                })
                .filter(|p| crossing_parity(*p, &region.outline))
                .count();
            assert_eq!(samples.points.len(), expected, "{}", region.id);
        }
    }

    #[test]
    fn sampling_is_deterministic() {
        let regions = builtin_regions().unwrap();
        let sampler = GeographySampler::default();
        assert_eq!(
            sampler.sample_regions(&regions),
            sampler.sample_regions(&regions)
        );
    }

    #[test]
    fn centroid_of_square_samples() {
        let sampler = GeographySampler::new(5.0).unwrap();
        let samples = RegionSamples {
            region_id: "square".into(),
            color: Rgb::WHITE,
            points: sampler.sample_polygon(&square()),
        };
        let c = samples.centroid().unwrap();
        assert!((c.lon_deg - 2.5).abs() < 0.05, "{c:?}");
        assert!((c.lat_deg - 2.5).abs() < 0.05, "{c:?}");

        let empty = RegionSamples {
            points: Vec::new(),
            ..samples
        };
        assert_eq!(empty.centroid(), None);
    }
}
