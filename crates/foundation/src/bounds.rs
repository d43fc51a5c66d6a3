use crate::math::GeoPoint;

/// Axis-aligned bounding box in (lon, lat) degrees.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoBounds {
    pub min: GeoPoint,
    pub max: GeoPoint,
}

impl GeoBounds {
    pub fn new(min: GeoPoint, max: GeoPoint) -> Self {
        GeoBounds { min, max }
    }

    /// Smallest box holding every point, or `None` for an empty slice.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut b = GeoBounds::new(*first, *first);
        for p in rest {
            b.min.lon_deg = b.min.lon_deg.min(p.lon_deg);
            b.min.lat_deg = b.min.lat_deg.min(p.lat_deg);
            b.max.lon_deg = b.max.lon_deg.max(p.lon_deg);
            b.max.lat_deg = b.max.lat_deg.max(p.lat_deg);
        }
        Some(b)
    }

    /// Closed containment test (edges count as inside).
    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lon_deg >= self.min.lon_deg
            && p.lon_deg <= self.max.lon_deg
            && p.lat_deg >= self.min.lat_deg
            && p.lat_deg <= self.max.lat_deg
    }

    pub fn width_deg(&self) -> f64 {
        (self.max.lon_deg - self.min.lon_deg).max(0.0)
    }

    pub fn height_deg(&self) -> f64 {
        (self.max.lat_deg - self.min.lat_deg).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::GeoBounds;
    use crate::math::GeoPoint;

    #[test]
    fn from_points_covers_all_vertices() {
        let pts = [
            GeoPoint::new(-10.0, 60.0),
            GeoPoint::new(35.0, 55.0),
            GeoPoint::new(5.0, 35.0),
        ];
        let b = GeoBounds::from_points(&pts).unwrap();
        assert_eq!(b.min, GeoPoint::new(-10.0, 35.0));
        assert_eq!(b.max, GeoPoint::new(35.0, 60.0));
        assert_eq!(b.width_deg(), 45.0);
        assert_eq!(b.height_deg(), 25.0);
        assert!(pts.iter().all(|p| b.contains(*p)));
    }

    #[test]
    fn empty_input_has_no_bounds() {
        assert!(GeoBounds::from_points(&[]).is_none());
    }
}
