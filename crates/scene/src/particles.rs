use std::collections::BTreeMap;

use foundation::Rgb;

use crate::sampler::RegionSamples;

/// Flattened per-particle attributes, one entry per sampled point across all
/// regions. Built once; never updated in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleBuffer {
    /// xyz triples.
    pub positions: Vec<f32>,
    /// rgb triples.
    pub colors: Vec<f32>,
    pub sizes: Vec<f32>,
}

impl ParticleBuffer {
    /// Lift every sample to `radius`. A region's color is replaced by its
    /// entry in `tints` when present.
    pub fn build(
        samples: &[RegionSamples],
        radius: f64,
        size: f32,
        tints: &BTreeMap<String, Rgb>,
    ) -> Self {
        let total: usize = samples.iter().map(|s| s.points.len()).sum();
        let mut buf = ParticleBuffer {
            positions: Vec::with_capacity(total * 3),
            colors: Vec::with_capacity(total * 3),
            sizes: Vec::with_capacity(total),
        };

        for region in samples {
            let color = tints.get(&region.region_id).copied().unwrap_or(region.color);
            for p in &region.points {
                buf.positions
                    .extend_from_slice(&p.position.scale(radius).as_f32_array());
                buf.colors.extend_from_slice(&color.to_array());
                buf.sizes.push(size);
            }
        }
        buf
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn position(&self, i: usize) -> [f32; 3] {
        [
            self.positions[3 * i],
            self.positions[3 * i + 1],
            self.positions[3 * i + 2],
        ]
    }

    pub fn color(&self, i: usize) -> [f32; 3] {
        [self.colors[3 * i], self.colors[3 * i + 1], self.colors[3 * i + 2]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::SampledPoint;
    use foundation::math::GeoPoint;

    fn samples() -> Vec<RegionSamples> {
        vec![
            RegionSamples {
                region_id: "a".into(),
                color: Rgb::from_hex(0xff0000),
                points: vec![
                    SampledPoint::from_geo(GeoPoint::new(0.0, 0.0)),
                    SampledPoint::from_geo(GeoPoint::new(10.0, 20.0)),
                ],
            },
            RegionSamples {
                region_id: "b".into(),
                color: Rgb::from_hex(0x00ff00),
                points: vec![SampledPoint::from_geo(GeoPoint::new(-30.0, -45.0))],
            },
        ]
    }

    #[test]
    fn flattens_all_regions() {
        let buf = ParticleBuffer::build(&samples(), 1.51, 0.025, &BTreeMap::new());
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.positions.len(), 9);
        assert_eq!(buf.colors.len(), 9);
        assert!(buf.sizes.iter().all(|&s| s == 0.025));
        assert_eq!(buf.color(0), [1.0, 0.0, 0.0]);
        assert_eq!(buf.color(2), [0.0, 1.0, 0.0]);
        for i in 0..buf.len() {
            let [x, y, z] = buf.position(i);
            assert!(((x * x + y * y + z * z).sqrt() - 1.51).abs() < 1e-5);
        }
    }

    #[test]
    fn tints_override_region_colors() {
        let mut tints = BTreeMap::new();
        tints.insert("b".to_string(), Rgb::WHITE);
        let buf = ParticleBuffer::build(&samples(), 1.0, 0.1, &tints);
        assert_eq!(buf.color(0), [1.0, 0.0, 0.0]);
        assert_eq!(buf.color(2), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn empty_input_gives_empty_buffer() {
        let buf = ParticleBuffer::build(&[], 1.0, 0.1, &BTreeMap::new());
        assert!(buf.is_empty());
    }
}
