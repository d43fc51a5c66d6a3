use std::collections::BTreeSet;

use foundation::math::GeoPoint;
use foundation::{GeoBounds, Rgb};
use serde::{Deserialize, Serialize};

const BUILTIN_REGIONS_JSON: &str = include_str!("../data/continents.json");

/// A named landmass drawn as a dot matrix.
///
/// The outline is implicitly closed; a repeated first vertex is harmless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub name: String,
    pub color: Rgb,
    pub outline: Vec<GeoPoint>,
}

impl Region {
    pub fn bounds(&self) -> Option<GeoBounds> {
        GeoBounds::from_points(&self.outline)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegionError {
    Parse(String),
    DuplicateId(String),
    InvalidStep(f64),
}

impl std::fmt::Display for RegionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionError::Parse(msg) => write!(f, "region data is malformed: {msg}"),
            RegionError::DuplicateId(id) => write!(f, "region id {id:?} appears more than once"),
            RegionError::InvalidStep(step) => {
                write!(f, "sample step must be a positive number of degrees, got {step}")
            }
        }
    }
}

impl std::error::Error for RegionError {}

/// Parse a JSON array of regions, keeping file order.
pub fn parse_regions(json: &str) -> Result<Vec<Region>, RegionError> {
    let regions: Vec<Region> =
        serde_json::from_str(json).map_err(|e| RegionError::Parse(e.to_string()))?;

    let mut seen = BTreeSet::new();
    for region in &regions {
        if !seen.insert(region.id.as_str()) {
            return Err(RegionError::DuplicateId(region.id.clone()));
        }
    }
    Ok(regions)
}

/// The six continent outlines shipped with the crate.
pub fn builtin_regions() -> Result<Vec<Region>, RegionError> {
    parse_regions(BUILTIN_REGIONS_JSON)
}

pub fn find_region<'a>(regions: &'a [Region], id: &str) -> Option<&'a Region> {
    regions.iter().find(|r| r.id == id)
}
