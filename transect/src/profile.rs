use crate::Policy;
use dem::Crs;
use geo::LineString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Elevation at a distance along a profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub distance: f64,

    /// `None` where the DEM had no measurement.
    pub elevation: Option<f64>,
}

/// A labeled elevation profile along a drawn line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub label: String,

    /// CRS of `line`.
    pub crs: Crs,

    pub line: LineString<f64>,

    pub policy: Policy,

    /// Samples ordered by ascending distance.
    pub samples: Vec<Sample>,

    /// Planimetric length: line CRS units for [Policy::FixedCap],
    /// ellipsoidal meters for [Policy::LengthScaled].
    pub length_2d: f64,

    /// Slope-corrected length over consecutive valid samples.
    pub length_3d: f64,

    /// Ellipsoidal length in meters, when `crs` is georeferenced.
    pub true_length: Option<f64>,

    pub elevation_start: f64,

    pub elevation_end: f64,

    /// Where the rendered chart lives, once rendered.
    pub image_path: Option<PathBuf>,
}

impl Profile {
    /// Returns `(distance, elevation)` of every sample with a valid
    /// elevation.
    pub fn valid(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        valid(&self.samples)
    }

    /// Returns the (lowest, highest) valid elevation.
    pub fn elevation_range(&self) -> Option<(f64, f64)> {
        self.valid().map(|(_, z)| z).fold(None, |acc, z| match acc {
            None => Some((z, z)),
            Some((lo, hi)) => Some((lo.min(z), hi.max(z))),
        })
    }

    pub fn is_rendered(&self) -> bool {
        self.image_path.is_some()
    }
}

pub(crate) fn valid(samples: &[Sample]) -> impl Iterator<Item = (f64, f64)> + '_ {
    samples
        .iter()
        .filter_map(|s| s.elevation.map(|z| (s.distance, z)))
}

/// Sum of `hypot(Δd, Δz)` over consecutive valid samples.
///
/// No-data samples are bridged: each valid sample pairs with the next
/// valid one.
pub(crate) fn slope_length(samples: &[Sample]) -> f64 {
    let mut points = valid(samples);
    let Some(mut prev) = points.next() else {
        return 0.0;
    };
    points.fold(0.0, |acc, (d, z)| {
        let (prev_d, prev_z) = std::mem::replace(&mut prev, (d, z));
        acc + (d - prev_d).hypot(z - prev_z)
    })
}
