//! Turning a polyline into evenly spaced stations.

use crate::{TransectError, Transformer};
use dem::Crs;
use geo::{algorithm::EuclideanLength, Coord, LineString};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Upper bound on [Policy::FixedCap] intervals.
const MAX_INTERVALS: f64 = 1000.0;

/// Bounds on the number of [Policy::LengthScaled] intervals.
const MIN_SCALED_INTERVALS: f64 = 50.0;
const MAX_SCALED_INTERVALS: f64 = 500.0;

/// Relative slack applied before flooring station counts.
const EPSILON: f64 = 1e-9;

/// How a line is divided into stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// One station per ground meter, coarsening so that a line never
    /// gets more than 1001 stations. Distances are in meters: planar
    /// for projected CRSs, along the ellipsoid for geographic ones.
    FixedCap,

    /// One station per ground meter, clamped to 51..=501 stations.
    /// Distances are in meters along the ellipsoid.
    LengthScaled,
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" | "fixed_cap" => Ok(Self::FixedCap),
            "scaled" | "length_scaled" => Ok(Self::LengthScaled),
            other => Err(format!("unknown discretization policy '{other}'")),
        }
    }
}

/// A point interpolated along a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Station {
    pub coord: Coord<f64>,

    /// Cumulative distance from the line's first vertex.
    pub distance: f64,
}

/// Divides `line` into stations according to `policy`.
///
/// The first station always sits on the first vertex and the last on
/// the final vertex.
pub fn discretize(
    line: &LineString<f64>,
    crs: &Crs,
    policy: Policy,
    transformer: &Transformer,
) -> Result<Vec<Station>, TransectError> {
    if line.0.len() < 2 {
        return Err(TransectError::InsufficientGeometry("fewer than 2 vertices"));
    }
    let length = line.euclidean_length();
    if !length.is_finite() || length <= 0.0 {
        return Err(TransectError::InsufficientGeometry("zero length"));
    }

    let (intervals, scale) = match policy {
        Policy::FixedCap => {
            let step = transformer.units_per_meter(crs).max(length / MAX_INTERVALS);
            let scale = if crs.is_geographic() {
                transformer
                    .true_length(line, crs)
                    .map_or(1.0, |meters| meters / length)
            } else {
                crs.meters_per_unit()
            };
            ((length / step * (1.0 + EPSILON)).floor(), scale)
        }
        Policy::LengthScaled => {
            let meters = transformer.true_length(line, crs).unwrap_or(length);
            let intervals = (meters * (1.0 + EPSILON))
                .floor()
                .clamp(MIN_SCALED_INTERVALS, MAX_SCALED_INTERVALS);
            (intervals, meters / length)
        }
    };
    if intervals < 1.0 {
        return Err(TransectError::InsufficientGeometry(
            "shorter than one sampling step",
        ));
    }

    Ok(StationIter::new(&line.0, length, intervals, scale).collect())
}

/// Walks a polyline once, yielding stations at multiples of a fixed
/// interval.
struct StationIter<'a> {
    coords: &'a [Coord<f64>],
    length: f64,
    interval: f64,
    total: usize,
    current: usize,
    /// Index of the first vertex of the current segment.
    segment: usize,
    /// Distance along the line at `coords[segment]`.
    segment_start: f64,
    /// Factor converting line units to reported distances.
    scale: f64,
}

impl<'a> StationIter<'a> {
    fn new(coords: &'a [Coord<f64>], length: f64, intervals: f64, scale: f64) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let total = intervals as usize + 1;
        Self {
            coords,
            length,
            interval: length / intervals,
            total,
            current: 0,
            segment: 0,
            segment_start: 0.0,
            scale,
        }
    }

    fn segment_length(&self, idx: usize) -> f64 {
        let (a, b) = (self.coords[idx], self.coords[idx + 1]);
        (b.x - a.x).hypot(b.y - a.y)
    }
}

impl<'a> Iterator for StationIter<'a> {
    type Item = Station;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.total {
            return None;
        }
        let is_last = self.current + 1 == self.total;
        #[allow(clippy::cast_precision_loss)]
        let target = if is_last {
            self.length
        } else {
            self.current as f64 * self.interval
        };
        self.current += 1;

        let last_segment = self.coords.len() - 2;
        while self.segment < last_segment
            && self.segment_start + self.segment_length(self.segment) < target
        {
            self.segment_start += self.segment_length(self.segment);
            self.segment += 1;
        }

        let coord = if is_last {
            self.coords[self.coords.len() - 1]
        } else {
            let (a, b) = (self.coords[self.segment], self.coords[self.segment + 1]);
            let seg_len = self.segment_length(self.segment);
            let t = if seg_len > 0.0 {
                ((target - self.segment_start) / seg_len).clamp(0.0, 1.0)
            } else {
                0.0
            };
            Coord {
                x: a.x + (b.x - a.x) * t,
                y: a.y + (b.y - a.y) * t,
            }
        };

        Some(Station {
            coord,
            distance: target * self.scale,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.current;
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for StationIter<'a> {
    fn len(&self) -> usize {
        self.total - self.current
    }
}
