use dem::Dem;
use geo::Coord;
use log::debug;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which raw DEM values count as "no measurement".
///
/// NaN and the DEM's own sentinel are always no-data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoDataRule {
    /// Treat an exact `0.0` as no-data.
    pub zero_is_nodata: bool,
}

impl NoDataRule {
    /// Only the DEM's sentinel (and NaN) are no-data; `0.0` is sea
    /// level.
    pub fn sentinel_only() -> Self {
        Self {
            zero_is_nodata: false,
        }
    }

    pub fn is_nodata(&self, value: f64, sentinel: Option<f64>) -> bool {
        !value.is_finite()
            || sentinel.is_some_and(|s| value == s)
            || (self.zero_is_nodata && value == 0.0)
    }
}

impl Default for NoDataRule {
    fn default() -> Self {
        Self {
            zero_is_nodata: true,
        }
    }
}

/// Point reads against a [Dem], with no-data filtering.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sampler {
    rule: NoDataRule,
}

impl Sampler {
    pub fn new(rule: NoDataRule) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> NoDataRule {
        self.rule
    }

    /// Returns the elevation under `coord` (in the DEM's CRS), or
    /// `None` for no-data.
    ///
    /// Never fails: read errors are logged and reported as no-data.
    pub fn sample<D: Dem + ?Sized>(&self, dem: &D, coord: Coord<f64>) -> Option<f64> {
        match dem.get(coord) {
            Ok(Some(value)) if self.rule.is_nodata(value, dem.nodata()) => None,
            Ok(value) => value,
            Err(e) => {
                debug!("sampling ({}, {}): {e}", coord.x, coord.y);
                None
            }
        }
    }
}

/// How no-data samples are resolved before a profile is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fill {
    /// Keep no-data as gaps.
    #[default]
    Strict,
    /// Replace no-data with the previous valid elevation, or `0.0`
    /// before the first one.
    CarryForward,
}

impl FromStr for Fill {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "carry" | "carry_forward" => Ok(Self::CarryForward),
            other => Err(format!("unknown fill policy '{other}'")),
        }
    }
}

/// Applies `fill` to a raw sample series.
pub fn resolve(raw: &[Option<f64>], fill: Fill) -> Vec<Option<f64>> {
    match fill {
        Fill::Strict => raw.to_vec(),
        Fill::CarryForward => raw
            .iter()
            .scan(0.0, |last, &sample| {
                if let Some(elevation) = sample {
                    *last = elevation;
                }
                Some(Some(*last))
            })
            .collect(),
    }
}
