//! Reprojection between the CRSs in [dem::Crs] and ellipsoidal
//! ("true") line lengths.
//!
//! WGS84 geographic, Web Mercator and UTM are projected in closed
//! form. [Crs::Epsg] CRSs are reached from WGS84 through [proj4rs]
//! with the CRS's PROJ.4 definition.

use crate::math::{
    mercator_forward, mercator_inverse, utm_forward, utm_inverse, vincenty_distance,
};
use dem::Crs;
use geo::{Coord, LineString};
use log::debug;
use proj4rs::{proj::Proj, transform::transform};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reference ellipsoid used for geodesic measurements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    /// Equatorial radius in meters.
    pub semi_major: f64,
    pub flattening: f64,
}

impl Ellipsoid {
    pub const WGS84: Self = Self {
        semi_major: 6_378_137.0,
        flattening: 1.0 / 298.257_223_563,
    };

    pub const GRS80: Self = Self {
        semi_major: 6_378_137.0,
        flattening: 1.0 / 298.257_222_101,
    };

    pub fn semi_minor(&self) -> f64 {
        self.semi_major * (1.0 - self.flattening)
    }

    pub fn eccentricity_squared(&self) -> f64 {
        self.flattening * (2.0 - self.flattening)
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum TransformError {
    #[error("no transform from {from} to {to}")]
    Unsupported { from: Crs, to: Crs },

    #[error("({x}, {y}) has no image in {to}")]
    NonFinite { x: f64, y: f64, to: Crs },
}

/// Converts coordinates between CRSs and measures lines on the
/// configured ellipsoid.
///
/// All transforms pass through WGS84 geographic coordinates.
/// [Crs::Local] only transforms to itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transformer {
    ellipsoid: Ellipsoid,
}

impl Transformer {
    pub fn new(ellipsoid: Ellipsoid) -> Self {
        Self { ellipsoid }
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    /// Transforms `coord` from `src` to `dst`.
    ///
    /// Identical CRSs return `coord` bit for bit.
    pub fn try_transform(
        &self,
        coord: Coord<f64>,
        src: &Crs,
        dst: &Crs,
    ) -> Result<Coord<f64>, TransformError> {
        if src == dst {
            return Ok(coord);
        }
        let unsupported = TransformError::Unsupported {
            from: *src,
            to: *dst,
        };
        let non_finite = TransformError::NonFinite {
            x: coord.x,
            y: coord.y,
            to: *dst,
        };
        let via_proj4 = |c: Coord<f64>, from: &Crs, to: &Crs| -> Result<_, TransformError> {
            let (Some(from_proj), Some(to_proj)) = (proj(from), proj(to)) else {
                return Err(unsupported);
            };
            let mut point = if from.is_geographic() {
                (c.x.to_radians(), c.y.to_radians(), 0.0)
            } else {
                (c.x, c.y, 0.0)
            };
            transform(&from_proj, &to_proj, &mut point).map_err(|e| {
                debug!("proj4rs: {e}");
                non_finite
            })?;
            Ok(if to.is_geographic() {
                (point.0.to_degrees(), point.1.to_degrees())
            } else {
                (point.0, point.1)
            })
        };

        let (lon, lat) = match *src {
            Crs::Geographic => (coord.x, coord.y),
            Crs::WebMercator => mercator_inverse(coord.x, coord.y),
            Crs::Utm { zone, north } => utm_inverse(coord.x, coord.y, zone, north),
            Crs::Epsg(_) => via_proj4(coord, src, &Crs::Geographic)?,
            Crs::Local => return Err(unsupported),
        };
        let (x, y) = match *dst {
            Crs::Geographic => (lon, lat),
            Crs::WebMercator => mercator_forward(lon, lat),
            Crs::Utm { zone, north } => utm_forward(lon, lat, zone, north),
            Crs::Epsg(_) => via_proj4(Coord { x: lon, y: lat }, &Crs::Geographic, dst)?,
            Crs::Local => return Err(unsupported),
        };
        if x.is_finite() && y.is_finite() {
            Ok(Coord { x, y })
        } else {
            Err(non_finite)
        }
    }

    /// Best-effort form of [Transformer::try_transform]: any failure
    /// returns `coord` unchanged.
    pub fn transform_point(&self, coord: Coord<f64>, src: &Crs, dst: &Crs) -> Coord<f64> {
        self.try_transform(coord, src, dst).unwrap_or_else(|e| {
            debug!("keeping untransformed point: {e}");
            coord
        })
    }

    /// Returns the geodesic length of `line` in meters, or `None`
    /// when `crs` is not georeferenced.
    pub fn true_length(&self, line: &LineString<f64>, crs: &Crs) -> Option<f64> {
        if !crs.is_georeferenced() {
            return None;
        }
        let geographic = line
            .coords()
            .map(|&c| self.try_transform(c, crs, &Crs::Geographic))
            .collect::<Result<Vec<_>, _>>()
            .ok()?;
        Some(
            geographic
                .windows(2)
                .map(|pair| vincenty_distance(&self.ellipsoid, pair[0], pair[1]))
                .sum(),
        )
    }

    /// How many units of `crs` make up one meter on the ground,
    /// taken at the equator for geographic coordinates.
    pub fn units_per_meter(&self, crs: &Crs) -> f64 {
        if crs.is_geographic() {
            180.0 / (std::f64::consts::PI * self.ellipsoid.semi_major)
        } else {
            1.0 / crs.meters_per_unit()
        }
    }
}

fn proj(crs: &Crs) -> Option<Proj> {
    let def = crs.proj4()?;
    Proj::from_proj_string(def)
        .map_err(|e| debug!("{crs}: {e}"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::{Ellipsoid, TransformError, Transformer};
    use approx::assert_abs_diff_eq;
    use dem::Crs;
    use geo::{coord, GeodesicLength, LineString};

    const UTM30N: Crs = Crs::Utm {
        zone: 30,
        north: true,
    };

    #[test]
    fn test_same_crs_is_exact() {
        let t = Transformer::default();
        for crs in [Crs::Geographic, Crs::WebMercator, UTM30N, Crs::Local] {
            let c = coord!(x: 0.1 + 0.2, y: -1.0 / 3.0);
            let out = t.try_transform(c, &crs, &crs).unwrap();
            assert_eq!(out.x.to_bits(), c.x.to_bits());
            assert_eq!(out.y.to_bits(), c.y.to_bits());
        }
    }

    #[test]
    fn test_geographic_to_utm() {
        let t = Transformer::default();
        let madrid = coord!(x: -3.7037, y: 40.4168);
        let utm = t.try_transform(madrid, &Crs::Geographic, &UTM30N).unwrap();
        assert_abs_diff_eq!(utm.x, 440_298.94, epsilon = 1.0);
        assert_abs_diff_eq!(utm.y, 4_474_257.31, epsilon = 1.0);

        let cm = t
            .try_transform(coord!(x: -3.0, y: 0.0), &Crs::Geographic, &UTM30N)
            .unwrap();
        assert_abs_diff_eq!(cm.x, 500_000.0, epsilon = 1e-6);
        assert_abs_diff_eq!(cm.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_utm_to_web_mercator_and_back() {
        let t = Transformer::default();
        let start = coord!(x: 440_298.94, y: 4_474_257.31);
        let merc = t.try_transform(start, &UTM30N, &Crs::WebMercator).unwrap();
        let back = t.try_transform(merc, &Crs::WebMercator, &UTM30N).unwrap();
        assert_abs_diff_eq!(back.x, start.x, epsilon = 1e-3);
        assert_abs_diff_eq!(back.y, start.y, epsilon = 1e-3);
    }

    #[test]
    fn test_epsg_through_proj4() {
        let t = Transformer::default();
        let milan = coord!(x: 9.19, y: 45.4642);

        // ETRS89 / UTM 32N agrees with WGS84 / UTM 32N.
        let etrs = t
            .try_transform(milan, &Crs::Geographic, &Crs::Epsg(25832))
            .unwrap();
        let wgs = t
            .try_transform(milan, &Crs::Geographic, &Crs::Utm { zone: 32, north: true })
            .unwrap();
        assert_abs_diff_eq!(etrs.x, wgs.x, epsilon = 0.05);
        assert_abs_diff_eq!(etrs.y, wgs.y, epsilon = 0.05);

        // Monte Mario / Italy zone 1 sits 1000 km east of UTM 32N.
        let gauss_boaga = t
            .try_transform(milan, &Crs::Geographic, &Crs::Epsg(3003))
            .unwrap();
        assert_abs_diff_eq!(gauss_boaga.x, wgs.x + 1_000_000.0, epsilon = 500.0);
        assert_abs_diff_eq!(gauss_boaga.y, wgs.y, epsilon = 500.0);
        let back = t
            .try_transform(gauss_boaga, &Crs::Epsg(3003), &Crs::Geographic)
            .unwrap();
        assert_abs_diff_eq!(back.x, milan.x, epsilon = 1e-6);
        assert_abs_diff_eq!(back.y, milan.y, epsilon = 1e-6);

        // Between two PROJ-backed CRSs, one of them geographic.
        let etrs89 = t
            .try_transform(etrs, &Crs::Epsg(25832), &Crs::Epsg(4258))
            .unwrap();
        assert_abs_diff_eq!(etrs89.x, milan.x, epsilon = 1e-6);
        assert_abs_diff_eq!(etrs89.y, milan.y, epsilon = 1e-6);

        // RGF93 / Lambert-93 around Paris.
        let paris = t
            .try_transform(coord!(x: 2.35, y: 48.85), &Crs::Geographic, &Crs::Epsg(2154))
            .unwrap();
        assert_abs_diff_eq!(paris.x, 652_000.0, epsilon = 2_000.0);
        assert_abs_diff_eq!(paris.y, 6_862_000.0, epsilon = 2_000.0);

        assert!(matches!(
            t.try_transform(milan, &Crs::Epsg(3003), &Crs::Local),
            Err(TransformError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_failures() {
        let t = Transformer::default();
        let c = coord!(x: 10.0, y: 20.0);
        assert_eq!(
            t.try_transform(c, &Crs::Local, &Crs::Geographic),
            Err(TransformError::Unsupported {
                from: Crs::Local,
                to: Crs::Geographic
            })
        );
        assert_eq!(t.transform_point(c, &Crs::Local, &UTM30N), c);

        let pole = coord!(x: 0.0, y: 90.0);
        assert!(matches!(
            t.try_transform(pole, &Crs::Geographic, &Crs::WebMercator),
            Err(TransformError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_true_length() {
        let t = Transformer::default();
        let line = LineString::from(vec![(0.0, 51.5), (2.35, 48.85)]);
        let length = t.true_length(&line, &Crs::Geographic).unwrap();
        assert_abs_diff_eq!(length, line.geodesic_length(), epsilon = 1e-2);

        // The same line, expressed in Web Mercator.
        let merc: LineString<f64> = line
            .coords()
            .map(|&c| t.transform_point(c, &Crs::Geographic, &Crs::WebMercator))
            .collect();
        let merc_length = t.true_length(&merc, &Crs::WebMercator).unwrap();
        assert_abs_diff_eq!(merc_length, length, epsilon = 1e-3);

        let lambert: LineString<f64> = line
            .coords()
            .map(|&c| t.transform_point(c, &Crs::Geographic, &Crs::Epsg(2154)))
            .collect();
        let lambert_length = t.true_length(&lambert, &Crs::Epsg(2154)).unwrap();
        assert_abs_diff_eq!(lambert_length, length, epsilon = 0.1);

        assert_eq!(t.true_length(&line, &Crs::Local), None);
    }

    #[test]
    fn test_units_per_meter() {
        let t = Transformer::new(Ellipsoid::GRS80);
        assert_eq!(t.units_per_meter(&UTM30N), 1.0);
        assert_eq!(t.units_per_meter(&Crs::Epsg(3003)), 1.0);
        assert_abs_diff_eq!(
            t.units_per_meter(&Crs::Epsg(2277)),
            3937.0 / 1200.0,
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(
            1.0 / t.units_per_meter(&Crs::Geographic),
            111_319.49,
            epsilon = 0.01
        );
    }
}
