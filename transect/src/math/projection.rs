//! Map projections between WGS84 geographic coordinates and the
//! projected CRSs in [dem::Crs].
//!
//! UTM follows Snyder (1987), _Map Projections: A Working Manual_,
//! USGS Professional Paper 1395, pp. 57-64. Web Mercator is the
//! spherical form on the WGS84 semi-major axis.

use crate::transform::Ellipsoid;
use std::f64::consts::FRAC_PI_4;

const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Returns Web Mercator (x, y) in meters for (lon, lat) in degrees.
///
/// The poles have no image; they come back as NaN.
pub fn mercator_forward(lon: f64, lat: f64) -> (f64, f64) {
    if lat.abs() >= 90.0 {
        return (f64::NAN, f64::NAN);
    }
    let r = Ellipsoid::WGS84.semi_major;
    let x = r * lon.to_radians();
    let y = r * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Returns (lon, lat) in degrees for Web Mercator (x, y) in meters.
pub fn mercator_inverse(x: f64, y: f64) -> (f64, f64) {
    let r = Ellipsoid::WGS84.semi_major;
    let lon = (x / r).to_degrees();
    let lat = (2.0 * (y / r).exp().atan() - 2.0 * FRAC_PI_4).to_degrees();
    (lon, lat)
}

fn central_meridian(zone: u8) -> f64 {
    (f64::from(zone) * 6.0 - 183.0).to_radians()
}

/// Meridional arc from the equator to `lat` radians (Snyder 3-21).
fn meridional_arc(lat: f64, a: f64, e2: f64) -> f64 {
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    a * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

/// Returns UTM (easting, northing) in meters for (lon, lat) in degrees
/// (Snyder 8-9, 8-10).
#[allow(clippy::many_single_char_names)]
pub fn utm_forward(lon: f64, lat: f64, zone: u8, north: bool) -> (f64, f64) {
    let Ellipsoid { semi_major: a, .. } = Ellipsoid::WGS84;
    let e2 = Ellipsoid::WGS84.eccentricity_squared();
    let ep2 = e2 / (1.0 - e2);

    let lat = lat.to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let tan_lat = lat.tan();

    let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = ep2 * cos_lat * cos_lat;
    let a1 = cos_lat * (lon.to_radians() - central_meridian(zone));
    let m = meridional_arc(lat, a, e2);

    let a2 = a1 * a1;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    let easting = K0
        * n
        * (a1
            + (1.0 - t + c) * a2 * a1 / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a4 * a1 / 120.0)
        + FALSE_EASTING;

    let northing = K0
        * (m + n
            * tan_lat
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));

    if north {
        (easting, northing)
    } else {
        (easting, northing + FALSE_NORTHING_SOUTH)
    }
}

/// Returns (lon, lat) in degrees for UTM (easting, northing) in
/// meters (Snyder 3-26, 8-17 through 8-25).
#[allow(clippy::many_single_char_names)]
pub fn utm_inverse(easting: f64, northing: f64, zone: u8, north: bool) -> (f64, f64) {
    let Ellipsoid { semi_major: a, .. } = Ellipsoid::WGS84;
    let e2 = Ellipsoid::WGS84.eccentricity_squared();
    let ep2 = e2 / (1.0 - e2);
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    let x = easting - FALSE_EASTING;
    let y = if north {
        northing
    } else {
        northing - FALSE_NORTHING_SOUTH
    };

    let m = y / K0;
    let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let (sin_phi1, cos_phi1) = phi1.sin_cos();
    let tan_phi1 = phi1.tan();
    let c1 = ep2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let w = 1.0 - e2 * sin_phi1 * sin_phi1;
    let n1 = a / w.sqrt();
    let r1 = a * (1.0 - e2) / w.powf(1.5);
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d4 = d2 * d2;
    let d6 = d4 * d2;

    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d6
                    / 720.0);
    let lon = central_meridian(zone)
        + (d - (1.0 + 2.0 * t1 + c1) * d2 * d / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d4 * d
                / 120.0)
            / cos_phi1;

    (lon.to_degrees(), lat.to_degrees())
}
