use crate::transform::Ellipsoid;
use geo::Coord;

const MAX_ITERATIONS: usize = 200;
const CONVERGENCE: f64 = 1e-12;

/// Returns the geodesic distance in meters between two (lon, lat)
/// coordinates given in degrees, using Vincenty's inverse formula.
///
/// Nearly antipodal pairs may fail to converge, in which case the
/// great-circle distance on the semi-major sphere is returned.
#[allow(clippy::many_single_char_names)]
pub fn vincenty_distance(ellipsoid: &Ellipsoid, p1: Coord<f64>, p2: Coord<f64>) -> f64 {
    let a = ellipsoid.semi_major;
    let f = ellipsoid.flattening;
    let b = ellipsoid.semi_minor();

    let l = (p2.x - p1.x).to_radians();
    let u1 = ((1.0 - f) * p1.y.to_radians().tan()).atan();
    let u2 = ((1.0 - f) * p2.y.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    for _ in 0..MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            // Coincident.
            return 0.0;
        }
        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos2_alpha = 1.0 - sin_alpha * sin_alpha;
        // Equatorial lines have cos2_alpha == 0.
        let cos_2sigma_m = if cos2_alpha == 0.0 {
            0.0
        } else {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos2_alpha
        };
        let c = f / 16.0 * cos2_alpha * (4.0 + f * (4.0 - 3.0 * cos2_alpha));

        let prev = lambda;
        lambda = l
            + (1.0 - c)
                * f
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))));

        if (lambda - prev).abs() < CONVERGENCE {
            let u_sq = cos2_alpha * (a * a - b * b) / (b * b);
            let big_a =
                1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = big_b
                * sin_sigma
                * (cos_2sigma_m
                    + big_b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))
                            - big_b / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma.powi(2))
                                * (-3.0 + 4.0 * cos_2sigma_m.powi(2))));
            return b * big_a * (sigma - delta_sigma);
        }
    }

    let cos_central = (sin_u1 * sin_u2 + cos_u1 * cos_u2 * l.cos()).clamp(-1.0, 1.0);
    a * cos_central.acos()
}

#[cfg(test)]
mod tests {
    use super::vincenty_distance;
    use crate::transform::Ellipsoid;
    use approx::assert_relative_eq;
    use geo::{coord, GeodesicLength, LineString};

    #[test]
    fn test_vincenty_matches_karney() {
        let london = coord!(x: 0.0, y: 51.5);
        let paris = coord!(x: 2.35, y: 48.85);
        let d = vincenty_distance(&Ellipsoid::WGS84, london, paris);
        assert_relative_eq!(d, 340_000.0, max_relative = 0.02);

        let karney = LineString::from(vec![london, paris]).geodesic_length();
        assert_relative_eq!(d, karney, epsilon = 1e-3);
    }

    #[test]
    fn test_vincenty_equator_and_meridian() {
        let wgs84 = Ellipsoid::WGS84;
        // One degree of longitude on the equator is a / 180 * pi.
        let d = vincenty_distance(&wgs84, coord!(x: 0.0, y: 0.0), coord!(x: 1.0, y: 0.0));
        assert_relative_eq!(d, 111_319.490_793, epsilon = 1e-3);

        // Equator to pole: the WGS84 quarter meridian.
        let d = vincenty_distance(&wgs84, coord!(x: 0.0, y: 0.0), coord!(x: 0.0, y: 90.0));
        assert_relative_eq!(d, 10_001_965.729, epsilon = 1e-2);

        let p = coord!(x: 12.5, y: -33.0);
        assert_eq!(vincenty_distance(&wgs84, p, p), 0.0);
    }
}
