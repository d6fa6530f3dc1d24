//! British National Grid (OSGB36) easting/northing to latitude/longitude.
//!
//! All spatial coordinates in the backing stores are OSGB eastings and
//! northings in metres.  The solar-geometry code needs geographic
//! coordinates, so this module implements the Ordnance Survey inverse
//! transverse Mercator on the Airy 1830 ellipsoid.
//!
//! The OSGB36 -> WGS84 datum shift is deliberately omitted: it moves
//! positions by roughly 100 m, which is far below anything the clear-sky
//! irradiance threshold can resolve.

/// Airy 1830 semi-major axis (metres).
const A: f64 = 6_377_563.396;
/// Airy 1830 semi-minor axis (metres).
const B: f64 = 6_356_256.909;
/// Central meridian scale factor.
const F0: f64 = 0.999_601_271_7;
/// True origin latitude, 49°N, in radians.
const LAT0: f64 = 49.0 * std::f64::consts::PI / 180.0;
/// True origin longitude, 2°W, in radians.
const LON0: f64 = -2.0 * std::f64::consts::PI / 180.0;
/// False origin easting (metres).
const E0: f64 = 400_000.0;
/// False origin northing (metres).
const N0: f64 = -100_000.0;
/// Footpoint-latitude iteration cap.  Finite northings converge within a
/// handful of iterations; non-finite ones never would.
const MAX_ARC_ITERATIONS: usize = 32;

/// Meridional arc length from the true origin to latitude `lat`.
fn meridional_arc(lat: f64) -> f64 {
    let n = (A - B) / (A + B);
    let n2 = n * n;
    let n3 = n2 * n;
    let dlat = lat - LAT0;
    let slat = lat + LAT0;

    B * F0
        * ((1.0 + n + 1.25 * n2 + 1.25 * n3) * dlat
            - (3.0 * n + 3.0 * n2 + 2.625 * n3) * dlat.sin() * slat.cos()
            + (1.875 * n2 + 1.875 * n3) * (2.0 * dlat).sin() * (2.0 * slat).cos()
            - (35.0 / 24.0) * n3 * (3.0 * dlat).sin() * (3.0 * slat).cos())
}

/// Convert an OSGB easting/northing (metres) to latitude/longitude (degrees).
pub fn osgb_to_lat_lon(easting: f64, northing: f64) -> (f64, f64) {
    let e2 = 1.0 - (B * B) / (A * A);

    // Iterate the footpoint latitude until the meridional arc converges.
    let mut lat = (northing - N0) / (A * F0) + LAT0;
    for _ in 0..MAX_ARC_ITERATIONS {
        let m = meridional_arc(lat);
        let delta = northing - N0 - m;
        if delta.abs() < 1e-5 {
            break;
        }
        lat += delta / (A * F0);
    }

    let sin_lat = lat.sin();
    let sec_lat = 1.0 / lat.cos();
    let tan_lat = lat.tan();
    let tan2 = tan_lat * tan_lat;
    let tan4 = tan2 * tan2;
    let tan6 = tan4 * tan2;

    let nu = A * F0 / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let rho = A * F0 * (1.0 - e2) / (1.0 - e2 * sin_lat * sin_lat).powf(1.5);
    let eta2 = nu / rho - 1.0;

    let vii = tan_lat / (2.0 * rho * nu);
    let viii = tan_lat / (24.0 * rho * nu.powi(3))
        * (5.0 + 3.0 * tan2 + eta2 - 9.0 * tan2 * eta2);
    let ix = tan_lat / (720.0 * rho * nu.powi(5)) * (61.0 + 90.0 * tan2 + 45.0 * tan4);
    let x = sec_lat / nu;
    let xi = sec_lat / (6.0 * nu.powi(3)) * (nu / rho + 2.0 * tan2);
    let xii = sec_lat / (120.0 * nu.powi(5)) * (5.0 + 28.0 * tan2 + 24.0 * tan4);
    let xiia = sec_lat / (5040.0 * nu.powi(7))
        * (61.0 + 662.0 * tan2 + 1320.0 * tan4 + 720.0 * tan6);

    let de = easting - E0;
    let de2 = de * de;
    let de3 = de2 * de;
    let de4 = de2 * de2;
    let de5 = de4 * de;
    let de6 = de3 * de3;
    let de7 = de6 * de;

    let lat_out = lat - vii * de2 + viii * de4 - ix * de6;
    let lon_out = LON0 + x * de - xi * de3 + xii * de5 - xiia * de7;

    (lat_out.to_degrees(), lon_out.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_true_origin() {
        // The false origin offsets put the true origin (49N, 2W) at
        // easting 400000, northing -100000.
        let (lat, lon) = osgb_to_lat_lon(400_000.0, -100_000.0);
        assert!((lat - 49.0).abs() < 1e-6, "lat = {lat}");
        assert!((lon + 2.0).abs() < 1e-6, "lon = {lon}");
    }

    #[test]
    fn test_grid_origin() {
        // OSGB (0, 0) sits south-west of the Scilly Isles.
        let (lat, lon) = osgb_to_lat_lon(0.0, 0.0);
        assert!((lat - 49.766).abs() < 0.01, "lat = {lat}");
        assert!((lon + 7.556).abs() < 0.01, "lon = {lon}");
    }

    #[test]
    fn test_non_finite_northing_terminates() {
        // A NaN coordinate read from a corrupt store must not hang the
        // iteration; it comes back out as NaN.
        let (lat, lon) = osgb_to_lat_lon(400_000.0, f64::NAN);
        assert!(lat.is_nan());
        assert!(lon.is_nan());
    }

    #[test]
    fn test_northing_moves_north() {
        let (lat_south, _) = osgb_to_lat_lon(400_000.0, 100_000.0);
        let (lat_north, _) = osgb_to_lat_lon(400_000.0, 500_000.0);
        assert!(lat_north > lat_south);
    }
}
