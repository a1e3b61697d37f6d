//! ## vanet-core::geo
//! Great-circle distance on a spherical earth.

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in metres between two WGS84 points given in degrees.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn one_degree_of_latitude() {
        let d = haversine_m(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_194.9).abs() < 1.0, "got {d}");
    }

    #[test]
    fn nan_propagates() {
        assert!(haversine_m(f64::NAN, 0.0, 1.0, 0.0).is_nan());
    }

    proptest! {
        #[test]
        fn symmetric_and_zero_on_self(
            lat1 in -89.0f64..89.0, lon1 in -180.0f64..180.0,
            lat2 in -89.0f64..89.0, lon2 in -180.0f64..180.0,
        ) {
            let ab = haversine_m(lat1, lon1, lat2, lon2);
            let ba = haversine_m(lat2, lon2, lat1, lon1);
            prop_assert!((ab - ba).abs() < 1e-6);
            prop_assert!(ab >= 0.0);
            prop_assert_eq!(haversine_m(lat1, lon1, lat1, lon1), 0.0);
        }
    }
}
