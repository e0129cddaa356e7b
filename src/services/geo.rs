//! Great-circle distance used to verify session photos against the school
//! location.

const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub(crate) fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_same_point() {
        assert!(haversine_distance_m(28.6139, 77.2090, 28.6139, 77.2090) < 1e-6);
    }

    #[test]
    fn known_city_pair_within_tolerance() {
        // New Delhi to Mumbai, roughly 1150 km.
        let d = haversine_distance_m(28.6139, 77.2090, 19.0760, 72.8777);
        assert!((d - 1_150_000.0).abs() < 20_000.0, "distance was {d}");
    }

    #[test]
    fn short_distance_is_metre_scale() {
        // Two points ~111m apart along a meridian (0.001 degrees latitude).
        let d = haversine_distance_m(28.6139, 77.2090, 28.6149, 77.2090);
        assert!((d - 111.0).abs() < 2.0, "distance was {d}");
    }
}
