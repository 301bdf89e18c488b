use geo_types::Point;

/// Mean earth radius used for all distances, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two `(x: lon, y: lat)` points.
///
/// Uses the half-angle (haversine) form, which stays accurate for the
/// meter-scale steps between consecutive fixes.
pub fn haversine_distance(from: Point, to: Point) -> f64 {
    let phi1 = from.y().to_radians();
    let phi2 = to.y().to_radians();
    let delta_phi = (to.y() - from.y()).to_radians();
    let delta_lambda = (to.x() - from.x()).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` a hair outside [0, 1] for antipodal points.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Running total of traveled distance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceAccumulator {
    total_m: f64,
}

impl DistanceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the leg from `previous` to `current` and returns its length in meters.
    pub fn accumulate(&mut self, previous: Point, current: Point) -> f64 {
        let leg = haversine_distance(previous, current);
        // NaN coordinates must not poison the total.
        if leg.is_finite() {
            self.total_m += leg;
            leg
        } else {
            0.0
        }
    }

    pub fn total_m(&self) -> f64 {
        self.total_m
    }

    pub fn total_km(&self) -> f64 {
        self.total_m / 1000.0
    }

    pub fn reset(&mut self) {
        self.total_m = 0.0;
    }
}
