use std::f64::consts::PI;

/// Block inputs are degrees, the daemon speaks radians.
pub fn deg_to_rad(degrees: f64) -> f64 {
    degrees * PI / 180.0
}

pub fn rad_to_deg(radians: f64) -> f64 {
    radians * 180.0 / PI
}
