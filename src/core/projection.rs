//! Forward geostationary map projection
//!
//! Converts geographic coordinates to the planar scan coordinates of a
//! fixed satellite, using the ellipsoidal `geos` formulation: geocentric
//! latitude, local ellipsoid radius, then view angles from the satellite
//! scaled by the perspective height.

use crate::types::{GeosProjection, SweepAxis};

impl GeosProjection {
    /// Project geographic coordinates (degrees) to planar coordinates (meters).
    ///
    /// Pure function of the cached projection parameters. Inputs outside the
    /// visible disc are not validated and produce extreme or non-finite
    /// coordinates; downstream pixel location filters those out.
    pub fn project(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let radius_p = self.semi_minor_axis / self.semi_major_axis;
        let radius_p2 = radius_p * radius_p;
        let radius_g_1 = self.perspective_height / self.semi_major_axis;
        let radius_g = 1.0 + radius_g_1;

        let lam = (lon_deg - self.lon_origin).to_radians();
        let phi = lat_deg.to_radians();

        // Geocentric latitude and local ellipsoid radius (normalized by the
        // semi-major axis).
        let phi_c = (radius_p2 * phi.tan()).atan();
        let r = radius_p / (radius_p * phi_c.cos()).hypot(phi_c.sin());

        // Vector from the earth center to the ground point.
        let vx = r * lam.cos() * phi_c.cos();
        let vy = r * lam.sin() * phi_c.cos();
        let vz = r * phi_c.sin();

        // Points on the far side of the globe are hidden from the
        // satellite; their view angles carry no information.
        let tmp = radius_g - vx;
        if tmp * vx - vy * vy - vz * vz / radius_p2 < 0.0 {
            return (f64::INFINITY, f64::INFINITY);
        }

        // View angles from the satellite, ordered by sweep axis.
        let (x, y) = match self.sweep {
            SweepAxis::X => (
                radius_g_1 * (vy / vz.hypot(tmp)).atan(),
                radius_g_1 * (vz / tmp).atan(),
            ),
            SweepAxis::Y => (
                radius_g_1 * (vy / tmp).atan(),
                radius_g_1 * (vz / vy.hypot(tmp)).atan(),
            ),
        };

        (x * self.semi_major_axis, y * self.semi_major_axis)
    }
}
