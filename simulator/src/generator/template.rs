/// Gaussian pulse of unit height centred on sample `center`, `width` samples
/// wide (standard deviation).
pub fn gaussian_pulse(length: usize, center: f64, width: f64) -> Vec<f64> {
    let width = width.max(f64::EPSILON);
    (0..length)
        .map(|i| {
            let offset = (i as f64 - center) / width;
            (-0.5 * offset * offset).exp()
        })
        .collect()
}

/// Short dipole projected on the (theta, phi) polarisation basis, for an arm
/// along the local x axis. Angles in degrees.
pub fn dipole_projection(theta: f64, phi: f64) -> (f64, f64) {
    let (sin_p, cos_p) = phi.to_radians().sin_cos();
    let cos_t = theta.to_radians().cos();
    (cos_t * cos_p, -sin_p)
}
