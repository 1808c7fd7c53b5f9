use crate::util::math::{
    helpers::{RotationMatrix, normalize_angle_0_360, normalize_angle_pm_180},
    vec3d::Vec3D,
};

/// Above this `|pointing · up|` the world up axis is too close to the camera
/// axis to span the view basis and north is used as the reference instead.
const UP_REF_PARALLEL_THRESHOLD: f64 = 0.95;
/// Squared length below which the first view basis axis counts as degenerate.
const DEGENERATE_VIEW_X_SQ: f64 = 1e-3;

/// Angles derived from a pointing vector, all in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointingAngles {
    pub magnetic_azimuth_deg: f64,
    pub true_azimuth_deg: f64,
    pub pitch_deg: f64,
    pub roll_deg: f64,
}

/// Extracts the camera axis from a device-to-world rotation matrix.
///
/// The camera looks out of the back of the device, i.e. along the negative
/// device z axis, so the third matrix column is negated.
pub fn pointing_vector_from_rotation_matrix(m: &RotationMatrix) -> Vec3D<f64> {
    Vec3D::new(-m[2], -m[5], -m[8]).normalize()
}

/// Extracts the device y axis (top edge direction) in the world frame.
pub fn device_y_axis_from_rotation_matrix(m: &RotationMatrix) -> Vec3D<f64> {
    Vec3D::new(m[1], m[4], m[7]).normalize()
}

/// Computes azimuth, pitch and roll of the camera axis.
///
/// # Arguments
/// * `pointing` - Unit camera axis in the world frame.
/// * `device_y` - Unit device y axis in the world frame.
/// * `declination_deg` - Magnetic declination, east positive.
///
/// # Returns
/// Azimuths in `[0, 360)`, pitch in `[-90, 90]`, roll in `(-180, 180]`.
pub fn azimuth_pitch_roll(
    pointing: &Vec3D<f64>,
    device_y: &Vec3D<f64>,
    declination_deg: f64,
) -> PointingAngles {
    let pitch_deg = pointing.z().atan2(pointing.horizontal_abs()).to_degrees();
    let magnetic_azimuth_deg = normalize_angle_0_360(pointing.x().atan2(pointing.y()).to_degrees());
    let true_azimuth_deg = normalize_angle_0_360(magnetic_azimuth_deg + declination_deg);
    PointingAngles {
        magnetic_azimuth_deg,
        true_azimuth_deg,
        pitch_deg,
        roll_deg: roll_deg(pointing, device_y),
    }
}

/// Roll of the device y axis measured in the plane orthogonal to the camera axis.
fn roll_deg(pointing: &Vec3D<f64>, device_y: &Vec3D<f64>) -> f64 {
    let up = Vec3D::unit_z();
    let north = Vec3D::unit_y();
    let (primary, alternative) = if pointing.dot(&up).abs() > UP_REF_PARALLEL_THRESHOLD {
        (north, up)
    } else {
        (up, north)
    };
    let mut view_x = pointing.cross(&primary).normalize();
    if view_x.abs_sq() < DEGENERATE_VIEW_X_SQ {
        view_x = pointing.cross(&alternative).normalize();
    }
    let view_y = view_x.cross(pointing).normalize();
    let roll = device_y.dot(&view_x).atan2(device_y.dot(&view_y)).to_degrees();
    normalize_angle_pm_180(roll)
}
