/// A row-major 3×3 rotation matrix transforming device frame coordinates into
/// world frame coordinates (x = east, y = magnetic north, z = up).
pub type RotationMatrix = [f64; 9];

/// Normalizes an angle in degrees into the range `[0, 360)`.
pub fn normalize_angle_0_360(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360.0
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Normalizes an angle in degrees into the range `(-180, 180]`.
pub fn normalize_angle_pm_180(degrees: f64) -> f64 {
    let wrapped = normalize_angle_0_360(degrees);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}

/// Converts a rotation vector sensor sample into a [`RotationMatrix`].
///
/// The sample holds the vector part `(x, y, z)` of the unit rotation quaternion
/// and optionally the scalar part `w`. When `w` is missing it is reconstructed
/// from the unit norm constraint.
///
/// # Arguments
/// * `values` - `[x, y, z]` or `[x, y, z, w]`; any further values (heading accuracy) are ignored.
///
/// # Returns
/// `None` if fewer than three components are provided.
pub fn rotation_matrix_from_rotation_vector(values: &[f64]) -> Option<RotationMatrix> {
    let (q1, q2, q3) = match values {
        [x, y, z, ..] => (*x, *y, *z),
        _ => return None,
    };
    let q0 = match values.get(3) {
        Some(w) => *w,
        None => {
            let rem = 1.0 - q1 * q1 - q2 * q2 - q3 * q3;
            if rem > 0.0 { rem.sqrt() } else { 0.0 }
        }
    };

    let sq_q1 = 2.0 * q1 * q1;
    let sq_q2 = 2.0 * q2 * q2;
    let sq_q3 = 2.0 * q3 * q3;
    let q1_q2 = 2.0 * q1 * q2;
    let q3_q0 = 2.0 * q3 * q0;
    let q1_q3 = 2.0 * q1 * q3;
    let q2_q0 = 2.0 * q2 * q0;
    let q2_q3 = 2.0 * q2 * q3;
    let q1_q0 = 2.0 * q1 * q0;

    Some([
        1.0 - sq_q2 - sq_q3,
        q1_q2 - q3_q0,
        q1_q3 + q2_q0,
        q1_q2 + q3_q0,
        1.0 - sq_q1 - sq_q3,
        q2_q3 - q1_q0,
        q1_q3 - q2_q0,
        q2_q3 + q1_q0,
        1.0 - sq_q1 - sq_q2,
    ])
}
