/// Dip coefficient in arc minutes per square root metre, including standard refraction.
const DIP_ARCMIN_PER_SQRT_M: f64 = 1.758;

/// Dip of the sea horizon below the true horizontal in degrees.
pub fn dip_deg(height_of_eye_m: f64) -> f64 { DIP_ARCMIN_PER_SQRT_M * height_of_eye_m.max(0.0).sqrt() / 60.0 }

/// Offset that maps `raw_pitch_deg`, measured while sighting the sea horizon,
/// onto the apparent horizon elevation `-dip`.
pub fn horizon_offset(raw_pitch_deg: f64, height_of_eye_m: f64) -> f64 { -dip_deg(height_of_eye_m) - raw_pitch_deg }
