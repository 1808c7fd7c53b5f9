pub mod helpers;
pub mod vec3d;
