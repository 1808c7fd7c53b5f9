#![allow(clippy::similar_names)]
#![warn(clippy::shadow_reuse, clippy::shadow_same, clippy::builtin_type_shadow)]
pub mod calibration;
pub mod config;
pub mod fix;
pub mod http_handler;
pub mod keychain;
pub mod logger;
pub mod orientation;
pub mod replay;
pub mod sighting;
pub mod solver;
pub mod util;
