pub mod math;
pub mod settings_store;
