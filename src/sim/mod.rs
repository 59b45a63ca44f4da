pub mod error_model;
pub mod imu;

pub use error_model::{ConfigError, ErrorModel};
pub use imu::{ImuSample, ImuSimulator, rng_from_seed};
