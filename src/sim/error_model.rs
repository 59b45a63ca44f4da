use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use thiserror::Error;

use crate::parameters::{ParameterMap, parameters};

/// ppm -> dimensionless
const PPM: f64 = 1e-6;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error(transparent)]
    Parameter(#[from] parameters::Error),

    #[error("Parameter '{key}' must be strictly positive (got {value})")]
    NonPositive { key: String, value: f64 },
}

/// Per-axis error coefficients and drift state of one accelerometer/gyroscope
/// triad. All static terms are drawn once at construction; only the two
/// `*_drift_prev` vectors change afterwards, once per sample.
///
/// Scale factor and g-sensitivity are diagonal matrices, stored as their
/// diagonals and applied elementwise.
#[derive(Debug, Clone)]
pub struct ErrorModel {
    pub(crate) accel_bias: Vector3<f64>,         // g
    pub(crate) accel_scale_factor: Vector3<f64>, // identity + ppm perturbation
    pub(crate) accel_g_sens: Vector3<f64>,       // per g
    pub(crate) vrw: f64,                         // g/sqrt(Hz)
    pub(crate) accel_tau: f64,                   // s
    pub(crate) accel_drift_sigma: f64,           // g
    pub(crate) accel_drift_prev: Vector3<f64>,   // g

    pub(crate) gyro_bias: Vector3<f64>,         // rad/s
    pub(crate) gyro_scale_factor: Vector3<f64>, // identity + ppm perturbation
    pub(crate) gyro_g_sens: Vector3<f64>,       // rad/s per g
    pub(crate) arw: f64,                        // rad/s/sqrt(Hz)
    pub(crate) gyro_tau: f64,                   // s
    pub(crate) gyro_drift_sigma: f64,           // rad/s
    pub(crate) gyro_drift_prev: Vector3<f64>,   // rad/s
}

/// A 3-vector of independent standard-normal draws.
pub(crate) fn randn3<R: Rng>(rng: &mut R) -> Vector3<f64> {
    Vector3::from_fn(|_, _| StandardNormal.sample(rng))
}

impl ErrorModel {
    /// Draws the static coefficients from the given parameter map and RNG.
    ///
    /// All twelve keys are mandatory; the first missing or mis-typed one
    /// aborts construction with an error naming it.
    pub fn from_params<R: Rng>(params: &ParameterMap, rng: &mut R) -> Result<Self, ConfigError> {
        let accel_bias_sigma = params.get_param("accelBiasSigma")?.value_float()?; // g
        let accel_bias = randn3(rng) * accel_bias_sigma;

        let accel_sf_sigma = params.get_param("accelSfSigma")?.value_float()?; // ppm
        let accel_scale_factor = Vector3::repeat(1.0) + randn3(rng) * accel_sf_sigma * PPM;

        let accel_g2_sigma = params.get_param("accelG2Sigma")?.value_float()?; // ppm/g
        let accel_g_sens = randn3(rng) * accel_g2_sigma * PPM;

        let vrw = params.get_param("vrw")?.value_float()?; // g/sqrt(Hz)
        let accel_tau = positive_float(params, "accelCorrelationTime")?; // s
        let accel_drift_sigma = params.get_param("accelBiasDriftSigma")?.value_float()?; // g

        let gyro_bias_sigma = params.get_param("gyroBiasSigma")?.value_float()?; // rad/s
        let gyro_bias = randn3(rng) * gyro_bias_sigma;

        let gyro_sf_sigma = params.get_param("gyroSfSigma")?.value_float()?; // ppm
        let gyro_scale_factor = Vector3::repeat(1.0) + randn3(rng) * gyro_sf_sigma * PPM;

        let gyro_g2_sigma = params.get_param("gyroG2Sigma")?.value_float()?; // ppm/g
        let gyro_g_sens = randn3(rng) * gyro_g2_sigma * PPM;

        let arw = params.get_param("arw")?.value_float()?; // rad/s/sqrt(Hz)
        let gyro_tau = positive_float(params, "gyroCorrelationTime")?; // s
        let gyro_drift_sigma = params.get_param("gyroBiasDriftSigma")?.value_float()?; // rad/s

        Ok(ErrorModel {
            accel_bias,
            accel_scale_factor,
            accel_g_sens,
            vrw,
            accel_tau,
            accel_drift_sigma,
            accel_drift_prev: Vector3::zeros(),
            gyro_bias,
            gyro_scale_factor,
            gyro_g_sens,
            arw,
            gyro_tau,
            gyro_drift_sigma,
            gyro_drift_prev: Vector3::zeros(),
        })
    }
}

/// Correlation times divide the Gauss-Markov propagation, so a zero here
/// would turn into a silent `inf` at sample time. Reject it up front.
fn positive_float(params: &ParameterMap, key: &str) -> Result<f64, ConfigError> {
    let value = params.get_param(key)?.value_float()?;

    if value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::NonPositive {
            key: key.to_string(),
            value,
        })
    }
}
