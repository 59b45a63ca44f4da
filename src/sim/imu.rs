use nalgebra::Vector3;
use rand::Rng;
use rand_xoshiro::{
    SplitMix64, Xoshiro256StarStar,
    rand_core::{RngCore, SeedableRng},
};

use crate::parameters::ParameterMap;

use super::error_model::{ConfigError, ErrorModel, randn3};

/// m/s^2 per g
pub const G0: f64 = 9.81;

/// Incremental output of one sample period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuSample {
    /// Incremental velocity over the interval, m/s
    pub delta_vel: Vector3<f64>,
    /// Incremental angle over the interval, rad
    pub delta_theta: Vector3<f64>,
}

/// First-order Gauss-Markov propagation of a 3-axis drift state,
/// `x' = -x/tau + w`, Euler-discretized over `dt`.
///
/// From Nassar (2003), "Modeling Inertial Sensor Errors Using
/// Autoregressive (AR) Models".
///
/// `tau` must be strictly positive and `dt/tau` well below 1 for the
/// discretization to hold.
pub fn fogm<R: Rng>(
    tau: f64,
    sigma: f64,
    prev: &Vector3<f64>,
    dt: f64,
    rng: &mut R,
) -> Vector3<f64> {
    let beta = 1.0 / tau;

    prev * (1.0 - beta * dt) + randn3(rng) * (2.0 * beta * sigma * sigma).sqrt() * dt
}

/// Simulates the response of an errorful IMU to an ideal input trajectory.
///
/// The caller drives it with the true angular rate and specific force,
/// averaged over each sample interval; the simulator returns the corrupted
/// incremental velocity and angle and advances its internal drift state.
/// Calls must be issued in strict time order for a given instance.
#[derive(Debug, Clone)]
pub struct ImuSimulator {
    model: ErrorModel,
    rng: Xoshiro256StarStar,
}

impl ImuSimulator {
    /// Builds a simulator from a parameter map holding the twelve error-model
    /// keys, drawing the static coefficients from `rng` and keeping it as the
    /// noise stream for subsequent samples.
    pub fn from_params(
        params: &ParameterMap,
        mut rng: Xoshiro256StarStar,
    ) -> Result<Self, ConfigError> {
        let model = ErrorModel::from_params(params, &mut rng)?;

        Ok(ImuSimulator { model, rng })
    }

    pub fn model(&self) -> &ErrorModel {
        &self.model
    }

    /// One sample period of the IMU.
    ///
    /// `w`: average true angular rate over the interval, rad/s.
    /// `sf`: average true specific force over the interval, body frame,
    /// interval midpoint, g. `dt`: sample interval, s, must be > 0
    /// (not validated).
    pub fn sample(&mut self, w: &Vector3<f64>, sf: &Vector3<f64>, dt: f64) -> ImuSample {
        let m = &mut self.model;

        // Propagate the accel bias instability first
        let accel_drift = fogm(
            m.accel_tau,
            m.accel_drift_sigma,
            &m.accel_drift_prev,
            dt,
            &mut self.rng,
        );

        // Combine all error terms into the sensed specific force
        let fs = m.accel_scale_factor.component_mul(sf)
            + m.accel_g_sens.component_mul(sf)
            + m.accel_bias
            + accel_drift
            + randn3(&mut self.rng) * (m.vrw / dt.sqrt());

        let delta_vel = fs * dt * G0;

        let gyro_drift = fogm(
            m.gyro_tau,
            m.gyro_drift_sigma,
            &m.gyro_drift_prev,
            dt,
            &mut self.rng,
        );

        // The gyro g-sensitivity term is driven by specific force: linear
        // acceleration leaking into the rate channel, not a rate error
        let w_s = m.gyro_scale_factor.component_mul(w)
            + m.gyro_g_sens.component_mul(sf)
            + m.gyro_bias
            + gyro_drift
            + randn3(&mut self.rng) * (m.arw / dt.sqrt());

        let delta_theta = w_s * dt;

        m.accel_drift_prev = accel_drift;
        m.gyro_drift_prev = gyro_drift;

        ImuSample {
            delta_vel,
            delta_theta,
        }
    }
}

/// Derives a decorrelated 256-bit generator from a single master seed, so
/// several simulators can share one reproducible seed.
pub fn rng_from_seed(seed: u64) -> Xoshiro256StarStar {
    let mut seeder = SplitMix64::seed_from_u64(seed);

    let mut seed: [u8; 32] = [0; 32];
    seeder.fill_bytes(&mut seed);

    Xoshiro256StarStar::from_seed(seed)
}
