use std::{env, fs, path::PathBuf};

use anyhow::Result;
use clap::Parser;
use log::info;
use nalgebra::Vector3;
use rand::{TryRngCore, rngs::OsRng};
use serde::Serialize;

use imusim::{
    parameters::parameters,
    sim::{ImuSimulator, rng_from_seed},
};

/// Drives the IMU simulator over a constant-input trajectory and logs the
/// incremental outputs to csv.
#[derive(Debug, Parser)]
struct Cli {
    /// Parameter file
    #[arg(long, default_value = "config/params.toml")]
    params: PathBuf,

    /// Master seed, drawn from the OS when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Output directory
    #[arg(long, default_value = "out")]
    out_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
struct SampleRecord {
    t: f64,
    dv_x: f64,
    dv_y: f64,
    dv_z: f64,
    dtheta_x: f64,
    dtheta_y: f64,
    dtheta_z: f64,
}

fn main() -> Result<()> {
    // Default log level to "info"
    if env::var("RUST_LOG").is_err() {
        unsafe { env::set_var("RUST_LOG", "info") }
    }

    pretty_env_logger::init();

    let cli = Cli::parse();

    info!("Reading parameters from '{}'", cli.params.display());
    let params_toml = fs::read_to_string(&cli.params)?;
    let params = parameters::parse_string(params_toml)?;

    let seed = match cli.seed {
        Some(seed) => seed,
        None => OsRng {}.try_next_u64()?,
    };
    info!("Master seed: {seed}");

    let mut imu = ImuSimulator::from_params(params.get_map("imu")?, rng_from_seed(seed))?;

    let dt = params.get_param("sim.dt")?.value_float()?;
    let duration = params.get_param("sim.duration")?.value_float()?;

    let w = Vector3::from_column_slice(params.get_param("sim.angular_rate")?.value_float_arr()?);
    let sf = Vector3::from_column_slice(params.get_param("sim.specific_force")?.value_float_arr()?);

    let num_samples = (duration / dt).round() as usize;

    if !cli.out_dir.exists() {
        fs::create_dir_all(&cli.out_dir)?;
    }

    let out_file = cli.out_dir.join(format!(
        "imu_{}.csv",
        chrono::Local::now().format("%Y_%m_%d_%H-%M-%S")
    ));
    let mut writer = csv::Writer::from_path(&out_file)?;

    for i in 0..num_samples {
        let out = imu.sample(&w, &sf, dt);

        writer.serialize(SampleRecord {
            t: (i + 1) as f64 * dt,
            dv_x: out.delta_vel.x,
            dv_y: out.delta_vel.y,
            dv_z: out.delta_vel.z,
            dtheta_x: out.delta_theta.x,
            dtheta_y: out.delta_theta.y,
            dtheta_z: out.delta_theta.z,
        })?;
    }

    writer.flush()?;

    info!(
        "Wrote {num_samples} samples ({duration} s at dt = {dt} s) to '{}'",
        out_file.display()
    );

    Ok(())
}
