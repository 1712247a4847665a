mod plant;

use core::cell::RefCell;
use std::path::PathBuf;

use clap::Parser;
use critical_section as _;
use embassy_executor::Executor;
use plant::{Plant, Road};
use serde::Serialize;
use static_cell::StaticCell;
use steer_core::mk_static;
use steer_core::utils::config::AutopilotConfig;
use steer_core::utils::controllers::pid::{Controller, Gains};
use steer_core::utils::controllers::{Autopilot, ACTUATOR_CHANNEL, TELEMETRY_CHANNEL};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts
{
    /// Number of control ticks to simulate
    #[clap(long, default_value_t = 50_000)]
    ticks: u64,
    /// JSON configuration file (defaults are used for missing fields)
    #[clap(long)]
    config: Option<PathBuf>,
    /// Override the throttle controller's target speed (mph)
    #[clap(long)]
    target_speed: Option<f64>,
    /// Run with fixed gains
    #[clap(long)]
    no_tune: bool,
    /// Tune the throttle gains together with steering
    #[clap(long)]
    tune_throttle: bool,
    /// Lateral offset the vehicle starts with (m)
    #[clap(long, default_value_t = 0.0)]
    start_offset: f64,
}

/// Final gains and tracking quality, printed as JSON on exit.
#[derive(Serialize)]
struct Report {
    ticks: u64,
    distance: f64,
    steering: Gains,
    throttle: Gains,
    /// Mean |cte| over the last `REPORT_TAIL` ticks.
    tail_mean_abs_cte: f64,
}

const REPORT_TAIL: u64 = 1_000;
const PROGRESS_EVERY: u64 = 5_000;

fn load_config(opts: &Opts) -> Result<AutopilotConfig, Box<dyn std::error::Error>> {
    let mut cfg = match &opts.config {
        Some(path) => AutopilotConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => AutopilotConfig::default(),
    };
    if let Some(speed) = opts.target_speed {
        cfg.target_speed = speed;
    }
    if opts.no_tune {
        cfg.tune = false;
    }
    if opts.tune_throttle {
        cfg.tune_throttle = true;
    }
    cfg.validate()?;
    Ok(cfg)
}

#[embassy_executor::task]
async fn autopilot_task(mut autopilot: Autopilot<'static>) -> ! {
    autopilot.run().await
}

#[embassy_executor::task]
async fn plant_task(
    mut plant: Plant,
    ticks: u64,
    steering: &'static RefCell<Controller>,
    throttle: &'static RefCell<Controller>,
) {
    let tail_start = ticks.saturating_sub(REPORT_TAIL);
    let mut tail_sum = 0.0;

    for tick in 0..ticks {
        let telemetry = plant.telemetry();
        if tick >= tail_start {
            tail_sum += telemetry.cte.abs();
        }
        TELEMETRY_CHANNEL.sender().send(telemetry).await;
        let command = ACTUATOR_CHANNEL.receiver().receive().await;
        plant.step(command);

        if tick % PROGRESS_EVERY == 0 {
            let gains = steering.borrow().gains();
            info!(
                tick,
                cte = telemetry.cte,
                speed = telemetry.speed,
                kp = gains.kp,
                ki = gains.ki,
                kd = gains.kd,
                "progress"
            );
        }
    }

    let report = Report {
        ticks,
        distance: plant.distance(),
        steering: steering.borrow().gains(),
        throttle: throttle.borrow().gains(),
        tail_mean_abs_cte: tail_sum / (ticks - tail_start).max(1) as f64,
    };
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => error!("failed to serialize report: {:?}", e),
    }
    std::process::exit(0);
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts: Opts = Opts::parse();
    let cfg = match load_config(&opts) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("invalid configuration: {}", e);
            std::process::exit(2);
        }
    };
    info!(?cfg, "starting simulation");

    let steering: &'static RefCell<Controller> =
        mk_static!(RefCell<Controller>, RefCell::new(cfg.steering_controller()));
    let throttle: &'static RefCell<Controller> =
        mk_static!(RefCell<Controller>, RefCell::new(cfg.throttle_controller()));

    let autopilot = match Autopilot::new(steering, throttle, &cfg) {
        Ok(ap) => ap,
        Err(e) => {
            error!("failed to build autopilot: {}", e);
            std::process::exit(2);
        }
    };
    let plant = Plant::new(Road::default(), opts.start_offset);

    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(autopilot_task(autopilot)).unwrap();
        spawner
            .spawn(plant_task(plant, opts.ticks, steering, throttle))
            .unwrap();
    });
}
