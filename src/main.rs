//! Demo entry point — CLI wiring and config-driven household construction.

use std::path::Path;
use std::process;
use std::sync::Arc;

use tracing::{error, info};

use hem_sim::config::ScenarioConfig;
use hem_sim::control::{ApplianceCatalog, ControlRuntime, DeviceRegistry, EnergyBalancer};
use hem_sim::devices::{SimBattery, SimGenerator, SimMeter};

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    ticks: Option<u64>,
    accel_override: Option<f32>,
}

fn print_help() {
    eprintln!("hem-sim — Home energy-management control-loop simulator");
    eprintln!();
    eprintln!("Usage: hem-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>   Load scenario from TOML config file");
    eprintln!("  --preset <name>     Use a built-in preset (baseline)");
    eprintln!("  --seed <u64>        Override the meter random seed");
    eprintln!("  --ticks <u64>       Stop after this many control ticks");
    eprintln!("  --accel <f32>       Override the time acceleration factor");
    eprintln!("  --help              Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        ticks: None,
        accel_override: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --scenario requires a path argument");
                    process::exit(1);
                }
                cli.scenario_path = Some(args[i].clone());
            }
            "--preset" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --preset requires a name argument");
                    process::exit(1);
                }
                cli.preset = Some(args[i].clone());
            }
            "--seed" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --seed requires a u64 argument");
                    process::exit(1);
                }
                match args[i].parse::<u64>() {
                    Ok(seed) => cli.seed_override = Some(seed),
                    Err(_) => {
                        eprintln!("error: --seed value \"{}\" is not a valid u64", args[i]);
                        process::exit(1);
                    }
                }
            }
            "--ticks" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --ticks requires a u64 argument");
                    process::exit(1);
                }
                match args[i].parse::<u64>() {
                    Ok(ticks) => cli.ticks = Some(ticks),
                    Err(_) => {
                        eprintln!("error: --ticks value \"{}\" is not a valid u64", args[i]);
                        process::exit(1);
                    }
                }
            }
            "--accel" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --accel requires a f32 argument");
                    process::exit(1);
                }
                match args[i].parse::<f32>() {
                    Ok(accel) if accel > 0.0 => cli.accel_override = Some(accel),
                    _ => {
                        eprintln!("error: --accel value \"{}\" must be a positive number", args[i]);
                        process::exit(1);
                    }
                }
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }
    cli
}

fn load_scenario(cli: &CliArgs) -> ScenarioConfig {
    let mut config = if let Some(path) = &cli.scenario_path {
        match ScenarioConfig::from_toml_file(Path::new(path)) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("error: {err}");
                process::exit(1);
            }
        }
    } else {
        match cli.preset.as_deref() {
            None | Some("baseline") => ScenarioConfig::baseline(),
            Some(other) => {
                eprintln!("error: unknown preset \"{other}\" (available: baseline)");
                process::exit(1);
            }
        }
    };

    if let Some(seed) = cli.seed_override {
        config.meter.seed = seed;
    }
    if let Some(accel) = cli.accel_override {
        config.control.acceleration = accel;
    }
    if let Err(err) = config.validate() {
        eprintln!("error: {err}");
        process::exit(1);
    }
    config
}

#[tokio::main]
async fn main() {
    hem_sim::telemetry::init("info");
    let cli = parse_args();
    let config = load_scenario(&cli);

    let meter = SimMeter::new(
        config.meter.base_production_w,
        config.meter.production_amp_w,
        config.meter.base_consumption_w,
        config.meter.consumption_amp_w,
        config.meter.noise_std_w,
        config.meter.steps_per_day,
        config.meter.tension_v,
        config.meter.seed,
    );
    let generator = SimGenerator::new(config.generator.output_w, config.generator.tension_v);

    let registry = Arc::new(DeviceRegistry::new());
    let balancer = EnergyBalancer::new(
        config.control.balancer(),
        Arc::clone(&registry),
        Box::new(ApplianceCatalog),
        Box::new(meter),
        Box::new(SimBattery::new()),
        Box::new(generator),
    );

    for appliance in &config.appliances {
        if let Err(err) = balancer.register_appliance(appliance) {
            error!(device = %appliance.id, error = %err, "registration failed");
            process::exit(1);
        }
    }
    info!(
        devices = registry.len(),
        period_ms = config.control.period_ms,
        acceleration = config.control.acceleration,
        "control loop starting"
    );

    let runtime = ControlRuntime::spawn(balancer, config.control.effective_period(), cli.ticks);
    let trigger = runtime.shutdown_trigger();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; stopping control loop");
            let _ = trigger.send(());
        }
    });

    match runtime.join().await {
        Ok(balancer) => info!(ticks = balancer.ticks(), "control loop finished"),
        Err(err) => {
            error!(error = %err, "control loop task failed");
            process::exit(1);
        }
    }
}
