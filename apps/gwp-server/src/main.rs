use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use gwp_app::{AppConfig, AppResult, Calculator, Persistence};
use gwp_engine::Engine;
use gwp_model::SlotCheck;
use gwp_store::{Datastore, PostgrestStore};
use tracing::info;

mod server;

/// Timeout for one datastore request.
const DATASTORE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Parser)]
#[command(name = "gwp-server")]
#[command(about = "GWP calculation service - openLCA-backed transport emission calculator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the engine, validate model bindings and serve HTTP
    Serve {
        /// Listen address (defaults to GWP_BIND_ADDR or 0.0.0.0:5000)
        #[arg(long)]
        bind: Option<String>,
        /// Number of request worker threads
        #[arg(long, env = "GWP_WORKERS", default_value_t = 4)]
        workers: usize,
    },
    /// Connect to the engine and check both model bindings
    Check,
    /// Run one calculation and print the GWP results as JSON
    #[command(subcommand)]
    Calc(CalcCommands),
}

#[derive(Subcommand)]
enum CalcCommands {
    /// Kitchen-waste model (per tonne-kilometre)
    Tkm {
        #[arg(long)]
        distance: f64,
        #[arg(long)]
        factor: f64,
        #[arg(long)]
        load: f64,
        #[arg(long)]
        amount: f64,
    },
    /// Fuel-consumption model (amount in tonnes)
    Oil {
        #[arg(long)]
        distance: f64,
        #[arg(long)]
        factor: f64,
        #[arg(long)]
        load: f64,
        #[arg(long)]
        amount: f64,
        /// Oil consumption
        #[arg(long)]
        oil_use: f64,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command {
        Commands::Serve { bind, workers } => cmd_serve(&config, bind.as_deref(), workers),
        Commands::Check => cmd_check(&config),
        Commands::Calc(calc) => cmd_calc(&config, calc),
    }
}

fn connect_engine(config: &AppConfig) -> AppResult<Arc<dyn Engine>> {
    let client = gwp_engine::connect(
        &config.engine_host,
        config.engine_port,
        &config.retry,
        config.connect_timeout,
    )?;
    Ok(Arc::new(client))
}

fn calculator(config: &AppConfig, engine: Arc<dyn Engine>) -> Calculator {
    Calculator::new(engine, config.impact_method.clone(), config.poll_interval)
}

fn persistence(config: &AppConfig) -> AppResult<Persistence> {
    let store = match &config.datastore {
        Some(ds) => {
            info!(url = %ds.url, "datastore enabled");
            let store: Arc<dyn Datastore> =
                Arc::new(PostgrestStore::new(&ds.url, &ds.key, DATASTORE_TIMEOUT)?);
            Some(store)
        }
        None => {
            info!("SUPABASE_URL/SUPABASE_KEY not set; results will not be stored");
            None
        }
    };
    Ok(Persistence::new(store, config.tables.clone()).with_compensation(config.compensate_orphans))
}

fn cmd_serve(config: &AppConfig, bind: Option<&str>, workers: usize) -> AppResult<()> {
    let addr = bind.unwrap_or(config.bind_addr.as_str());
    let listener = server::bind(addr)?;

    let calculator = calculator(config, connect_engine(config)?);
    calculator.validate_bindings()?;
    let api = gwp_app::Api::new(calculator, persistence(config)?);

    server::serve(Arc::new(listener), Arc::new(api), workers);
    Ok(())
}

fn cmd_check(config: &AppConfig) -> AppResult<()> {
    let calculator = calculator(config, connect_engine(config)?);
    for report in calculator.validate_bindings()? {
        println!("{}", report.model);
        for (position, slot) in report.slots.iter().enumerate() {
            match slot {
                SlotCheck::Confirmed { slot, role } => {
                    println!("  #{position} {slot} -> {role}");
                }
                SlotCheck::Unverified { slot, role } => {
                    println!("  #{position} {slot} -> {role} (unverified)");
                }
            }
        }
    }
    Ok(())
}

fn cmd_calc(config: &AppConfig, calc: CalcCommands) -> AppResult<()> {
    let calculator = calculator(config, connect_engine(config)?);
    let impacts = match calc {
        CalcCommands::Tkm {
            distance,
            factor,
            load,
            amount,
        } => calculator.compute_by_mass(distance, factor, load, amount)?,
        CalcCommands::Oil {
            distance,
            factor,
            load,
            amount,
            oil_use,
        } => calculator.compute_by_fuel(distance, factor, load, amount, oil_use)?,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&impacts).unwrap_or_default()
    );
    Ok(())
}
