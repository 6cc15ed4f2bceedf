//! sigscope - version 0.1.0
//!
//! Command-line front end of the sigscope engine with tracing logging.
//! This is the main entry point that resolves configuration and dispatches subcommands.

mod cli;
mod commands;
mod config;

use clap::{Parser, ValueEnum};
use tracing::{debug, error, info, Level};

use cli::{Args, Commands, LogLevel};
use commands::{
    command_config, command_generate_testdata, command_inspect, command_simulate, command_window,
};
use commands::window::WindowRequest;
use config::{resolve_config, show_config, validate_effective_config, Config};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config, args: &Args) {
    let level = args
        .log_level
        .clone()
        .or_else(|| {
            config
                .log_level
                .as_deref()
                .and_then(|s| LogLevel::from_str(s, true).ok())
        })
        .unwrap_or(LogLevel::Info);

    let log_level = match level {
        LogLevel::Off => None,
        LogLevel::Error => Some(Level::ERROR),
        LogLevel::Warn => Some(Level::WARN),
        LogLevel::Info => Some(Level::INFO),
        LogLevel::Debug => Some(Level::DEBUG),
        LogLevel::Trace => Some(Level::TRACE),
    };
    let Some(log_level) = log_level else {
        return;
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    debug!("Logging initialized with level: {:?}", level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Sizes the global rayon pool used for parallel reduction.
fn configure_parallelism(config: &Config) {
    if let Some(threads) = config.parallelism {
        if threads > 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build_global()
                .unwrap_or_else(|e| error!("Failed to set rayon thread pool: {}", e));
            debug!("Rayon thread pool configured with {} threads", threads);
        }
    }
}

/// Main application entry point.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format.clone());
    }

    let Some(command) = args.command.as_ref() else {
        println!("No command given; run `sigscope --help` for usage.");
        return Ok(());
    };

    // Template generation must work even when the current config is broken
    if let Commands::Config {
        output,
        format,
        commented,
    } = command
    {
        return Ok(command_config(output.clone(), format.clone(), *commented)?);
    }

    let config = load_validated_config(&args)?;
    setup_logging(&config, &args);
    configure_parallelism(&config);

    let result = match command {
        Commands::Inspect {
            file,
            verify,
            format,
        } => command_inspect(file.clone(), *verify, *format, &config),

        Commands::Window {
            file,
            window,
            unit,
            scroll,
            parameters,
            csv,
            format,
        } => command_window(
            WindowRequest {
                file: file.clone(),
                window: *window,
                unit: *unit,
                scroll: *scroll,
                parameters: parameters.clone(),
                csv: csv.clone(),
                format: *format,
            },
            &config,
        ),

        Commands::Simulate {
            duration,
            realtime,
            scroll,
            format,
        } => command_simulate(*duration, *realtime, *scroll, *format, &config),

        Commands::GenerateTestdata {
            output,
            records,
            step_ms,
            cycle_length,
            seed,
        } => command_generate_testdata(output.clone(), *records, *step_ms, *cycle_length, *seed),

        Commands::Config { .. } => unreachable!("Config handled above"),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }

    info!("Done");
    Ok(())
}
