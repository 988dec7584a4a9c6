use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tlox::Lox;

/// A tree-walking interpreter for a typed dialect of Lox.
#[derive(Debug, Parser)]
#[command(name = "tlox", version)]
struct Config {
    /// Script to run. Starts a prompt when omitted.
    script: Option<PathBuf>,

    /// Log level for interpreter diagnostics; overrides RUST_LOG.
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn setup_logging(log_level: Option<LogLevel>) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = match log_level {
        Some(level) => EnvFilter::new(match level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let formatter = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_level(true);

    tracing_subscriber::registry().with(formatter).with(filter).init();
}

fn main() -> Result<(), anyhow::Error> {
    let config = match Config::try_parse() {
        Ok(config) => config,
        Err(e) if e.use_stderr() => {
            eprintln!("{e}");
            eprintln!("Usage: tlox [script]");
            std::process::exit(64);
        }
        Err(e) => e.exit(),
    };

    setup_logging(config.log_level);

    let mut lox = Lox::new();
    match config.script {
        Some(script) => {
            lox.run_file(script)?;

            // Indicate an error in the exit code.
            if lox.had_error() {
                std::process::exit(65);
            }
            if lox.had_runtime_error() {
                std::process::exit(70);
            }
            Ok(())
        }
        None => lox.run_prompt(),
    }
}
