//! accel-stream CLI
//!
//! Streams smoothed accelerometer motion and tap gestures to browsers.

use accel_stream::{
    config::Config,
    core::Pipeline,
    hub::BroadcastHub,
    sensor::{spawn_line_feeder, MemoryRing, SyntheticConfig, SyntheticFeeder},
    server::{self, ServerConfig},
    stats::create_shared_stats,
    VERSION,
};
use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::BufReader;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "accel-stream")]
#[command(version = VERSION)]
#[command(about = "Streams accelerometer motion and tap gestures over HTTP", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the producer loop and the HTTP server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind to (overrides config)
        #[arg(long)]
        bind: Option<IpAddr>,

        /// Where samples come from
        #[arg(long, value_enum, default_value = "synthetic")]
        source: Source,

        /// Add periodic single and double taps to the synthetic source
        #[arg(long)]
        taps: bool,

        /// Directory of static files to serve (e.g. a web UI)
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Producer tick interval in milliseconds (overrides config)
        #[arg(long)]
        tick_ms: Option<u64>,
    },

    /// Show configuration
    Config,

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Source {
    /// Built-in generator at ~100 Hz
    Synthetic,
    /// Raw `x y z` integer lines on stdin
    Stdin,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve {
            port,
            bind,
            source,
            taps,
            static_dir,
            tick_ms,
        } => cmd_serve(port, bind, source, taps, static_dir, tick_ms),
        Commands::Config => cmd_config(),
        Commands::InitConfig { force } => cmd_init_config(force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("accel_stream=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn cmd_serve(
    port: Option<u16>,
    bind: Option<IpAddr>,
    source: Source,
    taps: bool,
    static_dir: Option<PathBuf>,
    tick_ms: Option<u64>,
) -> anyhow::Result<()> {
    println!("accel-stream v{VERSION}");
    println!();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config, using defaults: {e}");
        Config::default()
    });
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(bind) = bind {
        config.bind = bind;
    }
    if let Some(dir) = static_dir {
        config.static_dir = Some(dir);
    }
    if let Some(ms) = tick_ms {
        config.tick_interval = Duration::from_millis(ms);
    }
    config.validate()?;

    let stats = create_shared_stats();
    let ring = Arc::new(MemoryRing::with_capacity(config.ring_capacity));
    let hub = Arc::new(BroadcastHub::new(config.subscriber_capacity, stats.clone()));

    let mut line_input = None;
    let mut feeder = match source {
        Source::Synthetic => {
            let mut feeder = SyntheticFeeder::new(
                SyntheticConfig {
                    units_per_g: 1.0 / config.scale,
                    taps,
                    ..Default::default()
                },
                ring.clone(),
            );
            feeder.start();
            println!("  Source: synthetic{}", if taps { " (with taps)" } else { "" });
            Some(feeder)
        }
        Source::Stdin => {
            line_input = Some(spawn_line_feeder(
                BufReader::new(std::io::stdin()),
                ring.clone(),
            ));
            println!("  Source: stdin");
            None
        }
    };

    println!("  Tick interval: {}ms", config.tick_interval.as_millis());
    println!("  Smoothing alpha: {}", config.smoothing_alpha);
    println!(
        "  Tap: threshold {}, cooldown {}ms, window {}ms",
        config.tap.threshold,
        config.tap.cooldown.as_millis(),
        config.tap.window.as_millis()
    );
    println!("  Ring: {} samples", ring.capacity());
    println!("  Subscriber queue: {} events", config.subscriber_capacity);

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    let (addr, shutdown_tx) = runtime
        .block_on(server::run(
            ServerConfig::from_config(&config),
            hub.clone(),
            stats.clone(),
        ))
        .context("starting HTTP server")?;

    println!();
    println!("Streaming on http://{addr}/events");
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    // The producer owns this thread until shutdown or a fatal ring error.
    let mut pipeline = Pipeline::from_config(&config, ring, hub, stats.clone());
    let result = pipeline.run(&running, config.tick_interval);

    println!();
    println!("Stopping...");
    if let Some(ref mut feeder) = feeder {
        feeder.stop();
    }
    // A reader still blocked on stdin is left detached.
    if let Some(handle) = line_input.filter(|h| h.is_finished()) {
        match handle.join() {
            Ok(written) => tracing::info!(written, "line input joined"),
            Err(_) => tracing::warn!("line input thread panicked"),
        }
    }
    let _ = shutdown_tx.send(());
    runtime.shutdown_timeout(Duration::from_secs(2));

    println!();
    println!("{}", stats.summary());

    result.context("sensor source failed")
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_init_config(force: bool) -> anyhow::Result<()> {
    let path = Config::config_path();
    if path.exists() && !force {
        anyhow::bail!("{path:?} already exists (use --force to overwrite)");
    }
    Config::default().save()?;
    println!("Wrote default configuration to {path:?}");
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")
}
