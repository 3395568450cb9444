use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use sitepulse::config::Config;
use sitepulse::monitor::{Device, Monitor, RunRequest};

#[derive(Parser)]
#[command(
    name = "sitepulse",
    about = "Synthetic site-audit monitoring and variant analytics engine",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file (built-in defaults when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (API server + monitoring worker)
    Serve {
        /// Bind address override
        #[arg(long)]
        bind: Option<String>,
    },

    /// Run a single audit immediately and print the result
    Audit {
        /// URL path to audit
        #[arg(long, default_value = "/")]
        url: String,

        /// Device profile: desktop or mobile
        #[arg(long, default_value = "desktop")]
        device: String,

        /// Personalization variant id to attribute
        #[arg(long)]
        variant: Option<String>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// List configured audit targets
    Targets,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            tracing::info!(bind = %config.server.bind, "Starting SitePulse daemon");
            sitepulse::serve(config).await?;
        }
        Commands::Audit {
            url,
            device,
            variant,
            json,
        } => {
            let device = match device.as_str() {
                "mobile" => Device::Mobile,
                _ => Device::Desktop,
            };
            let monitor = Monitor::new(config.monitor_config()).await;
            let entry = monitor
                .schedule_run(RunRequest {
                    url: Some(url),
                    device: Some(device),
                    variant_id: variant,
                    ..RunRequest::default()
                })
                .await;

            let run = wait_for_run(&monitor, &entry.id.to_string()).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&run)?);
            } else {
                let metrics = run.metrics.as_ref();
                println!("\nSitePulse Audit Report");
                println!("{:<16} | {}", "URL", run.url);
                println!("{:<16} | {}", "Device", run.device);
                println!("{:<16} | {:?}", "Status", run.status);
                if let Some(metrics) = metrics {
                    println!("{:<16} | {}", "Performance", metrics.performance);
                    println!("{:<16} | {}", "Accessibility", metrics.accessibility);
                    println!("{:<16} | {}", "Best practices", metrics.best_practices);
                    println!("{:<16} | {}", "SEO", metrics.seo);
                }
                if let Some(axe) = &run.axe {
                    println!("{:<16} | {}", "Axe violations", axe.violations);
                }
                println!();
            }
        }
        Commands::Targets => {
            let targets = config.targets();
            println!("{:<18} | {:<22} | {:<8} | Cadence", "Id", "URL", "Device");
            println!("{:-<18}-|-{:-<22}-|-{:-<8}-|-{:-<12}", "", "", "", "");
            for target in targets {
                println!(
                    "{:<18} | {:<22} | {:<8} | {}",
                    target.id, target.url, target.device, target.cadence
                );
            }
        }
    }

    Ok(())
}

/// Poll until the scheduled run lands in history.
async fn wait_for_run(
    monitor: &Monitor,
    run_id: &str,
) -> Result<sitepulse::monitor::HistoryEntry> {
    for _ in 0..200 {
        let state = monitor.monitoring_state().await;
        if let Some(run) = state.runs.into_iter().find(|run| run.id == run_id) {
            return Ok(run);
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    bail!("audit run {run_id} did not complete in time");
}
