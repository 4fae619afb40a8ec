mod cli;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command};
use ui::Report;
use wpcost::config::CostConfig;
use wpcost::model::HeaderPatch;
use wpcost::service::CostService;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CostConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(db) = &cli.database {
        config.database_path = db.clone();
    }

    init_tracing(&cli, &config);
    debug!(database = %config.database_path.display(), "configuration loaded");

    let service = CostService::open(&config.database_path)
        .with_context(|| format!("opening {}", config.database_path.display()))?;
    let report = Report::default();

    match cli.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            let addr = config.socket_addr()?;
            wpcost::api::serve(service, addr).await?;
        }
        Command::Header { work_package } => {
            let header = service.get_header(&work_package)?;
            report.header(&work_package, &header);
        }
        Command::Summary { work_package } => {
            let summary = service.get_summary(&work_package)?;
            report.summary(&work_package, &summary);
        }
        Command::Lock { work_package } => {
            let header = service.update_header(&work_package, HeaderPatch::lock())?;
            report.lock_changed(&work_package, header.locked);
        }
        Command::Unlock { work_package } => {
            let header = service.update_header(&work_package, HeaderPatch::unlock())?;
            report.lock_changed(&work_package, header.locked);
        }
    }

    Ok(())
}

fn init_tracing(cli: &Cli, config: &CostConfig) {
    let default_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.log_level.clone()
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_level.into());

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
