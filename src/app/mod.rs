pub mod analyzer;
pub mod cli;
pub mod config;
pub mod crawl;
pub mod data_io;
pub mod error;
pub mod filter;
pub mod logging;
pub mod registry;
pub mod report;
pub mod server;
pub mod types;

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use cli::{Cli, Command, CrawlCommand};
use crawl::Crawler;
use data_io::{DataFormat, default_output_path, detect_data_format, write_report_file};

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level)?;

    match cli.command {
        Command::Crawl(crawl) => run_crawl_command(crawl).await,
        Command::Serve(serve) => server::run_server(serve.addr, serve.tuning.to_config()).await,
    }
}

async fn run_crawl_command(cmd: CrawlCommand) -> anyhow::Result<()> {
    let configured_format: DataFormat = cmd.format.into();
    let output_format = cmd
        .output
        .as_deref()
        .map(|path| detect_data_format(path, configured_format))
        .unwrap_or(configured_format);
    let output_path = cmd
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cmd.url, output_format));

    let config = cmd.tuning.to_config().with_max_depth(cmd.depth);
    let report = Crawler::new(config)
        .run(&cmd.url)
        .await
        .with_context(|| format!("crawl of {} failed", cmd.url))?;

    write_report_file(&report, output_format, Path::new(&output_path))
        .with_context(|| format!("failed to write report to {output_path}"))?;
    info!(
        path = %output_path,
        total = report.total_links,
        success = report.stats.success,
        errors = report.stats.errors,
        not_visited = report.stats.not_visited,
        "report written"
    );
    Ok(())
}
