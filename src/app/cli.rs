use std::net::SocketAddr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use super::config::{
    CrawlConfig, DEFAULT_FETCH_CONCURRENCY, DEFAULT_MAX_DEPTH, DEFAULT_MAX_JITTER_MS,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
use super::data_io::DataFormat;
use super::logging::DEFAULT_LOG_LEVEL;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "linkscope",
    version,
    about = "Same-domain crawler with per-page SEO signal extraction"
)]
pub struct Cli {
    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, value_name = "LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Crawl one site and write the report to a file.
    Crawl(CrawlCommand),
    /// Serve the scrape and export API.
    Serve(ServeCommand),
}

#[derive(Debug, Args, Clone)]
pub struct CrawlCommand {
    #[arg(value_name = "URL")]
    pub url: String,

    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_DEPTH)]
    pub depth: usize,

    #[arg(short, long, value_name = "FILE")]
    pub output: Option<String>,

    #[arg(long, value_enum, default_value_t = FileFormatArg::Json)]
    pub format: FileFormatArg,

    #[command(flatten)]
    pub tuning: TuningArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ServeCommand {
    #[arg(long, value_name = "ADDR", default_value = "127.0.0.1:8080")]
    pub addr: SocketAddr,

    #[command(flatten)]
    pub tuning: TuningArgs,
}

#[derive(Debug, Args, Clone)]
pub struct TuningArgs {
    #[arg(long, value_name = "N", default_value_t = DEFAULT_FETCH_CONCURRENCY)]
    pub fetch_concurrency: usize,

    #[arg(long, value_name = "MS", default_value_t = DEFAULT_MAX_JITTER_MS)]
    pub delay_jitter_ms: u64,

    #[arg(long, value_name = "S", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    #[arg(long, value_name = "UA")]
    pub user_agent: Option<String>,
}

impl TuningArgs {
    pub fn to_config(&self) -> CrawlConfig {
        let config = CrawlConfig::default()
            .with_fetch_concurrency(self.fetch_concurrency)
            .with_max_jitter(Duration::from_millis(self.delay_jitter_ms))
            .with_request_timeout(Duration::from_secs(self.timeout_secs));
        match &self.user_agent {
            Some(user_agent) => config.with_user_agent(user_agent.clone()),
            None => config,
        }
    }
}

#[derive(Debug, Copy, Clone, ValueEnum, PartialEq, Eq)]
pub enum FileFormatArg {
    Json,
    Csv,
    Sitemap,
}

impl From<FileFormatArg> for DataFormat {
    fn from(value: FileFormatArg) -> Self {
        match value {
            FileFormatArg::Json => DataFormat::Json,
            FileFormatArg::Csv => DataFormat::Csv,
            FileFormatArg::Sitemap => DataFormat::Sitemap,
        }
    }
}
