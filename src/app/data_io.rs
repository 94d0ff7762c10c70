use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use url::Url;

use super::error::CrawlError;
use super::types::CrawlReport;

const CSV_HEADERS: [&str; 4] = ["URL", "Title", "Status", "Visited"];
const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Csv,
    Sitemap,
}

impl DataFormat {
    pub fn extension(self) -> &'static str {
        match self {
            DataFormat::Json => "json",
            DataFormat::Csv => "csv",
            DataFormat::Sitemap => "xml",
        }
    }
}

pub fn write_json_report<W: Write>(report: &CrawlReport, writer: W) -> io::Result<()> {
    serde_json::to_writer_pretty(writer, report).map_err(io::Error::other)
}

pub fn write_csv_report<W: Write>(report: &CrawlReport, writer: W) -> io::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(CSV_HEADERS)?;
    for record in &report.links {
        writer.write_record([
            record.url.as_str(),
            record.title.as_str(),
            &record.http_status.to_string(),
            &record.visited.to_string(),
        ])?;
    }
    writer.flush()
}

fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// One `url/loc` entry per record, whatever its fetch outcome.
pub fn sitemap_xml(report: &CrawlReport) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!("<urlset xmlns=\"{SITEMAP_NAMESPACE}\">\n"));
    for record in &report.links {
        xml.push_str("  <url>\n    <loc>");
        xml.push_str(&escape_xml(&record.url));
        xml.push_str("</loc>\n  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

pub fn write_report<W: Write>(
    report: &CrawlReport,
    format: DataFormat,
    mut writer: W,
) -> io::Result<()> {
    match format {
        DataFormat::Json => write_json_report(report, &mut writer)?,
        DataFormat::Csv => write_csv_report(report, &mut writer)?,
        DataFormat::Sitemap => writer.write_all(sitemap_xml(report).as_bytes())?,
    }
    writer.flush()
}

pub fn write_report_file(report: &CrawlReport, format: DataFormat, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_report(report, format, BufWriter::new(file))
}

pub fn detect_data_format(path: &str, fallback: DataFormat) -> DataFormat {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".json") {
        DataFormat::Json
    } else if lower.ends_with(".csv") {
        DataFormat::Csv
    } else if lower.ends_with(".xml") {
        DataFormat::Sitemap
    } else {
        fallback
    }
}

pub fn default_output_path(url: &str, format: DataFormat) -> String {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| "crawl".to_string());
    let host = host
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' {
                ch
            } else {
                '_'
            }
        })
        .collect::<String>();
    let ts = Utc::now().format("%Y%m%d_%H%M%S");
    format!("{host}_{ts}.{}", format.extension())
}

/// Most recent finished report, shared by the export endpoints.
#[derive(Debug, Clone, Default)]
pub struct LatestReport {
    inner: Arc<RwLock<Option<Arc<CrawlReport>>>>,
}

impl LatestReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn store(&self, report: CrawlReport) -> Arc<CrawlReport> {
        let report = Arc::new(report);
        *self.inner.write().await = Some(Arc::clone(&report));
        report
    }

    pub async fn get(&self) -> Result<Arc<CrawlReport>, CrawlError> {
        self.inner
            .read()
            .await
            .clone()
            .ok_or(CrawlError::NoReportAvailable)
    }
}
